pub mod metadata;
#[allow(clippy::module_inception)]
pub mod registry;

pub use metadata::{GeneratorFactory, GeneratorMetadata, RegistryEntry, StaticEntryFactory, StaticRegistration};
pub use registry::GeneratorRegistry;
