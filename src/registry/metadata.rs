use crate::param::ParameterSchema;
use crate::pipeline::{Generator, PipelineDefinition};
use crate::port::PortSchema;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Factory function type for creating generator instances
pub type GeneratorFactory = Arc<dyn Fn() -> Box<dyn Generator> + Send + Sync>;

/// A registered name, its factory and an optional composition wrapper tag
#[derive(Clone)]
pub struct RegistryEntry {
    pub name: String,
    pub factory: GeneratorFactory,
    pub wrapper: Option<String>,
}

impl RegistryEntry {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Generator> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
            wrapper: None,
        }
    }

    pub fn with_wrapper(mut self, wrapper: impl Into<String>) -> Self {
        self.wrapper = Some(wrapper.into());
        self
    }

    /// Create a new instance of this generator type
    pub fn create_instance(&self) -> Box<dyn Generator> {
        (self.factory)()
    }
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("name", &self.name)
            .field("wrapper", &self.wrapper)
            .finish_non_exhaustive()
    }
}

/// Complete metadata for a generator, as declared by its schema
#[derive(Debug, Clone, Serialize)]
pub struct GeneratorMetadata {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrapper: Option<String>,
    pub parameters: Vec<ParameterSchema>,
    pub inputs: Vec<PortSchema>,
    pub outputs: Vec<PortSchema>,
}

impl GeneratorMetadata {
    pub fn from_definition(name: impl Into<String>, wrapper: Option<String>, definition: &PipelineDefinition) -> Self {
        Self {
            name: name.into(),
            wrapper,
            parameters: definition.params().iter().map(|p| p.schema()).collect(),
            inputs: definition.input_decls().iter().map(|d| d.schema()).collect(),
            outputs: definition.output_decls().iter().map(|d| d.schema()).collect(),
        }
    }
}

// Entry constructor submitted at link time by #[derive(RegisterGenerator)]
pub type StaticEntryFactory = fn() -> RegistryEntry;

// Wrapper for inventory collection
pub struct StaticRegistration(pub StaticEntryFactory);

inventory::collect!(StaticRegistration);
