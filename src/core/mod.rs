pub mod loop_level;
pub mod names;
pub mod target;
pub mod types;

pub use loop_level::LoopLevel;
pub use names::{validate_name, RESERVED_AFFIX};
pub use target::{Arch, Feature, Os, Target};
pub use types::ScalarType;
