pub mod parameter;
pub mod value;

pub use parameter::{ConfigParameter, ParamScope, ParameterSchema};
pub use value::{ConfigValue, ValueKind};
