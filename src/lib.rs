pub mod compose;
pub mod config;
pub mod core;
pub mod error;
pub mod generators;
pub mod graph;
pub mod param;
pub mod pipeline;
pub mod port;
pub mod registry;

pub use config::ParamValues;
pub use error::{PipelineError, Result};

/// The types most generator code needs.
pub mod prelude {
    pub use crate::compose::Composed;
    pub use crate::config::{param_values, ParamValues};
    pub use crate::core::{LoopLevel, ScalarType, Target};
    pub use crate::error::{PipelineError, Result};
    pub use crate::graph::{Buffer, Expr, Node, Var};
    pub use crate::param::ConfigParameter;
    pub use crate::pipeline::{
        BuildContext, Generator, PipelineDefinition, PipelineView, ScheduleContext, SchemaBuilder, SingleStage,
        TwoStage,
    };
    pub use crate::port::{Binding, InputGroup, PortDecl, TypeArg};
    pub use crate::registry::GeneratorRegistry;
}
