//! Generator declarations and the per-instance construction lifecycle.

pub mod backend;
pub mod context;
pub mod definition;
pub mod generator;
pub mod schema;
pub mod signature;
pub mod state;

pub use backend::{Backend, FinalizedPipeline};
pub use context::{BuildContext, PipelineView, ScheduleContext};
pub use definition::PipelineDefinition;
pub use generator::{BuildShape, Generator, SingleStage, TwoStage};
pub use schema::{SchemaBuilder, TARGET_PARAM};
pub use signature::{Argument, ArgumentKind, Signature, USER_CONTEXT_ARG};
pub use state::Phase;
