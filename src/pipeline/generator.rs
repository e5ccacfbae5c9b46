use super::{BuildContext, ScheduleContext, SchemaBuilder};
use crate::graph::Node;
use anyhow::Result;

/// A parameterized pipeline definition.
///
/// `describe` declares the config parameters and ports, in the order that
/// fixes the calling signature. A generator then provides exactly one build
/// shape by overriding either [`Generator::as_single_stage`] or
/// [`Generator::as_two_stage`]; providing both or neither is rejected when the
/// schema is built.
pub trait Generator {
    fn describe(&self, schema: &mut SchemaBuilder);

    fn as_single_stage(&mut self) -> Option<&mut dyn SingleStage> {
        None
    }

    fn as_two_stage(&mut self) -> Option<&mut dyn TwoStage> {
        None
    }
}

/// Builds the finished, already scheduled graph in one step.
pub trait SingleStage {
    /// Returns the nodes that fill the declared node outputs, in declaration
    /// order. Outputs set through the context are skipped. A generator that
    /// declares no outputs gets one implicit output per returned node.
    fn build(&mut self, ctx: &mut BuildContext<'_>) -> Result<Vec<Node>>;
}

/// Builds the graph first and chooses its execution strategy afterwards.
pub trait TwoStage {
    /// Must populate every declared output through the context.
    fn generate(&mut self, ctx: &mut BuildContext<'_>) -> Result<()>;

    /// Attaches directives to nodes; creates no ports.
    fn schedule(&mut self, ctx: &ScheduleContext<'_>) -> Result<()>;
}

/// Which of the two build shapes a generator provides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildShape {
    SingleStage,
    TwoStage,
}
