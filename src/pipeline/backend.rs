use super::Signature;
use crate::core::Target;
use crate::graph::Node;
use crate::port::Port;

/// Everything a code generation backend consumes from a scheduled pipeline.
#[derive(Debug, Clone)]
pub struct FinalizedPipeline {
    pub name: Option<String>,
    pub signature: Signature,
    pub outputs: Vec<Port>,
    pub target: Target,
}

impl FinalizedPipeline {
    /// Output nodes in signature order, array entries expanded.
    pub fn output_nodes(&self) -> Vec<Node> {
        self.outputs
            .iter()
            .filter_map(|port| port.nodes().ok())
            .flat_map(|nodes| nodes.iter().cloned())
            .collect()
    }
}

/// Consumer of finalized pipelines; emission itself lives outside this crate.
pub trait Backend {
    type Output;

    fn compile(&mut self, pipeline: &FinalizedPipeline) -> anyhow::Result<Self::Output>;
}
