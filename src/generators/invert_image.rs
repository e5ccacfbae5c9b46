use crate::core::ScalarType;
use crate::graph::{Expr, Node, Var};
use crate::param::ConfigParameter;
use crate::pipeline::{BuildContext, Generator, PipelineView, SchemaBuilder, SingleStage};
use crate::port::PortDecl;
use anyhow::Result;
use pipegen_macros::RegisterGenerator;

/// `inverted(x, y) = mask - input(x, y)` on 8-bit images, built and scheduled in one step.
#[derive(Debug, Default, RegisterGenerator)]
#[generator(name = "invert_image")]
pub struct InvertImage;

impl Generator for InvertImage {
    fn describe(&self, schema: &mut SchemaBuilder) {
        schema
            .param(ConfigParameter::integer("mask", 8, false, 255))
            .input(PortDecl::node("input", ScalarType::UInt(8), 2))
            .output(PortDecl::node("inverted", ScalarType::UInt(8), 2));
    }

    fn as_single_stage(&mut self) -> Option<&mut dyn SingleStage> {
        Some(self)
    }
}

impl SingleStage for InvertImage {
    fn build(&mut self, ctx: &mut BuildContext<'_>) -> Result<Vec<Node>> {
        let (x, y) = (Var::new("x"), Var::new("y"));
        let input = ctx.input_node("input")?;
        let mask = Expr::constant(ctx.int_param("mask")? as f64, ScalarType::UInt(8));

        let inverted = Node::new("inverted");
        inverted.define_value(&[x.clone(), y.clone()], mask - input.at([&x, &y]))?;
        inverted
            .compute_root()
            .vectorize(&x, ctx.natural_vector_size(ScalarType::UInt(8)));

        Ok(vec![inverted])
    }
}
