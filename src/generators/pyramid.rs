use crate::core::ScalarType;
use crate::graph::{Expr, Node, Var};
use crate::param::ConfigParameter;
use crate::pipeline::{BuildContext, Generator, PipelineView, ScheduleContext, SchemaBuilder, TwoStage};
use crate::port::PortDecl;
use anyhow::Result;
use pipegen_macros::RegisterGenerator;

/// Box-filtered downsampling pyramid; `levels` sizes the output array.
#[derive(Debug, Default, RegisterGenerator)]
#[generator(name = "pyramid")]
pub struct Pyramid;

impl Generator for Pyramid {
    fn describe(&self, schema: &mut SchemaBuilder) {
        schema
            .param(ConfigParameter::int("levels", 4).range(1, 8))
            .input(PortDecl::node("input", ScalarType::Float(32), 2))
            .output(PortDecl::node("pyramid", ScalarType::Float(32), 2).array("levels"));
    }

    fn as_two_stage(&mut self) -> Option<&mut dyn TwoStage> {
        Some(self)
    }
}

impl TwoStage for Pyramid {
    fn generate(&mut self, ctx: &mut BuildContext<'_>) -> Result<()> {
        let (x, y) = (Var::new("x"), Var::new("y"));
        let input = ctx.input_node("input")?;
        let levels = usize::try_from(ctx.int_param("levels")?)?;

        let base = Node::new("pyramid_0");
        base.define_value(&[x.clone(), y.clone()], input.at([&x, &y]))?;

        let mut pyramid = vec![base];
        for i in 1..levels {
            let prev = &pyramid[i - 1];
            let (x2, y2) = (&x * 2, &y * 2);
            let sum = prev.at([x2.clone(), y2.clone()])
                + prev.at([x2.clone() + 1, y2.clone()])
                + prev.at([x2.clone(), y2.clone() + 1])
                + prev.at([x2 + 1, y2 + 1]);

            let level = Node::new(format!("pyramid_{}", i));
            level.define_value(&[x.clone(), y.clone()], sum / Expr::from(4.0f32))?;
            pyramid.push(level);
        }

        ctx.set_outputs("pyramid", pyramid)?;
        Ok(())
    }

    fn schedule(&mut self, ctx: &ScheduleContext<'_>) -> Result<()> {
        let (x, y) = (Var::new("x"), Var::new("y"));
        let width = ctx.natural_vector_size(ScalarType::Float(32));

        for (i, level) in ctx.output_nodes("pyramid")?.iter().enumerate() {
            level.compute_root();
            if i < 2 {
                level.parallel(&y);
            }
            level.vectorize(&x, width);
        }
        Ok(())
    }
}
