use crate::core::{LoopLevel, ScalarType};
use crate::graph::{Expr, Node, Var};
use crate::param::ConfigParameter;
use crate::pipeline::{BuildContext, Generator, PipelineView, ScheduleContext, SchemaBuilder, TwoStage};
use crate::port::{PortDecl, TypeArg};
use anyhow::Result;
use pipegen_macros::RegisterGenerator;

pub const MODE_LOW: i64 = 0;
pub const MODE_HIGH: i64 = 1;

/// Declares one of every parameter kind and port shape.
#[derive(Debug, Default, RegisterGenerator)]
#[generator(name = "metadata_tester")]
pub struct MetadataTester;

impl Generator for MetadataTester {
    fn describe(&self, schema: &mut SchemaBuilder) {
        schema
            .param(ConfigParameter::scalar_type("input_type", ScalarType::Float(32)))
            .param(ConfigParameter::int("array_count", 2).range(0, 4))
            .param(ConfigParameter::enumeration(
                "mode",
                "Mode",
                [("low", MODE_LOW), ("high", MODE_HIGH)],
                MODE_LOW,
            ))
            .param(ConfigParameter::float32("gain", 1.5).range(0.0, 10.0))
            .param(ConfigParameter::bool("flip", false))
            .param(ConfigParameter::loop_level("compute_level", LoopLevel::Undefined))
            .input(PortDecl::node("typed_input", TypeArg::param("input_type"), 2))
            .input(PortDecl::scalar("scalar_in", ScalarType::Float(32)).default_value(1.0).range(0.0, 10.0))
            .input(PortDecl::node("array_input", ScalarType::UInt(8), 2).array("array_count"))
            .input(PortDecl::scalar("array_scalar", ScalarType::Int(32)).array(2))
            .output(PortDecl::tuple(
                "output",
                [TypeArg::param("input_type"), ScalarType::Float(32).into()],
                2,
            ))
            .output(PortDecl::node("array_output", ScalarType::Float(32), 2).array("array_count"))
            .output(PortDecl::scalar("total", ScalarType::Float(32)));
    }

    fn as_two_stage(&mut self) -> Option<&mut dyn TwoStage> {
        Some(self)
    }
}

impl TwoStage for MetadataTester {
    fn generate(&mut self, ctx: &mut BuildContext<'_>) -> Result<()> {
        let (x, y) = (Var::new("x"), Var::new("y"));
        let f32_ty = ScalarType::Float(32);

        let typed = ctx.input_node("typed_input")?;
        let sample = if ctx.bool_param("flip")? {
            typed.at([&y, &x])
        } else {
            typed.at([&x, &y])
        };
        let scale = match ctx.enum_param("mode")? {
            MODE_HIGH => 2.0,
            _ => 1.0,
        };
        let gain = Expr::constant(ctx.float_param("gain")? * scale, f32_ty);
        let scalar_in = ctx.input_expr("scalar_in")?;

        let output = Node::new("output");
        output.define(
            &[x.clone(), y.clone()],
            [sample.clone(), Expr::cast(f32_ty, sample) * gain * scalar_in.clone()],
        )?;
        ctx.set_output("output", &output)?;

        let offsets = ctx.input_exprs("array_scalar")?.to_vec();
        let array_output = ctx
            .input_nodes("array_input")?
            .iter()
            .enumerate()
            .map(|(i, input)| {
                let node = Node::new(format!("array_output_{}", i));
                let offset = Expr::cast(f32_ty, offsets[i % offsets.len()].clone());
                node.define_value(
                    &[x.clone(), y.clone()],
                    Expr::cast(f32_ty, input.at([&x, &y])) + offset,
                )?;
                Ok(node)
            })
            .collect::<Result<Vec<_>>>()?;
        ctx.set_outputs("array_output", array_output)?;

        let total = offsets
            .iter()
            .fold(scalar_in, |acc, offset| acc + Expr::cast(f32_ty, offset.clone()));
        ctx.set_scalar_output("total", total)?;
        Ok(())
    }

    fn schedule(&mut self, ctx: &ScheduleContext<'_>) -> Result<()> {
        let output = ctx.output_node("output")?;
        match ctx.loop_level_param("compute_level")? {
            LoopLevel::Undefined => output.compute_root(),
            level => output.compute_at(level),
        };
        for node in ctx.output_nodes("array_output")? {
            node.compute_root();
        }
        Ok(())
    }
}
