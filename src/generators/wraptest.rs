use crate::core::ScalarType;
use crate::graph::{Expr, Node, Var};
use crate::param::ConfigParameter;
use crate::pipeline::{BuildContext, Generator, PipelineView, ScheduleContext, SchemaBuilder, TwoStage};
use crate::port::{PortDecl, TypeArg};
use anyhow::Result;
use pipegen_macros::RegisterGenerator;

/// Two outputs from one typed input:
///
/// - `f(x, y, c) = (input(x, y, c), cast<output_type>(input(x, y, c) * float_arg + int_arg))`
/// - `g(x, y) = cast<int16>(input(x, y, 0))`
#[derive(Debug, Default, RegisterGenerator)]
#[generator(name = "wraptest", wrapper = "Wraptest")]
pub struct Wraptest;

impl Generator for Wraptest {
    fn describe(&self, schema: &mut SchemaBuilder) {
        schema
            .param(ConfigParameter::scalar_type("input_type", ScalarType::UInt(8)))
            .param(ConfigParameter::scalar_type("output_type", ScalarType::Float(32)))
            .param(ConfigParameter::bool("vectorize", false).schedule_scope())
            .input(PortDecl::node("input", TypeArg::param("input_type"), 3))
            .input(
                PortDecl::scalar("float_arg", ScalarType::Float(32))
                    .default_value(1.0)
                    .range(0.0, 100.0),
            )
            .input(PortDecl::scalar("int_arg", ScalarType::Int(32)).default_value(1.0))
            .output(PortDecl::tuple(
                "f",
                [TypeArg::param("input_type"), TypeArg::param("output_type")],
                3,
            ))
            .output(PortDecl::node("g", ScalarType::Int(16), 2));
    }

    fn as_two_stage(&mut self) -> Option<&mut dyn TwoStage> {
        Some(self)
    }
}

impl TwoStage for Wraptest {
    fn generate(&mut self, ctx: &mut BuildContext<'_>) -> Result<()> {
        let (x, y, c) = (Var::new("x"), Var::new("y"), Var::new("c"));
        let input = ctx.input_node("input")?;
        let float_arg = ctx.input_expr("float_arg")?;
        let int_arg = ctx.input_expr("int_arg")?;
        let output_type = ctx.type_param("output_type")?;

        let f = Node::new("f");
        f.define(
            &[x.clone(), y.clone(), c.clone()],
            [
                input.at([&x, &y, &c]),
                Expr::cast(output_type, input.at([&x, &y, &c]) * float_arg + int_arg),
            ],
        )?;

        let g = Node::new("g");
        g.define_value(
            &[x.clone(), y.clone()],
            Expr::cast(ScalarType::Int(16), input.at([Expr::from(&x), Expr::from(&y), Expr::from(0)])),
        )?;

        ctx.set_output("f", &f)?;
        ctx.set_output("g", &g)?;
        Ok(())
    }

    fn schedule(&mut self, ctx: &ScheduleContext<'_>) -> Result<()> {
        let f = ctx.output_node("f")?;
        let g = ctx.output_node("g")?;
        f.compute_root();
        g.compute_root();

        if ctx.bool_param("vectorize")? {
            let x = Var::new("x");
            f.vectorize(&x, ctx.natural_vector_size(ctx.type_param("output_type")?));
            g.vectorize(&x, ctx.natural_vector_size(ScalarType::Int(16)));
        }
        Ok(())
    }
}
