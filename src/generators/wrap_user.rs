use crate::compose::Composed;
use crate::config::param_values;
use crate::core::ScalarType;
use crate::graph::{Expr, Node, Var};
use crate::param::ConfigParameter;
use crate::pipeline::{BuildContext, Generator, PipelineView, ScheduleContext, SchemaBuilder, TwoStage};
use crate::port::{Binding, PortDecl};
use crate::registry::GeneratorRegistry;
use anyhow::{anyhow, Result};
use pipegen_macros::RegisterGenerator;
use std::sync::Arc;

/// Embeds `wraptest` and combines both of its outputs.
///
/// `wraptest` is looked up in [`GeneratorRegistry::global`] unless the
/// instance was made with [`WrapUser::with_registry`].
#[derive(Debug, Default, RegisterGenerator)]
#[generator(name = "wrap_user")]
pub struct WrapUser {
    registry: Option<Arc<GeneratorRegistry>>,
    inner: Option<Composed>,
}

impl WrapUser {
    pub fn with_registry(registry: Arc<GeneratorRegistry>) -> Self {
        Self {
            registry: Some(registry),
            inner: None,
        }
    }
}

impl Generator for WrapUser {
    fn describe(&self, schema: &mut SchemaBuilder) {
        schema
            .param(ConfigParameter::bool("vectorize", false).schedule_scope())
            .input(PortDecl::node("input", ScalarType::UInt(8), 3))
            .input(PortDecl::scalar("gain", ScalarType::Float(32)).default_value(1.0).range(0.0, 100.0))
            .output(PortDecl::node("calibrated", ScalarType::Float(32), 3));
    }

    fn as_two_stage(&mut self) -> Option<&mut dyn TwoStage> {
        Some(self)
    }
}

impl TwoStage for WrapUser {
    fn generate(&mut self, ctx: &mut BuildContext<'_>) -> Result<()> {
        let (x, y, c) = (Var::new("x"), Var::new("y"), Var::new("c"));

        let registry = self.registry.as_deref().unwrap_or_else(|| GeneratorRegistry::global());
        let inner = Composed::from_registry(
            registry,
            "wraptest",
            &ctx.target(),
            &param_values([("input_type", "uint8"), ("output_type", "float32")]),
            vec![
                vec![ctx.input_node("input")?.into()],
                vec![Binding::from(ctx.input_expr("gain")?)],
                vec![Binding::from(3)],
            ],
        )?;

        let f = inner.node();
        let g = inner.output("g")?;
        let calibrated = Node::new("calibrated");
        calibrated.define_value(
            &[x.clone(), y.clone(), c.clone()],
            f.value_at(1, [&x, &y, &c]) + Expr::cast(ScalarType::Float(32), g.at([&x, &y])),
        )?;

        ctx.set_output("calibrated", &calibrated)?;
        self.inner = Some(inner);
        Ok(())
    }

    fn schedule(&mut self, ctx: &ScheduleContext<'_>) -> Result<()> {
        let inner = self
            .inner
            .as_ref()
            .ok_or_else(|| anyhow!("wraptest was not composed"))?;
        let vectorize = ctx.bool_param("vectorize")?;
        inner.schedule(&param_values([("vectorize", vectorize)]))?;

        let calibrated = ctx.output_node("calibrated")?;
        calibrated.compute_root();
        if vectorize {
            calibrated.vectorize(&Var::new("x"), ctx.natural_vector_size(ScalarType::Float(32)));
        }
        Ok(())
    }
}
