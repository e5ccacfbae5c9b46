//! Read access to a pipeline's parameters and ports for user build and
//! schedule code.

use super::schema::TARGET_PARAM;
use crate::core::{LoopLevel, ScalarType, Target};
use crate::error::{PipelineError, Result};
use crate::graph::{Expr, Node};
use crate::param::{ConfigParameter, ConfigValue};
use crate::port::Port;

/// Lookups shared by the build and schedule contexts.
pub trait PipelineView {
    fn params(&self) -> &[ConfigParameter];
    fn inputs(&self) -> &[Port];
    fn outputs(&self) -> &[Port];

    fn param(&self, name: &str) -> Result<&ConfigParameter> {
        self.params()
            .iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| PipelineError::lookup("parameter", name))
    }

    fn int_param(&self, name: &str) -> Result<i64> {
        let value = typed(self.param(name)?, "integer", ConfigValue::as_int)?;
        i64::try_from(value).map_err(|_| PipelineError::Range {
            name: name.to_string(),
            value: value.to_string(),
            min: i64::MIN.to_string(),
            max: i64::MAX.to_string(),
        })
    }

    fn bool_param(&self, name: &str) -> Result<bool> {
        typed(self.param(name)?, "bool", ConfigValue::as_bool)
    }

    fn float_param(&self, name: &str) -> Result<f64> {
        typed(self.param(name)?, "float", ConfigValue::as_float)
    }

    fn enum_param(&self, name: &str) -> Result<i64> {
        typed(self.param(name)?, "enum", ConfigValue::as_enum)
    }

    fn type_param(&self, name: &str) -> Result<ScalarType> {
        typed(self.param(name)?, "type", ConfigValue::as_type)
    }

    fn loop_level_param(&self, name: &str) -> Result<LoopLevel> {
        typed(self.param(name)?, "loop_level", |v: &ConfigValue| v.as_loop_level().cloned())
    }

    fn target(&self) -> Target {
        self.param(TARGET_PARAM)
            .ok()
            .and_then(|p| p.value().as_target().cloned())
            .unwrap_or_else(Target::host)
    }

    fn natural_vector_size(&self, ty: ScalarType) -> usize {
        self.target().natural_vector_size(ty)
    }

    fn input(&self, name: &str) -> Result<&Port> {
        find_port(self.inputs(), "input", name)
    }

    fn input_node(&self, name: &str) -> Result<Node> {
        single(self.input(name)?, self.input(name)?.nodes()?)
    }

    fn input_nodes(&self, name: &str) -> Result<&[Node]> {
        self.input(name)?.nodes()
    }

    fn input_expr(&self, name: &str) -> Result<Expr> {
        single(self.input(name)?, self.input(name)?.values()?)
    }

    fn input_exprs(&self, name: &str) -> Result<&[Expr]> {
        self.input(name)?.values()
    }

    fn output(&self, name: &str) -> Result<&Port> {
        find_port(self.outputs(), "output", name)
    }

    fn output_node(&self, name: &str) -> Result<Node> {
        single(self.output(name)?, self.output(name)?.nodes()?)
    }

    fn output_nodes(&self, name: &str) -> Result<&[Node]> {
        self.output(name)?.nodes()
    }
}

fn typed<T>(param: &ConfigParameter, expected: &str, get: impl Fn(&ConfigValue) -> Option<T>) -> Result<T> {
    get(param.value()).ok_or_else(|| PipelineError::TypeMismatch {
        name: param.name().to_string(),
        expected: expected.to_string(),
        found: param.value().variant_name().to_string(),
    })
}

fn find_port<'a>(ports: &'a [Port], what: &str, name: &str) -> Result<&'a Port> {
    ports
        .iter()
        .find(|p| p.name() == name)
        .ok_or_else(|| PipelineError::lookup(what, name))
}

fn single<T: Clone>(port: &Port, entries: &[T]) -> Result<T> {
    match entries {
        [only] => Ok(only.clone()),
        _ => Err(PipelineError::ArityMismatch {
            port: port.name().to_string(),
            expected: 1,
            found: entries.len(),
        }),
    }
}

/// Handed to body construction; outputs are populated through it.
pub struct BuildContext<'a> {
    params: &'a [ConfigParameter],
    inputs: &'a [Port],
    outputs: &'a mut Vec<Port>,
}

impl<'a> BuildContext<'a> {
    pub(crate) fn new(params: &'a [ConfigParameter], inputs: &'a [Port], outputs: &'a mut Vec<Port>) -> Self {
        Self { params, inputs, outputs }
    }

    fn output_mut(&mut self, name: &str) -> Result<&mut Port> {
        self.outputs
            .iter_mut()
            .find(|p| p.name() == name)
            .ok_or_else(|| PipelineError::lookup("output", name))
    }

    /// Populates a single node output.
    pub fn set_output(&mut self, name: &str, node: &Node) -> Result<()> {
        self.output_mut(name)?.populate_nodes(vec![node.clone()])
    }

    /// Populates every entry of an array output at once.
    pub fn set_outputs(&mut self, name: &str, nodes: Vec<Node>) -> Result<()> {
        self.output_mut(name)?.populate_nodes(nodes)
    }

    pub fn set_scalar_output(&mut self, name: &str, value: impl Into<Expr>) -> Result<()> {
        self.output_mut(name)?.populate_values(vec![value.into()])
    }
}

impl PipelineView for BuildContext<'_> {
    fn params(&self) -> &[ConfigParameter] {
        self.params
    }

    fn inputs(&self) -> &[Port] {
        self.inputs
    }

    fn outputs(&self) -> &[Port] {
        self.outputs.as_slice()
    }
}

/// Handed to the schedule step; read-only.
pub struct ScheduleContext<'a> {
    params: &'a [ConfigParameter],
    inputs: &'a [Port],
    outputs: &'a [Port],
}

impl<'a> ScheduleContext<'a> {
    pub(crate) fn new(params: &'a [ConfigParameter], inputs: &'a [Port], outputs: &'a [Port]) -> Self {
        Self { params, inputs, outputs }
    }
}

impl PipelineView for ScheduleContext<'_> {
    fn params(&self) -> &[ConfigParameter] {
        self.params
    }

    fn inputs(&self) -> &[Port] {
        self.inputs
    }

    fn outputs(&self) -> &[Port] {
        self.outputs
    }
}
