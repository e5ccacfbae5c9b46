use super::{Direction, Port, PortKind};
use crate::core::{validate_name, ScalarType};
use crate::error::{PipelineError, Result};
use crate::param::{ConfigParameter, ConfigValue, ParamScope, ValueKind};
use serde::Serialize;
use std::fmt;

/// An element type, literal or read from a type-valued config parameter
#[derive(Debug, Clone, PartialEq)]
pub enum TypeArg {
    Literal(ScalarType),
    Param(String),
}

impl TypeArg {
    pub fn param(name: impl Into<String>) -> Self {
        Self::Param(name.into())
    }
}

impl fmt::Display for TypeArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(t) => write!(f, "{}", t),
            Self::Param(name) => write!(f, "${}", name),
        }
    }
}

impl From<ScalarType> for TypeArg {
    fn from(t: ScalarType) -> Self {
        Self::Literal(t)
    }
}

/// A dimension count or array arity, literal or read from an int config parameter
#[derive(Debug, Clone, PartialEq)]
pub enum IntArg {
    Literal(usize),
    Param(String),
}

impl IntArg {
    pub fn param(name: impl Into<String>) -> Self {
        Self::Param(name.into())
    }
}

impl fmt::Display for IntArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(v) => write!(f, "{}", v),
            Self::Param(name) => write!(f, "${}", name),
        }
    }
}

impl From<usize> for IntArg {
    fn from(v: usize) -> Self {
        Self::Literal(v)
    }
}

impl From<&str> for IntArg {
    fn from(name: &str) -> Self {
        Self::Param(name.to_string())
    }
}

/// Default and optional bounds of a scalar port
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarSpec {
    pub default: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Metadata describing a declared port, with unresolved references shown as `$param`
#[derive(Debug, Clone, Serialize)]
pub struct PortSchema {
    pub name: String,
    pub kind: PortKind,
    pub types: Vec<String>,
    pub dimensions: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arity: Option<String>,
}

/// The declared shape of a port, before config references are resolved.
#[derive(Debug, Clone)]
pub struct PortDecl {
    pub(crate) name: String,
    pub(crate) direction: Direction,
    pub(crate) kind: PortKind,
    pub(crate) types: Vec<TypeArg>,
    pub(crate) dimensions: IntArg,
    pub(crate) array: Option<IntArg>,
    pub(crate) scalar: Option<ScalarSpec>,
}

impl PortDecl {
    /// A scalar port with a zero default.
    pub fn scalar(name: impl Into<String>, ty: impl Into<TypeArg>) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Input,
            kind: PortKind::Scalar,
            types: vec![ty.into()],
            dimensions: IntArg::Literal(0),
            array: None,
            scalar: Some(ScalarSpec {
                default: 0.0,
                min: None,
                max: None,
            }),
        }
    }

    /// A computation-node port with one value type.
    pub fn node(name: impl Into<String>, ty: impl Into<TypeArg>, dimensions: impl Into<IntArg>) -> Self {
        Self::tuple(name, [ty.into()], dimensions)
    }

    /// A computation-node port whose node carries several values.
    pub fn tuple(
        name: impl Into<String>,
        types: impl IntoIterator<Item = TypeArg>,
        dimensions: impl Into<IntArg>,
    ) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Input,
            kind: PortKind::Node,
            types: types.into_iter().collect(),
            dimensions: dimensions.into(),
            array: None,
            scalar: None,
        }
    }

    pub fn default_value(mut self, value: f64) -> Self {
        if let Some(spec) = self.scalar.as_mut() {
            spec.default = value;
        } else {
            // Rejected in validate(); node ports carry no default.
            self.scalar = Some(ScalarSpec {
                default: value,
                min: None,
                max: None,
            });
        }
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        let spec = self.scalar.get_or_insert(ScalarSpec {
            default: 0.0,
            min: None,
            max: None,
        });
        spec.min = Some(min);
        spec.max = Some(max);
        self
    }

    /// Turns the port into an array of `arity` entries.
    pub fn array(mut self, arity: impl Into<IntArg>) -> Self {
        self.array = Some(arity.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn schema(&self) -> PortSchema {
        PortSchema {
            name: self.name.clone(),
            kind: self.kind,
            types: self.types.iter().map(ToString::to_string).collect(),
            dimensions: self.dimensions.to_string(),
            arity: self.array.as_ref().map(ToString::to_string),
        }
    }

    pub(crate) fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Checks the declaration against the parameters it may reference.
    pub(crate) fn validate(&self, params: &[ConfigParameter]) -> Result<()> {
        validate_name(&self.name)?;
        let contract = |detail: String| PipelineError::InternalContract(format!("port '{}': {}", self.name, detail));

        if self.types.is_empty() {
            return Err(contract("declares no element type".to_string()));
        }
        match self.kind {
            PortKind::Scalar => {
                if self.types.len() != 1 {
                    return Err(contract("a scalar port has exactly one type".to_string()));
                }
                if let Some(ScalarSpec {
                    default,
                    min: Some(min),
                    max: Some(max),
                }) = self.scalar
                {
                    if self.direction == Direction::Output {
                        return Err(contract("only scalar inputs may declare a range".to_string()));
                    }
                    if !(min <= default && default <= max) {
                        return Err(PipelineError::Range {
                            name: self.name.clone(),
                            value: default.to_string(),
                            min: min.to_string(),
                            max: max.to_string(),
                        });
                    }
                }
            }
            PortKind::Node => {
                if self.scalar.is_some() {
                    return Err(contract("node ports carry no default or range".to_string()));
                }
                if self.direction == Direction::Input && self.types.len() != 1 {
                    return Err(contract("node inputs have exactly one type".to_string()));
                }
            }
        }

        for ty in &self.types {
            if let TypeArg::Param(param) = ty {
                find_param(params, param, &self.name, |kind| matches!(kind, ValueKind::Type))?;
            }
        }
        for arg in [Some(&self.dimensions), self.array.as_ref()].into_iter().flatten() {
            if let IntArg::Param(param) = arg {
                find_param(params, param, &self.name, |kind| matches!(kind, ValueKind::Int { .. }))?;
            }
        }
        Ok(())
    }

    /// Resolves config references into a concrete, unpopulated port.
    pub(crate) fn materialize(&self, params: &[ConfigParameter]) -> Result<Port> {
        let types = self
            .types
            .iter()
            .map(|ty| match ty {
                TypeArg::Literal(t) => Ok(*t),
                TypeArg::Param(param) => {
                    let p = find_param(params, param, &self.name, |kind| matches!(kind, ValueKind::Type))?;
                    p.value().as_type().ok_or_else(|| self.unresolved(param))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let dimensions = self.resolve_int(&self.dimensions, params)?;
        let arity = match &self.array {
            Some(arity) => self.resolve_int(arity, params)?,
            None => 1,
        };

        Ok(Port::new(
            self.name.clone(),
            self.direction,
            self.kind,
            types,
            dimensions,
            arity,
            self.array.is_some(),
            self.scalar,
        ))
    }

    fn resolve_int(&self, arg: &IntArg, params: &[ConfigParameter]) -> Result<usize> {
        match arg {
            IntArg::Literal(v) => Ok(*v),
            IntArg::Param(param) => {
                let p = find_param(params, param, &self.name, |kind| matches!(kind, ValueKind::Int { .. }))?;
                match p.value() {
                    ConfigValue::Int(v) if *v >= 0 => usize::try_from(*v).map_err(|_| self.unresolved(param)),
                    ConfigValue::Int(v) => Err(PipelineError::Range {
                        name: param.clone(),
                        value: v.to_string(),
                        min: "0".to_string(),
                        max: usize::MAX.to_string(),
                    }),
                    _ => Err(self.unresolved(param)),
                }
            }
        }
    }

    fn unresolved(&self, param: &str) -> PipelineError {
        PipelineError::InternalContract(format!("port '{}' cannot resolve parameter '{}'", self.name, param))
    }
}

fn find_param<'a>(
    params: &'a [ConfigParameter],
    name: &str,
    port: &str,
    accepts: impl Fn(&ValueKind) -> bool,
) -> Result<&'a ConfigParameter> {
    let param = params.iter().find(|p| p.name() == name).ok_or_else(|| {
        PipelineError::InternalContract(format!("port '{}' references unknown parameter '{}'", port, name))
    })?;
    if !accepts(param.kind()) {
        return Err(PipelineError::InternalContract(format!(
            "port '{}' cannot take its shape from {} parameter '{}'",
            port,
            param.kind(),
            name
        )));
    }
    // Shapes are fixed when inputs are bound; later changes would leave them stale.
    if param.scope() != ParamScope::Build {
        return Err(PipelineError::InternalContract(format!(
            "port '{}' cannot take its shape from schedule parameter '{}'",
            port, name
        )));
    }
    Ok(param)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Vec<ConfigParameter> {
        vec![
            ConfigParameter::scalar_type("input_type", ScalarType::UInt(8)),
            ConfigParameter::int("levels", 3),
            ConfigParameter::bool("flag", false),
        ]
    }

    #[test]
    fn test_materialize_resolves_params() {
        let decl = PortDecl::node("pyramid", TypeArg::param("input_type"), 2)
            .array("levels")
            .with_direction(Direction::Output);
        decl.validate(&params()).unwrap();

        let port = decl.materialize(&params()).unwrap();
        assert_eq!(port.types(), &[ScalarType::UInt(8)]);
        assert_eq!(port.dimensions(), 2);
        assert_eq!(port.arity(), 3);
        assert!(port.is_array());
    }

    #[test]
    fn test_schedule_scope_shape_argument_is_contract_error() {
        let params = vec![
            ConfigParameter::int("levels", 3).schedule_scope(),
            ConfigParameter::scalar_type("input_type", ScalarType::UInt(8)).schedule_scope(),
        ];

        let arity = PortDecl::node("pyramid", ScalarType::Float(32), 2)
            .array("levels")
            .with_direction(Direction::Output);
        assert!(matches!(arity.validate(&params), Err(PipelineError::InternalContract(_))));

        let dims = PortDecl::node("input", ScalarType::Float(32), "levels");
        assert!(matches!(dims.validate(&params), Err(PipelineError::InternalContract(_))));

        let typed = PortDecl::node("input", TypeArg::param("input_type"), 2);
        assert!(matches!(typed.validate(&params), Err(PipelineError::InternalContract(_))));
    }

    #[test]
    fn test_unknown_or_wrong_kind_reference_is_contract_error() {
        let unknown = PortDecl::node("input", TypeArg::param("missing"), 2);
        assert!(matches!(unknown.validate(&params()), Err(PipelineError::InternalContract(_))));

        let wrong_kind = PortDecl::node("input", ScalarType::Float(32), "flag");
        assert!(matches!(wrong_kind.validate(&params()), Err(PipelineError::InternalContract(_))));
    }

    #[test]
    fn test_schema_shows_references() {
        let schema = PortDecl::node("pyramid", TypeArg::param("input_type"), 2).array("levels").schema();
        assert_eq!(schema.types, vec!["$input_type"]);
        assert_eq!(schema.dimensions, "2");
        assert_eq!(schema.arity.as_deref(), Some("$levels"));
    }

    #[test]
    fn test_node_port_has_no_default() {
        let decl = PortDecl::node("input", ScalarType::Float(32), 2).default_value(1.0);
        assert!(matches!(decl.validate(&params()), Err(PipelineError::InternalContract(_))));
    }

    #[test]
    fn test_scalar_default_must_be_in_range() {
        let decl = PortDecl::scalar("gain", ScalarType::Float(32)).default_value(200.0).range(0.0, 100.0);
        assert!(matches!(decl.validate(&params()), Err(PipelineError::Range { .. })));
    }
}
