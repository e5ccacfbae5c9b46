use super::ScalarSpec;
use crate::core::ScalarType;
use crate::error::{PipelineError, Result};
use crate::graph::{Expr, Node};
use serde::Serialize;
use std::fmt;

/// Port direction (input or output)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PortKind {
    Scalar,
    Node,
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => f.write_str("scalar"),
            Self::Node => f.write_str("node"),
        }
    }
}

/// A concrete argument for one entry of an input port
#[derive(Debug, Clone)]
pub enum Binding {
    Scalar(Expr),
    Node(Node),
}

impl Binding {
    fn kind(&self) -> PortKind {
        match self {
            Self::Scalar(_) => PortKind::Scalar,
            Self::Node(_) => PortKind::Node,
        }
    }
}

impl From<Node> for Binding {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl From<&Node> for Binding {
    fn from(node: &Node) -> Self {
        Self::Node(node.clone())
    }
}

impl From<Expr> for Binding {
    fn from(expr: Expr) -> Self {
        Self::Scalar(expr)
    }
}

macro_rules! scalar_binding {
    ($($t:ty),*) => {
        $(impl From<$t> for Binding {
            fn from(v: $t) -> Self {
                Self::Scalar(Expr::from(v))
            }
        })*
    };
}

scalar_binding!(bool, i32, f32, f64);

/// The bindings for one declared input, one per array entry
pub type InputGroup = Vec<Binding>;

/// Populated contents of a port
#[derive(Debug, Clone)]
pub enum PortData {
    Unbound,
    Values(Vec<Expr>),
    Nodes(Vec<Node>),
}

/// A materialized port: shape fully resolved, contents bound or pending.
#[derive(Debug, Clone)]
pub struct Port {
    name: String,
    direction: Direction,
    kind: PortKind,
    types: Vec<ScalarType>,
    dimensions: usize,
    arity: usize,
    is_array: bool,
    scalar: Option<ScalarSpec>,
    data: PortData,
}

impl Port {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: String,
        direction: Direction,
        kind: PortKind,
        types: Vec<ScalarType>,
        dimensions: usize,
        arity: usize,
        is_array: bool,
        scalar: Option<ScalarSpec>,
    ) -> Self {
        Self {
            name,
            direction,
            kind,
            types,
            dimensions,
            arity,
            is_array,
            scalar,
            data: PortData::Unbound,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn kind(&self) -> PortKind {
        self.kind
    }

    pub fn types(&self) -> &[ScalarType] {
        &self.types
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn is_array(&self) -> bool {
        self.is_array
    }

    pub fn scalar_spec(&self) -> Option<&ScalarSpec> {
        self.scalar.as_ref()
    }

    pub fn data(&self) -> &PortData {
        &self.data
    }

    pub fn is_bound(&self) -> bool {
        !matches!(self.data, PortData::Unbound)
    }

    /// The name of entry `index`; array entries are suffixed with their index.
    pub fn entry_name(&self, index: usize) -> String {
        if self.is_array {
            format!("{}_{}", self.name, index)
        } else {
            self.name.clone()
        }
    }

    /// Binds caller-supplied values to this input.
    pub(crate) fn bind(&mut self, bindings: InputGroup) -> Result<()> {
        if bindings.len() != self.arity {
            return Err(PipelineError::ArityMismatch {
                port: self.name.clone(),
                expected: self.arity,
                found: bindings.len(),
            });
        }
        if let Some(wrong) = bindings.iter().find(|b| b.kind() != self.kind) {
            return Err(self.kind_mismatch(self.kind.to_string(), wrong.kind().to_string()));
        }

        self.data = match self.kind {
            PortKind::Scalar => {
                let values = bindings
                    .into_iter()
                    .filter_map(|b| match b {
                        Binding::Scalar(expr) => Some(expr),
                        Binding::Node(_) => None,
                    })
                    .map(|expr| self.coerce_scalar(expr))
                    .collect::<Result<Vec<_>>>()?;
                PortData::Values(values)
            }
            PortKind::Node => {
                let nodes: Vec<Node> = bindings
                    .into_iter()
                    .filter_map(|b| match b {
                        Binding::Node(node) => Some(node),
                        Binding::Scalar(_) => None,
                    })
                    .collect();
                for node in &nodes {
                    self.check_node_shape(node)?;
                }
                PortData::Nodes(nodes)
            }
        };
        Ok(())
    }

    /// Binds run-time placeholders for a top-level instance that was never bound.
    pub(crate) fn bind_placeholders(&mut self) {
        let entries = 0..self.arity;
        self.data = match self.kind {
            PortKind::Scalar => {
                PortData::Values(entries.map(|i| Expr::param(self.entry_name(i), self.types[0])).collect())
            }
            PortKind::Node => PortData::Nodes(
                entries
                    .map(|i| Node::input_buffer(self.entry_name(i), self.types.clone(), self.dimensions))
                    .collect(),
            ),
        };
    }

    /// Stores the nodes produced for this output by body construction.
    pub(crate) fn populate_nodes(&mut self, nodes: Vec<Node>) -> Result<()> {
        self.check_populate(nodes.len(), PortKind::Node)?;
        for node in &nodes {
            if !node.is_defined() {
                return Err(PipelineError::Definition(format!(
                    "output '{}' was given undefined node '{}'",
                    self.name,
                    node.name()
                )));
            }
            self.check_node_shape(node)?;
        }
        self.data = PortData::Nodes(nodes);
        Ok(())
    }

    /// Stores the values produced for this scalar output by body construction.
    pub(crate) fn populate_values(&mut self, values: Vec<Expr>) -> Result<()> {
        self.check_populate(values.len(), PortKind::Scalar)?;
        let values = values
            .into_iter()
            .map(|expr| self.coerce_scalar(expr))
            .collect::<Result<Vec<_>>>()?;
        self.data = PortData::Values(values);
        Ok(())
    }

    fn check_populate(&self, count: usize, kind: PortKind) -> Result<()> {
        if self.is_bound() {
            return Err(PipelineError::InternalContract(format!(
                "output '{}' populated more than once",
                self.name
            )));
        }
        if kind != self.kind {
            return Err(self.kind_mismatch(self.kind.to_string(), kind.to_string()));
        }
        if count != self.arity {
            return Err(PipelineError::ArityMismatch {
                port: self.name.clone(),
                expected: self.arity,
                found: count,
            });
        }
        Ok(())
    }

    fn check_node_shape(&self, node: &Node) -> Result<()> {
        if node.dimensions() != self.dimensions {
            return Err(self.kind_mismatch(
                format!("{} dimension(s)", self.dimensions),
                format!("node '{}' with {} dimension(s)", node.name(), node.dimensions()),
            ));
        }
        let types = node.types();
        if types != self.types {
            return Err(self.kind_mismatch(
                format!("types {:?}", self.types),
                format!("node '{}' with types {:?}", node.name(), types),
            ));
        }
        Ok(())
    }

    fn coerce_scalar(&self, expr: Expr) -> Result<Expr> {
        let declared = self.types[0];
        let expr = if expr.ty()? == declared {
            expr
        } else {
            Expr::cast(declared, expr)
        };

        if let (Some(value), Some(ScalarSpec { min, max, .. })) = (expr.as_const(), self.scalar) {
            let below = min.is_some_and(|min| value < min);
            let above = max.is_some_and(|max| value > max);
            if below || above {
                return Err(PipelineError::Range {
                    name: self.name.clone(),
                    value: value.to_string(),
                    min: min.map_or_else(|| "-inf".to_string(), |v| v.to_string()),
                    max: max.map_or_else(|| "inf".to_string(), |v| v.to_string()),
                });
            }
        }
        Ok(expr)
    }

    fn kind_mismatch(&self, expected: String, found: String) -> PipelineError {
        PipelineError::KindMismatch {
            port: self.name.clone(),
            expected,
            found,
        }
    }

    pub fn nodes(&self) -> Result<&[Node]> {
        match &self.data {
            PortData::Nodes(nodes) => Ok(nodes),
            PortData::Values(_) => Err(self.kind_mismatch("scalar access".to_string(), "node port".to_string())),
            PortData::Unbound => Err(PipelineError::NotYetBound(self.name.clone())),
        }
    }

    pub fn values(&self) -> Result<&[Expr]> {
        match &self.data {
            PortData::Values(values) => Ok(values),
            PortData::Nodes(_) => Err(self.kind_mismatch("node access".to_string(), "scalar port".to_string())),
            PortData::Unbound => Err(PipelineError::NotYetBound(self.name.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Var;

    fn node_input(arity: usize) -> Port {
        Port::new(
            "images".to_string(),
            Direction::Input,
            PortKind::Node,
            vec![ScalarType::Float(32)],
            1,
            arity,
            true,
            None,
        )
    }

    fn float_node(name: &str) -> Node {
        let x = Var::new("x");
        let node = Node::new(name);
        node.define_value(&[x.clone()], Expr::cast(ScalarType::Float(32), &x)).unwrap();
        node
    }

    #[test]
    fn test_array_binding_keeps_order() {
        let mut port = node_input(2);
        port.bind(vec![float_node("a").into(), float_node("b").into()]).unwrap();

        let names: Vec<String> = port.nodes().unwrap().iter().map(Node::name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(port.entry_name(1), "images_1");
    }

    #[test]
    fn test_arity_and_kind_mismatch() {
        let mut port = node_input(2);
        assert!(matches!(
            port.bind(vec![float_node("a").into()]),
            Err(PipelineError::ArityMismatch { expected: 2, found: 1, .. })
        ));
        assert!(matches!(
            port.bind(vec![float_node("a").into(), 1.0f32.into()]),
            Err(PipelineError::KindMismatch { .. })
        ));
        assert!(!port.is_bound());
    }

    #[test]
    fn test_scalar_binding_casts_and_checks_range() {
        let mut port = Port::new(
            "float_arg".to_string(),
            Direction::Input,
            PortKind::Scalar,
            vec![ScalarType::Float(32)],
            0,
            1,
            false,
            Some(ScalarSpec {
                default: 1.0,
                min: Some(0.0),
                max: Some(100.0),
            }),
        );
        assert!(matches!(port.bind(vec![250.into()]), Err(PipelineError::Range { .. })));

        port.bind(vec![2.into()]).unwrap();
        let value = &port.values().unwrap()[0];
        assert_eq!(value.ty().unwrap(), ScalarType::Float(32));
        assert_eq!(value.as_const(), Some(2.0));
    }

    #[test]
    fn test_unpopulated_output_is_not_yet_bound() {
        let port = Port::new(
            "f".to_string(),
            Direction::Output,
            PortKind::Node,
            vec![ScalarType::Float(32)],
            1,
            1,
            false,
            None,
        );
        assert!(matches!(port.nodes(), Err(PipelineError::NotYetBound(_))));
    }

    #[test]
    fn test_output_populated_twice_is_contract_error() {
        let mut port = Port::new(
            "f".to_string(),
            Direction::Output,
            PortKind::Node,
            vec![ScalarType::Float(32)],
            1,
            1,
            false,
            None,
        );
        port.populate_nodes(vec![float_node("f")]).unwrap();
        assert!(matches!(
            port.populate_nodes(vec![float_node("f2")]),
            Err(PipelineError::InternalContract(_))
        ));
        assert_eq!(port.nodes().unwrap()[0].name(), "f");
    }
}
