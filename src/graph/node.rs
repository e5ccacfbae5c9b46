use super::{Buffer, Directive, Expr, Var};
use crate::core::{LoopLevel, ScalarType};
use crate::error::{PipelineError, Result};
use std::cell::{Ref, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

pub(crate) enum NodeBody {
    Undefined,
    Defined {
        vars: Vec<Var>,
        values: Vec<Expr>,
        types: Vec<ScalarType>,
    },
    /// Externally supplied buffer with no values at build time
    Input { types: Vec<ScalarType>, dimensions: usize },
    Buffer(Buffer),
}

pub(crate) struct NodeInner {
    pub(crate) name: String,
    pub(crate) body: NodeBody,
    pub(crate) schedule: Vec<Directive>,
}

/// Handle to a symbolic, lazily defined, multi-dimensional function.
///
/// Clones share the same function; the graph is single-threaded.
#[derive(Clone)]
pub struct Node {
    inner: Rc<RefCell<NodeInner>>,
}

impl Node {
    fn with_body(name: impl Into<String>, body: NodeBody) -> Self {
        Self {
            inner: Rc::new(RefCell::new(NodeInner {
                name: name.into(),
                body,
                schedule: Vec::new(),
            })),
        }
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self::with_body(name, NodeBody::Undefined)
    }

    /// A placeholder for a buffer supplied by the caller at run time.
    pub fn input_buffer(name: impl Into<String>, types: Vec<ScalarType>, dimensions: usize) -> Self {
        Self::with_body(name, NodeBody::Input { types, dimensions })
    }

    pub fn from_buffer(name: impl Into<String>, buffer: Buffer) -> Self {
        Self::with_body(name, NodeBody::Buffer(buffer))
    }

    /// Defines the node as one or more values (a tuple) over `vars`.
    pub fn define(&self, vars: &[Var], values: impl IntoIterator<Item = Expr>) -> Result<()> {
        let values: Vec<Expr> = values.into_iter().collect();
        let name = self.name();

        if values.is_empty() {
            return Err(PipelineError::Definition(format!("'{}' must define at least one value", name)));
        }
        let unique: HashSet<&Var> = vars.iter().collect();
        if unique.len() != vars.len() {
            return Err(PipelineError::Definition(format!("'{}' repeats a variable", name)));
        }
        // Typing also rejects calls into nodes that are not defined yet, which keeps the graph acyclic.
        let types = values.iter().map(Expr::ty).collect::<Result<Vec<_>>>()?;

        let mut inner = self.inner.borrow_mut();
        if !matches!(inner.body, NodeBody::Undefined) {
            return Err(PipelineError::Definition(format!("'{}' is already defined", name)));
        }
        inner.body = NodeBody::Defined {
            vars: vars.to_vec(),
            values,
            types,
        };
        Ok(())
    }

    /// Single-valued shorthand for [`Node::define`].
    pub fn define_value(&self, vars: &[Var], value: impl Into<Expr>) -> Result<()> {
        self.define(vars, [value.into()])
    }

    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    pub fn is_defined(&self) -> bool {
        !matches!(self.inner.borrow().body, NodeBody::Undefined)
    }

    pub fn dimensions(&self) -> usize {
        match &self.inner.borrow().body {
            NodeBody::Undefined => 0,
            NodeBody::Defined { vars, .. } => vars.len(),
            NodeBody::Input { dimensions, .. } => *dimensions,
            NodeBody::Buffer(buffer) => buffer.dimensions(),
        }
    }

    pub fn types(&self) -> Vec<ScalarType> {
        match &self.inner.borrow().body {
            NodeBody::Undefined => Vec::new(),
            NodeBody::Defined { types, .. } => types.clone(),
            NodeBody::Input { types, .. } => types.clone(),
            NodeBody::Buffer(buffer) => vec![buffer.ty()],
        }
    }

    /// Value 0 of this node at the given coordinates.
    pub fn at<E: Into<Expr>>(&self, args: impl IntoIterator<Item = E>) -> Expr {
        self.value_at(0, args)
    }

    /// Tuple element `index` of this node at the given coordinates.
    pub fn value_at<E: Into<Expr>>(&self, index: usize, args: impl IntoIterator<Item = E>) -> Expr {
        Expr::Call {
            node: self.clone(),
            args: args.into_iter().map(Into::into).collect(),
            index,
        }
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn borrow_inner(&self) -> Ref<'_, NodeInner> {
        self.inner.borrow()
    }

    fn push_directive(&self, directive: Directive) -> &Self {
        self.inner.borrow_mut().schedule.push(directive);
        self
    }

    pub fn compute_root(&self) -> &Self {
        self.push_directive(Directive::ComputeRoot)
    }

    pub fn compute_at(&self, level: LoopLevel) -> &Self {
        self.push_directive(Directive::ComputeAt(level))
    }

    pub fn store_at(&self, level: LoopLevel) -> &Self {
        self.push_directive(Directive::StoreAt(level))
    }

    pub fn parallel(&self, var: &Var) -> &Self {
        self.push_directive(Directive::Parallel(var.clone()))
    }

    pub fn vectorize(&self, var: &Var, width: usize) -> &Self {
        self.push_directive(Directive::Vectorize {
            var: var.clone(),
            width,
        })
    }

    pub fn unroll(&self, var: &Var, factor: usize) -> &Self {
        self.push_directive(Directive::Unroll {
            var: var.clone(),
            factor,
        })
    }

    pub fn reorder(&self, vars: &[Var]) -> &Self {
        self.push_directive(Directive::Reorder(vars.to_vec()))
    }

    pub fn bound(&self, var: &Var, min: i64, extent: i64) -> &Self {
        self.push_directive(Directive::Bound {
            var: var.clone(),
            min,
            extent,
        })
    }

    pub fn directives(&self) -> Vec<Directive> {
        self.inner.borrow().schedule.clone()
    }

    pub(crate) fn replace_directives(&self, directives: Vec<Directive>) {
        self.inner.borrow_mut().schedule = directives;
    }

    /// Nodes this node's definition calls, in first-use order.
    pub fn dependencies(&self) -> Vec<Node> {
        let mut found = Vec::new();
        if let NodeBody::Defined { values, .. } = &self.inner.borrow().body {
            for value in values {
                collect_calls(value, &mut found);
            }
        }
        found
    }
}

fn collect_calls(expr: &Expr, found: &mut Vec<Node>) {
    match expr {
        Expr::Call { node, args, .. } => {
            if !found.iter().any(|n| n.ptr_eq(node)) {
                found.push(node.clone());
            }
            for arg in args {
                collect_calls(arg, found);
            }
        }
        Expr::Binary { lhs, rhs, .. } => {
            collect_calls(lhs, found);
            collect_calls(rhs, found);
        }
        Expr::Cast { value, .. } => collect_calls(value, found),
        Expr::Const { .. } | Expr::Var(_) | Expr::Param { .. } => {}
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        let state = match inner.body {
            NodeBody::Undefined => "undefined",
            NodeBody::Defined { .. } => "defined",
            NodeBody::Input { .. } => "input",
            NodeBody::Buffer(_) => "buffer",
        };
        f.debug_struct("Node")
            .field("name", &inner.name)
            .field("state", &state)
            .field("directives", &inner.schedule.len())
            .finish()
    }
}
