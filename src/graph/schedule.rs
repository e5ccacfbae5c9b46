use super::node::NodeBody;
use super::{Node, Var};
use crate::core::LoopLevel;
use crate::error::{PipelineError, Result};

/// An execution-strategy annotation recorded on a node.
///
/// Directives never change what a node computes, only how a backend lowers it.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    ComputeRoot,
    ComputeAt(LoopLevel),
    StoreAt(LoopLevel),
    Parallel(Var),
    Vectorize { var: Var, width: usize },
    Unroll { var: Var, factor: usize },
    Reorder(Vec<Var>),
    Bound { var: Var, min: i64, extent: i64 },
}

impl Directive {
    fn vars(&self) -> Vec<&Var> {
        match self {
            Self::Parallel(var) | Self::Vectorize { var, .. } | Self::Unroll { var, .. } | Self::Bound { var, .. } => {
                vec![var]
            }
            Self::Reorder(vars) => vars.iter().collect(),
            Self::ComputeRoot | Self::ComputeAt(_) | Self::StoreAt(_) => Vec::new(),
        }
    }
}

/// `roots` and every node they depend on, each once.
fn reachable(roots: &[Node]) -> Vec<Node> {
    let mut visited: Vec<Node> = Vec::new();
    let mut stack: Vec<Node> = roots.to_vec();

    while let Some(node) = stack.pop() {
        if visited.iter().any(|seen| seen.ptr_eq(&node)) {
            continue;
        }
        stack.extend(node.dependencies());
        visited.push(node);
    }
    visited
}

/// Checks the directives of `roots` and every node they depend on.
pub(crate) fn validate_schedules(roots: &[Node]) -> Result<()> {
    reachable(roots).iter().try_for_each(validate_node)
}

/// Directive lists of a node graph, captured before a schedule step runs.
pub(crate) struct ScheduleSnapshot(Vec<(Node, Vec<Directive>)>);

impl ScheduleSnapshot {
    pub(crate) fn capture(roots: &[Node]) -> Self {
        Self(
            reachable(roots)
                .into_iter()
                .map(|node| {
                    let directives = node.directives();
                    (node, directives)
                })
                .collect(),
        )
    }

    /// Puts every captured node back to its recorded directives.
    pub(crate) fn restore(self) {
        for (node, directives) in self.0 {
            node.replace_directives(directives);
        }
    }
}

fn validate_node(node: &Node) -> Result<()> {
    let inner = node.borrow_inner();
    let invalid = |detail: String| PipelineError::Definition(format!("schedule of '{}': {}", inner.name, detail));

    for directive in &inner.schedule {
        match directive {
            Directive::ComputeAt(LoopLevel::Undefined) | Directive::StoreAt(LoopLevel::Undefined) => {
                return Err(invalid("loop level is still undefined".to_string()));
            }
            Directive::Vectorize { width: 0, .. } | Directive::Unroll { factor: 0, .. } => {
                return Err(invalid(format!("{:?} needs a positive factor", directive)));
            }
            Directive::Bound { extent, .. } if *extent < 0 => {
                return Err(invalid("bound extent is negative".to_string()));
            }
            _ => {}
        }

        if let NodeBody::Defined { vars, .. } = &inner.body {
            for var in directive.vars() {
                if !vars.contains(var) {
                    return Err(invalid(format!("'{}' is not a variable of this node", var)));
                }
            }
        } else if !directive.vars().is_empty() {
            return Err(invalid("only defined nodes can be scheduled over variables".to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(name: &str, x: &Var) -> Node {
        let node = Node::new(name);
        node.define_value(&[x.clone()], x).unwrap();
        node
    }

    #[test]
    fn test_valid_schedule_passes() {
        let x = Var::new("x");
        let f = identity("f", &x);
        f.compute_root().vectorize(&x, 4).parallel(&x);
        assert!(validate_schedules(&[f]).is_ok());
    }

    #[test]
    fn test_undefined_loop_level_fails() {
        let x = Var::new("x");
        let f = identity("f", &x);
        f.compute_at(LoopLevel::Undefined);
        assert!(matches!(validate_schedules(&[f]), Err(PipelineError::Definition(_))));
    }

    #[test]
    fn test_unknown_var_in_dependency_fails() {
        let x = Var::new("x");
        let inner = identity("inner", &x);
        inner.parallel(&Var::new("y"));
        let outer = Node::new("outer");
        outer.define_value(&[x.clone()], inner.at([&x])).unwrap();

        assert!(validate_schedules(&[outer]).is_err());
    }

    #[test]
    fn test_store_at_unroll_and_bound() {
        let x = Var::new("x");
        let inner = identity("inner", &x);
        let outer = Node::new("outer");
        outer.define_value(&[x.clone()], inner.at([&x]) + 1).unwrap();

        let level = LoopLevel::at("outer", "x");
        inner.store_at(level.clone()).compute_at(level.clone());
        outer.unroll(&x, 2).bound(&x, 0, 8);
        assert!(validate_schedules(&[outer.clone()]).is_ok());

        assert_eq!(inner.directives(), vec![Directive::StoreAt(level.clone()), Directive::ComputeAt(level)]);
        assert_eq!(
            outer.directives(),
            vec![
                Directive::Unroll { var: x.clone(), factor: 2 },
                Directive::Bound { var: x.clone(), min: 0, extent: 8 },
            ]
        );
    }

    #[test]
    fn test_bad_storage_unroll_and_bound_fail() {
        let x = Var::new("x");

        let stored = identity("stored", &x);
        stored.store_at(LoopLevel::Undefined);
        assert!(matches!(validate_schedules(&[stored]), Err(PipelineError::Definition(_))));

        let unrolled = identity("unrolled", &x);
        unrolled.unroll(&x, 0);
        assert!(matches!(validate_schedules(&[unrolled]), Err(PipelineError::Definition(_))));

        let bounded = identity("bounded", &x);
        bounded.bound(&x, 0, -1);
        assert!(matches!(validate_schedules(&[bounded]), Err(PipelineError::Definition(_))));
    }

    #[test]
    fn test_snapshot_restores_every_reachable_node() {
        let x = Var::new("x");
        let inner = identity("inner", &x);
        inner.compute_root();
        let outer = Node::new("outer");
        outer.define_value(&[x.clone()], inner.at([&x])).unwrap();

        let snapshot = ScheduleSnapshot::capture(&[outer.clone()]);
        inner.vectorize(&x, 4);
        outer.compute_root().parallel(&x);
        snapshot.restore();

        assert_eq!(inner.directives(), vec![Directive::ComputeRoot]);
        assert!(outer.directives().is_empty());
    }
}
