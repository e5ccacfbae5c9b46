//! Reference point-wise evaluator.
//!
//! Every output coordinate is computed by recursively evaluating the
//! definitions it depends on. Schedules are ignored: they never change
//! results, only the strategy a real backend would use.

use super::buffer::for_each_coordinate;
use super::node::NodeBody;
use super::{BinaryOp, Buffer, Expr, Node, Realization, Var};
use crate::error::{PipelineError, Result};

/// Evaluates every value of `node` over `[0, extent)` in each dimension.
pub fn realize(node: &Node, extents: &[usize]) -> Result<Realization> {
    if node.dimensions() != extents.len() {
        return Err(PipelineError::Realize(format!(
            "'{}' has {} dimension(s), got {} extent(s)",
            node.name(),
            node.dimensions(),
            extents.len()
        )));
    }

    let mut buffers = Vec::new();
    for (index, ty) in node.types().into_iter().enumerate() {
        let mut buffer = Buffer::new(ty, extents);
        let mut failure = None;
        let data = buffer.data_mut();
        for_each_coordinate(extents, |offset, coords| {
            if failure.is_some() {
                return;
            }
            match eval_node(node, index, coords) {
                Ok(value) => data[offset] = value,
                Err(e) => failure = Some(e),
            }
        });
        if let Some(e) = failure {
            return Err(e);
        }
        buffers.push(buffer);
    }

    log::debug!("realized '{}' over {:?}", node.name(), extents);
    Ok(Realization::new(buffers))
}

fn eval_node(node: &Node, index: usize, coords: &[i64]) -> Result<f64> {
    let inner = node.borrow_inner();
    match &inner.body {
        NodeBody::Defined { vars, values, types } => {
            if coords.len() != vars.len() {
                return Err(PipelineError::Realize(format!(
                    "'{}' called with {} argument(s), expects {}",
                    inner.name,
                    coords.len(),
                    vars.len()
                )));
            }
            let value = values.get(index).ok_or_else(|| {
                PipelineError::Realize(format!("'{}' has no value {}", inner.name, index))
            })?;
            let env: Vec<(&Var, i64)> = vars.iter().zip(coords.iter().copied()).collect();
            Ok(types[index].normalize(eval_expr(value, &env)?))
        }
        NodeBody::Buffer(buffer) => {
            if index != 0 {
                return Err(PipelineError::Realize(format!("'{}' has no value {}", inner.name, index)));
            }
            buffer.get(coords).ok_or_else(|| {
                PipelineError::Realize(format!("access to '{}' at {:?} is out of bounds", inner.name, coords))
            })
        }
        NodeBody::Input { .. } => Err(PipelineError::Realize(format!(
            "input '{}' is not bound to a value",
            inner.name
        ))),
        NodeBody::Undefined => Err(PipelineError::Realize(format!("'{}' is undefined", inner.name))),
    }
}

fn eval_expr(expr: &Expr, env: &[(&Var, i64)]) -> Result<f64> {
    match expr {
        Expr::Const { value, .. } => Ok(*value),
        Expr::Var(var) => env
            .iter()
            .find(|(bound, _)| *bound == var)
            .map(|(_, coord)| *coord as f64)
            .ok_or_else(|| PipelineError::Realize(format!("free variable '{}'", var))),
        Expr::Param { name, .. } => Err(PipelineError::Realize(format!(
            "runtime parameter '{}' has no value",
            name
        ))),
        Expr::Call { node, args, index } => {
            let coords = args
                .iter()
                .map(|arg| eval_expr(arg, env).map(|v| v.floor() as i64))
                .collect::<Result<Vec<_>>>()?;
            eval_node(node, *index, &coords)
        }
        Expr::Binary { op, lhs, rhs } => {
            let ty = expr.ty()?;
            let (a, b) = (eval_expr(lhs, env)?, eval_expr(rhs, env)?);
            let raw = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div if ty.is_float() => a / b,
                // Integer division rounds toward negative infinity; division by zero yields zero.
                BinaryOp::Div if b == 0.0 => 0.0,
                BinaryOp::Div => (a / b).floor(),
                BinaryOp::Min => a.min(b),
                BinaryOp::Max => a.max(b),
            };
            Ok(ty.normalize(raw))
        }
        Expr::Cast { ty, value } => Ok(ty.normalize(eval_expr(value, env)?)),
    }
}
