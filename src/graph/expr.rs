use super::Node;
use crate::core::ScalarType;
use crate::error::{PipelineError, Result};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

/// A named dimension of a node's domain
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Var(String);

impl Var {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Min,
    Max,
}

/// A typed scalar expression
#[derive(Debug, Clone)]
pub enum Expr {
    Const { value: f64, ty: ScalarType },
    Var(Var),
    /// A runtime scalar parameter that has no value at build time
    Param { name: String, ty: ScalarType },
    /// Value `index` of `node` evaluated at `args`
    Call { node: Node, args: Vec<Expr>, index: usize },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Cast { ty: ScalarType, value: Box<Expr> },
}

impl Expr {
    /// A constant of the given type; the value is normalized into the type's range.
    pub fn constant(value: f64, ty: ScalarType) -> Self {
        Self::Const {
            value: ty.normalize(value),
            ty,
        }
    }

    pub fn param(name: impl Into<String>, ty: ScalarType) -> Self {
        Self::Param { name: name.into(), ty }
    }

    pub fn cast(ty: ScalarType, value: impl Into<Expr>) -> Self {
        match value.into() {
            Self::Const { value, .. } => Self::constant(value, ty),
            other => Self::Cast {
                ty,
                value: Box::new(other),
            },
        }
    }

    pub fn min(a: impl Into<Expr>, b: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Min, a.into(), b.into())
    }

    pub fn max(a: impl Into<Expr>, b: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Max, a.into(), b.into())
    }

    fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn ty(&self) -> Result<ScalarType> {
        match self {
            Self::Const { ty, .. } | Self::Param { ty, .. } | Self::Cast { ty, .. } => Ok(*ty),
            Self::Var(_) => Ok(ScalarType::Int(32)),
            Self::Call { node, index, .. } => node.types().get(*index).copied().ok_or_else(|| {
                PipelineError::Definition(format!(
                    "call to value {} of '{}', which has {} value(s)",
                    index,
                    node.name(),
                    node.types().len()
                ))
            }),
            Self::Binary { lhs, rhs, .. } => Ok(ScalarType::promote(lhs.ty()?, rhs.ty()?)),
        }
    }

    pub fn as_const(&self) -> Option<f64> {
        match self {
            Self::Const { value, .. } => Some(*value),
            _ => None,
        }
    }
}

impl From<Var> for Expr {
    fn from(v: Var) -> Self {
        Self::Var(v)
    }
}

impl From<&Var> for Expr {
    fn from(v: &Var) -> Self {
        Self::Var(v.clone())
    }
}

impl From<&Expr> for Expr {
    fn from(e: &Expr) -> Self {
        e.clone()
    }
}

impl From<bool> for Expr {
    fn from(v: bool) -> Self {
        Self::constant(if v { 1.0 } else { 0.0 }, ScalarType::Bool)
    }
}

impl From<i32> for Expr {
    fn from(v: i32) -> Self {
        Self::constant(v as f64, ScalarType::Int(32))
    }
}

impl From<f32> for Expr {
    fn from(v: f32) -> Self {
        Self::constant(v as f64, ScalarType::Float(32))
    }
}

impl From<f64> for Expr {
    fn from(v: f64) -> Self {
        Self::constant(v, ScalarType::Float(64))
    }
}

macro_rules! arithmetic_ops {
    ($($lhs:ty),*) => {
        $(
            impl<T: Into<Expr>> Add<T> for $lhs {
                type Output = Expr;
                fn add(self, rhs: T) -> Expr {
                    Expr::binary(BinaryOp::Add, self.into(), rhs.into())
                }
            }

            impl<T: Into<Expr>> Sub<T> for $lhs {
                type Output = Expr;
                fn sub(self, rhs: T) -> Expr {
                    Expr::binary(BinaryOp::Sub, self.into(), rhs.into())
                }
            }

            impl<T: Into<Expr>> Mul<T> for $lhs {
                type Output = Expr;
                fn mul(self, rhs: T) -> Expr {
                    Expr::binary(BinaryOp::Mul, self.into(), rhs.into())
                }
            }

            impl<T: Into<Expr>> Div<T> for $lhs {
                type Output = Expr;
                fn div(self, rhs: T) -> Expr {
                    Expr::binary(BinaryOp::Div, self.into(), rhs.into())
                }
            }
        )*
    };
}

arithmetic_ops!(Expr, Var, &Var);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_arithmetic_promotes_to_float() {
        let x = Var::new("x");
        let e = &x * Expr::from(1.5f32) + 2;
        assert_eq!(e.ty().unwrap(), ScalarType::Float(32));
    }

    #[test]
    fn test_cast_folds_constants() {
        let e = Expr::cast(ScalarType::UInt(8), 300);
        assert_eq!(e.as_const(), Some(44.0));
        assert_eq!(e.ty().unwrap(), ScalarType::UInt(8));
    }
}
