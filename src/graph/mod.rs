//! Minimal symbolic graph consumed by pipeline bodies.
//!
//! A [`Node`] is a ref-counted handle to a lazily defined, multi-dimensional
//! function. Body code defines nodes from [`Expr`] trees, schedule code
//! attaches [`Directive`]s, and [`realize`] evaluates a node point by point
//! into [`Buffer`]s.

pub mod buffer;
pub mod eval;
pub mod expr;
pub mod node;
pub mod schedule;

pub use buffer::{Buffer, Realization};
pub use eval::realize;
pub use expr::{BinaryOp, Expr, Var};
pub use node::Node;
pub use schedule::Directive;
