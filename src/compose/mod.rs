//! Embedding one pipeline inside another's body.

pub mod wrapper;

pub use wrapper::Composed;
