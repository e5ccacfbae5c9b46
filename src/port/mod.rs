pub mod decl;
pub mod port;

pub use decl::{IntArg, PortDecl, PortSchema, ScalarSpec, TypeArg};
pub use port::{Binding, Direction, InputGroup, Port, PortData, PortKind};
