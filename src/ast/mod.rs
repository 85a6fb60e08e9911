//! Abstract Syntax Tree (AST) representation
//!
//! The tree is owned top-down; every node carries a `NodeId` that the
//! resolver uses as the key for elements, constant values and parent links.

mod nodes;
mod printer;
mod validator;
mod visitor;

pub use nodes::*;
pub use printer::*;
pub use validator::validate_positions;
pub use visitor::*;
