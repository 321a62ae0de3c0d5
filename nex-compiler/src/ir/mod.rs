// Keep the node types reachable as `crate::ir::*`
pub mod code;
pub use code::*;

pub mod ir_generator;
pub mod symbol_table;
pub mod types;

pub use types::NLType;
