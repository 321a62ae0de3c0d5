//! Parse-tree to typed-IR lowering.
//!
//! Two phases: `extract_fns` gathers every procedure signature into the
//! global scope first (so mutually recursive calls type-check), then each
//! body is lowered with its parameters pre-bound in a fresh scope.

pub mod context;
pub mod expr;
pub mod stmt;

use std::rc::Rc;

use log::debug;

pub use context::{Gen, TypedExpr};

use crate::frontend::grammar::{NonTerminal, Symbol};
use crate::frontend::parser::ParseNode;
use crate::CompileError;

use super::code::{Code, ProcId, Procedure};
use super::symbol_table::SymbolEntry;
use super::types::NLType;

/// A lowered compilation unit, ready for the backend passes.
pub struct ProgramIr {
    pub procedures: Vec<Procedure>,
    /// String-literal pool: one labelled word block per literal.
    pub static_data: Vec<Rc<Code>>,
    pub main: ProcId,
}

/// Lower a parse tree rooted at `s` into procedures plus static data.
pub fn generate(root: &ParseNode) -> Result<ProgramIr, CompileError> {
    if root.symbol != Symbol::NT(NonTerminal::S) || root.children.len() != 3 {
        return Err(CompileError::InvalidProduction { symbol: format!("{}", root.symbol) });
    }

    let mut fn_nodes = Vec::new();
    collect_fn_nodes(&root.children[1], &mut fn_nodes)?;
    debug!("lowering {} procedure(s)", fn_nodes.len());

    let mut gen = Gen::new();
    for node in &fn_nodes {
        gen.extract_fn(node)?;
    }
    for (index, node) in fn_nodes.iter().enumerate() {
        gen.visit_fn(node, index)?;
    }

    let main = match gen.symbols.lookup("main") {
        Some(SymbolEntry::Procedure { proc, params, .. }) => {
            if params.as_slice() != [NLType::I32, NLType::I32] {
                return Err(CompileError::TypeMismatch {
                    line: fn_nodes[*proc].line,
                    message: "main must take exactly two i32 parameters".to_string(),
                });
            }
            *proc
        }
        _ => {
            return Err(CompileError::Name {
                line: root.line,
                message: "no procedure named main".to_string(),
            });
        }
    };

    Ok(ProgramIr { procedures: gen.procedures, static_data: gen.static_data, main })
}

fn collect_fn_nodes<'t>(
    node: &'t ParseNode,
    out: &mut Vec<&'t ParseNode>,
) -> Result<(), CompileError> {
    match node.rhs() {
        [Symbol::NT(NonTerminal::Fn), Symbol::NT(NonTerminal::Fns)] => {
            out.push(&node.children[0]);
            collect_fn_nodes(&node.children[1], out)
        }
        [Symbol::NT(NonTerminal::Fn)] => {
            out.push(&node.children[0]);
            Ok(())
        }
        _ => Err(CompileError::InvalidProduction { symbol: format!("{}", node.symbol) }),
    }
}
