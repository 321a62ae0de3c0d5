//! Flatten the IR tree into a linear instruction list.
//!
//! Only leaf kinds may remain by this point; a structured node reaching the
//! flattener means a pass was skipped. `DefineLabel` markers stay inline.

use std::fmt::Write as _;
use std::rc::Rc;

use crate::ir::code::Code;
use crate::CompileError;

pub struct Flatten {
    out: Vec<Rc<Code>>,
}

impl Flatten {
    pub fn new() -> Flatten {
        Flatten { out: Vec::new() }
    }

    pub fn visit(&mut self, code: &Rc<Code>) -> Result<(), CompileError> {
        match code.as_ref() {
            Code::Block(items) => {
                for item in items {
                    self.visit(item)?;
                }
                Ok(())
            }
            Code::Assembly(_)
            | Code::Word(_)
            | Code::DefineLabel(_)
            | Code::UseLabel(_)
            | Code::BeqLabel { .. }
            | Code::BneLabel { .. } => {
                self.out.push(code.clone());
                Ok(())
            }
            other => Err(CompileError::Codegen {
                message: format!("unlowered {} reached the flattener", kind_name(other)),
            }),
        }
    }

    pub fn get(self) -> Vec<Rc<Code>> {
        self.out
    }
}

fn kind_name(code: &Code) -> &'static str {
    match code {
        Code::Block(_) => "block",
        Code::BinOp { .. } => "binary operation",
        Code::VarAccess { .. } => "variable access",
        Code::If { .. } => "if statement",
        Code::While { .. } => "while loop",
        Code::Call { .. } => "call",
        Code::DefineLabel(_) => "label definition",
        Code::UseLabel(_) => "label use",
        Code::BeqLabel { .. } => "beq",
        Code::BneLabel { .. } => "bne",
        Code::Assembly(_) => "instruction",
        Code::Word(_) => "word",
    }
}

/// Render a flat list as an assembly listing with symbolic labels.
pub fn listing(items: &[Rc<Code>]) -> String {
    let mut out = String::new();
    for item in items {
        match item.as_ref() {
            Code::DefineLabel(label) => {
                let _ = writeln!(out, "{label}:");
            }
            Code::UseLabel(label) => {
                let _ = writeln!(out, "  .word {label}");
            }
            Code::BeqLabel { lhs, rhs, label } => {
                let _ = writeln!(out, "  beq {lhs}, {rhs}, {label}");
            }
            Code::BneLabel { lhs, rhs, label } => {
                let _ = writeln!(out, "  bne {lhs}, {rhs}, {label}");
            }
            Code::Assembly(instr) => {
                let _ = writeln!(out, "  {instr}");
            }
            Code::Word(value) => {
                let _ = writeln!(out, "  .word 0x{value:08x}");
            }
            other => {
                let _ = writeln!(out, "  ?{}", kind_name(other));
            }
        }
    }
    out
}
