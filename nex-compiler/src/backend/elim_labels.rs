//! Resolve symbolic labels in the flat instruction list.
//!
//! Two passes: collect each `DefineLabel`'s position (4 bytes per real
//! instruction), then rewrite `UseLabel` to the absolute byte address and
//! `BeqLabel`/`BneLabel` to PC-relative branches. A label that is used but
//! never defined is fatal.

use std::collections::HashMap;
use std::rc::Rc;

use crate::ir::code::{asm, word, Code};
use crate::CompileError;

use super::instruction::{branch_offset, Instr};

pub fn elim_labels(items: Vec<Rc<Code>>) -> Result<Vec<Rc<Code>>, CompileError> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut index = 0;
    for item in &items {
        match item.as_ref() {
            Code::DefineLabel(label) => {
                if positions.insert(label, index).is_some() {
                    return Err(CompileError::Codegen {
                        message: format!("label {label} defined twice"),
                    });
                }
            }
            _ => index += 1,
        }
    }

    let lookup = |label: &str| {
        positions.get(label).copied().ok_or_else(|| CompileError::Codegen {
            message: format!("label {label} referenced but never defined"),
        })
    };

    let mut out = Vec::with_capacity(index);
    let mut index = 0;
    for item in &items {
        match item.as_ref() {
            Code::DefineLabel(_) => {}
            Code::UseLabel(label) => {
                let target = lookup(label)?;
                out.push(word(4 * target as u32));
                index += 1;
            }
            Code::BeqLabel { lhs, rhs, label } => {
                let offset = branch_offset(index, lookup(label)?)?;
                out.push(asm(Instr::Beq { s: *lhs, t: *rhs, offset }));
                index += 1;
            }
            Code::BneLabel { lhs, rhs, label } => {
                let offset = branch_offset(index, lookup(label)?)?;
                out.push(asm(Instr::Bne { s: *lhs, t: *rhs, offset }));
                index += 1;
            }
            _ => {
                out.push(item.clone());
                index += 1;
            }
        }
    }

    Ok(out)
}
