//! Replace `Call` nodes with the parameter-block calling discipline.
//!
//! The caller allocates the callee's parameter block below its stack top,
//! evaluates arguments left to right into `Result` and stores each into its
//! slot, then jumps with `jalr` through `TargetPC`. On return the block is
//! reclaimed; the callee's value is already in `Result`.

use std::rc::Rc;

use crate::ir::code::{asm, block, word, Chunk, Code, ProcId, Procedure};
use crate::CompileError;

use super::instruction::{Instr, Reg};

pub struct ElimCalls {
    param_chunks: Vec<Chunk>,
    entry_labels: Vec<String>,
}

impl ElimCalls {
    pub fn new(procedures: &[Procedure]) -> ElimCalls {
        ElimCalls {
            param_chunks: procedures.iter().map(|p| p.param_chunk()).collect(),
            entry_labels: procedures.iter().map(|p| p.entry_label.clone()).collect(),
        }
    }

    pub fn rewrite(&self, code: &Rc<Code>) -> Result<Rc<Code>, CompileError> {
        match code.as_ref() {
            Code::Block(items) => {
                let items = items.iter().map(|c| self.rewrite(c)).collect::<Result<_, _>>()?;
                Ok(block(items))
            }
            Code::BinOp { op, lhs, rhs } => Ok(Rc::new(Code::BinOp {
                op: *op,
                lhs: self.rewrite(lhs)?,
                rhs: self.rewrite(rhs)?,
            })),
            Code::If { cond, then_code, else_code } => Ok(Rc::new(Code::If {
                cond: self.rewrite(cond)?,
                then_code: self.rewrite(then_code)?,
                else_code: self.rewrite(else_code)?,
            })),
            Code::While { cond, body } => Ok(Rc::new(Code::While {
                cond: self.rewrite(cond)?,
                body: self.rewrite(body)?,
            })),
            Code::Call { proc, args } => self.lower_call(*proc, args),
            _ => Ok(code.clone()),
        }
    }

    fn lower_call(&self, proc: ProcId, args: &[Rc<Code>]) -> Result<Rc<Code>, CompileError> {
        let chunk = &self.param_chunks[proc];
        if args.len() != chunk.variables.len() {
            return Err(CompileError::Codegen {
                message: format!(
                    "call provides {} argument(s) for a {}-slot parameter block",
                    args.len(),
                    chunk.variables.len()
                ),
            });
        }

        let mut items = vec![
            asm(Instr::Lis { d: Reg::Scratch }),
            word(chunk.bytes()),
            asm(Instr::Sub { d: Reg::StackPtr, s: Reg::StackPtr, t: Reg::Scratch }),
        ];

        for (slot, arg) in chunk.variables.iter().zip(args) {
            items.push(self.rewrite(arg)?);
            items.push(chunk.store(Reg::StackPtr, slot, Reg::Result).ok_or_else(|| {
                CompileError::Codegen {
                    message: format!("parameter {} missing from its block", slot.name),
                }
            })?);
        }

        items.push(asm(Instr::Lis { d: Reg::TargetPC }));
        items.push(Rc::new(Code::UseLabel(self.entry_labels[proc].clone())));
        items.push(asm(Instr::Jalr { s: Reg::TargetPC }));

        // Reclaim the parameter block.
        items.push(asm(Instr::Lis { d: Reg::Scratch }));
        items.push(word(chunk.bytes()));
        items.push(asm(Instr::Add { d: Reg::StackPtr, s: Reg::StackPtr, t: Reg::Scratch }));

        Ok(block(items))
    }
}
