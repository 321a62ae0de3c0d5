//! Rewrite `VarAccess` nodes into frame-relative memory operations.
//!
//! Locals (and reserved slots) live in the frame chunk, addressed off
//! `FramePtr`. Parameters live in the caller-allocated block, reached by
//! first loading `param_ptr` from the frame into `Scratch`.

use std::rc::Rc;

use crate::ir::code::{asm, block, word, AccessMode, Chunk, Code, Variable};
use crate::CompileError;

use super::instruction::{Instr, Reg};

pub struct ElimVarsProc {
    frame: Chunk,
    param_chunk: Chunk,
    param_ptr: Rc<Variable>,
}

impl ElimVarsProc {
    pub fn new(frame: Chunk, param_chunk: Chunk, param_ptr: Rc<Variable>) -> ElimVarsProc {
        ElimVarsProc { frame, param_chunk, param_ptr }
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
            Code::VarAccess { var, reg, mode } => self.lower_access(var, *reg, *mode),
            _ => Ok(code.clone()),
        }
    }

    fn lower_access(
        &self,
        var: &Rc<Variable>,
        reg: Reg,
        mode: AccessMode,
    ) -> Result<Rc<Code>, CompileError> {
        if let Some(offset) = self.frame.offset_of(var) {
            return Ok(match mode {
                AccessMode::Read => asm(Instr::Lw { t: reg, offset, s: Reg::FramePtr }),
                AccessMode::Write => asm(Instr::Sw { t: reg, offset, s: Reg::FramePtr }),
                AccessMode::Address => block(vec![
                    asm(Instr::Lis { d: reg }),
                    word(offset as u32),
                    asm(Instr::Add { d: reg, s: Reg::FramePtr, t: reg }),
                ]),
            });
        }

        if let Some(offset) = self.param_chunk.offset_of(var) {
            let load_param_ptr = self
                .frame
                .load(Reg::FramePtr, Reg::Scratch, &self.param_ptr)
                .ok_or_else(|| CompileError::Codegen {
                    message: "param_ptr missing from the frame chunk".to_string(),
                })?;
            return Ok(match mode {
                AccessMode::Read => block(vec![
                    load_param_ptr,
                    asm(Instr::Lw { t: reg, offset, s: Reg::Scratch }),
                ]),
                AccessMode::Write => block(vec![
                    load_param_ptr,
                    asm(Instr::Sw { t: reg, offset, s: Reg::Scratch }),
                ]),
                AccessMode::Address => block(vec![
                    load_param_ptr,
                    asm(Instr::Lis { d: reg }),
                    word(offset as u32),
                    asm(Instr::Add { d: reg, s: Reg::Scratch, t: reg }),
                ]),
            });
        }

        Err(CompileError::Codegen {
            message: format!("variable {} has no storage in this procedure", var.name),
        })
    }
}
