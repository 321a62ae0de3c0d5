//! Expand `BinOp` nodes into the spill sequence.
//!
//! The left operand is evaluated into `Result` and pushed; the right operand
//! is evaluated into `Result`; the left value is peeked into `Scratch`; the
//! operator sequence computes into `Result`; the spill slot is discarded.

use std::rc::Rc;

use crate::ir::code::{asm, block, stack, word, BinOpKind, Code};
use crate::CompileError;

use super::instruction::{Instr, Reg};

pub struct ElimBinOps;

impl ElimBinOps {
    pub fn rewrite(&self, code: &Rc<Code>) -> Result<Rc<Code>, CompileError> {
        match code.as_ref() {
            Code::Block(items) => {
                let items = items.iter().map(|c| self.rewrite(c)).collect::<Result<_, _>>()?;
                Ok(block(items))
            }
            Code::BinOp { op, lhs, rhs } => {
                let lhs = self.rewrite(lhs)?;
                let rhs = self.rewrite(rhs)?;
                Ok(block(vec![
                    lhs,
                    stack::push(Reg::Result),
                    rhs,
                    stack::peek(Reg::Scratch),
                    op_sequence(*op),
                    stack::discard(),
                ]))
            }
            Code::If { cond, then_code, else_code } => Ok(Rc::new(Code::If {
                cond: self.rewrite(cond)?,
                then_code: self.rewrite(then_code)?,
                else_code: self.rewrite(else_code)?,
            })),
            Code::While { cond, body } => Ok(Rc::new(Code::While {
                cond: self.rewrite(cond)?,
                body: self.rewrite(body)?,
            })),
            _ => Ok(code.clone()),
        }
    }
}

/// Apply the operator with the left value in `Scratch` and the right value in
/// `Result`, leaving 32-bit wrap-around arithmetic (or 0/1) in `Result`.
fn op_sequence(op: BinOpKind) -> Rc<Code> {
    let one_minus_result = vec![
        asm(Instr::Lis { d: Reg::Scratch }),
        word(1),
        asm(Instr::Sub { d: Reg::Result, s: Reg::Scratch, t: Reg::Result }),
    ];

    match op {
        BinOpKind::Add => asm(Instr::Add { d: Reg::Result, s: Reg::Scratch, t: Reg::Result }),
        BinOpKind::Sub => asm(Instr::Sub { d: Reg::Result, s: Reg::Scratch, t: Reg::Result }),
        BinOpKind::Mul => block(vec![
            asm(Instr::Mult { s: Reg::Scratch, t: Reg::Result }),
            asm(Instr::Mflo { d: Reg::Result }),
        ]),
        BinOpKind::Div => block(vec![
            asm(Instr::Div { s: Reg::Scratch, t: Reg::Result }),
            asm(Instr::Mflo { d: Reg::Result }),
        ]),
        BinOpKind::Rem => block(vec![
            asm(Instr::Div { s: Reg::Scratch, t: Reg::Result }),
            asm(Instr::Mfhi { d: Reg::Result }),
        ]),
        BinOpKind::Lt => asm(Instr::Slt { d: Reg::Result, s: Reg::Scratch, t: Reg::Result }),
        BinOpKind::Gt => asm(Instr::Slt { d: Reg::Result, s: Reg::Result, t: Reg::Scratch }),
        BinOpKind::Le => {
            // !(lhs > rhs)
            let mut items =
                vec![asm(Instr::Slt { d: Reg::Result, s: Reg::Result, t: Reg::Scratch })];
            items.extend(one_minus_result);
            block(items)
        }
        BinOpKind::Ge => {
            // !(lhs < rhs)
            let mut items =
                vec![asm(Instr::Slt { d: Reg::Result, s: Reg::Scratch, t: Reg::Result })];
            items.extend(one_minus_result);
            block(items)
        }
        BinOpKind::Eq => {
            // !(lhs - rhs != 0)
            let mut items = vec![
                asm(Instr::Sub { d: Reg::Result, s: Reg::Scratch, t: Reg::Result }),
                asm(Instr::Sltu { d: Reg::Result, s: Reg::Zero, t: Reg::Result }),
            ];
            items.extend(one_minus_result);
            block(items)
        }
        BinOpKind::Ne => block(vec![
            asm(Instr::Sub { d: Reg::Result, s: Reg::Scratch, t: Reg::Result }),
            asm(Instr::Sltu { d: Reg::Result, s: Reg::Zero, t: Reg::Result }),
        ]),
        BinOpKind::And => block(vec![
            asm(Instr::Sltu { d: Reg::Scratch, s: Reg::Zero, t: Reg::Scratch }),
            asm(Instr::Sltu { d: Reg::Result, s: Reg::Zero, t: Reg::Result }),
            asm(Instr::Mult { s: Reg::Scratch, t: Reg::Result }),
            asm(Instr::Mflo { d: Reg::Result }),
        ]),
        BinOpKind::Or => block(vec![
            asm(Instr::Sltu { d: Reg::Scratch, s: Reg::Zero, t: Reg::Scratch }),
            asm(Instr::Sltu { d: Reg::Result, s: Reg::Zero, t: Reg::Result }),
            asm(Instr::Add { d: Reg::Result, s: Reg::Scratch, t: Reg::Result }),
            asm(Instr::Sltu { d: Reg::Result, s: Reg::Zero, t: Reg::Result }),
        ]),
    }
}
