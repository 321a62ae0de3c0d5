//! Lower structured `If` and `While` nodes to branches and labels.

use std::rc::Rc;

use crate::ir::code::{block, jump_to, Code};
use crate::CompileError;

use super::instruction::Reg;

pub struct ElimIfStmts {
    label_count: usize,
}

impl ElimIfStmts {
    pub fn new() -> ElimIfStmts {
        ElimIfStmts { label_count: 0 }
    }

    fn fresh_label(&mut self, stem: &str) -> String {
        let label = format!("{stem}_{}", self.label_count);
        self.label_count += 1;
        label
    }

    pub fn rewrite(&mut self, code: &Rc<Code>) -> Result<Rc<Code>, CompileError> {
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
            Code::If { cond, then_code, else_code } => {
                let cond = self.rewrite(cond)?;
                let then_code = self.rewrite(then_code)?;
                let else_code = self.rewrite(else_code)?;

                let else_label = self.fresh_label("if_else");
                let end_label = self.fresh_label("if_end");
                Ok(block(vec![
                    cond,
                    Rc::new(Code::BeqLabel {
                        lhs: Reg::Result,
                        rhs: Reg::Zero,
                        label: else_label.clone(),
                    }),
                    then_code,
                    jump_to(&end_label),
                    Rc::new(Code::DefineLabel(else_label)),
                    else_code,
                    Rc::new(Code::DefineLabel(end_label)),
                ]))
            }
            Code::While { cond, body } => {
                let cond = self.rewrite(cond)?;
                let body = self.rewrite(body)?;

                let head_label = self.fresh_label("while_head");
                let end_label = self.fresh_label("while_end");
                Ok(block(vec![
                    Rc::new(Code::DefineLabel(head_label.clone())),
                    cond,
                    Rc::new(Code::BeqLabel {
                        lhs: Reg::Result,
                        rhs: Reg::Zero,
                        label: end_label.clone(),
                    }),
                    body,
                    jump_to(&head_label),
                    Rc::new(Code::DefineLabel(end_label)),
                ]))
            }
            _ => Ok(code.clone()),
        }
    }
}
