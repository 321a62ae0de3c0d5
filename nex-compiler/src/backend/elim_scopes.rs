//! Collect the local variables of a procedure for frame layout.
//!
//! Nested source scopes are merged into one flat list — locals never share
//! storage. The pass leaves the tree untouched, so running it on its own
//! output is a no-op.

use std::rc::Rc;

use crate::ir::code::{Code, Procedure, Variable};

pub struct ElimScopes {
    skip: Vec<Rc<Variable>>,
    locals: Vec<Rc<Variable>>,
}

impl ElimScopes {
    /// Parameters and the three reserved slots are not locals.
    pub fn new(proc: &Procedure) -> ElimScopes {
        let mut skip = proc.parameters.clone();
        skip.push(proc.param_ptr.clone());
        skip.push(proc.dynamic_link.clone());
        skip.push(proc.saved_pc.clone());
        ElimScopes { skip, locals: Vec::new() }
    }

    pub fn visit(&mut self, code: &Rc<Code>) -> Rc<Code> {
        match code.as_ref() {
            Code::Block(items) => {
                for item in items {
                    self.visit(item);
                }
            }
            Code::BinOp { lhs, rhs, .. } => {
                self.visit(lhs);
                self.visit(rhs);
            }
            Code::If { cond, then_code, else_code } => {
                self.visit(cond);
                self.visit(then_code);
                self.visit(else_code);
            }
            Code::While { cond, body } => {
                self.visit(cond);
                self.visit(body);
            }
            Code::Call { args, .. } => {
                for arg in args {
                    self.visit(arg);
                }
            }
            Code::VarAccess { var, .. } => {
                let known = self.skip.iter().chain(&self.locals).any(|v| v == var);
                if !known {
                    self.locals.push(var.clone());
                }
            }
            _ => {}
        }
        code.clone()
    }

    /// The collected locals, in first-access order.
    pub fn locals(self) -> Vec<Rc<Variable>> {
        self.locals
    }
}
