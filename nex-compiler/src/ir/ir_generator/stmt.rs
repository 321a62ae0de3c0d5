//! Statement, type, and procedure visitors.

use std::rc::Rc;

use log::trace;

use crate::backend::instruction::{Instr, Reg};
use crate::frontend::grammar::{NonTerminal, Symbol};
use crate::frontend::lexer::Terminal;
use crate::frontend::parser::ParseNode;
use crate::ir::code::{asm, block, jump_to, stack, AccessMode, Code, Procedure, Variable};
use crate::ir::symbol_table::SymbolEntry;
use crate::ir::types::NLType;
use crate::CompileError;

use super::context::{FnSig, FunctionCtx, Gen};
use super::expr::LValue;

impl Gen {
    /// `type → I32 | BOOL | CHAR | * type | ( type )`
    pub fn visit_type(&mut self, node: &ParseNode) -> Result<NLType, CompileError> {
        use NonTerminal::Type;
        use Terminal as T;
        match node.rhs() {
            [Symbol::T(T::I32)] => Ok(NLType::I32),
            [Symbol::T(T::Bool)] => Ok(NLType::Bool),
            [Symbol::T(T::Char)] => Ok(NLType::Char),
            [Symbol::T(T::Star), Symbol::NT(Type)] => {
                Ok(NLType::ptr_to(self.visit_type(&node.children[1])?))
            }
            [Symbol::T(T::LParen), Symbol::NT(Type), Symbol::T(T::RParen)] => {
                self.visit_type(&node.children[1])
            }
            _ => Err(self.invalid_production(node.symbol)),
        }
    }

    /// `vardef → ID : type` as `(name, line, type)`.
    pub fn visit_vardef(&mut self, node: &ParseNode) -> Result<(String, usize, NLType), CompileError> {
        match node.rhs() {
            [Symbol::T(Terminal::Id), Symbol::T(Terminal::Colon), Symbol::NT(NonTerminal::Type)] => {
                let id = &node.children[0];
                let nl_type = self.visit_type(&node.children[2])?;
                Ok((id.lexeme.clone(), id.line, nl_type))
            }
            _ => Err(self.invalid_production(node.symbol)),
        }
    }

    fn visit_optparams(&mut self, node: &ParseNode) -> Result<Vec<(String, usize, NLType)>, CompileError> {
        match node.rhs() {
            [Symbol::NT(NonTerminal::Params)] => self.visit_params(&node.children[0]),
            [] => Ok(Vec::new()),
            _ => Err(self.invalid_production(node.symbol)),
        }
    }

    fn visit_params(&mut self, node: &ParseNode) -> Result<Vec<(String, usize, NLType)>, CompileError> {
        match node.rhs() {
            [Symbol::NT(NonTerminal::VarDef)] => Ok(vec![self.visit_vardef(&node.children[0])?]),
            [Symbol::NT(NonTerminal::VarDef), Symbol::T(Terminal::Comma), Symbol::NT(NonTerminal::Params)] =>
            {
                let mut params = vec![self.visit_vardef(&node.children[0])?];
                params.extend(self.visit_params(&node.children[2])?);
                Ok(params)
            }
            _ => Err(self.invalid_production(node.symbol)),
        }
    }

    /// Phase one: record the signature and bind the procedure name, so later
    /// bodies can call procedures defined in either order.
    pub fn extract_fn(&mut self, node: &ParseNode) -> Result<(), CompileError> {
        let (name_node, params_node, ret) = self.fn_header(node)?;
        let name = name_node.lexeme.clone();
        let params = self.visit_optparams(params_node)?;

        let param_vars: Vec<Rc<Variable>> =
            params.iter().map(|(pname, _, _)| Variable::fresh(pname.as_str())).collect();
        let param_types: Vec<NLType> = params.iter().map(|(_, _, t)| t.clone()).collect();

        let index = self.procedures.len();
        self.procedures.push(Procedure::new(&name, index, param_vars));
        self.fn_sigs.push(FnSig { params, ret: ret.clone() });

        let entry = SymbolEntry::Procedure { proc: index, params: param_types, ret };
        if self.symbols.declare(name.clone(), entry).is_err() {
            return Err(self.name_error(name_node.line, format!("redefinition of {name}")));
        }
        Ok(())
    }

    /// Phase two: lower the body with parameters bound in a fresh scope.
    pub fn visit_fn(&mut self, node: &ParseNode, index: usize) -> Result<(), CompileError> {
        let stmts_node = self.fn_body(node)?;
        trace!("lowering body of {}", self.procedures[index].name);

        self.symbols.push_scope();
        for (position, (pname, pline, ptype)) in self.fn_sigs[index].params.clone().into_iter().enumerate() {
            let var = self.procedures[index].parameters[position].clone();
            let entry = SymbolEntry::Variable { var, nl_type: ptype };
            if self.symbols.declare(pname.clone(), entry).is_err() {
                self.symbols.pop_scope();
                return Err(self.name_error(pline, format!("duplicate parameter {pname}")));
            }
        }

        self.fn_ctx = Some(FunctionCtx {
            ret: self.fn_sigs[index].ret.clone(),
            epilogue_label: self.procedures[index].epilogue_label.clone(),
        });
        let body = self.visit_stmts(stmts_node);
        self.fn_ctx = None;
        self.symbols.pop_scope();

        self.procedures[index].code = body?;
        Ok(())
    }

    /// Split a `fn` node into name, `optparams`, and return type.
    fn fn_header<'t>(
        &mut self,
        node: &'t ParseNode,
    ) -> Result<(&'t ParseNode, &'t ParseNode, NLType), CompileError> {
        use NonTerminal as N;
        use Terminal as T;
        match node.rhs() {
            // fn ID ( optparams ) -> type { stmts }
            [Symbol::T(T::Fn), Symbol::T(T::Id), Symbol::T(T::LParen), Symbol::NT(N::OptParams), Symbol::T(T::RParen), Symbol::T(T::Arrow), Symbol::NT(N::Type), Symbol::T(T::LBrace), Symbol::NT(N::Stmts), Symbol::T(T::RBrace)] =>
            {
                let ret = self.visit_type(&node.children[6])?;
                Ok((&node.children[1], &node.children[3], ret))
            }
            // fn ID ( optparams ) { stmts }
            [Symbol::T(T::Fn), Symbol::T(T::Id), Symbol::T(T::LParen), Symbol::NT(N::OptParams), Symbol::T(T::RParen), Symbol::T(T::LBrace), Symbol::NT(N::Stmts), Symbol::T(T::RBrace)] => {
                Ok((&node.children[1], &node.children[3], NLType::None))
            }
            _ => Err(self.invalid_production(node.symbol)),
        }
    }

    fn fn_body<'t>(&mut self, node: &'t ParseNode) -> Result<&'t ParseNode, CompileError> {
        match node.rhs().len() {
            10 => Ok(&node.children[8]),
            8 => Ok(&node.children[6]),
            _ => Err(self.invalid_production(node.symbol)),
        }
    }

    pub fn visit_stmts(&mut self, node: &ParseNode) -> Result<Rc<Code>, CompileError> {
        match node.rhs() {
            [Symbol::NT(NonTerminal::Stmt)] => self.visit_stmt(&node.children[0]),
            [Symbol::NT(NonTerminal::Stmt), Symbol::NT(NonTerminal::Stmts)] => {
                let head = self.visit_stmt(&node.children[0])?;
                let tail = self.visit_stmts(&node.children[1])?;
                Ok(block(vec![head, tail]))
            }
            _ => Err(self.invalid_production(node.symbol)),
        }
    }

    pub fn visit_stmt(&mut self, node: &ParseNode) -> Result<Rc<Code>, CompileError> {
        use NonTerminal as N;
        use Terminal as T;

        match node.rhs() {
            // let vardef = expr ;
            [Symbol::T(T::Let), Symbol::NT(N::VarDef), Symbol::T(T::Assign), Symbol::NT(N::Expr), Symbol::T(T::Semi)] =>
            {
                let (name, line, declared) = self.visit_vardef(&node.children[1])?;
                let value = self.visit_expr(&node.children[3])?;
                if value.nl_type != declared {
                    return Err(self.type_error(
                        line,
                        format!(
                            "let {name}: {declared} initialised with a value of type {}",
                            value.nl_type
                        ),
                    ));
                }

                let var = Variable::fresh(name.as_str());
                let entry = SymbolEntry::Variable { var: var.clone(), nl_type: declared };
                if self.symbols.declare(name.clone(), entry).is_err() {
                    return Err(self.name_error(line, format!("redefinition of {name}")));
                }

                Ok(block(vec![
                    value.code,
                    Rc::new(Code::VarAccess { var, reg: Reg::Result, mode: AccessMode::Write }),
                ]))
            }

            // expr = expr ;
            [Symbol::NT(N::Expr), Symbol::T(T::Assign), Symbol::NT(N::Expr), Symbol::T(T::Semi)] => {
                let target = self.resolve_lvalue(&node.children[0])?;
                match target {
                    LValue::Var { name, line } => {
                        let (var, declared) = match self.symbols.lookup(name) {
                            Some(SymbolEntry::Variable { var, nl_type }) => {
                                (var.clone(), nl_type.clone())
                            }
                            Some(_) => {
                                return Err(
                                    self.name_error(line, format!("{name} is not assignable"))
                                );
                            }
                            None => {
                                return Err(self
                                    .name_error(line, format!("use of unbound name {name}")));
                            }
                        };
                        let value = self.visit_expr(&node.children[2])?;
                        if value.nl_type != declared {
                            return Err(self.type_error(
                                line,
                                format!(
                                    "cannot assign a value of type {} to {name}: {declared}",
                                    value.nl_type
                                ),
                            ));
                        }
                        Ok(block(vec![
                            value.code,
                            Rc::new(Code::VarAccess {
                                var,
                                reg: Reg::Result,
                                mode: AccessMode::Write,
                            }),
                        ]))
                    }
                    LValue::Deref(pointer_node) => {
                        let pointer = self.visit_expr(pointer_node)?;
                        let Some(pointee) = pointer.nl_type.pointee().cloned() else {
                            return Err(self.type_error(
                                node.line,
                                format!("cannot store through a value of type {}", pointer.nl_type),
                            ));
                        };
                        let value = self.visit_expr(&node.children[2])?;
                        if value.nl_type != pointee {
                            return Err(self.type_error(
                                node.line,
                                format!(
                                    "cannot store a value of type {} through *{pointee}",
                                    value.nl_type
                                ),
                            ));
                        }
                        // Address first, value second, store through the peeked address.
                        Ok(block(vec![
                            pointer.code,
                            stack::push(Reg::Result),
                            value.code,
                            stack::peek(Reg::Scratch),
                            asm(Instr::Sw { t: Reg::Result, offset: 0, s: Reg::Scratch }),
                            stack::discard(),
                        ]))
                    }
                }
            }

            // expr ;
            [Symbol::NT(N::Expr), Symbol::T(T::Semi)] => {
                Ok(self.visit_expr(&node.children[0])?.code)
            }

            // if ( expr ) { stmts } else { stmts }
            [Symbol::T(T::If), Symbol::T(T::LParen), Symbol::NT(N::Expr), Symbol::T(T::RParen), Symbol::T(T::LBrace), Symbol::NT(N::Stmts), Symbol::T(T::RBrace), Symbol::T(T::Else), Symbol::T(T::LBrace), Symbol::NT(N::Stmts), Symbol::T(T::RBrace)] =>
            {
                let cond = self.visit_expr(&node.children[2])?;
                if !cond.nl_type.is_truthy() {
                    return Err(self.type_error(
                        node.line,
                        format!("if condition must be i32 or bool, got {}", cond.nl_type),
                    ));
                }

                self.symbols.push_scope();
                let then_code = self.visit_stmts(&node.children[5]);
                self.symbols.pop_scope();

                self.symbols.push_scope();
                let else_code = self.visit_stmts(&node.children[9]);
                self.symbols.pop_scope();

                Ok(Rc::new(Code::If {
                    cond: cond.code,
                    then_code: then_code?,
                    else_code: else_code?,
                }))
            }

            // while ( expr ) { stmts }
            [Symbol::T(T::While), Symbol::T(T::LParen), Symbol::NT(N::Expr), Symbol::T(T::RParen), Symbol::T(T::LBrace), Symbol::NT(N::Stmts), Symbol::T(T::RBrace)] =>
            {
                let cond = self.visit_expr(&node.children[2])?;
                if !cond.nl_type.is_truthy() {
                    return Err(self.type_error(
                        node.line,
                        format!("while condition must be i32 or bool, got {}", cond.nl_type),
                    ));
                }

                self.symbols.push_scope();
                let body = self.visit_stmts(&node.children[5]);
                self.symbols.pop_scope();

                Ok(Rc::new(Code::While { cond: cond.code, body: body? }))
            }

            // return expr ;
            [Symbol::T(T::Ret), Symbol::NT(N::Expr), Symbol::T(T::Semi)] => {
                let value = self.visit_expr(&node.children[1])?;
                let Some(ctx) = &self.fn_ctx else {
                    return Err(self.invalid_production(node.symbol));
                };
                if value.nl_type != ctx.ret {
                    return Err(self.type_error(
                        node.line,
                        format!(
                            "return value has type {}, enclosing procedure returns {}",
                            value.nl_type, ctx.ret
                        ),
                    ));
                }
                let epilogue = ctx.epilogue_label.clone();
                Ok(block(vec![value.code, jump_to(&epilogue)]))
            }

            _ => Err(self.invalid_production(node.symbol)),
        }
    }
}
