//! Expression visitors: typed IR for every precedence layer.

use std::rc::Rc;

use crate::backend::instruction::{Instr, Reg};
use crate::frontend::grammar::{NonTerminal, Symbol};
use crate::frontend::lexer::Terminal;
use crate::frontend::parser::ParseNode;
use crate::ir::code::{asm, block, int_literal, word, AccessMode, BinOpKind, Code};
use crate::ir::symbol_table::SymbolEntry;
use crate::ir::types::NLType;
use crate::CompileError;

use super::context::{Gen, TypedExpr};

/// The shape an assignment target may take.
pub enum LValue<'t> {
    Var { name: &'t str, line: usize },
    Deref(&'t ParseNode),
}

fn binop_kind(terminal: Terminal) -> Option<BinOpKind> {
    match terminal {
        Terminal::Or => Some(BinOpKind::Or),
        Terminal::And => Some(BinOpKind::And),
        Terminal::Eq => Some(BinOpKind::Eq),
        Terminal::Ne => Some(BinOpKind::Ne),
        Terminal::Lt => Some(BinOpKind::Lt),
        Terminal::Le => Some(BinOpKind::Le),
        Terminal::Gt => Some(BinOpKind::Gt),
        Terminal::Ge => Some(BinOpKind::Ge),
        Terminal::Plus => Some(BinOpKind::Add),
        Terminal::Minus => Some(BinOpKind::Sub),
        Terminal::Star => Some(BinOpKind::Mul),
        Terminal::Slash => Some(BinOpKind::Div),
        Terminal::Pct => Some(BinOpKind::Rem),
        _ => None,
    }
}

impl Gen {
    /// Lower an expression node (any of `expr`, `exprp1`..`exprp9`) to typed
    /// IR leaving its value in `Result`.
    pub fn visit_expr(&mut self, node: &ParseNode) -> Result<TypedExpr, CompileError> {
        use NonTerminal::*;
        use Terminal as T;

        let Some(non_terminal) = node.non_terminal() else {
            return Err(self.invalid_production(node.symbol));
        };

        match (non_terminal, node.rhs()) {
            // Prefix `!` — logical negation to 0/1.
            (ExprP7, [Symbol::T(T::Not), Symbol::NT(ExprP8)]) => {
                let operand = self.visit_expr(&node.children[1])?;
                if !operand.nl_type.is_truthy() {
                    return Err(self.type_error(
                        node.line,
                        format!("operator ! requires i32 or bool, got {}", operand.nl_type),
                    ));
                }
                let code = block(vec![
                    operand.code,
                    asm(Instr::Sltu { d: Reg::Result, s: Reg::Zero, t: Reg::Result }),
                    asm(Instr::Lis { d: Reg::Scratch }),
                    word(1),
                    asm(Instr::Sub { d: Reg::Result, s: Reg::Scratch, t: Reg::Result }),
                ]);
                Ok(TypedExpr { code, nl_type: NLType::I32 })
            }

            // Prefix `*` — dereference.
            (ExprP7, [Symbol::T(T::Star), Symbol::NT(ExprP8)]) => {
                let operand = self.visit_expr(&node.children[1])?;
                let Some(pointee) = operand.nl_type.pointee().cloned() else {
                    return Err(self.type_error(
                        node.line,
                        format!("cannot dereference a value of type {}", operand.nl_type),
                    ));
                };
                let code = block(vec![
                    operand.code,
                    asm(Instr::Lw { t: Reg::Result, offset: 0, s: Reg::Result }),
                ]);
                Ok(TypedExpr { code, nl_type: pointee })
            }

            // Postfix `as T` — bit-preserving scalar coercion, no code.
            (ExprP8, [Symbol::NT(ExprP8), Symbol::T(T::As), Symbol::NT(Type)]) => {
                let operand = self.visit_expr(&node.children[0])?;
                let target = self.visit_type(&node.children[2])?;
                if !operand.nl_type.is_scalar() {
                    return Err(self.type_error(
                        node.line,
                        format!("cannot cast a value of type {}", operand.nl_type),
                    ));
                }
                if operand.nl_type.bytes() != target.bytes() {
                    return Err(self.type_error(
                        node.line,
                        format!("cannot cast {} to {}: widths differ", operand.nl_type, target),
                    ));
                }
                Ok(TypedExpr { code: operand.code, nl_type: target })
            }

            (ExprP9, [Symbol::T(T::Id)]) => {
                let id = &node.children[0];
                match self.symbols.lookup(&id.lexeme) {
                    Some(SymbolEntry::Variable { var, nl_type }) => Ok(TypedExpr {
                        code: Rc::new(Code::VarAccess {
                            var: var.clone(),
                            reg: Reg::Result,
                            mode: AccessMode::Read,
                        }),
                        nl_type: nl_type.clone(),
                    }),
                    Some(SymbolEntry::Constant { value, nl_type }) => {
                        Ok(TypedExpr { code: int_literal(*value), nl_type: nl_type.clone() })
                    }
                    Some(SymbolEntry::Procedure { .. }) => Err(self.name_error(
                        id.line,
                        format!("{} is a procedure, not a value", id.lexeme),
                    )),
                    None => Err(self
                        .name_error(id.line, format!("use of unbound name {}", id.lexeme))),
                }
            }

            (ExprP9, [Symbol::T(T::Num)]) => {
                let num = &node.children[0];
                let value: i64 = num.lexeme.parse().unwrap_or(i64::MAX);
                if value > i32::MAX as i64 {
                    return Err(self.type_error(
                        num.line,
                        format!("integer literal {} does not fit in i32", num.lexeme),
                    ));
                }
                Ok(TypedExpr { code: int_literal(value as u32), nl_type: NLType::I32 })
            }

            // `&x` — address of a named variable.
            (ExprP9, [Symbol::T(T::Ampersand), Symbol::T(T::Id)]) => {
                let id = &node.children[1];
                match self.symbols.lookup(&id.lexeme) {
                    Some(SymbolEntry::Variable { var, nl_type }) => Ok(TypedExpr {
                        code: Rc::new(Code::VarAccess {
                            var: var.clone(),
                            reg: Reg::Result,
                            mode: AccessMode::Address,
                        }),
                        nl_type: NLType::ptr_to(nl_type.clone()),
                    }),
                    Some(_) => Err(self.name_error(
                        id.line,
                        format!("& requires a named variable, {} is not one", id.lexeme),
                    )),
                    None => Err(self
                        .name_error(id.line, format!("use of unbound name {}", id.lexeme))),
                }
            }

            (ExprP9, [Symbol::T(T::StrLiteral)]) => {
                let literal = &node.children[0];
                let content = &literal.lexeme[1..literal.lexeme.len() - 1];
                let label = self.fresh_label("str");
                let mut data = vec![Rc::new(Code::DefineLabel(label.clone()))];
                data.extend(content.bytes().map(|b| word(b as u32)));
                data.push(word(0));
                self.static_data.push(block(data));

                let code = block(vec![
                    asm(Instr::Lis { d: Reg::Result }),
                    Rc::new(Code::UseLabel(label)),
                ]);
                Ok(TypedExpr { code, nl_type: NLType::ptr_to(NLType::Char) })
            }

            (ExprP9, [Symbol::T(T::CharLiteral)]) => {
                let literal = &node.children[0];
                let content = &literal.lexeme[1..literal.lexeme.len() - 1];
                if content.len() != 1 {
                    return Err(CompileError::Lexical {
                        line: literal.line,
                        message: format!(
                            "char literal {} must contain exactly one character",
                            literal.lexeme
                        ),
                    });
                }
                let value = content.as_bytes()[0] as u32;
                Ok(TypedExpr { code: int_literal(value), nl_type: NLType::Char })
            }

            (ExprP9, [Symbol::T(T::LParen), Symbol::NT(Expr), Symbol::T(T::RParen)]) => {
                self.visit_expr(&node.children[1])
            }

            // Call.
            (ExprP9, [Symbol::T(T::Id), Symbol::T(T::LParen), Symbol::NT(OptArgs), Symbol::T(T::RParen)]) => {
                let id = &node.children[0];
                let (proc, params, ret) = match self.symbols.lookup(&id.lexeme) {
                    Some(SymbolEntry::Procedure { proc, params, ret }) => {
                        (*proc, params.clone(), ret.clone())
                    }
                    Some(_) => {
                        return Err(self
                            .name_error(id.line, format!("{} is not a procedure", id.lexeme)));
                    }
                    None => {
                        return Err(self.name_error(
                            id.line,
                            format!("call to unbound procedure {}", id.lexeme),
                        ));
                    }
                };

                let args = self.visit_optargs(&node.children[2])?;
                if args.len() != params.len() {
                    return Err(self.type_error(
                        id.line,
                        format!(
                            "{} expects {} argument(s), got {}",
                            id.lexeme,
                            params.len(),
                            args.len()
                        ),
                    ));
                }
                for (index, (arg, param)) in args.iter().zip(&params).enumerate() {
                    if arg.nl_type != *param {
                        return Err(self.type_error(
                            id.line,
                            format!(
                                "argument {} of {} has type {}, expected {}",
                                index + 1,
                                id.lexeme,
                                arg.nl_type,
                                param
                            ),
                        ));
                    }
                }

                let code = Rc::new(Code::Call {
                    proc,
                    args: args.into_iter().map(|a| a.code).collect(),
                });
                Ok(TypedExpr { code, nl_type: ret })
            }

            // Binary operators of the layered precedence levels.
            (_, [Symbol::NT(_), Symbol::T(op), Symbol::NT(_)]) if binop_kind(*op).is_some() => {
                self.visit_binary(node, *op)
            }

            // Unit productions `exprpN → exprpN+1` (and `expr → exprp1`).
            (_, [Symbol::NT(_)]) => self.visit_expr(&node.children[0]),

            _ => Err(self.invalid_production(non_terminal)),
        }
    }

    fn visit_binary(&mut self, node: &ParseNode, op: Terminal) -> Result<TypedExpr, CompileError> {
        let kind = binop_kind(op).ok_or_else(|| self.invalid_production(op))?;
        let line = node.children[1].line;
        let lhs = self.visit_expr(&node.children[0])?;
        let rhs = self.visit_expr(&node.children[2])?;

        match kind {
            BinOpKind::Add
            | BinOpKind::Sub
            | BinOpKind::Mul
            | BinOpKind::Div
            | BinOpKind::Rem
            | BinOpKind::Eq
            | BinOpKind::Ne
            | BinOpKind::Lt
            | BinOpKind::Le
            | BinOpKind::Gt
            | BinOpKind::Ge => {
                if lhs.nl_type != NLType::I32 || rhs.nl_type != NLType::I32 {
                    return Err(self.type_error(
                        line,
                        format!(
                            "operator {} requires i32 operands, got {} and {}",
                            op.name().to_lowercase(),
                            lhs.nl_type,
                            rhs.nl_type
                        ),
                    ));
                }
            }
            BinOpKind::And | BinOpKind::Or => {
                if !lhs.nl_type.is_truthy() || !rhs.nl_type.is_truthy() {
                    return Err(self.type_error(
                        line,
                        format!(
                            "operator {} requires i32 or bool operands, got {} and {}",
                            op.name().to_lowercase(),
                            lhs.nl_type,
                            rhs.nl_type
                        ),
                    ));
                }
            }
        }

        Ok(TypedExpr {
            code: Rc::new(Code::BinOp { op: kind, lhs: lhs.code, rhs: rhs.code }),
            nl_type: NLType::I32,
        })
    }

    pub fn visit_optargs(&mut self, node: &ParseNode) -> Result<Vec<TypedExpr>, CompileError> {
        match node.rhs() {
            [Symbol::NT(NonTerminal::Args)] => self.visit_args(&node.children[0]),
            [] => Ok(Vec::new()),
            _ => Err(self.invalid_production(node.symbol)),
        }
    }

    pub fn visit_args(&mut self, node: &ParseNode) -> Result<Vec<TypedExpr>, CompileError> {
        match node.rhs() {
            [Symbol::NT(NonTerminal::Expr)] => Ok(vec![self.visit_expr(&node.children[0])?]),
            [Symbol::NT(NonTerminal::Expr), Symbol::T(Terminal::Comma), Symbol::NT(NonTerminal::Args)] =>
            {
                let mut args = vec![self.visit_expr(&node.children[0])?];
                args.extend(self.visit_args(&node.children[2])?);
                Ok(args)
            }
            _ => Err(self.invalid_production(node.symbol)),
        }
    }

    /// Classify an expression node as an assignment target: a named variable
    /// or a dereference. Anything else is not assignable.
    pub fn resolve_lvalue<'t>(&self, node: &'t ParseNode) -> Result<LValue<'t>, CompileError> {
        use NonTerminal::*;
        use Terminal as T;

        let Some(non_terminal) = node.non_terminal() else {
            return Err(self.invalid_production(node.symbol));
        };

        match (non_terminal, node.rhs()) {
            (ExprP7, [Symbol::T(T::Star), Symbol::NT(ExprP8)]) => {
                Ok(LValue::Deref(&node.children[1]))
            }
            (ExprP9, [Symbol::T(T::Id)]) => Ok(LValue::Var {
                name: &node.children[0].lexeme,
                line: node.children[0].line,
            }),
            (ExprP9, [Symbol::T(T::LParen), Symbol::NT(Expr), Symbol::T(T::RParen)]) => {
                self.resolve_lvalue(&node.children[1])
            }
            (_, [Symbol::NT(_)]) => self.resolve_lvalue(&node.children[0]),
            _ => Err(self.type_error(node.line, "left side of = is not assignable")),
        }
    }
}
