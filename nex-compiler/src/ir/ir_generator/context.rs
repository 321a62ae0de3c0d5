use std::rc::Rc;

use crate::ir::code::{Code, Procedure};
use crate::ir::symbol_table::{ModuleTable, SymbolTable};
use crate::ir::types::NLType;
use crate::CompileError;

/// IR paired with the static type of the value it leaves in `Result`.
#[derive(Debug, Clone)]
pub struct TypedExpr {
    pub code: Rc<Code>,
    pub nl_type: NLType,
}

/// Per-procedure lowering state while a body is being visited.
pub struct FunctionCtx {
    pub ret: NLType,
    pub epilogue_label: String,
}

/// Signature recorded during extraction, consumed when the body is visited.
pub struct FnSig {
    pub params: Vec<(String, usize, NLType)>,
    pub ret: NLType,
}

/// The lowering context threaded through every visitor.
pub struct Gen {
    pub procedures: Vec<Procedure>,
    pub fn_sigs: Vec<FnSig>,
    pub static_data: Vec<Rc<Code>>,
    pub symbols: SymbolTable,
    pub modules: ModuleTable,
    pub fn_ctx: Option<FunctionCtx>,
    label_count: usize,
}

impl Gen {
    pub fn new() -> Gen {
        Gen {
            procedures: Vec::new(),
            fn_sigs: Vec::new(),
            static_data: Vec::new(),
            symbols: SymbolTable::new(),
            modules: ModuleTable::with_prelude(),
            fn_ctx: None,
            label_count: 0,
        }
    }

    pub fn fresh_label(&mut self, stem: &str) -> String {
        let label = format!("{stem}_{}", self.label_count);
        self.label_count += 1;
        label
    }

    pub fn name_error(&self, line: usize, message: impl Into<String>) -> CompileError {
        CompileError::Name { line, message: message.into() }
    }

    pub fn type_error(&self, line: usize, message: impl Into<String>) -> CompileError {
        CompileError::TypeMismatch { line, message: message.into() }
    }

    pub fn invalid_production(&self, symbol: impl std::fmt::Display) -> CompileError {
        CompileError::InvalidProduction { symbol: symbol.to_string() }
    }
}
