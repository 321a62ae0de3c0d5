//! Scoped name environments.

use std::collections::HashMap;
use std::rc::Rc;

use super::code::{ProcId, Variable};
use super::types::NLType;

/// What a name is bound to.
#[derive(Debug, Clone)]
pub enum SymbolEntry {
    Variable { var: Rc<Variable>, nl_type: NLType },
    Procedure { proc: ProcId, params: Vec<NLType>, ret: NLType },
    Constant { value: u32, nl_type: NLType },
}

/// A stack of scopes. Lookup walks outward; insertion targets the top scope
/// and reports the existing binding on a name collision.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<HashMap<String, SymbolEntry>>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable { scopes: vec![HashMap::new()] }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Bind `name` in the top scope. Fails if the top scope already binds it,
    /// returning the existing entry.
    pub fn declare(&mut self, name: String, entry: SymbolEntry) -> Result<(), SymbolEntry> {
        let top = self.scopes.last_mut().expect("symbol table always has a scope");
        if let Some(existing) = top.get(&name) {
            return Err(existing.clone());
        }
        top.insert(name, entry);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&SymbolEntry> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }
}

/// Module name → exported bindings; resolves prelude intrinsics. The built-in
/// table ships an empty `prelude` module — the language surface has no
/// heap-initialisation form, so no intrinsic procedures are registered.
#[derive(Debug, Default)]
pub struct ModuleTable {
    modules: HashMap<String, HashMap<String, SymbolEntry>>,
}

impl ModuleTable {
    pub fn with_prelude() -> ModuleTable {
        let mut modules = HashMap::new();
        modules.insert("prelude".to_string(), HashMap::new());
        ModuleTable { modules }
    }

    pub fn register(&mut self, module: &str, name: String, entry: SymbolEntry) {
        self.modules.entry(module.to_string()).or_default().insert(name, entry);
    }

    pub fn lookup(&self, module: &str, name: &str) -> Option<&SymbolEntry> {
        self.modules.get(module)?.get(name)
    }
}
