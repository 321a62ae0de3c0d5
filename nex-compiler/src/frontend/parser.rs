//! CYK parsing generalized to productions of arbitrary length.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use log::trace;

use crate::CompileError;

use super::grammar::{Grammar, NonTerminal, Production, Symbol};
use super::lexer::{Terminal, Token};

/// A concrete parse-tree node.
///
/// Internal nodes carry the production applied; the children's symbols equal
/// the production's right-hand side, left to right. Terminal leaves carry the
/// matched lexeme instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNode {
    pub symbol: Symbol,
    pub production: Option<Production>,
    pub children: Vec<ParseNode>,
    pub lexeme: String,
    pub line: usize,
}

impl ParseNode {
    /// The applied production's right-hand side (empty for leaves).
    pub fn rhs(&self) -> &[Symbol] {
        self.production.as_ref().map(|p| p.rhs.as_slice()).unwrap_or(&[])
    }

    pub fn non_terminal(&self) -> Option<NonTerminal> {
        match self.symbol {
            Symbol::NT(nt) => Some(nt),
            Symbol::T(_) => None,
        }
    }

    pub fn terminal(&self) -> Option<Terminal> {
        match self.symbol {
            Symbol::T(t) => Some(t),
            Symbol::NT(_) => None,
        }
    }

    /// Indented tree dump, for tests and the CLI.
    pub fn to_tree_string(&self, depth: usize) -> String {
        let mut out = String::new();
        let pad = "  ".repeat(depth);
        match self.symbol {
            Symbol::T(t) => {
                let _ = writeln!(out, "{pad}{t} {:?}", self.lexeme);
            }
            Symbol::NT(nt) => {
                let _ = writeln!(out, "{pad}{nt}");
                for child in &self.children {
                    out.push_str(&child.to_tree_string(depth + 1));
                }
            }
        }
        out
    }
}

#[derive(Clone)]
struct Derivation {
    prod: usize,
    child_spans: Vec<(usize, usize)>,
}

struct Cyk<'a> {
    grammar: &'a Grammar,
    tokens: &'a [Token],
    /// Memo keyed on `(non-terminal, i, j)` over the half-open token span
    /// `[i, j)`. `None` records a definitive failure.
    memo: HashMap<(NonTerminal, usize, usize), Option<Derivation>>,
    in_progress: HashSet<(NonTerminal, usize, usize)>,
}

impl<'a> Cyk<'a> {
    fn new(grammar: &'a Grammar, tokens: &'a [Token]) -> Self {
        Cyk { grammar, tokens, memo: HashMap::new(), in_progress: HashSet::new() }
    }

    fn derives_nt(&mut self, nt: NonTerminal, i: usize, j: usize) -> bool {
        let key = (nt, i, j);
        if let Some(entry) = self.memo.get(&key) {
            return entry.is_some();
        }
        // A re-entrant query can only arise from a production that reaches
        // itself without consuming input; failing it terminates the cycle.
        if !self.in_progress.insert(key) {
            return false;
        }

        let grammar = self.grammar;
        let mut found = None;
        for (prod_index, production) in grammar.productions_for(nt).iter().enumerate() {
            let mut spans = Vec::with_capacity(production.rhs.len());
            if self.match_seq(&production.rhs, 0, i, j, &mut spans) {
                found = Some(Derivation { prod: prod_index, child_spans: spans });
                break;
            }
        }

        self.in_progress.remove(&key);
        let hit = found.is_some();
        self.memo.insert(key, found);
        hit
    }

    /// Match `rhs[k..]` against the span `[pos, j)`, preferring the shortest
    /// match for each symbol so derivations are deterministic.
    fn match_seq(
        &mut self,
        rhs: &[Symbol],
        k: usize,
        pos: usize,
        j: usize,
        spans: &mut Vec<(usize, usize)>,
    ) -> bool {
        if k == rhs.len() {
            return pos == j;
        }
        match rhs[k] {
            Symbol::T(t) => {
                if pos < j && self.tokens[pos].kind == t {
                    spans.push((pos, pos + 1));
                    if self.match_seq(rhs, k + 1, pos + 1, j, spans) {
                        return true;
                    }
                    spans.pop();
                }
                false
            }
            Symbol::NT(nt) => {
                for q in pos..=j {
                    if self.derives_nt(nt, pos, q) {
                        spans.push((pos, q));
                        if self.match_seq(rhs, k + 1, q, j, spans) {
                            return true;
                        }
                        spans.pop();
                    }
                }
                false
            }
        }
    }

    fn build(&self, symbol: Symbol, i: usize, j: usize) -> ParseNode {
        let line = self.tokens[i.min(self.tokens.len() - 1)].line;
        match symbol {
            Symbol::T(_) => ParseNode {
                symbol,
                production: None,
                children: Vec::new(),
                lexeme: self.tokens[i].lexeme.clone(),
                line,
            },
            Symbol::NT(nt) => {
                let derivation = self
                    .memo
                    .get(&(nt, i, j))
                    .and_then(|d| d.as_ref())
                    .expect("span was derived before reconstruction");
                let production = &self.grammar.productions_for(nt)[derivation.prod];
                let children = production
                    .rhs
                    .iter()
                    .zip(&derivation.child_spans)
                    .map(|(&sym, &(ci, cj))| self.build(sym, ci, cj))
                    .collect();
                ParseNode {
                    symbol,
                    production: Some(production.clone()),
                    children,
                    lexeme: String::new(),
                    line,
                }
            }
        }
    }
}

/// Parse a `BOFS`/`EOFS`-bracketed token stream into a parse tree.
///
/// The parse succeeds iff the start symbol derives the whole span. On failure
/// the error reports the shortest span with no derivation under any
/// non-terminal.
pub fn parse_cyk(tokens: &[Token], grammar: &Grammar) -> Result<ParseNode, CompileError> {
    let n = tokens.len();
    let mut cyk = Cyk::new(grammar, tokens);

    if cyk.derives_nt(grammar.start, 0, n) {
        trace!("parse succeeded over {n} tokens");
        return Ok(cyk.build(Symbol::NT(grammar.start), 0, n));
    }

    // Every single token derives itself as a terminal, so the shortest span
    // that can lack a derivation has two tokens.
    let mut non_terminals: Vec<NonTerminal> = grammar.non_terminals.iter().copied().collect();
    non_terminals.sort();
    for len in 2..=n {
        for i in 0..=(n - len) {
            let derivable = non_terminals.iter().any(|&nt| cyk.derives_nt(nt, i, i + len));
            if !derivable {
                let token = &tokens[i];
                return Err(CompileError::Parse {
                    line: token.line,
                    message: format!(
                        "no derivation for {len} token(s) beginning at {} {:?}",
                        token.kind, token.lexeme
                    ),
                });
            }
        }
    }

    let line = tokens.first().map(|t| t.line).unwrap_or(1);
    Err(CompileError::Parse { line, message: "input has no derivation".to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::grammar::language_grammar;
    use crate::frontend::lexer::scan;

    fn parse(source: &str) -> Result<ParseNode, CompileError> {
        let grammar = language_grammar();
        let tokens = scan(source)?;
        parse_cyk(&tokens, &grammar)
    }

    #[test]
    fn parses_a_minimal_function() {
        let tree = parse("fn main(x: i32, y: i32) -> i32 { return x; }").unwrap();
        assert_eq!(tree.symbol, Symbol::NT(NonTerminal::S));
        assert_eq!(tree.children.len(), 3);
        assert_eq!(tree.children[0].symbol, Symbol::T(Terminal::Bofs));
        assert_eq!(tree.children[2].symbol, Symbol::T(Terminal::Eofs));
    }

    #[test]
    fn children_match_the_applied_production() {
        fn check(node: &ParseNode) {
            if let Some(production) = &node.production {
                let child_symbols: Vec<Symbol> =
                    node.children.iter().map(|c| c.symbol).collect();
                assert_eq!(child_symbols, production.rhs);
            }
            for child in &node.children {
                check(child);
            }
        }
        let tree =
            parse("fn main(x: i32, y: i32) -> i32 { let r: i32 = x + y * 2; return r; }")
                .unwrap();
        check(&tree);
    }

    #[test]
    fn parsing_is_deterministic() {
        let source = "fn main(x: i32, y: i32) -> i32 { if (x > y) { return x; } else { return y; } }";
        assert_eq!(parse(source).unwrap(), parse(source).unwrap());
    }

    #[test]
    fn precedence_layers_nest_multiplication_below_addition() {
        let tree = parse("fn main(x: i32, y: i32) -> i32 { return x + y * x; }").unwrap();
        let dump = tree.to_tree_string(0);
        // The PLUS production must apply above the STAR production.
        let plus_at = dump.find("PLUS").unwrap();
        let star_at = dump.find("STAR").unwrap();
        assert!(plus_at < star_at);
    }

    #[test]
    fn empty_parameter_list_uses_the_epsilon_production() {
        assert!(parse("fn main(x: i32, y: i32) -> i32 { return x; } fn f() -> i32 { return 0; }").is_ok());
    }

    #[test]
    fn missing_semicolon_is_a_parse_error() {
        let err = parse("fn main(x: i32, y: i32) -> i32 { return x }").unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));
    }

    #[test]
    fn if_without_else_is_a_parse_error() {
        let err = parse("fn main(x: i32, y: i32) -> i32 { if (x > y) { return x; } return y; }")
            .unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));
    }

    #[test]
    fn parse_error_carries_a_line_number() {
        let err = parse("fn main(x: i32, y: i32) -> i32 {\n  return x\n}").unwrap_err();
        match err {
            CompileError::Parse { line, .. } => assert!(line >= 1),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
