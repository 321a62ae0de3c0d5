//! Grammar representation and the grammar-file text format.
//!
//! A grammar file holds one production per non-empty line: the first
//! whitespace-separated word is the left-hand non-terminal, the rest is the
//! right-hand sequence (possibly empty). Words starting with an upper-case
//! letter are terminals, lower-case are non-terminals. The start symbol is
//! named `s`.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::CompileError;

use super::lexer::Terminal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NonTerminal {
    S,
    Fns,
    Fn,
    OptParams,
    Params,
    VarDef,
    Type,
    Stmts,
    Stmt,
    Expr,
    ExprP1,
    ExprP2,
    ExprP3,
    ExprP4,
    ExprP5,
    ExprP6,
    ExprP7,
    ExprP8,
    ExprP9,
    OptArgs,
    Args,
}

impl NonTerminal {
    pub fn name(self) -> &'static str {
        match self {
            NonTerminal::S => "s",
            NonTerminal::Fns => "fns",
            NonTerminal::Fn => "fn",
            NonTerminal::OptParams => "optparams",
            NonTerminal::Params => "params",
            NonTerminal::VarDef => "vardef",
            NonTerminal::Type => "type",
            NonTerminal::Stmts => "stmts",
            NonTerminal::Stmt => "stmt",
            NonTerminal::Expr => "expr",
            NonTerminal::ExprP1 => "exprp1",
            NonTerminal::ExprP2 => "exprp2",
            NonTerminal::ExprP3 => "exprp3",
            NonTerminal::ExprP4 => "exprp4",
            NonTerminal::ExprP5 => "exprp5",
            NonTerminal::ExprP6 => "exprp6",
            NonTerminal::ExprP7 => "exprp7",
            NonTerminal::ExprP8 => "exprp8",
            NonTerminal::ExprP9 => "exprp9",
            NonTerminal::OptArgs => "optargs",
            NonTerminal::Args => "args",
        }
    }

    pub fn from_name(name: &str) -> Option<NonTerminal> {
        const ALL: [NonTerminal; 21] = [
            NonTerminal::S,
            NonTerminal::Fns,
            NonTerminal::Fn,
            NonTerminal::OptParams,
            NonTerminal::Params,
            NonTerminal::VarDef,
            NonTerminal::Type,
            NonTerminal::Stmts,
            NonTerminal::Stmt,
            NonTerminal::Expr,
            NonTerminal::ExprP1,
            NonTerminal::ExprP2,
            NonTerminal::ExprP3,
            NonTerminal::ExprP4,
            NonTerminal::ExprP5,
            NonTerminal::ExprP6,
            NonTerminal::ExprP7,
            NonTerminal::ExprP8,
            NonTerminal::ExprP9,
            NonTerminal::OptArgs,
            NonTerminal::Args,
        ];
        ALL.into_iter().find(|nt| nt.name() == name)
    }
}

impl fmt::Display for NonTerminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A grammar symbol: terminal or non-terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    T(Terminal),
    NT(NonTerminal),
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::T(t) => write!(f, "{t}"),
            Symbol::NT(nt) => write!(f, "{nt}"),
        }
    }
}

/// A rewrite rule `lhs → rhs`. The right-hand side may be empty (ε) or of
/// any length; Chomsky normal form is not required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    pub lhs: NonTerminal,
    pub rhs: Vec<Symbol>,
}

/// A context-free grammar: terminal set, non-terminal set, start symbol, and
/// an ordered production list per non-terminal. Production order is
/// significant — the parser breaks derivation ties in favour of the first
/// listed production.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub terminals: HashSet<Terminal>,
    pub non_terminals: HashSet<NonTerminal>,
    pub start: NonTerminal,
    pub productions: HashMap<NonTerminal, Vec<Production>>,
}

impl Grammar {
    /// Parse the grammar-file text format.
    pub fn parse(text: &str) -> Result<Grammar, CompileError> {
        let mut terminals = HashSet::new();
        let mut non_terminals = HashSet::new();
        let mut productions: HashMap<NonTerminal, Vec<Production>> = HashMap::new();

        for raw_line in text.lines() {
            let words: Vec<&str> = raw_line.split_whitespace().collect();
            if words.is_empty() {
                continue;
            }

            let lhs = match Self::parse_symbol(words[0])? {
                Symbol::NT(nt) => nt,
                Symbol::T(t) => {
                    return Err(CompileError::Grammar {
                        message: format!("production left-hand side {} is a terminal", t),
                    });
                }
            };
            non_terminals.insert(lhs);

            let mut rhs = Vec::with_capacity(words.len() - 1);
            for word in &words[1..] {
                let symbol = Self::parse_symbol(word)?;
                match symbol {
                    Symbol::T(t) => {
                        terminals.insert(t);
                    }
                    Symbol::NT(nt) => {
                        non_terminals.insert(nt);
                    }
                }
                rhs.push(symbol);
            }

            productions.entry(lhs).or_default().push(Production { lhs, rhs });
        }

        let start = NonTerminal::S;
        if !productions.contains_key(&start) {
            return Err(CompileError::Grammar {
                message: "no production for the start symbol `s`".to_string(),
            });
        }
        for nt in &non_terminals {
            if !productions.contains_key(nt) {
                return Err(CompileError::Grammar {
                    message: format!("non-terminal {nt} has no productions"),
                });
            }
        }

        Ok(Grammar { terminals, non_terminals, start, productions })
    }

    fn parse_symbol(word: &str) -> Result<Symbol, CompileError> {
        let first = word.chars().next().unwrap_or(' ');
        if first.is_ascii_uppercase() {
            Terminal::from_name(word).map(Symbol::T).ok_or_else(|| CompileError::Grammar {
                message: format!("unknown terminal {word:?}"),
            })
        } else if first.is_ascii_lowercase() {
            NonTerminal::from_name(word).map(Symbol::NT).ok_or_else(|| {
                CompileError::Grammar { message: format!("unknown non-terminal {word:?}") }
            })
        } else {
            Err(CompileError::Grammar {
                message: format!("grammar symbols must start with a letter, got {word:?}"),
            })
        }
    }

    pub fn productions_for(&self, nt: NonTerminal) -> &[Production] {
        self.productions.get(&nt).map(|p| p.as_slice()).unwrap_or(&[])
    }
}

/// The language grammar, in the same text format a grammar file uses.
pub const LANGUAGE_GRAMMAR: &str = "\
s BOFS fns EOFS
fns fn fns
fns fn
fn FN ID LPAREN optparams RPAREN ARROW type LBRACE stmts RBRACE
fn FN ID LPAREN optparams RPAREN LBRACE stmts RBRACE
optparams params
optparams
params vardef COMMA params
params vardef
vardef ID COLON type
type I32
type BOOL
type CHAR
type STAR type
type LPAREN type RPAREN
stmts stmt stmts
stmts stmt
stmt LET vardef ASSIGN expr SEMI
stmt expr ASSIGN expr SEMI
stmt expr SEMI
stmt IF LPAREN expr RPAREN LBRACE stmts RBRACE ELSE LBRACE stmts RBRACE
stmt WHILE LPAREN expr RPAREN LBRACE stmts RBRACE
stmt RET expr SEMI
expr exprp1
exprp1 exprp2
exprp1 exprp1 OR exprp2
exprp2 exprp3
exprp2 exprp2 AND exprp3
exprp3 exprp4
exprp3 exprp3 EQ exprp4
exprp3 exprp3 NE exprp4
exprp4 exprp5
exprp4 exprp4 LT exprp5
exprp4 exprp4 GT exprp5
exprp4 exprp4 LE exprp5
exprp4 exprp4 GE exprp5
exprp5 exprp6
exprp5 exprp5 PLUS exprp6
exprp5 exprp5 MINUS exprp6
exprp6 exprp7
exprp6 exprp6 STAR exprp7
exprp6 exprp6 SLASH exprp7
exprp6 exprp6 PCT exprp7
exprp7 exprp8
exprp7 NOT exprp8
exprp7 STAR exprp8
exprp8 exprp9
exprp8 exprp8 AS type
exprp9 ID
exprp9 NUM
exprp9 AMPERSAND ID
exprp9 STRLITERAL
exprp9 CHARLITERAL
exprp9 LPAREN expr RPAREN
exprp9 ID LPAREN optargs RPAREN
optargs args
optargs
args expr COMMA args
args expr
";

/// The built-in grammar, parsed from [`LANGUAGE_GRAMMAR`].
pub fn language_grammar() -> Grammar {
    Grammar::parse(LANGUAGE_GRAMMAR).expect("built-in grammar is well-formed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_grammar_parses() {
        let g = language_grammar();
        assert_eq!(g.start, NonTerminal::S);
        assert!(g.terminals.contains(&Terminal::Bofs));
        assert!(g.terminals.contains(&Terminal::Eofs));
        assert_eq!(g.productions_for(NonTerminal::Type).len(), 5);
    }

    #[test]
    fn production_order_is_preserved() {
        let g = language_grammar();
        let fns = g.productions_for(NonTerminal::Fns);
        assert_eq!(fns[0].rhs.len(), 2);
        assert_eq!(fns[1].rhs.len(), 1);
    }

    #[test]
    fn empty_rhs_is_epsilon() {
        let g = language_grammar();
        let optparams = g.productions_for(NonTerminal::OptParams);
        assert!(optparams.iter().any(|p| p.rhs.is_empty()));
    }

    #[test]
    fn unknown_symbols_are_rejected() {
        assert!(matches!(
            Grammar::parse("s FOO"),
            Err(CompileError::Grammar { .. })
        ));
        assert!(matches!(
            Grammar::parse("s widget\nwidget ID"),
            Err(CompileError::Grammar { .. })
        ));
    }

    #[test]
    fn terminal_lhs_is_rejected() {
        assert!(matches!(
            Grammar::parse("ID NUM"),
            Err(CompileError::Grammar { .. })
        ));
    }
}
