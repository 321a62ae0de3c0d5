pub mod backend;
pub mod frontend;
pub mod ir;

use thiserror::Error;

use frontend::grammar::Grammar;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("lexical error at line {line}: {message}")]
    Lexical { line: usize, message: String },

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("name error at line {line}: {message}")]
    Name { line: usize, message: String },

    #[error("type mismatch at line {line}: {message}")]
    TypeMismatch { line: usize, message: String },

    #[error("invalid production while lowering {symbol}")]
    InvalidProduction { symbol: String },

    #[error("code generation error: {message}")]
    Codegen { message: String },

    #[error("invalid grammar: {message}")]
    Grammar { message: String },
}

/// Compile nex source text to a flat image of 32-bit machine words.
///
/// This is the whole pipeline: scan, parse with the given grammar, lower the
/// parse tree to typed IR, run the elimination passes, resolve labels, and
/// encode. The caller owns writing the words anywhere (see [`words_to_bytes`]).
pub fn compile(source: &str, grammar: &Grammar) -> Result<Vec<u32>, CompileError> {
    let tokens = frontend::lexer::scan(source)?;
    let tree = frontend::parser::parse_cyk(&tokens, grammar)?;
    let unit = ir::ir_generator::generate(&tree)?;
    backend::lower_program(unit)
}

/// [`compile`] with the built-in language grammar.
pub fn compile_to_words(source: &str) -> Result<Vec<u32>, CompileError> {
    compile(source, &frontend::grammar::language_grammar())
}

/// Compile to the flattened instruction listing, labels left symbolic.
///
/// Intended for inspection and logging; the listing shows the program after
/// every pass except label resolution.
pub fn compile_to_asm(source: &str, grammar: &Grammar) -> Result<String, CompileError> {
    let tokens = frontend::lexer::scan(source)?;
    let tree = frontend::parser::parse_cyk(&tokens, grammar)?;
    let unit = ir::ir_generator::generate(&tree)?;
    backend::lower_to_listing(unit)
}

/// Serialize words in big-endian byte order, the image format the sink writes.
pub fn words_to_bytes(words: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.len() * 4);
    for w in words {
        out.extend_from_slice(&w.to_be_bytes());
    }
    out
}
