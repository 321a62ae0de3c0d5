use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use nex_compiler::frontend::grammar::{language_grammar, Grammar};
use nex_compiler::frontend::{lexer, parser};
use nex_compiler::{compile, compile_to_asm, words_to_bytes};

#[derive(Parser)]
#[command(name = "nexc")]
#[command(about = "Compile nex source to a flat 32-bit word image")]
struct Args {
    /// Path to the source file to compile
    file: PathBuf,

    /// Output path for the binary image (defaults to the source path with a
    /// .bin extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the instruction listing instead of writing the image
    #[arg(long)]
    asm: bool,

    /// Print the parse tree instead of writing the image
    #[arg(long)]
    tree: bool,

    /// Load a grammar file in place of the built-in grammar
    #[arg(long)]
    grammar: Option<PathBuf>,
}

fn main() -> Result<()> {
    simple_logger::SimpleLogger::new().env().init()?;
    let args = Args::parse();

    let source = fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;

    let grammar = match &args.grammar {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading grammar {}", path.display()))?;
            Grammar::parse(&text)?
        }
        None => language_grammar(),
    };

    if args.tree {
        let tokens = lexer::scan(&source)?;
        let tree = parser::parse_cyk(&tokens, &grammar)?;
        print!("{}", tree.to_tree_string(0));
        return Ok(());
    }

    if args.asm {
        print!("{}", compile_to_asm(&source, &grammar)?);
        return Ok(());
    }

    let words = compile(&source, &grammar)?;
    let out_path = args.output.unwrap_or_else(|| args.file.with_extension("bin"));
    fs::write(&out_path, words_to_bytes(&words))
        .with_context(|| format!("writing {}", out_path.display()))?;
    info!("wrote {} words to {}", words.len(), out_path.display());
    Ok(())
}
