//! Glyph compiler CLI
//!
//! Command-line interface for compiling Glyph source files to objects
//! or assembly, running them immediately via `lli`, and generating
//! shell completion scripts.

use clap::{CommandFactory, Parser as ClapParser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process;

use glyphc::{compile_file, diagnostics, run_jit, CompileError, CompilerConfig, EmitKind, RelocationModel};

#[derive(ClapParser)]
#[command(name = "glyphc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Glyph compiler - compile .gl programs to objects or assembly", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a .gl file to an object, executable, or assembly
    Build {
        /// Input .gl source file
        input: PathBuf,

        /// Output path (defaults to the input filename without its extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Optimization level passed to clang
        #[arg(long = "Opt", default_value_t = 0)]
        opt: u8,

        /// What clang should emit from the generated IR
        #[arg(long, value_enum, default_value_t = EmitArg::Object)]
        emit: EmitArg,

        /// Relocation model passed to clang
        #[arg(long, value_enum, default_value_t = RelocationArg::Pic)]
        relocation_model: RelocationArg,

        /// Keep the intermediate LLVM IR (.ll) file
        #[arg(long)]
        keep_ir: bool,
    },

    /// Compile and immediately run a .gl file under `lli`
    #[command(name = "JIT")]
    Jit {
        /// Input .gl source file
        input: PathBuf,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Copy, Clone, clap::ValueEnum)]
enum EmitArg {
    Object,
    Asm,
}

#[derive(Copy, Clone, clap::ValueEnum)]
enum RelocationArg {
    Pic,
    Static,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, opt, emit, relocation_model, keep_ir } => {
            run_build(&input, output, opt, emit, relocation_model, keep_ir);
        }
        Commands::Jit { input } => run_jit_command(&input),
        Commands::Completions { shell } => run_completions(shell),
    }
}

fn run_build(
    input: &std::path::Path,
    output: Option<PathBuf>,
    opt: u8,
    emit: EmitArg,
    relocation_model: RelocationArg,
    keep_ir: bool,
) {
    let output = output.unwrap_or_else(|| input.with_extension(""));
    let config = CompilerConfig::new()
        .with_opt_level(opt)
        .with_emit(match emit {
            EmitArg::Object => EmitKind::Object,
            EmitArg::Asm => EmitKind::Assembly,
        })
        .with_relocation_model(match relocation_model {
            RelocationArg::Pic => RelocationModel::Pic,
            RelocationArg::Static => RelocationModel::Static,
        })
        .with_keep_ir(keep_ir);

    match compile_file(input, &output, &config) {
        Ok(()) => {
            println!("Compiled {} -> {}", input.display(), output.display());
            if keep_ir {
                let ir_path = output.with_extension("ll");
                if ir_path.exists() {
                    println!("IR saved to {}", ir_path.display());
                }
            }
        }
        Err(e) => {
            report(input, e);
            process::exit(1);
        }
    }
}

fn run_jit_command(input: &std::path::Path) {
    match run_jit(input) {
        Ok(code) => process::exit(code),
        Err(e) => {
            report(input, e);
            process::exit(1);
        }
    }
}

fn run_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "glyphc", &mut io::stdout());
}

/// Renders a `CompileError` to stderr, re-reading the source file so a
/// `Parse`/`Codegen` error can print its `file:line:col` caret; other
/// error kinds have no span and print as a plain message.
fn report(input: &std::path::Path, error: CompileError) {
    let span = match &error {
        CompileError::Parse(e) => Some(e.span),
        CompileError::Codegen(e) => e.span(),
        _ => None,
    };
    match span {
        Some(span) => {
            let file_name = input.to_string_lossy();
            match std::fs::read_to_string(input) {
                Ok(source) => eprintln!("{}", diagnostics::render(&file_name, &source, span, &error.to_string())),
                Err(_) => eprintln!("Error: {}", error),
            }
        }
        None => eprintln!("Error: {}", error),
    }
}
