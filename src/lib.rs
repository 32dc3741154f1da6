//! Glyph compiler front-end and code generator.
//!
//! Parses a single Glyph translation unit and lowers it to textual LLVM
//! IR. The core performs no host I/O beyond reading the source file and
//! is deterministic per translation unit; everything that shells out to
//! `clang`/`lli` lives behind [`compile_file`] and [`run_jit`] so the
//! parse/codegen path stays testable without an LLVM toolchain on the
//! host.

pub mod ast;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod keywords;
pub mod mangle;
pub mod parser;
pub mod source;
pub mod symtab;
pub mod types;

pub use ast::Program;
pub use codegen::{codegen_program, CodegenError};
pub use config::{CompilerConfig, EmitKind, RelocationModel};
pub use parser::{parse, ParseError};

use std::fmt;
use std::fs;
use std::path::Path;
use std::process::Command;

/// Either stage of compilation can fail; both carry enough to render a
/// `diagnostics::render` call at the call site, which needs the original
/// source text this error's span was computed against.
#[derive(Debug)]
pub enum CompileError {
    Parse(ParseError),
    Codegen(CodegenError),
    Io(String),
    Toolchain(String),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Parse(e) => write!(f, "{}", e),
            CompileError::Codegen(e) => write!(f, "{}", e),
            CompileError::Io(e) => write!(f, "{}", e),
            CompileError::Toolchain(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<ParseError> for CompileError {
    fn from(e: ParseError) -> Self {
        CompileError::Parse(e)
    }
}

impl From<CodegenError> for CompileError {
    fn from(e: CodegenError) -> Self {
        CompileError::Codegen(e)
    }
}

/// Parses and lowers a source string to LLVM IR text, without touching
/// the filesystem. The primary embedder entry point.
pub fn compile_str(source: &str, file_path: &str) -> Result<String, CompileError> {
    let program = parse(source)?;
    let ir = codegen_program(&program, file_path)?;
    Ok(ir)
}

/// Reads `source_path`, compiles it, and writes the resulting object or
/// executable to `output_path` by shelling out to `clang` on the
/// generated IR.
pub fn compile_file(source_path: &Path, output_path: &Path, config: &CompilerConfig) -> Result<(), CompileError> {
    let source = fs::read_to_string(source_path)
        .map_err(|e| CompileError::Io(format!("failed to read '{}': {}", source_path.display(), e)))?;
    let file_name = source_path.to_string_lossy().into_owned();

    let ir = compile_str(&source, &file_name)?;

    let ir_path = output_path.with_extension("ll");
    fs::write(&ir_path, &ir)
        .map_err(|e| CompileError::Io(format!("failed to write '{}': {}", ir_path.display(), e)))?;

    let mut cmd = Command::new("clang");
    cmd.arg(&ir_path).arg("-o").arg(output_path);
    cmd.arg(format!("-O{}", config.opt_level));
    cmd.arg(config.relocation_model.clang_flag());
    if config.emit == EmitKind::Assembly {
        cmd.arg("-S");
    }

    let output = cmd
        .output()
        .map_err(|e| CompileError::Toolchain(format!("failed to run clang: {}", e)))?;
    if !output.status.success() {
        return Err(CompileError::Toolchain(format!(
            "clang failed:\n{}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    if !config.keep_ir {
        fs::remove_file(&ir_path).ok();
    }
    Ok(())
}

/// Compiles `source_path` to IR and immediately runs it under `lli`,
/// returning the interpreter's exit code. Used by the `--JIT` CLI flag
/// and by the end-to-end test suite, which both need a single process
/// exit code rather than a linked executable on disk.
pub fn run_jit(source_path: &Path) -> Result<i32, CompileError> {
    let source = fs::read_to_string(source_path)
        .map_err(|e| CompileError::Io(format!("failed to read '{}': {}", source_path.display(), e)))?;
    let file_name = source_path.to_string_lossy().into_owned();
    let ir = compile_str(&source, &file_name)?;

    let tmp = std::env::temp_dir().join(format!("glyphc-jit-{}.ll", std::process::id()));
    fs::write(&tmp, &ir).map_err(|e| CompileError::Io(e.to_string()))?;
    let result = Command::new("lli")
        .arg("--opaque-pointers")
        .arg("--entry-function=_Z4main")
        .arg(&tmp)
        .status()
        .map_err(|e| CompileError::Toolchain(format!("failed to run lli: {}", e)));
    fs::remove_file(&tmp).ok();
    let status = result?;
    Ok(status.code().unwrap_or(-1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_minimal_program_to_ir_text() {
        let ir = compile_str("func main() -> i32 { return 0; }", "t.gl").unwrap();
        assert!(ir.contains("define i32 @_Z4main()"));
    }

    #[test]
    fn parse_error_surfaces_through_compile_error() {
        let err = compile_str("func main( -> i32 { return 0; }", "t.gl").unwrap_err();
        assert!(matches!(err, CompileError::Parse(_)));
    }

    #[test]
    fn codegen_error_surfaces_through_compile_error() {
        let err = compile_str("func main() -> i32 { return true; }", "t.gl").unwrap_err();
        assert!(matches!(err, CompileError::Codegen(_)));
    }
}
