//! Lowers a parsed program to a single LLVM IR text module.
//!
//! Registration happens in a first pass so forward references (a
//! function calling another declared later in the file) always resolve;
//! codegen itself happens in a second pass, driven file-order.

pub mod error;
pub mod expr;
pub mod func;
pub mod globals;
pub mod state;
pub mod stmt;

use crate::ast::{Program, TopLevel};
pub use error::CodegenError;
pub use state::{CodeGen, Value};

/// Lowers a whole program to LLVM IR text: `header` (string globals and
/// `declare`s) followed by `body` (the `define`d functions), matching
/// the layout `clang`-emitted modules use.
pub fn codegen_program(program: &Program, file_path: &str) -> Result<String, CodegenError> {
    let mut cg = CodeGen::new(file_path);

    for item in &program.items {
        let decl = match item {
            TopLevel::FunctionDecl(decl) => decl,
            TopLevel::FunctionDef(def) => &def.decl,
        };
        cg.functions.insert(decl.name.clone(), decl.clone());
    }

    for item in &program.items {
        match item {
            TopLevel::FunctionDecl(decl) => func::codegen_decl(&mut cg, decl)?,
            TopLevel::FunctionDef(def) => func::codegen_def(&mut cg, def)?,
        }
    }

    let mut module = String::new();
    module.push_str(&format!("; ModuleID = '{}'\n", cg.file_path));
    module.push_str(&format!("source_filename = \"{}\"\n\n", cg.file_path));
    module.push_str(&cg.header);
    if !cg.header.is_empty() {
        module.push('\n');
    }
    module.push_str(&cg.body);
    Ok(module)
}
