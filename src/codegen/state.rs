//! Codegen context: the single place that owns the growing IR buffer,
//! the counters used to mint fresh names, and the per-compilation
//! registries.
//!
//! Passed by exclusive reference through every lowering function rather
//! than held behind a shared global, so nested and recursive codegen
//! calls can't alias mutable compiler state through separate paths.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::ast::FunctionDecl;
use crate::codegen::error::CodegenError;
use crate::codegen::globals::escape_llvm_string;
use crate::mangle;
use crate::symtab::SymbolTable;
use crate::types::{SignStack, Type};

/// A computed IR value: the operand text to reference it by, its static
/// type, and its sign stack.
#[derive(Debug, Clone)]
pub struct Value {
    pub operand: String,
    pub ty: Type,
    pub signs: SignStack,
}

impl Value {
    pub fn new(operand: impl Into<String>, ty: Type) -> Self {
        let signs = crate::types::sign_stack_for(&ty);
        Value { operand: operand.into(), ty, signs }
    }
}

pub struct CodeGen {
    /// The function bodies emitted so far, in source order.
    pub body: String,
    /// `declare`/`define` headers and global constants, emitted ahead of
    /// `body` in the final module so forward references resolve.
    pub header: String,
    temp_counter: usize,
    block_counter: usize,
    string_counter: usize,
    string_globals: HashMap<String, String>,
    /// Source-level function signatures, keyed by unmangled name, used
    /// to resolve call sites and mangle both decls and calls.
    pub functions: HashMap<String, FunctionDecl>,
    pub symtab: SymbolTable,
    pub file_path: String,
}

impl CodeGen {
    pub fn new(file_path: impl Into<String>) -> Self {
        CodeGen {
            body: String::new(),
            header: String::new(),
            temp_counter: 0,
            block_counter: 0,
            string_counter: 0,
            string_globals: HashMap::new(),
            functions: HashMap::new(),
            symtab: SymbolTable::new(),
            file_path: file_path.into(),
        }
    }

    pub fn fresh_temp(&mut self) -> String {
        let n = self.temp_counter;
        self.temp_counter += 1;
        format!("%t{}", n)
    }

    pub fn fresh_block(&mut self, tag: &str) -> String {
        let n = self.block_counter;
        self.block_counter += 1;
        format!("{}.{}", tag, n)
    }

    pub fn emit(&mut self, line: impl AsRef<str>) -> Result<(), CodegenError> {
        writeln!(&mut self.body, "{}", line.as_ref())?;
        Ok(())
    }

    pub fn emit_header(&mut self, line: impl AsRef<str>) -> Result<(), CodegenError> {
        writeln!(&mut self.header, "{}", line.as_ref())?;
        Ok(())
    }

    /// Interns a decoded string literal as a private unnamed global and
    /// returns the pointer-valued operand referencing it.
    pub fn get_string_global(&mut self, value: &str) -> Result<String, CodegenError> {
        if let Some(name) = self.string_globals.get(value) {
            return Ok(name.clone());
        }
        let name = format!("@.str.{}", self.string_counter);
        self.string_counter += 1;
        let (escaped, len) = escape_llvm_string(value);
        self.emit_header(format!(
            "{} = private unnamed_addr constant [{} x i8] c\"{}\"",
            name, len, escaped
        ))?;
        self.string_globals.insert(value.to_string(), name.clone());
        Ok(name)
    }

    pub fn mangled_of(&self, decl: &FunctionDecl) -> String {
        mangle::mangle_decl(decl)
    }

    pub fn lookup_function(&self, name: &str) -> Option<&FunctionDecl> {
        self.functions.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_names_are_unique_and_monotonic() {
        let mut cg = CodeGen::new("test.gl");
        assert_eq!(cg.fresh_temp(), "%t0");
        assert_eq!(cg.fresh_temp(), "%t1");
        assert_eq!(cg.fresh_block("if_then"), "if_then.0");
        assert_eq!(cg.fresh_block("if_then"), "if_then.1");
    }

    #[test]
    fn string_globals_are_deduplicated() {
        let mut cg = CodeGen::new("test.gl");
        let a = cg.get_string_global("hi").unwrap();
        let b = cg.get_string_global("hi").unwrap();
        assert_eq!(a, b);
        let c = cg.get_string_global("bye").unwrap();
        assert_ne!(a, c);
        assert!(cg.header.contains("@.str.0"));
    }
}
