//! Per-function assembly: entry block, parameter allocas, the return
//! slot, and the shared epilogue every `return` jumps to.

use crate::ast::{FunctionDecl, FunctionDef};
use crate::codegen::error::CodegenError;
use crate::codegen::state::CodeGen;
use crate::codegen::stmt::{codegen_stmt, FuncCtx, LoopCtx};
use crate::symtab::VarRecord;

/// Emits the header `declare` line for a function prototype that has no
/// definition in this translation unit.
pub fn codegen_decl(cg: &mut CodeGen, decl: &FunctionDecl) -> Result<(), CodegenError> {
    let mangled = cg.mangled_of(decl);
    let mut params: Vec<String> = decl.named_params().map(|(_, _, ty)| ty.llvm_type()).collect();
    if decl.is_variadic() {
        params.push("...".to_string());
    }
    cg.emit_header(format!(
        "declare {} @{}({})",
        decl.return_type.llvm_type(),
        mangled,
        params.join(", ")
    ))
}

/// Lowers a function definition to a `define` block: allocas its
/// parameters and return slot up front, then drives statement codegen
/// over the body, finally emitting the shared epilogue that loads and
/// returns the result (or returns void).
pub fn codegen_def(cg: &mut CodeGen, def: &FunctionDef) -> Result<(), CodegenError> {
    let decl = &def.decl;
    let mangled = cg.mangled_of(decl);
    let named: Vec<(&bool, &str, &crate::types::Type)> = decl.named_params().collect();

    let param_list = named
        .iter()
        .enumerate()
        .map(|(i, (_, _, ty))| format!("{} %arg.{}", ty.llvm_type(), i))
        .collect::<Vec<_>>()
        .join(", ");

    cg.emit(format!(
        "define {} @{}({}) {{",
        decl.return_type.llvm_type(),
        mangled,
        param_list
    ))?;
    cg.emit("entry:")?;

    cg.symtab.push_scope();

    for (i, (mutable, name, ty)) in named.iter().enumerate() {
        let alloca = cg.fresh_temp();
        cg.emit(format!("{} = alloca {}", alloca, ty.llvm_type()))?;
        cg.emit(format!("store {} %arg.{}, ptr {}", ty.llvm_type(), i, alloca))?;
        cg.symtab.declare(
            name,
            VarRecord { ty: (*ty).clone(), mutable: **mutable, alloca },
        );
    }

    let epilogue = cg.fresh_block("epilogue");
    let return_slot = if decl.return_type.is_void() {
        None
    } else {
        let slot = cg.fresh_temp();
        cg.emit(format!("{} = alloca {}", slot, decl.return_type.llvm_type()))?;
        Some(slot)
    };

    let func_ctx = FuncCtx {
        return_slot: return_slot.clone(),
        return_ty: decl.return_type.clone(),
        epilogue: epilogue.clone(),
    };
    let terminated = codegen_stmt(cg, &def.body, &func_ctx, &LoopCtx::default())?;
    if !terminated {
        cg.emit(format!("br label %{}", epilogue))?;
    }

    cg.symtab.pop_scope();

    cg.emit(format!("{}:", epilogue))?;
    match &return_slot {
        Some(slot) => {
            let t = cg.fresh_temp();
            cg.emit(format!("{} = load {}, ptr {}", t, decl.return_type.llvm_type(), slot))?;
            cg.emit(format!("ret {} {}", decl.return_type.llvm_type(), t))?;
        }
        None => cg.emit("ret void")?,
    }
    cg.emit("}")?;
    cg.emit("")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Stmt, StmtKind};
    use crate::source::Span;
    use crate::types::{BuiltinKind, Type};

    fn simple_def(name: &str, ret: Type, body: Stmt) -> FunctionDef {
        FunctionDef {
            decl: FunctionDecl {
                linkage: None,
                name: name.to_string(),
                params: vec![],
                return_type: ret,
                span: Span::new(0, 0),
            },
            body,
            span: Span::new(0, 0),
        }
    }

    #[test]
    fn void_function_returns_without_a_slot() {
        let mut cg = CodeGen::new("t.gl");
        let body = Stmt::new(StmtKind::Compound(vec![]), Span::new(0, 0));
        let def = simple_def("noop", Type::void(), body);
        codegen_def(&mut cg, &def).unwrap();
        assert!(cg.body.contains("ret void"));
        assert!(!cg.body.contains("alloca i32"));
    }

    #[test]
    fn scalar_return_loads_from_the_return_slot() {
        let mut cg = CodeGen::new("t.gl");
        let ret_expr = crate::ast::Expr::new(
            crate::ast::ExprKind::IntLiteral { value: 7, ty: Type::Builtin(BuiltinKind::I32) },
            Span::new(0, 0),
        );
        let body = Stmt::new(
            StmtKind::Compound(vec![Stmt::new(StmtKind::Return(Some(ret_expr)), Span::new(0, 0))]),
            Span::new(0, 0),
        );
        let def = simple_def("seven", Type::Builtin(BuiltinKind::I32), body);
        codegen_def(&mut cg, &def).unwrap();
        assert!(cg.body.contains("ret i32"));
        assert!(cg.body.contains("epilogue"));
    }

    #[test]
    fn declaration_emits_a_declare_line_to_header() {
        let mut cg = CodeGen::new("t.gl");
        let decl = FunctionDecl {
            linkage: None,
            name: "puts".to_string(),
            params: vec![crate::ast::Param::Named {
                mutable: false,
                name: "s".into(),
                ty: Type::Pointer(Box::new(Type::Builtin(BuiltinKind::I8))),
            }],
            return_type: Type::Builtin(BuiltinKind::I32),
            span: Span::new(0, 0),
        };
        codegen_decl(&mut cg, &decl).unwrap();
        assert!(cg.header.contains("declare i32"));
    }
}
