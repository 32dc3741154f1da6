//! Statement codegen and control flow: `if`/`while`/`for` basic-block
//! shapes, threading the active break/continue targets as parameters
//! rather than a mutable stack field.

use crate::ast::{AssignKind, IncDecKind, Initializer, Stmt, StmtKind};
use crate::codegen::error::CodegenError;
use crate::codegen::expr::{arith_op, codegen_expr, codegen_lvalue, load_lvalue};
use crate::codegen::state::{CodeGen, Value};
use crate::symtab::VarRecord;
use crate::types::Type;

/// Per-function constants threaded through statement codegen: the
/// return-value slot (absent for `void` functions) and the shared
/// epilogue block every `return` jumps to.
pub struct FuncCtx {
    pub return_slot: Option<String>,
    pub return_ty: Type,
    pub epilogue: String,
}

/// The active loop's break/continue targets, rebuilt on entry to each
/// loop construct and restored on exit — a plain parameter rather than
/// a mutable stack, so nothing needs popping on early return. Callers
/// outside a loop pass `LoopCtx::default()`.
#[derive(Clone, Default)]
pub struct LoopCtx {
    break_label: Option<String>,
    continue_label: Option<String>,
}

/// Lowers a statement. Returns `true` if it already emitted a block
/// terminator (`return`/`break`/`continue`), so that compound-statement
/// iteration can short-circuit the remainder of the block.
pub fn codegen_stmt(cg: &mut CodeGen, stmt: &Stmt, func: &FuncCtx, loop_ctx: &LoopCtx) -> Result<bool, CodegenError> {
    match &stmt.kind {
        StmtKind::Empty => Ok(false),
        StmtKind::Compound(stmts) => codegen_compound(cg, stmts, func, loop_ctx),
        StmtKind::ExprStmt(e) => {
            codegen_expr(cg, e)?;
            Ok(false)
        }
        StmtKind::Return(expr) => codegen_return(cg, expr.as_ref(), func, stmt),
        StmtKind::VariableDef { mutable, name, ty, init } => {
            codegen_variable_def(cg, *mutable, name, ty.as_ref(), init.as_ref(), stmt)
        }
        StmtKind::Assignment { lhs, kind, rhs } => codegen_assignment(cg, lhs, *kind, rhs, stmt),
        StmtKind::PrefixIncDec { kind, target } => codegen_inc_dec(cg, *kind, target, stmt),
        StmtKind::If { cond, then_branch, else_branch } => {
            codegen_if(cg, cond, then_branch, else_branch.as_deref(), func, loop_ctx)
        }
        StmtKind::Loop(body) => codegen_loop(cg, body, func),
        StmtKind::While { cond, body } => codegen_while(cg, cond, body, func),
        StmtKind::For { init, cond, step, body } => {
            codegen_for(cg, init.as_deref(), cond.as_ref(), step.as_deref(), body, func)
        }
        StmtKind::Break => {
            match &loop_ctx.break_label {
                Some(label) => cg.emit(format!("br label %{}", label))?,
                // break outside a loop silently no-ops.
                None => {}
            }
            Ok(loop_ctx.break_label.is_some())
        }
        StmtKind::Continue => {
            match &loop_ctx.continue_label {
                Some(label) => cg.emit(format!("br label %{}", label))?,
                None => {}
            }
            Ok(loop_ctx.continue_label.is_some())
        }
    }
}

fn codegen_compound(cg: &mut CodeGen, stmts: &[Stmt], func: &FuncCtx, loop_ctx: &LoopCtx) -> Result<bool, CodegenError> {
    cg.symtab.push_scope();
    let mut terminated = false;
    for s in stmts {
        if terminated {
            break;
        }
        terminated = codegen_stmt(cg, s, func, loop_ctx)?;
    }
    cg.symtab.pop_scope();
    Ok(terminated)
}

fn codegen_return(cg: &mut CodeGen, expr: Option<&crate::ast::Expr>, func: &FuncCtx, stmt: &Stmt) -> Result<bool, CodegenError> {
    match expr {
        Some(e) => {
            let v = codegen_expr(cg, e)?;
            if v.ty.llvm_type() != func.return_ty.llvm_type() {
                return Err(CodegenError::logic("incompatible type for result type", stmt.span));
            }
            let slot = func
                .return_slot
                .as_ref()
                .expect("a function returning a value always has a return slot");
            cg.emit(format!("store {} {}, ptr {}", v.ty.llvm_type(), v.operand, slot))?;
        }
        None => {
            if !func.return_ty.is_void() {
                return Err(CodegenError::logic("incompatible type for result type", stmt.span));
            }
        }
    }
    cg.emit(format!("br label %{}", func.epilogue))?;
    Ok(true)
}

fn codegen_variable_def(
    cg: &mut CodeGen,
    mutable: bool,
    name: &str,
    ty: Option<&Type>,
    init: Option<&Initializer>,
    stmt: &Stmt,
) -> Result<bool, CodegenError> {
    if ty.is_none() && init.is_none() {
        return Err(CodegenError::logic("type inference requires an initializer", stmt.span));
    }

    let (final_ty, alloca) = match init {
        Some(Initializer::List(elems)) => {
            let mut values = Vec::with_capacity(elems.len());
            for e in elems {
                values.push(codegen_expr(cg, e)?);
            }
            let elem_ty = match ty {
                Some(Type::Array(elem, n)) => {
                    if *n as usize != values.len() {
                        return Err(CodegenError::logic("wrong initializer-list arity", stmt.span));
                    }
                    (**elem).clone()
                }
                Some(other) => {
                    return Err(CodegenError::logic(
                        format!("incompatible type for '{}'", other),
                        stmt.span,
                    ))
                }
                None => {
                    values
                        .first()
                        .map(|v| v.ty.clone())
                        .ok_or_else(|| CodegenError::logic("type inference requires an initializer", stmt.span))?
                }
            };
            let array_ty = Type::Array(Box::new(elem_ty.clone()), values.len() as u64);
            let alloca = cg.fresh_temp();
            cg.emit(format!("{} = alloca {}", alloca, array_ty.llvm_type()))?;
            for (i, v) in values.iter().enumerate() {
                if v.ty.llvm_type() != elem_ty.llvm_type() {
                    return Err(CodegenError::logic("incompatible type for array element", stmt.span));
                }
                let gep = cg.fresh_temp();
                cg.emit(format!(
                    "{} = getelementptr inbounds {}, ptr {}, i32 0, i32 {}",
                    gep,
                    array_ty.llvm_type(),
                    alloca,
                    i
                ))?;
                cg.emit(format!("store {} {}, ptr {}", elem_ty.llvm_type(), v.operand, gep))?;
            }
            (array_ty, alloca)
        }
        Some(Initializer::Expr(e)) => {
            let v = codegen_expr(cg, e)?;
            let final_ty = match ty {
                Some(t) => {
                    if t.llvm_type() != v.ty.llvm_type() || t.bit_width() != v.ty.bit_width() {
                        return Err(CodegenError::logic(
                            "incompatible type for variable initializer",
                            stmt.span,
                        ));
                    }
                    t.clone()
                }
                None => v.ty.clone(),
            };
            let alloca = cg.fresh_temp();
            cg.emit(format!("{} = alloca {}", alloca, final_ty.llvm_type()))?;
            cg.emit(format!("store {} {}, ptr {}", final_ty.llvm_type(), v.operand, alloca))?;
            (final_ty, alloca)
        }
        None => {
            let declared = ty.expect("checked above: type or init present").clone();
            let alloca = cg.fresh_temp();
            cg.emit(format!("{} = alloca {}", alloca, declared.llvm_type()))?;
            (declared, alloca)
        }
    };

    if !cg.symtab.declare(name, VarRecord { ty: final_ty, mutable, alloca }) {
        return Err(CodegenError::logic(format!("redefinition of '{}'", name), stmt.span));
    }
    Ok(false)
}

fn codegen_assignment(
    cg: &mut CodeGen,
    lhs: &crate::ast::Expr,
    kind: AssignKind,
    rhs: &crate::ast::Expr,
    stmt: &Stmt,
) -> Result<bool, CodegenError> {
    let lv = codegen_lvalue(cg, lhs)?;
    if !lv.mutable {
        return Err(CodegenError::logic("assignment of read-only variable", stmt.span));
    }
    let rhs_v = codegen_expr(cg, rhs)?;

    let store_value = match kind {
        AssignKind::Direct => {
            if lv.ty.llvm_type() != rhs_v.ty.llvm_type() {
                return Err(CodegenError::logic("incompatible type for assignment", stmt.span));
            }
            rhs_v
        }
        AssignKind::Add | AssignKind::Sub | AssignKind::Mul | AssignKind::Div | AssignKind::Mod => {
            let current = Value::new(
                {
                    let t = cg.fresh_temp();
                    cg.emit(format!("{} = load {}, ptr {}", t, lv.ty.llvm_type(), lv.ptr))?;
                    t
                },
                lv.ty.clone(),
            );
            let op = match kind {
                AssignKind::Add => crate::ast::BinOpKind::Add,
                AssignKind::Sub => crate::ast::BinOpKind::Sub,
                AssignKind::Mul => crate::ast::BinOpKind::Mul,
                AssignKind::Div => crate::ast::BinOpKind::Div,
                AssignKind::Mod => crate::ast::BinOpKind::Mod,
                AssignKind::Direct => unreachable!(),
            };
            arith_op(cg, op, current, rhs_v, stmt.span)?
        }
    };
    cg.emit(format!("store {} {}, ptr {}", lv.ty.llvm_type(), store_value.operand, lv.ptr))?;
    Ok(false)
}

fn codegen_inc_dec(cg: &mut CodeGen, kind: IncDecKind, target: &crate::ast::Expr, stmt: &Stmt) -> Result<bool, CodegenError> {
    let lv = codegen_lvalue(cg, target)?;
    if !lv.mutable {
        return Err(CodegenError::logic("assignment of read-only variable", stmt.span));
    }
    let current = load_lvalue(cg, &lv)?;
    let instr = match kind {
        IncDecKind::Inc => "add",
        IncDecKind::Dec => "sub",
    };
    let t = cg.fresh_temp();
    cg.emit(format!("{} = {} {} {}, 1", t, instr, lv.ty.llvm_type(), current.operand))?;
    cg.emit(format!("store {} {}, ptr {}", lv.ty.llvm_type(), t, lv.ptr))?;
    Ok(false)
}

fn codegen_if(
    cg: &mut CodeGen,
    cond: &crate::ast::Expr,
    then_branch: &Stmt,
    else_branch: Option<&Stmt>,
    func: &FuncCtx,
    loop_ctx: &LoopCtx,
) -> Result<bool, CodegenError> {
    let cond_v = codegen_expr(cg, cond)?;
    let cmp = cg.fresh_temp();
    cg.emit(format!("{} = icmp ne {} {}, 0", cmp, cond_v.ty.llvm_type(), cond_v.operand))?;

    let then_label = cg.fresh_block("if_then");
    let else_label = cg.fresh_block("if_else");
    let merge_label = cg.fresh_block("if_merge");

    cg.emit(format!("br i1 {}, label %{}, label %{}", cmp, then_label, else_label))?;

    cg.emit(format!("{}:", then_label))?;
    let then_terminated = codegen_stmt(cg, then_branch, func, loop_ctx)?;
    if !then_terminated {
        cg.emit(format!("br label %{}", merge_label))?;
    }

    cg.emit(format!("{}:", else_label))?;
    let else_terminated = match else_branch {
        Some(else_stmt) => codegen_stmt(cg, else_stmt, func, loop_ctx)?,
        None => false,
    };
    if !else_terminated {
        cg.emit(format!("br label %{}", merge_label))?;
    }

    if then_terminated && else_terminated {
        // Both arms already terminated the block; the merge label is
        // unreachable but still emitted so later labels stay unambiguous.
        cg.emit(format!("{}:", merge_label))?;
        cg.emit("unreachable")?;
        return Ok(true);
    }
    cg.emit(format!("{}:", merge_label))?;
    Ok(false)
}

fn codegen_loop(cg: &mut CodeGen, body: &Stmt, func: &FuncCtx) -> Result<bool, CodegenError> {
    let body_label = cg.fresh_block("loop_body");
    let end_label = cg.fresh_block("loop_end");

    cg.emit(format!("br label %{}", body_label))?;
    cg.emit(format!("{}:", body_label))?;
    let inner_ctx = LoopCtx { break_label: Some(end_label.clone()), continue_label: Some(body_label.clone()) };
    let terminated = codegen_stmt(cg, body, func, &inner_ctx)?;
    if !terminated {
        cg.emit(format!("br label %{}", body_label))?;
    }
    cg.emit(format!("{}:", end_label))?;
    Ok(false)
}

fn codegen_while(cg: &mut CodeGen, cond: &crate::ast::Expr, body: &Stmt, func: &FuncCtx) -> Result<bool, CodegenError> {
    let cond_label = cg.fresh_block("while_cond");
    let body_label = cg.fresh_block("while_body");
    let end_label = cg.fresh_block("while_end");

    cg.emit(format!("br label %{}", cond_label))?;
    cg.emit(format!("{}:", cond_label))?;
    let cond_v = codegen_expr(cg, cond)?;
    let cmp = cg.fresh_temp();
    cg.emit(format!("{} = icmp ne {} {}, 0", cmp, cond_v.ty.llvm_type(), cond_v.operand))?;
    cg.emit(format!("br i1 {}, label %{}, label %{}", cmp, body_label, end_label))?;

    cg.emit(format!("{}:", body_label))?;
    let inner_ctx = LoopCtx { break_label: Some(end_label.clone()), continue_label: Some(cond_label.clone()) };
    let terminated = codegen_stmt(cg, body, func, &inner_ctx)?;
    if !terminated {
        cg.emit(format!("br label %{}", cond_label))?;
    }
    cg.emit(format!("{}:", end_label))?;
    Ok(false)
}

fn codegen_for(
    cg: &mut CodeGen,
    init: Option<&Stmt>,
    cond: Option<&crate::ast::Expr>,
    step: Option<&Stmt>,
    body: &Stmt,
    func: &FuncCtx,
) -> Result<bool, CodegenError> {
    cg.symtab.push_scope();
    let no_loop_ctx = LoopCtx::default();
    if let Some(init) = init {
        codegen_stmt(cg, init, func, &no_loop_ctx)?;
    }

    let cond_label = cg.fresh_block("for_cond");
    let body_label = cg.fresh_block("for_body");
    let step_label = cg.fresh_block("for_step");
    let end_label = cg.fresh_block("for_end");

    cg.emit(format!("br label %{}", cond_label))?;
    cg.emit(format!("{}:", cond_label))?;
    match cond {
        Some(cond) => {
            let cond_v = codegen_expr(cg, cond)?;
            let cmp = cg.fresh_temp();
            cg.emit(format!("{} = icmp ne {} {}, 0", cmp, cond_v.ty.llvm_type(), cond_v.operand))?;
            cg.emit(format!("br i1 {}, label %{}, label %{}", cmp, body_label, end_label))?;
        }
        None => {
            cg.emit(format!("br label %{}", body_label))?;
        }
    }

    cg.emit(format!("{}:", body_label))?;
    let inner_ctx = LoopCtx { break_label: Some(end_label.clone()), continue_label: Some(step_label.clone()) };
    let terminated = codegen_stmt(cg, body, func, &inner_ctx)?;
    if !terminated {
        cg.emit(format!("br label %{}", step_label))?;
    }

    cg.emit(format!("{}:", step_label))?;
    if let Some(step) = step {
        codegen_stmt(cg, step, func, &no_loop_ctx)?;
    }
    cg.emit(format!("br label %{}", cond_label))?;

    cg.emit(format!("{}:", end_label))?;
    cg.symtab.pop_scope();
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinOpKind, Expr, ExprKind};
    use crate::source::Span;

    fn bool_lit(b: bool) -> crate::ast::Expr {
        Expr::new(ExprKind::BoolLiteral(b), Span::new(0, 0))
    }

    fn func_ctx() -> FuncCtx {
        FuncCtx { return_slot: None, return_ty: Type::void(), epilogue: "epilogue".into() }
    }

    #[test]
    fn break_outside_loop_is_a_noop() {
        let mut cg = CodeGen::new("t.gl");
        let stmt = Stmt::new(StmtKind::Break, Span::new(0, 0));
        let terminated = codegen_stmt(&mut cg, &stmt, &func_ctx(), &LoopCtx::default()).unwrap();
        assert!(!terminated);
        assert!(cg.body.is_empty());
    }

    #[test]
    fn redefinition_in_same_block_is_rejected() {
        let mut cg = CodeGen::new("t.gl");
        let func = func_ctx();
        let def = |v: u64| {
            Stmt::new(
                StmtKind::VariableDef {
                    mutable: false,
                    name: "x".into(),
                    ty: None,
                    init: Some(Initializer::Expr(Expr::new(
                        ExprKind::IntLiteral { value: v, ty: Type::Builtin(crate::types::BuiltinKind::I32) },
                        Span::new(0, 0),
                    ))),
                },
                Span::new(0, 0),
            )
        };
        let compound = Stmt::new(StmtKind::Compound(vec![def(1), def(2)]), Span::new(0, 0));
        let err = codegen_stmt(&mut cg, &compound, &func, &LoopCtx::default()).unwrap_err();
        assert!(err.message().contains("redefinition"));
    }

    #[test]
    fn shadowing_across_nested_blocks_is_allowed() {
        let mut cg = CodeGen::new("t.gl");
        let func = func_ctx();
        let inner_def = Stmt::new(
            StmtKind::VariableDef {
                mutable: false,
                name: "x".into(),
                ty: None,
                init: Some(Initializer::Expr(bool_lit(true))),
            },
            Span::new(0, 0),
        );
        let outer_def = Stmt::new(
            StmtKind::VariableDef {
                mutable: false,
                name: "x".into(),
                ty: None,
                init: Some(Initializer::Expr(bool_lit(false))),
            },
            Span::new(0, 0),
        );
        let inner_block = Stmt::new(StmtKind::Compound(vec![inner_def]), Span::new(0, 0));
        let outer = Stmt::new(StmtKind::Compound(vec![outer_def, inner_block]), Span::new(0, 0));
        assert!(codegen_stmt(&mut cg, &outer, &func, &LoopCtx::default()).is_ok());
    }

    #[test]
    fn compound_short_circuits_after_return() {
        let mut cg = CodeGen::new("t.gl");
        let func = FuncCtx {
            return_slot: None,
            return_ty: Type::void(),
            epilogue: "epilogue".into(),
        };
        let unreachable_break = Stmt::new(StmtKind::Break, Span::new(0, 0));
        let ret = Stmt::new(StmtKind::Return(None), Span::new(0, 0));
        let compound = Stmt::new(StmtKind::Compound(vec![ret, unreachable_break]), Span::new(0, 0));
        let terminated = codegen_stmt(&mut cg, &compound, &func, &LoopCtx::default()).unwrap();
        assert!(terminated);
        assert_eq!(cg.body.matches("br label").count(), 1);
    }

    #[test]
    fn while_loop_wires_break_and_continue_to_cond_and_end() {
        let mut cg = CodeGen::new("t.gl");
        let func = func_ctx();
        let body = Stmt::new(
            StmtKind::Compound(vec![
                Stmt::new(
                    StmtKind::If {
                        cond: bool_lit(true),
                        then_branch: Box::new(Stmt::new(StmtKind::Break, Span::new(0, 0))),
                        else_branch: None,
                    },
                    Span::new(0, 0),
                ),
                Stmt::new(StmtKind::Continue, Span::new(0, 0)),
            ]),
            Span::new(0, 0),
        );
        let while_stmt = Stmt::new(StmtKind::While { cond: bool_lit(true), body: Box::new(body) }, Span::new(0, 0));
        codegen_stmt(&mut cg, &while_stmt, &func, &LoopCtx::default()).unwrap();
        assert!(cg.body.contains("while_cond"));
        assert!(cg.body.contains("while_end"));
    }

    #[test]
    fn binop_kind_reused_by_compound_assign() {
        assert_eq!(BinOpKind::Add, BinOpKind::Add);
    }
}
