//! Expression codegen: sign-propagation and arithmetic-lowering rules
//! for binary/unary operators, conversions, calls, and lvalue access.

use crate::ast::{BinOpKind, Expr, ExprKind, UnaryOpKind};
use crate::codegen::error::CodegenError;
use crate::codegen::state::{CodeGen, Value};
use crate::types::{BuiltinKind, Type};

fn top_signed(v: &Value) -> bool {
    *v.signs.last().expect("sign stack is never empty for a non-void value")
}

/// An assignable storage location: the pointer operand to it, its
/// pointee type, and whether writing through it is permitted (spec
/// §4.4 "Assignable expressions").
pub struct LValue {
    pub ptr: String,
    pub ty: Type,
    pub mutable: bool,
}

pub fn codegen_lvalue(cg: &mut CodeGen, expr: &Expr) -> Result<LValue, CodegenError> {
    match &expr.kind {
        ExprKind::Identifier(name) => {
            let record = cg
                .symtab
                .lookup(name)
                .ok_or_else(|| CodegenError::logic(format!("unknown identifier '{}'", name), expr.span))?;
            Ok(LValue { ptr: record.alloca.clone(), ty: record.ty.clone(), mutable: record.mutable })
        }
        ExprKind::UnaryOp(UnaryOpKind::Deref, inner) => {
            let val = codegen_expr(cg, inner)?;
            let Type::Pointer(pointee) = val.ty else {
                return Err(CodegenError::logic("dereference of non-pointer value", expr.span));
            };
            Ok(LValue { ptr: val.operand, ty: *pointee, mutable: true })
        }
        ExprKind::Subscript(name, index) => {
            let record = cg
                .symtab
                .lookup(name)
                .ok_or_else(|| CodegenError::logic(format!("unknown identifier '{}'", name), expr.span))?
                .clone();
            let elem = match &record.ty {
                Type::Array(elem, _) => (**elem).clone(),
                other => return Err(CodegenError::logic(format!("'{}' is not subscriptable", other), expr.span)),
            };
            let idx = codegen_expr(cg, index)?;
            let t = cg.fresh_temp();
            cg.emit(format!(
                "{} = getelementptr inbounds {}, ptr {}, i32 0, {} {}",
                t,
                record.ty.llvm_type(),
                record.alloca,
                idx.ty.llvm_type(),
                idx.operand
            ))?;
            Ok(LValue { ptr: t, ty: elem, mutable: record.mutable })
        }
        _ => Err(CodegenError::logic("left-hand side value requires assignable", expr.span)),
    }
}

pub fn load_lvalue(cg: &mut CodeGen, lv: &LValue) -> Result<Value, CodegenError> {
    let t = cg.fresh_temp();
    cg.emit(format!("{} = load {}, ptr {}", t, lv.ty.llvm_type(), lv.ptr))?;
    Ok(Value::new(t, lv.ty.clone()))
}

/// Infers an expression's static type without emitting any IR for it.
/// Used only by `sizeof`, which must not evaluate its operand.
pub fn infer_type(cg: &CodeGen, expr: &Expr) -> Result<Type, CodegenError> {
    match &expr.kind {
        ExprKind::Nil => Ok(Type::Pointer(Box::new(Type::void()))),
        ExprKind::Identifier(name) => cg
            .symtab
            .lookup(name)
            .map(|r| r.ty.clone())
            .ok_or_else(|| CodegenError::logic(format!("unknown identifier '{}'", name), expr.span)),
        ExprKind::IntLiteral { ty, .. } => Ok(ty.clone()),
        ExprKind::BoolLiteral(_) => Ok(Type::Builtin(BuiltinKind::Bool)),
        ExprKind::CharLit(_) => Ok(Type::Builtin(BuiltinKind::Char)),
        ExprKind::StringLit(_) => Ok(Type::Pointer(Box::new(Type::Builtin(BuiltinKind::I8)))),
        ExprKind::Conversion(_, ty) => Ok(ty.clone()),
        ExprKind::UnaryOp(UnaryOpKind::Not, _) => Ok(Type::Builtin(BuiltinKind::Bool)),
        ExprKind::UnaryOp(UnaryOpKind::SizeOf, _) => Ok(Type::Builtin(BuiltinKind::U64)),
        ExprKind::UnaryOp(UnaryOpKind::AddrOf, inner) => {
            Ok(Type::Pointer(Box::new(infer_type(cg, inner)?)))
        }
        ExprKind::UnaryOp(UnaryOpKind::Deref, inner) => match infer_type(cg, inner)? {
            Type::Pointer(pointee) => Ok(*pointee),
            other => Err(CodegenError::logic(format!("dereference of non-pointer type '{}'", other), expr.span)),
        },
        ExprKind::UnaryOp(UnaryOpKind::Plus, inner) | ExprKind::UnaryOp(UnaryOpKind::Neg, inner) => {
            infer_type(cg, inner)
        }
        ExprKind::Subscript(name, _) => {
            let record = cg
                .symtab
                .lookup(name)
                .ok_or_else(|| CodegenError::logic(format!("unknown identifier '{}'", name), expr.span))?;
            match &record.ty {
                Type::Array(elem, _) => Ok((**elem).clone()),
                other => Err(CodegenError::logic(format!("'{}' is not subscriptable", other), expr.span)),
            }
        }
        ExprKind::FunctionCall(name, _) => cg
            .lookup_function(name)
            .map(|d| d.return_type.clone())
            .ok_or_else(|| CodegenError::logic(format!("call to undeclared function '{}'", name), expr.span)),
        ExprKind::BinOp(lhs, op, rhs) => {
            if matches!(op, BinOpKind::Eq | BinOpKind::Ne | BinOpKind::Lt | BinOpKind::Gt | BinOpKind::Le | BinOpKind::Ge)
            {
                Ok(Type::Builtin(BuiltinKind::Bool))
            } else {
                let lhs_ty = infer_type(cg, lhs)?;
                if lhs_ty.is_signed() {
                    Ok(lhs_ty)
                } else {
                    let rhs_ty = infer_type(cg, rhs)?;
                    if rhs_ty.is_signed() {
                        Ok(rhs_ty)
                    } else {
                        Ok(lhs_ty)
                    }
                }
            }
        }
    }
}

pub fn codegen_expr(cg: &mut CodeGen, expr: &Expr) -> Result<Value, CodegenError> {
    match &expr.kind {
        ExprKind::Nil => Ok(Value::new("null", Type::Pointer(Box::new(Type::void())))),
        ExprKind::IntLiteral { value, ty } => Ok(Value::new(value.to_string(), ty.clone())),
        ExprKind::BoolLiteral(b) => {
            Ok(Value::new(if *b { "1" } else { "0" }, Type::Builtin(BuiltinKind::Bool)))
        }
        ExprKind::CharLit(code) => Ok(Value::new(code.to_string(), Type::Builtin(BuiltinKind::Char))),
        ExprKind::StringLit(s) => {
            let global = cg.get_string_global(s)?;
            Ok(Value::new(global, Type::Pointer(Box::new(Type::Builtin(BuiltinKind::I8)))))
        }
        ExprKind::Identifier(_) | ExprKind::Subscript(_, _) => {
            let lv = codegen_lvalue(cg, expr)?;
            load_lvalue(cg, &lv)
        }
        ExprKind::UnaryOp(kind, inner) => codegen_unary(cg, *kind, inner, expr),
        ExprKind::BinOp(lhs, op, rhs) => codegen_binop(cg, lhs, *op, rhs, expr),
        ExprKind::Conversion(inner, target) => codegen_conversion(cg, inner, target),
        ExprKind::FunctionCall(name, args) => codegen_call(cg, name, args, expr),
    }
}

fn codegen_unary(cg: &mut CodeGen, kind: UnaryOpKind, inner: &Expr, expr: &Expr) -> Result<Value, CodegenError> {
    match kind {
        UnaryOpKind::Plus => codegen_expr(cg, inner),
        UnaryOpKind::Neg => {
            let v = codegen_expr(cg, inner)?;
            if !matches!(&v.ty, Type::Builtin(k) if *k != BuiltinKind::Void && *k != BuiltinKind::Bool) {
                return Err(CodegenError::logic("unary '-' requires an integer operand", expr.span));
            }
            let t = cg.fresh_temp();
            cg.emit(format!("{} = sub {} 0, {}", t, v.ty.llvm_type(), v.operand))?;
            Ok(Value::new(t, v.ty))
        }
        UnaryOpKind::Not => {
            let v = codegen_expr(cg, inner)?;
            let t = cg.fresh_temp();
            cg.emit(format!("{} = icmp eq {} {}, 0", t, v.ty.llvm_type(), v.operand))?;
            Ok(Value::new(t, Type::Builtin(BuiltinKind::Bool)))
        }
        UnaryOpKind::Deref => {
            let lv = codegen_lvalue(cg, expr)?;
            load_lvalue(cg, &lv)
        }
        UnaryOpKind::AddrOf => {
            let lv = codegen_lvalue(cg, inner)?;
            Ok(Value::new(lv.ptr, Type::Pointer(Box::new(lv.ty))))
        }
        UnaryOpKind::SizeOf => {
            let ty = infer_type(cg, inner)?;
            Ok(Value::new(ty.byte_size().to_string(), Type::Builtin(BuiltinKind::U64)))
        }
    }
}

fn codegen_binop(cg: &mut CodeGen, lhs: &Expr, op: BinOpKind, rhs: &Expr, expr: &Expr) -> Result<Value, CodegenError> {
    let l = codegen_expr(cg, lhs)?;
    let r = codegen_expr(cg, rhs)?;
    if l.ty.llvm_type() != r.ty.llvm_type() {
        return Err(CodegenError::logic(
            format!("operand types differ: '{}' vs '{}'", l.ty, r.ty),
            expr.span,
        ));
    }

    match op {
        BinOpKind::Eq | BinOpKind::Ne | BinOpKind::Lt | BinOpKind::Gt | BinOpKind::Le | BinOpKind::Ge => {
            let signed = top_signed(&l) || top_signed(&r);
            let pred = match op {
                BinOpKind::Eq => "eq",
                BinOpKind::Ne => "ne",
                BinOpKind::Lt => if signed { "slt" } else { "ult" },
                BinOpKind::Gt => if signed { "sgt" } else { "ugt" },
                BinOpKind::Le => if signed { "sle" } else { "ule" },
                BinOpKind::Ge => if signed { "sge" } else { "uge" },
                _ => unreachable!(),
            };
            let t = cg.fresh_temp();
            cg.emit(format!("{} = icmp {} {} {}, {}", t, pred, l.ty.llvm_type(), l.operand, r.operand))?;
            Ok(Value::new(t, Type::Builtin(BuiltinKind::Bool)))
        }
        BinOpKind::Add | BinOpKind::Sub | BinOpKind::Mul | BinOpKind::Div | BinOpKind::Mod => {
            arith_op(cg, op, l, r, expr.span)
        }
    }
}

/// Shared arithmetic lowering for `BinOp` and compound-assignment
/// statements: load the current lvalue, perform the op.
pub fn arith_op(cg: &mut CodeGen, op: BinOpKind, l: Value, r: Value, span: crate::source::Span) -> Result<Value, CodegenError> {
    if l.ty.llvm_type() != r.ty.llvm_type() {
        return Err(CodegenError::logic(
            format!("operand types differ: '{}' vs '{}'", l.ty, r.ty),
            span,
        ));
    }
    let signed = top_signed(&l) || top_signed(&r);
    let result_ty = if top_signed(&l) { l.ty.clone() } else if top_signed(&r) { r.ty.clone() } else { l.ty.clone() };
    let instr = match op {
        BinOpKind::Add => "add",
        BinOpKind::Sub => "sub",
        BinOpKind::Mul => "mul",
        BinOpKind::Div => if signed { "sdiv" } else { "udiv" },
        BinOpKind::Mod => if signed { "srem" } else { "urem" },
        _ => unreachable!("arith_op called with a comparison operator"),
    };
    let t = cg.fresh_temp();
    cg.emit(format!("{} = {} {} {}, {}", t, instr, result_ty.llvm_type(), l.operand, r.operand))?;
    Ok(Value::new(t, result_ty))
}

/// Widens by sign/zero-extending from the source's signedness, narrows
/// by truncation, and treats equal-width reinterpretation (e.g. `i32`
/// `as` `u32`) and pointer-to-pointer casts as no-ops, since both share
/// the same backend type. Integer/pointer casts go through
/// `ptrtoint`/`inttoptr`.
fn codegen_conversion(cg: &mut CodeGen, inner: &Expr, target: &Type) -> Result<Value, CodegenError> {
    let v = codegen_expr(cg, inner)?;
    if v.ty.llvm_type() == target.llvm_type() {
        return Ok(Value::new(v.operand, target.clone()));
    }

    let (from_is_ptr, to_is_ptr) = (matches!(&v.ty, Type::Pointer(_)), matches!(target, Type::Pointer(_)));
    let t = cg.fresh_temp();
    if from_is_ptr && !to_is_ptr {
        cg.emit(format!("{} = ptrtoint ptr {} to {}", t, v.operand, target.llvm_type()))?;
    } else if !from_is_ptr && to_is_ptr {
        cg.emit(format!("{} = inttoptr {} {} to ptr", t, v.ty.llvm_type(), v.operand))?;
    } else {
        let from_width = v.ty.bit_width();
        let to_width = target.bit_width();
        if to_width > from_width {
            let op = if top_signed(&v) { "sext" } else { "zext" };
            cg.emit(format!("{} = {} {} {} to {}", t, op, v.ty.llvm_type(), v.operand, target.llvm_type()))?;
        } else {
            cg.emit(format!("{} = trunc {} {} to {}", t, v.ty.llvm_type(), v.operand, target.llvm_type()))?;
        }
    }
    Ok(Value::new(t, target.clone()))
}

/// Calls resolve their mangled symbol from the callee's own declaration
/// rather than the call site's argument types, so a variadic callee's
/// actual tail arguments never perturb the symbol the definition itself
/// was mangled with.
fn codegen_call(cg: &mut CodeGen, name: &str, args: &[Expr], expr: &Expr) -> Result<Value, CodegenError> {
    let decl = cg
        .lookup_function(name)
        .cloned()
        .ok_or_else(|| CodegenError::logic(format!("call to undeclared function '{}'", name), expr.span))?;

    let mut arg_values = Vec::with_capacity(args.len());
    for arg in args {
        arg_values.push(codegen_expr(cg, arg)?);
    }

    let mangled = cg.mangled_of(&decl);
    let mut param_types: Vec<String> = decl.named_params().map(|(_, _, ty)| ty.llvm_type()).collect();
    if decl.is_variadic() {
        param_types.push("...".to_string());
    }
    let sig = param_types.join(", ");
    let args_ir = arg_values
        .iter()
        .map(|a| format!("{} {}", a.ty.llvm_type(), a.operand))
        .collect::<Vec<_>>()
        .join(", ");
    let ret_llvm = decl.return_type.llvm_type();

    if decl.return_type.is_void() {
        cg.emit(format!("call {} ({}) @{}({})", ret_llvm, sig, mangled, args_ir))?;
        Ok(Value::new("0", Type::void()))
    } else {
        let t = cg.fresh_temp();
        cg.emit(format!("{} = call {} ({}) @{}({})", t, ret_llvm, sig, mangled, args_ir))?;
        Ok(Value::new(t, decl.return_type.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Param;
    use crate::source::Span;
    use crate::symtab::VarRecord;

    fn ident(name: &str) -> Expr {
        Expr::new(ExprKind::Identifier(name.to_string()), Span::new(0, 0))
    }

    fn int_lit(value: u64, ty: Type) -> Expr {
        Expr::new(ExprKind::IntLiteral { value, ty }, Span::new(0, 0))
    }

    #[test]
    fn binop_selects_unsigned_division_for_unsigned_operands() {
        let mut cg = CodeGen::new("t.gl");
        let lhs = int_lit(10, Type::Builtin(BuiltinKind::U32));
        let rhs = int_lit(3, Type::Builtin(BuiltinKind::U32));
        let expr = Expr::new(
            ExprKind::BinOp(Box::new(lhs), BinOpKind::Mod, Box::new(rhs)),
            Span::new(0, 0),
        );
        let v = codegen_expr(&mut cg, &expr).unwrap();
        assert_eq!(v.ty, Type::Builtin(BuiltinKind::U32));
        assert!(cg.body.contains("urem"));
    }

    #[test]
    fn binop_rejects_mismatched_backend_types() {
        let mut cg = CodeGen::new("t.gl");
        let lhs = int_lit(1, Type::Builtin(BuiltinKind::I32));
        let rhs = int_lit(1, Type::Builtin(BuiltinKind::I64));
        let expr = Expr::new(
            ExprKind::BinOp(Box::new(lhs), BinOpKind::Add, Box::new(rhs)),
            Span::new(0, 0),
        );
        assert!(codegen_expr(&mut cg, &expr).is_err());
    }

    #[test]
    fn addr_of_and_deref_round_trip_type() {
        let mut cg = CodeGen::new("t.gl");
        cg.symtab.declare(
            "x",
            VarRecord { ty: Type::Builtin(BuiltinKind::I32), mutable: true, alloca: "%x".into() },
        );
        let addr = Expr::new(ExprKind::UnaryOp(UnaryOpKind::AddrOf, Box::new(ident("x"))), Span::new(0, 0));
        let v = codegen_expr(&mut cg, &addr).unwrap();
        assert_eq!(v.ty, Type::Pointer(Box::new(Type::Builtin(BuiltinKind::I32))));
        assert_eq!(v.signs, vec![true, false]);
    }

    #[test]
    fn sizeof_does_not_emit_instructions_for_its_operand() {
        let mut cg = CodeGen::new("t.gl");
        cg.symtab.declare(
            "arr",
            VarRecord {
                ty: Type::Array(Box::new(Type::Builtin(BuiltinKind::I32)), 4),
                mutable: false,
                alloca: "%arr".into(),
            },
        );
        let e = Expr::new(ExprKind::UnaryOp(UnaryOpKind::SizeOf, Box::new(ident("arr"))), Span::new(0, 0));
        let v = codegen_expr(&mut cg, &e).unwrap();
        assert_eq!(v.operand, "16");
        assert!(cg.body.is_empty());
    }

    #[test]
    fn call_resolves_declared_function_and_mangles_by_decl() {
        let mut cg = CodeGen::new("t.gl");
        cg.functions.insert(
            "add".to_string(),
            FunctionDeclStub::add(),
        );
        let call = Expr::new(
            ExprKind::FunctionCall(
                "add".to_string(),
                vec![int_lit(1, Type::Builtin(BuiltinKind::I32)), int_lit(2, Type::Builtin(BuiltinKind::I32))],
            ),
            Span::new(0, 0),
        );
        let v = codegen_expr(&mut cg, &call).unwrap();
        assert_eq!(v.ty, Type::Builtin(BuiltinKind::I32));
        assert!(cg.body.contains("@_Z3addii"));
    }

    struct FunctionDeclStub;
    impl FunctionDeclStub {
        fn add() -> crate::ast::FunctionDecl {
            crate::ast::FunctionDecl {
                linkage: None,
                name: "add".to_string(),
                params: vec![
                    Param::Named { mutable: false, name: "a".into(), ty: Type::Builtin(BuiltinKind::I32) },
                    Param::Named { mutable: false, name: "b".into(), ty: Type::Builtin(BuiltinKind::I32) },
                ],
                return_type: Type::Builtin(BuiltinKind::I32),
                span: Span::new(0, 0),
            }
        }
    }
}
