//! Error scenarios that must surface the documented phrase regardless of
//! whether an LLVM toolchain is available, since they fail during parse
//! or codegen, before any `clang`/`lli` invocation.

#[test]
fn missing_initializer_rejects_type_inference() {
    let err = glyphc::compile_str("func f() -> i32 { let x; return 0; }", "t.gl").unwrap_err();
    assert!(err.to_string().contains("type inference requires an initializer"));
}

#[test]
fn assignment_to_immutable_binding_is_rejected() {
    let err = glyphc::compile_str("func f() -> i32 { let x: i32 = 1; x = 2; return x; }", "t.gl").unwrap_err();
    assert!(err.to_string().contains("assignment of read-only variable"));
}

#[test]
fn returning_a_bool_from_an_i32_function_is_rejected() {
    let err = glyphc::compile_str("func f() -> i32 { return true; }", "t.gl").unwrap_err();
    assert!(err.to_string().contains("incompatible type for result type"));
}
