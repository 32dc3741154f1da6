//! Itanium-flavored name mangler.
//!
//! Both a function definition and a call site are mangled to
//! `_Z<name-len><name><param-codes>`, where a variadic tail contributes a
//! single trailing `v` code regardless of how many arguments are passed
//! at a given call site (see DESIGN.md for how this was confirmed against
//! a cousin scheme that instead uses `z` for the ellipsis).

use crate::ast::{FunctionDecl, Param};
#[cfg(test)]
use crate::types::Type;

fn mangle(name: &str, param_codes: impl Iterator<Item = String>) -> String {
    let mut out = format!("_Z{}{}", name.len(), name);
    for code in param_codes {
        out.push_str(&code);
    }
    out
}

/// Mangled symbol for a function declaration or definition: one code per
/// named parameter, plus a single `v` if the function is variadic.
pub fn mangle_decl(decl: &FunctionDecl) -> String {
    let codes = decl.params.iter().map(|p| match p {
        Param::Named { ty, .. } => ty.mangled_code(),
        Param::Variadic => "v".to_string(),
    });
    mangle(&decl.name, codes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Span;
    use crate::types::BuiltinKind;

    fn decl(name: &str, params: Vec<Param>) -> FunctionDecl {
        FunctionDecl {
            linkage: None,
            name: name.to_string(),
            params,
            return_type: Type::Builtin(BuiltinKind::I32),
            span: Span::new(0, 0),
        }
    }

    #[test]
    fn mangles_simple_function() {
        let d = decl(
            "add",
            vec![
                Param::Named {
                    mutable: false,
                    name: "a".into(),
                    ty: Type::Builtin(BuiltinKind::I32),
                },
                Param::Named {
                    mutable: false,
                    name: "b".into(),
                    ty: Type::Builtin(BuiltinKind::I32),
                },
            ],
        );
        assert_eq!(mangle_decl(&d), "_Z3addii");
    }

    #[test]
    fn mangles_variadic_with_single_v() {
        let d = decl(
            "printf",
            vec![
                Param::Named {
                    mutable: false,
                    name: "fmt".into(),
                    ty: Type::Pointer(Box::new(Type::Builtin(BuiltinKind::I8))),
                },
                Param::Variadic,
            ],
        );
        assert_eq!(mangle_decl(&d), "_Z6printfPcv");
    }

    #[test]
    fn mangles_pointer_and_array_params() {
        let d = decl(
            "sum",
            vec![Param::Named {
                mutable: false,
                name: "xs".into(),
                ty: Type::Array(Box::new(Type::Builtin(BuiltinKind::I32)), 4),
            }],
        );
        assert_eq!(mangle_decl(&d), "_Z3sumA4_i");
    }
}
