//! Type system for Glyph
//!
//! A `Type` is either a builtin scalar, a pointer, or a fixed-size array.
//! Each type knows its backend (LLVM IR) projection, its signedness, and
//! its mangled-name code (see `crate::mangle`).

/// Builtin scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinKind {
    Void,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    Bool,
    /// 32-bit Unicode code point, unsigned, distinct from `U32`.
    Char,
}

impl BuiltinKind {
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            BuiltinKind::I8 | BuiltinKind::I16 | BuiltinKind::I32 | BuiltinKind::I64
        )
    }

    /// Width in bits. `Void` has no width; callers must not ask.
    pub fn bit_width(self) -> u32 {
        match self {
            BuiltinKind::Void => unreachable!("void has no bit width"),
            BuiltinKind::I8 | BuiltinKind::U8 => 8,
            BuiltinKind::I16 | BuiltinKind::U16 => 16,
            BuiltinKind::I32 | BuiltinKind::U32 | BuiltinKind::Char => 32,
            BuiltinKind::I64 | BuiltinKind::U64 => 64,
            BuiltinKind::Bool => 1,
        }
    }

    pub fn llvm_type(self) -> &'static str {
        match self {
            BuiltinKind::Void => "void",
            BuiltinKind::I8 | BuiltinKind::U8 => "i8",
            BuiltinKind::I16 | BuiltinKind::U16 => "i16",
            BuiltinKind::I32 | BuiltinKind::U32 | BuiltinKind::Char => "i32",
            BuiltinKind::I64 | BuiltinKind::U64 => "i64",
            BuiltinKind::Bool => "i1",
        }
    }

    /// Itanium-flavored single-letter mangled code (see `crate::mangle`).
    pub fn mangled_code(self) -> &'static str {
        match self {
            BuiltinKind::Void => "v",
            BuiltinKind::I8 => "c",
            BuiltinKind::U8 => "h",
            BuiltinKind::I16 => "s",
            BuiltinKind::U16 => "t",
            BuiltinKind::I32 => "i",
            BuiltinKind::U32 => "j",
            BuiltinKind::I64 => "l",
            BuiltinKind::U64 => "m",
            BuiltinKind::Bool => "b",
            BuiltinKind::Char => "Di",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BuiltinKind::Void => "void",
            BuiltinKind::I8 => "i8",
            BuiltinKind::U8 => "u8",
            BuiltinKind::I16 => "i16",
            BuiltinKind::U16 => "u16",
            BuiltinKind::I32 => "i32",
            BuiltinKind::U32 => "u32",
            BuiltinKind::I64 => "i64",
            BuiltinKind::U64 => "u64",
            BuiltinKind::Bool => "bool",
            BuiltinKind::Char => "char",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "void" => BuiltinKind::Void,
            "i8" => BuiltinKind::I8,
            "u8" => BuiltinKind::U8,
            "i16" => BuiltinKind::I16,
            "u16" => BuiltinKind::U16,
            "i32" => BuiltinKind::I32,
            "u32" => BuiltinKind::U32,
            "i64" => BuiltinKind::I64,
            "u64" => BuiltinKind::U64,
            "bool" => BuiltinKind::Bool,
            "char" => BuiltinKind::Char,
            _ => return None,
        })
    }
}

/// A type in the Glyph language: a builtin scalar, a pointer, or a
/// fixed-size array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Builtin(BuiltinKind),
    Pointer(Box<Type>),
    Array(Box<Type>, u64),
}

impl Type {
    pub fn void() -> Self {
        Type::Builtin(BuiltinKind::Void)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Builtin(BuiltinKind::Void))
    }

    /// Signed for `iN`; unsigned for `uN`, `bool`, `char`, pointers, and
    /// arrays.
    pub fn is_signed(&self) -> bool {
        match self {
            Type::Builtin(k) => k.is_signed(),
            Type::Pointer(_) | Type::Array(_, _) => false,
        }
    }

    /// Backend-type projection: the LLVM IR textual type for this type.
    pub fn llvm_type(&self) -> String {
        match self {
            Type::Builtin(k) => k.llvm_type().to_string(),
            Type::Pointer(_) => "ptr".to_string(),
            Type::Array(elem, n) => format!("[{} x {}]", n, elem.llvm_type()),
        }
    }

    /// Allocation size in bytes, assuming a 64-bit target with pointers
    /// 8 bytes wide. Used by `sizeof`.
    pub fn byte_size(&self) -> u64 {
        match self {
            Type::Builtin(BuiltinKind::Void) => 0,
            Type::Builtin(k) => (k.bit_width() as u64).div_ceil(8),
            Type::Pointer(_) => 8,
            Type::Array(elem, n) => elem.byte_size() * n,
        }
    }

    /// Number of bits for integer-width-mismatch checks. `Bool` counts as
    /// 1, matching the backend's `i1` representation.
    pub fn bit_width(&self) -> u32 {
        match self {
            Type::Builtin(k) => k.bit_width(),
            Type::Pointer(_) => 64,
            Type::Array(_, _) => 0,
        }
    }

    pub fn pointer_indirection_count(&self) -> usize {
        match self {
            Type::Pointer(inner) => 1 + inner.pointer_indirection_count(),
            _ => 0,
        }
    }

    /// Mangled-name token for this type.
    pub fn mangled_code(&self) -> String {
        match self {
            Type::Builtin(k) => k.mangled_code().to_string(),
            Type::Pointer(inner) => format!("P{}", inner.mangled_code()),
            Type::Array(inner, n) => format!("A{}_{}", n, inner.mangled_code()),
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Builtin(k) => write!(f, "{}", k.name()),
            Type::Pointer(inner) => write!(f, "*{}", inner),
            Type::Array(inner, n) => write!(f, "{}[{}]", inner, n),
        }
    }
}

/// Per-value sign metadata: a LIFO sequence whose depth is
/// `1 + pointer_indirection_count(type)`. The last element is the
/// signedness of the outermost type; popping corresponds to one
/// dereference.
pub type SignStack = Vec<bool>;

/// Build the sign stack for a type, innermost-first so the outermost
/// level sits on top (the end of the `Vec`, poppable with `Vec::pop`).
pub fn sign_stack_for(ty: &Type) -> SignStack {
    let mut layers: Vec<&Type> = Vec::new();
    let mut cur = ty;
    loop {
        layers.push(cur);
        match cur {
            Type::Pointer(inner) => cur = inner,
            _ => break,
        }
    }
    layers.iter().rev().map(|t| t.is_signed()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_sign_stack() {
        let i32_t = Type::Builtin(BuiltinKind::I32);
        assert_eq!(sign_stack_for(&i32_t), vec![true]);
        let u32_t = Type::Builtin(BuiltinKind::U32);
        assert_eq!(sign_stack_for(&u32_t), vec![false]);
    }

    #[test]
    fn pointer_sign_stack_depth() {
        let p = Type::Pointer(Box::new(Type::Builtin(BuiltinKind::I32)));
        assert_eq!(sign_stack_for(&p), vec![true, false]);
        assert_eq!(p.pointer_indirection_count(), 1);

        let pp = Type::Pointer(Box::new(p));
        assert_eq!(sign_stack_for(&pp), vec![true, false, false]);
        assert_eq!(pp.pointer_indirection_count(), 2);
    }

    #[test]
    fn mangled_codes() {
        assert_eq!(Type::Builtin(BuiltinKind::I32).mangled_code(), "i");
        assert_eq!(Type::Builtin(BuiltinKind::Char).mangled_code(), "Di");
        let p = Type::Pointer(Box::new(Type::Builtin(BuiltinKind::I8)));
        assert_eq!(p.mangled_code(), "Pc");
        let a = Type::Array(Box::new(Type::Builtin(BuiltinKind::I32)), 3);
        assert_eq!(a.mangled_code(), "A3_i");
    }

    #[test]
    fn byte_sizes() {
        assert_eq!(Type::Builtin(BuiltinKind::I8).byte_size(), 1);
        assert_eq!(Type::Builtin(BuiltinKind::I64).byte_size(), 8);
        assert_eq!(Type::Pointer(Box::new(Type::Builtin(BuiltinKind::I32))).byte_size(), 8);
        let a = Type::Array(Box::new(Type::Builtin(BuiltinKind::I32)), 4);
        assert_eq!(a.byte_size(), 16);
    }
}
