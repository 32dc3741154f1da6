//! Abstract syntax tree for Glyph.
//!
//! Nodes are immutable once built; the parser attaches a `Span` to every
//! node at construction time rather than indexing a side table by node
//! identity (see DESIGN.md).

use crate::source::Span;
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOpKind {
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOpKind {
    Plus,
    Neg,
    Not,
    Deref,
    AddrOf,
    SizeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignKind {
    Direct,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncDecKind {
    Inc,
    Dec,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Nil,
    Identifier(String),
    /// An integer literal's kind is always one of `i32`/`u32`/`i64`/`u64`,
    /// the first of the four numeric literal rules (tried in that order)
    /// that the raw digits fit into.
    IntLiteral { value: u64, ty: Type },
    BoolLiteral(bool),
    StringLit(String),
    CharLit(u32),
    BinOp(Box<Expr>, BinOpKind, Box<Expr>),
    UnaryOp(UnaryOpKind, Box<Expr>),
    Conversion(Box<Expr>, Type),
    Subscript(String, Box<Expr>),
    FunctionCall(String, Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }
}

/// The initializer of a `let` binding: a single expression, or a
/// bracketed list lowered to an array.
#[derive(Debug, Clone, PartialEq)]
pub enum Initializer {
    Expr(Expr),
    List(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Empty,
    Compound(Vec<Stmt>),
    ExprStmt(Expr),
    Return(Option<Expr>),
    VariableDef {
        mutable: bool,
        name: String,
        ty: Option<Type>,
        init: Option<Initializer>,
    },
    Assignment {
        lhs: Expr,
        kind: AssignKind,
        rhs: Expr,
    },
    PrefixIncDec {
        kind: IncDecKind,
        target: Expr,
    },
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    Loop(Box<Stmt>),
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Box<Stmt>>,
        body: Box<Stmt>,
    },
    Break,
    Continue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Stmt { kind, span }
    }
}

/// A function parameter, or the `...` variadic-tail sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Named {
        mutable: bool,
        name: String,
        ty: Type,
    },
    Variadic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub linkage: Option<String>,
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Type,
    pub span: Span,
}

impl FunctionDecl {
    pub fn is_variadic(&self) -> bool {
        matches!(self.params.last(), Some(Param::Variadic))
    }

    pub fn named_params(&self) -> impl Iterator<Item = (&bool, &str, &Type)> {
        self.params.iter().filter_map(|p| match p {
            Param::Named { mutable, name, ty } => Some((mutable, name.as_str(), ty)),
            Param::Variadic => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub decl: FunctionDecl,
    pub body: Stmt,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TopLevel {
    FunctionDecl(FunctionDecl),
    FunctionDef(FunctionDef),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub items: Vec<TopLevel>,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }

    pub fn find_function_def(&self, name: &str) -> Option<&FunctionDef> {
        self.items.iter().find_map(|item| match item {
            TopLevel::FunctionDef(def) if def.decl.name == name => Some(def),
            _ => None,
        })
    }
}
