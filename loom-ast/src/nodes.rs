#![forbid(unsafe_code)]

//! The typed node payloads of the annotated AST-as-graph.
//!
//! The excluded front end (parser, name resolution, type checker) produces a
//! [`Graph`](crate::Graph) whose records already carry resolved handles:
//! every name reference holds its declaration's `LocalId`, every expression
//! its `TypeId`, every dotted access its `FieldId`. The semantic passes in
//! `loom-core` only ever navigate handles; they never resolve names.

use loom_graph::{EnumId, ExprId, FieldId, FuncId, LocalId, StmtId, StructId, TypeId, VariantId};

use crate::Span;

/// A resolved type. Linearity is decided from the root declaration: structs
/// and enums are always linear, built-ins and generic parameters carry an
/// explicit flag, references and function types never own their referent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeNode {
    Builtin { name: String, linear: bool },
    Struct(StructId),
    Enum(EnumId),
    Generic { name: String, linear: bool },
    Ref(TypeId),
    Func { params: Vec<TypeId>, ret: TypeId },
}

#[derive(Clone, Debug)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<FieldId>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct FieldDef {
    pub name: String,
    pub owner: StructId,
    pub ty: TypeId,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct EnumDef {
    pub name: String,
    pub variants: Vec<VariantId>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct VariantDef {
    pub name: String,
    pub owner: EnumId,
    pub payload: Option<TypeId>,
    pub span: Span,
}

/// A function declaration. `body` is `None` for extern declarations, which
/// the semantic passes skip.
#[derive(Clone, Debug)]
pub struct Func {
    pub name: String,
    pub params: Vec<LocalId>,
    pub ret: Option<TypeId>,
    pub body: Option<StmtId>,
    pub span: Span,
}

/// One declared variable (parameter, `var` binding, or match-arm payload
/// binding). The ownership pass keys its state mapping by `LocalId`.
#[derive(Clone, Debug)]
pub struct Local {
    pub name: String,
    pub ty: TypeId,
    pub span: Span,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,

    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,

    And,
    Or,
}

#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: TypeId,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Unit,
    Bool(bool),
    Int(u64),
    Str(String),

    /// A resolved read of a declared variable.
    Var(LocalId),

    /// A resolved reference to a top-level function.
    FuncRef(FuncId),

    /// `base.field`, with the field resolved against the receiver's struct.
    Field { base: ExprId, field: FieldId },

    /// `&target` / `&mut target`. Only direct variable targets may be
    /// borrowed.
    Borrow { target: LocalId, mutable: bool },

    Call { callee: ExprId, args: Vec<ExprId> },
    Unary { op: UnaryOp, operand: ExprId },
    Binary { op: BinOp, lhs: ExprId, rhs: ExprId },
}

#[derive(Clone, Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum StmtKind {
    Expr(ExprId),

    /// `var x = init`.
    Var { local: LocalId, init: ExprId },

    /// `x = value`.
    Assign { target: LocalId, value: ExprId },

    /// `x.f....g = value`: a copy-rebuild of the containing struct, legal
    /// only for non-linear field types.
    AssignField {
        base: LocalId,
        path: Vec<FieldId>,
        value: ExprId,
    },

    /// `discard x`: tears down a struct whose linear fields have all been
    /// extracted (or that never had any).
    Discard { target: LocalId },

    If {
        cond: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    },

    While { cond: ExprId, body: StmtId },

    Match { scrutinee: ExprId, arms: Vec<MatchArm> },

    Return { value: Option<ExprId> },

    Break,
    Continue,

    Block(Vec<StmtId>),
}

#[derive(Clone, Debug)]
pub struct MatchArm {
    pub variant: VariantId,
    pub binding: Option<LocalId>,
    pub body: StmtId,
    pub span: Span,
}
