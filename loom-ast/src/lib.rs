#![forbid(unsafe_code)]

use miette::SourceSpan;

mod builder;
mod graph;
mod nodes;

pub use builder::GraphBuilder;
pub use graph::Graph;
pub use nodes::{
    BinOp, EnumDef, Expr, ExprKind, FieldDef, Func, Local, MatchArm, Stmt, StmtKind, StructDef,
    TypeNode, UnaryOp, VariantDef,
};

pub type Span = SourceSpan;

pub fn span(start: usize, len: usize) -> Span {
    SourceSpan::new(start.into(), len)
}

pub fn span_between(start: usize, end: usize) -> Span {
    debug_assert!(end >= start);
    span(start, end - start)
}
