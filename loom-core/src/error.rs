#![forbid(unsafe_code)]

use loom_ast::Span;
use loom_graph::GraphError;
use miette::Diagnostic;
use thiserror::Error;

/// Every way a program can fail the semantic passes. All variants are fatal
/// to the compile; the first one raised aborts the enclosing layer, and the
/// driver renders it. Ownership variants name the offending variable or
/// field and carry the source span of the attempted operation.
#[derive(Clone, Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum SemanticError {
    #[error("value '{var}' used after it was moved or dismantled")]
    #[diagnostic(code(loom::ownership::use_after_consume))]
    UseAfterConsume {
        var: String,
        #[label("used here")]
        span: Span,
    },

    #[error("cannot move '{var}' while it is borrowed")]
    #[diagnostic(code(loom::ownership::use_while_borrowed))]
    UseWhileBorrowed {
        var: String,
        #[label("moved here")]
        span: Span,
    },

    #[error("cannot borrow '{var}': value is no longer intact")]
    #[diagnostic(code(loom::ownership::reborrow_of_consumed))]
    ReborrowOfConsumed {
        var: String,
        #[label("borrowed here")]
        span: Span,
    },

    #[error("cannot rebind '{var}': previous linear value is still owned")]
    #[diagnostic(code(loom::ownership::rebind_over_live_linear))]
    RebindOverLiveLinear {
        var: String,
        #[label("rebound here")]
        span: Span,
    },

    #[error("cannot discard '{var}': linear field(s) {} still in place", .missing.join(", "))]
    #[diagnostic(code(loom::ownership::incomplete_dismantle))]
    IncompleteDismantle {
        var: String,
        missing: Vec<String>,
        #[label("discarded here")]
        span: Span,
    },

    #[error("linear value(s) {} not consumed before return", .vars.join(", "))]
    #[diagnostic(code(loom::ownership::not_consumed_before_return))]
    NotConsumedBeforeReturn {
        vars: Vec<String>,
        #[label("function exits here")]
        span: Span,
    },

    #[error("ownership of '{var}' differs between paths: {left} vs {right}")]
    #[diagnostic(code(loom::ownership::inconsistent_across_branches))]
    InconsistentOwnership {
        var: String,
        left: String,
        right: String,
        #[label("paths reconverge here")]
        span: Span,
    },

    #[error("match binding '{var}' not consumed by the end of its arm")]
    #[diagnostic(code(loom::ownership::arm_binding_not_consumed))]
    ArmBindingNotConsumed {
        var: String,
        #[label("bound by this arm")]
        span: Span,
    },

    #[error("cannot assign through linear field '{field}'")]
    #[diagnostic(code(loom::ownership::linear_field_assign))]
    LinearFieldAssign {
        field: String,
        #[label("assigned here")]
        span: Span,
    },

    #[error("cannot discard '{var}': not a struct value")]
    #[diagnostic(code(loom::ownership::discard_non_struct))]
    DiscardNonStruct {
        var: String,
        #[label("discarded here")]
        span: Span,
    },

    #[error("function '{func}' may fall through without returning a value")]
    #[diagnostic(code(loom::shape::missing_return))]
    MissingReturn {
        func: String,
        #[label("declared here")]
        span: Span,
    },

    #[error("statement is unreachable")]
    #[diagnostic(code(loom::shape::unreachable_statement))]
    UnreachableStatement {
        #[label("never reached")]
        span: Span,
    },

    #[error("'continue' is not supported: loops re-check their condition on the back-edge")]
    #[diagnostic(code(loom::shape::unsupported_continue))]
    UnsupportedContinue {
        #[label]
        span: Span,
    },

    #[error("'break' outside of a loop")]
    #[diagnostic(code(loom::shape::break_outside_loop))]
    BreakOutsideLoop {
        #[label]
        span: Span,
    },

    #[error("match does not cover variant(s) {}", .missing.join(", "))]
    #[diagnostic(code(loom::shape::non_exhaustive_match))]
    NonExhaustiveMatch {
        missing: Vec<String>,
        #[label("in this match")]
        span: Span,
    },

    #[error("duplicate match arm for variant '{variant}'")]
    #[diagnostic(code(loom::shape::duplicate_match_arm))]
    DuplicateMatchArm {
        variant: String,
        #[label("second arm here")]
        span: Span,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),
}
