#![forbid(unsafe_code)]

mod error;
mod flow;
mod linear;
mod shape;
mod state;

pub use error::SemanticError;
pub use flow::{FlowChecker, FlowOutcome};
pub use linear::Linearity;
pub use shape::{Reach, ShapeLayer};
pub use state::{OwnState, OwnerMap, merge_all};

use loom_ast::Graph;

/// Run the semantic layers over a whole program graph, in order: linearity,
/// control-flow shape, then the ownership flow check of every function.
///
/// A successful return is the sole contract the code generator relies on:
/// the program is ownership-valid. The first error aborts the run; a
/// compiler pass may not partially succeed.
pub fn check_program(graph: &Graph) -> Result<(), SemanticError> {
    let linearity = Linearity::compute(graph)?;
    ShapeLayer::compute(graph)?.validate()?;
    FlowChecker::new(graph, &linearity).check_all()
}
