#![forbid(unsafe_code)]

use miette::Diagnostic;
use thiserror::Error;

use crate::handle::{Kind, NodeRef};

/// Internal-consistency failures of the graph store and the attribute
/// engine. Any of these indicates a bug in an earlier pass, not in the
/// program under compilation; all are fatal to the enclosing layer.
#[derive(Clone, Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum GraphError {
    /// A handle's index is absent from its kind's table; the handle was
    /// minted against a different store.
    #[error("unknown node {node}: handle does not belong to this store")]
    #[diagnostic(code(loom::graph::unknown_node))]
    UnknownNode { node: NodeRef },

    /// A kind-erased handle was used where a different kind was required.
    #[error("expected a {expected} handle, got {node}")]
    #[diagnostic(code(loom::graph::unknown_variety))]
    UnknownVariety { expected: Kind, node: NodeRef },

    /// An attribute's computation transitively demanded itself. Never
    /// silently resolved; the whole layer aborts.
    #[error("cyclic attribute: `{attr}` of {node} depends on its own value")]
    #[diagnostic(code(loom::graph::cyclic_attribute))]
    CyclicAttribute { attr: &'static str, node: NodeRef },
}
