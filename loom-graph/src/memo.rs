#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::marker::PhantomData;

use crate::error::GraphError;
use crate::handle::{Idx, NodeRef};

/// Lifecycle of one memoized attribute value. The in-progress state is what
/// turns a self-dependent computation into a reported `CyclicAttribute`
/// instead of unbounded recursion.
#[derive(Clone, Debug)]
enum MemoState<T> {
    Unevaluated,
    InProgress,
    Done(T),
}

/// One lazily computed, memoized attribute over every node of one kind.
///
/// A pass layer owns one `AttrTable` per attribute it declares, sized to the
/// store it extends. Values are computed on first demand and at most once;
/// demand-driven evaluation is what lets attributes of different nodes (and
/// different tables of the same layer) reference each other, as long as no
/// cycle exists among the values actually demanded.
///
/// Interior mutability is a `RefCell` per cell; the engine is single-threaded
/// by contract, so no synchronization is involved.
#[derive(Debug)]
pub struct AttrTable<I, T> {
    attr: &'static str,
    cells: Vec<RefCell<MemoState<T>>>,
    _marker: PhantomData<I>,
}

impl<I: Idx, T: Clone> AttrTable<I, T> {
    /// An attribute table for a store currently holding `len` nodes of the
    /// kind `I` indexes.
    pub fn new(attr: &'static str, len: usize) -> Self {
        AttrTable {
            attr,
            cells: (0..len).map(|_| RefCell::new(MemoState::Unevaluated)).collect(),
            _marker: PhantomData,
        }
    }

    pub fn attr(&self) -> &'static str {
        self.attr
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Return the memoized value for `id`, running `compute` exactly once on
    /// first demand.
    ///
    /// Re-entrant forcing of the same cell fails with `CyclicAttribute`
    /// naming the attribute and the node; the error is fatal to the layer
    /// being constructed, which may not partially succeed.
    pub fn force<E>(&self, id: I, compute: impl FnOnce() -> Result<T, E>) -> Result<T, E>
    where
        E: From<GraphError>,
    {
        let cell = self
            .cells
            .get(id.raw() as usize)
            .ok_or(GraphError::UnknownNode {
                node: NodeRef::of(id),
            })?;

        {
            let mut state = cell.borrow_mut();
            match &*state {
                MemoState::Done(value) => return Ok(value.clone()),
                MemoState::InProgress => {
                    return Err(GraphError::CyclicAttribute {
                        attr: self.attr,
                        node: NodeRef::of(id),
                    }
                    .into());
                }
                MemoState::Unevaluated => *state = MemoState::InProgress,
            }
        }

        // The cell borrow is released before running the computation, which
        // may recursively force other cells of this or sibling tables.
        let value = compute()?;
        *cell.borrow_mut() = MemoState::Done(value.clone());
        Ok(value)
    }

    /// The value for `id` if it has already been computed. Never triggers
    /// evaluation.
    pub fn peek(&self, id: I) -> Option<T> {
        let cell = self.cells.get(id.raw() as usize)?;
        match &*cell.borrow() {
            MemoState::Done(value) => Some(value.clone()),
            _ => None,
        }
    }
}
