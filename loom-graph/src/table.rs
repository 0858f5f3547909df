#![forbid(unsafe_code)]

use std::marker::PhantomData;

use crate::error::GraphError;
use crate::handle::{Idx, NodeRef};

/// An append-only arena of node records for one kind, addressed by dense
/// typed indices. Records may gain derived data in later layers but a
/// table never shrinks and never reorders.
#[derive(Clone, Debug)]
pub struct Table<I, T> {
    rows: Vec<T>,
    _marker: PhantomData<I>,
}

impl<I, T> Default for Table<I, T> {
    fn default() -> Self {
        Table {
            rows: Vec::new(),
            _marker: PhantomData,
        }
    }
}

impl<I: Idx, T> Table<I, T> {
    pub fn new() -> Self {
        Table::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Insert a record under a fresh index.
    pub fn alloc(&mut self, row: T) -> I {
        let id = I::new(self.rows.len() as u32);
        self.rows.push(row);
        id
    }

    /// Two-pass insert: the closure receives the about-to-be-returned
    /// handle, so a record may reference itself (or mint children that
    /// reference it) before it is stored.
    pub fn alloc_with(&mut self, f: impl FnOnce(I) -> T) -> I {
        let id = I::new(self.rows.len() as u32);
        let row = f(id);
        self.rows.push(row);
        debug_assert_eq!(self.rows.len() as u32, id.raw() + 1);
        id
    }

    /// Exact lookup. A handle from another store generation fails with
    /// `UnknownNode` rather than panicking.
    pub fn get(&self, id: I) -> Result<&T, GraphError> {
        self.rows.get(id.raw() as usize).ok_or(GraphError::UnknownNode {
            node: NodeRef::of(id),
        })
    }

    pub fn get_mut(&mut self, id: I) -> Result<&mut T, GraphError> {
        self.rows
            .get_mut(id.raw() as usize)
            .ok_or(GraphError::UnknownNode {
                node: NodeRef::of(id),
            })
    }

    /// Iterate every record with its handle, in insertion order. The order
    /// is significant only to diagnostic ordering.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| (I::new(i as u32), row))
    }
}
