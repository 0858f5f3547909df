#![forbid(unsafe_code)]

//! The linearity layer: memoized `is_linear` over types, plus the
//! per-struct linear-field table that drives struct dismantling.

use loom_ast::{Graph, TypeNode};
use loom_graph::{AttrTable, FieldId, LocalId, StructId, TypeId};

use crate::error::SemanticError;

/// Attribute layer answering "must values of this type be consumed exactly
/// once". Linearity is decided from the type's root declaration: built-ins
/// carry an explicit flag, user structs and enums are always linear,
/// generic parameters are linear unless declared otherwise, references and
/// function types never own their referent.
pub struct Linearity<'g> {
    graph: &'g Graph,
    linear: AttrTable<TypeId, bool>,
    fields: AttrTable<StructId, Vec<FieldId>>,
}

impl<'g> Linearity<'g> {
    /// Build the layer and force every attribute of every node, in
    /// field-then-node order, so any error surfaces here rather than at a
    /// later lookup.
    pub fn compute(graph: &'g Graph) -> Result<Self, SemanticError> {
        let layer = Linearity {
            graph,
            linear: AttrTable::new("linear", graph.types.len()),
            fields: AttrTable::new("linear_fields", graph.structs.len()),
        };
        for (id, _) in graph.types.iter() {
            layer.is_linear(id)?;
        }
        for (id, _) in graph.structs.iter() {
            layer.linear_fields(id)?;
        }
        Ok(layer)
    }

    pub fn is_linear(&self, ty: TypeId) -> Result<bool, SemanticError> {
        self.linear.force(ty, || {
            Ok(match self.graph.ty(ty)? {
                TypeNode::Builtin { linear, .. } => *linear,
                TypeNode::Struct(_) | TypeNode::Enum(_) => true,
                TypeNode::Generic { linear, .. } => *linear,
                TypeNode::Ref(_) | TypeNode::Func { .. } => false,
            })
        })
    }

    /// The struct's linear fields in declaration order: the domain of a
    /// `partial` state's `removed` set, and its `of` count.
    pub fn linear_fields(&self, id: StructId) -> Result<Vec<FieldId>, SemanticError> {
        self.fields.force(id, || {
            let def = self.graph.struct_def(id)?;
            let mut out = Vec::new();
            for &field in &def.fields {
                if self.is_linear(self.graph.field(field)?.ty)? {
                    out.push(field);
                }
            }
            Ok(out)
        })
    }

    pub fn is_linear_local(&self, local: LocalId) -> Result<bool, SemanticError> {
        self.is_linear(self.graph.local(local)?.ty)
    }
}
