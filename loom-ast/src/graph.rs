#![forbid(unsafe_code)]

use loom_graph::{
    EnumId, ExprId, FieldId, FuncId, GraphError, LocalId, StmtId, StructId, Table, TypeId,
    VariantId,
};

use crate::nodes::{EnumDef, Expr, FieldDef, Func, Local, Stmt, StructDef, TypeNode, VariantDef};

/// The node store for one compilation unit: one append-only arena per node
/// kind. Later passes extend it with attribute layers of their own; the
/// store itself is never mutated after the front end finishes building it.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    pub types: Table<TypeId, TypeNode>,
    pub structs: Table<StructId, StructDef>,
    pub fields: Table<FieldId, FieldDef>,
    pub enums: Table<EnumId, EnumDef>,
    pub variants: Table<VariantId, VariantDef>,
    pub funcs: Table<FuncId, Func>,
    pub locals: Table<LocalId, Local>,
    pub exprs: Table<ExprId, Expr>,
    pub stmts: Table<StmtId, Stmt>,
}

impl Graph {
    pub fn new() -> Self {
        Graph::default()
    }

    pub fn ty(&self, id: TypeId) -> Result<&TypeNode, GraphError> {
        self.types.get(id)
    }

    pub fn struct_def(&self, id: StructId) -> Result<&StructDef, GraphError> {
        self.structs.get(id)
    }

    pub fn field(&self, id: FieldId) -> Result<&FieldDef, GraphError> {
        self.fields.get(id)
    }

    pub fn enum_def(&self, id: EnumId) -> Result<&EnumDef, GraphError> {
        self.enums.get(id)
    }

    pub fn variant(&self, id: VariantId) -> Result<&VariantDef, GraphError> {
        self.variants.get(id)
    }

    pub fn func(&self, id: FuncId) -> Result<&Func, GraphError> {
        self.funcs.get(id)
    }

    pub fn local(&self, id: LocalId) -> Result<&Local, GraphError> {
        self.locals.get(id)
    }

    pub fn expr(&self, id: ExprId) -> Result<&Expr, GraphError> {
        self.exprs.get(id)
    }

    pub fn stmt(&self, id: StmtId) -> Result<&Stmt, GraphError> {
        self.stmts.get(id)
    }

    /// The struct behind a type, if the type is (possibly through a
    /// reference) a struct type. Used by discard and field-access checking.
    pub fn struct_of(&self, ty: TypeId) -> Result<Option<StructId>, GraphError> {
        match self.ty(ty)? {
            TypeNode::Struct(sid) => Ok(Some(*sid)),
            _ => Ok(None),
        }
    }

    /// Whether a type is a reference type (a borrow's result).
    pub fn is_ref(&self, ty: TypeId) -> Result<bool, GraphError> {
        Ok(matches!(self.ty(ty)?, TypeNode::Ref(_)))
    }
}
