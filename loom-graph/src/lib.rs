#![forbid(unsafe_code)]

mod error;
mod handle;
mod memo;
mod table;

pub use error::GraphError;
pub use handle::{
    EnumId, ExprId, FieldId, FuncId, Idx, Kind, LocalId, NodeRef, StmtId, StructId, TypeId,
    VariantId,
};
pub use memo::AttrTable;
pub use table::Table;
