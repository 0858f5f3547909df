#![forbid(unsafe_code)]

use std::fmt;

use crate::error::GraphError;

/// The node kinds a compilation graph stores. Every handle carries its kind
/// in its type; `Kind` is the runtime reflection of that, used for
/// diagnostics and for kind-erased [`NodeRef`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    Type,
    Struct,
    Field,
    Enum,
    Variant,
    Func,
    Local,
    Expr,
    Stmt,
}

impl Kind {
    pub fn display(self) -> &'static str {
        match self {
            Kind::Type => "type",
            Kind::Struct => "struct",
            Kind::Field => "field",
            Kind::Enum => "enum",
            Kind::Variant => "variant",
            Kind::Func => "func",
            Kind::Local => "local",
            Kind::Expr => "expr",
            Kind::Stmt => "stmt",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display())
    }
}

/// A typed handle into one of the graph's arenas: a dense per-kind index.
///
/// Dense indices make handle equality and handle identity the same thing, so
/// handles may be freely copied and compared without an interning registry.
pub trait Idx: Copy + Eq + Ord + std::hash::Hash + fmt::Debug {
    const KIND: Kind;

    fn new(raw: u32) -> Self;
    fn raw(self) -> u32;
}

macro_rules! node_id {
    ($(#[$doc:meta])* $name:ident, $kind:expr) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl Idx for $name {
            const KIND: Kind = $kind;

            fn new(raw: u32) -> Self {
                $name(raw)
            }

            fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $kind.display(), self.0)
            }
        }
    };
}

node_id!(TypeId, Kind::Type);
node_id!(StructId, Kind::Struct);
node_id!(FieldId, Kind::Field);
node_id!(EnumId, Kind::Enum);
node_id!(VariantId, Kind::Variant);
node_id!(FuncId, Kind::Func);
node_id!(LocalId, Kind::Local);
node_id!(ExprId, Kind::Expr);
node_id!(StmtId, Kind::Stmt);

/// A kind-erased handle: `(kind, index)`. Used where handles of mixed kinds
/// travel together, chiefly inside error values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeRef {
    pub kind: Kind,
    pub index: u32,
}

impl NodeRef {
    pub fn of<I: Idx>(id: I) -> Self {
        NodeRef {
            kind: I::KIND,
            index: id.raw(),
        }
    }

    /// Downcast back to a typed handle. A kind mismatch is a cross-kind
    /// misuse of the handle and fails with `UnknownVariety`.
    pub fn expect<I: Idx>(self) -> Result<I, GraphError> {
        if self.kind == I::KIND {
            Ok(I::new(self.index))
        } else {
            Err(GraphError::UnknownVariety {
                expected: I::KIND,
                node: self,
            })
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind.display(), self.index)
    }
}
