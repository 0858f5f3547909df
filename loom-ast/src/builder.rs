#![forbid(unsafe_code)]

use std::collections::HashMap;

use loom_graph::{EnumId, ExprId, FieldId, FuncId, LocalId, StmtId, StructId, TypeId, VariantId};

use crate::graph::Graph;
use crate::nodes::{
    BinOp, EnumDef, Expr, ExprKind, FieldDef, Func, Local, MatchArm, Stmt, StmtKind, StructDef,
    TypeNode, UnaryOp, VariantDef,
};
use crate::{Span, span};

/// Convenience layer for populating a [`Graph`], used by the front end's
/// lowering step and by tests. Every node gets a distinct synthetic span so
/// diagnostics stay attributable even for generated graphs.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: Graph,
    builtins: HashMap<String, TypeId>,
    cursor: usize,
}

impl GraphBuilder {
    pub fn new() -> Self {
        GraphBuilder::default()
    }

    pub fn finish(self) -> Graph {
        self.graph
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    fn next_span(&mut self) -> Span {
        let s = span(self.cursor, 1);
        self.cursor += 2;
        s
    }

    // ========== Types ==========

    /// A built-in type, interned by name. `linear` marks move-only
    /// built-ins such as `String`.
    pub fn builtin(&mut self, name: &str, linear: bool) -> TypeId {
        if let Some(&id) = self.builtins.get(name) {
            return id;
        }
        let id = self.graph.types.alloc(TypeNode::Builtin {
            name: name.to_string(),
            linear,
        });
        self.builtins.insert(name.to_string(), id);
        id
    }

    pub fn generic(&mut self, name: &str, linear: bool) -> TypeId {
        self.graph.types.alloc(TypeNode::Generic {
            name: name.to_string(),
            linear,
        })
    }

    pub fn ref_ty(&mut self, inner: TypeId) -> TypeId {
        self.graph.types.alloc(TypeNode::Ref(inner))
    }

    pub fn func_ty(&mut self, params: Vec<TypeId>, ret: TypeId) -> TypeId {
        self.graph.types.alloc(TypeNode::Func { params, ret })
    }

    fn unit_ty(&mut self) -> TypeId {
        self.builtin("Unit", false)
    }

    fn bool_ty(&mut self) -> TypeId {
        self.builtin("Bool", false)
    }

    fn int_ty(&mut self) -> TypeId {
        self.builtin("Int", false)
    }

    fn str_ty(&mut self) -> TypeId {
        self.builtin("String", true)
    }

    // ========== Declarations ==========

    /// A struct with its fields, minted together so the fields can carry
    /// their owner's handle (the two-pass insert protocol).
    pub fn struct_def(&mut self, name: &str, fields: &[(&str, TypeId)]) -> StructId {
        let field_spans: Vec<Span> = fields.iter().map(|_| self.next_span()).collect();
        let struct_span = self.next_span();
        let graph = &mut self.graph;
        graph.structs.alloc_with(|owner| {
            let field_ids: Vec<FieldId> = fields
                .iter()
                .zip(field_spans)
                .map(|(&(fname, ty), fspan)| {
                    graph.fields.alloc(FieldDef {
                        name: fname.to_string(),
                        owner,
                        ty,
                        span: fspan,
                    })
                })
                .collect();
            StructDef {
                name: name.to_string(),
                fields: field_ids,
                span: struct_span,
            }
        })
    }

    pub fn enum_def(&mut self, name: &str, variants: &[(&str, Option<TypeId>)]) -> EnumId {
        let variant_spans: Vec<Span> = variants.iter().map(|_| self.next_span()).collect();
        let enum_span = self.next_span();
        let graph = &mut self.graph;
        graph.enums.alloc_with(|owner| {
            let variant_ids: Vec<VariantId> = variants
                .iter()
                .zip(variant_spans)
                .map(|(&(vname, payload), vspan)| {
                    graph.variants.alloc(VariantDef {
                        name: vname.to_string(),
                        owner,
                        payload,
                        span: vspan,
                    })
                })
                .collect();
            EnumDef {
                name: name.to_string(),
                variants: variant_ids,
                span: enum_span,
            }
        })
    }

    pub fn struct_ty(&mut self, id: StructId) -> TypeId {
        self.graph.types.alloc(TypeNode::Struct(id))
    }

    pub fn enum_ty(&mut self, id: EnumId) -> TypeId {
        self.graph.types.alloc(TypeNode::Enum(id))
    }

    pub fn field_of(&self, owner: StructId, name: &str) -> Option<FieldId> {
        let def = self.graph.structs.get(owner).ok()?;
        def.fields
            .iter()
            .copied()
            .find(|&f| self.graph.fields.get(f).is_ok_and(|fd| fd.name == name))
    }

    pub fn variant_of(&self, owner: EnumId, name: &str) -> Option<VariantId> {
        let def = self.graph.enums.get(owner).ok()?;
        def.variants
            .iter()
            .copied()
            .find(|&v| self.graph.variants.get(v).is_ok_and(|vd| vd.name == name))
    }

    pub fn local(&mut self, name: &str, ty: TypeId) -> LocalId {
        let s = self.next_span();
        self.graph.locals.alloc(Local {
            name: name.to_string(),
            ty,
            span: s,
        })
    }

    pub fn func(
        &mut self,
        name: &str,
        params: Vec<LocalId>,
        ret: Option<TypeId>,
        body: StmtId,
    ) -> FuncId {
        let s = self.next_span();
        self.graph.funcs.alloc(Func {
            name: name.to_string(),
            params,
            ret,
            body: Some(body),
            span: s,
        })
    }

    /// Forward-declare a function so its body may reference it (recursion);
    /// pair with [`GraphBuilder::define_func`].
    pub fn declare_func(&mut self, name: &str, params: Vec<LocalId>, ret: Option<TypeId>) -> FuncId {
        let s = self.next_span();
        self.graph.funcs.alloc(Func {
            name: name.to_string(),
            params,
            ret,
            body: None,
            span: s,
        })
    }

    pub fn define_func(&mut self, id: FuncId, body: StmtId) {
        if let Ok(func) = self.graph.funcs.get_mut(id) {
            func.body = Some(body);
        }
    }

    // ========== Expressions ==========

    fn expr(&mut self, kind: ExprKind, ty: TypeId) -> ExprId {
        let s = self.next_span();
        self.graph.exprs.alloc(Expr { kind, ty, span: s })
    }

    pub fn lit_unit(&mut self) -> ExprId {
        let ty = self.unit_ty();
        self.expr(ExprKind::Unit, ty)
    }

    pub fn lit_bool(&mut self, value: bool) -> ExprId {
        let ty = self.bool_ty();
        self.expr(ExprKind::Bool(value), ty)
    }

    pub fn lit_int(&mut self, value: u64) -> ExprId {
        let ty = self.int_ty();
        self.expr(ExprKind::Int(value), ty)
    }

    pub fn lit_str(&mut self, value: &str) -> ExprId {
        let ty = self.str_ty();
        self.expr(ExprKind::Str(value.to_string()), ty)
    }

    pub fn var_read(&mut self, local: LocalId) -> ExprId {
        let ty = self
            .graph
            .locals
            .get(local)
            .map(|l| l.ty)
            .unwrap_or_else(|_| self.unit_ty());
        self.expr(ExprKind::Var(local), ty)
    }

    pub fn func_ref(&mut self, func: FuncId) -> ExprId {
        let (param_tys, ret) = match self.graph.funcs.get(func) {
            Ok(f) => {
                let params: Vec<TypeId> = f
                    .params
                    .iter()
                    .filter_map(|&p| self.graph.locals.get(p).ok().map(|l| l.ty))
                    .collect();
                (params, f.ret)
            }
            Err(_) => (Vec::new(), None),
        };
        let ret = ret.unwrap_or_else(|| self.unit_ty());
        let ty = self.func_ty(param_tys, ret);
        self.expr(ExprKind::FuncRef(func), ty)
    }

    pub fn field_expr(&mut self, base: ExprId, field: FieldId) -> ExprId {
        let ty = self
            .graph
            .fields
            .get(field)
            .map(|f| f.ty)
            .unwrap_or_else(|_| self.unit_ty());
        self.expr(ExprKind::Field { base, field }, ty)
    }

    pub fn borrow(&mut self, target: LocalId, mutable: bool) -> ExprId {
        let inner = self
            .graph
            .locals
            .get(target)
            .map(|l| l.ty)
            .unwrap_or_else(|_| self.unit_ty());
        let ty = self.ref_ty(inner);
        self.expr(ExprKind::Borrow { target, mutable }, ty)
    }

    pub fn call(&mut self, callee: ExprId, args: Vec<ExprId>) -> ExprId {
        let callee_ty = self.graph.exprs.get(callee).map(|e| e.ty).ok();
        let ret = callee_ty.and_then(|t| match self.graph.types.get(t) {
            Ok(TypeNode::Func { ret, .. }) => Some(*ret),
            _ => None,
        });
        let ty = ret.unwrap_or_else(|| self.unit_ty());
        self.expr(ExprKind::Call { callee, args }, ty)
    }

    pub fn unary(&mut self, op: UnaryOp, operand: ExprId) -> ExprId {
        let ty = self
            .graph
            .exprs
            .get(operand)
            .map(|e| e.ty)
            .unwrap_or_else(|_| self.unit_ty());
        self.expr(ExprKind::Unary { op, operand }, ty)
    }

    pub fn binary(&mut self, op: BinOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        let ty = match op {
            BinOp::Eq
            | BinOp::Ne
            | BinOp::Lt
            | BinOp::Gt
            | BinOp::Le
            | BinOp::Ge
            | BinOp::And
            | BinOp::Or => self.bool_ty(),
            _ => self
                .graph
                .exprs
                .get(lhs)
                .map(|e| e.ty)
                .unwrap_or_else(|_| self.unit_ty()),
        };
        self.expr(ExprKind::Binary { op, lhs, rhs }, ty)
    }

    // ========== Statements ==========

    fn stmt(&mut self, kind: StmtKind) -> StmtId {
        let s = self.next_span();
        self.graph.stmts.alloc(Stmt { kind, span: s })
    }

    pub fn expr_stmt(&mut self, expr: ExprId) -> StmtId {
        self.stmt(StmtKind::Expr(expr))
    }

    pub fn var_stmt(&mut self, local: LocalId, init: ExprId) -> StmtId {
        self.stmt(StmtKind::Var { local, init })
    }

    pub fn assign(&mut self, target: LocalId, value: ExprId) -> StmtId {
        self.stmt(StmtKind::Assign { target, value })
    }

    pub fn assign_field(&mut self, base: LocalId, path: Vec<FieldId>, value: ExprId) -> StmtId {
        self.stmt(StmtKind::AssignField { base, path, value })
    }

    pub fn discard(&mut self, target: LocalId) -> StmtId {
        self.stmt(StmtKind::Discard { target })
    }

    pub fn if_stmt(
        &mut self,
        cond: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    ) -> StmtId {
        self.stmt(StmtKind::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    pub fn while_stmt(&mut self, cond: ExprId, body: StmtId) -> StmtId {
        self.stmt(StmtKind::While { cond, body })
    }

    pub fn arm(&mut self, variant: VariantId, binding: Option<LocalId>, body: StmtId) -> MatchArm {
        let s = self.next_span();
        MatchArm {
            variant,
            binding,
            body,
            span: s,
        }
    }

    pub fn match_stmt(&mut self, scrutinee: ExprId, arms: Vec<MatchArm>) -> StmtId {
        self.stmt(StmtKind::Match { scrutinee, arms })
    }

    pub fn ret(&mut self, value: Option<ExprId>) -> StmtId {
        self.stmt(StmtKind::Return { value })
    }

    pub fn brk(&mut self) -> StmtId {
        self.stmt(StmtKind::Break)
    }

    pub fn cont(&mut self) -> StmtId {
        self.stmt(StmtKind::Continue)
    }

    pub fn block(&mut self, stmts: Vec<StmtId>) -> StmtId {
        self.stmt(StmtKind::Block(stmts))
    }
}
