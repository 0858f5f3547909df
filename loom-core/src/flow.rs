#![forbid(unsafe_code)]

//! The flow interpreter: every statement and expression is a transformer
//! over the ownership-state mapping. Statements additionally report where a
//! `break` escapes them; loops are checked by bounded simulation of zero,
//! one, and two iterations.

use std::collections::BTreeSet;

use loom_ast::{ExprKind, Graph, MatchArm, Span, StmtKind};
use loom_graph::{AttrTable, ExprId, FieldId, FuncId, LocalId, StmtId};

use crate::error::SemanticError;
use crate::linear::Linearity;
use crate::state::{self, OwnState, OwnerMap};

/// What flowing one statement produced.
///
/// `normal` is the fall-through mapping; `None` means the statement's direct
/// continuation is unreachable (a `return`, or a block ending in one).
/// `brk` is the mapping observed where a contained `break` escapes toward
/// the enclosing loop; `None` if no contained path breaks.
pub struct FlowOutcome {
    pub normal: Option<OwnerMap>,
    pub brk: Option<OwnerMap>,
}

impl FlowOutcome {
    fn fall_through(map: OwnerMap) -> Self {
        FlowOutcome {
            normal: Some(map),
            brk: None,
        }
    }
}

/// The ownership layer: one `checked` attribute per function, forced
/// eagerly over the whole program by [`FlowChecker::check_all`].
pub struct FlowChecker<'g, 'l> {
    graph: &'g Graph,
    linearity: &'l Linearity<'g>,
    checked: AttrTable<FuncId, ()>,
}

impl<'g, 'l> FlowChecker<'g, 'l> {
    pub fn new(graph: &'g Graph, linearity: &'l Linearity<'g>) -> Self {
        FlowChecker {
            graph,
            linearity,
            checked: AttrTable::new("ownership_checked", graph.funcs.len()),
        }
    }

    pub fn check_all(&self) -> Result<(), SemanticError> {
        for (id, _) in self.graph.funcs.iter() {
            self.check_func(id)?;
        }
        Ok(())
    }

    /// Check one function body end to end: parameters seeded `present`, the
    /// body's transformer applied, and fall-through subjected to the same
    /// accounting as an explicit `return`.
    pub fn check_func(&self, id: FuncId) -> Result<(), SemanticError> {
        self.checked.force(id, || {
            let func = self.graph.func(id)?;
            let Some(body) = func.body else {
                // Extern declaration; nothing to flow.
                return Ok(());
            };
            let mut map = OwnerMap::new();
            for &param in &func.params {
                map = map.with(param, OwnState::Present);
            }
            let out = self.flow_stmt(body, map)?;
            if out.brk.is_some() {
                return Err(SemanticError::BreakOutsideLoop { span: func.span });
            }
            if let Some(end) = out.normal {
                self.check_consumed_at_exit(&end, func.span)?;
            }
            Ok(())
        })
    }

    // ========== Statements ==========

    fn flow_stmt(&self, id: StmtId, map: OwnerMap) -> Result<FlowOutcome, SemanticError> {
        let stmt = self.graph.stmt(id)?;
        let span = stmt.span;
        match &stmt.kind {
            StmtKind::Expr(expr) => Ok(FlowOutcome::fall_through(self.flow_expr(*expr, map)?)),

            StmtKind::Var { local, init } => {
                let map = self.flow_expr(*init, map)?;
                self.bind(*local, map, span).map(FlowOutcome::fall_through)
            }

            StmtKind::Assign { target, value } => {
                let map = self.flow_expr(*value, map)?;
                self.bind(*target, map, span).map(FlowOutcome::fall_through)
            }

            StmtKind::AssignField { base, path, value } => {
                let map = self.flow_expr(*value, map)?;
                for &field in path {
                    let def = self.graph.field(field)?;
                    if self.linearity.is_linear(def.ty)? {
                        return Err(SemanticError::LinearFieldAssign {
                            field: def.name.clone(),
                            span,
                        });
                    }
                }
                if self.linearity.is_linear_local(*base)? {
                    match map.state_of(*base) {
                        OwnState::Absent => {
                            return Err(SemanticError::UseAfterConsume {
                                var: self.local_name(*base)?,
                                span,
                            });
                        }
                        OwnState::Borrowed => {
                            return Err(SemanticError::UseWhileBorrowed {
                                var: self.local_name(*base)?,
                                span,
                            });
                        }
                        OwnState::Present | OwnState::Partial { .. } => {}
                    }
                }
                Ok(FlowOutcome::fall_through(map))
            }

            StmtKind::Discard { target } => {
                self.flow_discard(*target, map, span).map(FlowOutcome::fall_through)
            }

            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond_map = self.flow_expr(*cond, map)?.clear_borrows();
                let then_out = self.flow_stmt(*then_branch, cond_map.clone())?;
                let else_out = match else_branch {
                    Some(stmt) => self.flow_stmt(*stmt, cond_map)?,
                    // The missing arm behaves as the empty block.
                    None => FlowOutcome::fall_through(cond_map),
                };
                Ok(FlowOutcome {
                    normal: self.merge_paths(
                        then_out.normal.into_iter().chain(else_out.normal).collect(),
                        span,
                    )?,
                    brk: self.merge_paths(
                        then_out.brk.into_iter().chain(else_out.brk).collect(),
                        span,
                    )?,
                })
            }

            StmtKind::While { cond, body } => self.flow_while(*cond, *body, map, span),

            StmtKind::Match { scrutinee, arms } => self.flow_match(*scrutinee, arms, map, span),

            StmtKind::Return { value } => {
                let map = match value {
                    Some(expr) => self.flow_expr(*expr, map)?,
                    None => map,
                };
                self.check_consumed_at_exit(&map, span)?;
                Ok(FlowOutcome {
                    normal: None,
                    brk: None,
                })
            }

            StmtKind::Break => Ok(FlowOutcome {
                normal: None,
                brk: Some(map),
            }),

            StmtKind::Continue => Err(SemanticError::UnsupportedContinue { span }),

            StmtKind::Block(stmts) => {
                let mut current = Some(map);
                let mut breaks = Vec::new();
                for &stmt_id in stmts {
                    let Some(state) = current.take() else {
                        return Err(SemanticError::UnreachableStatement {
                            span: self.graph.stmt(stmt_id)?.span,
                        });
                    };
                    let out = self.flow_stmt(stmt_id, state)?;
                    if let Some(brk) = out.brk {
                        breaks.push(brk);
                    }
                    current = out.normal.map(OwnerMap::clear_borrows);
                }
                Ok(FlowOutcome {
                    normal: current,
                    brk: self.merge_paths(breaks, span)?,
                })
            }
        }
    }

    /// `var x = ...` and `x = ...` share one rule: a linear target must not
    /// still own its previous value.
    fn bind(&self, local: LocalId, map: OwnerMap, span: Span) -> Result<OwnerMap, SemanticError> {
        if self.linearity.is_linear_local(local)? && map.state_of(local) != OwnState::Absent {
            return Err(SemanticError::RebindOverLiveLinear {
                var: self.local_name(local)?,
                span,
            });
        }
        Ok(map.with(local, OwnState::Present))
    }

    fn flow_discard(
        &self,
        target: LocalId,
        map: OwnerMap,
        span: Span,
    ) -> Result<OwnerMap, SemanticError> {
        let local = self.graph.local(target)?;
        let var = local.name.clone();
        let Some(struct_id) = self.graph.struct_of(local.ty)? else {
            return Err(SemanticError::DiscardNonStruct { var, span });
        };
        let linear_fields = self.linearity.linear_fields(struct_id)?;
        match map.state_of(target) {
            OwnState::Present if linear_fields.is_empty() => {
                Ok(map.with(target, OwnState::Absent))
            }
            OwnState::Present => Err(SemanticError::IncompleteDismantle {
                var,
                missing: self.field_names(&linear_fields)?,
                span,
            }),
            OwnState::Absent => Err(SemanticError::UseAfterConsume { var, span }),
            OwnState::Borrowed => Err(SemanticError::UseWhileBorrowed { var, span }),
            OwnState::Partial { removed, of } if removed.len() == of => {
                Ok(map.with(target, OwnState::Absent))
            }
            OwnState::Partial { removed, .. } => {
                let left: Vec<FieldId> = linear_fields
                    .iter()
                    .copied()
                    .filter(|f| !removed.contains(f))
                    .collect();
                Err(SemanticError::IncompleteDismantle {
                    var,
                    missing: self.field_names(&left)?,
                    span,
                })
            }
        }
    }

    /// Bounded simulation of a `while` loop: the merge sees the state after
    /// zero, one, and two iterations, plus the break escapes out of
    /// iterations one and two, with borrows re-cleared around every
    /// condition evaluation. Two iterations is the documented unrolling
    /// bound; a body whose ownership effect does not stabilize by then is
    /// rejected as inconsistent.
    fn flow_while(
        &self,
        cond: ExprId,
        body: StmtId,
        map: OwnerMap,
        span: Span,
    ) -> Result<FlowOutcome, SemanticError> {
        let zero = self.flow_expr(cond, map)?.clear_borrows();
        let mut exits = vec![zero.clone()];
        let mut breaks = Vec::new();

        let one = self.flow_stmt(body, zero)?;
        if let Some(brk) = one.brk {
            breaks.push(brk);
        }
        if let Some(after_one) = one.normal {
            let once = self.flow_expr(cond, after_one)?.clear_borrows();
            exits.push(once.clone());

            let two = self.flow_stmt(body, once)?;
            if let Some(brk) = two.brk {
                breaks.push(brk);
            }
            if let Some(after_two) = two.normal {
                exits.push(self.flow_expr(cond, after_two)?.clear_borrows());
            }
        }

        exits.extend(breaks);
        let merged = self.merge(exits, span)?;
        Ok(FlowOutcome::fall_through(merged))
    }

    fn flow_match(
        &self,
        scrutinee: ExprId,
        arms: &[MatchArm],
        map: OwnerMap,
        span: Span,
    ) -> Result<FlowOutcome, SemanticError> {
        let scrut_map = self.flow_expr(scrutinee, map)?.clear_borrows();
        let mut normals = Vec::new();
        let mut breaks = Vec::new();
        for arm in arms {
            let mut arm_map = scrut_map.clone();
            if let Some(binding) = arm.binding {
                arm_map = arm_map.with(binding, OwnState::Present);
            }
            let out = self.flow_stmt(arm.body, arm_map)?;
            if let Some(brk) = out.brk {
                breaks.push(self.leave_arm_scope(brk, arm)?);
            }
            if let Some(normal) = out.normal {
                normals.push(self.leave_arm_scope(normal, arm)?);
            }
        }
        Ok(FlowOutcome {
            normal: self.merge_paths(normals, span)?,
            brk: self.merge_paths(breaks, span)?,
        })
    }

    /// An arm's payload binding goes out of scope at the arm's end (or where
    /// a break leaves it); a linear payload must have been consumed by then.
    fn leave_arm_scope(&self, map: OwnerMap, arm: &MatchArm) -> Result<OwnerMap, SemanticError> {
        let Some(binding) = arm.binding else {
            return Ok(map);
        };
        if self.linearity.is_linear_local(binding)? && map.state_of(binding) != OwnState::Absent {
            return Err(SemanticError::ArmBindingNotConsumed {
                var: self.local_name(binding)?,
                span: arm.span,
            });
        }
        Ok(map.without(binding))
    }

    // ========== Expressions ==========

    fn flow_expr(&self, id: ExprId, map: OwnerMap) -> Result<OwnerMap, SemanticError> {
        let expr = self.graph.expr(id)?;
        let span = expr.span;
        match &expr.kind {
            ExprKind::Unit
            | ExprKind::Bool(_)
            | ExprKind::Int(_)
            | ExprKind::Str(_)
            | ExprKind::FuncRef(_) => Ok(map),

            ExprKind::Var(local) => self.read_var(*local, map, span),

            ExprKind::Field { base, field } => self.flow_field(*base, *field, map, span),

            ExprKind::Borrow { target, .. } => {
                if !self.linearity.is_linear_local(*target)? {
                    return Ok(map);
                }
                match map.state_of(*target) {
                    OwnState::Present | OwnState::Borrowed => {
                        Ok(map.with(*target, OwnState::Borrowed))
                    }
                    OwnState::Absent | OwnState::Partial { .. } => {
                        Err(SemanticError::ReborrowOfConsumed {
                            var: self.local_name(*target)?,
                            span,
                        })
                    }
                }
            }

            ExprKind::Call { callee, args } => {
                let mut map = self.flow_expr(*callee, map)?;
                for &arg in args {
                    map = self.flow_expr(arg, map)?;
                }
                Ok(map)
            }

            ExprKind::Unary { operand, .. } => self.flow_expr(*operand, map),

            ExprKind::Binary { lhs, rhs, .. } => {
                let map = self.flow_expr(*lhs, map)?;
                self.flow_expr(*rhs, map)
            }
        }
    }

    /// Reading a linear variable moves it.
    fn read_var(
        &self,
        local: LocalId,
        map: OwnerMap,
        span: Span,
    ) -> Result<OwnerMap, SemanticError> {
        if !self.linearity.is_linear_local(local)? {
            return Ok(map);
        }
        match map.state_of(local) {
            OwnState::Present => Ok(map.with(local, OwnState::Absent)),
            OwnState::Absent | OwnState::Partial { .. } => Err(SemanticError::UseAfterConsume {
                var: self.local_name(local)?,
                span,
            }),
            OwnState::Borrowed => Err(SemanticError::UseWhileBorrowed {
                var: self.local_name(local)?,
                span,
            }),
        }
    }

    /// `base.field`. An owned direct-variable receiver is dismantled one
    /// linear field at a time via the `partial` state; access through a
    /// reference never changes the receiver and never yields ownership.
    fn flow_field(
        &self,
        base: ExprId,
        field: FieldId,
        map: OwnerMap,
        span: Span,
    ) -> Result<OwnerMap, SemanticError> {
        let base_expr = self.graph.expr(base)?;
        if self.graph.is_ref(base_expr.ty)? {
            return self.flow_expr(base, map);
        }
        let ExprKind::Var(receiver) = base_expr.kind else {
            // A temporary receiver: its operands' effects are the whole
            // story, no per-variable state attaches to the temporary.
            return self.flow_expr(base, map);
        };
        if !self.linearity.is_linear_local(receiver)? {
            return Ok(map);
        }

        let local = self.graph.local(receiver)?;
        let var = local.name.clone();
        let def = self.graph.field(field)?;
        let field_linear = self.linearity.is_linear(def.ty)?;

        match map.state_of(receiver) {
            OwnState::Absent => Err(SemanticError::UseAfterConsume { var, span }),

            OwnState::Borrowed if field_linear => {
                Err(SemanticError::UseWhileBorrowed { var, span })
            }
            // Reading a copyable field while borrowed is just a read.
            OwnState::Borrowed => Ok(map),

            OwnState::Present if field_linear => {
                let Some(struct_id) = self.graph.struct_of(local.ty)? else {
                    return Ok(map);
                };
                let of = self.linearity.linear_fields(struct_id)?.len();
                let removed: BTreeSet<FieldId> = [field].into_iter().collect();
                Ok(map.with(receiver, OwnState::Partial { removed, of }))
            }
            OwnState::Present => Ok(map),

            OwnState::Partial { mut removed, of } if field_linear => {
                if !removed.insert(field) {
                    return Err(SemanticError::UseAfterConsume {
                        var: format!("{var}.{}", def.name),
                        span,
                    });
                }
                Ok(map.with(receiver, OwnState::Partial { removed, of }))
            }
            OwnState::Partial { .. } => Ok(map),
        }
    }

    // ========== Accounting & merging ==========

    /// The final accounting at any exiting path: every linear variable must
    /// be `absent`.
    fn check_consumed_at_exit(&self, map: &OwnerMap, span: Span) -> Result<(), SemanticError> {
        let mut leftover = Vec::new();
        for (local, state) in map.iter() {
            if *state != OwnState::Absent && self.linearity.is_linear_local(local)? {
                leftover.push(self.local_name(local)?);
            }
        }
        if leftover.is_empty() {
            Ok(())
        } else {
            Err(SemanticError::NotConsumedBeforeReturn {
                vars: leftover,
                span,
            })
        }
    }

    fn merge(&self, inputs: Vec<OwnerMap>, span: Span) -> Result<OwnerMap, SemanticError> {
        state::merge_all(
            &inputs,
            span,
            |local| self.linearity.is_linear_local(local),
            |local| {
                self.graph
                    .local(local)
                    .map(|def| def.name.clone())
                    .unwrap_or_else(|_| local.to_string())
            },
        )
    }

    /// Merge zero, one, or many reconverging paths; zero paths means the
    /// reconvergence point is unreachable.
    fn merge_paths(
        &self,
        mut paths: Vec<OwnerMap>,
        span: Span,
    ) -> Result<Option<OwnerMap>, SemanticError> {
        match paths.len() {
            0 => Ok(None),
            1 => Ok(paths.pop()),
            _ => Ok(Some(self.merge(paths, span)?)),
        }
    }

    fn local_name(&self, local: LocalId) -> Result<String, SemanticError> {
        Ok(self.graph.local(local)?.name.clone())
    }

    fn field_names(&self, fields: &[FieldId]) -> Result<Vec<String>, SemanticError> {
        fields
            .iter()
            .map(|&field| Ok(self.graph.field(field)?.name.clone()))
            .collect()
    }
}
