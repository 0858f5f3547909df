#![forbid(unsafe_code)]

//! The control-flow-shape layer: per-statement reachability and `can_break`
//! facts, missing-return rejection, and match-coverage validation. The
//! ownership pass runs only after this layer has accepted the program.

use std::collections::BTreeSet;

use loom_ast::{Graph, StmtKind};
use loom_graph::{AttrTable, StmtId, VariantId};

use crate::error::SemanticError;

/// Does control reach a statement's end?
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reach {
    Yes,
    No,
    Maybe,
}

impl Reach {
    /// Join across alternative paths (branch and match arms).
    pub fn join(self, other: Reach) -> Reach {
        match (self, other) {
            (Reach::Yes, Reach::Yes) => Reach::Yes,
            (Reach::No, Reach::No) => Reach::No,
            _ => Reach::Maybe,
        }
    }

    /// Sequencing within a block: once a statement never falls through, the
    /// block's end is never reached.
    fn then(self, next: Reach) -> Reach {
        match (self, next) {
            (Reach::No, _) | (_, Reach::No) => Reach::No,
            (Reach::Maybe, _) | (_, Reach::Maybe) => Reach::Maybe,
            (Reach::Yes, Reach::Yes) => Reach::Yes,
        }
    }

    pub fn reaches_end(self) -> bool {
        !matches!(self, Reach::No)
    }
}

pub struct ShapeLayer<'g> {
    graph: &'g Graph,
    reach: AttrTable<StmtId, Reach>,
    can_break: AttrTable<StmtId, bool>,
}

impl<'g> ShapeLayer<'g> {
    /// Build the layer, forcing every fact of every statement in
    /// field-then-node order.
    pub fn compute(graph: &'g Graph) -> Result<Self, SemanticError> {
        let layer = ShapeLayer {
            graph,
            reach: AttrTable::new("reach", graph.stmts.len()),
            can_break: AttrTable::new("can_break", graph.stmts.len()),
        };
        for (id, _) in graph.stmts.iter() {
            layer.reach_of(id)?;
        }
        for (id, _) in graph.stmts.iter() {
            layer.can_break_of(id)?;
        }
        Ok(layer)
    }

    pub fn reach_of(&self, id: StmtId) -> Result<Reach, SemanticError> {
        self.reach.force(id, || {
            Ok(match &self.graph.stmt(id)?.kind {
                StmtKind::Expr(_)
                | StmtKind::Var { .. }
                | StmtKind::Assign { .. }
                | StmtKind::AssignField { .. }
                | StmtKind::Discard { .. } => Reach::Yes,

                StmtKind::Return { .. } | StmtKind::Break | StmtKind::Continue => Reach::No,

                StmtKind::If {
                    then_branch,
                    else_branch,
                    ..
                } => {
                    let then_reach = self.reach_of(*then_branch)?;
                    let else_reach = match else_branch {
                        Some(stmt) => self.reach_of(*stmt)?,
                        // The implicit empty else falls straight through.
                        None => Reach::Yes,
                    };
                    then_reach.join(else_reach)
                }

                // Zero iterations always reach the end, but the condition
                // may also never go false. No termination analysis here.
                StmtKind::While { .. } => Reach::Maybe,

                StmtKind::Match { arms, .. } => {
                    let mut reach: Option<Reach> = None;
                    for arm in arms {
                        let arm_reach = self.reach_of(arm.body)?;
                        reach = Some(match reach {
                            Some(acc) => acc.join(arm_reach),
                            None => arm_reach,
                        });
                    }
                    reach.unwrap_or(Reach::Yes)
                }

                StmtKind::Block(stmts) => {
                    let mut acc = Reach::Yes;
                    for &stmt in stmts {
                        acc = acc.then(self.reach_of(stmt)?);
                    }
                    acc
                }
            })
        })
    }

    /// Does any contained path `break` out of this statement toward an
    /// enclosing loop? Loops swallow their own body's breaks.
    pub fn can_break_of(&self, id: StmtId) -> Result<bool, SemanticError> {
        self.can_break.force(id, || {
            Ok(match &self.graph.stmt(id)?.kind {
                StmtKind::Break => true,

                StmtKind::While { .. } => false,

                StmtKind::If {
                    then_branch,
                    else_branch,
                    ..
                } => {
                    self.can_break_of(*then_branch)?
                        || match else_branch {
                            Some(stmt) => self.can_break_of(*stmt)?,
                            None => false,
                        }
                }

                StmtKind::Match { arms, .. } => {
                    let mut any = false;
                    for arm in arms {
                        any = any || self.can_break_of(arm.body)?;
                    }
                    any
                }

                StmtKind::Block(stmts) => {
                    let mut any = false;
                    for &stmt in stmts {
                        any = any || self.can_break_of(stmt)?;
                    }
                    any
                }

                _ => false,
            })
        })
    }

    /// The function-level and match-level shape checks: a function with a
    /// declared return type may not fall off the end of its body, and every
    /// match must cover its enum's variants exactly once each.
    pub fn validate(&self) -> Result<(), SemanticError> {
        for (_, func) in self.graph.funcs.iter() {
            let Some(body) = func.body else { continue };
            if func.ret.is_some() && self.reach_of(body)?.reaches_end() {
                return Err(SemanticError::MissingReturn {
                    func: func.name.clone(),
                    span: func.span,
                });
            }
        }

        for (_, stmt) in self.graph.stmts.iter() {
            let StmtKind::Match { scrutinee, arms } = &stmt.kind else {
                continue;
            };
            let scrut_ty = self.graph.expr(*scrutinee)?.ty;
            let Some(enum_id) = (match self.graph.ty(scrut_ty)? {
                loom_ast::TypeNode::Enum(id) => Some(*id),
                _ => None,
            }) else {
                continue;
            };
            let enum_def = self.graph.enum_def(enum_id)?;

            let mut seen: BTreeSet<VariantId> = BTreeSet::new();
            for arm in arms {
                if !seen.insert(arm.variant) {
                    return Err(SemanticError::DuplicateMatchArm {
                        variant: self.graph.variant(arm.variant)?.name.clone(),
                        span: arm.span,
                    });
                }
            }
            let missing: Vec<String> = enum_def
                .variants
                .iter()
                .filter(|v| !seen.contains(*v))
                .map(|&v| self.graph.variant(v).map(|d| d.name.clone()))
                .collect::<Result<_, _>>()?;
            if !missing.is_empty() {
                return Err(SemanticError::NonExhaustiveMatch {
                    missing,
                    span: stmt.span,
                });
            }
        }
        Ok(())
    }
}
