#![forbid(unsafe_code)]

//! The per-variable ownership lattice and the merge rule that reconciles it
//! across alternative control paths.

use std::collections::{BTreeMap, BTreeSet};

use loom_ast::Span;
use loom_graph::{FieldId, LocalId};

use crate::error::SemanticError;

/// Ownership state of one variable at one program point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OwnState {
    /// Has a value; may be read, moved, or borrowed.
    Present,

    /// Moved out, consumed, or discarded. Any further use is an error.
    Absent,

    /// A live reference exists. Readable through the reference, but the
    /// variable may not be moved or mutated until the borrow's statement
    /// boundary passes.
    Borrowed,

    /// A struct mid-dismantlement: `removed` linear fields have been
    /// extracted, out of `of` linear fields total. Only struct types with
    /// linear fields enter this state, and only while `removed` is a strict
    /// subset of them.
    Partial { removed: BTreeSet<FieldId>, of: usize },
}

impl OwnState {
    /// Whether two states agree for the purposes of path merging: same tag,
    /// and for `Partial` the exact same removed-field set.
    pub fn agrees_with(&self, other: &OwnState) -> bool {
        match (self, other) {
            (OwnState::Present, OwnState::Present)
            | (OwnState::Absent, OwnState::Absent)
            | (OwnState::Borrowed, OwnState::Borrowed) => true,
            (
                OwnState::Partial { removed: a, .. },
                OwnState::Partial { removed: b, .. },
            ) => a == b,
            _ => false,
        }
    }

    pub fn display(&self) -> String {
        match self {
            OwnState::Present => "present".to_string(),
            OwnState::Absent => "absent".to_string(),
            OwnState::Borrowed => "borrowed".to_string(),
            OwnState::Partial { removed, of } => {
                format!("partially dismantled ({} of {} linear fields removed)", removed.len(), of)
            }
        }
    }
}

/// An ownership-state mapping: declared-variable handle to state. Treated
/// as an immutable value; transformers consume a mapping and return a new
/// one, so no two control paths ever share one. A variable missing from the
/// mapping is `Absent` — variables are absent until declared.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OwnerMap {
    entries: BTreeMap<LocalId, OwnState>,
}

impl OwnerMap {
    pub fn new() -> Self {
        OwnerMap::default()
    }

    pub fn state_of(&self, local: LocalId) -> OwnState {
        self.entries.get(&local).cloned().unwrap_or(OwnState::Absent)
    }

    pub fn with(mut self, local: LocalId, state: OwnState) -> Self {
        self.entries.insert(local, state);
        self
    }

    /// Drop a variable from the mapping as its scope ends (match-arm
    /// bindings); the caller has already checked it was consumed.
    pub fn without(mut self, local: LocalId) -> Self {
        self.entries.remove(&local);
        self
    }

    /// Reset every `Borrowed` entry to `Present`. Run at every
    /// statement/expression boundary: borrows do not outlive the expression
    /// that created them.
    pub fn clear_borrows(mut self) -> Self {
        for state in self.entries.values_mut() {
            if *state == OwnState::Borrowed {
                *state = OwnState::Present;
            }
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (LocalId, &OwnState)> {
        self.entries.iter().map(|(&local, state)| (local, state))
    }

    pub fn locals(&self) -> impl Iterator<Item = LocalId> + '_ {
        self.entries.keys().copied()
    }
}

/// Reconcile the mappings produced by two or more reconverging control
/// paths (branch arms, match arms, loop unrollings, loop-exit vs.
/// break-exit).
///
/// Every linear-typed variable appearing in any input must agree across all
/// inputs per [`OwnState::agrees_with`]; the first disagreement is an
/// `InconsistentOwnership` error naming both states and the reconvergence
/// point. Non-linear variables may differ freely and are carried over from
/// the first input.
pub fn merge_all(
    inputs: &[OwnerMap],
    span: Span,
    mut is_linear: impl FnMut(LocalId) -> Result<bool, SemanticError>,
    name_of: impl Fn(LocalId) -> String,
) -> Result<OwnerMap, SemanticError> {
    let Some((first, rest)) = inputs.split_first() else {
        return Ok(OwnerMap::new());
    };
    if rest.is_empty() {
        return Ok(first.clone());
    }

    let mut keys: BTreeSet<LocalId> = BTreeSet::new();
    for input in inputs {
        keys.extend(input.locals());
    }

    let mut merged = OwnerMap::new();
    for local in keys {
        let state = first.state_of(local);
        if is_linear(local)? {
            for other in rest {
                let other_state = other.state_of(local);
                if !state.agrees_with(&other_state) {
                    return Err(SemanticError::InconsistentOwnership {
                        var: name_of(local),
                        left: state.display(),
                        right: other_state.display(),
                        span,
                    });
                }
            }
        }
        merged = merged.with(local, state);
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_ast::span;

    fn linear(_: LocalId) -> Result<bool, SemanticError> {
        Ok(true)
    }

    fn name(local: LocalId) -> String {
        format!("v{}", local.0)
    }

    #[test]
    fn missing_variable_reads_as_absent() {
        let m = OwnerMap::new();
        assert_eq!(m.state_of(LocalId(0)), OwnState::Absent);
    }

    #[test]
    fn clear_borrows_resets_only_borrowed() {
        let m = OwnerMap::new()
            .with(LocalId(0), OwnState::Borrowed)
            .with(LocalId(1), OwnState::Absent)
            .with(LocalId(2), OwnState::Present);
        let m = m.clear_borrows();
        assert_eq!(m.state_of(LocalId(0)), OwnState::Present);
        assert_eq!(m.state_of(LocalId(1)), OwnState::Absent);
        assert_eq!(m.state_of(LocalId(2)), OwnState::Present);
    }

    #[test]
    fn merge_accepts_agreeing_paths() {
        let a = OwnerMap::new().with(LocalId(0), OwnState::Absent);
        let b = OwnerMap::new().with(LocalId(0), OwnState::Absent);
        let merged = merge_all(&[a, b], span(0, 1), linear, name).unwrap();
        assert_eq!(merged.state_of(LocalId(0)), OwnState::Absent);
    }

    #[test]
    fn merge_rejects_present_vs_absent() {
        let a = OwnerMap::new().with(LocalId(0), OwnState::Absent);
        let b = OwnerMap::new().with(LocalId(0), OwnState::Present);
        let err = merge_all(&[a, b], span(0, 1), linear, name).unwrap_err();
        assert!(matches!(err, SemanticError::InconsistentOwnership { var, .. } if var == "v0"));
    }

    #[test]
    fn merge_treats_missing_as_absent() {
        // A variable only one path declared (and left owned) is a leak.
        let a = OwnerMap::new().with(LocalId(0), OwnState::Present);
        let b = OwnerMap::new();
        let err = merge_all(&[a, b], span(0, 1), linear, name).unwrap_err();
        assert!(matches!(err, SemanticError::InconsistentOwnership { .. }));
    }

    #[test]
    fn merge_ignores_non_linear_disagreement() {
        let a = OwnerMap::new().with(LocalId(0), OwnState::Present);
        let b = OwnerMap::new().with(LocalId(0), OwnState::Absent);
        let merged = merge_all(&[a, b], span(0, 1), |_| Ok(false), name).unwrap();
        assert_eq!(merged.state_of(LocalId(0)), OwnState::Present);
    }

    #[test]
    fn partial_states_must_agree_on_removed_fields() {
        let left: BTreeSet<FieldId> = [FieldId(0)].into_iter().collect();
        let right: BTreeSet<FieldId> = [FieldId(1)].into_iter().collect();
        let a = OwnerMap::new().with(LocalId(0), OwnState::Partial { removed: left.clone(), of: 2 });
        let same = OwnerMap::new().with(LocalId(0), OwnState::Partial { removed: left, of: 2 });
        let diff = OwnerMap::new().with(LocalId(0), OwnState::Partial { removed: right, of: 2 });

        assert!(merge_all(&[a.clone(), same], span(0, 1), linear, name).is_ok());
        let err = merge_all(&[a, diff], span(0, 1), linear, name).unwrap_err();
        assert!(matches!(err, SemanticError::InconsistentOwnership { .. }));
    }
}
