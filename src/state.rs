//! Per-branch search state and the fresh-name supply.
use im_rc::Vector;

use crate::{
    candidate::{Candidate, HornClause, QMap},
    constraints::Constraint,
    logic::Id,
    subst::TypeSubstitution,
};

pub const TYPE_VAR_PREFIX: &str = "_a";
pub const UNKNOWN_PREFIX: &str = "_u";
pub const ARG_PREFIX: &str = "_x";
pub const GHOST_PREFIX: &str = "_g";
pub const COND_PREFIX: &str = "_c";
pub const CASE_ARG_PREFIX: &str = "_z";
pub const REC_FN_PREFIX: &str = "_f";

/// Everything a failed branch must not leak to its siblings. All fields are
/// persistent, so a snapshot is a cheap clone.
#[derive(Clone, Debug, Default)]
pub struct SearchState {
    /// Constraints emitted since the last solve step.
    pub typing_constraints: Vector<Constraint>,
    /// Atomic constraints waiting to be lowered.
    pub simple_constraints: Vector<Constraint>,
    pub type_assignment: TypeSubstitution,
    pub qualifier_map: QMap,
    pub horn_clauses: Vector<HornClause>,
    pub candidates: Vector<Candidate>,
}

impl SearchState {
    pub fn new(initial: Candidate) -> SearchState {
        SearchState {
            candidates: Vector::unit(initial),
            ..SearchState::default()
        }
    }

    pub fn add_constraint(&mut self, c: Constraint) {
        log::trace!("emit {}", c);
        self.typing_constraints.push_back(c);
    }
}

/// Monotone supply of fresh identifiers. Never rolled back on backtracking,
/// so a name handed out by an abandoned branch is never reused.
#[derive(Clone, Debug, Default)]
pub struct NameFactory {
    value: u64,
}

impl NameFactory {
    pub fn new() -> NameFactory {
        NameFactory::default()
    }

    pub fn fresh(&mut self, prefix: &str) -> Id {
        let v = self.value;
        self.value += 1;
        format!("{}{}", prefix, v)
    }

    pub fn issued(&self) -> u64 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::{NameFactory, GHOST_PREFIX, TYPE_VAR_PREFIX};

    #[test]
    fn names_are_never_reused() {
        let mut names = NameFactory::new();
        assert_eq!(names.fresh(TYPE_VAR_PREFIX), "_a0");
        assert_eq!(names.fresh(GHOST_PREFIX), "_g1");
        assert_eq!(names.fresh(TYPE_VAR_PREFIX), "_a2");
        assert_eq!(names.issued(), 3);
    }
}
