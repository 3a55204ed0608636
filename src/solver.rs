//! The second-order constraint solver capability and the solve step that
//! drives it.
use crate::{
    candidate::{Candidate, HornClause, QMap, QSpace},
    error::{Explored, SynthError},
    logic::{Formula, Id},
    lower::lower_all,
    program::RProgram,
    simplify::Simplifier,
    state::{NameFactory, SearchState},
};

/// Incremental liquid-assignment search over Horn clauses.
///
/// `refine` must behave as a pure function of its arguments: the search may
/// call it from a branch that is later abandoned, and nothing from that call
/// may influence calls made from sibling branches.
pub trait ConstraintSolver {
    /// Starting valuation.
    fn init(&mut self) -> Candidate;

    /// Candidates still consistent with `clauses` and everything seen before
    /// by `candidates`. An empty result means the clauses are unsatisfiable.
    fn refine(
        &mut self,
        clauses: &[HornClause],
        qmap: &QMap,
        program: &RProgram,
        candidates: Vec<Candidate>,
    ) -> Explored<Vec<Candidate>>;

    /// Drops redundant qualifiers from a space.
    fn prune_qualifiers(&mut self, quals: QSpace) -> Explored<QSpace>;
}

/// Turns the scalar terms in scope at a program point into a qualifier space.
pub trait QualifierGenerator {
    fn generate(&self, scalars: &[Formula]) -> QSpace;
}

impl<F> QualifierGenerator for F
where
    F: Fn(&[Formula]) -> QSpace,
{
    fn generate(&self, scalars: &[Formula]) -> QSpace {
        self(scalars)
    }
}

/// Generators for guard unknowns and for type refinement unknowns.
pub struct QualifierGenerators {
    pub cond: Box<dyn QualifierGenerator>,
    pub ty: Box<dyn QualifierGenerator>,
}

impl QualifierGenerators {
    pub fn new<C, T>(cond: C, ty: T) -> QualifierGenerators
    where
        C: QualifierGenerator + 'static,
        T: QualifierGenerator + 'static,
    {
        QualifierGenerators {
            cond: Box::new(cond),
            ty: Box::new(ty),
        }
    }

    /// Generators that never propose anything; every unknown is valued `true`.
    pub fn empty() -> QualifierGenerators {
        QualifierGenerators::new(
            |_: &[Formula]| QSpace::default(),
            |_: &[Formula]| QSpace::default(),
        )
    }
}

/// Prunes `space` and records it as the qualifier space of `unknown`.
pub fn add_quals(
    state: &mut SearchState,
    solver: &mut dyn ConstraintSolver,
    unknown: Id,
    space: QSpace,
) -> Explored<()> {
    let space = solver.prune_qualifiers(space)?;
    log::trace!("quals {} := {}", unknown, space);
    state.qualifier_map.insert(unknown, space);
    Ok(())
}

/// One solve step: simplify, lower and refine the candidates against the new
/// Horn clauses. Fails when no candidate survives.
pub fn solve_constraints(
    names: &mut NameFactory,
    state: &mut SearchState,
    quals: &QualifierGenerators,
    solver: &mut dyn ConstraintSolver,
    program: &RProgram,
) -> Explored<()> {
    let passes = Simplifier::new(names, state).simplify_all()?;
    log::trace!("simplified in {} passes", passes);
    lower_all(state, quals, solver)?;

    let clauses = std::mem::take(&mut state.horn_clauses)
        .into_iter()
        .collect::<Vec<_>>();
    let candidates = std::mem::take(&mut state.candidates)
        .into_iter()
        .collect::<Vec<_>>();
    let refined = solver.refine(&clauses, &state.qualifier_map, program, candidates)?;
    if refined.is_empty() {
        log::debug!("no candidate survives {} clauses for {}", clauses.len(), program);
        return Err(SynthError::unsatisfiable());
    }

    log::trace!("{} candidates survive", refined.len());
    state.candidates = refined.into_iter().collect();
    Ok(())
}
