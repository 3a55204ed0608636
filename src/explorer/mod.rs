//! Backtracking search for programs of a goal type.
//!
//! Generators are written in continuation-passing style: each one takes the
//! continuation that consumes the term it produces, and a choice point runs
//! every alternative together with the rest of the search. A later failure
//! therefore retries earlier choices. Branch state is snapshotted before each
//! alternative and restored when the alternative fails; fresh names are
//! never reused.
mod eliminate;
mod fix;
mod introduce;

use crate::{
    config::ExplorerParams,
    constraints::Constraint,
    env::Environment,
    error::{Explored, SynthError},
    program::{Goal, RProgram},
    solver::{solve_constraints, ConstraintSolver, QualifierGenerators},
    state::{NameFactory, SearchState},
};

/// Consumes a generated term and finishes the search.
pub type Next<'k, 'a> = dyn FnMut(&mut Explorer<'a>, RProgram) -> Explored<RProgram> + 'k;

/// Consumes an elimination term together with the environment it was
/// generated in, which may have gained ghost bindings.
pub type NextE<'k, 'a> =
    dyn FnMut(&mut Explorer<'a>, Environment, RProgram) -> Explored<RProgram> + 'k;

/// Remaining generation budgets of one branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Depth {
    /// Application depth of guessed elimination terms.
    pub app: usize,
    pub matches: usize,
    pub conds: usize,
}

impl From<&ExplorerParams> for Depth {
    fn from(params: &ExplorerParams) -> Self {
        Depth {
            app: params.e_guess_depth,
            matches: params.match_depth,
            conds: params.cond_depth,
        }
    }
}

pub struct Explorer<'a> {
    pub params: ExplorerParams,
    pub quals: &'a QualifierGenerators,
    pub solver: &'a mut dyn ConstraintSolver,
    pub state: SearchState,
    pub names: NameFactory,
}

impl<'a> Explorer<'a> {
    pub fn new(
        params: ExplorerParams,
        quals: &'a QualifierGenerators,
        solver: &'a mut dyn ConstraintSolver,
    ) -> Explorer<'a> {
        let state = SearchState::new(solver.init());
        Explorer {
            params,
            quals,
            solver,
            state,
            names: NameFactory::new(),
        }
    }

    pub fn add_constraint(&mut self, c: Constraint) {
        self.state.add_constraint(c);
    }

    /// Runs one solve step on everything emitted so far.
    pub fn solve(&mut self, program: &RProgram) -> Explored<()> {
        solve_constraints(
            &mut self.names,
            &mut self.state,
            self.quals,
            &mut *self.solver,
            program,
        )
    }

    pub fn solve_incrementally(&mut self, program: &RProgram) -> Explored<()> {
        if self.params.incremental_solving {
            self.solve(program)
        } else {
            Ok(())
        }
    }

    /// Tries `attempt` on each option in order and returns the first result.
    /// A recoverable failure restores the branch state and moves on to the
    /// next option; a fatal one is passed straight up. With no option left,
    /// fails with the last recoverable error, or `none` if there was none.
    pub fn choose<T, I, F>(&mut self, options: I, none: SynthError, mut attempt: F) -> Explored<RProgram>
    where
        I: IntoIterator<Item = T>,
        F: FnMut(&mut Explorer<'a>, T) -> Explored<RProgram>,
    {
        let mut last = none;
        for option in options {
            let snapshot = self.state.clone();
            match attempt(self, option) {
                Ok(program) => return Ok(program),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    log::debug!("backtrack: {}", err);
                    self.state = snapshot;
                    last = err;
                }
            }
        }
        Err(last)
    }

    /// Applies the surviving solution to a finished program.
    fn finalize(&self, program: &RProgram) -> RProgram {
        let mut sol = self
            .state
            .candidates
            .front()
            .map(|cand| cand.solution.clone())
            .unwrap_or_default();
        // unknowns never seen by the solver are unconstrained
        for (u, _) in self.state.qualifier_map.iter() {
            sol.entry(u.clone()).or_default();
        }
        program.finalize(&sol, &self.state.type_assignment)
    }
}

/// Searches for a program of type `goal.spec` in `goal.environment`.
///
/// Returns `NoSolution` when the search space within the configured bounds
/// is exhausted; fatal errors are returned as they are.
pub fn synthesize(
    params: &ExplorerParams,
    quals: &QualifierGenerators,
    solver: &mut dyn ConstraintSolver,
    goal: &Goal,
) -> Explored<RProgram> {
    log::info!("synthesizing {} :: {}", goal.name, goal.spec);
    let depth = Depth::from(params);
    let mut explorer = Explorer::new(params.clone(), quals, solver);
    let result = explorer.generate_top_level(&goal.environment, &goal.spec, depth, &mut |ex, program| {
        ex.solve(&program)?;
        Ok(ex.finalize(&program))
    });

    match result {
        Ok(program) => {
            log::info!("{} = {}", goal.name, program);
            Ok(program)
        }
        Err(err) if err.is_fatal() => Err(err),
        Err(err) => {
            log::debug!("search for {} exhausted: {}", goal.name, err);
            Err(SynthError::no_solution(goal.name.clone()))
        }
    }
}
