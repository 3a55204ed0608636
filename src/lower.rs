//! Lowering of atomic constraints into Horn clauses and qualifier requests.
use crate::{
    candidate::HornClause,
    constraints::Constraint,
    error::{Explored, SynthError},
    logic::{Formula, VALUE_VAR},
    solver::{add_quals, ConstraintSolver, QualifierGenerators},
    state::SearchState,
    subst::Substitutable,
    ty::TypeSkeleton,
    unify::is_free_var,
};

/// Lowers every pending simple constraint. Subtyping between free type
/// variables is put back into the typing constraints for the next round.
pub fn lower_all(
    state: &mut SearchState,
    quals: &QualifierGenerators,
    solver: &mut dyn ConstraintSolver,
) -> Explored<()> {
    let pending = std::mem::take(&mut state.simple_constraints);
    for c in pending {
        lower(state, quals, solver, c)?;
    }
    Ok(())
}

pub fn lower(
    state: &mut SearchState,
    quals: &QualifierGenerators,
    solver: &mut dyn ConstraintSolver,
    c: Constraint,
) -> Explored<()> {
    match &c {
        Constraint::Subtype(env, lhs, rhs)
            if is_free_var(env, lhs).is_some() || is_free_var(env, rhs).is_some() =>
        {
            log::trace!("requeue {}", c);
            state.typing_constraints.push_back(c.clone());
            Ok(())
        }
        Constraint::Subtype(
            env,
            TypeSkeleton::Scalar(b1, args1, antecedent),
            TypeSkeleton::Scalar(b2, args2, consequent),
        ) if b1 == b2 && args1.is_empty() && args2.is_empty() => {
            let tass = &state.type_assignment;
            let mut consequent = consequent.clone();
            consequent.apply_subst(tass);
            if consequent.is_true() {
                return Ok(());
            }

            let mut antecedent = antecedent.clone();
            antecedent.apply_subst(tass);
            let (positives, negatives) = env.embedding(tass);
            let clause = HornClause::new(
                Formula::conjunction(positives).and(antecedent),
                Formula::disjunction(negatives).or(consequent),
            );
            log::trace!("horn {}", clause);
            state.horn_clauses.push_back(clause);
            Ok(())
        }
        Constraint::WellFormed(env, TypeSkeleton::Scalar(base, args, fml)) if args.is_empty() => {
            let tass = &state.type_assignment;
            let mut value_var = Formula::var(base.to_sort(), VALUE_VAR);
            value_var.apply_subst(tass);

            let fresh_unknowns = fml
                .unknowns()
                .into_iter()
                .filter(|u| !state.qualifier_map.contains_key(u))
                .collect::<Vec<_>>();
            if fresh_unknowns.is_empty() {
                return Ok(());
            }

            let mut scalars = vec![value_var];
            scalars.extend(env.all_scalars(tass));
            for u in fresh_unknowns {
                let space = quals.ty.generate(&scalars);
                add_quals(state, solver, u, space)?;
            }
            Ok(())
        }
        Constraint::WellFormedCond(env, Formula::Unknown(_, u)) => {
            if state.qualifier_map.contains_key(u) {
                return Ok(());
            }
            let space = quals.cond.generate(&env.all_scalars(&state.type_assignment));
            add_quals(state, solver, u.clone(), space)
        }
        _ => Err(SynthError::non_simple_constraint(c.clone())),
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        candidate::QSpace,
        constraints::Constraint,
        env::Environment,
        error::SynthErrorKind,
        logic::{Formula, Sort},
        mocks::MockSolver,
        solver::QualifierGenerators,
        state::SearchState,
        ty::RType,
    };

    use super::lower_all;

    fn v() -> Formula {
        Formula::value_var(Sort::Int)
    }

    fn quals() -> QualifierGenerators {
        QualifierGenerators::new(
            |scalars: &[Formula]| {
                QSpace::new(
                    scalars
                        .iter()
                        .map(|s| s.clone().not_equals(Formula::int(0)))
                        .collect(),
                )
            },
            |scalars: &[Formula]| {
                QSpace::new(
                    scalars
                        .iter()
                        .map(|s| s.clone().at_least(Formula::int(0)))
                        .collect(),
                )
            },
        )
    }

    #[test]
    fn subtyping_becomes_a_clause_with_the_embedding() {
        let mut env = Environment::new();
        env.add_variable("x", RType::int(v().greater_than(Formula::int(0))));
        env.add_neg_assumption(Formula::bool_var("b"));

        let mut state = SearchState::default();
        state.simple_constraints.push_back(Constraint::Subtype(
            env,
            RType::int(v().equals(Formula::int_var("x"))),
            RType::int(v().at_least(Formula::int(0))),
        ));
        let mut solver = MockSolver::accepting();
        lower_all(&mut state, &quals(), &mut solver).unwrap();

        assert_eq!(state.horn_clauses.len(), 1);
        let clause = &state.horn_clauses[0];
        assert_eq!(
            clause.antecedent,
            Formula::int_var("x")
                .greater_than(Formula::int(0))
                .and(v().equals(Formula::int_var("x")))
        );
        assert_eq!(
            clause.consequent,
            Formula::bool_var("b").or(v().at_least(Formula::int(0)))
        );
    }

    #[test]
    fn trivially_true_consequents_are_dropped() {
        let mut state = SearchState::default();
        state.simple_constraints.push_back(Constraint::Subtype(
            Environment::new(),
            RType::int(v().equals(Formula::int(1))),
            RType::int(Formula::ftrue()),
        ));
        let mut solver = MockSolver::accepting();
        lower_all(&mut state, &quals(), &mut solver).unwrap();
        assert!(state.horn_clauses.is_empty());
    }

    #[test]
    fn well_formedness_requests_qualifiers_once() {
        let mut env = Environment::new();
        env.add_variable("n", RType::int(Formula::ftrue()));
        let wf = Constraint::WellFormed(env.clone(), RType::int(Formula::unknown("_u0")));
        let mut state = SearchState::default();
        state.simple_constraints.push_back(wf.clone());
        state.simple_constraints.push_back(wf);
        state
            .simple_constraints
            .push_back(Constraint::WellFormedCond(env, Formula::unknown("_c1")));

        let mut solver = MockSolver::accepting();
        lower_all(&mut state, &quals(), &mut solver).unwrap();

        let ty_space = state.qualifier_map.get("_u0").unwrap();
        assert_eq!(
            ty_space.qualifiers,
            vec![
                v().at_least(Formula::int(0)),
                Formula::int_var("n").at_least(Formula::int(0))
            ]
        );
        let cond_space = state.qualifier_map.get("_c1").unwrap();
        assert_eq!(
            cond_space.qualifiers,
            vec![Formula::int_var("n").not_equals(Formula::int(0))]
        );
        assert_eq!(solver.pruned.len(), 2);
    }

    #[test]
    fn free_variable_subtyping_is_requeued() {
        let c = Constraint::Subtype(
            Environment::new(),
            RType::vart("a", Formula::ftrue()),
            RType::vart("b", Formula::ftrue()),
        );
        let mut state = SearchState::default();
        state.simple_constraints.push_back(c.clone());
        let mut solver = MockSolver::accepting();
        lower_all(&mut state, &quals(), &mut solver).unwrap();
        assert_eq!(state.typing_constraints.len(), 1);
        assert_eq!(state.typing_constraints[0], c);
    }

    #[test]
    fn compound_constraints_are_fatal() {
        let mut state = SearchState::default();
        state.simple_constraints.push_back(Constraint::WellFormed(
            Environment::new(),
            RType::function("x", RType::int(Formula::ftrue()), RType::int(Formula::ftrue())),
        ));
        let mut solver = MockSolver::accepting();
        let err = lower_all(&mut state, &quals(), &mut solver).unwrap_err();
        assert!(matches!(err.kind, SynthErrorKind::NonSimpleConstraint(_)));
        assert!(err.is_fatal());
    }
}
