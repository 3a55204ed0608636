//! Rewriting of typing constraints into atomic ones.
//!
//! Each constraint is rewritten by [`Simplifier::step`] until it is atomic
//! (and queued for lowering), discharged, deferred or found to be
//! ill-shaped. A pass over all pending constraints is repeated as long as it
//! assigns new type variables, and constraints deferred in one pass are
//! retried in the next, since a later assignment may have unblocked them.
use crate::{
    constraints::Constraint,
    error::{Explored, SynthError},
    state::{NameFactory, SearchState},
    subst::Substitutable,
    ty::{RType, TypeSkeleton},
    unify::{is_free_var, unify},
};

/// Outcome of one rewrite.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Replace the constraint with these, simplified in order.
    Decomposed(Vec<Constraint>),
    /// A type variable was assigned; `retry` is simplified again right away
    /// and `well_formed` is left for the next pass.
    Unified {
        retry: Constraint,
        well_formed: Constraint,
    },
    /// Atomic, ready for lowering.
    Simple(Constraint),
    /// Relates two distinct unassigned type variables; nothing to do until
    /// one of them is assigned.
    Deferred(Constraint),
    Discharged,
}

pub struct Simplifier<'s> {
    pub names: &'s mut NameFactory,
    pub state: &'s mut SearchState,
}

impl<'s> Simplifier<'s> {
    pub fn new(names: &'s mut NameFactory, state: &'s mut SearchState) -> Self {
        Simplifier { names, state }
    }

    fn is_assigned_var(&self, c: &Constraint, t: &RType) -> bool {
        is_free_var(c.env(), t).map_or(false, |a| self.state.type_assignment.contains_key(&a))
    }

    pub fn step(&mut self, c: Constraint) -> Explored<Step> {
        let tass = &self.state.type_assignment;
        match &c {
            Constraint::Subtype(env, lhs, rhs) => {
                if self.is_assigned_var(&c, lhs) || self.is_assigned_var(&c, rhs) {
                    let mut lhs = lhs.clone();
                    let mut rhs = rhs.clone();
                    lhs.apply_subst(tass);
                    rhs.apply_subst(tass);
                    return Ok(Step::Decomposed(vec![Constraint::Subtype(env.clone(), lhs, rhs)]));
                }

                match (is_free_var(env, lhs), is_free_var(env, rhs)) {
                    (Some(a), Some(b)) if a == b => return Ok(Step::Discharged),
                    (Some(_), Some(_)) => return Ok(Step::Deferred(c.clone())),
                    (Some(a), None) => return self.unify_and_retry(&a, rhs, &c),
                    (None, Some(b)) => return self.unify_and_retry(&b, lhs, &c),
                    (None, None) => {}
                }

                match (lhs, rhs) {
                    (
                        TypeSkeleton::Scalar(b1, args1, f1),
                        TypeSkeleton::Scalar(b2, args2, f2),
                    ) if b1 == b2 && args1.len() == args2.len() => {
                        if args1.is_empty() {
                            return Ok(Step::Simple(c.clone()));
                        }
                        let head =
                            Constraint::Subtype(env.clone(), args1[0].clone(), args2[0].clone());
                        let rest = Constraint::Subtype(
                            env.clone(),
                            TypeSkeleton::Scalar(b1.clone(), args1[1..].to_vec(), f1.clone()),
                            TypeSkeleton::Scalar(b2.clone(), args2[1..].to_vec(), f2.clone()),
                        );
                        Ok(Step::Decomposed(vec![head, rest]))
                    }
                    (
                        TypeSkeleton::Function(x, arg1, res1),
                        TypeSkeleton::Function(y, arg2, res2),
                    ) => {
                        let args =
                            Constraint::Subtype(env.clone(), (**arg2).clone(), (**arg1).clone());
                        let results = if arg1.is_scalar() {
                            let mut env = env.clone();
                            env.add_variable(y.clone(), (**arg2).clone());
                            Constraint::Subtype(env, res1.rename_var(x, y, arg1), (**res2).clone())
                        } else {
                            Constraint::Subtype(env.clone(), (**res1).clone(), (**res2).clone())
                        };
                        Ok(Step::Decomposed(vec![args, results]))
                    }
                    _ => Err(SynthError::shape_mismatch(c.clone())),
                }
            }
            Constraint::WellFormed(env, t) => {
                if self.is_assigned_var(&c, t) {
                    let mut t = t.clone();
                    t.apply_subst(tass);
                    return Ok(Step::Decomposed(vec![Constraint::WellFormed(env.clone(), t)]));
                }

                match t {
                    TypeSkeleton::Scalar(_, args, _) if args.is_empty() => {
                        Ok(Step::Simple(c.clone()))
                    }
                    TypeSkeleton::Scalar(base, args, fml) => {
                        let mut parts = args
                            .iter()
                            .map(|arg| Constraint::WellFormed(env.clone(), arg.clone()))
                            .collect::<Vec<_>>();
                        parts.push(Constraint::WellFormed(
                            env.clone(),
                            TypeSkeleton::Scalar(base.clone(), vec![], fml.clone()),
                        ));
                        Ok(Step::Decomposed(parts))
                    }
                    TypeSkeleton::Function(x, arg, res) => {
                        let mut res_env = env.clone();
                        res_env.add_variable(x.clone(), (**arg).clone());
                        Ok(Step::Decomposed(vec![
                            Constraint::WellFormed(env.clone(), (**arg).clone()),
                            Constraint::WellFormed(res_env, (**res).clone()),
                        ]))
                    }
                }
            }
            Constraint::WellFormedCond(_, _) => Ok(Step::Simple(c.clone())),
        }
    }

    fn unify_and_retry(&mut self, a: &str, t: &RType, c: &Constraint) -> Explored<Step> {
        let well_formed = unify(self.names, c.env(), &mut self.state.type_assignment, a, t)?;
        Ok(Step::Unified {
            retry: c.clone(),
            well_formed,
        })
    }

    /// Rewrites `c` completely and returns the parts that had to be deferred.
    pub fn simplify(&mut self, c: Constraint) -> Explored<Vec<Constraint>> {
        let mut deferred = vec![];
        let mut work = vec![c];
        while let Some(c) = work.pop() {
            match self.step(c)? {
                Step::Decomposed(parts) => work.extend(parts.into_iter().rev()),
                Step::Unified { retry, well_formed } => {
                    self.state.typing_constraints.push_back(well_formed);
                    work.push(retry);
                }
                Step::Simple(c) => {
                    log::trace!("simple {}", c);
                    self.state.simple_constraints.push_back(c);
                }
                Step::Deferred(c) => deferred.push(c),
                Step::Discharged => {}
            }
        }
        Ok(deferred)
    }

    /// Simplifies all pending typing constraints to a fixpoint and returns
    /// the number of passes it took. Whatever is still deferred after the
    /// last pass is handed to lowering, which carries it over to the next
    /// solve step.
    pub fn simplify_all(&mut self) -> Explored<usize> {
        let mut passes = 0;
        loop {
            passes += 1;
            let assigned = self.state.type_assignment.len();
            let pending = std::mem::take(&mut self.state.typing_constraints);
            let mut deferred = vec![];
            for c in pending {
                deferred.extend(self.simplify(c)?);
            }

            if self.state.type_assignment.len() == assigned {
                log::trace!("{} constraints left deferred", deferred.len());
                self.state.simple_constraints.extend(deferred);
                return Ok(passes);
            }
            self.state.typing_constraints.extend(deferred);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        constraints::Constraint,
        env::Environment,
        error::SynthErrorKind,
        logic::{Formula, Sort},
        state::{NameFactory, SearchState},
        ty::{BaseType, RType, TypeSkeleton},
    };

    use super::{Simplifier, Step};

    fn tv(a: &str) -> RType {
        RType::vart(a, Formula::ftrue())
    }

    fn ge0() -> Formula {
        Formula::value_var(Sort::Int).at_least(Formula::int(0))
    }

    #[test]
    fn scalar_arguments_decompose_in_order() {
        let env = Environment::new();
        let (a1, a2) = (RType::int(ge0()), RType::bool(Formula::ftrue()));
        let (b1, b2) = (RType::int(Formula::ftrue()), RType::bool(Formula::ffalse()));
        let lhs = RType::data("Pair", vec![a1.clone(), a2.clone()], Formula::unknown("U0"));
        let rhs = RType::data("Pair", vec![b1.clone(), b2.clone()], Formula::unknown("U1"));

        let mut names = NameFactory::new();
        let mut state = SearchState::default();
        let mut simplifier = Simplifier::new(&mut names, &mut state);
        let step = simplifier
            .step(Constraint::Subtype(env.clone(), lhs, rhs))
            .unwrap();

        let pair = BaseType::Data("Pair".to_string());
        assert_eq!(
            step,
            Step::Decomposed(vec![
                Constraint::Subtype(env.clone(), a1, b1),
                Constraint::Subtype(
                    env,
                    TypeSkeleton::Scalar(pair.clone(), vec![a2], Formula::unknown("U0")),
                    TypeSkeleton::Scalar(pair, vec![b2], Formula::unknown("U1")),
                ),
            ])
        );
    }

    #[test]
    fn functions_are_contravariant_in_the_argument() {
        let env = Environment::new();
        let x_eq = Formula::value_var(Sort::Int).equals(Formula::int_var("x"));
        let lhs = RType::function("x", RType::int(Formula::ftrue()), RType::int(x_eq));
        let rhs = RType::function("y", RType::int(ge0()), RType::int(ge0()));

        let mut names = NameFactory::new();
        let mut state = SearchState::default();
        let mut simplifier = Simplifier::new(&mut names, &mut state);
        match simplifier.step(Constraint::Subtype(env, lhs, rhs)).unwrap() {
            Step::Decomposed(parts) => {
                assert_eq!(parts.len(), 2);
                match &parts[0] {
                    Constraint::Subtype(_, sub, sup) => {
                        assert_eq!(sub, &RType::int(ge0()));
                        assert_eq!(sup, &RType::int(Formula::ftrue()));
                    }
                    c => panic!("unexpected {}", c),
                }
                match &parts[1] {
                    Constraint::Subtype(env, sub, _) => {
                        assert!(env.lookup_symbol("y").is_some());
                        let y_eq = Formula::value_var(Sort::Int).equals(Formula::int_var("y"));
                        assert_eq!(sub, &RType::int(y_eq));
                    }
                    c => panic!("unexpected {}", c),
                }
            }
            step => panic!("unexpected {:?}", step),
        }
    }

    #[test]
    fn free_vars_are_deferred_or_discharged() {
        let env = Environment::new();
        let mut names = NameFactory::new();
        let mut state = SearchState::default();
        let mut simplifier = Simplifier::new(&mut names, &mut state);

        let same = Constraint::Subtype(env.clone(), tv("a"), tv("a"));
        assert_eq!(simplifier.step(same).unwrap(), Step::Discharged);

        let different = Constraint::Subtype(env, tv("a"), tv("b"));
        assert_eq!(simplifier.step(different.clone()).unwrap(), Step::Deferred(different));
    }

    #[test]
    fn occurs_check_fails_the_constraint() {
        let env = Environment::new();
        let list_a = RType::data("List", vec![tv("a")], Formula::ftrue());
        let mut names = NameFactory::new();
        let mut state = SearchState::default();
        state.add_constraint(Constraint::Subtype(env, tv("a"), list_a));

        let mut simplifier = Simplifier::new(&mut names, &mut state);
        let err = simplifier.simplify_all().unwrap_err();
        assert!(matches!(err.kind, SynthErrorKind::OccursCheck(ref a, _) if a == "a"));
        assert!(state.type_assignment.get("a").is_none());
    }

    #[test]
    fn mismatched_shapes_fail() {
        let env = Environment::new();
        let mut names = NameFactory::new();
        let mut state = SearchState::default();
        let mut simplifier = Simplifier::new(&mut names, &mut state);
        let c = Constraint::Subtype(env, RType::int(Formula::ftrue()), RType::bool(Formula::ftrue()));
        let err = simplifier.step(c).unwrap_err();
        assert!(matches!(err.kind, SynthErrorKind::ShapeMismatch(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn passes_are_bounded_by_free_vars() {
        // `b <: a` is deferred until `a` is assigned through `a <: Int`.
        let env = Environment::new();
        let mut names = NameFactory::new();
        let mut state = SearchState::default();
        state.add_constraint(Constraint::Subtype(env.clone(), tv("b"), tv("a")));
        state.add_constraint(Constraint::Subtype(env, tv("a"), RType::int(ge0())));

        let mut simplifier = Simplifier::new(&mut names, &mut state);
        let passes = simplifier.simplify_all().unwrap();
        let free_vars = 2;
        assert!(passes <= free_vars + 1);
        assert!(state.type_assignment.contains_key("a"));
        assert!(state.type_assignment.contains_key("b"));
        assert!(state.typing_constraints.is_empty());
    }

    #[test]
    fn no_assignment_means_one_pass() {
        let env = Environment::new();
        let mut names = NameFactory::new();
        let mut state = SearchState::default();
        state.add_constraint(Constraint::Subtype(env.clone(), RType::int(ge0()), RType::int(Formula::ftrue())));
        state.add_constraint(Constraint::WellFormed(
            env,
            RType::function("x", RType::int(Formula::unknown("U0")), RType::int(Formula::unknown("U1"))),
        ));

        let mut simplifier = Simplifier::new(&mut names, &mut state);
        assert_eq!(simplifier.simplify_all().unwrap(), 1);
        assert_eq!(state.simple_constraints.len(), 3);
    }

    #[test]
    fn unblocked_constraints_are_retried() {
        // `a <: Int` only comes after `b <: a`, yet both end up assigned.
        let env = Environment::new();
        let mut names = NameFactory::new();
        let mut state = SearchState::default();
        state.add_constraint(Constraint::Subtype(env.clone(), tv("b"), tv("a")));
        state.add_constraint(Constraint::Subtype(env, tv("a"), RType::int(ge0())));

        Simplifier::new(&mut names, &mut state).simplify_all().unwrap();
        let b = state.type_assignment.get("b").cloned().unwrap();
        assert!(matches!(b, TypeSkeleton::Scalar(BaseType::Int, _, _)));
        assert!(!state
            .simple_constraints
            .iter()
            .any(|c| matches!(c, Constraint::Subtype(_, TypeSkeleton::Scalar(BaseType::TypeVar(_), _, _), _))));
    }

    #[test]
    fn stuck_constraints_are_carried_over() {
        let env = Environment::new();
        let different = Constraint::Subtype(env, tv("a"), tv("b"));
        let mut names = NameFactory::new();
        let mut state = SearchState::default();
        state.add_constraint(different.clone());

        let passes = Simplifier::new(&mut names, &mut state).simplify_all().unwrap();
        assert_eq!(passes, 1);
        assert!(state.typing_constraints.is_empty());
        assert_eq!(state.simple_constraints.iter().cloned().collect::<Vec<_>>(), vec![different]);
    }
}
