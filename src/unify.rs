//! Instantiation, freshening and unification of type variables.
//!
//! Unification here only ever binds a *free* type variable (one not bound by
//! the environment) to a type. The assigned type is a fresh copy of the other
//! side's skeleton with new unknowns in every refinement position, so the
//! refinements of the two sides stay independent and are related later
//! through subtyping.
use crate::{
    constraints::Constraint,
    env::Environment,
    error::{Explored, SynthError},
    logic::{Formula, Id},
    state::{NameFactory, TYPE_VAR_PREFIX, UNKNOWN_PREFIX},
    subst::{Substitutable, TypeSubstitution},
    ty::{BaseType, RSchema, RType, TypeSkeleton},
};

/// Replaces every quantified variable of `sch` with a fresh free one.
pub fn instantiate(names: &mut NameFactory, sch: &RSchema) -> RType {
    let subst = sch
        .bound_vars()
        .into_iter()
        .map(|a| {
            let a_fresh = names.fresh(TYPE_VAR_PREFIX);
            (a, RType::vart(a_fresh, Formula::ftrue()))
        })
        .collect::<TypeSubstitution>();
    let mut t = sch.mono().clone();
    t.apply_subst(&subst);
    t
}

pub fn is_free_var(env: &Environment, t: &RType) -> Option<Id> {
    match t {
        TypeSkeleton::Scalar(BaseType::TypeVar(a), args, _) if args.is_empty() && !env.is_bound(a) => {
            Some(a.clone())
        }
        _ => None,
    }
}

/// A copy of `t`'s skeleton in which free type variables are replaced with
/// fresh ones and every other scalar position is refined by a fresh unknown.
pub fn fresh(names: &mut NameFactory, env: &Environment, t: &RType) -> RType {
    match t {
        TypeSkeleton::Scalar(BaseType::TypeVar(a), args, _) if args.is_empty() && !env.is_bound(a) => {
            RType::vart(names.fresh(TYPE_VAR_PREFIX), Formula::ftrue())
        }
        TypeSkeleton::Scalar(base, args, _) => {
            let args = args.iter().map(|arg| fresh(names, env, arg)).collect();
            let u = names.fresh(UNKNOWN_PREFIX);
            TypeSkeleton::Scalar(base.clone(), args, Formula::unknown(u))
        }
        TypeSkeleton::Function(x, arg, res) => {
            let arg = fresh(names, env, arg);
            let res = fresh(names, env, res);
            TypeSkeleton::function(x.clone(), arg, res)
        }
    }
}

/// Whether `a` occurs in `t` once the current assignment is applied.
pub fn occurs_in(a: &str, t: &RType, tass: &TypeSubstitution) -> bool {
    let mut t = t.clone();
    t.apply_subst(tass);
    t.type_vars().contains(a)
}

/// Binds free variable `a` to a fresh copy of `t` and returns the
/// well-formedness obligation of that copy. Fails without touching `tass`
/// if `a` occurs in `t`.
pub fn unify(
    names: &mut NameFactory,
    env: &Environment,
    tass: &mut TypeSubstitution,
    a: &str,
    t: &RType,
) -> Explored<Constraint> {
    if occurs_in(a, t, tass) {
        let mut t = t.clone();
        t.apply_subst(tass);
        return Err(SynthError::occurs_check(a, t));
    }

    let t_fresh = fresh(names, env, t);
    log::trace!("unify {} := {}", a, t_fresh);
    tass.insert(a.to_string(), t_fresh.clone());
    Ok(Constraint::WellFormed(env.clone(), t_fresh))
}

#[cfg(test)]
mod tests {
    use crate::{
        env::Environment,
        error::SynthErrorKind,
        logic::{Formula, Sort},
        state::NameFactory,
        subst::TypeSubstitution,
        ty::{RSchema, RType, TypeSkeleton},
    };

    use super::{fresh, instantiate, unify};

    fn list(elem: RType) -> RType {
        RType::data("List", vec![elem], Formula::ftrue())
    }

    #[test]
    fn occurs_check_never_assigns() {
        let mut names = NameFactory::new();
        let env = Environment::new();
        for t in [
            list(RType::vart("a", Formula::ftrue())),
            RType::function("x", RType::int(Formula::ftrue()), list(list(RType::vart("a", Formula::ftrue())))),
        ] {
            let mut tass = TypeSubstitution::new();
            let err = unify(&mut names, &env, &mut tass, "a", &t).unwrap_err();
            assert!(matches!(err.kind, SynthErrorKind::OccursCheck(_, _)));
            assert!(tass.get("a").is_none());
        }
    }

    #[test]
    fn occurs_check_sees_through_assignment() {
        let mut names = NameFactory::new();
        let env = Environment::new();
        let mut tass = TypeSubstitution::single("b", list(RType::vart("a", Formula::ftrue())));
        let err = unify(&mut names, &env, &mut tass, "a", &RType::vart("b", Formula::ftrue()));
        assert!(err.is_err());
        assert!(tass.get("a").is_none());
    }

    #[test]
    fn fresh_keeps_bound_vars_and_refreshes_free_ones() {
        let mut names = NameFactory::new();
        let mut env = Environment::new();
        env.add_type_var("b");
        let t = RType::data(
            "Pair",
            vec![RType::vart("a", Formula::ftrue()), RType::vart("b", Formula::ftrue())],
            Formula::ftrue(),
        );
        match fresh(&mut names, &env, &t) {
            TypeSkeleton::Scalar(_, args, fml) => {
                assert!(fml.has_unknowns());
                assert_eq!(args[0], RType::vart("_a0", Formula::ftrue()));
                assert!(matches!(&args[1], TypeSkeleton::Scalar(_, _, r) if r.has_unknowns()));
            }
            t => panic!("unexpected {}", t),
        }
    }

    #[test]
    fn successful_unification_requires_well_formedness() {
        let mut names = NameFactory::new();
        let env = Environment::new();
        let mut tass = TypeSubstitution::new();
        let c = unify(&mut names, &env, &mut tass, "a", &RType::int(Formula::ftrue())).unwrap();
        let assigned = tass.get("a").cloned().unwrap();
        assert_eq!(c, crate::constraints::Constraint::WellFormed(env, assigned.clone()));
        assert_eq!(assigned.refinement(), Some(&Formula::unknown("_u0")));
    }

    #[test]
    fn instantiation_renames_sorts() {
        let mut names = NameFactory::new();
        let v = Formula::value_var(Sort::Var("a".to_string()));
        let sch = RSchema::generalize(
            &["a".to_string()],
            RType::function("x", RType::vart("a", Formula::ftrue()), RType::vart("a", v.clone().equals(Formula::var(Sort::Var("a".to_string()), "x")))),
        );
        let t = instantiate(&mut names, &sch);
        let expected = Formula::value_var(Sort::Var("_a0".to_string()))
            .equals(Formula::var(Sort::Var("_a0".to_string()), "x"));
        assert_eq!(t.last_type(), &RType::vart("_a0", expected));
    }
}
