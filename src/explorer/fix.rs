//! Top-level goals and the recursive calls available to their bodies.
use crate::{
    config::FixpointStrategy,
    env::Environment,
    error::Explored,
    logic::{Formula, Id, Sort},
    program::{Program, RProgram},
    state::{ARG_PREFIX, REC_FN_PREFIX},
    ty::{BaseType, RSchema, RType, TypeSkeleton},
};

use super::{Depth, Explorer, Next};

impl<'a> Explorer<'a> {
    /// Strips quantifiers off `sch` and generates a term of the remaining
    /// type. Function goals get access to their own recursive calls.
    pub fn generate_top_level(
        &mut self,
        env: &Environment,
        sch: &RSchema,
        depth: Depth,
        k: &mut Next<'_, 'a>,
    ) -> Explored<RProgram> {
        match sch {
            RSchema::ForAll(a, inner) => {
                let mut env = env.clone();
                env.add_type_var(a.clone());
                self.generate_top_level(&env, inner, depth, k)
            }
            RSchema::Mono(t) if t.is_function() => self.generate_fix(env, t, depth, k),
            RSchema::Mono(t) => self.generate_i(env, t, depth, k),
        }
    }

    fn generate_fix(
        &mut self,
        env: &Environment,
        t: &RType,
        depth: Depth,
        k: &mut Next<'_, 'a>,
    ) -> Explored<RProgram> {
        let (body_env, names) = self.recursive_env(env, t);
        if names.is_empty() {
            return self.generate_i(&body_env, t, depth, k);
        }

        self.generate_i(&body_env, t, depth, &mut |ex, body| {
            k(ex, Program::fix(names.clone(), body))
        })
    }

    /// The environment of the body of a function goal of type `t`, with its
    /// recursive calls bound, and the names of those calls. With polymorphic
    /// recursion the calls are generalized over the type variables bound in
    /// `env`.
    pub fn recursive_env(&mut self, env: &Environment, t: &RType) -> (Environment, Vec<Id>) {
        let rec_calls = self.recursive_calls(env, t);
        let polymorphic = self.params.poly_recursion && !env.bound_type_vars.is_empty();

        let mut body_env = env.clone();
        for (f, sig) in &rec_calls {
            log::debug!("recursive call {} :: {}", f, sig);
            if polymorphic {
                let sch = RSchema::generalize(&env.bound_type_vars, sig.clone());
                body_env.add_poly_variable(f.clone(), sch);
            } else {
                body_env.add_variable(f.clone(), sig.clone());
            }
        }
        (body_env, rec_calls.into_iter().map(|(f, _)| f).collect())
    }

    /// Legal signatures for recursive calls of a function of type `t`, in
    /// argument order. Each strengthens one argument position to a
    /// well-founded decrease.
    pub fn recursive_calls(&mut self, env: &Environment, t: &RType) -> Vec<(Id, RType)> {
        match t {
            TypeSkeleton::Function(x, arg, res) => {
                let y = self.names.fresh(ARG_PREFIX);
                let res = res.rename_var(x, &y, arg);
                let tail = self.recursive_calls(env, &res);
                match recursive_t_arg(env, x, arg) {
                    None => tail
                        .into_iter()
                        .map(|(f, res)| (f, RType::function(y.clone(), (**arg).clone(), res)))
                        .collect(),
                    Some((arg_lt, arg_eq)) => {
                        let f = self.names.fresh(REC_FN_PREFIX);
                        let here = (f, RType::function(y.clone(), arg_lt, res));
                        match self.params.fix_strategy {
                            FixpointStrategy::DisableFixpoint => vec![],
                            FixpointStrategy::FirstArgument => vec![here],
                            FixpointStrategy::AllArguments => std::iter::once(here)
                                .chain(tail.into_iter().map(|(f, res)| {
                                    (f, RType::function(y.clone(), arg_eq.clone(), res))
                                }))
                                .collect(),
                        }
                    }
                }
            }
            TypeSkeleton::Scalar(_, _, _) => vec![],
        }
    }
}

/// Strict-decrease and equal refinements of argument `x : t`, if `t` admits
/// a well-founded order.
fn recursive_t_arg(env: &Environment, x: &str, t: &RType) -> Option<(RType, RType)> {
    match t {
        TypeSkeleton::Scalar(BaseType::Int, args, fml) => {
            let v = Formula::value_var(Sort::Int);
            let lt = fml
                .clone()
                .and(v.clone().at_least(Formula::int(0)))
                .and(v.clone().less_than(Formula::int_var(x)));
            let eq = fml.clone().and(v.equals(Formula::int_var(x)));
            Some((
                TypeSkeleton::Scalar(BaseType::Int, args.clone(), lt),
                TypeSkeleton::Scalar(BaseType::Int, args.clone(), eq),
            ))
        }
        TypeSkeleton::Scalar(base @ BaseType::Data(name), args, fml) => {
            let metric = env.metric_of(name)?;
            let sort = Sort::Data(name.clone());
            let m_v = Formula::measure(Sort::Int, metric.clone(), Formula::value_var(sort.clone()));
            let m_x = Formula::measure(Sort::Int, metric.clone(), Formula::var(sort, x));
            let lt = fml.clone().and(m_v.clone().less_than(m_x.clone()));
            let eq = fml.clone().and(m_v.equals(m_x));
            Some((
                TypeSkeleton::Scalar(base.clone(), args.clone(), lt),
                TypeSkeleton::Scalar(base.clone(), args.clone(), eq),
            ))
        }
        _ => None,
    }
}
