//! Bottom-up generation of elimination terms: symbols and applications.
use crate::{
    constraints::Constraint,
    env::Environment,
    error::{DepthKind, Explored, SynthError},
    program::{Program, RProgram},
    state::{ARG_PREFIX, GHOST_PREFIX, TYPE_VAR_PREFIX},
    subst::Substitutable,
    ty::{RType, SType, TypeSkeleton},
    unify::instantiate,
};

use super::{Explorer, NextE};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Strategy {
    Var,
    App,
}

impl<'a> Explorer<'a> {
    /// Generates an elimination term of shape `s`, applying functions at most
    /// `app_depth` deep.
    pub fn generate_e(
        &mut self,
        env: &Environment,
        s: &SType,
        app_depth: usize,
        k: &mut NextE<'_, 'a>,
    ) -> Explored<RProgram> {
        self.choose(
            [Strategy::Var, Strategy::App],
            SynthError::no_symbols(s.clone()),
            |ex, strategy| match strategy {
                Strategy::Var => ex.generate_var(env, s, &mut *k),
                Strategy::App => ex.generate_app(env, s, app_depth, &mut *k),
            },
        )
    }

    pub fn generate_var(
        &mut self,
        env: &Environment,
        s: &SType,
        k: &mut NextE<'_, 'a>,
    ) -> Explored<RProgram> {
        let syms = env.symbols_of_arity(s.arity());
        if syms.is_empty() {
            return Err(SynthError::no_symbols(s.clone()));
        }

        self.choose(syms, SynthError::no_symbols(s.clone()), |ex, (name, sch)| {
            let t = instantiate(&mut ex.names, &sch);
            let t = match t {
                TypeSkeleton::Scalar(base, args, _) if !env.is_constant(&name) => {
                    let fml = RType::var_refinement(&name, &base);
                    TypeSkeleton::Scalar(base, args, fml)
                }
                t => t,
            };
            log::trace!("try {} :: {}", name, t);

            ex.add_constraint(Constraint::Subtype(
                env.clone(),
                t.shape().refine_bot(),
                s.refine_top(),
            ));
            let program = Program::symbol(name, t);
            ex.solve_incrementally(&program)?;
            k(ex, env.clone(), program)
        })
    }

    pub fn generate_app(
        &mut self,
        env: &Environment,
        s: &SType,
        app_depth: usize,
        k: &mut NextE<'_, 'a>,
    ) -> Explored<RProgram> {
        if app_depth == 0 {
            return Err(SynthError::depth_exhausted(DepthKind::Application));
        }
        if s.arity() == env.max_arity() {
            return Err(SynthError::no_symbols(s.clone()));
        }

        let a = self.names.fresh(TYPE_VAR_PREFIX);
        let x = self.names.fresh(ARG_PREFIX);
        let fun_shape = SType::function(x, SType::type_var(a), s.clone());

        self.generate_e(env, &fun_shape, app_depth - 1, &mut |ex, env, fun| {
            let (fx, targ, tres) = match &fun.ty {
                TypeSkeleton::Function(fx, targ, tres) => {
                    (fx.clone(), (**targ).clone(), (**tres).clone())
                }
                TypeSkeleton::Scalar(_, _, _) => return Err(SynthError::no_symbols(fun_shape.clone())),
            };
            let mut arg_t = targ.clone();
            arg_t.apply_subst(&ex.state.type_assignment);

            ex.generate_e(&env, &arg_t.shape(), app_depth - 1, &mut |ex, env, arg| {
                ex.add_constraint(Constraint::Subtype(env.clone(), arg.ty.clone(), targ.clone()));
                ex.solve_incrementally(&arg)?;

                if targ.is_function() {
                    return k(ex, env, Program::app(fun.clone(), arg, tres.clone()));
                }

                // name the argument so that the result can depend on it
                let g = ex.names.fresh(GHOST_PREFIX);
                let mut env = env;
                env.add_ghost(g.clone(), arg.ty.clone());
                let t = tres.rename_var(&fx, &g, &targ);
                k(ex, env, Program::app(fun.clone(), arg, t))
            })
        })
    }
}
