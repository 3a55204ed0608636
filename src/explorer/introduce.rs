//! Top-down generation: lambdas, guesses, pattern matches and conditionals.
use crate::{
    constraints::Constraint,
    env::Environment,
    error::{DepthKind, Explored, SynthError},
    logic::{Formula, Id, VALUE_VAR},
    program::{BareProgram, Case, Program, RProgram},
    state::{CASE_ARG_PREFIX, COND_PREFIX, GHOST_PREFIX, TYPE_VAR_PREFIX},
    subst::Substitutable,
    ty::{BaseType, RType, SType, TypeSkeleton},
    unify::instantiate,
};

use super::{Depth, Explorer, Next};

type NextCase<'k, 'a> = dyn FnMut(&mut Explorer<'a>, Case) -> Explored<RProgram> + 'k;
type NextCases<'k, 'a> = dyn FnMut(&mut Explorer<'a>, Vec<Case>) -> Explored<RProgram> + 'k;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Strategy {
    Guess,
    Match,
    Conditional,
}

impl<'a> Explorer<'a> {
    /// Generates an introduction term of type `t`.
    pub fn generate_i(
        &mut self,
        env: &Environment,
        t: &RType,
        depth: Depth,
        k: &mut Next<'_, 'a>,
    ) -> Explored<RProgram> {
        match t {
            TypeSkeleton::Function(x, arg, res) => {
                let mut body_env = env.clone();
                body_env.add_variable(x.clone(), (**arg).clone());
                self.generate_i(&body_env, res, depth, &mut |ex, body| {
                    k(ex, Program::fun(x.clone(), body, t.clone()))
                })
            }
            TypeSkeleton::Scalar(_, _, _) => {
                let strategies = [Strategy::Guess, Strategy::Match, Strategy::Conditional];
                self.choose(
                    strategies,
                    SynthError::no_symbols(t.shape()),
                    |ex, strategy| {
                        log::debug!("{:?} for {}", strategy, t);
                        match strategy {
                            Strategy::Guess => ex.generate_guess(env, t, depth, &mut *k),
                            Strategy::Match => ex.generate_match(env, t, depth, &mut *k),
                            Strategy::Conditional => ex.generate_if(env, t, depth, &mut *k),
                        }
                    },
                )
            }
        }
    }

    /// Guesses an elimination term of the right shape and checks it against
    /// `t`. The accepted term is annotated with `t`.
    pub fn generate_guess(
        &mut self,
        env: &Environment,
        t: &RType,
        depth: Depth,
        k: &mut Next<'_, 'a>,
    ) -> Explored<RProgram> {
        self.generate_e(env, &t.shape(), depth.app, &mut |ex, env, program| {
            ex.add_constraint(Constraint::Subtype(env, program.ty.clone(), t.clone()));
            ex.solve_incrementally(&program)?;
            k(ex, Program::new(program.content, t.clone()))
        })
    }

    pub fn generate_match(
        &mut self,
        env: &Environment,
        t: &RType,
        depth: Depth,
        k: &mut Next<'_, 'a>,
    ) -> Explored<RProgram> {
        if depth.matches == 0 {
            return Err(SynthError::depth_exhausted(DepthKind::Match));
        }

        let datatypes = env.datatypes.clone();
        let case_depth = Depth {
            matches: depth.matches - 1,
            ..depth
        };
        self.choose(
            datatypes,
            SynthError::no_symbols(t.shape()),
            |ex, (dt, def)| {
                log::debug!("match on {}", dt);
                let args = def
                    .type_params
                    .iter()
                    .map(|_| SType::type_var(ex.names.fresh(TYPE_VAR_PREFIX)))
                    .collect();
                let scr_shape = TypeSkeleton::Scalar(BaseType::Data(dt.clone()), args, ());
                let scr_depth = ex.params.scrutinee_depth;

                ex.generate_e(env, &scr_shape, scr_depth, &mut |ex, env, scr| {
                    let mut scr_t = scr.ty.clone();
                    scr_t.apply_subst(&ex.state.type_assignment);
                    if scr_t.type_vars().iter().any(|a| !env.is_bound(a)) {
                        return Err(SynthError::escaping_type_vars(scr_t));
                    }

                    let (case_env, x) = ex.to_symbol(&scr, env);
                    let scr = Program::new(scr.content, scr_t);
                    ex.generate_cases(
                        &case_env,
                        &x,
                        &scr,
                        &def.constructors,
                        t,
                        case_depth,
                        vec![],
                        &mut |ex, cases| k(ex, Program::matches(scr.clone(), cases, t.clone())),
                    )
                })
            },
        )
    }

    /// Names the value of `scr`: a bare non-constant symbol names itself,
    /// anything else is bound to a fresh ghost.
    fn to_symbol(&mut self, scr: &RProgram, env: Environment) -> (Environment, Id) {
        match &scr.content {
            BareProgram::Symbol(name) if !env.is_constant(name) => (env, name.clone()),
            _ => {
                let g = self.names.fresh(GHOST_PREFIX);
                let mut env = env;
                env.add_ghost(g.clone(), scr.ty.clone());
                (env, g)
            }
        }
    }

    /// Generates one case per constructor, in declaration order.
    #[allow(clippy::too_many_arguments)]
    fn generate_cases(
        &mut self,
        env: &Environment,
        x: &str,
        scr: &RProgram,
        ctors: &[Id],
        t: &RType,
        depth: Depth,
        done: Vec<Case>,
        k: &mut NextCases<'_, 'a>,
    ) -> Explored<RProgram> {
        match ctors.split_first() {
            None => k(self, done),
            Some((ctor, rest)) => self.generate_case(env, x, scr, ctor, t, depth, &mut |ex, case| {
                let mut done = done.clone();
                done.push(case);
                ex.generate_cases(env, x, scr, rest, t, depth, done, &mut *k)
            }),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn generate_case(
        &mut self,
        env: &Environment,
        x: &str,
        scr: &RProgram,
        ctor: &str,
        t: &RType,
        depth: Depth,
        k: &mut NextCase<'_, 'a>,
    ) -> Explored<RProgram> {
        let cons_sch = env
            .lookup_symbol(ctor)
            .ok_or_else(|| SynthError::missing_constructor(ctor).with_context(format!("{:?}", env)))?;
        let cons_t = instantiate(&mut self.names, cons_sch);
        self.match_cons_type(ctor, cons_t.last_type(), &scr.ty)?;
        let mut cons_t = cons_t;
        cons_t.apply_subst(&self.state.type_assignment);

        let binders = (0..cons_t.arity())
            .map(|_| self.names.fresh(CASE_ARG_PREFIX))
            .collect::<Vec<_>>();
        let mut case_env = env.clone();
        for (name, arg_t) in case_symbols(&binders, &cons_t) {
            case_env.add_variable(name, arg_t);
        }
        // only the scrutinee's own refinement is assumed, so unreachable
        // cases still have to be filled in
        case_env.add_assumption(scrutinee_fact(x, &scr.ty));

        log::debug!("case {} {:?}", ctor, binders);
        self.generate_i(&case_env, t, depth, &mut |ex, body| {
            let case = Case {
                constructor: ctor.to_string(),
                args: binders.clone(),
                body,
            };
            k(ex, case)
        })
    }

    /// Binds the constructor's type parameters to the scrutinee's type
    /// arguments.
    fn match_cons_type(&mut self, ctor: &str, cons_res: &RType, scr_t: &RType) -> Explored<()> {
        match (cons_res, scr_t) {
            (
                TypeSkeleton::Scalar(BaseType::Data(d), vars, _),
                TypeSkeleton::Scalar(BaseType::Data(d_scr), args, _),
            ) if d == d_scr && vars.len() == args.len() => {
                for (var, arg) in vars.iter().zip(args) {
                    match var {
                        TypeSkeleton::Scalar(BaseType::TypeVar(a), inner, _) if inner.is_empty() => {
                            self.state.type_assignment.insert(a.clone(), arg.clone());
                        }
                        _ => {
                            return Err(SynthError::missing_constructor(ctor)
                                .with_context(format!("`{}` is not generic in its datatype", cons_res)))
                        }
                    }
                }
                Ok(())
            }
            _ => Err(SynthError::missing_constructor(ctor)
                .with_context(format!("`{}` does not construct `{}`", cons_res, scr_t))),
        }
    }

    pub fn generate_if(
        &mut self,
        env: &Environment,
        t: &RType,
        depth: Depth,
        k: &mut Next<'_, 'a>,
    ) -> Explored<RProgram> {
        if depth.conds == 0 {
            return Err(SynthError::depth_exhausted(DepthKind::Conditional));
        }

        let guard = Formula::unknown(self.names.fresh(COND_PREFIX));
        self.add_constraint(Constraint::WellFormedCond(env.clone(), guard.clone()));
        let branch_depth = Depth {
            conds: depth.conds - 1,
            ..depth
        };

        let mut then_env = env.clone();
        then_env.add_assumption(guard.clone());
        self.generate_i(&then_env, t, branch_depth, &mut |ex, then| {
            let mut else_env = env.clone();
            else_env.add_neg_assumption(guard.clone());
            ex.generate_i(&else_env, t, branch_depth, &mut |ex, els| {
                k(ex, Program::ite(guard.clone(), then.clone(), els, t.clone()))
            })
        })
    }
}

/// Binds constructor arguments to `binders`, renaming dependent
/// occurrences in later argument types.
fn case_symbols(binders: &[Id], cons_t: &RType) -> Vec<(Id, RType)> {
    let mut syms = vec![];
    let mut t = cons_t.clone();
    for name in binders {
        match t {
            TypeSkeleton::Function(y, arg, res) => {
                t = res.rename_var(&y, name, &arg);
                syms.push((name.clone(), *arg));
            }
            TypeSkeleton::Scalar(_, _, _) => break,
        }
    }
    syms
}

/// The refinement of `scr_t` stated about `x`.
fn scrutinee_fact(x: &str, scr_t: &RType) -> Formula {
    match scr_t {
        TypeSkeleton::Scalar(base, _, fml) => {
            fml.substitute_var(VALUE_VAR, Formula::var(base.to_sort(), x))
        }
        TypeSkeleton::Function(_, _, _) => Formula::ftrue(),
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        config::ExplorerParams,
        env::{DatatypeDef, Environment},
        error::{DepthKind, SynthErrorKind},
        logic::{Formula, Sort},
        mocks::MockSolver,
        program::BareProgram,
        solver::QualifierGenerators,
        ty::{RSchema, RType},
    };

    use super::{case_symbols, scrutinee_fact, Depth, Explorer};

    fn nat() -> RType {
        RType::int(Formula::value_var(Sort::Int).at_least(Formula::int(0)))
    }

    fn zero() -> RSchema {
        RSchema::Mono(RType::int(Formula::value_var(Sort::Int).equals(Formula::int(0))))
    }

    fn depth(app: usize, matches: usize, conds: usize) -> Depth {
        Depth { app, matches, conds }
    }

    /// `data Opt = None | Some Int` with `o : Opt` in scope.
    fn opt_env() -> Environment {
        let mut env = Environment::new();
        env.add_datatype(
            "Opt",
            DatatypeDef::new(vec![], vec!["None".to_string(), "Some".to_string()]),
        );
        let opt = || RType::data("Opt", vec![], Formula::ftrue());
        env.add_constant("None", RSchema::Mono(opt()));
        env.add_constant("Some", RSchema::Mono(RType::function("n", nat(), opt())));
        env.add_variable("o", opt());
        env
    }

    /// `data Box = Box Int` with `b : Box` in scope.
    fn box_env() -> Environment {
        let mut env = Environment::new();
        env.add_datatype("Box", DatatypeDef::new(vec![], vec!["Box".to_string()]));
        let boxed = || RType::data("Box", vec![], Formula::ftrue());
        env.add_constant("Box", RSchema::Mono(RType::function("n", nat(), boxed())));
        env.add_variable("b", boxed());
        env
    }

    #[test]
    fn match_depth_zero_never_matches() {
        let quals = QualifierGenerators::empty();
        let mut solver = MockSolver::accepting();
        let mut ex = Explorer::new(ExplorerParams::default(), &quals, &mut solver);
        let err = ex
            .generate_match(&box_env(), &nat(), depth(1, 0, 0), &mut |_, p| Ok(p))
            .unwrap_err();
        assert_eq!(err.kind, SynthErrorKind::DepthExhausted(DepthKind::Match));

        // the only Int in reach is under the constructor
        let err = ex
            .generate_i(&box_env(), &nat(), depth(0, 0, 0), &mut |_, p| Ok(p))
            .unwrap_err();
        assert!(!err.is_fatal());
    }

    #[test]
    fn cond_depth_zero_never_branches() {
        let quals = QualifierGenerators::empty();
        let mut solver = MockSolver::accepting();
        let mut ex = Explorer::new(ExplorerParams::default(), &quals, &mut solver);
        let err = ex
            .generate_if(&opt_env(), &nat(), depth(1, 1, 0), &mut |_, p| Ok(p))
            .unwrap_err();
        assert_eq!(err.kind, SynthErrorKind::DepthExhausted(DepthKind::Conditional));
    }

    #[test]
    fn match_binds_constructor_arguments() {
        let quals = QualifierGenerators::empty();
        let mut solver = MockSolver::accepting();
        let mut ex = Explorer::new(ExplorerParams::default(), &quals, &mut solver);

        let program = ex
            .generate_i(&box_env(), &nat(), depth(0, 1, 0), &mut |_, p| Ok(p))
            .unwrap();
        match &program.content {
            BareProgram::Match(scr, cases) => {
                assert_eq!(scr.to_string(), "b");
                assert_eq!(cases.len(), 1);
                assert_eq!(cases[0].constructor, "Box");
                assert_eq!(cases[0].args.len(), 1);
                assert!(cases[0].args[0].starts_with("_z"));
                assert_eq!(cases[0].body.to_string(), cases[0].args[0]);
            }
            _ => panic!("expected a match, got {}", program),
        }
        assert_eq!(program.ty, nat());
    }

    #[test]
    fn every_case_must_be_filled() {
        let quals = QualifierGenerators::empty();
        let mut solver = MockSolver::accepting();
        let mut ex = Explorer::new(ExplorerParams::default(), &quals, &mut solver);

        // `None` binds nothing of type Int
        let err = ex
            .generate_match(&opt_env(), &nat(), depth(0, 1, 0), &mut |_, p| Ok(p))
            .unwrap_err();
        assert!(!err.is_fatal());

        let mut env = opt_env();
        env.add_constant("zero", zero());
        let program = ex
            .generate_match(&env, &nat(), depth(0, 1, 0), &mut |_, p| Ok(p))
            .unwrap();
        match &program.content {
            BareProgram::Match(_, cases) => {
                let ctors = cases.iter().map(|c| c.constructor.as_str()).collect::<Vec<_>>();
                assert_eq!(ctors, vec!["None", "Some"]);
                assert_eq!(cases[0].body.to_string(), "zero");
            }
            _ => panic!("expected a match, got {}", program),
        }
    }

    #[test]
    fn missing_constructor_is_fatal() {
        let quals = QualifierGenerators::empty();
        let mut solver = MockSolver::accepting();
        let mut env = Environment::new();
        env.add_datatype("Box", DatatypeDef::new(vec![], vec!["Box".to_string()]));
        env.add_variable("b", RType::data("Box", vec![], Formula::ftrue()));
        let mut ex = Explorer::new(ExplorerParams::default(), &quals, &mut solver);

        let err = ex
            .generate_match(&env, &nat(), depth(0, 1, 0), &mut |_, p| Ok(p))
            .unwrap_err();
        assert!(matches!(err.kind, SynthErrorKind::MissingConstructor(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn conditional_assumes_the_guard_in_each_branch() {
        let quals = QualifierGenerators::empty();
        let mut solver = MockSolver::accepting();
        let mut env = Environment::new();
        env.add_constant("zero", zero());
        let mut ex = Explorer::new(ExplorerParams::default(), &quals, &mut solver);

        let program = ex
            .generate_if(&env, &nat(), depth(0, 0, 1), &mut |_, p| Ok(p))
            .unwrap();
        assert!(program.is_conditional());
        assert_eq!(program.to_string(), "if _c0 then zero else zero");
        assert!(ex.state.qualifier_map.contains_key("_c0"));
    }

    #[test]
    fn case_symbols_rename_dependent_arguments() {
        let list = Sort::Data("List".to_string());
        let len = |f: Formula| Formula::measure(Sort::Int, "len", f);
        let cons = RType::function(
            "t",
            RType::data("List", vec![], Formula::ftrue()),
            RType::function(
                "u",
                RType::data(
                    "List",
                    vec![],
                    len(Formula::value_var(list.clone())).equals(len(Formula::var(list.clone(), "t"))),
                ),
                RType::data("List", vec![], Formula::ftrue()),
            ),
        );
        let binders = vec!["_z0".to_string(), "_z1".to_string()];
        let syms = case_symbols(&binders, &cons);
        assert_eq!(syms.len(), 2);
        assert_eq!(
            syms[1].1.refinement(),
            Some(&len(Formula::value_var(list.clone())).equals(len(Formula::var(list, "_z0"))))
        );
    }

    #[test]
    fn scrutinee_fact_is_about_the_name() {
        let fact = scrutinee_fact("_g3", &nat());
        assert_eq!(fact, Formula::int_var("_g3").at_least(Formula::int(0)));
    }
}
