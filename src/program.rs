//! Typed program terms produced by the search.
use std::fmt;

use itertools::Itertools;

use crate::{
    candidate::Solution,
    env::Environment,
    logic::{Formula, Id},
    subst::{Substitutable, TypeSubstitution},
    ty::{RSchema, RType},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BareProgram {
    Symbol(Id),
    App(Box<Program>, Box<Program>),
    Fun(Id, Box<Program>),
    /// Binds the listed recursive-call names around the body.
    Fix(Vec<Id>, Box<Program>),
    If(Formula, Box<Program>, Box<Program>),
    Match(Box<Program>, Vec<Case>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Case {
    pub constructor: Id,
    pub args: Vec<Id>,
    pub body: Program,
}

/// A term annotated with its inferred type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Program {
    pub content: BareProgram,
    pub ty: RType,
}

/// Refinement-typed program.
pub type RProgram = Program;

impl Program {
    pub fn new(content: BareProgram, ty: RType) -> Program {
        Program { content, ty }
    }

    pub fn symbol<S: Into<Id>>(name: S, ty: RType) -> Program {
        Program::new(BareProgram::Symbol(name.into()), ty)
    }

    pub fn app(fun: Program, arg: Program, ty: RType) -> Program {
        Program::new(BareProgram::App(Box::new(fun), Box::new(arg)), ty)
    }

    pub fn fun<S: Into<Id>>(x: S, body: Program, ty: RType) -> Program {
        Program::new(BareProgram::Fun(x.into(), Box::new(body)), ty)
    }

    pub fn fix(names: Vec<Id>, body: Program) -> Program {
        let ty = body.ty.clone();
        Program::new(BareProgram::Fix(names, Box::new(body)), ty)
    }

    pub fn ite(guard: Formula, then: Program, els: Program, ty: RType) -> Program {
        Program::new(BareProgram::If(guard, Box::new(then), Box::new(els)), ty)
    }

    pub fn matches(scrutinee: Program, cases: Vec<Case>, ty: RType) -> Program {
        Program::new(BareProgram::Match(Box::new(scrutinee), cases), ty)
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self.content, BareProgram::Symbol(_))
    }

    pub fn is_match(&self) -> bool {
        matches!(self.content, BareProgram::Match(_, _))
    }

    pub fn is_conditional(&self) -> bool {
        matches!(self.content, BareProgram::If(_, _, _))
    }

    pub fn is_application(&self) -> bool {
        matches!(self.content, BareProgram::App(_, _))
    }

    /// Number of nodes in the term.
    pub fn size(&self) -> usize {
        1 + match &self.content {
            BareProgram::Symbol(_) => 0,
            BareProgram::App(fun, arg) => fun.size() + arg.size(),
            BareProgram::Fun(_, body) | BareProgram::Fix(_, body) => body.size(),
            BareProgram::If(_, then, els) => then.size() + els.size(),
            BareProgram::Match(scr, cases) => {
                scr.size() + cases.iter().map(|c| c.body.size()).sum::<usize>()
            }
        }
    }

    /// Instantiates every node type and guard with the type substitution and
    /// then with a liquid solution. Assigned types carry unknowns of their
    /// own, so the substitution goes first.
    pub fn finalize(&self, sol: &Solution, tass: &TypeSubstitution) -> Program {
        let mut ty = self.ty.clone();
        ty.apply_subst(tass);
        let ty = ty.apply_solution(sol);

        let content = match &self.content {
            BareProgram::Symbol(name) => BareProgram::Symbol(name.clone()),
            BareProgram::App(fun, arg) => BareProgram::App(
                Box::new(fun.finalize(sol, tass)),
                Box::new(arg.finalize(sol, tass)),
            ),
            BareProgram::Fun(x, body) => {
                BareProgram::Fun(x.clone(), Box::new(body.finalize(sol, tass)))
            }
            BareProgram::Fix(names, body) => {
                BareProgram::Fix(names.clone(), Box::new(body.finalize(sol, tass)))
            }
            BareProgram::If(guard, then, els) => {
                let mut guard = guard.clone();
                guard.apply_subst(tass);
                let guard = guard.apply_solution(sol);
                BareProgram::If(
                    guard,
                    Box::new(then.finalize(sol, tass)),
                    Box::new(els.finalize(sol, tass)),
                )
            }
            BareProgram::Match(scr, cases) => BareProgram::Match(
                Box::new(scr.finalize(sol, tass)),
                cases
                    .iter()
                    .map(|c| Case {
                        constructor: c.constructor.clone(),
                        args: c.args.clone(),
                        body: c.body.finalize(sol, tass),
                    })
                    .collect(),
            ),
        };

        Program { content, ty }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.content {
            BareProgram::Symbol(name) => write!(f, "{}", name),
            BareProgram::App(fun, arg) => {
                if arg.is_symbol() {
                    write!(f, "{} {}", fun, arg)
                } else {
                    write!(f, "{} ({})", fun, arg)
                }
            }
            BareProgram::Fun(x, body) => write!(f, "\\{} . {}", x, body),
            BareProgram::Fix(names, body) => write!(f, "fix {} . {}", names.iter().join(" "), body),
            BareProgram::If(guard, then, els) => {
                write!(f, "if {} then {} else {}", guard, then, els)
            }
            BareProgram::Match(scr, cases) => {
                write!(f, "match {} with ", scr)?;
                let cases = cases
                    .iter()
                    .map(|c| {
                        if c.args.is_empty() {
                            format!("{} -> {}", c.constructor, c.body)
                        } else {
                            format!("{} {} -> {}", c.constructor, c.args.iter().join(" "), c.body)
                        }
                    })
                    .join(" | ");
                write!(f, "{}", cases)
            }
        }
    }
}

/// A synthesis problem: find a term of type `spec` in `environment`.
#[derive(Clone, Debug)]
pub struct Goal {
    pub name: Id,
    pub environment: Environment,
    pub spec: RSchema,
}

impl Goal {
    pub fn new<S: Into<Id>>(name: S, environment: Environment, spec: RSchema) -> Goal {
        Goal {
            name: name.into(),
            environment,
            spec,
        }
    }
}
