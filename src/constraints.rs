use std::fmt;

use crate::{
    env::Environment,
    logic::Formula,
    subst::{Substitutable, TypeSubstitution},
    ty::RType,
};

/// A typing obligation produced by the search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Constraint {
    /// The first type is usable wherever the second is expected.
    Subtype(Environment, RType, RType),
    /// Every unknown inside the type needs a qualifier space.
    WellFormed(Environment, RType),
    /// A standalone guard unknown needs a qualifier space.
    WellFormedCond(Environment, Formula),
}

impl Constraint {
    pub fn env(&self) -> &Environment {
        match self {
            Constraint::Subtype(env, _, _)
            | Constraint::WellFormed(env, _)
            | Constraint::WellFormedCond(env, _) => env,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Subtype(_, lhs, rhs) => write!(f, "{} <: {}", lhs, rhs),
            Constraint::WellFormed(_, t) => write!(f, "|- {}", t),
            Constraint::WellFormedCond(_, fml) => write!(f, "|- {}", fml),
        }
    }
}

impl Substitutable for Constraint {
    fn apply_subst(&mut self, subst: &TypeSubstitution) {
        match self {
            Constraint::Subtype(_, lhs, rhs) => {
                lhs.apply_subst(subst);
                rhs.apply_subst(subst);
            }
            Constraint::WellFormed(_, t) => t.apply_subst(subst),
            Constraint::WellFormedCond(_, fml) => fml.apply_subst(subst),
        }
    }
}
