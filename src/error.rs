use std::fmt;

use colored::*;

use crate::{
    constraints::Constraint,
    logic::Id,
    ty::{RType, SType},
};

pub type Explored<T> = Result<T, SynthError>;

/// Which depth budget ran out.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DepthKind {
    Application,
    Match,
    Conditional,
}

impl fmt::Display for DepthKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                DepthKind::Application => "application",
                DepthKind::Match => "match",
                DepthKind::Conditional => "conditional",
            }
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SynthErrorKind {
    ShapeMismatch(Constraint),
    OccursCheck(Id, RType),
    DepthExhausted(DepthKind),
    NoSymbols(SType),
    Unsatisfiable,
    EscapingTypeVars(RType),
    NoSolution(Id),
    MissingConstructor(Id),
    NonSimpleConstraint(Constraint),
    Solver(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SynthError {
    pub kind: SynthErrorKind,
    pub context: Option<String>,
}

impl SynthError {
    fn from_kind(kind: SynthErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    pub fn shape_mismatch(c: Constraint) -> Self {
        Self::from_kind(SynthErrorKind::ShapeMismatch(c))
    }

    pub fn occurs_check<S: Into<Id>>(var: S, ty: RType) -> Self {
        Self::from_kind(SynthErrorKind::OccursCheck(var.into(), ty))
    }

    pub fn depth_exhausted(kind: DepthKind) -> Self {
        Self::from_kind(SynthErrorKind::DepthExhausted(kind))
    }

    pub fn no_symbols(shape: SType) -> Self {
        Self::from_kind(SynthErrorKind::NoSymbols(shape))
    }

    pub fn unsatisfiable() -> Self {
        Self::from_kind(SynthErrorKind::Unsatisfiable)
    }

    pub fn escaping_type_vars(ty: RType) -> Self {
        Self::from_kind(SynthErrorKind::EscapingTypeVars(ty))
    }

    pub fn no_solution<S: Into<Id>>(goal: S) -> Self {
        Self::from_kind(SynthErrorKind::NoSolution(goal.into()))
    }

    pub fn missing_constructor<S: Into<Id>>(name: S) -> Self {
        Self::from_kind(SynthErrorKind::MissingConstructor(name.into()))
    }

    pub fn non_simple_constraint(c: Constraint) -> Self {
        let context = format!("{:?}", c.env());
        Self::from_kind(SynthErrorKind::NonSimpleConstraint(c)).with_context(context)
    }

    pub fn solver<S: Into<String>>(msg: S) -> Self {
        Self::from_kind(SynthErrorKind::Solver(msg.into()))
    }

    pub fn with_context<S: Into<String>>(mut self, context: S) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Fatal errors are bugs in a collaborator and abort the whole search;
    /// everything else only abandons the current branch.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            SynthErrorKind::MissingConstructor(_)
                | SynthErrorKind::NonSimpleConstraint(_)
                | SynthErrorKind::Solver(_)
        )
    }

    pub fn message_str(&self) -> String {
        match &self.kind {
            SynthErrorKind::ShapeMismatch(c) => format!("shape mismatch in constraint `{}`", c),
            SynthErrorKind::OccursCheck(a, t) => {
                format!("type variable `{}` occurs in `{}`", a, t)
            }
            SynthErrorKind::DepthExhausted(kind) => format!("{} depth exhausted", kind),
            SynthErrorKind::NoSymbols(s) => format!("no symbols of shape `{}`", s),
            SynthErrorKind::Unsatisfiable => "no liquid assignment satisfies the constraints".to_string(),
            SynthErrorKind::EscapingTypeVars(t) => {
                format!("type `{}` mentions unbound type variables", t)
            }
            SynthErrorKind::NoSolution(goal) => {
                format!("no program for `{}` found within bounds", goal)
            }
            SynthErrorKind::MissingConstructor(name) => {
                format!("constructor `{}` is not in scope", name)
            }
            SynthErrorKind::NonSimpleConstraint(c) => {
                format!("constraint `{}` is not simple", c)
            }
            SynthErrorKind::Solver(msg) => format!("solver failure: {}", msg),
        }
    }

    fn label(&self) -> &'static str {
        if self.is_fatal() {
            "internal error"
        } else if matches!(self.kind, SynthErrorKind::NoSolution(_)) {
            "synthesis error"
        } else {
            "branch failure"
        }
    }

    pub fn emit(&self) {
        let label = format!("{}:", self.label());
        eprintln!("{} {}", label.bold().red(), self.message_str().bold());
        if let Some(context) = &self.context {
            let arrow = "-->".bold();
            eprintln!("{} {}", arrow, context);
        }
    }
}

impl fmt::Display for SynthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message_str())?;
        if let Some(context) = &self.context {
            write!(f, " ({})", context)?;
        }
        Ok(())
    }
}

impl std::error::Error for SynthError {}

#[cfg(test)]
mod tests {
    use crate::{
        constraints::Constraint,
        env::Environment,
        logic::Formula,
        ty::RType,
    };

    use super::{DepthKind, SynthError};

    #[test]
    fn classification() {
        assert!(!SynthError::depth_exhausted(DepthKind::Match).is_fatal());
        assert!(!SynthError::unsatisfiable().is_fatal());
        assert!(!SynthError::no_solution("f").is_fatal());
        assert!(SynthError::missing_constructor("Cons").is_fatal());
        let c = Constraint::WellFormed(Environment::new(), RType::int(Formula::ftrue()));
        let err = SynthError::non_simple_constraint(c);
        assert!(err.is_fatal());
        assert!(err.context.is_some());
    }

    #[test]
    fn messages() {
        assert_eq!(
            SynthError::no_solution("inc").to_string(),
            "no program for `inc` found within bounds"
        );
        assert_eq!(
            SynthError::depth_exhausted(DepthKind::Conditional).message_str(),
            "conditional depth exhausted"
        );
    }
}
