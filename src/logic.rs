//! Refinement logic: sorts, formulas and the substitutions over them.
//!
//! Formulas are immutable values. Every transformation (substitution,
//! solution application, sort instantiation) builds a new formula.
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use itertools::Itertools;

use crate::candidate::Solution;

pub type Id = String;

/// Name of the implicit value variable of a refinement.
pub const VALUE_VAR: &str = "_v";

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Sort {
    Bool,
    Int,
    Var(Id),
    Data(Id),
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Bool => write!(f, "Bool"),
            Sort::Int => write!(f, "Int"),
            Sort::Var(a) => write!(f, "{}", a),
            Sort::Data(d) => write!(f, "{}", d),
        }
    }
}

/// Mapping from sort variables to the sorts they stand for.
pub type SortSubstitution = BTreeMap<Id, Sort>;

impl Sort {
    pub fn apply_sort_subst(&self, subst: &SortSubstitution) -> Sort {
        match self {
            Sort::Var(a) => match subst.get(a) {
                Some(s) => s.apply_sort_subst(subst),
                None => self.clone(),
            },
            _ => self.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BinOp {
    Times,
    Plus,
    Minus,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Implies,
    Iff,
}

impl BinOp {
    fn symbol(&self) -> &'static str {
        match self {
            BinOp::Times => "*",
            BinOp::Plus => "+",
            BinOp::Minus => "-",
            BinOp::Eq => "==",
            BinOp::Neq => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::Implies => "==>",
            BinOp::Iff => "<==>",
        }
    }

    fn is_arithmetic(&self) -> bool {
        matches!(self, BinOp::Times | BinOp::Plus | BinOp::Minus)
    }
}

/// Pending renaming of variables, mapping a variable name to its replacement.
pub type Substitution = BTreeMap<Id, Formula>;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Formula {
    BoolLit(bool),
    IntLit(i64),
    Var(Sort, Id),
    /// Second-order placeholder for a predicate that is not known yet. The
    /// name is the handle into the qualifier map; the substitution is the
    /// renaming to apply to whatever valuation the handle receives.
    Unknown(Substitution, Id),
    Unary(UnOp, Box<Formula>),
    Binary(BinOp, Box<Formula>, Box<Formula>),
    Ite(Box<Formula>, Box<Formula>, Box<Formula>),
    /// Application of a measure (e.g. a well-founded metric) to a term.
    Measure(Sort, Id, Box<Formula>),
}

impl Default for Formula {
    fn default() -> Self {
        Formula::BoolLit(true)
    }
}

impl Formula {
    pub fn ftrue() -> Formula {
        Formula::BoolLit(true)
    }

    pub fn ffalse() -> Formula {
        Formula::BoolLit(false)
    }

    pub fn int(n: i64) -> Formula {
        Formula::IntLit(n)
    }

    pub fn var<S: Into<Id>>(sort: Sort, name: S) -> Formula {
        Formula::Var(sort, name.into())
    }

    pub fn int_var<S: Into<Id>>(name: S) -> Formula {
        Formula::Var(Sort::Int, name.into())
    }

    pub fn bool_var<S: Into<Id>>(name: S) -> Formula {
        Formula::Var(Sort::Bool, name.into())
    }

    pub fn value_var(sort: Sort) -> Formula {
        Formula::Var(sort, VALUE_VAR.to_string())
    }

    pub fn unknown<S: Into<Id>>(name: S) -> Formula {
        Formula::Unknown(Substitution::new(), name.into())
    }

    pub fn measure<S: Into<Id>>(sort: Sort, name: S, arg: Formula) -> Formula {
        Formula::Measure(sort, name.into(), Box::new(arg))
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Formula::BoolLit(true))
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Formula::BoolLit(false))
    }

    pub fn not(self) -> Formula {
        match self {
            Formula::BoolLit(b) => Formula::BoolLit(!b),
            Formula::Unary(UnOp::Not, inner) => *inner,
            fml => Formula::Unary(UnOp::Not, Box::new(fml)),
        }
    }

    pub fn neg(self) -> Formula {
        match self {
            Formula::IntLit(n) => match n.checked_neg() {
                Some(m) => Formula::IntLit(m),
                None => Formula::Unary(UnOp::Neg, Box::new(Formula::IntLit(n))),
            },
            fml => Formula::Unary(UnOp::Neg, Box::new(fml)),
        }
    }

    pub fn and(self, other: Formula) -> Formula {
        if self.is_true() || other.is_false() {
            other
        } else if other.is_true() || self.is_false() {
            self
        } else {
            Formula::binary(BinOp::And, self, other)
        }
    }

    pub fn or(self, other: Formula) -> Formula {
        if self.is_false() || other.is_true() {
            other
        } else if other.is_false() || self.is_true() {
            self
        } else {
            Formula::binary(BinOp::Or, self, other)
        }
    }

    pub fn implies(self, other: Formula) -> Formula {
        if self.is_true() {
            other
        } else if self.is_false() || other.is_true() {
            Formula::ftrue()
        } else {
            Formula::binary(BinOp::Implies, self, other)
        }
    }

    pub fn iff(self, other: Formula) -> Formula {
        Formula::binary(BinOp::Iff, self, other)
    }

    pub fn equals(self, other: Formula) -> Formula {
        Formula::binary(BinOp::Eq, self, other)
    }

    pub fn not_equals(self, other: Formula) -> Formula {
        Formula::binary(BinOp::Neq, self, other)
    }

    pub fn less_than(self, other: Formula) -> Formula {
        Formula::binary(BinOp::Lt, self, other)
    }

    pub fn at_most(self, other: Formula) -> Formula {
        Formula::binary(BinOp::Le, self, other)
    }

    pub fn greater_than(self, other: Formula) -> Formula {
        Formula::binary(BinOp::Gt, self, other)
    }

    pub fn at_least(self, other: Formula) -> Formula {
        Formula::binary(BinOp::Ge, self, other)
    }

    pub fn plus(self, other: Formula) -> Formula {
        Formula::binary(BinOp::Plus, self, other)
    }

    pub fn minus(self, other: Formula) -> Formula {
        Formula::binary(BinOp::Minus, self, other)
    }

    pub fn times(self, other: Formula) -> Formula {
        Formula::binary(BinOp::Times, self, other)
    }

    pub fn ite(cond: Formula, then: Formula, els: Formula) -> Formula {
        Formula::Ite(Box::new(cond), Box::new(then), Box::new(els))
    }

    fn binary(op: BinOp, lhs: Formula, rhs: Formula) -> Formula {
        Formula::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    /// Conjunction of all `fmls`; `true` when empty.
    pub fn conjunction<I: IntoIterator<Item = Formula>>(fmls: I) -> Formula {
        fmls.into_iter().fold(Formula::ftrue(), Formula::and)
    }

    /// Disjunction of all `fmls`; `false` when empty.
    pub fn disjunction<I: IntoIterator<Item = Formula>>(fmls: I) -> Formula {
        fmls.into_iter().fold(Formula::ffalse(), Formula::or)
    }

    pub fn sort(&self) -> Sort {
        match self {
            Formula::BoolLit(_) | Formula::Unknown(_, _) => Sort::Bool,
            Formula::IntLit(_) => Sort::Int,
            Formula::Var(s, _) | Formula::Measure(s, _, _) => s.clone(),
            Formula::Unary(UnOp::Neg, _) => Sort::Int,
            Formula::Unary(UnOp::Not, _) => Sort::Bool,
            Formula::Binary(op, _, _) if op.is_arithmetic() => Sort::Int,
            Formula::Binary(_, _, _) => Sort::Bool,
            Formula::Ite(_, then, _) => then.sort(),
        }
    }

    /// Replaces free variables according to `subst`. Unknowns are not
    /// expanded; the renaming is recorded in their pending substitution.
    pub fn substitute(&self, subst: &Substitution) -> Formula {
        if subst.is_empty() {
            return self.clone();
        }

        match self {
            Formula::BoolLit(_) | Formula::IntLit(_) => self.clone(),
            Formula::Var(_, name) => match subst.get(name) {
                Some(fml) => fml.clone(),
                None => self.clone(),
            },
            Formula::Unknown(pending, name) => {
                Formula::Unknown(compose_substitutions(pending, subst), name.clone())
            }
            Formula::Unary(op, inner) => Formula::Unary(*op, Box::new(inner.substitute(subst))),
            Formula::Binary(op, lhs, rhs) => Formula::Binary(
                *op,
                Box::new(lhs.substitute(subst)),
                Box::new(rhs.substitute(subst)),
            ),
            Formula::Ite(c, t, e) => Formula::Ite(
                Box::new(c.substitute(subst)),
                Box::new(t.substitute(subst)),
                Box::new(e.substitute(subst)),
            ),
            Formula::Measure(sort, name, arg) => {
                Formula::Measure(sort.clone(), name.clone(), Box::new(arg.substitute(subst)))
            }
        }
    }

    /// Shorthand for substituting a single variable.
    pub fn substitute_var(&self, name: &str, replacement: Formula) -> Formula {
        let mut subst = Substitution::new();
        subst.insert(name.to_string(), replacement);
        self.substitute(&subst)
    }

    /// Instantiates sort variables, e.g. after a type variable was assigned.
    pub fn apply_sort_subst(&self, subst: &SortSubstitution) -> Formula {
        if subst.is_empty() {
            return self.clone();
        }

        match self {
            Formula::BoolLit(_) | Formula::IntLit(_) => self.clone(),
            Formula::Var(sort, name) => Formula::Var(sort.apply_sort_subst(subst), name.clone()),
            Formula::Unknown(pending, name) => Formula::Unknown(
                pending
                    .iter()
                    .map(|(x, fml)| (x.clone(), fml.apply_sort_subst(subst)))
                    .collect(),
                name.clone(),
            ),
            Formula::Unary(op, inner) => {
                Formula::Unary(*op, Box::new(inner.apply_sort_subst(subst)))
            }
            Formula::Binary(op, lhs, rhs) => Formula::Binary(
                *op,
                Box::new(lhs.apply_sort_subst(subst)),
                Box::new(rhs.apply_sort_subst(subst)),
            ),
            Formula::Ite(c, t, e) => Formula::Ite(
                Box::new(c.apply_sort_subst(subst)),
                Box::new(t.apply_sort_subst(subst)),
                Box::new(e.apply_sort_subst(subst)),
            ),
            Formula::Measure(sort, name, arg) => Formula::Measure(
                sort.apply_sort_subst(subst),
                name.clone(),
                Box::new(arg.apply_sort_subst(subst)),
            ),
        }
    }

    pub fn free_vars(&self) -> BTreeSet<Id> {
        let mut out = BTreeSet::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars(&self, out: &mut BTreeSet<Id>) {
        match self {
            Formula::BoolLit(_) | Formula::IntLit(_) => {}
            Formula::Var(_, name) => {
                out.insert(name.clone());
            }
            Formula::Unknown(pending, _) => {
                for fml in pending.values() {
                    fml.collect_vars(out);
                }
            }
            Formula::Unary(_, inner) | Formula::Measure(_, _, inner) => inner.collect_vars(out),
            Formula::Binary(_, lhs, rhs) => {
                lhs.collect_vars(out);
                rhs.collect_vars(out);
            }
            Formula::Ite(c, t, e) => {
                c.collect_vars(out);
                t.collect_vars(out);
                e.collect_vars(out);
            }
        }
    }

    /// Names of all unknowns occurring in this formula.
    pub fn unknowns(&self) -> BTreeSet<Id> {
        let mut out = BTreeSet::new();
        self.collect_unknowns(&mut out);
        out
    }

    fn collect_unknowns(&self, out: &mut BTreeSet<Id>) {
        match self {
            Formula::BoolLit(_) | Formula::IntLit(_) | Formula::Var(_, _) => {}
            Formula::Unknown(_, name) => {
                out.insert(name.clone());
            }
            Formula::Unary(_, inner) | Formula::Measure(_, _, inner) => {
                inner.collect_unknowns(out)
            }
            Formula::Binary(_, lhs, rhs) => {
                lhs.collect_unknowns(out);
                rhs.collect_unknowns(out);
            }
            Formula::Ite(c, t, e) => {
                c.collect_unknowns(out);
                t.collect_unknowns(out);
                e.collect_unknowns(out);
            }
        }
    }

    pub fn has_unknowns(&self) -> bool {
        match self {
            Formula::BoolLit(_) | Formula::IntLit(_) | Formula::Var(_, _) => false,
            Formula::Unknown(_, _) => true,
            Formula::Unary(_, inner) | Formula::Measure(_, _, inner) => inner.has_unknowns(),
            Formula::Binary(_, lhs, rhs) => lhs.has_unknowns() || rhs.has_unknowns(),
            Formula::Ite(c, t, e) => c.has_unknowns() || t.has_unknowns() || e.has_unknowns(),
        }
    }

    /// Replaces every unknown by the conjunction of its valuation in `sol`
    /// (renamed by the unknown's pending substitution). Unknowns missing
    /// from `sol` are left in place.
    pub fn apply_solution(&self, sol: &Solution) -> Formula {
        match self {
            Formula::BoolLit(_) | Formula::IntLit(_) | Formula::Var(_, _) => self.clone(),
            Formula::Unknown(pending, name) => match sol.get(name) {
                Some(quals) => Formula::conjunction(quals.iter().cloned()).substitute(pending),
                None => self.clone(),
            },
            Formula::Unary(op, inner) => Formula::Unary(*op, Box::new(inner.apply_solution(sol))),
            Formula::Binary(op, lhs, rhs) => Formula::Binary(
                *op,
                Box::new(lhs.apply_solution(sol)),
                Box::new(rhs.apply_solution(sol)),
            ),
            Formula::Ite(c, t, e) => Formula::Ite(
                Box::new(c.apply_solution(sol)),
                Box::new(t.apply_solution(sol)),
                Box::new(e.apply_solution(sol)),
            ),
            Formula::Measure(sort, name, arg) => {
                Formula::Measure(sort.clone(), name.clone(), Box::new(arg.apply_solution(sol)))
            }
        }
    }
}

/// `old` followed by `new`: the result renames like applying `old` first
/// and then `new`.
pub fn compose_substitutions(old: &Substitution, new: &Substitution) -> Substitution {
    let mut composed: Substitution = old
        .iter()
        .map(|(x, fml)| (x.clone(), fml.substitute(new)))
        .collect();
    for (x, fml) in new {
        if !composed.contains_key(x) {
            composed.insert(x.clone(), fml.clone());
        }
    }
    composed
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::BoolLit(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Formula::IntLit(n) => write!(f, "{}", n),
            Formula::Var(_, name) => write!(f, "{}", name),
            Formula::Unknown(pending, name) => {
                if pending.is_empty() {
                    write!(f, "{}", name)
                } else {
                    let renaming = pending
                        .iter()
                        .map(|(x, fml)| format!("{} -> {}", x, fml))
                        .join(", ");
                    write!(f, "[{}]{}", renaming, name)
                }
            }
            Formula::Unary(UnOp::Neg, inner) => write!(f, "-{}", Atom(inner)),
            Formula::Unary(UnOp::Not, inner) => write!(f, "!{}", Atom(inner)),
            Formula::Binary(op, lhs, rhs) => {
                write!(f, "{} {} {}", Atom(lhs), op.symbol(), Atom(rhs))
            }
            Formula::Ite(c, t, e) => write!(f, "if {} then {} else {}", c, t, e),
            Formula::Measure(_, name, arg) => write!(f, "{} {}", name, Atom(arg)),
        }
    }
}

/// Parenthesizes compound operands.
struct Atom<'a>(&'a Formula);

impl fmt::Display for Atom<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Formula::Binary(_, _, _) | Formula::Ite(_, _, _) | Formula::Measure(_, _, _) => {
                write!(f, "({})", self.0)
            }
            fml => write!(f, "{}", fml),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crate::candidate::Solution;

    use super::{Formula, Sort, Substitution, VALUE_VAR};

    #[test]
    fn negation_of_the_smallest_literal_stays_symbolic() {
        assert_eq!(Formula::int(5).neg(), Formula::int(-5));
        match Formula::int(i64::MIN).neg() {
            Formula::Unary(super::UnOp::Neg, inner) => assert_eq!(*inner, Formula::int(i64::MIN)),
            fml => panic!("unexpected {}", fml),
        }
    }

    #[test]
    fn smart_constructors_fold_constants() {
        let x = Formula::int_var("x");
        assert_eq!(Formula::ftrue().and(x.clone().at_least(Formula::int(0))), x.clone().at_least(Formula::int(0)));
        assert!(Formula::ffalse().and(x.clone().at_least(Formula::int(0))).is_false());
        assert!(Formula::conjunction(vec![]).is_true());
        assert!(Formula::disjunction(vec![]).is_false());
        assert!(Formula::ffalse().implies(x.equals(Formula::int(3))).is_true());
    }

    #[test]
    fn substitution_is_recorded_on_unknowns() {
        let u = Formula::unknown("U0");
        let renamed = u.substitute_var("x", Formula::int_var("y"));
        let mut expected = Substitution::new();
        expected.insert("x".to_string(), Formula::int_var("y"));
        assert_eq!(renamed, Formula::Unknown(expected, "U0".to_string()));

        // a second renaming composes with the first
        let twice = renamed.substitute_var("y", Formula::int_var("z"));
        match twice {
            Formula::Unknown(pending, _) => {
                assert_eq!(pending.get("x"), Some(&Formula::int_var("z")));
                assert_eq!(pending.get("y"), Some(&Formula::int_var("z")));
            }
            other => panic!("expected an unknown, got {}", other),
        }
    }

    #[test]
    fn solution_application_renames_valuation() {
        let v = Formula::value_var(Sort::Int);
        let qual = v.clone().at_most(Formula::int_var("x"));
        let mut sol = Solution::new();
        sol.insert("U1".to_string(), vec![qual].into_iter().collect::<BTreeSet<_>>());

        let fml = Formula::unknown("U1").substitute_var("x", Formula::int_var("n"));
        assert_eq!(fml.apply_solution(&sol), v.at_most(Formula::int_var("n")));
        assert_eq!(Formula::unknown("U2").apply_solution(&sol), Formula::unknown("U2"));
    }

    #[test]
    fn display_parenthesizes_operands() {
        let fml = Formula::value_var(Sort::Int)
            .at_least(Formula::int(0))
            .and(Formula::value_var(Sort::Int).less_than(Formula::int_var("n")));
        assert_eq!(fml.to_string(), format!("({} >= 0) && ({} < n)", VALUE_VAR, VALUE_VAR));
    }
}
