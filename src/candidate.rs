//! Liquid solutions: qualifier spaces, Horn clauses and candidate valuations.
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use itertools::Itertools;

use crate::logic::{Formula, Id};

/// The finite menu of predicates a valuation for one unknown is built from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QSpace {
    pub qualifiers: Vec<Formula>,
    /// Maximum number of qualifiers conjoined in a single valuation.
    pub max_count: usize,
}

impl QSpace {
    pub fn new(qualifiers: Vec<Formula>) -> QSpace {
        let max_count = qualifiers.len();
        QSpace {
            qualifiers,
            max_count,
        }
    }

    pub fn with_max_count(mut self, max_count: usize) -> QSpace {
        self.max_count = max_count;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.qualifiers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.qualifiers.len()
    }
}

impl fmt::Display for QSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{}> (max {})",
            self.qualifiers.iter().join(", "),
            self.max_count
        )
    }
}

/// Qualifier space of every unknown seen so far in a branch.
pub type QMap = im_rc::OrdMap<Id, QSpace>;

/// A conjunction of qualifiers, as a set.
pub type Valuation = BTreeSet<Formula>;

/// A valuation for each unknown.
pub type Solution = BTreeMap<Id, Valuation>;

/// `antecedent ==> consequent`
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HornClause {
    pub antecedent: Formula,
    pub consequent: Formula,
}

impl HornClause {
    pub fn new(antecedent: Formula, consequent: Formula) -> HornClause {
        HornClause {
            antecedent,
            consequent,
        }
    }

    pub fn unknowns(&self) -> BTreeSet<Id> {
        let mut out = self.antecedent.unknowns();
        out.extend(self.consequent.unknowns());
        out
    }

    pub fn to_formula(&self) -> Formula {
        self.antecedent.clone().implies(self.consequent.clone())
    }

    pub fn apply_solution(&self, sol: &Solution) -> HornClause {
        HornClause {
            antecedent: self.antecedent.apply_solution(sol),
            consequent: self.consequent.apply_solution(sol),
        }
    }
}

impl fmt::Display for HornClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ==> {}", self.antecedent, self.consequent)
    }
}

/// One complete guess at the liquid assignment, together with the clauses
/// it has been checked against so far.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Candidate {
    pub solution: Solution,
    pub valid_clauses: BTreeSet<HornClause>,
    pub invalid_clauses: BTreeSet<HornClause>,
    pub label: String,
}

impl Candidate {
    pub fn new(solution: Solution, label: impl Into<String>) -> Candidate {
        Candidate {
            solution,
            valid_clauses: BTreeSet::new(),
            invalid_clauses: BTreeSet::new(),
            label: label.into(),
        }
    }

    /// The candidate interpreting every unknown as `true`.
    pub fn top(label: impl Into<String>) -> Candidate {
        Candidate::new(Solution::new(), label)
    }

    pub fn valuation(&self, unknown: &str) -> Formula {
        match self.solution.get(unknown) {
            Some(quals) => Formula::conjunction(quals.iter().cloned()),
            None => Formula::ftrue(),
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {{", self.label)?;
        let entries = self
            .solution
            .iter()
            .map(|(u, quals)| format!("{} -> {}", u, Formula::conjunction(quals.iter().cloned())))
            .join(", ");
        write!(f, "{}}}", entries)
    }
}
