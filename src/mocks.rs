//! Solver doubles for tests.
use fnv::FnvHashMap;
use itertools::Itertools;

use crate::{
    candidate::{Candidate, HornClause, QMap, QSpace, Solution},
    error::Explored,
    logic::{BinOp, Formula, Sort, UnOp},
    program::RProgram,
    solver::ConstraintSolver,
};

/// Accepts (or rejects) every batch of clauses and records every call.
#[derive(Debug, Default)]
pub struct MockSolver {
    pub accept: bool,
    /// Clause batches passed to `refine`, in call order.
    pub refined: Vec<Vec<HornClause>>,
    /// Programs passed to `refine`, rendered.
    pub programs: Vec<String>,
    pub pruned: Vec<QSpace>,
}

impl MockSolver {
    pub fn accepting() -> MockSolver {
        MockSolver {
            accept: true,
            ..MockSolver::default()
        }
    }

    pub fn rejecting() -> MockSolver {
        MockSolver::default()
    }

    pub fn all_clauses(&self) -> Vec<&HornClause> {
        self.refined.iter().flatten().collect()
    }
}

impl ConstraintSolver for MockSolver {
    fn init(&mut self) -> Candidate {
        Candidate::top("init")
    }

    fn refine(
        &mut self,
        clauses: &[HornClause],
        _: &QMap,
        program: &RProgram,
        candidates: Vec<Candidate>,
    ) -> Explored<Vec<Candidate>> {
        self.refined.push(clauses.to_vec());
        self.programs.push(program.to_string());
        if !self.accept {
            return Ok(vec![]);
        }

        Ok(candidates
            .into_iter()
            .map(|mut cand| {
                cand.valid_clauses.extend(clauses.iter().cloned());
                cand
            })
            .collect())
    }

    fn prune_qualifiers(&mut self, quals: QSpace) -> Explored<QSpace> {
        self.pruned.push(quals.clone());
        Ok(quals)
    }
}

/// Checks clauses by evaluating them over every assignment of a small
/// integer domain to their free terms, and finds valuations by weakening:
/// a new unknown starts with all of its qualifiers, and qualifiers are
/// dropped while they make some clause invalid.
///
/// Datatype values and measure applications are modelled as opaque integers.
#[derive(Debug)]
pub struct BoundedSolver {
    pub bound: i64,
    /// Number of `refine` calls answered with no candidates.
    pub rejections: usize,
    pub calls: usize,
}

impl Default for BoundedSolver {
    fn default() -> Self {
        BoundedSolver::new(2)
    }
}

impl BoundedSolver {
    pub fn new(bound: i64) -> BoundedSolver {
        BoundedSolver {
            bound,
            rejections: 0,
            calls: 0,
        }
    }

    /// Whether `fml` holds for every assignment in the domain.
    pub fn is_valid(&self, fml: &Formula) -> bool {
        let mut atoms = vec![];
        collect_atoms(fml, &mut atoms);
        let atoms = atoms.into_iter().unique().collect::<Vec<_>>();

        let domains = atoms
            .iter()
            .map(|atom| match atom.sort() {
                Sort::Bool => vec![0, 1],
                _ => (-self.bound..=self.bound).collect::<Vec<_>>(),
            })
            .collect::<Vec<_>>();

        if atoms.is_empty() {
            return eval(fml, &FnvHashMap::default()) != 0;
        }

        domains
            .into_iter()
            .map(|domain| domain.into_iter())
            .multi_cartesian_product()
            .all(|values| {
                let asg = atoms
                    .iter()
                    .cloned()
                    .zip(values)
                    .collect::<FnvHashMap<_, _>>();
                eval(fml, &asg) != 0
            })
    }

    fn clause_holds(&self, clause: &HornClause, sol: &Solution) -> bool {
        self.is_valid(&clause.apply_solution(sol).to_formula())
    }

    /// Weakens `sol` until every clause holds, or gives up.
    fn weaken(&self, clauses: &[HornClause], sol: &mut Solution) -> bool {
        loop {
            let broken = clauses.iter().find(|c| !self.clause_holds(c, sol));
            let clause = match broken {
                Some(clause) => clause,
                None => return true,
            };

            let mut changed = false;
            for u in clause.consequent.unknowns() {
                let quals = sol.get(&u).cloned().unwrap_or_default();
                let keep = quals
                    .iter()
                    .filter(|q| {
                        let mut only_q = sol.clone();
                        only_q.insert(u.clone(), std::iter::once((*q).clone()).collect());
                        let narrowed = HornClause::new(
                            clause.antecedent.apply_solution(sol),
                            clause.consequent.apply_solution(&only_q),
                        );
                        self.is_valid(&narrowed.to_formula())
                    })
                    .cloned()
                    .collect::<std::collections::BTreeSet<_>>();
                if keep.len() != quals.len() {
                    changed = true;
                    sol.insert(u, keep);
                }
            }

            if !changed {
                log::trace!("cannot weaken for {}", clause);
                return false;
            }
        }
    }
}

impl ConstraintSolver for BoundedSolver {
    fn init(&mut self) -> Candidate {
        Candidate::top("0")
    }

    fn refine(
        &mut self,
        clauses: &[HornClause],
        qmap: &QMap,
        _: &RProgram,
        candidates: Vec<Candidate>,
    ) -> Explored<Vec<Candidate>> {
        self.calls += 1;
        let refined = candidates
            .into_iter()
            .filter_map(|mut cand| {
                for (u, space) in qmap.iter() {
                    if !cand.solution.contains_key(u) {
                        let strongest = space
                            .qualifiers
                            .iter()
                            .take(space.max_count)
                            .cloned()
                            .collect();
                        cand.solution.insert(u.clone(), strongest);
                    }
                }

                let all = cand
                    .valid_clauses
                    .iter()
                    .chain(clauses.iter())
                    .cloned()
                    .collect::<Vec<_>>();
                if self.weaken(&all, &mut cand.solution) {
                    cand.valid_clauses.extend(clauses.iter().cloned());
                    Some(cand)
                } else {
                    None
                }
            })
            .collect::<Vec<_>>();

        if refined.is_empty() {
            self.rejections += 1;
        }
        Ok(refined)
    }

    fn prune_qualifiers(&mut self, quals: QSpace) -> Explored<QSpace> {
        let max_count = quals.max_count;
        let qualifiers = quals
            .qualifiers
            .into_iter()
            .unique()
            .filter(|q| !q.is_true())
            .collect::<Vec<_>>();
        let max_count = max_count.min(qualifiers.len());
        Ok(QSpace::new(qualifiers).with_max_count(max_count))
    }
}

/// Terms whose value the enumeration chooses: variables and measures.
fn collect_atoms(fml: &Formula, out: &mut Vec<Formula>) {
    match fml {
        Formula::BoolLit(_) | Formula::IntLit(_) | Formula::Unknown(_, _) => {}
        Formula::Var(_, _) | Formula::Measure(_, _, _) => out.push(fml.clone()),
        Formula::Unary(_, inner) => collect_atoms(inner, out),
        Formula::Binary(_, lhs, rhs) => {
            collect_atoms(lhs, out);
            collect_atoms(rhs, out);
        }
        Formula::Ite(c, t, e) => {
            collect_atoms(c, out);
            collect_atoms(t, out);
            collect_atoms(e, out);
        }
    }
}

fn eval(fml: &Formula, asg: &FnvHashMap<Formula, i64>) -> i64 {
    let truth = |b: bool| if b { 1 } else { 0 };
    match fml {
        Formula::BoolLit(b) => truth(*b),
        Formula::IntLit(n) => *n,
        Formula::Var(_, _) | Formula::Measure(_, _, _) => asg.get(fml).copied().unwrap_or(0),
        // unvalued unknowns mean `true`
        Formula::Unknown(_, _) => 1,
        Formula::Unary(UnOp::Neg, inner) => -eval(inner, asg),
        Formula::Unary(UnOp::Not, inner) => truth(eval(inner, asg) == 0),
        Formula::Binary(op, lhs, rhs) => {
            let l = eval(lhs, asg);
            let r = eval(rhs, asg);
            match op {
                BinOp::Times => l.saturating_mul(r),
                BinOp::Plus => l.saturating_add(r),
                BinOp::Minus => l.saturating_sub(r),
                BinOp::Eq => truth(l == r),
                BinOp::Neq => truth(l != r),
                BinOp::Lt => truth(l < r),
                BinOp::Le => truth(l <= r),
                BinOp::Gt => truth(l > r),
                BinOp::Ge => truth(l >= r),
                BinOp::And => truth(l != 0 && r != 0),
                BinOp::Or => truth(l != 0 || r != 0),
                BinOp::Implies => truth(l == 0 || r != 0),
                BinOp::Iff => truth((l != 0) == (r != 0)),
            }
        }
        Formula::Ite(c, t, e) => {
            if eval(c, asg) != 0 {
                eval(t, asg)
            } else {
                eval(e, asg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crate::{
        candidate::{HornClause, QMap, QSpace},
        logic::{Formula, Sort},
        program::Program,
        solver::ConstraintSolver,
        ty::RType,
    };

    use super::BoundedSolver;

    fn v() -> Formula {
        Formula::value_var(Sort::Int)
    }

    fn dummy() -> Program {
        Program::symbol("p", RType::int(Formula::ftrue()))
    }

    #[test]
    fn validity_by_enumeration() {
        let solver = BoundedSolver::default();
        assert!(solver.is_valid(&v().equals(Formula::int(1)).implies(v().at_least(Formula::int(0)))));
        assert!(!solver.is_valid(&v().at_least(Formula::int(0))));
        assert!(solver.is_valid(&Formula::ftrue()));
    }

    #[test]
    fn ground_clauses_are_checked() {
        let mut solver = BoundedSolver::default();
        let good = HornClause::new(v().equals(Formula::int(1)), v().at_least(Formula::int(0)));
        let bad = HornClause::new(v().equals(Formula::int(-1)), v().at_least(Formula::int(0)));
        let init = solver.init();

        let ok = solver.refine(&[good], &QMap::new(), &dummy(), vec![init.clone()]).unwrap();
        assert_eq!(ok.len(), 1);
        let rejected = solver.refine(&[bad], &QMap::new(), &dummy(), vec![init]).unwrap();
        assert!(rejected.is_empty());
        assert_eq!(solver.rejections, 1);
    }

    #[test]
    fn unknowns_are_weakened() {
        let mut solver = BoundedSolver::default();
        let space = QSpace::new(vec![
            v().at_least(Formula::int(0)),
            v().less_than(Formula::int(0)),
        ]);
        let mut qmap = QMap::new();
        qmap.insert("_u0".to_string(), space);

        // {v == 1} <: {U0}
        let clause = HornClause::new(v().equals(Formula::int(1)), Formula::unknown("_u0"));
        let init = solver.init();
        let refined = solver.refine(&[clause], &qmap, &dummy(), vec![init]).unwrap();
        assert_eq!(refined.len(), 1);
        let expected = vec![v().at_least(Formula::int(0))]
            .into_iter()
            .collect::<BTreeSet<_>>();
        assert_eq!(refined[0].solution.get("_u0"), Some(&expected));
    }
}
