//! Typing environment threaded through the search.
use std::collections::BTreeSet;

use im_rc::{OrdMap, OrdSet};

use crate::{
    logic::{Formula, Id, Sort, VALUE_VAR},
    subst::{Substitutable, TypeSubstitution},
    ty::{BaseType, RSchema, RType, TypeSkeleton},
};

/// Declaration of an algebraic datatype. Constructor signatures live in the
/// symbol table under the names listed here.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DatatypeDef {
    pub type_params: Vec<Id>,
    pub constructors: Vec<Id>,
    /// Measure into the naturals used to justify structural recursion.
    pub wf_metric: Option<Id>,
}

impl DatatypeDef {
    pub fn new(type_params: Vec<Id>, constructors: Vec<Id>) -> Self {
        DatatypeDef {
            type_params,
            constructors,
            wf_metric: None,
        }
    }

    pub fn with_metric<S: Into<Id>>(mut self, metric: S) -> Self {
        self.wf_metric = Some(metric.into());
        self
    }
}

/// The typing scope. Extensions are functional: every field is a persistent
/// map, so cloning before an extension never exposes it to the original.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Environment {
    /// Symbols indexed by the arity of their type.
    pub symbols: OrdMap<usize, OrdMap<Id, RSchema>>,
    pub bound_type_vars: Vec<Id>,
    pub datatypes: OrdMap<Id, DatatypeDef>,
    pub assumptions: OrdSet<Formula>,
    pub neg_assumptions: OrdSet<Formula>,
    /// Symbols whose declared type is used verbatim.
    pub constants: OrdSet<Id>,
    pub ghosts: OrdMap<Id, RType>,
}

impl Environment {
    pub fn new() -> Self {
        Environment::default()
    }

    pub fn add_poly_variable<S: Into<Id>>(&mut self, name: S, sch: RSchema) {
        let arity = sch.arity();
        let mut syms = self.symbols_of_arity(arity);
        syms.insert(name.into(), sch);
        self.symbols.insert(arity, syms);
    }

    pub fn add_variable<S: Into<Id>>(&mut self, name: S, t: RType) {
        self.add_poly_variable(name, RSchema::Mono(t))
    }

    pub fn add_constant<S: Into<Id>>(&mut self, name: S, sch: RSchema) {
        let name = name.into();
        self.constants.insert(name.clone());
        self.add_poly_variable(name, sch);
    }

    pub fn add_type_var<S: Into<Id>>(&mut self, a: S) {
        let a = a.into();
        if !self.bound_type_vars.contains(&a) {
            self.bound_type_vars.push(a);
        }
    }

    pub fn add_datatype<S: Into<Id>>(&mut self, name: S, def: DatatypeDef) {
        self.datatypes.insert(name.into(), def);
    }

    pub fn add_assumption(&mut self, fml: Formula) {
        if !fml.is_true() {
            self.assumptions.insert(fml);
        }
    }

    pub fn add_neg_assumption(&mut self, fml: Formula) {
        if !fml.is_false() {
            self.neg_assumptions.insert(fml);
        }
    }

    pub fn add_ghost<S: Into<Id>>(&mut self, name: S, t: RType) {
        self.ghosts.insert(name.into(), t);
    }

    pub fn symbols_of_arity(&self, arity: usize) -> OrdMap<Id, RSchema> {
        self.symbols.get(&arity).cloned().unwrap_or_default()
    }

    pub fn lookup_symbol(&self, name: &str) -> Option<&RSchema> {
        self.symbols.values().find_map(|syms| syms.get(name))
    }

    /// Largest arity of any symbol in scope.
    pub fn max_arity(&self) -> usize {
        self.symbols
            .iter()
            .filter(|(_, syms)| !syms.is_empty())
            .map(|(arity, _)| *arity)
            .max()
            .unwrap_or(0)
    }

    pub fn is_bound(&self, a: &str) -> bool {
        self.bound_type_vars.iter().any(|b| b == a)
    }

    pub fn is_constant(&self, name: &str) -> bool {
        self.constants.contains(name)
    }

    pub fn metric_of(&self, datatype: &str) -> Option<&Id> {
        self.datatypes.get(datatype).and_then(|dt| dt.wf_metric.as_ref())
    }

    /// Monomorphic scalar symbols followed by ghosts, with their types under
    /// `tass`.
    fn scalar_bindings(&self, tass: &TypeSubstitution) -> Vec<(Id, RType)> {
        let monos = self
            .symbols_of_arity(0)
            .into_iter()
            .filter_map(|(name, sch)| match sch {
                RSchema::Mono(t) => Some((name, t)),
                RSchema::ForAll(_, _) => None,
            });
        let ghosts = self.ghosts.clone().into_iter();
        monos
            .chain(ghosts)
            .map(|(name, mut t)| {
                t.apply_subst(tass);
                (name, t)
            })
            .filter(|(_, t)| t.is_scalar())
            .collect()
    }

    /// Every scalar term in scope that a qualifier may talk about: symbol and
    /// ghost variables, plus the well-founded metric of datatype-valued ones.
    pub fn all_scalars(&self, tass: &TypeSubstitution) -> Vec<Formula> {
        let mut out = vec![];
        for (name, t) in self.scalar_bindings(tass) {
            if let Some(base) = t.base_type() {
                let var = Formula::var(base.to_sort(), name);
                if let BaseType::Data(dt) = base {
                    if let Some(metric) = self.metric_of(dt) {
                        out.push(Formula::measure(Sort::Int, metric.clone(), var.clone()));
                    }
                }
                out.push(var);
            }
        }
        out
    }

    /// Path condition of this environment: positive facts (assumptions and
    /// the refinements of non-constant scalar bindings, instantiated at their
    /// names) and negative facts (negated branch assumptions).
    pub fn embedding(&self, tass: &TypeSubstitution) -> (BTreeSet<Formula>, BTreeSet<Formula>) {
        let mut positives: BTreeSet<Formula> = self
            .assumptions
            .iter()
            .map(|fml| {
                let mut fml = fml.clone();
                fml.apply_subst(tass);
                fml
            })
            .collect();

        for (name, t) in self.scalar_bindings(tass) {
            if self.is_constant(&name) {
                continue;
            }
            if let TypeSkeleton::Scalar(base, _, fml) = &t {
                let fact = fml.substitute_var(VALUE_VAR, Formula::var(base.to_sort(), name));
                if !fact.is_true() {
                    positives.insert(fact);
                }
            }
        }

        let negatives = self
            .neg_assumptions
            .iter()
            .map(|fml| {
                let mut fml = fml.clone();
                fml.apply_subst(tass);
                fml
            })
            .collect();

        (positives, negatives)
    }
}

impl Substitutable for Environment {
    fn apply_subst(&mut self, subst: &TypeSubstitution) {
        if subst.is_empty() {
            return;
        }

        self.symbols = std::mem::take(&mut self.symbols)
            .into_iter()
            .map(|(arity, syms)| {
                let syms = syms
                    .into_iter()
                    .map(|(name, mut sch)| {
                        sch.apply_subst(subst);
                        (name, sch)
                    })
                    .collect::<OrdMap<_, _>>();
                (arity, syms)
            })
            .collect();
        self.ghosts = std::mem::take(&mut self.ghosts)
            .into_iter()
            .map(|(name, mut t)| {
                t.apply_subst(subst);
                (name, t)
            })
            .collect();
        self.assumptions = std::mem::take(&mut self.assumptions)
            .into_iter()
            .map(|mut fml| {
                fml.apply_subst(subst);
                fml
            })
            .collect();
        self.neg_assumptions = std::mem::take(&mut self.neg_assumptions)
            .into_iter()
            .map(|mut fml| {
                fml.apply_subst(subst);
                fml
            })
            .collect();
    }
}
