//! Refinement types, their shapes and type schemas.
use std::{collections::BTreeSet, fmt};

use itertools::Itertools;

use crate::{
    candidate::Solution,
    logic::{Formula, Id, Sort, Substitution},
};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BaseType {
    Bool,
    Int,
    Data(Id),
    TypeVar(Id),
}

impl BaseType {
    pub fn to_sort(&self) -> Sort {
        match self {
            BaseType::Bool => Sort::Bool,
            BaseType::Int => Sort::Int,
            BaseType::Data(name) => Sort::Data(name.clone()),
            BaseType::TypeVar(a) => Sort::Var(a.clone()),
        }
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseType::Bool => write!(f, "Bool"),
            BaseType::Int => write!(f, "Int"),
            BaseType::Data(name) => write!(f, "{}", name),
            BaseType::TypeVar(a) => write!(f, "{}", a),
        }
    }
}

/// A type with refinements of type `R` at every scalar position.
///
/// Scalars carry their datatype arguments next to the base type, so
/// `List Int` is `Scalar(Data("List"), [Int], r)`. Function types name their
/// argument; the result may mention that name in its refinements.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeSkeleton<R> {
    Scalar(BaseType, Vec<TypeSkeleton<R>>, R),
    Function(Id, Box<TypeSkeleton<R>>, Box<TypeSkeleton<R>>),
}

/// Refinement type.
pub type RType = TypeSkeleton<Formula>;

/// Shape: a type whose refinements have been erased.
pub type SType = TypeSkeleton<()>;

impl<R> TypeSkeleton<R> {
    pub fn function<S: Into<Id>>(x: S, arg: TypeSkeleton<R>, res: TypeSkeleton<R>) -> Self {
        TypeSkeleton::Function(x.into(), Box::new(arg), Box::new(res))
    }

    /// Number of arguments.
    pub fn arity(&self) -> usize {
        match self {
            TypeSkeleton::Scalar(_, _, _) => 0,
            TypeSkeleton::Function(_, _, res) => 1 + res.arity(),
        }
    }

    /// Result type after all arguments have been applied.
    pub fn last_type(&self) -> &TypeSkeleton<R> {
        match self {
            TypeSkeleton::Function(_, _, res) => res.last_type(),
            scalar => scalar,
        }
    }

    /// Named arguments, in order.
    pub fn arguments(&self) -> Vec<(&Id, &TypeSkeleton<R>)> {
        let mut out = vec![];
        let mut t = self;
        while let TypeSkeleton::Function(x, arg, res) = t {
            out.push((x, arg.as_ref()));
            t = res;
        }
        out
    }

    pub fn is_function(&self) -> bool {
        matches!(self, TypeSkeleton::Function(_, _, _))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, TypeSkeleton::Scalar(_, _, _))
    }

    pub fn base_type(&self) -> Option<&BaseType> {
        match self {
            TypeSkeleton::Scalar(base, _, _) => Some(base),
            TypeSkeleton::Function(_, _, _) => None,
        }
    }

    /// Type variables mentioned anywhere in this type.
    pub fn type_vars(&self) -> BTreeSet<Id> {
        let mut out = BTreeSet::new();
        self.collect_type_vars(&mut out);
        out
    }

    fn collect_type_vars(&self, out: &mut BTreeSet<Id>) {
        match self {
            TypeSkeleton::Scalar(base, args, _) => {
                if let BaseType::TypeVar(a) = base {
                    out.insert(a.clone());
                }
                for arg in args {
                    arg.collect_type_vars(out);
                }
            }
            TypeSkeleton::Function(_, arg, res) => {
                arg.collect_type_vars(out);
                res.collect_type_vars(out);
            }
        }
    }

    pub fn shape(&self) -> SType {
        match self {
            TypeSkeleton::Scalar(base, args, _) => {
                TypeSkeleton::Scalar(base.clone(), args.iter().map(|a| a.shape()).collect(), ())
            }
            TypeSkeleton::Function(x, arg, res) => {
                TypeSkeleton::function(x.clone(), arg.shape(), res.shape())
            }
        }
    }
}

impl SType {
    pub fn scalar(base: BaseType) -> SType {
        TypeSkeleton::Scalar(base, vec![], ())
    }

    pub fn type_var<S: Into<Id>>(a: S) -> SType {
        TypeSkeleton::Scalar(BaseType::TypeVar(a.into()), vec![], ())
    }

    /// Weakest refinement of this shape: `true` at covariant positions and
    /// `false` at contravariant ones.
    pub fn refine_top(&self) -> RType {
        match self {
            TypeSkeleton::Scalar(base, args, ()) => TypeSkeleton::Scalar(
                base.clone(),
                args.iter().map(|a| a.refine_top()).collect(),
                Formula::ftrue(),
            ),
            TypeSkeleton::Function(x, arg, res) => {
                TypeSkeleton::function(x.clone(), arg.refine_bot(), res.refine_top())
            }
        }
    }

    /// Strongest refinement of this shape, the dual of [`SType::refine_top`].
    pub fn refine_bot(&self) -> RType {
        match self {
            TypeSkeleton::Scalar(base, args, ()) => TypeSkeleton::Scalar(
                base.clone(),
                args.iter().map(|a| a.refine_bot()).collect(),
                Formula::ffalse(),
            ),
            TypeSkeleton::Function(x, arg, res) => {
                TypeSkeleton::function(x.clone(), arg.refine_top(), res.refine_bot())
            }
        }
    }
}

impl RType {
    pub fn scalar(base: BaseType, fml: Formula) -> RType {
        TypeSkeleton::Scalar(base, vec![], fml)
    }

    pub fn int(fml: Formula) -> RType {
        RType::scalar(BaseType::Int, fml)
    }

    pub fn bool(fml: Formula) -> RType {
        RType::scalar(BaseType::Bool, fml)
    }

    pub fn vart<S: Into<Id>>(a: S, fml: Formula) -> RType {
        RType::scalar(BaseType::TypeVar(a.into()), fml)
    }

    pub fn data<S: Into<Id>>(name: S, args: Vec<RType>, fml: Formula) -> RType {
        TypeSkeleton::Scalar(BaseType::Data(name.into()), args, fml)
    }

    pub fn refinement(&self) -> Option<&Formula> {
        match self {
            TypeSkeleton::Scalar(_, _, fml) => Some(fml),
            TypeSkeleton::Function(_, _, _) => None,
        }
    }

    /// Conjoins `fml` to the refinement of a scalar type.
    pub fn add_refinement(self, fml: Formula) -> RType {
        match self {
            TypeSkeleton::Scalar(base, args, r) => TypeSkeleton::Scalar(base, args, r.and(fml)),
            t => t,
        }
    }

    /// `_v == x` at the sort of `base`.
    pub fn var_refinement(x: &str, base: &BaseType) -> Formula {
        let sort = base.to_sort();
        Formula::value_var(sort.clone()).equals(Formula::var(sort, x))
    }

    /// Applies a formula substitution to every refinement. Argument names
    /// bound by function types shadow the substitution in the result.
    pub fn substitute(&self, subst: &Substitution) -> RType {
        if subst.is_empty() {
            return self.clone();
        }

        match self {
            TypeSkeleton::Scalar(base, args, fml) => TypeSkeleton::Scalar(
                base.clone(),
                args.iter().map(|a| a.substitute(subst)).collect(),
                fml.substitute(subst),
            ),
            TypeSkeleton::Function(x, arg, res) => {
                let arg = arg.substitute(subst);
                let res = if subst.contains_key(x) {
                    let mut inner = subst.clone();
                    inner.remove(x);
                    res.substitute(&inner)
                } else {
                    res.substitute(subst)
                };
                TypeSkeleton::function(x.clone(), arg, res)
            }
        }
    }

    /// Renames variable `old` (of type `t_old`) to `new` in all refinements.
    /// Variables of function type never occur in refinements.
    pub fn rename_var(&self, old: &str, new: &str, t_old: &RType) -> RType {
        match t_old {
            TypeSkeleton::Scalar(base, _, _) => {
                let mut subst = Substitution::new();
                subst.insert(old.to_string(), Formula::var(base.to_sort(), new));
                self.substitute(&subst)
            }
            TypeSkeleton::Function(_, _, _) => self.clone(),
        }
    }

    pub fn unknowns(&self) -> BTreeSet<Id> {
        match self {
            TypeSkeleton::Scalar(_, args, fml) => {
                let mut out = fml.unknowns();
                for arg in args {
                    out.extend(arg.unknowns());
                }
                out
            }
            TypeSkeleton::Function(_, arg, res) => {
                let mut out = arg.unknowns();
                out.extend(res.unknowns());
                out
            }
        }
    }

    pub fn apply_solution(&self, sol: &Solution) -> RType {
        match self {
            TypeSkeleton::Scalar(base, args, fml) => TypeSkeleton::Scalar(
                base.clone(),
                args.iter().map(|a| a.apply_solution(sol)).collect(),
                fml.apply_solution(sol),
            ),
            TypeSkeleton::Function(x, arg, res) => {
                TypeSkeleton::function(x.clone(), arg.apply_solution(sol), res.apply_solution(sol))
            }
        }
    }
}

/// Refinements that know how to render themselves inside a type.
pub trait ShowRefinement {
    /// `None` when the refinement is trivial and should be omitted.
    fn show(&self) -> Option<String>;
}

impl ShowRefinement for Formula {
    fn show(&self) -> Option<String> {
        if self.is_true() {
            None
        } else {
            Some(self.to_string())
        }
    }
}

impl ShowRefinement for () {
    fn show(&self) -> Option<String> {
        None
    }
}

impl<R: ShowRefinement> fmt::Display for TypeSkeleton<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSkeleton::Scalar(base, args, r) => {
                let head = if args.is_empty() {
                    base.to_string()
                } else {
                    format!(
                        "{} {}",
                        base,
                        args.iter()
                            .map(|a| match a {
                                TypeSkeleton::Scalar(_, inner, r)
                                    if inner.is_empty() && r.show().is_none() =>
                                {
                                    a.to_string()
                                }
                                _ => format!("({})", a),
                            })
                            .join(" ")
                    )
                };
                match r.show() {
                    Some(fml) => write!(f, "{{{} | {}}}", head, fml),
                    None => write!(f, "{}", head),
                }
            }
            TypeSkeleton::Function(x, arg, res) => {
                if arg.is_function() {
                    write!(f, "{}:({}) -> {}", x, arg, res)
                } else {
                    write!(f, "{}:{} -> {}", x, arg, res)
                }
            }
        }
    }
}

/// A refinement type under zero or more universal quantifiers.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RSchema {
    Mono(RType),
    ForAll(Id, Box<RSchema>),
}

impl From<RType> for RSchema {
    fn from(t: RType) -> Self {
        RSchema::Mono(t)
    }
}

impl RSchema {
    /// Quantifies `t` over `vars`, the first variable outermost.
    pub fn generalize(vars: &[Id], t: RType) -> RSchema {
        vars.iter()
            .rev()
            .fold(RSchema::Mono(t), |sch, a| RSchema::ForAll(a.clone(), Box::new(sch)))
    }

    /// The monotype under all quantifiers.
    pub fn mono(&self) -> &RType {
        match self {
            RSchema::Mono(t) => t,
            RSchema::ForAll(_, sch) => sch.mono(),
        }
    }

    pub fn bound_vars(&self) -> Vec<Id> {
        let mut vars = vec![];
        let mut sch = self;
        while let RSchema::ForAll(a, inner) = sch {
            vars.push(a.clone());
            sch = inner;
        }
        vars
    }

    pub fn is_mono(&self) -> bool {
        matches!(self, RSchema::Mono(_))
    }

    pub fn arity(&self) -> usize {
        self.mono().arity()
    }
}

impl fmt::Display for RSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vars = self.bound_vars();
        if vars.is_empty() {
            write!(f, "{}", self.mono())
        } else {
            write!(f, "<{}> . {}", vars.iter().join(" "), self.mono())
        }
    }
}
