//! Type-variable substitution and the values it applies to.
use std::{
    fmt,
    ops::{Deref, DerefMut},
};

use im_rc::OrdMap;

use crate::{
    logic::{Formula, Id, SortSubstitution},
    ty::{BaseType, RSchema, RType, TypeSkeleton},
};

/// Assignment of type variables to refinement types for one search branch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TypeSubstitution(OrdMap<Id, RType>);

impl Deref for TypeSubstitution {
    type Target = OrdMap<Id, RType>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for TypeSubstitution {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl FromIterator<(Id, RType)> for TypeSubstitution {
    fn from_iter<T: IntoIterator<Item = (Id, RType)>>(iter: T) -> Self {
        TypeSubstitution(iter.into_iter().collect())
    }
}

impl fmt::Display for TypeSubstitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "{{}}");
        }

        write!(f, "{{")?;
        for (i, (var, ty)) in self.iter().enumerate() {
            if i != 0 {
                write!(f, ",")?;
            }
            write!(f, " {}: {}", var, ty)?;
        }
        write!(f, " }}")
    }
}

impl TypeSubstitution {
    pub fn new() -> Self {
        TypeSubstitution(OrdMap::new())
    }

    pub fn single<S: Into<Id>>(var: S, ty: RType) -> Self {
        TypeSubstitution(OrdMap::unit(var.into(), ty))
    }

    /// The sorts that assigned scalar types induce on sort variables.
    pub fn to_sort_subst(&self) -> SortSubstitution {
        self.iter()
            .filter_map(|(a, t)| t.base_type().map(|b| (a.clone(), b.to_sort())))
            .collect()
    }

    /// Follows assignments starting at `a` and returns the fully substituted
    /// type, or `None` if `a` is unassigned.
    pub fn resolve(&self, a: &str) -> Option<RType> {
        self.get(a).map(|t| {
            let mut t = t.clone();
            t.apply_subst(self);
            t
        })
    }
}

/// Trait for values that can have a type substitution applied to them.
pub trait Substitutable {
    fn apply_subst(&mut self, subst: &TypeSubstitution);
}

impl<T> Substitutable for Option<T>
where
    T: Substitutable,
{
    fn apply_subst(&mut self, subst: &TypeSubstitution) {
        if let Some(inner) = self {
            inner.apply_subst(subst);
        }
    }
}

impl<T> Substitutable for Vec<T>
where
    T: Substitutable,
{
    fn apply_subst(&mut self, subst: &TypeSubstitution) {
        for item in self.iter_mut() {
            item.apply_subst(subst);
        }
    }
}

impl Substitutable for Formula {
    fn apply_subst(&mut self, subst: &TypeSubstitution) {
        if subst.is_empty() {
            return;
        }
        *self = self.apply_sort_subst(&subst.to_sort_subst());
    }
}

impl Substitutable for RType {
    fn apply_subst(&mut self, subst: &TypeSubstitution) {
        if subst.is_empty() {
            return;
        }

        match self {
            TypeSkeleton::Scalar(BaseType::TypeVar(a), args, fml) if args.is_empty() => {
                fml.apply_subst(subst);
                if let Some(assigned) = subst.resolve(a) {
                    *self = assigned.add_refinement(std::mem::take(fml));
                }
            }
            TypeSkeleton::Scalar(_, args, fml) => {
                args.apply_subst(subst);
                fml.apply_subst(subst);
            }
            TypeSkeleton::Function(_, arg, res) => {
                arg.apply_subst(subst);
                res.apply_subst(subst);
            }
        }
    }
}

impl Substitutable for RSchema {
    fn apply_subst(&mut self, subst: &TypeSubstitution) {
        match self {
            RSchema::Mono(t) => t.apply_subst(subst),
            RSchema::ForAll(a, inner) => {
                // quantified variables shadow the substitution
                if subst.contains_key(a) {
                    let mut shadowed = subst.clone();
                    shadowed.remove(a);
                    inner.apply_subst(&shadowed);
                } else {
                    inner.apply_subst(subst);
                }
            }
        }
    }
}
