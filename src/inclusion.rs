//! Conditional inclusion of selections, derived from `@include`/`@skip` applications.

use std::fmt;

use apollo_compiler::Name;
use itertools::Itertools;
use serde::Serialize;

/// A single `@include`/`@skip` application, reduced to the operation variable it references and
/// whether the test is inverted (`@skip(if: $v)` is the inversion of `@include(if: $v)`).
///
/// Applications with a literal `if:` argument never produce one of these; they either drop the
/// selection outright or leave it unconditional, and are folded away by [`Inclusion::all_of`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct InclusionCondition {
    variable: Name,
    is_inverted: bool,
}

impl InclusionCondition {
    /// Condition from `@include(if: $variable)`.
    pub fn include(variable: Name) -> Self {
        Self {
            variable,
            is_inverted: false,
        }
    }

    /// Condition from `@skip(if: $variable)`.
    pub fn skip(variable: Name) -> Self {
        Self {
            variable,
            is_inverted: true,
        }
    }

    pub fn variable(&self) -> &Name {
        &self.variable
    }

    pub fn is_inverted(&self) -> bool {
        self.is_inverted
    }

    /// The same variable test with the opposite polarity.
    pub fn inverted(&self) -> Self {
        Self {
            variable: self.variable.clone(),
            is_inverted: !self.is_inverted,
        }
    }
}

impl fmt::Display for InclusionCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_inverted {
            write!(f, "!${}", self.variable)
        } else {
            write!(f, "${}", self.variable)
        }
    }
}

/// A non-empty conjunction of [`InclusionCondition`]s in canonical form: sorted by variable name,
/// deduplicated, and free of contradictions (the same variable in both polarities).
///
/// Canonical form means two condition sets derived from differently-ordered directive
/// applications compare equal, which matters because these participate in scope keys. The only
/// way to obtain one is through [`Inclusion::all_of`], which is where the empty and contradictory
/// cases are folded into the unconditional variants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct InclusionConditions(Vec<InclusionCondition>);

impl InclusionConditions {
    pub fn iter(&self) -> impl Iterator<Item = &InclusionCondition> {
        self.0.iter()
    }
}

impl fmt::Display for InclusionConditions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().format(" && "))
    }
}

/// The net effect of the conditional-inclusion directives applied to one selection.
///
/// This is the result type of joining directive applications: statically included (no variable
/// involvement), statically skipped (a literal `if: false` or a `$v && !$v` contradiction), or
/// conditional on a concrete set of variables. Statically skipped selections never make it into
/// the IR; the builder drops them before merging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Inclusion {
    Included,
    Skipped,
    Conditional(InclusionConditions),
}

impl Inclusion {
    /// Joins directive applications into their conjunction, normalizing as it goes.
    ///
    /// An empty input is unconditionally included. A variable appearing in both polarities can
    /// never hold, so the whole conjunction collapses to [`Inclusion::Skipped`].
    pub fn all_of(conditions: impl IntoIterator<Item = InclusionCondition>) -> Self {
        let mut conditions: Vec<_> = conditions.into_iter().collect();
        conditions.sort_by(|a, b| {
            a.variable
                .as_str()
                .cmp(b.variable.as_str())
                .then(a.is_inverted.cmp(&b.is_inverted))
        });
        conditions.dedup();
        if conditions
            .windows(2)
            .any(|pair| pair[0].variable == pair[1].variable)
        {
            // After dedup, a repeated variable must appear in both polarities.
            return Self::Skipped;
        }
        if conditions.is_empty() {
            Self::Included
        } else {
            Self::Conditional(InclusionConditions(conditions))
        }
    }
}

impl fmt::Display for Inclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Included => f.write_str("included"),
            Self::Skipped => f.write_str("skipped"),
            Self::Conditional(conditions) => conditions.fmt(f),
        }
    }
}

/// A disjunction of condition sets, accumulated as duplicate declarations of the same selection
/// are merged. A field declared under `$a` and re-declared under `$b` is included when either
/// holds.
///
/// Clauses keep their first-appearance order and are deduplicated; equality is order-sensitive,
/// like every other ordered collection in this IR.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AnyOf(Vec<InclusionConditions>);

impl AnyOf {
    pub fn new(conditions: InclusionConditions) -> Self {
        Self(vec![conditions])
    }

    pub fn iter(&self) -> impl Iterator<Item = &InclusionConditions> {
        self.0.iter()
    }

    /// Appends the other disjunction's clauses, skipping ones already present.
    pub fn union(&mut self, other: &Self) {
        for clause in &other.0 {
            if !self.0.contains(clause) {
                self.0.push(clause.clone());
            }
        }
    }

    /// Logical OR over *optional* condition sets, where `None` means "included
    /// unconditionally". An unconditional side subsumes whatever the other side requires, so the
    /// result is conditional only when both sides are.
    pub fn or(lhs: Option<Self>, rhs: Option<&Self>) -> Option<Self> {
        match (lhs, rhs) {
            (Some(mut lhs), Some(rhs)) => {
                lhs.union(rhs);
                Some(lhs)
            }
            _ => None,
        }
    }
}

impl From<InclusionConditions> for AnyOf {
    fn from(conditions: InclusionConditions) -> Self {
        Self::new(conditions)
    }
}

impl fmt::Display for AnyOf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.0.iter().format_with(" || ", |clause, f| {
                if clause.0.len() > 1 {
                    f(&format_args!("({clause})"))
                } else {
                    f(clause)
                }
            })
        )
    }
}
