//! Identities for the positions a selection set can apply to: response paths, entities, type
//! scopes, and the conditional narrowings between them.
//!
//! Everything here is an immutable value supplied by the entity-tree builder. Most of these
//! types end up as map keys, so their equality defines what "the same scope" means during
//! merging.

use std::fmt;
use std::sync::Arc;

use apollo_compiler::Name;
use itertools::Itertools;
use serde::Serialize;

use crate::inclusion::InclusionConditions;

/// The chain of response keys from the operation root down to one object-typed position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ResponsePath(Vec<Name>);

impl ResponsePath {
    /// The operation root.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn appending(&self, response_key: Name) -> Self {
        let mut segments = self.0.clone();
        segments.push(response_key);
        Self(segments)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Name> {
        self.0.iter()
    }
}

impl fmt::Display for ResponsePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().format("."))
    }
}

/// One object-typed response position. Many scopes can select into the same position (an
/// operation declaring a field and two fragments re-declaring it), so entities are shared
/// through an [`Arc`] and compared by position, not by which scope first mentioned them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Entity {
    #[serde(serialize_with = "crate::utils::serde_bridge::serialize_response_path")]
    response_path: ResponsePath,
    root_type: Name,
}

impl Entity {
    pub fn new(response_path: ResponsePath, root_type: Name) -> Self {
        Self {
            response_path,
            root_type,
        }
    }

    pub fn response_path(&self) -> &ResponsePath {
        &self.response_path
    }

    /// The unnarrowed type of this position, before any type cases apply.
    pub fn root_type(&self) -> &Name {
        &self.root_type
    }
}

/// One step of type narrowing: a type name plus the inclusion conditions accumulated when the
/// narrowing was declared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeScope {
    ty: Name,
    conditions: Option<InclusionConditions>,
}

impl TypeScope {
    pub fn unconditional(ty: Name) -> Self {
        Self {
            ty,
            conditions: None,
        }
    }

    pub fn new(ty: Name, conditions: Option<InclusionConditions>) -> Self {
        Self { ty, conditions }
    }

    pub fn ty(&self) -> &Name {
        &self.ty
    }

    pub fn conditions(&self) -> Option<&InclusionConditions> {
        self.conditions.as_ref()
    }
}

impl fmt::Display for TypeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ty)?;
        if let Some(conditions) = &self.conditions {
            write!(f, " if {conditions}")?;
        }
        Ok(())
    }
}

/// The chain of type narrowings from an entity's root type down to one selection set. Never
/// empty; the first element is the scope the entity was entered at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypePath(Vec<TypeScope>);

impl TypePath {
    pub fn root(scope: TypeScope) -> Self {
        Self(vec![scope])
    }

    pub fn appending(&self, scope: TypeScope) -> Self {
        let mut scopes = self.0.clone();
        scopes.push(scope);
        Self(scopes)
    }

    /// The narrowest scope, the one this path's selection set is authored against.
    pub fn terminal(&self) -> &TypeScope {
        self.0.last().expect("type path is never empty")
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeScope> {
        self.0.iter()
    }
}

impl fmt::Display for TypePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().format("."))
    }
}

/// The key identifying one conditional branch of a scope: an optional narrowing type and the
/// inclusion conditions under which the branch applies. Two inline fragments with equal
/// conditions open the same branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeCondition {
    type_condition: Option<Name>,
    conditions: Option<InclusionConditions>,
}

impl ScopeCondition {
    pub fn new(type_condition: Option<Name>, conditions: Option<InclusionConditions>) -> Self {
        Self {
            type_condition,
            conditions,
        }
    }

    /// A bare type narrowing with no inclusion conditions.
    pub fn for_type(ty: Name) -> Self {
        Self::new(Some(ty), None)
    }

    pub fn type_condition(&self) -> Option<&Name> {
        self.type_condition.as_ref()
    }

    pub fn conditions(&self) -> Option<&InclusionConditions> {
        self.conditions.as_ref()
    }
}

impl fmt::Display for ScopeCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "...")?;
        if let Some(ty) = &self.type_condition {
            write!(f, " on {ty}")?;
        }
        if let Some(conditions) = &self.conditions {
            write!(f, " if {conditions}")?;
        }
        Ok(())
    }
}

/// Where a selection set sits: which entity it selects into, through which chain of type
/// narrowings, and whether the set itself is a type case rather than a field's base scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TypeInfo {
    entity: Arc<Entity>,
    #[serde(serialize_with = "crate::utils::serde_bridge::serialize_type_path")]
    type_path: TypePath,
    is_type_case: bool,
}

impl TypeInfo {
    /// Scope for an entity field's own selection set.
    pub fn new(entity: Arc<Entity>, type_path: TypePath) -> Self {
        Self {
            entity,
            type_path,
            is_type_case: false,
        }
    }

    /// Scope for a type-conditional branch.
    pub fn type_case(entity: Arc<Entity>, type_path: TypePath) -> Self {
        Self {
            entity,
            type_path,
            is_type_case: true,
        }
    }

    pub fn entity(&self) -> &Arc<Entity> {
        &self.entity
    }

    pub fn type_path(&self) -> &TypePath {
        &self.type_path
    }

    pub fn is_type_case(&self) -> bool {
        self.is_type_case
    }

    /// The type this scope's selections are authored against.
    pub fn parent_type(&self) -> &Name {
        self.type_path.terminal().ty()
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_path)?;
        if self.is_type_case {
            write!(f, " (type case)")?;
        }
        Ok(())
    }
}
