use std::fmt;

use apollo_compiler::Name;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::collections::IndexSet;
use serde::Serialize;

use super::Field;
use super::FragmentSpread;
use super::SelectionSet;
use super::SpreadKey;
use super::direct::DirectSelections;
use super::direct::DirectSelectionsView;
use crate::inclusion::AnyOf;
use crate::scope::ScopeCondition;
use crate::scope::TypeInfo;
use crate::scope::TypeScope;
use crate::utils::logging::snapshot;

/// One contributor to a scope's merged selections: an enclosing scope, optionally reached
/// through a named fragment spread. Recorded only when the contributor actually landed at least
/// one field or fragment here; a source whose every offer was shadowed leaves no trace.
///
/// The fragment link is the fragment's name, an identity for lookup and equality. The spread
/// itself stays owned by the scope that declared it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MergedSource {
    type_info: TypeInfo,
    fragment: Option<Name>,
}

impl MergedSource {
    /// A contribution inherited from an enclosing scope directly.
    pub fn scope(type_info: TypeInfo) -> Self {
        Self {
            type_info,
            fragment: None,
        }
    }

    /// A contribution pulled in through a named fragment spread.
    pub fn fragment(type_info: TypeInfo, spread: &FragmentSpread) -> Self {
        Self {
            type_info,
            fragment: Some(spread.fragment().name().clone()),
        }
    }

    pub fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    pub fn fragment_name(&self) -> Option<&Name> {
        self.fragment.as_ref()
    }
}

impl fmt::Display for MergedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.fragment {
            Some(name) => write!(f, "fragment {name}"),
            None => write!(f, "scope {}", self.type_info.type_path()),
        }
    }
}

/// The selections one source offers for merging: what a fragment declares at its root, or what
/// an enclosing scope passes down to a narrower one. Type-conditional branches are not part of
/// an offer; the builder exposes inherited branches separately through
/// [`MergedSelections::add_merged_inline_fragment`].
#[derive(Debug, Clone, Copy)]
pub struct ScopeSelections<'a> {
    pub(crate) fields: &'a IndexMap<Name, Field>,
    pub(crate) fragment_spreads: &'a IndexMap<SpreadKey, FragmentSpread>,
}

impl<'a> From<&'a DirectSelections> for ScopeSelections<'a> {
    fn from(selections: &'a DirectSelections) -> Self {
        Self {
            fields: selections.fields(),
            fragment_spreads: selections.fragment_spreads(),
        }
    }
}

impl<'a> From<&'a DirectSelectionsView> for ScopeSelections<'a> {
    fn from(view: &'a DirectSelectionsView) -> Self {
        Self::from(&**view)
    }
}

/// The selections a scope exposes beyond what it declares itself.
///
/// Bound at construction to the scope's direct-selections projection as it stood; every
/// absorption shadow-checks against that projection, so a directly declared key is never
/// duplicated here. Which sources actually contributed is tracked in the provenance set, which
/// downstream code uses to decide whether generated accessors bridge into fragment-backed
/// types.
#[derive(Debug, Clone, Serialize)]
pub struct MergedSelections {
    type_info: TypeInfo,
    #[serde(skip)]
    direct: Option<DirectSelectionsView>,
    fields: IndexMap<Name, Field>,
    #[serde(serialize_with = "crate::utils::serde_bridge::serialize_display_keyed_map")]
    inline_fragments: IndexMap<ScopeCondition, SelectionSet>,
    #[serde(serialize_with = "crate::utils::serde_bridge::serialize_display_keyed_map")]
    fragment_spreads: IndexMap<SpreadKey, FragmentSpread>,
    merged_sources: IndexSet<MergedSource>,
}

impl MergedSelections {
    pub(crate) fn new(type_info: TypeInfo, direct: Option<DirectSelectionsView>) -> Self {
        Self {
            type_info,
            direct,
            fields: IndexMap::default(),
            inline_fragments: IndexMap::default(),
            fragment_spreads: IndexMap::default(),
            merged_sources: IndexSet::default(),
        }
    }

    /// Folds one source's selections into this scope, recording the source in the provenance
    /// set if anything was actually absorbed.
    pub fn merge_in<'a>(
        &mut self,
        selections: impl Into<ScopeSelections<'a>>,
        source: MergedSource,
    ) {
        let selections = selections.into();
        let mut did_merge = false;
        for field in selections.fields.values() {
            did_merge |= self.merge_in_field(field);
        }
        for spread in selections.fragment_spreads.values() {
            did_merge |= self.merge_in_fragment_spread(spread);
        }
        if did_merge {
            self.merged_sources.insert(source);
        }
        snapshot!(self, "merged source selections into scope");
    }

    /// Absorbs one offered field. Returns whether this scope's merged view exposes it: a
    /// directly declared key shadows the offer entirely, while a key another source already
    /// landed still counts for the offering source.
    fn merge_in_field(&mut self, field: &Field) -> bool {
        let key = field.response_key();
        if self
            .direct
            .as_deref()
            .is_some_and(|direct| direct.fields().contains_key(key))
        {
            return false;
        }
        if let Some(existing) = self.fields.get_mut(key) {
            // The first absorbed value keeps the slot (and, for an entity field, the nested
            // scope every later source keeps feeding); conditions still accumulate.
            existing.inclusion_conditions = AnyOf::or(
                existing.inclusion_conditions.take(),
                field.inclusion_conditions.as_ref(),
            );
            return true;
        }
        let field = self.shallow_merged_copy(field);
        self.fields.insert(key.clone(), field);
        true
    }

    /// Copies a field into this scope's merged view. Entity fields are copied shallowly: the
    /// nested selection set is replaced with a fresh merged-only scope positioned under this
    /// scope, so every source reaching the same nested entity accumulates into one place
    /// instead of freezing the first source's subtree.
    fn shallow_merged_copy(&self, field: &Field) -> Field {
        let Some(nested) = field.selection_set() else {
            return field.clone();
        };
        let type_info = TypeInfo::new(
            nested.type_info().entity().clone(),
            self.type_info
                .type_path()
                .appending(nested.type_info().type_path().terminal().clone()),
        );
        Field {
            name: field.name.clone(),
            alias: field.alias.clone(),
            arguments: field.arguments.clone(),
            inclusion_conditions: field.inclusion_conditions.clone(),
            selection_set: Some(SelectionSet::merged_only(type_info)),
        }
    }

    fn merge_in_fragment_spread(&mut self, spread: &FragmentSpread) -> bool {
        let key = spread.key();
        if self
            .direct
            .as_deref()
            .is_some_and(|direct| direct.fragment_spreads().contains_key(&key))
        {
            return false;
        }
        self.fragment_spreads
            .entry(key)
            .or_insert_with(|| spread.clone());
        true
    }

    /// Exposes a type-conditional branch this scope inherits, as a merged-only nested scope.
    /// Does nothing when the scope declares the branch directly, when the branch was already
    /// added, or when the scope itself is a type case; a type case does not re-expose further
    /// conditional branching through this path. Branches do not touch the provenance set.
    pub fn add_merged_inline_fragment(&mut self, condition: &ScopeCondition) {
        if self.type_info.is_type_case() {
            return;
        }
        if self
            .direct
            .as_deref()
            .is_some_and(|direct| direct.inline_fragments().contains_key(condition))
        {
            return;
        }
        if self.inline_fragments.contains_key(condition) {
            return;
        }
        let parent_type = condition
            .type_condition()
            .unwrap_or_else(|| self.type_info.parent_type())
            .clone();
        // TODO: append the full scope condition here, not just its type; as it stands,
        // branches that differ only in inclusion conditions collapse onto one path.
        let type_info = TypeInfo::type_case(
            self.type_info.entity().clone(),
            self.type_info
                .type_path()
                .appending(TypeScope::unconditional(parent_type)),
        );
        self.inline_fragments
            .insert(condition.clone(), SelectionSet::merged_only(type_info));
        snapshot!(self, "added merged inline fragment");
    }

    pub fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    pub fn fields(&self) -> &IndexMap<Name, Field> {
        &self.fields
    }

    pub fn inline_fragments(&self) -> &IndexMap<ScopeCondition, SelectionSet> {
        &self.inline_fragments
    }

    pub fn fragment_spreads(&self) -> &IndexMap<SpreadKey, FragmentSpread> {
        &self.fragment_spreads
    }

    /// The sources that contributed at least one field or fragment to this scope.
    pub fn merged_sources(&self) -> &IndexSet<MergedSource> {
        &self.merged_sources
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
            && self.inline_fragments.is_empty()
            && self.fragment_spreads.is_empty()
    }

    /// The nested scope of an absorbed entity-valued field, for routing further sources that
    /// reach the same entity.
    pub fn field_selection_set_mut(&mut self, response_key: &Name) -> Option<&mut SelectionSet> {
        self.fields.get_mut(response_key)?.selection_set.as_mut()
    }

    pub fn inline_fragment_mut(&mut self, condition: &ScopeCondition) -> Option<&mut SelectionSet> {
        self.inline_fragments.get_mut(condition)
    }
}

// Mirrors `DirectSelections` equality over the three maps, with the provenance set added; the
// scope identity and the bound direct projection are not compared.
impl PartialEq for MergedSelections {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
            && self.inline_fragments == other.inline_fragments
            && self.fragment_spreads == other.fragment_spreads
            && self.merged_sources == other.merged_sources
    }
}

impl Eq for MergedSelections {}
