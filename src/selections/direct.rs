use std::ops::Deref;
use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::collections::IndexMap;
use indexmap::map::Entry;
use serde::Serialize;

use super::Field;
use super::FragmentSpread;
use super::SelectionSet;
use super::SpreadKey;
use crate::inclusion::AnyOf;
use crate::scope::ScopeCondition;

/// The selections explicitly authored at one type scope.
///
/// Merging here combines syntactically distinct declarations within one document that mean the
/// same selection: a response key requested twice under different inclusion conditions or with
/// different sub-selections, a type case opened twice, a fragment spread repeated. Nothing is
/// dropped by a merge; conditions accumulate as alternatives and entity sub-selections union
/// recursively.
///
/// Each of the three maps keeps unique keys in first-insertion order. That order is document
/// order and drives generated declaration order, so nothing here ever re-sorts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectSelections {
    pub(crate) fields: IndexMap<Name, Field>,
    #[serde(serialize_with = "crate::utils::serde_bridge::serialize_display_keyed_map")]
    pub(crate) inline_fragments: IndexMap<ScopeCondition, SelectionSet>,
    #[serde(serialize_with = "crate::utils::serde_bridge::serialize_display_keyed_map")]
    pub(crate) fragment_spreads: IndexMap<SpreadKey, FragmentSpread>,
}

impl DirectSelections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one field declaration into this scope.
    ///
    /// If the response key is new, the field is inserted as-is. Otherwise the existing entry is
    /// kept and the incoming declaration folds into it: inclusion conditions combine as
    /// alternatives (a declaration without conditions makes the field unconditional), and if
    /// both declarations are entity-valued, the incoming nested direct selections merge
    /// recursively into the existing nested scope.
    ///
    /// # Preconditions
    /// When recursing into nested scopes, both nested selection sets must still own direct
    /// selections; a merged-only nested scope here means the tree builder fed a synthesized
    /// scope back into the document walk.
    pub fn merge_in_field(&mut self, field: Field) {
        match self.fields.entry(field.response_key().clone()) {
            Entry::Vacant(entry) => {
                entry.insert(field);
            }
            Entry::Occupied(entry) => {
                let existing = entry.into_mut();
                existing.inclusion_conditions = AnyOf::or(
                    existing.inclusion_conditions.take(),
                    field.inclusion_conditions.as_ref(),
                );
                if let Some(incoming) = field.selection_set {
                    if let Some(existing_set) = existing.selection_set.as_mut() {
                        existing_set.direct_mut().merge_in(direct_for_merge(&incoming));
                    }
                }
            }
        }
    }

    /// Merges one type-conditional branch into this scope.
    ///
    /// An existing branch for the same key absorbs the incoming branch's direct selections
    /// recursively; otherwise the branch is inserted as-is.
    pub fn merge_in_inline_fragment(&mut self, branch: SelectionSet) {
        // TODO: keying on the terminal type alone collapses branches that differ only in their
        // accumulated inclusion conditions; the key should carry those conditions as well.
        let key = ScopeCondition::for_type(branch.type_info().type_path().terminal().ty().clone());
        match self.inline_fragments.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(branch);
            }
            Entry::Occupied(entry) => {
                entry.into_mut().direct_mut().merge_in(direct_for_merge(&branch));
            }
        }
    }

    /// Merges one fragment spread into this scope. Spreads with equal keys are
    /// interchangeable, so a repeat changes nothing; the first occurrence fixes the position.
    pub fn merge_in_fragment_spread(&mut self, spread: FragmentSpread) {
        self.fragment_spreads.entry(spread.key()).or_insert(spread);
    }

    pub fn merge_in_fields(&mut self, fields: impl IntoIterator<Item = Field>) {
        for field in fields {
            self.merge_in_field(field);
        }
    }

    pub fn merge_in_inline_fragments(&mut self, branches: impl IntoIterator<Item = SelectionSet>) {
        for branch in branches {
            self.merge_in_inline_fragment(branch);
        }
    }

    pub fn merge_in_fragment_spreads(
        &mut self,
        spreads: impl IntoIterator<Item = FragmentSpread>,
    ) {
        for spread in spreads {
            self.merge_in_fragment_spread(spread);
        }
    }

    /// Merges every selection of another scope into this one.
    pub fn merge_in(&mut self, other: &Self) {
        self.merge_in_fields(other.fields.values().cloned());
        self.merge_in_inline_fragments(other.inline_fragments.values().cloned());
        self.merge_in_fragment_spreads(other.fragment_spreads.values().cloned());
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

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
            && self.inline_fragments.is_empty()
            && self.fragment_spreads.is_empty()
    }

    /// The nested scope of an entity-valued field, for the builder's walk into it. `None` when
    /// the key is absent or names a leaf field.
    pub fn field_selection_set_mut(&mut self, response_key: &Name) -> Option<&mut SelectionSet> {
        self.fields.get_mut(response_key)?.selection_set.as_mut()
    }

    pub fn inline_fragment_mut(&mut self, condition: &ScopeCondition) -> Option<&mut SelectionSet> {
        self.inline_fragments.get_mut(condition)
    }
}

fn direct_for_merge(selection_set: &SelectionSet) -> &DirectSelections {
    match selection_set.direct() {
        Some(view) => view,
        None => panic!(
            "selection set for {} has no direct selections to merge",
            selection_set.type_info().type_path()
        ),
    }
}

/// Shared read-only projection of a scope's [`DirectSelections`], handed to merged-selection
/// computation and the renderer.
///
/// The builder mutates the underlying selections through [`SelectionSet::direct_mut`] while the
/// scope is being walked; once merged selections bind to this view, the projection they shadow
/// against must not change.
#[derive(Debug, Clone, Eq, Serialize)]
pub struct DirectSelectionsView(Arc<DirectSelections>);

impl DirectSelectionsView {
    pub(crate) fn new(selections: DirectSelections) -> Self {
        Self(Arc::new(selections))
    }

    pub(crate) fn make_mut(&mut self) -> &mut DirectSelections {
        Arc::make_mut(&mut self.0)
    }
}

impl Deref for DirectSelectionsView {
    type Target = DirectSelections;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq for DirectSelectionsView {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}
