//! The selection state of one type scope, split the way code generation consumes it: the
//! selections the document author wrote at the scope ([`DirectSelections`]) and the selections
//! the scope inherits from fragment spreads and enclosing scopes ([`MergedSelections`]).
//!
//! The entity-tree builder drives everything here in a fixed, document-derived order and on one
//! thread: it populates a scope's direct selections first, then freezes them and absorbs each
//! contributing source into the merged selections. Scopes complete bottom-up, so a scope's
//! nested scopes are done merging before the scope itself freezes.

use std::fmt;
use std::sync::Arc;
use std::sync::OnceLock;

use apollo_compiler::Name;
use apollo_compiler::collections::IndexMap;
use itertools::Itertools;
use serde::Serialize;

use crate::display_helpers::State;
use crate::inclusion::AnyOf;
use crate::scope::ScopeCondition;
use crate::scope::TypeInfo;

mod direct;
mod merged;

pub use direct::DirectSelections;
pub use direct::DirectSelectionsView;
pub use merged::MergedSelections;
pub use merged::MergedSource;
pub use merged::ScopeSelections;

/// A field's argument list, pre-rendered by the document walk into one canonical string (named
/// arguments in a fixed order, variables by name). Two declarations of the same field carry
/// equal signatures in a validated document, so comparison here is a plain string comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ArgumentSignature(Arc<str>);

impl ArgumentSignature {
    pub fn new(rendered: impl Into<Arc<str>>) -> Self {
        Self(rendered.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArgumentSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One requested response field: scalar, or entity-valued with a nested selection set of its
/// own. The inclusion conditions accumulate alternatives as duplicate declarations of the same
/// key are merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub(crate) name: Name,
    pub(crate) alias: Option<Name>,
    pub(crate) arguments: Option<ArgumentSignature>,
    #[serde(serialize_with = "crate::utils::serde_bridge::serialize_optional_any_of")]
    pub(crate) inclusion_conditions: Option<AnyOf>,
    pub(crate) selection_set: Option<SelectionSet>,
}

impl Field {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            alias: None,
            arguments: None,
            inclusion_conditions: None,
            selection_set: None,
        }
    }

    pub fn with_alias(mut self, alias: Name) -> Self {
        self.alias = Some(alias);
        self
    }

    pub fn with_arguments(mut self, arguments: ArgumentSignature) -> Self {
        self.arguments = Some(arguments);
        self
    }

    pub fn with_inclusion_conditions(mut self, conditions: AnyOf) -> Self {
        self.inclusion_conditions = Some(conditions);
        self
    }

    pub fn with_selection_set(mut self, selection_set: SelectionSet) -> Self {
        self.selection_set = Some(selection_set);
        self
    }

    /// The key this field occupies in a response object: its alias if one was given, its name
    /// otherwise. Selection maps key fields by this.
    pub fn response_key(&self) -> &Name {
        self.alias.as_ref().unwrap_or(&self.name)
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn alias(&self) -> Option<&Name> {
        self.alias.as_ref()
    }

    pub fn arguments(&self) -> Option<&ArgumentSignature> {
        self.arguments.as_ref()
    }

    /// `None` means the field is included unconditionally.
    pub fn inclusion_conditions(&self) -> Option<&AnyOf> {
        self.inclusion_conditions.as_ref()
    }

    pub fn selection_set(&self) -> Option<&SelectionSet> {
        self.selection_set.as_ref()
    }

    pub fn is_entity_field(&self) -> bool {
        self.selection_set.is_some()
    }

    fn write_indented(&self, state: &mut State<'_, '_>) -> fmt::Result {
        if let Some(alias) = &self.alias {
            write!(state, "{alias}: ")?;
        }
        state.write(&self.name)?;
        if let Some(arguments) = &self.arguments {
            write!(state, "({arguments})")?;
        }
        if let Some(conditions) = &self.inclusion_conditions {
            write!(state, " if {conditions}")?;
        }
        if let Some(selection_set) = &self.selection_set {
            state.write(" ")?;
            selection_set.write_indented(state)?;
        }
        Ok(())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(&mut State::new(f))
    }
}

/// A named fragment definition: its name and the selection tree authored at its root. Shared
/// read-only through an [`Arc`] by every scope that spreads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedFragment {
    name: Name,
    selection_set: SelectionSet,
}

impl NamedFragment {
    pub fn new(name: Name, selection_set: SelectionSet) -> Self {
        Self {
            name,
            selection_set,
        }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    /// The type the fragment is declared `on`; the root scope of its selection tree.
    pub fn type_condition(&self) -> &Name {
        self.selection_set.type_info().parent_type()
    }

    pub fn selection_set(&self) -> &SelectionSet {
        &self.selection_set
    }
}

/// One `...Name` occurrence. The underlying fragment definition is referenced, never copied;
/// spreads of the same fragment under the same conditions are interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FragmentSpread {
    #[serde(serialize_with = "crate::utils::serde_bridge::serialize_fragment_by_name")]
    pub(crate) fragment: Arc<NamedFragment>,
    #[serde(serialize_with = "crate::utils::serde_bridge::serialize_optional_any_of")]
    pub(crate) inclusion_conditions: Option<AnyOf>,
}

impl FragmentSpread {
    pub fn new(fragment: Arc<NamedFragment>) -> Self {
        Self {
            fragment,
            inclusion_conditions: None,
        }
    }

    pub fn with_inclusion_conditions(mut self, conditions: AnyOf) -> Self {
        self.inclusion_conditions = Some(conditions);
        self
    }

    pub fn fragment(&self) -> &Arc<NamedFragment> {
        &self.fragment
    }

    pub fn inclusion_conditions(&self) -> Option<&AnyOf> {
        self.inclusion_conditions.as_ref()
    }

    /// The identity this spread occupies in a selection map.
    pub fn key(&self) -> SpreadKey {
        SpreadKey {
            fragment_name: self.fragment.name.clone(),
            inclusion_conditions: self.inclusion_conditions.clone(),
        }
    }
}

impl fmt::Display for FragmentSpread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "...{}", self.fragment.name)?;
        if let Some(conditions) = &self.inclusion_conditions {
            write!(f, " if {conditions}")?;
        }
        Ok(())
    }
}

/// Map key for fragment spreads: the fragment's name plus the conditions of the spread. The
/// same fragment spread under different conditions stays a distinct selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpreadKey {
    fragment_name: Name,
    inclusion_conditions: Option<AnyOf>,
}

impl SpreadKey {
    pub fn new(fragment_name: Name, inclusion_conditions: Option<AnyOf>) -> Self {
        Self {
            fragment_name,
            inclusion_conditions,
        }
    }

    pub fn fragment_name(&self) -> &Name {
        &self.fragment_name
    }

    pub fn inclusion_conditions(&self) -> Option<&AnyOf> {
        self.inclusion_conditions.as_ref()
    }
}

impl fmt::Display for SpreadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "...{}", self.fragment_name)?;
        if let Some(conditions) = &self.inclusion_conditions {
            write!(f, " if {conditions}")?;
        }
        Ok(())
    }
}

/// The full selection state of one type scope.
///
/// A scope built from the document owns direct selections, mutable through
/// [`Self::direct_mut`] while the builder walks the scope. Scopes synthesized during merging
/// ([`Self::merged_only`]) have none. Merged selections are bound lazily: the first access
/// through [`Self::merged`] or [`Self::merged_mut`] captures the direct selections as the
/// shadow set, and the builder must be done adding direct selections to the scope by then.
#[derive(Debug, Clone, Serialize)]
pub struct SelectionSet {
    type_info: TypeInfo,
    direct: Option<DirectSelectionsView>,
    #[serde(serialize_with = "crate::utils::serde_bridge::serialize_once_lock")]
    merged: OnceLock<MergedSelections>,
}

impl SelectionSet {
    /// A scope authored in the document, starting with empty direct selections.
    pub fn new(type_info: TypeInfo) -> Self {
        Self {
            type_info,
            direct: Some(DirectSelectionsView::new(DirectSelections::new())),
            merged: OnceLock::new(),
        }
    }

    /// A scope that exists only because selections were merged into it; it has no direct
    /// selections and shadows nothing.
    pub fn merged_only(type_info: TypeInfo) -> Self {
        Self {
            type_info,
            direct: None,
            merged: OnceLock::new(),
        }
    }

    pub fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    pub fn direct(&self) -> Option<&DirectSelectionsView> {
        self.direct.as_ref()
    }

    /// Mutable access to the direct selections, for the builder's walk of this scope.
    ///
    /// # Preconditions
    /// The scope must own direct selections, and its merged selections must not have been
    /// bound yet. Mutating the direct selections after binding leaves the merged view
    /// shadowing against a stale projection; that is a bug in the tree builder, not a
    /// condition this layer detects.
    pub fn direct_mut(&mut self) -> &mut DirectSelections {
        match &mut self.direct {
            Some(view) => view.make_mut(),
            None => panic!(
                "selection set for {} is merged-only and has no direct selections",
                self.type_info.type_path()
            ),
        }
    }

    /// The selections this scope inherits. The first access binds them to the scope's direct
    /// selections as they stand.
    pub fn merged(&self) -> &MergedSelections {
        self.merged
            .get_or_init(|| MergedSelections::new(self.type_info.clone(), self.direct.clone()))
    }

    /// Mutable access to the merged selections, for absorbing contributing sources. Binds them
    /// on first use, like [`Self::merged`].
    pub fn merged_mut(&mut self) -> &mut MergedSelections {
        self.merged();
        self.merged
            .get_mut()
            .expect("merged selections were just bound")
    }

    /// Every field this scope exposes: direct first, then merged. Merged selections never
    /// repeat a direct key, so the chain is already deduplicated.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.direct
            .as_deref()
            .into_iter()
            .flat_map(|direct| direct.fields().values())
            .chain(self.merged().fields().values())
    }

    /// Every conditional branch this scope exposes, direct first.
    pub fn inline_fragments(&self) -> impl Iterator<Item = (&ScopeCondition, &SelectionSet)> {
        self.direct
            .as_deref()
            .into_iter()
            .flat_map(|direct| direct.inline_fragments().iter())
            .chain(self.merged().inline_fragments().iter())
    }

    /// Every fragment spread this scope exposes, direct first.
    pub fn fragment_spreads(&self) -> impl Iterator<Item = &FragmentSpread> {
        self.direct
            .as_deref()
            .into_iter()
            .flat_map(|direct| direct.fragment_spreads().values())
            .chain(self.merged().fragment_spreads().values())
    }

    fn write_indented(&self, state: &mut State<'_, '_>) -> fmt::Result {
        write!(state, "{} {{", self.type_info)?;
        state.indent_no_new_line();
        if let Some(direct) = self.direct.as_deref() {
            state.new_line()?;
            state.write("direct {")?;
            state.indent_no_new_line();
            write_selections(
                state,
                direct.fields(),
                direct.inline_fragments(),
                direct.fragment_spreads(),
            )?;
            state.dedent()?;
            state.write("}")?;
        }
        let merged = self.merged();
        state.new_line()?;
        state.write("merged {")?;
        state.indent_no_new_line();
        write_selections(
            state,
            merged.fields(),
            merged.inline_fragments(),
            merged.fragment_spreads(),
        )?;
        if !merged.merged_sources().is_empty() {
            state.new_line()?;
            write!(
                state,
                "sources: [{}]",
                merged.merged_sources().iter().format(", ")
            )?;
        }
        state.dedent()?;
        state.write("}")?;
        state.dedent()?;
        state.write("}")
    }
}

// Compares the scope identity and the authored selections; lazily bound merged state is not
// part of a scope's identity.
impl PartialEq for SelectionSet {
    fn eq(&self, other: &Self) -> bool {
        self.type_info == other.type_info && self.direct == other.direct
    }
}

impl Eq for SelectionSet {}

impl fmt::Display for SelectionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(&mut State::new(f))
    }
}

fn write_selections(
    state: &mut State<'_, '_>,
    fields: &IndexMap<Name, Field>,
    inline_fragments: &IndexMap<ScopeCondition, SelectionSet>,
    fragment_spreads: &IndexMap<SpreadKey, FragmentSpread>,
) -> fmt::Result {
    for field in fields.values() {
        state.new_line()?;
        field.write_indented(state)?;
    }
    for (condition, selection_set) in inline_fragments {
        state.new_line()?;
        write!(state, "{condition} ")?;
        selection_set.write_indented(state)?;
    }
    for spread in fragment_spreads.values() {
        state.new_line()?;
        state.write(spread)?;
    }
    Ok(())
}
