//! Intermediate representation of GraphQL operations for typed code generation.
//!
//! Code generation wants two views of every selection set: what the document author wrote at a
//! scope, and what the scope additionally picks up from named fragments and enclosing scopes.
//! This crate models both views along with the merge rules between them. Directly declared
//! selections always win over merged ones, and duplicate declarations of the same selection
//! union their `@include`/`@skip` conditions instead of discarding either side.
//!
//! The entry point is [`selections::SelectionSet`]. The [`scope`] module holds the identities
//! selection sets attach to, and [`inclusion`] the condition algebra the merge rules operate
//! on.

#![warn(
    rustdoc::broken_intra_doc_links,
    unreachable_pub,
    unreachable_patterns,
    unused,
    unused_qualifications,
    dead_code,
    while_true,
    unconditional_panic,
    clippy::all
)]

mod display_helpers;
pub mod inclusion;
pub mod scope;
pub mod selections;
pub(crate) mod utils;
