//! This module contains functions used to bridge the IR types' display forms with serialization
//! with serde, keeping logged snapshots compact and their map keys JSON-safe.

use std::fmt::Display;
use std::sync::Arc;
use std::sync::OnceLock;

use apollo_compiler::collections::IndexMap;
use serde::Serialize;
use serde::Serializer;

use crate::inclusion::AnyOf;
use crate::scope::ResponsePath;
use crate::scope::TypePath;
use crate::selections::NamedFragment;

pub(crate) fn serialize_optional_any_of<S: Serializer>(
    conditions: &Option<AnyOf>,
    ser: S,
) -> Result<S::Ok, S::Error> {
    match conditions {
        Some(conditions) => ser.collect_str(conditions),
        None => ser.serialize_none(),
    }
}

pub(crate) fn serialize_response_path<S: Serializer>(
    path: &ResponsePath,
    ser: S,
) -> Result<S::Ok, S::Error> {
    ser.collect_str(path)
}

pub(crate) fn serialize_type_path<S: Serializer>(
    path: &TypePath,
    ser: S,
) -> Result<S::Ok, S::Error> {
    ser.collect_str(path)
}

pub(crate) fn serialize_fragment_by_name<S: Serializer>(
    fragment: &Arc<NamedFragment>,
    ser: S,
) -> Result<S::Ok, S::Error> {
    ser.collect_str(fragment.name())
}

/// Maps keyed by compound keys serialize through each key's `Display` form; serde_json rejects
/// non-string map keys.
pub(crate) fn serialize_display_keyed_map<S: Serializer, K: Display, V: Serialize>(
    map: &IndexMap<K, V>,
    ser: S,
) -> Result<S::Ok, S::Error> {
    ser.collect_map(map.iter().map(|(key, value)| (key.to_string(), value)))
}

pub(crate) fn serialize_once_lock<S: Serializer, T: Serialize>(
    lock: &OnceLock<T>,
    ser: S,
) -> Result<S::Ok, S::Error> {
    match lock.get() {
        Some(value) => ser.serialize_some(value),
        None => ser.serialize_none(),
    }
}
