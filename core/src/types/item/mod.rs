use crate::types::key::ObjectPath;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Descriptive fields attached to a trashed group, keyed in lower case.
pub type Metadata = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Book,
    App,
    TeacherMaterial,
}

impl ItemType {
    /// Metadata fields that carry meaning for this variant, in label order.
    pub fn label_fields(self) -> &'static [&'static str] {
        match self {
            ItemType::Book => &["publisher", "book_name"],
            ItemType::App => &["platform", "version"],
            ItemType::TeacherMaterial => &["publisher", "material_name"],
        }
    }

    /// Human label for audit records and listings. Falls back to the path when
    /// none of the variant's fields are present.
    pub fn label(self, metadata: &Metadata, path: &ObjectPath) -> String {
        let parts: Vec<&str> = self
            .label_fields()
            .iter()
            .filter_map(|field| metadata.get(*field))
            .map(String::as_str)
            .filter(|value| !value.is_empty())
            .collect();

        if parts.is_empty() {
            path.to_string()
        } else {
            parts.join(" / ")
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemType::Book => write!(f, "book"),
            ItemType::App => write!(f, "app"),
            ItemType::TeacherMaterial => write!(f, "teacher_material"),
        }
    }
}

/// Folds upstream metadata into one casing per key.
///
/// Upstream sends both `publisher` and `Publisher`; when both are present the
/// already-lower-case spelling wins.
pub fn canonicalize_metadata(raw: HashMap<String, String>) -> Metadata {
    let mut canonical = Metadata::new();
    let mut exact = Vec::new();

    for (key, value) in raw {
        let lowered = key.trim().to_ascii_lowercase();
        if lowered.is_empty() {
            continue;
        }
        if lowered == key {
            exact.push((lowered, value));
        } else {
            canonical.entry(lowered).or_insert(value);
        }
    }

    canonical.extend(exact);
    canonical
}
