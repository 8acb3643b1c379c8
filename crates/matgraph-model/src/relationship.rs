//! Relationship groups and items.
//!
//! Canonical group shape:
//!
//! ```yaml
//! contaminated_by:
//!   presentation: card
//!   items:
//!     - id: rust-oxidation-contamination
//!       type: contaminants
//!   _section:
//!     title: Common Contaminants
//!     icon: droplet
//!     order: 1
//!     variant: default
//! ```
//!
//! `presentation` and `_section` are group-level; items never carry them.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::domain::Domain;

pub const SECTION_KEY: &str = "_section";
pub const PRESENTATION_KEY: &str = "presentation";
pub const ITEMS_KEY: &str = "items";
pub const ITEM_ID_KEY: &str = "id";
pub const ITEM_TYPE_KEY: &str = "type";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presentation {
    #[default]
    Card,
    Table,
    Descriptive,
}

impl Presentation {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "card" | "cards" => Some(Self::Card),
            "table" => Some(Self::Table),
            "descriptive" | "description" | "narrative" => Some(Self::Descriptive),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Table => "table",
            Self::Descriptive => "descriptive",
        }
    }
}

/// Display-only metadata, attached once per relationship group.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SectionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(flatten)]
    pub extra: Mapping,
}

impl SectionMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.icon.is_none()
            && self.order.is_none()
            && self.variant.is_none()
            && self.extra.is_empty()
    }

    /// Field-by-field merge: existing values win, gaps are filled from `defaults`.
    pub fn filled_from(&self, defaults: &SectionMetadata) -> SectionMetadata {
        let mut extra = self.extra.clone();
        for (k, v) in &defaults.extra {
            if !extra.contains_key(k) {
                extra.insert(k.clone(), v.clone());
            }
        }
        SectionMetadata {
            title: self.title.clone().or_else(|| defaults.title.clone()),
            icon: self.icon.clone().or_else(|| defaults.icon.clone()),
            order: self.order.or(defaults.order),
            variant: self.variant.clone().or_else(|| defaults.variant.clone()),
            extra,
        }
    }
}

/// One edge inside a relationship group.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RelationshipItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<Mapping>,
    #[serde(flatten)]
    pub extra: Mapping,
}

impl RelationshipItem {
    pub fn reference(id: impl Into<String>, domain: Domain) -> Self {
        Self {
            id: Some(id.into()),
            item_type: Some(domain.tag().to_string()),
            overrides: None,
            extra: Mapping::new(),
        }
    }

    pub fn target_domain(&self) -> Option<Domain> {
        self.item_type.as_deref().and_then(Domain::from_tag)
    }
}

/// A canonical relationship group.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RelationshipGroup {
    pub presentation: Presentation,
    #[serde(default)]
    pub items: Vec<RelationshipItem>,
    #[serde(rename = "_section", default, skip_serializing_if = "Option::is_none")]
    pub section: Option<SectionMetadata>,
    /// Other group-level fields (e.g. a narrative `description`) are preserved.
    #[serde(flatten)]
    pub extra: Mapping,
}

impl RelationshipGroup {
    pub fn new(presentation: Presentation, section: Option<SectionMetadata>) -> Self {
        Self {
            presentation,
            items: Vec::new(),
            section,
            extra: Mapping::new(),
        }
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.items.iter().any(|i| i.id.as_deref() == Some(id))
    }

    pub fn to_value(&self) -> Result<Value, serde_yaml::Error> {
        serde_yaml::to_value(self)
    }
}

/// Whether a raw group value already has the canonical wrapper:
/// a valid `presentation`, an `items` list, and a `_section` mapping.
pub fn is_canonical_group(v: &Value) -> bool {
    let Some(m) = v.as_mapping() else {
        return false;
    };
    let presentation_ok = m
        .get(PRESENTATION_KEY)
        .and_then(Value::as_str)
        .and_then(Presentation::parse)
        .is_some();
    let items_ok = m.get(ITEMS_KEY).map(Value::is_sequence).unwrap_or(false);
    let section_ok = m.get(SECTION_KEY).map(Value::is_mapping).unwrap_or(false);
    let items_clean = m
        .get(ITEMS_KEY)
        .and_then(Value::as_sequence)
        .map(|items| {
            items.iter().all(|i| {
                i.as_mapping()
                    .map(|im| !im.contains_key(PRESENTATION_KEY) && !im.contains_key(SECTION_KEY))
                    .unwrap_or(false)
            })
        })
        .unwrap_or(false);
    presentation_ok && items_ok && section_ok && items_clean
}

/// Whether a mapping is a group wrapper rather than a single unwrapped item.
///
/// A mapping with `items` is always a wrapper. Without `items`, a mapping that
/// carries an `id` is an item (its `presentation`/`_section` are misplaced
/// group fields); otherwise `presentation` or `_section` marks a wrapper.
pub fn is_group_wrapper(m: &Mapping) -> bool {
    m.contains_key(ITEMS_KEY)
        || (!m.contains_key(ITEM_ID_KEY)
            && (m.contains_key(PRESENTATION_KEY) || m.contains_key(SECTION_KEY)))
}

/// Item values of a group in any of the accepted shapes (canonical wrapper,
/// bare list, or a single unwrapped mapping).
pub fn group_item_values(v: &Value) -> Vec<&Value> {
    match v {
        Value::Sequence(items) => items.iter().collect(),
        Value::Mapping(m) if is_group_wrapper(m) => match m.get(ITEMS_KEY) {
            Some(Value::Sequence(items)) => items.iter().collect(),
            _ => Vec::new(),
        },
        Value::Mapping(_) => vec![v],
        _ => Vec::new(),
    }
}

/// `(id, type)` of a raw item value, when it is a reference.
///
/// A bare string item in a legacy list is an untyped reference to that id.
pub fn item_reference(v: &Value) -> Option<(&str, Option<&str>)> {
    match v {
        Value::String(id) => Some((id.as_str(), None)),
        Value::Mapping(m) => {
            let id = m.get(ITEM_ID_KEY).and_then(Value::as_str)?;
            Some((id, m.get(ITEM_TYPE_KEY).and_then(Value::as_str)))
        }
        _ => None,
    }
}
