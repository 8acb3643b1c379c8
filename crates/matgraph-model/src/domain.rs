//! The fixed set of entity domains.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One of the five entity kinds stored in the knowledge base.
///
/// The set is closed: adding a domain is a code change, not a data change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Domain {
    #[serde(rename = "materials")]
    Material,
    #[serde(rename = "contaminants")]
    Contaminant,
    #[serde(rename = "compounds")]
    Compound,
    #[serde(rename = "settings")]
    Setting,
    #[serde(rename = "applications")]
    Application,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown domain `{0}` (expected materials|contaminants|compounds|settings|applications)")]
pub struct UnknownDomain(pub String);

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::Material,
        Domain::Contaminant,
        Domain::Compound,
        Domain::Setting,
        Domain::Application,
    ];

    /// Tag used in `RelationshipItem.type` and as the default document root key.
    pub fn tag(self) -> &'static str {
        match self {
            Domain::Material => "materials",
            Domain::Contaminant => "contaminants",
            Domain::Compound => "compounds",
            Domain::Setting => "settings",
            Domain::Application => "applications",
        }
    }

    /// Mandatory ID suffix for every entity key in this domain.
    pub fn suffix(self) -> &'static str {
        match self {
            Domain::Material => "-laser-cleaning",
            Domain::Contaminant => "-contamination",
            Domain::Compound => "-compound",
            Domain::Setting => "-settings",
            Domain::Application => "-applications",
        }
    }

    pub fn default_file_name(self) -> String {
        format!("{}.yaml", self.tag())
    }

    pub fn has_suffix(self, key: &str) -> bool {
        key.ends_with(self.suffix())
    }

    /// Resolve a relationship-item `type` tag to a domain.
    ///
    /// Accepts the plural tag, the singular form, and a few curator spellings
    /// seen in content (`contamination`, `setting`). Case-insensitive.
    pub fn from_tag(tag: &str) -> Option<Domain> {
        let norm = tag.trim().to_ascii_lowercase().replace('-', "_");
        match norm.as_str() {
            "materials" | "material" => Some(Domain::Material),
            "contaminants" | "contaminant" | "contamination" | "contaminations" => {
                Some(Domain::Contaminant)
            }
            "compounds" | "compound" => Some(Domain::Compound),
            "settings" | "setting" | "process_settings" | "process_setting" => {
                Some(Domain::Setting)
            }
            "applications" | "application" => Some(Domain::Application),
            _ => None,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Domain {
    type Err = UnknownDomain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Domain::from_tag(s).ok_or_else(|| UnknownDomain(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singular_and_plural_tags_resolve_to_the_same_domain() {
        assert_eq!(Domain::from_tag("material"), Some(Domain::Material));
        assert_eq!(Domain::from_tag("Materials"), Some(Domain::Material));
        assert_eq!(Domain::from_tag("contamination"), Some(Domain::Contaminant));
        assert_eq!(Domain::from_tag("process-settings"), Some(Domain::Setting));
        assert_eq!(Domain::from_tag("alloys"), None);
    }

    #[test]
    fn every_domain_round_trips_through_its_tag() {
        for d in Domain::ALL {
            assert_eq!(d.tag().parse::<Domain>(), Ok(d));
        }
    }

    #[test]
    fn suffixes_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for d in Domain::ALL {
            assert!(seen.insert(d.suffix()), "duplicate suffix {}", d.suffix());
        }
    }
}
