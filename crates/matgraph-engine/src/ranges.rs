//! Category range registry.
//!
//! Numeric bounds live here and only here: one `{min, max, unit}` per
//! (category, property). Entity records carry single values; a `min`/`max`
//! inside an entity is a structural violation.
//!
//! Document shape (`category_ranges.yaml`):
//!
//! ```yaml
//! categories:
//!   metal:
//!     label: Metals          # preserved on write-back
//!     category_ranges:
//!       thermalConductivity: { min: 7.98, max: 421.05, unit: W/(m·K) }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use matgraph_model::entity::{as_number, str_key};
use matgraph_model::{Domain, EntityView, Finding};
use matgraph_store::{read_yaml_document, write_document_atomic, DocumentStore, StoreError};

use crate::error::RangeRegistryError;

const CATEGORIES_KEY: &str = "categories";
const CATEGORY_RANGES_KEY: &str = "category_ranges";

/// Outward buffer applied to observed bounds, as a fraction of magnitude.
pub const RANGE_BUFFER: f64 = 0.05;
const ROUND_SCALE: f64 = 1_000_000.0;

/// `{property: {min, max, ..}}` written directly under a category.
fn is_bare_range_map(m: &Mapping) -> bool {
    !m.contains_key(CATEGORY_RANGES_KEY)
        && !m.is_empty()
        && m.values()
            .all(|v| v.as_mapping().is_some_and(|r| r.contains_key("min")))
}

/// Domains whose entities are bound by category ranges.
pub const RANGED_DOMAINS: [Domain; 1] = [Domain::Material];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRange {
    pub min: f64,
    pub max: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl CategoryRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    fn to_value(&self) -> Value {
        let mut m = Mapping::new();
        m.insert("min".into(), self.min.into());
        m.insert("max".into(), self.max.into());
        if let Some(unit) = &self.unit {
            m.insert("unit".into(), unit.as_str().into());
        }
        Value::Mapping(m)
    }
}

fn round6(x: f64) -> f64 {
    (x * ROUND_SCALE).round() / ROUND_SCALE
}

/// Bounds from observed samples, buffered outward by 5% of each bound's
/// magnitude and rounded to six decimals.
///
/// Non-finite samples are ignored; returns `None` when nothing is left.
pub fn compute_range_from_samples(samples: &[f64], unit: Option<&str>) -> Option<CategoryRange> {
    let mut finite = samples.iter().copied().filter(|v| v.is_finite());
    let first = finite.next()?;
    let (lo, hi) = finite.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    Some(CategoryRange {
        min: round6(lo - lo.abs() * RANGE_BUFFER),
        max: round6(hi + hi.abs() * RANGE_BUFFER),
        unit: unit.map(str::to_string),
    })
}

/// Samples of one (category, property) pair, with the units they came in.
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    values: Vec<f64>,
    units: BTreeMap<String, usize>,
}

impl SampleSet {
    pub fn push(&mut self, value: f64, unit: Option<&str>) {
        self.values.push(value);
        if let Some(u) = unit.map(str::trim).filter(|u| !u.is_empty()) {
            *self.units.entry(u.to_string()).or_default() += 1;
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Most frequent unit; ties go to the lexicographically first.
    pub fn dominant_unit(&self) -> Option<&str> {
        let mut best: Option<(&str, usize)> = None;
        for (unit, &n) in &self.units {
            if best.map(|(_, b)| n > b).unwrap_or(true) {
                best = Some((unit.as_str(), n));
            }
        }
        best.map(|(u, _)| u)
    }

    pub fn units_disagree(&self) -> bool {
        self.units.len() > 1
    }

    pub fn units(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }

    pub fn range(&self) -> Option<CategoryRange> {
        compute_range_from_samples(&self.values, self.dominant_unit())
    }
}

/// Per-category range coverage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCoverage {
    /// Numeric properties used by at least one entity of the category.
    pub referenced: usize,
    /// Ranges present in the registry for the category.
    pub registered: usize,
    /// Referenced properties without a range.
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RangeValidation {
    pub findings: Vec<Finding>,
    pub coverage: BTreeMap<String, CategoryCoverage>,
}

#[derive(Debug, Clone)]
pub struct RangeRebuild {
    pub registry: CategoryRangeRegistry,
    pub findings: Vec<Finding>,
    /// Number of samples each (category, property) range was computed from.
    pub sample_counts: BTreeMap<(String, String), usize>,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryRangeRegistry {
    ranges: BTreeMap<String, BTreeMap<String, CategoryRange>>,
    /// Document as loaded, so write-back keeps labels and other fields.
    source: Value,
    path: Option<PathBuf>,
}

impl CategoryRangeRegistry {
    pub fn load(path: &Path) -> Result<Self, RangeRegistryError> {
        let (_, value) = read_yaml_document(path)?;
        let mut reg = Self::from_value(value)?;
        reg.path = Some(path.to_path_buf());
        tracing::info!(
            path = %path.display(),
            categories = reg.ranges.len(),
            ranges = reg.len(),
            "loaded category ranges"
        );
        Ok(reg)
    }

    /// Like [`CategoryRangeRegistry::load`], but a missing file is an empty registry.
    pub fn load_or_empty(path: &Path) -> Result<Self, RangeRegistryError> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "category range document not found; starting empty");
            return Ok(Self {
                path: Some(path.to_path_buf()),
                ..Self::default()
            });
        }
        Self::load(path)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, RangeRegistryError> {
        let value: Value = serde_yaml::from_str(text).map_err(RangeRegistryError::Parse)?;
        Self::from_value(value)
    }

    fn from_value(value: Value) -> Result<Self, RangeRegistryError> {
        let mut ranges = BTreeMap::new();
        let cats = value
            .as_mapping()
            .and_then(|m| m.get(CATEGORIES_KEY))
            .and_then(Value::as_mapping);
        for (ck, cv) in cats.into_iter().flatten() {
            let Some(category) = str_key(ck) else {
                continue;
            };
            // Accept both `{category_ranges: {..}}` and a bare property map.
            let props = match cv.as_mapping() {
                Some(m) => m
                    .get(CATEGORY_RANGES_KEY)
                    .and_then(Value::as_mapping)
                    .unwrap_or(m),
                None => continue,
            };
            let mut entry = BTreeMap::new();
            for (pk, pv) in props {
                let (Some(property), Some(pm)) = (str_key(pk), pv.as_mapping()) else {
                    continue;
                };
                let (Some(min), Some(max)) = (
                    pm.get("min").and_then(as_number),
                    pm.get("max").and_then(as_number),
                ) else {
                    continue;
                };
                if min > max {
                    return Err(RangeRegistryError::Inverted {
                        category: category.to_string(),
                        property: property.to_string(),
                        min,
                        max,
                    });
                }
                let unit = pm.get("unit").and_then(Value::as_str).map(str::to_string);
                entry.insert(property.to_string(), CategoryRange { min, max, unit });
            }
            if !entry.is_empty() {
                ranges.insert(category.to_string(), entry);
            }
        }
        Ok(Self {
            ranges,
            source: value,
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.ranges.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.ranges.keys().map(String::as_str)
    }

    pub fn ranges_in(&self, category: &str) -> Option<&BTreeMap<String, CategoryRange>> {
        self.ranges.get(category)
    }

    pub fn range_for(&self, category: &str, property: &str) -> Option<&CategoryRange> {
        self.ranges.get(category)?.get(property)
    }

    pub fn set_range(&mut self, category: &str, property: &str, range: CategoryRange) {
        self.ranges
            .entry(category.to_string())
            .or_default()
            .insert(property.to_string(), range);
    }

    /// Compute a fresh registry from the single values held by entities of the
    /// ranged domains. Existing document fields other than the ranges are kept.
    pub fn rebuild_from_entities(&self, store: &DocumentStore) -> RangeRebuild {
        let mut samples: BTreeMap<(String, String), SampleSet> = BTreeMap::new();
        for domain in RANGED_DOMAINS {
            let Some(doc) = store.document(domain) else {
                continue;
            };
            for entity in doc.views() {
                let Some(category) = entity.category() else {
                    continue;
                };
                for prop in entity.properties() {
                    let Some(v) = prop.record.numeric_value().filter(|v| v.is_finite()) else {
                        continue;
                    };
                    samples
                        .entry((category.to_string(), prop.name.to_string()))
                        .or_default()
                        .push(v, prop.record.unit);
                }
            }
        }

        let mut registry = Self {
            ranges: BTreeMap::new(),
            source: self.source.clone(),
            path: self.path.clone(),
        };
        let mut findings = Vec::new();
        let mut sample_counts = BTreeMap::new();
        for ((category, property), set) in samples {
            if set.units_disagree() {
                let units: Vec<&str> = set.units().collect();
                findings.push(
                    Finding::gap(
                        "inconsistent_units",
                        format!(
                            "samples for {category}.{property} use different units: {}",
                            units.join(", ")
                        ),
                    )
                    .category(category.as_str())
                    .property(property.as_str()),
                );
            }
            if let Some(range) = set.range() {
                tracing::debug!(
                    category = %category,
                    property = %property,
                    samples = set.values().len(),
                    min = range.min,
                    max = range.max,
                    "computed category range"
                );
                sample_counts.insert((category.clone(), property.clone()), set.values().len());
                registry.set_range(&category, &property, range);
            }
        }
        tracing::info!(ranges = registry.len(), "rebuilt category ranges from entity values");
        RangeRebuild {
            registry,
            findings,
            sample_counts,
        }
    }

    /// Registry document with the current ranges merged into the loaded one.
    ///
    /// Ranges absent from the registry are dropped; other category fields are
    /// kept, and a category left with nothing else is removed.
    pub fn to_document(&self) -> Value {
        let mut root = self.source.as_mapping().cloned().unwrap_or_default();
        let source_cats = root
            .get(CATEGORIES_KEY)
            .and_then(Value::as_mapping)
            .cloned()
            .unwrap_or_default();
        let mut cats = Mapping::with_capacity(source_cats.len());
        for (ck, cv) in source_cats {
            let Some(category) = str_key(&ck) else {
                cats.insert(ck, cv);
                continue;
            };
            // A bare property map holds nothing but ranges.
            let Some(mut cat) = cv.as_mapping().filter(|m| !is_bare_range_map(m)).cloned() else {
                continue;
            };
            if self.ranges.contains_key(category) {
                cats.insert(ck, Value::Mapping(cat));
                continue;
            }
            cat.remove(CATEGORY_RANGES_KEY);
            if !cat.is_empty() {
                cats.insert(ck, Value::Mapping(cat));
            }
        }
        for (category, props) in &self.ranges {
            let mut cat = cats
                .get(category.as_str())
                .and_then(Value::as_mapping)
                .cloned()
                .unwrap_or_default();
            let mut ranges = Mapping::new();
            for (property, range) in props {
                ranges.insert(property.as_str().into(), range.to_value());
            }
            cat.insert(CATEGORY_RANGES_KEY.into(), Value::Mapping(ranges));
            cats.insert(category.as_str().into(), Value::Mapping(cat));
        }
        root.insert(CATEGORIES_KEY.into(), Value::Mapping(cats));
        Value::Mapping(root)
    }

    /// Back up and atomically rewrite the registry document.
    pub fn save(&self, path: &Path, backup_dir: &Path) -> Result<Option<PathBuf>, StoreError> {
        let backup = write_document_atomic(path, &self.to_document(), backup_dir)?;
        tracing::info!(path = %path.display(), ranges = self.len(), "wrote category ranges");
        Ok(backup)
    }

    /// Check every ranged entity against the registry.
    ///
    /// - `entity_has_min_max` for ranges stored on an entity (every domain),
    /// - `missing_category` for an entity with properties but no category,
    /// - `missing_category_range` once per (category, property) without a range,
    /// - `value_out_of_range` for a value outside its category bounds.
    pub fn validate(&self, store: &DocumentStore) -> RangeValidation {
        let mut out = RangeValidation::default();

        for doc in store.documents() {
            for entity in doc.views() {
                out.findings.extend(entity_min_max_findings(doc.domain(), &entity));
            }
        }

        // (category, property) -> entity keys using it
        let mut referenced: BTreeMap<String, BTreeMap<String, Vec<String>>> = BTreeMap::new();
        for domain in RANGED_DOMAINS {
            let Some(doc) = store.document(domain) else {
                continue;
            };
            for entity in doc.views() {
                let props = entity.properties();
                let numeric: Vec<_> = props
                    .iter()
                    .filter_map(|p| p.record.numeric_value().map(|v| (p, v)))
                    .collect();
                let Some(category) = entity.category() else {
                    if !numeric.is_empty() {
                        out.findings.push(
                            Finding::gap(
                                "missing_category",
                                "entity has numeric properties but no category",
                            )
                            .in_domain(domain)
                            .entity(entity.key()),
                        );
                    }
                    continue;
                };
                for (prop, value) in numeric {
                    referenced
                        .entry(category.to_string())
                        .or_default()
                        .entry(prop.name.to_string())
                        .or_default()
                        .push(entity.key().to_string());
                    if let Some(range) = self.range_for(category, prop.name) {
                        if !range.contains(value) {
                            out.findings.push(
                                Finding::gap(
                                    "value_out_of_range",
                                    format!(
                                        "value {value} is outside the {category} range [{}, {}]",
                                        range.min, range.max
                                    ),
                                )
                                .in_domain(domain)
                                .entity(entity.key())
                                .category(category)
                                .property(prop.name),
                            );
                        }
                    }
                }
            }
        }

        let categories: BTreeSet<&String> = referenced.keys().chain(self.ranges.keys()).collect();
        for category in categories {
            let used = referenced.get(category);
            let mut cov = CategoryCoverage {
                referenced: used.map(BTreeMap::len).unwrap_or(0),
                registered: self.ranges.get(category).map(BTreeMap::len).unwrap_or(0),
                missing: Vec::new(),
            };
            for (property, users) in used.into_iter().flatten() {
                if self.range_for(category, property).is_some() {
                    continue;
                }
                cov.missing.push(property.clone());
                out.findings.push(
                    Finding::gap(
                        "missing_category_range",
                        format!(
                            "no range for {category}.{property} ({} entit{} use it)",
                            users.len(),
                            if users.len() == 1 { "y" } else { "ies" }
                        ),
                    )
                    .in_domain(Domain::Material)
                    .category(category.as_str())
                    .property(property.as_str()),
                );
            }
            out.coverage.insert(category.clone(), cov);
        }
        out
    }
}

/// `entity_has_min_max` findings for one entity.
pub fn entity_min_max_findings(domain: Domain, entity: &EntityView<'_>) -> Vec<Finding> {
    entity
        .properties()
        .into_iter()
        .filter(|p| p.record.has_min_max())
        .map(|p| {
            let mut f = Finding::structural(
                "entity_has_min_max",
                format!(
                    "property `{}` stores min/max on the entity; ranges belong to the category",
                    p.name
                ),
            )
            .in_domain(domain)
            .entity(entity.key())
            .property(p.name);
            if let Some(c) = entity.category() {
                f = f.category(c);
            }
            f
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use matgraph_store::{DomainDocument, KnowledgeBaseConfig};

    fn store_with_materials(yaml: &str) -> DocumentStore {
        let docs = Domain::ALL.into_iter().map(|d| {
            let text = if d == Domain::Material {
                yaml.to_string()
            } else {
                format!("{}: {{}}\n", d.tag())
            };
            DomainDocument::from_yaml_str(d, Path::new(&d.default_file_name()), d.tag(), &text)
                .unwrap()
        });
        DocumentStore::from_documents(KnowledgeBaseConfig::default(), docs)
    }

    #[test]
    fn buffer_moves_bounds_outward_by_magnitude() {
        let r = compute_range_from_samples(&[15.0, 401.0, 8.4], Some("W/(m·K)")).unwrap();
        assert_relative_eq!(r.min, 7.98, epsilon = 1e-9);
        assert_relative_eq!(r.max, 421.05, epsilon = 1e-9);
        assert_eq!(r.unit.as_deref(), Some("W/(m·K)"));
    }

    #[test]
    fn negative_bounds_still_widen() {
        let r = compute_range_from_samples(&[-40.0, -10.0], None).unwrap();
        assert_relative_eq!(r.min, -42.0, epsilon = 1e-9);
        assert_relative_eq!(r.max, -9.5, epsilon = 1e-9);
    }

    #[test]
    fn single_sample_and_non_finite_values() {
        let r = compute_range_from_samples(&[f64::NAN, 10.0, f64::INFINITY], None).unwrap();
        assert_relative_eq!(r.min, 9.5, epsilon = 1e-9);
        assert_relative_eq!(r.max, 10.5, epsilon = 1e-9);
        assert!(compute_range_from_samples(&[f64::NAN], None).is_none());
        assert!(compute_range_from_samples(&[], None).is_none());
    }

    #[test]
    fn dominant_unit_wins_and_disagreement_is_flagged() {
        let mut s = SampleSet::default();
        s.push(1.0, Some("g/cm3"));
        s.push(2.0, Some("g/cm3"));
        s.push(2500.0, Some("kg/m3"));
        assert_eq!(s.dominant_unit(), Some("g/cm3"));
        assert!(s.units_disagree());
    }

    #[test]
    fn inverted_range_is_a_load_error() {
        let err = CategoryRangeRegistry::from_yaml_str(
            "categories:\n  metal:\n    category_ranges:\n      density: { min: 9, max: 1 }\n",
        )
        .unwrap_err();
        assert!(matches!(err, RangeRegistryError::Inverted { .. }));
    }

    #[test]
    fn validation_reports_min_max_missing_ranges_and_outliers() {
        let reg = CategoryRangeRegistry::from_yaml_str(
            "categories:\n  metal:\n    category_ranges:\n      density: { min: 1.0, max: 5.0, unit: g/cm3 }\n",
        )
        .unwrap();
        let store = store_with_materials(
            r#"
materials:
  aluminum-laser-cleaning:
    category: metal
    properties:
      density: { value: 2.7, unit: g/cm3 }
      hardness: { value: 3, min: 1, max: 9 }
  lead-laser-cleaning:
    category: metal
    properties:
      density: { value: 11.3, unit: g/cm3 }
  mystery-laser-cleaning:
    properties:
      density: { value: 2.0 }
"#,
        );
        let v = reg.validate(&store);
        let codes: Vec<&str> = v.findings.iter().map(|f| f.code.as_str()).collect();
        assert!(codes.contains(&"entity_has_min_max"));
        assert!(codes.contains(&"value_out_of_range"));
        assert!(codes.contains(&"missing_category"));
        assert_eq!(
            codes.iter().filter(|c| **c == "missing_category_range").count(),
            1
        );
        let cov = &v.coverage["metal"];
        assert_eq!(cov.referenced, 2);
        assert_eq!(cov.registered, 1);
        assert_eq!(cov.missing, vec!["hardness".to_string()]);
    }

    #[test]
    fn rebuild_and_write_back_preserve_other_fields() {
        let reg = CategoryRangeRegistry::from_yaml_str(
            "version: 2\ncategories:\n  metal:\n    label: Metals\n",
        )
        .unwrap();
        let store = store_with_materials(
            r#"
materials:
  a-laser-cleaning: { category: metal, properties: { thermalConductivity: { value: 15.0 } } }
  b-laser-cleaning: { category: metal, properties: { thermalConductivity: { value: 401.0 } } }
  c-laser-cleaning: { category: metal, properties: { thermalConductivity: { value: 8.4 } } }
"#,
        );
        let rebuilt = reg.rebuild_from_entities(&store);
        assert!(rebuilt.findings.is_empty());
        let r = rebuilt
            .registry
            .range_for("metal", "thermalConductivity")
            .unwrap();
        assert_relative_eq!(r.min, 7.98, epsilon = 1e-9);

        let doc = rebuilt.registry.to_document();
        assert_eq!(doc["version"].as_u64(), Some(2));
        assert_eq!(doc["categories"]["metal"]["label"].as_str(), Some("Metals"));
        let back = CategoryRangeRegistry::from_value(doc).unwrap();
        assert_eq!(back.range_for("metal", "thermalConductivity"), Some(r));
    }

    #[test]
    fn saved_registry_drops_ranges_with_no_remaining_samples() {
        let source = r#"
categories:
  metal:
    label: Metals
    category_ranges:
      thermalConductivity: { min: 1.0, max: 2.0 }
      density: { min: 1.0, max: 20.0, unit: g/cm3 }
  wood:
    label: Woods
    category_ranges:
      density: { min: 0.1, max: 1.4, unit: g/cm3 }
  glass:
    density: { min: 2.0, max: 3.0 }
"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("category_ranges.yaml");
        std::fs::write(&path, source).unwrap();
        let reg = CategoryRangeRegistry::load(&path).unwrap();
        assert_eq!(reg.categories().count(), 3);

        let store = store_with_materials(
            "materials:\n  a-laser-cleaning: { category: metal, properties: { thermalConductivity: { value: 15.0 } } }\n",
        );
        let rebuilt = reg.rebuild_from_entities(&store).registry;
        rebuilt.save(&path, &dir.path().join("backups")).unwrap();

        let back = CategoryRangeRegistry::load(&path).unwrap();
        assert_eq!(back.categories().collect::<Vec<_>>(), vec!["metal"]);
        assert_eq!(back.ranges_in("metal"), rebuilt.ranges_in("metal"));
        assert!(back.range_for("metal", "density").is_none());

        let doc = back.to_document();
        assert_eq!(doc["categories"]["wood"]["label"].as_str(), Some("Woods"));
        assert!(doc["categories"]["wood"].get("category_ranges").is_none());
        assert!(doc["categories"].get("glass").is_none());
    }
}
