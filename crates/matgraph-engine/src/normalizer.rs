//! Relationship normalizer.
//!
//! Rewrites every relationship group into the canonical
//! `{presentation, items, _section}` wrapper. Accepted legacy shapes:
//!
//! - a bare list of items,
//! - a wrapper missing `presentation`, `items` or `_section`,
//! - a single unwrapped item mapping (becomes a one-item list; a `_section`
//!   or `presentation` on it is lifted to the group),
//! - `null` (an empty group).
//!
//! Within items, per-item `presentation`/`_section` are hoisted to the group
//! (first one wins), scalar items become `{id: <scalar>}`, and a missing `type`
//! is filled from the display schema's target domain.
//!
//! A group is only replaced when the rewritten value differs from the input,
//! so a second run over normalized data changes nothing. A group containing a
//! malformed item is left exactly as found.

use serde_yaml::{Mapping, Value};

use matgraph_model::entity::KEY_RELATIONSHIPS;
use matgraph_model::relationship::{
    is_canonical_group, is_group_wrapper, ITEMS_KEY, ITEM_ID_KEY, ITEM_TYPE_KEY, PRESENTATION_KEY,
};
use matgraph_model::{Domain, Finding, Presentation, SectionMetadata, SECTION_KEY};
use matgraph_store::DomainDocument;

use crate::display::DisplaySchema;

/// Outcome of normalizing one group.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedGroup {
    /// The canonical group, or the input unchanged when normalization was refused.
    pub value: Value,
    pub changed: bool,
    /// Human-readable list of what was rewritten.
    pub changes: Vec<String>,
    pub findings: Vec<Finding>,
}

impl NormalizedGroup {
    fn refused(original: &Value, finding: Finding) -> Self {
        Self {
            value: original.clone(),
            changed: false,
            changes: Vec::new(),
            findings: vec![finding],
        }
    }
}

/// Per-domain normalization totals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainNormalization {
    pub groups_seen: usize,
    pub groups_changed: usize,
    pub findings: Vec<Finding>,
}

struct RawGroup {
    items: Vec<Value>,
    presentation: Option<Value>,
    section: Option<Value>,
    extra: Mapping,
}

#[derive(Debug, Clone, Copy)]
pub struct RelationshipNormalizer<'a> {
    display: &'a DisplaySchema,
}

impl<'a> RelationshipNormalizer<'a> {
    pub fn new(display: &'a DisplaySchema) -> Self {
        Self { display }
    }

    pub fn normalize(&self, rel_type: &str, group: &Value) -> NormalizedGroup {
        let mut changes = Vec::new();
        let mut findings = Vec::new();

        if !self.display.knows(rel_type) {
            findings.push(
                Finding::gap(
                    "unknown_relationship_type",
                    format!("relationship type `{rel_type}` has no display schema entry"),
                )
                .relation(rel_type),
            );
        }

        let mut raw = match split_group(group) {
            Ok(raw) => raw,
            Err(f) => return NormalizedGroup::refused(group, f.relation(rel_type)),
        };
        if !is_canonical_group(group) {
            changes.push("reshaped into canonical group".to_string());
        }

        let target = self.display.target_for(rel_type);
        let mut items = Vec::with_capacity(raw.items.len());
        for (idx, item) in raw.items.drain(..).enumerate() {
            let mut m = match item {
                Value::Mapping(m) => m,
                Value::String(s) => {
                    changes.push(format!("item {idx}: scalar `{s}` became a reference"));
                    id_only(Value::String(s))
                }
                Value::Number(n) => {
                    changes.push(format!("item {idx}: scalar `{n}` became a reference"));
                    id_only(Value::String(n.to_string()))
                }
                other => {
                    return NormalizedGroup::refused(
                        group,
                        Finding::structural(
                            "malformed_item",
                            format!("item {idx} is a {}, not a mapping or id", kind_of(&other)),
                        )
                        .relation(rel_type),
                    )
                }
            };
            if let Some(p) = m.remove(PRESENTATION_KEY) {
                changes.push(format!("item {idx}: hoisted presentation"));
                raw.presentation.get_or_insert(p);
            }
            if let Some(s) = m.remove(SECTION_KEY) {
                changes.push(format!("item {idx}: hoisted _section"));
                raw.section.get_or_insert(s);
            }
            if m.contains_key(ITEM_ID_KEY) && !m.contains_key(ITEM_TYPE_KEY) {
                if let Some(d) = target {
                    changes.push(format!("item {idx}: filled type `{}`", d.tag()));
                    m.insert(ITEM_TYPE_KEY.into(), d.tag().into());
                }
            }
            items.push(Value::Mapping(m));
        }

        let presentation = match raw.presentation {
            None | Some(Value::Null) => self.display.presentation_for(rel_type),
            Some(v) => match v.as_str().and_then(Presentation::parse) {
                Some(p) => p,
                None => {
                    let fallback = self.display.presentation_for(rel_type);
                    findings.push(
                        Finding::gap(
                            "invalid_presentation",
                            format!(
                                "presentation {v:?} is not card|table|descriptive; using `{}`",
                                fallback.as_str()
                            ),
                        )
                        .relation(rel_type),
                    );
                    fallback
                }
            },
        };

        let defaults = self.display.section_for(rel_type);
        let section = match raw.section {
            None | Some(Value::Null) => defaults,
            Some(v @ Value::Mapping(_)) => match serde_yaml::from_value::<SectionMetadata>(v) {
                Ok(existing) => existing.filled_from(&defaults),
                Err(err) => {
                    return NormalizedGroup::refused(
                        group,
                        Finding::structural("malformed_item", format!("invalid _section: {err}"))
                            .relation(rel_type),
                    )
                }
            },
            Some(other) => {
                return NormalizedGroup::refused(
                    group,
                    Finding::structural(
                        "malformed_item",
                        format!("_section is a {}, not a mapping", kind_of(&other)),
                    )
                    .relation(rel_type),
                )
            }
        };
        let section = match serde_yaml::to_value(&section) {
            Ok(v) => v,
            Err(err) => {
                return NormalizedGroup::refused(
                    group,
                    Finding::structural("malformed_item", format!("invalid _section: {err}"))
                        .relation(rel_type),
                )
            }
        };

        let mut out = Mapping::new();
        out.insert(PRESENTATION_KEY.into(), presentation.as_str().into());
        out.insert(ITEMS_KEY.into(), Value::Sequence(items));
        out.insert(SECTION_KEY.into(), section);
        for (k, v) in raw.extra {
            out.insert(k, v);
        }
        let value = Value::Mapping(out);

        // Mapping equality ignores key order, so an already-canonical group
        // compares equal even if its keys were written in another order.
        if value == *group {
            return NormalizedGroup {
                value: group.clone(),
                changed: false,
                changes: Vec::new(),
                findings,
            };
        }
        if changes.is_empty() {
            changes.push("filled group defaults".to_string());
        }
        NormalizedGroup {
            value,
            changed: true,
            changes,
            findings,
        }
    }

    /// Normalize every relationship group of one entity record in place.
    /// Returns `(groups_seen, groups_changed, findings)`.
    pub fn normalize_entity(
        &self,
        domain: Domain,
        key: &str,
        record: &mut Mapping,
    ) -> (usize, usize, Vec<Finding>) {
        let mut findings = Vec::new();
        let rels = match record.get_mut(KEY_RELATIONSHIPS) {
            None | Some(Value::Null) => return (0, 0, findings),
            Some(Value::Mapping(m)) => m,
            Some(other) => {
                findings.push(
                    Finding::structural(
                        "malformed_item",
                        format!("relationships is a {}, not a mapping", kind_of(other)),
                    )
                    .in_domain(domain)
                    .entity(key),
                );
                return (0, 0, findings);
            }
        };

        let rel_types: Vec<String> = rels
            .keys()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
        let mut changed = 0;
        for rel_type in &rel_types {
            let Some(group) = rels.get(rel_type.as_str()) else {
                continue;
            };
            let result = self.normalize(rel_type, group);
            findings.extend(
                result
                    .findings
                    .into_iter()
                    .map(|f| f.in_domain(domain).entity(key)),
            );
            if result.changed {
                tracing::debug!(
                    domain = %domain,
                    entity = %key,
                    relation = %rel_type,
                    changes = ?result.changes,
                    "normalized relationship group"
                );
                rels.insert(rel_type.as_str().into(), result.value);
                changed += 1;
            }
        }
        (rel_types.len(), changed, findings)
    }

    /// Normalize every entity of a domain document; marks it dirty on change.
    pub fn normalize_domain(&self, doc: &mut DomainDocument) -> DomainNormalization {
        let domain = doc.domain();
        let mut out = DomainNormalization::default();
        let keys: Vec<String> = doc.keys().map(str::to_string).collect();
        for key in keys {
            let Some(record) = doc
                .entities_mut()
                .get_mut(key.as_str())
                .and_then(Value::as_mapping_mut)
            else {
                continue;
            };
            let (seen, changed, findings) = self.normalize_entity(domain, &key, record);
            out.groups_seen += seen;
            out.groups_changed += changed;
            out.findings.extend(findings);
        }
        if out.groups_changed > 0 {
            doc.mark_dirty();
        }
        tracing::info!(
            domain = %domain,
            groups = out.groups_seen,
            changed = out.groups_changed,
            "normalized relationships"
        );
        out
    }
}

fn id_only(id: Value) -> Mapping {
    let mut m = Mapping::new();
    m.insert(ITEM_ID_KEY.into(), id);
    m
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

fn split_group(group: &Value) -> Result<RawGroup, Finding> {
    let mut raw = RawGroup {
        items: Vec::new(),
        presentation: None,
        section: None,
        extra: Mapping::new(),
    };
    match group {
        Value::Null => {}
        Value::Sequence(items) => raw.items = items.clone(),
        Value::Mapping(m) if is_group_wrapper(m) => {
            for (k, v) in m {
                match k.as_str() {
                    Some(ITEMS_KEY) => match v {
                        Value::Sequence(items) => raw.items = items.clone(),
                        Value::Null => {}
                        other => {
                            return Err(Finding::structural(
                                "malformed_item",
                                format!("items is a {}, not a list", kind_of(other)),
                            ))
                        }
                    },
                    Some(PRESENTATION_KEY) => raw.presentation = Some(v.clone()),
                    Some(SECTION_KEY) => raw.section = Some(v.clone()),
                    _ => {
                        raw.extra.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        Value::Mapping(m) => {
            let mut item = m.clone();
            raw.section = item.remove(SECTION_KEY);
            raw.presentation = item.remove(PRESENTATION_KEY);
            raw.items.push(Value::Mapping(item));
        }
        Value::String(_) | Value::Number(_) => raw.items.push(group.clone()),
        other => {
            return Err(Finding::structural(
                "malformed_item",
                format!("group is a {}", kind_of(other)),
            ))
        }
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"
relationships:
  contaminated_by:
    presentation: card
    target: contaminants
    title: Common Contaminants
    icon: droplet
    order: 1
  produces_compounds:
    presentation: table
    target: compounds
    title: Byproducts
"#;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    fn schema() -> DisplaySchema {
        DisplaySchema::from_yaml_str(SCHEMA).unwrap()
    }

    #[test]
    fn bare_list_is_wrapped_with_display_defaults() {
        let display = schema();
        let n = RelationshipNormalizer::new(&display);
        let out = n.normalize("contaminated_by", &yaml("- id: rust-oxidation-contamination\n"));
        assert!(out.changed);
        assert!(out.findings.is_empty());
        assert!(is_canonical_group(&out.value));
        assert_eq!(out.value["presentation"].as_str(), Some("card"));
        assert_eq!(out.value["items"][0]["type"].as_str(), Some("contaminants"));
        assert_eq!(out.value["_section"]["title"].as_str(), Some("Common Contaminants"));
    }

    #[test]
    fn per_item_presentation_and_section_are_hoisted_first_wins() {
        let display = schema();
        let n = RelationshipNormalizer::new(&display);
        let group = yaml(
            r#"
items:
  - id: a-compound
    type: compounds
    presentation: descriptive
    _section: { title: Curated }
  - id: b-compound
    type: compounds
    presentation: card
"#,
        );
        let out = n.normalize("produces_compounds", &group);
        assert!(out.changed);
        assert_eq!(out.value["presentation"].as_str(), Some("descriptive"));
        assert_eq!(out.value["_section"]["title"].as_str(), Some("Curated"));
        for item in out.value["items"].as_sequence().unwrap() {
            let m = item.as_mapping().unwrap();
            assert!(!m.contains_key(PRESENTATION_KEY));
            assert!(!m.contains_key(SECTION_KEY));
        }
    }

    #[test]
    fn single_mapping_becomes_one_item_list_with_lifted_section() {
        let display = schema();
        let n = RelationshipNormalizer::new(&display);
        let out = n.normalize(
            "contaminated_by",
            &yaml("id: rust-oxidation-contamination\n_section: { icon: flame }\n"),
        );
        assert_eq!(out.value["items"].as_sequence().unwrap().len(), 1);
        assert_eq!(out.value["_section"]["icon"].as_str(), Some("flame"));
        assert_eq!(out.value["_section"]["title"].as_str(), Some("Common Contaminants"));
    }

    #[test]
    fn scalar_items_become_references() {
        let display = schema();
        let n = RelationshipNormalizer::new(&display);
        let out = n.normalize("produces_compounds", &yaml("[carbon-monoxide-compound]\n"));
        assert_eq!(out.value["items"][0]["id"].as_str(), Some("carbon-monoxide-compound"));
        assert_eq!(out.value["presentation"].as_str(), Some("table"));
    }

    #[test]
    fn malformed_item_leaves_group_untouched() {
        let display = schema();
        let n = RelationshipNormalizer::new(&display);
        let group = yaml("- id: ok-compound\n- [nested, list]\n");
        let out = n.normalize("produces_compounds", &group);
        assert!(!out.changed);
        assert_eq!(out.value, group);
        assert_eq!(out.findings[0].code, "malformed_item");
        assert!(out.findings[0].kind.blocks_write());
    }

    #[test]
    fn unknown_type_defaults_to_card_and_warns() {
        let display = schema();
        let n = RelationshipNormalizer::new(&display);
        let out = n.normalize("related_materials", &yaml("- id: x-laser-cleaning\n"));
        assert_eq!(out.value["presentation"].as_str(), Some("card"));
        assert!(out.value["items"][0].get("type").is_none());
        assert_eq!(out.findings[0].code, "unknown_relationship_type");
    }

    #[test]
    fn invalid_presentation_falls_back_with_a_warning() {
        let display = schema();
        let n = RelationshipNormalizer::new(&display);
        let out = n.normalize(
            "produces_compounds",
            &yaml("presentation: carousel\nitems: []\n"),
        );
        assert_eq!(out.value["presentation"].as_str(), Some("table"));
        assert_eq!(out.findings[0].code, "invalid_presentation");
        assert!(!out.findings[0].kind.blocks_write());
    }

    #[test]
    fn normalizing_twice_changes_nothing_the_second_time() {
        let display = schema();
        let n = RelationshipNormalizer::new(&display);
        let first = n.normalize(
            "contaminated_by",
            &yaml("- rust-oxidation-contamination\n- id: paint-contamination\n  presentation: card\n"),
        );
        assert!(first.changed);
        let second = n.normalize("contaminated_by", &first.value);
        assert!(!second.changed);
        assert_eq!(second.value, first.value);
    }

    #[test]
    fn canonical_group_with_reordered_keys_is_unchanged() {
        let display = schema();
        let n = RelationshipNormalizer::new(&display);
        let group = yaml(
            r#"
_section: { title: Byproducts }
items:
  - { id: a-compound, type: compounds }
presentation: table
"#,
        );
        let out = n.normalize("produces_compounds", &group);
        assert!(!out.changed);
        assert!(out.changes.is_empty());
    }

    #[test]
    fn normalize_domain_marks_document_dirty_only_on_change() {
        let display = schema();
        let n = RelationshipNormalizer::new(&display);
        let mut doc = DomainDocument::from_yaml_str(
            Domain::Material,
            std::path::Path::new("materials.yaml"),
            "materials",
            r#"
materials:
  steel-laser-cleaning:
    relationships:
      contaminated_by:
        - id: rust-oxidation-contamination
"#,
        )
        .unwrap();
        let first = n.normalize_domain(&mut doc);
        assert_eq!((first.groups_seen, first.groups_changed), (1, 1));
        assert!(doc.is_dirty());

        let mut again = DomainDocument::from_yaml_str(
            Domain::Material,
            std::path::Path::new("materials.yaml"),
            "materials",
            &doc.render().unwrap(),
        )
        .unwrap();
        let second = n.normalize_domain(&mut again);
        assert_eq!(second.groups_changed, 0);
        assert!(!again.is_dirty());
    }
}
