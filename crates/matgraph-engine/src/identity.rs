//! Entity identity: domain suffixes, `id`/key agreement, and rename propagation.
//!
//! Every entity key must end with its domain's suffix and equal the entity's
//! `id`. Normalization appends a missing suffix and fills a missing `id`; an
//! `id` that disagrees with its key is reported and never auto-resolved.
//! Renames are collected per domain and applied to relationship items across
//! all domains in a single pass once every domain has been normalized.

use std::collections::{BTreeMap, HashSet};

use serde_yaml::{Mapping, Value};

use matgraph_model::entity::{KEY_ID, KEY_RELATIONSHIPS};
use matgraph_model::relationship::{is_group_wrapper, item_reference, ITEMS_KEY, ITEM_ID_KEY};
use matgraph_model::{Domain, Finding};
use matgraph_store::{DocumentStore, DomainDocument};

use crate::display::DisplaySchema;

/// Identity decision for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityOutcome {
    pub old_key: String,
    pub new_key: String,
    /// `id` was absent and will be set to `new_key`.
    pub fill_id: bool,
    /// `id` equalled the old key and follows the rename.
    pub update_id: bool,
    pub findings: Vec<Finding>,
}

impl IdentityOutcome {
    pub fn renamed(&self) -> bool {
        self.old_key != self.new_key
    }

    pub fn is_noop(&self) -> bool {
        !self.renamed() && !self.fill_id && !self.update_id
    }
}

/// Decide the final key and `id` of one entity. Pure: nothing is mutated.
///
/// `taken` holds every key currently used in the domain.
pub fn normalize_identity(
    domain: Domain,
    key: &str,
    entity: &Mapping,
    taken: &HashSet<String>,
) -> IdentityOutcome {
    let mut out = IdentityOutcome {
        old_key: key.to_string(),
        new_key: key.to_string(),
        fill_id: false,
        update_id: false,
        findings: Vec::new(),
    };

    let id = match entity.get(KEY_ID) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.as_str()),
        Some(other) => {
            out.findings.push(
                Finding::structural(
                    "id_key_mismatch",
                    format!("id {other:?} is not a string (key `{key}`)"),
                )
                .in_domain(domain)
                .entity(key),
            );
            return out;
        }
    };

    if let Some(id) = id {
        if id != key {
            out.findings.push(
                Finding::structural(
                    "id_key_mismatch",
                    format!("id `{id}` does not match key `{key}`"),
                )
                .in_domain(domain)
                .entity(key),
            );
            return out;
        }
    }

    if !domain.has_suffix(key) {
        let candidate = format!("{key}{}", domain.suffix());
        if taken.contains(&candidate) {
            out.findings.push(
                Finding::structural(
                    "rename_collision",
                    format!("cannot rename `{key}` to `{candidate}`: key already in use"),
                )
                .in_domain(domain)
                .entity(key)
                .target(candidate.as_str(), domain.tag()),
            );
            return out;
        }
        out.new_key = candidate;
        out.update_id = id.is_some();
    }
    out.fill_id = id.is_none();
    out
}

/// Read-only identity check for audits.
///
/// Reports `missing_id_suffix`, `missing_id`, `id_key_mismatch` and
/// `rename_collision` without touching the document.
pub fn check_identity(doc: &DomainDocument) -> Vec<Finding> {
    let domain = doc.domain();
    let taken = doc.key_set();
    let mut findings = Vec::new();
    for (k, v) in doc.entities() {
        let Some(key) = k.as_str() else {
            continue;
        };
        let Some(record) = v.as_mapping() else {
            findings.push(
                Finding::structural("malformed_item", "entity record is not a mapping")
                    .in_domain(domain)
                    .entity(key),
            );
            continue;
        };
        let outcome = normalize_identity(domain, key, record, &taken);
        findings.extend(outcome.findings.iter().cloned());
        if outcome.renamed() {
            findings.push(
                Finding::structural(
                    "missing_id_suffix",
                    format!("key `{key}` lacks the `{}` suffix", domain.suffix()),
                )
                .in_domain(domain)
                .entity(key),
            );
        }
        if outcome.fill_id {
            findings.push(
                Finding::structural("missing_id", "entity has no id")
                    .in_domain(domain)
                    .entity(key),
            );
        }
    }
    findings
}

/// Old key → new key, per domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameMap {
    renames: BTreeMap<Domain, BTreeMap<String, String>>,
}

impl RenameMap {
    pub fn insert(&mut self, domain: Domain, old: impl Into<String>, new: impl Into<String>) {
        self.renames
            .entry(domain)
            .or_default()
            .insert(old.into(), new.into());
    }

    pub fn get(&self, domain: Domain, old: &str) -> Option<&str> {
        self.renames.get(&domain)?.get(old).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.renames.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn extend(&mut self, other: RenameMap) {
        for (domain, map) in other.renames {
            self.renames.entry(domain).or_default().extend(map);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Domain, &str, &str)> {
        self.renames
            .iter()
            .flat_map(|(d, m)| m.iter().map(move |(o, n)| (*d, o.as_str(), n.as_str())))
    }
}

/// Result of applying identity rules to one domain.
#[derive(Debug, Clone, Default)]
pub struct DomainIdentity {
    pub renames: RenameMap,
    pub ids_filled: usize,
    pub findings: Vec<Finding>,
}

/// Apply identity rules to every entity of a domain, keeping entity order.
pub fn apply_identity(doc: &mut DomainDocument) -> DomainIdentity {
    let domain = doc.domain();
    let mut taken = doc.key_set();
    let mut out = DomainIdentity::default();

    let mut outcomes = Vec::with_capacity(doc.len());
    for (k, v) in doc.entities() {
        let (Some(key), Some(record)) = (k.as_str(), v.as_mapping()) else {
            outcomes.push(None);
            continue;
        };
        let outcome = normalize_identity(domain, key, record, &taken);
        if outcome.renamed() {
            taken.remove(&outcome.old_key);
            taken.insert(outcome.new_key.clone());
        }
        outcomes.push(Some(outcome));
    }
    if outcomes.iter().flatten().all(IdentityOutcome::is_noop) {
        out.findings = outcomes.into_iter().flatten().flat_map(|o| o.findings).collect();
        return out;
    }

    let old = std::mem::take(doc.entities_mut());
    let mut rebuilt = Mapping::with_capacity(old.len());
    for ((k, v), outcome) in old.into_iter().zip(outcomes) {
        let Some(outcome) = outcome else {
            rebuilt.insert(k, v);
            continue;
        };
        out.findings.extend(outcome.findings.iter().cloned());
        let Value::Mapping(mut record) = v else {
            rebuilt.insert(k, v);
            continue;
        };
        if outcome.update_id {
            record.insert(KEY_ID.into(), outcome.new_key.as_str().into());
        }
        if outcome.fill_id {
            let mut with_id = Mapping::with_capacity(record.len() + 1);
            with_id.insert(KEY_ID.into(), outcome.new_key.as_str().into());
            with_id.extend(record);
            record = with_id;
            out.ids_filled += 1;
        }
        if outcome.renamed() {
            tracing::debug!(
                domain = %domain,
                from = %outcome.old_key,
                to = %outcome.new_key,
                "renamed entity"
            );
            out.renames
                .insert(domain, outcome.old_key.as_str(), outcome.new_key.as_str());
        }
        rebuilt.insert(outcome.new_key.as_str().into(), Value::Mapping(record));
    }
    *doc.entities_mut() = rebuilt;
    doc.mark_dirty();
    tracing::info!(
        domain = %domain,
        renamed = out.renames.len(),
        ids_filled = out.ids_filled,
        "applied identity rules"
    );
    out
}

/// Domain an item reference points into: its own `type`, else the display
/// schema's target for the relationship. Bare string items have no `type`.
pub fn item_target_domain(
    item: &Value,
    rel_type: &str,
    display: Option<&DisplaySchema>,
) -> Option<Domain> {
    let (_, item_type) = item_reference(item)?;
    match item_type {
        Some(tag) => Domain::from_tag(tag),
        None => display.and_then(|d| d.target_for(rel_type)),
    }
}

fn for_each_item_mut(group: &mut Value, f: &mut dyn FnMut(&mut Value)) {
    match group {
        Value::Sequence(items) => items.iter_mut().for_each(f),
        Value::Mapping(m) if is_group_wrapper(m) => {
            if let Some(items) = m.get_mut(ITEMS_KEY).and_then(Value::as_sequence_mut) {
                items.iter_mut().for_each(f);
            }
        }
        Value::Mapping(_) => f(group),
        _ => {}
    }
}

/// Rewrite every relationship item that references a renamed entity.
/// Returns the number of items rewritten.
pub fn propagate_renames(
    store: &mut DocumentStore,
    renames: &RenameMap,
    display: Option<&DisplaySchema>,
) -> usize {
    if renames.is_empty() {
        return 0;
    }
    let mut total = 0;
    for doc in store.documents_mut() {
        let domain = doc.domain();
        let mut rewritten = 0;
        for (_, record) in doc.entities_mut().iter_mut() {
            let Some(rels) = record
                .as_mapping_mut()
                .and_then(|r| r.get_mut(KEY_RELATIONSHIPS))
                .and_then(Value::as_mapping_mut)
            else {
                continue;
            };
            for (rk, group) in rels.iter_mut() {
                let rel_type = rk.as_str().unwrap_or_default();
                for_each_item_mut(group, &mut |item: &mut Value| {
                    let Some(target) = item_target_domain(item, rel_type, display) else {
                        return;
                    };
                    let Some(new_id) = item_reference(item)
                        .and_then(|(id, _)| renames.get(target, id))
                        .map(str::to_string)
                    else {
                        return;
                    };
                    match item {
                        Value::Mapping(m) => {
                            m.insert(ITEM_ID_KEY.into(), new_id.into());
                        }
                        _ => *item = Value::String(new_id),
                    }
                    rewritten += 1;
                });
            }
        }
        if rewritten > 0 {
            doc.mark_dirty();
            tracing::info!(domain = %domain, items = rewritten, "rewrote renamed references");
        }
        total += rewritten;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn rec(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn doc(domain: Domain, yaml: &str) -> DomainDocument {
        DomainDocument::from_yaml_str(
            domain,
            Path::new(&domain.default_file_name()),
            domain.tag(),
            yaml,
        )
        .unwrap()
    }

    #[test]
    fn missing_suffix_is_appended_and_id_follows() {
        let taken = HashSet::from(["aluminum".to_string()]);
        let out = normalize_identity(Domain::Material, "aluminum", &rec("id: aluminum\n"), &taken);
        assert_eq!(out.new_key, "aluminum-laser-cleaning");
        assert!(out.update_id);
        assert!(!out.fill_id);
        assert!(out.findings.is_empty());
    }

    #[test]
    fn mismatched_id_is_reported_and_not_renamed() {
        let out = normalize_identity(
            Domain::Compound,
            "carbon-monoxide",
            &rec("id: co-compound\n"),
            &HashSet::new(),
        );
        assert!(!out.renamed());
        assert_eq!(out.findings[0].code, "id_key_mismatch");
        assert!(out.findings[0].kind.blocks_write());
    }

    #[test]
    fn rename_onto_existing_key_is_a_collision() {
        let taken = HashSet::from(["rust".to_string(), "rust-contamination".to_string()]);
        let out = normalize_identity(Domain::Contaminant, "rust", &rec("name: Rust\n"), &taken);
        assert!(!out.renamed());
        assert!(!out.fill_id);
        assert_eq!(out.findings[0].code, "rename_collision");
    }

    #[test]
    fn apply_fills_id_first_and_keeps_entity_order() {
        let mut d = doc(
            Domain::Setting,
            "settings:\n  steel: { name: Steel }\n  copper-settings: { id: copper-settings }\n",
        );
        let out = apply_identity(&mut d);
        assert_eq!(out.ids_filled, 1);
        assert_eq!(out.renames.get(Domain::Setting, "steel"), Some("steel-settings"));
        let keys: Vec<&str> = d.keys().collect();
        assert_eq!(keys, vec!["steel-settings", "copper-settings"]);
        let first_field = d.entities()["steel-settings"]
            .as_mapping()
            .and_then(|m| m.keys().next())
            .and_then(Value::as_str);
        assert_eq!(first_field, Some("id"));
        assert!(d.is_dirty());
    }

    #[test]
    fn audit_check_reports_without_mutating() {
        let d = doc(Domain::Material, "materials:\n  aluminum: { name: Aluminum }\n");
        let codes: Vec<String> = check_identity(&d).into_iter().map(|f| f.code).collect();
        assert_eq!(codes, vec!["missing_id_suffix", "missing_id"]);
        assert!(d.contains_key("aluminum"));
        assert!(!d.is_dirty());
    }

    #[test]
    fn renames_reach_items_in_every_shape_and_domain() {
        let materials = doc(Domain::Material, "materials:\n  aluminum-laser-cleaning: {}\n");
        let contaminants = doc(
            Domain::Contaminant,
            r#"
contaminants:
  rust-oxidation-contamination:
    relationships:
      found_on_materials:
        presentation: card
        items:
          - { id: aluminum, type: materials }
      bare:
        - { id: aluminum, type: material }
      untyped:
        id: aluminum
      other_domain:
        - { id: aluminum, type: compounds }
"#,
        );
        let mut store = DocumentStore::from_documents(
            matgraph_store::KnowledgeBaseConfig::default(),
            [materials, contaminants],
        );
        let mut renames = RenameMap::default();
        renames.insert(Domain::Material, "aluminum", "aluminum-laser-cleaning");
        let display = DisplaySchema::from_yaml_str(
            "relationships:\n  untyped: { target: materials }\n",
        )
        .unwrap();

        let n = propagate_renames(&mut store, &renames, Some(&display));
        assert_eq!(n, 3);
        let c = store.require(Domain::Contaminant).unwrap();
        assert!(c.is_dirty());
        let rels = &c.entities()["rust-oxidation-contamination"]["relationships"];
        assert_eq!(
            rels["found_on_materials"]["items"][0]["id"].as_str(),
            Some("aluminum-laser-cleaning")
        );
        assert_eq!(rels["bare"][0]["id"].as_str(), Some("aluminum-laser-cleaning"));
        assert_eq!(rels["untyped"]["id"].as_str(), Some("aluminum-laser-cleaning"));
        assert_eq!(rels["other_domain"][0]["id"].as_str(), Some("aluminum"));
    }
}
