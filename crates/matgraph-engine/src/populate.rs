//! Heuristic relationship population.
//!
//! Rules are declarative: each names a source domain and relation, a target
//! domain, an optional source condition, a target selector, and optionally
//! the inverse relation to mirror the link into. The table is loaded from
//! `population_rules.yaml` or falls back to [`RuleTable::builtin`].
//!
//! ```yaml
//! rules:
//!   - name: rust_on_ferrous_metals
//!     source: contaminants
//!     relation: found_on_materials
//!     target: materials
//!     inverse: contaminated_by
//!     when: { kind: matches, pattern: "rust|oxid|corrosion" }
//!     select: { kind: category, categories: [metal], subcategories: [ferrous] }
//! ```
//!
//! Population is additive: existing items are never touched and a
//! (source, target) pair is proposed at most once.

use std::collections::HashSet;
use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use matgraph_model::entity::KEY_RELATIONSHIPS;
use matgraph_model::relationship::{group_item_values, item_reference, ITEMS_KEY};
use matgraph_model::{Domain, EntityView, Finding, RelationshipItem};
use matgraph_store::{read_yaml_document, DocumentStore};

use crate::error::RuleError;
use crate::normalizer::RelationshipNormalizer;

// ============================================================================
// Rule table
// ============================================================================

fn default_match_fields() -> Vec<String> {
    vec!["id".into(), "name".into(), "category".into()]
}

/// Which source entities a rule applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceCondition {
    /// Case-insensitive regex over the listed fields (`id` is the entity key).
    Matches {
        pattern: String,
        #[serde(default = "default_match_fields")]
        fields: Vec<String>,
    },
    /// Numeric property value at or above a threshold.
    PropertyAtLeast { property: String, min: f64 },
}

/// Which target entities a matching source links to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetSelector {
    /// Targets whose category (and, when given, subcategory) is listed.
    Category {
        #[serde(default)]
        categories: Vec<String>,
        #[serde(default)]
        subcategories: Vec<String>,
    },
    /// Targets whose name appears as a whole word in one of the source fields.
    NameMention { fields: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationRuleSpec {
    pub name: String,
    pub source: Domain,
    pub relation: String,
    pub target: Domain,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<SourceCondition>,
    pub select: TargetSelector,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RuleTableDoc {
    #[serde(default)]
    rules: Vec<PopulationRuleSpec>,
}

#[derive(Debug, Clone)]
enum CompiledCondition {
    Matches { regex: Regex, fields: Vec<String> },
    PropertyAtLeast { property: String, min: f64 },
}

#[derive(Debug, Clone)]
pub struct PopulationRule {
    spec: PopulationRuleSpec,
    when: Option<CompiledCondition>,
}

impl PopulationRule {
    fn compile(spec: PopulationRuleSpec) -> Result<Self, RuleError> {
        let when = match &spec.when {
            None => None,
            Some(SourceCondition::Matches { pattern, fields }) => {
                let regex = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| RuleError::InvalidPattern {
                        rule: spec.name.clone(),
                        source,
                    })?;
                Some(CompiledCondition::Matches {
                    regex,
                    fields: fields.clone(),
                })
            }
            Some(SourceCondition::PropertyAtLeast { property, min }) => {
                Some(CompiledCondition::PropertyAtLeast {
                    property: property.clone(),
                    min: *min,
                })
            }
        };
        Ok(Self { spec, when })
    }

    pub fn spec(&self) -> &PopulationRuleSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    fn source_applies(&self, source: &EntityView<'_>) -> bool {
        match &self.when {
            None => true,
            Some(CompiledCondition::Matches { regex, fields }) => fields
                .iter()
                .flat_map(|f| field_texts(source, f))
                .any(|t| regex.is_match(t)),
            Some(CompiledCondition::PropertyAtLeast { property, min }) => source
                .property_value(property)
                .map(|v| v >= *min)
                .unwrap_or(false),
        }
    }
}

fn field_texts<'a>(entity: &EntityView<'a>, field: &str) -> Vec<&'a str> {
    if field == "id" {
        vec![entity.key()]
    } else {
        entity.texts_at(field)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<PopulationRule>,
}

impl RuleTable {
    pub fn from_specs(specs: Vec<PopulationRuleSpec>) -> Result<Self, RuleError> {
        let rules = specs
            .into_iter()
            .map(PopulationRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, RuleError> {
        let doc: RuleTableDoc = serde_yaml::from_str(text).map_err(RuleError::Parse)?;
        Self::from_specs(doc.rules)
    }

    pub fn load(path: &Path) -> Result<Self, RuleError> {
        let (_, value) = read_yaml_document(path)?;
        let doc: RuleTableDoc = if value.is_null() {
            RuleTableDoc::default()
        } else {
            serde_yaml::from_value(value).map_err(RuleError::Parse)?
        };
        let table = Self::from_specs(doc.rules)?;
        tracing::info!(path = %path.display(), rules = table.len(), "loaded population rules");
        Ok(table)
    }

    /// Default heuristics used when no rule document is configured.
    pub fn builtin() -> Result<Self, RuleError> {
        let metal = || vec!["metal".to_string()];
        let specs = vec![
            PopulationRuleSpec {
                name: "rust_on_ferrous_metals".into(),
                source: Domain::Contaminant,
                relation: "found_on_materials".into(),
                target: Domain::Material,
                inverse: Some("contaminated_by".into()),
                when: Some(SourceCondition::Matches {
                    pattern: r"rust|oxid|corrosion".into(),
                    fields: default_match_fields(),
                }),
                select: TargetSelector::Category {
                    categories: metal(),
                    subcategories: vec!["ferrous".into()],
                },
            },
            PopulationRuleSpec {
                name: "contaminant_valid_materials".into(),
                source: Domain::Contaminant,
                relation: "found_on_materials".into(),
                target: Domain::Material,
                inverse: Some("contaminated_by".into()),
                when: None,
                select: TargetSelector::NameMention {
                    fields: vec!["valid_materials".into()],
                },
            },
            PopulationRuleSpec {
                name: "contaminant_byproducts".into(),
                source: Domain::Contaminant,
                relation: "produces_compounds".into(),
                target: Domain::Compound,
                inverse: Some("produced_by_contaminants".into()),
                when: None,
                select: TargetSelector::NameMention {
                    fields: vec!["byproducts".into()],
                },
            },
            PopulationRuleSpec {
                name: "high_fluence_metals".into(),
                source: Domain::Setting,
                relation: "related_materials".into(),
                target: Domain::Material,
                inverse: None,
                when: Some(SourceCondition::PropertyAtLeast {
                    property: "fluence".into(),
                    min: 5.0,
                }),
                select: TargetSelector::Category {
                    categories: metal(),
                    subcategories: Vec::new(),
                },
            },
            PopulationRuleSpec {
                name: "setting_material_mention".into(),
                source: Domain::Setting,
                relation: "related_materials".into(),
                target: Domain::Material,
                inverse: Some("related_settings".into()),
                when: None,
                select: TargetSelector::NameMention {
                    fields: vec!["name".into(), "description".into()],
                },
            },
            PopulationRuleSpec {
                name: "setting_contaminant_mention".into(),
                source: Domain::Setting,
                relation: "removes_contaminants".into(),
                target: Domain::Contaminant,
                inverse: None,
                when: None,
                select: TargetSelector::NameMention {
                    fields: vec!["description".into(), "contaminants".into()],
                },
            },
            PopulationRuleSpec {
                name: "application_material_mention".into(),
                source: Domain::Application,
                relation: "related_materials".into(),
                target: Domain::Material,
                inverse: Some("used_in_applications".into()),
                when: None,
                select: TargetSelector::NameMention {
                    fields: vec!["materials".into(), "description".into()],
                },
            },
        ];
        Self::from_specs(specs)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[PopulationRule] {
        &self.rules
    }

    pub fn rules_for<'s>(
        &'s self,
        domain: Domain,
        relation: &'s str,
    ) -> impl Iterator<Item = &'s PopulationRule> + 's {
        self.rules
            .iter()
            .filter(move |r| r.spec.source == domain && r.spec.relation == relation)
    }
}

// ============================================================================
// Proposals
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedLink {
    pub rule: String,
    pub source_domain: Domain,
    pub source_id: String,
    pub relation: String,
    pub target_domain: Domain,
    pub target_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationPlan {
    pub domain: Domain,
    pub relation: String,
    /// Share of source entities with at least one item in the relation.
    pub coverage: f64,
    pub coverage_target: f64,
    /// Why no proposals were computed, when they were not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    pub proposals: Vec<ProposedLink>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopulationOutcome {
    pub added: usize,
    pub inverse_added: usize,
    pub findings: Vec<Finding>,
}

/// Share of `domain`'s entities with a non-empty `relation` group.
pub fn relation_coverage(store: &DocumentStore, domain: Domain, relation: &str) -> f64 {
    let Some(doc) = store.document(domain) else {
        return 0.0;
    };
    let total = doc.views().count();
    if total == 0 {
        return 1.0;
    }
    let covered = doc
        .views()
        .filter(|e| {
            e.relationships()
                .and_then(|r| r.get(relation))
                .map(|g| !group_item_values(g).is_empty())
                .unwrap_or(false)
        })
        .count();
    covered as f64 / total as f64
}

fn existing_targets(entity: &EntityView<'_>, relation: &str) -> HashSet<String> {
    entity
        .relationships()
        .and_then(|r| r.get(relation))
        .map(|g| {
            group_item_values(g)
                .into_iter()
                .filter_map(item_reference)
                .map(|(id, _)| id.to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Display name used for mention matching: `name`, or the key without its
/// domain suffix with dashes as spaces.
fn mention_name(domain: Domain, entity: &EntityView<'_>) -> String {
    match entity.name() {
        Some(n) if !n.trim().is_empty() => n.trim().to_string(),
        _ => entity
            .key()
            .strip_suffix(domain.suffix())
            .unwrap_or(entity.key())
            .replace('-', " "),
    }
}

fn mention_regex(name: &str) -> Option<Regex> {
    RegexBuilder::new(&format!(r"\b{}\b", regex::escape(name)))
        .case_insensitive(true)
        .build()
        .ok()
}

fn ci_contains(list: &[String], value: Option<&str>) -> bool {
    value
        .map(|v| list.iter().any(|c| c.eq_ignore_ascii_case(v)))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy)]
pub struct RelationshipPopulator<'a> {
    rules: &'a RuleTable,
}

impl<'a> RelationshipPopulator<'a> {
    pub fn new(rules: &'a RuleTable) -> Self {
        Self { rules }
    }

    pub fn propose(
        &self,
        store: &DocumentStore,
        domain: Domain,
        relation: &str,
        coverage_target: f64,
    ) -> PopulationPlan {
        let coverage = relation_coverage(store, domain, relation);
        let mut plan = PopulationPlan {
            domain,
            relation: relation.to_string(),
            coverage,
            coverage_target,
            skipped: None,
            proposals: Vec::new(),
        };

        let rules: Vec<&PopulationRule> = self.rules.rules_for(domain, relation).collect();
        if rules.is_empty() {
            plan.skipped = Some(format!("no population rule for {domain}.{relation}"));
            return plan;
        }
        if coverage >= coverage_target {
            plan.skipped = Some(format!(
                "coverage {:.1}% already meets target {:.1}%",
                coverage * 100.0,
                coverage_target * 100.0
            ));
            return plan;
        }
        let Some(source_doc) = store.document(domain) else {
            plan.skipped = Some(format!("domain {domain} is not loaded"));
            return plan;
        };

        let mut seen: HashSet<(String, String)> = HashSet::new();
        for rule in rules {
            let Some(target_doc) = store.document(rule.spec.target) else {
                continue;
            };
            let targets: Vec<EntityView<'_>> = target_doc.views().collect();
            let mentions: Vec<Option<Regex>> = match &rule.spec.select {
                TargetSelector::NameMention { .. } => targets
                    .iter()
                    .map(|t| mention_regex(&mention_name(rule.spec.target, t)))
                    .collect(),
                TargetSelector::Category { .. } => Vec::new(),
            };

            for source in source_doc.views() {
                if !rule.source_applies(&source) {
                    continue;
                }
                let existing = existing_targets(&source, relation);
                for (idx, target) in targets.iter().enumerate() {
                    if rule.spec.target == domain && target.key() == source.key() {
                        continue;
                    }
                    let selected = match &rule.spec.select {
                        TargetSelector::Category {
                            categories,
                            subcategories,
                        } => {
                            (categories.is_empty() || ci_contains(categories, target.category()))
                                && (subcategories.is_empty()
                                    || ci_contains(subcategories, target.subcategory()))
                        }
                        TargetSelector::NameMention { fields } => match &mentions[idx] {
                            Some(re) => fields
                                .iter()
                                .flat_map(|f| field_texts(&source, f))
                                .any(|t| re.is_match(t)),
                            None => false,
                        },
                    };
                    if !selected || existing.contains(target.key()) {
                        continue;
                    }
                    if !seen.insert((source.key().to_string(), target.key().to_string())) {
                        continue;
                    }
                    tracing::debug!(
                        rule = %rule.name(),
                        source = %source.key(),
                        target = %target.key(),
                        "proposed link"
                    );
                    plan.proposals.push(ProposedLink {
                        rule: rule.name().to_string(),
                        source_domain: domain,
                        source_id: source.key().to_string(),
                        relation: relation.to_string(),
                        target_domain: rule.spec.target,
                        target_id: target.key().to_string(),
                        inverse: rule.spec.inverse.clone(),
                    });
                }
            }
        }
        tracing::info!(
            domain = %domain,
            relation = %relation,
            coverage = coverage,
            proposals = plan.proposals.len(),
            "computed population plan"
        );
        plan
    }

    /// Insert every proposed link, mirroring into the inverse relation when
    /// the rule declares one. Documents that change are marked dirty.
    pub fn apply(
        &self,
        store: &mut DocumentStore,
        normalizer: &RelationshipNormalizer<'_>,
        plan: &PopulationPlan,
    ) -> PopulationOutcome {
        let mut out = PopulationOutcome::default();
        for link in &plan.proposals {
            match add_reference(
                store,
                normalizer,
                link.source_domain,
                &link.source_id,
                &link.relation,
                &link.target_id,
                link.target_domain,
            ) {
                Ok(true) => out.added += 1,
                Ok(false) => {}
                Err(f) => {
                    out.findings.push(f);
                    continue;
                }
            }
            if let Some(inverse) = &link.inverse {
                match add_reference(
                    store,
                    normalizer,
                    link.target_domain,
                    &link.target_id,
                    inverse,
                    &link.source_id,
                    link.source_domain,
                ) {
                    Ok(true) => out.inverse_added += 1,
                    Ok(false) => {}
                    Err(f) => out.findings.push(f),
                }
            }
        }
        tracing::info!(
            added = out.added,
            inverse_added = out.inverse_added,
            "applied population plan"
        );
        out
    }
}

/// Append `{id: item_id, type: item_domain}` to `owner.relationships[relation]`,
/// creating or canonicalizing the group first. `Ok(false)` when already present.
fn add_reference(
    store: &mut DocumentStore,
    normalizer: &RelationshipNormalizer<'_>,
    owner_domain: Domain,
    owner_id: &str,
    relation: &str,
    item_id: &str,
    item_domain: Domain,
) -> Result<bool, Finding> {
    let locate = |f: Finding| f.in_domain(owner_domain).entity(owner_id).relation(relation);
    let doc = store.document_mut(owner_domain).ok_or_else(|| {
        locate(Finding::io("domain_not_loaded", format!("domain {owner_domain} is not loaded")))
    })?;
    let record = doc
        .entities_mut()
        .get_mut(owner_id)
        .and_then(Value::as_mapping_mut)
        .ok_or_else(|| {
            locate(Finding::broken(
                "broken_link",
                format!("entity `{owner_id}` does not exist"),
            ))
        })?;

    if !matches!(record.get(KEY_RELATIONSHIPS), Some(Value::Mapping(_))) {
        if matches!(record.get(KEY_RELATIONSHIPS), None | Some(Value::Null)) {
            record.insert(KEY_RELATIONSHIPS.into(), Value::Mapping(Mapping::new()));
        } else {
            return Err(locate(Finding::structural(
                "malformed_item",
                "relationships is not a mapping",
            )));
        }
    }
    let Some(rels) = record
        .get_mut(KEY_RELATIONSHIPS)
        .and_then(Value::as_mapping_mut)
    else {
        return Ok(false);
    };

    let current = rels.get(relation).cloned().unwrap_or(Value::Null);
    let normalized = normalizer.normalize(relation, &current);
    if let Some(f) = normalized
        .findings
        .into_iter()
        .find(|f| f.kind.blocks_write())
    {
        return Err(locate(f));
    }
    let mut group = normalized.value;
    let Some(items) = group
        .as_mapping_mut()
        .and_then(|m| m.get_mut(ITEMS_KEY))
        .and_then(Value::as_sequence_mut)
    else {
        return Ok(false);
    };
    if items
        .iter()
        .filter_map(item_reference)
        .any(|(id, _)| id == item_id)
    {
        return Ok(false);
    }
    let item = serde_yaml::to_value(RelationshipItem::reference(item_id, item_domain))
        .map_err(|e| locate(Finding::structural("malformed_item", e.to_string())))?;
    items.push(item);
    rels.insert(relation.into(), group);
    doc.mark_dirty();
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DisplaySchema;
    use matgraph_store::{DomainDocument, KnowledgeBaseConfig};

    fn store(docs: &[(Domain, &str)]) -> DocumentStore {
        let docs = Domain::ALL.into_iter().map(|d| {
            let text = docs
                .iter()
                .find(|(dd, _)| *dd == d)
                .map(|(_, t)| t.to_string())
                .unwrap_or_else(|| format!("{}: {{}}\n", d.tag()));
            DomainDocument::from_yaml_str(d, Path::new(&d.default_file_name()), d.tag(), &text)
                .unwrap()
        });
        DocumentStore::from_documents(KnowledgeBaseConfig::default(), docs)
    }

    const MATERIALS: &str = r#"
materials:
  steel-laser-cleaning: { name: Steel, category: metal, subcategory: ferrous }
  cast-iron-laser-cleaning: { name: Cast Iron, category: metal, subcategory: ferrous }
  aluminum-laser-cleaning: { name: Aluminum, category: metal, subcategory: non-ferrous }
  oak-laser-cleaning: { name: Oak, category: wood }
"#;

    const CONTAMINANTS: &str = r#"
contaminants:
  rust-oxidation-contamination:
    name: Rust Oxidation
    valid_materials: [Aluminum, Steel]
    relationships:
      found_on_materials:
        presentation: card
        items: [{ id: steel-laser-cleaning, type: materials }]
        _section: {}
  paint-contamination:
    name: Paint
    valid_materials: [Oak]
"#;

    #[test]
    fn builtin_rules_compile() {
        let table = RuleTable::builtin().unwrap();
        assert!(table.rules_for(Domain::Contaminant, "found_on_materials").count() >= 2);
    }

    #[test]
    fn invalid_pattern_is_a_rule_error() {
        let err = RuleTable::from_yaml_str(
            r#"
rules:
  - name: broken
    source: contaminants
    relation: found_on_materials
    target: materials
    when: { kind: matches, pattern: "(" }
    select: { kind: name_mention, fields: [name] }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, RuleError::InvalidPattern { .. }));
    }

    #[test]
    fn proposals_skip_existing_links_and_dedupe_across_rules() {
        let s = store(&[(Domain::Material, MATERIALS), (Domain::Contaminant, CONTAMINANTS)]);
        let table = RuleTable::builtin().unwrap();
        let plan = RelationshipPopulator::new(&table).propose(
            &s,
            Domain::Contaminant,
            "found_on_materials",
            1.0,
        );
        assert!(plan.skipped.is_none());
        assert!((plan.coverage - 0.5).abs() < 1e-9);
        let pairs: Vec<(&str, &str)> = plan
            .proposals
            .iter()
            .map(|p| (p.source_id.as_str(), p.target_id.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("rust-oxidation-contamination", "cast-iron-laser-cleaning"),
                ("rust-oxidation-contamination", "aluminum-laser-cleaning"),
                ("paint-contamination", "oak-laser-cleaning"),
            ]
        );
    }

    #[test]
    fn coverage_gate_skips_population() {
        let s = store(&[(Domain::Material, MATERIALS), (Domain::Contaminant, CONTAMINANTS)]);
        let table = RuleTable::builtin().unwrap();
        let plan = RelationshipPopulator::new(&table).propose(
            &s,
            Domain::Contaminant,
            "found_on_materials",
            0.5,
        );
        assert!(plan.skipped.is_some());
        assert!(plan.proposals.is_empty());
    }

    #[test]
    fn apply_is_additive_mirrors_inverse_and_is_idempotent() {
        let mut s = store(&[(Domain::Material, MATERIALS), (Domain::Contaminant, CONTAMINANTS)]);
        let table = RuleTable::builtin().unwrap();
        let display = DisplaySchema::default();
        let normalizer = RelationshipNormalizer::new(&display);
        let populator = RelationshipPopulator::new(&table);

        let plan = populator.propose(&s, Domain::Contaminant, "found_on_materials", 1.0);
        let out = populator.apply(&mut s, &normalizer, &plan);
        assert_eq!(out.added, 3);
        assert_eq!(out.inverse_added, 3);
        assert!(out.findings.is_empty());

        let c = s.require(Domain::Contaminant).unwrap();
        let items = &c.entities()["rust-oxidation-contamination"]["relationships"]
            ["found_on_materials"]["items"];
        assert_eq!(items.as_sequence().unwrap().len(), 3);
        assert_eq!(items[0]["id"].as_str(), Some("steel-laser-cleaning"));

        let m = s.require(Domain::Material).unwrap();
        assert!(m.is_dirty());
        let inverse = &m.entities()["oak-laser-cleaning"]["relationships"]["contaminated_by"];
        assert_eq!(inverse["items"][0]["id"].as_str(), Some("paint-contamination"));
        assert_eq!(inverse["items"][0]["type"].as_str(), Some("contaminants"));

        let again = populator.propose(&s, Domain::Contaminant, "found_on_materials", 1.01);
        assert!(again.proposals.is_empty());
    }

    #[test]
    fn property_threshold_condition() {
        let s = store(&[
            (Domain::Material, MATERIALS),
            (
                Domain::Setting,
                r#"
settings:
  high-power-settings: { name: High Power, properties: { fluence: { value: 8.0, unit: J/cm2 } } }
  gentle-settings: { name: Gentle, properties: { fluence: { value: 1.2, unit: J/cm2 } } }
"#,
            ),
        ]);
        let table = RuleTable::builtin().unwrap();
        let plan = RelationshipPopulator::new(&table).propose(
            &s,
            Domain::Setting,
            "related_materials",
            1.0,
        );
        assert!(plan
            .proposals
            .iter()
            .all(|p| p.source_id == "high-power-settings"));
        assert_eq!(plan.proposals.len(), 3);
    }
}
