//! Integration tests for the complete Matgraph pipeline
//!
//! These tests verify end-to-end behavior across crates:
//! - Store → Identity → Rename propagation → Integrity
//! - Store → Range rebuild → Range validation
//! - Normalize → Normalize (idempotence)
//!
//! Run with: cargo test --test integration_tests

use std::path::PathBuf;

use approx::assert_relative_eq;
use matgraph_engine::{
    pipeline, CategoryRangeRegistry, DisplaySchema, Engine, PropertyTaxonomy, RuleTable,
};
use matgraph_model::relationship::{group_item_values, item_reference};
use matgraph_model::Domain;
use matgraph_store::{DocumentStore, DomainDocument, KnowledgeBaseConfig};

// ============================================================================
// Fixtures
// ============================================================================

const TAXONOMY: &str = r#"
categories:
  material_characteristics:
    properties: [density]
  laser_material_interaction:
    properties: [thermalConductivity]
  laser_parameters:
    properties: [fluence]
"#;

const DISPLAY: &str = r#"
relationships:
  contaminated_by: { presentation: card, target: contaminants, title: Contaminants }
  found_on_materials: { presentation: card, target: materials, title: Found On }
  produces_compounds: { presentation: table, target: compounds, title: Byproducts }
  related_materials: { presentation: card, target: materials }
  used_in_applications: { presentation: descriptive, target: applications }
"#;

const MATERIALS: &str = r#"
materials:
  aluminum:
    name: Aluminum
    category: metal
    properties:
      thermalConductivity: { value: 237.0, unit: W/(m·K) }
  copper:
    name: Copper
    category: metal
    properties:
      thermalConductivity: { value: 401.0, unit: W/(m·K) }
    relationships:
      used_in_applications:
        - electronics-applications
  stainless-steel-laser-cleaning:
    id: stainless-steel-laser-cleaning
    name: Stainless Steel
    category: metal
    properties:
      thermalConductivity: { value: 15.0, unit: W/(m·K) }
  bismuth-laser-cleaning:
    id: bismuth-laser-cleaning
    name: Bismuth
    category: metal
    properties:
      laser_material_interaction:
        thermalConductivity: { value: 8.4, unit: W/(m·K) }
"#;

const CONTAMINANTS: &str = r#"
contaminants:
  rust-oxidation:
    name: Rust Oxidation
    relationships:
      found_on_materials:
        - id: aluminum
          type: materials
        - id: copper
          type: materials
      produces_compounds:
        presentation: table
        items:
          - id: iron-oxide-compound
"#;

const COMPOUNDS: &str = r#"
compounds:
  iron-oxide-compound:
    id: iron-oxide-compound
    name: Iron Oxide
"#;

const SETTINGS: &str = r#"
settings:
  copper-settings:
    id: copper-settings
    name: Copper Settings
    properties:
      fluence: { value: 3.5, unit: J/cm² }
    relationships:
      related_materials:
        - copper
"#;

const APPLICATIONS: &str = r#"
applications:
  electronics-applications:
    id: electronics-applications
    name: Electronics
    relationships:
      related_materials:
        presentation: card
        items:
          - id: copper
            type: materials
"#;

fn engine() -> Engine {
    Engine::new(
        PropertyTaxonomy::from_yaml_str(TAXONOMY).unwrap(),
        CategoryRangeRegistry::default(),
        DisplaySchema::from_yaml_str(DISPLAY).unwrap(),
        RuleTable::builtin().unwrap(),
    )
}

fn store_with(materials: &str) -> DocumentStore {
    let docs = [
        (Domain::Material, materials),
        (Domain::Contaminant, CONTAMINANTS),
        (Domain::Compound, COMPOUNDS),
        (Domain::Setting, SETTINGS),
        (Domain::Application, APPLICATIONS),
    ]
    .into_iter()
    .map(|(domain, text)| {
        let path = PathBuf::from(domain.default_file_name());
        DomainDocument::from_yaml_str(domain, &path, domain.tag(), text).unwrap()
    });
    DocumentStore::from_documents(KnowledgeBaseConfig::default(), docs)
}

fn store() -> DocumentStore {
    store_with(MATERIALS)
}

/// Every `(source key, relation, target id)` reference in the store.
fn references(store: &DocumentStore) -> Vec<(Domain, String, String, String)> {
    let mut out = Vec::new();
    for doc in store.documents() {
        for entity in doc.views() {
            let Some(rels) = entity.relationships() else {
                continue;
            };
            for (rel, group) in rels {
                let rel = rel.as_str().unwrap_or_default().to_string();
                for item in group_item_values(group) {
                    if let Some((id, _)) = item_reference(item) {
                        out.push((doc.domain(), entity.key().to_string(), rel.clone(), id.to_string()));
                    }
                }
            }
        }
    }
    out
}

// ============================================================================
// Identity and rename propagation
// ============================================================================

#[test]
fn test_aluminum_scenario_renames_and_rewrites_reference() {
    let engine = engine();
    let mut store = store();

    let report = pipeline::normalize(&engine, &mut store, &Domain::ALL, true).unwrap();
    assert!(!report.write_blocked, "{:?}", report.findings);

    let materials = store.document(Domain::Material).unwrap();
    assert!(!materials.contains_key("aluminum"));
    let aluminum = materials.entity("aluminum-laser-cleaning").unwrap();
    assert_eq!(aluminum.id(), Some("aluminum-laser-cleaning"));

    let contaminants = store.document(Domain::Contaminant).unwrap();
    let rust = contaminants.entity("rust-oxidation-contamination").unwrap();
    let group = &rust.relationships().unwrap()["found_on_materials"];
    let first = group_item_values(group)[0];
    assert_eq!(item_reference(first), Some(("aluminum-laser-cleaning", Some("materials"))));

    let integrity = report.integrity.unwrap();
    assert!(integrity.is_clean(), "{:?}", integrity.broken_links);
}

#[test]
fn test_rename_propagates_to_every_domain() {
    let engine = engine();
    let mut store = store();
    pipeline::normalize(&engine, &mut store, &Domain::ALL, true).unwrap();

    let refs = references(&store);
    assert!(refs.iter().all(|(_, _, _, target)| target != "copper"));
    let copper_refs: Vec<_> = refs
        .iter()
        .filter(|(_, _, _, target)| target == "copper-laser-cleaning")
        .map(|(domain, _, _, _)| *domain)
        .collect();
    assert!(copper_refs.contains(&Domain::Contaminant));
    assert!(copper_refs.contains(&Domain::Setting));
    assert!(copper_refs.contains(&Domain::Application));
}

#[test]
fn test_every_key_carries_its_domain_suffix_after_normalize() {
    let engine = engine();
    let mut store = store();
    pipeline::normalize(&engine, &mut store, &Domain::ALL, true).unwrap();

    for doc in store.documents() {
        for entity in doc.views() {
            assert!(
                doc.domain().has_suffix(entity.key()),
                "{} lacks {}",
                entity.key(),
                doc.domain().suffix()
            );
            assert_eq!(entity.id(), Some(entity.key()));
        }
    }
}

#[test]
fn test_referential_closure_after_normalize() {
    let engine = engine();
    let mut store = store();
    pipeline::normalize(&engine, &mut store, &Domain::ALL, true).unwrap();

    let key_sets = store.key_sets();
    let display = DisplaySchema::from_yaml_str(DISPLAY).unwrap();
    for (domain, source, rel, target) in references(&store) {
        let target_domain = display
            .target_for(&rel)
            .unwrap_or_else(|| panic!("{domain}.{source}.{rel} has no target domain"));
        assert!(
            key_sets[&target_domain].contains(&target),
            "{domain}.{source}.{rel} -> {target} is dangling"
        );
    }
}

// ============================================================================
// Idempotence
// ============================================================================

#[test]
fn test_normalize_is_idempotent() {
    let engine = engine();
    let mut store = store();
    let first = pipeline::normalize(&engine, &mut store, &Domain::ALL, true).unwrap();
    assert!(first.groups_changed > 0);
    let snapshot: Vec<String> = store
        .documents()
        .map(|d| d.render().unwrap())
        .collect();

    let second = pipeline::normalize(&engine, &mut store, &Domain::ALL, true).unwrap();
    assert_eq!(second.groups_changed, 0);
    assert!(second.renames.is_empty());
    assert_eq!(second.ids_filled, 0);
    assert_eq!(second.references_rewritten, 0);
    let again: Vec<String> = store
        .documents()
        .map(|d| d.render().unwrap())
        .collect();
    assert_eq!(snapshot, again);
}

// ============================================================================
// Category ranges
// ============================================================================

#[test]
fn test_thermal_conductivity_range_from_three_samples() {
    let engine = engine();
    let materials = r#"
materials:
  copper-laser-cleaning:
    id: copper-laser-cleaning
    category: metal
    properties:
      thermalConductivity: { value: 401.0, unit: W/(m·K) }
  stainless-steel-laser-cleaning:
    id: stainless-steel-laser-cleaning
    category: metal
    properties:
      thermalConductivity: { value: 15.0, unit: W/(m·K) }
  bismuth-laser-cleaning:
    id: bismuth-laser-cleaning
    category: metal
    properties:
      thermalConductivity: { value: 8.4, unit: W/(m·K) }
"#;
    let store = store_with(materials);
    let report = pipeline::rebuild_ranges(&engine, &store, false).unwrap();
    let tc = report
        .ranges
        .iter()
        .find(|r| r.category == "metal" && r.property == "thermalConductivity")
        .unwrap();
    assert_relative_eq!(tc.min, 7.98, epsilon = 1e-9);
    assert_relative_eq!(tc.max, 421.05, epsilon = 1e-9);
    assert_eq!(tc.unit.as_deref(), Some("W/(m·K)"));
    assert_eq!(tc.samples, 3);
}

#[test]
fn test_rebuilt_registry_leaves_no_orphan_property() {
    let engine = engine();
    let store = store();
    let rebuilt = engine.ranges.rebuild_from_entities(&store);

    let materials = store.document(Domain::Material).unwrap();
    for entity in materials.views() {
        let category = entity.category().unwrap();
        for prop in entity.properties() {
            assert!(!prop.record.has_min_max());
            if prop.record.numeric_value().is_some() {
                assert!(
                    rebuilt.registry.range_for(category, prop.name).is_some(),
                    "{category}.{} has no range",
                    prop.name
                );
            }
        }
    }

    let validation = rebuilt.registry.validate(&store);
    assert!(validation
        .findings
        .iter()
        .all(|f| f.code != "missing_category_range" && f.code != "value_out_of_range"));
}

#[test]
fn test_entity_min_max_blocks_every_write() {
    let engine = engine();
    let materials = r#"
materials:
  brass:
    category: metal
    properties:
      density: { min: 8.4, max: 8.7, unit: g/cm³ }
"#;
    let mut store = store_with(materials);
    let report = pipeline::normalize(&engine, &mut store, &Domain::ALL, true).unwrap();
    assert!(report.write_blocked);
    assert!(report.findings.iter().any(|f| f.code == "entity_has_min_max"));
    assert!(report.written.is_empty());
    // The blocked run still renamed in memory; nothing reached the commit.
    assert!(store.document(Domain::Material).unwrap().is_dirty());
}
