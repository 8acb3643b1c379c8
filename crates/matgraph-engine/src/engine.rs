//! The engine's immutable inputs, loaded once per run.

use matgraph_store::KnowledgeBaseConfig;

use crate::audit::GraphAuditor;
use crate::display::DisplaySchema;
use crate::error::EngineError;
use crate::integrity::ReferentialIntegrityChecker;
use crate::normalizer::RelationshipNormalizer;
use crate::populate::{RelationshipPopulator, RuleTable};
use crate::ranges::CategoryRangeRegistry;
use crate::taxonomy::PropertyTaxonomy;

/// Taxonomy, range registry, display schema and rule table.
///
/// Components borrow from here; nothing mutates these after load.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    pub taxonomy: PropertyTaxonomy,
    pub ranges: CategoryRangeRegistry,
    pub display: DisplaySchema,
    pub rules: RuleTable,
}

impl Engine {
    pub fn new(
        taxonomy: PropertyTaxonomy,
        ranges: CategoryRangeRegistry,
        display: DisplaySchema,
        rules: RuleTable,
    ) -> Self {
        Self {
            taxonomy,
            ranges,
            display,
            rules,
        }
    }

    /// Load every collaborator document named by the config.
    ///
    /// The taxonomy and display schema are required. A missing range document
    /// is an empty registry; without a rule document the built-in rules apply.
    pub fn load(config: &KnowledgeBaseConfig) -> Result<Self, EngineError> {
        let taxonomy = PropertyTaxonomy::load(&config.taxonomy_path())?;
        let display = DisplaySchema::load(&config.display_schema_path())?;
        let ranges = CategoryRangeRegistry::load_or_empty(&config.category_ranges_path())?;
        let rules = match config.population_rules_path() {
            Some(path) => RuleTable::load(&path)?,
            None => RuleTable::builtin()?,
        };
        Ok(Self::new(taxonomy, ranges, display, rules))
    }

    pub fn normalizer(&self) -> RelationshipNormalizer<'_> {
        RelationshipNormalizer::new(&self.display)
    }

    pub fn integrity(&self) -> ReferentialIntegrityChecker<'_> {
        ReferentialIntegrityChecker::new(Some(&self.display))
    }

    pub fn populator(&self) -> RelationshipPopulator<'_> {
        RelationshipPopulator::new(&self.rules)
    }

    pub fn auditor(&self) -> GraphAuditor<'_> {
        GraphAuditor::new(&self.taxonomy, &self.ranges, &self.display)
    }
}
