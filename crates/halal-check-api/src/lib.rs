use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use halal_check_core::{
    detect_modifiers, evaluate, evaluate_recipe, normalize_identifier, resolve, EvaluationResult,
    KnowledgeBase, ModifierMatchSet, RecipeEvaluation, ResolvedStatus,
};
use halal_check_kb::{fingerprint, LoadedKnowledgeBase};
use serde::{Deserialize, Serialize};

mod config;

pub use config::{ConfigError, EngineConfig, DEFAULT_MAX_RECIPE_ITEMS};
pub use halal_check_kb::{KnowledgeBaseFormat, KnowledgeBaseReport};

pub const API_CONTRACT_VERSION: &str = "api.v1";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvaluateRequest {
    pub ingredient: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeRequest {
    pub ingredients: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModifiersResult {
    pub identifier: String,
    pub modifiers: ModifierMatchSet,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolveResult {
    pub identifier: String,
    pub found: bool,
    pub status: Option<ResolvedStatus>,
}

/// Shared, read-only engine handle. Cloning shares the loaded Knowledge Base.
#[derive(Debug, Clone)]
pub struct HalalCheckApi {
    inner: Arc<LoadedKnowledgeBase>,
    max_recipe_items: usize,
}

impl HalalCheckApi {
    /// Load the configured Knowledge Base once.
    ///
    /// # Errors
    /// Returns an error when the config is invalid or the Knowledge Base cannot be loaded.
    pub fn open(config: &EngineConfig) -> Result<Self> {
        config.validate().context("invalid engine config")?;
        let loaded = halal_check_kb::load(&config.knowledge_base, config.format)?;
        tracing::debug!(max_recipe_items = config.max_recipe_items, "evaluation engine opened");
        Ok(Self { inner: Arc::new(loaded), max_recipe_items: config.max_recipe_items })
    }

    /// Open from a YAML config file.
    ///
    /// # Errors
    /// Returns an error when the config file or the Knowledge Base cannot be loaded.
    pub fn open_config_file(path: &Path) -> Result<Self> {
        let config = EngineConfig::from_path(path)
            .with_context(|| format!("failed to load engine config {}", path.display()))?;
        Self::open(&config)
    }

    /// Wrap an already built Knowledge Base.
    ///
    /// # Errors
    /// Returns an error when the fingerprint cannot be computed or the limit is zero.
    pub fn from_knowledge_base(knowledge_base: KnowledgeBase, max_recipe_items: usize) -> Result<Self> {
        if max_recipe_items == 0 {
            return Err(anyhow!("max_recipe_items must be greater than 0"));
        }
        let fingerprint = fingerprint(&knowledge_base)?;
        Ok(Self {
            inner: Arc::new(LoadedKnowledgeBase {
                knowledge_base,
                fingerprint,
                source_path: "<memory>".into(),
            }),
            max_recipe_items,
        })
    }

    #[must_use]
    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.inner.knowledge_base
    }

    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.inner.fingerprint
    }

    #[must_use]
    pub fn max_recipe_items(&self) -> usize {
        self.max_recipe_items
    }

    /// # Errors
    /// Returns an error when the ingredient is blank.
    pub fn evaluate(&self, request: &EvaluateRequest) -> Result<EvaluationResult> {
        require_ingredient(&request.ingredient)?;
        Ok(evaluate(self.knowledge_base(), &request.ingredient))
    }

    /// Modifier scan over the normalized ingredient name.
    ///
    /// # Errors
    /// Returns an error when the ingredient is blank.
    pub fn detect_modifiers(&self, request: &EvaluateRequest) -> Result<ModifiersResult> {
        let identifier = require_ingredient(&request.ingredient)?;
        let modifiers = detect_modifiers(&identifier);
        Ok(ModifiersResult { identifier, modifiers })
    }

    /// Derivation-chain resolution only. An absent identifier is `found: false`, not an error.
    ///
    /// # Errors
    /// Returns an error when the ingredient is blank.
    pub fn resolve(&self, request: &EvaluateRequest) -> Result<ResolveResult> {
        let identifier = require_ingredient(&request.ingredient)?;
        let status = resolve(self.knowledge_base(), &identifier);
        Ok(ResolveResult { identifier, found: status.is_some(), status })
    }

    /// # Errors
    /// Returns an error for an empty list, a list above `max_recipe_items`, or a blank item.
    pub fn evaluate_recipe(&self, request: &RecipeRequest) -> Result<RecipeEvaluation> {
        if request.ingredients.is_empty() {
            return Err(anyhow!("recipe must list at least one ingredient"));
        }
        if request.ingredients.len() > self.max_recipe_items {
            return Err(anyhow!(
                "recipe lists {} ingredients; the limit is {}",
                request.ingredients.len(),
                self.max_recipe_items
            ));
        }
        for ingredient in &request.ingredients {
            require_ingredient(ingredient)?;
        }
        Ok(evaluate_recipe(self.knowledge_base(), &request.ingredients))
    }

    #[must_use]
    pub fn knowledge_base_report(&self) -> KnowledgeBaseReport {
        self.inner.report()
    }
}

fn require_ingredient(raw: &str) -> Result<String> {
    let identifier = normalize_identifier(raw);
    if identifier.is_empty() {
        return Err(anyhow!("ingredient must contain at least one alphanumeric character"));
    }
    Ok(identifier)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use halal_check_core::{IngredientRecord, Ruling};

    use super::*;

    fn sample_api(max_recipe_items: usize) -> HalalCheckApi {
        let records = vec![
            IngredientRecord::new("marshmallow", Some(Ruling::Halal)).derived_from(["gelatin"]),
            IngredientRecord::new("gelatin", Some(Ruling::Conditional)).derived_from(["pork"]),
            IngredientRecord::new("pork", Some(Ruling::Haram)),
        ];
        let kb = match KnowledgeBase::from_records(records) {
            Ok(kb) => kb,
            Err(err) => panic!("knowledge base should build: {err}"),
        };
        match HalalCheckApi::from_knowledge_base(kb, max_recipe_items) {
            Ok(api) => api,
            Err(err) => panic!("api should open: {err}"),
        }
    }

    fn unique_temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("halal-check-api-{}", ulid::Ulid::new()));
        if let Err(err) = std::fs::create_dir_all(&dir) {
            panic!("failed to create temp dir: {err}");
        }
        dir
    }

    // Test IDs: TAPI-001
    #[test]
    fn api_evaluates_inherited_haram() -> Result<()> {
        let api = sample_api(DEFAULT_MAX_RECIPE_ITEMS);
        let result = api.evaluate(&EvaluateRequest { ingredient: "Marshmallow".to_string() })?;
        assert_eq!(result.ruling, Ruling::Haram);
        assert_eq!(result.inherited_from.as_deref(), Some("pork"));
        assert!(api.fingerprint().starts_with("kb_"));
        Ok(())
    }

    // Test IDs: TAPI-002
    #[test]
    fn api_rejects_blank_ingredient_and_bad_recipes() {
        let api = sample_api(2);
        assert!(api.evaluate(&EvaluateRequest { ingredient: " - ".to_string() }).is_err());
        assert!(api.evaluate_recipe(&RecipeRequest { ingredients: Vec::new() }).is_err());
        let too_many = RecipeRequest {
            ingredients: vec!["apple".to_string(), "rice".to_string(), "salt".to_string()],
        };
        let err = match api.evaluate_recipe(&too_many) {
            Ok(_) => panic!("expected recipe limit error"),
            Err(err) => err,
        };
        assert!(err.to_string().contains("the limit is 2"));
    }

    // Test IDs: TAPI-003
    #[test]
    fn api_resolve_reports_absent_identifiers_as_not_found() -> Result<()> {
        let api = sample_api(DEFAULT_MAX_RECIPE_ITEMS);
        let missing = api.resolve(&EvaluateRequest { ingredient: "tofu".to_string() })?;
        assert!(!missing.found);
        assert_eq!(missing.status, None);

        let found = api.resolve(&EvaluateRequest { ingredient: "gelatin".to_string() })?;
        assert!(found.found);
        assert_eq!(found.status.map(|status| status.ruling), Some(Ruling::Haram));
        Ok(())
    }

    // Test IDs: TAPI-004
    #[test]
    fn api_modifiers_normalize_input() -> Result<()> {
        let api = sample_api(DEFAULT_MAX_RECIPE_ITEMS);
        let result = api.detect_modifiers(&EvaluateRequest { ingredient: "Wine-Braised Beef".to_string() })?;
        assert_eq!(result.identifier, "wine_braised_beef");
        assert!(result.modifiers.has_overriding_modifier);
        Ok(())
    }

    // Test IDs: TAPI-005
    #[test]
    fn api_opens_from_config_file_and_reports() -> Result<()> {
        let dir = unique_temp_dir();
        std::fs::write(
            dir.join("kb.json"),
            r#"{"apple": {"ruling": "halal"}, "lard": {"ruling": "haram", "aliases": ["pork fat"]}}"#,
        )?;
        std::fs::write(dir.join("engine.yaml"), "knowledge_base: kb.json\nmax_recipe_items: 5\n")?;

        let api = HalalCheckApi::open_config_file(&dir.join("engine.yaml"))?;
        assert_eq!(api.max_recipe_items(), 5);
        let report = api.knowledge_base_report();
        assert_eq!(report.records, 2);
        assert_eq!(report.aliases, 1);
        assert_eq!(report.fingerprint, api.fingerprint());

        let recipe = api.evaluate_recipe(&RecipeRequest {
            ingredients: vec!["apple".to_string(), "pork fat".to_string()],
        })?;
        assert_eq!(recipe.ruling, Ruling::Haram);
        assert_eq!(recipe.flagged, vec!["lard".to_string()]);

        let _ = std::fs::remove_dir_all(&dir);
        Ok(())
    }

    // Test IDs: TAPI-006
    #[test]
    fn api_open_fails_without_knowledge_base() {
        let dir = unique_temp_dir();
        let config = EngineConfig::for_knowledge_base(dir.join("missing.json"));
        assert!(HalalCheckApi::open(&config).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
