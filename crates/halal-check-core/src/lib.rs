//! Ingredient evaluation engine.
//!
//! Given a read-only [`KnowledgeBase`] of ingredient records, [`evaluate`]
//! computes a ruling, a 0-100 confidence score, the derivation chain that
//! produced the ruling and an ordered trace of the decision steps taken.
//! The engine is synchronous and holds no mutable state between calls.

mod classify;
mod evaluate;
mod fields;
mod knowledge;
mod model;
mod modifiers;
mod references;
mod resolver;
mod scoring;

pub use classify::classify_identifier;
pub use evaluate::{
    evaluate, evaluate_recipe, AppliedModifiers, EvaluationResult, RecipeEvaluation,
    RULESET_VERSION,
};
pub use fields::{resolve_field, FieldOrigin, ResolvedField};
pub use knowledge::{DataQualityIssue, DataQualityKind, KnowledgeBase};
pub use model::{humanize_identifier, normalize_identifier, IngredientRecord, IngredientType, Ruling};
pub use modifiers::{
    detect_modifiers, ModifierCategory, ModifierMatch, ModifierMatchSet, OverrideKind,
};
pub use references::{classify_reference, extract_references, ReferenceKind, References};
pub use resolver::{resolve, ResolvedStatus};
pub use scoring::{
    base_score, confidence_level, score, should_mark_unknown, ConfidenceAdjustments,
    ConfidenceLevel, UnknownContext,
};

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum KernelError {
    #[error("validation error: {0}")]
    Validation(String),
}
