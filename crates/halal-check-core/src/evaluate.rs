//! Evaluation orchestrator.
//!
//! [`evaluate`] runs normalization, modifier detection, the override
//! short-circuit, classification, inheritance resolution, modifier
//! downgrade and scoring in that order, recording each step it takes in the
//! result's trace.

use serde::{Deserialize, Serialize};

use crate::classify::classify_with_modifiers;
use crate::fields::{resolve_field, resolve_non_empty, FieldOrigin, ResolvedField};
use crate::knowledge::KnowledgeBase;
use crate::model::{humanize_identifier, normalize_identifier, IngredientRecord, IngredientType, Ruling};
use crate::modifiers::{
    detect_modifiers, override_explanation, ModifierMatch, ModifierMatchSet, OverrideKind,
};
use crate::references::{extract_references, References};
use crate::resolver::{resolve, ResolvedStatus};
use crate::scoring::{
    base_score, confidence_level, score, score_from_base, should_mark_unknown,
    ConfidenceAdjustments, ConfidenceLevel, UnknownContext, CONDITIONAL_MODIFIER_PENALTY,
};

pub const RULESET_VERSION: &str = "evaluation.v1";

const INSUFFICIENT_DATA: &str = "insufficient data; please verify";

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct AppliedModifiers {
    pub overriding: Vec<ModifierMatch>,
    pub conditional: Vec<ModifierMatch>,
    pub processing: Vec<ModifierMatch>,
    pub neutral: Vec<ModifierMatch>,
}

impl From<ModifierMatchSet> for AppliedModifiers {
    fn from(set: ModifierMatchSet) -> Self {
        Self {
            overriding: set.overriding,
            conditional: set.conditional,
            processing: set.processing,
            neutral: set.neutral,
        }
    }
}

/// Result of one evaluation. Built fresh per call and owned by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct EvaluationResult {
    pub ruleset_version: String,
    pub identifier: String,
    pub display_name: String,
    pub ruling: Ruling,
    pub confidence_score: u8,
    pub confidence_level: ConfidenceLevel,
    pub explanation: String,
    pub simple_explanation: String,
    pub alternatives: Vec<String>,
    pub inheritance_chain: Vec<String>,
    pub inherited_from: Option<String>,
    pub modifiers: AppliedModifiers,
    pub trace: Vec<String>,
    pub references: References,
    pub ingredient_type: Option<IngredientType>,
    pub found_in_knowledge_base: bool,
    pub unresolved_ancestors: Vec<String>,
    pub notes: Option<String>,
}

/// Evaluate one raw ingredient name against the Knowledge Base.
///
/// Never fails: identifiers the engine knows nothing about come back as
/// [`Ruling::Unknown`] with a populated confidence score.
#[must_use]
pub fn evaluate(kb: &KnowledgeBase, raw_identifier: &str) -> EvaluationResult {
    let mut trace = Vec::new();

    let normalized = normalize_identifier(raw_identifier);
    trace.push(format!("normalized `{}` to `{normalized}`", raw_identifier.trim()));

    let modifiers = detect_modifiers(&normalized);
    trace.push(describe_scan(&modifiers));

    let identifier = match kb.canonical_identifier(&normalized) {
        Some(canonical) if canonical != normalized => {
            trace.push(format!("alias `{normalized}` resolved to `{canonical}`"));
            canonical.to_string()
        }
        _ => normalized.clone(),
    };
    let record = kb.get(&identifier);
    trace.push(if record.is_some() {
        format!("knowledge base record found for `{identifier}`")
    } else {
        format!("no knowledge base record for `{identifier}`")
    });

    let result = if modifiers.has_overriding_modifier {
        evaluate_overridden(identifier, record, modifiers, trace)
    } else {
        evaluate_resolved(kb, identifier, record, modifiers, trace)
    };

    tracing::debug!(
        identifier = %result.identifier,
        ruling = result.ruling.as_str(),
        confidence = result.confidence_score,
        steps = result.trace.len(),
        "ingredient evaluated"
    );
    result
}

fn evaluate_overridden(
    identifier: String,
    record: Option<&IngredientRecord>,
    modifiers: ModifierMatchSet,
    mut trace: Vec<String>,
) -> EvaluationResult {
    let (modifier, kind, compound_detail) = match modifiers.primary_override() {
        Some(primary) => (
            primary.modifier.clone(),
            primary.override_kind.unwrap_or(OverrideKind::NonHalalMeat),
            primary.explanation.clone().filter(|_| primary.compound),
        ),
        None => (String::new(), OverrideKind::NonHalalMeat, None),
    };
    trace.push(format!(
        "overriding modifier `{modifier}` detected, base ingredient bypassed"
    ));

    let display_name = display_name(record, &identifier);
    let ingredient_type = ingredient_type(record, &identifier, &modifiers).map(|field| field.value);

    let adjustments =
        ConfidenceAdjustments { non_halal_source: true, ..ConfidenceAdjustments::default() };
    let confidence_score = score(ingredient_type, Ruling::Haram, &adjustments);
    trace.push(format!("confidence score {confidence_score}: non-halal source"));

    let explanation = match compound_detail {
        Some(detail) => format!(
            "{display_name} is haram because its name contains `{modifier}` ({detail}): {}.",
            override_explanation(kind)
        ),
        None => format!(
            "{display_name} is haram because its name contains `{modifier}`: {}.",
            override_explanation(kind)
        ),
    };

    EvaluationResult {
        ruleset_version: RULESET_VERSION.to_string(),
        display_name,
        ruling: Ruling::Haram,
        confidence_score,
        confidence_level: confidence_level(confidence_score),
        explanation,
        simple_explanation: override_summary(kind).to_string(),
        alternatives: record.map(|record| record.alternatives.clone()).unwrap_or_default(),
        inheritance_chain: Vec::new(),
        inherited_from: None,
        modifiers: modifiers.into(),
        trace,
        references: record
            .map(|record| extract_references(&record.references))
            .unwrap_or_default(),
        ingredient_type,
        found_in_knowledge_base: record.is_some(),
        unresolved_ancestors: Vec::new(),
        notes: record.and_then(|record| record.notes.clone()),
        identifier,
    }
}

#[allow(clippy::too_many_lines)]
fn evaluate_resolved(
    kb: &KnowledgeBase,
    identifier: String,
    record: Option<&IngredientRecord>,
    modifiers: ModifierMatchSet,
    mut trace: Vec<String>,
) -> EvaluationResult {
    let display_name = display_name(record, &identifier);

    let ingredient_type = ingredient_type(record, &identifier, &modifiers);
    trace.push(match &ingredient_type {
        Some(field) => format!(
            "ingredient type `{}` from {}",
            field.value.as_str(),
            field.origin.as_str()
        ),
        None => "ingredient type could not be classified".to_string(),
    });
    let ingredient_type = ingredient_type.map(|field| field.value);

    let resolution = resolve(kb, &identifier);
    if let Some(status) = &resolution {
        if !status.chain.is_empty() {
            trace.push(format!(
                "resolved derivation chain {} to `{}`",
                status.chain.join(" -> "),
                status.ruling.as_str()
            ));
        }
        if !status.unresolved.is_empty() {
            trace.push(format!("ancestors not resolved: {}", status.unresolved.join(", ")));
        }
    }

    let natural_plant_default = record.and_then(|record| record.ruling).is_none()
        && ingredient_type == Some(IngredientType::NaturalPlant);

    // resolver -> record -> natural-plant default -> unknown
    let resolved_ruling = resolve_field([
        (
            FieldOrigin::Inheritance,
            resolution.as_ref().filter(|status| !status.chain.is_empty()).map(|status| status.ruling),
        ),
        (FieldOrigin::Record, record.and_then(|record| record.ruling)),
        (FieldOrigin::PolicyDefault, natural_plant_default.then_some(Ruling::Halal)),
    ])
    .unwrap_or(ResolvedField { value: Ruling::Unknown, origin: FieldOrigin::Derived });
    trace.push(format!(
        "ruling `{}` from {}",
        resolved_ruling.value.as_str(),
        resolved_ruling.origin.as_str()
    ));

    let inherited_from = resolution
        .as_ref()
        .filter(|_| resolved_ruling.origin == FieldOrigin::Inheritance)
        .and_then(|status| status.inherited_haram_source.clone());
    if let Some(source) = &inherited_from {
        trace.push(format!("haram inherited from `{source}`"));
    }

    let mut ruling = resolved_ruling.value;
    let mut downgraded_by: Option<&ModifierMatch> = None;
    if let Some(modifier) = modifiers.first_conditional().or_else(|| modifiers.first_processing()) {
        if ruling == Ruling::Halal {
            ruling = Ruling::Conditional;
            downgraded_by = Some(modifier);
            trace.push(format!("downgraded to conditional by modifier `{}`", modifier.modifier));
        } else {
            trace.push(format!(
                "modifier `{}` recorded without changing the `{}` ruling",
                modifier.modifier,
                ruling.as_str()
            ));
        }
    }

    let context = UnknownContext {
        taxonomy_classified: ingredient_type.is_some(),
        record_exists: record.is_some(),
        natural_plant_default: resolved_ruling.origin == FieldOrigin::PolicyDefault,
        explicit_haram: ruling == Ruling::Haram,
    };
    let insufficient_data = should_mark_unknown(&context);

    let adjustments = ConfidenceAdjustments {
        processed_when_raw_expected: ingredient_type == Some(IngredientType::NaturalPlant)
            && modifiers.has_processing(),
        uncertified_animal_source: ingredient_type.is_some_and(IngredientType::is_animal_sourced)
            && !record.is_some_and(|record| record.halal_certified),
        contains_additives: record.is_some_and(|record| record.contains_additives),
        derived_from_haram: inherited_from.is_some(),
        conditional_modifier: modifiers.has_conditional().then(|| {
            modifiers.max_conditional_reduction().unwrap_or(CONDITIONAL_MODIFIER_PENALTY)
        }),
        processing_modifier: modifiers.has_processing(),
        unknown_source: insufficient_data,
        non_halal_source: false,
        halal_certified: record.is_some_and(|record| record.halal_certified),
        verified_source: record.is_some_and(|record| record.verified_source),
    };

    // record.base_confidence -> (type x ruling) table
    let base = resolve_field([
        (FieldOrigin::Record, record.and_then(|record| record.base_confidence)),
        (FieldOrigin::Derived, Some(base_score(ingredient_type, ruling))),
    ])
    .map_or(0.0, |field| field.value);
    let confidence_score = score_from_base(base, ruling, &adjustments);
    let level = confidence_level(confidence_score);
    trace.push(format!("confidence score {confidence_score} ({})", level.as_str()));

    let alternatives = alternatives(kb, record, resolution.as_ref());

    let (explanation, simple_explanation) = explain(&Explanation {
        display_name: &display_name,
        ruling,
        origin: resolved_ruling.origin,
        inherited_from: inherited_from.as_deref(),
        resolution: resolution.as_ref(),
        downgraded_by,
        record_exists: record.is_some(),
    });

    EvaluationResult {
        ruleset_version: RULESET_VERSION.to_string(),
        display_name,
        ruling,
        confidence_score,
        confidence_level: level,
        explanation,
        simple_explanation,
        alternatives,
        inheritance_chain: resolution.as_ref().map(|status| status.chain.clone()).unwrap_or_default(),
        inherited_from,
        modifiers: modifiers.into(),
        trace,
        references: record
            .map(|record| extract_references(&record.references))
            .unwrap_or_default(),
        ingredient_type,
        found_in_knowledge_base: record.is_some(),
        unresolved_ancestors: resolution.map(|status| status.unresolved).unwrap_or_default(),
        notes: record.and_then(|record| record.notes.clone()),
        identifier,
    }
}

// record.display_name -> humanized identifier
fn display_name(record: Option<&IngredientRecord>, identifier: &str) -> String {
    resolve_field([
        (FieldOrigin::Record, record.and_then(|record| record.display_name.clone())),
        (FieldOrigin::Derived, Some(humanize_identifier(identifier))),
    ])
    .map_or_else(|| identifier.to_string(), |field| field.value)
}

// record.ingredient_type -> lexical classifier
fn ingredient_type(
    record: Option<&IngredientRecord>,
    identifier: &str,
    modifiers: &ModifierMatchSet,
) -> Option<ResolvedField<IngredientType>> {
    resolve_field([
        (FieldOrigin::Record, record.and_then(|record| record.ingredient_type)),
        (FieldOrigin::Heuristic, classify_with_modifiers(identifier, Some(modifiers))),
    ])
}

// record -> inherited haram source -> first ancestor with alternatives
fn alternatives(
    kb: &KnowledgeBase,
    record: Option<&IngredientRecord>,
    resolution: Option<&ResolvedStatus>,
) -> Vec<String> {
    let from_source = resolution
        .and_then(|status| status.inherited_haram_source.as_deref())
        .and_then(|source| kb.get(source))
        .map(|source| source.alternatives.clone());
    let from_chain = resolution.and_then(|status| {
        status
            .chain
            .iter()
            .filter_map(|ancestor| kb.get(ancestor))
            .find(|ancestor| !ancestor.alternatives.is_empty())
            .map(|ancestor| ancestor.alternatives.clone())
    });
    resolve_non_empty([
        (FieldOrigin::Record, record.map(|record| record.alternatives.clone())),
        (FieldOrigin::Inheritance, from_source),
        (FieldOrigin::Inheritance, from_chain),
    ])
    .map(|field| field.value)
    .unwrap_or_default()
}

struct Explanation<'a> {
    display_name: &'a str,
    ruling: Ruling,
    origin: FieldOrigin,
    inherited_from: Option<&'a str>,
    resolution: Option<&'a ResolvedStatus>,
    downgraded_by: Option<&'a ModifierMatch>,
    record_exists: bool,
}

fn explain(input: &Explanation<'_>) -> (String, String) {
    let name = input.display_name;
    match input.ruling {
        Ruling::Haram => match input.inherited_from {
            Some(source) => {
                let chain = input
                    .resolution
                    .map(|status| status.chain.join(" -> "))
                    .unwrap_or_default();
                (
                    format!("{name} is haram because it derives from `{source}` (derivation chain: {chain})."),
                    format!("Not halal: made from {}.", humanize_identifier(source).to_lowercase()),
                )
            }
            None => (
                format!("{name} is recorded as haram in the knowledge base."),
                "Not halal.".to_string(),
            ),
        },
        Ruling::Conditional => match input.downgraded_by {
            Some(modifier) => (
                format!(
                    "{name} requires verification: {}.",
                    modifier.explanation.as_deref().unwrap_or("its source could not be confirmed")
                ),
                "Check the source before consuming.".to_string(),
            ),
            None if input.origin == FieldOrigin::Inheritance => (
                format!("{name} is conditional because one of its ingredients depends on how it was sourced."),
                "Halal status depends on the source; check the label.".to_string(),
            ),
            None => (
                format!("{name} is conditional: halal only when sourced and processed accordingly."),
                "Halal status depends on the source; check the label.".to_string(),
            ),
        },
        Ruling::Halal => {
            let basis = if input.origin == FieldOrigin::PolicyDefault {
                "as a plant-based ingredient with no contrary data"
            } else {
                "according to the knowledge base"
            };
            (format!("{name} is halal {basis}."), "Halal.".to_string())
        }
        Ruling::Unknown if !input.record_exists => (
            format!("{name}: {INSUFFICIENT_DATA}."),
            "Unknown: please verify with the manufacturer.".to_string(),
        ),
        Ruling::Unknown => (
            format!("{name} has no recorded ruling; please verify."),
            "Unknown: please verify with the manufacturer.".to_string(),
        ),
    }
}

fn override_summary(kind: OverrideKind) -> &'static str {
    match kind {
        OverrideKind::Alcohol => "Not halal: contains alcohol.",
        OverrideKind::Pork => "Not halal: contains pork.",
        OverrideKind::NonHalalMeat => "Not halal: contains non-halal meat or animal material.",
        OverrideKind::Gelatin => "Not halal: contains gelatin of unknown origin.",
    }
}

fn describe_scan(modifiers: &ModifierMatchSet) -> String {
    if modifiers.is_empty() {
        return "no modifiers detected".to_string();
    }
    let mut parts = Vec::new();
    for (label, items) in [
        ("overriding", &modifiers.overriding),
        ("conditional", &modifiers.conditional),
        ("processing", &modifiers.processing),
        ("neutral", &modifiers.neutral),
    ] {
        if !items.is_empty() {
            let names = items.iter().map(|item| item.modifier.as_str()).collect::<Vec<_>>();
            parts.push(format!("{label} [{}]", names.join(", ")));
        }
    }
    format!("modifiers detected: {}", parts.join("; "))
}

/// Batch result for a list of ingredients.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct RecipeEvaluation {
    pub ruleset_version: String,
    pub ruling: Ruling,
    pub confidence_score: u8,
    pub confidence_level: ConfidenceLevel,
    /// Identifiers of every item whose ruling is not halal, in input order.
    pub flagged: Vec<String>,
    pub items: Vec<EvaluationResult>,
}

/// Evaluate every ingredient of a recipe.
///
/// The recipe is haram if any item is, else conditional, else unknown,
/// else halal. Confidence is the lowest item confidence. An empty list is
/// `unknown` with confidence 0.
#[must_use]
pub fn evaluate_recipe<S: AsRef<str>>(kb: &KnowledgeBase, ingredients: &[S]) -> RecipeEvaluation {
    let items: Vec<EvaluationResult> =
        ingredients.iter().map(|ingredient| evaluate(kb, ingredient.as_ref())).collect();

    let has = |ruling: Ruling| items.iter().any(|item| item.ruling == ruling);
    let ruling = if items.is_empty() {
        Ruling::Unknown
    } else if has(Ruling::Haram) {
        Ruling::Haram
    } else if has(Ruling::Conditional) {
        Ruling::Conditional
    } else if has(Ruling::Unknown) {
        Ruling::Unknown
    } else {
        Ruling::Halal
    };

    let confidence_score = items.iter().map(|item| item.confidence_score).min().unwrap_or(0);
    let flagged = items
        .iter()
        .filter(|item| item.ruling != Ruling::Halal)
        .map(|item| item.identifier.clone())
        .collect();

    tracing::debug!(items = items.len(), ruling = ruling.as_str(), "recipe evaluated");

    RecipeEvaluation {
        ruleset_version: RULESET_VERSION.to_string(),
        ruling,
        confidence_score,
        confidence_level: confidence_level(confidence_score),
        flagged,
        items,
    }
}
