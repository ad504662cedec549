use serde::{Deserialize, Serialize};

use crate::model::{IngredientType, Ruling};

pub const PROCESSED_WHEN_RAW_EXPECTED_PENALTY: i32 = 15;
pub const UNCERTIFIED_ANIMAL_PENALTY: i32 = 20;
pub const CONTAINS_ADDITIVES_PENALTY: i32 = 10;
pub const DERIVED_FROM_HARAM_PENALTY: i32 = 30;
pub const CONDITIONAL_MODIFIER_PENALTY: u8 = 15;
pub const PROCESSING_MODIFIER_PENALTY: i32 = 10;
pub const UNKNOWN_SOURCE_PENALTY: i32 = 25;
pub const NON_HALAL_SOURCE_PENALTY: i32 = 100;
pub const HALAL_CERTIFIED_BONUS: i32 = 10;
pub const VERIFIED_SOURCE_BONUS: i32 = 5;

pub const HIGH_CONFIDENCE_THRESHOLD: u8 = 80;
pub const MEDIUM_CONFIDENCE_THRESHOLD: u8 = 50;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Independently toggled score adjustments.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct ConfidenceAdjustments {
    pub processed_when_raw_expected: bool,
    pub uncertified_animal_source: bool,
    pub contains_additives: bool,
    pub derived_from_haram: bool,
    /// Reduction carried by the strongest conditional modifier, if any was detected.
    pub conditional_modifier: Option<u8>,
    pub processing_modifier: bool,
    pub unknown_source: bool,
    pub non_halal_source: bool,
    pub halal_certified: bool,
    pub verified_source: bool,
}

impl ConfidenceAdjustments {
    /// Conditional modifier present with no specific weight.
    #[must_use]
    pub fn with_conditional_modifier(mut self) -> Self {
        self.conditional_modifier = Some(CONDITIONAL_MODIFIER_PENALTY);
        self
    }

    fn total(&self) -> i32 {
        let mut total = 0;
        if self.processed_when_raw_expected {
            total -= PROCESSED_WHEN_RAW_EXPECTED_PENALTY;
        }
        if self.uncertified_animal_source {
            total -= UNCERTIFIED_ANIMAL_PENALTY;
        }
        if self.contains_additives {
            total -= CONTAINS_ADDITIVES_PENALTY;
        }
        if self.derived_from_haram {
            total -= DERIVED_FROM_HARAM_PENALTY;
        }
        if let Some(reduction) = self.conditional_modifier {
            total -= i32::from(reduction);
        }
        if self.processing_modifier {
            total -= PROCESSING_MODIFIER_PENALTY;
        }
        if self.unknown_source {
            total -= UNKNOWN_SOURCE_PENALTY;
        }
        if self.non_halal_source {
            total -= NON_HALAL_SOURCE_PENALTY;
        }
        if self.halal_certified {
            total += HALAL_CERTIFIED_BONUS;
        }
        if self.verified_source {
            total += VERIFIED_SOURCE_BONUS;
        }
        total
    }
}

/// Base score for a (type, ruling) pair. `None` type uses the unclassified row.
#[must_use]
pub fn base_score(ingredient_type: Option<IngredientType>, ruling: Ruling) -> f64 {
    let (halal, conditional, unknown) = match ingredient_type {
        Some(IngredientType::NaturalPlant) => (95.0, 70.0, 85.0),
        Some(IngredientType::ProcessedPlant) => (85.0, 65.0, 55.0),
        Some(IngredientType::Animal) => (75.0, 55.0, 35.0),
        Some(IngredientType::AnimalByproduct) => (70.0, 50.0, 30.0),
        Some(IngredientType::Alcohol) => (50.0, 35.0, 20.0),
        Some(IngredientType::FermentationDerived) => (80.0, 60.0, 45.0),
        Some(IngredientType::Synthetic) => (85.0, 65.0, 50.0),
        None => (70.0, 50.0, 25.0),
    };
    match ruling {
        Ruling::Haram => 0.0,
        Ruling::Halal => halal,
        Ruling::Conditional => conditional,
        Ruling::Unknown => unknown,
    }
}

/// Score from the type/ruling table.
#[must_use]
pub fn score(
    ingredient_type: Option<IngredientType>,
    ruling: Ruling,
    adjustments: &ConfidenceAdjustments,
) -> u8 {
    score_from_base(base_score(ingredient_type, ruling), ruling, adjustments)
}

/// Score from an explicit base, e.g. a record's own `base_confidence`.
///
/// Haram always scores 0; everything else is clamped to `[0, 100]` and rounded.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn score_from_base(base: f64, ruling: Ruling, adjustments: &ConfidenceAdjustments) -> u8 {
    if ruling == Ruling::Haram {
        return 0;
    }
    // clamped to [0, 100] before the cast
    (base + f64::from(adjustments.total())).clamp(0.0, 100.0).round() as u8
}

#[must_use]
pub fn confidence_level(score: u8) -> ConfidenceLevel {
    if score >= HIGH_CONFIDENCE_THRESHOLD {
        ConfidenceLevel::High
    } else if score >= MEDIUM_CONFIDENCE_THRESHOLD {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

/// What the engine knows about an ingredient, for the unknown-label rule.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct UnknownContext {
    pub taxonomy_classified: bool,
    pub record_exists: bool,
    pub natural_plant_default: bool,
    pub explicit_haram: bool,
}

/// `unknown` is reserved for genuine absence of data.
#[must_use]
pub fn should_mark_unknown(context: &UnknownContext) -> bool {
    !(context.taxonomy_classified
        || context.record_exists
        || context.natural_plant_default
        || context.explicit_haram)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const ALL_TYPES: [Option<IngredientType>; 8] = [
        Some(IngredientType::NaturalPlant),
        Some(IngredientType::ProcessedPlant),
        Some(IngredientType::Animal),
        Some(IngredientType::AnimalByproduct),
        Some(IngredientType::Alcohol),
        Some(IngredientType::FermentationDerived),
        Some(IngredientType::Synthetic),
        None,
    ];

    #[test]
    fn haram_is_zero_for_every_type_and_bonus() {
        let generous = ConfidenceAdjustments {
            halal_certified: true,
            verified_source: true,
            ..ConfidenceAdjustments::default()
        };
        for ingredient_type in ALL_TYPES {
            assert_eq!(score(ingredient_type, Ruling::Haram, &generous), 0);
        }
    }

    #[test]
    fn natural_plant_unknown_defaults_high() {
        let value = score(Some(IngredientType::NaturalPlant), Ruling::Unknown, &ConfidenceAdjustments::default());
        assert!(value >= HIGH_CONFIDENCE_THRESHOLD);
    }

    #[test]
    fn conditional_base_is_below_halal_base_for_every_type() {
        for ingredient_type in ALL_TYPES {
            assert!(
                base_score(ingredient_type, Ruling::Conditional)
                    < base_score(ingredient_type, Ruling::Halal)
            );
        }
    }

    #[test]
    fn adjustments_are_additive() {
        let adjustments = ConfidenceAdjustments {
            uncertified_animal_source: true,
            processing_modifier: true,
            ..ConfidenceAdjustments::default()
        };
        assert_eq!(score(Some(IngredientType::Animal), Ruling::Halal, &adjustments), 45);

        let certified = ConfidenceAdjustments {
            halal_certified: true,
            verified_source: true,
            ..ConfidenceAdjustments::default()
        };
        assert_eq!(score(Some(IngredientType::Animal), Ruling::Halal, &certified), 90);
    }

    #[test]
    fn score_is_clamped_to_bounds() {
        let everything_bad = ConfidenceAdjustments {
            processed_when_raw_expected: true,
            uncertified_animal_source: true,
            contains_additives: true,
            conditional_modifier: Some(20),
            processing_modifier: true,
            unknown_source: true,
            ..ConfidenceAdjustments::default()
        };
        assert_eq!(score(None, Ruling::Unknown, &everything_bad), 0);

        let bonuses = ConfidenceAdjustments {
            halal_certified: true,
            verified_source: true,
            ..ConfidenceAdjustments::default()
        };
        assert_eq!(score(Some(IngredientType::NaturalPlant), Ruling::Halal, &bonuses), 100);
    }

    #[test]
    fn non_halal_source_zeroes_any_base() {
        let adjustments =
            ConfidenceAdjustments { non_halal_source: true, ..ConfidenceAdjustments::default() };
        assert_eq!(score(Some(IngredientType::NaturalPlant), Ruling::Halal, &adjustments), 0);
    }

    #[test]
    fn explicit_base_is_rounded() {
        let value = score_from_base(72.6, Ruling::Halal, &ConfidenceAdjustments::default());
        assert_eq!(value, 73);
    }

    #[test]
    fn default_conditional_weight_is_fifteen() {
        let adjustments = ConfidenceAdjustments::default().with_conditional_modifier();
        assert_eq!(score(Some(IngredientType::Synthetic), Ruling::Halal, &adjustments), 70);
    }

    #[test]
    fn confidence_level_thresholds() {
        assert_eq!(confidence_level(100), ConfidenceLevel::High);
        assert_eq!(confidence_level(80), ConfidenceLevel::High);
        assert_eq!(confidence_level(79), ConfidenceLevel::Medium);
        assert_eq!(confidence_level(50), ConfidenceLevel::Medium);
        assert_eq!(confidence_level(49), ConfidenceLevel::Low);
        assert_eq!(confidence_level(0), ConfidenceLevel::Low);
    }

    #[test]
    fn unknown_only_when_nothing_is_known() {
        assert!(should_mark_unknown(&UnknownContext::default()));
        for context in [
            UnknownContext { taxonomy_classified: true, ..UnknownContext::default() },
            UnknownContext { record_exists: true, ..UnknownContext::default() },
            UnknownContext { natural_plant_default: true, ..UnknownContext::default() },
            UnknownContext { explicit_haram: true, ..UnknownContext::default() },
        ] {
            assert!(!should_mark_unknown(&context));
        }
    }

    proptest! {
        #[test]
        fn property_adding_a_modifier_never_raises_score(
            type_index in 0_usize..8,
            ruling_index in 0_usize..4,
            reduction in 1_u8..=30,
            certified in any::<bool>(),
            additives in any::<bool>(),
        ) {
            let rulings = [Ruling::Halal, Ruling::Conditional, Ruling::Unknown, Ruling::Haram];
            let ingredient_type = ALL_TYPES[type_index];
            let ruling = rulings[ruling_index];
            let base = ConfidenceAdjustments {
                halal_certified: certified,
                contains_additives: additives,
                ..ConfidenceAdjustments::default()
            };
            let with_conditional = ConfidenceAdjustments { conditional_modifier: Some(reduction), ..base };
            let with_processing = ConfidenceAdjustments { processing_modifier: true, ..base };

            let plain = score(ingredient_type, ruling, &base);
            prop_assert!(score(ingredient_type, ruling, &with_conditional) <= plain);
            prop_assert!(score(ingredient_type, ruling, &with_processing) <= plain);
            prop_assert!(plain <= 100);
        }
    }
}
