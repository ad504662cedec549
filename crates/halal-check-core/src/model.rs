use serde::{Deserialize, Serialize};

use crate::KernelError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Ruling {
    Halal,
    Haram,
    Conditional,
    Unknown,
}

impl Ruling {
    /// Merge precedence used when combining ancestor rulings.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::Haram => 4,
            Self::Conditional => 3,
            Self::Halal => 2,
            Self::Unknown => 1,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Halal => "halal",
            Self::Haram => "haram",
            Self::Conditional => "conditional",
            Self::Unknown => "unknown",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "halal" => Some(Self::Halal),
            "haram" => Some(Self::Haram),
            "conditional" | "questionable" | "mushbooh" => Some(Self::Conditional),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IngredientType {
    NaturalPlant,
    ProcessedPlant,
    Animal,
    AnimalByproduct,
    Alcohol,
    FermentationDerived,
    Synthetic,
}

impl IngredientType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NaturalPlant => "natural_plant",
            Self::ProcessedPlant => "processed_plant",
            Self::Animal => "animal",
            Self::AnimalByproduct => "animal_byproduct",
            Self::Alcohol => "alcohol",
            Self::FermentationDerived => "fermentation_derived",
            Self::Synthetic => "synthetic",
        }
    }

    #[must_use]
    pub fn is_animal_sourced(self) -> bool {
        matches!(self, Self::Animal | Self::AnimalByproduct)
    }
}

/// One immutable Knowledge Base entry.
///
/// `ruling` is `None` when the source data left it unset, which is distinct
/// from an explicit [`Ruling::Unknown`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngredientRecord {
    pub identifier: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub ruling: Option<Ruling>,
    #[serde(default)]
    pub derives_from: Vec<String>,
    #[serde(default)]
    pub alternatives: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub base_confidence: Option<f64>,
    #[serde(default)]
    pub ingredient_type: Option<IngredientType>,
    #[serde(default)]
    pub halal_certified: bool,
    #[serde(default)]
    pub verified_source: bool,
    #[serde(default)]
    pub contains_additives: bool,
}

impl IngredientRecord {
    /// Minimal record with only an identifier and a ruling.
    #[must_use]
    pub fn new(identifier: &str, ruling: Option<Ruling>) -> Self {
        Self {
            identifier: identifier.to_string(),
            display_name: None,
            ruling,
            derives_from: Vec::new(),
            alternatives: Vec::new(),
            notes: None,
            references: Vec::new(),
            aliases: Vec::new(),
            base_confidence: None,
            ingredient_type: None,
            halal_certified: false,
            verified_source: false,
            contains_additives: false,
        }
    }

    #[must_use]
    pub fn derived_from<I, S>(mut self, ancestors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.derives_from = ancestors.into_iter().map(Into::into).collect();
        self
    }

    /// Validate one record before it enters a [`crate::KnowledgeBase`].
    ///
    /// # Errors
    /// Returns [`KernelError::Validation`] when the identifier normalizes to an
    /// empty string or `base_confidence` falls outside `[0, 100]`.
    pub fn validate(&self) -> Result<(), KernelError> {
        if normalize_identifier(&self.identifier).is_empty() {
            return Err(KernelError::Validation(
                "identifier MUST contain at least one alphanumeric character".to_string(),
            ));
        }

        if let Some(base) = self.base_confidence {
            if !(0.0..=100.0).contains(&base) {
                return Err(KernelError::Validation(format!(
                    "base_confidence MUST be in [0, 100] for `{}`",
                    self.identifier
                )));
            }
        }

        Ok(())
    }
}

/// Lowercase, trim and join every separator run with a single `_`.
#[must_use]
pub fn normalize_identifier(raw: &str) -> String {
    let mut normalized = String::with_capacity(raw.len());
    let mut pending_separator = false;
    for ch in raw.trim().chars() {
        if ch == '\'' || ch == '\u{2019}' {
            continue;
        }
        if ch.is_whitespace() || matches!(ch, '-' | '_' | '.' | ',' | '/') {
            pending_separator = true;
            continue;
        }
        if pending_separator && !normalized.is_empty() {
            normalized.push('_');
        }
        pending_separator = false;
        normalized.extend(ch.to_lowercase());
    }
    normalized
}

/// `"wine_braised_chicken"` becomes `"Wine Braised Chicken"`.
#[must_use]
pub fn humanize_identifier(identifier: &str) -> String {
    identifier
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
