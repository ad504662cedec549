//! Lexical modifier detection.
//!
//! An identifier is scanned in three passes: compound regular patterns over
//! the whole string, multi-token table entries over the whole string, then
//! each remaining token. Tokens consumed by a compound pattern are not
//! re-scanned, which lets a compound upgrade (`pork_enzymes`) or downgrade
//! (`microbial_rennet`) what the tokens alone would say.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ModifierCategory {
    Overriding,
    Conditional,
    Processing,
    Neutral,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OverrideKind {
    Alcohol,
    Pork,
    NonHalalMeat,
    Gelatin,
}

impl OverrideKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alcohol => "alcohol",
            Self::Pork => "pork",
            Self::NonHalalMeat => "non_halal_meat",
            Self::Gelatin => "gelatin",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ModifierMatch {
    pub modifier: String,
    pub category: ModifierCategory,
    pub override_kind: Option<OverrideKind>,
    pub explanation: Option<String>,
    pub confidence_reduction: Option<u8>,
    pub compound: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct ModifierMatchSet {
    pub has_overriding_modifier: bool,
    pub overriding: Vec<ModifierMatch>,
    pub conditional: Vec<ModifierMatch>,
    pub processing: Vec<ModifierMatch>,
    pub neutral: Vec<ModifierMatch>,
}

impl ModifierMatchSet {
    /// First overriding match found. Used for the explanation only.
    #[must_use]
    pub fn primary_override(&self) -> Option<&ModifierMatch> {
        self.overriding.first()
    }

    #[must_use]
    pub fn first_conditional(&self) -> Option<&ModifierMatch> {
        self.conditional.first()
    }

    #[must_use]
    pub fn first_processing(&self) -> Option<&ModifierMatch> {
        self.processing.first()
    }

    #[must_use]
    pub fn has_conditional(&self) -> bool {
        !self.conditional.is_empty()
    }

    #[must_use]
    pub fn has_processing(&self) -> bool {
        !self.processing.is_empty()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.overriding.is_empty()
            && self.conditional.is_empty()
            && self.processing.is_empty()
            && self.neutral.is_empty()
    }

    /// Largest reduction among distinct conditional matches.
    #[must_use]
    pub fn max_conditional_reduction(&self) -> Option<u8> {
        self.conditional.iter().filter_map(|item| item.confidence_reduction).max()
    }

    fn push(&mut self, item: ModifierMatch) {
        let bucket = match item.category {
            ModifierCategory::Overriding => &mut self.overriding,
            ModifierCategory::Conditional => &mut self.conditional,
            ModifierCategory::Processing => &mut self.processing,
            ModifierCategory::Neutral => &mut self.neutral,
        };
        if bucket.iter().any(|existing| existing.modifier == item.modifier) {
            return;
        }
        if item.category == ModifierCategory::Overriding {
            self.has_overriding_modifier = true;
        }
        bucket.push(item);
    }
}

struct OverridingEntry {
    pattern: &'static str,
    kind: OverrideKind,
}

struct WeightedEntry {
    pattern: &'static str,
    reduction: u8,
    explanation: &'static str,
}

struct ProcessingEntry {
    pattern: &'static str,
    explanation: &'static str,
}

struct CompoundRule {
    name: &'static str,
    pattern: &'static str,
    category: ModifierCategory,
    kind: Option<OverrideKind>,
    reduction: Option<u8>,
    explanation: &'static str,
}

const OVERRIDING_TABLE: &[OverridingEntry] = &[
    OverridingEntry { pattern: "alcohol", kind: OverrideKind::Alcohol },
    OverridingEntry { pattern: "ethanol", kind: OverrideKind::Alcohol },
    OverridingEntry { pattern: "wine", kind: OverrideKind::Alcohol },
    OverridingEntry { pattern: "beer", kind: OverrideKind::Alcohol },
    OverridingEntry { pattern: "ale", kind: OverrideKind::Alcohol },
    OverridingEntry { pattern: "lager", kind: OverrideKind::Alcohol },
    OverridingEntry { pattern: "rum", kind: OverrideKind::Alcohol },
    OverridingEntry { pattern: "vodka", kind: OverrideKind::Alcohol },
    OverridingEntry { pattern: "whiskey", kind: OverrideKind::Alcohol },
    OverridingEntry { pattern: "whisky", kind: OverrideKind::Alcohol },
    OverridingEntry { pattern: "bourbon", kind: OverrideKind::Alcohol },
    OverridingEntry { pattern: "brandy", kind: OverrideKind::Alcohol },
    OverridingEntry { pattern: "cognac", kind: OverrideKind::Alcohol },
    OverridingEntry { pattern: "gin", kind: OverrideKind::Alcohol },
    OverridingEntry { pattern: "tequila", kind: OverrideKind::Alcohol },
    OverridingEntry { pattern: "sake", kind: OverrideKind::Alcohol },
    OverridingEntry { pattern: "mirin", kind: OverrideKind::Alcohol },
    OverridingEntry { pattern: "sherry", kind: OverrideKind::Alcohol },
    OverridingEntry { pattern: "champagne", kind: OverrideKind::Alcohol },
    OverridingEntry { pattern: "liqueur", kind: OverrideKind::Alcohol },
    OverridingEntry { pattern: "pork", kind: OverrideKind::Pork },
    OverridingEntry { pattern: "porcine", kind: OverrideKind::Pork },
    OverridingEntry { pattern: "pig", kind: OverrideKind::Pork },
    OverridingEntry { pattern: "swine", kind: OverrideKind::Pork },
    OverridingEntry { pattern: "boar", kind: OverrideKind::Pork },
    OverridingEntry { pattern: "ham", kind: OverrideKind::Pork },
    OverridingEntry { pattern: "bacon", kind: OverrideKind::Pork },
    OverridingEntry { pattern: "lard", kind: OverrideKind::Pork },
    OverridingEntry { pattern: "pancetta", kind: OverrideKind::Pork },
    OverridingEntry { pattern: "prosciutto", kind: OverrideKind::Pork },
    OverridingEntry { pattern: "non_halal", kind: OverrideKind::NonHalalMeat },
    OverridingEntry { pattern: "nonhalal", kind: OverrideKind::NonHalalMeat },
    OverridingEntry { pattern: "haram", kind: OverrideKind::NonHalalMeat },
    OverridingEntry { pattern: "carrion", kind: OverrideKind::NonHalalMeat },
    OverridingEntry { pattern: "blood", kind: OverrideKind::NonHalalMeat },
    OverridingEntry { pattern: "unslaughtered", kind: OverrideKind::NonHalalMeat },
    OverridingEntry { pattern: "gelatin", kind: OverrideKind::Gelatin },
    OverridingEntry { pattern: "gelatine", kind: OverrideKind::Gelatin },
];

const CONDITIONAL_TABLE: &[WeightedEntry] = &[
    WeightedEntry {
        pattern: "mono_and_diglycerides",
        reduction: 15,
        explanation: "mono- and diglycerides may be derived from animal fat",
    },
    WeightedEntry {
        pattern: "natural_flavors",
        reduction: 10,
        explanation: "natural flavors may use alcohol carriers or animal sources",
    },
    WeightedEntry {
        pattern: "enzyme",
        reduction: 15,
        explanation: "enzymes may be animal, microbial or plant derived",
    },
    WeightedEntry {
        pattern: "rennet",
        reduction: 20,
        explanation: "rennet is often taken from calves not slaughtered according to halal rules",
    },
    WeightedEntry {
        pattern: "emulsifier",
        reduction: 10,
        explanation: "emulsifiers can be plant or animal derived",
    },
    WeightedEntry {
        pattern: "flavoring",
        reduction: 10,
        explanation: "flavorings may use alcohol as a solvent",
    },
    WeightedEntry {
        pattern: "flavouring",
        reduction: 10,
        explanation: "flavorings may use alcohol as a solvent",
    },
    WeightedEntry {
        pattern: "lecithin",
        reduction: 5,
        explanation: "lecithin is usually soy based but can come from egg or animal sources",
    },
    WeightedEntry {
        pattern: "monoglyceride",
        reduction: 15,
        explanation: "mono- and diglycerides may be derived from animal fat",
    },
    WeightedEntry {
        pattern: "diglyceride",
        reduction: 15,
        explanation: "mono- and diglycerides may be derived from animal fat",
    },
    WeightedEntry {
        pattern: "whey",
        reduction: 10,
        explanation: "whey depends on the rennet used during cheese making",
    },
    WeightedEntry {
        pattern: "casein",
        reduction: 5,
        explanation: "casein processing may involve animal enzymes",
    },
    WeightedEntry {
        pattern: "glycerin",
        reduction: 15,
        explanation: "glycerin may be derived from animal fat",
    },
    WeightedEntry {
        pattern: "glycerine",
        reduction: 15,
        explanation: "glycerin may be derived from animal fat",
    },
];

const PROCESSING_TABLE: &[ProcessingEntry] = &[
    ProcessingEntry { pattern: "fried", explanation: "frying oil and shared fryers should be verified" },
    ProcessingEntry { pattern: "fermented", explanation: "fermentation may produce alcohol" },
    ProcessingEntry { pattern: "marinated", explanation: "marinades may contain wine or other alcohol" },
    ProcessingEntry { pattern: "smoked", explanation: "smoking may use flavorings of unknown source" },
    ProcessingEntry { pattern: "cured", explanation: "curing mixes may contain non-halal ingredients" },
    ProcessingEntry { pattern: "brined", explanation: "brines may contain added flavorings" },
    ProcessingEntry { pattern: "glazed", explanation: "glazes may contain gelatin or alcohol" },
    ProcessingEntry { pattern: "braised", explanation: "braising liquids may contain wine or stock" },
    ProcessingEntry { pattern: "sauteed", explanation: "cooking fat should be verified" },
    ProcessingEntry { pattern: "sautéed", explanation: "cooking fat should be verified" },
    ProcessingEntry { pattern: "pickled", explanation: "pickling may use wine vinegar" },
    ProcessingEntry { pattern: "preserved", explanation: "preservatives and processing aids should be verified" },
    ProcessingEntry { pattern: "seasoned", explanation: "seasoning blends may contain animal-derived flavors" },
    ProcessingEntry { pattern: "spiced", explanation: "spice blends may contain flavor carriers" },
];

const NEUTRAL_TABLE: &[&str] = &[
    "fresh", "dried", "frozen", "organic", "raw", "cooked", "whole", "sliced", "diced", "chopped",
    "ground", "powdered", "red", "green", "yellow", "white", "black", "brown", "golden", "large",
    "small", "baby", "round", "long",
];

/// Qualifiers that make a gelatin mention acceptable.
const GELATIN_SAFE_QUALIFIERS: &[&str] = &["halal", "fish", "plant", "vegan", "vegetable", "agar"];
/// Qualifiers that make a gelatin mention require verification instead of overriding.
const GELATIN_BOVINE_QUALIFIERS: &[&str] = &["bovine", "beef"];

const COMPOUND_RULES: &[CompoundRule] = &[
    CompoundRule {
        name: "alcohol_cooked",
        pattern: r"(^|_)(wine|beer|rum|sake|mirin|brandy|sherry|bourbon|cognac)_(braised|marinated|glazed|poached|infused|battered|soaked|reduction|sauce)(_|$)",
        category: ModifierCategory::Overriding,
        kind: Some(OverrideKind::Alcohol),
        reduction: None,
        explanation: "cooked with alcohol",
    },
    CompoundRule {
        name: "alcohol_extract",
        pattern: r"(^|_)(alcohol|ethanol)_(extract|based|solvent|carrier)(_|$)",
        category: ModifierCategory::Overriding,
        kind: Some(OverrideKind::Alcohol),
        reduction: None,
        explanation: "extracted in alcohol",
    },
    CompoundRule {
        name: "animal_or_pork_derived",
        pattern: r"(^|_)(animal|pork|porcine|pig)_(rennet|enzymes?|lipase|pepsin|fat|shortening|glycerine?|glycerides|stock|broth|gelatine?)(_|$)",
        category: ModifierCategory::Overriding,
        kind: Some(OverrideKind::NonHalalMeat),
        reduction: None,
        explanation: "derived from an animal source not verified as halal",
    },
    CompoundRule {
        name: "non_animal_derived",
        pattern: r"(^|_)(microbial|plant|vegetable|vegetarian|vegan|soy)_(rennet|enzymes?|lipase|glycerine?|glycerides|gelatine?|emulsifiers?|lecithin)(_|$)",
        category: ModifierCategory::Conditional,
        kind: None,
        reduction: Some(5),
        explanation: "stated non-animal source; certification still recommended",
    },
    CompoundRule {
        name: "alcohol_free",
        pattern: r"(^|_)(alcohol_free|non_alcoholic|nonalcoholic|alcohol_removed|dealcoholi[sz]ed|zero_alcohol)(_|$)",
        category: ModifierCategory::Neutral,
        kind: None,
        reduction: None,
        explanation: "labelled free of alcohol",
    },
    CompoundRule {
        name: "food_name_lookalike",
        pattern: r"(^|_)(blood_oranges?|ginger_ales?|ginger_beers?|root_beers?|birch_beers?)(_|$)",
        category: ModifierCategory::Neutral,
        kind: None,
        reduction: None,
        explanation: "common food name; not an alcohol or blood product",
    },
    CompoundRule {
        name: "alcohol_vinegar",
        pattern: r"(^|_)(wine|rice_wine|sherry|champagne|beer)_vinegar(_|$)",
        category: ModifierCategory::Conditional,
        kind: None,
        reduction: Some(5),
        explanation: "vinegar made from alcohol is accepted by most scholars after full transformation",
    },
];

fn compiled_compound_rules() -> &'static [(&'static CompoundRule, Regex)] {
    static COMPILED: OnceLock<Vec<(&'static CompoundRule, Regex)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        COMPOUND_RULES
            .iter()
            .filter_map(|rule| match Regex::new(rule.pattern) {
                Ok(regex) => Some((rule, regex)),
                Err(err) => {
                    tracing::error!(rule = rule.name, "compound modifier pattern rejected: {err}");
                    None
                }
            })
            .collect()
    })
}

fn token_matches(token: &str, pattern: &str) -> bool {
    token == pattern || token.strip_suffix('s') == Some(pattern)
}

/// Byte range of a multi-token entry matched on `_` boundaries of the whole identifier.
fn phrase_range(identifier: &str, pattern: &str) -> Option<(usize, usize)> {
    let bounded = format!("_{identifier}_");
    bounded
        .find(&format!("_{pattern}_"))
        .map(|start| (start, start + pattern.len()))
}

/// Tokens with their byte offset in the identifier.
fn token_spans(identifier: &str) -> Vec<(usize, &str)> {
    let mut spans = Vec::new();
    let mut offset = 0;
    for token in identifier.split('_') {
        if !token.is_empty() {
            spans.push((offset, token));
        }
        offset += token.len() + 1;
    }
    spans
}

fn consume_range(spans: &[(usize, &str)], (start, end): (usize, usize), consumed: &mut BTreeSet<usize>) {
    for (index, (offset, token)) in spans.iter().enumerate() {
        if *offset >= start && offset + token.len() <= end {
            consumed.insert(index);
        }
    }
}

pub(crate) fn override_explanation(kind: OverrideKind) -> &'static str {
    match kind {
        OverrideKind::Alcohol => "alcohol (khamr) is prohibited in any amount",
        OverrideKind::Pork => "pork and all pork derivatives are prohibited",
        OverrideKind::NonHalalMeat => "meat or animal material not slaughtered according to halal rules is prohibited",
        OverrideKind::Gelatin => "gelatin of unspecified source is usually porcine",
    }
}

/// Scan a normalized identifier for lexical modifiers. Never fails.
#[must_use]
pub fn detect_modifiers(identifier: &str) -> ModifierMatchSet {
    let mut set = ModifierMatchSet::default();
    if identifier.is_empty() {
        return set;
    }

    let spans = token_spans(identifier);
    let tokens: Vec<&str> = spans.iter().map(|(_, token)| *token).collect();
    // indices, so a repeated token outside a compound is still scanned
    let mut consumed: BTreeSet<usize> = BTreeSet::new();
    let mut alcohol_free = false;

    for (rule, regex) in compiled_compound_rules() {
        let Some(found) = regex.find(identifier) else {
            continue;
        };
        consume_range(&spans, (found.start(), found.end()), &mut consumed);
        alcohol_free |= rule.name == "alcohol_free";
        let phrase = found.as_str().trim_matches('_');
        set.push(ModifierMatch {
            modifier: phrase.to_string(),
            category: rule.category,
            override_kind: rule.kind,
            explanation: Some(rule.explanation.to_string()),
            confidence_reduction: rule.reduction,
            compound: true,
        });
    }

    for entry in OVERRIDING_TABLE.iter().filter(|entry| entry.pattern.contains('_')) {
        if let Some(range) = phrase_range(identifier, entry.pattern) {
            consume_range(&spans, range, &mut consumed);
            set.push(overriding_match(entry.pattern, entry.kind));
        }
    }
    for entry in CONDITIONAL_TABLE.iter().filter(|entry| entry.pattern.contains('_')) {
        if let Some(range) = phrase_range(identifier, entry.pattern) {
            consume_range(&spans, range, &mut consumed);
            set.push(weighted_match(entry));
        }
    }

    let context = ScanContext { tokens: &tokens, alcohol_free };
    for (index, token) in tokens.iter().enumerate() {
        if !consumed.contains(&index) {
            scan_token(token, &context, &mut set);
        }
    }

    tracing::debug!(
        identifier,
        overriding = set.overriding.len(),
        conditional = set.conditional.len(),
        processing = set.processing.len(),
        neutral = set.neutral.len(),
        "modifier scan complete"
    );
    set
}

struct ScanContext<'a> {
    tokens: &'a [&'a str],
    alcohol_free: bool,
}

fn scan_token(token: &str, context: &ScanContext<'_>, set: &mut ModifierMatchSet) {
    if let Some(entry) = OVERRIDING_TABLE
        .iter()
        .find(|entry| !entry.pattern.contains('_') && token_matches(token, entry.pattern))
    {
        match entry.kind {
            OverrideKind::Gelatin => scan_gelatin(entry.pattern, context.tokens, set),
            OverrideKind::Alcohol if context.alcohol_free => set.push(ModifierMatch {
                modifier: entry.pattern.to_string(),
                category: ModifierCategory::Conditional,
                override_kind: None,
                explanation: Some(
                    "labelled alcohol-free; residual alcohol from production should be verified"
                        .to_string(),
                ),
                confidence_reduction: Some(10),
                compound: false,
            }),
            kind => set.push(overriding_match(entry.pattern, kind)),
        }
        return;
    }

    if let Some(entry) = CONDITIONAL_TABLE
        .iter()
        .find(|entry| !entry.pattern.contains('_') && token_matches(token, entry.pattern))
    {
        set.push(weighted_match(entry));
        return;
    }

    if let Some(entry) = PROCESSING_TABLE.iter().find(|entry| token == entry.pattern) {
        set.push(ModifierMatch {
            modifier: entry.pattern.to_string(),
            category: ModifierCategory::Processing,
            override_kind: None,
            explanation: Some(entry.explanation.to_string()),
            confidence_reduction: None,
            compound: false,
        });
        return;
    }

    if let Some(pattern) = NEUTRAL_TABLE.iter().find(|pattern| token == **pattern) {
        set.push(ModifierMatch {
            modifier: (*pattern).to_string(),
            category: ModifierCategory::Neutral,
            override_kind: None,
            explanation: None,
            confidence_reduction: None,
            compound: false,
        });
    }
}

fn scan_gelatin(pattern: &str, tokens: &[&str], set: &mut ModifierMatchSet) {
    let has_qualifier = |qualifiers: &[&str]| tokens.iter().any(|token| qualifiers.contains(token));

    if has_qualifier(GELATIN_SAFE_QUALIFIERS) {
        set.push(ModifierMatch {
            modifier: pattern.to_string(),
            category: ModifierCategory::Neutral,
            override_kind: None,
            explanation: Some("gelatin with a stated halal or non-porcine source".to_string()),
            confidence_reduction: None,
            compound: false,
        });
    } else if has_qualifier(GELATIN_BOVINE_QUALIFIERS) {
        set.push(ModifierMatch {
            modifier: pattern.to_string(),
            category: ModifierCategory::Conditional,
            override_kind: None,
            explanation: Some(
                "bovine gelatin is permissible only from halal-slaughtered cattle".to_string(),
            ),
            confidence_reduction: Some(20),
            compound: false,
        });
    } else {
        set.push(overriding_match(pattern, OverrideKind::Gelatin));
    }
}

fn overriding_match(pattern: &str, kind: OverrideKind) -> ModifierMatch {
    ModifierMatch {
        modifier: pattern.to_string(),
        category: ModifierCategory::Overriding,
        override_kind: Some(kind),
        explanation: Some(override_explanation(kind).to_string()),
        confidence_reduction: None,
        compound: false,
    }
}

fn weighted_match(entry: &WeightedEntry) -> ModifierMatch {
    ModifierMatch {
        modifier: entry.pattern.to_string(),
        category: ModifierCategory::Conditional,
        override_kind: None,
        explanation: Some(entry.explanation.to_string()),
        confidence_reduction: Some(entry.reduction),
        compound: false,
    }
}
