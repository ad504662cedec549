use std::collections::BTreeSet;

use crate::model::IngredientType;
use crate::modifiers::ModifierMatchSet;

const ALCOHOL_WORDS: &[&str] = &[
    "alcohol", "ethanol", "wine", "beer", "ale", "lager", "rum", "vodka", "whiskey", "whisky",
    "bourbon", "brandy", "cognac", "gin", "tequila", "sake", "mirin", "sherry", "champagne",
    "liqueur", "spirits",
];

const ANIMAL_WORDS: &[&str] = &[
    "chicken", "beef", "lamb", "mutton", "goat", "veal", "turkey", "duck", "goose", "quail",
    "venison", "camel", "rabbit", "fish", "salmon", "tuna", "cod", "sardine", "anchovy", "trout",
    "tilapia", "mackerel", "shrimp", "prawn", "crab", "lobster", "squid", "octopus", "mussel",
    "oyster", "clam", "scallop", "pork", "bacon", "ham", "meat", "steak", "sausage", "liver",
];

const ANIMAL_BYPRODUCT_WORDS: &[&str] = &[
    "milk", "cheese", "butter", "cream", "yogurt", "yoghurt", "ghee", "egg", "honey", "whey",
    "casein", "gelatin", "gelatine", "collagen", "tallow", "lard", "suet", "lanolin", "carmine",
    "cochineal", "shellac", "rennet", "pepsin", "lipase", "keratin", "isinglass", "broth",
    "stock", "bone",
];

const FERMENTATION_WORDS: &[&str] = &[
    "vinegar", "yeast", "miso", "tempeh", "kimchi", "kombucha", "natto", "kefir", "sauerkraut",
    "koji", "cultures", "culture", "probiotic",
];

const SYNTHETIC_WORDS: &[&str] = &[
    "aspartame", "sucralose", "saccharin", "acesulfame", "polysorbate", "benzoate", "sorbate",
    "propionate", "nitrite", "nitrate", "glutamate", "msg", "bht", "bha", "tbhq", "maltodextrin",
    "dextrose", "xanthan", "carrageenan", "carboxymethylcellulose", "silicon", "dioxide",
    "phosphate", "sulfite", "sulphite",
];

const PLANT_WORDS: &[&str] = &[
    "apple", "banana", "orange", "lemon", "lime", "grape", "mango", "pineapple", "strawberry",
    "blueberry", "raspberry", "cherry", "peach", "pear", "plum", "apricot", "date", "fig", "kiwi",
    "melon", "watermelon", "pomegranate", "coconut", "avocado", "tomato", "potato", "onion",
    "garlic", "ginger", "carrot", "celery", "spinach", "kale", "lettuce", "cabbage", "broccoli",
    "cauliflower", "pepper", "chili", "cucumber", "zucchini", "eggplant", "pumpkin", "squash",
    "pea", "bean", "lentil", "chickpea", "soy", "soybean", "corn", "maize", "rice", "wheat",
    "barley", "oat", "rye", "quinoa", "millet", "almond", "walnut", "cashew", "peanut",
    "pistachio", "hazelnut", "pecan", "sesame", "sunflower", "olive", "mushroom", "basil",
    "mint", "parsley", "cilantro", "coriander", "cumin", "turmeric", "cinnamon", "clove",
    "nutmeg", "cardamom", "saffron", "vanilla", "cocoa", "cacao", "coffee", "tea", "sugarcane",
    "beet", "seaweed", "agar", "herb", "vegetable", "fruit", "nut", "seed", "grain", "leaf",
];

/// Tokens that turn a plant ingredient into a processed one.
const PLANT_PROCESSING_WORDS: &[&str] = &[
    "flour", "oil", "starch", "syrup", "sugar", "powder", "extract", "juice", "sauce", "paste",
    "concentrate", "puree", "butter", "milk", "protein", "isolate", "bran", "meal", "flakes",
    "chips", "jam", "jelly", "bread", "pasta", "noodle", "tofu", "margarine", "chocolate",
    "candy", "biscuit", "cracker", "cereal",
];

fn has_word(tokens: &[&str], words: &[&str]) -> bool {
    tokens.iter().any(|token| {
        words.iter().any(|word| *token == *word || token.strip_suffix('s') == Some(*word))
    })
}

/// Lexical ingredient-type heuristic for identifiers the Knowledge Base does not type.
///
/// Checked in priority order: alcohol, animal, animal byproduct, fermentation,
/// synthetic (including `e` additive codes), plant. Without detected modifiers,
/// look-alike food names such as `ginger_ale` are not masked.
#[must_use]
pub fn classify_identifier(identifier: &str) -> Option<IngredientType> {
    classify_with_modifiers(identifier, None)
}

pub(crate) fn classify_with_modifiers(
    identifier: &str,
    modifiers: Option<&ModifierMatchSet>,
) -> Option<IngredientType> {
    let tokens: Vec<&str> = identifier.split('_').filter(|token| !token.is_empty()).collect();
    if tokens.is_empty() {
        return None;
    }
    // words inside a neutral compound such as `ginger_ale` or `alcohol_free` are not alcohol
    let masked: BTreeSet<&str> = modifiers
        .map(|set| {
            set.neutral
                .iter()
                .filter(|item| item.compound)
                .flat_map(|item| item.modifier.split('_'))
                .collect()
        })
        .unwrap_or_default();
    let alcohol_tokens: Vec<&str> =
        tokens.iter().copied().filter(|token| !masked.contains(token)).collect();

    let plant = has_word(&tokens, PLANT_WORDS);
    let plant_processing = has_word(&tokens, PLANT_PROCESSING_WORDS);

    // "peanut_butter", "coconut_milk" and "soy_milk" are plant products, not dairy
    if plant && plant_processing && !has_word(&tokens, ANIMAL_WORDS) {
        return Some(IngredientType::ProcessedPlant);
    }

    if has_word(&alcohol_tokens, ALCOHOL_WORDS) {
        return Some(IngredientType::Alcohol);
    }
    if has_word(&tokens, ANIMAL_WORDS) {
        return Some(IngredientType::Animal);
    }
    if has_word(&tokens, ANIMAL_BYPRODUCT_WORDS) {
        return Some(IngredientType::AnimalByproduct);
    }
    if has_word(&tokens, FERMENTATION_WORDS) {
        return Some(IngredientType::FermentationDerived);
    }
    if has_word(&tokens, SYNTHETIC_WORDS) || tokens.iter().any(|token| is_additive_code(token)) {
        return Some(IngredientType::Synthetic);
    }
    // a preparation such as `fried` keeps produce natural; scoring penalizes it separately
    if plant {
        return Some(IngredientType::NaturalPlant);
    }
    if plant_processing {
        return Some(IngredientType::ProcessedPlant);
    }
    None
}

/// `e471`, `e1422` and similar food-additive numbers.
fn is_additive_code(token: &str) -> bool {
    let Some(digits) = token.strip_prefix('e') else {
        return false;
    };
    let digits = digits.trim_end_matches(|ch: char| ch.is_ascii_lowercase());
    (3..=4).contains(&digits.len()) && digits.chars().all(|ch| ch.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifiers::detect_modifiers;

    #[test]
    fn produce_is_natural_plant() {
        assert_eq!(classify_identifier("apple"), Some(IngredientType::NaturalPlant));
        assert_eq!(classify_identifier("green_beans"), Some(IngredientType::NaturalPlant));
    }

    #[test]
    fn plant_products_are_processed_plant() {
        assert_eq!(classify_identifier("wheat_flour"), Some(IngredientType::ProcessedPlant));
        assert_eq!(classify_identifier("peanut_butter"), Some(IngredientType::ProcessedPlant));
        assert_eq!(classify_identifier("sugar"), Some(IngredientType::ProcessedPlant));
    }

    #[test]
    fn processing_modifier_keeps_produce_natural() {
        let modifiers = detect_modifiers("fried_potato");
        assert_eq!(
            classify_with_modifiers("fried_potato", Some(&modifiers)),
            Some(IngredientType::NaturalPlant)
        );
    }

    #[test]
    fn neutral_compounds_mask_alcohol_words() {
        let modifiers = detect_modifiers("ginger_ale");
        assert_eq!(classify_with_modifiers("ginger_ale", Some(&modifiers)), Some(IngredientType::NaturalPlant));
        assert_eq!(classify_identifier("ginger_ale"), Some(IngredientType::Alcohol));

        let modifiers = detect_modifiers("alcohol_free_vanilla");
        assert_eq!(
            classify_with_modifiers("alcohol_free_vanilla", Some(&modifiers)),
            Some(IngredientType::NaturalPlant)
        );
    }

    #[test]
    fn animal_and_byproduct_words_are_separated() {
        assert_eq!(classify_identifier("chicken"), Some(IngredientType::Animal));
        assert_eq!(classify_identifier("chicken_broth"), Some(IngredientType::Animal));
        assert_eq!(classify_identifier("cheddar_cheese"), Some(IngredientType::AnimalByproduct));
        assert_eq!(classify_identifier("eggs"), Some(IngredientType::AnimalByproduct));
    }

    #[test]
    fn alcohol_fermentation_and_synthetic() {
        assert_eq!(classify_identifier("red_wine"), Some(IngredientType::Alcohol));
        assert_eq!(classify_identifier("nutritional_yeast"), Some(IngredientType::FermentationDerived));
        assert_eq!(classify_identifier("e471"), Some(IngredientType::Synthetic));
        assert_eq!(classify_identifier("e160a"), Some(IngredientType::Synthetic));
        assert_eq!(classify_identifier("sodium_benzoate"), Some(IngredientType::Synthetic));
    }

    #[test]
    fn unrecognized_words_are_unclassified() {
        assert_eq!(classify_identifier("zorblax"), None);
        assert_eq!(classify_identifier(""), None);
        assert!(!is_additive_code("egg"));
        assert!(!is_additive_code("e12345"));
    }
}
