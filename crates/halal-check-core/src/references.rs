use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Quran,
    Hadith,
    Other,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct References {
    pub quran: Vec<String>,
    pub hadith: Vec<String>,
    pub other: Vec<String>,
}

impl References {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quran.is_empty() && self.hadith.is_empty() && self.other.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.quran.len() + self.hadith.len() + self.other.len()
    }
}

const QURAN_MARKERS: &[&str] = &[
    "qur'an", "quran", "qur\u{2019}an", "koran", "surah", "surat", "al-baqarah", "al-ma'idah",
    "al-maidah", "al-an'am", "al-anam", "an-nahl",
];

const HADITH_MARKERS: &[&str] = &[
    "hadith", "bukhari", "muslim", "tirmidhi", "abu dawud", "abu dawood", "nasa'i", "nasai",
    "ibn majah", "sunan", "sahih", "musnad",
];

#[must_use]
pub fn classify_reference(reference: &str) -> ReferenceKind {
    let lowered = reference.to_lowercase();
    if QURAN_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        ReferenceKind::Quran
    } else if HADITH_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        ReferenceKind::Hadith
    } else {
        ReferenceKind::Other
    }
}

/// Split reference strings into Qur'an, Hadith and other citations.
#[must_use]
pub fn extract_references(references: &[String]) -> References {
    let mut extracted = References::default();
    for reference in references {
        let trimmed = reference.trim();
        if trimmed.is_empty() {
            continue;
        }
        let bucket = match classify_reference(trimmed) {
            ReferenceKind::Quran => &mut extracted.quran,
            ReferenceKind::Hadith => &mut extracted.hadith,
            ReferenceKind::Other => &mut extracted.other,
        };
        if !bucket.iter().any(|existing| existing == trimmed) {
            bucket.push(trimmed.to_string());
        }
    }
    extracted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn references_are_split_by_marker() {
        let references = vec![
            "Qur'an 2:173".to_string(),
            "Sahih Muslim 1955".to_string(),
            "Surah Al-Ma'idah 5:3".to_string(),
            "IFANCA guidance on gelatin".to_string(),
            "  ".to_string(),
        ];
        let extracted = extract_references(&references);
        assert_eq!(extracted.quran, vec!["Qur'an 2:173", "Surah Al-Ma'idah 5:3"]);
        assert_eq!(extracted.hadith, vec!["Sahih Muslim 1955"]);
        assert_eq!(extracted.other, vec!["IFANCA guidance on gelatin"]);
        assert_eq!(extracted.len(), 4);
    }

    #[test]
    fn quran_marker_wins_over_hadith_marker() {
        assert_eq!(classify_reference("Quran 5:90, cited in Bukhari"), ReferenceKind::Quran);
    }

    #[test]
    fn duplicates_are_dropped() {
        let references = vec!["Quran 16:115".to_string(), " Quran 16:115 ".to_string()];
        assert_eq!(extract_references(&references).quran.len(), 1);
    }
}
