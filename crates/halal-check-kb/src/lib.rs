use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use halal_check_core::{DataQualityIssue, IngredientRecord, KnowledgeBase, Ruling};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeBaseFormat {
    Json,
    Yaml,
}

impl KnowledgeBaseFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Format implied by a file extension.
    ///
    /// # Errors
    /// Returns an error when the extension is missing or not `.json`, `.yaml` or `.yml`.
    pub fn from_path(path: &Path) -> Result<Self> {
        path.extension()
            .and_then(|extension| extension.to_str())
            .and_then(Self::parse)
            .ok_or_else(|| {
                anyhow!(
                    "cannot infer knowledge base format from {}; expected .json, .yaml or .yml",
                    path.display()
                )
            })
    }
}

#[derive(Debug, Clone)]
pub struct LoadedKnowledgeBase {
    pub knowledge_base: KnowledgeBase,
    pub fingerprint: String,
    pub source_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KnowledgeBaseReport {
    pub fingerprint: String,
    pub source_path: String,
    pub records: usize,
    pub aliases: usize,
    pub data_quality_issues: Vec<DataQualityIssue>,
    pub cycles: Vec<Vec<String>>,
}

impl LoadedKnowledgeBase {
    #[must_use]
    pub fn report(&self) -> KnowledgeBaseReport {
        KnowledgeBaseReport {
            fingerprint: self.fingerprint.clone(),
            source_path: self.source_path.display().to_string(),
            records: self.knowledge_base.len(),
            aliases: self.knowledge_base.alias_count(),
            data_quality_issues: self.knowledge_base.data_quality_issues().to_vec(),
            cycles: self.knowledge_base.derivation_cycles(),
        }
    }
}

/// Load a Knowledge Base file once. The format is inferred from the
/// extension unless given.
///
/// # Errors
/// Returns an error when the file is missing or unreadable, fails to parse,
/// or contains a record that fails validation.
pub fn load(path: &Path, format: Option<KnowledgeBaseFormat>) -> Result<LoadedKnowledgeBase> {
    let format = match format {
        Some(format) => format,
        None => KnowledgeBaseFormat::from_path(path)?,
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read knowledge base {}", path.display()))?;
    let records = parse_records(&text, format)
        .with_context(|| format!("failed to parse knowledge base {}", path.display()))?;
    let knowledge_base = KnowledgeBase::from_records(records)
        .with_context(|| format!("invalid knowledge base {}", path.display()))?;
    let fingerprint = fingerprint(&knowledge_base)?;

    tracing::info!(
        path = %path.display(),
        format = format.as_str(),
        records = knowledge_base.len(),
        aliases = knowledge_base.alias_count(),
        issues = knowledge_base.data_quality_issues().len(),
        fingerprint = %fingerprint,
        "knowledge base loaded"
    );

    Ok(LoadedKnowledgeBase { knowledge_base, fingerprint, source_path: path.to_path_buf() })
}

/// Parse records from either a list or an identifier-keyed map.
///
/// In the keyed shape the map key fills a missing `identifier`. Legacy
/// ruling labels such as `questionable` are mapped onto [`Ruling`].
///
/// # Errors
/// Returns an error on malformed text, an unsupported top-level shape, or a
/// record that does not match the record schema.
pub fn parse_records(text: &str, format: KnowledgeBaseFormat) -> Result<Vec<IngredientRecord>> {
    let document: Value = match format {
        KnowledgeBaseFormat::Json => {
            serde_json::from_str(text).context("knowledge base is not valid JSON")?
        }
        KnowledgeBaseFormat::Yaml => {
            serde_yaml::from_str(text).context("knowledge base is not valid YAML")?
        }
    };

    let entries: Vec<Value> = match document {
        Value::Array(items) => items,
        Value::Object(map) => map
            .into_iter()
            .map(|(key, mut value)| {
                if let Value::Object(fields) = &mut value {
                    fields.entry("identifier").or_insert(Value::String(key));
                }
                value
            })
            .collect(),
        Value::Null => Vec::new(),
        other => {
            return Err(anyhow!(
                "knowledge base must be a list of records or a map of identifier to record, found {}",
                json_kind(&other)
            ))
        }
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, mut entry)| {
            canonicalize_ruling(&mut entry)
                .with_context(|| format!("invalid ruling in record #{index}"))?;
            serde_json::from_value::<IngredientRecord>(entry)
                .with_context(|| format!("invalid record #{index}"))
        })
        .collect()
}

fn canonicalize_ruling(entry: &mut Value) -> Result<()> {
    let Some(slot) = entry.get_mut("ruling") else {
        return Ok(());
    };
    let Value::String(label) = slot else {
        return Ok(());
    };
    let lowered = label.trim().to_ascii_lowercase();
    if lowered.is_empty() {
        *slot = Value::Null;
        return Ok(());
    }
    let ruling = Ruling::parse(&lowered).ok_or_else(|| anyhow!("unsupported ruling `{label}`"))?;
    *slot = Value::String(ruling.as_str().to_string());
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a map",
    }
}

/// Stable content hash of the indexed records, `kb_` + 16 hex characters.
///
/// # Errors
/// Returns an error when a record cannot be serialized.
pub fn fingerprint(knowledge_base: &KnowledgeBase) -> Result<String> {
    let mut hasher = Sha256::new();
    // records iterate in identifier order
    for record in knowledge_base.records() {
        let canonical =
            serde_json::to_vec(record).context("failed to serialize record for fingerprint")?;
        hasher.update(&canonical);
        hasher.update(b"\n");
    }
    let digest = hasher.finalize();
    let digest_hex = format!("{digest:x}");
    Ok(format!("kb_{}", &digest_hex[..16]))
}
