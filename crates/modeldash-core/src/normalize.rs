//! Turn a router config's `model_list` into the processed table the
//! dashboard displays.

use std::path::Path;

use crate::error::{DashError, Outcome, Result};
use crate::model::{ModelRecord, NormalizedModel, ProcessedEntry, ProcessedFile, SourceFile};

pub const DEFAULT_INPUT: &str = "litellmconfig.yaml";
pub const DEFAULT_OUTPUT: &str = "processed_models.yaml";

const TOKENS_PER_PRICE_UNIT: f64 = 1_000_000.0;

/// Round to 2 decimals, ties to even on the exact binary value.
///
/// Goes through correctly-rounded decimal formatting rather than
/// `(x * 100.0).round() / 100.0`, which double-rounds.
pub fn round2(x: f64) -> f64 {
    format!("{x:.2}").parse().unwrap_or(x)
}

/// Price per token to price per 1M tokens, rounded to cents.
pub fn cost_per_million(cost_per_token: f64) -> f64 {
    round2(cost_per_token * TOKENS_PER_PRICE_UNIT)
}

/// Token count as whole thousands: 127500 -> "127K", anything <= 0 -> "0".
pub fn k_label(tokens: i64) -> String {
    if tokens > 0 {
        format!("{}K", tokens / 1000)
    } else {
        "0".to_string()
    }
}

pub fn normalize_record(r: &ModelRecord) -> NormalizedModel {
    NormalizedModel {
        name: r.name.clone(),
        input_cost_per_1m: cost_per_million(r.input_cost_per_token),
        output_cost_per_1m: cost_per_million(r.output_cost_per_token),
        max_tokens_label: k_label(r.max_tokens),
        max_output_tokens_label: k_label(r.max_output_tokens),
        supports_reasoning: r.supports_reasoning,
        supports_vision: r.supports_vision,
    }
}

/// Normalize every record, preserving order.
pub fn normalize(records: &[ModelRecord]) -> Vec<NormalizedModel> {
    records.iter().map(normalize_record).collect()
}

/// Parse a router config. The root must be a mapping with a `model_list` sequence.
pub fn parse_records(yaml: &str) -> Result<Vec<ModelRecord>> {
    let file: SourceFile = serde_yaml::from_str(yaml)?;
    Ok(file.model_list.into_iter().map(ModelRecord::from).collect())
}

pub fn read_records(path: &Path) -> Result<Vec<ModelRecord>> {
    let content = std::fs::read_to_string(path).map_err(|e| DashError::io(path, e))?;
    parse_records(&content)
}

/// Serialize the processed table with sorted keys and literal non-ASCII.
pub fn render_processed(models: &[NormalizedModel]) -> Result<String> {
    let file = ProcessedFile {
        model_list: models.iter().map(ProcessedEntry::from).collect(),
    };
    serde_yaml::to_string(&file).map_err(|e| DashError::Unknown(e.to_string()))
}

/// Replace `path` with the processed table. Nothing is written if
/// serialization fails.
pub fn write_processed(path: &Path, models: &[NormalizedModel]) -> Result<()> {
    let text = render_processed(models)?;
    std::fs::write(path, text)
        .map_err(|e| DashError::Unknown(format!("cannot write {}: {e}", path.display())))
}

pub fn read_processed(path: &Path) -> Result<Vec<NormalizedModel>> {
    let content = std::fs::read_to_string(path).map_err(|e| DashError::io(path, e))?;
    let file: ProcessedFile = serde_yaml::from_str(&content)?;
    Ok(file.model_list.into_iter().map(NormalizedModel::from).collect())
}

/// Read `input`, normalize, overwrite `output`. Returns the record count.
pub fn normalize_file(input: &Path, output: &Path) -> Result<usize> {
    let records = read_records(input)?;
    tracing::debug!(input = %input.display(), count = records.len(), "read model list");
    let models = normalize(&records);
    write_processed(output, &models)?;
    tracing::info!(output = %output.display(), count = models.len(), "wrote processed models");
    Ok(models.len())
}

/// [`normalize_file`] with failures folded into an [`Outcome`].
pub fn process_model_list(input: &Path, output: &Path) -> Outcome {
    match normalize_file(input, output) {
        Ok(n) => Outcome::ok(format!("processed {n} models")),
        Err(e) => {
            tracing::debug!(input = %input.display(), "normalize failed: {e}");
            e.into()
        }
    }
}

impl From<&NormalizedModel> for ModelRecord {
    /// Map a processed entry back into source shape (per-token prices,
    /// token counts from K-labels).
    fn from(m: &NormalizedModel) -> Self {
        Self {
            name: m.name.clone(),
            input_cost_per_token: m.input_cost_per_1m / TOKENS_PER_PRICE_UNIT,
            output_cost_per_token: m.output_cost_per_1m / TOKENS_PER_PRICE_UNIT,
            max_tokens: label_tokens(&m.max_tokens_label),
            max_output_tokens: label_tokens(&m.max_output_tokens_label),
            supports_vision: m.supports_vision,
            supports_reasoning: m.supports_reasoning,
        }
    }
}

fn label_tokens(label: &str) -> i64 {
    label
        .strip_suffix('K')
        .and_then(|k| k.parse::<i64>().ok())
        .map_or(0, |k| k * 1000)
}
