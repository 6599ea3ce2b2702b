//! Model records as they appear in a router config (`model_list` entries with a
//! nested `model_info`) and in the processed file the dashboard reads.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

/// One model as read from the source config, with absent fields defaulted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelRecord {
    pub name: String,
    pub input_cost_per_token: f64,
    pub output_cost_per_token: f64,
    pub max_tokens: i64,
    pub max_output_tokens: i64,
    pub supports_vision: bool,
    pub supports_reasoning: bool,
}

/// One model after normalization: prices per 1M tokens, token limits as K-labels.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedModel {
    pub name: String,
    pub input_cost_per_1m: f64,
    pub output_cost_per_1m: f64,
    pub max_tokens_label: String,
    pub max_output_tokens_label: String,
    pub supports_reasoning: bool,
    pub supports_vision: bool,
}

// ── Source file ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct SourceFile {
    pub model_list: Vec<SourceEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SourceEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub model_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub model_info: SourceInfo,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SourceInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    input_cost_per_token: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    output_cost_per_token: f64,
    #[serde(default, deserialize_with = "token_count")]
    max_tokens: i64,
    #[serde(default, deserialize_with = "token_count")]
    max_output_tokens: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    supports_vision: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    supports_reasoning: bool,
}

impl From<SourceEntry> for ModelRecord {
    fn from(e: SourceEntry) -> Self {
        let info = e.model_info;
        Self {
            name: e.model_name,
            input_cost_per_token: info.input_cost_per_token,
            output_cost_per_token: info.output_cost_per_token,
            max_tokens: info.max_tokens,
            max_output_tokens: info.max_output_tokens,
            supports_vision: info.supports_vision,
            supports_reasoning: info.supports_reasoning,
        }
    }
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Accept integer or float token counts (floats truncate), null as zero.
fn token_count<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    struct TokenCount;

    impl<'de> Visitor<'de> for TokenCount {
        type Value = i64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a token count")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
            Ok(i64::try_from(v).unwrap_or(i64::MAX))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
            Ok(v.trunc() as i64)
        }

        fn visit_unit<E: de::Error>(self) -> Result<i64, E> {
            Ok(0)
        }

        fn visit_none<E: de::Error>(self) -> Result<i64, E> {
            Ok(0)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<i64, D::Error> {
            d.deserialize_any(TokenCount)
        }
    }

    d.deserialize_any(TokenCount)
}

// ── Processed file ───────────────────────────────────────────────────
//
// Field order is alphabetical so the written YAML has sorted keys.

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ProcessedFile {
    pub model_list: Vec<ProcessedEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ProcessedEntry {
    pub model_info: ProcessedInfo,
    #[serde(default)]
    pub model_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ProcessedInfo {
    #[serde(rename = "input_cost_1M_token", default)]
    pub input_cost_1m_token: f64,
    #[serde(default = "zero_label")]
    pub max_output_tokens: String,
    #[serde(default = "zero_label")]
    pub max_tokens: String,
    #[serde(rename = "output_cost_1M_token", default)]
    pub output_cost_1m_token: f64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub supports_reasoning: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub supports_vision: bool,
}

fn zero_label() -> String {
    "0".to_string()
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl From<&NormalizedModel> for ProcessedEntry {
    fn from(m: &NormalizedModel) -> Self {
        Self {
            model_info: ProcessedInfo {
                input_cost_1m_token: m.input_cost_per_1m,
                max_output_tokens: m.max_output_tokens_label.clone(),
                max_tokens: m.max_tokens_label.clone(),
                output_cost_1m_token: m.output_cost_per_1m,
                supports_reasoning: m.supports_reasoning,
                supports_vision: m.supports_vision,
            },
            model_name: m.name.clone(),
        }
    }
}

impl From<ProcessedEntry> for NormalizedModel {
    fn from(e: ProcessedEntry) -> Self {
        let info = e.model_info;
        Self {
            name: e.model_name,
            input_cost_per_1m: info.input_cost_1m_token,
            output_cost_per_1m: info.output_cost_1m_token,
            max_tokens_label: info.max_tokens,
            max_output_tokens_label: info.max_output_tokens,
            supports_reasoning: info.supports_reasoning,
            supports_vision: info.supports_vision,
        }
    }
}
