//! Copy model names from a router config into a provider entry of a
//! router-client JSON config.

use std::path::Path;

use serde_json::Value as Json;
use serde_yaml::Value as Yaml;

use crate::error::{DashError, Outcome, Result};

pub const DEFAULT_PROVIDER: &str = "lite";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderUpdate {
    pub old_count: usize,
    pub new_count: usize,
}

/// Outcome of a full sync: the names written and the count change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub names: Vec<String>,
    pub update: ProviderUpdate,
}

/// `model_list[*].model_name` from a router config, in file order.
/// Scalar names (`123`, `true`) are kept as text; entries without a name
/// are skipped.
pub fn extract_model_names(yaml_path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(yaml_path).map_err(|e| DashError::io(yaml_path, e))?;
    let doc: Yaml = if content.trim().is_empty() {
        Yaml::Null
    } else {
        serde_yaml::from_str(&content)?
    };

    let list = doc
        .get("model_list")
        .ok_or_else(|| DashError::MissingField("model_list not found".into()))?;
    let entries = list
        .as_sequence()
        .ok_or_else(|| DashError::MalformedInput("model_list is not a sequence".into()))?;

    let names: Vec<String> = entries
        .iter()
        .filter_map(|e| e.get("model_name").and_then(scalar_text))
        .collect();

    if names.is_empty() {
        return Err(DashError::MissingField("no models found in model_list".into()));
    }
    tracing::debug!(path = %yaml_path.display(), count = names.len(), "extracted model names");
    Ok(names)
}

fn scalar_text(v: &Yaml) -> Option<String> {
    match v {
        Yaml::String(s) => Some(s.clone()),
        Yaml::Number(n) => Some(n.to_string()),
        Yaml::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Replace the `models` array of the provider called `provider` inside the
/// `Providers` list. The file is only rewritten when the provider exists.
pub fn update_provider_models(
    json_path: &Path,
    provider: &str,
    names: &[String],
) -> Result<ProviderUpdate> {
    let content = std::fs::read_to_string(json_path).map_err(|e| DashError::io(json_path, e))?;
    let mut doc: Json = serde_json::from_str(&content)?;

    let providers = doc
        .get_mut("Providers")
        .ok_or_else(|| DashError::MissingField("Providers not found".into()))?
        .as_array_mut()
        .ok_or_else(|| DashError::MalformedInput("Providers is not an array".into()))?;

    let entry = providers
        .iter_mut()
        .find(|p| p.get("name").and_then(Json::as_str) == Some(provider))
        .ok_or_else(|| DashError::MissingField(format!("no provider named '{provider}'")))?;

    let old_count = entry.get("models").and_then(Json::as_array).map_or(0, Vec::len);
    let models = names.iter().cloned().map(Json::String).collect();
    match entry.as_object_mut() {
        Some(obj) => {
            obj.insert("models".to_string(), Json::Array(models));
        }
        None => return Err(DashError::MalformedInput("provider entry is not an object".into())),
    }

    let text = serde_json::to_string_pretty(&doc)?;
    std::fs::write(json_path, text)
        .map_err(|e| DashError::Unknown(format!("cannot write {}: {e}", json_path.display())))?;

    Ok(ProviderUpdate { old_count, new_count: names.len() })
}

/// Extract names from `yaml_path` and write them into `json_path`.
/// The JSON file is untouched if extraction fails.
pub fn run_sync(yaml_path: &Path, json_path: &Path, provider: &str) -> Result<SyncReport> {
    let names = extract_model_names(yaml_path)?;
    let update = update_provider_models(json_path, provider, &names)?;
    Ok(SyncReport { names, update })
}

/// [`run_sync`] with failures folded into an [`Outcome`].
pub fn sync_models(yaml_path: &Path, json_path: &Path, provider: &str) -> Outcome {
    match run_sync(yaml_path, json_path, provider) {
        Ok(SyncReport { update: u, .. }) => Outcome::ok(format!(
            "updated '{provider}' models (was {}, now {})",
            u.old_count, u.new_count
        )),
        Err(e) => {
            tracing::warn!("model sync failed: {e}");
            e.into()
        }
    }
}
