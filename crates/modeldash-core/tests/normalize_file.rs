use std::path::Path;

use modeldash_core::normalize::{process_model_list, read_processed};

const SOURCE: &str = r#"
model_list:
  - model_name: gpt-4o
    litellm_params:
      model: openai/gpt-4o
    model_info:
      input_cost_per_token: 0.0000025
      output_cost_per_token: 0.00001
      max_tokens: 128000
      max_output_tokens: 16384
      supports_vision: true
      supports_reasoning: false
  - model_name: 通义千问
    model_info:
      input_cost_per_token: 0.000001
      max_tokens: 127500
      supports_reasoning: true
"#;

fn write_source(dir: &Path, body: &str) -> std::path::PathBuf {
    let p = dir.join("litellmconfig.yaml");
    std::fs::write(&p, body).unwrap();
    p
}

#[test]
fn writes_normalized_models() {
    let tmp = tempfile::TempDir::new().expect("temp dir");
    let input = write_source(tmp.path(), SOURCE);
    let output = tmp.path().join("processed_models.yaml");

    let outcome = process_model_list(&input, &output);
    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(outcome.message, "processed 2 models");

    let models = read_processed(&output).expect("should read back");
    assert_eq!(models.len(), 2);

    let gpt = &models[0];
    assert_eq!(gpt.name, "gpt-4o");
    assert_eq!(gpt.input_cost_per_1m, 2.5);
    assert_eq!(gpt.output_cost_per_1m, 10.0);
    assert_eq!(gpt.max_tokens_label, "128K");
    assert_eq!(gpt.max_output_tokens_label, "16K");
    assert!(gpt.supports_vision);
    assert!(!gpt.supports_reasoning);

    let qwen = &models[1];
    assert_eq!(qwen.name, "通义千问");
    assert_eq!(qwen.input_cost_per_1m, 1.0);
    assert_eq!(qwen.output_cost_per_1m, 0.0);
    assert_eq!(qwen.max_tokens_label, "127K");
    assert_eq!(qwen.max_output_tokens_label, "0");
}

#[test]
fn false_flags_are_omitted_and_keys_sorted() {
    let tmp = tempfile::TempDir::new().expect("temp dir");
    let input = write_source(tmp.path(), SOURCE);
    let output = tmp.path().join("out.yaml");
    assert!(process_model_list(&input, &output).success);

    let text = std::fs::read_to_string(&output).unwrap();
    assert_eq!(text.matches("supports_vision").count(), 1, "{text}");
    assert_eq!(text.matches("supports_reasoning").count(), 1, "{text}");
    assert!(!text.contains("false"), "{text}");
    assert!(text.contains("通义千问"), "non-ASCII must be written literally:\n{text}");

    let pos = |needle: &str| text.find(needle).unwrap_or_else(|| panic!("{needle} missing"));
    assert!(pos("model_info") < pos("model_name"));
    assert!(pos("input_cost_1M_token") < pos("max_output_tokens"));
    assert!(pos("max_output_tokens") < pos("max_tokens:"));
    assert!(pos("max_tokens:") < pos("output_cost_1M_token"));
    assert!(pos("output_cost_1M_token") < pos("supports_vision"));
}

#[test]
fn output_is_replaced_not_merged() {
    let tmp = tempfile::TempDir::new().expect("temp dir");
    let input = write_source(tmp.path(), "model_list:\n  - model_name: only\n");
    let output = tmp.path().join("out.yaml");
    std::fs::write(&output, "model_list:\n- model_name: stale\n  model_info: {}\nextra: 1\n").unwrap();

    assert!(process_model_list(&input, &output).success);
    let text = std::fs::read_to_string(&output).unwrap();
    assert!(!text.contains("stale"));
    assert!(!text.contains("extra"));
    assert_eq!(read_processed(&output).unwrap().len(), 1);
}

#[test]
fn missing_source_reports_file_not_found() {
    let tmp = tempfile::TempDir::new().expect("temp dir");
    let output = tmp.path().join("out.yaml");
    let outcome = process_model_list(&tmp.path().join("nope.yaml"), &output);
    assert!(!outcome.success);
    assert!(outcome.message.contains("file not found"), "{}", outcome.message);
    assert!(!output.exists());
}

#[test]
fn missing_model_list_is_malformed_and_writes_nothing() {
    let tmp = tempfile::TempDir::new().expect("temp dir");
    let input = write_source(tmp.path(), "general_settings:\n  master_key: x\n");
    let output = tmp.path().join("out.yaml");
    let outcome = process_model_list(&input, &output);
    assert!(!outcome.success);
    assert!(outcome.message.contains("malformed input"), "{}", outcome.message);
    assert!(!output.exists());
}

#[test]
fn broken_yaml_is_malformed() {
    let tmp = tempfile::TempDir::new().expect("temp dir");
    let input = write_source(tmp.path(), "model_list: [unclosed\n");
    let outcome = process_model_list(&input, &tmp.path().join("out.yaml"));
    assert!(!outcome.success);
    assert!(outcome.message.contains("malformed input"), "{}", outcome.message);
}
