use std::path::{Path, PathBuf};
use std::time::Duration;

use modeldash_core::import::{ImportState, InProcessNormalizer, SubprocessNormalizer};
use modeldash_core::{Dashboard, DashError, Profile, Settings};

fn settings(dir: &Path) -> Settings {
    let mut s = Settings::for_profile(Profile::Local);
    s.processed_path = dir.join("processed_models.yaml");
    s.upload_dir = dir.join("temp_uploads");
    s
}

fn upload(dir: &Path, name: &str, body: &str) -> PathBuf {
    let p = dir.join(name);
    std::fs::write(&p, body).unwrap();
    p
}

#[tokio::test]
async fn import_replaces_table_and_cleans_up() {
    let tmp = tempfile::TempDir::new().expect("temp dir");
    let mut dash = Dashboard::open(&settings(tmp.path()));
    assert!(dash.load_error().is_some(), "no processed file yet");
    assert!(dash.rows().is_empty());

    let src = upload(
        tmp.path(),
        "new.yaml",
        "model_list:\n  - model_name: a\n    model_info:\n      input_cost_per_token: 0.000003\n  - model_name: b\n",
    );
    dash.open_uploader().unwrap();
    let staged = dash.stage(&src).unwrap();
    assert_eq!(staged, tmp.path().join("temp_uploads").join("new.yaml"));
    assert_eq!(dash.import_state(), &ImportState::FileStaged(staged.clone()));

    let msg = dash.process(&InProcessNormalizer).await.unwrap();
    assert!(msg.contains("processed 2 models"), "{msg}");
    assert!(matches!(dash.import_state(), ImportState::Done(_)));
    assert!(!staged.exists(), "staged file should be removed");
    assert!(src.exists(), "original upload is left alone");

    assert!(dash.load_error().is_none());
    assert_eq!(dash.rows().len(), 2);
    assert_eq!(dash.rows()[0].input_cost_per_1m, 3.0);

    assert_eq!(dash.acknowledge().unwrap(), msg);
    assert_eq!(dash.import_state(), &ImportState::Idle);
}

#[tokio::test]
async fn first_import_without_initial_load() {
    let tmp = tempfile::TempDir::new().expect("temp dir");
    let mut dash = Dashboard::new(&settings(tmp.path()));
    assert!(dash.load_error().is_none(), "nothing read before the import");
    assert!(dash.rows().is_empty());

    let src = upload(tmp.path(), "first.yaml", "model_list:\n  - model_name: only\n");
    dash.open_uploader().unwrap();
    dash.stage(&src).unwrap();
    dash.process(&InProcessNormalizer).await.unwrap();

    assert!(dash.load_error().is_none());
    assert_eq!(dash.rows().len(), 1);
    assert_eq!(dash.rows()[0].name, "only");
}

#[tokio::test]
async fn failed_import_keeps_staged_file_for_retry() {
    let tmp = tempfile::TempDir::new().expect("temp dir");
    let mut dash = Dashboard::open(&settings(tmp.path()));
    let src = upload(tmp.path(), "bad.yaml", "not_a_model_list: true\n");

    dash.open_uploader().unwrap();
    let staged = dash.stage(&src).unwrap();
    let err = dash.process(&InProcessNormalizer).await.unwrap_err();
    assert!(matches!(err, DashError::MalformedInput(_)));
    match dash.import_state() {
        ImportState::Error { staged: Some(p), .. } => assert_eq!(p, &staged),
        other => panic!("unexpected state {other:?}"),
    }
    assert!(staged.exists());

    dash.acknowledge().unwrap();
    assert_eq!(dash.import_state(), &ImportState::FileStaged(staged.clone()));

    dash.clear_staged().unwrap();
    assert_eq!(dash.import_state(), &ImportState::Idle);
    assert!(!staged.exists());
}

#[tokio::test]
async fn process_without_staged_file_is_rejected() {
    let tmp = tempfile::TempDir::new().expect("temp dir");
    let mut dash = Dashboard::open(&settings(tmp.path()));
    let err = dash.process(&InProcessNormalizer).await.unwrap_err();
    assert!(matches!(err, DashError::InvalidState(_)));
    assert_eq!(dash.import_state(), &ImportState::Idle);
}

#[test]
fn staging_a_missing_file_moves_to_error() {
    let tmp = tempfile::TempDir::new().expect("temp dir");
    let mut dash = Dashboard::open(&settings(tmp.path()));
    dash.open_uploader().unwrap();
    let err = dash.stage(&tmp.path().join("ghost.yaml")).unwrap_err();
    assert!(matches!(err, DashError::FileNotFound(_)));
    assert!(matches!(dash.import_state(), ImportState::Error { staged: None, .. }));
    dash.open_uploader().unwrap();
    assert_eq!(dash.import_state(), &ImportState::AwaitingUpload);
}

#[cfg(unix)]
mod subprocess {
    use super::*;
    use modeldash_core::import::Normalizer;

    fn sh(script: &str, timeout: Duration) -> SubprocessNormalizer {
        SubprocessNormalizer {
            program: PathBuf::from("sh"),
            args: vec!["-c".into(), script.into(), "sh".into()],
            timeout,
        }
    }

    #[tokio::test]
    async fn exceeding_the_bound_is_a_timeout() {
        let n = sh("sleep 5", Duration::from_millis(200));
        let err = n.run(Path::new("in.yaml"), Path::new("out.yaml")).await.unwrap_err();
        assert!(matches!(err, DashError::Timeout(_)), "{err}");
    }

    #[tokio::test]
    async fn non_zero_exit_surfaces_stderr() {
        let n = sh("echo \"cannot read $1\" >&2; exit 1", Duration::from_secs(10));
        let err = n.run(Path::new("in.yaml"), Path::new("out.yaml")).await.unwrap_err();
        assert_eq!(err.to_string(), "cannot read in.yaml");
    }

    #[tokio::test]
    async fn success_returns_stdout() {
        let n = sh("echo \"processed 7 models\"; test \"$2\" = out.yaml", Duration::from_secs(10));
        let msg = n.run(Path::new("in.yaml"), Path::new("out.yaml")).await.unwrap();
        assert_eq!(msg, "processed 7 models");
    }

    #[tokio::test]
    async fn missing_program_is_reported() {
        let n = SubprocessNormalizer {
            program: PathBuf::from("/definitely/not/here"),
            args: Vec::new(),
            timeout: Duration::from_secs(1),
        };
        let err = n.run(Path::new("a"), Path::new("b")).await.unwrap_err();
        assert!(err.to_string().contains("failed to run"), "{err}");
    }
}
