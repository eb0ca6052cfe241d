//! Unit tests for `DoodlecArgs` argument parsing and layering.

use doodle_classifier::{InitPolicy, cli::DoodlecArgs, config::DEFAULT_MODEL_FILE};
use rstest::{fixture, rstest};
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::Path;
use std::sync::{LazyLock, Mutex, MutexGuard};
use tempfile::NamedTempFile;

#[fixture]
fn temp_toml_file() -> NamedTempFile {
    NamedTempFile::new().unwrap_or_else(|e| panic!("create temp file: {e}"))
}

fn write_toml_content(file: &mut NamedTempFile, content: &str) {
    writeln!(file, "{content}").unwrap_or_else(|e| panic!("write config: {e}"));
}

fn get_config_path(file: &NamedTempFile) -> &str {
    file.path().to_str().unwrap_or_else(|| panic!("path str"))
}

static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

struct EnvVarGuard {
    key: String,
    _lock: MutexGuard<'static, ()>,
}

impl EnvVarGuard {
    fn new(key: &str, val: &str) -> Self {
        let lock = ENV_LOCK
            .lock()
            .unwrap_or_else(|e| panic!("env lock poisoned: {e}"));
        // Safety: process-wide env mutation is synchronised by ENV_LOCK.
        unsafe { env::set_var(key, val) };
        Self {
            key: key.to_owned(),
            _lock: lock,
        }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        // Safety: process-wide env mutation is synchronised by ENV_LOCK.
        unsafe { env::remove_var(&self.key) };
    }
}

#[rstest]
#[case(vec!["doodlec"], false)]
#[case(vec!["doodlec", "--list-labels=true"], true)]
fn load_parses_list_labels(#[case] argv: Vec<&str>, #[case] expected: bool) {
    let cfg = <DoodlecArgs as ortho_config::OrthoConfig>::load_from_iter(argv)
        .unwrap_or_else(|e| panic!("unexpected parse error: {e}"));
    assert_eq!(cfg.list_labels, expected);
}

#[rstest]
fn load_parses_paths_and_limit() {
    let argv = [
        "doodlec",
        "--bitmap-path",
        "sketch.txt",
        "--limit",
        "5",
        "--asset-dir",
        "/srv/doodles",
    ];
    let cfg = <DoodlecArgs as ortho_config::OrthoConfig>::load_from_iter(argv)
        .unwrap_or_else(|e| panic!("unexpected parse error: {e}"));
    assert_eq!(cfg.bitmap_path.as_deref(), Some(Path::new("sketch.txt")));
    assert_eq!(cfg.limit, Some(5));
    let config = cfg.classifier_config();
    assert_eq!(config.default_limit, 5);
    assert_eq!(config.asset_dir, Path::new("/srv/doodles"));
    assert_eq!(config.model_file, DEFAULT_MODEL_FILE);
}

#[rstest]
#[case("--limit=many")]
#[case("--list-labels=maybe")]
fn load_rejects_invalid_values(#[case] arg: &str) {
    let result = <DoodlecArgs as ortho_config::OrthoConfig>::load_from_iter(["doodlec", arg]);
    assert!(result.is_err());
}

#[rstest]
#[serial]
fn env_var_parsing_sets_model_file() {
    let _guard = EnvVarGuard::new("DOODLEC_MODEL_FILE", "cnn_model.onnx");
    let cfg =
        DoodlecArgs::load_from_env().unwrap_or_else(|e| panic!("unexpected env parse error: {e}"));
    assert_eq!(cfg.model_file.as_deref(), Some("cnn_model.onnx"));
}

#[rstest]
#[serial]
fn env_var_parsing_invalid_limit() {
    let _guard = EnvVarGuard::new("DOODLEC_LIMIT", "lots");
    let result = DoodlecArgs::load_from_env();
    assert!(result.is_err());
}

#[rstest]
fn config_file_parsing_sets_remote_base(mut temp_toml_file: NamedTempFile) {
    write_toml_content(&mut temp_toml_file, "remote_base = \"http://mirror.local\"");
    let path = get_config_path(&temp_toml_file);
    let cfg = DoodlecArgs::load_from_config(path)
        .unwrap_or_else(|e| panic!("unexpected config parse error: {e}"));
    assert_eq!(
        cfg.classifier_config().remote_base,
        "http://mirror.local"
    );
}

#[rstest]
fn config_file_parsing_invalid_bool(mut temp_toml_file: NamedTempFile) {
    write_toml_content(&mut temp_toml_file, "list_labels = notabool");
    let path = get_config_path(&temp_toml_file);
    let result = DoodlecArgs::load_from_config(path);
    assert!(result.is_err());
}

#[rstest]
#[serial]
fn precedence_cli_over_env_and_config(mut temp_toml_file: NamedTempFile) {
    let _guard = EnvVarGuard::new("DOODLEC_LIMIT", "3");
    write_toml_content(&mut temp_toml_file, "limit = 4");
    let path = get_config_path(&temp_toml_file);
    let argv = vec!["doodlec", "--limit=5", "--config-path", path];
    let cfg = <DoodlecArgs as ortho_config::OrthoConfig>::load_from_iter(argv)
        .unwrap_or_else(|e| panic!("unexpected parse error: {e}"));
    assert_eq!(cfg.limit, Some(5));
}

#[rstest]
#[serial]
fn precedence_env_over_config(mut temp_toml_file: NamedTempFile) {
    let _guard = EnvVarGuard::new("DOODLEC_LIMIT", "3");
    write_toml_content(&mut temp_toml_file, "limit = 4");
    let path = get_config_path(&temp_toml_file);
    let cfg = DoodlecArgs::load_from_env_and_config(path)
        .unwrap_or_else(|e| panic!("unexpected parse error: {e}"));
    assert_eq!(cfg.limit, Some(3));
}

#[rstest]
fn config_file_pins_and_policy_reach_classifier_config(mut temp_toml_file: NamedTempFile) {
    write_toml_content(
        &mut temp_toml_file,
        concat!(
            "model_sha256 = \"deadbeef\"\n",
            "labels_sha256 = \"cafe\"\n",
            "init = \"on_demand\"\n",
            "padding_prefix = \"blank\"\n",
            "intra_threads = 2",
        ),
    );
    let path = get_config_path(&temp_toml_file);
    let argv = ["doodlec", "--config-path", path];
    let cfg = <DoodlecArgs as ortho_config::OrthoConfig>::load_from_iter(argv)
        .unwrap_or_else(|e| panic!("unexpected config parse error: {e}"));
    let config = cfg.classifier_config();
    assert_eq!(config.model_sha256.as_deref(), Some("deadbeef"));
    assert_eq!(config.model_asset().sha256.as_deref(), Some("deadbeef"));
    assert_eq!(config.labels_sha256.as_deref(), Some("cafe"));
    assert_eq!(config.init, InitPolicy::OnDemand);
    assert_eq!(config.padding_prefix, "blank");
    assert_eq!(config.intra_threads, Some(2));
}

#[rstest]
fn cli_flags_set_init_and_graph_names() {
    let argv = [
        "doodlec",
        "--init",
        "on_demand",
        "--input-name",
        "pixels",
        "--output-name",
        "logits",
    ];
    let cfg = <DoodlecArgs as ortho_config::OrthoConfig>::load_from_iter(argv)
        .unwrap_or_else(|e| panic!("unexpected parse error: {e}"));
    let config = cfg.classifier_config();
    assert_eq!(config.init, InitPolicy::OnDemand);
    assert_eq!(config.input_name.as_deref(), Some("pixels"));
    assert_eq!(config.output_name.as_deref(), Some("logits"));
}

#[rstest]
fn unset_options_keep_defaults() {
    let cfg = <DoodlecArgs as ortho_config::OrthoConfig>::load_from_iter(["doodlec"])
        .unwrap_or_else(|e| panic!("unexpected parse error: {e}"));
    let config = cfg.classifier_config();
    assert_eq!(config.init, InitPolicy::Eager);
    assert_eq!(config.model_sha256, None);
    assert_eq!(config.padding_prefix, "nothing");
}

#[rstest]
#[serial]
fn env_var_sets_model_pin() {
    let _guard = EnvVarGuard::new("DOODLEC_MODEL_SHA256", "abc123");
    let cfg =
        DoodlecArgs::load_from_env().unwrap_or_else(|e| panic!("unexpected env parse error: {e}"));
    assert_eq!(
        cfg.classifier_config().model_sha256.as_deref(),
        Some("abc123")
    );
}

#[rstest]
fn config_file_rejects_unknown_init_policy(mut temp_toml_file: NamedTempFile) {
    write_toml_content(&mut temp_toml_file, "init = \"lazy\"");
    let path = get_config_path(&temp_toml_file);
    assert!(DoodlecArgs::load_from_config(path).is_err());
}
