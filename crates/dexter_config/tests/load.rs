use std::fs;

use dexter_config::{ConfigError, DebugTrace, DexterConfig, DumpKind, StopAfter};

#[test]
fn loads_a_full_configuration_file() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("dexter.toml");
  fs::write(
    &path,
    r#"
verbose = 2
debug-trace = ["struct", "nullable"]
stop-after = "enum-optimizer"
set-next-instruction = true
verify-passes = true
dump = ["input", "report"]
dump-dir = "out"
jobs = 4
"#,
  )
  .unwrap();

  let config = DexterConfig::load(&path).unwrap();
  assert_eq!(config.verbose, 2);
  assert_eq!(config.debug_trace, vec![DebugTrace::Struct, DebugTrace::Nullable]);
  assert_eq!(config.stop_after, Some(StopAfter::EnumOptimizer));
  assert!(config.set_next_instruction);
  assert!(config.verify_passes);
  assert!(config.dumps(DumpKind::Report));
  assert!(!config.dumps(DumpKind::Lowered));
  assert_eq!(config.dump_dir.as_deref(), Some(std::path::Path::new("out")));
  assert_eq!(config.jobs, 4);
}

#[test]
fn missing_file_is_an_io_error() {
  let dir = tempfile::tempdir().unwrap();
  let err = DexterConfig::load(&dir.path().join("absent.toml")).unwrap_err();
  assert!(matches!(err, ConfigError::IoError { .. }));
}

#[test]
fn bad_stage_name_names_the_file() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("dexter.toml");
  fs::write(&path, "stop-after = \"everything\"\n").unwrap();

  let err = DexterConfig::load(&path).unwrap_err();
  assert!(err.to_string().starts_with("failed to parse '"));
}
