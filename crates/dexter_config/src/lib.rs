use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DumpKind {
  /// Tree as handed to the pipeline.
  Input,
  /// Tree after the last stage that ran.
  Lowered,
  /// JSON summary of the whole batch.
  Report,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DebugTrace {
  Pipeline,
  Struct,
  Nullable,
  Enum,
  Generics,
  Atomic,
  Cast,
  Branch,
  Byref,
  Conversion,
}

/// Named pipeline positions, in execution order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopAfter {
  FieldInitialization,
  IntPtr,
  TypeOf,
  BranchOptimizer,
  CompoundAssignment,
  Interlocked,
  ByReferenceParam,
  CompareUnordered,
  Enum,
  EnumOptimizer,
  Nullable,
  PrimitiveAddressOf,
  StructCall,
  InitializeStructVariables,
  Delegate,
  LdcWide,
  LdLocWithConversion,
  ConvertAfterLoad,
  ConvertBeforeStore,
  Cleanup,
  Generics,
  Cast,
  GenericInstance,
  BranchOptimizer2,
  SetNextInstruction,
}

impl StopAfter {
  pub const ALL: [StopAfter; 25] = [
    StopAfter::FieldInitialization,
    StopAfter::IntPtr,
    StopAfter::TypeOf,
    StopAfter::BranchOptimizer,
    StopAfter::CompoundAssignment,
    StopAfter::Interlocked,
    StopAfter::ByReferenceParam,
    StopAfter::CompareUnordered,
    StopAfter::Enum,
    StopAfter::EnumOptimizer,
    StopAfter::Nullable,
    StopAfter::PrimitiveAddressOf,
    StopAfter::StructCall,
    StopAfter::InitializeStructVariables,
    StopAfter::Delegate,
    StopAfter::LdcWide,
    StopAfter::LdLocWithConversion,
    StopAfter::ConvertAfterLoad,
    StopAfter::ConvertBeforeStore,
    StopAfter::Cleanup,
    StopAfter::Generics,
    StopAfter::Cast,
    StopAfter::GenericInstance,
    StopAfter::BranchOptimizer2,
    StopAfter::SetNextInstruction,
  ];

  pub fn name(self) -> &'static str {
    match self {
      StopAfter::FieldInitialization => "field-initialization",
      StopAfter::IntPtr => "int-ptr",
      StopAfter::TypeOf => "type-of",
      StopAfter::BranchOptimizer => "branch-optimizer",
      StopAfter::CompoundAssignment => "compound-assignment",
      StopAfter::Interlocked => "interlocked",
      StopAfter::ByReferenceParam => "by-reference-param",
      StopAfter::CompareUnordered => "compare-unordered",
      StopAfter::Enum => "enum",
      StopAfter::EnumOptimizer => "enum-optimizer",
      StopAfter::Nullable => "nullable",
      StopAfter::PrimitiveAddressOf => "primitive-address-of",
      StopAfter::StructCall => "struct-call",
      StopAfter::InitializeStructVariables => "initialize-struct-variables",
      StopAfter::Delegate => "delegate",
      StopAfter::LdcWide => "ldc-wide",
      StopAfter::LdLocWithConversion => "ld-loc-with-conversion",
      StopAfter::ConvertAfterLoad => "convert-after-load",
      StopAfter::ConvertBeforeStore => "convert-before-store",
      StopAfter::Cleanup => "cleanup",
      StopAfter::Generics => "generics",
      StopAfter::Cast => "cast",
      StopAfter::GenericInstance => "generic-instance",
      StopAfter::BranchOptimizer2 => "branch-optimizer2",
      StopAfter::SetNextInstruction => "set-next-instruction",
    }
  }

  /// Position in the pipeline, starting at 0.
  pub fn index(self) -> usize {
    self as usize
  }
}

impl fmt::Display for StopAfter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Lowering configuration.
///
/// Expected format in dexter.toml:
/// ```toml
/// verbose = 2
/// debug-trace = ["struct", "nullable"]
/// stop-after = "enum-optimizer"
/// dump = ["lowered"]
/// dump-dir = "out"
/// jobs = 4
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct DexterConfig {
  pub quiet: bool,
  pub verbose: u8,
  pub debug: bool,
  pub debug_trace: Vec<DebugTrace>,
  /// Stop the pipeline after this stage and keep the partially lowered tree.
  pub stop_after: Option<StopAfter>,
  /// Emit restart scaffolding for the debugger's set-next-instruction.
  pub set_next_instruction: bool,
  /// Verify tree shape and types after every stage.
  pub verify_passes: bool,
  pub dump: Vec<DumpKind>,
  /// Dumps go to stdout when unset.
  pub dump_dir: Option<PathBuf>,
  /// Worker threads used by the batch driver.
  pub jobs: usize,
}

impl Default for DexterConfig {
  fn default() -> Self {
    Self {
      quiet: false,
      verbose: 0,
      debug: false,
      debug_trace: Vec::new(),
      stop_after: None,
      set_next_instruction: false,
      verify_passes: false,
      dump: Vec::new(),
      dump_dir: None,
      jobs: 1,
    }
  }
}

impl DexterConfig {
  pub fn new_basic(
    debug: bool,
    debug_trace: Vec<DebugTrace>,
    quiet: bool,
    verbose: u8,
  ) -> Self {
    Self {
      debug,
      debug_trace,
      quiet,
      verbose,
      ..Self::default()
    }
  }

  pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::TomlParseError {
      path: None,
      message: e.to_string(),
    })
  }

  /// Load and parse a configuration file.
  ///
  /// # Errors
  /// - `IoError` if the file cannot be read.
  /// - `TomlParseError` if the file is not valid TOML or doesn't match the schema.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
      path: path.to_path_buf(),
      source: e,
    })?;

    toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
      path: Some(path.to_path_buf()),
      message: e.to_string(),
    })
  }

  pub fn dumps(
    &self,
    kind: DumpKind,
  ) -> bool {
    self.dump.contains(&kind)
  }
}

#[derive(Debug)]
pub enum ConfigError {
  /// I/O error while reading a file.
  IoError { path: PathBuf, source: std::io::Error },

  /// Not valid TOML, or does not match the schema.
  TomlParseError { path: Option<PathBuf>, message: String },
}

impl fmt::Display for ConfigError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      ConfigError::IoError { path, source } => {
        write!(f, "failed to read '{}': {}", path.display(), source)
      },

      ConfigError::TomlParseError { path: Some(path), message } => {
        write!(f, "failed to parse '{}': {}", path.display(), message)
      },

      ConfigError::TomlParseError { path: None, message } => {
        write!(f, "failed to parse configuration: {}", message)
      },
    }
  }
}

impl std::error::Error for ConfigError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      ConfigError::IoError { source, .. } => Some(source),
      _ => None,
    }
  }
}
