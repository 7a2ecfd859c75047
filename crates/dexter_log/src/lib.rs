//! Log output of the lowering pipeline.
//!
//! Every line is scoped to what is being lowered. Batch lines stand alone,
//! method lines name the method (`Counter::Run`), and stage traces add the
//! pass category in front of it. Output goes to stderr so stdout stays free
//! for tree dumps.
//!
//! Macros take a [`LogScope`]: a bare [`DexterConfig`] for batch-level lines
//! or the lowering context of a method.

use colored::Colorize;
use dexter_config::{DebugTrace, DexterConfig};

/// Something log lines can be attributed to.
pub trait LogScope {
  fn log_config(&self) -> &DexterConfig;

  /// `Type::method` when the line is about a single method.
  fn log_method(&self) -> Option<String> {
    None
  }
}

impl LogScope for DexterConfig {
  fn log_config(&self) -> &DexterConfig {
    self
  }
}

pub fn effective_verbose(config: &DexterConfig) -> u8 {
  if config.quiet {
    return 0;
  }

  if config.debug && config.verbose < 2 {
    return 2;
  }

  config.verbose
}

pub fn log_phase(config: &DexterConfig) -> bool {
  !config.quiet
}

pub fn log_debug(config: &DexterConfig) -> bool {
  effective_verbose(config) >= 2
}

pub fn debug_trace_enabled(
  config: &DexterConfig,
  trace: DebugTrace,
) -> bool {
  !config.quiet && (config.debug || config.debug_trace.contains(&trace))
}

pub fn trace_name(trace: DebugTrace) -> &'static str {
  match trace {
    DebugTrace::Pipeline => "pipeline",
    DebugTrace::Struct => "struct",
    DebugTrace::Nullable => "nullable",
    DebugTrace::Enum => "enum",
    DebugTrace::Generics => "generics",
    DebugTrace::Atomic => "atomic",
    DebugTrace::Cast => "cast",
    DebugTrace::Branch => "branch",
    DebugTrace::Byref => "byref",
    DebugTrace::Conversion => "conversion",
  }
}

/// `Counter::Run: ` for method scopes, empty for the batch.
pub fn method_prefix<S: LogScope + ?Sized>(scope: &S) -> String {
  scope.log_method().map(|method| format!("{}: ", method)).unwrap_or_default()
}

/// `debug[struct Counter::Run]`, or `debug[struct]` outside a method.
pub fn trace_prefix<S: LogScope + ?Sized>(
  scope: &S,
  trace: DebugTrace,
) -> String {
  match scope.log_method() {
    Some(method) => format!("debug[{} {}]", trace_name(trace), method),
    None => format!("debug[{}]", trace_name(trace)),
  }
}

/// `debug Counter::Run:`, or `debug:` outside a method.
pub fn debug_prefix<S: LogScope + ?Sized>(scope: &S) -> String {
  match scope.log_method() {
    Some(method) => format!("debug {}:", method),
    None => "debug:".to_string(),
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrow {
  Ok,
  Warn,
}

/// Writes one arrow line to stderr.
pub fn emit_arrow(
  indent: usize,
  arrow: Arrow,
  text: &str,
) {
  let arrow = match arrow {
    Arrow::Ok => "-->".bright_green().bold(),
    Arrow::Warn => "-->".bright_yellow().bold(),
  };
  eprintln!("{:indent$}{} {}", "", arrow, text, indent = indent);
}

/// Progress of one method, indented under the batch.
///
/// ```ignore
/// method_log!(ctx, "lowering");
/// //     --> Counter::Run: lowering
/// ```
#[macro_export]
macro_rules! method_log {
  ($scope:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
    let scope = &*$scope;
    if $crate::log_phase($crate::LogScope::log_config(scope)) {
      let text = format!("{}{}", $crate::method_prefix(scope), format!($fmt $(, $arg)*));
      $crate::emit_arrow(4, $crate::Arrow::Ok, &text);
    }
  }};
}

/// Event of one pipeline stage of a method, indented under the method.
///
/// ```ignore
/// stage_log!(ctx, StopAfter::Cast, "stopped");
/// //         --> Counter::Run [cast]: stopped
/// ```
#[macro_export]
macro_rules! stage_log {
  ($scope:expr, $stage:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
    let scope = &*$scope;
    if $crate::log_phase($crate::LogScope::log_config(scope)) {
      let method = $crate::LogScope::log_method(scope).unwrap_or_default();
      let text = format!("{} [{}]: {}", method, $stage, format!($fmt $(, $arg)*));
      $crate::emit_arrow(8, $crate::Arrow::Ok, &text);
    }
  }};
}

/// Summary line of a finished batch or method.
#[macro_export]
macro_rules! phase_ok {
  ($scope:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
    let scope = &*$scope;
    if $crate::log_phase($crate::LogScope::log_config(scope)) {
      let text = format!("{}{}", $crate::method_prefix(scope), format!($fmt $(, $arg)*));
      $crate::emit_arrow(0, $crate::Arrow::Ok, &text);
    }
  }};
}

/// Degraded lowering or a failed batch.
///
/// ```ignore
/// phase_warn!(ctx, "no updater for {}, using a lock", field);
/// // --> Counter::Run: no updater for total, using a lock
/// ```
#[macro_export]
macro_rules! phase_warn {
  ($scope:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
    let scope = &*$scope;
    if $crate::log_phase($crate::LogScope::log_config(scope)) {
      let text = format!("{}{}", $crate::method_prefix(scope), format!($fmt $(, $arg)*));
      $crate::emit_arrow(0, $crate::Arrow::Warn, &text);
    }
  }};
}

/// Trace of one pass category, enabled per category or by `--debug`.
///
/// ```ignore
/// trace_dbg!(ctx, DebugTrace::Struct, "clone of {} at {}", ty, location);
/// // debug[struct Counter::Run]: clone of Point at IL_0004
/// ```
#[macro_export]
macro_rules! trace_dbg {
  ($scope:expr, $trace:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
    let scope = &*$scope;
    if $crate::debug_trace_enabled($crate::LogScope::log_config(scope), $trace) {
      eprintln!("{}: {}", $crate::trace_prefix(scope, $trace), format!($fmt $(, $arg)*));
    }
  }};
}

/// Verbose message (verbosity >= 2).
#[macro_export]
macro_rules! log_dbg {
  ($scope:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
    let scope = &*$scope;
    if $crate::log_debug($crate::LogScope::log_config(scope)) {
      eprintln!("{} {}", $crate::debug_prefix(scope), format!($fmt $(, $arg)*));
    }
  }};
}
