use std::thread;

use colored::*;
use dexter_ast::{AstPrinter, MethodBody};
use dexter_config::{DebugTrace, DexterConfig, DumpKind, StopAfter};
use dexter_diagnostics::diagnostic_report::Diagnostic;
use dexter_log::{log_dbg, phase_ok, phase_warn, trace_dbg};
use dexter_lower::{lower_method, LoweringContext, MethodSource, PipelineOutcome};
use dexter_type::TypeSystem;

use crate::dump::{sanitize_dump_name, write_dump_output};
use crate::report::BatchReport;

/// One method handed to the driver.
#[derive(Debug, Clone)]
pub struct MethodInput {
  pub source: MethodSource,
  pub body: MethodBody,
}

impl MethodInput {
  pub fn new(
    source: MethodSource,
    body: MethodBody,
  ) -> Self {
    Self { source, body }
  }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MethodStatus {
  Lowered,
  AlreadyLowered,
  Stopped(StopAfter),
  Failed,
}

impl From<PipelineOutcome> for MethodStatus {
  fn from(outcome: PipelineOutcome) -> Self {
    match outcome {
      PipelineOutcome::Lowered => MethodStatus::Lowered,
      PipelineOutcome::AlreadyLowered => MethodStatus::AlreadyLowered,
      PipelineOutcome::Stopped(stage) => MethodStatus::Stopped(stage),
    }
  }
}

#[derive(Debug, Clone)]
pub struct MethodResult {
  /// `Type::method`.
  pub name: String,
  pub status: MethodStatus,
  /// Lowered tree; `None` when lowering failed.
  pub body: Option<MethodBody>,
  pub warnings: Vec<Diagnostic>,
  pub error: Option<Diagnostic>,
  input_dump: Option<String>,
}

impl MethodResult {
  pub fn is_failed(&self) -> bool {
    self.status == MethodStatus::Failed
  }
}

#[derive(Debug, Clone)]
pub struct BatchResult {
  /// One entry per input, in input order.
  pub methods: Vec<MethodResult>,
  /// Dump files that could not be written.
  pub dump_failures: usize,
}

impl BatchResult {
  pub fn failed_count(&self) -> usize {
    self.methods.iter().filter(|m| m.is_failed()).count()
  }

  pub fn is_success(&self) -> bool {
    self.failed_count() == 0 && self.dump_failures == 0
  }

  pub fn report(&self) -> BatchReport {
    BatchReport::new(self)
  }
}

/// Lowers every input, `config.jobs` at a time.
///
/// A failing method does not stop the batch. Diagnostics and dumps are
/// emitted after all workers finish, in input order.
pub fn lower_methods(
  config: &DexterConfig,
  types: &TypeSystem,
  inputs: Vec<MethodInput>,
) -> BatchResult {
  let jobs = config.jobs.clamp(1, inputs.len().max(1));
  log_dbg!(config, "lowering {} methods on {} workers", inputs.len(), jobs);

  let methods = if jobs == 1 {
    inputs.into_iter().map(|input| lower_one(config, types, input)).collect()
  } else {
    lower_parallel(config, types, inputs, jobs)
  };

  let mut batch = BatchResult {
    methods,
    dump_failures: 0,
  };
  emit(config, types, &mut batch);

  let failed = batch.failed_count();
  if failed == 0 {
    phase_ok!(config, "Lowered {} methods", batch.methods.len());
  } else {
    phase_warn!(config, "Lowered {} methods, {} failed", batch.methods.len(), failed);
  }
  batch
}

fn lower_parallel(
  config: &DexterConfig,
  types: &TypeSystem,
  inputs: Vec<MethodInput>,
  jobs: usize,
) -> Vec<MethodResult> {
  let chunk_size = inputs.len().div_ceil(jobs);
  let mut chunks = Vec::with_capacity(jobs);
  let mut pending = inputs;
  while !pending.is_empty() {
    let rest = pending.split_off(chunk_size.min(pending.len()));
    chunks.push(pending);
    pending = rest;
  }

  thread::scope(|scope| {
    let handles: Vec<_> = chunks
      .into_iter()
      .map(|chunk| {
        scope.spawn(move || {
          chunk
            .into_iter()
            .map(|input| lower_one(config, types, input))
            .collect::<Vec<_>>()
        })
      })
      .collect();

    handles
      .into_iter()
      .flat_map(|handle| match handle.join() {
        Ok(results) => results,
        Err(panic) => std::panic::resume_unwind(panic),
      })
      .collect()
  })
}

fn lower_one(
  config: &DexterConfig,
  types: &TypeSystem,
  input: MethodInput,
) -> MethodResult {
  let MethodInput { source, mut body } = input;
  let name = source.full_name(types);
  let input_dump = config
    .dumps(DumpKind::Input)
    .then(|| AstPrinter::new(&body, types).print());

  let mut ctx = LoweringContext::new(types, &source, config);
  let outcome = lower_method(&mut body, &mut ctx);
  let warnings = ctx.warnings;

  match outcome {
    Ok(outcome) => MethodResult {
      name,
      status: outcome.into(),
      body: Some(body),
      warnings,
      error: None,
      input_dump,
    },
    Err(error) => {
      trace_dbg!(config, DebugTrace::Pipeline, "{} discarded: {}", name, error);
      MethodResult {
        name,
        status: MethodStatus::Failed,
        body: None,
        warnings,
        error: Some(error.report()),
        input_dump,
      }
    },
  }
}

// #region Output

fn emit(
  config: &DexterConfig,
  types: &TypeSystem,
  batch: &mut BatchResult,
) {
  let mut dump_failures = 0;

  for method in &mut batch.methods {
    if let Some(error) = &method.error {
      dexter_diagnostics::render(error);
    }
    if !config.quiet {
      dexter_diagnostics::render_batch(&method.warnings);
    }

    let file_stem = sanitize_dump_name(&method.name);
    if let Some(input) = method.input_dump.take() {
      let header = format!("{} (input)", method.name);
      if write_dump_output(config, &header, &format!("{}.input.ast", file_stem), &input).is_err() {
        dump_failures += 1;
      }
    }

    if config.dumps(DumpKind::Lowered) {
      if let Some(body) = &method.body {
        let lowered = AstPrinter::new(body, types).print();
        let header = format!("{} ({})", method.name, status_label(method.status));
        if write_dump_output(config, &header, &format!("{}.ast", file_stem), &lowered).is_err() {
          dump_failures += 1;
        }
      }
    }
  }

  if config.dumps(DumpKind::Report) {
    match batch.report().to_json() {
      Ok(json) => {
        if write_dump_output(config, "report", "report.json", &json).is_err() {
          dump_failures += 1;
        }
      },
      Err(e) => {
        eprintln!("{} Failed to serialize the batch report: {}", "Error:".red().bold(), e);
        dump_failures += 1;
      },
    }
  }

  batch.dump_failures = dump_failures;
}

fn status_label(status: MethodStatus) -> String {
  match status {
    MethodStatus::Lowered => "lowered".to_string(),
    MethodStatus::AlreadyLowered => "already lowered".to_string(),
    MethodStatus::Stopped(stage) => format!("stopped after {}", stage),
    MethodStatus::Failed => "failed".to_string(),
  }
}

// #endregion Output
