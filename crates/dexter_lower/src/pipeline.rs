//! Fixed-order driver for the lowering passes of one method body.

use dexter_ast::{verify, MethodBody};
use dexter_config::{DebugTrace, StopAfter};
use dexter_diagnostics::DiagnosticMessage;
use dexter_log::{log_dbg, method_log, stage_log, trace_dbg};
use dexter_type::SourceLocation;

use crate::context::LoweringContext;
use crate::error::LoweringResult;
use crate::passes::{
  address_of, branch, byref_param, cast, compare_unordered, compound, conversions, delegate, enum_optimizer, enums,
  field_init, generic_instance, generics, int_ptr, interlocked, nullable, set_next, struct_init, structs, type_of,
  Pass,
};
use crate::typing::check_types;

/// How a call to [`lower_method`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
  /// The body was lowered before; nothing ran.
  AlreadyLowered,
  /// `stop_after` was reached; the body holds the tree as of that stage.
  Stopped(StopAfter),
  Lowered,
}

/// Every stage in execution order.
pub const STAGES: [(StopAfter, Pass); 25] = [
  (StopAfter::FieldInitialization, field_init::run),
  (StopAfter::IntPtr, int_ptr::run),
  (StopAfter::TypeOf, type_of::run),
  (StopAfter::BranchOptimizer, branch::run_early),
  (StopAfter::CompoundAssignment, compound::run),
  (StopAfter::Interlocked, interlocked::run),
  (StopAfter::ByReferenceParam, byref_param::run),
  (StopAfter::CompareUnordered, compare_unordered::run),
  (StopAfter::Enum, enums::run),
  (StopAfter::EnumOptimizer, enum_optimizer::run),
  (StopAfter::Nullable, nullable::run),
  (StopAfter::PrimitiveAddressOf, address_of::run),
  (StopAfter::StructCall, structs::run),
  (StopAfter::InitializeStructVariables, struct_init::run),
  (StopAfter::Delegate, delegate::run),
  (StopAfter::LdcWide, conversions::ldc_wide),
  (StopAfter::LdLocWithConversion, conversions::ldloc_with_conversion),
  (StopAfter::ConvertAfterLoad, conversions::convert_after_load),
  (StopAfter::ConvertBeforeStore, conversions::convert_before_store),
  (StopAfter::Cleanup, conversions::cleanup),
  (StopAfter::Generics, generics::run),
  (StopAfter::Cast, cast::run),
  (StopAfter::GenericInstance, generic_instance::run),
  (StopAfter::BranchOptimizer2, branch::run_final),
  (StopAfter::SetNextInstruction, set_next::run),
];

/// Lowers `body` in place.
///
/// Warnings end up in `ctx.warnings`. On error the tree is left half-rewritten
/// and must be discarded by the caller.
pub fn lower_method(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
) -> LoweringResult<PipelineOutcome> {
  if body.lowered {
    log_dbg!(ctx, "already lowered");
    return Ok(PipelineOutcome::AlreadyLowered);
  }

  method_log!(ctx, "lowering");

  for (stage, pass) in STAGES {
    if stage == StopAfter::SetNextInstruction && !ctx.config.set_next_instruction {
      continue;
    }

    run_stage(body, ctx, stage, pass)?;

    if ctx.config.stop_after == Some(stage) {
      stage_log!(ctx, stage, "stopped");
      return Ok(PipelineOutcome::Stopped(stage));
    }
  }

  body.lowered = true;
  Ok(PipelineOutcome::Lowered)
}

/// Runs a single pass, verifying the tree afterwards when configured.
pub fn run_stage(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
  stage: StopAfter,
  pass: Pass,
) -> LoweringResult {
  trace_dbg!(ctx, DebugTrace::Pipeline, "stage {} ({})", stage.index(), stage);
  pass(body, ctx)?;

  if ctx.config.verify_passes {
    verify_stage(body, ctx, stage)?;
  }
  Ok(())
}

fn verify_stage(
  body: &MethodBody,
  ctx: &LoweringContext<'_>,
  stage: StopAfter,
) -> LoweringResult {
  let mut details: Vec<String> = Vec::new();

  if let Err(errors) = verify(body) {
    details.extend(errors.iter().map(ToString::to_string));
  }
  if let Err(errors) = check_types(body, ctx) {
    details.extend(errors.iter().map(ToString::to_string));
  }

  if details.is_empty() {
    return Ok(());
  }

  for detail in &details {
    log_dbg!(ctx, "{}: {}", stage, detail);
  }
  Err(ctx.error(
    DiagnosticMessage::MalformedTree {
      pass: stage.name().to_string(),
      details,
    },
    SourceLocation::NONE,
  ))
}
