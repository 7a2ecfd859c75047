use dexter_config::StopAfter;
use serde::Serialize;

use crate::batch::{BatchResult, MethodResult, MethodStatus};

/// JSON summary written for `DumpKind::Report`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BatchReport {
  pub lowered: usize,
  pub failed: usize,
  pub warnings: usize,
  pub methods: Vec<MethodReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct MethodReport {
  pub method: String,
  /// `lowered`, `already-lowered`, `stopped` or `failed`.
  pub status: &'static str,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub stopped_after: Option<StopAfter>,
  /// Warning codes in emission order.
  pub warnings: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl MethodReport {
  fn from_result(result: &MethodResult) -> Self {
    let (status, stopped_after) = match result.status {
      MethodStatus::Lowered => ("lowered", None),
      MethodStatus::AlreadyLowered => ("already-lowered", None),
      MethodStatus::Stopped(stage) => ("stopped", Some(stage)),
      MethodStatus::Failed => ("failed", None),
    };

    Self {
      method: result.name.clone(),
      status,
      stopped_after,
      warnings: result.warnings.iter().map(|w| w.error_code.clone()).collect(),
      error: result.error.as_ref().map(|e| e.error_code.clone()),
    }
  }
}

impl BatchReport {
  pub fn new(batch: &BatchResult) -> Self {
    let methods: Vec<MethodReport> = batch.methods.iter().map(MethodReport::from_result).collect();

    Self {
      lowered: batch.methods.iter().filter(|m| m.status != MethodStatus::Failed).count(),
      failed: batch.failed_count(),
      warnings: methods.iter().map(|m| m.warnings.len()).sum(),
      methods,
    }
  }

  pub fn to_json(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(self)
  }
}
