use std::fmt;

use dexter_diagnostics::diagnostic_report::Diagnostic;
use dexter_diagnostics::DiagnosticMessage;
use dexter_type::SourceLocation;

/// Fatal lowering failure; the method's tree is discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoweringError {
  pub message: DiagnosticMessage,
  pub method: String,
  pub location: SourceLocation,
}

pub type LoweringResult<T = ()> = Result<T, LoweringError>;

impl LoweringError {
  pub fn new(
    message: DiagnosticMessage,
    method: String,
    location: SourceLocation,
  ) -> Self {
    Self {
      message,
      method,
      location,
    }
  }

  pub fn code(&self) -> String {
    self.message.code()
  }

  pub fn report(&self) -> Diagnostic {
    self.message.report(&self.method, self.location)
  }
}

impl fmt::Display for LoweringError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "{} in {} at {}", self.message, self.method, self.location)
  }
}

impl std::error::Error for LoweringError {}
