use dexter_type::SourceLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
  Info,
  Warning,
  Error,
  Hint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
  pub location: SourceLocation,
  pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
  pub severity: Severity,
  pub message: String,
  pub error_code: String,
  /// Fully qualified name of the method being lowered.
  pub method: String,
  pub location: SourceLocation,
  pub labels: Vec<Label>,
  pub notes: Vec<String>,
}

impl Diagnostic {
  pub fn new(
    severity: Severity,
    message: String,
    error_code: String,
    method: String,
    location: SourceLocation,
  ) -> Self {
    Self {
      severity,
      message,
      error_code,
      method,
      location,
      labels: Vec::new(),
      notes: Vec::new(),
    }
  }

  pub fn with_label(
    mut self,
    location: SourceLocation,
    message: String,
  ) -> Self {
    self.labels.push(Label { location, message });
    self
  }

  pub fn with_note(
    mut self,
    note: String,
  ) -> Self {
    self.notes.push(note);
    self
  }

  pub fn is_error(&self) -> bool {
    self.severity == Severity::Error
  }
}
