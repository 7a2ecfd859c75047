use std::fmt;

use dexter_type::SourceLocation;

use super::diagnostic_report::{Diagnostic, Severity};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticMessage {
  // #region Fatal
  UnresolvableGenericInstance {
    member: String,
  },
  MissingDefaultConstructor {
    type_name: String,
  },
  MissingStructMethod {
    type_name: String,
    method: String,
  },
  MissingDefaultField {
    type_name: String,
  },
  MultipleInterlockedCalls {
    count: usize,
  },
  LockInStateMachine {
    target: String,
  },
  UnexpectedOpcode {
    opcode: String,
    context: String,
  },
  UnresolvableMethod {
    method: String,
  },
  MissingHelperType {
    name: String,
  },
  MissingHelperMethod {
    type_name: String,
    method: String,
  },
  MalformedTree {
    pass: String,
    details: Vec<String>,
  },
  // #endregion Fatal
  // #region Warnings
  InterlockedFallback {
    operation: String,
    target: String,
  },
  GenericParameterInClassConstructor {
    parameter: String,
  },
  // #endregion Warnings
}

impl fmt::Display for DiagnosticMessage {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      DiagnosticMessage::UnresolvableGenericInstance { member } => {
        write!(f, "'{}' must be a generic instance but is not", member)
      },
      DiagnosticMessage::MissingDefaultConstructor { type_name } => {
        write!(f, "struct '{}' has no default constructor", type_name)
      },
      DiagnosticMessage::MissingStructMethod { type_name, method } => {
        write!(f, "struct '{}' has no '{}' method", type_name, method)
      },
      DiagnosticMessage::MissingDefaultField { type_name } => {
        write!(f, "immutable struct '{}' has no default instance field", type_name)
      },
      DiagnosticMessage::MultipleInterlockedCalls { count } => {
        write!(f, "{} interlocked calls in one statement; at most one is supported", count)
      },
      DiagnosticMessage::LockInStateMachine { target } => {
        write!(f, "cannot emulate atomic access to '{}' with a lock inside a state machine", target)
      },
      DiagnosticMessage::UnexpectedOpcode { opcode, context } => {
        write!(f, "unexpected '{}' in {}", opcode, context)
      },
      DiagnosticMessage::UnresolvableMethod { method } => {
        write!(f, "method '{}' cannot be resolved", method)
      },
      DiagnosticMessage::MissingHelperType { name } => {
        write!(f, "runtime support type '{}' is missing", name)
      },
      DiagnosticMessage::MissingHelperMethod { type_name, method } => {
        write!(f, "runtime support method '{}.{}' is missing", type_name, method)
      },
      DiagnosticMessage::MalformedTree { pass, details } => {
        write!(f, "tree is malformed after '{}' ({} problems)", pass, details.len())
      },
      DiagnosticMessage::InterlockedFallback { operation, target } => {
        write!(f, "'Interlocked.{}' on '{}' is emulated with a monitor lock", operation, target)
      },
      DiagnosticMessage::GenericParameterInClassConstructor { parameter } => {
        write!(f, "generic parameter '{}' used in a class constructor resolves to 'object'", parameter)
      },
    }
  }
}

impl DiagnosticMessage {
  pub fn code(&self) -> String {
    match self {
      DiagnosticMessage::UnresolvableGenericInstance { .. } => "L0001",
      DiagnosticMessage::MissingDefaultConstructor { .. } => "L0002",
      DiagnosticMessage::MissingStructMethod { .. } => "L0003",
      DiagnosticMessage::MissingDefaultField { .. } => "L0004",
      DiagnosticMessage::MultipleInterlockedCalls { .. } => "L0005",
      DiagnosticMessage::LockInStateMachine { .. } => "L0006",
      DiagnosticMessage::UnexpectedOpcode { .. } => "L0007",
      DiagnosticMessage::UnresolvableMethod { .. } => "L0008",
      DiagnosticMessage::MissingHelperType { .. } => "L0009",
      DiagnosticMessage::MissingHelperMethod { .. } => "L0010",
      DiagnosticMessage::MalformedTree { .. } => "L0011",
      DiagnosticMessage::InterlockedFallback { .. } => "W0001",
      DiagnosticMessage::GenericParameterInClassConstructor { .. } => "W0002",
    }
    .to_string()
  }

  pub fn level(&self) -> Severity {
    match self {
      DiagnosticMessage::InterlockedFallback { .. } | DiagnosticMessage::GenericParameterInClassConstructor { .. } => {
        Severity::Warning
      },
      _ => Severity::Error,
    }
  }

  fn notes(&self) -> Vec<String> {
    match self {
      DiagnosticMessage::MalformedTree { details, .. } => details.clone(),
      DiagnosticMessage::InterlockedFallback { target, .. } => {
        vec![format!("declare an atomic updater field '{}$Updater' to avoid the lock", target)]
      },
      DiagnosticMessage::MultipleInterlockedCalls { .. } => {
        vec!["split the statement so each one performs a single interlocked call".to_string()]
      },
      _ => vec![],
    }
  }

  pub fn report(
    &self,
    method: &str,
    location: SourceLocation,
  ) -> Diagnostic {
    let mut diagnostic = Diagnostic::new(self.level(), self.to_string(), self.code(), method.to_string(), location);
    for note in self.notes() {
      diagnostic = diagnostic.with_note(note);
    }
    diagnostic
  }
}
