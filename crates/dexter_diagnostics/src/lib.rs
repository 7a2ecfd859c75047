pub mod diagnostic_report;
pub mod message;

use std::fmt::Write;

use colored::*;
use diagnostic_report::{Diagnostic, Severity};

pub use diagnostic_report::Label;
pub use message::DiagnosticMessage;

pub fn render(diag: &Diagnostic) {
  print!("{}", render_to_string(diag));
}

pub fn render_batch(diagnostics: &[Diagnostic]) {
  for diag in diagnostics {
    render(diag);
  }
}

pub fn render_to_string(diag: &Diagnostic) -> String {
  let mut out = String::new();
  print_header(&mut out, diag);
  print_body(&mut out, diag);

  for note in &diag.notes {
    writeln!(out, "  {} {}", "note:".cyan().bold(), note).unwrap();
  }

  writeln!(out).unwrap();
  out
}

fn print_header(
  out: &mut String,
  diag: &Diagnostic,
) {
  let message = diag.message.bold();
  let code = diag.error_code.bold();

  let _ = match diag.severity {
    Severity::Info => writeln!(out, "{}[{}]: {}", "Info".blue().bold(), code.blue(), message),
    Severity::Warning => writeln!(out, "{}[{}]: {}", "Warning".yellow().bold(), code.yellow(), message),
    Severity::Error => writeln!(out, "{}[{}]: {}", "Error".red().bold(), code.red().bold(), message),
    Severity::Hint => writeln!(out, "{}[{}]: {}", "Hint".cyan().bold(), code.cyan(), message),
  };
}

fn print_body(
  out: &mut String,
  diag: &Diagnostic,
) {
  writeln!(
    out,
    "{:2}{} {} at {}",
    "",
    "-->".blue().bold(),
    diag.method.bold(),
    diag.location.to_string().bold(),
  )
  .unwrap();

  for label in &diag.labels {
    writeln!(out, "  {} {} ({})", "label:".yellow().bold(), label.message, label.location).unwrap();
  }
}
