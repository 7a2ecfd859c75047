use std::fmt::Write;

use dexter_type::{TypeRef, TypeSystem};

use crate::{Block, ExprId, MethodBody, Node, Operand, Prefix};

/// Pretty printer for method bodies.
///
/// One statement per line; expressions print as `code[operand](args...)`.
pub struct AstPrinter<'a> {
  body: &'a MethodBody,
  types: &'a TypeSystem,
  show_types: bool,
  output: String,
}

impl<'a> AstPrinter<'a> {
  pub fn new(
    body: &'a MethodBody,
    types: &'a TypeSystem,
  ) -> Self {
    Self {
      body,
      types,
      show_types: false,
      output: String::new(),
    }
  }

  /// Append `:type` to every node with a known type.
  pub fn with_types(mut self) -> Self {
    self.show_types = true;
    self
  }

  pub fn print(mut self) -> String {
    let body = self.body;
    self.print_block_body(&body.root, 0);
    self.output
  }

  /// Renders a single expression on one line.
  pub fn expression(
    &self,
    id: ExprId,
  ) -> String {
    let mut out = String::new();
    self.render(id, &mut out);
    out
  }

  fn line(
    &mut self,
    depth: usize,
    text: &str,
  ) {
    writeln!(self.output, "{}{}", "  ".repeat(depth), text).unwrap();
  }

  fn print_block_body(
    &mut self,
    block: &Block,
    depth: usize,
  ) {
    if let Some(entry) = block.entry_goto {
      let text = format!("entry {}", self.expression(entry));
      self.line(depth, &text);
    }

    for node in &block.body {
      match node {
        Node::Expr(id) => {
          let text = self.expression(*id);
          self.line(depth, &text);
        },
        Node::Label(label) => {
          let text = format!("{}:", self.body.label(*label).name);
          self.line(depth, &text);
        },
        Node::Block(inner) => {
          self.line(depth, "{");
          self.print_block_body(inner, depth + 1);
          self.line(depth, "}");
        },
        Node::TryCatch(try_catch) => {
          self.line(depth, "try {");
          self.print_block_body(&try_catch.try_block, depth + 1);
          for catch in &try_catch.catches {
            let variable = catch.variable.map(|v| format!(" {}", self.body.variable(v).name)).unwrap_or_default();
            let text = format!("}} catch {}{} {{", self.type_name(&catch.exception_type), variable);
            self.line(depth, &text);
            self.print_block_body(&catch.body, depth + 1);
          }
          if let Some(finally) = &try_catch.finally_block {
            self.line(depth, "} finally {");
            self.print_block_body(finally, depth + 1);
          }
          if let Some(fault) = &try_catch.fault_block {
            self.line(depth, "} fault {");
            self.print_block_body(fault, depth + 1);
          }
          self.line(depth, "}");
        },
        Node::Switch(switch) => {
          let text = format!("switch ({}) {{", self.expression(switch.condition));
          self.line(depth, &text);
          for case in &switch.cases {
            let values: Vec<String> = case.values.iter().map(|v| v.to_string()).collect();
            let text = format!("case {}:", values.join(", "));
            self.line(depth + 1, &text);
            self.print_block_body(&case.body, depth + 2);
          }
          if let Some(default) = &switch.default_block {
            self.line(depth + 1, "default:");
            self.print_block_body(default, depth + 2);
          }
          self.line(depth, "}");
        },
      }
    }
  }

  fn render(
    &self,
    id: ExprId,
    out: &mut String,
  ) {
    let expr = self.body.expr(id);

    for prefix in &expr.prefixes {
      match prefix {
        Prefix::Constrained(ty) => write!(out, "constrained[{}].", self.type_name(ty)).unwrap(),
        Prefix::Volatile => out.push_str("volatile."),
        Prefix::Readonly => out.push_str("readonly."),
      }
    }

    out.push_str(expr.code.name());

    if !expr.operand.is_none() {
      write!(out, "[{}]", self.operand(&expr.operand)).unwrap();
    }

    if !expr.arguments.is_empty() {
      out.push('(');
      for (i, &arg) in expr.arguments.iter().enumerate() {
        if i > 0 {
          out.push_str(", ");
        }
        self.render(arg, out);
      }
      out.push(')');
    }

    if self.show_types {
      if let Some(ty) = &expr.inferred_type {
        write!(out, ":{}", self.type_name(ty)).unwrap();
      }
    }

    if let Some(side) = expr.store_by_ref {
      out.push_str(" ~> ");
      self.render(side, out);
    }
  }

  fn operand(
    &self,
    operand: &Operand,
  ) -> String {
    match operand {
      Operand::None => String::new(),
      Operand::Int(v) => v.to_string(),
      Operand::Long(v) => format!("{}L", v),
      Operand::Float(v) => format!("{}f", v.0),
      Operand::Double(v) => v.0.to_string(),
      Operand::String(s) => format!("{:?}", s),
      Operand::Type(ty) => self.type_name(ty),
      Operand::Method(m) => format!("{}::{}", self.type_name(m.declaring_type()), m.name()),
      Operand::Field(f) => format!("{}::{}", self.type_name(f.declaring_type()), f.name()),
      Operand::Variable(v) => self.body.variable(*v).name.clone(),
      Operand::Label(l) => self.body.label(*l).name.clone(),
      Operand::Labels(labels) => {
        let names: Vec<&str> = labels.iter().map(|l| self.body.label(*l).name.as_str()).collect();
        names.join(", ")
      },
      Operand::Delegate { delegate_type, method } => format!(
        "{} -> {}::{}",
        self.type_name(delegate_type),
        self.type_name(method.declaring_type()),
        method.name()
      ),
      Operand::Count(n) => n.to_string(),
    }
  }

  fn type_name(
    &self,
    ty: &TypeRef,
  ) -> String {
    self.types.type_name(ty)
  }
}
