use std::collections::HashMap;

use crate::visit::roots;
use crate::{AstCode, ExprId, MethodBody, OperandKind};

/// Structural problems found in a method body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
  /// A node reachable from two places.
  SharedNode {
    expr: ExprId,
    code: AstCode,
    first_parent: Option<ExprId>,
    second_parent: Option<ExprId>,
  },

  /// Argument count outside the opcode contract.
  Arity { expr: ExprId, code: AstCode, found: usize },

  /// Opcode needs an operand of a kind the node does not carry.
  MissingOperand {
    expr: ExprId,
    code: AstCode,
    expected: OperandKind,
  },
}

impl std::fmt::Display for VerifyError {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    match self {
      VerifyError::SharedNode { expr, code, .. } => {
        write!(f, "node {:?} ({}) is referenced twice", expr, code.name())
      },
      VerifyError::Arity { expr, code, found } => {
        write!(f, "node {:?} ({}) has {} arguments, expected {:?}", expr, code.name(), found, code.arity())
      },
      VerifyError::MissingOperand { expr, code, expected } => {
        write!(f, "node {:?} ({}) lacks a {:?} operand", expr, code.name(), expected)
      },
    }
  }
}

pub type VerifyResult = Result<(), Vec<VerifyError>>;

/// Verifier for a single method body.
pub struct AstVerifier<'a> {
  body: &'a MethodBody,
  parents: HashMap<ExprId, Option<ExprId>>,
  errors: Vec<VerifyError>,
}

impl<'a> AstVerifier<'a> {
  pub fn new(body: &'a MethodBody) -> Self {
    Self {
      body,
      parents: HashMap::new(),
      errors: Vec::new(),
    }
  }

  pub fn verify(mut self) -> VerifyResult {
    let body = self.body;
    for root in roots(&body.root) {
      self.verify_expr(root, None);
    }

    if self.errors.is_empty() {
      Ok(())
    } else {
      Err(self.errors)
    }
  }

  fn verify_expr(
    &mut self,
    id: ExprId,
    parent: Option<ExprId>,
  ) {
    let body = self.body;
    let expr = body.expr(id);

    if let Some(first_parent) = self.parents.get(&id) {
      self.errors.push(VerifyError::SharedNode {
        expr: id,
        code: expr.code,
        first_parent: *first_parent,
        second_parent: parent,
      });
      return;
    }
    self.parents.insert(id, parent);

    if !expr.code.arity().accepts(expr.arguments.len()) {
      self.errors.push(VerifyError::Arity {
        expr: id,
        code: expr.code,
        found: expr.arguments.len(),
      });
    }

    if let Some(expected) = required_operand(expr.code) {
      if expr.operand.kind() != expected && !accepts_alternative(expr.code, expr.operand.kind()) {
        self.errors.push(VerifyError::MissingOperand {
          expr: id,
          code: expr.code,
          expected,
        });
      }
    }

    for &arg in &expr.arguments {
      self.verify_expr(arg, Some(id));
    }

    if let Some(side) = expr.store_by_ref {
      self.verify_expr(side, Some(id));
    }
  }
}

pub fn verify(body: &MethodBody) -> VerifyResult {
  AstVerifier::new(body).verify()
}

fn required_operand(code: AstCode) -> Option<OperandKind> {
  let kind = match code {
    AstCode::LdcI4 => OperandKind::Int,
    AstCode::LdcI8 => OperandKind::Long,
    AstCode::LdcR4 => OperandKind::Float,
    AstCode::LdcR8 => OperandKind::Double,
    AstCode::Ldstr => OperandKind::String,
    AstCode::Ldloc | AstCode::Ldloca | AstCode::Stloc => OperandKind::Variable,
    AstCode::Ldfld | AstCode::Ldflda | AstCode::Stfld | AstCode::Ldsfld | AstCode::Ldsflda | AstCode::Stsfld => {
      OperandKind::Field
    },
    AstCode::Newobj | AstCode::Ldftn | AstCode::Ldvirtftn => OperandKind::Method,
    code if code.is_call() => OperandKind::Method,
    AstCode::Switch | AstCode::LookupSwitch => OperandKind::Labels,
    AstCode::Endfinally => return None,
    code if code.is_branch() => OperandKind::Label,
    AstCode::Newarr
    | AstCode::Castclass
    | AstCode::SimpleCastclass
    | AstCode::Isinst
    | AstCode::InstanceOf
    | AstCode::SimpleInstanceOf
    | AstCode::Box
    | AstCode::Unbox
    | AstCode::UnboxAny
    | AstCode::UnboxFromGeneric
    | AstCode::DefaultValue
    | AstCode::Ldtoken
    | AstCode::InitStructArray
    | AstCode::InitEnumArray
    | AstCode::BoxedTypeOf
    | AstCode::NullableTypeOf
    | AstCode::IntToEnum
    | AstCode::LongToEnum => OperandKind::Type,
    AstCode::Delegate => OperandKind::Delegate,
    _ => return None,
  };
  Some(kind)
}

/// `ldtoken` may name a member instead of a type.
fn accepts_alternative(
  code: AstCode,
  found: OperandKind,
) -> bool {
  code == AstCode::Ldtoken && matches!(found, OperandKind::Method | OperandKind::Field)
}
