use dexter_type::{FieldRef, MethodRef, TypeRef};
use ordered_float::OrderedFloat;

use crate::{LabelId, VariableId};

/// Immediate payload of an expression node.
///
/// Equality is structural so that two loads of the same field or the same
/// constant compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Operand {
  #[default]
  None,
  Int(i32),
  Long(i64),
  Float(OrderedFloat<f32>),
  Double(OrderedFloat<f64>),
  String(String),
  Type(TypeRef),
  Method(MethodRef),
  Field(FieldRef),
  Variable(VariableId),
  Label(LabelId),
  /// Jump table of a `switch`.
  Labels(Vec<LabelId>),
  /// Delegate type plus the bound method.
  Delegate {
    delegate_type: TypeRef,
    method: MethodRef,
  },
  /// Dimension count and similar small integers that are not constants.
  Count(u32),
}

/// Shape of an operand, used when checking opcode contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
  None,
  Int,
  Long,
  Float,
  Double,
  String,
  Type,
  Method,
  Field,
  Variable,
  Label,
  Labels,
  Delegate,
  Count,
}

impl Operand {
  pub fn kind(&self) -> OperandKind {
    match self {
      Operand::None => OperandKind::None,
      Operand::Int(_) => OperandKind::Int,
      Operand::Long(_) => OperandKind::Long,
      Operand::Float(_) => OperandKind::Float,
      Operand::Double(_) => OperandKind::Double,
      Operand::String(_) => OperandKind::String,
      Operand::Type(_) => OperandKind::Type,
      Operand::Method(_) => OperandKind::Method,
      Operand::Field(_) => OperandKind::Field,
      Operand::Variable(_) => OperandKind::Variable,
      Operand::Label(_) => OperandKind::Label,
      Operand::Labels(_) => OperandKind::Labels,
      Operand::Delegate { .. } => OperandKind::Delegate,
      Operand::Count(_) => OperandKind::Count,
    }
  }

  pub fn is_none(&self) -> bool {
    matches!(self, Operand::None)
  }

  pub fn float(value: f32) -> Self {
    Operand::Float(OrderedFloat(value))
  }

  pub fn double(value: f64) -> Self {
    Operand::Double(OrderedFloat(value))
  }

  /// Integral constant value, widened to 64 bits.
  pub fn as_integer(&self) -> Option<i64> {
    match self {
      Operand::Int(v) => Some(*v as i64),
      Operand::Long(v) => Some(*v),
      _ => None,
    }
  }

  pub fn as_type(&self) -> Option<&TypeRef> {
    match self {
      Operand::Type(ty) => Some(ty),
      Operand::Delegate { delegate_type, .. } => Some(delegate_type),
      _ => None,
    }
  }

  pub fn as_method(&self) -> Option<&MethodRef> {
    match self {
      Operand::Method(method) => Some(method),
      Operand::Delegate { method, .. } => Some(method),
      _ => None,
    }
  }

  pub fn as_field(&self) -> Option<&FieldRef> {
    match self {
      Operand::Field(field) => Some(field),
      _ => None,
    }
  }

  pub fn as_variable(&self) -> Option<VariableId> {
    match self {
      Operand::Variable(v) => Some(*v),
      _ => None,
    }
  }

  pub fn as_label(&self) -> Option<LabelId> {
    match self {
      Operand::Label(l) => Some(*l),
      _ => None,
    }
  }
}
