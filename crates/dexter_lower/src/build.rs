//! Small constructors for the nodes passes synthesize. Every node built here
//! carries its inferred type.

use dexter_ast::{AstCode, ExprId, MethodBody, Operand, VariableId};
use dexter_type::{FieldRef, MethodRef, PrimitiveType, SourceLocation, TypeRef, TypeSystem};

use crate::context::LoweringContext;
use crate::typing::result_type_or_object;

pub fn ldc_i4(
  body: &mut MethodBody,
  location: SourceLocation,
  value: i32,
) -> ExprId {
  body.new_typed(location, AstCode::LdcI4, Operand::Int(value), Vec::new(), TypeRef::int32())
}

pub fn ldc_i8(
  body: &mut MethodBody,
  location: SourceLocation,
  value: i64,
) -> ExprId {
  body.new_typed(location, AstCode::LdcI8, Operand::Long(value), Vec::new(), TypeRef::int64())
}

pub fn ldnull(
  body: &mut MethodBody,
  location: SourceLocation,
  ty: TypeRef,
) -> ExprId {
  body.new_typed(location, AstCode::Ldnull, Operand::None, Vec::new(), ty)
}

pub fn ldstr(
  body: &mut MethodBody,
  types: &TypeSystem,
  location: SourceLocation,
  value: &str,
) -> ExprId {
  body.new_typed(location, AstCode::Ldstr, Operand::String(value.to_string()), Vec::new(), types.string())
}

pub fn ldloc(
  body: &mut MethodBody,
  location: SourceLocation,
  variable: VariableId,
) -> ExprId {
  let ty = body.variable(variable).ty.clone();
  body.new_typed(location, AstCode::Ldloc, Operand::Variable(variable), Vec::new(), ty)
}

/// `stloc`; in value position it yields the stored value.
pub fn stloc(
  body: &mut MethodBody,
  location: SourceLocation,
  variable: VariableId,
  value: ExprId,
) -> ExprId {
  let ty = body.variable(variable).ty.clone();
  body.new_typed(location, AstCode::Stloc, Operand::Variable(variable), vec![value], ty)
}

pub fn ldsfld(
  body: &mut MethodBody,
  location: SourceLocation,
  field: FieldRef,
) -> ExprId {
  let ty = field.field_type().clone();
  body.new_typed(location, AstCode::Ldsfld, Operand::Field(field), Vec::new(), ty)
}

pub fn call(
  body: &mut MethodBody,
  location: SourceLocation,
  code: AstCode,
  method: MethodRef,
  arguments: Vec<ExprId>,
) -> ExprId {
  let ty = if code == AstCode::Newobj {
    method.declaring_type().clone()
  } else if method.is_constructor() {
    TypeRef::void()
  } else {
    method.return_type().clone()
  };
  body.new_typed(location, code, Operand::Method(method), arguments, ty)
}

pub fn type_of(
  body: &mut MethodBody,
  types: &TypeSystem,
  location: SourceLocation,
  ty: TypeRef,
) -> ExprId {
  body.new_typed(location, AstCode::TypeOf, Operand::Type(ty), Vec::new(), types.system_type())
}

/// Zero of a primitive, otherwise `defaultvalue[ty]`.
pub fn zero_value(
  body: &mut MethodBody,
  location: SourceLocation,
  ty: &TypeRef,
) -> ExprId {
  let (code, operand) = match ty.as_primitive() {
    Some(PrimitiveType::Int64) | Some(PrimitiveType::UInt64) => (AstCode::LdcI8, Operand::Long(0)),
    Some(PrimitiveType::Float32) => (AstCode::LdcR4, Operand::float(0.0)),
    Some(PrimitiveType::Float64) => (AstCode::LdcR8, Operand::double(0.0)),
    Some(PrimitiveType::IntPtr) | Some(PrimitiveType::UIntPtr) => (AstCode::Ldnull, Operand::None),
    Some(p) if p != PrimitiveType::Void => (AstCode::LdcI4, Operand::Int(0)),
    _ => (AstCode::DefaultValue, Operand::Type(ty.clone())),
  };
  body.new_typed(location, code, operand, Vec::new(), ty.clone())
}

/// A value consumed more than once.
///
/// Bare loads are duplicated from the original node on every reuse; anything
/// else is stored once into a generated temporary and reloaded from it. The
/// original of a bare load must stay untouched until the last `load`.
#[derive(Debug, Clone, Copy)]
pub enum Reused {
  Bare(ExprId),
  Spilled(VariableId),
}

impl Reused {
  /// Prepares `id` for reuse. `id` itself stays the first use; when it is not
  /// bare it becomes `stloc[tmp](old id)` in place.
  pub fn new(
    body: &mut MethodBody,
    ctx: &LoweringContext<'_>,
    id: ExprId,
  ) -> Self {
    if body.is_bare_load(id) {
      return Reused::Bare(id);
    }

    let ty = result_type_or_object(body, ctx, id);
    let tmp = body.new_temporary("tmp", ty.clone());
    body.wrap(id, AstCode::Stloc, Operand::Variable(tmp), ty);
    Reused::Spilled(tmp)
  }

  /// A fresh, independent node producing the value again.
  pub fn load(
    &self,
    body: &mut MethodBody,
    location: SourceLocation,
  ) -> ExprId {
    match *self {
      Reused::Bare(source) => body.duplicate_subtree(source),
      Reused::Spilled(tmp) => ldloc(body, location, tmp),
    }
  }

  pub fn temporary(&self) -> Option<VariableId> {
    match self {
      Reused::Spilled(tmp) => Some(*tmp),
      Reused::Bare(_) => None,
    }
  }
}
