//! Result types of expression nodes.
//!
//! Passes ask [`result_type`] instead of reading `inferred_type` directly so a
//! node built without a type still answers from its opcode.

use std::fmt;

use dexter_ast::{visit, AstCode, ExprId, MethodBody};
use dexter_type::names;
use dexter_type::types::Type;
use dexter_type::{PrimitiveType, TypeRef};

use crate::context::LoweringContext;

/// Type produced by `id`: inferred, else derived from the opcode, else expected.
pub fn result_type(
  body: &MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
) -> Option<TypeRef> {
  let expr = body.expr(id);
  if let Some(ty) = &expr.inferred_type {
    return Some(ty.clone());
  }
  opcode_type(body, ctx, id).or_else(|| expr.expected_type.clone())
}

/// Like [`result_type`], falling back to `System.Object`.
pub fn result_type_or_object(
  body: &MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
) -> TypeRef {
  result_type(body, ctx, id).unwrap_or_else(|| ctx.types.object())
}

fn opcode_type(
  body: &MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
) -> Option<TypeRef> {
  let types = ctx.types;
  let expr = body.expr(id);
  let first_arg = || expr.arg(0).and_then(|arg| result_type(body, ctx, arg));

  let ty = match expr.code {
    AstCode::Ldloc | AstCode::Stloc => body.variable(expr.operand.as_variable()?).ty.clone(),
    AstCode::Ldloca => TypeRef::by_reference(body.variable(expr.operand.as_variable()?).ty.clone()),
    AstCode::Ldthis => ctx.method.declaring_type.clone(),
    AstCode::Ldfld | AstCode::Ldsfld | AstCode::Stfld | AstCode::Stsfld => expr.operand.as_field()?.field_type().clone(),
    AstCode::Ldflda | AstCode::Ldsflda => TypeRef::by_reference(expr.operand.as_field()?.field_type().clone()),
    AstCode::Ldnull => types.object(),
    AstCode::LdcI4 | AstCode::Ldlen | AstCode::CmpLFloat | AstCode::CmpGFloat | AstCode::CmpLong => TypeRef::int32(),
    AstCode::LdcI8 | AstCode::EnumToLong => TypeRef::int64(),
    AstCode::EnumToInt => TypeRef::int32(),
    AstCode::LdcR4 => TypeRef::float32(),
    AstCode::LdcR8 => TypeRef::float64(),
    AstCode::Ldstr => types.string(),
    AstCode::CIsNull | AstCode::CIsNotNull | AstCode::InstanceOf | AstCode::SimpleInstanceOf => TypeRef::bool(),
    code if code.is_compare() => TypeRef::bool(),
    code if code.is_call() => {
      let method = expr.operand.as_method()?;
      if method.is_constructor() {
        TypeRef::void()
      } else {
        method.return_type().clone()
      }
    },
    AstCode::Newobj => expr.operand.as_method()?.declaring_type().clone(),
    AstCode::Castclass
    | AstCode::SimpleCastclass
    | AstCode::Isinst
    | AstCode::Unbox
    | AstCode::UnboxAny
    | AstCode::UnboxFromGeneric
    | AstCode::DefaultValue
    | AstCode::IntToEnum
    | AstCode::LongToEnum => expr.operand.as_type()?.clone(),
    AstCode::Newarr | AstCode::InitStructArray | AstCode::InitEnumArray => TypeRef::array(expr.operand.as_type()?.clone()),
    AstCode::Box => types.object(),
    AstCode::IntToUbyte => TypeRef::primitive(PrimitiveType::Byte),
    AstCode::IntToUshort => TypeRef::primitive(PrimitiveType::UInt16),
    code if code.conversion_target().is_some() => TypeRef::primitive(code.conversion_target()?),
    code if code.is_ldelem() => match first_arg().as_ref().and_then(|a| a.element_type()) {
      Some(element) => element.clone(),
      None => ldelem_type(types, code)?,
    },
    AstCode::Ldelema => TypeRef::by_reference(first_arg()?.element_type()?.clone()),
    AstCode::Ldobj | AstCode::LdindI4 | AstCode::LdindI8 | AstCode::LdindR4 | AstCode::LdindR8 | AstCode::LdindRef => {
      match expr.operand.as_type() {
        Some(ty) => ty.clone(),
        None => first_arg()?.element_type()?.clone(),
      }
    },
    code if code.is_binary_operation() => first_arg()?,
    AstCode::Neg | AstCode::Not | AstCode::Dup | AstCode::Wrap | AstCode::PostIncrement | AstCode::NullCoalescing => {
      first_arg()?
    },
    AstCode::CompoundAdd
    | AstCode::CompoundSub
    | AstCode::CompoundMul
    | AstCode::CompoundDiv
    | AstCode::CompoundRem
    | AstCode::CompoundAnd
    | AstCode::CompoundOr
    | AstCode::CompoundXor
    | AstCode::CompoundShl
    | AstCode::CompoundShr
    | AstCode::CompoundShrUn => first_arg()?,
    AstCode::Conditional => result_type(body, ctx, expr.arg(1)?)?,
    AstCode::TypeOf | AstCode::BoxedTypeOf | AstCode::NullableTypeOf | AstCode::LdClass => types.system_type(),
    AstCode::LdGenericInstanceField
    | AstCode::LdGenericInstanceTypeArgument
    | AstCode::LdGenericInstanceMethodArgument
    | AstCode::InitArrayFromArguments => TypeRef::array(types.system_type()),
    AstCode::ArrayNewInstance | AstCode::ArrayNewInstance2 => types.object(),
    AstCode::Delegate => expr.operand.as_type()?.clone(),
    AstCode::ByRefArray | AstCode::ByRefOutArray => TypeRef::array(first_arg()?),
    AstCode::AddressOf => TypeRef::by_reference(first_arg()?),
    AstCode::Ldexception => types.type_ref(names::SYSTEM, "Exception"),
    _ => return None,
  };
  Some(ty)
}

fn ldelem_type(
  types: &dexter_type::TypeSystem,
  code: AstCode,
) -> Option<TypeRef> {
  let primitive = match code {
    AstCode::LdelemI1 => PrimitiveType::SByte,
    AstCode::LdelemU1 => PrimitiveType::Byte,
    AstCode::LdelemI2 => PrimitiveType::Int16,
    AstCode::LdelemU2 => PrimitiveType::UInt16,
    AstCode::LdelemI4 => PrimitiveType::Int32,
    AstCode::LdelemU4 => PrimitiveType::UInt32,
    AstCode::LdelemI8 => PrimitiveType::Int64,
    AstCode::LdelemR4 => PrimitiveType::Float32,
    AstCode::LdelemR8 => PrimitiveType::Float64,
    AstCode::LdelemRef => return Some(types.object()),
    _ => return None,
  };
  Some(TypeRef::primitive(primitive))
}

/// Type annotation that contradicts the opcode producing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
  /// Runtime-support type that the type system does not know.
  UnresolvedType { expr: ExprId, ty: String },

  ResultTypeMismatch {
    expr: ExprId,
    code: AstCode,
    found: String,
    expected: &'static str,
  },
}

impl fmt::Display for TypeError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      TypeError::UnresolvedType { expr, ty } => write!(f, "node {:?} has unresolved type '{}'", expr, ty),
      TypeError::ResultTypeMismatch {
        expr,
        code,
        found,
        expected,
      } => {
        write!(f, "node {:?} ({}) is typed '{}', expected {}", expr, code.name(), found, expected)
      },
    }
  }
}

/// Checks every typed node of the live tree against its opcode.
pub fn check_types(
  body: &MethodBody,
  ctx: &LoweringContext<'_>,
) -> Result<(), Vec<TypeError>> {
  let mut errors = Vec::new();

  for id in visit::expressions(body, |e| e.inferred_type.is_some()) {
    let expr = body.expr(id);
    let Some(ty) = &expr.inferred_type else {
      continue;
    };

    if let Type::Unresolved { namespace, name } = ty.kind() {
      if namespace == names::INTERNAL_NAMESPACE {
        errors.push(TypeError::UnresolvedType {
          expr: id,
          ty: format!("{}.{}", namespace, name),
        });
        continue;
      }
    }

    let expected = match expr.code {
      code if code.is_compare() && !ty.is_bool() => Some("bool"),
      AstCode::CIsNull | AstCode::CIsNotNull if !ty.is_bool() => Some("bool"),
      AstCode::EnumToInt if !ty.is(PrimitiveType::Int32) => Some("int32"),
      AstCode::EnumToLong if !ty.is(PrimitiveType::Int64) => Some("int64"),
      AstCode::IntToEnum | AstCode::LongToEnum if !ctx.types.is_enum(ty) => Some("an enum"),
      AstCode::Ldnull if ty.is_primitive() && !ty.is_dex_object() => Some("a reference type"),
      _ => None,
    };

    if let Some(expected) = expected {
      errors.push(TypeError::ResultTypeMismatch {
        expr: id,
        code: expr.code,
        found: ctx.type_name(ty),
        expected,
      });
    }
  }

  if errors.is_empty() {
    Ok(())
  } else {
    Err(errors)
  }
}
