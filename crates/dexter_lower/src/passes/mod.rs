//! Tree-rewrite passes, one module per construct.
//!
//! Every pass has the signature of [`Pass`]: it walks the body, rewrites the
//! shapes it owns and leaves everything else untouched.

pub mod address_of;
pub mod branch;
pub mod byref_param;
pub mod cast;
pub mod compare_unordered;
pub mod compound;
pub mod conversions;
pub mod delegate;
pub mod enum_optimizer;
pub mod enums;
pub mod field_init;
pub mod generic_instance;
pub mod generics;
pub mod int_ptr;
pub mod interlocked;
pub mod nullable;
pub mod set_next;
pub mod struct_init;
pub mod structs;
pub mod type_of;

use dexter_ast::{AstCode, ExprId, MethodBody, Node};
use dexter_diagnostics::DiagnosticMessage;
use dexter_type::definition::ParameterKind;
use dexter_type::{names, MethodRef, SourceLocation, TypeRef};

use crate::context::LoweringContext;
use crate::error::LoweringResult;

pub type Pass = fn(&mut MethodBody, &mut LoweringContext<'_>) -> LoweringResult;

/// Static method of an internal runtime-support type.
pub(crate) fn helper_method(
  ctx: &LoweringContext<'_>,
  type_name: &str,
  method: &str,
  param_count: usize,
) -> LoweringResult<MethodRef> {
  let types = ctx.types;
  let Some(helper) = types.helper_type(type_name) else {
    return Err(ctx.error(
      DiagnosticMessage::MissingHelperType {
        name: format!("{}.{}", names::INTERNAL_NAMESPACE, type_name),
      },
      SourceLocation::NONE,
    ));
  };

  match types.find_method(helper, method, Some(param_count)) {
    Some(id) => Ok(types.method_ref_of(id)),
    None => Err(ctx.error(
      DiagnosticMessage::MissingHelperMethod {
        type_name: type_name.to_string(),
        method: method.to_string(),
      },
      SourceLocation::NONE,
    )),
  }
}

/// Index of the first statement after the base constructor call, or 0.
///
/// Code inserted at the top of a constructor goes there so the base part of
/// the object is initialized first.
pub(crate) fn after_base_constructor(
  body: &MethodBody,
  ctx: &LoweringContext<'_>,
) -> usize {
  if !ctx.method.is_constructor() {
    return 0;
  }

  body
    .root
    .body
    .iter()
    .position(|node| match node {
      Node::Expr(id) => is_base_constructor_call(body, ctx, *id),
      _ => false,
    })
    .map_or(0, |index| index + 1)
}

pub(crate) fn is_base_constructor_call(
  body: &MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
) -> bool {
  let expr = body.expr(id);
  match expr.code {
    AstCode::CallBaseCtor => true,
    AstCode::Call => {
      let Some(method) = expr.operand.as_method() else {
        return false;
      };
      let on_this = expr.arg(0).is_some_and(|arg| body.expr(arg).is(AstCode::Ldthis));
      method.is_constructor() && on_this && method.declaring_type() != &ctx.method.declaring_type
    },
    _ => false,
  }
}

/// `ldthis`, or a load of the `this` parameter.
pub(crate) fn is_this(
  body: &MethodBody,
  id: ExprId,
) -> bool {
  let expr = body.expr(id);
  match expr.code {
    AstCode::Ldthis => true,
    AstCode::Ldloc => expr.operand.as_variable().is_some_and(|v| body.variable(v).is_this()),
    _ => false,
  }
}

/// Parameter of `call` that receives its `index`-th argument, with the
/// receiver skipped. `None` for the receiver itself.
pub(crate) fn parameter_index(
  body: &MethodBody,
  call: ExprId,
  index: usize,
) -> Option<usize> {
  let method = body.expr(call).operand.as_method()?;
  let receiver = method.has_this() && body.code(call) != AstCode::Newobj;
  if receiver {
    index.checked_sub(1)
  } else {
    Some(index)
  }
}

/// Declared shape of the parameter receiving an argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParameterInfo {
  /// Parameter type without the by-reference wrapper.
  pub ty: TypeRef,
  pub by_ref: bool,
  pub out: bool,
}

pub(crate) fn parameter_of(
  body: &MethodBody,
  ctx: &LoweringContext<'_>,
  call: ExprId,
  index: usize,
) -> Option<ParameterInfo> {
  let param = parameter_index(body, call, index)?;
  let method = body.expr(call).operand.as_method()?;

  let (ty, kind) = match ctx.types.resolve_method(method) {
    Some(def) => {
      let p = def.parameters.get(param)?;
      (p.ty.clone(), p.kind)
    },
    None => {
      let ty = method.parameters().get(param)?.clone();
      let kind = if ty.is_by_reference() { ParameterKind::Ref } else { ParameterKind::In };
      (ty, kind)
    },
  };
  let by_ref = kind != ParameterKind::In || ty.is_by_reference();
  let ty = match ty.element_type() {
    Some(element) if ty.is_by_reference() => element.clone(),
    _ => ty,
  };
  Some(ParameterInfo {
    ty,
    by_ref,
    out: kind == ParameterKind::Out,
  })
}

/// True when `arg` is passed to a `ref`/`out` parameter of `call`.
pub(crate) fn is_byref_argument(
  body: &MethodBody,
  ctx: &LoweringContext<'_>,
  call: ExprId,
  arg: ExprId,
) -> bool {
  let expr = body.expr(call);
  if !expr.code.is_call() && expr.code != AstCode::Newobj {
    return false;
  }
  let Some(index) = expr.arguments.iter().position(|&a| a == arg) else {
    return false;
  };
  parameter_of(body, ctx, call, index).is_some_and(|p| p.by_ref)
}
