//! Call-site side of by-reference arguments.
//!
//! An argument passed to a `ref`/`out` parameter becomes a fresh one-element
//! array (`ByRefArray`/`ByRefOutArray`). The node's `store_by_ref` tree writes
//! element 0 back into the original storage after the call; inside that tree
//! the array itself is denoted by the `nop` placeholder the element load reads
//! from.
//!
//! Addresses of primitives that are not passed by reference are boxed.

use dexter_ast::{visit, AstCode, ExprId, MethodBody, Operand};
use dexter_config::DebugTrace;
use dexter_diagnostics::DiagnosticMessage;
use dexter_log::trace_dbg;
use dexter_type::{SourceLocation, TypeRef};

use crate::build::{self, Reused};
use crate::context::LoweringContext;
use crate::error::LoweringResult;
use crate::passes::{parameter_of, ParameterInfo};
use crate::typing::result_type;

pub fn run(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
) -> LoweringResult {
  let calls = visit::expressions(body, |e| {
    matches!(e.code, AstCode::Call | AstCode::Callvirt | AstCode::Calli | AstCode::Newobj)
  });

  for call in calls {
    if primitive_constructor(body, ctx, call) {
      continue;
    }
    for index in 0..body.args(call).len() {
      lower_argument(body, ctx, call, index)?;
    }
  }
  Ok(())
}

/// `call Int32::.ctor(ldloca v, x)` into `stloc v (x)`.
fn primitive_constructor(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  call: ExprId,
) -> bool {
  let expr = body.expr(call);
  let is_primitive_ctor = expr
    .operand
    .as_method()
    .is_some_and(|m| m.is_constructor() && m.declaring_type().is_primitive());
  if expr.code != AstCode::Call || !is_primitive_ctor || expr.arguments.len() != 2 {
    return false;
  }
  let (target, value) = (expr.arguments[0], expr.arguments[1]);
  let Some(variable) = body.expr(target).operand.as_variable().filter(|_| body.code(target) == AstCode::Ldloca) else {
    return false;
  };

  let ty = result_type(body, ctx, value).unwrap_or_else(|| body.variable(variable).ty.clone());
  body.rewrite(call, AstCode::Stloc, Operand::Variable(variable), vec![value]);
  body.set_type(call, ty);
  trace_dbg!(ctx, DebugTrace::Byref, "primitive constructor as store at {}", body.expr(call).location);
  true
}

fn lower_argument(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  call: ExprId,
  index: usize,
) -> LoweringResult {
  let arg = body.arg(call, index);
  let code = body.code(arg);
  if !matches!(
    code,
    AstCode::Ldloca | AstCode::AddressOf | AstCode::Ldflda | AstCode::Ldsflda | AstCode::Ldelema
  ) {
    return Ok(());
  }

  // `None` for the receiver.
  let param = parameter_of(body, ctx, call, index).filter(|p| p.by_ref);
  let location = body.expr(arg).location;

  match code {
    AstCode::Ldloca => {
      let Some(variable) = body.expr(arg).operand.as_variable() else {
        return Ok(());
      };
      let ty = body.variable(variable).ty.clone();
      match &param {
        Some(param) => {
          let load = build::ldloc(body, location, variable);
          let value = value_out_of_array(body, ctx, location, &ty, param);
          let store = build::stloc(body, location, variable, value);
          to_byref_array(body, ctx, arg, &ty, load, store, param);
        },
        None if ty.is_primitive() => {
          let load = build::ldloc(body, location, variable);
          to_box(body, arg, ty, load);
        },
        None if ty.is_generic_parameter() => {
          body.rewrite(arg, AstCode::Ldloc, Operand::Variable(variable), Vec::new());
          body.set_type(arg, ty);
        },
        None => return Ok(()),
      }
    },
    AstCode::AddressOf => {
      let inner = body.arg(arg, 0);
      let Some(ty) = result_type(body, ctx, inner).filter(TypeRef::is_primitive) else {
        return Ok(());
      };
      if param.is_some() {
        return Err(ctx.error_at(
          body,
          arg,
          DiagnosticMessage::UnexpectedOpcode {
            opcode: code.name().to_string(),
            context: "by-reference argument".to_string(),
          },
        ));
      }
      to_box(body, arg, ty, inner);
    },
    AstCode::Ldflda | AstCode::Ldsflda => {
      let Some(field) = body.expr(arg).operand.as_field().cloned() else {
        return Ok(());
      };
      let ty = field.field_type().clone();
      if param.is_none() && !ty.is_primitive() {
        return Ok(());
      }
      let instance = body.args(arg).to_vec();
      let (load_code, store_code) = if code == AstCode::Ldflda {
        (AstCode::Ldfld, AstCode::Stfld)
      } else {
        (AstCode::Ldsfld, AstCode::Stsfld)
      };

      match &param {
        Some(param) => {
          let reused = instance.first().map(|&i| Reused::new(body, ctx, i));
          let load = body.new_typed(location, load_code, Operand::Field(field.clone()), instance, ty.clone());
          let value = value_out_of_array(body, ctx, location, &ty, param);
          let mut store_args: Vec<ExprId> = reused.iter().map(|r| r.load(body, location)).collect();
          store_args.push(value);
          let store = body.new_typed(location, store_code, Operand::Field(field), store_args, ty.clone());
          to_byref_array(body, ctx, arg, &ty, load, store, param);
        },
        None => {
          let load = body.new_typed(location, load_code, Operand::Field(field), instance, ty.clone());
          to_box(body, arg, ty, load);
        },
      }
    },
    _ => {
      let (array, position) = (body.arg(arg, 0), body.arg(arg, 1));
      let Some(ty) = result_type(body, ctx, array).and_then(|a| a.element_type().cloned()) else {
        return Ok(());
      };
      if param.is_none() && !ty.is_primitive() {
        return Ok(());
      }
      let load_code = AstCode::ldelem_for(&ty);

      match &param {
        Some(param) => {
          let reused_array = Reused::new(body, ctx, array);
          let reused_position = Reused::new(body, ctx, position);
          let load = body.new_typed(location, load_code, Operand::None, vec![array, position], ty.clone());
          let value = value_out_of_array(body, ctx, location, &ty, param);
          let store_args = vec![
            reused_array.load(body, location),
            reused_position.load(body, location),
            value,
          ];
          let store = body.new_typed(location, AstCode::stelem_for(&ty), Operand::None, store_args, ty.clone());
          to_byref_array(body, ctx, arg, &ty, load, store, param);
        },
        None => {
          let load = body.new_typed(location, load_code, Operand::None, vec![array, position], ty.clone());
          to_box(body, arg, ty, load);
        },
      }
    },
  }

  trace_dbg!(ctx, DebugTrace::Byref, "{} argument lowered at {}", code.name(), location);
  Ok(())
}

fn to_box(
  body: &mut MethodBody,
  id: ExprId,
  ty: TypeRef,
  value: ExprId,
) {
  body.rewrite(id, AstCode::Box, Operand::Type(ty.clone()), vec![value]);
  body.set_type(id, ty);
}

/// Element type of the array; generic parameters travel as objects.
fn array_element(
  ctx: &LoweringContext<'_>,
  param: &ParameterInfo,
  element: &TypeRef,
) -> TypeRef {
  if param.ty.is_generic_parameter() {
    ctx.types.object()
  } else {
    element.clone()
  }
}

/// `ldelem(<array>, 0)`, unboxed again for generic parameters.
fn value_out_of_array(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  location: SourceLocation,
  element: &TypeRef,
  param: &ParameterInfo,
) -> ExprId {
  let array_type = array_element(ctx, param, element);
  let placeholder = body.new_typed(location, AstCode::Nop, Operand::None, Vec::new(), TypeRef::array(array_type.clone()));
  let zero = build::ldc_i4(body, location, 0);
  let load = body.new_typed(
    location,
    AstCode::ldelem_for(&array_type),
    Operand::None,
    vec![placeholder, zero],
    array_type,
  );

  if param.ty.is_generic_parameter() {
    body.new_typed(location, AstCode::Unbox, Operand::Type(element.clone()), vec![load], element.clone())
  } else {
    load
  }
}

fn to_byref_array(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
  element: &TypeRef,
  value: ExprId,
  store: ExprId,
  param: &ParameterInfo,
) {
  let location = body.expr(id).location;
  let array_type = array_element(ctx, param, element);
  let generic = param.ty.is_generic_parameter();

  let value_matches = result_type(body, ctx, value).is_some_and(|ty| ty == *element);
  let value = if generic && (!param.out || !value_matches) {
    body.new_typed(location, AstCode::Box, Operand::Type(element.clone()), vec![value], element.clone())
  } else {
    value
  };

  let source = body.new_expr(location, AstCode::Nop, Operand::Type(param.ty.clone()), Vec::new());
  let code = if param.out {
    AstCode::ByRefOutArray
  } else {
    AstCode::ByRefArray
  };
  body.rewrite(id, code, Operand::Type(array_type.clone()), vec![value, source]);
  body.set_type(id, TypeRef::array(array_type));
  body.expr_mut(id).store_by_ref = Some(store);
}
