//! Nullable lowering.
//!
//! `Nullable<T>` has no target counterpart. A primitive payload lives boxed
//! (null meaning "no value"); any other payload is stored as itself.

use dexter_ast::{visit, AstCode, ExprId, MethodBody, Operand};
use dexter_config::DebugTrace;
use dexter_log::trace_dbg;
use dexter_type::{names, MethodRef, SourceLocation, TypeRef};

use crate::build::{self, Reused};
use crate::context::LoweringContext;
use crate::error::LoweringResult;
use crate::typing::result_type;

pub fn run(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
) -> LoweringResult {
  let types = ctx.types;

  for id in visit::expressions(body, |e| e.is(AstCode::Call) || e.is(AstCode::Callvirt)) {
    let Some(method) = body.expr(id).operand.as_method().cloned() else {
      continue;
    };
    let Some(payload) = types.nullable_payload(method.declaring_type()).cloned() else {
      continue;
    };
    lower_call(body, ctx, id, &method, payload);
  }

  for id in visit::expressions(body, |e| e.is(AstCode::Newobj)) {
    let Some(method) = body.expr(id).operand.as_method().cloned() else {
      continue;
    };
    let Some(payload) = types.nullable_payload(method.declaring_type()).cloned() else {
      continue;
    };
    if body.args(id).len() != 1 {
      continue;
    }
    let value = body.arg(id, 0);
    if payload.is_primitive() {
      body.rewrite(id, AstCode::Box, Operand::Type(payload), vec![value]);
      body.set_type(id, method.declaring_type().clone());
    } else {
      body.copy_from(id, value);
    }
    trace_dbg!(ctx, DebugTrace::Nullable, "new {} at {}", types.type_name(method.declaring_type()), body.expr(id).location);
  }

  for id in visit::expressions(body, |e| e.is(AstCode::DefaultValue)) {
    let Some(ty) = body.expr(id).operand.as_type().filter(|ty| types.is_nullable(ty)).cloned() else {
      continue;
    };
    body.rewrite(id, AstCode::Ldnull, Operand::None, Vec::new());
    body.set_type(id, ty);
  }

  for id in visit::expressions(body, |e| e.is(AstCode::TypeOf)) {
    let Some(payload) = body
      .expr(id)
      .operand
      .as_type()
      .and_then(|ty| types.nullable_payload(ty))
      .cloned()
    else {
      continue;
    };
    let code = if payload.is_primitive() {
      AstCode::BoxedTypeOf
    } else {
      AstCode::NullableTypeOf
    };
    let arguments = body.args(id).to_vec();
    body.rewrite(id, code, Operand::Type(payload), arguments);
    trace_dbg!(ctx, DebugTrace::Nullable, "{} at {}", code.name(), body.expr(id).location);
  }
  Ok(())
}

/// `ldloca/ldflda/ldsflda` into the matching load, in place.
fn degrade_address(
  body: &mut MethodBody,
  id: ExprId,
) -> bool {
  let load = match body.code(id) {
    AstCode::Ldloca => AstCode::Ldloc,
    AstCode::Ldflda => AstCode::Ldfld,
    AstCode::Ldsflda => AstCode::Ldsfld,
    _ => return false,
  };
  let expr = body.expr_mut(id);
  expr.code = load;
  if let Some(element) = expr.inferred_type.as_ref().and_then(|ty| ty.element_type()).cloned() {
    expr.inferred_type = Some(element);
  }
  if expr.expected_type.as_ref().is_some_and(TypeRef::is_by_reference) {
    expr.expected_type = None;
  }
  true
}

fn is_value_load(code: AstCode) -> bool {
  matches!(code, AstCode::Ldloc | AstCode::Ldfld | AstCode::Ldsfld)
}

fn lower_call(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
  method: &MethodRef,
  payload: TypeRef,
) {
  let location = body.expr(id).location;
  let arguments = body.args(id).to_vec();
  let primitive = payload.is_primitive();
  let Some(&receiver) = arguments.first() else {
    return;
  };
  let receiver_code = body.code(receiver);
  let address = matches!(receiver_code, AstCode::Ldloca | AstCode::Ldflda | AstCode::Ldsflda);

  match (method.name(), arguments.len()) {
    (names::CONSTRUCTOR, 2) if address => {
      let value = arguments[1];
      let stored = if primitive {
        body.new_typed(location, AstCode::Box, Operand::Type(payload), vec![value], method.declaring_type().clone())
      } else {
        value
      };
      store_into(body, id, receiver, stored);
      body.set_type(id, method.declaring_type().clone());
    },
    ("get_HasValue", 1) if address || is_value_load(receiver_code) => {
      degrade_address(body, receiver);
      body.rewrite(id, AstCode::CIsNotNull, Operand::None, vec![receiver]);
      body.set_type(id, TypeRef::bool());
    },
    ("get_Value", 1) | ("GetValueOrDefault", 1) | ("GetValueOrDefault", 2)
      if address || is_value_load(receiver_code) =>
    {
      degrade_address(body, receiver);
      let fallback = arguments.get(1).copied();
      if primitive {
        unbox_checked(body, ctx, id, receiver, &payload, fallback, location);
      } else if method.name() == "get_Value" {
        let value = cast_if_needed(body, ctx, receiver, &payload);
        body.copy_from(id, value);
        body.set_type(id, payload);
      } else {
        let value = cast_if_needed(body, ctx, receiver, &payload);
        let fallback = fallback.unwrap_or_else(|| {
          body.new_typed(location, AstCode::DefaultValue, Operand::Type(payload.clone()), Vec::new(), payload.clone())
        });
        body.rewrite(id, AstCode::NullCoalescing, Operand::None, vec![value, fallback]);
        body.set_type(id, payload);
      }
    },
    ("get_RawValue", 1) if address => {
      degrade_address(body, receiver);
      if primitive {
        body.rewrite(id, AstCode::Unbox, Operand::Type(payload.clone()), vec![receiver]);
        body.set_type(id, payload);
      } else {
        body.copy_from(id, receiver);
        body.set_type(id, payload);
      }
    },
    _ if primitive || ctx.types.is_enum(&payload) => {
      for arg in arguments {
        degrade_address(body, arg);
      }
      return;
    },
    _ => return,
  }
  trace_dbg!(ctx, DebugTrace::Nullable, "Nullable::{} at {}", method.name(), location);
}

/// Rebuilds `id` as the store matching the address `target`.
fn store_into(
  body: &mut MethodBody,
  id: ExprId,
  target: ExprId,
  value: ExprId,
) {
  let target_expr = body.expr(target);
  let operand = target_expr.operand.clone();
  match target_expr.code {
    AstCode::Ldloca => body.rewrite(id, AstCode::Stloc, operand, vec![value]),
    AstCode::Ldflda => {
      let instance = body.arg(target, 0);
      body.rewrite(id, AstCode::Stfld, operand, vec![instance, value]);
    },
    _ => body.rewrite(id, AstCode::Stsfld, operand, vec![value]),
  }
}

/// `Conditional(CIsNotNull(src), Unbox(T, src'), fallback)` with `src` evaluated once.
fn unbox_checked(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
  source: ExprId,
  payload: &TypeRef,
  fallback: Option<ExprId>,
  location: SourceLocation,
) {
  let reused = Reused::new(body, ctx, source);
  let test = body.new_typed(location, AstCode::CIsNotNull, Operand::None, vec![source], TypeRef::bool());
  let again = reused.load(body, location);
  let unboxed = body.new_typed(location, AstCode::Unbox, Operand::Type(payload.clone()), vec![again], payload.clone());
  let otherwise = fallback.unwrap_or_else(|| build::zero_value(body, location, payload));
  body.rewrite(id, AstCode::Conditional, Operand::None, vec![test, unboxed, otherwise]);
  body.set_type(id, payload.clone());
}

/// `value` forced to `payload` when its static type says otherwise.
fn cast_if_needed(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  value: ExprId,
  payload: &TypeRef,
) -> ExprId {
  let matches = result_type(body, ctx, value)
    .is_some_and(|ty| ty == *payload || ctx.types.nullable_payload(&ty) == Some(payload));
  if matches {
    return value;
  }
  let location = body.expr(value).location;
  body.new_typed(location, AstCode::SimpleCastclass, Operand::Type(payload.clone()), vec![value], payload.clone())
}
