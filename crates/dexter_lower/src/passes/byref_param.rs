//! Callee side of by-reference parameters.
//!
//! A `T&` parameter arrives as a one-element `T[]`; reads and writes through
//! it become element 0 accesses.

use dexter_ast::{visit, AstCode, ExprId, ExprPair, MethodBody, Operand};
use dexter_config::DebugTrace;
use dexter_log::trace_dbg;
use dexter_type::TypeRef;

use crate::build;
use crate::context::LoweringContext;
use crate::error::LoweringResult;
use crate::passes::{is_byref_argument, is_this};
use crate::typing::result_type;

pub fn run(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
) -> LoweringResult {
  convert_stores(body, ctx);
  convert_loads(body, ctx);
  Ok(())
}

/// Element type of a load of a by-reference local or parameter.
fn byref_element(
  body: &MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
) -> Option<TypeRef> {
  if !body.expr(id).is(AstCode::Ldloc) {
    return None;
  }
  let ty = result_type(body, ctx, id)?;
  if !ty.is_by_reference() {
    return None;
  }
  ty.element_type().cloned()
}

fn as_array(
  body: &mut MethodBody,
  id: ExprId,
  element: &TypeRef,
) {
  body.set_type(id, TypeRef::array(element.clone()));
}

/// `stobj/stind(ldloc p, v)` into `stelem(ldloc p, 0, v)`.
fn convert_stores(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
) {
  let stores = visit::expressions(body, |e| {
    e.arguments.len() == 2 && (e.is(AstCode::Stobj) || e.code.is_stind())
  });

  for id in stores {
    let (address, value) = (body.arg(id, 0), body.arg(id, 1));
    let Some(element) = byref_element(body, ctx, address) else {
      continue;
    };
    let location = body.expr(id).location;

    if is_this(body, address) {
      // `this = default` in a struct constructor; the instance is already zeroed.
      if body.expr(value).is(AstCode::DefaultValue) {
        body.rewrite(id, AstCode::Nop, Operand::None, Vec::new());
      }
      continue;
    }

    as_array(body, address, &element);
    let zero = build::ldc_i4(body, location, 0);
    body.rewrite(id, AstCode::stelem_for(&element), Operand::None, vec![address, zero, value]);
    body.set_type(id, element);
    trace_dbg!(ctx, DebugTrace::Byref, "byref store at {}", location);
  }
}

/// Value use of a byref load, as opposed to passing the reference along.
fn used_as_value(
  body: &MethodBody,
  ctx: &LoweringContext<'_>,
  pair: ExprPair,
  address: ExprId,
) -> bool {
  if is_this(body, address) {
    return false;
  }
  let Some(parent) = pair.parent else {
    return true;
  };
  let parent_expr = body.expr(parent);
  if parent_expr.is(AstCode::Box) {
    return false;
  }
  !is_byref_argument(body, ctx, parent, pair.expr)
}

fn convert_loads(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
) {
  let pairs = visit::expression_pairs(body, |e| {
    (e.arguments.len() == 1 && (e.is(AstCode::Ldobj) || e.code.is_ldind())) || e.is(AstCode::Ldloc)
  });

  for pair in pairs {
    let id = pair.expr;
    let location = body.expr(id).location;

    if body.code(id) == AstCode::Ldloc {
      // Loads already under an indirection are handled with it.
      let under_load = pair
        .parent
        .is_some_and(|p| body.expr(p).is(AstCode::Ldobj) || body.code(p).is_ldind());
      let is_parameter = body
        .expr(id)
        .operand
        .as_variable()
        .is_some_and(|v| body.variable(v).is_parameter());
      if under_load || !is_parameter {
        continue;
      }
      let Some(element) = byref_element(body, ctx, id) else {
        continue;
      };
      if !used_as_value(body, ctx, pair, id) {
        continue;
      }

      let array = body.push_down(id);
      as_array(body, array, &element);
      let zero = build::ldc_i4(body, location, 0);
      body.rewrite(id, AstCode::ldelem_for(&element), Operand::None, vec![array, zero]);
      body.set_type(id, element);
      trace_dbg!(ctx, DebugTrace::Byref, "byref parameter read at {}", location);
      continue;
    }

    let address = body.arg(id, 0);
    let Some(element) = byref_element(body, ctx, address) else {
      continue;
    };

    if used_as_value(body, ctx, pair, address) {
      as_array(body, address, &element);
      let zero = build::ldc_i4(body, location, 0);
      body.rewrite(id, AstCode::ldelem_for(&element), Operand::None, vec![address, zero]);
      body.set_type(id, element);
      trace_dbg!(ctx, DebugTrace::Byref, "byref read at {}", location);
    } else if pair.parent.is_some_and(|p| body.code(p).is_call()) && ctx.types.is_struct(&element) {
      // A struct is already a reference on the target; pass the local itself.
      body.copy_from(id, address);
    }
  }
}
