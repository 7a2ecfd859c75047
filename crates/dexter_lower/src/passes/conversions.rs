//! Numeric conversion passes.
//!
//! The target has 32- and 64-bit registers only: narrow values are widened on
//! load and narrowed on store, and constants must match the width of the
//! register they end up in.

use std::collections::HashSet;

use dexter_ast::{visit, AstCode, Block, ExprId, MethodBody, Node, Operand};
use dexter_config::DebugTrace;
use dexter_log::trace_dbg;
use dexter_type::{PrimitiveType, TypeRef};

use crate::context::LoweringContext;
use crate::error::LoweringResult;
use crate::typing::result_type;

fn primitive_of(ty: Option<&TypeRef>) -> Option<PrimitiveType> {
  ty.and_then(TypeRef::as_primitive)
}

/// `ldc.i4` in a 64-bit or floating point position gets the matching constant code.
pub fn ldc_wide(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
) -> LoweringResult {
  for id in visit::expressions(body, |e| e.is(AstCode::LdcI4) || e.is(AstCode::LdcR4)) {
    let expr = body.expr(id);
    let inferred = primitive_of(expr.inferred_type.as_ref());
    let expected = primitive_of(expr.expected_type.as_ref());

    let (code, operand, ty) = match (expr.code, &expr.operand) {
      (AstCode::LdcI4, Operand::Int(value)) => {
        let value = *value;
        let wide_integer = [expected, inferred].into_iter().flatten().find(|p| p.is_wide() && p.is_integer());
        match (expected.or(inferred), wide_integer) {
          (Some(PrimitiveType::Float32), _) => (AstCode::LdcR4, Operand::float(value as f32), PrimitiveType::Float32),
          (Some(PrimitiveType::Float64), _) => (AstCode::LdcR8, Operand::double(f64::from(value)), PrimitiveType::Float64),
          (_, Some(wide)) => (AstCode::LdcI8, Operand::Long(i64::from(value)), wide),
          _ => continue,
        }
      },
      (AstCode::LdcR4, Operand::Float(value)) if expected == Some(PrimitiveType::Float64) => {
        (AstCode::LdcR8, Operand::double(f64::from(value.0)), PrimitiveType::Float64)
      },
      _ => continue,
    };

    trace_dbg!(ctx, DebugTrace::Conversion, "{} as {} at {}", expr.code.name(), code.name(), expr.location);
    body.rewrite(id, code, operand, Vec::new());
    body.set_type(id, TypeRef::primitive(ty));
  }
  Ok(())
}

/// `convX(ldloc v)` where `v` is already an X.
pub fn ldloc_with_conversion(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
) -> LoweringResult {
  for id in visit::expressions(body, |e| e.code.conversion_target().is_some() && e.arguments.len() == 1) {
    let Some(target) = body.code(id).conversion_target() else {
      continue;
    };
    let load = body.arg(id, 0);
    let Some(variable) = body.expr(load).operand.as_variable().filter(|_| body.code(load) == AstCode::Ldloc) else {
      continue;
    };
    if body.variable(variable).ty.as_primitive() != Some(target) {
      continue;
    }
    trace_dbg!(ctx, DebugTrace::Conversion, "{} of {} dropped", target.name(), body.variable(variable).name);
    body.copy_from(id, load);
  }
  Ok(())
}

fn narrows(code: AstCode) -> bool {
  matches!(code, AstCode::IntToUbyte | AstCode::IntToUshort)
    || code.conversion_target().is_some_and(|t| t.is_narrow() && t != PrimitiveType::Bool)
}

/// Moves the node's expectation onto the wrapper that now stands in its place.
fn wrap_typed(
  body: &mut MethodBody,
  id: ExprId,
  code: AstCode,
  ty: TypeRef,
) {
  let inner = body.wrap(id, code, Operand::None, ty);
  let expected = body.expr_mut(inner).expected_type.take();
  body.expr_mut(id).expected_type = expected;
}

/// Unsigned narrow loads are sign-extended by the target and need masking.
pub fn convert_after_load(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
) -> LoweringResult {
  let loads = visit::expression_pairs(body, |e| {
    matches!(e.code, AstCode::Ldfld | AstCode::Ldsfld) || (e.code.is_ldelem() && e.code != AstCode::LdelemAny)
  });

  for pair in loads {
    let id = pair.expr;
    let ty = match body.expr(id).operand.as_field() {
      Some(field) => field.field_type().as_primitive(),
      None => primitive_of(result_type(body, ctx, id).as_ref()),
    };
    let code = match ty {
      Some(PrimitiveType::Byte) => AstCode::IntToUbyte,
      Some(PrimitiveType::UInt16) => AstCode::IntToUshort,
      _ => continue,
    };
    if pair.parent.is_some_and(|p| narrows(body.code(p))) {
      continue;
    }
    let location = body.expr(id).location;
    wrap_typed(body, id, code, TypeRef::primitive(code_target(code)));
    trace_dbg!(ctx, DebugTrace::Conversion, "{} after load at {}", code.name(), location);
  }
  Ok(())
}

fn code_target(code: AstCode) -> PrimitiveType {
  if code == AstCode::IntToUbyte {
    PrimitiveType::Byte
  } else {
    PrimitiveType::UInt16
  }
}

fn fits(
  value: i64,
  target: PrimitiveType,
) -> bool {
  let range = match target {
    PrimitiveType::SByte => i64::from(i8::MIN)..=i64::from(i8::MAX),
    PrimitiveType::Byte => 0..=i64::from(u8::MAX),
    PrimitiveType::Int16 => i64::from(i16::MIN)..=i64::from(i16::MAX),
    PrimitiveType::UInt16 | PrimitiveType::Char => 0..=i64::from(u16::MAX),
    _ => return true,
  };
  range.contains(&value)
}

/// Values stored into narrow storage are narrowed first.
pub fn convert_before_store(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
) -> LoweringResult {
  let stores = visit::expressions(body, |e| {
    matches!(e.code, AstCode::Stloc | AstCode::Stfld | AstCode::Stsfld) || e.code.is_stelem()
  });

  for id in stores {
    let expr = body.expr(id);
    let Some(&value) = expr.arguments.last() else {
      continue;
    };
    let target = match (&expr.operand, expr.code) {
      (Operand::Variable(v), _) => body.variable(*v).ty.as_primitive(),
      (Operand::Field(f), _) => f.field_type().as_primitive(),
      (_, code) if code.is_stelem() => {
        let array = body.arg(id, 0);
        result_type(body, ctx, array).and_then(|a| a.element_type().and_then(TypeRef::as_primitive))
      },
      _ => None,
    };
    let Some(target) = target.filter(|t| t.is_narrow() && *t != PrimitiveType::Bool) else {
      continue;
    };
    let Some(code) = AstCode::conversion_to(target) else {
      continue;
    };

    if body.int_constant(value).is_some_and(|v| fits(v, target)) || narrows(body.code(value)) {
      continue;
    }
    let Some(source) = primitive_of(result_type(body, ctx, value).as_ref()) else {
      continue;
    };
    if source.is_narrow() && source.bits() <= target.bits() {
      continue;
    }

    let location = body.expr(value).location;
    wrap_typed(body, value, code, TypeRef::primitive(target));
    trace_dbg!(ctx, DebugTrace::Conversion, "{} before store at {}", code.name(), location);
  }
  Ok(())
}

/// Redundant conversion chains, `wrap` markers and empty statements.
pub fn cleanup(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
) -> LoweringResult {
  let nodes: Vec<ExprId> = visit::expressions(body, |e| e.code.is_conversion() || e.is(AstCode::Wrap))
    .into_iter()
    .rev()
    .collect();

  for id in nodes {
    let code = body.code(id);
    let Some(inner) = body.expr(id).arg(0) else {
      continue;
    };
    let inner_code = body.code(inner);

    let collapse = match code {
      AstCode::Wrap => true,
      AstCode::IntToUbyte => inner_code == AstCode::ConvU1,
      AstCode::IntToUshort => inner_code == AstCode::ConvU2,
      AstCode::ConvI4 if matches!(inner_code, AstCode::IntToUbyte | AstCode::IntToUshort) => true,
      _ if inner_code == code => true,
      _ => match code.conversion_target() {
        // Narrow sources read from storage still need their conversion.
        Some(target) if target.is_narrow() => {
          inner_code.is_conversion() && primitive_of(result_type(body, ctx, inner).as_ref()) == Some(target)
        },
        Some(target) => primitive_of(result_type(body, ctx, inner).as_ref()) == Some(target),
        None => false,
      },
    };
    if collapse {
      trace_dbg!(ctx, DebugTrace::Conversion, "{} removed at {}", code.name(), body.expr(id).location);
      body.copy_from(id, inner);
    }
  }

  let empty: HashSet<ExprId> = visit::statements(body)
    .into_iter()
    .filter(|&id| body.code(id) == AstCode::Nop && body.args(id).is_empty())
    .collect();
  if !empty.is_empty() {
    remove_statements(&mut body.root, &empty);
  }
  Ok(())
}

fn remove_statements(
  block: &mut Block,
  remove: &HashSet<ExprId>,
) {
  block.body.retain(|node| node.as_expr().map_or(true, |id| !remove.contains(&id)));
  for node in &mut block.body {
    match node {
      Node::Block(inner) => remove_statements(inner, remove),
      Node::TryCatch(region) => {
        for inner in region.blocks_mut() {
          remove_statements(inner, remove);
        }
      },
      Node::Switch(switch) => {
        for inner in switch.blocks_mut() {
          remove_statements(inner, remove);
        }
      },
      Node::Expr(_) | Node::Label(_) => {},
    }
  }
}
