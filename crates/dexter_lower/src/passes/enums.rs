//! Enum lowering.
//!
//! Enums are objects on the target. Arithmetic, ordering and switches work on
//! the underlying integer, so values cross between the two representations
//! through `EnumToInt`/`EnumToLong` and `IntToEnum`/`LongToEnum`.

use dexter_ast::{visit, AstCode, Block, ExprId, MethodBody, Node, Operand};
use dexter_config::DebugTrace;
use dexter_log::trace_dbg;
use dexter_type::{PrimitiveType, TypeRef};

use crate::context::LoweringContext;
use crate::error::LoweringResult;

pub fn run(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
) -> LoweringResult {
  // Children before parents.
  let nodes: Vec<ExprId> = visit::expressions(body, |_| true).into_iter().rev().collect();

  for id in nodes {
    let code = body.code(id);
    match code {
      AstCode::LdcI4 | AstCode::LdcI8 => enum_constant(body, ctx, id),
      code if code.is_binary_operation() => {
        if binary_operation(body, ctx, id) {
          continue;
        }
      },
      code if code.is_integer_only_compare() => {
        for index in 0..body.args(id).len() {
          let arg = body.arg(id, index);
          if let Some(underlying) = enum_underlying(body, ctx, arg) {
            numeric_argument(body, arg, underlying);
          }
        }
      },
      AstCode::Switch | AstCode::LookupSwitch | AstCode::Brtrue | AstCode::Brfalse => {
        if let Some(arg) = body.expr(id).arg(0) {
          if let Some(underlying) = enum_underlying(body, ctx, arg) {
            to_numeric(body, arg, underlying);
          }
        }
      },
      _ => {},
    }

    boundary(body, ctx, id);
  }

  for condition in switch_conditions(&body.root) {
    if let Some(underlying) = enum_underlying(body, ctx, condition) {
      to_numeric(body, condition, underlying);
      trace_dbg!(ctx, DebugTrace::Enum, "switch over enum at {}", body.expr(condition).location);
    }
  }
  Ok(())
}

fn switch_conditions(block: &Block) -> Vec<ExprId> {
  let mut out = Vec::new();
  for node in &block.body {
    match node {
      Node::Switch(switch) => {
        out.push(switch.condition);
        for inner in switch.blocks() {
          out.extend(switch_conditions(inner));
        }
      },
      Node::Block(inner) => out.extend(switch_conditions(inner)),
      Node::TryCatch(region) => {
        for inner in region.blocks() {
          out.extend(switch_conditions(inner));
        }
      },
      Node::Expr(_) | Node::Label(_) => {},
    }
  }
  out
}

/// Underlying integer of the node's inferred enum type.
fn enum_underlying(
  body: &MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
) -> Option<PrimitiveType> {
  let ty = body.expr(id).inferred_type.as_ref()?;
  ctx.types.enum_underlying(ty)
}

fn numeric_type(underlying: PrimitiveType) -> TypeRef {
  if underlying.is_wide() {
    TypeRef::int64()
  } else {
    TypeRef::int32()
  }
}

/// Wraps `id` in place with `code`; the moved node no longer carries an expectation.
fn wrap_as(
  body: &mut MethodBody,
  id: ExprId,
  code: AstCode,
  operand: Operand,
  ty: TypeRef,
) -> ExprId {
  let inner = body.wrap(id, code, operand, ty);
  body.expr_mut(inner).expected_type = None;
  inner
}

fn to_numeric(
  body: &mut MethodBody,
  id: ExprId,
  underlying: PrimitiveType,
) {
  let code = if underlying.is_wide() {
    AstCode::EnumToLong
  } else {
    AstCode::EnumToInt
  };
  wrap_as(body, id, code, Operand::None, numeric_type(underlying));
}

fn to_enum(
  body: &mut MethodBody,
  id: ExprId,
  enum_type: TypeRef,
  underlying: PrimitiveType,
) {
  let code = if underlying.is_wide() {
    AstCode::LongToEnum
  } else {
    AstCode::IntToEnum
  };
  wrap_as(body, id, code, Operand::Type(enum_type.clone()), enum_type);
}

/// `ldc` typed as an enum: the constant field holding that value, or a conversion.
fn enum_constant(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
) {
  let Some(enum_type) = body.expr(id).inferred_type.clone().filter(|ty| ctx.types.is_enum(ty)) else {
    return;
  };
  let value = body.int_constant(id);
  let location = body.expr(id).location;

  let field = enum_type
    .definition_id()
    .zip(value)
    .and_then(|(def, value)| ctx.types.enum_const_field(def, value));
  match field {
    Some(field) => {
      let field = ctx.types.field_ref(&enum_type, field);
      trace_dbg!(ctx, DebugTrace::Enum, "{} constant at {}", field.name(), location);
      body.rewrite(id, AstCode::Ldsfld, Operand::Field(field), Vec::new());
      let expr = body.expr_mut(id);
      expr.inferred_type = Some(enum_type.clone());
      expr.expected_type = Some(enum_type);
    },
    None => {
      let wide = body.code(id) == AstCode::LdcI8;
      let inner = body.push_down(id);
      body.set_type(inner, if wide { TypeRef::int64() } else { TypeRef::int32() });
      let code = if wide {
        AstCode::LongToEnum
      } else {
        AstCode::IntToEnum
      };
      body.rewrite(id, code, Operand::Type(enum_type.clone()), vec![inner]);
      let expr = body.expr_mut(id);
      expr.inferred_type = Some(enum_type.clone());
      expr.expected_type = Some(enum_type);
      trace_dbg!(ctx, DebugTrace::Enum, "{} at {}", code.name(), location);
    },
  }
}

/// Arithmetic typed as an enum. Returns true when the node was rewritten.
fn binary_operation(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
) -> bool {
  let Some(enum_type) = body.expr(id).inferred_type.clone().filter(|ty| ctx.types.is_enum(ty)) else {
    return false;
  };
  let Some(underlying) = ctx.types.enum_underlying(&enum_type) else {
    return false;
  };
  if body.args(id).len() != 2 {
    return false;
  }

  for index in 0..2 {
    let arg = body.arg(id, index);
    numeric_argument(body, arg, underlying);
  }

  let keep_numeric = body.expr(id).expected_type.as_ref().is_some_and(TypeRef::is_primitive);
  body.set_type(id, numeric_type(underlying));
  if !keep_numeric {
    to_enum(body, id, enum_type, underlying);
  }
  trace_dbg!(ctx, DebugTrace::Enum, "{} over enum at {}", body.code(id).name(), body.expr(id).location);
  true
}

/// Operand of a numeric operation: constants keep their value, anything else is converted.
fn numeric_argument(
  body: &mut MethodBody,
  arg: ExprId,
  underlying: PrimitiveType,
) {
  match body.code(arg) {
    AstCode::LdcI4 => body.set_type(arg, TypeRef::int32()),
    AstCode::LdcI8 => body.set_type(arg, TypeRef::int64()),
    _ => to_numeric(body, arg, underlying),
  }
}

/// Inserts conversions where the inferred and expected types disagree about enums.
fn boundary(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
) {
  let expr = body.expr(id);
  let (Some(inferred), Some(expected)) = (expr.inferred_type.clone(), expr.expected_type.clone()) else {
    return;
  };
  if inferred == expected {
    return;
  }
  let types = ctx.types;
  if types.is_internal_enum(&inferred) || types.is_internal_enum(&expected) {
    return;
  }

  if let Some(underlying) = types.enum_underlying(&expected) {
    if types.is_enum(&inferred) {
      to_numeric(body, id, underlying);
    } else if inferred.is_float() {
      let code = if underlying.is_wide() {
        AstCode::ConvI8
      } else {
        AstCode::ConvI4
      };
      wrap_as(body, id, code, Operand::None, numeric_type(underlying));
    }
    to_enum(body, id, expected, underlying);
    trace_dbg!(ctx, DebugTrace::Enum, "to enum at {}", body.expr(id).location);
  } else if let Some(underlying) = types.enum_underlying(&inferred) {
    to_numeric(body, id, underlying);
    trace_dbg!(ctx, DebugTrace::Enum, "from enum at {}", body.expr(id).location);
  }
}
