//! Null tests and unordered float comparisons.
//!
//! The target has dedicated null tests and only ordered float compares, so
//! `cxx.un` over floats is expressed as the negation of its ordered complement.

use dexter_ast::{visit, AstCode, ExprId, MethodBody, Operand};
use dexter_config::DebugTrace;
use dexter_log::trace_dbg;
use dexter_type::TypeRef;

use crate::build;
use crate::context::LoweringContext;
use crate::error::LoweringResult;
use crate::typing::result_type;

pub fn run(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
) -> LoweringResult {
  let compares = visit::expressions(body, |e| e.code.is_compare() && e.arguments.len() == 2);

  for id in compares {
    if null_test(body, id) {
      trace_dbg!(ctx, DebugTrace::Branch, "{} at {}", body.code(id).name(), body.expr(id).location);
      continue;
    }
    unordered_float(body, ctx, id);
  }
  Ok(())
}

fn is_null(
  body: &MethodBody,
  id: ExprId,
) -> bool {
  body.code(id) == AstCode::Ldnull
}

/// `ceq/cne/cgt.un` against `ldnull` into `CIsNull` / `CIsNotNull`.
fn null_test(
  body: &mut MethodBody,
  id: ExprId,
) -> bool {
  let (left, right) = (body.arg(id, 0), body.arg(id, 1));
  let code = body.code(id);

  let (test, value) = match code {
    AstCode::CgtUn | AstCode::Cne if is_null(body, right) => (AstCode::CIsNotNull, left),
    AstCode::Ceq if is_null(body, right) => (AstCode::CIsNull, left),
    AstCode::Ceq if is_null(body, left) => (AstCode::CIsNull, right),
    _ => return false,
  };

  body.rewrite(id, test, Operand::None, vec![value]);
  body.set_type(id, TypeRef::bool());
  true
}

/// `cxx.un(a, b)` over floats into `ceq(cyy(a, b), 0)`.
fn unordered_float(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
) {
  let code = body.code(id);
  if !code.is_unsigned_compare() {
    return;
  }
  let left = body.arg(id, 0);
  let float = result_type(body, ctx, left).is_some_and(|ty| ty.is_float());
  if !float {
    return;
  }
  let Some(ordered) = code.reverse_compare(true) else {
    return;
  };

  let location = body.expr(id).location;
  let inner = body.push_down(id);
  body.rewrite(inner, ordered, Operand::None, body.args(inner).to_vec());
  body.set_type(inner, TypeRef::bool());
  let zero = build::ldc_i4(body, location, 0);
  body.rewrite(id, AstCode::Ceq, Operand::None, vec![inner, zero]);
  body.set_type(id, TypeRef::bool());
  trace_dbg!(ctx, DebugTrace::Branch, "{} as !{} at {}", code.name(), ordered.name(), location);
}
