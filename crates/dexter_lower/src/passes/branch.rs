//! Branch optimizers.
//!
//! The early optimizer only pulls integer and reference comparisons into
//! their controlling branch. The final one, run after casts and generics are
//! expanded, also handles float and long comparisons and collapses
//! comparisons against 0 and 1.

use dexter_ast::{visit, AstCode, ExprId, MethodBody, Operand};
use dexter_config::DebugTrace;
use dexter_log::trace_dbg;
use dexter_type::{PrimitiveType, TypeRef};

use crate::context::LoweringContext;
use crate::error::LoweringResult;
use crate::typing::result_type;

pub fn run_early(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
) -> LoweringResult {
  pull_comparisons_up(body, ctx, false);
  Ok(())
}

pub fn run_final(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
) -> LoweringResult {
  pull_comparisons_up(body, ctx, true);
  collapse_equal_compares(body, ctx);
  collapse_equal_branches(body, ctx);
  collapse_zero_branches(body, ctx);
  Ok(())
}

/// How a comparison over two operands may be turned into a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operands {
  /// Direct two-operand branch.
  Direct,
  /// Three-way compare of floats followed by a branch on zero.
  Float,
  /// Three-way compare of signed longs followed by a branch on zero.
  Long,
}

fn classify(
  body: &MethodBody,
  ctx: &LoweringContext<'_>,
  compare: AstCode,
  left: ExprId,
  right: ExprId,
) -> Option<Operands> {
  let left = result_type(body, ctx, left)?;
  let right = result_type(body, ctx, right)?;
  let equality = matches!(compare, AstCode::Ceq | AstCode::Cne);

  if left.is_dex_object() && right.is_dex_object() {
    return equality.then_some(Operands::Direct);
  }
  if left != right {
    return None;
  }

  let primitive = left.as_primitive()?;
  match primitive {
    PrimitiveType::Float32 | PrimitiveType::Float64 => Some(Operands::Float),
    PrimitiveType::Int64 => Some(Operands::Long),
    PrimitiveType::UInt64 => None,
    PrimitiveType::UInt16 | PrimitiveType::UInt32 if !equality => None,
    p if p.is_integer() || p == PrimitiveType::Bool => Some(Operands::Direct),
    _ => None,
  }
}

/// NaN-aware three-way compare for a float comparison: the variant whose NaN
/// result makes the branch-on-zero behave like `compare`.
fn float_compare(compare: AstCode) -> AstCode {
  match compare {
    AstCode::Clt | AstCode::Cle | AstCode::CgtUn | AstCode::CgeUn => AstCode::CmpGFloat,
    _ => AstCode::CmpLFloat,
  }
}

/// `brtrue/brfalse(cxx(a, b))` into a direct branch.
fn pull_comparisons_up(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  wide_and_float: bool,
) {
  for id in visit::expressions(body, |e| e.is(AstCode::Brtrue) || e.is(AstCode::Brfalse)) {
    let Some(condition) = body.expr(id).arg(0) else {
      continue;
    };
    let compare = body.code(condition);
    if !compare.is_compare() || body.args(condition).len() != 2 {
      continue;
    }
    let (left, right) = (body.arg(condition, 0), body.arg(condition, 1));
    let negate = body.code(id) == AstCode::Brfalse;

    match classify(body, ctx, compare, left, right) {
      Some(Operands::Direct) => {
        let code = if negate {
          compare.reverse_compare(false)
        } else {
          Some(compare)
        };
        let Some(branch) = code.and_then(AstCode::to_branch) else {
          continue;
        };
        let label = body.expr(id).operand.clone();
        body.rewrite(id, branch, label, vec![left, right]);
        trace_dbg!(ctx, DebugTrace::Branch, "{} at {}", branch.name(), body.expr(id).location);
      },
      Some(kind @ (Operands::Float | Operands::Long)) if wide_and_float => {
        let Some(mut branch) = compare.to_branch_z() else {
          continue;
        };
        if negate {
          let Some(reversed) = branch.reverse_branch_z() else {
            continue;
          };
          branch = reversed;
        }
        let three_way = if kind == Operands::Float {
          float_compare(compare)
        } else {
          AstCode::CmpLong
        };
        body.rewrite(condition, three_way, Operand::None, vec![left, right]);
        body.set_type(condition, TypeRef::int32());
        let label = body.expr(id).operand.clone();
        body.rewrite(id, branch, label, vec![condition]);
        trace_dbg!(ctx, DebugTrace::Branch, "{}({}) at {}", branch.name(), three_way.name(), body.expr(id).location);
      },
      _ => {},
    }
  }
}

/// Second argument `0`/`null` means the comparison is negated, `1` that it is kept.
fn negation_of_constant(
  body: &MethodBody,
  id: ExprId,
) -> Option<bool> {
  let constant = body.expr(id).arg(1)?;
  if body.code(constant) == AstCode::Ldnull {
    return Some(true);
  }
  match body.int_constant(constant)? {
    0 => Some(true),
    1 => Some(false),
    _ => None,
  }
}

/// Inner comparison of `ceq/beq(cxx(a, b), 0|1)` that may be collapsed, plus
/// whether it must be negated.
fn collapsible(
  body: &MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
) -> Option<(ExprId, AstCode)> {
  if body.args(id).len() != 2 {
    return None;
  }
  let negate = negation_of_constant(body, id)?;
  let inner = body.arg(id, 0);
  let compare = body.code(inner);
  if !compare.is_compare() || body.args(inner).len() != 2 {
    return None;
  }
  let (left, right) = (body.arg(inner, 0), body.arg(inner, 1));
  if classify(body, ctx, compare, left, right)? != Operands::Direct {
    return None;
  }
  let code = if negate {
    compare.reverse_compare(false)?
  } else {
    compare
  };
  Some((inner, code))
}

fn collapse_equal_compares(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
) {
  for id in visit::expressions(body, |e| e.is(AstCode::Ceq)).into_iter().rev() {
    let Some((inner, code)) = collapsible(body, ctx, id) else {
      continue;
    };
    let args = body.args(inner).to_vec();
    body.rewrite(id, code, Operand::None, args);
    body.set_type(id, TypeRef::bool());
  }
}

fn collapse_equal_branches(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
) {
  for id in visit::expressions(body, |e| e.is(AstCode::Beq)).into_iter().rev() {
    let Some((inner, code)) = collapsible(body, ctx, id) else {
      continue;
    };
    let Some(branch) = code.to_branch() else {
      continue;
    };
    let args = body.args(inner).to_vec();
    let label = body.expr(id).operand.clone();
    body.rewrite(id, branch, label, args);
  }
}

/// `beq/bne(x, 0|null)` becomes `brfalse/brtrue(x)`.
fn collapse_zero_branches(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
) {
  for id in visit::expressions(body, |e| e.is(AstCode::Beq) || e.is(AstCode::BneUn)).into_iter().rev() {
    if body.args(id).len() != 2 || negation_of_constant(body, id) != Some(true) {
      continue;
    }
    let value = body.arg(id, 0);
    let testable = result_type(body, ctx, value)
      .is_some_and(|ty| ty.is_bool() || ty.is(PrimitiveType::Int32) || ty.is_dex_object());
    if !testable {
      continue;
    }

    let code = if body.code(id) == AstCode::Beq {
      AstCode::Brfalse
    } else {
      AstCode::Brtrue
    };
    let label = body.expr(id).operand.clone();
    body.rewrite(id, code, label, vec![value]);
  }
}
