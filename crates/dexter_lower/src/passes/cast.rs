//! Casts, `isinst` and `instanceof`.
//!
//! Target arrays do not implement the collection interfaces and target
//! numbers do not implement `IFormattable`, so tests against those types
//! consult the runtime helpers when the plain type test fails.

use dexter_ast::{visit, AstCode, ExprId, MethodBody, Operand};
use dexter_config::DebugTrace;
use dexter_log::trace_dbg;
use dexter_type::{names, TypeRef};

use crate::build::{self, Reused};
use crate::context::LoweringContext;
use crate::error::LoweringResult;
use crate::passes::helper_method;
use crate::typing::result_type;

/// Which helper family applies to a target type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Special {
  Array,
  /// `CastTo<suffix>` / `As<suffix>`; `generic` for the `IFoo<T>` forms.
  Helper { suffix: &'static str, generic: bool },
}

fn special(
  ctx: &LoweringContext<'_>,
  ty: &TypeRef,
) -> Option<Special> {
  let types = ctx.types;
  if types.is_system_array(ty) {
    return Some(Special::Array);
  }
  if let Some((interface, generic)) = types.collection_interface(ty) {
    return Some(Special::Helper {
      suffix: interface.helper_suffix(),
      generic,
    });
  }
  if types.is_formattable(ty) {
    return Some(Special::Helper {
      suffix: "Formattable",
      generic: false,
    });
  }
  None
}

pub fn run(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
) -> LoweringResult {
  for pair in visit::expression_pairs(body, |e| e.is(AstCode::Isinst)) {
    let id = pair.expr;
    if body.code(id) != AstCode::Isinst {
      continue;
    }
    let null_tested = pair.parent.is_some_and(|p| {
      matches!(
        body.code(p),
        AstCode::CIsNotNull | AstCode::CIsNull | AstCode::Brtrue | AstCode::Brfalse
      )
    });
    match pair.parent.filter(|_| null_tested) {
      Some(parent) => null_tested_isinst(body, ctx, id, parent),
      None => isinst(body, ctx, id)?,
    }
  }

  for id in visit::expressions(body, |e| e.is(AstCode::InstanceOf)) {
    instance_of(body, ctx, id)?;
  }

  for id in visit::expressions(body, |e| e.is(AstCode::Castclass)) {
    castclass(body, ctx, id)?;
  }

  for id in visit::expressions(body, |e| e.is(AstCode::Callvirt)) {
    array_enumerator(body, ctx, id);
  }

  if let Some(Special::Helper { suffix, .. }) = special(ctx, &ctx.method.return_type) {
    if suffix != "Formattable" {
      for id in visit::expressions(body, |e| e.is(AstCode::Ret) && e.arguments.len() == 1) {
        return_array(body, ctx, id, suffix)?;
      }
    }
  }

  for id in visit::expressions(body, |e| e.is(AstCode::Call)) {
    is_assignable_from(body, ctx, id)?;
  }
  Ok(())
}

/// `CompilerHelper.<name>(args)`, typed `ty`.
fn helper_call(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
  name: &str,
  arguments: Vec<ExprId>,
  ty: TypeRef,
) -> LoweringResult<ExprId> {
  let location = body.expr(id).location;
  let method = helper_method(ctx, names::COMPILER_HELPER, name, arguments.len())?;
  Ok(body.new_typed(location, AstCode::Call, Operand::Method(method), arguments, ty))
}

/// Rewrites `id` into `Conditional(SimpleInstanceOf(T, x), SimpleCastclass(T, x'), otherwise(x''))`
/// with `x` evaluated once.
fn guarded_cast(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
  ty: &TypeRef,
  fallback: Option<&str>,
) -> LoweringResult {
  let location = body.expr(id).location;
  let value = body.arg(id, 0);
  let reused = Reused::new(body, ctx, value);

  let test = body.new_typed(location, AstCode::SimpleInstanceOf, Operand::Type(ty.clone()), vec![value], TypeRef::bool());
  let again = reused.load(body, location);
  let cast = body.new_typed(location, AstCode::SimpleCastclass, Operand::Type(ty.clone()), vec![again], ty.clone());
  let otherwise = match fallback {
    Some(name) => {
      let again = reused.load(body, location);
      helper_call(body, ctx, id, name, vec![again], ctx.types.object())?
    },
    None => build::ldnull(body, location, ctx.types.object()),
  };

  body.rewrite(id, AstCode::Conditional, Operand::None, vec![test, cast, otherwise]);
  body.set_type(id, ty.clone());
  Ok(())
}

fn castclass(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
) -> LoweringResult {
  let Some(ty) = body.expr(id).operand.as_type().cloned() else {
    return Ok(());
  };
  let location = body.expr(id).location;

  match special(ctx, &ty) {
    Some(Special::Array) => {
      let arguments = body.args(id).to_vec();
      let call = helper_call(body, ctx, id, "CastToArray", arguments, ty.clone())?;
      body.copy_from(id, call);
    },
    Some(Special::Helper { suffix, .. }) => guarded_cast(body, ctx, id, &ty, Some(&format!("CastTo{}", suffix)))?,
    None => {
      body.expr_mut(id).code = AstCode::SimpleCastclass;
      return Ok(());
    },
  }
  trace_dbg!(ctx, DebugTrace::Cast, "castclass {} expanded at {}", ctx.type_name(&ty), location);
  Ok(())
}

fn isinst(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
) -> LoweringResult {
  let Some(ty) = body.expr(id).operand.as_type().cloned() else {
    return Ok(());
  };
  let location = body.expr(id).location;

  if ty.is_primitive() {
    body.expr_mut(id).code = AstCode::SimpleInstanceOf;
    body.set_type(id, TypeRef::bool());
    return Ok(());
  }

  match special(ctx, &ty) {
    Some(Special::Array) => {
      let arguments = body.args(id).to_vec();
      let call = helper_call(body, ctx, id, "AsArray", arguments, ty.clone())?;
      body.copy_from(id, call);
    },
    Some(Special::Helper { suffix, .. }) => guarded_cast(body, ctx, id, &ty, Some(&format!("As{}", suffix)))?,
    None => guarded_cast(body, ctx, id, &ty, None)?,
  }
  trace_dbg!(ctx, DebugTrace::Cast, "isinst {} expanded at {}", ctx.type_name(&ty), location);
  Ok(())
}

/// `isinst` feeding a null test is a type test: the `isinst` becomes an
/// `instanceof` and the null test collapses onto it.
fn null_tested_isinst(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
  parent: ExprId,
) {
  let location = body.expr(id).location;
  body.expr_mut(id).code = AstCode::InstanceOf;
  body.set_type(id, TypeRef::bool());

  match body.code(parent) {
    AstCode::CIsNotNull => body.copy_from(parent, id),
    AstCode::CIsNull => {
      let zero = build::ldc_i4(body, location, 0);
      body.rewrite(parent, AstCode::Ceq, Operand::None, vec![id, zero]);
      body.set_type(parent, TypeRef::bool());
    },
    _ => {},
  }
  trace_dbg!(ctx, DebugTrace::Cast, "null-tested isinst as type test at {}", location);
}

fn instance_of(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
) -> LoweringResult {
  let Some(ty) = body.expr(id).operand.as_type().cloned() else {
    return Ok(());
  };
  let location = body.expr(id).location;

  let helper = match special(ctx, &ty) {
    Some(Special::Array) => {
      let arguments = body.args(id).to_vec();
      let call = helper_call(body, ctx, id, "IsArray", arguments, TypeRef::bool())?;
      body.copy_from(id, call);
      trace_dbg!(ctx, DebugTrace::Cast, "instanceof Array at {}", location);
      return Ok(());
    },
    Some(Special::Helper { suffix: "Formattable", .. }) => "IsVirtualFormattable",
    Some(Special::Helper { generic: false, .. }) => "IsArray",
    Some(Special::Helper { generic: true, .. }) | None => {
      body.expr_mut(id).code = AstCode::SimpleInstanceOf;
      return Ok(());
    },
  };

  // `SimpleInstanceOf(T, x) || helper(x')`
  let value = body.arg(id, 0);
  let reused = Reused::new(body, ctx, value);
  let test = body.push_down(id);
  body.expr_mut(test).code = AstCode::SimpleInstanceOf;
  body.set_type(test, TypeRef::bool());
  let again = reused.load(body, location);
  let fallback = helper_call(body, ctx, id, helper, vec![again], TypeRef::bool())?;
  body.rewrite(id, AstCode::Or, Operand::None, vec![test, fallback]);
  body.set_type(id, TypeRef::bool());
  trace_dbg!(ctx, DebugTrace::Cast, "instanceof {} with {} at {}", ctx.type_name(&ty), helper, location);
  Ok(())
}

/// `IEnumerable.IEnumerable_GetEnumerator(array)` retargets to `Array.GetEnumerator`.
fn array_enumerator(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
) {
  let expr = body.expr(id);
  let Some(method) = expr.operand.as_method() else {
    return;
  };
  let enumerable = ctx
    .types
    .collection_interface(method.declaring_type())
    .is_some_and(|(interface, generic)| !generic && interface.helper_suffix() == "Enumerable");
  if !enumerable || method.name() != "IEnumerable_GetEnumerator" || expr.arguments.len() != 1 {
    return;
  }
  let on_array = result_type(body, ctx, expr.arguments[0]).is_some_and(|ty| ty.is_array());
  if !on_array {
    return;
  }

  let Some(array) = ctx.types.find_type(names::SYSTEM, names::ARRAY) else {
    return;
  };
  let Some(get_enumerator) = ctx.types.find_method(array, "GetEnumerator", Some(0)) else {
    return;
  };
  let location = expr.location;
  body.expr_mut(id).operand = Operand::Method(ctx.types.method_ref_of(get_enumerator));
  trace_dbg!(ctx, DebugTrace::Cast, "array enumerator at {}", location);
}

/// `ret(array)` from a method returning a collection interface.
fn return_array(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
  suffix: &str,
) -> LoweringResult {
  let value = body.arg(id, 0);
  let is_array = body.expr(value).inferred_type.as_ref().is_some_and(TypeRef::is_array);
  if !is_array {
    return Ok(());
  }
  let inner = body.push_down(value);
  let method = helper_method(ctx, names::COMPILER_HELPER, &format!("As{}", suffix), 1)?;
  body.rewrite(value, AstCode::Call, Operand::Method(method), vec![inner]);
  body.set_type(value, ctx.types.object());
  trace_dbg!(ctx, DebugTrace::Cast, "returned array as {} at {}", suffix, body.expr(id).location);
  Ok(())
}

/// `typeof(I).IsAssignableFrom(x)` for a non-generic collection interface
/// also accepts array types.
fn is_assignable_from(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
) -> LoweringResult {
  let expr = body.expr(id);
  let Some(method) = expr.operand.as_method().cloned() else {
    return Ok(());
  };
  if !ctx.types.is_system_type(method.declaring_type()) || method.name() != "IsAssignableFrom" || expr.arguments.len() != 2 {
    return Ok(());
  }
  let (receiver, argument) = (expr.arguments[0], expr.arguments[1]);
  let Some(ty) = body.expr(receiver).operand.as_type().filter(|_| body.code(receiver) == AstCode::TypeOf) else {
    return Ok(());
  };
  let collection = ctx.types.collection_interface(ty).is_some_and(|(_, generic)| !generic);
  if !collection {
    return Ok(());
  }

  let location = body.expr(id).location;
  let Some(get_is_array) = ctx.types.method_named(method.declaring_type(), "GetIsArray") else {
    return Ok(());
  };
  let get_is_array = ctx.types.method_ref(method.declaring_type(), get_is_array);
  let reused = Reused::new(body, ctx, argument);
  let original = body.push_down(id);
  let again = reused.load(body, location);
  let is_array = build::call(body, location, AstCode::Callvirt, get_is_array, vec![again]);
  body.rewrite(id, AstCode::Or, Operand::None, vec![original, is_array]);
  body.set_type(id, TypeRef::bool());
  trace_dbg!(ctx, DebugTrace::Cast, "IsAssignableFrom also accepts arrays at {}", location);
  Ok(())
}
