//! Struct lowering.
//!
//! Structs are heap objects on the target, so value semantics are emulated:
//! addresses become plain loads, constructors on an address become
//! `new` plus a store, and every store of a mutable struct that is not a
//! fresh value goes through the generated `$Clone`.

use dexter_ast::{visit, AstCode, ExprId, ExprPair, MethodBody, Operand};
use dexter_config::DebugTrace;
use dexter_diagnostics::DiagnosticMessage;
use dexter_log::trace_dbg;
use dexter_type::{names, MethodRef, SourceLocation, TypeRef};

use crate::build;
use crate::context::LoweringContext;
use crate::error::LoweringResult;
use crate::passes::{is_this, parameter_of};
use crate::typing::result_type;

pub fn run(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
) -> LoweringResult {
  for pair in visit::expression_pairs(body, |_| true) {
    let id = pair.expr;
    match body.code(id) {
      AstCode::Call | AstCode::Callvirt | AstCode::Calli => lower_call(body, ctx, id)?,
      AstCode::Newobj => clone_struct_arguments(body, ctx, id)?,
      AstCode::DefaultValue => {
        let Some(ty) = body.expr(id).operand.as_type().cloned() else {
          continue;
        };
        if ctx.types.is_struct(&ty) {
          let location = body.expr(id).location;
          let value = struct_default(body, ctx, &ty, location)?;
          body.copy_from(id, value);
        }
      },
      AstCode::Newarr => initialize_array(body, ctx, pair)?,
      AstCode::Ldloca | AstCode::Ldflda | AstCode::Ldsflda | AstCode::Ldelema => address_to_load(body, id),
      AstCode::Ldobj => collapse_load_object(body, id),
      AstCode::Initobj => initialize_object(body, ctx, id)?,
      AstCode::Stloc => store_local(body, ctx, id)?,
      AstCode::Stfld | AstCode::Stsfld => {
        let Some(ty) = body.expr(id).operand.as_field().map(|f| f.field_type().clone()) else {
          continue;
        };
        let Some(index) = body.args(id).len().checked_sub(1) else {
          continue;
        };
        clone_if_needed(body, ctx, id, index, &ty)?;
      },
      code if code.is_stelem() => {
        let array = body.arg(id, 0);
        let Some(ty) = result_type(body, ctx, array).and_then(|a| a.element_type().cloned()) else {
          continue;
        };
        clone_if_needed(body, ctx, id, 2, &ty)?;
      },
      AstCode::Stobj => {
        let Some(ty) = body.expr(id).operand.as_type().cloned() else {
          continue;
        };
        if ctx.types.is_struct(&ty) && !ctx.types.is_immutable_struct(&ty) {
          let copy_from = struct_method(ctx, &ty, names::STRUCT_COPY_FROM, 1, body.expr(id).location)?;
          let arguments = body.args(id).to_vec();
          body.rewrite(id, AstCode::Call, Operand::Method(copy_from), arguments);
          body.set_type(id, TypeRef::void());
        }
      },
      AstCode::Box => {
        let Some(ty) = body.expr(id).operand.as_type().cloned() else {
          continue;
        };
        let Some(inner) = body.expr(id).arg(0) else {
          continue;
        };
        // box(ldobj(this)) is the receiver itself.
        if ctx.types.is_struct(&ty) && body.code(inner) == AstCode::Ldobj {
          let target = body.arg(inner, 0);
          if is_this(body, target) {
            body.copy_from(id, target);
            body.set_type(id, ty);
          }
        }
      },
      _ => {},
    }
  }
  Ok(())
}

/// Instance method of a struct by name and arity; fatal when missing.
fn struct_method(
  ctx: &LoweringContext<'_>,
  ty: &TypeRef,
  name: &str,
  param_count: usize,
  location: SourceLocation,
) -> LoweringResult<MethodRef> {
  let found = ty.definition_id().and_then(|def| {
    ctx.types.type_def(&def).methods.iter().copied().find(|id| {
      let method = ctx.types.method(id);
      method.name == name && !method.is_static() && method.parameters.len() == param_count
    })
  });
  match found {
    Some(id) => Ok(ctx.types.method_ref(ty, id)),
    None if name == names::CONSTRUCTOR => Err(ctx.error(
      DiagnosticMessage::MissingDefaultConstructor {
        type_name: ctx.type_name(ty),
      },
      location,
    )),
    None => Err(ctx.error(
      DiagnosticMessage::MissingStructMethod {
        type_name: ctx.type_name(ty),
        method: name.to_string(),
      },
      location,
    )),
  }
}

/// Default instance: the shared `$Default` field of an immutable struct, a
/// default-constructed one otherwise.
pub(crate) fn struct_default(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  ty: &TypeRef,
  location: SourceLocation,
) -> LoweringResult<ExprId> {
  if ctx.types.is_immutable_struct(ty) {
    let Some(field) = ctx.types.field_named(ty, names::STRUCT_DEFAULT_FIELD) else {
      return Err(ctx.error(
        DiagnosticMessage::MissingDefaultField {
          type_name: ctx.type_name(ty),
        },
        location,
      ));
    };
    let field = ctx.types.field_ref(ty, field);
    let load = build::ldsfld(body, location, field);
    body.set_type(load, ty.clone());
    return Ok(load);
  }

  let ctor = struct_method(ctx, ty, names::CONSTRUCTOR, 0, location)?;
  Ok(body.new_typed(location, AstCode::Newobj, Operand::Method(ctor), Vec::new(), ty.clone()))
}

/// Default value of any type, as stored by `initobj`.
fn default_of(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  ty: &TypeRef,
  location: SourceLocation,
) -> LoweringResult<ExprId> {
  if ctx.types.is_struct(ty) {
    struct_default(body, ctx, ty, location)
  } else if ctx.types.is_nullable(ty) {
    Ok(build::ldnull(body, location, ty.clone()))
  } else {
    Ok(build::zero_value(body, location, ty))
  }
}

fn is_fresh(
  body: &MethodBody,
  id: ExprId,
) -> bool {
  matches!(body.code(id), AstCode::Newobj | AstCode::DefaultValue)
}

/// Replaces argument `index` of `parent` with `$Clone(value)` when `ty` is a
/// mutable struct and the value is not fresh.
///
/// The value keeps its id so the rest of the walk still reaches it.
fn clone_if_needed(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  parent: ExprId,
  index: usize,
  ty: &TypeRef,
) -> LoweringResult {
  let value = body.arg(parent, index);
  if !ctx.types.is_struct(ty) || ctx.types.is_immutable_struct(ty) || is_fresh(body, value) {
    return Ok(());
  }
  let location = body.expr(value).location;
  let clone = struct_method(ctx, ty, names::STRUCT_CLONE, 0, location)?;
  let cloned = body.new_typed(location, AstCode::Call, Operand::Method(clone), vec![value], ty.clone());
  body.expr_mut(parent).arguments[index] = cloned;
  trace_dbg!(ctx, DebugTrace::Struct, "clone of {} at {}", ctx.type_name(ty), location);
  Ok(())
}

fn address_to_load(
  body: &mut MethodBody,
  id: ExprId,
) {
  address_to_load_type(body, id);
  let expr = body.expr_mut(id);
  expr.code = match expr.code {
    AstCode::Ldloca => AstCode::Ldloc,
    AstCode::Ldflda => AstCode::Ldfld,
    AstCode::Ldsflda => AstCode::Ldsfld,
    _ => AstCode::LdelemAny,
  };
  if expr.expected_type.as_ref().is_some_and(TypeRef::is_by_reference) {
    expr.expected_type = None;
  }
}

/// `ldobj` of a local, `this` or an address is the stored object itself.
fn collapse_load_object(
  body: &mut MethodBody,
  id: ExprId,
) {
  let Some(target) = body.expr(id).arg(0) else {
    return;
  };
  let code = body.code(target);
  if matches!(code, AstCode::Ldloca | AstCode::Ldflda | AstCode::Ldsflda | AstCode::Ldelema) {
    address_to_load(body, target);
  } else if !matches!(code, AstCode::Ldloc | AstCode::Ldthis) {
    return;
  }

  let ty = body.expr(id).inferred_type.clone();
  body.copy_from(id, target);
  match ty {
    Some(ty) if !ty.is_by_reference() => body.set_type(id, ty),
    _ => address_to_load_type(body, id),
  }
}

/// Strips the by-reference layer off the inferred type of `id`.
fn address_to_load_type(
  body: &mut MethodBody,
  id: ExprId,
) {
  let expr = body.expr_mut(id);
  if let Some(element) = expr
    .inferred_type
    .as_ref()
    .filter(|ty| ty.is_by_reference())
    .and_then(|ty| ty.element_type())
    .cloned()
  {
    expr.inferred_type = Some(element);
  }
}

/// Rebuilds `id` as the store into the storage `target` addresses.
fn store_into(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
  target: ExprId,
  value: ExprId,
  ty: &TypeRef,
) -> LoweringResult {
  let location = body.expr(id).location;
  let target_expr = body.expr(target);
  let operand = target_expr.operand.clone();
  let target_args = target_expr.arguments.clone();

  match target_expr.code {
    _ if is_this(body, target) => {
      let copy_from = struct_method(ctx, ty, names::STRUCT_COPY_FROM, 1, location)?;
      let receiver = body.new_typed(location, AstCode::Ldthis, Operand::None, Vec::new(), ty.clone());
      body.rewrite(id, AstCode::Call, Operand::Method(copy_from), vec![receiver, value]);
      body.set_type(id, TypeRef::void());
      return Ok(());
    },
    AstCode::Ldloca | AstCode::Ldloc => body.rewrite(id, AstCode::Stloc, operand, vec![value]),
    AstCode::Ldflda | AstCode::Ldfld => {
      let mut arguments = target_args;
      arguments.push(value);
      body.rewrite(id, AstCode::Stfld, operand, arguments);
    },
    AstCode::Ldsflda | AstCode::Ldsfld => body.rewrite(id, AstCode::Stsfld, operand, vec![value]),
    AstCode::Ldelema | AstCode::LdelemAny => {
      let mut arguments = target_args;
      arguments.push(value);
      body.rewrite(id, AstCode::StelemAny, Operand::None, arguments);
    },
    code => {
      return Err(ctx.error(
        DiagnosticMessage::UnexpectedOpcode {
          opcode: code.name().to_string(),
          context: format!("store of {}", ctx.type_name(ty)),
        },
        location,
      ));
    },
  }
  body.set_type(id, ty.clone());
  Ok(())
}

fn lower_call(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
) -> LoweringResult {
  let expr = body.expr(id);
  let Some(method) = expr.operand.as_method().cloned() else {
    return Ok(());
  };
  let target_type = expr.constrained_type().cloned().unwrap_or_else(|| method.declaring_type().clone());

  if ctx.types.is_struct(&target_type) && !ctx.types.is_nullable(method.declaring_type()) {
    let receiver = expr.arg(0);
    let on_address = receiver.is_some_and(|r| !is_this(body, r));
    if method.is_constructor() && on_address {
      return construct_into(body, ctx, id, method);
    }

    // `ldobj(ldloc p)` receiver through a by-reference `this`.
    if method.has_this() {
      if let Some(receiver) = receiver.filter(|&r| body.code(r) == AstCode::Ldobj) {
        let inner = body.arg(receiver, 0);
        let byref_local = body.code(inner) == AstCode::Ldloc
          && body.expr(inner).inferred_type.as_ref().is_some_and(TypeRef::is_by_reference);
        if byref_local {
          body.copy_from(receiver, inner);
          address_to_load_type(body, receiver);
        }
      }
    }
  }

  clone_struct_arguments(body, ctx, id)
}

/// `call S::.ctor(addr, args..)` into `store(addr, newobj S::.ctor(args..))`.
fn construct_into(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
  method: MethodRef,
) -> LoweringResult {
  let location = body.expr(id).location;
  let arguments = body.args(id).to_vec();
  let ty = method.declaring_type().clone();
  let newobj = body.new_typed(location, AstCode::Newobj, Operand::Method(method), arguments[1..].to_vec(), ty.clone());
  clone_struct_arguments(body, ctx, newobj)?;
  store_into(body, ctx, id, arguments[0], newobj, &ty)?;
  trace_dbg!(ctx, DebugTrace::Struct, "constructor of {} as new at {}", ctx.type_name(&ty), location);
  Ok(())
}

/// Arguments bound to mutable struct parameters are cloned unless fresh.
fn clone_struct_arguments(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
) -> LoweringResult {
  let Some(method) = body.expr(id).operand.as_method() else {
    return Ok(());
  };
  if method.name() == names::STRUCT_CLONE || method.name() == names::STRUCT_COPY_FROM {
    return Ok(());
  }

  for index in 0..body.args(id).len() {
    let Some(param) = parameter_of(body, ctx, id, index) else {
      continue;
    };
    if param.by_ref {
      continue;
    }
    clone_if_needed(body, ctx, id, index, &param.ty)?;
  }
  Ok(())
}

/// `initobj(addr)` into a store of the type's default value.
fn initialize_object(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
) -> LoweringResult {
  let Some(ty) = body.expr(id).operand.as_type().cloned() else {
    return Ok(());
  };
  let location = body.expr(id).location;
  let target = body.arg(id, 0);
  let value = default_of(body, ctx, &ty, location)?;
  store_into(body, ctx, id, target, value, &ty)?;
  trace_dbg!(ctx, DebugTrace::Struct, "initobj {} at {}", ctx.type_name(&ty), location);
  Ok(())
}

fn store_local(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
) -> LoweringResult {
  let Some(variable) = body.expr(id).operand.as_variable() else {
    return Ok(());
  };
  let var = body.variable(variable);
  let (ty, assigns_this) = (var.ty.clone(), var.is_this());
  if !ctx.types.is_struct(&ty) {
    return Ok(());
  }
  if assigns_this {
    // Assigning `this` mutates the receiver in place.
    let location = body.expr(id).location;
    let copy_from = struct_method(ctx, &ty, names::STRUCT_COPY_FROM, 1, location)?;
    let receiver = body.new_typed(location, AstCode::Ldthis, Operand::None, Vec::new(), ty);
    let value = body.arg(id, 0);
    body.rewrite(id, AstCode::Call, Operand::Method(copy_from), vec![receiver, value]);
    body.set_type(id, TypeRef::void());
    return Ok(());
  }
  clone_if_needed(body, ctx, id, 0, &ty)
}

/// `newarr` of structs and enums gets every element pre-filled.
fn initialize_array(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  pair: ExprPair,
) -> LoweringResult {
  let id = pair.expr;
  let Some(element) = body.expr(id).operand.as_type().cloned() else {
    return Ok(());
  };
  let code = if ctx.types.is_enum(&element) {
    AstCode::InitEnumArray
  } else if ctx.types.is_struct(&element) {
    AstCode::InitStructArray
  } else {
    return Ok(());
  };
  if pair.parent.is_some_and(|p| body.code(p) == code) {
    return Ok(());
  }

  let location = body.expr(id).location;
  if code == AstCode::InitStructArray {
    // Fails early when the element type cannot be default-constructed.
    if ctx.types.is_immutable_struct(&element) {
      if ctx.types.field_named(&element, names::STRUCT_DEFAULT_FIELD).is_none() {
        return Err(ctx.error(
          DiagnosticMessage::MissingDefaultField {
            type_name: ctx.type_name(&element),
          },
          location,
        ));
      }
    } else {
      struct_method(ctx, &element, names::CONSTRUCTOR, 0, location)?;
    }
  }

  body.wrap(id, code, Operand::Type(element.clone()), TypeRef::array(element));
  trace_dbg!(ctx, DebugTrace::Struct, "{} at {}", code.name(), location);
  Ok(())
}
