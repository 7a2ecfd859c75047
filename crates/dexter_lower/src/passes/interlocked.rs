//! Emulates `System.Threading.Interlocked`.
//!
//! A field with a generated `f$Updater` companion goes through the atomic
//! field updater; anything else is wrapped in a monitor over the field's
//! owner.

use dexter_ast::{visit, AstCode, Block, ExprId, MethodBody, Node, Operand, TryCatchBlock};
use dexter_config::DebugTrace;
use dexter_diagnostics::DiagnosticMessage;
use dexter_log::trace_dbg;
use dexter_type::{names, FieldRef, MethodRef, SourceLocation, TypeRef};

use crate::build;
use crate::context::LoweringContext;
use crate::error::LoweringResult;
use crate::typing::result_type_or_object;

/// Statement to wrap in `monitorenter(lock); try { .. } finally { monitorexit(lock) }`.
struct Locked {
  statement: ExprId,
  enter: ExprId,
  exit: ExprId,
}

pub fn run(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
) -> LoweringResult {
  let types = ctx.types;
  let mut locked = Vec::new();

  for statement in visit::statements(body) {
    let calls = visit::subtree_pairs(body, statement, |e| {
      e.is(AstCode::Call) && e.operand.as_method().is_some_and(|m| types.is_interlocked(m.declaring_type()))
    });
    if calls.len() > 1 {
      return Err(ctx.error_at(
        body,
        calls[1].expr,
        DiagnosticMessage::MultipleInterlockedCalls { count: calls.len() },
      ));
    }
    let Some(call) = calls.first().copied() else {
      continue;
    };

    let Some(address) = body.expr(call.expr).arg(0) else {
      continue;
    };
    let address_code = body.code(address);
    if !matches!(address_code, AstCode::Ldflda | AstCode::Ldsflda | AstCode::Ldelema) {
      continue;
    }

    if address_code == AstCode::Ldflda {
      let field = body.expr(address).operand.as_field().cloned();
      if let Some(updater) = field.as_ref().and_then(|f| updater_field(ctx, f)) {
        rewrite_through_updater(body, ctx, call.expr, call.parent, address, updater)?;
        continue;
      }
    }

    locked.push(lock_statement(body, ctx, statement, call.expr, address)?);
  }

  for Locked { statement, enter, exit } in locked {
    let Some((nodes, index)) = body.root.locate_mut(statement) else {
      continue;
    };
    let region = TryCatchBlock {
      try_block: Block::new(vec![Node::Expr(statement)]),
      catches: Vec::new(),
      finally_block: Some(Block::new(vec![Node::Expr(exit)])),
      fault_block: None,
    };
    nodes.splice(index..=index, [Node::Expr(enter), Node::TryCatch(region)]);
  }
  Ok(())
}

fn updater_field(
  ctx: &LoweringContext<'_>,
  field: &FieldRef,
) -> Option<FieldRef> {
  if field.is_static() {
    return None;
  }
  let name = format!("{}{}", field.name(), names::ATOMIC_UPDATER_SUFFIX);
  let id = ctx.types.field_named(field.declaring_type(), &name)?;
  Some(ctx.types.field_ref(field.declaring_type(), id))
}

fn updater_method_name(interlocked: &str) -> Option<&'static str> {
  let name = match interlocked {
    "Increment" => "IncrementAndGet",
    "Decrement" => "DecrementAndGet",
    "Add" => "AddAndGet",
    "Read" => "Get",
    "Exchange" => "GetAndSet",
    "CompareExchange" => "CompareExchange",
    _ => return None,
  };
  Some(name)
}

fn updater_method(
  ctx: &LoweringContext<'_>,
  updater: &FieldRef,
  name: &str,
  location: SourceLocation,
) -> LoweringResult<MethodRef> {
  let updater_type = updater.field_type();
  match ctx.types.method_named(updater_type, name) {
    Some(id) => Ok(ctx.types.method_ref(updater_type, id)),
    None => Err(ctx.error(
      DiagnosticMessage::MissingHelperMethod {
        type_name: ctx.type_name(updater_type),
        method: name.to_string(),
      },
      location,
    )),
  }
}

/// `Interlocked.X(ldflda[f](obj), args..)` into
/// `callvirt Updater::Y(ldsfld[f$Updater], obj, args..)`.
fn rewrite_through_updater(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  call: ExprId,
  parent: Option<ExprId>,
  address: ExprId,
  updater: FieldRef,
) -> LoweringResult {
  let expr = body.expr(call);
  let location = expr.location;
  let interlocked = expr.operand.as_method().map(|m| m.name().to_string()).unwrap_or_default();
  let Some(name) = updater_method_name(&interlocked) else {
    return Err(ctx.error(
      DiagnosticMessage::UnexpectedOpcode {
        opcode: format!("Interlocked.{}", interlocked),
        context: "atomic field updater".to_string(),
      },
      location,
    ));
  };
  let original_type = result_type_or_object(body, ctx, call);
  let rest: Vec<ExprId> = expr.arguments[1..].to_vec();
  let instance = body.arg(address, 0);

  if name == "CompareExchange" {
    if let Some(parent) = parent {
      if compare_and_set(body, ctx, parent, call, &updater, instance, &rest)? {
        return Ok(());
      }
    }
  }

  let method = updater_method(ctx, &updater, name, location)?;
  let load_updater = build::ldsfld(body, location, updater.clone());
  let mut arguments = vec![load_updater, instance];
  arguments.extend(rest);
  body.rewrite(call, AstCode::Callvirt, Operand::Method(method), arguments);
  body.set_type(call, original_type);

  trace_dbg!(ctx, DebugTrace::Atomic, "{} through {} at {}", interlocked, updater.name(), location);
  Ok(())
}

/// `ceq/cne/beq/bne(CompareExchange(ref f, v, c), c)` into a compare-and-set.
fn compare_and_set(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  parent: ExprId,
  call: ExprId,
  updater: &FieldRef,
  instance: ExprId,
  rest: &[ExprId],
) -> LoweringResult<bool> {
  let parent_code = body.code(parent);
  if !matches!(parent_code, AstCode::Ceq | AstCode::Cne | AstCode::Beq | AstCode::BneUn) || rest.len() != 2 {
    return Ok(false);
  }
  let (value, comparand) = (rest[0], rest[1]);
  let args = body.args(parent);
  if args.len() != 2 || args[0] != call {
    return Ok(false);
  }
  let other = args[1];
  if !body.same_tree(other, comparand) || !body.is_side_effect_free(other) {
    return Ok(false);
  }

  let location = body.expr(parent).location;
  let method = updater_method(ctx, updater, "CompareAndSet", location)?;
  let load_updater = build::ldsfld(body, location, updater.clone());
  body.rewrite(
    call,
    AstCode::Callvirt,
    Operand::Method(method),
    vec![load_updater, instance, comparand, value],
  );
  body.set_type(call, TypeRef::bool());

  let label = body.expr(parent).operand.clone();
  match parent_code {
    AstCode::Ceq => body.copy_from(parent, call),
    AstCode::Cne => {
      let zero = build::ldc_i4(body, location, 0);
      body.rewrite(parent, AstCode::Ceq, Operand::None, vec![call, zero]);
      body.set_type(parent, TypeRef::bool());
    },
    AstCode::Beq => body.rewrite(parent, AstCode::Brtrue, label, vec![call]),
    _ => body.rewrite(parent, AstCode::Brfalse, label, vec![call]),
  }

  trace_dbg!(ctx, DebugTrace::Atomic, "compare-and-set through {} at {}", updater.name(), location);
  Ok(true)
}

fn lock_statement(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
  statement: ExprId,
  call: ExprId,
  address: ExprId,
) -> LoweringResult<Locked> {
  let location = body.expr(call).location;
  let operation = body.expr(call).operand.as_method().map(|m| m.name().to_string()).unwrap_or_default();
  let target = match body.expr(address).operand.as_field() {
    Some(field) => format!("{}::{}", ctx.type_name(field.declaring_type()), field.name()),
    None => "array element".to_string(),
  };

  if ctx.method.is_state_machine() {
    return Err(ctx.error(DiagnosticMessage::LockInStateMachine { target }, location));
  }
  ctx.warn(DiagnosticMessage::InterlockedFallback { operation, target }, location);

  let (enter, exit) = match body.code(address) {
    AstCode::Ldsflda => {
      let owner = body
        .expr(address)
        .operand
        .as_field()
        .map(|f| f.declaring_type().clone())
        .unwrap_or_else(|| ctx.method.declaring_type.clone());
      let enter = build::type_of(body, ctx.types, location, owner.clone());
      let exit = build::type_of(body, ctx.types, location, owner);
      (enter, exit)
    },
    _ => {
      let owner = body.arg(address, 0);
      if body.is_bare_load(owner) {
        (body.duplicate_subtree(owner), body.duplicate_subtree(owner))
      } else {
        let ty = result_type_or_object(body, ctx, owner);
        let tmp = body.new_temporary("lock", ty);
        let moved = body.push_down(owner);
        let reload = build::ldloc(body, location, tmp);
        body.copy_from(owner, reload);
        (build::stloc(body, location, tmp, moved), build::ldloc(body, location, tmp))
      }
    },
  };

  let enter = body.new_typed(location, AstCode::MonitorEnter, Operand::None, vec![enter], TypeRef::void());
  let exit = body.new_typed(location, AstCode::MonitorExit, Operand::None, vec![exit], TypeRef::void());
  trace_dbg!(ctx, DebugTrace::Atomic, "locking fallback at {}", location);
  Ok(Locked { statement, enter, exit })
}
