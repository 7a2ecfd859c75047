//! Constructor prologue: creates atomic field updaters in the class
//! constructor and gives enum fields their default value.

use dexter_ast::{AstCode, ExprId, MethodBody, Node, Operand};
use dexter_config::DebugTrace;
use dexter_diagnostics::DiagnosticMessage;
use dexter_log::trace_dbg;
use dexter_type::definition::FieldId;
use dexter_type::{names, PrimitiveType, SourceLocation, TypeRef};

use crate::build;
use crate::context::LoweringContext;
use crate::error::LoweringResult;
use crate::passes::after_base_constructor;

pub fn run(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
) -> LoweringResult {
  let is_cctor = ctx.method.is_class_constructor();
  if !is_cctor && !ctx.method.is_constructor() {
    return Ok(());
  }
  let Some(owner) = ctx.method.declaring_type.definition_id() else {
    return Ok(());
  };

  let types = ctx.types;
  let declaring = ctx.method.declaring_type.clone();
  let fields: Vec<FieldId> = types.type_def(&owner).fields.clone();
  let mut prologue = Vec::new();

  if is_cctor {
    for &field in &fields {
      let def = types.field(&field);
      if def.is_static() {
        continue;
      }
      let updater_name = format!("{}{}", def.name, names::ATOMIC_UPDATER_SUFFIX);
      if let Some(updater) = types.find_field(owner, &updater_name) {
        prologue.push(create_updater(body, ctx, field, updater)?);
      }
    }
  }

  for &field in &fields {
    let def = types.field(&field);
    if def.is_static() != is_cctor || def.is_literal() || !types.is_enum(&def.field_type) {
      continue;
    }

    let location = SourceLocation::NONE;
    let field_ref = types.field_ref(&declaring, field);
    let default = body.new_typed(
      location,
      AstCode::DefaultValue,
      Operand::Type(def.field_type.clone()),
      Vec::new(),
      def.field_type.clone(),
    );
    let store = if is_cctor {
      body.new_typed(location, AstCode::Stsfld, Operand::Field(field_ref), vec![default], def.field_type.clone())
    } else {
      let this = body.new_typed(location, AstCode::Ldthis, Operand::None, Vec::new(), declaring.clone());
      body.new_typed(location, AstCode::Stfld, Operand::Field(field_ref), vec![this, default], def.field_type.clone())
    };
    trace_dbg!(ctx, DebugTrace::Enum, "default value for field {}", def.name);
    prologue.push(store);
  }

  if prologue.is_empty() {
    return Ok(());
  }

  let at = after_base_constructor(body, ctx);
  body.root.body.splice(at..at, prologue.into_iter().map(Node::Expr));
  Ok(())
}

/// `stsfld[f$Updater](call Updater::NewUpdater(typeof(D), [typeof(F),] ldstr "f"))`
fn create_updater(
  body: &mut MethodBody,
  ctx: &LoweringContext<'_>,
  field: FieldId,
  updater: FieldId,
) -> LoweringResult<ExprId> {
  let types = ctx.types;
  let location = SourceLocation::NONE;
  let def = types.field(&field);

  let updater_type = match def.field_type.as_primitive() {
    Some(PrimitiveType::Int32) => names::INT_UPDATER,
    Some(PrimitiveType::Int64) => names::LONG_UPDATER,
    _ => names::REFERENCE_UPDATER,
  };
  let updater_ref = types.type_ref(names::ATOMIC_NAMESPACE, updater_type);
  let Some(new_updater) = types.method_named(&updater_ref, "NewUpdater") else {
    return Err(ctx.error(
      DiagnosticMessage::MissingHelperMethod {
        type_name: updater_type.to_string(),
        method: "NewUpdater".to_string(),
      },
      location,
    ));
  };

  let mut arguments = vec![build::type_of(body, types, location, ctx.method.declaring_type.clone())];
  if updater_type == names::REFERENCE_UPDATER {
    arguments.push(build::type_of(body, types, location, def.field_type.clone()));
  }
  arguments.push(build::ldstr(body, types, location, &def.name));

  let method = types.method_ref(&updater_ref, new_updater);
  let create = build::call(body, location, AstCode::Call, method, arguments);
  let updater_field = types.field_ref(&ctx.method.declaring_type, updater);
  let ty: TypeRef = updater_field.field_type().clone();

  trace_dbg!(ctx, DebugTrace::Atomic, "updater for field {}", def.name);
  Ok(body.new_typed(location, AstCode::Stsfld, Operand::Field(updater_field), vec![create], ty))
}
