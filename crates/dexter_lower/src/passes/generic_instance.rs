//! Reification of generic type arguments.
//!
//! The target erases generics, so the type arguments of the current instance
//! or method travel as `Type[]` values. Every type test, type token and array
//! creation that mentions a generic parameter reads the concrete type from
//! there, and calls into members that need their own arguments receive them
//! as extra trailing arguments.

use dexter_ast::{visit, AstCode, ExprId, MethodBody, Operand};
use dexter_config::DebugTrace;
use dexter_diagnostics::DiagnosticMessage;
use dexter_log::trace_dbg;
use dexter_type::types::GenericOwner;
use dexter_type::{names, SourceLocation, Type, TypeRef};

use crate::build;
use crate::context::LoweringContext;
use crate::error::LoweringResult;
use crate::passes::helper_method;

/// How a loaded type is adjusted for its consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
  None,
  /// `Nullable<T>` arguments become their boxed or marker type.
  NullableTypeOf,
  /// Neither a marker class nor a primitive: usable for `instanceof` and arrays.
  EnsureRuntimeType,
}

pub fn run(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
) -> LoweringResult {
  for id in visit::expressions(body, |e| e.is(AstCode::TypeOf) && e.arguments.is_empty()) {
    let Some(ty) = generic_operand(body, id) else {
      continue;
    };
    let location = body.expr(id).location;
    let load = load_type(body, ctx, location, &ty, Conversion::None)?;
    body.copy_from(id, load);
    trace_dbg!(ctx, DebugTrace::Generics, "typeof({}) reified at {}", ctx.type_name(&ty), location);
  }

  for id in visit::expressions(body, |e| e.is(AstCode::SimpleInstanceOf) || e.is(AstCode::SimpleCastclass)) {
    let Some(ty) = generic_operand(body, id).filter(TypeRef::is_generic_parameter) else {
      continue;
    };
    let location = body.expr(id).location;
    let value = body.arg(id, 0);

    if body.code(id) == AstCode::SimpleCastclass {
      // Erased to `Object`; nothing to check against.
      body.copy_from(id, value);
      continue;
    }

    let load = load_type(body, ctx, location, &ty, Conversion::EnsureRuntimeType)?;
    let system_type = ctx.types.system_type();
    let Some(is_instance) = ctx.types.method_named(&system_type, "JavaIsInstance") else {
      return Err(ctx.error(
        DiagnosticMessage::MissingHelperMethod {
          type_name: names::TYPE.to_string(),
          method: "JavaIsInstance".to_string(),
        },
        location,
      ));
    };
    let method = ctx.types.method_ref(&system_type, is_instance);
    body.rewrite(id, AstCode::Call, Operand::Method(method), vec![load, value]);
    body.set_type(id, TypeRef::bool());
    trace_dbg!(ctx, DebugTrace::Generics, "instanceof {} reified at {}", ctx.type_name(&ty), location);
  }

  for id in visit::expressions(body, |e| e.is(AstCode::Newarr)) {
    let Some(element) = generic_operand(body, id) else {
      continue;
    };
    let location = body.expr(id).location;
    let length = body.arg(id, 0);
    let load = load_type(body, ctx, location, &element, Conversion::EnsureRuntimeType)?;
    let instance = body.new_typed(location, AstCode::ArrayNewInstance, Operand::None, vec![load, length], ctx.types.object());
    let array_type = TypeRef::array(element);
    body.rewrite(id, AstCode::SimpleCastclass, Operand::Type(array_type.clone()), vec![instance]);
    body.set_type(id, array_type);
    trace_dbg!(ctx, DebugTrace::Generics, "generic array creation at {}", location);
  }

  for id in visit::expressions(body, |e| e.code.is_call() || e.is(AstCode::Newobj)) {
    let Some(method) = body.expr(id).operand.as_method().cloned() else {
      continue;
    };
    let declaring = method.declaring_type().clone();
    if body.code(id) == AstCode::Newobj && declaring.is_array() {
      multi_dimensional_array(body, ctx, id, &declaring)?;
      continue;
    }
    if declaring.is_array() {
      continue;
    }
    let Some(def) = ctx.types.resolve_method(&method) else {
      continue;
    };
    let (needs_type, needs_method) = (
      def.needs_generic_instance_type_parameter(),
      def.needs_generic_instance_method_parameter() && body.code(id) != AstCode::Newobj,
    );
    let location = body.expr(id).location;

    if needs_type {
      let arguments = declaring.generic_arguments().to_vec();
      if arguments.is_empty() {
        return Err(not_generic_instance(body, ctx, id, ctx.type_name(&declaring)));
      }
      let instance = generic_instance(body, ctx, location, &arguments)?;
      body.expr_mut(id).arguments.push(instance);
    }
    if needs_method {
      let arguments = method.generic_arguments().to_vec();
      if arguments.is_empty() {
        let member = format!("{}::{}", ctx.type_name(&declaring), method.name());
        return Err(not_generic_instance(body, ctx, id, member));
      }
      let instance = generic_instance(body, ctx, location, &arguments)?;
      body.expr_mut(id).arguments.push(instance);
    }
    if needs_type || needs_method {
      trace_dbg!(ctx, DebugTrace::Generics, "generic instance arguments for {} at {}", method.name(), location);
    }
  }

  for id in visit::expressions(body, |e| e.is(AstCode::Delegate)) {
    let Operand::Delegate { method, .. } = body.expr(id).operand.clone() else {
      continue;
    };
    let location = body.expr(id).location;
    let is_static = ctx.types.resolve_method(&method).is_some_and(|def| def.is_static());

    let type_arguments = method.declaring_type().generic_arguments().to_vec();
    if is_static && !type_arguments.is_empty() {
      let instance = generic_instance(body, ctx, location, &type_arguments)?;
      body.expr_mut(id).arguments.push(instance);
    }
    let method_arguments = method.generic_arguments().to_vec();
    if !method_arguments.is_empty() {
      let instance = generic_instance(body, ctx, location, &method_arguments)?;
      body.expr_mut(id).arguments.push(instance);
    }
  }
  Ok(())
}

/// Type operand of `id` when it mentions a generic parameter.
fn generic_operand(
  body: &MethodBody,
  id: ExprId,
) -> Option<TypeRef> {
  body
    .expr(id)
    .operand
    .as_type()
    .filter(|ty| ty.contains_generic_parameter())
    .cloned()
}

fn not_generic_instance(
  body: &MethodBody,
  ctx: &LoweringContext<'_>,
  id: ExprId,
  member: String,
) -> crate::error::LoweringError {
  ctx.error_at(body, id, DiagnosticMessage::UnresolvableGenericInstance { member })
}

/// `InitArrayFromArguments[Type[]](load(arg)...)`.
fn generic_instance(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
  location: SourceLocation,
  arguments: &[TypeRef],
) -> LoweringResult<ExprId> {
  let mut loads = Vec::with_capacity(arguments.len());
  for argument in arguments {
    loads.push(load_type(body, ctx, location, argument, Conversion::NullableTypeOf)?);
  }
  let array_type = TypeRef::array(ctx.types.system_type());
  Ok(body.new_typed(
    location,
    AstCode::InitArrayFromArguments,
    Operand::Type(array_type.clone()),
    loads,
    array_type,
  ))
}

/// `newobj T[,]::.ctor(d0, d1..)` into `(T[,]) ArrayNewInstance2(typeof(T), int[] { d0, d1.. })`.
fn multi_dimensional_array(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
  id: ExprId,
  array_type: &TypeRef,
) -> LoweringResult {
  let Some(element) = array_type.element_type().cloned() else {
    return Ok(());
  };
  let location = body.expr(id).location;
  let dimensions = body.args(id).to_vec();
  let element_type = load_type(body, ctx, location, &element, Conversion::EnsureRuntimeType)?;
  let int_array = TypeRef::array(TypeRef::int32());
  let sizes = body.new_typed(
    location,
    AstCode::InitArrayFromArguments,
    Operand::Type(int_array.clone()),
    dimensions,
    int_array,
  );
  let instance = body.new_typed(
    location,
    AstCode::ArrayNewInstance2,
    Operand::None,
    vec![element_type, sizes],
    ctx.types.object(),
  );
  body.rewrite(id, AstCode::SimpleCastclass, Operand::Type(array_type.clone()), vec![instance]);
  body.set_type(id, array_type.clone());
  trace_dbg!(ctx, DebugTrace::Generics, "multi-dimensional array at {}", location);
  Ok(())
}

/// Expression producing the runtime `Type` for `ty`.
fn load_type(
  body: &mut MethodBody,
  ctx: &mut LoweringContext<'_>,
  location: SourceLocation,
  ty: &TypeRef,
  conversion: Conversion,
) -> LoweringResult<ExprId> {
  let types = ctx.types;

  match ty.kind() {
    Type::Array { element, rank } if ty.contains_generic_parameter() => {
      let element_type = load_type(body, ctx, location, element, conversion)?;
      let mut arguments = vec![element_type];
      if *rank > 1 {
        arguments.push(build::ldc_i4(body, location, *rank as i32));
      }
      let method = helper_method(ctx, names::TYPE_HELPER, "Array", arguments.len())?;
      Ok(build::call(body, location, AstCode::Call, method, arguments))
    },
    Type::ByReference(element) => load_type(body, ctx, location, element, conversion),
    Type::GenericParameter { owner, position, name } => {
      let source = match *owner {
        GenericOwner::Type(def) => {
          if types.type_def(&def).is_imported() {
            return Ok(build::type_of(body, types, location, types.object()));
          }
          if ctx.method.is_class_constructor() {
            ctx.warn(
              DiagnosticMessage::GenericParameterInClassConstructor {
                parameter: name.clone(),
              },
              location,
            );
            return Ok(build::type_of(body, types, location, types.object()));
          }
          if ctx.method.is_static() {
            AstCode::LdGenericInstanceTypeArgument
          } else {
            AstCode::LdGenericInstanceField
          }
        },
        GenericOwner::Method(method) => {
          let declaring = types.method(&method).declaring_type;
          if types.type_def(&declaring).is_imported() {
            return Ok(build::type_of(body, types, location, types.object()));
          }
          AstCode::LdGenericInstanceMethodArgument
        },
      };

      let type_array = TypeRef::array(types.system_type());
      let arguments = body.new_typed(location, source, Operand::None, Vec::new(), type_array);
      let index = build::ldc_i4(body, location, *position as i32);
      let load = body.new_typed(location, AstCode::LdelemRef, Operand::None, vec![arguments, index], types.system_type());
      if conversion == Conversion::EnsureRuntimeType {
        let ensure = helper_method(ctx, names::TYPE_HELPER, "EnsureGenericRuntimeType", 1)?;
        Ok(build::call(body, location, AstCode::Call, ensure, vec![load]))
      } else {
        Ok(load)
      }
    },
    Type::GenericInstance { definition, arguments } => {
      let payload = arguments.first().filter(|_| types.is_nullable(ty));
      match payload {
        Some(payload) if conversion == Conversion::NullableTypeOf => {
          let code = if payload.is_primitive() {
            AstCode::BoxedTypeOf
          } else {
            AstCode::NullableTypeOf
          };
          Ok(body.new_typed(location, code, Operand::Type(payload.clone()), Vec::new(), types.system_type()))
        },
        _ => Ok(build::type_of(body, types, location, TypeRef::definition(*definition))),
      }
    },
    _ => Ok(build::type_of(body, types, location, ty.clone())),
  }
}
