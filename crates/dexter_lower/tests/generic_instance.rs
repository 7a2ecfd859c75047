mod common;

use common::{Fixture, Tree};
use dexter_ast::{AstCode, Operand};
use dexter_lower::passes::{generic_instance, type_of};
use dexter_lower::{MethodSource, MethodSourceFlags};
use dexter_type::{names, SourceLocation, TypeRef};
use insta::assert_snapshot;

fn in_box<'a>(
  fx: &'a Fixture,
  flags: MethodSourceFlags,
) -> Tree<'a> {
  let source = MethodSource::new("Run", TypeRef::definition(fx.boxed)).with_flags(flags);
  Tree::new(fx).in_method(source)
}

#[test]
fn instance_methods_read_type_arguments_from_the_instance() {
  let fx = Fixture::new();
  let mut tree = in_box(&fx, MethodSourceFlags::empty());
  let t = fx.box_parameter();
  let system_type = fx.types.system_type();
  let token = tree.local("token", system_type.clone());
  let items = tree.local("items", TypeRef::array(t.clone()));

  let token_of = tree.with_type(AstCode::TypeOf, t.clone(), Vec::new(), system_type.clone());
  let store = tree.stloc(token, token_of);
  tree.stmt(store);

  let array_of = tree.with_type(AstCode::TypeOf, TypeRef::array(t.clone()), Vec::new(), system_type);
  let store = tree.stloc(token, array_of);
  tree.stmt(store);

  let length = tree.ldc(3);
  let created = tree.with_type(AstCode::Newarr, t.clone(), vec![length], TypeRef::array(t.clone()));
  let store = tree.stloc(items, created);
  tree.stmt(store);

  let create = fx.method(&fx.box_of(t), "Create", 0);
  let call = tree.call(AstCode::Call, create, Vec::new());
  tree.ret(call);

  tree.run(generic_instance::run).unwrap();

  assert_snapshot!(tree.print(), @r###"
  stloc[token](ldelem.ref(ldgenericinstancefield, ldc.i4[0]))
  stloc[token](call[TypeHelper::Array](ldelem.ref(ldgenericinstancefield, ldc.i4[0])))
  stloc[items](simplecastclass[T[]](array.newinstance(call[TypeHelper::EnsureGenericRuntimeType](ldelem.ref(ldgenericinstancefield, ldc.i4[0])), ldc.i4[3])))
  ret(call[Box<T>::Create](initarray.args[Type[]](ldelem.ref(ldgenericinstancefield, ldc.i4[0]))))
  "###);
}

#[test]
fn static_methods_read_the_type_argument_parameter() {
  let fx = Fixture::new();
  let mut tree = in_box(&fx, MethodSourceFlags::STATIC);
  let t = fx.box_parameter();
  let o = tree.local("o", fx.types.object());
  let b = tree.local("b", TypeRef::bool());

  let load = tree.ldloc(o);
  let test = tree.with_type(AstCode::SimpleInstanceOf, t.clone(), vec![load], TypeRef::bool());
  let store = tree.stloc(b, test);
  tree.stmt(store);

  let load = tree.ldloc(o);
  let cast = tree.with_type(AstCode::SimpleCastclass, t.clone(), vec![load], t);
  tree.ret(cast);

  tree.run(generic_instance::run).unwrap();

  assert_snapshot!(tree.print(), @r###"
  stloc[b](call[Type::JavaIsInstance](call[TypeHelper::EnsureGenericRuntimeType](ldelem.ref(ldgenericinstancetypearg, ldc.i4[0])), ldloc[o]))
  ret(ldloc[o])
  "###);
}

#[test]
fn concrete_instances_pass_their_arguments_as_type_tokens() {
  let fx = Fixture::new();
  let mut tree = Tree::new(&fx);

  let create = fx.method(&fx.box_of(fx.nullable_of(TypeRef::int32())), "Create", 0);
  let call = tree.call(AstCode::Call, create, Vec::new());
  tree.stmt(call);

  let create = fx.method(&fx.box_of(fx.point()), "Create", 0);
  let call = tree.call(AstCode::Call, create, Vec::new());
  tree.stmt(call);

  let get = fx.method(&fx.box_of(fx.point()), "Get", 0);
  let this = tree.ldnull();
  let call = tree.call(AstCode::Callvirt, get, vec![this]);
  tree.stmt(call);

  tree.run(generic_instance::run).unwrap();

  assert_snapshot!(tree.print(), @r###"
  call[Box<Nullable<int32>>::Create](initarray.args[Type[]](boxedtypeof[int32]))
  call[Box<Point>::Create](initarray.args[Type[]](typeof[Point]))
  callvirt[Box<Point>::Get](ldnull)
  "###);
}

#[test]
fn class_constructors_fall_back_to_object_with_a_warning() {
  let fx = Fixture::new();
  let mut tree = in_box(&fx, MethodSourceFlags::STATIC | MethodSourceFlags::CLASS_CONSTRUCTOR);
  let system_type = fx.types.system_type();
  let token_of = tree.with_type(AstCode::TypeOf, fx.box_parameter(), Vec::new(), system_type);
  tree.ret(token_of);

  tree.run(generic_instance::run).unwrap();

  assert_snapshot!(tree.print(), @"ret(typeof[Object])");
  assert_eq!(tree.warnings.len(), 1);
  assert_eq!(tree.warnings[0].error_code, "W0002");
}

#[test]
fn open_declaring_type_is_an_error() {
  let fx = Fixture::new();
  let mut tree = Tree::new(&fx);
  let create = fx.method(&TypeRef::definition(fx.boxed), "Create", 0);
  let call = tree.call(AstCode::Call, create, Vec::new());
  tree.body.expr_mut(call).location = SourceLocation::at_offset(4);
  tree.stmt(call);

  let error = tree.run(generic_instance::run).unwrap_err();

  assert_eq!(error.code(), "L0001");
  assert_eq!(error.location, SourceLocation::at_offset(4));
}

#[test]
fn type_handles_become_type_tokens() {
  let fx = Fixture::new();
  let mut tree = Tree::new(&fx);
  let system_type = fx.types.system_type();
  let from_handle = fx.method(&system_type, "GetTypeFromHandle", 1);
  let token = tree.local("token", system_type.clone());

  let handle_type = fx.types.type_ref(names::SYSTEM, names::RUNTIME_TYPE_HANDLE);
  let handle = tree.with_type(AstCode::Ldtoken, fx.counter(), Vec::new(), handle_type);
  let call = tree.call(AstCode::Call, from_handle.clone(), vec![handle]);
  let store = tree.stloc(token, call);
  tree.stmt(store);

  // Not a token: left as a call.
  let other = tree.ldnull();
  let call = tree.call(AstCode::Call, from_handle, vec![other]);
  let store = tree.stloc(token, call);
  tree.stmt(store);

  tree.run(type_of::run).unwrap();

  assert_snapshot!(tree.print(), @r###"
  stloc[token](typeof[Counter])
  stloc[token](call[Type::GetTypeFromHandle](ldnull))
  "###);
  assert!(matches!(tree.body.expr(tree.body.arg(store, 0)).operand, Operand::Method(_)));
}
