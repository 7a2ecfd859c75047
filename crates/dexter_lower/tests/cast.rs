mod common;

use common::{count, Fixture, Tree};
use dexter_ast::{AstCode, Operand};
use dexter_lower::passes::{cast, generics};
use dexter_type::{names, TypeRef};
use insta::assert_snapshot;

#[test]
fn plain_isinst_is_a_guarded_cast() {
  let fx = Fixture::new();
  let mut tree = Tree::new(&fx);
  let o = tree.local("o", fx.types.object());
  let c = tree.local("c", fx.counter());

  let load = tree.ldloc(o);
  let test = tree.with_type(AstCode::Isinst, fx.counter(), vec![load], fx.counter());
  let store = tree.stloc(c, test);
  tree.stmt(store);

  tree.run(cast::run).unwrap();

  assert_snapshot!(tree.print(), @r###"
  stloc[c](conditional(simpleinstanceof[Counter](ldloc[o]), simplecastclass[Counter](ldloc[o]), ldnull))
  "###);
}

#[test]
fn isinst_under_a_null_test_is_a_type_test() {
  let fx = Fixture::new();
  let mut tree = Tree::new(&fx);
  let o = tree.local("o", fx.types.object());
  let r = tree.local("r", TypeRef::bool());
  let label = tree.label("found");

  let load = tree.ldloc(o);
  let test = tree.with_type(AstCode::Isinst, fx.counter(), vec![load], fx.counter());
  let jump = tree.branch(AstCode::Brtrue, label, vec![test]);
  tree.stmt(jump);

  let load = tree.ldloc(o);
  let test = tree.with_type(AstCode::Isinst, fx.counter(), vec![load], fx.counter());
  let not_null = tree.typed(AstCode::CIsNotNull, Operand::None, vec![test], TypeRef::bool());
  let store = tree.stloc(r, not_null);
  tree.stmt(store);

  let load = tree.ldloc(o);
  let test = tree.with_type(AstCode::Isinst, fx.counter(), vec![load], fx.counter());
  let null = tree.typed(AstCode::CIsNull, Operand::None, vec![test], TypeRef::bool());
  let store = tree.stloc(r, null);
  tree.stmt(store);

  tree.run(cast::run).unwrap();

  assert_snapshot!(tree.print(), @r###"
  found:
  brtrue[found](simpleinstanceof[Counter](ldloc[o]))
  stloc[r](simpleinstanceof[Counter](ldloc[o]))
  stloc[r](ceq(simpleinstanceof[Counter](ldloc[o]), ldc.i4[0]))
  "###);
}

#[test]
fn primitive_isinst_is_a_simple_type_test() {
  let fx = Fixture::new();
  let mut tree = Tree::new(&fx);
  let o = tree.local("o", fx.types.object());
  let r = tree.local("r", TypeRef::bool());

  let load = tree.ldloc(o);
  let test = tree.with_type(AstCode::Isinst, TypeRef::int32(), vec![load], fx.types.object());
  let store = tree.stloc(r, test);
  tree.stmt(store);

  tree.run(cast::run).unwrap();

  assert_snapshot!(tree.print(), @"stloc[r](simpleinstanceof[int32](ldloc[o]))");
  assert_eq!(tree.body.expr(test).inferred_type, Some(TypeRef::bool()));
}

#[test]
fn casts_to_arrays_and_collections_use_helpers() {
  let fx = Fixture::new();
  let mut tree = Tree::new(&fx);
  let o = tree.local("o", fx.types.object());
  let array = fx.interface(names::SYSTEM, names::ARRAY);
  let list = fx.interface(names::SYSTEM_COLLECTIONS, "IList");
  let a = tree.local("a", array.clone());
  let l = tree.local("l", list.clone());
  let c = tree.local("c", fx.counter());

  let load = tree.ldloc(o);
  let cast = tree.with_type(AstCode::Castclass, array.clone(), vec![load], array);
  let store = tree.stloc(a, cast);
  tree.stmt(store);

  let load = tree.ldloc(o);
  let cast = tree.with_type(AstCode::Castclass, list.clone(), vec![load], list);
  let store = tree.stloc(l, cast);
  tree.stmt(store);

  let load = tree.ldloc(o);
  let cast = tree.with_type(AstCode::Castclass, fx.counter(), vec![load], fx.counter());
  let store = tree.stloc(c, cast);
  tree.stmt(store);

  tree.run(cast::run).unwrap();

  assert_snapshot!(tree.print(), @r###"
  stloc[a](call[CompilerHelper::CastToArray](ldloc[o]))
  stloc[l](conditional(simpleinstanceof[IList](ldloc[o]), simplecastclass[IList](ldloc[o]), call[CompilerHelper::CastToList](ldloc[o])))
  stloc[c](simplecastclass[Counter](ldloc[o]))
  "###);
}

#[test]
fn collection_type_tests_also_accept_arrays() {
  let fx = Fixture::new();
  let mut tree = Tree::new(&fx);
  let o = tree.local("o", fx.types.object());
  let r = tree.local("r", TypeRef::bool());
  let enumerable = fx.interface(names::SYSTEM_COLLECTIONS, "IEnumerable");

  let load = tree.ldloc(o);
  let test = tree.with_type(AstCode::InstanceOf, enumerable, vec![load], TypeRef::bool());
  let store = tree.stloc(r, test);
  tree.stmt(store);

  tree.run(cast::run).unwrap();

  assert_snapshot!(tree.print(), @r###"
  stloc[r](or(simpleinstanceof[IEnumerable](ldloc[o]), call[CompilerHelper::IsArray](ldloc[o])))
  "###);
}

#[test]
fn generic_collection_type_tests_stay_plain() {
  let fx = Fixture::new();
  let mut tree = Tree::new(&fx);
  let o = tree.local("o", fx.types.object());
  let r = tree.local("r", TypeRef::bool());
  let Some(definition) = fx.types.find_type(names::SYSTEM_COLLECTIONS_GENERIC, "IEnumerable`1") else {
    panic!("no IEnumerable`1");
  };
  let enumerable = TypeRef::generic_instance(definition, vec![TypeRef::int32()]);

  let load = tree.ldloc(o);
  let test = tree.with_type(AstCode::InstanceOf, enumerable, vec![load], TypeRef::bool());
  let store = tree.stloc(r, test);
  tree.stmt(store);

  tree.run(cast::run).unwrap();

  // Arrays never match a generic collection interface.
  assert_snapshot!(tree.print(), @"stloc[r](simpleinstanceof[IEnumerable<int32>](ldloc[o]))");
  assert_eq!(count(&tree.body, |e| e.is(AstCode::Call)), 0);
}

#[test]
fn guarded_cast_evaluates_its_operand_once() {
  let fx = Fixture::new();
  let mut tree = Tree::new(&fx);
  let c = tree.local("c", fx.counter());
  let list = fx.interface(names::SYSTEM_COLLECTIONS, "IList");
  let l = tree.local("l", list.clone());

  let load = tree.ldloc(c);
  let next = fx.method(&fx.counter(), "Next", 0);
  let call = tree.call(AstCode::Callvirt, next, vec![load]);
  let cast = tree.with_type(AstCode::Castclass, list.clone(), vec![call], list);
  let store = tree.stloc(l, cast);
  tree.stmt(store);

  tree.run(cast::run).unwrap();

  let printed = tree.print();
  assert_eq!(count(&tree.body, |e| e.is(AstCode::Callvirt)), 1, "{}", printed);
  assert_eq!(count(&tree.body, |e| e.is(AstCode::Ldloc) && e.operand != Operand::Variable(c)), 2, "{}", printed);
  assert!(printed.starts_with("stloc[l](conditional(simpleinstanceof[IList](stloc[tmp]("), "{}", printed);
}

#[test]
fn generic_parameters_erase_to_object() {
  let fx = Fixture::new();
  let mut tree = Tree::new(&fx);
  let t = fx.box_parameter();
  let value = tree.param("value", t.clone());
  let items = tree.local("items", TypeRef::array(t.clone()));
  let ints = tree.local("ints", TypeRef::array(TypeRef::int32()));
  let o = tree.local("o", fx.types.object());
  let x = tree.local("x", t.clone());

  let load = tree.ldloc(value);
  let boxed = tree.with_type(AstCode::Box, t.clone(), vec![load], fx.types.object());
  let store = tree.stloc(o, boxed);
  tree.stmt(store);

  let load = tree.ldloc(o);
  let unboxed = tree.with_type(AstCode::UnboxAny, t.clone(), vec![load], t.clone());
  let store = tree.stloc(x, unboxed);
  tree.stmt(store);

  let array = tree.ldloc(items);
  let index = tree.ldc(0);
  let element = tree.with_type(AstCode::LdelemAny, t.clone(), vec![array, index], t);
  let store = tree.stloc(x, element);
  tree.stmt(store);

  let array = tree.ldloc(ints);
  let index = tree.ldc(1);
  let seven = tree.ldc(7);
  let stored = tree.typed(AstCode::StelemAny, Operand::None, vec![array, index, seven], TypeRef::int32());
  tree.stmt(stored);

  tree.run(generics::run).unwrap();

  assert_snapshot!(tree.print(), @r###"
  stloc[o](ldloc[value])
  stloc[x](unbox.generic[T](ldloc[o]))
  stloc[x](ldelem.ref(ldloc[items], ldc.i4[0]))
  stelem.i4(ldloc[ints], ldc.i4[1], ldc.i4[7])
  "###);
}
