mod common;

use common::{Fixture, Tree};
use dexter_ast::{AstCode, Operand};
use dexter_lower::passes::{conversions, field_init, set_next};
use dexter_lower::{MethodSource, MethodSourceFlags};
use dexter_type::{names, PrimitiveType, TypeRef};
use insta::assert_snapshot;

#[test]
fn integer_constants_take_the_width_of_their_slot() {
  let fx = Fixture::new();
  let mut tree = Tree::new(&fx);
  let l = tree.local("l", TypeRef::int64());
  let d = tree.local("d", TypeRef::float64());
  let n = tree.local("n", TypeRef::int32());

  let three = tree.ldc(3);
  tree.body.expr_mut(three).expected_type = Some(TypeRef::int64());
  let store = tree.stloc(l, three);
  tree.stmt(store);

  let two = tree.ldc(2);
  tree.body.expr_mut(two).expected_type = Some(TypeRef::float64());
  let store = tree.stloc(d, two);
  tree.stmt(store);

  let one = tree.ldc(1);
  let store = tree.stloc(n, one);
  tree.stmt(store);

  tree.run(conversions::ldc_wide).unwrap();

  assert_snapshot!(tree.print(), @r###"
  stloc[l](ldc.i8[3L])
  stloc[d](ldc.r8[2])
  stloc[n](ldc.i4[1])
  "###);
  assert_eq!(tree.body.expr(three).inferred_type, Some(TypeRef::int64()));
}

#[test]
fn conversion_of_a_local_to_its_own_type_is_dropped() {
  let fx = Fixture::new();
  let mut tree = Tree::new(&fx);
  let n = tree.local("n", TypeRef::int32());
  let l = tree.local("l", TypeRef::int64());
  let m = tree.local("m", TypeRef::int32());

  let load = tree.ldloc(n);
  let conv = tree.typed(AstCode::ConvI4, Operand::None, vec![load], TypeRef::int32());
  let store = tree.stloc(m, conv);
  tree.stmt(store);

  let load = tree.ldloc(l);
  let conv = tree.typed(AstCode::ConvI4, Operand::None, vec![load], TypeRef::int32());
  let store = tree.stloc(m, conv);
  tree.stmt(store);

  tree.run(conversions::ldloc_with_conversion).unwrap();

  assert_snapshot!(tree.print(), @r###"
  stloc[m](ldloc[n])
  stloc[m](conv.i4(ldloc[l]))
  "###);
}

#[test]
fn unsigned_bytes_are_masked_after_load() {
  let fx = Fixture::new();
  let mut tree = Tree::new(&fx);
  let x = tree.local("x", TypeRef::int32());
  let small = fx.field(&fx.counter(), "small");

  let this = tree.ldthis();
  let load = tree.ldfld(small, this);
  let store = tree.stloc(x, load);
  tree.stmt(store);

  tree.run(conversions::convert_after_load).unwrap();

  assert_snapshot!(tree.print(), @"stloc[x](int_to_ubyte(ldfld[Counter::small](ldthis)))");
}

#[test]
fn wide_values_are_narrowed_before_a_narrow_store() {
  let fx = Fixture::new();
  let mut tree = Tree::new(&fx);
  let n = tree.local("n", TypeRef::int32());
  let small = fx.field(&fx.counter(), "small");

  let this = tree.ldthis();
  let load = tree.ldloc(n);
  let store = tree.stfld(small.clone(), this, load);
  tree.stmt(store);

  let this = tree.ldthis();
  let constant = tree.ldc(200);
  let store = tree.stfld(small, this, constant);
  tree.stmt(store);

  tree.run(conversions::convert_before_store).unwrap();

  assert_snapshot!(tree.print(), @r###"
  stfld[Counter::small](ldthis, conv.u1(ldloc[n]))
  stfld[Counter::small](ldthis, ldc.i4[200])
  "###);
  let value = tree.body.arg(tree.body.root.body[0].as_expr().unwrap(), 1);
  assert_eq!(tree.body.expr(value).inferred_type, Some(TypeRef::primitive(PrimitiveType::Byte)));
}

#[test]
fn cleanup_removes_redundant_conversions_and_empty_statements() {
  let fx = Fixture::new();
  let mut tree = Tree::new(&fx);
  let n = tree.local("n", TypeRef::int32());
  let x = tree.local("x", TypeRef::int32());

  let load = tree.ldloc(n);
  let inner = tree.typed(AstCode::ConvI4, Operand::None, vec![load], TypeRef::int32());
  let outer = tree.typed(AstCode::ConvI4, Operand::None, vec![inner], TypeRef::int32());
  let store = tree.stloc(x, outer);
  tree.stmt(store);

  let nop = tree.op(AstCode::Nop, Vec::new());
  tree.stmt(nop);

  let load = tree.ldloc(x);
  tree.ret(load);

  tree.run(conversions::cleanup).unwrap();

  assert_snapshot!(tree.print(), @r###"
  stloc[x](ldloc[n])
  ret(ldloc[x])
  "###);
}

#[test]
fn restart_guards_precede_every_located_statement() {
  let fx = Fixture::new();
  let mut tree = Tree::new(&fx);
  let a = tree.local("a", TypeRef::int32());

  let one = tree.ldc(1);
  let store = tree.stloc(a, one);
  tree.located(store);

  let two = tree.ldc(2);
  let store = tree.stloc(a, two);
  tree.stmt(store);

  let load = tree.ldloc(a);
  let ret = tree.typed(AstCode::Ret, Operand::None, vec![load], TypeRef::void());
  tree.located(ret);

  tree.run(set_next::run).unwrap();

  assert_snapshot!(tree.print(), @r###"
  stloc[$restart](ldc.i4[0])
  $restart_target:
  stloc[$restart](ldc.i4[0])
  brtrue[$restart_target](ldloc[$restart])
  stloc[a](ldc.i4[1])
  stloc[a](ldc.i4[2])
  brtrue[$restart_target](ldloc[$restart])
  ret(ldloc[a])
  "###);
}

#[test]
fn instance_constructors_default_enum_fields() {
  let fx = Fixture::new();
  let source = MethodSource::new(names::CONSTRUCTOR, fx.counter()).with_flags(MethodSourceFlags::CONSTRUCTOR);
  let mut tree = Tree::new(&fx).in_method(source);
  let ret = tree.op(AstCode::Ret, Vec::new());
  tree.stmt(ret);

  tree.run(field_init::run).unwrap();

  assert_snapshot!(tree.print(), @r###"
  stfld[Counter::shade](ldthis, defaultvalue[Color])
  ret
  "###);
}

#[test]
fn class_constructors_create_field_updaters() {
  let fx = Fixture::new();
  let source = MethodSource::new(names::CLASS_CONSTRUCTOR, fx.counter())
    .with_flags(MethodSourceFlags::CLASS_CONSTRUCTOR | MethodSourceFlags::STATIC);
  let mut tree = Tree::new(&fx).in_method(source);
  let ret = tree.op(AstCode::Ret, Vec::new());
  tree.stmt(ret);

  tree.run(field_init::run).unwrap();

  assert_snapshot!(tree.print(), @r###"
  stsfld[Counter::count$Updater](call[AtomicIntegerFieldUpdater::NewUpdater](typeof[Counter], ldstr["count"]))
  ret
  "###);
}

#[test]
fn ordinary_methods_get_no_prologue() {
  let fx = Fixture::new();
  let mut tree = Tree::new(&fx);
  let ret = tree.op(AstCode::Ret, Vec::new());
  tree.stmt(ret);

  tree.run(field_init::run).unwrap();

  assert_eq!(tree.print(), "ret\n");
}
