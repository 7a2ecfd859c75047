mod common;

use common::{evaluate, Fixture, Tree, Value};
use dexter_ast::{AstCode, Operand};
use dexter_lower::passes::{enum_optimizer, enums};
use dexter_type::TypeRef;
use insta::assert_snapshot;

#[test]
fn enum_constants_load_the_member_field() {
  let fx = Fixture::new();
  let mut tree = Tree::new(&fx);
  let c = tree.local("c", fx.color());
  let d = tree.local("d", fx.color());

  let green = tree.typed(AstCode::LdcI4, Operand::Int(1), Vec::new(), fx.color());
  let store = tree.stloc(c, green);
  tree.stmt(store);

  let unnamed = tree.typed(AstCode::LdcI4, Operand::Int(7), Vec::new(), fx.color());
  let store = tree.stloc(d, unnamed);
  tree.stmt(store);

  tree.run(enums::run).unwrap();

  assert_snapshot!(tree.print(), @r###"
  stloc[c](ldsfld[Color::Green])
  stloc[d](int_to_enum[Color](ldc.i4[7]))
  "###);
}

#[test]
fn ordering_compares_work_on_the_underlying_value() {
  let fx = Fixture::new();
  let mut tree = Tree::new(&fx);
  let c = tree.local("c", fx.color());
  let d = tree.local("d", fx.color());
  let r = tree.local("r", TypeRef::bool());
  let left = tree.ldloc(c);
  let right = tree.ldloc(d);
  let less = tree.typed(AstCode::Clt, Operand::None, vec![left, right], TypeRef::bool());
  let store = tree.stloc(r, less);
  tree.stmt(store);

  tree.run(enums::run).unwrap();

  assert_snapshot!(tree.print(), @r###"
  stloc[r](clt(enum_to_int(ldloc[c]), enum_to_int(ldloc[d])))
  "###);
}

#[test]
fn enum_read_where_integer_expected_is_converted() {
  let fx = Fixture::new();
  let mut tree = Tree::new(&fx);
  let c = tree.local("c", fx.color());
  let n = tree.local("n", TypeRef::int32());
  let load = tree.ldloc(c);
  tree.body.expr_mut(load).expected_type = Some(TypeRef::int32());
  let store = tree.stloc(n, load);
  tree.stmt(store);

  tree.run(enums::run).unwrap();

  assert_snapshot!(tree.print(), @r###"
  stloc[n](enum_to_int(ldloc[c]))
  "###);
}

#[test]
fn optimizer_removes_round_trips_and_folds_members() {
  let fx = Fixture::new();
  let mut tree = Tree::new(&fx);
  let n = tree.local("n", TypeRef::int32());
  let c = tree.local("c", fx.color());
  let x = tree.local("x", TypeRef::int32());

  let load = tree.ldloc(n);
  let to_enum = tree.with_type(AstCode::IntToEnum, fx.color(), vec![load], fx.color());
  let back = tree.typed(AstCode::EnumToInt, Operand::None, vec![to_enum], TypeRef::int32());
  let store = tree.stloc(x, back);
  tree.stmt(store);

  let blue = fx.field(&fx.color(), "Blue");
  let member = tree.ldsfld(blue);
  let folded = tree.typed(AstCode::EnumToInt, Operand::None, vec![member], TypeRef::int32());
  let store = tree.stloc(x, folded);
  tree.stmt(store);

  let load = tree.ldloc(c);
  let value = tree.typed(AstCode::EnumToInt, Operand::None, vec![load], TypeRef::int32());
  let conv = tree.typed(AstCode::ConvI4, Operand::None, vec![value], TypeRef::int32());
  let store = tree.stloc(x, conv);
  tree.stmt(store);

  tree.run(enum_optimizer::run).unwrap();

  assert_snapshot!(tree.print(), @r###"
  stloc[x](ldloc[n])
  stloc[x](ldc.i4[2])
  stloc[x](enum_to_int(ldloc[c]))
  "###);
}

#[test]
fn mixed_width_equality_widens_the_narrow_side() {
  let fx = Fixture::new();
  let mut tree = Tree::new(&fx);
  let c = tree.local("c", fx.color());
  let l = tree.local("l", TypeRef::int64());
  let r = tree.local("r", TypeRef::bool());
  let load = tree.ldloc(c);
  let value = tree.typed(AstCode::EnumToInt, Operand::None, vec![load], TypeRef::int32());
  let wide = tree.ldloc(l);
  let equal = tree.typed(AstCode::Ceq, Operand::None, vec![value, wide], TypeRef::bool());
  let store = tree.stloc(r, equal);
  tree.stmt(store);

  tree.run(enum_optimizer::run).unwrap();

  assert_snapshot!(tree.print(), @r###"
  stloc[r](ceq(conv.i8(enum_to_int(ldloc[c])), ldloc[l]))
  "###);
}

#[test]
fn lowered_enum_comparison_evaluates_like_the_source() {
  let fx = Fixture::new();
  let mut tree = Tree::new(&fx);
  let c = tree.local("c", fx.color());
  let blue = tree.typed(AstCode::LdcI4, Operand::Int(2), Vec::new(), fx.color());
  let store = tree.stloc(c, blue);
  tree.stmt(store);

  let load = tree.ldloc(c);
  let bound = tree.typed(AstCode::LdcI4, Operand::Int(1), Vec::new(), fx.color());
  let greater = tree.typed(AstCode::Cgt, Operand::None, vec![load, bound], TypeRef::bool());
  tree.ret(greater);

  tree.lower().unwrap();

  assert_eq!(evaluate(&fx, &tree.body), Some(Value::Bool(true)));
  assert_snapshot!(tree.print(), @r###"
  stloc[c](ldsfld[Color::Blue])
  ret(cgt(enum_to_int(ldloc[c]), ldc.i4[1]))
  "###);
}
