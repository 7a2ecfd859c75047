#![allow(dead_code)]

use dexter_ast::{AstCode, ExprId, MethodBody, Node, Operand, Variable, VariableFlags};
use dexter_config::DexterConfig;
use dexter_driver::MethodInput;
use dexter_lower::MethodSource;
use dexter_type::definition::{FieldFlags, TypeDefId};
use dexter_type::{names, FieldRef, MethodRef, SourceLocation, TypeRef, TypeSystem};

/// Runtime support plus one class with two integer fields.
pub struct Fixture {
  pub types: TypeSystem,
  pub counter: TypeDefId,
}

impl Fixture {
  pub fn new() -> Self {
    let mut builder = TypeSystem::builder().with_runtime_support();
    let counter = builder.class("Demo", "Counter");
    builder.add_field(counter, "count", TypeRef::int32(), FieldFlags::empty());
    builder.add_field(counter, "total", TypeRef::int32(), FieldFlags::empty());

    Self {
      types: builder.build(),
      counter,
    }
  }

  pub fn counter(&self) -> TypeRef {
    TypeRef::definition(self.counter)
  }

  pub fn field(
    &self,
    name: &str,
  ) -> FieldRef {
    let counter = self.counter();
    let Some(id) = self.types.field_named(&counter, name) else {
      panic!("no field {}", name);
    };
    self.types.field_ref(&counter, id)
  }

  pub fn increment(&self) -> MethodRef {
    let interlocked = self.types.type_ref(names::SYSTEM_THREADING, names::INTERLOCKED);
    let found = interlocked
      .definition_id()
      .and_then(|def| self.types.find_method(def, "Increment", Some(1)));
    let Some(id) = found else {
      panic!("runtime support has no Interlocked::Increment");
    };
    self.types.method_ref(&interlocked, id)
  }

  /// `Counter::name` with an empty body.
  pub fn input(
    &self,
    name: &str,
  ) -> MethodInput {
    MethodInput::new(MethodSource::new(name, self.counter()), MethodBody::new())
  }

  /// `x = value + 1; ret x`.
  pub fn arithmetic(
    &self,
    name: &str,
    value: i32,
  ) -> MethodInput {
    let mut input = self.input(name);
    let body = &mut input.body;
    let x = body.add_variable(Variable::new("x", TypeRef::int32(), VariableFlags::empty()));
    let left = ldc(body, value);
    let right = ldc(body, 1);
    let sum = typed(body, AstCode::Add, Operand::None, vec![left, right], TypeRef::int32());
    let store = typed(body, AstCode::Stloc, Operand::Variable(x), vec![sum], TypeRef::int32());
    body.root.push(Node::Expr(store));
    let load = typed(body, AstCode::Ldloc, Operand::Variable(x), Vec::new(), TypeRef::int32());
    ret(body, load);
    input
  }

  /// `ret Interlocked.Increment(ref this.count) + Interlocked.Increment(ref this.total)`.
  pub fn two_interlocked_calls(
    &self,
    name: &str,
  ) -> MethodInput {
    let mut input = self.input(name);
    let mut calls = Vec::new();
    for field in ["count", "total"] {
      let address = self.address_of(&mut input.body, field);
      calls.push(typed(
        &mut input.body,
        AstCode::Call,
        Operand::Method(self.increment()),
        vec![address],
        TypeRef::int32(),
      ));
    }
    let sum = typed(&mut input.body, AstCode::Add, Operand::None, calls, TypeRef::int32());
    ret(&mut input.body, sum);
    input
  }

  /// `r = Interlocked.Increment(ref this.total)`; `total` has no updater.
  pub fn locked_increment(
    &self,
    name: &str,
  ) -> MethodInput {
    let mut input = self.input(name);
    let r = input
      .body
      .add_variable(Variable::new("r", TypeRef::int32(), VariableFlags::empty()));
    let address = self.address_of(&mut input.body, "total");
    let call = typed(
      &mut input.body,
      AstCode::Call,
      Operand::Method(self.increment()),
      vec![address],
      TypeRef::int32(),
    );
    let store = typed(&mut input.body, AstCode::Stloc, Operand::Variable(r), vec![call], TypeRef::int32());
    input.body.root.push(Node::Expr(store));
    input
  }

  fn address_of(
    &self,
    body: &mut MethodBody,
    field: &str,
  ) -> ExprId {
    let this = typed(body, AstCode::Ldthis, Operand::None, Vec::new(), self.counter());
    let field = self.field(field);
    let ty = TypeRef::by_reference(field.field_type().clone());
    typed(body, AstCode::Ldflda, Operand::Field(field), vec![this], ty)
  }
}

pub fn typed(
  body: &mut MethodBody,
  code: AstCode,
  operand: Operand,
  args: Vec<ExprId>,
  ty: TypeRef,
) -> ExprId {
  body.new_typed(SourceLocation::NONE, code, operand, args, ty)
}

pub fn ldc(
  body: &mut MethodBody,
  value: i32,
) -> ExprId {
  typed(body, AstCode::LdcI4, Operand::Int(value), Vec::new(), TypeRef::int32())
}

pub fn ret(
  body: &mut MethodBody,
  value: ExprId,
) {
  let ret = typed(body, AstCode::Ret, Operand::None, vec![value], TypeRef::void());
  body.root.push(Node::Expr(ret));
}

/// Quiet configuration with `jobs` workers.
pub fn config(jobs: usize) -> DexterConfig {
  DexterConfig {
    quiet: true,
    jobs,
    ..DexterConfig::default()
  }
}
