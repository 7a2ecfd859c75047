#![allow(dead_code)]

use dexter_ast::{AstCode, AstPrinter, ExprId, MethodBody, Node, Operand, Variable, VariableFlags, VariableId};
use dexter_type::{SourceLocation, TypeRef, TypeSystem};

/// Method body under construction plus the type system used to print it.
pub struct Tree {
  pub body: MethodBody,
  pub types: TypeSystem,
}

impl Tree {
  pub fn new() -> Self {
    Self {
      body: MethodBody::new(),
      types: TypeSystem::builder().with_runtime_support().build(),
    }
  }

  pub fn local(
    &mut self,
    name: &str,
  ) -> VariableId {
    self.body.add_variable(Variable::new(name, TypeRef::int32(), VariableFlags::empty()))
  }

  pub fn ldc(
    &mut self,
    value: i32,
  ) -> ExprId {
    self.body.new_typed(SourceLocation::NONE, AstCode::LdcI4, Operand::Int(value), Vec::new(), TypeRef::int32())
  }

  pub fn ldloc(
    &mut self,
    variable: VariableId,
  ) -> ExprId {
    self.body.new_typed(
      SourceLocation::NONE,
      AstCode::Ldloc,
      Operand::Variable(variable),
      Vec::new(),
      TypeRef::int32(),
    )
  }

  pub fn stloc(
    &mut self,
    variable: VariableId,
    value: ExprId,
  ) -> ExprId {
    self.body.new_expr(SourceLocation::NONE, AstCode::Stloc, Operand::Variable(variable), vec![value])
  }

  pub fn op(
    &mut self,
    code: AstCode,
    args: Vec<ExprId>,
  ) -> ExprId {
    self.body.new_expr(SourceLocation::NONE, code, Operand::None, args)
  }

  pub fn stmt(
    &mut self,
    id: ExprId,
  ) {
    self.body.root.push(Node::Expr(id));
  }

  pub fn print(&self) -> String {
    AstPrinter::new(&self.body, &self.types).print()
  }
}
