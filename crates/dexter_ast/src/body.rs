use dexter_type::{SourceLocation, Store, TypeRef};

use crate::{AstCode, Block, Expr, ExprId, Label, LabelId, Operand, Variable, VariableFlags, VariableId};

/// Expression tree of one method plus the arenas it indexes into.
///
/// Nodes are addressed by [`ExprId`]. Rewriting a node in place overwrites its
/// slot, so whoever points at it sees the new shape. Nodes cut out of the tree
/// stay allocated but are unreachable from [`MethodBody::root`].
#[derive(Debug, Clone, Default)]
pub struct MethodBody {
  pub exprs: Store<Expr>,
  pub variables: Store<Variable>,
  pub labels: Store<Label>,
  pub root: Block,
  /// Set once the lowering pipeline has completed on this body.
  pub lowered: bool,
}

impl MethodBody {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn alloc(
    &mut self,
    expr: Expr,
  ) -> ExprId {
    self.exprs.alloc(expr)
  }

  pub fn expr(
    &self,
    id: ExprId,
  ) -> &Expr {
    self.exprs.get(&id)
  }

  pub fn expr_mut(
    &mut self,
    id: ExprId,
  ) -> &mut Expr {
    self.exprs.get_mut(id)
  }

  pub fn code(
    &self,
    id: ExprId,
  ) -> AstCode {
    self.expr(id).code
  }

  pub fn args(
    &self,
    id: ExprId,
  ) -> &[ExprId] {
    &self.expr(id).arguments
  }

  /// `index`-th argument of `id`. Callers check the shape first.
  pub fn arg(
    &self,
    id: ExprId,
    index: usize,
  ) -> ExprId {
    self.expr(id).arguments[index]
  }

  pub fn new_expr(
    &mut self,
    location: SourceLocation,
    code: AstCode,
    operand: Operand,
    arguments: Vec<ExprId>,
  ) -> ExprId {
    self.alloc(Expr::new(location, code, operand, arguments))
  }

  /// Like [`MethodBody::new_expr`] with the inferred type set.
  pub fn new_typed(
    &mut self,
    location: SourceLocation,
    code: AstCode,
    operand: Operand,
    arguments: Vec<ExprId>,
    ty: TypeRef,
  ) -> ExprId {
    let id = self.new_expr(location, code, operand, arguments);
    self.set_type(id, ty);
    id
  }

  /// Fixes the node's type: inferred becomes `ty`, the expected type is dropped.
  pub fn set_type(
    &mut self,
    id: ExprId,
    ty: TypeRef,
  ) {
    let expr = self.expr_mut(id);
    expr.inferred_type = Some(ty);
    expr.expected_type = None;
  }

  /// Rewrites `id` in place from its parts, keeping location and types.
  pub fn rewrite(
    &mut self,
    id: ExprId,
    code: AstCode,
    operand: Operand,
    arguments: Vec<ExprId>,
  ) {
    let expr = self.expr_mut(id);
    expr.code = code;
    expr.operand = operand;
    expr.arguments = arguments;
  }

  /// `dst` takes the whole shape of `src`; `src` is left as a detached `nop`.
  pub fn copy_from(
    &mut self,
    dst: ExprId,
    src: ExprId,
  ) {
    if dst == src {
      return;
    }
    let location = self.expr(src).location;
    let taken = std::mem::replace(self.expr_mut(src), Expr::nop(location));
    *self.expr_mut(dst) = taken;
  }

  /// Moves the shape of `id` into a fresh slot and returns that slot.
  ///
  /// `id` is left as a `nop` at the same location, ready to be rebuilt as a
  /// wrapper around the returned node.
  pub fn push_down(
    &mut self,
    id: ExprId,
  ) -> ExprId {
    let location = self.expr(id).location;
    let old = std::mem::replace(self.expr_mut(id), Expr::nop(location));
    self.alloc(old)
  }

  /// Wraps `id` in place: afterwards `id` is `code operand (old id)` with type `ty`.
  pub fn wrap(
    &mut self,
    id: ExprId,
    code: AstCode,
    operand: Operand,
    ty: TypeRef,
  ) -> ExprId {
    let inner = self.push_down(id);
    self.rewrite(id, code, operand, vec![inner]);
    self.set_type(id, ty);
    inner
  }

  /// Deep copy of a subtree, including `store_by_ref` side trees.
  pub fn duplicate_subtree(
    &mut self,
    id: ExprId,
  ) -> ExprId {
    let mut copy = self.expr(id).clone();
    copy.arguments = copy.arguments.iter().map(|&arg| self.duplicate_subtree(arg)).collect();
    copy.store_by_ref = copy.store_by_ref.map(|side| self.duplicate_subtree(side));
    self.alloc(copy)
  }

  /// Loads that can be evaluated twice without observable difference.
  pub fn is_bare_load(
    &self,
    id: ExprId,
  ) -> bool {
    let expr = self.expr(id);
    match expr.code {
      AstCode::Ldloc | AstCode::Ldthis | AstCode::Ldsfld | AstCode::Ldnull => true,
      code if code.is_constant() => true,
      AstCode::Ldfld => expr.arguments.len() == 1 && self.is_bare_load(expr.arguments[0]),
      _ => false,
    }
  }

  /// Subtree without calls, stores, allocations or other side effects.
  pub fn is_side_effect_free(
    &self,
    id: ExprId,
  ) -> bool {
    let expr = self.expr(id);
    let pure = match expr.code {
      AstCode::Ldloc
      | AstCode::Ldthis
      | AstCode::Ldsfld
      | AstCode::Ldfld
      | AstCode::Ldnull
      | AstCode::Ldlen
      | AstCode::Ldobj
      | AstCode::Neg
      | AstCode::Not
      | AstCode::TypeOf
      | AstCode::DefaultValue => true,
      code => {
        code.is_constant()
          || code.is_ldelem()
          || code.is_ldind()
          || code.is_conversion()
          || code.is_compare()
          || code.is_binary_operation()
          || code.is_address_of()
      },
    };
    pure && expr.arguments.iter().all(|&arg| self.is_side_effect_free(arg))
  }

  /// Same code, operand and argument shapes, recursively. Types are ignored.
  pub fn same_tree(
    &self,
    a: ExprId,
    b: ExprId,
  ) -> bool {
    if a == b {
      return true;
    }
    let (ea, eb) = (self.expr(a), self.expr(b));
    ea.code == eb.code
      && ea.operand == eb.operand
      && ea.arguments.len() == eb.arguments.len()
      && ea.arguments.iter().zip(&eb.arguments).all(|(&x, &y)| self.same_tree(x, y))
  }

  /// Integer constant carried by `ldc.i4` / `ldc.i8`.
  pub fn int_constant(
    &self,
    id: ExprId,
  ) -> Option<i64> {
    let expr = self.expr(id);
    match expr.code {
      AstCode::LdcI4 | AstCode::LdcI8 => expr.operand.as_integer(),
      _ => None,
    }
  }

  pub fn add_variable(
    &mut self,
    variable: Variable,
  ) -> VariableId {
    self.variables.alloc(variable)
  }

  pub fn variable(
    &self,
    id: VariableId,
  ) -> &Variable {
    self.variables.get(&id)
  }

  /// Generated local. The name is made unique within the body.
  pub fn new_temporary(
    &mut self,
    name: &str,
    ty: TypeRef,
  ) -> VariableId {
    let taken = |candidate: &str| self.variables.iter().any(|(_, v)| v.name == candidate);
    let mut unique = name.to_string();
    let mut counter = 1;
    while taken(&unique) {
      unique = format!("{}_{}", name, counter);
      counter += 1;
    }
    self.variables.alloc(Variable::new(&unique, ty, VariableFlags::GENERATED))
  }

  pub fn new_label(
    &mut self,
    name: &str,
  ) -> LabelId {
    self.labels.alloc(Label { name: name.to_string() })
  }

  pub fn label(
    &self,
    id: LabelId,
  ) -> &Label {
    self.labels.get(&id)
  }

  /// The `this` parameter, when the method has one.
  pub fn this_variable(&self) -> Option<VariableId> {
    self.variables.iter().find(|(_, v)| v.is_this()).map(|(id, _)| id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ldc(
    body: &mut MethodBody,
    value: i32,
  ) -> ExprId {
    body.new_typed(SourceLocation::NONE, AstCode::LdcI4, Operand::Int(value), Vec::new(), TypeRef::int32())
  }

  #[test]
  fn copy_from_leaves_source_as_nop() {
    let mut body = MethodBody::new();
    let a = ldc(&mut body, 1);
    let b = ldc(&mut body, 2);
    body.copy_from(a, b);
    assert_eq!(body.expr(a).operand, Operand::Int(2));
    assert_eq!(body.code(b), AstCode::Nop);
  }

  #[test]
  fn push_down_keeps_the_old_shape_reachable() {
    let mut body = MethodBody::new();
    let one = ldc(&mut body, 1);
    let inner = body.wrap(one, AstCode::ConvI8, Operand::None, TypeRef::int64());
    assert_eq!(body.code(one), AstCode::ConvI8);
    assert_eq!(body.args(one), &[inner]);
    assert_eq!(body.expr(inner).operand, Operand::Int(1));
  }

  #[test]
  fn temporaries_get_unique_names() {
    let mut body = MethodBody::new();
    let a = body.new_temporary("tmp", TypeRef::int32());
    let b = body.new_temporary("tmp", TypeRef::int32());
    assert_eq!(body.variable(a).name, "tmp");
    assert_eq!(body.variable(b).name, "tmp_1");
    assert!(body.variable(b).is_generated());
  }
}
