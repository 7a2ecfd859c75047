//! Tree walks. Every walk returns a snapshot of ids so callers can mutate
//! the body while iterating the result.

use crate::{Block, Expr, ExprId, MethodBody, Node};

/// A node together with the node that holds it as an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExprPair {
  pub expr: ExprId,
  /// `None` for statement roots, entry branches and switch conditions.
  pub parent: Option<ExprId>,
}

/// Pre-order over every expression of the body that matches `predicate`.
pub fn expressions(
  body: &MethodBody,
  predicate: impl Fn(&Expr) -> bool,
) -> Vec<ExprId> {
  expression_pairs(body, predicate).into_iter().map(|p| p.expr).collect()
}

pub fn expression_pairs(
  body: &MethodBody,
  predicate: impl Fn(&Expr) -> bool,
) -> Vec<ExprPair> {
  let mut out = Vec::new();
  for root in roots(&body.root) {
    collect(body, root, None, &predicate, &mut out);
  }
  out
}

/// Pre-order over one subtree.
pub fn subtree(
  body: &MethodBody,
  root: ExprId,
  predicate: impl Fn(&Expr) -> bool,
) -> Vec<ExprId> {
  subtree_pairs(body, root, predicate).into_iter().map(|p| p.expr).collect()
}

pub fn subtree_pairs(
  body: &MethodBody,
  root: ExprId,
  predicate: impl Fn(&Expr) -> bool,
) -> Vec<ExprPair> {
  let mut out = Vec::new();
  collect(body, root, None, &predicate, &mut out);
  out
}

/// Statement roots in block order, nested blocks included.
pub fn statements(body: &MethodBody) -> Vec<ExprId> {
  let mut out = Vec::new();
  block_statements(&body.root, &mut out);
  out
}

/// Parent of `id` in the live tree.
pub fn parent_of(
  body: &MethodBody,
  id: ExprId,
) -> Option<ExprId> {
  expression_pairs(body, |_| true).into_iter().find(|p| p.expr == id).and_then(|p| p.parent)
}

/// Every expression that starts a walk: statements, entry branches and switch conditions.
pub fn roots(block: &Block) -> Vec<ExprId> {
  let mut out = Vec::new();
  block_roots(block, &mut out);
  out
}

fn block_roots(
  block: &Block,
  out: &mut Vec<ExprId>,
) {
  out.extend(block.entry_goto);
  for node in &block.body {
    match node {
      Node::Expr(id) => out.push(*id),
      Node::Label(_) => {},
      Node::Block(inner) => block_roots(inner, out),
      Node::TryCatch(try_catch) => {
        for inner in try_catch.blocks() {
          block_roots(inner, out);
        }
      },
      Node::Switch(switch) => {
        out.push(switch.condition);
        for inner in switch.blocks() {
          block_roots(inner, out);
        }
      },
    }
  }
}

fn block_statements(
  block: &Block,
  out: &mut Vec<ExprId>,
) {
  for node in &block.body {
    match node {
      Node::Expr(id) => out.push(*id),
      Node::Label(_) => {},
      Node::Block(inner) => block_statements(inner, out),
      Node::TryCatch(try_catch) => {
        for inner in try_catch.blocks() {
          block_statements(inner, out);
        }
      },
      Node::Switch(switch) => {
        for inner in switch.blocks() {
          block_statements(inner, out);
        }
      },
    }
  }
}

fn collect(
  body: &MethodBody,
  id: ExprId,
  parent: Option<ExprId>,
  predicate: &impl Fn(&Expr) -> bool,
  out: &mut Vec<ExprPair>,
) {
  let expr = body.expr(id);
  if predicate(expr) {
    out.push(ExprPair { expr: id, parent });
  }
  for &arg in &expr.arguments {
    collect(body, arg, Some(id), predicate, out);
  }
}
