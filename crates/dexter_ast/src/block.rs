use dexter_type::TypeRef;

use crate::{ExprId, LabelId, VariableId};

/// Entry of a block body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
  Expr(ExprId),
  Label(LabelId),
  Block(Block),
  TryCatch(TryCatchBlock),
  Switch(SwitchBlock),
}

impl Node {
  pub fn as_expr(&self) -> Option<ExprId> {
    match self {
      Node::Expr(id) => Some(*id),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
  /// Branch taken when control enters the block (loop heads).
  pub entry_goto: Option<ExprId>,
  pub body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatchBlock {
  pub exception_type: TypeRef,
  pub variable: Option<VariableId>,
  pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TryCatchBlock {
  pub try_block: Block,
  pub catches: Vec<CatchBlock>,
  pub finally_block: Option<Block>,
  pub fault_block: Option<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseBlock {
  pub values: Vec<i64>,
  pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchBlock {
  pub condition: ExprId,
  pub cases: Vec<CaseBlock>,
  pub default_block: Option<Block>,
}

impl Block {
  pub fn new(body: Vec<Node>) -> Self {
    Self { entry_goto: None, body }
  }

  pub fn push(
    &mut self,
    node: Node,
  ) {
    self.body.push(node);
  }

  pub fn statement(
    &mut self,
    id: ExprId,
  ) {
    self.body.push(Node::Expr(id));
  }

  /// Body vector holding `statement` and its index in it, searching nested blocks.
  pub fn locate_mut(
    &mut self,
    statement: ExprId,
  ) -> Option<(&mut Vec<Node>, usize)> {
    if let Some(index) = self.body.iter().position(|n| n.as_expr() == Some(statement)) {
      return Some((&mut self.body, index));
    }

    for node in &mut self.body {
      let found = match node {
        Node::Block(block) => block.locate_mut(statement),
        Node::TryCatch(try_catch) => try_catch.blocks_mut().into_iter().find_map(|b| b.locate_mut(statement)),
        Node::Switch(switch) => switch.blocks_mut().into_iter().find_map(|b| b.locate_mut(statement)),
        Node::Expr(_) | Node::Label(_) => None,
      };
      if found.is_some() {
        return found;
      }
    }

    None
  }

  /// True when `statement` is a direct child of this block.
  pub fn contains_directly(
    &self,
    statement: ExprId,
  ) -> bool {
    self.body.iter().any(|n| n.as_expr() == Some(statement))
  }
}

impl TryCatchBlock {
  pub fn blocks(&self) -> Vec<&Block> {
    let mut blocks = vec![&self.try_block];
    blocks.extend(self.catches.iter().map(|c| &c.body));
    blocks.extend(self.finally_block.as_ref());
    blocks.extend(self.fault_block.as_ref());
    blocks
  }

  pub fn blocks_mut(&mut self) -> Vec<&mut Block> {
    let mut blocks = vec![&mut self.try_block];
    blocks.extend(self.catches.iter_mut().map(|c| &mut c.body));
    blocks.extend(self.finally_block.as_mut());
    blocks.extend(self.fault_block.as_mut());
    blocks
  }
}

impl SwitchBlock {
  pub fn blocks(&self) -> Vec<&Block> {
    let mut blocks: Vec<&Block> = self.cases.iter().map(|c| &c.body).collect();
    blocks.extend(self.default_block.as_ref());
    blocks
  }

  pub fn blocks_mut(&mut self) -> Vec<&mut Block> {
    let mut blocks: Vec<&mut Block> = self.cases.iter_mut().map(|c| &mut c.body).collect();
    blocks.extend(self.default_block.as_mut());
    blocks
  }
}
