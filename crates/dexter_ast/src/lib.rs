pub mod block;
pub mod body;
pub mod code;
pub mod display;
pub mod operand;
pub mod verify;
pub mod visit;

use bitflags::bitflags;
use dexter_type::{Id, SourceLocation, TypeRef};

pub use block::{Block, CaseBlock, CatchBlock, Node, SwitchBlock, TryCatchBlock};
pub use body::MethodBody;
pub use code::{Arity, AstCode};
pub use display::AstPrinter;
pub use operand::{Operand, OperandKind};
pub use verify::{verify, VerifyError};
pub use visit::ExprPair;

pub type ExprId = Id<Expr>;
pub type VariableId = Id<Variable>;
pub type LabelId = Id<Label>;

/// Instruction prefixes carried over from the source method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Prefix {
  Constrained(TypeRef),
  Volatile,
  Readonly,
}

/// One node of the decompiled expression tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
  pub code: AstCode,
  pub operand: Operand,
  /// Children in evaluation order.
  pub arguments: Vec<ExprId>,
  pub expected_type: Option<TypeRef>,
  pub inferred_type: Option<TypeRef>,
  pub location: SourceLocation,
  pub prefixes: Vec<Prefix>,
  /// Write-back tree of a `byrefarray` call argument. Owned here, never an argument.
  pub store_by_ref: Option<ExprId>,
}

impl Expr {
  pub fn new(
    location: SourceLocation,
    code: AstCode,
    operand: Operand,
    arguments: Vec<ExprId>,
  ) -> Self {
    Self {
      code,
      operand,
      arguments,
      expected_type: None,
      inferred_type: None,
      location,
      prefixes: Vec::new(),
      store_by_ref: None,
    }
  }

  pub fn nop(location: SourceLocation) -> Self {
    Self::new(location, AstCode::Nop, Operand::None, Vec::new())
  }

  pub fn is(
    &self,
    code: AstCode,
  ) -> bool {
    self.code == code
  }

  pub fn arg(
    &self,
    index: usize,
  ) -> Option<ExprId> {
    self.arguments.get(index).copied()
  }

  /// Inferred type, else the expected one.
  pub fn type_hint(&self) -> Option<&TypeRef> {
    self.inferred_type.as_ref().or(self.expected_type.as_ref())
  }

  pub fn has_prefix(
    &self,
    prefix: &Prefix,
  ) -> bool {
    self.prefixes.contains(prefix)
  }

  pub fn constrained_type(&self) -> Option<&TypeRef> {
    self.prefixes.iter().find_map(|p| match p {
      Prefix::Constrained(ty) => Some(ty),
      _ => None,
    })
  }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct VariableFlags: u8 {
        const THIS      = 1 << 0;
        const PARAMETER = 1 << 1;
        /// Introduced by a lowering pass.
        const GENERATED = 1 << 2;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
  pub name: String,
  pub ty: TypeRef,
  pub flags: VariableFlags,
}

impl Variable {
  pub fn new(
    name: &str,
    ty: TypeRef,
    flags: VariableFlags,
  ) -> Self {
    Self {
      name: name.to_string(),
      ty,
      flags,
    }
  }

  pub fn is_parameter(&self) -> bool {
    self.flags.contains(VariableFlags::PARAMETER)
  }

  pub fn is_this(&self) -> bool {
    self.flags.contains(VariableFlags::THIS)
  }

  pub fn is_generated(&self) -> bool {
    self.flags.contains(VariableFlags::GENERATED)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
  pub name: String,
}
