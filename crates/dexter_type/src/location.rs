use std::fmt;

/// Position of an expression in the source method: IL offset plus the
/// debug-info line/column when the decompiler had one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceLocation {
  pub offset: u32,
  pub line: u32,
  pub column: u32,
  /// Compiler-synthesized nodes carry no real position.
  pub special: bool,
}

impl SourceLocation {
  pub const NONE: SourceLocation = SourceLocation {
    offset: 0,
    line: 0,
    column: 0,
    special: true,
  };

  pub fn new(
    offset: u32,
    line: u32,
    column: u32,
  ) -> Self {
    Self {
      offset,
      line,
      column,
      special: false,
    }
  }

  pub fn at_offset(offset: u32) -> Self {
    Self::new(offset, 0, 0)
  }

  pub fn is_special(&self) -> bool {
    self.special
  }
}

impl fmt::Display for SourceLocation {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    if self.special {
      return write!(f, "<no source>");
    }

    if self.line > 0 {
      write!(f, "IL_{:04x} ({}:{})", self.offset, self.line, self.column)
    } else {
      write!(f, "IL_{:04x}", self.offset)
    }
  }
}
