use std::fmt;
use std::sync::Arc;

use crate::definition::{FieldId, MethodId};
use crate::types::TypeRef;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRefData {
  pub name: String,
  pub declaring_type: TypeRef,
  /// Type arguments of a generic method instance.
  pub generic_arguments: Vec<TypeRef>,
  pub parameters: Vec<TypeRef>,
  pub return_type: TypeRef,
  pub has_this: bool,
  pub definition: Option<MethodId>,
}

/// Reference to a method as it appears at a call site.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MethodRef(Arc<MethodRefData>);

impl MethodRef {
  pub fn new(data: MethodRefData) -> Self {
    MethodRef(Arc::new(data))
  }

  pub fn data(&self) -> &MethodRefData {
    &self.0
  }

  pub fn name(&self) -> &str {
    &self.0.name
  }

  pub fn declaring_type(&self) -> &TypeRef {
    &self.0.declaring_type
  }

  pub fn generic_arguments(&self) -> &[TypeRef] {
    &self.0.generic_arguments
  }

  pub fn parameters(&self) -> &[TypeRef] {
    &self.0.parameters
  }

  pub fn return_type(&self) -> &TypeRef {
    &self.0.return_type
  }

  pub fn has_this(&self) -> bool {
    self.0.has_this
  }

  pub fn definition(&self) -> Option<MethodId> {
    self.0.definition
  }

  pub fn is_constructor(&self) -> bool {
    self.0.name == ".ctor"
  }

  pub fn is_generic_instance(&self) -> bool {
    !self.0.generic_arguments.is_empty()
  }

  /// Same method with a different declaring type (e.g. a generic instance).
  pub fn with_declaring_type(
    &self,
    declaring_type: TypeRef,
  ) -> Self {
    let mut data = self.data().clone();
    data.declaring_type = declaring_type;
    MethodRef::new(data)
  }
}

impl fmt::Debug for MethodRef {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "{:?}::{}", self.0.declaring_type, self.0.name)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRefData {
  pub name: String,
  pub declaring_type: TypeRef,
  pub field_type: TypeRef,
  pub is_static: bool,
  pub definition: Option<FieldId>,
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FieldRef(Arc<FieldRefData>);

impl FieldRef {
  pub fn new(data: FieldRefData) -> Self {
    FieldRef(Arc::new(data))
  }

  pub fn data(&self) -> &FieldRefData {
    &self.0
  }

  pub fn name(&self) -> &str {
    &self.0.name
  }

  pub fn declaring_type(&self) -> &TypeRef {
    &self.0.declaring_type
  }

  pub fn field_type(&self) -> &TypeRef {
    &self.0.field_type
  }

  pub fn is_static(&self) -> bool {
    self.0.is_static
  }

  pub fn definition(&self) -> Option<FieldId> {
    self.0.definition
  }
}

impl fmt::Debug for FieldRef {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "{:?}::{}", self.0.declaring_type, self.0.name)
  }
}
