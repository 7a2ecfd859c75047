use std::fmt;
use std::sync::Arc;

use crate::definition::{MethodId, TypeDefId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveType {
  Void,
  Bool,
  Char,
  SByte,
  Byte,
  Int16,
  UInt16,
  Int32,
  UInt32,
  Int64,
  UInt64,
  Float32,
  Float64,
  IntPtr,
  UIntPtr,
}

impl PrimitiveType {
  pub const ALL: [PrimitiveType; 15] = [
    PrimitiveType::Void,
    PrimitiveType::Bool,
    PrimitiveType::Char,
    PrimitiveType::SByte,
    PrimitiveType::Byte,
    PrimitiveType::Int16,
    PrimitiveType::UInt16,
    PrimitiveType::Int32,
    PrimitiveType::UInt32,
    PrimitiveType::Int64,
    PrimitiveType::UInt64,
    PrimitiveType::Float32,
    PrimitiveType::Float64,
    PrimitiveType::IntPtr,
    PrimitiveType::UIntPtr,
  ];

  pub fn name(self) -> &'static str {
    match self {
      PrimitiveType::Void => "void",
      PrimitiveType::Bool => "bool",
      PrimitiveType::Char => "char",
      PrimitiveType::SByte => "int8",
      PrimitiveType::Byte => "uint8",
      PrimitiveType::Int16 => "int16",
      PrimitiveType::UInt16 => "uint16",
      PrimitiveType::Int32 => "int32",
      PrimitiveType::UInt32 => "uint32",
      PrimitiveType::Int64 => "int64",
      PrimitiveType::UInt64 => "uint64",
      PrimitiveType::Float32 => "float32",
      PrimitiveType::Float64 => "float64",
      PrimitiveType::IntPtr => "intptr",
      PrimitiveType::UIntPtr => "uintptr",
    }
  }

  /// Name of the corresponding `System` type of the source machine.
  pub fn clr_name(self) -> &'static str {
    match self {
      PrimitiveType::Void => "Void",
      PrimitiveType::Bool => "Boolean",
      PrimitiveType::Char => "Char",
      PrimitiveType::SByte => "SByte",
      PrimitiveType::Byte => "Byte",
      PrimitiveType::Int16 => "Int16",
      PrimitiveType::UInt16 => "UInt16",
      PrimitiveType::Int32 => "Int32",
      PrimitiveType::UInt32 => "UInt32",
      PrimitiveType::Int64 => "Int64",
      PrimitiveType::UInt64 => "UInt64",
      PrimitiveType::Float32 => "Single",
      PrimitiveType::Float64 => "Double",
      PrimitiveType::IntPtr => "IntPtr",
      PrimitiveType::UIntPtr => "UIntPtr",
    }
  }

  /// Occupies a register pair on the target.
  pub fn is_wide(self) -> bool {
    matches!(self, PrimitiveType::Int64 | PrimitiveType::UInt64 | PrimitiveType::Float64)
  }

  pub fn is_float(self) -> bool {
    matches!(self, PrimitiveType::Float32 | PrimitiveType::Float64)
  }

  pub fn is_integer(self) -> bool {
    matches!(
      self,
      PrimitiveType::Char
        | PrimitiveType::SByte
        | PrimitiveType::Byte
        | PrimitiveType::Int16
        | PrimitiveType::UInt16
        | PrimitiveType::Int32
        | PrimitiveType::UInt32
        | PrimitiveType::Int64
        | PrimitiveType::UInt64
    )
  }

  pub fn is_unsigned(self) -> bool {
    matches!(
      self,
      PrimitiveType::Char
        | PrimitiveType::Byte
        | PrimitiveType::UInt16
        | PrimitiveType::UInt32
        | PrimitiveType::UInt64
        | PrimitiveType::UIntPtr
    )
  }

  /// Pointer-sized handles; object references on the target.
  pub fn is_handle(self) -> bool {
    matches!(self, PrimitiveType::IntPtr | PrimitiveType::UIntPtr)
  }

  /// Narrower than the 32-bit working width of the evaluation stack.
  pub fn is_narrow(self) -> bool {
    matches!(
      self,
      PrimitiveType::Bool
        | PrimitiveType::Char
        | PrimitiveType::SByte
        | PrimitiveType::Byte
        | PrimitiveType::Int16
        | PrimitiveType::UInt16
    )
  }

  pub fn bits(self) -> u32 {
    match self {
      PrimitiveType::Void => 0,
      PrimitiveType::Bool => 1,
      PrimitiveType::SByte | PrimitiveType::Byte => 8,
      PrimitiveType::Char | PrimitiveType::Int16 | PrimitiveType::UInt16 => 16,
      PrimitiveType::Int32 | PrimitiveType::UInt32 | PrimitiveType::Float32 => 32,
      PrimitiveType::Int64 | PrimitiveType::UInt64 | PrimitiveType::Float64 => 64,
      PrimitiveType::IntPtr | PrimitiveType::UIntPtr => 32,
    }
  }
}

/// Whoever declares a generic parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenericOwner {
  Type(TypeDefId),
  Method(MethodId),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
  Primitive(PrimitiveType),
  Definition(TypeDefId),
  /// External type the host could not resolve; only coarse queries apply.
  Unresolved {
    namespace: String,
    name: String,
  },
  Array {
    element: TypeRef,
    rank: u32,
  },
  ByReference(TypeRef),
  GenericInstance {
    definition: TypeDefId,
    arguments: Vec<TypeRef>,
  },
  GenericParameter {
    owner: GenericOwner,
    position: u32,
    name: String,
  },
}

/// Immutable, cheaply cloned handle to a [`Type`]. Equality is structural.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TypeRef(Arc<Type>);

impl TypeRef {
  pub fn new(ty: Type) -> Self {
    TypeRef(Arc::new(ty))
  }

  pub fn kind(&self) -> &Type {
    &self.0
  }

  pub fn primitive(p: PrimitiveType) -> Self {
    TypeRef::new(Type::Primitive(p))
  }

  pub fn void() -> Self {
    TypeRef::primitive(PrimitiveType::Void)
  }

  pub fn bool() -> Self {
    TypeRef::primitive(PrimitiveType::Bool)
  }

  pub fn char() -> Self {
    TypeRef::primitive(PrimitiveType::Char)
  }

  pub fn int32() -> Self {
    TypeRef::primitive(PrimitiveType::Int32)
  }

  pub fn int64() -> Self {
    TypeRef::primitive(PrimitiveType::Int64)
  }

  pub fn float32() -> Self {
    TypeRef::primitive(PrimitiveType::Float32)
  }

  pub fn float64() -> Self {
    TypeRef::primitive(PrimitiveType::Float64)
  }

  pub fn definition(id: TypeDefId) -> Self {
    TypeRef::new(Type::Definition(id))
  }

  pub fn unresolved(
    namespace: &str,
    name: &str,
  ) -> Self {
    TypeRef::new(Type::Unresolved {
      namespace: namespace.to_string(),
      name: name.to_string(),
    })
  }

  pub fn array(element: TypeRef) -> Self {
    TypeRef::array_of_rank(element, 1)
  }

  pub fn array_of_rank(
    element: TypeRef,
    rank: u32,
  ) -> Self {
    TypeRef::new(Type::Array { element, rank })
  }

  pub fn by_reference(element: TypeRef) -> Self {
    TypeRef::new(Type::ByReference(element))
  }

  pub fn generic_instance(
    definition: TypeDefId,
    arguments: Vec<TypeRef>,
  ) -> Self {
    TypeRef::new(Type::GenericInstance { definition, arguments })
  }

  pub fn generic_parameter(
    owner: GenericOwner,
    position: u32,
    name: &str,
  ) -> Self {
    TypeRef::new(Type::GenericParameter {
      owner,
      position,
      name: name.to_string(),
    })
  }

  pub fn as_primitive(&self) -> Option<PrimitiveType> {
    match self.kind() {
      Type::Primitive(p) => Some(*p),
      _ => None,
    }
  }

  pub fn is_primitive(&self) -> bool {
    self.as_primitive().is_some_and(|p| p != PrimitiveType::Void)
  }

  pub fn is(
    &self,
    p: PrimitiveType,
  ) -> bool {
    self.as_primitive() == Some(p)
  }

  pub fn is_void(&self) -> bool {
    self.is(PrimitiveType::Void)
  }

  pub fn is_bool(&self) -> bool {
    self.is(PrimitiveType::Bool)
  }

  pub fn is_wide(&self) -> bool {
    self.as_primitive().is_some_and(PrimitiveType::is_wide)
  }

  pub fn is_float(&self) -> bool {
    self.as_primitive().is_some_and(PrimitiveType::is_float)
  }

  pub fn is_unsigned(&self) -> bool {
    self.as_primitive().is_some_and(PrimitiveType::is_unsigned)
  }

  pub fn is_array(&self) -> bool {
    matches!(self.kind(), Type::Array { .. })
  }

  pub fn array_rank(&self) -> Option<u32> {
    match self.kind() {
      Type::Array { rank, .. } => Some(*rank),
      _ => None,
    }
  }

  /// Element type of an array or a by-reference type.
  pub fn element_type(&self) -> Option<&TypeRef> {
    match self.kind() {
      Type::Array { element, .. } | Type::ByReference(element) => Some(element),
      _ => None,
    }
  }

  pub fn is_by_reference(&self) -> bool {
    matches!(self.kind(), Type::ByReference(_))
  }

  pub fn is_generic_parameter(&self) -> bool {
    matches!(self.kind(), Type::GenericParameter { .. })
  }

  pub fn generic_parameter_info(&self) -> Option<(GenericOwner, u32)> {
    match self.kind() {
      Type::GenericParameter { owner, position, .. } => Some((*owner, *position)),
      _ => None,
    }
  }

  pub fn is_generic_instance(&self) -> bool {
    matches!(self.kind(), Type::GenericInstance { .. })
  }

  pub fn generic_arguments(&self) -> &[TypeRef] {
    match self.kind() {
      Type::GenericInstance { arguments, .. } => arguments,
      _ => &[],
    }
  }

  /// Definition behind a plain or generic-instance reference.
  pub fn definition_id(&self) -> Option<TypeDefId> {
    match self.kind() {
      Type::Definition(id) => Some(*id),
      Type::GenericInstance { definition, .. } => Some(*definition),
      _ => None,
    }
  }

  /// Held in an object register on the target (everything but non-handle primitives).
  pub fn is_dex_object(&self) -> bool {
    match self.kind() {
      Type::Primitive(p) => p.is_handle(),
      _ => true,
    }
  }

  /// True when the type mentions a generic parameter anywhere.
  pub fn contains_generic_parameter(&self) -> bool {
    match self.kind() {
      Type::GenericParameter { .. } => true,
      Type::Array { element, .. } | Type::ByReference(element) => element.contains_generic_parameter(),
      Type::GenericInstance { arguments, .. } => arguments.iter().any(TypeRef::contains_generic_parameter),
      _ => false,
    }
  }
}

impl fmt::Debug for TypeRef {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self.kind() {
      Type::Primitive(p) => write!(f, "{}", p.name()),
      Type::Definition(id) => write!(f, "def{:?}", id),
      Type::Unresolved { namespace, name } => write!(f, "{}.{}?", namespace, name),
      Type::Array { element, rank } => {
        write!(f, "{:?}[{}]", element, ",".repeat(rank.saturating_sub(1) as usize))
      },
      Type::ByReference(element) => write!(f, "{:?}&", element),
      Type::GenericInstance { definition, arguments } => write!(f, "def{:?}{:?}", definition, arguments),
      Type::GenericParameter { name, .. } => write!(f, "{}", name),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn wide_types_cover_long_and_double() {
    assert!(TypeRef::int64().is_wide());
    assert!(TypeRef::float64().is_wide());
    assert!(!TypeRef::float32().is_wide());
    assert!(!TypeRef::int32().is_wide());
  }

  #[test]
  fn structural_equality_for_arrays() {
    let a = TypeRef::array(TypeRef::int32());
    let b = TypeRef::array(TypeRef::int32());
    assert_eq!(a, b);
    assert_ne!(a, TypeRef::array_of_rank(TypeRef::int32(), 2));
    assert_eq!(a.element_type(), Some(&TypeRef::int32()));
  }

  #[test]
  fn handles_are_objects_on_the_target() {
    assert!(TypeRef::primitive(PrimitiveType::IntPtr).is_dex_object());
    assert!(!TypeRef::int32().is_dex_object());
    assert!(TypeRef::array(TypeRef::int32()).is_dex_object());
  }

  #[test]
  fn generic_parameter_is_found_inside_arrays() {
    let owner = GenericOwner::Type(TypeDefId::new(3));
    let t = TypeRef::generic_parameter(owner, 0, "T");
    assert!(TypeRef::array(t.clone()).contains_generic_parameter());
    assert_eq!(t.generic_parameter_info(), Some((owner, 0)));
  }
}
