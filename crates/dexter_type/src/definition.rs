use bitflags::bitflags;
use ordered_float::OrderedFloat;

use crate::types::{PrimitiveType, TypeRef};
use crate::{Id, Store};

pub type TypeDefId = Id<TypeDefinition>;
pub type MethodId = Id<MethodDefinition>;
pub type FieldId = Id<FieldDefinition>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
  Class,
  Interface,
  Struct,
  Enum,
  Delegate,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u32 {
        /// Struct without mutators; shares one default instance.
        const IMMUTABLE     = 1 << 0;
        /// Wraps a type that already exists on the target.
        const IMPORTED      = 1 << 1;
        /// Compiler-generated async/iterator state machine.
        const STATE_MACHINE = 1 << 2;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MethodFlags: u32 {
        const STATIC                                  = 1 << 0;
        const CONSTRUCTOR                             = 1 << 1;
        const VIRTUAL                                 = 1 << 2;
        const ABSTRACT                                = 1 << 3;
        const NEEDS_GENERIC_INSTANCE_TYPE_PARAMETER   = 1 << 4;
        const NEEDS_GENERIC_INSTANCE_METHOD_PARAMETER = 1 << 5;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FieldFlags: u32 {
        const STATIC   = 1 << 0;
        const LITERAL  = 1 << 1;
        const READONLY = 1 << 2;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constant {
  Int(i64),
  Float(OrderedFloat<f64>),
  Null,
}

impl Constant {
  pub fn as_int(&self) -> Option<i64> {
    match self {
      Constant::Int(v) => Some(*v),
      _ => None,
    }
  }
}

#[derive(Debug, Clone)]
pub struct TypeDefinition {
  pub namespace: String,
  pub name: String,
  pub kind: TypeKind,
  pub flags: TypeFlags,
  pub base_type: Option<TypeRef>,
  /// Underlying integer type of an enum.
  pub enum_underlying: Option<PrimitiveType>,
  pub generic_parameters: Vec<String>,
  pub methods: Vec<MethodId>,
  pub fields: Vec<FieldId>,
}

impl TypeDefinition {
  pub fn new(
    namespace: &str,
    name: &str,
    kind: TypeKind,
  ) -> Self {
    Self {
      namespace: namespace.to_string(),
      name: name.to_string(),
      kind,
      flags: TypeFlags::empty(),
      base_type: None,
      enum_underlying: None,
      generic_parameters: Vec::new(),
      methods: Vec::new(),
      fields: Vec::new(),
    }
  }

  pub fn full_name(&self) -> String {
    if self.namespace.is_empty() {
      self.name.clone()
    } else {
      format!("{}.{}", self.namespace, self.name)
    }
  }

  pub fn is_value_type(&self) -> bool {
    matches!(self.kind, TypeKind::Struct | TypeKind::Enum)
  }

  pub fn is_enum(&self) -> bool {
    self.kind == TypeKind::Enum
  }

  pub fn is_immutable(&self) -> bool {
    self.flags.contains(TypeFlags::IMMUTABLE)
  }

  pub fn is_imported(&self) -> bool {
    self.flags.contains(TypeFlags::IMPORTED)
  }

  pub fn is_generic(&self) -> bool {
    !self.generic_parameters.is_empty()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
  In,
  Out,
  Ref,
}

#[derive(Debug, Clone)]
pub struct ParameterDefinition {
  pub name: String,
  pub ty: TypeRef,
  pub kind: ParameterKind,
}

impl ParameterDefinition {
  pub fn new(
    name: &str,
    ty: TypeRef,
  ) -> Self {
    let kind = if ty.is_by_reference() { ParameterKind::Ref } else { ParameterKind::In };
    Self {
      name: name.to_string(),
      ty,
      kind,
    }
  }

  pub fn out(
    name: &str,
    ty: TypeRef,
  ) -> Self {
    Self {
      name: name.to_string(),
      ty,
      kind: ParameterKind::Out,
    }
  }

  pub fn is_by_reference(&self) -> bool {
    self.kind != ParameterKind::In
  }
}

#[derive(Debug, Clone)]
pub struct MethodDefinition {
  pub name: String,
  pub declaring_type: TypeDefId,
  pub flags: MethodFlags,
  pub parameters: Vec<ParameterDefinition>,
  pub return_type: TypeRef,
  pub generic_parameters: Vec<String>,
}

impl MethodDefinition {
  pub fn is_static(&self) -> bool {
    self.flags.contains(MethodFlags::STATIC)
  }

  pub fn is_constructor(&self) -> bool {
    self.flags.contains(MethodFlags::CONSTRUCTOR)
  }

  pub fn is_class_constructor(&self) -> bool {
    self.is_constructor() && self.is_static()
  }

  pub fn needs_generic_instance_type_parameter(&self) -> bool {
    self.flags.contains(MethodFlags::NEEDS_GENERIC_INSTANCE_TYPE_PARAMETER)
  }

  pub fn needs_generic_instance_method_parameter(&self) -> bool {
    self.flags.contains(MethodFlags::NEEDS_GENERIC_INSTANCE_METHOD_PARAMETER)
  }
}

#[derive(Debug, Clone)]
pub struct FieldDefinition {
  pub name: String,
  pub declaring_type: TypeDefId,
  pub field_type: TypeRef,
  pub flags: FieldFlags,
  pub constant: Option<Constant>,
}

impl FieldDefinition {
  pub fn is_static(&self) -> bool {
    self.flags.contains(FieldFlags::STATIC)
  }

  pub fn is_literal(&self) -> bool {
    self.flags.contains(FieldFlags::LITERAL)
  }
}

#[derive(Debug, Clone, Default)]
pub struct DefinitionStore {
  types: Store<TypeDefinition>,
  methods: Store<MethodDefinition>,
  fields: Store<FieldDefinition>,
}

impl DefinitionStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn alloc_type(
    &mut self,
    def: TypeDefinition,
  ) -> TypeDefId {
    self.types.alloc(def)
  }

  /// Registers a method and links it to its declaring type.
  pub fn alloc_method(
    &mut self,
    def: MethodDefinition,
  ) -> MethodId {
    let owner = def.declaring_type;
    let id = self.methods.alloc(def);
    self.types.get_mut(owner).methods.push(id);
    id
  }

  pub fn alloc_field(
    &mut self,
    def: FieldDefinition,
  ) -> FieldId {
    let owner = def.declaring_type;
    let id = self.fields.alloc(def);
    self.types.get_mut(owner).fields.push(id);
    id
  }

  pub fn type_def(
    &self,
    id: &TypeDefId,
  ) -> &TypeDefinition {
    self.types.get(id)
  }

  pub fn type_def_mut(
    &mut self,
    id: TypeDefId,
  ) -> &mut TypeDefinition {
    self.types.get_mut(id)
  }

  pub fn method(
    &self,
    id: &MethodId,
  ) -> &MethodDefinition {
    self.methods.get(id)
  }

  pub fn method_mut(
    &mut self,
    id: MethodId,
  ) -> &mut MethodDefinition {
    self.methods.get_mut(id)
  }

  pub fn field(
    &self,
    id: &FieldId,
  ) -> &FieldDefinition {
    self.fields.get(id)
  }

  pub fn types(&self) -> impl Iterator<Item = (TypeDefId, &TypeDefinition)> {
    self.types.iter()
  }

  pub fn type_count(&self) -> usize {
    self.types.len()
  }
}
