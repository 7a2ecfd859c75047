use std::collections::HashMap;

use crate::definition::{
  Constant, DefinitionStore, FieldDefinition, FieldFlags, FieldId, MethodDefinition, MethodFlags, MethodId,
  ParameterDefinition, TypeDefId, TypeDefinition, TypeKind,
};
use crate::member::{FieldRef, FieldRefData, MethodRef, MethodRefData};
use crate::names;
use crate::runtime;
use crate::types::{PrimitiveType, Type, TypeRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionInterface {
  Enumerable,
  Collection,
  List,
}

impl CollectionInterface {
  /// Suffix of the `CastToX` / `AsX` runtime helpers.
  pub fn helper_suffix(self) -> &'static str {
    match self {
      CollectionInterface::Enumerable => "Enumerable",
      CollectionInterface::Collection => "Collection",
      CollectionInterface::List => "List",
    }
  }
}

/// Read-only view of the host's metadata.
///
/// Built once through [`TypeSystemBuilder`]; afterwards it is only queried, so
/// a single instance can be shared by threads lowering different methods.
#[derive(Debug, Clone)]
pub struct TypeSystem {
  defs: DefinitionStore,
  by_name: HashMap<(String, String), TypeDefId>,
}

impl TypeSystem {
  pub fn builder() -> TypeSystemBuilder {
    TypeSystemBuilder::new()
  }

  pub fn definitions(&self) -> &DefinitionStore {
    &self.defs
  }

  pub fn type_def(
    &self,
    id: &TypeDefId,
  ) -> &TypeDefinition {
    self.defs.type_def(id)
  }

  pub fn method(
    &self,
    id: &MethodId,
  ) -> &MethodDefinition {
    self.defs.method(id)
  }

  pub fn field(
    &self,
    id: &FieldId,
  ) -> &FieldDefinition {
    self.defs.field(id)
  }

  pub fn find_type(
    &self,
    namespace: &str,
    name: &str,
  ) -> Option<TypeDefId> {
    self.by_name.get(&(namespace.to_string(), name.to_string())).copied()
  }

  /// Reference by name; unknown names produce an unresolved reference.
  pub fn type_ref(
    &self,
    namespace: &str,
    name: &str,
  ) -> TypeRef {
    match self.find_type(namespace, name) {
      Some(id) => TypeRef::definition(id),
      None => TypeRef::unresolved(namespace, name),
    }
  }

  pub fn object(&self) -> TypeRef {
    self.type_ref(names::SYSTEM, names::OBJECT)
  }

  pub fn string(&self) -> TypeRef {
    self.type_ref(names::SYSTEM, names::STRING)
  }

  pub fn system_type(&self) -> TypeRef {
    self.type_ref(names::SYSTEM, names::TYPE)
  }

  pub fn resolve(
    &self,
    ty: &TypeRef,
  ) -> Option<&TypeDefinition> {
    ty.definition_id().map(|id| self.defs.type_def(&id))
  }

  pub fn resolve_method(
    &self,
    method: &MethodRef,
  ) -> Option<&MethodDefinition> {
    method.definition().map(|id| self.defs.method(&id))
  }

  pub fn resolve_field(
    &self,
    field: &FieldRef,
  ) -> Option<&FieldDefinition> {
    field.definition().map(|id| self.defs.field(&id))
  }

  fn is_named(
    &self,
    ty: &TypeRef,
    namespace: &str,
    name: &str,
  ) -> bool {
    match ty.kind() {
      Type::Definition(_) | Type::GenericInstance { .. } => self
        .resolve(ty)
        .is_some_and(|def| def.namespace == namespace && def.name == name),
      Type::Unresolved { namespace: ns, name: n } => ns == namespace && n == name,
      _ => false,
    }
  }

  pub fn is_value_type(
    &self,
    ty: &TypeRef,
  ) -> bool {
    if ty.is_primitive() {
      return true;
    }
    self.resolve(ty).is_some_and(TypeDefinition::is_value_type)
  }

  pub fn is_enum(
    &self,
    ty: &TypeRef,
  ) -> bool {
    self.resolve(ty).is_some_and(TypeDefinition::is_enum)
  }

  pub fn enum_underlying(
    &self,
    ty: &TypeRef,
  ) -> Option<PrimitiveType> {
    let def = self.resolve(ty).filter(|def| def.is_enum())?;
    Some(def.enum_underlying.unwrap_or(PrimitiveType::Int32))
  }

  /// Enum whose underlying integer is 64-bit.
  pub fn is_wide_enum(
    &self,
    ty: &TypeRef,
  ) -> bool {
    self.enum_underlying(ty).is_some_and(PrimitiveType::is_wide)
  }

  pub fn is_nullable(
    &self,
    ty: &TypeRef,
  ) -> bool {
    self.is_named(ty, names::SYSTEM, names::NULLABLE)
  }

  /// `T` of a `Nullable<T>` instance.
  pub fn nullable_payload<'a>(
    &self,
    ty: &'a TypeRef,
  ) -> Option<&'a TypeRef> {
    if !self.is_nullable(ty) {
      return None;
    }
    ty.generic_arguments().first()
  }

  /// Non-primitive value type that is neither an enum nor a nullable.
  pub fn is_struct(
    &self,
    ty: &TypeRef,
  ) -> bool {
    if ty.as_primitive().is_some() || self.is_nullable(ty) {
      return false;
    }
    self.resolve(ty).is_some_and(|def| def.kind == TypeKind::Struct)
  }

  pub fn is_immutable_struct(
    &self,
    ty: &TypeRef,
  ) -> bool {
    self.is_struct(ty) && self.resolve(ty).is_some_and(TypeDefinition::is_immutable)
  }

  pub fn is_imported(
    &self,
    ty: &TypeRef,
  ) -> bool {
    self.resolve(ty).is_some_and(TypeDefinition::is_imported)
  }

  pub fn is_delegate(
    &self,
    ty: &TypeRef,
  ) -> bool {
    self.resolve(ty).is_some_and(|def| def.kind == TypeKind::Delegate)
  }

  pub fn is_system_object(
    &self,
    ty: &TypeRef,
  ) -> bool {
    self.is_named(ty, names::SYSTEM, names::OBJECT)
  }

  pub fn is_system_array(
    &self,
    ty: &TypeRef,
  ) -> bool {
    self.is_named(ty, names::SYSTEM, names::ARRAY)
  }

  pub fn is_system_type(
    &self,
    ty: &TypeRef,
  ) -> bool {
    self.is_named(ty, names::SYSTEM, names::TYPE)
  }

  /// `System.Enum`, the base of every enum.
  pub fn is_internal_enum(
    &self,
    ty: &TypeRef,
  ) -> bool {
    self.is_named(ty, names::SYSTEM, names::ENUM)
  }

  pub fn is_formattable(
    &self,
    ty: &TypeRef,
  ) -> bool {
    self.is_named(ty, names::SYSTEM, names::FORMATTABLE)
  }

  /// Collection interface kind plus whether it is the generic flavour.
  pub fn collection_interface(
    &self,
    ty: &TypeRef,
  ) -> Option<(CollectionInterface, bool)> {
    let candidates = [
      ("IEnumerable", CollectionInterface::Enumerable),
      ("ICollection", CollectionInterface::Collection),
      ("IList", CollectionInterface::List),
    ];
    for (name, kind) in candidates {
      if self.is_named(ty, names::SYSTEM_COLLECTIONS, name) {
        return Some((kind, false));
      }
      if self.is_named(ty, names::SYSTEM_COLLECTIONS_GENERIC, &format!("{}`1", name)) {
        return Some((kind, true));
      }
    }
    None
  }

  pub fn is_interlocked(
    &self,
    ty: &TypeRef,
  ) -> bool {
    self.is_named(ty, names::SYSTEM_THREADING, names::INTERLOCKED)
  }

  /// Internal runtime-support type by name.
  pub fn helper_type(
    &self,
    name: &str,
  ) -> Option<TypeDefId> {
    self.find_type(names::INTERNAL_NAMESPACE, name)
  }

  /// First method named `name`, optionally restricted to a parameter count.
  pub fn find_method(
    &self,
    ty: TypeDefId,
    name: &str,
    param_count: Option<usize>,
  ) -> Option<MethodId> {
    self.defs.type_def(&ty).methods.iter().copied().find(|id| {
      let method = self.defs.method(id);
      method.name == name && param_count.map_or(true, |count| method.parameters.len() == count)
    })
  }

  pub fn find_field(
    &self,
    ty: TypeDefId,
    name: &str,
  ) -> Option<FieldId> {
    self.defs.type_def(&ty).fields.iter().copied().find(|id| self.defs.field(id).name == name)
  }

  /// Method looked up through a type reference, any arity.
  pub fn method_named(
    &self,
    ty: &TypeRef,
    name: &str,
  ) -> Option<MethodId> {
    self.find_method(ty.definition_id()?, name, None)
  }

  pub fn field_named(
    &self,
    ty: &TypeRef,
    name: &str,
  ) -> Option<FieldId> {
    self.find_field(ty.definition_id()?, name)
  }

  /// Literal field of an enum holding `value`.
  pub fn enum_const_field(
    &self,
    enum_type: TypeDefId,
    value: i64,
  ) -> Option<FieldId> {
    self.defs.type_def(&enum_type).fields.iter().copied().find(|id| {
      let field = self.defs.field(id);
      field.is_static() && field.is_literal() && field.constant.and_then(|c| c.as_int()) == Some(value)
    })
  }

  pub fn method_ref(
    &self,
    declaring: &TypeRef,
    id: MethodId,
  ) -> MethodRef {
    let def = self.defs.method(&id);
    MethodRef::new(MethodRefData {
      name: def.name.clone(),
      declaring_type: declaring.clone(),
      generic_arguments: Vec::new(),
      parameters: def.parameters.iter().map(|p| p.ty.clone()).collect(),
      return_type: def.return_type.clone(),
      has_this: !def.is_static(),
      definition: Some(id),
    })
  }

  /// Reference to a method through its own declaring definition.
  pub fn method_ref_of(
    &self,
    id: MethodId,
  ) -> MethodRef {
    let declaring = TypeRef::definition(self.defs.method(&id).declaring_type);
    self.method_ref(&declaring, id)
  }

  pub fn field_ref(
    &self,
    declaring: &TypeRef,
    id: FieldId,
  ) -> FieldRef {
    let def = self.defs.field(&id);
    FieldRef::new(FieldRefData {
      name: def.name.clone(),
      declaring_type: declaring.clone(),
      field_type: def.field_type.clone(),
      is_static: def.is_static(),
      definition: Some(id),
    })
  }

  pub fn field_ref_of(
    &self,
    id: FieldId,
  ) -> FieldRef {
    let declaring = TypeRef::definition(self.defs.field(&id).declaring_type);
    self.field_ref(&declaring, id)
  }

  /// Short human readable name, used by printers and diagnostics.
  pub fn type_name(
    &self,
    ty: &TypeRef,
  ) -> String {
    match ty.kind() {
      Type::Primitive(p) => p.name().to_string(),
      Type::Definition(id) => self.defs.type_def(id).name.clone(),
      Type::Unresolved { name, .. } => name.clone(),
      Type::Array { element, rank } => {
        format!("{}[{}]", self.type_name(element), ",".repeat(rank.saturating_sub(1) as usize))
      },
      Type::ByReference(element) => format!("{}&", self.type_name(element)),
      Type::GenericInstance { definition, arguments } => {
        let name = &self.defs.type_def(definition).name;
        let base = name.split('`').next().unwrap_or(name);
        let args: Vec<String> = arguments.iter().map(|a| self.type_name(a)).collect();
        format!("{}<{}>", base, args.join(", "))
      },
      Type::GenericParameter { name, .. } => name.clone(),
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct TypeSystemBuilder {
  defs: DefinitionStore,
  by_name: HashMap<(String, String), TypeDefId>,
}

impl TypeSystemBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers the core library and the internal runtime-support types.
  pub fn with_runtime_support(mut self) -> Self {
    runtime::install(&mut self);
    self
  }

  pub fn add_type(
    &mut self,
    def: TypeDefinition,
  ) -> TypeDefId {
    let key = (def.namespace.clone(), def.name.clone());
    let id = self.defs.alloc_type(def);
    self.by_name.insert(key, id);
    id
  }

  pub fn find_type(
    &self,
    namespace: &str,
    name: &str,
  ) -> Option<TypeDefId> {
    self.by_name.get(&(namespace.to_string(), name.to_string())).copied()
  }

  /// Named reference; unknown names stay unresolved.
  pub fn type_ref(
    &self,
    namespace: &str,
    name: &str,
  ) -> TypeRef {
    match self.find_type(namespace, name) {
      Some(id) => TypeRef::definition(id),
      None => TypeRef::unresolved(namespace, name),
    }
  }

  pub fn type_def_mut(
    &mut self,
    id: TypeDefId,
  ) -> &mut TypeDefinition {
    self.defs.type_def_mut(id)
  }

  pub fn class(
    &mut self,
    namespace: &str,
    name: &str,
  ) -> TypeDefId {
    let mut def = TypeDefinition::new(namespace, name, TypeKind::Class);
    def.base_type = self.find_type(names::SYSTEM, names::OBJECT).map(TypeRef::definition);
    self.add_type(def)
  }

  pub fn interface(
    &mut self,
    namespace: &str,
    name: &str,
  ) -> TypeDefId {
    self.add_type(TypeDefinition::new(namespace, name, TypeKind::Interface))
  }

  pub fn struct_type(
    &mut self,
    namespace: &str,
    name: &str,
  ) -> TypeDefId {
    let mut def = TypeDefinition::new(namespace, name, TypeKind::Struct);
    def.base_type = self.find_type(names::SYSTEM, names::VALUE_TYPE).map(TypeRef::definition);
    self.add_type(def)
  }

  /// Enum type plus one literal static field per member.
  pub fn enum_type(
    &mut self,
    namespace: &str,
    name: &str,
    underlying: PrimitiveType,
    members: &[(&str, i64)],
  ) -> TypeDefId {
    let mut def = TypeDefinition::new(namespace, name, TypeKind::Enum);
    def.base_type = self.find_type(names::SYSTEM, names::ENUM).map(TypeRef::definition);
    def.enum_underlying = Some(underlying);
    let id = self.add_type(def);

    for (member, value) in members {
      self.defs.alloc_field(FieldDefinition {
        name: member.to_string(),
        declaring_type: id,
        field_type: TypeRef::definition(id),
        flags: FieldFlags::STATIC | FieldFlags::LITERAL,
        constant: Some(Constant::Int(*value)),
      });
    }

    id
  }

  pub fn delegate_type(
    &mut self,
    namespace: &str,
    name: &str,
  ) -> TypeDefId {
    let mut def = TypeDefinition::new(namespace, name, TypeKind::Delegate);
    def.base_type = self.find_type(names::SYSTEM, names::MULTICAST_DELEGATE).map(TypeRef::definition);
    let id = self.add_type(def);
    let object = self.type_ref(names::SYSTEM, names::OBJECT);
    self.add_method(
      id,
      names::CONSTRUCTOR,
      MethodFlags::CONSTRUCTOR,
      vec![
        ParameterDefinition::new("object", object),
        ParameterDefinition::new("method", TypeRef::primitive(PrimitiveType::IntPtr)),
      ],
      TypeRef::void(),
    );
    id
  }

  pub fn add_method(
    &mut self,
    ty: TypeDefId,
    name: &str,
    flags: MethodFlags,
    parameters: Vec<ParameterDefinition>,
    return_type: TypeRef,
  ) -> MethodId {
    self.defs.alloc_method(MethodDefinition {
      name: name.to_string(),
      declaring_type: ty,
      flags,
      parameters,
      return_type,
      generic_parameters: Vec::new(),
    })
  }

  pub fn add_field(
    &mut self,
    ty: TypeDefId,
    name: &str,
    field_type: TypeRef,
    flags: FieldFlags,
  ) -> FieldId {
    self.defs.alloc_field(FieldDefinition {
      name: name.to_string(),
      declaring_type: ty,
      field_type,
      flags,
      constant: None,
    })
  }

  pub fn method_mut(
    &mut self,
    id: MethodId,
  ) -> &mut MethodDefinition {
    self.defs.method_mut(id)
  }

  pub fn build(self) -> TypeSystem {
    TypeSystem {
      defs: self.defs,
      by_name: self.by_name,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn types() -> (TypeSystem, TypeDefId, TypeDefId) {
    let mut builder = TypeSystem::builder().with_runtime_support();
    let point = builder.struct_type("Demo", "Point");
    let color = builder.enum_type("Demo", "Color", PrimitiveType::Int32, &[("Red", 0), ("Green", 1)]);
    (builder.build(), point, color)
  }

  #[test]
  fn classifies_structs_enums_and_nullables() {
    let (types, point, color) = types();
    let point = TypeRef::definition(point);
    let color = TypeRef::definition(color);
    let nullable = types.find_type(names::SYSTEM, names::NULLABLE).unwrap();
    let nullable_int = TypeRef::generic_instance(nullable, vec![TypeRef::int32()]);

    assert!(types.is_struct(&point));
    assert!(!types.is_struct(&color));
    assert!(types.is_enum(&color));
    assert!(!types.is_struct(&nullable_int));
    assert!(types.is_nullable(&nullable_int));
    assert_eq!(types.nullable_payload(&nullable_int), Some(&TypeRef::int32()));
    assert!(!types.is_struct(&TypeRef::int32()));
  }

  #[test]
  fn finds_enum_constant_fields_by_value() {
    let (types, _, color) = types();
    let green = types.enum_const_field(color, 1).unwrap();
    assert_eq!(types.field(&green).name, "Green");
    assert!(types.enum_const_field(color, 7).is_none());
  }

  #[test]
  fn helper_methods_are_found_by_name_and_arity() {
    let (types, _, _) = types();
    let helper = types.helper_type(names::COMPILER_HELPER).unwrap();
    assert!(types.find_method(helper, "CastToArray", Some(1)).is_some());
    assert!(types.find_method(helper, "CastToArray", Some(2)).is_none());
  }

  #[test]
  fn collection_interfaces_report_their_flavour() {
    let (types, _, _) = types();
    let list = types.type_ref(names::SYSTEM_COLLECTIONS, "IList");
    let enumerable_t = types.find_type(names::SYSTEM_COLLECTIONS_GENERIC, "IEnumerable`1").unwrap();
    let enumerable_int = TypeRef::generic_instance(enumerable_t, vec![TypeRef::int32()]);

    assert_eq!(types.collection_interface(&list), Some((CollectionInterface::List, false)));
    assert_eq!(
      types.collection_interface(&enumerable_int),
      Some((CollectionInterface::Enumerable, true))
    );
    assert_eq!(types.type_name(&enumerable_int), "IEnumerable<int32>");
  }
}
