//! Core library and runtime-support metadata every host is expected to provide.
//!
//! Hosts that load real metadata register the same names; tests use this to
//! get a complete type system in one call.

use crate::definition::{MethodFlags, ParameterDefinition, TypeDefId, TypeDefinition, TypeFlags, TypeKind};
use crate::names;
use crate::system::TypeSystemBuilder;
use crate::types::{GenericOwner, TypeRef};

pub fn install(builder: &mut TypeSystemBuilder) {
  let object = builder.add_type(TypeDefinition::new(names::SYSTEM, names::OBJECT, TypeKind::Class));
  let object_ref = TypeRef::definition(object);
  let value_type = builder.class(names::SYSTEM, names::VALUE_TYPE);
  let enum_base = builder.class(names::SYSTEM, names::ENUM);
  builder.type_def_mut(enum_base).base_type = Some(TypeRef::definition(value_type));
  builder.class(names::SYSTEM, names::STRING);
  builder.class(names::SYSTEM, names::RUNTIME_TYPE_HANDLE);
  builder.class(names::SYSTEM, names::DELEGATE);
  builder.class(names::SYSTEM, names::MULTICAST_DELEGATE);

  install_system_type(builder, &object_ref);
  install_array(builder);
  install_nullable(builder);
  install_collections(builder);
  install_interlocked(builder);
  install_updaters(builder, &object_ref);
  install_helpers(builder, &object_ref);
}

fn static_method(
  builder: &mut TypeSystemBuilder,
  ty: TypeDefId,
  name: &str,
  params: &[TypeRef],
  ret: TypeRef,
) {
  let params = params
    .iter()
    .enumerate()
    .map(|(i, p)| ParameterDefinition::new(&format!("p{}", i), p.clone()))
    .collect();
  builder.add_method(ty, name, MethodFlags::STATIC, params, ret);
}

fn instance_method(
  builder: &mut TypeSystemBuilder,
  ty: TypeDefId,
  name: &str,
  params: &[TypeRef],
  ret: TypeRef,
) {
  let params = params
    .iter()
    .enumerate()
    .map(|(i, p)| ParameterDefinition::new(&format!("p{}", i), p.clone()))
    .collect();
  builder.add_method(ty, name, MethodFlags::VIRTUAL, params, ret);
}

fn install_system_type(
  builder: &mut TypeSystemBuilder,
  object: &TypeRef,
) {
  let ty = builder.class(names::SYSTEM, names::TYPE);
  let ty_ref = TypeRef::definition(ty);
  let handle = builder.type_ref(names::SYSTEM, names::RUNTIME_TYPE_HANDLE);

  static_method(builder, ty, "GetTypeFromHandle", &[handle], ty_ref.clone());
  instance_method(builder, ty, "IsAssignableFrom", &[ty_ref.clone()], TypeRef::bool());
  instance_method(builder, ty, "GetIsArray", &[], TypeRef::bool());
  instance_method(builder, ty, "JavaIsInstance", &[object.clone()], TypeRef::bool());
}

fn install_array(builder: &mut TypeSystemBuilder) {
  let array = builder.class(names::SYSTEM, names::ARRAY);
  let enumerator = builder.interface(names::SYSTEM_COLLECTIONS, "IEnumerator");
  instance_method(builder, array, "GetEnumerator", &[], TypeRef::definition(enumerator));
}

fn install_nullable(builder: &mut TypeSystemBuilder) {
  let nullable = builder.struct_type(names::SYSTEM, names::NULLABLE);
  builder.type_def_mut(nullable).generic_parameters = vec!["T".to_string()];
  let t = TypeRef::generic_parameter(GenericOwner::Type(nullable), 0, "T");

  builder.add_method(
    nullable,
    names::CONSTRUCTOR,
    MethodFlags::CONSTRUCTOR,
    vec![ParameterDefinition::new("value", t.clone())],
    TypeRef::void(),
  );
  instance_method(builder, nullable, "get_HasValue", &[], TypeRef::bool());
  instance_method(builder, nullable, "get_Value", &[], t.clone());
  instance_method(builder, nullable, "get_RawValue", &[], t.clone());
  instance_method(builder, nullable, "GetValueOrDefault", &[], t.clone());
  instance_method(builder, nullable, "GetValueOrDefault", &[t.clone()], t);
}

fn install_collections(builder: &mut TypeSystemBuilder) {
  let enumerator = builder.type_ref(names::SYSTEM_COLLECTIONS, "IEnumerator");
  let enumerable = builder.interface(names::SYSTEM_COLLECTIONS, "IEnumerable");
  instance_method(builder, enumerable, "GetEnumerator", &[], enumerator);
  builder.interface(names::SYSTEM_COLLECTIONS, "ICollection");
  builder.interface(names::SYSTEM_COLLECTIONS, "IList");

  for name in ["IEnumerable`1", "ICollection`1", "IList`1"] {
    let id = builder.interface(names::SYSTEM_COLLECTIONS_GENERIC, name);
    builder.type_def_mut(id).generic_parameters = vec!["T".to_string()];
  }

  builder.interface(names::SYSTEM, names::FORMATTABLE);
}

fn install_interlocked(builder: &mut TypeSystemBuilder) {
  let interlocked = builder.class(names::SYSTEM_THREADING, names::INTERLOCKED);
  let int_ref = TypeRef::by_reference(TypeRef::int32());
  let int = TypeRef::int32();

  static_method(builder, interlocked, "Increment", &[int_ref.clone()], int.clone());
  static_method(builder, interlocked, "Decrement", &[int_ref.clone()], int.clone());
  static_method(builder, interlocked, "Add", &[int_ref.clone(), int.clone()], int.clone());
  static_method(builder, interlocked, "Read", &[TypeRef::by_reference(TypeRef::int64())], TypeRef::int64());
  static_method(builder, interlocked, "Exchange", &[int_ref.clone(), int.clone()], int.clone());
  static_method(builder, interlocked, "CompareExchange", &[int_ref, int.clone(), int.clone()], int);
}

fn install_updaters(
  builder: &mut TypeSystemBuilder,
  object: &TypeRef,
) {
  let class = builder.type_ref(names::SYSTEM, names::TYPE);
  let string = builder.type_ref(names::SYSTEM, names::STRING);

  for (name, value) in [
    (names::INT_UPDATER, TypeRef::int32()),
    (names::LONG_UPDATER, TypeRef::int64()),
    (names::REFERENCE_UPDATER, object.clone()),
  ] {
    let updater = builder.class(names::ATOMIC_NAMESPACE, name);
    builder.type_def_mut(updater).flags |= TypeFlags::IMPORTED;
    let updater_ref = TypeRef::definition(updater);

    if name == names::REFERENCE_UPDATER {
      static_method(builder, updater, "NewUpdater", &[class.clone(), class.clone(), string.clone()], updater_ref);
    } else {
      static_method(builder, updater, "NewUpdater", &[class.clone(), string.clone()], updater_ref);
    }

    instance_method(builder, updater, "Get", &[object.clone()], value.clone());
    instance_method(builder, updater, "GetAndSet", &[object.clone(), value.clone()], value.clone());
    instance_method(
      builder,
      updater,
      "CompareAndSet",
      &[object.clone(), value.clone(), value.clone()],
      TypeRef::bool(),
    );
    instance_method(
      builder,
      updater,
      "CompareExchange",
      &[object.clone(), value.clone(), value.clone()],
      value.clone(),
    );

    if name != names::REFERENCE_UPDATER {
      instance_method(builder, updater, "IncrementAndGet", &[object.clone()], value.clone());
      instance_method(builder, updater, "DecrementAndGet", &[object.clone()], value.clone());
      instance_method(builder, updater, "AddAndGet", &[object.clone(), value.clone()], value);
    }
  }
}

fn install_helpers(
  builder: &mut TypeSystemBuilder,
  object: &TypeRef,
) {
  let compiler_helper = builder.class(names::INTERNAL_NAMESPACE, names::COMPILER_HELPER);
  let object_array = TypeRef::array(object.clone());

  static_method(builder, compiler_helper, "CastToArray", &[object.clone()], object_array.clone());
  static_method(builder, compiler_helper, "AsArray", &[object.clone()], object_array);
  static_method(builder, compiler_helper, "IsArray", &[object.clone()], TypeRef::bool());
  static_method(builder, compiler_helper, "IsVirtualFormattable", &[object.clone()], TypeRef::bool());

  for suffix in ["Enumerable", "Collection", "List", "Formattable"] {
    static_method(builder, compiler_helper, &format!("CastTo{}", suffix), &[object.clone()], object.clone());
    static_method(builder, compiler_helper, &format!("As{}", suffix), &[object.clone()], object.clone());
  }

  let type_helper = builder.class(names::INTERNAL_NAMESPACE, names::TYPE_HELPER);
  let system_type = builder.type_ref(names::SYSTEM, names::TYPE);
  static_method(builder, type_helper, "EnsureGenericRuntimeType", &[system_type.clone()], system_type.clone());
  static_method(builder, type_helper, "Array", &[system_type.clone()], system_type.clone());
  static_method(builder, type_helper, "Array", &[system_type.clone(), TypeRef::int32()], system_type);
}
