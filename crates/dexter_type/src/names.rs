//! Names the lowering passes agree on with the code generator and the
//! runtime support library.

pub const SYSTEM: &str = "System";
pub const SYSTEM_COLLECTIONS: &str = "System.Collections";
pub const SYSTEM_COLLECTIONS_GENERIC: &str = "System.Collections.Generic";
pub const SYSTEM_THREADING: &str = "System.Threading";
pub const ATOMIC_NAMESPACE: &str = "Java.Util.Concurrent.Atomic";
pub const INTERNAL_NAMESPACE: &str = "Dexter.Internal";

pub const OBJECT: &str = "Object";
pub const STRING: &str = "String";
pub const TYPE: &str = "Type";
pub const ARRAY: &str = "Array";
pub const ENUM: &str = "Enum";
pub const VALUE_TYPE: &str = "ValueType";
pub const NULLABLE: &str = "Nullable`1";
pub const RUNTIME_TYPE_HANDLE: &str = "RuntimeTypeHandle";
pub const DELEGATE: &str = "Delegate";
pub const MULTICAST_DELEGATE: &str = "MulticastDelegate";
pub const FORMATTABLE: &str = "IFormattable";
pub const INTERLOCKED: &str = "Interlocked";

pub const COMPILER_HELPER: &str = "CompilerHelper";
pub const TYPE_HELPER: &str = "TypeHelper";

pub const INT_UPDATER: &str = "AtomicIntegerFieldUpdater";
pub const LONG_UPDATER: &str = "AtomicLongFieldUpdater";
pub const REFERENCE_UPDATER: &str = "AtomicReferenceFieldUpdater";

pub const CONSTRUCTOR: &str = ".ctor";
pub const CLASS_CONSTRUCTOR: &str = ".cctor";

pub const STRUCT_CLONE: &str = "$Clone";
pub const STRUCT_COPY_FROM: &str = "$CopyFrom";
pub const STRUCT_DEFAULT_FIELD: &str = "$Default";
pub const ATOMIC_UPDATER_SUFFIX: &str = "$Updater";
