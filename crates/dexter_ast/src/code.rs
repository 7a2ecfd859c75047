use dexter_type::{PrimitiveType, TypeRef};

/// Number of arguments an opcode accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
  Exact(usize),
  Range(usize, usize),
  AtLeast(usize),
}

impl Arity {
  pub fn accepts(
    self,
    count: usize,
  ) -> bool {
    match self {
      Arity::Exact(n) => count == n,
      Arity::Range(lo, hi) => (lo..=hi).contains(&count),
      Arity::AtLeast(n) => count >= n,
    }
  }
}

macro_rules! ast_codes {
  ($($variant:ident => $name:literal, $arity:expr;)*) => {
    /// Operation kind of an expression node.
    ///
    /// Covers the decompiled source-machine opcodes plus the synthetic forms
    /// the lowering passes introduce for the code generator.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum AstCode {
      $($variant,)*
    }

    impl AstCode {
      pub const ALL: &'static [AstCode] = &[$(AstCode::$variant,)*];

      pub fn name(self) -> &'static str {
        match self {
          $(AstCode::$variant => $name,)*
        }
      }

      pub fn arity(self) -> Arity {
        use Arity::*;
        match self {
          $(AstCode::$variant => $arity,)*
        }
      }
    }
  };
}

ast_codes! {
  Nop => "nop", Exact(0);
  Dup => "dup", Exact(1);
  Pop => "pop", Exact(1);
  Ldnull => "ldnull", Exact(0);
  LdcI4 => "ldc.i4", Exact(0);
  LdcI8 => "ldc.i8", Exact(0);
  LdcR4 => "ldc.r4", Exact(0);
  LdcR8 => "ldc.r8", Exact(0);
  Ldstr => "ldstr", Exact(0);
  Ldthis => "ldthis", Exact(0);
  Ldloc => "ldloc", Exact(0);
  Ldloca => "ldloca", Exact(0);
  Stloc => "stloc", Exact(1);
  Ldfld => "ldfld", Exact(1);
  Ldflda => "ldflda", Exact(1);
  Stfld => "stfld", Exact(2);
  Ldsfld => "ldsfld", Exact(0);
  Ldsflda => "ldsflda", Exact(0);
  Stsfld => "stsfld", Exact(1);
  Ldobj => "ldobj", Exact(1);
  Stobj => "stobj", Exact(2);
  LdindI4 => "ldind.i4", Exact(1);
  LdindI8 => "ldind.i8", Exact(1);
  LdindR4 => "ldind.r4", Exact(1);
  LdindR8 => "ldind.r8", Exact(1);
  LdindRef => "ldind.ref", Exact(1);
  StindI4 => "stind.i4", Exact(2);
  StindI8 => "stind.i8", Exact(2);
  StindR4 => "stind.r4", Exact(2);
  StindR8 => "stind.r8", Exact(2);
  StindRef => "stind.ref", Exact(2);
  Ldelema => "ldelema", Exact(2);
  LdelemI1 => "ldelem.i1", Exact(2);
  LdelemU1 => "ldelem.u1", Exact(2);
  LdelemI2 => "ldelem.i2", Exact(2);
  LdelemU2 => "ldelem.u2", Exact(2);
  LdelemI4 => "ldelem.i4", Exact(2);
  LdelemU4 => "ldelem.u4", Exact(2);
  LdelemI8 => "ldelem.i8", Exact(2);
  LdelemR4 => "ldelem.r4", Exact(2);
  LdelemR8 => "ldelem.r8", Exact(2);
  LdelemRef => "ldelem.ref", Exact(2);
  LdelemAny => "ldelem.any", Exact(2);
  StelemI1 => "stelem.i1", Exact(3);
  StelemI2 => "stelem.i2", Exact(3);
  StelemI4 => "stelem.i4", Exact(3);
  StelemI8 => "stelem.i8", Exact(3);
  StelemR4 => "stelem.r4", Exact(3);
  StelemR8 => "stelem.r8", Exact(3);
  StelemRef => "stelem.ref", Exact(3);
  StelemAny => "stelem.any", Exact(3);
  Ldlen => "ldlen", Exact(1);
  Newarr => "newarr", Exact(1);
  MultiNewarr => "multinewarr", AtLeast(1);
  InitArray => "initarray", AtLeast(0);
  InitArrayFromArguments => "initarray.args", AtLeast(0);
  InitStructArray => "initarray.struct", Exact(1);
  InitEnumArray => "initarray.enum", Exact(1);
  ArrayNewInstance => "array.newinstance", Exact(2);
  ArrayNewInstance2 => "array.newinstance2", Exact(2);
  Add => "add", Exact(2);
  AddOvf => "add.ovf", Exact(2);
  AddOvfUn => "add.ovf.un", Exact(2);
  Sub => "sub", Exact(2);
  SubOvf => "sub.ovf", Exact(2);
  SubOvfUn => "sub.ovf.un", Exact(2);
  Mul => "mul", Exact(2);
  MulOvf => "mul.ovf", Exact(2);
  MulOvfUn => "mul.ovf.un", Exact(2);
  Div => "div", Exact(2);
  DivUn => "div.un", Exact(2);
  Rem => "rem", Exact(2);
  RemUn => "rem.un", Exact(2);
  And => "and", Exact(2);
  Or => "or", Exact(2);
  Xor => "xor", Exact(2);
  Shl => "shl", Exact(2);
  Shr => "shr", Exact(2);
  ShrUn => "shr.un", Exact(2);
  Neg => "neg", Exact(1);
  Not => "not", Exact(1);
  ConvI1 => "conv.i1", Exact(1);
  ConvI2 => "conv.i2", Exact(1);
  ConvI4 => "conv.i4", Exact(1);
  ConvI8 => "conv.i8", Exact(1);
  ConvU1 => "conv.u1", Exact(1);
  ConvU2 => "conv.u2", Exact(1);
  ConvU4 => "conv.u4", Exact(1);
  ConvU8 => "conv.u8", Exact(1);
  ConvR4 => "conv.r4", Exact(1);
  ConvR8 => "conv.r8", Exact(1);
  ConvRUn => "conv.r.un", Exact(1);
  ConvI => "conv.i", Exact(1);
  ConvU => "conv.u", Exact(1);
  ConvOvfI1 => "conv.ovf.i1", Exact(1);
  ConvOvfI2 => "conv.ovf.i2", Exact(1);
  ConvOvfI4 => "conv.ovf.i4", Exact(1);
  ConvOvfI8 => "conv.ovf.i8", Exact(1);
  ConvOvfU1 => "conv.ovf.u1", Exact(1);
  ConvOvfU2 => "conv.ovf.u2", Exact(1);
  ConvOvfU4 => "conv.ovf.u4", Exact(1);
  ConvOvfU8 => "conv.ovf.u8", Exact(1);
  IntToUbyte => "int_to_ubyte", Exact(1);
  IntToUshort => "int_to_ushort", Exact(1);
  Ceq => "ceq", Exact(2);
  Cne => "cne", Exact(2);
  Cgt => "cgt", Exact(2);
  CgtUn => "cgt.un", Exact(2);
  Cge => "cge", Exact(2);
  CgeUn => "cge.un", Exact(2);
  Clt => "clt", Exact(2);
  CltUn => "clt.un", Exact(2);
  Cle => "cle", Exact(2);
  CleUn => "cle.un", Exact(2);
  CIsNull => "cisnull", Exact(1);
  CIsNotNull => "cisnotnull", Exact(1);
  CmpLFloat => "cmpl.float", Exact(2);
  CmpGFloat => "cmpg.float", Exact(2);
  CmpLong => "cmp.long", Exact(2);
  Br => "br", Exact(0);
  Brtrue => "brtrue", Exact(1);
  Brfalse => "brfalse", Exact(1);
  Beq => "beq", Exact(2);
  BneUn => "bne.un", Exact(2);
  Bge => "bge", Exact(2);
  BgeUn => "bge.un", Exact(2);
  Bgt => "bgt", Exact(2);
  BgtUn => "bgt.un", Exact(2);
  Ble => "ble", Exact(2);
  BleUn => "ble.un", Exact(2);
  Blt => "blt", Exact(2);
  BltUn => "blt.un", Exact(2);
  BrIfEq => "brifeq", Exact(1);
  BrIfNe => "brifne", Exact(1);
  BrIfLt => "briflt", Exact(1);
  BrIfGe => "brifge", Exact(1);
  BrIfGt => "brifgt", Exact(1);
  BrIfLe => "brifle", Exact(1);
  Switch => "switch", Exact(1);
  LookupSwitch => "lookupswitch", Exact(1);
  Leave => "leave", Exact(0);
  Endfinally => "endfinally", Exact(0);
  Ret => "ret", Range(0, 1);
  Throw => "throw", Exact(1);
  Rethrow => "rethrow", Exact(0);
  Call => "call", AtLeast(0);
  Callvirt => "callvirt", AtLeast(0);
  CallIntf => "callintf", AtLeast(0);
  CallSpecial => "callspecial", AtLeast(0);
  CallBaseCtor => "callbasector", AtLeast(0);
  Calli => "calli", AtLeast(1);
  Newobj => "newobj", AtLeast(0);
  Castclass => "castclass", Exact(1);
  SimpleCastclass => "simplecastclass", Exact(1);
  Isinst => "isinst", Exact(1);
  InstanceOf => "instanceof", Exact(1);
  SimpleInstanceOf => "simpleinstanceof", Exact(1);
  Box => "box", Exact(1);
  Unbox => "unbox", Exact(1);
  UnboxAny => "unbox.any", Exact(1);
  UnboxFromGeneric => "unbox.generic", Exact(1);
  Initobj => "initobj", Exact(1);
  DefaultValue => "defaultvalue", Exact(0);
  Sizeof => "sizeof", Exact(0);
  Ldtoken => "ldtoken", Exact(0);
  Ldftn => "ldftn", Exact(0);
  Ldvirtftn => "ldvirtftn", Exact(1);
  TypeOf => "typeof", Range(0, 1);
  BoxedTypeOf => "boxedtypeof", Range(0, 1);
  NullableTypeOf => "nullabletypeof", Range(0, 1);
  LdClass => "ldclass", Exact(0);
  Ldexception => "ldexception", Exact(0);
  NullCoalescing => "nullcoalescing", Exact(2);
  Conditional => "conditional", Exact(3);
  CompoundAdd => "compound.add", Exact(2);
  CompoundSub => "compound.sub", Exact(2);
  CompoundMul => "compound.mul", Exact(2);
  CompoundDiv => "compound.div", Exact(2);
  CompoundRem => "compound.rem", Exact(2);
  CompoundAnd => "compound.and", Exact(2);
  CompoundOr => "compound.or", Exact(2);
  CompoundXor => "compound.xor", Exact(2);
  CompoundShl => "compound.shl", Exact(2);
  CompoundShr => "compound.shr", Exact(2);
  CompoundShrUn => "compound.shr.un", Exact(2);
  PostIncrement => "postincrement", Exact(1);
  AddressOf => "addressof", Exact(1);
  Wrap => "wrap", Exact(1);
  Delegate => "delegate", AtLeast(0);
  ByRefArray => "byrefarray", Exact(2);
  ByRefOutArray => "byrefoutarray", Exact(2);
  EnumToInt => "enum_to_int", Exact(1);
  EnumToLong => "enum_to_long", Exact(1);
  IntToEnum => "int_to_enum", Exact(1);
  LongToEnum => "long_to_enum", Exact(1);
  LdGenericInstanceField => "ldgenericinstancefield", Exact(0);
  LdGenericInstanceTypeArgument => "ldgenericinstancetypearg", Exact(0);
  LdGenericInstanceMethodArgument => "ldgenericinstancemethodarg", Exact(0);
  MonitorEnter => "monitorenter", Exact(1);
  MonitorExit => "monitorexit", Exact(1);
}

impl AstCode {
  pub fn is_compare(self) -> bool {
    self.is_integer_only_compare() || matches!(self, AstCode::Ceq | AstCode::Cne)
  }

  /// Ordering comparisons; equality is excluded.
  pub fn is_integer_only_compare(self) -> bool {
    matches!(
      self,
      AstCode::Cle
        | AstCode::CleUn
        | AstCode::Clt
        | AstCode::CltUn
        | AstCode::Cgt
        | AstCode::CgtUn
        | AstCode::Cge
        | AstCode::CgeUn
    )
  }

  pub fn is_unsigned_compare(self) -> bool {
    matches!(self, AstCode::CleUn | AstCode::CltUn | AstCode::CgtUn | AstCode::CgeUn)
  }

  /// Logical negation of a comparison.
  ///
  /// For floating point operands an ordered comparison negates to the
  /// unordered complement (`!(a < b)` holds for NaN) and vice versa.
  pub fn reverse_compare(
    self,
    float_operands: bool,
  ) -> Option<AstCode> {
    let reversed = match (self, float_operands) {
      (AstCode::Ceq, _) => AstCode::Cne,
      (AstCode::Cne, _) => AstCode::Ceq,
      (AstCode::CIsNull, _) => AstCode::CIsNotNull,
      (AstCode::CIsNotNull, _) => AstCode::CIsNull,
      (AstCode::Cle, false) => AstCode::Cgt,
      (AstCode::CleUn, false) => AstCode::CgtUn,
      (AstCode::Clt, false) => AstCode::Cge,
      (AstCode::CltUn, false) => AstCode::CgeUn,
      (AstCode::Cgt, false) => AstCode::Cle,
      (AstCode::CgtUn, false) => AstCode::CleUn,
      (AstCode::Cge, false) => AstCode::Clt,
      (AstCode::CgeUn, false) => AstCode::CltUn,
      (AstCode::Cle, true) => AstCode::CgtUn,
      (AstCode::CleUn, true) => AstCode::Cgt,
      (AstCode::Clt, true) => AstCode::CgeUn,
      (AstCode::CltUn, true) => AstCode::Cge,
      (AstCode::Cgt, true) => AstCode::CleUn,
      (AstCode::CgtUn, true) => AstCode::Cle,
      (AstCode::Cge, true) => AstCode::CltUn,
      (AstCode::CgeUn, true) => AstCode::Clt,
      _ => return None,
    };
    Some(reversed)
  }

  /// Two-operand branch equivalent of a comparison.
  pub fn to_branch(self) -> Option<AstCode> {
    let branch = match self {
      AstCode::Cle => AstCode::Ble,
      AstCode::CleUn => AstCode::BleUn,
      AstCode::Clt => AstCode::Blt,
      AstCode::CltUn => AstCode::BltUn,
      AstCode::Ceq => AstCode::Beq,
      AstCode::Cne => AstCode::BneUn,
      AstCode::Cgt => AstCode::Bgt,
      AstCode::CgtUn => AstCode::BgtUn,
      AstCode::Cge => AstCode::Bge,
      AstCode::CgeUn => AstCode::BgeUn,
      _ => return None,
    };
    Some(branch)
  }

  /// Branch-on-zero equivalent, applied to a three-way compare result.
  pub fn to_branch_z(self) -> Option<AstCode> {
    let branch = match self {
      AstCode::Cle | AstCode::CleUn => AstCode::BrIfLe,
      AstCode::Clt | AstCode::CltUn => AstCode::BrIfLt,
      AstCode::Ceq => AstCode::BrIfEq,
      AstCode::Cne => AstCode::BrIfNe,
      AstCode::Cgt | AstCode::CgtUn => AstCode::BrIfGt,
      AstCode::Cge | AstCode::CgeUn => AstCode::BrIfGe,
      _ => return None,
    };
    Some(branch)
  }

  pub fn reverse_branch_z(self) -> Option<AstCode> {
    let branch = match self {
      AstCode::BrIfEq => AstCode::BrIfNe,
      AstCode::BrIfNe => AstCode::BrIfEq,
      AstCode::BrIfLt => AstCode::BrIfGe,
      AstCode::BrIfGe => AstCode::BrIfLt,
      AstCode::BrIfGt => AstCode::BrIfLe,
      AstCode::BrIfLe => AstCode::BrIfGt,
      _ => return None,
    };
    Some(branch)
  }

  pub fn is_branch(self) -> bool {
    matches!(
      self,
      AstCode::Br
        | AstCode::Brtrue
        | AstCode::Brfalse
        | AstCode::Beq
        | AstCode::BneUn
        | AstCode::Bge
        | AstCode::BgeUn
        | AstCode::Bgt
        | AstCode::BgtUn
        | AstCode::Ble
        | AstCode::BleUn
        | AstCode::Blt
        | AstCode::BltUn
        | AstCode::BrIfEq
        | AstCode::BrIfNe
        | AstCode::BrIfLt
        | AstCode::BrIfGe
        | AstCode::BrIfGt
        | AstCode::BrIfLe
        | AstCode::Leave
    )
  }

  pub fn is_call(self) -> bool {
    matches!(
      self,
      AstCode::Call | AstCode::Callvirt | AstCode::CallIntf | AstCode::CallSpecial | AstCode::CallBaseCtor
    )
  }

  pub fn is_constant(self) -> bool {
    matches!(
      self,
      AstCode::Ldnull | AstCode::LdcI4 | AstCode::LdcI8 | AstCode::LdcR4 | AstCode::LdcR8 | AstCode::Ldstr
    )
  }

  pub fn is_address_of(self) -> bool {
    matches!(
      self,
      AstCode::Ldloca | AstCode::Ldflda | AstCode::Ldsflda | AstCode::Ldelema | AstCode::AddressOf
    )
  }

  pub fn is_ldelem(self) -> bool {
    matches!(
      self,
      AstCode::LdelemI1
        | AstCode::LdelemU1
        | AstCode::LdelemI2
        | AstCode::LdelemU2
        | AstCode::LdelemI4
        | AstCode::LdelemU4
        | AstCode::LdelemI8
        | AstCode::LdelemR4
        | AstCode::LdelemR8
        | AstCode::LdelemRef
        | AstCode::LdelemAny
    )
  }

  pub fn is_stelem(self) -> bool {
    matches!(
      self,
      AstCode::StelemI1
        | AstCode::StelemI2
        | AstCode::StelemI4
        | AstCode::StelemI8
        | AstCode::StelemR4
        | AstCode::StelemR8
        | AstCode::StelemRef
        | AstCode::StelemAny
    )
  }

  pub fn is_ldind(self) -> bool {
    matches!(
      self,
      AstCode::LdindI4 | AstCode::LdindI8 | AstCode::LdindR4 | AstCode::LdindR8 | AstCode::LdindRef
    )
  }

  pub fn is_stind(self) -> bool {
    matches!(
      self,
      AstCode::StindI4 | AstCode::StindI8 | AstCode::StindR4 | AstCode::StindR8 | AstCode::StindRef
    )
  }

  pub fn is_store(self) -> bool {
    matches!(self, AstCode::Stloc | AstCode::Stfld | AstCode::Stsfld | AstCode::Stobj)
      || self.is_stelem()
      || self.is_stind()
  }

  /// Arithmetic and bitwise binary operators.
  pub fn is_binary_operation(self) -> bool {
    matches!(
      self,
      AstCode::Add
        | AstCode::AddOvf
        | AstCode::AddOvfUn
        | AstCode::Sub
        | AstCode::SubOvf
        | AstCode::SubOvfUn
        | AstCode::Mul
        | AstCode::MulOvf
        | AstCode::MulOvfUn
        | AstCode::Div
        | AstCode::DivUn
        | AstCode::Rem
        | AstCode::RemUn
        | AstCode::And
        | AstCode::Or
        | AstCode::Xor
        | AstCode::Shl
        | AstCode::Shr
        | AstCode::ShrUn
    )
  }

  pub fn is_commutative(self) -> bool {
    matches!(self, AstCode::Add | AstCode::Mul | AstCode::And | AstCode::Or | AstCode::Xor)
  }

  /// Compound-assignment form of a binary operator.
  pub fn compound(self) -> Option<AstCode> {
    let compound = match self {
      AstCode::Add => AstCode::CompoundAdd,
      AstCode::Sub => AstCode::CompoundSub,
      AstCode::Mul => AstCode::CompoundMul,
      AstCode::Div => AstCode::CompoundDiv,
      AstCode::Rem => AstCode::CompoundRem,
      AstCode::And => AstCode::CompoundAnd,
      AstCode::Or => AstCode::CompoundOr,
      AstCode::Xor => AstCode::CompoundXor,
      AstCode::Shl => AstCode::CompoundShl,
      AstCode::Shr => AstCode::CompoundShr,
      AstCode::ShrUn => AstCode::CompoundShrUn,
      _ => return None,
    };
    Some(compound)
  }

  pub fn is_conversion(self) -> bool {
    self.conversion_target().is_some() || matches!(self, AstCode::IntToUbyte | AstCode::IntToUshort)
  }

  /// Primitive type produced by a numeric conversion.
  pub fn conversion_target(self) -> Option<PrimitiveType> {
    let target = match self {
      AstCode::ConvI1 | AstCode::ConvOvfI1 => PrimitiveType::SByte,
      AstCode::ConvI2 | AstCode::ConvOvfI2 => PrimitiveType::Int16,
      AstCode::ConvI4 | AstCode::ConvOvfI4 => PrimitiveType::Int32,
      AstCode::ConvI8 | AstCode::ConvOvfI8 => PrimitiveType::Int64,
      AstCode::ConvU1 | AstCode::ConvOvfU1 => PrimitiveType::Byte,
      AstCode::ConvU2 | AstCode::ConvOvfU2 => PrimitiveType::UInt16,
      AstCode::ConvU4 | AstCode::ConvOvfU4 => PrimitiveType::UInt32,
      AstCode::ConvU8 | AstCode::ConvOvfU8 => PrimitiveType::UInt64,
      AstCode::ConvR4 => PrimitiveType::Float32,
      AstCode::ConvR8 | AstCode::ConvRUn => PrimitiveType::Float64,
      AstCode::ConvI => PrimitiveType::IntPtr,
      AstCode::ConvU => PrimitiveType::UIntPtr,
      _ => return None,
    };
    Some(target)
  }

  /// Plain (non-overflow-checked) conversion producing `target`.
  pub fn conversion_to(target: PrimitiveType) -> Option<AstCode> {
    let code = match target {
      PrimitiveType::SByte => AstCode::ConvI1,
      PrimitiveType::Int16 => AstCode::ConvI2,
      PrimitiveType::Int32 => AstCode::ConvI4,
      PrimitiveType::Int64 => AstCode::ConvI8,
      PrimitiveType::Byte | PrimitiveType::Bool => AstCode::ConvU1,
      PrimitiveType::UInt16 | PrimitiveType::Char => AstCode::ConvU2,
      PrimitiveType::UInt32 => AstCode::ConvU4,
      PrimitiveType::UInt64 => AstCode::ConvU8,
      PrimitiveType::Float32 => AstCode::ConvR4,
      PrimitiveType::Float64 => AstCode::ConvR8,
      _ => return None,
    };
    Some(code)
  }

  pub fn is_enum_conversion(self) -> bool {
    matches!(
      self,
      AstCode::EnumToInt | AstCode::EnumToLong | AstCode::IntToEnum | AstCode::LongToEnum
    )
  }

  /// Array element load for the given element type.
  pub fn ldelem_for(element: &TypeRef) -> AstCode {
    match element.as_primitive() {
      Some(PrimitiveType::Byte) => AstCode::LdelemU1,
      Some(PrimitiveType::SByte) | Some(PrimitiveType::Bool) => AstCode::LdelemI1,
      Some(PrimitiveType::Char) | Some(PrimitiveType::UInt16) => AstCode::LdelemU2,
      Some(PrimitiveType::Int16) => AstCode::LdelemI2,
      Some(PrimitiveType::UInt32) => AstCode::LdelemU4,
      Some(PrimitiveType::Int32) => AstCode::LdelemI4,
      Some(PrimitiveType::Int64) | Some(PrimitiveType::UInt64) => AstCode::LdelemI8,
      Some(PrimitiveType::Float32) => AstCode::LdelemR4,
      Some(PrimitiveType::Float64) => AstCode::LdelemR8,
      _ => AstCode::LdelemRef,
    }
  }

  /// Array element store for the given element type.
  pub fn stelem_for(element: &TypeRef) -> AstCode {
    match element.as_primitive() {
      Some(PrimitiveType::Byte) | Some(PrimitiveType::SByte) | Some(PrimitiveType::Bool) => AstCode::StelemI1,
      Some(PrimitiveType::Char) | Some(PrimitiveType::Int16) | Some(PrimitiveType::UInt16) => AstCode::StelemI2,
      Some(PrimitiveType::Int32) | Some(PrimitiveType::UInt32) => AstCode::StelemI4,
      Some(PrimitiveType::Int64) | Some(PrimitiveType::UInt64) => AstCode::StelemI8,
      Some(PrimitiveType::Float32) => AstCode::StelemR4,
      Some(PrimitiveType::Float64) => AstCode::StelemR8,
      _ => AstCode::StelemRef,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn integer_reversal_is_plain_negation() {
    assert_eq!(AstCode::Clt.reverse_compare(false), Some(AstCode::Cge));
    assert_eq!(AstCode::CgtUn.reverse_compare(false), Some(AstCode::CleUn));
  }

  #[test]
  fn float_reversal_flips_ordering_mode() {
    assert_eq!(AstCode::Clt.reverse_compare(true), Some(AstCode::CgeUn));
    assert_eq!(AstCode::CgeUn.reverse_compare(true), Some(AstCode::Clt));
    assert_eq!(AstCode::Ceq.reverse_compare(true), Some(AstCode::Cne));
  }

  #[test]
  fn every_compare_has_branch_forms() {
    for code in AstCode::ALL.iter().copied().filter(|c| c.is_compare()) {
      assert!(code.to_branch().is_some(), "{:?}", code);
      assert!(code.to_branch_z().is_some(), "{:?}", code);
    }
  }

  #[test]
  fn names_are_unique() {
    let mut names: Vec<&str> = AstCode::ALL.iter().map(|c| c.name()).collect();
    names.sort();
    let before = names.len();
    names.dedup();
    assert_eq!(before, names.len());
  }
}
