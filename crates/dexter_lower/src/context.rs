use bitflags::bitflags;
use dexter_ast::ExprId;
use dexter_ast::MethodBody;
use dexter_config::DexterConfig;
use dexter_diagnostics::diagnostic_report::Diagnostic;
use dexter_diagnostics::DiagnosticMessage;
use dexter_log::{phase_warn, LogScope};
use dexter_type::definition::MethodId;
use dexter_type::{SourceLocation, TypeRef, TypeSystem};

use crate::error::LoweringError;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MethodSourceFlags: u32 {
        const STATIC                                  = 1 << 0;
        const CONSTRUCTOR                             = 1 << 1;
        const CLASS_CONSTRUCTOR                       = 1 << 2;
        /// Body of a compiler generated async/iterator state machine.
        const STATE_MACHINE                           = 1 << 3;
        const NEEDS_GENERIC_INSTANCE_TYPE_PARAMETER   = 1 << 4;
        const NEEDS_GENERIC_INSTANCE_METHOD_PARAMETER = 1 << 5;
    }
}

/// The method whose body is being lowered.
#[derive(Debug, Clone)]
pub struct MethodSource {
  pub name: String,
  pub declaring_type: TypeRef,
  pub definition: Option<MethodId>,
  pub flags: MethodSourceFlags,
  pub return_type: TypeRef,
  pub generic_parameter_count: usize,
}

impl MethodSource {
  pub fn new(
    name: &str,
    declaring_type: TypeRef,
  ) -> Self {
    Self {
      name: name.to_string(),
      declaring_type,
      definition: None,
      flags: MethodSourceFlags::empty(),
      return_type: TypeRef::void(),
      generic_parameter_count: 0,
    }
  }

  /// Source built from a registered method definition.
  pub fn from_definition(
    types: &TypeSystem,
    id: MethodId,
  ) -> Self {
    let def = types.method(&id);
    let owner = types.type_def(&def.declaring_type);

    let mut flags = MethodSourceFlags::empty();
    if def.is_static() {
      flags |= MethodSourceFlags::STATIC;
    }
    if def.is_class_constructor() {
      flags |= MethodSourceFlags::CLASS_CONSTRUCTOR;
    } else if def.is_constructor() {
      flags |= MethodSourceFlags::CONSTRUCTOR;
    }
    if owner.flags.contains(dexter_type::definition::TypeFlags::STATE_MACHINE) {
      flags |= MethodSourceFlags::STATE_MACHINE;
    }
    if def.needs_generic_instance_type_parameter() {
      flags |= MethodSourceFlags::NEEDS_GENERIC_INSTANCE_TYPE_PARAMETER;
    }
    if def.needs_generic_instance_method_parameter() {
      flags |= MethodSourceFlags::NEEDS_GENERIC_INSTANCE_METHOD_PARAMETER;
    }

    Self {
      name: def.name.clone(),
      declaring_type: TypeRef::definition(def.declaring_type),
      definition: Some(id),
      flags,
      return_type: def.return_type.clone(),
      generic_parameter_count: def.generic_parameters.len(),
    }
  }

  pub fn with_flags(
    mut self,
    flags: MethodSourceFlags,
  ) -> Self {
    self.flags |= flags;
    self
  }

  pub fn returning(
    mut self,
    return_type: TypeRef,
  ) -> Self {
    self.return_type = return_type;
    self
  }

  pub fn is_static(&self) -> bool {
    self.flags.contains(MethodSourceFlags::STATIC)
  }

  /// Instance constructor.
  pub fn is_constructor(&self) -> bool {
    self.flags.contains(MethodSourceFlags::CONSTRUCTOR)
  }

  pub fn is_class_constructor(&self) -> bool {
    self.flags.contains(MethodSourceFlags::CLASS_CONSTRUCTOR)
  }

  pub fn is_state_machine(&self) -> bool {
    self.flags.contains(MethodSourceFlags::STATE_MACHINE)
  }

  pub fn full_name(
    &self,
    types: &TypeSystem,
  ) -> String {
    format!("{}::{}", types.type_name(&self.declaring_type), self.name)
  }
}

/// State shared by every pass while one method is lowered.
pub struct LoweringContext<'a> {
  pub types: &'a TypeSystem,
  pub method: &'a MethodSource,
  pub config: &'a DexterConfig,
  /// Degraded-lowering warnings collected so far.
  pub warnings: Vec<Diagnostic>,
}

impl<'a> LoweringContext<'a> {
  pub fn new(
    types: &'a TypeSystem,
    method: &'a MethodSource,
    config: &'a DexterConfig,
  ) -> Self {
    Self {
      types,
      method,
      config,
      warnings: Vec::new(),
    }
  }

  pub fn method_name(&self) -> String {
    self.method.full_name(self.types)
  }

  /// Fatal error for the current method.
  pub fn error(
    &self,
    message: DiagnosticMessage,
    location: SourceLocation,
  ) -> LoweringError {
    LoweringError::new(message, self.method_name(), location)
  }

  /// Fatal error located at `id`.
  pub fn error_at(
    &self,
    body: &MethodBody,
    id: ExprId,
    message: DiagnosticMessage,
  ) -> LoweringError {
    self.error(message, body.expr(id).location)
  }

  pub fn warn(
    &mut self,
    message: DiagnosticMessage,
    location: SourceLocation,
  ) {
    phase_warn!(self, "{} at {}", message, location);
    let diagnostic = message.report(&self.method_name(), location);
    self.warnings.push(diagnostic);
  }

  pub fn type_name(
    &self,
    ty: &TypeRef,
  ) -> String {
    self.types.type_name(ty)
  }
}

impl LogScope for LoweringContext<'_> {
  fn log_config(&self) -> &DexterConfig {
    self.config
  }

  fn log_method(&self) -> Option<String> {
    Some(self.method_name())
  }
}
