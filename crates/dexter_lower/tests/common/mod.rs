#![allow(dead_code)]

use std::collections::HashMap;

use dexter_ast::{AstCode, AstPrinter, ExprId, LabelId, MethodBody, Node, Operand, Variable, VariableFlags, VariableId};
use dexter_config::DexterConfig;
use dexter_diagnostics::diagnostic_report::Diagnostic;
use dexter_lower::passes::Pass;
use dexter_lower::{lower_method, LoweringContext, LoweringResult, MethodSource, PipelineOutcome};
use dexter_type::definition::{
  FieldFlags, MethodFlags, ParameterDefinition, TypeDefId, TypeFlags,
};
use dexter_type::types::GenericOwner;
use dexter_type::{names, FieldRef, MethodRef, PrimitiveType, SourceLocation, TypeRef, TypeSystem};

/// Type system with a handful of sample types next to the runtime support.
pub struct Fixture {
  pub types: TypeSystem,
  /// Mutable struct with `X`/`Y` fields.
  pub point: TypeDefId,
  /// Immutable struct sharing `$Default`.
  pub size: TypeDefId,
  /// `Red = 0, Green = 1, Blue = 2`.
  pub color: TypeDefId,
  pub counter: TypeDefId,
  pub handler: TypeDefId,
  /// Generic class `Box<T>`.
  pub boxed: TypeDefId,
  pub nullable: TypeDefId,
}

impl Fixture {
  pub fn new() -> Self {
    let mut builder = TypeSystem::builder().with_runtime_support();
    let int = TypeRef::int32();
    let Some(nullable) = builder.find_type(names::SYSTEM, names::NULLABLE) else {
      panic!("runtime support registers Nullable`1");
    };

    let point = builder.struct_type("Demo", "Point");
    let point_ref = TypeRef::definition(point);
    builder.add_field(point, "X", int.clone(), FieldFlags::empty());
    builder.add_field(point, "Y", int.clone(), FieldFlags::empty());
    builder.add_method(point, names::CONSTRUCTOR, MethodFlags::CONSTRUCTOR, Vec::new(), TypeRef::void());
    builder.add_method(
      point,
      names::CONSTRUCTOR,
      MethodFlags::CONSTRUCTOR,
      vec![ParameterDefinition::new("x", int.clone()), ParameterDefinition::new("y", int.clone())],
      TypeRef::void(),
    );
    builder.add_method(point, names::STRUCT_CLONE, MethodFlags::empty(), Vec::new(), point_ref.clone());
    builder.add_method(
      point,
      names::STRUCT_COPY_FROM,
      MethodFlags::empty(),
      vec![ParameterDefinition::new("other", point_ref.clone())],
      TypeRef::void(),
    );
    builder.add_method(point, "Length", MethodFlags::empty(), Vec::new(), int.clone());

    let size = builder.struct_type("Demo", "Size");
    builder.type_def_mut(size).flags |= TypeFlags::IMMUTABLE;
    builder.add_field(size, names::STRUCT_DEFAULT_FIELD, TypeRef::definition(size), FieldFlags::STATIC);

    let color = builder.enum_type("Demo", "Color", PrimitiveType::Int32, &[("Red", 0), ("Green", 1), ("Blue", 2)]);
    let color_ref = TypeRef::definition(color);

    let counter = builder.class("Demo", "Counter");
    let updater = builder.type_ref(names::ATOMIC_NAMESPACE, names::INT_UPDATER);
    builder.add_field(counter, "count", int.clone(), FieldFlags::empty());
    builder.add_field(counter, "count$Updater", updater, FieldFlags::STATIC);
    builder.add_field(counter, "total", int.clone(), FieldFlags::empty());
    builder.add_field(counter, "hits", int.clone(), FieldFlags::STATIC);
    builder.add_field(counter, "shade", color_ref.clone(), FieldFlags::empty());
    builder.add_field(counter, "origin", point_ref.clone(), FieldFlags::empty());
    builder.add_field(counter, "home", point_ref.clone(), FieldFlags::STATIC);
    builder.add_field(counter, "maybe", TypeRef::generic_instance(nullable, vec![int.clone()]), FieldFlags::empty());
    builder.add_field(counter, "small", TypeRef::primitive(PrimitiveType::Byte), FieldFlags::empty());
    builder.add_method(counter, names::CONSTRUCTOR, MethodFlags::CONSTRUCTOR, Vec::new(), TypeRef::void());
    builder.add_method(counter, names::CLASS_CONSTRUCTOR, MethodFlags::CONSTRUCTOR | MethodFlags::STATIC, Vec::new(), TypeRef::void());
    builder.add_method(counter, "Next", MethodFlags::VIRTUAL, Vec::new(), int.clone());
    // Returns the receiver; counted by the evaluator.
    builder.add_method(counter, "Touch", MethodFlags::VIRTUAL, Vec::new(), TypeRef::definition(counter));
    builder.add_method(
      counter,
      "Move",
      MethodFlags::STATIC,
      vec![ParameterDefinition::new("to", point_ref.clone())],
      TypeRef::void(),
    );
    builder.add_method(
      counter,
      "Mirror",
      MethodFlags::STATIC,
      vec![ParameterDefinition::new("of", point_ref.clone())],
      point_ref,
    );
    builder.add_method(
      counter,
      "Swap",
      MethodFlags::STATIC,
      vec![ParameterDefinition::new("value", TypeRef::by_reference(int.clone()))],
      TypeRef::void(),
    );
    builder.add_method(
      counter,
      "Handle",
      MethodFlags::STATIC,
      vec![ParameterDefinition::new("a", int.clone()), ParameterDefinition::new("b", int.clone())],
      int.clone(),
    );

    let handler = builder.delegate_type("Demo", "Handler");

    let boxed = builder.class("Demo", "Box`1");
    builder.type_def_mut(boxed).generic_parameters = vec!["T".to_string()];
    let t = TypeRef::generic_parameter(GenericOwner::Type(boxed), 0, "T");
    builder.add_field(boxed, "value", t.clone(), FieldFlags::empty());
    builder.add_method(
      boxed,
      "Create",
      MethodFlags::STATIC | MethodFlags::NEEDS_GENERIC_INSTANCE_TYPE_PARAMETER,
      Vec::new(),
      TypeRef::definition(boxed),
    );
    builder.add_method(boxed, "Get", MethodFlags::VIRTUAL, Vec::new(), t);

    Self {
      types: builder.build(),
      point,
      size,
      color,
      counter,
      handler,
      boxed,
      nullable,
    }
  }

  pub fn point(&self) -> TypeRef {
    TypeRef::definition(self.point)
  }

  pub fn size(&self) -> TypeRef {
    TypeRef::definition(self.size)
  }

  pub fn color(&self) -> TypeRef {
    TypeRef::definition(self.color)
  }

  pub fn counter(&self) -> TypeRef {
    TypeRef::definition(self.counter)
  }

  pub fn handler(&self) -> TypeRef {
    TypeRef::definition(self.handler)
  }

  /// `T` of `Box<T>`.
  pub fn box_parameter(&self) -> TypeRef {
    TypeRef::generic_parameter(GenericOwner::Type(self.boxed), 0, "T")
  }

  pub fn box_of(
    &self,
    argument: TypeRef,
  ) -> TypeRef {
    TypeRef::generic_instance(self.boxed, vec![argument])
  }

  pub fn nullable_of(
    &self,
    payload: TypeRef,
  ) -> TypeRef {
    TypeRef::generic_instance(self.nullable, vec![payload])
  }

  pub fn interface(
    &self,
    namespace: &str,
    name: &str,
  ) -> TypeRef {
    self.types.type_ref(namespace, name)
  }

  pub fn field(
    &self,
    declaring: &TypeRef,
    name: &str,
  ) -> FieldRef {
    let Some(id) = self.types.field_named(declaring, name) else {
      panic!("no field {} on {}", name, self.types.type_name(declaring));
    };
    self.types.field_ref(declaring, id)
  }

  /// Method by name and parameter count, referenced through `declaring`.
  pub fn method(
    &self,
    declaring: &TypeRef,
    name: &str,
    param_count: usize,
  ) -> MethodRef {
    let found = declaring
      .definition_id()
      .and_then(|def| self.types.find_method(def, name, Some(param_count)));
    let Some(id) = found else {
      panic!("no method {}/{} on {}", name, param_count, self.types.type_name(declaring));
    };
    self.types.method_ref(declaring, id)
  }

  /// `System.Threading.Interlocked::name`.
  pub fn interlocked(
    &self,
    name: &str,
    param_count: usize,
  ) -> MethodRef {
    let interlocked = self.types.type_ref(names::SYSTEM_THREADING, names::INTERLOCKED);
    self.method(&interlocked, name, param_count)
  }

  /// Instance method `Counter::Run`, the default method being lowered.
  pub fn instance_source(&self) -> MethodSource {
    MethodSource::new("Run", self.counter())
  }
}

/// A method body under construction plus everything needed to lower it.
pub struct Tree<'a> {
  pub fx: &'a Fixture,
  pub body: MethodBody,
  pub source: MethodSource,
  pub config: DexterConfig,
  pub warnings: Vec<Diagnostic>,
  next_offset: u32,
}

impl<'a> Tree<'a> {
  pub fn new(fx: &'a Fixture) -> Self {
    Self {
      fx,
      body: MethodBody::new(),
      source: fx.instance_source(),
      config: DexterConfig::new_basic(false, Vec::new(), true, 0),
      warnings: Vec::new(),
      next_offset: 0,
    }
  }

  pub fn in_method(
    mut self,
    source: MethodSource,
  ) -> Self {
    self.source = source;
    self
  }

  pub fn types(&self) -> &'a TypeSystem {
    &self.fx.types
  }

  // #region Variables

  pub fn local(
    &mut self,
    name: &str,
    ty: TypeRef,
  ) -> VariableId {
    self.body.add_variable(Variable::new(name, ty, VariableFlags::empty()))
  }

  pub fn param(
    &mut self,
    name: &str,
    ty: TypeRef,
  ) -> VariableId {
    self.body.add_variable(Variable::new(name, ty, VariableFlags::PARAMETER))
  }

  // #endregion Variables

  // #region Expressions

  pub fn typed(
    &mut self,
    code: AstCode,
    operand: Operand,
    args: Vec<ExprId>,
    ty: TypeRef,
  ) -> ExprId {
    self.body.new_typed(SourceLocation::NONE, code, operand, args, ty)
  }

  pub fn op(
    &mut self,
    code: AstCode,
    args: Vec<ExprId>,
  ) -> ExprId {
    self.body.new_expr(SourceLocation::NONE, code, Operand::None, args)
  }

  pub fn ldc(
    &mut self,
    value: i32,
  ) -> ExprId {
    self.typed(AstCode::LdcI4, Operand::Int(value), Vec::new(), TypeRef::int32())
  }

  pub fn ldc_i8(
    &mut self,
    value: i64,
  ) -> ExprId {
    self.typed(AstCode::LdcI8, Operand::Long(value), Vec::new(), TypeRef::int64())
  }

  pub fn ldnull(&mut self) -> ExprId {
    let object = self.types().object();
    self.typed(AstCode::Ldnull, Operand::None, Vec::new(), object)
  }

  pub fn ldthis(&mut self) -> ExprId {
    let ty = self.source.declaring_type.clone();
    self.typed(AstCode::Ldthis, Operand::None, Vec::new(), ty)
  }

  pub fn ldloc(
    &mut self,
    variable: VariableId,
  ) -> ExprId {
    let ty = self.body.variable(variable).ty.clone();
    self.typed(AstCode::Ldloc, Operand::Variable(variable), Vec::new(), ty)
  }

  pub fn ldloca(
    &mut self,
    variable: VariableId,
  ) -> ExprId {
    let ty = TypeRef::by_reference(self.body.variable(variable).ty.clone());
    self.typed(AstCode::Ldloca, Operand::Variable(variable), Vec::new(), ty)
  }

  pub fn stloc(
    &mut self,
    variable: VariableId,
    value: ExprId,
  ) -> ExprId {
    let ty = self.body.variable(variable).ty.clone();
    self.typed(AstCode::Stloc, Operand::Variable(variable), vec![value], ty)
  }

  pub fn ldfld(
    &mut self,
    field: FieldRef,
    instance: ExprId,
  ) -> ExprId {
    let ty = field.field_type().clone();
    self.typed(AstCode::Ldfld, Operand::Field(field), vec![instance], ty)
  }

  pub fn ldflda(
    &mut self,
    field: FieldRef,
    instance: ExprId,
  ) -> ExprId {
    let ty = TypeRef::by_reference(field.field_type().clone());
    self.typed(AstCode::Ldflda, Operand::Field(field), vec![instance], ty)
  }

  pub fn stfld(
    &mut self,
    field: FieldRef,
    instance: ExprId,
    value: ExprId,
  ) -> ExprId {
    let ty = field.field_type().clone();
    self.typed(AstCode::Stfld, Operand::Field(field), vec![instance, value], ty)
  }

  pub fn ldsfld(
    &mut self,
    field: FieldRef,
  ) -> ExprId {
    let ty = field.field_type().clone();
    self.typed(AstCode::Ldsfld, Operand::Field(field), Vec::new(), ty)
  }

  pub fn ldsflda(
    &mut self,
    field: FieldRef,
  ) -> ExprId {
    let ty = TypeRef::by_reference(field.field_type().clone());
    self.typed(AstCode::Ldsflda, Operand::Field(field), Vec::new(), ty)
  }

  /// Call typed the way a decompiler would type it.
  pub fn call(
    &mut self,
    code: AstCode,
    method: MethodRef,
    args: Vec<ExprId>,
  ) -> ExprId {
    let ty = if code == AstCode::Newobj {
      method.declaring_type().clone()
    } else if method.is_constructor() {
      TypeRef::void()
    } else {
      method.return_type().clone()
    };
    self.typed(code, Operand::Method(method), args, ty)
  }

  pub fn with_type(
    &mut self,
    code: AstCode,
    ty: TypeRef,
    args: Vec<ExprId>,
    result: TypeRef,
  ) -> ExprId {
    self.typed(code, Operand::Type(ty), args, result)
  }

  // #endregion Expressions

  // #region Statements

  pub fn stmt(
    &mut self,
    id: ExprId,
  ) {
    self.body.root.push(Node::Expr(id));
  }

  /// Statement with a real IL offset, one past the previous one.
  pub fn located(
    &mut self,
    id: ExprId,
  ) {
    self.next_offset += 1;
    self.body.expr_mut(id).location = SourceLocation::at_offset(self.next_offset);
    self.stmt(id);
  }

  pub fn ret(
    &mut self,
    value: ExprId,
  ) {
    let ret = self.typed(AstCode::Ret, Operand::None, vec![value], TypeRef::void());
    self.stmt(ret);
  }

  /// Places a label at the current end of the body.
  pub fn label(
    &mut self,
    name: &str,
  ) -> LabelId {
    let label = self.body.new_label(name);
    self.body.root.push(Node::Label(label));
    label
  }

  pub fn branch(
    &mut self,
    code: AstCode,
    label: LabelId,
    args: Vec<ExprId>,
  ) -> ExprId {
    self.typed(code, Operand::Label(label), args, TypeRef::void())
  }

  // #endregion Statements

  pub fn run(
    &mut self,
    pass: Pass,
  ) -> LoweringResult {
    let mut ctx = LoweringContext::new(&self.fx.types, &self.source, &self.config);
    let result = pass(&mut self.body, &mut ctx);
    self.warnings.extend(ctx.warnings);
    result
  }

  pub fn run_all(
    &mut self,
    passes: &[Pass],
  ) -> LoweringResult {
    for &pass in passes {
      self.run(pass)?;
    }
    Ok(())
  }

  pub fn lower(&mut self) -> LoweringResult<PipelineOutcome> {
    let mut ctx = LoweringContext::new(&self.fx.types, &self.source, &self.config);
    let result = lower_method(&mut self.body, &mut ctx);
    self.warnings.extend(ctx.warnings);
    result
  }

  pub fn print(&self) -> String {
    AstPrinter::new(&self.body, &self.fx.types).print()
  }

  pub fn print_typed(&self) -> String {
    AstPrinter::new(&self.body, &self.fx.types).with_types().print()
  }

  pub fn expression(
    &self,
    id: ExprId,
  ) -> String {
    AstPrinter::new(&self.body, &self.fx.types).expression(id)
  }
}

/// Values produced by [`evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
  Int(i64),
  Bool(bool),
  Null,
  /// A primitive held in an object register.
  Boxed(Box<Value>),
  /// An enum object carrying its underlying value.
  Enum(i64),
  /// The `Counter` instance the method runs on.
  This,
}

impl Value {
  fn truthy(&self) -> bool {
    match self {
      Value::Bool(b) => *b,
      Value::Int(v) => *v != 0,
      Value::Null => false,
      other => panic!("not a condition: {:?}", other),
    }
  }

  fn int(&self) -> i64 {
    match self {
      Value::Int(v) => *v,
      Value::Bool(b) => i64::from(*b),
      other => panic!("not an integer: {:?}", other),
    }
  }
}

/// Locals, instance fields of `this` and the number of `Counter::Touch` calls.
#[derive(Debug, Default)]
pub struct Machine {
  locals: HashMap<VariableId, Value>,
  fields: HashMap<String, Value>,
  pub touches: usize,
}

/// Runs the root statements of a straight-line body and returns the value of
/// the first `ret`.
///
/// Knows the node shapes lowered arithmetic, enums and nullables use;
/// anything else panics.
pub fn evaluate(
  fx: &Fixture,
  body: &MethodBody,
) -> Option<Value> {
  run_machine(fx, body).0
}

/// [`evaluate`] plus the final machine state.
pub fn run_machine(
  fx: &Fixture,
  body: &MethodBody,
) -> (Option<Value>, Machine) {
  let mut machine = Machine::default();
  for node in &body.root.body {
    let Some(id) = node.as_expr() else {
      continue;
    };
    if body.code(id) == AstCode::Ret {
      let value = body.expr(id).arg(0).map(|value| eval(fx, body, &mut machine, value));
      return (value, machine);
    }
    eval(fx, body, &mut machine, id);
  }
  (None, machine)
}

fn eval(
  fx: &Fixture,
  body: &MethodBody,
  machine: &mut Machine,
  id: ExprId,
) -> Value {
  let expr = body.expr(id);
  let arg = |index: usize, machine: &mut Machine| eval(fx, body, machine, expr.arguments[index]);

  match expr.code {
    AstCode::LdcI4 | AstCode::LdcI8 => Value::Int(expr.operand.as_integer().unwrap_or_default()),
    AstCode::Ldnull => Value::Null,
    AstCode::Ldthis => Value::This,
    AstCode::Ldloc => {
      let variable = expr.operand.as_variable().unwrap_or_else(|| panic!("ldloc without variable"));
      machine.locals.get(&variable).cloned().unwrap_or(Value::Null)
    },
    AstCode::Stloc => {
      let value = arg(0, machine);
      let variable = expr.operand.as_variable().unwrap_or_else(|| panic!("stloc without variable"));
      machine.locals.insert(variable, value.clone());
      value
    },
    AstCode::Ldfld => {
      assert_eq!(arg(0, machine), Value::This, "only fields of this are evaluated");
      let field = expr.operand.as_field().unwrap_or_else(|| panic!("ldfld without field"));
      machine.fields.get(field.name()).cloned().unwrap_or(Value::Null)
    },
    AstCode::Stfld => {
      assert_eq!(arg(0, machine), Value::This, "only fields of this are evaluated");
      let value = arg(1, machine);
      let field = expr.operand.as_field().unwrap_or_else(|| panic!("stfld without field"));
      machine.fields.insert(field.name().to_string(), value.clone());
      value
    },
    AstCode::Call | AstCode::Callvirt => {
      let method = expr.operand.as_method().unwrap_or_else(|| panic!("call without method"));
      assert_eq!(method.name(), "Touch", "only Counter::Touch calls are evaluated");
      assert_eq!(arg(0, machine), Value::This);
      machine.touches += 1;
      Value::This
    },
    AstCode::Ldsfld => {
      let constant = expr
        .operand
        .as_field()
        .and_then(|f| fx.types.resolve_field(f))
        .and_then(|f| f.constant)
        .and_then(|c| c.as_int());
      match constant {
        Some(value) => Value::Enum(value),
        None => panic!("only literal static fields are evaluated"),
      }
    },
    AstCode::Add => Value::Int(arg(0, machine).int() + arg(1, machine).int()),
    AstCode::Sub => Value::Int(arg(0, machine).int() - arg(1, machine).int()),
    AstCode::Mul => Value::Int(arg(0, machine).int() * arg(1, machine).int()),
    AstCode::Or => Value::Bool(arg(0, machine).truthy() || arg(1, machine).truthy()),
    AstCode::Ceq => Value::Bool(arg(0, machine).int() == arg(1, machine).int()),
    AstCode::Cne => Value::Bool(arg(0, machine).int() != arg(1, machine).int()),
    AstCode::Clt => Value::Bool(arg(0, machine).int() < arg(1, machine).int()),
    AstCode::Cgt => Value::Bool(arg(0, machine).int() > arg(1, machine).int()),
    AstCode::CIsNull => Value::Bool(arg(0, machine) == Value::Null),
    AstCode::CIsNotNull => Value::Bool(arg(0, machine) != Value::Null),
    AstCode::Box => Value::Boxed(Box::new(arg(0, machine))),
    AstCode::Unbox => match arg(0, machine) {
      Value::Boxed(inner) => *inner,
      other => panic!("unbox of {:?}", other),
    },
    AstCode::Conditional => {
      if arg(0, machine).truthy() {
        arg(1, machine)
      } else {
        arg(2, machine)
      }
    },
    AstCode::NullCoalescing => match arg(0, machine) {
      Value::Null => arg(1, machine),
      value => value,
    },
    AstCode::EnumToInt | AstCode::EnumToLong => match arg(0, machine) {
      Value::Enum(value) => Value::Int(value),
      other => panic!("enum conversion of {:?}", other),
    },
    AstCode::IntToEnum | AstCode::LongToEnum => Value::Enum(arg(0, machine).int()),
    AstCode::ConvI4 => Value::Int(i64::from(arg(0, machine).int() as i32)),
    AstCode::ConvI8 => Value::Int(arg(0, machine).int()),
    code => panic!("cannot evaluate {}", code.name()),
  }
}

/// Number of nodes in the live tree that satisfy `filter`.
pub fn count(
  body: &MethodBody,
  filter: impl Fn(&dexter_ast::Expr) -> bool,
) -> usize {
  dexter_ast::visit::expressions(body, filter).len()
}
