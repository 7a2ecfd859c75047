mod common;

use common::{config, Fixture};
use dexter_ast::AstPrinter;
use dexter_config::{DumpKind, StopAfter};
use dexter_driver::{lower_methods, MethodInput, MethodStatus};

fn arithmetic_batch(
  fx: &Fixture,
  count: i32,
) -> Vec<MethodInput> {
  (0..count).map(|i| fx.arithmetic(&format!("M{}", i), i)).collect()
}

fn printed(
  fx: &Fixture,
  result: &dexter_driver::MethodResult,
) -> String {
  match &result.body {
    Some(body) => AstPrinter::new(body, &fx.types).print(),
    None => panic!("{} has no body", result.name),
  }
}

#[test]
fn results_keep_input_order_across_workers() {
  let fx = Fixture::new();

  let batch = lower_methods(&config(3), &fx.types, arithmetic_batch(&fx, 8));

  let names: Vec<&str> = batch.methods.iter().map(|m| m.name.as_str()).collect();
  assert_eq!(
    names,
    ["Counter::M0", "Counter::M1", "Counter::M2", "Counter::M3", "Counter::M4", "Counter::M5", "Counter::M6", "Counter::M7"]
  );
  assert!(batch.methods.iter().all(|m| m.status == MethodStatus::Lowered));
  assert!(batch.methods.iter().all(|m| m.body.as_ref().is_some_and(|b| b.lowered)));
  assert!(batch.is_success());
}

#[test]
fn worker_count_does_not_change_the_trees() {
  let fx = Fixture::new();

  let serial = lower_methods(&config(1), &fx.types, arithmetic_batch(&fx, 5));
  let parallel = lower_methods(&config(4), &fx.types, arithmetic_batch(&fx, 5));
  let oversubscribed = lower_methods(&config(16), &fx.types, arithmetic_batch(&fx, 5));

  for ((a, b), c) in serial.methods.iter().zip(&parallel.methods).zip(&oversubscribed.methods) {
    assert_eq!(printed(&fx, a), printed(&fx, b));
    assert_eq!(printed(&fx, a), printed(&fx, c));
  }
  assert_eq!(printed(&fx, &serial.methods[2]), "stloc[x](add(ldc.i4[2], ldc.i4[1]))\nret(ldloc[x])\n");
}

#[test]
fn a_failing_method_does_not_stop_the_batch() {
  let fx = Fixture::new();
  let inputs = vec![
    fx.arithmetic("First", 1),
    fx.two_interlocked_calls("Broken"),
    fx.arithmetic("Last", 2),
  ];

  let batch = lower_methods(&config(2), &fx.types, inputs);

  assert_eq!(batch.failed_count(), 1);
  assert!(!batch.is_success());
  let broken = &batch.methods[1];
  assert_eq!(broken.status, MethodStatus::Failed);
  assert!(broken.body.is_none());
  let Some(error) = &broken.error else {
    panic!("failed method carries no error");
  };
  assert_eq!(error.error_code, "L0005");
  assert_eq!(error.method, "Counter::Broken");
  assert_eq!(batch.methods[0].status, MethodStatus::Lowered);
  assert_eq!(batch.methods[2].status, MethodStatus::Lowered);
}

#[test]
fn warnings_are_collected_per_method() {
  let fx = Fixture::new();

  let batch = lower_methods(&config(1), &fx.types, vec![fx.locked_increment("Bump"), fx.arithmetic("Plain", 0)]);

  let codes: Vec<&str> = batch.methods[0].warnings.iter().map(|w| w.error_code.as_str()).collect();
  assert_eq!(codes, ["W0001"]);
  assert!(batch.methods[1].warnings.is_empty());
  assert!(batch.is_success());
}

#[test]
fn already_lowered_and_stopped_methods_are_reported_as_such() {
  let fx = Fixture::new();
  let mut done = fx.arithmetic("Done", 1);
  done.body.lowered = true;

  let mut stopping = config(1);
  stopping.stop_after = Some(StopAfter::Enum);
  let batch = lower_methods(&stopping, &fx.types, vec![done, fx.arithmetic("Partial", 2)]);

  assert_eq!(batch.methods[0].status, MethodStatus::AlreadyLowered);
  assert_eq!(batch.methods[1].status, MethodStatus::Stopped(StopAfter::Enum));
  assert!(batch.methods[1].body.as_ref().is_some_and(|b| !b.lowered));
}

#[test]
fn dumps_land_in_the_dump_directory() {
  let fx = Fixture::new();
  let dir = tempfile::tempdir().unwrap();
  let mut dumping = config(2);
  dumping.dump = vec![DumpKind::Input, DumpKind::Lowered, DumpKind::Report];
  dumping.dump_dir = Some(dir.path().join("out"));

  let batch = lower_methods(&dumping, &fx.types, vec![fx.arithmetic("Run", 4), fx.two_interlocked_calls("Broken")]);
  assert_eq!(batch.dump_failures, 0);

  let out = dir.path().join("out");
  let input = std::fs::read_to_string(out.join("Counter__Run.input.ast")).unwrap();
  assert_eq!(input, "stloc[x](add(ldc.i4[4], ldc.i4[1]))\nret(ldloc[x])\n");
  assert!(out.join("Counter__Run.ast").exists());
  assert!(out.join("Counter__Broken.input.ast").exists());
  assert!(!out.join("Counter__Broken.ast").exists());

  let report: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(out.join("report.json")).unwrap()).unwrap();
  assert_eq!(report["lowered"], 1);
  assert_eq!(report["failed"], 1);
  assert_eq!(report["methods"][0]["method"], "Counter::Run");
  assert_eq!(report["methods"][0]["status"], "lowered");
  assert_eq!(report["methods"][1]["status"], "failed");
  assert_eq!(report["methods"][1]["error"], "L0005");
  assert!(report["methods"][0].get("error").is_none());
}

#[test]
fn report_names_the_stop_stage_and_warning_codes() {
  let fx = Fixture::new();
  let mut stopping = config(1);
  stopping.stop_after = Some(StopAfter::Cast);

  let batch = lower_methods(&stopping, &fx.types, vec![fx.locked_increment("Bump")]);
  let report = batch.report();

  assert_eq!(report.warnings, 1);
  let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
  assert_eq!(json["methods"][0]["status"], "stopped");
  assert_eq!(json["methods"][0]["stopped-after"], "cast");
  assert_eq!(json["methods"][0]["warnings"], serde_json::json!(["W0001"]));
}

#[test]
fn unwritable_dump_directory_is_counted() {
  let fx = Fixture::new();
  let dir = tempfile::tempdir().unwrap();
  let blocker = dir.path().join("file");
  std::fs::write(&blocker, "not a directory").unwrap();

  let mut dumping = config(1);
  dumping.dump = vec![DumpKind::Lowered];
  dumping.dump_dir = Some(blocker);

  let batch = lower_methods(&dumping, &fx.types, vec![fx.arithmetic("Run", 1)]);

  assert_eq!(batch.dump_failures, 1);
  assert_eq!(batch.failed_count(), 0);
  assert!(!batch.is_success());
}
