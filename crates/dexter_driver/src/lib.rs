//! Batch front door of the lowering pipeline.
//!
//! [`lower_methods`] lowers every method body handed to it, renders the
//! diagnostics, writes the configured dumps and hands the lowered trees back
//! in input order.

mod batch;
mod dump;
mod report;

pub use batch::{lower_methods, BatchResult, MethodInput, MethodResult, MethodStatus};
pub use dump::sanitize_dump_name;
pub use report::{BatchReport, MethodReport};
