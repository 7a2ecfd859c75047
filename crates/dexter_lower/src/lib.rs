//! Rewrites a decompiled method body into a tree the register-machine code
//! generator can emit directly.
//!
//! Each pass in [`passes`] removes one kind of construct the target lacks;
//! [`pipeline::lower_method`] runs them in their fixed order.

pub mod build;
pub mod context;
pub mod error;
pub mod passes;
pub mod pipeline;
pub mod typing;

pub use context::{LoweringContext, MethodSource, MethodSourceFlags};
pub use error::{LoweringError, LoweringResult};
pub use pipeline::{lower_method, run_stage, PipelineOutcome, STAGES};
pub use typing::{check_types, result_type, TypeError};
