// core/src/lib.rs

//! medimart-core: the async step-pipeline engine behind the medimart workflows.
//!
//! A [`Pipeline`] is an ordered list of named steps. Each step can carry
//! `on` handlers and `after` hooks that operate on a shared
//! [`ContextData`]. Handlers return [`PipelineControl::Continue`] to move on or
//! [`PipelineControl::Stop`] to halt cleanly; an `Err` aborts the run and is
//! handed back to the caller unchanged.
//!
//! Pipelines are registered once at startup in a [`PipelineRegistry`], keyed by
//! the type of data they operate on, and dispatched per request.

pub mod context_data;
pub mod control;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod step;

pub use crate::context_data::ContextData;
pub use crate::control::{PipelineControl, PipelineResult};
pub use crate::error::{PipelineError, PipelineResultExt};
pub use crate::pipeline::{Handler, Pipeline};
pub use crate::registry::PipelineRegistry;
pub use crate::step::{SkipCondition, StepDef};
