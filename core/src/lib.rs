// tarzify-flow/src/lib.rs

//! Step-pipeline engine behind the TARZIFY order workflows.
//!
//! A `Pipeline<TData, Err>` is an ordered list of named steps. Each step has
//! `before`/`on`/`after` handlers operating on a shared `ContextData<TData>`, a
//! `StepPolicy` deciding what a failure means, and an optional timeout.
//! `BestEffort` steps absorb their failures into the `RunReport`, which is how
//! side effects such as notification mail are kept from failing the whole run.
//! A `FlowRegistry` keys pipelines by context type so a service can register
//! them once and run them per request.

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context_data::ContextData;
pub use crate::core::control::{DegradedStep, PipelineControl, PipelineResult, RunReport};
pub use crate::core::handler::Handler;
pub use crate::core::step::{SkipCondition, StepDef, StepPolicy};

pub use crate::pipeline::definition::Pipeline;

pub use crate::error::{FlowError, FlowResult};

pub use crate::registry::FlowRegistry;
