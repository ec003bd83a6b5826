pub mod context_data;
pub mod control;
pub mod handler;
pub mod step;

pub use context_data::ContextData;
pub use control::{DegradedStep, PipelineControl, PipelineResult, RunReport};
pub use handler::Handler;
pub use step::{SkipCondition, StepDef, StepPolicy};
