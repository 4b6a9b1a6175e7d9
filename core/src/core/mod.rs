pub mod context;
pub mod context_data;
pub mod control;
pub mod step;

pub use context::{Finalizer, Handler};
pub use context_data::ContextData;
pub use control::{SkipReason, StepControl, TransitionOutcome};
pub use step::StepDef;
