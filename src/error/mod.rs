mod engine;
mod http;
mod metrics;
mod scheduler;
mod stress;
mod validation;

pub use engine::{EngineError, EngineResult};
pub use http::HttpError;
pub use metrics::{MetricsError, MetricsResult};
pub use scheduler::{SchedulerError, SchedulerResult};
pub use stress::{StressError, StressResult};
pub use validation::ValidationError;
