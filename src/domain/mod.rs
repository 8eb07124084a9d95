mod aggregate;
mod request;
mod result;
mod sla;
mod stress_result;

pub use aggregate::{Aggregate, EndpointStats, TimeSeriesBucket};
pub use request::{
    HttpMethod, ManualRequestSource, ParsedRequest, RequestBody, RequestSource,
    SequenceRequestSource,
};
pub use result::{truncate_error_message, ErrorKind, RequestResult, ERROR_MESSAGE_MAX_CHARS};
pub use sla::{Verdict, Violation};
pub use stress_result::{PhaseResult, StressOutcome};
