mod executor;
mod prep;
mod transport;

pub use executor::HttpExecutor;
pub use prep::{prepare, substitute_vars, PreparedRequest};
pub use transport::{
    build_client, HttpClientConfig, ReqwestTransport, Transport, TransportOutcome,
    DEFAULT_REDIRECT_LIMIT, DEFAULT_REQUEST_TIMEOUT, MAX_REDIRECT_LIMIT,
};
