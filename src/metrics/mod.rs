mod collector;
mod ring_buffer;
mod state;
mod tdigest;

pub use collector::{spawn_consumer, MetricsHandle, SNAPSHOT_TTL};
pub use ring_buffer::RingBuffer;
pub use state::MetricsState;
pub use tdigest::{TDigest, MAX_CENTROIDS};
