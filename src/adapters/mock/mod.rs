//! Mock transport for testing.

mod transport;

pub use transport::{MockResponse, MockTransport, RecordedRequest, StreamScript, StreamStep};
