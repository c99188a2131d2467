//! Production and test implementations of the transport trait.

pub mod mock;
mod reqwest_transport;

pub use mock::MockTransport;
pub use reqwest_transport::ReqwestTransport;
