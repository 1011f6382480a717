pub mod app;
pub mod error;
pub mod net;
pub mod proto;
pub mod scenario;
pub mod sim;
pub mod trace;

pub use error::{Result, TraceError};

#[cfg(test)]
mod test;
