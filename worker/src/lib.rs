pub mod config;
pub mod error;
mod session;
pub mod worker;

pub use config::WorkerConfig;
pub use error::{Result, WorkerErr};
pub use worker::Worker;
