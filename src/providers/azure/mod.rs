mod client;
mod collector;
mod duration;
mod formatter;
mod pool;
mod timeline;
mod types;

pub use client::{AzureDevOpsClient, Gateway, REQUEST_TIMEOUT};
pub use collector::{Collector, DEFAULT_BUILD_LIMIT};
pub use pool::{WorkerPool, DEFAULT_POOL_SIZE};

#[cfg(test)]
pub(crate) use collector::tests::{completed_build, FakeGateway};
