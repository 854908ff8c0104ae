pub mod azure;

pub use azure::{AzureDevOpsClient, Collector, Gateway, WorkerPool};
