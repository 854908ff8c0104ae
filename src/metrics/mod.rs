mod cache;
mod line;

pub use cache::{MetricSnapshot, SnapshotCache};
pub use line::MetricLine;
#[cfg(test)]
pub use line::MetricValue;
