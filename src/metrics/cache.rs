use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use log::debug;

use super::line::MetricLine;

/// The complete metric set of one successful collection cycle.
#[derive(Debug)]
pub struct MetricSnapshot {
    lines: Vec<MetricLine>,
    captured_at: DateTime<Utc>,
}

impl MetricSnapshot {
    pub fn new(lines: Vec<MetricLine>, captured_at: DateTime<Utc>) -> Self {
        Self { lines, captured_at }
    }

    #[cfg(test)]
    pub fn lines(&self) -> &[MetricLine] {
        &self.lines
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn render(&self) -> Vec<String> {
        self.lines.iter().map(ToString::to_string).collect()
    }
}

/// Holds the latest committed snapshot.
///
/// Readers load the current `Arc` without locking and keep it alive for as
/// long as they need it; `replace` swaps in a whole new snapshot, so a reader
/// sees either the previous set or the new one, never a mix.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    current: ArcSwapOption<MetricSnapshot>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&self, lines: Vec<MetricLine>) {
        let snapshot = MetricSnapshot::new(lines, Utc::now());
        debug!("Installing snapshot with {} metric lines", snapshot.len());
        self.current.store(Some(Arc::new(snapshot)));
    }

    /// Current snapshot, or `None` before the first successful cycle.
    pub fn read(&self) -> Option<Arc<MetricSnapshot>> {
        self.current.load_full()
    }

    /// Rendered exposition lines of the current snapshot; empty before the
    /// first successful cycle.
    pub fn get_metrics(&self) -> Vec<String> {
        self.read()
            .map(|snapshot| snapshot.render())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn lines(generation: usize, count: usize) -> Vec<MetricLine> {
        (0..count)
            .map(|i| {
                MetricLine::info("azure_devops_build")
                    .label("generation", generation)
                    .label("id", i)
            })
            .collect()
    }

    #[test]
    fn test_empty_before_first_replace() {
        let cache = SnapshotCache::new();
        assert!(cache.read().is_none());
        assert!(cache.get_metrics().is_empty());
    }

    #[test]
    fn test_replace_discards_previous_snapshot() {
        let cache = SnapshotCache::new();
        cache.replace(lines(1, 3));
        cache.replace(lines(2, 2));

        let metrics = cache.get_metrics();
        assert_eq!(metrics.len(), 2);
        assert!(metrics.iter().all(|m| m.contains(r#"generation="2""#)));
    }

    #[test]
    fn test_reader_keeps_its_snapshot_across_replace() {
        let cache = SnapshotCache::new();
        cache.replace(lines(1, 4));

        let held = cache.read().unwrap();
        cache.replace(lines(2, 1));

        assert_eq!(held.len(), 4);
        assert_eq!(cache.read().unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_readers_never_see_a_mixed_snapshot() {
        let cache = Arc::new(SnapshotCache::new());
        cache.replace(lines(0, 50));
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let done = Arc::clone(&done);
                std::thread::spawn(move || {
                    while !done.load(Ordering::Relaxed) {
                        let snapshot = cache.read().unwrap();
                        let first = snapshot.lines()[0].label_value("generation").unwrap().to_string();
                        assert_eq!(snapshot.len(), 50);
                        assert!(snapshot
                            .lines()
                            .iter()
                            .all(|l| l.label_value("generation") == Some(first.as_str())));
                    }
                })
            })
            .collect();

        for generation in 1..200 {
            cache.replace(lines(generation, 50));
        }
        done.store(true, Ordering::Relaxed);

        for reader in readers {
            reader.join().unwrap();
        }
    }
}
