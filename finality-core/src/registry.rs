//! Watch registry: the in-flight watched transactions of a run.

use std::collections::BTreeMap;
use std::time::Instant;

use finality_types::CorrelationId;

use crate::Watch;

/// In-flight watches keyed by correlation id.
///
/// Iteration is in correlation-id order so evaluation never depends on
/// insertion or hashing order.
#[derive(Debug, Clone, Default)]
pub struct WatchRegistry {
    watches: BTreeMap<CorrelationId, Watch>,
    node_count: usize,
}

impl WatchRegistry {
    /// Create an empty registry for a cluster of `node_count` nodes.
    pub fn new(node_count: usize) -> Self {
        Self {
            watches: BTreeMap::new(),
            node_count,
        }
    }

    /// Start watching a transaction.
    ///
    /// Returns false if the id is already being watched.
    pub fn add_watch(&mut self, correlation_id: CorrelationId, submit_time: Instant) -> bool {
        if self.watches.contains_key(&correlation_id) {
            return false;
        }
        self.watches.insert(
            correlation_id,
            Watch::new(correlation_id, submit_time, self.node_count),
        );
        true
    }

    /// Look up a watch.
    pub fn get(&self, correlation_id: &CorrelationId) -> Option<&Watch> {
        self.watches.get(correlation_id)
    }

    /// Look up a watch for mutation.
    pub fn get_mut(&mut self, correlation_id: &CorrelationId) -> Option<&mut Watch> {
        self.watches.get_mut(correlation_id)
    }

    /// Stop watching a transaction.
    pub fn remove(&mut self, correlation_id: &CorrelationId) -> Option<Watch> {
        self.watches.remove(correlation_id)
    }

    /// Ids of all in-flight watches, in order.
    pub fn ids(&self) -> Vec<CorrelationId> {
        self.watches.keys().copied().collect()
    }

    /// Iterate in-flight watches in order.
    pub fn iter(&self) -> impl Iterator<Item = &Watch> {
        self.watches.values()
    }

    /// Number of in-flight watches.
    pub fn len(&self) -> usize {
        self.watches.len()
    }

    /// True if nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    /// Drop every watch.
    pub fn clear(&mut self) {
        self.watches.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finality_types::CORRELATION_ID_LEN;

    #[test]
    fn add_creates_unknown_watch_for_every_node() {
        let mut reg = WatchRegistry::new(4);
        let id = CorrelationId::random();
        assert!(reg.add_watch(id, Instant::now()));

        let watch = reg.get(&id).unwrap();
        assert_eq!(watch.node_count(), 4);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn duplicate_add_is_ignored() {
        let mut reg = WatchRegistry::new(1);
        let id = CorrelationId::random();
        let t0 = Instant::now();
        assert!(reg.add_watch(id, t0));
        assert!(!reg.add_watch(id, t0));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn ids_are_ordered() {
        let mut reg = WatchRegistry::new(1);
        let now = Instant::now();
        let hi = CorrelationId::from([9u8; CORRELATION_ID_LEN]);
        let lo = CorrelationId::from([1u8; CORRELATION_ID_LEN]);
        reg.add_watch(hi, now);
        reg.add_watch(lo, now);
        assert_eq!(reg.ids(), vec![lo, hi]);
    }

    #[test]
    fn remove_and_clear() {
        let mut reg = WatchRegistry::new(2);
        let a = CorrelationId::random();
        let b = CorrelationId::random();
        reg.add_watch(a, Instant::now());
        reg.add_watch(b, Instant::now());

        assert!(reg.remove(&a).is_some());
        assert!(reg.remove(&a).is_none());
        assert_eq!(reg.len(), 1);

        reg.clear();
        assert!(reg.is_empty());
    }
}
