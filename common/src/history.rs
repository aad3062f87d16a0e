use crate::types::HistorySample;

// 24 hours at one sample per 5 minutes.
pub const HISTORY_CAPACITY: usize = 288;
pub const HISTORY_INTERVAL_SECS: u32 = 300;

#[derive(Debug, Clone)]
pub struct HistoryRing {
    slots: Vec<HistorySample>,
    // Index of the oldest sample once the ring has wrapped.
    next: usize,
    capacity: usize,
}

impl Default for HistoryRing {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

impl HistoryRing {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            next: 0,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn append(&mut self, sample: HistorySample) {
        if self.slots.len() < self.capacity {
            self.slots.push(sample);
            return;
        }
        self.slots[self.next] = sample;
        self.next = (self.next + 1) % self.capacity;
    }

    pub fn latest(&self) -> Option<HistorySample> {
        if self.slots.len() < self.capacity {
            return self.slots.last().copied();
        }
        let index = (self.next + self.capacity - 1) % self.capacity;
        self.slots.get(index).copied()
    }

    /// Samples oldest first. Gaps stay as `None`.
    pub fn snapshot(&self) -> Vec<HistorySample> {
        let (newer, older) = self.slots.split_at(self.next);
        older.iter().chain(newer).copied().collect()
    }
}

/// Accumulates tick time and reports when a history sample is due.
#[derive(Debug, Clone)]
pub struct HistorySampler {
    interval_secs: u32,
    accumulated_secs: u32,
}

impl Default for HistorySampler {
    fn default() -> Self {
        Self::new(HISTORY_INTERVAL_SECS)
    }
}

impl HistorySampler {
    pub fn new(interval_secs: u32) -> Self {
        Self {
            interval_secs: interval_secs.max(1),
            accumulated_secs: 0,
        }
    }

    pub fn advance(&mut self, elapsed_secs: u32) -> bool {
        self.accumulated_secs = self.accumulated_secs.saturating_add(elapsed_secs);
        if self.accumulated_secs < self.interval_secs {
            return false;
        }
        self.accumulated_secs = 0;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample(index: usize) -> HistorySample {
        HistorySample {
            t1: Some(index as f32),
            t2: None,
        }
    }

    #[test]
    fn keeps_most_recent_window_in_order() {
        let mut ring = HistoryRing::default();
        for index in 0..300 {
            ring.append(sample(index));
        }

        let snapshot = ring.snapshot();
        let expected: Vec<_> = (12..300).map(sample).collect();

        assert_eq!(ring.len(), HISTORY_CAPACITY);
        assert_eq!(snapshot, expected);
        assert_eq!(ring.latest(), Some(sample(299)));
    }

    #[test]
    fn partial_buffer_is_returned_as_appended() {
        let mut ring = HistoryRing::new(4);
        ring.append(sample(0));
        ring.append(HistorySample::default());
        ring.append(sample(2));

        assert_eq!(
            ring.snapshot(),
            vec![sample(0), HistorySample::default(), sample(2)]
        );
        assert_eq!(ring.latest(), Some(sample(2)));
    }

    #[test]
    fn wraps_exactly_at_capacity() {
        let mut ring = HistoryRing::new(3);
        for index in 0..3 {
            ring.append(sample(index));
        }
        assert_eq!(ring.snapshot(), vec![sample(0), sample(1), sample(2)]);

        ring.append(sample(3));
        assert_eq!(ring.snapshot(), vec![sample(1), sample(2), sample(3)]);
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn empty_ring_has_no_latest() {
        let ring = HistoryRing::new(3);
        assert!(ring.is_empty());
        assert_eq!(ring.latest(), None);
        assert!(ring.snapshot().is_empty());
    }

    #[test]
    fn sampler_fires_every_interval_and_resets() {
        let mut sampler = HistorySampler::new(300);
        let fired: Vec<_> = (0..900).filter(|_| sampler.advance(1)).collect();
        assert_eq!(fired, vec![299, 599, 899]);
    }

    #[test]
    fn sampler_handles_long_ticks() {
        let mut sampler = HistorySampler::new(300);
        assert!(!sampler.advance(0));
        assert!(sampler.advance(450));
        assert!(!sampler.advance(100));
    }
}
