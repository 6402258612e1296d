use std::collections::VecDeque;

/// Energy stored per sub-period slot (MWh). Newest slot at the front, oldest
/// at the back. The length never changes outside of `advance`.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageHistory {
    release_time: usize,
    slots: VecDeque<f64>,
}

impl StorageHistory {
    pub fn new(release_time: usize) -> Self {
        Self {
            release_time,
            slots: std::iter::repeat(0.0).take(release_time).collect(),
        }
    }

    pub fn reset(&mut self) {
        self.slots.clear();
        self.slots
            .extend(std::iter::repeat(0.0).take(self.release_time));
    }

    pub fn release_time(&self) -> usize {
        self.release_time
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn charge(&self) -> f64 {
        self.slots.iter().sum()
    }

    pub fn slots(&self) -> impl Iterator<Item = f64> + '_ {
        self.slots.iter().copied()
    }

    /// Evicts the oldest slot, then inserts whatever `store` decides to put
    /// away given the charge left after eviction. Returns `(stored, discharged)`.
    pub fn advance<F>(&mut self, store: F) -> (f64, f64)
    where
        F: FnOnce(f64) -> f64,
    {
        let discharged = self.slots.pop_back().unwrap_or(0.0);
        let stored = store(self.charge());
        self.slots.push_front(stored);
        (stored, discharged)
    }

    /// Empties every slot at once and returns the energy released.
    pub fn release_all(&mut self) -> f64 {
        let discharged = self.charge();
        for slot in self.slots.iter_mut() {
            *slot = 0.0;
        }
        discharged
    }
}
