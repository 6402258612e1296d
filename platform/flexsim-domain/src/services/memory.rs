use crate::value_objects::transition::Transition;
use rand::Rng;
use std::collections::VecDeque;

/// Bounded FIFO of transitions; the oldest are dropped once full.
#[derive(Debug, Clone)]
pub struct ReplayMemory {
    capacity: usize,
    buf: VecDeque<Transition>,
}

impl ReplayMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            buf: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn push(&mut self, transition: Transition) {
        while self.buf.len() >= self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(transition);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.buf.iter()
    }

    /// Uniform sample without replacement.
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Vec<&Transition> {
        let amount = batch_size.min(self.buf.len());
        rand::seq::index::sample(rng, self.buf.len(), amount)
            .into_iter()
            .filter_map(|idx| self.buf.get(idx))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::ReplayMemory;
    use crate::value_objects::observation::Observation;
    use crate::value_objects::transition::Transition;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn transition(reward: f64) -> Transition {
        Transition {
            observation: Observation::new(vec![reward]),
            action: 0,
            reward,
            next_observation: Observation::new(vec![reward + 1.0]),
            done: false,
        }
    }

    #[test]
    fn drops_oldest_when_full() {
        let mut memory = ReplayMemory::new(3);
        for i in 0..5 {
            memory.push(transition(i as f64));
        }
        let rewards: Vec<f64> = memory.iter().map(|t| t.reward).collect();
        assert_eq!(rewards, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn sample_is_bounded_and_distinct() {
        let mut memory = ReplayMemory::new(10);
        for i in 0..4 {
            memory.push(transition(i as f64));
        }
        let mut rng = StdRng::seed_from_u64(7);
        let batch = memory.sample(8, &mut rng);
        assert_eq!(batch.len(), 4);
        let mut rewards: Vec<f64> = batch.iter().map(|t| t.reward).collect();
        rewards.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(rewards, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn sample_is_reproducible_for_a_seed() {
        let mut memory = ReplayMemory::new(50);
        for i in 0..50 {
            memory.push(transition(i as f64));
        }
        let a: Vec<f64> = memory
            .sample(5, &mut StdRng::seed_from_u64(1))
            .iter()
            .map(|t| t.reward)
            .collect();
        let b: Vec<f64> = memory
            .sample(5, &mut StdRng::seed_from_u64(1))
            .iter()
            .map(|t| t.reward)
            .collect();
        assert_eq!(a, b);
    }
}
