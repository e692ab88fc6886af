//! What happens to eligible samples while the link is down

use std::collections::VecDeque;
use tracker_shared::PositionSample;

/// Offline handling strategy for eligible samples
pub trait SamplePolicy: Send {
    /// Called with an eligible sample while the link is not connected
    fn hold(&mut self, sample: PositionSample);

    /// Take every held sample, oldest first, to send before the current one
    fn take_backlog(&mut self) -> Vec<PositionSample>;

    /// Return samples that could not be sent; they stay ahead of newer ones
    fn requeue(&mut self, samples: Vec<PositionSample>);

    fn held(&self) -> usize;

    fn name(&self) -> &'static str;
}

/// Offline samples are discarded
#[derive(Debug, Default)]
pub struct DropPolicy;

impl SamplePolicy for DropPolicy {
    fn hold(&mut self, _sample: PositionSample) {}

    fn take_backlog(&mut self) -> Vec<PositionSample> {
        Vec::new()
    }

    fn requeue(&mut self, _samples: Vec<PositionSample>) {}

    fn held(&self) -> usize {
        0
    }

    fn name(&self) -> &'static str {
        "drop"
    }
}

/// Offline samples are kept in a bounded FIFO; the oldest is evicted when full
#[derive(Debug)]
pub struct BufferPolicy {
    capacity: usize,
    queue: VecDeque<PositionSample>,
}

impl BufferPolicy {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            queue: VecDeque::with_capacity(capacity),
        }
    }

    fn trim(&mut self) {
        while self.queue.len() > self.capacity {
            self.queue.pop_front();
        }
    }
}

impl SamplePolicy for BufferPolicy {
    fn hold(&mut self, sample: PositionSample) {
        self.queue.push_back(sample);
        self.trim();
    }

    fn take_backlog(&mut self) -> Vec<PositionSample> {
        self.queue.drain(..).collect()
    }

    fn requeue(&mut self, samples: Vec<PositionSample>) {
        for sample in samples.into_iter().rev() {
            self.queue.push_front(sample);
        }
        self.trim();
    }

    fn held(&self) -> usize {
        self.queue.len()
    }

    fn name(&self) -> &'static str {
        "buffer"
    }
}

/// Policy for a configured buffer size; 0 selects [`DropPolicy`]
pub fn policy_for_capacity(capacity: usize) -> Box<dyn SamplePolicy> {
    if capacity == 0 {
        Box::new(DropPolicy)
    } else {
        Box::new(BufferPolicy::new(capacity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample;

    fn at_age(age_ms: u64) -> PositionSample {
        sample(true, age_ms)
    }

    #[test]
    fn test_drop_policy_keeps_nothing() {
        let mut policy = DropPolicy;
        policy.hold(at_age(1));
        assert_eq!(policy.held(), 0);
        assert!(policy.take_backlog().is_empty());
    }

    #[test]
    fn test_buffer_policy_evicts_oldest() {
        let mut policy = BufferPolicy::new(2);
        policy.hold(at_age(1));
        policy.hold(at_age(2));
        policy.hold(at_age(3));

        let backlog = policy.take_backlog();
        assert_eq!(backlog, vec![at_age(2), at_age(3)]);
        assert_eq!(policy.held(), 0);
    }

    #[test]
    fn test_requeue_keeps_order_ahead_of_new_samples() {
        let mut policy = BufferPolicy::new(4);
        policy.hold(at_age(3));
        policy.requeue(vec![at_age(1), at_age(2)]);

        assert_eq!(policy.take_backlog(), vec![at_age(1), at_age(2), at_age(3)]);
    }

    #[test]
    fn test_policy_for_capacity() {
        assert_eq!(policy_for_capacity(0).name(), "drop");
        assert_eq!(policy_for_capacity(8).name(), "buffer");
    }
}
