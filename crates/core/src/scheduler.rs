use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Milliseconds on the session clock.
pub type Millis = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct Timer<E> {
    event: E,
    period: Option<Millis>,
}

/// Timeouts and intervals over a caller-driven clock.
///
/// Nothing fires on its own: `advance_to` moves the clock forward and returns
/// the events that became due, in due-time order (registration order on
/// ties). An interval fires once per elapsed period.
#[derive(Debug)]
pub struct Scheduler<E: Clone> {
    now: Millis,
    next_id: u64,
    queue: BinaryHeap<Reverse<(Millis, u64, TimerId)>>,
    timers: HashMap<TimerId, Timer<E>>,
}

impl<E: Clone> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            now: 0,
            next_id: 0,
            queue: BinaryHeap::new(),
            timers: HashMap::new(),
        }
    }

    pub fn now(&self) -> Millis {
        self.now
    }

    pub fn set_timeout(&mut self, delay: Millis, event: E) -> TimerId {
        self.insert(delay, event, None)
    }

    /// Fires every `period` ms, first at `now + period`. A zero period is
    /// treated as 1 ms.
    pub fn set_interval(&mut self, period: Millis, event: E) -> TimerId {
        let period = period.max(1);
        self.insert(period, event, Some(period))
    }

    /// Returns false when the timer already fired (timeouts) or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.remove(&id).is_some()
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Moves the clock to `now` and collects everything due. A `now` earlier
    /// than the current clock fires nothing.
    pub fn advance_to(&mut self, now: Millis) -> Vec<E> {
        let mut fired = Vec::new();
        while let Some(Reverse((due, _, id))) = self.queue.peek().copied() {
            if due > now {
                break;
            }
            self.queue.pop();
            // Cancelled timers leave stale heap entries behind.
            let Some(timer) = self.timers.get(&id) else {
                continue;
            };
            fired.push(timer.event.clone());
            let period = timer.period;
            match period {
                Some(period) => {
                    let seq = self.bump();
                    self.queue.push(Reverse((due + period, seq, id)));
                }
                None => {
                    self.timers.remove(&id);
                }
            }
        }
        self.now = self.now.max(now);
        fired
    }

    fn insert(&mut self, delay: Millis, event: E, period: Option<Millis>) -> TimerId {
        let seq = self.bump();
        let id = TimerId(seq);
        self.timers.insert(id, Timer { event, period });
        self.queue.push(Reverse((self.now + delay, seq, id)));
        id
    }

    fn bump(&mut self) -> u64 {
        let seq = self.next_id;
        self.next_id += 1;
        seq
    }
}
