//! Single-threaded deferred work over a logical clock.
//!
//! Simulated latency is modelled as payloads that become visible once the
//! clock passes their due time. Nothing runs concurrently and nothing is
//! cancelled: the owner drains due payloads in due-time order. Each payload
//! comes back with its `Ticket`, so an owner that must honor request order
//! can drop a payload superseded by a newer ticket it already applied.

use std::time::Duration;

/// Handle returned by `schedule`, ordered by scheduling sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

#[derive(Debug)]
struct Pending<T> {
    due: Duration,
    ticket: Ticket,
    payload: T,
}

#[derive(Debug)]
pub struct DeferredQueue<T> {
    now: Duration,
    next_ticket: u64,
    pending: Vec<Pending<T>>,
}

impl<T> Default for DeferredQueue<T> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            next_ticket: 0,
            pending: Vec::new(),
        }
    }
}

impl<T> DeferredQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Queue `payload` to become due `delay` after the current time.
    pub fn schedule(&mut self, delay: Duration, payload: T) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.pending.push(Pending {
            due: self.now + delay,
            ticket,
            payload,
        });
        ticket
    }

    /// Move the clock forward and return every payload now due with its
    /// ticket, ordered by due time and then by scheduling order.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<(Ticket, T)> {
        self.now += elapsed;
        let now = self.now;
        let (mut due, waiting): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|item| item.due <= now);
        self.pending = waiting;
        due.sort_by_key(|item| (item.due, item.ticket));
        due.into_iter().map(|item| (item.ticket, item.payload)).collect()
    }

    /// Advance exactly far enough to release everything pending.
    pub fn drain(&mut self) -> Vec<(Ticket, T)> {
        let horizon = self
            .pending
            .iter()
            .map(|item| item.due)
            .max()
            .unwrap_or(self.now);
        self.advance(horizon.saturating_sub(self.now))
    }
}
