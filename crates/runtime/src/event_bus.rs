use std::cell::RefCell;
use std::rc::Rc;

/// A published event together with its position in the bus' sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event<E> {
    /// 0-based, strictly increasing per bus.
    pub seq: u64,
    pub payload: E,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Subscriber<E> = Rc<RefCell<dyn FnMut(&Event<E>)>>;

/// Single-threaded publish/subscribe bus.
///
/// Ordering contract:
/// - `emit` invokes subscribers synchronously, in subscription order.
/// - `queue` only records the event; it reaches subscribers when the
///   [`Delivery`] returned by `take_delivery` is run. This lets the owner of
///   the bus release its own borrows before subscriber code executes.
/// - The log keeps the most recent `log_limit` events (all of them when
///   unbounded) until `drain` is called. Sequence numbers never reset.
pub struct EventBus<E> {
    next_seq: u64,
    next_subscription: u64,
    subscribers: Vec<(SubscriptionId, Subscriber<E>)>,
    events: Vec<Event<E>>,
    pending: Vec<Event<E>>,
    log_limit: Option<usize>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            next_seq: 0,
            next_subscription: 0,
            subscribers: Vec::new(),
            events: Vec::new(),
            pending: Vec::new(),
            log_limit: None,
        }
    }
}

impl<E> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("next_seq", &self.next_seq)
            .field("subscribers", &self.subscribers.len())
            .field("events", &self.events.len())
            .field("pending", &self.pending.len())
            .field("log_limit", &self.log_limit)
            .finish()
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bus whose log keeps only the newest `limit` events.
    pub fn with_log_limit(limit: usize) -> Self {
        Self {
            log_limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn subscribe(&mut self, f: impl FnMut(&Event<E>) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        let subscriber: Subscriber<E> = Rc::new(RefCell::new(f));
        self.subscribers.push((id, subscriber));
        id
    }

    /// Returns `true` if the subscription existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn events(&self) -> &[Event<E>] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<Event<E>> {
        std::mem::take(&mut self.events)
    }

    fn record(&mut self, event: Event<E>) {
        if let Some(limit) = self.log_limit {
            if limit == 0 {
                return;
            }
            if self.events.len() >= limit {
                let excess = self.events.len() + 1 - limit;
                self.events.drain(..excess);
            }
        }
        self.events.push(event);
    }
}

impl<E: Clone> EventBus<E> {
    /// Publishes `payload` to subscribers right away and returns its sequence
    /// number.
    pub fn emit(&mut self, payload: E) -> u64 {
        let seq = self.queue(payload);
        self.take_delivery().run();
        seq
    }

    /// Records `payload` for a later [`Delivery`] and returns its sequence
    /// number.
    pub fn queue(&mut self, payload: E) -> u64 {
        let event = Event {
            seq: self.next_seq,
            payload,
        };
        self.next_seq += 1;
        self.pending.push(event.clone());
        self.record(event);
        self.next_seq - 1
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Hands queued events and the current subscribers to a [`Delivery`].
    pub fn take_delivery(&mut self) -> Delivery<E> {
        Delivery {
            events: std::mem::take(&mut self.pending),
            subscribers: self.subscribers.iter().map(|(_, s)| Rc::clone(s)).collect(),
        }
    }
}

/// Queued events detached from their bus, ready to hand to subscribers.
pub struct Delivery<E> {
    events: Vec<Event<E>>,
    subscribers: Vec<Subscriber<E>>,
}

impl<E> Delivery<E> {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Calls every subscriber for every event, events in sequence order.
    ///
    /// A subscriber that is already running (it caused this delivery) is
    /// skipped for these events.
    pub fn run(self) {
        for event in &self.events {
            for subscriber in &self.subscribers {
                if let Ok(mut f) = subscriber.try_borrow_mut() {
                    (*f)(event);
                }
            }
        }
    }
}
