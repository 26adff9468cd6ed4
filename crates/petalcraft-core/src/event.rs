//! Craft events, buffered per kind and delivered in batches.
//!
//! Stations push events onto the [`EventBus`] while the
//! [`Workshop`](crate::workshop::Workshop) handles one host call. When that
//! call returns, the workshop runs [`EventBus::deliver`], which hands each
//! kind's queued events to its listeners in emission order.
//!
//! A kind switched off with [`EventBus::suppress`] is dropped at `emit`
//! and never reaches its buffer.

use crate::advisory::Advisory;
use crate::fixed::Ticks;
use crate::id::{Color, EntityId, StationId};
use crate::session::SessionMode;
use std::collections::{VecDeque, vec_deque};

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Why a transformation pipeline left the happy path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FaultReason {
    /// The completion callback never arrived within the configured timeout.
    TimedOut,
    /// The completion arrived but no artifact is mapped for the substance.
    MissingOutput,
}

/// A configuration gap that turned an operation into a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MissingConfig {
    SubstancePrefab(Color),
    ArtifactPrefab(Color),
    FlowerPrefab(Color),
    DisplayPrefab(Color),
    DisplaySlot(Color),
    Animator,
}

/// A workshop event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CraftEvent {
    // -- Slots --
    ItemSnapped {
        station: StationId,
        entity: EntityId,
        slot: usize,
        tick: Ticks,
    },
    SlotReleased {
        station: StationId,
        entity: EntityId,
        slot: usize,
        tick: Ticks,
    },
    SlotsReset {
        station: StationId,
        detached: u32,
        destroyed: u32,
        tick: Ticks,
    },

    // -- Batch --
    BatchStarted {
        station: StationId,
        color: Color,
        tick: Ticks,
    },
    BatchMemberAdded {
        station: StationId,
        entity: EntityId,
        members: u32,
        tick: Ticks,
    },
    BatchMemberRemoved {
        station: StationId,
        entity: EntityId,
        members: u32,
        tick: Ticks,
    },
    BatchMismatch {
        station: StationId,
        expected: Color,
        incoming: Color,
        tick: Ticks,
    },
    AgitationCounted {
        station: StationId,
        count: u32,
        tick: Ticks,
    },
    SubstanceSpawned {
        station: StationId,
        entity: EntityId,
        color: Color,
        tick: Ticks,
    },

    // -- Advisories --
    AdvisoryShown {
        station: Option<StationId>,
        advisory: Advisory,
        tick: Ticks,
    },
    AdvisoryDismissed {
        station: Option<StationId>,
        advisory: Advisory,
        tick: Ticks,
    },

    // -- Pipeline --
    SubstanceLoaded {
        station: StationId,
        entity: EntityId,
        color: Color,
        tick: Ticks,
    },
    ProcessingStarted {
        station: StationId,
        catalyst: EntityId,
        tick: Ticks,
    },
    ArtifactSpawned {
        station: StationId,
        entity: EntityId,
        color: Color,
        tick: Ticks,
    },
    PipelineFaulted {
        station: StationId,
        reason: FaultReason,
        tick: Ticks,
    },

    // -- Inventory --
    ItemCollected {
        station: StationId,
        entity: EntityId,
        color: Color,
        count: u32,
        tick: Ticks,
    },
    ItemWithdrawn {
        station: StationId,
        entity: EntityId,
        color: Color,
        count: u32,
        tick: Ticks,
    },
    ContainerLocked {
        station: StationId,
        tick: Ticks,
    },
    ContainerUnlocked {
        station: StationId,
        tick: Ticks,
    },

    // -- Misc --
    ConfigurationMissing {
        station: StationId,
        missing: MissingConfig,
        tick: Ticks,
    },
    SessionModeChanged {
        mode: SessionMode,
        tick: Ticks,
    },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ItemSnapped,
    SlotReleased,
    SlotsReset,
    BatchStarted,
    BatchMemberAdded,
    BatchMemberRemoved,
    BatchMismatch,
    AgitationCounted,
    SubstanceSpawned,
    AdvisoryShown,
    AdvisoryDismissed,
    SubstanceLoaded,
    ProcessingStarted,
    ArtifactSpawned,
    PipelineFaulted,
    ItemCollected,
    ItemWithdrawn,
    ContainerLocked,
    ContainerUnlocked,
    ConfigurationMissing,
    SessionModeChanged,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 21;

impl CraftEvent {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            CraftEvent::ItemSnapped { .. } => EventKind::ItemSnapped,
            CraftEvent::SlotReleased { .. } => EventKind::SlotReleased,
            CraftEvent::SlotsReset { .. } => EventKind::SlotsReset,
            CraftEvent::BatchStarted { .. } => EventKind::BatchStarted,
            CraftEvent::BatchMemberAdded { .. } => EventKind::BatchMemberAdded,
            CraftEvent::BatchMemberRemoved { .. } => EventKind::BatchMemberRemoved,
            CraftEvent::BatchMismatch { .. } => EventKind::BatchMismatch,
            CraftEvent::AgitationCounted { .. } => EventKind::AgitationCounted,
            CraftEvent::SubstanceSpawned { .. } => EventKind::SubstanceSpawned,
            CraftEvent::AdvisoryShown { .. } => EventKind::AdvisoryShown,
            CraftEvent::AdvisoryDismissed { .. } => EventKind::AdvisoryDismissed,
            CraftEvent::SubstanceLoaded { .. } => EventKind::SubstanceLoaded,
            CraftEvent::ProcessingStarted { .. } => EventKind::ProcessingStarted,
            CraftEvent::ArtifactSpawned { .. } => EventKind::ArtifactSpawned,
            CraftEvent::PipelineFaulted { .. } => EventKind::PipelineFaulted,
            CraftEvent::ItemCollected { .. } => EventKind::ItemCollected,
            CraftEvent::ItemWithdrawn { .. } => EventKind::ItemWithdrawn,
            CraftEvent::ContainerLocked { .. } => EventKind::ContainerLocked,
            CraftEvent::ContainerUnlocked { .. } => EventKind::ContainerUnlocked,
            CraftEvent::ConfigurationMissing { .. } => EventKind::ConfigurationMissing,
            CraftEvent::SessionModeChanged { .. } => EventKind::SessionModeChanged,
        }
    }

    /// The station an event belongs to, if any.
    pub fn station(&self) -> Option<StationId> {
        match *self {
            CraftEvent::ItemSnapped { station, .. }
            | CraftEvent::SlotReleased { station, .. }
            | CraftEvent::SlotsReset { station, .. }
            | CraftEvent::BatchStarted { station, .. }
            | CraftEvent::BatchMemberAdded { station, .. }
            | CraftEvent::BatchMemberRemoved { station, .. }
            | CraftEvent::BatchMismatch { station, .. }
            | CraftEvent::AgitationCounted { station, .. }
            | CraftEvent::SubstanceSpawned { station, .. }
            | CraftEvent::SubstanceLoaded { station, .. }
            | CraftEvent::ProcessingStarted { station, .. }
            | CraftEvent::ArtifactSpawned { station, .. }
            | CraftEvent::PipelineFaulted { station, .. }
            | CraftEvent::ItemCollected { station, .. }
            | CraftEvent::ItemWithdrawn { station, .. }
            | CraftEvent::ContainerLocked { station, .. }
            | CraftEvent::ContainerUnlocked { station, .. }
            | CraftEvent::ConfigurationMissing { station, .. } => Some(station),
            CraftEvent::AdvisoryShown { station, .. }
            | CraftEvent::AdvisoryDismissed { station, .. } => station,
            CraftEvent::SessionModeChanged { .. } => None,
        }
    }
}

impl EventKind {
    /// Every kind, in index order.
    pub const ALL: [EventKind; EVENT_KIND_COUNT] = [
        EventKind::ItemSnapped,
        EventKind::SlotReleased,
        EventKind::SlotsReset,
        EventKind::BatchStarted,
        EventKind::BatchMemberAdded,
        EventKind::BatchMemberRemoved,
        EventKind::BatchMismatch,
        EventKind::AgitationCounted,
        EventKind::SubstanceSpawned,
        EventKind::AdvisoryShown,
        EventKind::AdvisoryDismissed,
        EventKind::SubstanceLoaded,
        EventKind::ProcessingStarted,
        EventKind::ArtifactSpawned,
        EventKind::PipelineFaulted,
        EventKind::ItemCollected,
        EventKind::ItemWithdrawn,
        EventKind::ContainerLocked,
        EventKind::ContainerUnlocked,
        EventKind::ConfigurationMissing,
        EventKind::SessionModeChanged,
    ];

    /// Convert to usize index for array lookups.
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer
// ---------------------------------------------------------------------------

/// Bounded per-kind queue. Allocated once at its capacity; pushing into a
/// full buffer evicts the oldest event.
#[derive(Debug)]
pub struct EventBuffer {
    events: VecDeque<CraftEvent>,
    capacity: usize,
    /// Every push, evicted or not.
    total_written: u64,
    /// Pushes that evicted an undelivered event.
    dropped: u64,
}

impl EventBuffer {
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            total_written: 0,
            dropped: 0,
        }
    }

    pub fn push(&mut self, event: CraftEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(event);
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Events evicted before anyone could see them.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    /// Oldest first.
    pub fn iter(&self) -> vec_deque::Iter<'_, CraftEvent> {
        self.events.iter()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// Read-only observer: UI, audio cues, analytics.
pub type Listener = Box<dyn FnMut(&CraftEvent)>;

/// Skips events for which it returns false.
pub type EventFilter = Box<dyn Fn(&CraftEvent) -> bool>;

/// `Pre` listeners see each batch first, `Post` last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubscriberPriority {
    Pre = 0,
    Normal = 1,
    Post = 2,
}

struct Subscriber {
    priority: SubscriberPriority,
    filter: Option<EventFilter>,
    listener: Listener,
}

impl Subscriber {
    fn notify(&mut self, event: &CraftEvent) {
        if self.filter.as_ref().is_none_or(|accepts| accepts(event)) {
            (self.listener)(event);
        }
    }
}

/// Everything the bus tracks for one event kind.
#[derive(Default)]
struct KindChannel {
    /// Created on first emit.
    buffer: Option<EventBuffer>,
    suppressed: bool,
    /// Sorted by priority; registration order within a priority.
    subscribers: Vec<Subscriber>,
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Per-kind event queues plus the listeners registered on each kind.
pub struct EventBus {
    channels: [KindChannel; EVENT_KIND_COUNT],
    default_capacity: usize,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queued: Vec<usize> = EventKind::ALL.iter().map(|&k| self.buffered_count(k)).collect();
        f.debug_struct("EventBus")
            .field("default_capacity", &self.default_capacity)
            .field("queued", &queued)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// `default_capacity` bounds each kind's buffer.
    pub fn new(default_capacity: usize) -> Self {
        Self {
            channels: std::array::from_fn(|_| KindChannel::default()),
            default_capacity,
        }
    }

    fn channel(&self, kind: EventKind) -> &KindChannel {
        &self.channels[kind.index()]
    }

    /// Stop recording `kind`; anything already queued is discarded.
    pub fn suppress(&mut self, kind: EventKind) {
        let channel = &mut self.channels[kind.index()];
        channel.suppressed = true;
        channel.buffer = None;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.channel(kind).suppressed
    }

    pub fn emit(&mut self, event: CraftEvent) {
        let channel = &mut self.channels[event.kind().index()];
        if channel.suppressed {
            return;
        }
        let capacity = self.default_capacity;
        channel
            .buffer
            .get_or_insert_with(|| EventBuffer::new(capacity))
            .push(event);
    }

    pub fn on(&mut self, kind: EventKind, listener: Listener) {
        self.on_filtered(kind, SubscriberPriority::Normal, None, listener);
    }

    pub fn on_filtered(
        &mut self,
        kind: EventKind,
        priority: SubscriberPriority,
        filter: Option<EventFilter>,
        listener: Listener,
    ) {
        let subscribers = &mut self.channels[kind.index()].subscribers;
        // Insert after every subscriber of the same or earlier priority.
        let at = subscribers.partition_point(|s| s.priority <= priority);
        subscribers.insert(
            at,
            Subscriber {
                priority,
                filter,
                listener,
            },
        );
    }

    /// Flush every queue to its listeners in [`EventKind::ALL`] order. Each
    /// listener sees the whole batch for a kind before the next listener
    /// runs. Queues are empty afterwards.
    pub fn deliver(&mut self) {
        for channel in &mut self.channels {
            let KindChannel {
                buffer: Some(buffer),
                subscribers,
                ..
            } = channel
            else {
                continue;
            };
            for subscriber in subscribers.iter_mut() {
                buffer.iter().for_each(|event| subscriber.notify(event));
            }
            buffer.clear();
        }
    }

    pub fn buffer(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.channel(kind).buffer.as_ref()
    }

    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.buffer(kind).map_or(0, EventBuffer::len)
    }

    /// Includes events that were later evicted.
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.buffer(kind).map_or(0, EventBuffer::total_written)
    }

    /// Empties every queue without notifying anyone. Listeners and
    /// suppression stay in place.
    pub fn clear_all(&mut self) {
        self.channels
            .iter_mut()
            .filter_map(|c| c.buffer.as_mut())
            .for_each(EventBuffer::clear);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn make_station() -> StationId {
        let mut sm = SlotMap::<StationId, ()>::with_key();
        sm.insert(())
    }

    fn agitation(station: StationId, count: u32, tick: Ticks) -> CraftEvent {
        CraftEvent::AgitationCounted {
            station,
            count,
            tick,
        }
    }

    #[test]
    fn event_buffer_push_and_iterate() {
        let mut buf = EventBuffer::new(8);
        let s = make_station();
        buf.push(agitation(s, 1, 1));
        buf.push(agitation(s, 2, 2));

        assert_eq!(buf.len(), 2);
        assert_eq!(buf.dropped_count(), 0);
        let events: Vec<&CraftEvent> = buf.iter().collect();
        assert_eq!(events[0], &agitation(s, 1, 1));
        assert_eq!(events[1], &agitation(s, 2, 2));
    }

    #[test]
    fn full_buffer_evicts_oldest() {
        let mut buf = EventBuffer::new(3);
        let s = make_station();
        for i in 0..5u32 {
            buf.push(agitation(s, i, i as Ticks));
        }

        assert_eq!(buf.len(), 3);
        assert_eq!(buf.total_written(), 5);
        assert_eq!(buf.dropped_count(), 2);
        let counts: Vec<u32> = buf
            .iter()
            .map(|e| match e {
                CraftEvent::AgitationCounted { count, .. } => *count,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(counts, vec![2, 3, 4]);
        assert_eq!(buf.iter().len(), 3);
    }

    #[test]
    fn zero_capacity_holds_one_event() {
        let buf = EventBuffer::new(0);
        assert_eq!(buf.capacity(), 1);
    }

    #[test]
    fn suppressed_kind_is_never_buffered() {
        let mut bus = EventBus::new(16);
        bus.suppress(EventKind::AgitationCounted);
        bus.emit(agitation(make_station(), 1, 0));

        assert!(bus.is_suppressed(EventKind::AgitationCounted));
        assert!(bus.buffer(EventKind::AgitationCounted).is_none());
        assert_eq!(bus.total_emitted(EventKind::AgitationCounted), 0);
    }

    #[test]
    fn listeners_receive_in_registration_order() {
        let mut bus = EventBus::new(16);
        let order = Rc::new(RefCell::new(Vec::new()));

        let o1 = order.clone();
        bus.on(
            EventKind::AgitationCounted,
            Box::new(move |_| o1.borrow_mut().push("first")),
        );
        let o2 = order.clone();
        bus.on(
            EventKind::AgitationCounted,
            Box::new(move |_| o2.borrow_mut().push("second")),
        );

        bus.emit(agitation(make_station(), 1, 0));
        bus.deliver();

        assert_eq!(*order.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn priority_orders_delivery() {
        let mut bus = EventBus::new(16);
        let order = Rc::new(RefCell::new(Vec::new()));

        for (priority, label) in [
            (SubscriberPriority::Post, "post"),
            (SubscriberPriority::Normal, "normal"),
            (SubscriberPriority::Pre, "pre"),
        ] {
            let o = order.clone();
            bus.on_filtered(
                EventKind::ContainerLocked,
                priority,
                None,
                Box::new(move |_| o.borrow_mut().push(label)),
            );
        }

        bus.emit(CraftEvent::ContainerLocked {
            station: make_station(),
            tick: 0,
        });
        bus.deliver();

        assert_eq!(*order.borrow(), vec!["pre", "normal", "post"]);
    }

    #[test]
    fn filter_blocks_non_matching() {
        let mut bus = EventBus::new(16);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let s = seen.clone();
        bus.on_filtered(
            EventKind::AgitationCounted,
            SubscriberPriority::Normal,
            Some(Box::new(|e| {
                matches!(e, CraftEvent::AgitationCounted { count, .. } if *count >= 3)
            })),
            Box::new(move |e| s.borrow_mut().push(e.clone())),
        );

        let station = make_station();
        for i in 1..=3 {
            bus.emit(agitation(station, i, 0));
        }
        bus.deliver();

        assert_eq!(*seen.borrow(), vec![agitation(station, 3, 0)]);
    }

    #[test]
    fn delivery_clears_buffers() {
        let mut bus = EventBus::new(16);
        bus.emit(agitation(make_station(), 1, 0));
        assert_eq!(bus.buffered_count(EventKind::AgitationCounted), 1);

        bus.deliver();
        assert_eq!(bus.buffered_count(EventKind::AgitationCounted), 0);
        assert_eq!(bus.total_emitted(EventKind::AgitationCounted), 1);
    }

    #[test]
    fn drops_only_count_evictions_across_deliveries() {
        let mut bus = EventBus::new(2);
        let s = make_station();
        for round in 0..3u32 {
            bus.emit(agitation(s, round, 0));
            bus.emit(agitation(s, round, 1));
            bus.deliver();
        }
        let buf = bus.buffer(EventKind::AgitationCounted).unwrap();
        assert_eq!(buf.total_written(), 6);
        assert_eq!(buf.dropped_count(), 0);

        bus.emit(agitation(s, 9, 2));
        bus.emit(agitation(s, 9, 3));
        bus.emit(agitation(s, 9, 4));
        assert_eq!(bus.buffer(EventKind::AgitationCounted).unwrap().dropped_count(), 1);
    }

    #[test]
    fn clear_all_keeps_totals() {
        let mut bus = EventBus::new(16);
        let station = make_station();
        bus.emit(agitation(station, 1, 0));
        bus.emit(CraftEvent::ContainerUnlocked { station, tick: 0 });
        bus.clear_all();

        assert_eq!(bus.buffered_count(EventKind::AgitationCounted), 0);
        assert_eq!(bus.buffered_count(EventKind::ContainerUnlocked), 0);
        assert_eq!(bus.total_emitted(EventKind::ContainerUnlocked), 1);
    }

    #[test]
    fn station_accessor() {
        let station = make_station();
        assert_eq!(agitation(station, 1, 0).station(), Some(station));
        let session = CraftEvent::SessionModeChanged {
            mode: SessionMode::Painting,
            tick: 0,
        };
        assert_eq!(session.station(), None);
        assert_eq!(session.kind(), EventKind::SessionModeChanged);
    }

    #[test]
    fn all_kinds_are_in_index_order() {
        for (i, kind) in EventKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }
}
