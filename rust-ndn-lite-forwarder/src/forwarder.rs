//! The forwarding core.
//!
//! A [`Forwarder`] owns every piece of engine state. It never blocks: the
//! owning loop calls [`Forwarder::process`] repeatedly, and each call reads
//! what the faces have buffered, times out pending Interests and runs due
//! tasks. Application callbacks run synchronously inside these calls and
//! receive the forwarder itself, so they can send, register and schedule
//! without any shared state.

use bytes::Bytes;
use log::{debug, info, trace, warn};
use rust_ndn_lite_common::{
    metrics::ForwarderMetrics,
    ndn::packet_type,
    tlv,
    types::{FaceId, HandlerId, PendingId, TaskId},
    Data, Error, Interest, Name,
};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    time::{Duration, Instant},
};

use crate::{
    clock::{Clock, SystemClock},
    config::ForwarderConfig,
    face::Face,
    fib::{Fib, ForwardingStrategy, NextHopTarget},
    keys::KeyStorage,
    pit::{Downstream, InsertOutcome, Pit, PitKey},
    scheduler::Scheduler,
};

/// Called with the Data that satisfied an expressed Interest.
pub type OnData = Box<dyn FnOnce(&mut Forwarder, &Data)>;

/// Called with the expressed Interest once it expired or was cancelled.
pub type OnTimeout = Box<dyn FnOnce(&mut Forwarder, &Interest)>;

type Task = Box<dyn FnMut(&mut Forwarder)>;

/// What a prefix handler wants done with the Interest after it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Continue with FIB forwarding.
    Forward,
    /// Stop here; the handler answered or chose to drop it.
    Suppress,
}

/// Local producer registered on a prefix.
pub trait InterestHandler {
    fn on_interest(&mut self, forwarder: &mut Forwarder, interest: &Interest) -> Strategy;
}

impl<F> InterestHandler for F
where
    F: FnMut(&mut Forwarder, &Interest) -> Strategy,
{
    fn on_interest(&mut self, forwarder: &mut Forwarder, interest: &Interest) -> Strategy {
        self(forwarder, interest)
    }
}

/// Callbacks of one expressed Interest.
pub struct PendingCallbacks {
    interest: Interest,
    on_data: OnData,
    on_timeout: OnTimeout,
}

impl std::fmt::Debug for PendingCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCallbacks").field("interest", &self.interest.name).finish_non_exhaustive()
    }
}

pub struct Forwarder {
    config: ForwarderConfig,
    faces: BTreeMap<FaceId, Box<dyn Face>>,
    next_face: u16,
    fib: Fib,
    pit: Pit<PendingCallbacks>,
    handlers: HashMap<HandlerId, Option<Box<dyn InterestHandler>>>,
    next_handler: u32,
    next_pending: u64,
    scheduler: Scheduler<Task>,
    keys: KeyStorage,
    metrics: ForwarderMetrics,
    clock: Box<dyn Clock>,
    last_now: Instant,
}

impl Forwarder {
    /// Create a forwarder driven by the system clock.
    pub fn new(config: ForwarderConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }

    /// Create a forwarder driven by `clock`.
    pub fn with_clock(config: ForwarderConfig, clock: impl Clock + 'static) -> Self {
        let last_now = clock.now();
        Self {
            fib: Fib::new(config.fib_capacity),
            pit: Pit::new(config.pit_capacity, config.nonce_history),
            config,
            faces: BTreeMap::new(),
            next_face: 0,
            handlers: HashMap::new(),
            next_handler: 0,
            next_pending: 0,
            scheduler: Scheduler::new(),
            keys: KeyStorage::new(),
            metrics: ForwarderMetrics::new(),
            clock: Box::new(clock),
            last_now,
        }
    }

    /// Current time; never moves backwards.
    pub fn now(&mut self) -> Instant {
        let now = self.clock.now();
        if now > self.last_now {
            self.last_now = now;
        }
        self.last_now
    }

    /* ---------------------------------------------------------------- *
     * Faces and routes
     * ---------------------------------------------------------------- */

    pub fn add_face(&mut self, face: impl Face + 'static) -> Result<FaceId, Error> {
        if self.faces.len() >= self.config.face_capacity {
            return Err(Error::Capacity(format!("face table is full ({} faces)", self.config.face_capacity)));
        }
        let mut id = FaceId(self.next_face);
        while self.faces.contains_key(&id) {
            id = FaceId(id.0.wrapping_add(1));
        }
        self.next_face = id.0.wrapping_add(1);

        info!("[Face {}] Added ({})", id.0, face.kind());
        self.faces.insert(id, Box::new(face));
        self.update_gauges();
        Ok(id)
    }

    /// Close and forget a face together with its routes and pending
    /// downstream records.
    pub fn remove_face(&mut self, id: FaceId) -> bool {
        let Some(mut face) = self.faces.remove(&id) else {
            return false;
        };
        face.close();
        self.fib.remove_target(NextHopTarget::Face(id));
        self.pit.remove_face(id);
        info!("[Face {}] Removed", id.0);
        self.update_gauges();
        true
    }

    pub fn face_ids(&self) -> Vec<FaceId> {
        self.faces.keys().copied().collect()
    }

    pub fn add_route(&mut self, prefix: &Name, face: FaceId) -> Result<(), Error> {
        self.add_route_with_strategy(prefix, face, ForwardingStrategy::BestRoute)
    }

    pub fn add_route_with_strategy(
        &mut self,
        prefix: &Name,
        face: FaceId,
        strategy: ForwardingStrategy,
    ) -> Result<(), Error> {
        if !self.faces.contains_key(&face) {
            return Err(Error::Transport(format!("unknown face {}", face)));
        }
        self.fib.add_next_hop(prefix, NextHopTarget::Face(face), strategy)?;
        self.update_gauges();
        Ok(())
    }

    pub fn remove_route(&mut self, prefix: &Name, face: FaceId) {
        self.fib.remove_next_hop(prefix, NextHopTarget::Face(face));
        self.update_gauges();
    }

    /// Register a local producer for `prefix`. The handler sees every
    /// Interest whose longest handler match is this prefix.
    pub fn register_prefix(
        &mut self,
        prefix: &Name,
        handler: impl InterestHandler + 'static,
    ) -> Result<HandlerId, Error> {
        let id = HandlerId(self.next_handler);
        self.fib
            .add_next_hop(prefix, NextHopTarget::Handler(id), ForwardingStrategy::BestRoute)?;
        self.next_handler += 1;
        self.handlers.insert(id, Some(Box::new(handler)));
        debug!("Registered {} on {}", id, prefix);
        self.update_gauges();
        Ok(id)
    }

    pub fn unregister_prefix(&mut self, id: HandlerId) -> bool {
        self.fib.remove_target(NextHopTarget::Handler(id));
        self.update_gauges();
        self.handlers.remove(&id).is_some()
    }

    /* ---------------------------------------------------------------- *
     * Application API
     * ---------------------------------------------------------------- */

    /// Send an Interest on behalf of the application. Exactly one of the
    /// callbacks runs later, unless the Interest cannot be recorded at all.
    pub fn express_interest(
        &mut self,
        interest: Interest,
        on_data: impl FnOnce(&mut Forwarder, &Data) + 'static,
        on_timeout: impl FnOnce(&mut Forwarder, &Interest) + 'static,
    ) -> Result<PendingId, Error> {
        let id = PendingId(self.next_pending);
        let now = self.now();
        let callbacks = PendingCallbacks {
            interest: interest.clone(),
            on_data: Box::new(on_data),
            on_timeout: Box::new(on_timeout),
        };
        let outcome = self
            .pit
            .insert(&interest, Downstream::App { id, callbacks }, now)
            .map_err(|e| {
                self.metrics.dropped_pit_full.increment();
                e
            })?;
        self.next_pending += 1;
        self.update_gauges();
        debug!("Express {} as {}", interest, id);

        if outcome == InsertOutcome::New {
            if let Err(e) = self.route_interest(&interest, None) {
                debug!("{}; waiting for timeout", e);
            }
        } else {
            self.metrics.interests_aggregated.increment();
        }
        Ok(id)
    }

    /// Withdraw an expressed Interest; its timeout callback runs now.
    pub fn cancel_interest(&mut self, id: PendingId) -> bool {
        match self.pit.cancel(id) {
            Some(PendingCallbacks { interest, on_timeout, .. }) => {
                self.update_gauges();
                on_timeout(self, &interest);
                true
            }
            None => false,
        }
    }

    /// Publish a Data packet from a local producer. Returns how many
    /// pending entries it satisfied.
    pub fn put_data(&mut self, data: &Data) -> usize {
        let wire = data.encode();
        self.satisfy(data, &wire, None)
    }

    /// Run `task` once after `delay`.
    pub fn schedule(&mut self, delay: Duration, task: impl FnOnce(&mut Forwarder) + 'static) -> TaskId {
        let mut task = Some(task);
        let due = self.now() + delay;
        self.scheduler.schedule(
            due,
            None,
            Box::new(move |fwd: &mut Forwarder| {
                if let Some(task) = task.take() {
                    task(fwd);
                }
            }),
        )
    }

    /// Run `task` every `interval`, first after one interval.
    pub fn schedule_periodic(
        &mut self,
        interval: Duration,
        task: impl FnMut(&mut Forwarder) + 'static,
    ) -> TaskId {
        let due = self.now() + interval;
        self.scheduler.schedule(due, Some(interval), Box::new(task))
    }

    pub fn cancel_task(&mut self, id: TaskId) -> bool {
        self.scheduler.cancel(id)
    }

    pub fn keys(&self) -> &KeyStorage {
        &self.keys
    }

    pub fn keys_mut(&mut self) -> &mut KeyStorage {
        &mut self.keys
    }

    pub fn metrics(&self) -> &ForwarderMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &ForwarderConfig {
        &self.config
    }

    pub fn fib(&self) -> &Fib {
        &self.fib
    }

    pub fn pending_count(&self) -> usize {
        self.pit.len()
    }

    /* ---------------------------------------------------------------- *
     * Processing
     * ---------------------------------------------------------------- */

    /// One bounded, non-blocking pass at the clock's current time.
    pub fn process(&mut self) {
        let now = self.clock.now();
        self.process_at(now);
    }

    /// One bounded, non-blocking pass at `now`.
    pub fn process_at(&mut self, now: Instant) {
        if now > self.last_now {
            self.last_now = now;
        }

        let max = self.config.max_packets_per_face;
        let mut inbound = Vec::new();
        let mut closed = Vec::new();
        for (id, face) in self.faces.iter_mut() {
            for _ in 0..max {
                match face.recv() {
                    Some(packet) => inbound.push((*id, packet)),
                    None => break,
                }
            }
            if face.is_closed() {
                closed.push(*id);
            }
        }

        for (face, packet) in inbound {
            self.receive(face, packet);
        }
        for id in closed {
            info!("[Face {}] Transport closed", id.0);
            self.remove_face(id);
        }

        let now = self.now();
        self.expire_pending(now);
        self.run_due_tasks(now);
    }

    fn receive(&mut self, face: FaceId, packet: Bytes) {
        if packet.len() > self.config.max_packet_size {
            warn!("[Face {}] Dropping oversized packet of {} bytes", face.0, packet.len());
            self.metrics.dropped_malformed.increment();
            return;
        }
        match packet_type(&packet) {
            Some(tlv::TLV_INTEREST) => self.on_incoming_interest(face, &packet),
            Some(tlv::TLV_DATA) => self.on_incoming_data(face, &packet),
            _ => {
                warn!("[Face {}] Dropping packet of unknown type", face.0);
                self.metrics.dropped_malformed.increment();
            }
        }
    }

    fn on_incoming_interest(&mut self, face: FaceId, wire: &Bytes) {
        let interest = match Interest::decode(wire) {
            Ok(interest) => interest,
            Err(e) => {
                warn!("[Face {}] Dropping Interest: {}", face.0, e);
                self.metrics.dropped_malformed.increment();
                return;
            }
        };
        self.metrics.interests_received.increment();
        trace!("[Face {}] Received {}", face.0, interest);

        let now = self.now();
        match self.pit.insert(&interest, Downstream::Face(face), now) {
            Ok(InsertOutcome::New) => {}
            Ok(InsertOutcome::Aggregated) => {
                debug!("[Face {}] Aggregated {}", face.0, interest.name);
                self.metrics.interests_aggregated.increment();
                return;
            }
            Ok(InsertOutcome::Duplicate) => {
                debug!("[Face {}] {} for {}", face.0, Error::DuplicateNonce(interest.nonce), interest.name);
                self.metrics.dropped_duplicate.increment();
                return;
            }
            Err(e) => {
                warn!("[Face {}] Dropping {}: {}", face.0, interest.name, e);
                self.metrics.dropped_pit_full.increment();
                return;
            }
        }
        self.update_gauges();

        if let Err(e) = self.route_interest(&interest, Some(face)) {
            debug!("[Face {}] {}", face.0, e);
        }
    }

    /// Local handler first, then FIB faces.
    fn route_interest(&mut self, interest: &Interest, incoming: Option<FaceId>) -> Result<(), Error> {
        let key = PitKey::of(interest);
        let handler = self.fib.lookup_handler(&interest.name);
        if let Some(id) = handler {
            if self.invoke_handler(id, interest) == Strategy::Suppress {
                return Ok(());
            }
            if self.pit.get(&key).is_none() {
                // Answered by the handler.
                return Ok(());
            }
        }

        let exhausted = incoming.is_some() && interest.hop_limit == Some(0);
        let outgoing = if exhausted {
            debug!("Hop limit exhausted for {}", interest.name);
            Vec::new()
        } else {
            self.fib.select_faces(&interest.name, incoming)
        };

        if outgoing.is_empty() {
            if handler.is_some() {
                return Ok(());
            }
            if self.pit.get(&key).map_or(false, |e| !e.has_app()) {
                self.pit.remove(&key);
                self.update_gauges();
            }
            self.metrics.dropped_no_route.increment();
            return Err(Error::RouteNotFound(interest.name.to_string()));
        }

        let wire = match (incoming, interest.hop_limit) {
            (Some(_), Some(hops)) => interest.clone().with_hop_limit(Some(hops.saturating_sub(1))).encode(),
            _ => interest.encode(),
        };
        for face in outgoing {
            if self.send_to(face, &wire) {
                trace!("[Face {}] Forwarded {}", face.0, interest.name);
                self.metrics.interests_forwarded.increment();
            }
        }
        Ok(())
    }

    fn invoke_handler(&mut self, id: HandlerId, interest: &Interest) -> Strategy {
        let Some(mut handler) = self.handlers.get_mut(&id).and_then(Option::take) else {
            return Strategy::Forward;
        };
        let strategy = handler.on_interest(self, interest);
        if let Some(slot @ None) = self.handlers.get_mut(&id) {
            *slot = Some(handler);
        }
        trace!("{} returned {:?} for {}", id, strategy, interest.name);
        strategy
    }

    fn on_incoming_data(&mut self, face: FaceId, wire: &Bytes) {
        let data = match Data::decode(wire) {
            Ok(data) => data,
            Err(e) => {
                warn!("[Face {}] Dropping Data: {}", face.0, e);
                self.metrics.dropped_malformed.increment();
                return;
            }
        };
        self.metrics.data_received.increment();
        trace!("[Face {}] Received {}", face.0, data);

        if let Err(e) = self.keys.verify_data(&data) {
            warn!("[Face {}] Dropping Data: {}", face.0, e);
            self.metrics.dropped_verification.increment();
            return;
        }
        self.satisfy(&data, wire, Some(face));
    }

    fn satisfy(&mut self, data: &Data, wire: &Bytes, incoming: Option<FaceId>) -> usize {
        let now = self.now();
        let entries = self.pit.satisfy(&data.name, now);
        if entries.is_empty() {
            debug!("Unsolicited {}", data.name);
            self.metrics.dropped_unsolicited.increment();
            return 0;
        }
        let satisfied = entries.len();
        self.update_gauges();

        let mut sent = BTreeSet::new();
        let mut apps = Vec::new();
        for entry in entries {
            self.metrics.interests_satisfied.increment();
            for downstream in entry.downstreams {
                match downstream {
                    Downstream::Face(face) => {
                        if Some(face) != incoming && sent.insert(face) && self.send_to(face, wire) {
                            self.metrics.data_sent.increment();
                        }
                    }
                    Downstream::App { callbacks, .. } => apps.push(callbacks),
                }
            }
        }
        for callbacks in apps {
            (callbacks.on_data)(self, data);
        }
        satisfied
    }

    fn expire_pending(&mut self, now: Instant) {
        let expired = self.pit.expire(now);
        if expired.is_empty() {
            return;
        }
        self.update_gauges();
        for entry in expired {
            debug!("Timed out {}", entry.key.name);
            self.metrics.interests_timed_out.increment();
            for downstream in entry.downstreams {
                if let Downstream::App { callbacks, .. } = downstream {
                    let PendingCallbacks { interest, on_timeout, .. } = callbacks;
                    on_timeout(self, &interest);
                }
            }
        }
    }

    fn run_due_tasks(&mut self, now: Instant) {
        for id in self.scheduler.take_due(now) {
            if let Some(mut task) = self.scheduler.take(id) {
                task(self);
                self.scheduler.finish(id, task, now);
            }
        }
    }

    fn send_to(&mut self, id: FaceId, wire: &Bytes) -> bool {
        let Some(face) = self.faces.get_mut(&id) else {
            return false;
        };
        match face.send(wire) {
            Ok(()) => true,
            Err(e) => {
                warn!("[Face {}] Send failed: {}", id.0, e);
                self.metrics.send_failures.increment();
                false
            }
        }
    }

    fn update_gauges(&self) {
        self.metrics.pit_size.set(self.pit.len() as u64);
        self.metrics.fib_size.set(self.fib.len() as u64);
        self.metrics.face_count.set(self.faces.len() as u64);
    }
}

impl Default for Forwarder {
    fn default() -> Self {
        Self::new(ForwarderConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::ManualClock, face::ChannelFace};
    use std::{cell::RefCell, rc::Rc};

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    fn setup() -> (Forwarder, ManualClock) {
        let _ = env_logger::builder().is_test(true).try_init();
        let clock = ManualClock::new();
        (Forwarder::with_clock(ForwarderConfig::default(), clock.clone()), clock)
    }

    /// Attach a face and return the remote end for the test to drive.
    fn attach(fwd: &mut Forwarder) -> (FaceId, ChannelFace) {
        let (local, remote) = ChannelFace::pair();
        (fwd.add_face(local).unwrap(), remote)
    }

    fn drain(face: &mut ChannelFace) -> Vec<Bytes> {
        std::iter::from_fn(|| face.recv()).collect()
    }

    fn signed(n: &str, content: &'static [u8]) -> Data {
        let mut data = Data::new(name(n), content);
        data.encode_digest_sign();
        data
    }

    #[test]
    fn test_forward_and_return_data() {
        let (mut fwd, _clock) = setup();
        let (down, mut downstream) = attach(&mut fwd);
        let (up, mut upstream) = attach(&mut fwd);
        fwd.add_route(&name("/room"), up).unwrap();

        let interest = Interest::new(name("/room/light")).with_hop_limit(Some(4));
        downstream.send(&interest.encode()).unwrap();
        fwd.process();

        let out = drain(&mut upstream);
        assert_eq!(out.len(), 1);
        let forwarded = Interest::decode(&out[0]).unwrap();
        assert_eq!(forwarded.hop_limit, Some(3));
        assert_eq!(forwarded.nonce, interest.nonce);

        upstream.send(&signed("/room/light", b"on").encode()).unwrap();
        fwd.process();
        let back = drain(&mut downstream);
        assert_eq!(back.len(), 1);
        assert_eq!(Data::decode(&back[0]).unwrap().content, Bytes::from_static(b"on"));
        assert_eq!(fwd.pending_count(), 0);
        assert_ne!(down, up);
    }

    #[test]
    fn test_aggregation_forwards_once() {
        let (mut fwd, _clock) = setup();
        let (up, mut upstream) = attach(&mut fwd);
        fwd.add_route(&name("/"), up).unwrap();

        let hits = Rc::new(RefCell::new(Vec::new()));
        for tag in ["first", "second"] {
            let hits = Rc::clone(&hits);
            fwd.express_interest(
                Interest::new(name("/a/b")),
                move |_, data| hits.borrow_mut().push((tag, data.name.clone())),
                |_, _| panic!("unexpected timeout"),
            )
            .unwrap();
        }
        assert_eq!(drain(&mut upstream).len(), 1);
        assert_eq!(fwd.pending_count(), 1);

        upstream.send(&signed("/a/b", b"x").encode()).unwrap();
        fwd.process();
        assert_eq!(*hits.borrow(), vec![("first", name("/a/b")), ("second", name("/a/b"))]);
        assert_eq!(fwd.metrics().snapshot().interests_aggregated, 1);
    }

    #[test]
    fn test_timeout_fires_exactly_once() {
        let (mut fwd, clock) = setup();
        let timeouts = Rc::new(RefCell::new(0));
        let t = Rc::clone(&timeouts);
        fwd.express_interest(
            Interest::new(name("/no/such/name")).with_lifetime(500),
            |_, _| panic!("unexpected data"),
            move |_, interest| {
                assert_eq!(interest.name, name("/no/such/name"));
                *t.borrow_mut() += 1;
            },
        )
        .unwrap();

        clock.advance(Duration::from_millis(499));
        fwd.process();
        assert_eq!(*timeouts.borrow(), 0);

        clock.advance(Duration::from_millis(1));
        fwd.process();
        clock.advance(Duration::from_secs(5));
        fwd.process();
        assert_eq!(*timeouts.borrow(), 1);
        assert_eq!(fwd.metrics().snapshot().dropped_no_route, 1);
    }

    #[test]
    fn test_suppress_producer_answers_once() {
        let (mut fwd, _clock) = setup();
        let (consumer, mut remote) = attach(&mut fwd);
        let (other_id, mut other) = attach(&mut fwd);
        fwd.add_route(&name("/"), consumer).unwrap();
        fwd.add_route_with_strategy(&name("/"), other_id, ForwardingStrategy::Multicast).unwrap();

        fwd.register_prefix(&name("/room/light"), |fwd: &mut Forwarder, interest: &Interest| {
            let mut data = Data::new(interest.name.clone(), &b"I'm a Data packet."[..]);
            data.encode_digest_sign();
            fwd.put_data(&data);
            Strategy::Suppress
        })
        .unwrap();

        remote.send(&Interest::new(name("/room/light")).encode()).unwrap();
        fwd.process();

        let answers = drain(&mut remote);
        assert_eq!(answers.len(), 1);
        assert_eq!(Data::decode(&answers[0]).unwrap().content, Bytes::from_static(b"I'm a Data packet."));
        assert!(drain(&mut other).is_empty());
        assert_eq!(fwd.metrics().snapshot().interests_forwarded, 0);
    }

    #[test]
    fn test_forward_strategy_continues_to_faces() {
        let (mut fwd, _clock) = setup();
        let (up, mut upstream) = attach(&mut fwd);
        fwd.add_route(&name("/"), up).unwrap();
        let seen = Rc::new(RefCell::new(0));
        let s = Rc::clone(&seen);
        fwd.register_prefix(&name("/x"), move |_: &mut Forwarder, _: &Interest| {
            *s.borrow_mut() += 1;
            Strategy::Forward
        })
        .unwrap();

        fwd.express_interest(Interest::new(name("/x/1")), |_, _| {}, |_, _| {}).unwrap();
        assert_eq!(*seen.borrow(), 1);
        assert_eq!(drain(&mut upstream).len(), 1);
    }

    #[test]
    fn test_duplicate_nonce_dropped() {
        let (mut fwd, _clock) = setup();
        let (_, mut a) = attach(&mut fwd);
        let (_, mut b) = attach(&mut fwd);
        let (up, mut upstream) = attach(&mut fwd);
        fwd.add_route(&name("/"), up).unwrap();

        let interest = Interest::new(name("/loop")).with_nonce(7);
        a.send(&interest.encode()).unwrap();
        b.send(&interest.encode()).unwrap();
        fwd.process();

        assert_eq!(drain(&mut upstream).len(), 1);
        assert_eq!(fwd.metrics().snapshot().dropped_duplicate, 1);
    }

    #[test]
    fn test_bad_and_unsolicited_data_dropped() {
        let (mut fwd, _clock) = setup();
        let (_, mut remote) = attach(&mut fwd);
        let got = Rc::new(RefCell::new(false));
        let g = Rc::clone(&got);
        fwd.express_interest(Interest::new(name("/d")), move |_, _| *g.borrow_mut() = true, |_, _| {})
            .unwrap();

        let mut tampered = signed("/d", b"good");
        tampered.content = Bytes::from_static(b"evil");
        remote.send(&tampered.encode()).unwrap();
        remote.send(&signed("/other", b"x").encode()).unwrap();
        remote.send(&Bytes::from_static(&[0x06, 0x05, 0x07])).unwrap();
        fwd.process();

        assert!(!*got.borrow());
        let snap = fwd.metrics().snapshot();
        assert_eq!(snap.dropped_verification, 1);
        assert_eq!(snap.dropped_unsolicited, 1);
        assert_eq!(snap.dropped_malformed, 1);
    }

    #[test]
    fn test_cancel_interest() {
        let (mut fwd, clock) = setup();
        let timeouts = Rc::new(RefCell::new(0));
        let t = Rc::clone(&timeouts);
        let id = fwd
            .express_interest(Interest::new(name("/c")), |_, _| {}, move |_, _| *t.borrow_mut() += 1)
            .unwrap();
        assert!(fwd.cancel_interest(id));
        assert!(!fwd.cancel_interest(id));
        clock.advance(Duration::from_secs(10));
        fwd.process();
        assert_eq!(*timeouts.borrow(), 1);
    }

    #[test]
    fn test_tasks_posted_during_pass_wait() {
        let (mut fwd, clock) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        fwd.schedule(Duration::ZERO, move |fwd| {
            l.borrow_mut().push("outer");
            let l = Rc::clone(&l);
            fwd.schedule(Duration::ZERO, move |_| l.borrow_mut().push("inner"));
        });

        fwd.process();
        assert_eq!(*log.borrow(), vec!["outer"]);
        fwd.process();
        assert_eq!(*log.borrow(), vec!["outer", "inner"]);

        let ticks = Rc::new(RefCell::new(0));
        let t = Rc::clone(&ticks);
        let id = fwd.schedule_periodic(Duration::from_millis(100), move |_| *t.borrow_mut() += 1);
        for _ in 0..3 {
            clock.advance(Duration::from_millis(100));
            fwd.process();
        }
        assert_eq!(*ticks.borrow(), 3);
        assert!(fwd.cancel_task(id));
        clock.advance(Duration::from_millis(100));
        fwd.process();
        assert_eq!(*ticks.borrow(), 3);
    }

    #[test]
    fn test_closed_face_removed() {
        let (mut fwd, _clock) = setup();
        let (id, remote) = attach(&mut fwd);
        fwd.add_route(&name("/"), id).unwrap();
        drop(remote);
        fwd.process();
        assert!(fwd.face_ids().is_empty());
        assert!(fwd.fib().is_empty());
        assert!(fwd.add_route(&name("/"), id).is_err());
    }

    #[test]
    fn test_face_capacity() {
        let config = ForwarderConfig {
            face_capacity: 1,
            ..ForwarderConfig::default()
        };
        let mut fwd = Forwarder::new(config);
        attach(&mut fwd);
        let (extra, _) = ChannelFace::pair();
        assert!(matches!(fwd.add_face(extra), Err(Error::Capacity(_))));
    }
}
