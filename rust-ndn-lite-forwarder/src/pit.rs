//! Pending Interest Table.
//!
//! One entry per (name, can-be-prefix, must-be-fresh). An entry remembers
//! the nonces it has seen, who is waiting for the Data and when it expires.
//! Application records carry caller-defined callbacks of type `C`; the
//! table never invokes them, it only hands them back when an entry is
//! satisfied, expired or cancelled.

use log::trace;
use rust_ndn_lite_common::{
    types::{FaceId, PendingId},
    Error, Interest, Name,
};
use std::{
    collections::{HashMap, VecDeque},
    time::{Duration, Instant},
};

/// Selectors are part of the key: Interests that differ in them never
/// aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PitKey {
    pub name: Name,
    pub can_be_prefix: bool,
    pub must_be_fresh: bool,
}

impl PitKey {
    pub fn of(interest: &Interest) -> Self {
        Self {
            name: interest.name.clone(),
            can_be_prefix: interest.can_be_prefix,
            must_be_fresh: interest.must_be_fresh,
        }
    }
}

/// Who is waiting on an entry.
#[derive(Debug)]
pub enum Downstream<C> {
    Face(FaceId),
    App { id: PendingId, callbacks: C },
}

#[derive(Debug)]
pub struct PitEntry<C> {
    pub key: PitKey,
    nonces: VecDeque<u32>,
    pub downstreams: Vec<Downstream<C>>,
    pub expiry: Instant,
}

impl<C> PitEntry<C> {
    pub fn has_nonce(&self, nonce: u32) -> bool {
        self.nonces.contains(&nonce)
    }

    pub fn has_app(&self) -> bool {
        self.downstreams.iter().any(|d| matches!(d, Downstream::App { .. }))
    }

    fn remember(&mut self, nonce: u32, history: usize) {
        if self.nonces.contains(&nonce) {
            return;
        }
        if self.nonces.len() >= history.max(1) {
            self.nonces.pop_front();
        }
        self.nonces.push_back(nonce);
    }
}

/// Result of [`Pit::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// First Interest for this key; it should be forwarded.
    New,
    /// Joined an existing entry; nothing more to forward.
    Aggregated,
    /// The nonce was already seen on this entry from the network.
    Duplicate,
}

/// The PIT table.
#[derive(Debug)]
pub struct Pit<C> {
    entries: HashMap<PitKey, PitEntry<C>>,
    apps: HashMap<PendingId, PitKey>,
    capacity: usize,
    nonce_history: usize,
}

impl<C> Pit<C> {
    pub fn new(capacity: usize, nonce_history: usize) -> Self {
        Self {
            entries: HashMap::new(),
            apps: HashMap::new(),
            capacity,
            nonce_history,
        }
    }

    /// Record `interest` for `downstream`.
    ///
    /// A repeated nonce from a face is a loop and is reported as
    /// `Duplicate` without touching the entry. Applications always join.
    pub fn insert(
        &mut self,
        interest: &Interest,
        downstream: Downstream<C>,
        now: Instant,
    ) -> Result<InsertOutcome, Error> {
        let key = PitKey::of(interest);
        let expiry = now + Duration::from_millis(interest.lifetime_ms);

        if let Some(entry) = self.entries.get_mut(&key) {
            if let Downstream::Face(face) = downstream {
                if entry.has_nonce(interest.nonce) {
                    trace!("PIT: duplicate nonce {:08x} for {}", interest.nonce, key.name);
                    return Ok(InsertOutcome::Duplicate);
                }
                if !entry.downstreams.iter().any(|d| matches!(d, Downstream::Face(f) if *f == face)) {
                    entry.downstreams.push(Downstream::Face(face));
                }
            } else {
                if let Downstream::App { id, .. } = &downstream {
                    self.apps.insert(*id, key.clone());
                }
                entry.downstreams.push(downstream);
            }
            entry.remember(interest.nonce, self.nonce_history);
            entry.expiry = entry.expiry.max(expiry);
            return Ok(InsertOutcome::Aggregated);
        }

        if self.entries.len() >= self.capacity {
            return Err(Error::PitFull);
        }
        if let Downstream::App { id, .. } = &downstream {
            self.apps.insert(*id, key.clone());
        }
        let mut entry = PitEntry {
            key: key.clone(),
            nonces: VecDeque::new(),
            downstreams: vec![downstream],
            expiry,
        };
        entry.remember(interest.nonce, self.nonce_history);
        self.entries.insert(key, entry);
        Ok(InsertOutcome::New)
    }

    /// Remove and return every unexpired entry that Data named `name`
    /// satisfies.
    pub fn satisfy(&mut self, name: &Name, now: Instant) -> Vec<PitEntry<C>> {
        let mut keys = Vec::new();
        for len in 0..=name.len() {
            let prefix = name.prefix(len);
            for must_be_fresh in [false, true] {
                let key = PitKey {
                    name: prefix.clone(),
                    can_be_prefix: true,
                    must_be_fresh,
                };
                if self.entries.contains_key(&key) {
                    keys.push(key);
                }
            }
        }
        for must_be_fresh in [false, true] {
            let key = PitKey {
                name: name.clone(),
                can_be_prefix: false,
                must_be_fresh,
            };
            if self.entries.contains_key(&key) {
                keys.push(key);
            }
        }

        keys.into_iter()
            .filter_map(|key| {
                if self.entries.get(&key)?.expiry <= now {
                    return None;
                }
                self.remove(&key)
            })
            .collect()
    }

    /// Remove and return every entry whose expiry is at or before `now`.
    pub fn expire(&mut self, now: Instant) -> Vec<PitEntry<C>> {
        let expired: Vec<PitKey> = self
            .entries
            .iter()
            .filter(|(_, e)| e.expiry <= now)
            .map(|(k, _)| k.clone())
            .collect();
        expired.iter().filter_map(|k| self.remove(k)).collect()
    }

    /// Detach one application record and return its callbacks. The entry
    /// goes away once nobody waits on it.
    pub fn cancel(&mut self, id: PendingId) -> Option<C> {
        let key = self.apps.remove(&id)?;
        let entry = self.entries.get_mut(&key)?;
        let index = entry
            .downstreams
            .iter()
            .position(|d| matches!(d, Downstream::App { id: app, .. } if *app == id))?;
        let removed = entry.downstreams.remove(index);
        if entry.downstreams.is_empty() {
            self.entries.remove(&key);
        }
        match removed {
            Downstream::App { callbacks, .. } => Some(callbacks),
            Downstream::Face(_) => None,
        }
    }

    /// Forget `face` as a downstream everywhere.
    pub fn remove_face(&mut self, face: FaceId) {
        for entry in self.entries.values_mut() {
            entry.downstreams.retain(|d| !matches!(d, Downstream::Face(f) if *f == face));
        }
        self.entries.retain(|_, e| !e.downstreams.is_empty());
    }

    /// Remove one entry.
    pub fn remove(&mut self, key: &PitKey) -> Option<PitEntry<C>> {
        let entry = self.entries.remove(key)?;
        for d in &entry.downstreams {
            if let Downstream::App { id, .. } = d {
                self.apps.remove(id);
            }
        }
        Some(entry)
    }

    pub fn get(&self, key: &PitKey) -> Option<&PitEntry<C>> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interest(name: &str, nonce: u32) -> Interest {
        Interest::new(name.parse().unwrap()).with_nonce(nonce).with_lifetime(1000)
    }

    fn app(id: u64) -> Downstream<&'static str> {
        Downstream::App {
            id: PendingId(id),
            callbacks: "cb",
        }
    }

    #[test]
    fn test_insert_aggregate_duplicate() {
        let mut pit: Pit<&str> = Pit::new(8, 4);
        let now = Instant::now();

        let first = interest("/a", 1);
        assert_eq!(pit.insert(&first, Downstream::Face(FaceId(1)), now).unwrap(), InsertOutcome::New);
        assert_eq!(
            pit.insert(&interest("/a", 2), Downstream::Face(FaceId(2)), now).unwrap(),
            InsertOutcome::Aggregated
        );
        assert_eq!(
            pit.insert(&first, Downstream::Face(FaceId(3)), now).unwrap(),
            InsertOutcome::Duplicate
        );
        assert_eq!(pit.len(), 1);
        assert_eq!(pit.get(&PitKey::of(&first)).unwrap().downstreams.len(), 2);
    }

    #[test]
    fn test_selectors_are_part_of_key() {
        let mut pit: Pit<&str> = Pit::new(8, 4);
        let now = Instant::now();
        pit.insert(&interest("/a", 1), Downstream::Face(FaceId(1)), now).unwrap();
        let outcome = pit
            .insert(&interest("/a", 2).with_must_be_fresh(true), Downstream::Face(FaceId(1)), now)
            .unwrap();
        assert_eq!(outcome, InsertOutcome::New);
        assert_eq!(pit.len(), 2);
    }

    #[test]
    fn test_aggregation_extends_expiry() {
        let mut pit: Pit<&str> = Pit::new(8, 4);
        let now = Instant::now();
        let short = interest("/a", 1).with_lifetime(100);
        pit.insert(&short, app(1), now).unwrap();
        pit.insert(&interest("/a", 2).with_lifetime(500), app(2), now).unwrap();

        assert!(pit.expire(now + Duration::from_millis(200)).is_empty());
        let expired = pit.expire(now + Duration::from_millis(500));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].downstreams.len(), 2);
        assert!(pit.is_empty());
    }

    #[test]
    fn test_satisfy_exact_and_prefix() {
        let mut pit: Pit<&str> = Pit::new(8, 4);
        let now = Instant::now();
        pit.insert(&interest("/a/b", 1), Downstream::Face(FaceId(1)), now).unwrap();
        pit.insert(&interest("/a", 2).with_can_be_prefix(true), Downstream::Face(FaceId(2)), now)
            .unwrap();
        pit.insert(&interest("/a", 3), Downstream::Face(FaceId(3)), now).unwrap();

        let satisfied = pit.satisfy(&"/a/b".parse().unwrap(), now);
        assert_eq!(satisfied.len(), 2);
        // Exact-match "/a" without can_be_prefix stays.
        assert_eq!(pit.len(), 1);
    }

    #[test]
    fn test_expired_entries_are_not_satisfied() {
        let mut pit: Pit<&str> = Pit::new(8, 4);
        let now = Instant::now();
        pit.insert(&interest("/a", 1), Downstream::Face(FaceId(1)), now).unwrap();
        assert!(pit.satisfy(&"/a".parse().unwrap(), now + Duration::from_secs(1)).is_empty());
        assert_eq!(pit.expire(now + Duration::from_secs(1)).len(), 1);
    }

    #[test]
    fn test_cancel_and_capacity() {
        let mut pit: Pit<&str> = Pit::new(1, 4);
        let now = Instant::now();
        pit.insert(&interest("/a", 1), app(7), now).unwrap();
        assert!(matches!(
            pit.insert(&interest("/b", 1), app(8), now),
            Err(Error::PitFull)
        ));

        assert_eq!(pit.cancel(PendingId(7)), Some("cb"));
        assert_eq!(pit.cancel(PendingId(7)), None);
        assert!(pit.is_empty());
    }

    #[test]
    fn test_remove_face() {
        let mut pit: Pit<&str> = Pit::new(8, 4);
        let now = Instant::now();
        pit.insert(&interest("/a", 1), Downstream::Face(FaceId(1)), now).unwrap();
        pit.insert(&interest("/b", 1), Downstream::Face(FaceId(1)), now).unwrap();
        pit.insert(&interest("/b", 2), app(1), now).unwrap();
        pit.remove_face(FaceId(1));
        assert_eq!(pit.len(), 1);
    }
}
