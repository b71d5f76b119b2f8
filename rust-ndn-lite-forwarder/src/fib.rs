//! Forwarding Information Base.
//!
//! Maps name prefixes to next hops. A next hop is either a face or a local
//! prefix handler, and carries the forwarding strategy for its prefix.
//! Lookups probe the prefixes of a name from longest to shortest.

use log::debug;
use rust_ndn_lite_common::{
    types::{FaceId, HandlerId},
    Error, Name,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How Interests matching an entry are sent out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForwardingStrategy {
    /// The most recently added face.
    BestRoute,
    /// Every face of the entry.
    Multicast,
    /// No face at all; local handlers still run.
    Suppress,
}

impl Default for ForwardingStrategy {
    fn default() -> Self {
        ForwardingStrategy::BestRoute
    }
}

/// Where a next hop leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NextHopTarget {
    Face(FaceId),
    Handler(HandlerId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextHop {
    pub target: NextHopTarget,
    pub strategy: ForwardingStrategy,
    /// Insertion order; higher is more recent.
    seq: u64,
}

/// All next hops registered for one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FibEntry {
    pub prefix: Name,
    pub next_hops: Vec<NextHop>,
}

impl FibEntry {
    fn has_faces(&self) -> bool {
        self.next_hops.iter().any(|h| matches!(h.target, NextHopTarget::Face(_)))
    }

    /// Most recently registered handler of this entry.
    pub fn handler(&self) -> Option<HandlerId> {
        self.next_hops
            .iter()
            .filter_map(|h| match h.target {
                NextHopTarget::Handler(id) => Some((h.seq, id)),
                NextHopTarget::Face(_) => None,
            })
            .max()
            .map(|(_, id)| id)
    }

    /// Faces an Interest should go out on, never including `incoming`.
    pub fn select_faces(&self, incoming: Option<FaceId>) -> Vec<FaceId> {
        if self.next_hops.iter().any(|h| h.strategy == ForwardingStrategy::Suppress) {
            return Vec::new();
        }

        let mut faces: Vec<(u64, FaceId)> = self
            .next_hops
            .iter()
            .filter_map(|h| match h.target {
                NextHopTarget::Face(id) if Some(id) != incoming => Some((h.seq, id)),
                _ => None,
            })
            .collect();
        faces.sort_by(|a, b| b.0.cmp(&a.0));

        if self.next_hops.iter().any(|h| h.strategy == ForwardingStrategy::Multicast) {
            faces.into_iter().map(|(_, id)| id).collect()
        } else {
            faces.into_iter().take(1).map(|(_, id)| id).collect()
        }
    }
}

/// The FIB table.
#[derive(Debug)]
pub struct Fib {
    entries: HashMap<Name, FibEntry>,
    capacity: usize,
    next_seq: u64,
}

impl Fib {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
            next_seq: 0,
        }
    }

    /// Insert or refresh a next hop. Re-adding an existing target replaces
    /// its strategy and makes it the most recent hop of the entry.
    pub fn add_next_hop(
        &mut self,
        prefix: &Name,
        target: NextHopTarget,
        strategy: ForwardingStrategy,
    ) -> Result<(), Error> {
        if !self.entries.contains_key(prefix) && self.entries.len() >= self.capacity {
            return Err(Error::Capacity(format!("FIB is full ({} prefixes)", self.capacity)));
        }
        let seq = self.next_seq;
        self.next_seq += 1;

        let entry = self.entries.entry(prefix.clone()).or_insert_with(|| FibEntry {
            prefix: prefix.clone(),
            next_hops: Vec::new(),
        });
        entry.next_hops.retain(|h| h.target != target);
        entry.next_hops.push(NextHop { target, strategy, seq });
        debug!("FIB: {} -> {:?} ({:?})", prefix, target, strategy);
        Ok(())
    }

    /// Remove one next hop. Missing hops are ignored; emptied entries are
    /// dropped.
    pub fn remove_next_hop(&mut self, prefix: &Name, target: NextHopTarget) {
        if let Some(entry) = self.entries.get_mut(prefix) {
            entry.next_hops.retain(|h| h.target != target);
            if entry.next_hops.is_empty() {
                self.entries.remove(prefix);
            }
        }
    }

    /// Remove `target` from every entry.
    pub fn remove_target(&mut self, target: NextHopTarget) {
        for entry in self.entries.values_mut() {
            entry.next_hops.retain(|h| h.target != target);
        }
        self.entries.retain(|_, e| !e.next_hops.is_empty());
    }

    /// Entry with the longest prefix of `name`.
    pub fn lookup(&self, name: &Name) -> Option<&FibEntry> {
        self.longest_matching(name, |_| true)
    }

    /// Handler of the longest entry that has one.
    pub fn lookup_handler(&self, name: &Name) -> Option<HandlerId> {
        self.longest_matching(name, |e| e.handler().is_some())
            .and_then(FibEntry::handler)
    }

    /// Outgoing faces for `name`, taken from the longest entry that has any
    /// face.
    pub fn select_faces(&self, name: &Name, incoming: Option<FaceId>) -> Vec<FaceId> {
        self.longest_matching(name, FibEntry::has_faces)
            .map(|e| e.select_faces(incoming))
            .unwrap_or_default()
    }

    fn longest_matching(&self, name: &Name, accept: impl Fn(&FibEntry) -> bool) -> Option<&FibEntry> {
        (0..=name.len())
            .rev()
            .filter_map(|len| self.entries.get(&name.prefix(len)))
            .find(|e| accept(e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &FibEntry> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    fn face(id: u16) -> NextHopTarget {
        NextHopTarget::Face(FaceId(id))
    }

    #[test]
    fn test_longest_prefix_match() {
        let mut fib = Fib::new(8);
        fib.add_next_hop(&name("/a"), face(1), ForwardingStrategy::BestRoute).unwrap();
        fib.add_next_hop(&name("/a/b"), face(2), ForwardingStrategy::BestRoute).unwrap();

        assert_eq!(fib.lookup(&name("/a/b/c")).unwrap().prefix, name("/a/b"));
        assert_eq!(fib.lookup(&name("/a/x")).unwrap().prefix, name("/a"));
        assert!(fib.lookup(&name("/z")).is_none());
        assert_eq!(fib.select_faces(&name("/a/b/c"), None), vec![FaceId(2)]);
    }

    #[test]
    fn test_best_route_prefers_most_recent() {
        let mut fib = Fib::new(8);
        let p = name("/p");
        fib.add_next_hop(&p, face(1), ForwardingStrategy::BestRoute).unwrap();
        fib.add_next_hop(&p, face(2), ForwardingStrategy::BestRoute).unwrap();
        assert_eq!(fib.select_faces(&p, None), vec![FaceId(2)]);

        // Re-adding refreshes recency.
        fib.add_next_hop(&p, face(1), ForwardingStrategy::BestRoute).unwrap();
        assert_eq!(fib.select_faces(&p, None), vec![FaceId(1)]);
        assert_eq!(fib.lookup(&p).unwrap().next_hops.len(), 2);

        // Never back out of the incoming face.
        assert_eq!(fib.select_faces(&p, Some(FaceId(1))), vec![FaceId(2)]);
    }

    #[test]
    fn test_multicast_and_suppress() {
        let mut fib = Fib::new(8);
        let p = name("/m");
        fib.add_next_hop(&p, face(1), ForwardingStrategy::Multicast).unwrap();
        fib.add_next_hop(&p, face(2), ForwardingStrategy::BestRoute).unwrap();
        fib.add_next_hop(&p, face(3), ForwardingStrategy::BestRoute).unwrap();
        let mut faces = fib.select_faces(&p, Some(FaceId(3)));
        faces.sort();
        assert_eq!(faces, vec![FaceId(1), FaceId(2)]);

        fib.add_next_hop(&p, NextHopTarget::Handler(HandlerId(9)), ForwardingStrategy::Suppress)
            .unwrap();
        assert!(fib.select_faces(&p, None).is_empty());
        assert_eq!(fib.lookup_handler(&name("/m/x")), Some(HandlerId(9)));
    }

    #[test]
    fn test_handler_and_faces_from_different_entries() {
        let mut fib = Fib::new(8);
        fib.add_next_hop(&name("/"), face(1), ForwardingStrategy::BestRoute).unwrap();
        fib.add_next_hop(&name("/room/light"), NextHopTarget::Handler(HandlerId(1)), ForwardingStrategy::BestRoute)
            .unwrap();

        let n = name("/room/light/on");
        assert_eq!(fib.lookup_handler(&n), Some(HandlerId(1)));
        assert_eq!(fib.select_faces(&n, None), vec![FaceId(1)]);
    }

    #[test]
    fn test_remove_and_capacity() {
        let mut fib = Fib::new(1);
        fib.add_next_hop(&name("/a"), face(1), ForwardingStrategy::BestRoute).unwrap();
        assert!(matches!(
            fib.add_next_hop(&name("/b"), face(1), ForwardingStrategy::BestRoute),
            Err(Error::Capacity(_))
        ));

        fib.remove_next_hop(&name("/a"), face(7));
        assert_eq!(fib.len(), 1);
        fib.remove_next_hop(&name("/a"), face(1));
        assert!(fib.is_empty());

        fib.add_next_hop(&name("/b"), face(1), ForwardingStrategy::BestRoute).unwrap();
        fib.remove_target(face(1));
        assert!(fib.is_empty());
    }
}
