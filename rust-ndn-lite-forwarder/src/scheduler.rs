//! Deferred and periodic tasks.
//!
//! Tasks are ordered by due time, then by scheduling order. A processing
//! pass first collects everything due and only then runs it, so a task
//! scheduled while the pass is running waits for the next pass.

use rust_ndn_lite_common::types::TaskId;
use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
    time::{Duration, Instant},
};

#[derive(Debug)]
struct Slot<T> {
    due: Instant,
    period: Option<Duration>,
    /// Empty while the task is running.
    task: Option<T>,
}

/// Timer queue holding tasks of type `T`.
#[derive(Debug)]
pub struct Scheduler<T> {
    queue: BinaryHeap<Reverse<(Instant, u64, TaskId)>>,
    slots: HashMap<TaskId, Slot<T>>,
    next_id: u64,
    next_seq: u64,
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            slots: HashMap::new(),
            next_id: 0,
            next_seq: 0,
        }
    }

    /// Queue `task` for `due`; with a `period` it re-arms after each run.
    pub fn schedule(&mut self, due: Instant, period: Option<Duration>, task: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.slots.insert(
            id,
            Slot {
                due,
                period,
                task: Some(task),
            },
        );
        self.push(due, id);
        id
    }

    /// Drop a task. Returns false if it was unknown or already finished.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        self.slots.remove(&id).is_some()
    }

    /// Ids of the tasks due at `now`, in run order.
    pub fn take_due(&mut self, now: Instant) -> Vec<TaskId> {
        let mut due = Vec::new();
        while let Some(Reverse((at, _, id))) = self.queue.peek().copied() {
            if at > now {
                break;
            }
            self.queue.pop();
            if self.slots.contains_key(&id) {
                due.push(id);
            }
        }
        due
    }

    /// Take a task out of its slot to run it.
    pub fn take(&mut self, id: TaskId) -> Option<T> {
        self.slots.get_mut(&id)?.task.take()
    }

    /// Hand a task back after it ran: periodic tasks are re-armed, one-shot
    /// tasks and tasks cancelled during their run are dropped.
    pub fn finish(&mut self, id: TaskId, task: T, now: Instant) {
        let next = match self.slots.get_mut(&id) {
            Some(slot) => match slot.period {
                Some(period) => {
                    let mut next = slot.due + period;
                    if next <= now {
                        next = now + period;
                    }
                    slot.due = next;
                    slot.task = Some(task);
                    Some(next)
                }
                None => None,
            },
            None => return,
        };
        match next {
            Some(at) => self.push(at, id),
            None => {
                self.slots.remove(&id);
            }
        }
    }

    /// Earliest pending due time.
    pub fn next_due(&self) -> Option<Instant> {
        self.queue
            .iter()
            .filter(|Reverse((_, _, id))| self.slots.contains_key(id))
            .map(|Reverse((at, _, _))| *at)
            .min()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn push(&mut self, at: Instant, id: TaskId) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse((at, seq, id)));
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}
