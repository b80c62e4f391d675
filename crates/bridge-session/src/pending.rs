//! In-flight subscribe/unsubscribe bookkeeping.
//!
//! Every submitted batch is recorded under the correlation id the transport
//! returned for it, and removed exactly once when the matching ack arrives.
//!
//! # Ack before record
//!
//! The id is only known once the transport call returns, but the delivery
//! thread may already hold the ack by then. The table is not locked across the
//! transport call. Instead a submitter opens an [`InFlight`] guard first, and
//! every guard carries a sequence number.
//!
//! An ack for an unrecorded id that arrives while guards are open is parked
//! along with a horizon: the sequence number the next guard will get. Only a
//! guard older than the horizon can own the ack, because only such a guard
//! had issued its transport call when the ack arrived. Once every guard older
//! than the horizon has closed, the parked ack is handed back as an orphan.
//!
//! An id whose entry was resolved is retired until it is recorded again, so a
//! duplicate ack for it is never parked and never claimed by a later request
//! that happens to receive the same id.
//!
//! Entries whose ack never arrives stay in the table; disconnect does not
//! clear them.

use std::collections::{BTreeSet, VecDeque};

use ahash::AHashMap;
use bridge_core::AckKind;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::transport::CorrelationId;

/// Upper bound on acks parked at once. Further unmatched acks are unknown.
pub const MAX_PARKED: usize = 1024;

/// How many resolved ids are remembered for duplicate detection.
const RETIRED_CAPACITY: usize = 4096;

/// A recorded request waiting for its ack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub kind: AckKind,
    /// Full wire topics, in submission order.
    pub topics: Vec<String>,
}

/// An ack that arrived before (or without) its request being recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParkedAck {
    pub id: CorrelationId,
    pub kind: AckKind,
    pub reason_codes: Vec<u8>,
}

/// Result of matching an incoming ack against the table.
#[derive(Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Entry removed; the caller owns it now.
    Resolved(PendingEntry),
    /// Held until an in-flight submission records the id.
    Parked,
    /// An entry exists but waits for the other ack kind. It stays in place.
    KindMismatch { recorded: AckKind },
    /// No entry, and the ack cannot belong to any open submission.
    Unknown,
}

/// What [`InFlight::record`] did with the new entry.
#[derive(Debug, PartialEq, Eq)]
pub enum Recorded {
    /// Stored; the ack has not arrived yet.
    Pending,
    /// The ack was already parked. The entry was never stored.
    ResolvedEarly { entry: PendingEntry, reason_codes: Vec<u8> },
}

#[derive(Debug)]
struct Parked {
    ack: ParkedAck,
    horizon: u64,
}

#[derive(Debug, Default)]
struct State {
    entries: AHashMap<CorrelationId, PendingEntry>,
    parked: AHashMap<CorrelationId, Parked>,
    /// Sequence numbers of open guards.
    open: BTreeSet<u64>,
    next_seq: u64,
    /// Resolved id → retirement stamp.
    retired: AHashMap<CorrelationId, u64>,
    retired_order: VecDeque<(CorrelationId, u64)>,
    next_stamp: u64,
}

impl State {
    fn retire(&mut self, id: CorrelationId) {
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        self.retired.insert(id, stamp);
        self.retired_order.push_back((id, stamp));
        if self.retired_order.len() > RETIRED_CAPACITY {
            if let Some((old, old_stamp)) = self.retired_order.pop_front() {
                if self.retired.get(&old) == Some(&old_stamp) {
                    self.retired.remove(&old);
                }
            }
        }
    }

    /// Close guard `seq`; returns parked acks no open guard can claim.
    fn leave(&mut self, seq: u64) -> Vec<ParkedAck> {
        self.open.remove(&seq);
        if self.parked.is_empty() {
            return Vec::new();
        }
        let oldest_open = self.open.first().copied();
        let mut orphans = Vec::new();
        self.parked.retain(|_, parked| {
            let claimable = oldest_open.is_some_and(|oldest| oldest < parked.horizon);
            if !claimable {
                orphans.push(parked.ack.clone());
            }
            claimable
        });
        orphans
    }
}

/// Correlation id → pending request table.
#[derive(Debug, Default)]
pub struct PendingRequests {
    state: Mutex<State>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a submission. Hold the guard across the transport call.
    pub fn begin(&self) -> InFlight<'_> {
        let mut state = self.state.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.open.insert(seq);
        InFlight { table: self, seq, closed: false }
    }

    /// Match an ack against the table, removing the entry on success.
    pub fn resolve(&self, id: CorrelationId, kind: AckKind, reason_codes: &[u8]) -> Resolution {
        let mut state = self.state.lock();
        match state.entries.remove(&id) {
            Some(entry) if entry.kind == kind => {
                state.retire(id);
                Resolution::Resolved(entry)
            }
            Some(entry) => {
                let recorded = entry.kind;
                state.entries.insert(id, entry);
                Resolution::KindMismatch { recorded }
            }
            None if state.retired.contains_key(&id) => Resolution::Unknown,
            None if state.open.is_empty() || state.parked.contains_key(&id) => Resolution::Unknown,
            None if state.parked.len() >= MAX_PARKED => {
                warn!("park limit reached, treating ack {id} as unknown");
                Resolution::Unknown
            }
            None => {
                let horizon = state.next_seq;
                let ack = ParkedAck { id, kind, reason_codes: reason_codes.to_vec() };
                state.parked.insert(id, Parked { ack, horizon });
                Resolution::Parked
            }
        }
    }

    /// Number of requests still waiting for an ack.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: CorrelationId) -> bool {
        self.state.lock().entries.contains_key(&id)
    }
}

/// An open submission. See the module docs.
#[must_use = "close the submission with record() or abandon()"]
pub struct InFlight<'a> {
    table: &'a PendingRequests,
    seq: u64,
    closed: bool,
}

impl InFlight<'_> {
    /// Record the transport's id for this submission and close it.
    ///
    /// Returns what happened to the entry plus any orphaned acks.
    pub fn record(mut self, id: CorrelationId, kind: AckKind, topics: Vec<String>) -> (Recorded, Vec<ParkedAck>) {
        self.closed = true;
        let mut state = self.table.state.lock();
        state.retired.remove(&id);
        let entry = PendingEntry { kind, topics };

        let owns_parked = state.parked.get(&id).is_some_and(|p| p.horizon > self.seq && p.ack.kind == kind);
        let claimed = if owns_parked { state.parked.remove(&id) } else { None };
        let recorded = match claimed {
            Some(parked) => {
                debug!("{kind} ack {id} arrived before record");
                Recorded::ResolvedEarly { entry, reason_codes: parked.ack.reason_codes }
            }
            None => {
                if state.entries.insert(id, entry).is_some() {
                    warn!("correlation id {id} reused while still pending");
                }
                Recorded::Pending
            }
        };

        let orphans = state.leave(self.seq);
        (recorded, orphans)
    }

    /// Close a submission that produced no id (transport raised or refused).
    pub fn abandon(mut self) -> Vec<ParkedAck> {
        self.closed = true;
        self.table.state.lock().leave(self.seq)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.closed {
            let orphans = self.table.state.lock().leave(self.seq);
            if !orphans.is_empty() {
                warn!("{} parked ack(s) dropped with an unclosed submission", orphans.len());
            }
        }
    }
}
