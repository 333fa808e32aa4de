//! # Event Journal
//!
//! Append-only, hash-chained log of ledger events.
//!
//! ```text
//! digest[n] = SHA-256(JCS({ "prev": digest[n-1] | null, "sequence": n, "event": event[n] }))
//! ```
//!
//! `recorded_at` is informational and excluded from the digest, so two
//! ledgers driven by the same calls produce the same chain regardless of
//! wall-clock time.
//!
//! ## Security Invariant
//!
//! Entries are sealed (digested and linked) before the operation that
//! emits them moves any assets, and committed only after. A failed
//! operation therefore never leaves a partial entry behind.

use escrow_core::{sha256_digest, CanonicalBytes, ContentDigest, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::JournalError;

/// One sealed journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry<E> {
    pub sequence: u64,
    pub event: E,
    pub recorded_at: Timestamp,
    pub prev: Option<ContentDigest>,
    pub digest: ContentDigest,
}

#[derive(Serialize)]
struct ChainLink<'a, E> {
    prev: Option<&'a ContentDigest>,
    sequence: u64,
    event: &'a E,
}

fn link_digest<E: Serialize>(
    prev: Option<&ContentDigest>,
    sequence: u64,
    event: &E,
) -> Result<ContentDigest, JournalError> {
    let canonical = CanonicalBytes::new(&ChainLink { prev, sequence, event })?;
    Ok(sha256_digest(&canonical))
}

/// Hash-chained event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "E: Deserialize<'de>"))]
pub struct EventJournal<E> {
    entries: Vec<JournalEntry<E>>,
}

impl<E> Default for EventJournal<E> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<E: Serialize + Clone> EventJournal<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a journal from previously exported entries, checking the chain.
    pub fn from_entries(entries: Vec<JournalEntry<E>>) -> Result<Self, JournalError> {
        let journal = Self { entries };
        journal.verify_chain()?;
        Ok(journal)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Digest of the latest entry.
    pub fn head(&self) -> Option<&ContentDigest> {
        self.entries.last().map(|e| &e.digest)
    }

    pub fn entries(&self) -> &[JournalEntry<E>] {
        &self.entries
    }

    pub fn events(&self) -> impl Iterator<Item = &E> {
        self.entries.iter().map(|e| &e.event)
    }

    /// Link `events` onto the current head without appending them.
    pub(crate) fn seal(&self, events: Vec<E>) -> Result<Vec<JournalEntry<E>>, JournalError> {
        let recorded_at = Timestamp::now();
        let mut prev = self.head().copied();
        let mut sequence = self.entries.len() as u64;
        let mut sealed = Vec::with_capacity(events.len());
        for event in events {
            let digest = link_digest(prev.as_ref(), sequence, &event)?;
            sealed.push(JournalEntry {
                sequence,
                event,
                recorded_at,
                prev,
                digest,
            });
            prev = Some(digest);
            sequence += 1;
        }
        Ok(sealed)
    }

    /// Append entries produced by [`seal`](Self::seal) with nothing
    /// appended in between.
    pub(crate) fn commit(&mut self, sealed: Vec<JournalEntry<E>>) {
        self.entries.extend(sealed);
    }

    /// Recompute every digest and back-link.
    pub fn verify_chain(&self) -> Result<(), JournalError> {
        let mut prev: Option<ContentDigest> = None;
        for (index, entry) in self.entries.iter().enumerate() {
            let expected = index as u64;
            if entry.sequence != expected {
                return Err(JournalError::SequenceGap {
                    expected,
                    found: entry.sequence,
                });
            }
            if entry.prev != prev {
                return Err(JournalError::ChainBroken { sequence: expected });
            }
            let digest = link_digest(entry.prev.as_ref(), entry.sequence, &entry.event)?;
            if digest != entry.digest {
                return Err(JournalError::ChainBroken { sequence: expected });
            }
            prev = Some(entry.digest);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn journal_of(n: u64) -> EventJournal<Value> {
        let mut journal = EventJournal::new();
        for i in 0..n {
            let sealed = journal.seal(vec![json!({"step": i})]).unwrap();
            journal.commit(sealed);
        }
        journal
    }

    #[test]
    fn entries_link_to_predecessor() {
        let journal = journal_of(3);
        let entries = journal.entries();
        assert_eq!(entries[0].prev, None);
        assert_eq!(entries[1].prev, Some(entries[0].digest));
        assert_eq!(entries[2].prev, Some(entries[1].digest));
        assert_eq!(journal.head(), Some(&entries[2].digest));
        journal.verify_chain().unwrap();
    }

    #[test]
    fn chain_is_independent_of_wall_clock() {
        let a = journal_of(4);
        let mut b = journal_of(4);
        b.entries[2].recorded_at = Timestamp::parse("2000-01-01T00:00:00Z").unwrap();
        assert_eq!(a.head(), b.head());
        b.verify_chain().unwrap();
    }

    #[test]
    fn tampered_event_is_detected() {
        let mut journal = journal_of(3);
        journal.entries[1].event = json!({"step": 99});
        assert_eq!(journal.verify_chain(), Err(JournalError::ChainBroken { sequence: 1 }));
    }

    #[test]
    fn dropped_entry_is_detected() {
        let mut journal = journal_of(3);
        journal.entries.remove(1);
        assert_eq!(
            journal.verify_chain(),
            Err(JournalError::SequenceGap { expected: 1, found: 2 })
        );
    }

    #[test]
    fn seal_does_not_append() {
        let journal = journal_of(2);
        let sealed = journal.seal(vec![json!("a"), json!("b")]).unwrap();
        assert_eq!(journal.len(), 2);
        assert_eq!(sealed[0].sequence, 2);
        assert_eq!(sealed[0].prev, journal.head().copied());
        assert_eq!(sealed[1].prev, Some(sealed[0].digest));
    }

    #[test]
    fn float_events_are_rejected() {
        let journal: EventJournal<Value> = EventJournal::new();
        assert!(matches!(
            journal.seal(vec![json!({"fee": 0.5})]),
            Err(JournalError::Canonicalization(_))
        ));
        assert!(journal.is_empty());
    }

    #[test]
    fn from_entries_checks_chain() {
        let journal = journal_of(3);
        let mut entries = journal.entries().to_vec();
        assert!(EventJournal::from_entries(entries.clone()).is_ok());
        entries[0].sequence = 7;
        assert!(EventJournal::from_entries(entries).is_err());
    }
}
