//! Per-handler bookkeeping of active send tracks and receive sources.
//!
//! The registry is the single owner of per-session negotiated state; the
//! handler never holds a second copy. Mutations are transactional: the
//! handler reserves or marks entries, runs one offer/answer round, and then
//! either commits or releases to restore the pre-call state.

use log::debug;

use crate::capability::{MediaKind, RtpEncodingParameters, RtpParameters, SSRC};
use crate::error::{Error, Result};

/// Lifecycle of a session entry.
///
/// `Closing` entries are kept until the offer/answer round that removes them
/// completes, so a failed round can revert them to `Active`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Closing,
    Closed,
}

/// One active send track or receive source.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEntry {
    pub id: String,
    pub kind: MediaKind,
    /// Negotiated media-description identifier.
    pub mid: String,
    pub state: SessionState,
    /// Primary synchronization source (assigned for send, observed for recv).
    pub ssrc: Option<SSRC>,
    /// Retransmission ssrc paired with the primary one (send only).
    pub rtx_ssrc: Option<SSRC>,
    pub cname: Option<String>,
    /// Per-layer encodings for send entries; one element unless simulcast.
    pub encodings: Vec<RtpEncodingParameters>,
    /// RTP parameters reported by the remote peer, verbatim (recv only).
    pub remote_rtp_parameters: Option<RtpParameters>,
}

/// In-memory, insertion-ordered mapping from session identifier to entry.
#[derive(Default, Debug)]
pub struct SessionRegistry {
    entries: Vec<SessionEntry>,
    next_mid: u32,
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry::default()
    }

    /// Creates a new `Active` entry with a freshly allocated mid.
    ///
    /// Fails with `ErrDuplicateSession` if a non-closed entry with the same
    /// id exists. A leftover `Closed` entry does not block reuse of its id.
    pub fn reserve(&mut self, id: &str, kind: MediaKind) -> Result<&mut SessionEntry> {
        if self
            .entries
            .iter()
            .any(|e| e.id == id && e.state != SessionState::Closed)
        {
            return Err(Error::ErrDuplicateSession { id: id.to_owned() });
        }
        self.entries.retain(|e| e.id != id);

        let mid = self.next_mid.to_string();
        self.next_mid += 1;
        debug!("reserve session id={id} kind={kind} mid={mid}");

        self.entries.push(SessionEntry {
            id: id.to_owned(),
            kind,
            mid,
            state: SessionState::Active,
            ssrc: None,
            rtx_ssrc: None,
            cname: None,
            encodings: vec![],
            remote_rtp_parameters: None,
        });
        // entry was just pushed
        let last = self.entries.len() - 1;
        Ok(&mut self.entries[last])
    }

    /// Finalizes a successful round for `id`: a `Closing` entry is removed,
    /// an `Active` one is kept.
    pub fn commit(&mut self, id: &str) -> Result<()> {
        let entry = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| Error::ErrSessionNotFound { id: id.to_owned() })?;
        if self.entries[entry].state == SessionState::Closing {
            self.entries.remove(entry);
        }
        Ok(())
    }

    /// Removes the entry unconditionally; used to roll a failed `reserve`
    /// back to the pre-call state.
    pub fn release(&mut self, id: &str) {
        self.entries.retain(|e| e.id != id);
    }

    /// Marks an entry as going away; it stays visible for rollback until the
    /// round completes.
    pub fn mark_closing(&mut self, id: &str) -> Result<()> {
        let entry = self.live_entry_mut(id)?;
        entry.state = SessionState::Closing;
        Ok(())
    }

    /// Reverts a `Closing` entry back to `Active` after a failed round.
    pub fn revert_closing(&mut self, id: &str) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.id == id && e.state == SessionState::Closing)
        {
            entry.state = SessionState::Active;
        }
    }

    pub fn get(&self, id: &str) -> Option<&SessionEntry> {
        self.entries
            .iter()
            .find(|e| e.id == id && e.state != SessionState::Closed)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut SessionEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.id == id && e.state != SessionState::Closed)
    }

    fn live_entry_mut(&mut self, id: &str) -> Result<&mut SessionEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.id == id && e.state == SessionState::Active)
            .ok_or_else(|| Error::ErrSessionNotFound { id: id.to_owned() })
    }

    /// Snapshot of the `Active` entries in insertion order, used to rebuild
    /// SDP state. The snapshot does not reflect later mutations.
    pub fn active_entries(&self, kind: Option<MediaKind>) -> Vec<SessionEntry> {
        self.entries
            .iter()
            .filter(|e| e.state == SessionState::Active)
            .filter(|e| kind.is_none_or(|k| e.kind == k))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_reserve_rejects_live_duplicate() {
        let mut registry = SessionRegistry::new();
        registry.reserve("t1", MediaKind::Audio).unwrap();
        assert_eq!(
            registry.reserve("t1", MediaKind::Audio),
            Err(Error::ErrDuplicateSession {
                id: "t1".to_owned()
            })
        );
    }

    #[test]
    fn test_closing_then_release_allows_id_reuse() {
        let mut registry = SessionRegistry::new();
        registry.reserve("r1", MediaKind::Video).unwrap();
        registry.mark_closing("r1").unwrap();
        registry.commit("r1").unwrap();

        registry.reserve("r1", MediaKind::Video).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("r1").unwrap().state, SessionState::Active);
    }

    #[test]
    fn test_failed_round_revert_restores_active() {
        let mut registry = SessionRegistry::new();
        registry.reserve("r1", MediaKind::Audio).unwrap();
        registry.mark_closing("r1").unwrap();
        registry.revert_closing("r1");
        assert_eq!(registry.get("r1").unwrap().state, SessionState::Active);
        assert_eq!(registry.active_entries(None).len(), 1);
    }

    #[test]
    fn test_mids_are_monotonic() {
        let mut registry = SessionRegistry::new();
        let a = registry.reserve("a", MediaKind::Audio).unwrap().mid.clone();
        let b = registry.reserve("b", MediaKind::Video).unwrap().mid.clone();
        registry.release("b");
        let c = registry.reserve("c", MediaKind::Video).unwrap().mid.clone();
        assert_eq!((a.as_str(), b.as_str(), c.as_str()), ("0", "1", "2"));
    }

    #[test]
    fn test_active_entries_is_a_snapshot_filtered_by_kind() {
        let mut registry = SessionRegistry::new();
        registry.reserve("a", MediaKind::Audio).unwrap();
        registry.reserve("v", MediaKind::Video).unwrap();
        registry.mark_closing("v").unwrap();

        let snapshot = registry.active_entries(Some(MediaKind::Audio));
        registry.release("a");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, "a");
    }

    #[test]
    fn test_stop_and_query_on_unknown_id_fails() {
        let mut registry = SessionRegistry::new();
        assert_eq!(
            registry.mark_closing("nope"),
            Err(Error::ErrSessionNotFound {
                id: "nope".to_owned()
            })
        );
    }
}
