//! Interface to the native transport object that actually performs
//! ICE/DTLS/SRTP and encodes/decodes media.
//!
//! Everything behind [`TransportAdapter`] is out of scope for this crate;
//! the handler drives it through a small capability-probing plus
//! offer/answer surface and treats every failure as aborting the current
//! operation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::capability::{MediaKind, RtpEncodingParameters, SSRC};
use crate::error::Result;

/// Opaque stats report, passed through from the native transport verbatim.
pub type StatsReport = serde_json::Value;

/// Connection state of the underlying transport.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Failed,
    Disconnected,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Failed => "failed",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DescriptionKind {
    Offer,
    Answer,
}

/// Opaque structured SDP document produced and consumed by collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub kind: DescriptionKind,
    pub sdp: String,
}

/// Which peer initiates the secure-transport handshake. Fixed once
/// negotiated.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DtlsRole {
    Client,
    Server,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DtlsFingerprint {
    pub algorithm: String,
    pub value: String,
}

/// Locally decided secure-transport parameters, reported upward exactly once
/// per handler lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DtlsParameters {
    pub role: DtlsRole,
    pub fingerprints: Vec<DtlsFingerprint>,
}

/// Remote ICE credentials, updated on connectivity restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceParameters {
    pub username_fragment: String,
    pub password: String,
    #[serde(default)]
    pub ice_lite: bool,
}

/// Application-provided local media track handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTrack {
    pub id: String,
    pub kind: MediaKind,
}

/// Locally materialized handle for a remote media source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub id: String,
    pub kind: MediaKind,
    pub ssrc: Option<SSRC>,
}

/// The native transport object, consumed via offer/answer plus media track
/// management. All fallible methods may fail; each failure aborts the
/// handler operation in flight.
pub trait TransportAdapter {
    fn create_offer(&mut self) -> Result<SessionDescription>;
    fn create_answer(&mut self) -> Result<SessionDescription>;
    fn set_local_description(&mut self, desc: &SessionDescription) -> Result<()>;
    fn set_remote_description(&mut self, desc: &SessionDescription) -> Result<()>;

    fn add_track(&mut self, track: &MediaTrack, encodings: &[RtpEncodingParameters])
        -> Result<()>;
    fn remove_track(&mut self, track_id: &str) -> Result<()>;
    fn replace_track(&mut self, old_track_id: &str, new_track: &MediaTrack) -> Result<()>;
    /// Applies updated per-layer encoding parameters to a sender. Engines
    /// without per-layer control fail with `ErrUnsupportedOperation`.
    fn update_encodings(
        &mut self,
        track_id: &str,
        encodings: &[RtpEncodingParameters],
    ) -> Result<()>;

    fn senders(&self) -> Vec<String>;
    fn receivers(&self) -> Vec<RemoteTrack>;

    fn stats(&mut self, selector: Option<&str>) -> Result<StatsReport>;

    fn connection_state(&self) -> ConnectionState;
    /// Drains one pending connection-state change, if any. The handler polls
    /// this and forwards changes to its event sink.
    fn poll_connection_state_change(&mut self) -> Option<ConnectionState>;

    /// The locally decided DTLS role and certificate fingerprints. Only
    /// meaningful once the first offer/answer round has completed.
    fn local_dtls_parameters(&self) -> Result<DtlsParameters>;

    fn close(&mut self) -> Result<()>;
}
