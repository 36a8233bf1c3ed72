use serde::{Deserialize, Serialize};

use crate::capability::MediaKind;

/// An RFC 5285 RTP header extension one party declares it can use.
///
/// Matching against a remote set is by URI plus kind; an audio-only extension
/// is never offered for video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtpHeaderExtensionCapability {
    pub kind: MediaKind,
    /// URI identifying the header extension.
    pub uri: String,
    /// Identifier the declaring side would like to use (1-14 for one-byte
    /// form).
    pub preferred_id: u16,
    /// Whether the declaring side prefers this extension encrypted.
    #[serde(default)]
    pub preferred_encrypt: bool,
}

impl RtpHeaderExtensionCapability {
    pub fn new(kind: MediaKind, uri: &str, preferred_id: u16) -> Self {
        RtpHeaderExtensionCapability {
            kind,
            uri: uri.to_owned(),
            preferred_id,
            preferred_encrypt: false,
        }
    }

    pub fn matches(&self, other: &RtpHeaderExtensionCapability) -> bool {
        self.kind == other.kind && self.uri == other.uri
    }
}
