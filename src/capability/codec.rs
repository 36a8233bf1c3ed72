use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use unicase::UniCase;

use crate::capability::{PayloadType, RTX_CODEC_NAME};

/// Media kind identifying the direction family a codec or extension belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl From<&str> for MediaKind {
    fn from(raw: &str) -> Self {
        match raw {
            "video" => MediaKind::Video,
            _ => MediaKind::Audio,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        };
        write!(f, "{s}")
    }
}

/// RTCP feedback mechanism supported by a codec, e.g. `nack pli` or
/// `transport-cc`.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtcpFeedback {
    /// Feedback type, e.g. `ack`, `ccm`, `nack`, `goog-remb`, `transport-cc`.
    #[serde(rename = "type")]
    pub typ: String,
    /// Additional parameter specific to the feedback type, e.g. `pli`.
    #[serde(default)]
    pub parameter: String,
}

impl RtcpFeedback {
    pub fn new(typ: &str, parameter: &str) -> Self {
        RtcpFeedback {
            typ: typ.to_owned(),
            parameter: parameter.to_owned(),
        }
    }
}

/// A codec one party declares it can use, before negotiation.
///
/// `preferred_payload_type` is the payload type the declaring side would like
/// to use; it is negotiated, never matched.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtpCodecCapability {
    /// MIME type of the codec, `kind/name` (e.g. "video/VP8", "audio/opus").
    /// Name comparison is case-insensitive.
    pub mime_type: String,
    pub kind: Option<MediaKind>,
    /// Codec clock rate in Hz.
    pub clock_rate: u32,
    /// Number of audio channels (0 for video codecs).
    #[serde(default)]
    pub channels: u16,
    pub preferred_payload_type: Option<PayloadType>,
    #[serde(default)]
    pub rtcp_feedback: Vec<RtcpFeedback>,
    /// Free-form codec parameters. An empty map serializes as `{}`.
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
}

impl RtpCodecCapability {
    pub fn audio(mime_type: &str, clock_rate: u32, channels: u16, pt: PayloadType) -> Self {
        RtpCodecCapability {
            mime_type: mime_type.to_owned(),
            kind: Some(MediaKind::Audio),
            clock_rate,
            channels,
            preferred_payload_type: Some(pt),
            ..Default::default()
        }
    }

    pub fn video(mime_type: &str, clock_rate: u32, pt: PayloadType) -> Self {
        RtpCodecCapability {
            mime_type: mime_type.to_owned(),
            kind: Some(MediaKind::Video),
            clock_rate,
            channels: 0,
            preferred_payload_type: Some(pt),
            ..Default::default()
        }
    }

    /// Media kind of this codec, derived from the MIME type when not set
    /// explicitly.
    pub fn media_kind(&self) -> MediaKind {
        self.kind.unwrap_or_else(|| {
            MediaKind::from(self.mime_type.split('/').next().unwrap_or("audio"))
        })
    }

    /// Codec name, the subtype portion of the MIME type.
    pub fn name(&self) -> &str {
        self.mime_type
            .split('/')
            .nth(1)
            .unwrap_or(self.mime_type.as_str())
    }

    pub fn is_rtx(&self) -> bool {
        UniCase::new(self.name()) == UniCase::new(RTX_CODEC_NAME)
    }

    /// The `apt` parameter of an rtx codec, referencing the payload type of
    /// the media codec it retransmits.
    pub fn apt(&self) -> Option<PayloadType> {
        match self.parameters.get("apt")? {
            serde_json::Value::Number(n) => n.as_u64().and_then(|v| u8::try_from(v).ok()),
            serde_json::Value::String(s) => s.parse::<u8>().ok(),
            _ => None,
        }
    }

    /// Whether two codec capabilities describe the same codec: kind, name
    /// (case-insensitive), clock rate and (audio only) channel count equal.
    /// Payload type is negotiated, not matched.
    pub fn matches(&self, other: &RtpCodecCapability) -> bool {
        if self.media_kind() != other.media_kind() {
            return false;
        }
        if UniCase::new(self.name()) != UniCase::new(other.name()) {
            return false;
        }
        if self.clock_rate != other.clock_rate {
            return false;
        }
        if self.media_kind() == MediaKind::Audio && self.channels != other.channels {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_codec_match_is_case_insensitive() {
        let a = RtpCodecCapability::video("video/vp8", 90000, 96);
        let b = RtpCodecCapability::video("video/VP8", 90000, 101);
        assert!(a.matches(&b));
    }

    #[test]
    fn test_codec_match_requires_clock_rate_and_channels() {
        let cn8 = RtpCodecCapability::audio("audio/CN", 8000, 1, 13);
        let cn16 = RtpCodecCapability::audio("audio/CN", 16000, 1, 110);
        assert!(!cn8.matches(&cn16));

        let mono = RtpCodecCapability::audio("audio/opus", 48000, 1, 100);
        let stereo = RtpCodecCapability::audio("audio/opus", 48000, 2, 100);
        assert!(!mono.matches(&stereo));
    }

    #[test]
    fn test_rtx_detection_and_apt() {
        let mut rtx = RtpCodecCapability::video("video/rtx", 90000, 97);
        rtx.parameters
            .insert("apt".to_owned(), serde_json::json!(96));
        assert!(rtx.is_rtx());
        assert_eq!(rtx.apt(), Some(96));

        let mut rtx_str = RtpCodecCapability::video("video/RTX", 90000, 97);
        rtx_str
            .parameters
            .insert("apt".to_owned(), serde_json::json!("96"));
        assert!(rtx_str.is_rtx());
        assert_eq!(rtx_str.apt(), Some(96));
    }

    #[test]
    fn test_empty_parameters_serialize_as_empty_map() {
        let codec = RtpCodecCapability::audio("audio/opus", 48000, 2, 100);
        let json = serde_json::to_value(&codec).unwrap();
        assert_eq!(json["parameters"], serde_json::json!({}));
    }
}
