//! Capability model: codec and header-extension descriptors plus the RTP
//! parameter types produced by negotiation.
//!
//! These are pure data types. The intersection logic that pairs local and
//! remote capabilities lives in [`crate::negotiation`].

pub mod codec;
pub mod header_extension;
pub mod parameters;

pub use codec::{MediaKind, RtcpFeedback, RtpCodecCapability};
pub use header_extension::RtpHeaderExtensionCapability;
pub use parameters::{
    RtcpParameters, RtpCodecParameters, RtpEncodingParameters, RtpHeaderExtensionParameters,
    RtpParameters,
};

use serde::{Deserialize, Serialize};

/// SSRC represents a synchronization source, a randomly chosen value meant to
/// be globally unique within a particular RTP session. Used to identify a
/// single stream of media.
/// <https://tools.ietf.org/html/rfc3550#section-3>
#[allow(clippy::upper_case_acronyms)]
pub type SSRC = u32;

/// PayloadType identifies the format of the RTP payload and determines its
/// interpretation by the application.
/// <https://tools.ietf.org/html/rfc3550#section-3>
pub type PayloadType = u8;

/// Opus audio codec MIME type.
pub const MIME_TYPE_OPUS: &str = "audio/opus";
/// PCMU (G.711 mu-law) audio codec MIME type.
pub const MIME_TYPE_PCMU: &str = "audio/PCMU";
/// PCMA (G.711 A-law) audio codec MIME type.
pub const MIME_TYPE_PCMA: &str = "audio/PCMA";
/// Comfort noise MIME type.
pub const MIME_TYPE_CN: &str = "audio/CN";
/// VP8 video codec MIME type.
pub const MIME_TYPE_VP8: &str = "video/VP8";
/// VP9 video codec MIME type.
pub const MIME_TYPE_VP9: &str = "video/VP9";
/// H.264 video codec MIME type.
pub const MIME_TYPE_H264: &str = "video/H264";
/// RTX (retransmission) codec name; the full MIME type is kind dependent.
pub const RTX_CODEC_NAME: &str = "rtx";

/// Declared collection of codecs, header extensions and FEC mechanisms one
/// party can use. Represents either what the router offers or what the local
/// media engine can do.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtpCapabilitySet {
    pub codecs: Vec<RtpCodecCapability>,
    pub header_extensions: Vec<RtpHeaderExtensionCapability>,
    #[serde(default)]
    pub fec_mechanisms: Vec<String>,
}

impl RtpCapabilitySet {
    /// A realistic local engine capability table: Opus plus VP8/VP9 with rtx
    /// and the common feedback mechanisms. Used by demos and tests.
    pub fn default_local() -> Self {
        let video_feedback = vec![
            RtcpFeedback::new("goog-remb", ""),
            RtcpFeedback::new("ccm", "fir"),
            RtcpFeedback::new("nack", ""),
            RtcpFeedback::new("nack", "pli"),
            RtcpFeedback::new("transport-cc", ""),
        ];

        let mut vp8_rtx = RtpCodecCapability::video("video/rtx", 90000, 97);
        vp8_rtx
            .parameters
            .insert("apt".to_owned(), serde_json::json!(96));
        let mut vp9_rtx = RtpCodecCapability::video("video/rtx", 90000, 99);
        vp9_rtx
            .parameters
            .insert("apt".to_owned(), serde_json::json!(98));

        let mut vp8 = RtpCodecCapability::video(MIME_TYPE_VP8, 90000, 96);
        vp8.rtcp_feedback = video_feedback.clone();
        let mut vp9 = RtpCodecCapability::video(MIME_TYPE_VP9, 90000, 98);
        vp9.rtcp_feedback = video_feedback;

        RtpCapabilitySet {
            codecs: vec![
                RtpCodecCapability::audio(MIME_TYPE_OPUS, 48000, 2, 100),
                RtpCodecCapability::audio(MIME_TYPE_PCMU, 8000, 1, 0),
                vp8,
                vp8_rtx,
                vp9,
                vp9_rtx,
            ],
            header_extensions: vec![
                RtpHeaderExtensionCapability::new(
                    MediaKind::Audio,
                    "urn:ietf:params:rtp-hdrext:ssrc-audio-level",
                    1,
                ),
                RtpHeaderExtensionCapability::new(
                    MediaKind::Audio,
                    "http://www.ietf.org/id/draft-holmer-rmcat-transport-wide-cc-extensions-01",
                    5,
                ),
                RtpHeaderExtensionCapability::new(
                    MediaKind::Video,
                    "urn:ietf:params:rtp-hdrext:toffset",
                    2,
                ),
                RtpHeaderExtensionCapability::new(
                    MediaKind::Video,
                    "http://www.ietf.org/id/draft-holmer-rmcat-transport-wide-cc-extensions-01",
                    5,
                ),
                RtpHeaderExtensionCapability::new(MediaKind::Video, "urn:3gpp:video-orientation", 4),
            ],
            fec_mechanisms: vec![],
        }
    }
}
