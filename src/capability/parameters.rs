use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::capability::{PayloadType, RtcpFeedback, SSRC};

/// Fully resolved, per-track set of codecs, encodings and header extensions
/// used to actually send or receive media.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtpParameters {
    /// Media-description identifier this track is bound to, assigned during
    /// negotiation.
    pub mid: Option<String>,
    /// Negotiated codecs in preference order.
    pub codecs: Vec<RtpCodecParameters>,
    pub header_extensions: Vec<RtpHeaderExtensionParameters>,
    #[serde(default)]
    pub encodings: Vec<RtpEncodingParameters>,
    #[serde(default)]
    pub rtcp: RtcpParameters,
}

/// One codec entry of [`RtpParameters`], carrying the payload type resolved
/// by negotiation.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtpCodecParameters {
    pub mime_type: String,
    pub payload_type: PayloadType,
    pub clock_rate: u32,
    #[serde(default)]
    pub channels: u16,
    #[serde(default)]
    pub rtcp_feedback: Vec<RtcpFeedback>,
    /// Free-form codec parameters. An empty map serializes as `{}`.
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
}

/// Negotiated RTP header extension with its resolved identifier.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtpHeaderExtensionParameters {
    pub uri: String,
    pub id: u16,
    #[serde(default)]
    pub encrypt: bool,
}

/// One encoding of a track: a single stream, or one simulcast layer.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtpEncodingParameters {
    /// RTP stream identifier for simulcast layers.
    #[serde(default)]
    pub rid: Option<String>,
    pub ssrc: Option<SSRC>,
    /// SSRC of the paired retransmission stream, if rtx was negotiated.
    pub rtx_ssrc: Option<SSRC>,
    /// Whether this encoding is actively transmitted.
    pub active: bool,
    pub max_bitrate: Option<u32>,
    pub scale_resolution_down_by: Option<f64>,
}

/// RTCP parameters for the stream.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtcpParameters {
    /// The canonical name carried in RTCP SDES messages.
    pub cname: Option<String>,
    /// Whether reduced-size RTCP is in use.
    #[serde(default)]
    pub reduced_size: bool,
}
