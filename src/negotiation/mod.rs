//! Capability negotiator: computes the intersection of local and remote
//! capability sets once per connection and projects it into direction
//! specific RTP parameters.
//!
//! All functions here are pure and deterministic; the output depends only on
//! the inputs, so extended capability sets may be computed concurrently
//! across handlers.

use std::collections::BTreeMap;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::capability::{
    MediaKind, PayloadType, RtcpFeedback, RtpCapabilitySet, RtpCodecCapability,
    RtpCodecParameters, RtpHeaderExtensionParameters, RtpParameters,
};

/// One local codec paired with the remote codec it matched, with resolved
/// send/receive payload types and the rtx codecs paired to it via `apt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedCodecCapability {
    pub mime_type: String,
    pub kind: MediaKind,
    pub clock_rate: u32,
    #[serde(default)]
    pub channels: u16,
    /// Payload type used when sending (the local engine's preferred id).
    pub local_payload_type: PayloadType,
    /// Payload type used when receiving (the router's id).
    pub remote_payload_type: PayloadType,
    pub local_rtx_payload_type: Option<PayloadType>,
    pub remote_rtx_payload_type: Option<PayloadType>,
    /// Feedback mechanisms from the local capability; they reflect what the
    /// local engine will actually emit.
    pub rtcp_feedback: Vec<RtcpFeedback>,
    pub local_parameters: BTreeMap<String, serde_json::Value>,
    pub remote_parameters: BTreeMap<String, serde_json::Value>,
}

/// A header extension present in both capability sets. Send and receive ids
/// may differ; the receive side always uses the router's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedHeaderExtension {
    pub kind: MediaKind,
    pub uri: String,
    pub send_id: u16,
    pub recv_id: u16,
    #[serde(default)]
    pub encrypt: bool,
}

/// Capability intersection between the local engine and the remote router.
///
/// Built once per connection per direction family and immutable thereafter;
/// the sole input to per-track RTP parameter construction.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedCapabilitySet {
    pub codecs: Vec<ExtendedCodecCapability>,
    pub header_extensions: Vec<ExtendedHeaderExtension>,
}

/// Computes the capability intersection.
///
/// Remote codecs are visited in router-declared order and paired with the
/// first matching local codec. Non-rtx codecs are resolved first; rtx codecs
/// are resolved in a second pass so their `apt` reference can be checked
/// against already matched media codecs. Unresolvable entries are silently
/// dropped, never errored: a remote set with zero usable codecs yields an
/// empty but valid result.
pub fn compute_extended_capabilities(
    local: &RtpCapabilitySet,
    remote: &RtpCapabilitySet,
) -> ExtendedCapabilitySet {
    let mut codecs: Vec<ExtendedCodecCapability> = vec![];

    // First pass: media codecs, in router order.
    for remote_codec in remote.codecs.iter().filter(|c| !c.is_rtx()) {
        let Some(local_codec) = local
            .codecs
            .iter()
            .find(|c| !c.is_rtx() && c.matches(remote_codec))
        else {
            trace!("no local match for remote codec {}", remote_codec.mime_type);
            continue;
        };

        // The router's id is authoritative when a side declares none.
        let remote_pt = remote_codec
            .preferred_payload_type
            .or(local_codec.preferred_payload_type);
        let local_pt = local_codec.preferred_payload_type.or(remote_pt);
        let (Some(local_pt), Some(remote_pt)) = (local_pt, remote_pt) else {
            continue;
        };
        // A router may declare the same codec more than once; only the first
        // match keeps the local payload type, so the projections stay
        // duplicate-free.
        if codecs
            .iter()
            .any(|e| e.kind == local_codec.media_kind() && e.local_payload_type == local_pt)
        {
            trace!(
                "skipping remote codec {}: local payload type {local_pt} already taken",
                remote_codec.mime_type
            );
            continue;
        }

        codecs.push(ExtendedCodecCapability {
            mime_type: local_codec.mime_type.clone(),
            kind: local_codec.media_kind(),
            clock_rate: local_codec.clock_rate,
            channels: local_codec.channels,
            local_payload_type: local_pt,
            remote_payload_type: remote_pt,
            local_rtx_payload_type: None,
            remote_rtx_payload_type: None,
            rtcp_feedback: local_codec.rtcp_feedback.clone(),
            local_parameters: local_codec.parameters.clone(),
            remote_parameters: remote_codec.parameters.clone(),
        });
    }

    // Second pass: rtx codecs, paired via apt against the matched set.
    for remote_rtx in remote.codecs.iter().filter(|c| c.is_rtx()) {
        let Some(apt) = remote_rtx.apt() else {
            continue;
        };
        let Some(entry) = codecs
            .iter_mut()
            .find(|e| e.remote_payload_type == apt && e.kind == remote_rtx.media_kind())
        else {
            trace!("dropping remote rtx codec with dangling apt={apt}");
            continue;
        };
        if entry.remote_rtx_payload_type.is_some() {
            continue;
        }

        let local_rtx = local.codecs.iter().find(|c| {
            c.is_rtx() && c.media_kind() == entry.kind && c.apt() == Some(entry.local_payload_type)
        });
        // rtx requires both sides; a one-sided rtx codec is useless.
        let Some(local_rtx) = local_rtx else {
            continue;
        };
        let (Some(local_rtx_pt), Some(remote_rtx_pt)) = (
            local_rtx.preferred_payload_type,
            remote_rtx.preferred_payload_type,
        ) else {
            continue;
        };

        entry.local_rtx_payload_type = Some(local_rtx_pt);
        entry.remote_rtx_payload_type = Some(remote_rtx_pt);
    }

    // Header extensions intersect by URI and kind, independent of order.
    let mut header_extensions = vec![];
    for remote_ext in &remote.header_extensions {
        let Some(local_ext) = local
            .header_extensions
            .iter()
            .find(|e| e.matches(remote_ext))
        else {
            continue;
        };
        header_extensions.push(ExtendedHeaderExtension {
            kind: remote_ext.kind,
            uri: remote_ext.uri.clone(),
            send_id: local_ext.preferred_id,
            recv_id: remote_ext.preferred_id,
            encrypt: local_ext.preferred_encrypt,
        });
    }

    ExtendedCapabilitySet {
        codecs,
        header_extensions,
    }
}

fn rtx_codec_parameters(
    apt: PayloadType,
    pt: PayloadType,
    kind: MediaKind,
    clock_rate: u32,
) -> RtpCodecParameters {
    let mut parameters = BTreeMap::new();
    parameters.insert("apt".to_owned(), serde_json::json!(apt));
    RtpCodecParameters {
        mime_type: format!("{kind}/rtx"),
        payload_type: pt,
        clock_rate,
        channels: 0,
        rtcp_feedback: vec![],
        parameters,
    }
}

/// Projects the extended set into parameters for sending media of `kind`.
///
/// Uses send-side payload types; feedback and parameters come from the local
/// capability since they describe what the local engine will actually emit.
/// Produces no encodings: ssrc assignment is per track and added later by
/// the handler.
pub fn sending_rtp_parameters(kind: MediaKind, extended: &ExtendedCapabilitySet) -> RtpParameters {
    let mut params = RtpParameters::default();

    for codec in extended.codecs.iter().filter(|c| c.kind == kind) {
        params.codecs.push(RtpCodecParameters {
            mime_type: codec.mime_type.clone(),
            payload_type: codec.local_payload_type,
            clock_rate: codec.clock_rate,
            channels: codec.channels,
            rtcp_feedback: codec.rtcp_feedback.clone(),
            parameters: codec.local_parameters.clone(),
        });
        if let Some(rtx_pt) = codec.local_rtx_payload_type {
            params.codecs.push(rtx_codec_parameters(
                codec.local_payload_type,
                rtx_pt,
                kind,
                codec.clock_rate,
            ));
        }
    }

    for ext in extended.header_extensions.iter().filter(|e| e.kind == kind) {
        params.header_extensions.push(RtpHeaderExtensionParameters {
            uri: ext.uri.clone(),
            id: ext.send_id,
            encrypt: ext.encrypt,
        });
    }

    params
}

/// Projects the extended set into the complete receivable surface for `kind`.
///
/// Uses receive-side payload types and includes every matched extension
/// whether or not the local engine intends to read it: the remote
/// description must declare everything up front when receive sessions are
/// created ahead of the actual offer.
pub fn receiving_full_rtp_parameters(
    kind: MediaKind,
    extended: &ExtendedCapabilitySet,
) -> RtpParameters {
    let mut params = RtpParameters::default();

    for codec in extended.codecs.iter().filter(|c| c.kind == kind) {
        params.codecs.push(RtpCodecParameters {
            mime_type: codec.mime_type.clone(),
            payload_type: codec.remote_payload_type,
            clock_rate: codec.clock_rate,
            channels: codec.channels,
            rtcp_feedback: codec.rtcp_feedback.clone(),
            parameters: codec.remote_parameters.clone(),
        });
        if let Some(rtx_pt) = codec.remote_rtx_payload_type {
            params.codecs.push(rtx_codec_parameters(
                codec.remote_payload_type,
                rtx_pt,
                kind,
                codec.clock_rate,
            ));
        }
    }

    for ext in extended.header_extensions.iter().filter(|e| e.kind == kind) {
        params.header_extensions.push(RtpHeaderExtensionParameters {
            uri: ext.uri.clone(),
            id: ext.recv_id,
            encrypt: ext.encrypt,
        });
    }

    params
}

/// Whether the extended set carries at least one sendable media codec of the
/// given kind. Handlers use this to reject unsendable kinds before touching
/// the registry.
pub fn can_send(kind: MediaKind, extended: &ExtendedCapabilitySet) -> bool {
    extended.codecs.iter().any(|c| c.kind == kind)
}

/// Whether the extended set carries at least one receivable media codec of
/// the given kind. Handlers use this to reject receive sessions for kinds
/// the intersection cannot carry, before any state is reserved.
pub fn can_receive(kind: MediaKind, extended: &ExtendedCapabilitySet) -> bool {
    extended.codecs.iter().any(|c| c.kind == kind)
}

/// Reduces a codec list to one media codec (the preferred one when given,
/// otherwise the first) plus its paired rtx entry.
pub fn reduce_codecs(
    codecs: &[RtpCodecParameters],
    preferred: Option<&RtpCodecCapability>,
) -> Vec<RtpCodecParameters> {
    let mut out: Vec<RtpCodecParameters> = vec![];

    for codec in codecs {
        let is_rtx = codec
            .mime_type
            .split('/')
            .nth(1)
            .is_some_and(|name| name.eq_ignore_ascii_case("rtx"));

        if is_rtx {
            // keep the rtx paired to the already chosen media codec
            if out
                .first()
                .is_some_and(|chosen| codec.parameters.get("apt")
                    == Some(&serde_json::json!(chosen.payload_type)))
            {
                out.push(codec.clone());
            }
            continue;
        }

        match preferred {
            Some(cap) => {
                if out.is_empty()
                    && codec.mime_type.eq_ignore_ascii_case(&cap.mime_type)
                    && codec.clock_rate == cap.clock_rate
                {
                    out.push(codec.clone());
                }
            }
            None => {
                if out.is_empty() {
                    out.push(codec.clone());
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::capability::RtpHeaderExtensionCapability;

    fn router_caps() -> RtpCapabilitySet {
        let mut opus = RtpCodecCapability::audio("audio/opus", 48000, 2, 111);
        opus.rtcp_feedback = vec![RtcpFeedback::new("transport-cc", "")];

        let mut vp8 = RtpCodecCapability::video("video/VP8", 90000, 101);
        vp8.rtcp_feedback = vec![RtcpFeedback::new("nack", ""), RtcpFeedback::new("nack", "pli")];
        let mut vp8_rtx = RtpCodecCapability::video("video/rtx", 90000, 102);
        vp8_rtx
            .parameters
            .insert("apt".to_owned(), serde_json::json!(101));

        // rtx with no matching media codec, must be dropped
        let mut dangling_rtx = RtpCodecCapability::video("video/rtx", 90000, 105);
        dangling_rtx
            .parameters
            .insert("apt".to_owned(), serde_json::json!(64));

        RtpCapabilitySet {
            codecs: vec![opus, vp8, vp8_rtx, dangling_rtx],
            header_extensions: vec![
                RtpHeaderExtensionCapability::new(
                    MediaKind::Audio,
                    "urn:ietf:params:rtp-hdrext:ssrc-audio-level",
                    10,
                ),
                RtpHeaderExtensionCapability::new(
                    MediaKind::Video,
                    "urn:3gpp:video-orientation",
                    11,
                ),
                RtpHeaderExtensionCapability::new(
                    MediaKind::Video,
                    "urn:example:router-only-extension",
                    12,
                ),
            ],
            fec_mechanisms: vec![],
        }
    }

    #[test]
    fn test_compute_is_deterministic() {
        let local = RtpCapabilitySet::default_local();
        let remote = router_caps();
        let a = compute_extended_capabilities(&local, &remote);
        let b = compute_extended_capabilities(&local, &remote);
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_opus_payload_types_and_local_feedback() {
        let local = RtpCapabilitySet::default_local();
        let extended = compute_extended_capabilities(&local, &router_caps());

        let opus = extended
            .codecs
            .iter()
            .find(|c| c.mime_type == "audio/opus")
            .unwrap();
        assert_eq!(opus.local_payload_type, 100);
        assert_eq!(opus.remote_payload_type, 111);

        let sending = sending_rtp_parameters(MediaKind::Audio, &extended);
        let codec = &sending.codecs[0];
        assert_eq!(codec.payload_type, 100);
        // feedback comes from the local entry, which declared none for opus
        assert!(codec.rtcp_feedback.is_empty());
    }

    #[test]
    fn test_rtx_requires_resolvable_apt_on_both_sides() {
        let local = RtpCapabilitySet::default_local();
        let extended = compute_extended_capabilities(&local, &router_caps());

        let vp8 = extended
            .codecs
            .iter()
            .find(|c| c.mime_type == "video/VP8")
            .unwrap();
        assert_eq!(vp8.local_rtx_payload_type, Some(97));
        assert_eq!(vp8.remote_rtx_payload_type, Some(102));

        // every rtx entry in the projections references a present media codec
        for params in [
            sending_rtp_parameters(MediaKind::Video, &extended),
            receiving_full_rtp_parameters(MediaKind::Video, &extended),
        ] {
            for codec in params.codecs.iter().filter(|c| c.mime_type.ends_with("/rtx")) {
                let apt = codec.parameters.get("apt").and_then(|v| v.as_u64()).unwrap();
                assert!(params
                    .codecs
                    .iter()
                    .any(|c| !c.mime_type.ends_with("/rtx") && u64::from(c.payload_type) == apt));
            }
        }
    }

    #[test]
    fn test_unmatched_codecs_are_omitted_not_errored() {
        let local = RtpCapabilitySet::default_local();
        let mut remote = router_caps();
        remote.codecs = vec![RtpCodecCapability::video("video/H264", 90000, 103)];
        remote.header_extensions.clear();

        let extended = compute_extended_capabilities(&local, &remote);
        assert!(extended.codecs.is_empty());
        assert!(!can_send(MediaKind::Video, &extended));
        assert!(!can_receive(MediaKind::Video, &extended));
    }

    #[test]
    fn test_send_and_receive_probes_follow_the_intersection() {
        let local = RtpCapabilitySet::default_local();
        let mut remote = router_caps();
        remote.codecs.retain(|c| c.kind != Some(MediaKind::Audio));

        let extended = compute_extended_capabilities(&local, &remote);
        assert!(can_send(MediaKind::Video, &extended));
        assert!(can_receive(MediaKind::Video, &extended));
        assert!(!can_send(MediaKind::Audio, &extended));
        assert!(!can_receive(MediaKind::Audio, &extended));
    }

    #[test]
    fn test_repeated_remote_codec_matches_only_once() {
        let local = RtpCapabilitySet::default_local();
        let mut remote = router_caps();
        // the router lists opus a second time under another payload type
        let mut opus_again = RtpCodecCapability::audio("audio/opus", 48000, 2, 112);
        opus_again.rtcp_feedback = vec![RtcpFeedback::new("transport-cc", "")];
        remote.codecs.push(opus_again);

        let extended = compute_extended_capabilities(&local, &remote);
        let opus_entries = extended
            .codecs
            .iter()
            .filter(|c| c.mime_type == "audio/opus")
            .count();
        assert_eq!(opus_entries, 1);

        let sending = sending_rtp_parameters(MediaKind::Audio, &extended);
        let mut pts: Vec<_> = sending.codecs.iter().map(|c| c.payload_type).collect();
        pts.sort_unstable();
        pts.dedup();
        assert_eq!(pts.len(), sending.codecs.len());
    }

    #[test]
    fn test_sending_parameters_kind_filter_and_distinct_payload_types() {
        let local = RtpCapabilitySet::default_local();
        let extended = compute_extended_capabilities(&local, &router_caps());

        let video = sending_rtp_parameters(MediaKind::Video, &extended);
        assert!(video.codecs.iter().all(|c| c.mime_type.starts_with("video/")));
        assert!(video.encodings.is_empty());

        let mut pts: Vec<_> = video.codecs.iter().map(|c| c.payload_type).collect();
        pts.sort_unstable();
        pts.dedup();
        assert_eq!(pts.len(), video.codecs.len());
    }

    #[test]
    fn test_receiving_parameters_use_router_ids() {
        let local = RtpCapabilitySet::default_local();
        let extended = compute_extended_capabilities(&local, &router_caps());

        let recv = receiving_full_rtp_parameters(MediaKind::Video, &extended);
        let vp8 = recv.codecs.iter().find(|c| c.mime_type == "video/VP8").unwrap();
        assert_eq!(vp8.payload_type, 101);

        let orientation = recv
            .header_extensions
            .iter()
            .find(|e| e.uri == "urn:3gpp:video-orientation")
            .unwrap();
        assert_eq!(orientation.id, 11);

        // the same extension is sent with the locally preferred id
        let send = sending_rtp_parameters(MediaKind::Video, &extended);
        let orientation = send
            .header_extensions
            .iter()
            .find(|e| e.uri == "urn:3gpp:video-orientation")
            .unwrap();
        assert_eq!(orientation.id, 4);
    }

    #[test]
    fn test_extension_intersection_respects_kind() {
        let local = RtpCapabilitySet::default_local();
        let mut remote = router_caps();
        // same URI as a local video extension, declared audio by the router
        remote.header_extensions.push(RtpHeaderExtensionCapability::new(
            MediaKind::Audio,
            "urn:3gpp:video-orientation",
            13,
        ));

        let extended = compute_extended_capabilities(&local, &remote);
        assert!(extended
            .header_extensions
            .iter()
            .all(|e| !(e.kind == MediaKind::Audio && e.uri == "urn:3gpp:video-orientation")));
        // the router-only extension never survives the intersection
        assert!(extended
            .header_extensions
            .iter()
            .all(|e| e.uri != "urn:example:router-only-extension"));
    }

    #[test]
    fn test_reduce_codecs_keeps_one_media_codec_and_its_rtx() {
        let local = RtpCapabilitySet::default_local();
        let extended = compute_extended_capabilities(&local, &router_caps());
        let video = sending_rtp_parameters(MediaKind::Video, &extended);

        let reduced = reduce_codecs(&video.codecs, None);
        assert_eq!(reduced.len(), 2);
        assert_eq!(reduced[0].mime_type, "video/VP8");
        assert_eq!(
            reduced[1].parameters.get("apt"),
            Some(&serde_json::json!(reduced[0].payload_type))
        );
    }
}
