//! Handler state machine driving the offer/answer cycle.
//!
//! One handler instance exists per logical media session direction. Every
//! concrete transport-engine family implements the same [`Handler`] contract;
//! the shared state-machine logic (registry transactions, once-only DTLS
//! role, transport-readiness gating) lives in an internal core component,
//! injected into each variant by composition rather than duplicated.
//!
//! All operations take `&mut self`: the exclusive receiver is the per-handler
//! mutual exclusion guarding the whole operation. The offer/answer cycle is
//! not reentrant, so a handler shared across threads must be wrapped in one
//! mutex held for the full call.

pub(crate) mod core;
pub mod plan_b;
pub mod unified;

pub use plan_b::PlanBHandler;
pub use unified::UnifiedHandler;

use crate::capability::{MediaKind, RtpCapabilitySet, RtpParameters};
use crate::error::{Error, Result};
use crate::sdp::SdpBuilder;
use crate::transport::{
    ConnectionState, DtlsParameters, DtlsRole, IceParameters, MediaTrack, RemoteTrack, StatsReport,
    TransportAdapter,
};

/// Lifecycle of a handler instance. `Ready` is terminal-stable: it is
/// re-entered after every successful renegotiation. `Closed` is reachable
/// from any state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HandlerState {
    Created,
    /// Only until the very first successful offer/answer round.
    TransportPending,
    Ready,
    Closed,
}

/// Direction a handler instance is bound to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HandlerDirection {
    Send,
    Recv,
}

/// Simulcast layer names, ordered lowest to highest. The names are
/// human-readable identification only, not transport semantics.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SpatialLayer {
    Low,
    Medium,
    High,
}

impl SpatialLayer {
    pub fn as_str(&self) -> &'static str {
        match *self {
            SpatialLayer::Low => "low",
            SpatialLayer::Medium => "medium",
            SpatialLayer::High => "high",
        }
    }

    pub(crate) fn from_rid(rid: &str) -> Option<SpatialLayer> {
        match rid {
            "low" => Some(SpatialLayer::Low),
            "medium" => Some(SpatialLayer::Medium),
            "high" => Some(SpatialLayer::High),
            _ => None,
        }
    }
}

/// One simulcast encoding layer: an independent bitrate-capped stream.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulcastLayer {
    pub layer: SpatialLayer,
    pub max_bitrate: Option<u32>,
    pub scale_resolution_down_by: Option<f64>,
}

/// 1-3 simulcast layers for a send track.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulcastConfig {
    pub layers: Vec<SimulcastLayer>,
}

impl SimulcastConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.layers.is_empty() || self.layers.len() > 3 {
            return Err(Error::ErrInvalidSimulcastConfig(format!(
                "expected 1-3 layers, got {}",
                self.layers.len()
            )));
        }
        let mut seen = vec![];
        for l in &self.layers {
            if seen.contains(&l.layer) {
                return Err(Error::ErrInvalidSimulcastConfig(format!(
                    "duplicate layer {}",
                    l.layer.as_str()
                )));
            }
            seen.push(l.layer);
        }
        Ok(())
    }
}

/// Structured event sink injected into each handler at construction.
pub trait EventSink {
    /// The locally decided secure-transport parameters. Emitted exactly once
    /// per handler lifetime, on the first successful offer/answer round.
    fn transport_parameters(&self, params: &DtlsParameters);

    /// Connection-state change forwarded from the transport adapter.
    fn connection_state_changed(&self, state: ConnectionState);
}

/// Everything a handler needs at construction time.
pub struct HandlerOptions {
    pub direction: HandlerDirection,
    pub local_capabilities: RtpCapabilitySet,
    pub remote_capabilities: RtpCapabilitySet,
    pub transport: Box<dyn TransportAdapter>,
    pub sdp_builder: Box<dyn SdpBuilder>,
    pub events: Box<dyn EventSink>,
}

/// The per-engine handler contract.
///
/// Send operations are valid on `Send` handlers, receive operations on
/// `Recv` handlers; calling across directions fails with
/// `ErrUnsupportedOperation` and no side effects. Every failed operation
/// restores the pre-call registry state before returning the error.
pub trait Handler {
    fn direction(&self) -> HandlerDirection;
    fn state(&self) -> HandlerState;
    /// The DTLS role decided on the first successful round; `None` before.
    fn dtls_role(&self) -> Option<DtlsRole>;
    /// Current connection state of the underlying transport.
    fn connection_state(&self) -> ConnectionState;

    /// Starts sending `track`, running one offer/answer round, and returns
    /// the final RTP parameters for it.
    fn start_send(
        &mut self,
        track: &MediaTrack,
        simulcast: Option<SimulcastConfig>,
    ) -> Result<RtpParameters>;
    fn stop_send(&mut self, track_id: &str) -> Result<()>;
    /// Device-level track swap; no renegotiation round, registry identity
    /// preserved.
    fn replace_track(&mut self, track_id: &str, new_track: &MediaTrack) -> Result<()>;
    /// Activates all simulcast layers at or below `layer`, deactivates the
    /// rest.
    fn set_active_spatial_layer(&mut self, track_id: &str, layer: SpatialLayer) -> Result<()>;
    fn get_sender_stats(&mut self, track_id: &str) -> Result<StatsReport>;

    /// Declares a remote source to receive, runs one offer/answer round
    /// (answering a router-originated offer), and returns the locally
    /// materialized track.
    fn start_receive(
        &mut self,
        id: &str,
        kind: MediaKind,
        remote_rtp_parameters: RtpParameters,
    ) -> Result<RemoteTrack>;
    fn stop_receive(&mut self, id: &str) -> Result<()>;
    fn get_receiver_stats(&mut self, id: &str) -> Result<StatsReport>;

    /// Updates remote ICE credentials. Before the first round this is a
    /// deferred no-op; afterwards it drives a connectivity-restart round.
    fn restart_ice(&mut self, ice: IceParameters) -> Result<()>;
    fn get_transport_stats(&mut self) -> Result<StatsReport>;

    /// Drains pending transport connection-state changes into the event
    /// sink.
    fn poll_transport_events(&mut self);

    /// Tears down the transport unconditionally, suppressing teardown
    /// errors. Idempotent.
    fn close(&mut self);
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_simulcast_config_layer_count() {
        let empty = SimulcastConfig { layers: vec![] };
        assert!(empty.validate().is_err());

        let dup = SimulcastConfig {
            layers: vec![
                SimulcastLayer {
                    layer: SpatialLayer::Low,
                    max_bitrate: None,
                    scale_resolution_down_by: None,
                },
                SimulcastLayer {
                    layer: SpatialLayer::Low,
                    max_bitrate: None,
                    scale_resolution_down_by: None,
                },
            ],
        };
        assert!(dup.validate().is_err());
    }

    #[test]
    fn test_spatial_layer_order() {
        assert!(SpatialLayer::Low < SpatialLayer::Medium);
        assert!(SpatialLayer::Medium < SpatialLayer::High);
        assert_eq!(SpatialLayer::from_rid("medium"), Some(SpatialLayer::Medium));
        assert_eq!(SpatialLayer::from_rid("l2"), None);
    }
}
