//! Handler for the legacy single-section engine family.
//!
//! These engines bundle all tracks of a kind into one media section and
//! expose no per-layer encoding control: simulcast configuration and spatial
//! layer switching are rejected with `ErrUnsupportedOperation`, without side
//! effects. Everything else follows the shared contract.

use crate::capability::{MediaKind, RtpParameters};
use crate::error::{Error, Result};
use crate::handler::core::HandlerCore;
use crate::handler::{
    Handler, HandlerDirection, HandlerOptions, HandlerState, SimulcastConfig, SpatialLayer,
};
use crate::transport::{
    ConnectionState, DtlsRole, IceParameters, MediaTrack, RemoteTrack, StatsReport,
};

pub struct PlanBHandler {
    core: HandlerCore,
}

impl PlanBHandler {
    pub fn new(options: HandlerOptions) -> Self {
        PlanBHandler {
            core: HandlerCore::new(options),
        }
    }
}

impl Handler for PlanBHandler {
    fn direction(&self) -> HandlerDirection {
        self.core.direction()
    }

    fn state(&self) -> HandlerState {
        self.core.state()
    }

    fn dtls_role(&self) -> Option<DtlsRole> {
        self.core.dtls_role()
    }

    fn connection_state(&self) -> ConnectionState {
        self.core.connection_state()
    }

    fn start_send(
        &mut self,
        track: &MediaTrack,
        simulcast: Option<SimulcastConfig>,
    ) -> Result<RtpParameters> {
        if simulcast.is_some() {
            return Err(Error::ErrUnsupportedOperation(
                "engine has no per-layer encoding control".to_owned(),
            ));
        }
        self.core.start_send(track, vec![])
    }

    fn stop_send(&mut self, track_id: &str) -> Result<()> {
        self.core.stop_send(track_id)
    }

    fn replace_track(&mut self, track_id: &str, new_track: &MediaTrack) -> Result<()> {
        self.core.replace_track(track_id, new_track)
    }

    fn set_active_spatial_layer(&mut self, _track_id: &str, _layer: SpatialLayer) -> Result<()> {
        Err(Error::ErrUnsupportedOperation(
            "engine has no per-layer encoding control".to_owned(),
        ))
    }

    fn get_sender_stats(&mut self, track_id: &str) -> Result<StatsReport> {
        self.core.session_stats(HandlerDirection::Send, track_id)
    }

    fn start_receive(
        &mut self,
        id: &str,
        kind: MediaKind,
        remote_rtp_parameters: RtpParameters,
    ) -> Result<RemoteTrack> {
        self.core.start_receive(id, kind, remote_rtp_parameters)
    }

    fn stop_receive(&mut self, id: &str) -> Result<()> {
        self.core.stop_receive(id)
    }

    fn get_receiver_stats(&mut self, id: &str) -> Result<StatsReport> {
        self.core.session_stats(HandlerDirection::Recv, id)
    }

    fn restart_ice(&mut self, ice: IceParameters) -> Result<()> {
        self.core.restart_ice(ice)
    }

    fn get_transport_stats(&mut self) -> Result<StatsReport> {
        self.core.transport_stats()
    }

    fn poll_transport_events(&mut self) {
        self.core.poll_transport_events();
    }

    fn close(&mut self) {
        self.core.close();
    }
}
