//! Handler for engines with per-section media descriptions and per-layer
//! encoding control (the modern engine family).

use crate::capability::{MediaKind, RtpEncodingParameters, RtpParameters};
use crate::error::{Error, Result};
use crate::handler::core::HandlerCore;
use crate::handler::{
    Handler, HandlerDirection, HandlerOptions, HandlerState, SimulcastConfig, SpatialLayer,
};
use crate::transport::{
    ConnectionState, DtlsRole, IceParameters, MediaTrack, RemoteTrack, StatsReport,
};

pub struct UnifiedHandler {
    core: HandlerCore,
}

impl UnifiedHandler {
    pub fn new(options: HandlerOptions) -> Self {
        UnifiedHandler {
            core: HandlerCore::new(options),
        }
    }

    fn send_encodings(
        track: &MediaTrack,
        simulcast: Option<SimulcastConfig>,
    ) -> Result<Vec<RtpEncodingParameters>> {
        let Some(config) = simulcast else {
            return Ok(vec![]);
        };
        config.validate()?;
        if track.kind != MediaKind::Video {
            return Err(Error::ErrInvalidSimulcastConfig(
                "simulcast requires a video track".to_owned(),
            ));
        }

        let mut layers = config.layers;
        layers.sort_by_key(|l| l.layer);
        Ok(layers
            .into_iter()
            .map(|l| RtpEncodingParameters {
                rid: Some(l.layer.as_str().to_owned()),
                active: true,
                max_bitrate: l.max_bitrate,
                scale_resolution_down_by: l.scale_resolution_down_by,
                ..Default::default()
            })
            .collect())
    }
}

impl Handler for UnifiedHandler {
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
        let encodings = Self::send_encodings(track, simulcast)?;
        self.core.start_send(track, encodings)
    }

    fn stop_send(&mut self, track_id: &str) -> Result<()> {
        self.core.stop_send(track_id)
    }

    fn replace_track(&mut self, track_id: &str, new_track: &MediaTrack) -> Result<()> {
        self.core.replace_track(track_id, new_track)
    }

    fn set_active_spatial_layer(&mut self, track_id: &str, layer: SpatialLayer) -> Result<()> {
        self.core.set_active_spatial_layer(track_id, layer)
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
