//! Shared handler state-machine logic, injected into each concrete engine
//! variant.

use log::{debug, trace, warn};
use rand::Rng;

use crate::capability::{MediaKind, RtcpParameters, RtpEncodingParameters, RtpParameters};
use crate::error::{Error, Result};
use crate::handler::{EventSink, HandlerDirection, HandlerOptions, HandlerState, SpatialLayer};
use crate::negotiation::{self, ExtendedCapabilitySet};
use crate::registry::SessionRegistry;
use crate::sdp::SdpBuilder;
use crate::transport::{
    ConnectionState, DtlsRole, IceParameters, MediaTrack, RemoteTrack, StatsReport,
    TransportAdapter,
};

/// Which side originates the description contents for a round.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum RoundDirection {
    /// Send path: local offer, remote answer built from it.
    LocalOffer,
    /// Receive path: remote offer built from the session table, local
    /// answer. The receiving side answers despite logically pulling media.
    RemoteOffer,
}

/// Explicit outcome of one transactional offer/answer round.
#[must_use]
pub(crate) enum RoundOutcome {
    Committed,
    RolledBack(Error),
}

/// State shared by every engine variant: the session registry, the
/// once-only DTLS role and readiness flag, and the collaborator handles.
pub(crate) struct HandlerCore {
    direction: HandlerDirection,
    state: HandlerState,
    dtls_role: Option<DtlsRole>,
    pub(crate) registry: SessionRegistry,
    pub(crate) extended: ExtendedCapabilitySet,
    transport: Box<dyn TransportAdapter>,
    sdp_builder: Box<dyn SdpBuilder>,
    events: Box<dyn EventSink>,
    cname: String,
}

impl HandlerCore {
    pub(crate) fn new(options: HandlerOptions) -> Self {
        let extended = negotiation::compute_extended_capabilities(
            &options.local_capabilities,
            &options.remote_capabilities,
        );
        debug!(
            "handler created: direction={:?} codecs={} extensions={}",
            options.direction,
            extended.codecs.len(),
            extended.header_extensions.len()
        );
        HandlerCore {
            direction: options.direction,
            state: HandlerState::Created,
            dtls_role: None,
            registry: SessionRegistry::new(),
            extended,
            transport: options.transport,
            sdp_builder: options.sdp_builder,
            events: options.events,
            cname: rand_alpha(16),
        }
    }

    pub(crate) fn direction(&self) -> HandlerDirection {
        self.direction
    }

    pub(crate) fn state(&self) -> HandlerState {
        self.state
    }

    pub(crate) fn dtls_role(&self) -> Option<DtlsRole> {
        self.dtls_role
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == HandlerState::Closed {
            Err(Error::ErrTransportClosed)
        } else {
            Ok(())
        }
    }

    fn ensure_direction(&self, direction: HandlerDirection) -> Result<()> {
        if self.direction != direction {
            return Err(Error::ErrUnsupportedOperation(format!(
                "operation requires a {direction:?} handler"
            )));
        }
        Ok(())
    }

    /// Runs one offer/answer round against the transport adapter. On the
    /// first success the DTLS role is decided, the transport parameters are
    /// reported upward, and the handler becomes `Ready`; none of that is
    /// ever re-derived on later rounds.
    pub(crate) fn run_round(&mut self, direction: RoundDirection) -> RoundOutcome {
        if self.state == HandlerState::Created {
            self.state = HandlerState::TransportPending;
        }

        let result = match direction {
            RoundDirection::LocalOffer => self.local_offer_round(),
            RoundDirection::RemoteOffer => self.remote_offer_round(),
        }
        .and_then(|()| self.finish_first_round());

        match result {
            Ok(()) => RoundOutcome::Committed,
            Err(e) => RoundOutcome::RolledBack(e.into_negotiation()),
        }
    }

    fn local_offer_round(&mut self) -> Result<()> {
        let offer = self.transport.create_offer()?;
        self.transport.set_local_description(&offer)?;
        let answer = self.sdp_builder.build_answer(&offer)?;
        self.transport.set_remote_description(&answer)?;
        Ok(())
    }

    fn remote_offer_round(&mut self) -> Result<()> {
        let entries = self.registry.active_entries(None);
        let offer = self.sdp_builder.build_offer(&entries)?;
        self.transport.set_remote_description(&offer)?;
        let answer = self.transport.create_answer()?;
        self.transport.set_local_description(&answer)?;
        Ok(())
    }

    fn finish_first_round(&mut self) -> Result<()> {
        if self.state == HandlerState::Ready {
            return Ok(());
        }
        let params = self.transport.local_dtls_parameters()?;
        self.dtls_role = Some(params.role);
        self.state = HandlerState::Ready;
        debug!("transport ready, dtls role {:?}", params.role);
        self.events.transport_parameters(&params);
        Ok(())
    }

    pub(crate) fn start_send(
        &mut self,
        track: &MediaTrack,
        mut encodings: Vec<RtpEncodingParameters>,
    ) -> Result<RtpParameters> {
        self.ensure_open()?;
        self.ensure_direction(HandlerDirection::Send)?;
        if !negotiation::can_send(track.kind, &self.extended) {
            return Err(Error::ErrUnsupportedOperation(format!(
                "no negotiated codec for {}",
                track.kind
            )));
        }
        if encodings.is_empty() {
            encodings.push(RtpEncodingParameters {
                active: true,
                ..Default::default()
            });
        }

        let has_rtx = self
            .extended
            .codecs
            .iter()
            .any(|c| c.kind == track.kind && c.local_rtx_payload_type.is_some());
        let mut rng = rand::rng();
        for encoding in &mut encodings {
            if encoding.ssrc.is_none() {
                encoding.ssrc = Some(rng.random::<u32>());
            }
            if has_rtx && encoding.rtx_ssrc.is_none() {
                encoding.rtx_ssrc = Some(rng.random::<u32>());
            }
        }

        let cname = self.cname.clone();
        let entry = self.registry.reserve(&track.id, track.kind)?;
        entry.ssrc = encodings[0].ssrc;
        entry.rtx_ssrc = encodings[0].rtx_ssrc;
        entry.cname = Some(cname.clone());
        entry.encodings = encodings.clone();
        let mid = entry.mid.clone();

        if let Err(e) = self.transport.add_track(track, &encodings) {
            self.registry.release(&track.id);
            return Err(e);
        }

        match self.run_round(RoundDirection::LocalOffer) {
            RoundOutcome::Committed => {
                self.registry.commit(&track.id)?;
                let mut params = negotiation::sending_rtp_parameters(track.kind, &self.extended);
                params.mid = Some(mid);
                params.encodings = encodings;
                params.rtcp = RtcpParameters {
                    cname: Some(cname),
                    reduced_size: true,
                };
                Ok(params)
            }
            RoundOutcome::RolledBack(err) => {
                if let Err(detach) = self.transport.remove_track(&track.id) {
                    warn!("detach after failed round: {detach}");
                }
                self.registry.release(&track.id);
                Err(err)
            }
        }
    }

    pub(crate) fn stop_send(&mut self, track_id: &str) -> Result<()> {
        self.ensure_open()?;
        self.ensure_direction(HandlerDirection::Send)?;
        self.registry.mark_closing(track_id)?;

        if let Err(e) = self.transport.remove_track(track_id) {
            self.registry.revert_closing(track_id);
            return Err(e);
        }

        match self.run_round(RoundDirection::LocalOffer) {
            RoundOutcome::Committed => self.registry.commit(track_id),
            RoundOutcome::RolledBack(err) => {
                // restore pre-call state: re-attach and keep the entry
                if let Some(entry) = self.registry.get(track_id) {
                    let track = MediaTrack {
                        id: track_id.to_owned(),
                        kind: entry.kind,
                    };
                    let encodings = entry.encodings.clone();
                    if let Err(attach) = self.transport.add_track(&track, &encodings) {
                        warn!("re-attach after failed round: {attach}");
                    }
                }
                self.registry.revert_closing(track_id);
                Err(err)
            }
        }
    }

    pub(crate) fn replace_track(&mut self, track_id: &str, new_track: &MediaTrack) -> Result<()> {
        self.ensure_open()?;
        self.ensure_direction(HandlerDirection::Send)?;
        let entry = self
            .registry
            .get(track_id)
            .ok_or_else(|| Error::ErrSessionNotFound {
                id: track_id.to_owned(),
            })?;
        if entry.kind != new_track.kind {
            return Err(Error::ErrMediaKindMismatch);
        }
        if !self.transport.senders().iter().any(|t| t == track_id) {
            return Err(Error::ErrSessionNotFound {
                id: track_id.to_owned(),
            });
        }
        // only the media pipeline changes; registry identity is preserved
        self.transport.replace_track(track_id, new_track)
    }

    /// Toggles encoding active flags for all layers at or below `layer`.
    /// Nothing is mutated unless the transport accepts the new encodings.
    pub(crate) fn set_active_spatial_layer(
        &mut self,
        track_id: &str,
        layer: SpatialLayer,
    ) -> Result<()> {
        self.ensure_open()?;
        self.ensure_direction(HandlerDirection::Send)?;
        let entry = self
            .registry
            .get(track_id)
            .ok_or_else(|| Error::ErrSessionNotFound {
                id: track_id.to_owned(),
            })?;

        let mut encodings = entry.encodings.clone();
        let mut toggled = false;
        for encoding in &mut encodings {
            let Some(rid) = encoding.rid.as_deref().and_then(SpatialLayer::from_rid) else {
                continue;
            };
            encoding.active = rid <= layer;
            toggled = true;
        }
        if !toggled {
            return Err(Error::ErrUnsupportedOperation(
                "track has no simulcast layers".to_owned(),
            ));
        }

        self.transport.update_encodings(track_id, &encodings)?;
        if let Some(entry) = self.registry.get_mut(track_id) {
            entry.encodings = encodings;
        }
        trace!("spatial layer for {track_id} set to {}", layer.as_str());
        Ok(())
    }

    pub(crate) fn start_receive(
        &mut self,
        id: &str,
        kind: MediaKind,
        remote_rtp_parameters: RtpParameters,
    ) -> Result<RemoteTrack> {
        self.ensure_open()?;
        self.ensure_direction(HandlerDirection::Recv)?;
        if !negotiation::can_receive(kind, &self.extended) {
            return Err(Error::ErrUnsupportedOperation(format!(
                "no negotiated codec for {kind}"
            )));
        }

        let entry = self.registry.reserve(id, kind)?;
        entry.ssrc = remote_rtp_parameters
            .encodings
            .first()
            .and_then(|e| e.ssrc);
        entry.cname = remote_rtp_parameters.rtcp.cname.clone();
        entry.remote_rtp_parameters = Some(remote_rtp_parameters);
        let ssrc = entry.ssrc;

        match self.run_round(RoundDirection::RemoteOffer) {
            RoundOutcome::Committed => {
                self.registry.commit(id)?;
                let track = self
                    .transport
                    .receivers()
                    .into_iter()
                    .find(|r| r.id == id)
                    .unwrap_or(RemoteTrack {
                        id: id.to_owned(),
                        kind,
                        ssrc,
                    });
                Ok(track)
            }
            RoundOutcome::RolledBack(err) => {
                self.registry.release(id);
                Err(err)
            }
        }
    }

    pub(crate) fn stop_receive(&mut self, id: &str) -> Result<()> {
        self.ensure_open()?;
        self.ensure_direction(HandlerDirection::Recv)?;
        self.registry.mark_closing(id)?;

        match self.run_round(RoundDirection::RemoteOffer) {
            RoundOutcome::Committed => self.registry.commit(id),
            RoundOutcome::RolledBack(err) => {
                self.registry.revert_closing(id);
                Err(err)
            }
        }
    }

    pub(crate) fn restart_ice(&mut self, ice: IceParameters) -> Result<()> {
        self.ensure_open()?;
        self.sdp_builder.update_remote_ice_parameters(ice);

        if self.state != HandlerState::Ready {
            // the first round will already carry current parameters
            debug!("ice restart deferred: no round completed yet");
            return Ok(());
        }

        let direction = match self.direction {
            HandlerDirection::Send => RoundDirection::LocalOffer,
            HandlerDirection::Recv => RoundDirection::RemoteOffer,
        };
        match self.run_round(direction) {
            RoundOutcome::Committed => Ok(()),
            RoundOutcome::RolledBack(err) => Err(err),
        }
    }

    pub(crate) fn session_stats(
        &mut self,
        direction: HandlerDirection,
        id: &str,
    ) -> Result<StatsReport> {
        self.ensure_open()?;
        self.ensure_direction(direction)?;
        if self.registry.get(id).is_none() {
            return Err(Error::ErrSessionNotFound { id: id.to_owned() });
        }
        self.transport.stats(Some(id))
    }

    pub(crate) fn transport_stats(&mut self) -> Result<StatsReport> {
        self.ensure_open()?;
        self.transport.stats(None)
    }

    pub(crate) fn connection_state(&self) -> ConnectionState {
        self.transport.connection_state()
    }

    pub(crate) fn poll_transport_events(&mut self) {
        while let Some(state) = self.transport.poll_connection_state_change() {
            trace!("connection state -> {state}");
            self.events.connection_state_changed(state);
        }
    }

    pub(crate) fn close(&mut self) {
        if self.state == HandlerState::Closed {
            return;
        }
        self.state = HandlerState::Closed;
        self.registry.clear();
        // best effort: nothing can observe teardown failures anymore
        if let Err(e) = self.transport.close() {
            warn!("transport teardown: {e}");
        }
    }
}

fn rand_alpha(n: usize) -> String {
    const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::rng();
    (0..n)
        .map(|_| CHARS[rng.random_range(0..CHARS.len())] as char)
        .collect()
}
