//! Interface to the SDP builder collaborator.
//!
//! Building a directional SDP document from structured session state is a
//! pure function of that state; parsing and serialization of SDP text are
//! out of scope for this crate. The handler only hands the builder its
//! current registry snapshot and forwards the resulting descriptions to the
//! native transport.

use crate::error::Result;
use crate::registry::SessionEntry;
use crate::transport::{IceParameters, SessionDescription};

/// Builds directional SDP documents from session state. Implementations are
/// pure and idempotent given identical inputs.
pub trait SdpBuilder {
    /// A remote-originated offer describing the given session entries. Used
    /// on the receive path, where the router always originates the
    /// description contents from the client's declared session table.
    fn build_offer(&mut self, entries: &[SessionEntry]) -> Result<SessionDescription>;

    /// The remote answer corresponding to a locally created offer. Used on
    /// the send path.
    fn build_answer(&mut self, local: &SessionDescription) -> Result<SessionDescription>;

    /// Updates the remote ICE credentials used for subsequently built
    /// descriptions.
    fn update_remote_ice_parameters(&mut self, ice: IceParameters);
}
