//! # rtc-media-client
//!
//! Client-side negotiation layer between an application's media tracks and a
//! server-side media router.
//!
//! The crate does two things:
//!
//! - computes, once per connection, the **capability intersection** between
//!   what the local media engine can do and what the remote router supports,
//!   producing deterministic RTP parameter sets for sending and receiving
//!   media ([`negotiation`]);
//! - drives, per logical media session direction, a **signaling state
//!   machine** that turns application intents ("start sending this track",
//!   "stop receiving this source", "restart connectivity") into correctly
//!   sequenced offer/answer exchanges against a native transport object,
//!   hiding per-engine SDP quirks behind one [`handler::Handler`] contract.
//!
//! Media transport itself (ICE/DTLS/SRTP, packetization) and SDP text
//! handling live behind the [`transport::TransportAdapter`] and
//! [`sdp::SdpBuilder`] seams; this crate never touches the wire.
//!
//! ## Example
//!
//! ```no_run
//! use rtc_media_client::capability::RtpCapabilitySet;
//! use rtc_media_client::handler::{Handler, HandlerDirection, HandlerOptions, UnifiedHandler};
//! use rtc_media_client::transport::MediaTrack;
//! use rtc_media_client::capability::MediaKind;
//!
//! # fn example(
//! #     transport: Box<dyn rtc_media_client::transport::TransportAdapter>,
//! #     sdp_builder: Box<dyn rtc_media_client::sdp::SdpBuilder>,
//! #     events: Box<dyn rtc_media_client::handler::EventSink>,
//! #     router_capabilities: RtpCapabilitySet,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let mut handler = UnifiedHandler::new(HandlerOptions {
//!     direction: HandlerDirection::Send,
//!     local_capabilities: RtpCapabilitySet::default_local(),
//!     remote_capabilities: router_capabilities,
//!     transport,
//!     sdp_builder,
//!     events,
//! });
//!
//! let track = MediaTrack {
//!     id: "cam-0".to_owned(),
//!     kind: MediaKind::Video,
//! };
//! let rtp_parameters = handler.start_send(&track, None)?;
//! println!("sending with {} codecs", rtp_parameters.codecs.len());
//! # Ok(())
//! # }
//! ```

pub mod capability;
pub mod error;
pub mod handler;
pub mod negotiation;
pub mod registry;
pub mod sdp;
pub mod transport;

pub use error::{Error, Result};
