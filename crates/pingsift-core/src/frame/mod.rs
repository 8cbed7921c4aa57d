//! Link-layer slicing.
//!
//! Frames are sliced laxly with `etherparse` according to the capture link
//! type, so frames truncated by the snap length keep their IP header.
//! Only frames exposing an IPv4 or IPv6 header become [`crate::CapturedFrame`]s;
//! everything else is dropped before classification.

pub mod error;
pub mod parser;

pub use error::FrameError;
pub use parser::{capture_frame, parse_echo_request};
