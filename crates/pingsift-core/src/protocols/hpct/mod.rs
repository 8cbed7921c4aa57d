//! HiPerConTracer-style probe header decoding.
//!
//! Frames are classified by searching their lowercase hex rendering for the
//! probe marker (`LOVE`) and then for the ping pattern `20212223`; the first
//! match wins. Probe frames carry a 16-byte measurement header at a fixed
//! offset from the start of the frame: magic number, send TTL, round,
//! checksum tweak and a little-endian millisecond send timestamp.
//!
//! A header that does not fit in the frame rejects the whole frame with
//! `DecodeError::TruncatedHeader`. Field positions are in `layout`, safe
//! fixed-width reads in `reader`, byte-order handling in `endian`.
//!
//! Version française (résumé):
//! Le module classe les trames par recherche de marqueurs dans leur
//! représentation hexadécimale, puis décode l'en-tête de sonde (nombre
//! magique, TTL, tour, ajustement de somme de contrôle, horodatage en
//! millisecondes little-endian). Les positions sont dans `layout`.

pub mod endian;
pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

pub use endian::{le_hex_to_u64, swap_hex_byte_order};
pub use error::DecodeError;
pub use parser::{ProbeHeader, classify, decode_frame, format_send_time, parse_probe_header};
