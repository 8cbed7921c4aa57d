//! Protocol decoding modules.
//!
//! Each protocol follows a layered structure:
//! - `layout`: offsets, ranges and markers (source of truth)
//! - `reader`: safe access to fixed-width fields
//! - `parser`: domain-level decoding (no direct indexing)
//! - `error`: explicit, actionable errors
//!
//! Parsers are pure and contain no I/O; sources and analysis layers handle
//! file access and aggregation.

pub mod hpct;
