use std::num::NonZeroUsize;
use std::thread;

use crate::protocols::hpct::{DecodeError, decode_frame};
use crate::{CapturedFrame, DecodedRecord, DecoderConfig};

/// Decode frames one after another.
pub fn decode_frames(
    frames: &[CapturedFrame],
    config: &DecoderConfig,
) -> Vec<Result<DecodedRecord, DecodeError>> {
    frames
        .iter()
        .map(|frame| decode_frame(frame, config))
        .collect()
}

/// Decode frames on up to `workers` scoped threads.
///
/// Frames are split into contiguous chunks and the results are stitched back
/// together in input order, so the output equals [`decode_frames`].
pub fn decode_frames_parallel(
    frames: &[CapturedFrame],
    config: &DecoderConfig,
    workers: NonZeroUsize,
) -> Vec<Result<DecodedRecord, DecodeError>> {
    if frames.is_empty() {
        return Vec::new();
    }
    let chunk_len = frames.len().div_ceil(workers.get());
    if chunk_len == frames.len() {
        return decode_frames(frames, config);
    }

    thread::scope(|scope| {
        let handles: Vec<_> = frames
            .chunks(chunk_len)
            .map(|chunk| scope.spawn(move || decode_frames(chunk, config)))
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| match handle.join() {
                Ok(results) => results,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}
