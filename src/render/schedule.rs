use crate::foundation::error::{ToonError, ToonResult};

/// Frames in one motion loop: never below `min_cycle`, never fewer than two per motion image.
pub fn motion_cycle_len(motion_frames: usize, min_cycle: usize) -> usize {
    min_cycle.max(2 * motion_frames).max(1)
}

/// Which motion frame to show at every output frame.
///
/// One motion frame is simply repeated. With `N > 1` the sequence loops every
/// [`motion_cycle_len`] frames and output frame `i` shows
/// `floor((i mod cycle) / cycle * N)`. Deterministic for identical inputs.
pub fn schedule_motion(
    motion_frames: usize,
    total_frames: usize,
    min_cycle: usize,
) -> ToonResult<Vec<usize>> {
    if motion_frames == 0 {
        return Err(ToonError::missing_asset(
            "motion schedule needs at least one motion frame",
        ));
    }
    if motion_frames == 1 {
        return Ok(vec![0; total_frames]);
    }

    let cycle = motion_cycle_len(motion_frames, min_cycle);
    Ok((0..total_frames)
        .map(|i| {
            let pos = i % cycle;
            ((pos * motion_frames) / cycle).min(motion_frames - 1)
        })
        .collect())
}

#[cfg(test)]
#[path = "../../tests/unit/render/schedule.rs"]
mod tests;
