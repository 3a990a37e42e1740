//! Pause-aware countdown clock.
//!
//! The countdown starts at [`COUNTDOWN_SECONDS`] and runs down with *effective*
//! time: wall-clock time since launch minus every second spent while an event
//! was active.

use std::time::{Duration, SystemTime};

use crate::dao::models::{MatchEntity, PhaseTag};

/// Length of the countdown.
pub const COUNTDOWN_SECONDS: u32 = 1200;

/// Effective time elapsed since `start`.
///
/// Completed pauses are subtracted, and so is the pause currently in progress
/// when `pause_anchor` is set, which keeps the value constant while paused.
/// Times before `start` read as zero.
pub fn effective_elapsed(
    start: SystemTime,
    accumulated_pause_seconds: u64,
    pause_anchor: Option<SystemTime>,
    now: SystemTime,
) -> Duration {
    let wall = now.duration_since(start).unwrap_or_default();
    let ongoing_pause = pause_anchor
        .map(|anchor| now.duration_since(anchor).unwrap_or_default())
        .unwrap_or_default();

    wall.saturating_sub(Duration::from_secs(accumulated_pause_seconds))
        .saturating_sub(ongoing_pause)
}

/// Seconds left on the countdown, never negative.
pub fn remaining_seconds(elapsed_seconds: u64) -> u64 {
    u64::from(COUNTDOWN_SECONDS).saturating_sub(elapsed_seconds)
}

/// Phase the countdown is in after `elapsed_seconds` of effective time.
pub fn phase_at(elapsed_seconds: u64, mid_delay_seconds: u32, late_delay_seconds: u32) -> PhaseTag {
    if elapsed_seconds >= u64::from(late_delay_seconds) {
        PhaseTag::Late
    } else if elapsed_seconds >= u64::from(mid_delay_seconds) {
        PhaseTag::Mid
    } else {
        PhaseTag::Start
    }
}

/// Clock state of a match at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockReading {
    /// Whether the countdown was ever launched.
    pub started: bool,
    /// Whole seconds of effective time elapsed.
    pub elapsed_seconds: u64,
    /// Whole seconds left on the countdown.
    pub remaining_seconds: u64,
    /// Whether an event currently holds the clock.
    pub paused: bool,
    /// Phase derived from the elapsed time.
    pub phase_tag: PhaseTag,
}

/// Read the clock of a match. A stopped match is read at its stop time.
pub fn read(entity: &MatchEntity, now: SystemTime) -> ClockReading {
    let Some(start) = entity.start_time else {
        return ClockReading {
            started: false,
            elapsed_seconds: 0,
            remaining_seconds: u64::from(COUNTDOWN_SECONDS),
            paused: false,
            phase_tag: PhaseTag::Start,
        };
    };

    let at = entity.stopped_at.unwrap_or(now);
    let elapsed_seconds = effective_elapsed(
        start,
        entity.accumulated_pause_seconds,
        entity.pause_anchor,
        at,
    )
    .as_secs();

    ClockReading {
        started: true,
        elapsed_seconds,
        remaining_seconds: remaining_seconds(elapsed_seconds),
        paused: entity.pause_anchor.is_some(),
        phase_tag: phase_at(
            elapsed_seconds,
            entity.settings.mid_delay_seconds,
            entity.settings.late_delay_seconds,
        ),
    }
}
