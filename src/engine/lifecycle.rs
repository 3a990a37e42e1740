//! Event lifecycle: expiring the active event and surfacing the next due one.
//!
//! An active event holds the clock. The pause it caused is charged to the
//! match at exactly the event's duration, however late the expiring tick runs.

use std::time::{Duration, SystemTime};

use uuid::Uuid;

use crate::dao::models::MatchEntity;
use crate::engine::clock::effective_elapsed;
use crate::state::state_machine::MatchPhase;

/// What a tick changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Event that ended during this tick.
    pub expired: Option<Uuid>,
    /// Event that appeared during this tick.
    pub appeared: Option<Uuid>,
}

impl TickOutcome {
    /// Whether the match document needs to be written.
    pub fn changed(&self) -> bool {
        self.expired.is_some() || self.appeared.is_some()
    }
}

/// Advance the event lifecycle of a running match to `now`.
///
/// First the active event expires if its duration has passed, then, if no
/// event is active, the earliest due event that never appeared becomes
/// active. Matches that are not running, or were never launched, are left
/// untouched.
pub fn tick(entity: &mut MatchEntity, now: SystemTime) -> TickOutcome {
    let mut outcome = TickOutcome::default();
    if entity.phase != MatchPhase::Running {
        return outcome;
    }
    let Some(start) = entity.start_time else {
        return outcome;
    };

    if let Some(active) = entity.events.iter_mut().find(|event| event.is_active()) {
        let appeared_at = active.appeared_at.unwrap_or(now);
        let shown_for = now.duration_since(appeared_at).unwrap_or_default();
        if shown_for >= Duration::from_secs(u64::from(active.duration_seconds)) {
            active.ended_at = Some(now);
            entity.accumulated_pause_seconds += u64::from(active.duration_seconds);
            entity.pause_anchor = None;
            outcome.expired = Some(active.id);
        }
    }

    if entity.active_event().is_some() {
        return outcome;
    }

    let elapsed = effective_elapsed(
        start,
        entity.accumulated_pause_seconds,
        entity.pause_anchor,
        now,
    )
    .as_secs();

    let due = entity
        .events
        .iter_mut()
        .filter(|event| event.appeared_at.is_none())
        .filter(|event| u64::from(event.scheduled_at_seconds) <= elapsed)
        .min_by_key(|event| event.scheduled_at_seconds);

    if let Some(event) = due {
        event.appeared_at = Some(now);
        entity.pause_anchor = Some(now);
        outcome.appeared = Some(event.id);
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::{PhaseTag, ScheduledEventEntity};
    use crate::engine::clock;
    use crate::engine::test_support::{epoch, match_entity};

    fn instance(scheduled_at: u32, duration: u32) -> ScheduledEventEntity {
        ScheduledEventEntity {
            id: Uuid::new_v4(),
            event_id: format!("event-{scheduled_at}"),
            phase_tag: PhaseTag::Start,
            scheduled_at_seconds: scheduled_at,
            duration_seconds: duration,
            points: 150,
            text: "Hold the flag".into(),
            appeared_at: None,
            ended_at: None,
            winning_team: None,
        }
    }

    fn running(events: Vec<ScheduledEventEntity>) -> MatchEntity {
        let mut entity = match_entity(MatchPhase::Running);
        entity.start_time = Some(epoch(0));
        entity.events = events;
        entity
    }

    #[test]
    fn event_pauses_and_resumes_clock() {
        let mut entity = running(vec![instance(100, 60)]);
        let id = entity.events[0].id;

        assert_eq!(tick(&mut entity, epoch(99)), TickOutcome::default());

        let outcome = tick(&mut entity, epoch(100));
        assert_eq!(outcome.appeared, Some(id));
        assert_eq!(entity.pause_anchor, Some(epoch(100)));
        assert_eq!(clock::read(&entity, epoch(130)).elapsed_seconds, 100);

        let outcome = tick(&mut entity, epoch(165));
        assert_eq!(outcome.expired, Some(id));
        assert_eq!(outcome.appeared, None);
        assert_eq!(entity.accumulated_pause_seconds, 60);
        assert_eq!(entity.pause_anchor, None);
        assert_eq!(entity.events[0].ended_at, Some(epoch(165)));

        assert_eq!(clock::read(&entity, epoch(200)).elapsed_seconds, 140);
    }

    #[test]
    fn tick_is_idempotent_at_the_same_instant() {
        let mut entity = running(vec![instance(100, 60), instance(400, 45)]);

        tick(&mut entity, epoch(120));
        let snapshot = entity.clone();
        assert_eq!(tick(&mut entity, epoch(120)), TickOutcome::default());
        assert_eq!(entity, snapshot);
    }

    #[test]
    fn late_expiry_still_charges_exact_duration() {
        let mut entity = running(vec![instance(100, 60)]);
        tick(&mut entity, epoch(100));
        tick(&mut entity, epoch(300));
        assert_eq!(entity.accumulated_pause_seconds, 60);
    }

    #[test]
    fn at_most_one_event_is_active() {
        let mut entity = running(vec![instance(100, 60), instance(130, 60), instance(250, 30)]);

        for t in (0..1_000).step_by(7) {
            tick(&mut entity, epoch(t));
            let active = entity.events.iter().filter(|event| event.is_active()).count();
            assert!(active <= 1, "two events active at {t}");
            assert_eq!(entity.pause_anchor.is_some(), active == 1, "pause mismatch at {t}");
        }

        assert!(entity.events.iter().all(|event| event.ended_at.is_some()));
    }

    #[test]
    fn expiry_and_next_appearance_share_a_tick() {
        let mut entity = running(vec![instance(100, 60), instance(120, 30)]);
        tick(&mut entity, epoch(100));

        // Effective time at 160 is 100 + (160 - 100 - 60) = 100: the second event is not due yet.
        let outcome = tick(&mut entity, epoch(160));
        assert!(outcome.expired.is_some());
        assert_eq!(outcome.appeared, None);

        let outcome = tick(&mut entity, epoch(180));
        assert_eq!(outcome.appeared, Some(entity.events[1].id));
    }

    #[test]
    fn overdue_events_surface_in_schedule_order() {
        let mut entity = running(vec![instance(300, 10), instance(100, 10)]);
        let early = entity.events[1].id;

        let outcome = tick(&mut entity, epoch(500));
        assert_eq!(outcome.appeared, Some(early));
    }

    #[test]
    fn stopped_match_is_left_alone() {
        let mut entity = running(vec![instance(100, 60)]);
        entity.phase = MatchPhase::Stopped;
        assert_eq!(tick(&mut entity, epoch(500)), TickOutcome::default());
        assert!(entity.events[0].appeared_at.is_none());
    }
}
