use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::{MatchEntity, PhaseTag, ScheduledEventEntity, Team},
    dto::{format_system_time, phase::VisibleMatchPhase},
    engine::clock::ClockReading,
};

/// Countdown state at the time of the request.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClockSnapshot {
    pub started: bool,
    pub elapsed_seconds: u64,
    pub remaining_seconds: u64,
    /// True while an event holds the countdown.
    pub paused: bool,
    pub phase_tag: PhaseTag,
}

impl From<ClockReading> for ClockSnapshot {
    fn from(value: ClockReading) -> Self {
        Self {
            started: value.started,
            elapsed_seconds: value.elapsed_seconds,
            remaining_seconds: value.remaining_seconds,
            paused: value.paused,
            phase_tag: value.phase_tag,
        }
    }
}

/// Event that already surfaced on the timeline.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventSnapshot {
    pub id: Uuid,
    pub event_id: String,
    pub phase_tag: PhaseTag,
    pub scheduled_at_seconds: u32,
    pub duration_seconds: u32,
    pub points: u32,
    pub text: String,
    pub appeared_at: Option<String>,
    pub ended_at: Option<String>,
    /// Seconds until an active event expires.
    pub remaining_seconds: Option<u64>,
    pub winning_team: Option<Team>,
}

impl EventSnapshot {
    /// Project an instance as seen at `now`.
    pub fn at(event: &ScheduledEventEntity, now: SystemTime) -> Self {
        let remaining_seconds = match (event.appeared_at, event.ended_at) {
            (Some(appeared_at), None) => {
                let shown = now.duration_since(appeared_at).unwrap_or_default().as_secs();
                Some(u64::from(event.duration_seconds).saturating_sub(shown))
            }
            _ => None,
        };

        Self {
            id: event.id,
            event_id: event.event_id.clone(),
            phase_tag: event.phase_tag,
            scheduled_at_seconds: event.scheduled_at_seconds,
            duration_seconds: event.duration_seconds,
            points: event.points,
            text: event.text.clone(),
            appeared_at: event.appeared_at.map(format_system_time),
            ended_at: event.ended_at.map(format_system_time),
            remaining_seconds,
            winning_team: event.winning_team,
        }
    }
}

/// Countdown plus events that already surfaced; future events stay secret.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TimelineSnapshot {
    pub code: String,
    pub phase: VisibleMatchPhase,
    pub clock: ClockSnapshot,
    pub active_event: Option<EventSnapshot>,
    /// Ended events, oldest first.
    pub past_events: Vec<EventSnapshot>,
    /// Events still waiting to appear.
    pub upcoming_events: usize,
}

impl TimelineSnapshot {
    /// Build the timeline of a match from its clock reading at `now`.
    pub fn build(entity: &MatchEntity, clock: ClockReading, now: SystemTime) -> Self {
        let active_event = entity
            .active_event()
            .map(|event| EventSnapshot::at(event, now));
        let past_events = entity
            .events
            .iter()
            .filter(|event| event.ended_at.is_some())
            .map(|event| EventSnapshot::at(event, now))
            .collect();
        let upcoming_events = entity
            .events
            .iter()
            .filter(|event| event.appeared_at.is_none())
            .count();

        Self {
            code: entity.code.clone(),
            phase: (&entity.phase).into(),
            clock: clock.into(),
            active_event,
            past_events,
            upcoming_events,
        }
    }
}

/// Result of a lifecycle tick.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct TickResponse {
    /// Whether the tick changed the match.
    pub changed: bool,
    pub expired: Option<Uuid>,
    pub appeared: Option<Uuid>,
    pub timeline: TimelineSnapshot,
}

/// Payload crediting an event's points to a team.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AwardEventRequest {
    pub team: Team,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{
        clock,
        test_support::{epoch, match_entity},
    };
    use crate::state::state_machine::MatchPhase;

    fn instance(scheduled_at_seconds: u32) -> ScheduledEventEntity {
        ScheduledEventEntity {
            id: Uuid::new_v4(),
            event_id: format!("event-{scheduled_at_seconds}"),
            phase_tag: PhaseTag::Start,
            scheduled_at_seconds,
            duration_seconds: 60,
            points: 100,
            text: "Gather".into(),
            appeared_at: None,
            ended_at: None,
            winning_team: None,
        }
    }

    #[test]
    fn future_events_are_only_counted() {
        let mut entity = match_entity(MatchPhase::Running);
        entity.start_time = Some(epoch(0));
        let mut past = instance(40);
        past.appeared_at = Some(epoch(40));
        past.ended_at = Some(epoch(100));
        let mut active = instance(200);
        active.appeared_at = Some(epoch(260));
        entity.pause_anchor = Some(epoch(260));
        entity.accumulated_pause_seconds = 60;
        entity.events = vec![past, active, instance(500)];

        let now = epoch(280);
        let timeline = TimelineSnapshot::build(&entity, clock::read(&entity, now), now);

        assert_eq!(timeline.past_events.len(), 1);
        assert_eq!(timeline.upcoming_events, 1);
        let active = timeline.active_event.expect("active event");
        assert_eq!(active.remaining_seconds, Some(40));
        assert!(timeline.clock.paused);
        assert_eq!(timeline.clock.elapsed_seconds, 200);
    }
}
