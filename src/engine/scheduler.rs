//! Event timeline scheduling.
//!
//! Offsets are whole seconds of effective time. Each phase owns a half-open
//! slice of the countdown; placements avoid a guard band around the phase
//! boundaries and keep a minimum distance from each other.

use std::collections::HashSet;

use rand::Rng;

use crate::dao::models::{EventDefinitionEntity, PhaseTag};
use crate::engine::clock::COUNTDOWN_SECONDS;

/// Events never fire during the first seconds after launch.
pub const START_OFFSET_SECONDS: u32 = 30;
/// Width of the band centred on each phase boundary where nothing is placed.
pub const BOUNDARY_GUARD_SECONDS: u32 = 30;
/// Two placed events are always at least this far apart.
pub const MIN_EVENT_SPACING_SECONDS: u32 = 120;

/// Half-open interval of seconds `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: u32,
    end: u32,
}

impl Span {
    fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    fn len(self) -> u32 {
        self.end.saturating_sub(self.start)
    }
}

/// Remove `cut` from every span, splitting where needed.
fn subtract(spans: &[Span], cut: Span) -> Vec<Span> {
    let mut out = Vec::with_capacity(spans.len() + 1);
    for &span in spans {
        if cut.end <= span.start || cut.start >= span.end {
            out.push(span);
            continue;
        }
        if cut.start > span.start {
            out.push(Span::new(span.start, cut.start));
        }
        if cut.end < span.end {
            out.push(Span::new(cut.end, span.end));
        }
    }
    out
}

fn measure(spans: &[Span]) -> u64 {
    spans.iter().map(|span| u64::from(span.len())).sum()
}

/// Uniform draw over the union of `spans`: a span is chosen with probability
/// proportional to its length, then a second inside it.
fn sample<R: Rng + ?Sized>(spans: &[Span], rng: &mut R) -> Option<u32> {
    let total = measure(spans);
    if total == 0 {
        return None;
    }

    let mut pick = rng.random_range(0..total);
    for span in spans {
        let len = u64::from(span.len());
        if pick < len {
            return u32::try_from(pick).ok().map(|offset| span.start + offset);
        }
        pick -= len;
    }
    None
}

/// Event slot chosen on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Offset in seconds of effective time.
    pub scheduled_at: u32,
    /// Phase slice the slot was drawn from.
    pub phase: PhaseTag,
}

/// Per-phase slices, clipped to the countdown.
fn phase_slices(mid_delay: u32, late_delay: u32) -> [Span; 3] {
    let ceiling = COUNTDOWN_SECONDS + 1;
    [
        Span::new(START_OFFSET_SECONDS, mid_delay.min(ceiling)),
        Span::new(mid_delay, late_delay.min(ceiling)),
        Span::new(late_delay, ceiling),
    ]
}

fn boundary_guards(mid_delay: u32, late_delay: u32) -> [Span; 2] {
    let half = BOUNDARY_GUARD_SECONDS / 2;
    [
        Span::new(mid_delay.saturating_sub(half), mid_delay + half),
        Span::new(late_delay.saturating_sub(half), late_delay + half),
    ]
}

/// Cut around a placed slot: every second strictly closer than the spacing.
fn spacing_guard(at: u32) -> Span {
    let reach = MIN_EVENT_SPACING_SECONDS - 1;
    Span::new(at.saturating_sub(reach), at + reach + 1)
}

/// Choose up to `max_events` slots on the timeline.
///
/// When at least three events are requested every phase with room gets one
/// first, the phase with the least room left going first. Remaining slots go to the phase with the fewest placements, ties
/// broken uniformly at random. Placement stops early once no phase has room
/// left. The result is sorted by offset, ties kept in placement order.
pub fn schedule<R: Rng + ?Sized>(
    max_events: u32,
    mid_delay: u32,
    late_delay: u32,
    rng: &mut R,
) -> Vec<Slot> {
    let slices = phase_slices(mid_delay, late_delay);
    let guards = boundary_guards(mid_delay, late_delay);
    let target = max_events as usize;

    let mut placed: Vec<Slot> = Vec::with_capacity(target);
    let mut counts = [0usize; 3];

    let available = |index: usize, placed: &[Slot]| -> Vec<Span> {
        let mut spans = vec![slices[index]];
        for guard in guards {
            spans = subtract(&spans, guard);
        }
        for slot in placed {
            spans = subtract(&spans, spacing_guard(slot.scheduled_at));
        }
        spans
    };

    if max_events >= 3 {
        // Phase with the least room left goes first; ties keep phase order.
        let mut pending: Vec<usize> = (0..slices.len()).collect();
        while !pending.is_empty() {
            let Some((position, spans)) = pending
                .iter()
                .enumerate()
                .map(|(position, &index)| (position, available(index, &placed)))
                .min_by_key(|(_, spans)| measure(spans))
            else {
                break;
            };
            let index = pending.remove(position);
            if let Some(scheduled_at) = sample(&spans, rng) {
                placed.push(Slot {
                    scheduled_at,
                    phase: PhaseTag::ALL[index],
                });
                counts[index] += 1;
            }
        }
    }

    while placed.len() < target {
        let open: Vec<(usize, Vec<Span>)> = (0..slices.len())
            .map(|index| (index, available(index, &placed)))
            .filter(|(_, spans)| measure(spans) > 0)
            .collect();

        let Some(fewest) = open.iter().map(|(index, _)| counts[*index]).min() else {
            break;
        };
        let tied: Vec<&(usize, Vec<Span>)> = open
            .iter()
            .filter(|(index, _)| counts[*index] == fewest)
            .collect();

        let (index, spans) = tied[rng.random_range(0..tied.len())];
        let Some(scheduled_at) = sample(spans, rng) else {
            break;
        };
        placed.push(Slot {
            scheduled_at,
            phase: PhaseTag::ALL[*index],
        });
        counts[*index] += 1;
    }

    placed.sort_by_key(|slot| slot.scheduled_at);
    placed
}

/// Pair each slot with an event definition for its phase.
///
/// A definition is eligible when its phase matches and the match has at least
/// its minimum player count. Each definition is used at most once per match;
/// slots left without an eligible definition are dropped.
pub fn assign_definitions<'a, R: Rng + ?Sized>(
    slots: &[Slot],
    catalog: &'a [EventDefinitionEntity],
    player_count: u32,
    rng: &mut R,
) -> Vec<(Slot, &'a EventDefinitionEntity)> {
    let mut used: HashSet<&str> = HashSet::new();
    let mut out = Vec::with_capacity(slots.len());

    for slot in slots {
        let eligible: Vec<&EventDefinitionEntity> = catalog
            .iter()
            .filter(|definition| definition.phase_tag == slot.phase)
            .filter(|definition| definition.min_players.is_none_or(|min| player_count >= min))
            .filter(|definition| !used.contains(definition.id.as_str()))
            .collect();

        if eligible.is_empty() {
            continue;
        }
        let definition = eligible[rng.random_range(0..eligible.len())];
        used.insert(definition.id.as_str());
        out.push((*slot, definition));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn slice_of(slot: &Slot, mid: u32, late: u32) -> Span {
        phase_slices(mid, late)[slot.phase.index()]
    }

    fn assert_valid(slots: &[Slot], max_events: u32, mid: u32, late: u32) {
        assert!(slots.len() <= max_events as usize);

        for pair in slots.windows(2) {
            assert!(pair[0].scheduled_at <= pair[1].scheduled_at, "not sorted: {slots:?}");
        }

        for (i, a) in slots.iter().enumerate() {
            let slice = slice_of(a, mid, late);
            assert!(
                a.scheduled_at >= slice.start && a.scheduled_at < slice.end,
                "{a:?} outside its slice {slice:?}"
            );
            for boundary in [mid, late] {
                let half = BOUNDARY_GUARD_SECONDS / 2;
                assert!(
                    a.scheduled_at + half < boundary || a.scheduled_at >= boundary + half,
                    "{a:?} inside boundary guard at {boundary}"
                );
            }
            for b in &slots[i + 1..] {
                assert!(
                    a.scheduled_at.abs_diff(b.scheduled_at) >= MIN_EVENT_SPACING_SECONDS,
                    "{a:?} and {b:?} too close"
                );
            }
        }
    }

    #[test]
    fn four_events_cover_every_phase() {
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let slots = schedule(4, 300, 600, &mut rng);
            assert_valid(&slots, 4, 300, 600);
            assert_eq!(slots.len(), 4, "seed {seed}: {slots:?}");

            let mut counts = [0usize; 3];
            for slot in &slots {
                counts[slot.phase.index()] += 1;
            }
            assert!(counts.iter().all(|&count| count >= 1), "seed {seed}: {counts:?}");
            let spread = counts.iter().max().unwrap() - counts.iter().min().unwrap();
            assert!(spread <= 1, "seed {seed}: {counts:?}");
        }
    }

    #[test]
    fn tight_middle_phase_still_gets_its_event() {
        for seed in 0..500 {
            let mut rng = StdRng::seed_from_u64(seed);
            let slots = schedule(3, 300, 360, &mut rng);
            assert_valid(&slots, 3, 300, 360);
            assert_eq!(slots.len(), 3, "seed {seed}: {slots:?}");
            for phase in PhaseTag::ALL {
                assert!(
                    slots.iter().any(|slot| slot.phase == phase),
                    "seed {seed}: no {phase:?} event in {slots:?}"
                );
            }
        }
    }

    #[test]
    fn impossible_layout_skips_silently() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let slots = schedule(3, 60, 120, &mut rng);
            assert_valid(&slots, 3, 60, 120);
            // START and MID rooms are closer than the spacing; only one can hold an event.
            let early = slots
                .iter()
                .filter(|slot| slot.phase != PhaseTag::Late)
                .count();
            assert_eq!(early, 1, "seed {seed}: {slots:?}");
        }
    }

    #[test]
    fn zero_events_schedule_nothing() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(schedule(0, 300, 600, &mut rng).is_empty());
    }

    #[test]
    fn fewer_than_three_skip_the_mandatory_pass() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let slots = schedule(2, 300, 600, &mut rng);
            assert_valid(&slots, 2, 300, 600);
            assert_eq!(slots.len(), 2);
            assert_ne!(slots[0].phase, slots[1].phase, "seed {seed}: {slots:?}");
        }
    }

    #[test]
    fn oversized_request_stops_when_timeline_is_full() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let slots = schedule(50, 300, 600, &mut rng);
            assert_valid(&slots, 50, 300, 600);
            assert!(slots.len() < 50);
            // 1170 usable seconds with 120 spacing can never hold more than ten.
            assert!(slots.len() <= 10);
        }
    }

    #[test]
    fn slices_past_the_countdown_are_clipped() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let slots = schedule(6, 900, 1500, &mut rng);
            assert_valid(&slots, 6, 900, 1500);
            assert!(slots.iter().all(|slot| slot.scheduled_at <= COUNTDOWN_SECONDS));
            assert!(slots.iter().all(|slot| slot.phase != PhaseTag::Late));
        }
    }

    #[test]
    fn subtract_splits_and_trims() {
        let spans = vec![Span::new(0, 100)];
        assert_eq!(
            subtract(&spans, Span::new(40, 60)),
            vec![Span::new(0, 40), Span::new(60, 100)]
        );
        assert!(subtract(&spans, Span::new(0, 100)).is_empty());
        assert_eq!(subtract(&spans, Span::new(90, 200)), vec![Span::new(0, 90)]);
        assert_eq!(subtract(&spans, Span::new(200, 300)), spans);
    }

    #[test]
    fn spacing_guard_keeps_exactly_min_distance() {
        let guard = spacing_guard(500);
        assert_eq!(guard.start, 381);
        assert_eq!(guard.end, 620);
    }

    fn event(id: &str, phase_tag: PhaseTag, min_players: Option<u32>) -> EventDefinitionEntity {
        EventDefinitionEntity {
            id: id.into(),
            phase_tag,
            min_players,
            duration_seconds: 60,
            points: 150,
            text: format!("Event {id}"),
        }
    }

    #[test]
    fn definitions_respect_phase_and_player_count() {
        let catalog = vec![
            event("start-a", PhaseTag::Start, None),
            event("start-big", PhaseTag::Start, Some(8)),
            event("mid-a", PhaseTag::Mid, Some(2)),
        ];
        let slots = vec![
            Slot { scheduled_at: 100, phase: PhaseTag::Start },
            Slot { scheduled_at: 250, phase: PhaseTag::Start },
            Slot { scheduled_at: 400, phase: PhaseTag::Mid },
            Slot { scheduled_at: 800, phase: PhaseTag::Late },
        ];

        let mut rng = StdRng::seed_from_u64(1);
        let assigned = assign_definitions(&slots, &catalog, 4, &mut rng);
        let ids: Vec<(u32, &str)> = assigned
            .iter()
            .map(|(slot, definition)| (slot.scheduled_at, definition.id.as_str()))
            .collect();

        assert_eq!(ids, vec![(100, "start-a"), (400, "mid-a")]);
    }
}
