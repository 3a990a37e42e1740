//! Team totals and the end-of-match victory bonus.

use indexmap::IndexMap;
use rand::Rng;

use crate::dao::models::{MatchEntity, Team};

/// Bonus values and their relative weights.
pub const BONUS_TABLE: [(u32, u32); 6] = [
    (0, 15),
    (100, 20),
    (200, 20),
    (300, 20),
    (400, 15),
    (500, 10),
];

/// Draw a bonus value from [`BONUS_TABLE`].
pub fn draw_bonus<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    let total: u32 = BONUS_TABLE.iter().map(|(_, weight)| weight).sum();
    let mut pick = rng.random_range(0..total);
    for (value, weight) in BONUS_TABLE {
        if pick < weight {
            return value;
        }
        pick -= weight;
    }
    0
}

/// Points per playing team: validated missions plus won events, plus the
/// victory bonus once recorded.
pub fn team_totals(entity: &MatchEntity) -> IndexMap<Team, u32> {
    let mut totals: IndexMap<Team, u32> = Team::PLAYING.into_iter().map(|team| (team, 0)).collect();

    for assignment in &entity.assignments {
        let Some(team) = entity.player(assignment.player_id).map(|player| player.team) else {
            continue;
        };
        if let Some(total) = totals.get_mut(&team) {
            *total += assignment.points_earned;
        }
    }

    for event in &entity.events {
        if let Some(total) = event.winning_team.and_then(|team| totals.get_mut(&team)) {
            *total += event.points;
        }
    }

    if let Some(victory) = &entity.victory {
        if let Some(total) = victory.winner.and_then(|team| totals.get_mut(&team)) {
            *total += victory.bonus_points;
        }
    }

    totals
}

/// Team strictly ahead of every other, `None` on a tie.
pub fn leader(totals: &IndexMap<Team, u32>) -> Option<Team> {
    let best = totals.values().copied().max()?;
    let mut leaders = totals.iter().filter(|(_, total)| **total == best);
    let (team, _) = leaders.next()?;
    match leaders.next() {
        Some(_) => None,
        None => Some(*team),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::{
        MissionAssignmentEntity, PhaseTag, PlaceholderKind, ScheduledEventEntity, Tier,
        VictoryEntity,
    };
    use crate::engine::test_support::{match_entity, player};
    use crate::state::state_machine::MatchPhase;
    use rand::{SeedableRng, rngs::StdRng};
    use uuid::Uuid;

    fn earned(player_id: Uuid, points: u32) -> MissionAssignmentEntity {
        MissionAssignmentEntity {
            id: Uuid::new_v4(),
            player_id,
            mission_id: "m".into(),
            phase_tag: PhaseTag::Start,
            tier: Tier::Easy,
            points,
            text: "Mission".into(),
            is_private: false,
            placeholder: PlaceholderKind::None,
            resolved_text: None,
            duel_partner_id: None,
            validated: Some(points > 0),
            points_earned: points,
        }
    }

    #[test]
    fn bonus_values_come_from_the_table() {
        let mut rng = StdRng::seed_from_u64(99);
        let allowed: Vec<u32> = BONUS_TABLE.iter().map(|(value, _)| *value).collect();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..2_000 {
            let value = draw_bonus(&mut rng);
            assert!(allowed.contains(&value));
            seen.insert(value);
        }
        assert_eq!(seen.len(), allowed.len());
    }

    #[test]
    fn bonus_draws_follow_the_table_weights() {
        const DRAWS: u32 = 10_000;
        let mut rng = StdRng::seed_from_u64(7);
        let mut counts: IndexMap<u32, u32> = IndexMap::new();
        for _ in 0..DRAWS {
            *counts.entry(draw_bonus(&mut rng)).or_default() += 1;
        }

        for (value, weight) in BONUS_TABLE {
            let share = f64::from(counts.get(&value).copied().unwrap_or(0)) / f64::from(DRAWS);
            let expected = f64::from(weight) / 100.0;
            assert!(
                (share - expected).abs() < 0.03,
                "bonus {value}: drawn {share:.3}, expected {expected:.2}"
            );
        }
    }

    #[test]
    fn totals_add_missions_events_and_bonus() {
        let mut entity = match_entity(MatchPhase::Completed);
        let blue = player("blue", Team::Blue);
        let red_id = entity.players[0].id;
        entity.players.push(blue.clone());
        entity.assignments = vec![earned(red_id, 200), earned(blue.id, 300), earned(red_id, 0)];
        entity.events = vec![ScheduledEventEntity {
            id: Uuid::new_v4(),
            event_id: "e".into(),
            phase_tag: PhaseTag::Mid,
            scheduled_at_seconds: 400,
            duration_seconds: 60,
            points: 150,
            text: "Event".into(),
            appeared_at: None,
            ended_at: None,
            winning_team: Some(Team::Red),
        }];

        let totals = team_totals(&entity);
        assert_eq!(totals[&Team::Red], 350);
        assert_eq!(totals[&Team::Blue], 300);
        assert_eq!(leader(&totals), Some(Team::Red));

        entity.victory = Some(VictoryEntity {
            winner: Some(Team::Red),
            bonus_points: 400,
        });
        assert_eq!(team_totals(&entity)[&Team::Red], 750);
    }

    #[test]
    fn tie_has_no_leader() {
        let totals: IndexMap<Team, u32> = [(Team::Red, 200), (Team::Blue, 200)].into_iter().collect();
        assert_eq!(leader(&totals), None);
    }
}
