//! Duel pairing.
//!
//! A duel mission is shared by two players of opposing teams, each one's text
//! naming the other. Pairing runs on the draws of one phase, after the
//! balancer and before placeholder resolution.

use std::collections::HashSet;

use rand::{Rng, seq::IndexedRandom};
use uuid::Uuid;

use crate::dao::models::{MissionDefinitionEntity, PlaceholderKind, PlayerEntity, Tier};
use crate::engine::balancer::{Draw, PriorTiers, TierPools};
use crate::engine::placeholder::{FALLBACK_NAME, substitute};

fn is_unresolved_duel(draw: &Draw) -> bool {
    draw.mission.placeholder == PlaceholderKind::Duel && draw.duel_partner_id.is_none()
}

fn not_a_duel(mission: &MissionDefinitionEntity) -> bool {
    mission.placeholder != PlaceholderKind::Duel
}

/// Unused non-duel mission, preferring the given tier.
fn replacement(spare: &mut TierPools, tier: Tier) -> Option<MissionDefinitionEntity> {
    spare.take_where(tier, not_a_duel).or_else(|| {
        Tier::ALL
            .into_iter()
            .find_map(|other| spare.take_where(other, not_a_duel))
    })
}

/// Pair every unresolved duel holder with an opponent.
///
/// The partner is drawn among opposing players not yet part of a duel who do
/// not already hold the duel's tier from an earlier phase. The partner's own
/// draw for the phase is swapped for the duel and returned to `spare`. A holder
/// with no possible partner gets an unused non-duel mission instead; if none
/// is left the duel stays with the fallback name.
pub fn pair<R: Rng + ?Sized>(
    draws: &mut Vec<Draw>,
    players: &[PlayerEntity],
    prior: &PriorTiers,
    spare: &mut TierPools,
    rng: &mut R,
) {
    let mut paired: HashSet<Uuid> = HashSet::new();
    let holders: Vec<Uuid> = draws
        .iter()
        .filter(|draw| is_unresolved_duel(draw))
        .map(|draw| draw.player_id)
        .collect();

    for holder_id in holders {
        if paired.contains(&holder_id) {
            continue;
        }
        let Some(index) = draws.iter().position(|draw| draw.player_id == holder_id) else {
            continue;
        };
        let Some(holder) = players.iter().find(|player| player.id == holder_id) else {
            continue;
        };
        let duel = draws[index].mission.clone();

        let candidates: Vec<&PlayerEntity> = players
            .iter()
            .filter(|other| Some(other.team) == holder.team.opponent())
            .filter(|other| !paired.contains(&other.id))
            .filter(|other| {
                prior
                    .get(&other.id)
                    .is_none_or(|held| !held.contains(&duel.tier))
            })
            .collect();

        let Some(partner) = candidates.choose(rng) else {
            match replacement(spare, duel.tier) {
                Some(mission) => {
                    draws[index].mission = mission;
                    draws[index].resolved_text = None;
                }
                None => {
                    draws[index].resolved_text =
                        Some(substitute(&duel.text_template, FALLBACK_NAME));
                }
            }
            continue;
        };

        let partner_draw = Draw {
            player_id: partner.id,
            mission: duel.clone(),
            resolved_text: Some(substitute(&duel.text_template, &holder.name)),
            duel_partner_id: Some(holder.id),
        };
        match draws.iter().position(|draw| draw.player_id == partner.id) {
            Some(partner_index) => {
                let displaced = std::mem::replace(&mut draws[partner_index], partner_draw);
                if not_a_duel(&displaced.mission) {
                    spare.give_back(displaced.mission);
                }
            }
            None => draws.push(partner_draw),
        }

        draws[index].resolved_text = Some(substitute(&duel.text_template, &partner.name));
        draws[index].duel_partner_id = Some(partner.id);
        paired.insert(holder.id);
        paired.insert(partner.id);
    }
}
