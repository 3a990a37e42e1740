//! Dealing missions for a whole match at start or restart.

use std::collections::HashSet;

use rand::Rng;
use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::{
    MissionAssignmentEntity, MissionDefinitionEntity, MissionMode, MissionOfferEntity, PhaseTag,
    PlayerEntity, Team,
};
use crate::engine::balancer::{self, PriorTiers};
use crate::engine::{duel, placeholder};

/// Reasons a deal cannot be made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DealError {
    /// Both sides need at least one player.
    #[error("each team needs at least one player")]
    NotEnoughPlayers,
    /// The catalog cannot serve every player for a phase.
    #[error("not enough {phase:?} missions: {missing} player(s) left without one")]
    Exhausted {
        /// Phase whose pool ran dry.
        phase: PhaseTag,
        /// Players left unserved.
        missing: usize,
    },
}

/// Missions dealt to the players of a match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deal {
    /// Missions handed out directly.
    pub assignments: Vec<MissionAssignmentEntity>,
    /// Choice-mode offers awaiting a pick.
    pub offers: Vec<MissionOfferEntity>,
}

/// Build an assignment from a catalog definition.
pub fn assignment_for(
    player_id: Uuid,
    mission: &MissionDefinitionEntity,
    resolved_text: Option<String>,
    duel_partner_id: Option<Uuid>,
) -> MissionAssignmentEntity {
    MissionAssignmentEntity {
        id: Uuid::new_v4(),
        player_id,
        mission_id: mission.id.clone(),
        phase_tag: mission.phase_tag,
        tier: mission.tier,
        points: mission.points,
        text: mission.text_template.clone(),
        is_private: mission.is_private,
        placeholder: mission.placeholder,
        resolved_text,
        duel_partner_id,
        validated: None,
        points_earned: 0,
    }
}

fn ensure_served(
    players: &[PlayerEntity],
    prior: &PriorTiers,
    phase: PhaseTag,
    served: impl Fn(Uuid) -> bool,
) -> Result<(), DealError> {
    let missing = balancer::unserved(players, prior, served).len();
    if missing > 0 {
        return Err(DealError::Exhausted { phase, missing });
    }
    Ok(())
}

/// Deal missions for the START, MID, and LATE pools in turn.
///
/// Each definition is handed out at most once per match. In auto mode every
/// playing participant gets one mission per phase, duels are paired, and
/// placeholders resolved. In choice mode every playing participant gets an
/// offer per phase instead. Running out of missions for any phase fails the
/// whole deal.
pub fn deal<R: Rng + ?Sized>(
    players: &[PlayerEntity],
    catalog: &[MissionDefinitionEntity],
    mode: MissionMode,
    choice_size: usize,
    rng: &mut R,
) -> Result<Deal, DealError> {
    if Team::PLAYING
        .iter()
        .any(|team| !players.iter().any(|player| player.team == *team))
    {
        return Err(DealError::NotEnoughPlayers);
    }

    let mut prior = PriorTiers::new();
    let mut used: HashSet<String> = HashSet::new();
    let mut deal = Deal::default();

    for phase in PhaseTag::ALL {
        let pool: Vec<MissionDefinitionEntity> = catalog
            .iter()
            .filter(|mission| mission.phase_tag == phase && !used.contains(&mission.id))
            .cloned()
            .collect();

        match mode {
            MissionMode::Auto => {
                let (mut draws, mut spare) = balancer::assign(players, pool, &prior, rng);
                ensure_served(players, &prior, phase, |id| {
                    draws.iter().any(|draw| draw.player_id == id)
                })?;
                duel::pair(&mut draws, players, &prior, &mut spare, rng);

                for draw in draws {
                    let resolved_text = match draw.resolved_text {
                        Some(text) => Some(text),
                        None => players
                            .iter()
                            .find(|player| player.id == draw.player_id)
                            .and_then(|holder| {
                                placeholder::resolve(&draw.mission, holder, players, rng)
                            }),
                    };
                    used.insert(draw.mission.id.clone());
                    prior
                        .entry(draw.player_id)
                        .or_default()
                        .push(draw.mission.tier);
                    deal.assignments.push(assignment_for(
                        draw.player_id,
                        &draw.mission,
                        resolved_text,
                        draw.duel_partner_id,
                    ));
                }
            }
            MissionMode::Choice => {
                let offers = balancer::offer(players, pool, &prior, choice_size, rng);
                ensure_served(players, &prior, phase, |id| {
                    offers
                        .iter()
                        .any(|offer| offer.player_id == id && !offer.missions.is_empty())
                })?;

                for offer in offers {
                    used.extend(offer.missions.iter().map(|mission| mission.id.clone()));
                    prior.entry(offer.player_id).or_default().push(offer.tier);
                    deal.offers.push(MissionOfferEntity {
                        player_id: offer.player_id,
                        phase_tag: phase,
                        tier: offer.tier,
                        missions: offer.missions,
                    });
                }
            }
        }
    }

    Ok(deal)
}

/// Whether `mission` may be picked from `offer`.
///
/// Later offers were built assuming the player takes the offer's tier, so
/// top-up missions of other tiers only count once that tier is absent.
pub fn is_selectable(offer: &MissionOfferEntity, mission: &MissionDefinitionEntity) -> bool {
    mission.tier == offer.tier || offer.missions.iter().all(|other| other.tier != offer.tier)
}

/// Turn one offered mission into an assignment for the offer's player.
///
/// Returns `None` when the mission is not part of the offer or not selectable.
pub fn accept_offer<R: Rng + ?Sized>(
    offer: &MissionOfferEntity,
    mission_id: &str,
    holder: &PlayerEntity,
    players: &[PlayerEntity],
    rng: &mut R,
) -> Option<MissionAssignmentEntity> {
    let mission = offer
        .missions
        .iter()
        .find(|mission| mission.id == mission_id)
        .filter(|mission| is_selectable(offer, mission))?;
    let resolved_text = placeholder::resolve(mission, holder, players, rng);
    Some(assignment_for(holder.id, mission, resolved_text, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::{PlaceholderKind, Tier};
    use crate::engine::test_support::{catalog, mission, player};
    use rand::{SeedableRng, rngs::StdRng};

    fn roster() -> Vec<PlayerEntity> {
        vec![
            player("ana", Team::Red),
            player("ben", Team::Blue),
            player("cid", Team::Red),
            player("dot", Team::Blue),
            player("eve", Team::None),
        ]
    }

    fn rich_catalog() -> Vec<MissionDefinitionEntity> {
        let mut missions = catalog(6);
        for phase in PhaseTag::ALL {
            let prefix = format!("{phase:?}").to_lowercase();
            missions.push(mission(&format!("{prefix}-duel"), phase, Tier::Medium, PlaceholderKind::Duel));
            missions.push(mission(&format!("{prefix}-mate"), phase, Tier::Easy, PlaceholderKind::Teammate));
            missions.push(mission(&format!("{prefix}-foe"), phase, Tier::Hard, PlaceholderKind::Opponent));
        }
        missions
    }

    #[test]
    fn auto_deal_gives_one_mission_per_phase_and_tier() {
        let players = roster();
        let catalog = rich_catalog();

        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let deal = deal(&players, &catalog, MissionMode::Auto, 3, &mut rng).unwrap();
            assert!(deal.offers.is_empty());

            for player in &players {
                let mut held: Vec<&MissionAssignmentEntity> = deal
                    .assignments
                    .iter()
                    .filter(|assignment| assignment.player_id == player.id)
                    .collect();

                if !player.team.is_playing() {
                    assert!(held.is_empty());
                    continue;
                }

                held.sort_by_key(|assignment| assignment.phase_tag);
                let phases: Vec<PhaseTag> = held.iter().map(|a| a.phase_tag).collect();
                assert_eq!(phases, PhaseTag::ALL.to_vec(), "seed {seed}");

                let mut tiers: Vec<Tier> = held.iter().map(|a| a.tier).collect();
                tiers.sort();
                assert_eq!(tiers, Tier::ALL.to_vec(), "seed {seed}");
            }
        }
    }

    #[test]
    fn auto_deal_pairs_duels_and_resolves_names() {
        let players = roster();
        let catalog = rich_catalog();

        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let deal = deal(&players, &catalog, MissionMode::Auto, 3, &mut rng).unwrap();

            for assignment in &deal.assignments {
                match assignment.placeholder {
                    PlaceholderKind::None => assert!(assignment.resolved_text.is_none()),
                    _ => {
                        let text = assignment.resolved_text.as_deref().unwrap();
                        assert!(!text.contains(placeholder::NAME_TOKEN), "{text}");
                    }
                }

                if let Some(partner_id) = assignment.duel_partner_id {
                    let partner = deal
                        .assignments
                        .iter()
                        .find(|other| {
                            other.player_id == partner_id && other.mission_id == assignment.mission_id
                        })
                        .unwrap();
                    assert_eq!(partner.duel_partner_id, Some(assignment.player_id));
                }
            }

            let ids: Vec<&str> = deal
                .assignments
                .iter()
                .filter(|assignment| assignment.duel_partner_id.is_none())
                .map(|assignment| assignment.mission_id.as_str())
                .collect();
            let unique: HashSet<&str> = ids.iter().copied().collect();
            assert_eq!(ids.len(), unique.len(), "seed {seed}: definition reused");
        }
    }

    #[test]
    fn choice_deal_offers_instead_of_assigning() {
        let players = roster();
        let mut rng = StdRng::seed_from_u64(4);
        let deal = deal(&players, &rich_catalog(), MissionMode::Choice, 3, &mut rng).unwrap();

        assert!(deal.assignments.is_empty());
        assert_eq!(deal.offers.len(), 4 * 3);
        for offer in &deal.offers {
            assert!(!offer.missions.is_empty());
            assert!(offer.missions.iter().all(|m| m.placeholder != PlaceholderKind::Duel));
            assert!(offer.missions.iter().all(|m| m.phase_tag == offer.phase_tag));
        }
    }

    #[test]
    fn one_sided_lobby_cannot_be_dealt() {
        let players = vec![player("ana", Team::Red), player("eve", Team::None)];
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            deal(&players, &catalog(3), MissionMode::Auto, 3, &mut rng),
            Err(DealError::NotEnoughPlayers)
        );
    }

    #[test]
    fn exhausted_phase_fails_the_deal() {
        let players = roster();
        let start_only: Vec<MissionDefinitionEntity> = catalog(3)
            .into_iter()
            .filter(|mission| mission.phase_tag == PhaseTag::Start)
            .collect();

        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            deal(&players, &start_only, MissionMode::Auto, 3, &mut rng),
            Err(DealError::Exhausted {
                phase: PhaseTag::Mid,
                missing: 4,
            })
        );
    }

    #[test]
    fn accepted_offer_becomes_assignment() {
        let ana = player("ana", Team::Red);
        let ben = player("ben", Team::Blue);
        let players = vec![ana.clone(), ben.clone()];
        let offer = MissionOfferEntity {
            player_id: ana.id,
            phase_tag: PhaseTag::Start,
            tier: Tier::Hard,
            missions: vec![
                mission("a", PhaseTag::Start, Tier::Hard, PlaceholderKind::Opponent),
                mission("b", PhaseTag::Start, Tier::Hard, PlaceholderKind::None),
            ],
        };

        let mut rng = StdRng::seed_from_u64(0);
        let assignment = accept_offer(&offer, "a", &ana, &players, &mut rng).unwrap();
        assert_eq!(assignment.player_id, ana.id);
        assert_eq!(assignment.points, 300);
        assert_eq!(assignment.resolved_text.as_deref(), Some("Mission a with ben"));

        assert!(accept_offer(&offer, "zzz", &ana, &players, &mut rng).is_none());
    }

    #[test]
    fn top_up_missions_wait_for_the_offered_tier_to_run_out() {
        let ana = player("ana", Team::Red);
        let ben = player("ben", Team::Blue);
        let players = vec![ana.clone(), ben.clone()];
        let mut offer = MissionOfferEntity {
            player_id: ana.id,
            phase_tag: PhaseTag::Mid,
            tier: Tier::Medium,
            missions: vec![
                mission("medium", PhaseTag::Mid, Tier::Medium, PlaceholderKind::None),
                mission("easy", PhaseTag::Mid, Tier::Easy, PlaceholderKind::None),
            ],
        };

        let mut rng = StdRng::seed_from_u64(0);
        assert!(accept_offer(&offer, "easy", &ana, &players, &mut rng).is_none());
        let taken = accept_offer(&offer, "medium", &ana, &players, &mut rng).unwrap();
        assert_eq!(taken.tier, Tier::Medium);

        offer.missions.remove(0);
        let fallback = accept_offer(&offer, "easy", &ana, &players, &mut rng).unwrap();
        assert_eq!(fallback.tier, Tier::Easy);
    }

    #[test]
    fn choice_picks_follow_the_offered_tier() {
        let players = roster();
        let catalog = rich_catalog();

        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let deal = deal(&players, &catalog, MissionMode::Choice, 3, &mut rng).unwrap();

            for offer in &deal.offers {
                let holder = players.iter().find(|p| p.id == offer.player_id).unwrap();
                for mission in &offer.missions {
                    let accepted = accept_offer(offer, &mission.id, holder, &players, &mut rng);
                    match accepted {
                        Some(assignment) => assert_eq!(assignment.tier, offer.tier, "seed {seed}"),
                        None => assert_ne!(mission.tier, offer.tier, "seed {seed}"),
                    }
                }
            }
        }
    }
}
