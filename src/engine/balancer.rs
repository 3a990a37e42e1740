//! Tier-balanced mission distribution.
//!
//! Over the three phases of a match every playing participant should hold one
//! mission of each tier. Each call serves one phase pool and is told which
//! tiers the players already hold.

use std::collections::HashMap;

use rand::{Rng, seq::SliceRandom};
use uuid::Uuid;

use crate::dao::models::{MissionDefinitionEntity, PlaceholderKind, PlayerEntity, Tier};

/// Tiers each player already holds from earlier phases.
pub type PriorTiers = HashMap<Uuid, Vec<Tier>>;

/// Mission drawn for a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draw {
    /// Holder of the mission.
    pub player_id: Uuid,
    /// Drawn definition.
    pub mission: MissionDefinitionEntity,
    /// Text with the name token substituted, once resolved.
    pub resolved_text: Option<String>,
    /// Duel partner, once paired.
    pub duel_partner_id: Option<Uuid>,
}

impl Draw {
    fn new(player_id: Uuid, mission: MissionDefinitionEntity) -> Self {
        Self {
            player_id,
            mission,
            resolved_text: None,
            duel_partner_id: None,
        }
    }
}

/// Choice-mode offer: several missions of one tier for a player to pick from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offer {
    /// Player the offer is addressed to.
    pub player_id: Uuid,
    /// Tier the offer was drawn for.
    pub tier: Tier,
    /// Offered definitions.
    pub missions: Vec<MissionDefinitionEntity>,
}

/// Phase pool split by tier, each tier shuffled once.
#[derive(Debug, Clone, Default)]
pub struct TierPools {
    pools: [Vec<MissionDefinitionEntity>; 3],
}

impl TierPools {
    /// Group and shuffle a pool.
    pub fn new<R, I>(pool: I, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
        I: IntoIterator<Item = MissionDefinitionEntity>,
    {
        let mut pools: [Vec<MissionDefinitionEntity>; 3] = Default::default();
        for mission in pool {
            pools[mission.tier.index()].push(mission);
        }
        for tier_pool in &mut pools {
            tier_pool.shuffle(rng);
        }
        Self { pools }
    }

    /// Whether at least one mission of the tier is left.
    pub fn has_supply(&self, tier: Tier) -> bool {
        !self.pools[tier.index()].is_empty()
    }

    /// Take the next mission of the tier.
    pub fn take(&mut self, tier: Tier) -> Option<MissionDefinitionEntity> {
        self.pools[tier.index()].pop()
    }

    /// Take the first mission of the tier matching a predicate.
    pub fn take_where<F>(&mut self, tier: Tier, predicate: F) -> Option<MissionDefinitionEntity>
    where
        F: Fn(&MissionDefinitionEntity) -> bool,
    {
        let pool = &mut self.pools[tier.index()];
        let position = pool.iter().rposition(predicate)?;
        Some(pool.remove(position))
    }

    /// Put a mission back so later draws can use it.
    pub fn give_back(&mut self, mission: MissionDefinitionEntity) {
        self.pools[mission.tier.index()].push(mission);
    }

    /// Every mission still in the pools.
    pub fn into_remaining(self) -> Vec<MissionDefinitionEntity> {
        self.pools.into_iter().flatten().collect()
    }
}

/// Tiers the player still lacks.
fn remaining_tiers(prior: &PriorTiers, player_id: Uuid) -> Vec<Tier> {
    let held = prior.get(&player_id).map(Vec::as_slice).unwrap_or_default();
    Tier::ALL
        .into_iter()
        .filter(|tier| !held.contains(tier))
        .collect()
}

/// Pick a tier for one player: the first missing tier, in random order, that
/// still has supply, falling back to any tier with supply.
fn pick_tier<R: Rng + ?Sized>(
    mut missing: Vec<Tier>,
    pools: &TierPools,
    rng: &mut R,
) -> Option<Tier> {
    missing.shuffle(rng);
    if let Some(tier) = missing.into_iter().find(|tier| pools.has_supply(*tier)) {
        return Some(tier);
    }

    let mut any = Tier::ALL.to_vec();
    any.shuffle(rng);
    any.into_iter().find(|tier| pools.has_supply(*tier))
}

/// Whether the player gets a mission in this call at all.
fn is_eligible(player: &PlayerEntity, prior: &PriorTiers) -> bool {
    player.team.is_playing() && !remaining_tiers(prior, player.id).is_empty()
}

/// Draw one mission per eligible player from a phase pool.
///
/// Players are served in the given order. A player with no missing tier, or
/// on no team, gets nothing. When the pool is exhausted the remaining players
/// get nothing either; callers detect that by comparing with the eligible set.
/// The returned pools hold what was left over.
pub fn assign<R: Rng + ?Sized>(
    players: &[PlayerEntity],
    pool: Vec<MissionDefinitionEntity>,
    prior: &PriorTiers,
    rng: &mut R,
) -> (Vec<Draw>, TierPools) {
    let mut pools = TierPools::new(pool, rng);
    let mut draws = Vec::with_capacity(players.len());

    for player in players.iter().filter(|player| is_eligible(player, prior)) {
        let missing = remaining_tiers(prior, player.id);
        let Some(tier) = pick_tier(missing, &pools, rng) else {
            continue;
        };
        if let Some(mission) = pools.take(tier) {
            draws.push(Draw::new(player.id, mission));
        }
    }

    (draws, pools)
}

/// Build choice-mode offers of up to `size` missions per eligible player.
///
/// The tier is picked the same way as in [`assign`]; when that tier runs short
/// the offer is topped up from the other tiers. Duel missions are never
/// offered since they need a partner at deal time.
pub fn offer<R: Rng + ?Sized>(
    players: &[PlayerEntity],
    pool: Vec<MissionDefinitionEntity>,
    prior: &PriorTiers,
    size: usize,
    rng: &mut R,
) -> Vec<Offer> {
    let pool = pool
        .into_iter()
        .filter(|mission| mission.placeholder != PlaceholderKind::Duel);
    let mut pools = TierPools::new(pool, rng);
    let mut offers = Vec::with_capacity(players.len());

    for player in players.iter().filter(|player| is_eligible(player, prior)) {
        let missing = remaining_tiers(prior, player.id);
        let Some(tier) = pick_tier(missing, &pools, rng) else {
            continue;
        };

        let mut missions = Vec::with_capacity(size);
        while missions.len() < size {
            let Some(mission) = pools.take(tier) else {
                break;
            };
            missions.push(mission);
        }

        let mut others = Tier::ALL.to_vec();
        others.shuffle(rng);
        for other in others.into_iter().filter(|other| *other != tier) {
            while missions.len() < size {
                let Some(mission) = pools.take(other) else {
                    break;
                };
                missions.push(mission);
            }
        }

        offers.push(Offer {
            player_id: player.id,
            tier,
            missions,
        });
    }

    offers
}

/// Players that should have received a mission in a call but did not.
pub fn unserved<'a>(
    players: &'a [PlayerEntity],
    prior: &PriorTiers,
    served: impl Fn(Uuid) -> bool,
) -> Vec<&'a PlayerEntity> {
    players
        .iter()
        .filter(|player| is_eligible(player, prior))
        .filter(|player| !served(player.id))
        .collect()
}
