//! Name substitution in mission texts.

use rand::{Rng, seq::IndexedRandom};

use crate::dao::models::{MissionDefinitionEntity, PlaceholderKind, PlayerEntity};

/// Token replaced by a player name in mission templates.
pub const NAME_TOKEN: &str = "{player}";
/// Used when nobody fits the placeholder.
pub const FALLBACK_NAME: &str = "a player of your choice";

/// Replace the name token in a template.
pub fn substitute(template: &str, name: &str) -> String {
    template.replace(NAME_TOKEN, name)
}

/// Players the placeholder may refer to, from the holder's point of view.
fn candidates<'a>(
    kind: PlaceholderKind,
    holder: &PlayerEntity,
    players: &'a [PlayerEntity],
) -> Vec<&'a PlayerEntity> {
    let others = players
        .iter()
        .filter(|other| other.id != holder.id && other.team.is_playing());

    match kind {
        PlaceholderKind::None => Vec::new(),
        PlaceholderKind::Teammate => others.filter(|other| other.team == holder.team).collect(),
        PlaceholderKind::Opponent | PlaceholderKind::Duel => others
            .filter(|other| Some(other.team) == holder.team.opponent())
            .collect(),
        PlaceholderKind::Any => others.collect(),
    }
}

/// Resolve the text of a mission for its holder.
///
/// Returns `None` when the mission has no placeholder or its template has no
/// name token. Otherwise a fitting player is drawn at random, or
/// [`FALLBACK_NAME`] is used when nobody fits.
pub fn resolve<R: Rng + ?Sized>(
    mission: &MissionDefinitionEntity,
    holder: &PlayerEntity,
    players: &[PlayerEntity],
    rng: &mut R,
) -> Option<String> {
    if mission.placeholder == PlaceholderKind::None || !mission.text_template.contains(NAME_TOKEN)
    {
        return None;
    }

    let pool = candidates(mission.placeholder, holder, players);
    let name = pool
        .choose(rng)
        .map(|player| player.name.as_str())
        .unwrap_or(FALLBACK_NAME);

    Some(substitute(&mission.text_template, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::{PhaseTag, Team, Tier};
    use crate::engine::test_support::{mission, player};
    use rand::{SeedableRng, rngs::StdRng};

    fn roster() -> Vec<PlayerEntity> {
        vec![
            player("ana", Team::Red),
            player("ben", Team::Red),
            player("cid", Team::Blue),
            player("dot", Team::None),
        ]
    }

    fn resolve_for(kind: PlaceholderKind, holder: usize, players: &[PlayerEntity]) -> Option<String> {
        let definition = mission("m", PhaseTag::Start, Tier::Easy, kind);
        let mut rng = StdRng::seed_from_u64(42);
        resolve(&definition, &players[holder], players, &mut rng)
    }

    #[test]
    fn plain_missions_stay_unresolved() {
        let players = roster();
        assert_eq!(resolve_for(PlaceholderKind::None, 0, &players), None);
    }

    #[test]
    fn template_without_token_stays_unresolved() {
        let players = roster();
        let mut definition = mission("m", PhaseTag::Start, Tier::Easy, PlaceholderKind::Any);
        definition.text_template = "Sing a song".into();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(resolve(&definition, &players[0], &players, &mut rng), None);
    }

    #[test]
    fn teammate_is_from_own_team() {
        let players = roster();
        assert_eq!(
            resolve_for(PlaceholderKind::Teammate, 0, &players).as_deref(),
            Some("Mission m with ben")
        );
    }

    #[test]
    fn opponent_is_from_other_team() {
        let players = roster();
        assert_eq!(
            resolve_for(PlaceholderKind::Opponent, 1, &players).as_deref(),
            Some("Mission m with cid")
        );
    }

    #[test]
    fn any_never_names_holder_or_spectators() {
        let players = roster();
        for seed in 0..30 {
            let definition = mission("m", PhaseTag::Start, Tier::Easy, PlaceholderKind::Any);
            let mut rng = StdRng::seed_from_u64(seed);
            let text = resolve(&definition, &players[2], &players, &mut rng).unwrap();
            assert!(text.ends_with("ana") || text.ends_with("ben"), "{text}");
        }
    }

    #[test]
    fn lonely_holder_gets_fallback_phrase() {
        let players = vec![player("solo", Team::Blue)];
        assert_eq!(
            resolve_for(PlaceholderKind::Teammate, 0, &players).as_deref(),
            Some("Mission m with a player of your choice")
        );
    }
}
