//! Who may read which mission.

use crate::dao::models::{MissionAssignmentEntity, MissionVisibility, PhaseTag, PlayerEntity};
use crate::state::state_machine::MatchPhase;

/// Whether missions of `phase_tag` are revealed yet.
///
/// START missions are known as soon as missions are dealt; later ones show up
/// once the countdown reaches their phase. After the countdown stops every
/// mission is revealed.
pub fn is_revealed(phase_tag: PhaseTag, match_phase: &MatchPhase, clock_phase: PhaseTag) -> bool {
    match match_phase {
        MatchPhase::TeamSelect => false,
        MatchPhase::Started => phase_tag == PhaseTag::Start,
        MatchPhase::Running => phase_tag <= clock_phase,
        MatchPhase::Stopped | MatchPhase::Validating(_) | MatchPhase::Completed => true,
    }
}

/// Whether `viewer` may read a mission held by `owner`.
///
/// Holders always see their own missions. Once the countdown has stopped, or
/// when the viewer is the creator reviewing, every mission is readable.
pub fn can_view(
    viewer: &PlayerEntity,
    owner: &PlayerEntity,
    assignment: &MissionAssignmentEntity,
    mode: MissionVisibility,
    match_phase: &MatchPhase,
) -> bool {
    if viewer.id == owner.id {
        return true;
    }
    if matches!(
        match_phase,
        MatchPhase::Stopped | MatchPhase::Validating(_) | MatchPhase::Completed
    ) {
        return true;
    }
    if assignment.is_private {
        return false;
    }

    match mode {
        MissionVisibility::All => true,
        MissionVisibility::Team => viewer.team.is_playing() && viewer.team == owner.team,
        MissionVisibility::Hidden => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::{PlaceholderKind, Team, Tier};
    use crate::engine::test_support::player;
    use uuid::Uuid;

    fn assignment(owner: &PlayerEntity, is_private: bool) -> MissionAssignmentEntity {
        MissionAssignmentEntity {
            id: Uuid::new_v4(),
            player_id: owner.id,
            mission_id: "m".into(),
            phase_tag: PhaseTag::Start,
            tier: Tier::Easy,
            points: 100,
            text: "Mission".into(),
            is_private,
            placeholder: PlaceholderKind::None,
            resolved_text: None,
            duel_partner_id: None,
            validated: None,
            points_earned: 0,
        }
    }

    #[test]
    fn later_phases_reveal_with_the_clock() {
        assert!(is_revealed(PhaseTag::Start, &MatchPhase::Started, PhaseTag::Start));
        assert!(!is_revealed(PhaseTag::Mid, &MatchPhase::Started, PhaseTag::Start));
        assert!(!is_revealed(PhaseTag::Late, &MatchPhase::Running, PhaseTag::Mid));
        assert!(is_revealed(PhaseTag::Mid, &MatchPhase::Running, PhaseTag::Mid));
        assert!(is_revealed(PhaseTag::Late, &MatchPhase::Stopped, PhaseTag::Start));
    }

    #[test]
    fn team_mode_hides_other_side_and_private_missions() {
        let ana = player("ana", Team::Red);
        let ben = player("ben", Team::Red);
        let cid = player("cid", Team::Blue);
        let public = assignment(&ben, false);
        let secret = assignment(&ben, true);
        let running = MatchPhase::Running;

        assert!(can_view(&ana, &ben, &public, MissionVisibility::Team, &running));
        assert!(!can_view(&cid, &ben, &public, MissionVisibility::Team, &running));
        assert!(!can_view(&ana, &ben, &secret, MissionVisibility::Team, &running));
        assert!(can_view(&ben, &ben, &secret, MissionVisibility::Hidden, &running));
        assert!(can_view(&cid, &ben, &public, MissionVisibility::All, &running));
        assert!(!can_view(&ana, &ben, &public, MissionVisibility::Hidden, &running));
    }

    #[test]
    fn everything_opens_after_the_countdown() {
        let ana = player("ana", Team::Red);
        let cid = player("cid", Team::Blue);
        let secret = assignment(&cid, true);
        assert!(can_view(&ana, &cid, &secret, MissionVisibility::Hidden, &MatchPhase::Completed));
    }
}
