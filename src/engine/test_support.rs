use std::time::{Duration, SystemTime};

use uuid::Uuid;

use crate::dao::models::{
    MatchEntity, MatchSettingsEntity, MissionDefinitionEntity, MissionMode, MissionVisibility,
    PhaseTag, PlaceholderKind, PlayerEntity, Team, Tier,
};
use crate::state::state_machine::MatchPhase;

pub fn epoch(seconds: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(seconds)
}

pub fn player(name: &str, team: Team) -> PlayerEntity {
    PlayerEntity {
        id: Uuid::new_v4(),
        name: name.into(),
        team,
        token: format!("token-{name}"),
        joined_at: epoch(0),
    }
}

pub fn mission(
    id: &str,
    phase_tag: PhaseTag,
    tier: Tier,
    placeholder: PlaceholderKind,
) -> MissionDefinitionEntity {
    let text_template = match placeholder {
        PlaceholderKind::None => format!("Mission {id}"),
        _ => format!("Mission {id} with {{player}}"),
    };
    MissionDefinitionEntity {
        id: id.into(),
        phase_tag,
        tier,
        points: tier.points(),
        text_template,
        is_private: false,
        placeholder,
    }
}

/// `per_tier` plain missions for every phase and tier.
pub fn catalog(per_tier: usize) -> Vec<MissionDefinitionEntity> {
    let mut missions = Vec::new();
    for phase in PhaseTag::ALL {
        for tier in Tier::ALL {
            for n in 0..per_tier {
                missions.push(mission(
                    &format!("{phase:?}-{tier:?}-{n}").to_lowercase(),
                    phase,
                    tier,
                    PlaceholderKind::None,
                ));
            }
        }
    }
    missions
}

pub fn settings() -> MatchSettingsEntity {
    MatchSettingsEntity {
        max_events: 4,
        mid_delay_seconds: 300,
        late_delay_seconds: 600,
        mission_mode: MissionMode::Auto,
        visibility: MissionVisibility::Team,
        map: "park".into(),
        victory_bonus_enabled: true,
    }
}

pub fn match_entity(phase: MatchPhase) -> MatchEntity {
    let creator = player("creator", Team::Red);
    MatchEntity {
        id: Uuid::new_v4(),
        code: "ABC123".into(),
        version: 0,
        phase,
        creator_id: creator.id,
        settings: settings(),
        start_time: None,
        accumulated_pause_seconds: 0,
        pause_anchor: None,
        stopped_at: None,
        players: vec![creator],
        assignments: Vec::new(),
        offers: Vec::new(),
        events: Vec::new(),
        victory: None,
        created_at: epoch(0),
        updated_at: epoch(0),
    }
}
