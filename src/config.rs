//! Application-level configuration loading, including the seed mission and event catalogs.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::dao::models::{
    EventDefinitionEntity, MatchSettingsEntity, MissionDefinitionEntity, MissionMode,
    MissionVisibility, PhaseTag, PlaceholderKind, Tier,
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "MISSION_RUSH_CONFIG_PATH";
const DEFAULT_CHOICE_SIZE: usize = 3;
const DEFAULT_DRIVER_INTERVAL_MS: u64 = 1_000;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Mission definitions seeded into the store at startup.
    pub missions: Vec<MissionDefinitionEntity>,
    /// Event definitions seeded into the store at startup.
    pub events: Vec<EventDefinitionEntity>,
    /// Number of missions offered per phase in choice mode.
    pub choice_size: usize,
    /// Period of the per-match background tick.
    pub driver_interval: Duration,
    /// Settings a freshly created match starts with.
    pub default_settings: MatchSettingsEntity,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        missions = app_config.missions.len(),
                        events = app_config.events.len(),
                        "loaded catalog from config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            missions: default_missions(),
            events: default_events(),
            choice_size: DEFAULT_CHOICE_SIZE,
            driver_interval: Duration::from_millis(DEFAULT_DRIVER_INTERVAL_MS),
            default_settings: default_settings(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
///
/// Every key is optional; missing keys keep their built-in value.
struct RawConfig {
    missions: Option<Vec<MissionDefinitionEntity>>,
    events: Option<Vec<EventDefinitionEntity>>,
    choice_size: Option<usize>,
    driver_interval_ms: Option<u64>,
    default_settings: Option<MatchSettingsEntity>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            missions: value.missions.unwrap_or(defaults.missions),
            events: value.events.unwrap_or(defaults.events),
            choice_size: value.choice_size.filter(|size| *size > 0).unwrap_or(defaults.choice_size),
            driver_interval: value
                .driver_interval_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.driver_interval),
            default_settings: value.default_settings.unwrap_or(defaults.default_settings),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn default_settings() -> MatchSettingsEntity {
    MatchSettingsEntity {
        max_events: 5,
        mid_delay_seconds: 400,
        late_delay_seconds: 800,
        mission_mode: MissionMode::Auto,
        visibility: MissionVisibility::Team,
        map: "city-park".into(),
        victory_bonus_enabled: true,
    }
}

fn mission(
    id: &str,
    phase_tag: PhaseTag,
    tier: Tier,
    placeholder: PlaceholderKind,
    is_private: bool,
    text: &str,
) -> MissionDefinitionEntity {
    MissionDefinitionEntity {
        id: id.into(),
        phase_tag,
        tier,
        points: tier.points(),
        text_template: text.into(),
        is_private,
        placeholder,
    }
}

/// Built-in mission catalog shipped with the binary.
fn default_missions() -> Vec<MissionDefinitionEntity> {
    use PhaseTag::{Late, Mid, Start};
    use PlaceholderKind::{Any, Duel, None, Opponent, Teammate};
    use Tier::{Easy, Hard, Medium};

    vec![
        mission("start-easy-wave", Start, Easy, Opponent, false, "Get {player} to wave back at you"),
        mission("start-easy-highfive", Start, Easy, Teammate, false, "High-five {player} without saying a word"),
        mission("start-easy-count", Start, Easy, None, true, "Count the benches on the map"),
        mission("start-medium-name", Start, Medium, Duel, false, "Make {player} say your name first"),
        mission("start-medium-follow", Start, Medium, Any, false, "Walk behind {player} for one minute unnoticed"),
        mission("start-medium-photo", Start, Medium, None, false, "Take a picture of something red"),
        mission("start-hard-swap", Start, Hard, Opponent, true, "Swap an object with {player}"),
        mission("start-hard-song", Start, Hard, None, false, "Get two strangers to hum the same song"),
        mission("start-hard-riddle", Start, Hard, Duel, false, "Solve a riddle before {player} does"),
        mission("mid-easy-laugh", Mid, Easy, Any, false, "Make {player} laugh"),
        mission("mid-easy-shoes", Mid, Easy, None, false, "Find someone wearing green shoes"),
        mission("mid-easy-secret", Mid, Easy, Teammate, true, "Whisper a fake secret to {player}"),
        mission("mid-medium-race", Mid, Medium, Duel, false, "Reach the fountain before {player}"),
        mission("mid-medium-word", Mid, Medium, Opponent, false, "Get {player} to say the word banana"),
        mission("mid-medium-map", Mid, Medium, None, false, "Draw the map from memory"),
        mission("mid-hard-disguise", Mid, Hard, None, true, "Change one item of clothing unnoticed"),
        mission("mid-hard-bargain", Mid, Hard, Opponent, false, "Convince {player} to give you a point"),
        mission("mid-hard-stare", Mid, Hard, Duel, false, "Win a staring contest against {player}"),
        mission("late-easy-cheer", Late, Easy, Teammate, false, "Start a cheer with {player}"),
        mission("late-easy-sit", Late, Easy, None, false, "Sit on three different benches"),
        mission("late-easy-guess", Late, Easy, Any, false, "Guess the favourite color of {player}"),
        mission("late-medium-duel", Late, Medium, Duel, false, "Beat {player} at rock paper scissors"),
        mission("late-medium-echo", Late, Medium, Opponent, false, "Make {player} repeat your sentence"),
        mission("late-medium-tree", Late, Medium, None, true, "Touch the oldest tree on the map"),
        mission("late-hard-alliance", Late, Hard, Opponent, false, "Form a fake alliance with {player}"),
        mission("late-hard-final", Late, Hard, Duel, false, "Finish a puzzle before {player}"),
        mission("late-hard-vanish", Late, Hard, None, false, "Stay out of sight for three minutes"),
    ]
}

fn event(
    id: &str,
    phase_tag: PhaseTag,
    min_players: Option<u32>,
    duration_seconds: u32,
    points: u32,
    text: &str,
) -> EventDefinitionEntity {
    EventDefinitionEntity {
        id: id.into(),
        phase_tag,
        min_players,
        duration_seconds,
        points,
        text: text.into(),
    }
}

/// Built-in event catalog shipped with the binary.
fn default_events() -> Vec<EventDefinitionEntity> {
    use PhaseTag::{Late, Mid, Start};

    vec![
        event("start-rally", Start, None, 60, 100, "Every team gathers at the entrance"),
        event("start-chain", Start, Some(6), 90, 150, "Form a human chain across the path"),
        event("start-photo", Start, None, 60, 100, "Team photo in front of a statue"),
        event("mid-relay", Mid, None, 120, 200, "Relay race around the pond"),
        event("mid-silence", Mid, None, 60, 150, "First team to stay silent for a minute"),
        event("mid-pyramid", Mid, Some(8), 120, 250, "Build a human pyramid"),
        event("late-treasure", Late, None, 120, 300, "Find the hidden token"),
        event("late-choir", Late, Some(6), 90, 200, "Sing the team anthem together"),
        event("late-sprint", Late, None, 60, 250, "Sprint to the map corner"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_covers_every_phase_and_tier() {
        let config = AppConfig::default();
        for phase in PhaseTag::ALL {
            for tier in Tier::ALL {
                let count = config
                    .missions
                    .iter()
                    .filter(|m| m.phase_tag == phase && m.tier == tier)
                    .count();
                assert_eq!(count, 3, "{phase:?}/{tier:?}");
            }
            assert!(config.events.iter().any(|e| e.phase_tag == phase));
        }
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let raw: RawConfig =
            serde_json::from_str(r#"{ "choice_size": 5, "driver_interval_ms": 250 }"#).unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.choice_size, 5);
        assert_eq!(config.driver_interval, Duration::from_millis(250));
        assert_eq!(config.missions.len(), 27);
        assert_eq!(config.default_settings.late_delay_seconds, 800);
    }

    #[test]
    fn catalog_entries_parse_from_json() {
        let raw: RawConfig = serde_json::from_str(
            r#"{
                "events": [{
                    "id": "custom",
                    "phase_tag": "MID",
                    "min_players": null,
                    "duration_seconds": 45,
                    "points": 100,
                    "text": "Hop on one foot"
                }],
                "choice_size": 0
            }"#,
        )
        .unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.events.len(), 1);
        assert_eq!(config.events[0].phase_tag, PhaseTag::Mid);
        assert_eq!(config.choice_size, DEFAULT_CHOICE_SIZE);
    }
}
