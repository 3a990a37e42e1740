use utoipa::OpenApi;

#[derive(OpenApi)]
/// OpenAPI document covering every Mission Rush route and schema.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::match_stream,
        crate::routes::matches::create_match,
        crate::routes::matches::get_match,
        crate::routes::matches::join_match,
        crate::routes::matches::pick_team,
        crate::routes::matches::update_settings,
        crate::routes::matches::missions,
        crate::routes::matches::choose_mission,
        crate::routes::matches::summary,
        crate::routes::creator::start_match,
        crate::routes::creator::launch_countdown,
        crate::routes::creator::stop_countdown,
        crate::routes::creator::begin_validation,
        crate::routes::creator::validate_mission,
        crate::routes::creator::advance_review,
        crate::routes::creator::draw_bonus,
        crate::routes::creator::award_event,
        crate::routes::creator::reset_match,
        crate::routes::timeline::tick,
        crate::routes::timeline::timeline,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::phase::VisibleMatchPhase,
            crate::dto::matches::MatchSettingsDto,
            crate::dto::matches::CreateMatchRequest,
            crate::dto::matches::JoinMatchRequest,
            crate::dto::matches::PickTeamRequest,
            crate::dto::matches::ResetRequest,
            crate::dto::matches::ResetTargetDto,
            crate::dto::matches::PlayerSummary,
            crate::dto::matches::MatchSummary,
            crate::dto::matches::SessionResponse,
            crate::dto::missions::MissionSummary,
            crate::dto::missions::OfferedMission,
            crate::dto::missions::OfferSummary,
            crate::dto::missions::MissionBoard,
            crate::dto::missions::ChooseMissionRequest,
            crate::dto::missions::ValidateMissionRequest,
            crate::dto::summary::TeamScore,
            crate::dto::summary::MatchScoreboard,
            crate::dto::timeline::ClockSnapshot,
            crate::dto::timeline::EventSnapshot,
            crate::dto::timeline::TimelineSnapshot,
            crate::dto::timeline::TickResponse,
            crate::dto::timeline::AwardEventRequest,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::MatchChangedEvent,
            crate::dto::sse::EventAppearedEvent,
            crate::dto::sse::EventEndedEvent,
            crate::dao::models::Team,
            crate::dao::models::Tier,
            crate::dao::models::PhaseTag,
            crate::dao::models::MissionMode,
            crate::dao::models::MissionVisibility,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "matches", description = "Lobby and match reads"),
        (name = "missions", description = "Mission board and choice-mode offers"),
        (name = "creator", description = "Creator-only match control"),
        (name = "timeline", description = "Countdown and timed events"),
    )
)]
pub struct ApiDoc;
