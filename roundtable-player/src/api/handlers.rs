//! HTTP request handlers

use crate::api::server::AppContext;
use crate::backend::VoiceServerState;
use crate::error::Error;
use crate::playback::{BackendEvent, OverrideMode, QueueSnapshot};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use roundtable_common::events::SubmitMode;
use roundtable_common::{ChannelId, GuildId, Item, Participant, ParticipantId, Track};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    active_sessions: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    guild_id: GuildId,
    voice_channel_id: ChannelId,
    text_channel_id: ChannelId,
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    sessions: Vec<GuildId>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    guild_id: GuildId,
    voice_channel_id: ChannelId,
    text_channel_id: ChannelId,
    queue: QueueSnapshot,
}

/// Either a resolved track or free text/URL to resolve, never both
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    participant: Participant,
    #[serde(default)]
    track: Option<Track>,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    mode: SubmitMode,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    status: String,
    entry_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    status: String,
    removed: usize,
}

type ApiError = (StatusCode, Json<StatusResponse>);
type ApiResult<T> = Result<T, ApiError>;

fn error_response(e: Error) -> ApiError {
    let status = match &e {
        Error::NoSuchSession(_) | Error::NoMatches(_) => StatusCode::NOT_FOUND,
        Error::AlreadyActive(_) => StatusCode::CONFLICT,
        Error::BadRequest(_) => StatusCode::BAD_REQUEST,
        Error::Common(roundtable_common::Error::InvalidInput(_)) => StatusCode::BAD_REQUEST,
        Error::TransportJoinFailed { .. }
        | Error::PlaybackStartFailed { .. }
        | Error::LoadFailed(_)
        | Error::Backend(_)
        | Error::Gateway(_)
        | Error::Http(_) => StatusCode::BAD_GATEWAY,
        Error::Config(_) | Error::Common(_) | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        warn!("Request failed: {}", e);
    } else {
        debug!("Request rejected: {}", e);
    }
    (
        status,
        Json(StatusResponse {
            status: format!("error: {}", e),
        }),
    )
}

fn parse_id<T>(raw: &str) -> ApiResult<T>
where
    T: std::str::FromStr<Err = roundtable_common::Error>,
{
    raw.parse::<T>().map_err(|e| error_response(e.into()))
}

fn ok() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
    })
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "roundtable-player".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_sessions: ctx.controller.active_sessions().await.len(),
    })
}

// ============================================================================
// Session Endpoints
// ============================================================================

/// GET /sessions - Guilds with a live session
pub async fn list_sessions(State(ctx): State<AppContext>) -> Json<SessionListResponse> {
    Json(SessionListResponse {
        sessions: ctx.controller.active_sessions().await,
    })
}

/// POST /sessions - Join voice and open a session
pub async fn create_session(
    State(ctx): State<AppContext>,
    Json(req): Json<CreateSessionRequest>,
) -> ApiResult<(StatusCode, Json<StatusResponse>)> {
    info!(guild_id = %req.guild_id, "Create session request");
    ctx.controller
        .create_session(req.guild_id, req.voice_channel_id, req.text_channel_id)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, ok()))
}

/// GET /sessions/:guild_id - Session details and queue snapshot
pub async fn get_session(
    State(ctx): State<AppContext>,
    Path(guild_id): Path<String>,
) -> ApiResult<Json<SessionResponse>> {
    let guild_id: GuildId = parse_id(&guild_id)?;
    let session = ctx
        .controller
        .get_session(guild_id)
        .await
        .map_err(error_response)?;
    let queue = ctx
        .controller
        .snapshot(guild_id)
        .await
        .map_err(error_response)?;

    Ok(Json(SessionResponse {
        guild_id,
        voice_channel_id: session.voice_channel_id(),
        text_channel_id: session.text_channel_id(),
        queue,
    }))
}

/// DELETE /sessions/:guild_id - Forced stop
pub async fn destroy_session(
    State(ctx): State<AppContext>,
    Path(guild_id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let guild_id: GuildId = parse_id(&guild_id)?;
    info!(%guild_id, "Destroy session request");
    ctx.controller
        .destroy(guild_id)
        .await
        .map_err(error_response)?;
    Ok(ok())
}

// ============================================================================
// Queue Endpoints
// ============================================================================

/// POST /sessions/:guild_id/queue - Submit a track or a query
pub async fn submit(
    State(ctx): State<AppContext>,
    Path(guild_id): Path<String>,
    Json(req): Json<SubmitRequest>,
) -> ApiResult<Json<SubmitResponse>> {
    let guild_id: GuildId = parse_id(&guild_id)?;

    let entry_ids = match (req.track, req.query) {
        (Some(track), None) => {
            let item = Item::new(track, req.participant);
            let entry_id = match req.mode {
                SubmitMode::Queue => ctx.controller.submit(guild_id, item).await,
                SubmitMode::PlayNext => {
                    ctx.controller
                        .submit_override(guild_id, item, OverrideMode::PlayNext)
                        .await
                }
                SubmitMode::PlayNow => {
                    ctx.controller
                        .submit_override(guild_id, item, OverrideMode::PlayNow)
                        .await
                }
            }
            .map_err(error_response)?;
            vec![entry_id]
        }
        (None, Some(query)) => ctx
            .controller
            .submit_query(guild_id, req.participant, &query, req.mode)
            .await
            .map_err(error_response)?,
        _ => {
            return Err(error_response(Error::BadRequest(
                "exactly one of 'track' or 'query' is required".to_string(),
            )))
        }
    };

    Ok(Json(SubmitResponse {
        status: "ok".to_string(),
        entry_ids,
    }))
}

/// POST /sessions/:guild_id/skip - Abandon the current item
pub async fn skip(
    State(ctx): State<AppContext>,
    Path(guild_id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let guild_id: GuildId = parse_id(&guild_id)?;
    ctx.controller.skip(guild_id).await.map_err(error_response)?;
    Ok(ok())
}

/// DELETE /sessions/:guild_id/participants/:participant_id - Drop a queue
pub async fn clear_participant(
    State(ctx): State<AppContext>,
    Path((guild_id, participant_id)): Path<(String, String)>,
) -> ApiResult<Json<ClearResponse>> {
    let guild_id: GuildId = parse_id(&guild_id)?;
    let participant_id: ParticipantId = parse_id(&participant_id)?;
    let removed = ctx
        .controller
        .clear_participant(guild_id, participant_id)
        .await
        .map_err(error_response)?;
    Ok(Json(ClearResponse {
        status: "ok".to_string(),
        removed,
    }))
}

// ============================================================================
// Collaborator Callbacks
// ============================================================================

/// POST /sessions/:guild_id/voice - Voice credentials from the gateway
pub async fn update_voice(
    State(ctx): State<AppContext>,
    Path(guild_id): Path<String>,
    Json(voice): Json<VoiceServerState>,
) -> ApiResult<Json<StatusResponse>> {
    let guild_id: GuildId = parse_id(&guild_id)?;
    ctx.controller
        .update_voice(guild_id, voice)
        .await
        .map_err(error_response)?;
    Ok(ok())
}

/// POST /backend/events - Audio node lifecycle event
///
/// Node messages other than `op: "event"` (ready, stats, player updates) are
/// accepted and ignored.
pub async fn backend_event(
    State(ctx): State<AppContext>,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<StatusCode> {
    if let Some(op) = body.get("op").and_then(|op| op.as_str()) {
        if op != "event" {
            debug!(op, "Ignoring non-event node message");
            return Ok(StatusCode::NO_CONTENT);
        }
    }

    let event: BackendEvent = serde_json::from_value(body)
        .map_err(|e| error_response(Error::BadRequest(format!("unrecognized event: {}", e))))?;
    debug!(guild_id = %event.guild_id(), ?event, "Backend event");

    ctx.controller
        .handle_backend_event(event)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}
