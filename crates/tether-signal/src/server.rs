//! HTTP and WebSocket server

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use tether_core::{Admission, Handoff, Meeting, MEETING_TTL};

use crate::auth::require_admin;
use crate::error::ApiError;
use crate::relay::ws_handler;
use crate::state::AppState;

/// Page that opens the relay socket for an admitted visitor
pub const CALL_PAGE: &str = "/call.html";

/// Jitsi URL fragment applied to hand-offs
const JITSI_OPTIONS: &str = "#config.prejoinPageEnabled=true\
&config.startWithAudioMuted=false\
&config.startWithVideoMuted=true\
&interfaceConfig.DISABLE_VIDEO_BACKGROUND=true";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteResponse {
    pub token: String,
    pub url: String,
    pub meeting_id: String,
    pub meeting_expires_at: u64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub meetings: usize,
    pub tokens: usize,
    pub rooms: usize,
    pub peers: usize,
}

/// Build the router (shared between the binary and tests)
pub fn build_router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        .route("/", get(admin_console))
        .route("/healthz", get(healthz))
        .route("/stats", get(stats))
        .route("/admin/meetings", post(create_meeting))
        .route("/admin/meetings/{id}/invite", post(invite))
        .route("/r/{token}", get(join))
        .route("/ws", get(ws_handler));

    let router = match &state.config.server.public_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Run the server until ctrl-c
pub async fn serve(state: Arc<AppState>) -> std::io::Result<()> {
    let addr = SocketAddr::new(state.config.server.bind, state.config.server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Tether listening on {}", listener.local_addr()?);

    if state.admin_secret().is_none() {
        warn!("ADMIN_SECRET not set; admin API disabled");
    }

    if let Some(secs) = state.config.access.sweep_interval_secs.filter(|s| *s > 0) {
        spawn_sweeper(state.clone(), Duration::from_secs(secs));
    }

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

/// Periodically purge expired meetings and tokens
pub fn spawn_sweeper(state: Arc<AppState>, every: Duration) -> tokio::task::JoinHandle<()> {
    info!("Expiry sweep every {:?}", every);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            state.gate.sweep(state.now());
        }
    })
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}

async fn admin_console() -> Html<&'static str> {
    Html(include_str!("../assets/admin.html"))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        meetings: state.gate.meetings().len(),
        tokens: state.gate.tokens().len(),
        rooms: state.rooms.room_count(),
        peers: state.rooms.peer_count(),
    })
}

async fn create_meeting(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Meeting>, ApiError> {
    require_admin(state.admin_secret(), &headers)?;

    let meeting = state.gate.meetings().create(
        state.now(),
        MEETING_TTL,
        state.config.access.max_participants,
    )?;
    Ok(Json(meeting))
}

async fn invite(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<InviteResponse>, ApiError> {
    require_admin(state.admin_secret(), &headers)?;

    let (token, meeting) = state.gate.invite(&id, state.now())?;
    Ok(Json(InviteResponse {
        url: format!("{}/r/{}", state.config.server.public_url, token.value),
        token: token.value,
        meeting_id: meeting.meeting_id,
        meeting_expires_at: meeting.expires_at,
    }))
}

async fn join(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    let admission = state.gate.admit(&token, state.now())?;
    Ok(handoff(&state.config.server.handoff, &admission))
}

fn handoff(mode: &Handoff, admission: &Admission) -> Response {
    match mode {
        Handoff::Signaling => {
            let location = format!("{}?t={}", CALL_PAGE, admission.token);
            (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
        }
        Handoff::Jitsi { base_url } => {
            let url = format!(
                "{}/{}{}",
                base_url.trim_end_matches('/'),
                admission.room,
                JITSI_OPTIONS
            );
            Html(format!(
                "<!DOCTYPE html><html><body><h1>Redirecting...</h1>\
                 <a href=\"{url}\">Join meeting</a>\
                 <script>location='{url}'</script></body></html>"
            ))
            .into_response()
        }
    }
}
