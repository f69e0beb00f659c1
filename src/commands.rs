use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::warn;

use crate::config::save_config_to;
use crate::error::BracketError;
use crate::participants::{Participant, ParticipantPatch};
use crate::tournament::{Command, Tournament};
use crate::types::{AppConfig, BoardServerState, CrownChampionRequest, ParticipantId, RecordWinRequest};
use crate::view::{build_bracket_view, BracketView};

type CommandResult<T> = Result<Json<T>, (StatusCode, String)>;

// ── Helpers ─────────────────────────────────────────────────────────────

fn reject(err: BracketError) -> (StatusCode, String) {
    warn!("rejected command: {err}");
    let status = match err {
        BracketError::UnknownParticipant(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, err.to_string())
}

fn internal(message: String) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, message)
}

fn current_config(state: &BoardServerState) -> Result<AppConfig, (StatusCode, String)> {
    let guard = state.config.lock().map_err(|e| internal(e.to_string()))?;
    Ok(guard.clone())
}

/// Lock the session and run `f` against it. The lock is what keeps
/// commands from interleaving.
fn with_tournament<F, R>(state: &BoardServerState, f: F) -> Result<R, (StatusCode, String)>
where
    F: FnOnce(&mut Tournament) -> Result<R, BracketError>,
{
    let mut guard = state.tournament.lock().map_err(|e| internal(e.to_string()))?;
    f(&mut guard).map_err(reject)
}

/// Run `command`, then render the bracket as it stands afterwards.
fn apply_and_render(state: &BoardServerState, command: Command) -> CommandResult<BracketView> {
    let config = current_config(state)?;
    let view = with_tournament(state, |tournament| {
        tournament.apply(command)?;
        Ok(build_bracket_view(tournament.registry(), tournament.bracket(), &config))
    })?;
    Ok(Json(view))
}

// ── Handlers ────────────────────────────────────────────────────────────

pub async fn get_state_json(State(state): State<BoardServerState>) -> impl IntoResponse {
    let config = current_config(&state).unwrap_or_default();
    let view = {
        let guard = state.tournament.lock().unwrap_or_else(|e| e.into_inner());
        build_bracket_view(guard.registry(), guard.bracket(), &config)
    };
    let body = serde_json::to_string(&view).unwrap_or_else(|_| "{}".to_string());
    (
        [
            ("Content-Type", "application/json"),
            ("Cache-Control", "no-store"),
            ("Pragma", "no-cache"),
            ("Expires", "0"),
        ],
        body,
    )
}

pub async fn list_participants(State(state): State<BoardServerState>) -> CommandResult<Vec<Participant>> {
    let roster = with_tournament(&state, |tournament| Ok(tournament.registry().all().to_vec()))?;
    Ok(Json(roster))
}

pub async fn update_participant(
    State(state): State<BoardServerState>,
    Path(id): Path<ParticipantId>,
    Json(patch): Json<ParticipantPatch>,
) -> CommandResult<Participant> {
    let updated = with_tournament(&state, |tournament| tournament.update_participant(id, patch))?;
    Ok(Json(updated))
}

pub async fn record_win(
    State(state): State<BoardServerState>,
    Json(request): Json<RecordWinRequest>,
) -> CommandResult<BracketView> {
    apply_and_render(
        &state,
        Command::RecordWin {
            side: request.side,
            round: request.round,
            match_index: request.match_index,
            winner_id: request.winner_id,
        },
    )
}

pub async fn crown_champion(
    State(state): State<BoardServerState>,
    Json(request): Json<CrownChampionRequest>,
) -> CommandResult<BracketView> {
    apply_and_render(
        &state,
        Command::CrownChampion {
            participant_id: request.participant_id,
        },
    )
}

pub async fn reset_bracket(State(state): State<BoardServerState>) -> CommandResult<BracketView> {
    apply_and_render(&state, Command::Reset)
}

pub async fn get_config(State(state): State<BoardServerState>) -> CommandResult<AppConfig> {
    Ok(Json(current_config(&state)?))
}

pub async fn save_config(
    State(state): State<BoardServerState>,
    Json(config): Json<AppConfig>,
) -> CommandResult<AppConfig> {
    let saved = save_config_to(&state.config_path, config).map_err(internal)?;
    let mut guard = state.config.lock().map_err(|e| internal(e.to_string()))?;
    *guard = saved.clone();
    Ok(Json(saved))
}
