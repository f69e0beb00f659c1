use chrono::Local;
use serde::Serialize;

use crate::bracket::{BracketState, MatchCoord};
use crate::participants::{Participant, ParticipantRegistry};
use crate::types::{AppConfig, ParticipantId, Side, ROUND_COUNT};

// ── Render payload ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    pub id: ParticipantId,
    pub seed: u32,
    pub name: String,
    pub school: String,
    pub photo: Option<String>,
    pub display_name: String,
}

impl From<&Participant> for ParticipantView {
    fn from(p: &Participant) -> Self {
        ParticipantView {
            id: p.id,
            seed: p.seed,
            name: p.name.clone(),
            school: p.school.clone(),
            photo: p.photo.clone(),
            display_name: p.display_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchupView {
    pub index: usize,
    pub top: Option<ParticipantView>,
    pub bottom: Option<ParticipantView>,
    pub winner_id: Option<ParticipantId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundView {
    pub round: usize,
    pub name: String,
    pub date: String,
    pub matchups: Vec<MatchupView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SideView {
    pub side: Side,
    pub rounds: Vec<RoundView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketView {
    pub event_name: String,
    pub left: SideView,
    pub right: SideView,
    pub left_finalist: Option<ParticipantView>,
    pub right_finalist: Option<ParticipantView>,
    pub champion: Option<ParticipantView>,
    pub complete: bool,
    pub generated_at: String,
}

// ── Builders ───────────────────────────────────────────────────────────

/// Name and date shown above `round`. Missing config entries fall back to
/// a generic label and no date.
pub fn round_label(config: &AppConfig, round: usize) -> (String, String) {
    let name = config
        .round_names
        .get(round)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Round {}", round + 1));
    let date = config.round_dates.get(round).cloned().unwrap_or_default();
    (name, date)
}

fn resolve(registry: &ParticipantRegistry, id: Option<ParticipantId>) -> Option<ParticipantView> {
    id.and_then(|id| registry.lookup(id)).map(ParticipantView::from)
}

fn build_side(registry: &ParticipantRegistry, bracket: &BracketState, config: &AppConfig, side: Side) -> SideView {
    let rounds = (0..ROUND_COUNT)
        .map(|round| {
            let (name, date) = round_label(config, round);
            let matchups = MatchCoord::round_coords(side, round)
                .map(|coord| {
                    let (top, bottom) = bracket.derive_matchup(registry, coord);
                    MatchupView {
                        index: coord.index(),
                        top: top.map(ParticipantView::from),
                        bottom: bottom.map(ParticipantView::from),
                        winner_id: bracket.winner_at(coord),
                    }
                })
                .collect();
            RoundView {
                round,
                name,
                date,
                matchups,
            }
        })
        .collect();
    SideView { side, rounds }
}

pub fn build_bracket_view(registry: &ParticipantRegistry, bracket: &BracketState, config: &AppConfig) -> BracketView {
    let (left_finalist, right_finalist) = bracket.finalists();
    BracketView {
        event_name: config.event_name.clone(),
        left: build_side(registry, bracket, config, Side::Left),
        right: build_side(registry, bracket, config, Side::Right),
        left_finalist: resolve(registry, left_finalist),
        right_finalist: resolve(registry, right_finalist),
        champion: resolve(registry, bracket.champion()),
        complete: bracket.is_complete(),
        generated_at: Local::now().to_rfc3339(),
    }
}
