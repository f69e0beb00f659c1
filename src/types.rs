use serde::{Deserialize, Serialize};
use std::{
    fmt,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use crate::tournament::Tournament;

// ── Constants ──────────────────────────────────────────────────────────

pub const PARTICIPANT_COUNT: usize = 64;
pub const SIDE_SIZE: usize = PARTICIPANT_COUNT / 2;
pub const ROUND_COUNT: usize = 5;
pub const FINAL_ROUND: usize = ROUND_COUNT - 1;
pub const MATCH_COUNTS: [usize; ROUND_COUNT] = [16, 8, 4, 2, 1];

pub const PARTICIPANTS_KEY: &str = "bracket-participants";
pub const BRACKET_KEY: &str = "bracket-advances";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:17890";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_STATIC_DIR: &str = "board";

pub const DEFAULT_ROUND_NAMES: [&str; ROUND_COUNT] = [
    "First Round",
    "Round of 32",
    "Sweet 16",
    "Quarterfinals",
    "Semifinals",
];
pub const DEFAULT_ROUND_DATES: [&str; ROUND_COUNT] = [
    "Mar 3\u{2013}4",
    "Mar 10\u{2013}11",
    "Mar 17\u{2013}18",
    "Mar 24",
    "Mar 31",
];

// ── Shared state type aliases ──────────────────────────────────────────

pub type ParticipantId = u32;
/// Recorded winner of one matchup, `None` while undecided.
pub type Slot = Option<ParticipantId>;

pub type SharedTournament = Arc<Mutex<Tournament>>;
pub type SharedConfig = Arc<Mutex<AppConfig>>;

#[derive(Clone)]
pub struct BoardServerState {
    pub tournament: SharedTournament,
    pub config: SharedConfig,
    pub config_path: PathBuf,
}

// ── Bracket domain types ───────────────────────────────────────────────

/// One half of the bracket. Left seeds 1–32, right seeds 33–64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Left, Side::Right];

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }

    /// Seeds on this side are `seed_offset + 1 ..= seed_offset + 32`.
    pub fn seed_offset(self) -> u32 {
        match self {
            Side::Left => 0,
            Side::Right => SIDE_SIZE as u32,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn match_count_for_round(round: usize) -> Option<usize> {
    MATCH_COUNTS.get(round).copied()
}

// ── Config ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub data_dir: String,
    pub listen_addr: String,
    pub static_dir: String,
    pub event_name: String,
    pub round_names: Vec<String>,
    pub round_dates: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: String::new(),
            listen_addr: String::new(),
            static_dir: String::new(),
            event_name: String::new(),
            round_names: DEFAULT_ROUND_NAMES.iter().map(|s| s.to_string()).collect(),
            round_dates: DEFAULT_ROUND_DATES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ── Command payloads ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordWinRequest {
    pub side: Side,
    pub round: usize,
    pub match_index: usize,
    pub winner_id: ParticipantId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrownChampionRequest {
    pub participant_id: ParticipantId,
}
