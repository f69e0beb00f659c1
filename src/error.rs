use crate::types::{ParticipantId, Side};

/// Caller contract violations. Every operation that returns one of these
/// leaves both stores exactly as they were.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BracketError {
    #[error("round {round} is out of range (expected 0..=4)")]
    RoundOutOfRange { round: usize },

    #[error("match {index} is out of range for round {round} ({count} matches)")]
    MatchOutOfRange {
        round: usize,
        index: usize,
        count: usize,
    },

    #[error("participant {participant} is not in {side} round {round} match {index}")]
    NotInMatchup {
        side: Side,
        round: usize,
        index: usize,
        participant: ParticipantId,
    },

    #[error("participant {0} is not a current finalist")]
    NotAFinalist(ParticipantId),

    #[error("participant {0} not found")]
    UnknownParticipant(ParticipantId),

    #[error("{field} is immutable")]
    ImmutableField { field: &'static str },
}
