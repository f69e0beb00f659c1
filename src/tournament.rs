use tracing::{info, warn};

use crate::bracket::{BracketState, MatchCoord};
use crate::error::BracketError;
use crate::participants::{Participant, ParticipantPatch, ParticipantRegistry};
use crate::storage::Storage;
use crate::types::{ParticipantId, Side, BRACKET_KEY, PARTICIPANTS_KEY};

/// Operator actions. Each one either applies in full or is rejected with the
/// stores left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    RecordWin {
        side: Side,
        round: usize,
        match_index: usize,
        winner_id: ParticipantId,
    },
    CrownChampion {
        participant_id: ParticipantId,
    },
    UpdateParticipant {
        id: ParticipantId,
        patch: ParticipantPatch,
    },
    Reset,
}

/// The registry, the bracket and the storage they are mirrored to.
pub struct Tournament {
    registry: ParticipantRegistry,
    bracket: BracketState,
    storage: Box<dyn Storage>,
}

impl Tournament {
    /// Restore both stores from `storage`, each falling back to a fresh
    /// default on its own.
    pub fn load(storage: Box<dyn Storage>) -> Self {
        let registry = match ParticipantRegistry::restore(storage.load(PARTICIPANTS_KEY).as_deref()) {
            Some(registry) => {
                info!("restored participants from {PARTICIPANTS_KEY}");
                registry
            }
            None => {
                info!("no saved participants; starting with default roster");
                ParticipantRegistry::initialize()
            }
        };
        let bracket = match BracketState::restore(storage.load(BRACKET_KEY).as_deref()) {
            Some(bracket) => {
                info!("restored bracket from {BRACKET_KEY}");
                bracket
            }
            None => {
                info!("no saved bracket; starting empty");
                BracketState::new()
            }
        };
        Tournament {
            registry,
            bracket,
            storage,
        }
    }

    pub fn registry(&self) -> &ParticipantRegistry {
        &self.registry
    }

    pub fn bracket(&self) -> &BracketState {
        &self.bracket
    }

    pub fn derive_matchup(
        &self,
        side: Side,
        round: usize,
        match_index: usize,
    ) -> Result<(Option<&Participant>, Option<&Participant>), BracketError> {
        let coord = MatchCoord::new(side, round, match_index)?;
        Ok(self.bracket.derive_matchup(&self.registry, coord))
    }

    pub fn apply(&mut self, command: Command) -> Result<(), BracketError> {
        match command {
            Command::RecordWin {
                side,
                round,
                match_index,
                winner_id,
            } => self.record_win(side, round, match_index, winner_id),
            Command::CrownChampion { participant_id } => self.crown_champion(participant_id),
            Command::UpdateParticipant { id, patch } => self.update_participant(id, patch).map(|_| ()),
            Command::Reset => {
                self.reset();
                Ok(())
            }
        }
    }

    pub fn record_win(
        &mut self,
        side: Side,
        round: usize,
        match_index: usize,
        winner_id: ParticipantId,
    ) -> Result<(), BracketError> {
        let coord = MatchCoord::new(side, round, match_index)?;
        self.bracket.record_win(coord, winner_id)?;
        info!("{side} round {round} match {match_index}: {winner_id} advances");
        self.persist_bracket();
        Ok(())
    }

    pub fn crown_champion(&mut self, participant_id: ParticipantId) -> Result<(), BracketError> {
        self.bracket.crown_champion(participant_id)?;
        info!("participant {participant_id} crowned champion");
        self.persist_bracket();
        Ok(())
    }

    pub fn update_participant(
        &mut self,
        id: ParticipantId,
        patch: ParticipantPatch,
    ) -> Result<Participant, BracketError> {
        let updated = self.registry.update(id, patch)?;
        info!("participant {id} updated");
        self.persist_participants();
        Ok(updated)
    }

    /// Clears every pick and the champion. Participant edits are kept.
    pub fn reset(&mut self) {
        self.bracket.reset();
        info!("bracket reset");
        self.persist_bracket();
    }

    fn persist_bracket(&mut self) {
        match self.bracket.to_blob() {
            Ok(blob) => self.save(BRACKET_KEY, &blob),
            Err(e) => warn!("serialize bracket: {e}"),
        }
    }

    fn persist_participants(&mut self) {
        match self.registry.to_blob() {
            Ok(blob) => self.save(PARTICIPANTS_KEY, &blob),
            Err(e) => warn!("serialize participants: {e}"),
        }
    }

    // Runs inside the session lock, so the write lands before the next command.
    // In-memory state stays authoritative when the write fails.
    fn save(&mut self, key: &str, value: &str) {
        if let Err(e) = self.storage.save(key, value) {
            warn!("failed to save {key}: {e}");
        }
    }
}
