use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::BracketError;
use crate::participants::{Participant, ParticipantRegistry};
use crate::types::{
    match_count_for_round, ParticipantId, Side, Slot, FINAL_ROUND, MATCH_COUNTS, ROUND_COUNT,
};

/// Index of the matchup at `to_round` that the winner of `match_index` at
/// `from_round` feeds into. Only valid for the balanced 64-seed tree, where
/// match counts halve exactly every round.
pub fn downstream_index(match_index: usize, from_round: usize, to_round: usize) -> usize {
    debug_assert!(to_round >= from_round);
    match_index >> (to_round - from_round)
}

/// A validated `(side, round, match)` coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchCoord {
    side: Side,
    round: usize,
    index: usize,
}

impl MatchCoord {
    pub fn new(side: Side, round: usize, index: usize) -> Result<Self, BracketError> {
        let count = match_count_for_round(round).ok_or(BracketError::RoundOutOfRange { round })?;
        if index >= count {
            return Err(BracketError::MatchOutOfRange { round, index, count });
        }
        Ok(MatchCoord { side, round, index })
    }

    /// Every matchup of one round, top to bottom. Out-of-range rounds yield nothing.
    pub fn round_coords(side: Side, round: usize) -> impl Iterator<Item = MatchCoord> {
        let count = match_count_for_round(round).unwrap_or(0);
        (0..count).map(move |index| MatchCoord { side, round, index })
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn round(&self) -> usize {
        self.round
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// Recorded picks for both halves plus the champion. Serializes to the
/// persisted shape `{ left: Slot[5][], right: Slot[5][], champion }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BracketState {
    left: Vec<Vec<Slot>>,
    right: Vec<Vec<Slot>>,
    champion: Option<ParticipantId>,
}

#[derive(Deserialize)]
struct StoredBracket {
    left: Vec<Vec<Slot>>,
    right: Vec<Vec<Slot>>,
    #[serde(default)]
    champion: Option<ParticipantId>,
}

fn empty_side() -> Vec<Vec<Slot>> {
    MATCH_COUNTS.iter().map(|&count| vec![None; count]).collect()
}

impl Default for BracketState {
    fn default() -> Self {
        BracketState {
            left: empty_side(),
            right: empty_side(),
            champion: None,
        }
    }
}

impl BracketState {
    pub fn new() -> Self {
        BracketState::default()
    }

    fn rounds(&self, side: Side) -> &[Vec<Slot>] {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    fn rounds_mut(&mut self, side: Side) -> &mut [Vec<Slot>] {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    pub fn round_slots(&self, side: Side, round: usize) -> &[Slot] {
        self.rounds(side).get(round).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn winner_at(&self, coord: MatchCoord) -> Slot {
        self.rounds(coord.side)[coord.round][coord.index]
    }

    pub fn champion(&self) -> Option<ParticipantId> {
        self.champion
    }

    /// Round-4 winners of the left and right halves.
    pub fn finalists(&self) -> (Slot, Slot) {
        (self.left[FINAL_ROUND][0], self.right[FINAL_ROUND][0])
    }

    pub fn is_complete(&self) -> bool {
        self.champion.is_some()
    }

    /// The two ids contesting `coord` right now. Round 0 comes straight from
    /// the side's seed block; later rounds read the previous round's picks.
    pub fn matchup_ids(&self, coord: MatchCoord) -> (Slot, Slot) {
        if coord.round == 0 {
            let first = coord.side.seed_offset() + 2 * coord.index as u32 + 1;
            return (Some(first), Some(first + 1));
        }
        let previous = &self.rounds(coord.side)[coord.round - 1];
        (previous[2 * coord.index], previous[2 * coord.index + 1])
    }

    pub fn derive_matchup<'a>(
        &self,
        registry: &'a ParticipantRegistry,
        coord: MatchCoord,
    ) -> (Option<&'a Participant>, Option<&'a Participant>) {
        if coord.round == 0 {
            let block = registry.side_block(coord.side);
            return (block.get(2 * coord.index), block.get(2 * coord.index + 1));
        }
        let (top, bottom) = self.matchup_ids(coord);
        (
            top.and_then(|id| registry.lookup(id)),
            bottom.and_then(|id| registry.lookup(id)),
        )
    }

    /// Record `winner` for `coord` and clear every later pick that depended
    /// on it. Re-recording the same winner still runs the cascade.
    pub fn record_win(&mut self, coord: MatchCoord, winner: ParticipantId) -> Result<(), BracketError> {
        let (top, bottom) = self.matchup_ids(coord);
        if top != Some(winner) && bottom != Some(winner) {
            return Err(BracketError::NotInMatchup {
                side: coord.side,
                round: coord.round,
                index: coord.index,
                participant: winner,
            });
        }

        let rounds = self.rounds_mut(coord.side);
        rounds[coord.round][coord.index] = Some(winner);

        let mut final_touched = coord.round == FINAL_ROUND;
        for later in coord.round + 1..ROUND_COUNT {
            let down = downstream_index(coord.index, coord.round, later);
            if let Some(cleared) = rounds[later][down].take() {
                debug!("cleared {} round {later} match {down} (was {cleared})", coord.side);
                if later == FINAL_ROUND {
                    final_touched = true;
                }
            }
        }

        if final_touched {
            if let Some(previous) = self.champion.take() {
                info!("champion {previous} cleared after {} final changed", coord.side);
            }
        }
        Ok(())
    }

    pub fn crown_champion(&mut self, participant: ParticipantId) -> Result<(), BracketError> {
        let (left, right) = self.finalists();
        if left != Some(participant) && right != Some(participant) {
            return Err(BracketError::NotAFinalist(participant));
        }
        self.champion = Some(participant);
        Ok(())
    }

    pub fn reset(&mut self) {
        *self = BracketState::default();
    }

    pub fn to_blob(&self) -> Result<String, String> {
        serde_json::to_string(self).map_err(|e| e.to_string())
    }

    /// Rebuild from a saved blob. Both `left` and `right` must be present.
    /// Short rounds and `null` holes read as unset; picks that are not legal
    /// occupants of their matchup (and a champion who is not a finalist) are
    /// dropped so the restored state always satisfies the advancement rules.
    pub fn restore(blob: Option<&str>) -> Option<Self> {
        let stored: StoredBracket = match serde_json::from_str(blob?) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("discarding saved bracket: {e}");
                return None;
            }
        };

        let mut state = BracketState::default();
        let mut dropped = 0usize;
        for side in Side::ALL {
            let saved = match side {
                Side::Left => &stored.left,
                Side::Right => &stored.right,
            };
            for round in 0..ROUND_COUNT {
                for coord in MatchCoord::round_coords(side, round) {
                    let Some(id) = saved.get(round).and_then(|r| r.get(coord.index)).copied().flatten() else {
                        continue;
                    };
                    let (top, bottom) = state.matchup_ids(coord);
                    if top == Some(id) || bottom == Some(id) {
                        state.rounds_mut(side)[round][coord.index] = Some(id);
                    } else {
                        dropped += 1;
                    }
                }
            }
        }

        if let Some(id) = stored.champion {
            let (left, right) = state.finalists();
            if left == Some(id) || right == Some(id) {
                state.champion = Some(id);
            } else {
                dropped += 1;
            }
        }

        if dropped > 0 {
            warn!("dropped {dropped} inconsistent picks from saved bracket");
        }
        Some(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participants::ParticipantPatch;

    fn coord(side: Side, round: usize, index: usize) -> MatchCoord {
        MatchCoord::new(side, round, index).unwrap()
    }

    /// Top seed wins every matchup on `side` through the side's final.
    fn chalk(state: &mut BracketState, side: Side) {
        for round in 0..ROUND_COUNT {
            for c in MatchCoord::round_coords(side, round) {
                let (top, _) = state.matchup_ids(c);
                state.record_win(c, top.unwrap()).unwrap();
            }
        }
    }

    #[test]
    fn test_downstream_index() {
        assert_eq!(downstream_index(0, 0, 1), 0);
        assert_eq!(downstream_index(1, 0, 1), 0);
        assert_eq!(downstream_index(5, 0, 1), 2);
        assert_eq!(downstream_index(5, 0, 2), 1);
        assert_eq!(downstream_index(15, 0, 4), 0);
        assert_eq!(downstream_index(7, 1, 3), 1);
        assert_eq!(downstream_index(3, 2, 2), 3);
    }

    #[test]
    fn test_round_boundaries() {
        assert_eq!(MatchCoord::round_coords(Side::Left, 0).count(), 16);
        assert_eq!(MatchCoord::round_coords(Side::Right, 4).count(), 1);
        assert!(MatchCoord::new(Side::Left, 0, 15).is_ok());
        assert_eq!(
            MatchCoord::new(Side::Left, 0, 16).unwrap_err(),
            BracketError::MatchOutOfRange { round: 0, index: 16, count: 16 }
        );
        assert_eq!(
            MatchCoord::new(Side::Left, 5, 0).unwrap_err(),
            BracketError::RoundOutOfRange { round: 5 }
        );
        assert_eq!(MatchCoord::round_coords(Side::Left, 5).count(), 0);
    }

    #[test]
    fn test_first_round_uses_side_seed_blocks() {
        let registry = ParticipantRegistry::initialize();
        let state = BracketState::new();
        let mut left_seeds = Vec::new();
        let mut right_seeds = Vec::new();
        for c in MatchCoord::round_coords(Side::Left, 0) {
            let (a, b) = state.derive_matchup(&registry, c);
            left_seeds.extend([a.unwrap().seed, b.unwrap().seed]);
        }
        for c in MatchCoord::round_coords(Side::Right, 0) {
            let (a, b) = state.derive_matchup(&registry, c);
            right_seeds.extend([a.unwrap().seed, b.unwrap().seed]);
        }
        assert_eq!(left_seeds, (1..=32).collect::<Vec<_>>());
        assert_eq!(right_seeds, (33..=64).collect::<Vec<_>>());
    }

    #[test]
    fn test_first_pick_scenario() {
        let registry = ParticipantRegistry::initialize();
        let mut state = BracketState::new();
        state.record_win(coord(Side::Left, 0, 0), 1).unwrap();

        let (a, b) = state.derive_matchup(&registry, coord(Side::Left, 0, 0));
        assert_eq!((a.map(|p| p.id), b.map(|p| p.id)), (Some(1), Some(2)));
        assert_eq!(state.winner_at(coord(Side::Left, 0, 0)), Some(1));

        let (a, b) = state.derive_matchup(&registry, coord(Side::Left, 1, 0));
        assert_eq!(a.map(|p| p.id), Some(1));
        assert!(b.is_none());
    }

    #[test]
    fn test_later_rounds_resolve_through_registry() {
        let mut registry = ParticipantRegistry::initialize();
        registry
            .update(36, ParticipantPatch { name: Some("Kim".into()), ..Default::default() })
            .unwrap();
        let mut state = BracketState::new();
        state.record_win(coord(Side::Right, 0, 0), 33).unwrap();
        state.record_win(coord(Side::Right, 0, 1), 36).unwrap();

        let (a, b) = state.derive_matchup(&registry, coord(Side::Right, 1, 0));
        assert_eq!(a.unwrap().id, 33);
        assert_eq!(b.unwrap().display_name(), "Kim");
    }

    #[test]
    fn test_record_win_rejects_non_participant() {
        let mut state = BracketState::new();
        let before = state.clone();

        let err = state.record_win(coord(Side::Left, 0, 0), 3).unwrap_err();
        assert_eq!(
            err,
            BracketError::NotInMatchup { side: Side::Left, round: 0, index: 0, participant: 3 }
        );
        // Right-half seed on the left side.
        assert!(state.record_win(coord(Side::Left, 0, 0), 33).is_err());
        // Nobody has advanced yet, so round 1 has no legal winner.
        assert!(state.record_win(coord(Side::Left, 1, 0), 1).is_err());
        assert_eq!(state, before);
    }

    #[test]
    fn test_changing_early_pick_clears_dependents() {
        let mut state = BracketState::new();
        state.record_win(coord(Side::Left, 0, 0), 1).unwrap();
        state.record_win(coord(Side::Left, 0, 1), 3).unwrap();
        state.record_win(coord(Side::Left, 1, 0), 1).unwrap();
        state.record_win(coord(Side::Left, 0, 2), 5).unwrap();
        state.record_win(coord(Side::Left, 0, 3), 7).unwrap();
        state.record_win(coord(Side::Left, 1, 1), 7).unwrap();
        state.record_win(coord(Side::Left, 2, 0), 1).unwrap();

        state.record_win(coord(Side::Left, 0, 0), 2).unwrap();

        assert_eq!(state.winner_at(coord(Side::Left, 0, 0)), Some(2));
        assert_eq!(state.winner_at(coord(Side::Left, 1, 0)), None);
        assert_eq!(state.winner_at(coord(Side::Left, 2, 0)), None);
        // Sibling branch is untouched.
        assert_eq!(state.winner_at(coord(Side::Left, 1, 1)), Some(7));
        assert_eq!(state.winner_at(coord(Side::Left, 0, 1)), Some(3));
    }

    #[test]
    fn test_cascade_stays_on_its_side() {
        let mut state = BracketState::new();
        chalk(&mut state, Side::Left);
        chalk(&mut state, Side::Right);
        state.record_win(coord(Side::Left, 0, 15), 32).unwrap();

        assert_eq!(state.winner_at(coord(Side::Left, 1, 7)), None);
        assert_eq!(state.winner_at(coord(Side::Left, 4, 0)), None);
        assert_eq!(state.winner_at(coord(Side::Left, 1, 0)), Some(1));
        assert_eq!(state.finalists(), (None, Some(33)));
    }

    #[test]
    fn test_rerecording_same_winner_clears_downstream() {
        let mut state = BracketState::new();
        chalk(&mut state, Side::Left);
        state.record_win(coord(Side::Left, 1, 0), 1).unwrap();
        assert_eq!(state.winner_at(coord(Side::Left, 1, 0)), Some(1));
        assert_eq!(state.winner_at(coord(Side::Left, 2, 0)), None);
        assert_eq!(state.winner_at(coord(Side::Left, 3, 0)), None);
        assert_eq!(state.winner_at(coord(Side::Left, 4, 0)), None);
    }

    #[test]
    fn test_crown_champion_requires_finalist() {
        let mut state = BracketState::new();
        assert_eq!(state.crown_champion(1).unwrap_err(), BracketError::NotAFinalist(1));

        chalk(&mut state, Side::Left);
        chalk(&mut state, Side::Right);
        assert_eq!(state.finalists(), (Some(1), Some(33)));

        let before = state.clone();
        assert_eq!(state.crown_champion(2).unwrap_err(), BracketError::NotAFinalist(2));
        assert_eq!(state, before);

        state.crown_champion(33).unwrap();
        assert_eq!(state.champion(), Some(33));
        assert!(state.is_complete());
    }

    #[test]
    fn test_changing_final_clears_champion() {
        let mut state = BracketState::new();
        chalk(&mut state, Side::Left);
        chalk(&mut state, Side::Right);
        state.crown_champion(1).unwrap();

        let (_, other) = state.matchup_ids(coord(Side::Left, 4, 0));
        state.record_win(coord(Side::Left, 4, 0), other.unwrap()).unwrap();
        assert_eq!(state.champion(), None);
        assert!(!state.is_complete());
    }

    #[test]
    fn test_cascade_into_final_clears_champion() {
        let mut state = BracketState::new();
        chalk(&mut state, Side::Left);
        chalk(&mut state, Side::Right);
        state.crown_champion(33).unwrap();

        state.record_win(coord(Side::Left, 0, 0), 2).unwrap();
        assert_eq!(state.finalists(), (None, Some(33)));
        assert_eq!(state.champion(), None);
    }

    #[test]
    fn test_any_pick_after_crowning_clears_champion() {
        // With both finals decided every slot feeds a final, so any further
        // pick reaches round 4.
        let mut state = BracketState::new();
        chalk(&mut state, Side::Left);
        chalk(&mut state, Side::Right);
        state.crown_champion(1).unwrap();

        state.record_win(coord(Side::Right, 3, 0), 33).unwrap();
        assert_eq!(state.champion(), None);
        assert_eq!(state.finalists(), (Some(1), None));
    }

    #[test]
    fn test_reset_matches_fresh_state() {
        let mut state = BracketState::new();
        chalk(&mut state, Side::Left);
        chalk(&mut state, Side::Right);
        state.crown_champion(1).unwrap();
        state.reset();
        assert_eq!(state, BracketState::new());
    }

    #[test]
    fn test_restore_requires_both_sides() {
        assert!(BracketState::restore(None).is_none());
        assert!(BracketState::restore(Some("garbage")).is_none());
        assert!(BracketState::restore(Some(r#"{"left":[[],[],[],[],[]],"champion":null}"#)).is_none());
        assert_eq!(
            BracketState::restore(Some(r#"{"left":[],"right":[]}"#)),
            Some(BracketState::new())
        );
    }

    #[test]
    fn test_restore_accepts_sparse_rounds() {
        let blob = r#"{"left":[[1,null,5],[1],[],[],[]],"right":[[],[],[],[],[]],"champion":null}"#;
        let state = BracketState::restore(Some(blob)).unwrap();
        assert_eq!(state.winner_at(coord(Side::Left, 0, 0)), Some(1));
        assert_eq!(state.winner_at(coord(Side::Left, 0, 1)), None);
        assert_eq!(state.winner_at(coord(Side::Left, 0, 2)), Some(5));
        assert_eq!(state.winner_at(coord(Side::Left, 1, 0)), Some(1));
    }

    #[test]
    fn test_restore_drops_illegal_picks() {
        // 9 is not in left round 0 match 0; the round-1 pick of 1 then has no
        // feeding winner; the champion is not a finalist.
        let blob = r#"{"left":[[9],[1],[],[],[]],"right":[[40],[],[],[],[]],"champion":1}"#;
        let state = BracketState::restore(Some(blob)).unwrap();
        assert_eq!(state, BracketState::new());
    }

    #[test]
    fn test_restore_round_trip() {
        let mut state = BracketState::new();
        chalk(&mut state, Side::Left);
        chalk(&mut state, Side::Right);
        state.record_win(coord(Side::Right, 0, 3), 40).unwrap();
        state.crown_champion(1).unwrap();

        let blob = state.to_blob().unwrap();
        assert_eq!(BracketState::restore(Some(&blob)), Some(state));
    }

    #[test]
    fn test_blob_shape() {
        let mut state = BracketState::new();
        state.record_win(coord(Side::Left, 0, 0), 2).unwrap();
        let value: serde_json::Value = serde_json::from_str(&state.to_blob().unwrap()).unwrap();
        assert_eq!(value["left"].as_array().unwrap().len(), 5);
        assert_eq!(value["left"][0].as_array().unwrap().len(), 16);
        assert_eq!(value["left"][4].as_array().unwrap().len(), 1);
        assert_eq!(value["left"][0][0], 2);
        assert!(value["left"][0][1].is_null());
        assert!(value["champion"].is_null());
    }
}
