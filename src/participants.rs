use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::error::BracketError;
use crate::types::{ParticipantId, Side, PARTICIPANT_COUNT, SIDE_SIZE};

/// A seeded competitor. `id` doubles as the seed; only the display fields
/// change after initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub seed: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub photo: Option<String>,
}

impl Participant {
    pub fn new(id: ParticipantId) -> Self {
        Participant {
            id,
            seed: id,
            name: String::new(),
            school: String::new(),
            photo: None,
        }
    }

    pub fn display_name(&self) -> String {
        let name = self.name.trim();
        if name.is_empty() {
            format!("Participant {}", self.seed)
        } else {
            name.to_string()
        }
    }
}

/// Partial edit of a participant. Absent fields are left alone; `photo: null`
/// removes the photo. `id`/`seed` may only be echoed back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ParticipantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub photo: Option<Option<String>>,
}

// A present key always yields `Some`, so `null` becomes `Some(None)`.
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// The 64 participant records, stored in seed order so `id - 1` indexes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantRegistry {
    participants: Vec<Participant>,
}

impl Default for ParticipantRegistry {
    fn default() -> Self {
        ParticipantRegistry::initialize()
    }
}

impl ParticipantRegistry {
    pub fn initialize() -> Self {
        ParticipantRegistry {
            participants: (1..=PARTICIPANT_COUNT as u32).map(Participant::new).collect(),
        }
    }

    /// Rebuild the registry from a saved blob. Anything other than exactly 64
    /// records with ids 1..=64 (and `seed == id`) is rejected. Record order in
    /// the blob does not matter; the registry is always held in seed order.
    pub fn restore(blob: Option<&str>) -> Option<Self> {
        let blob = blob?;
        let mut participants: Vec<Participant> = match serde_json::from_str(blob) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("discarding saved participants: {e}");
                return None;
            }
        };
        if participants.len() != PARTICIPANT_COUNT {
            warn!(
                "discarding saved participants: expected {PARTICIPANT_COUNT} records, found {}",
                participants.len()
            );
            return None;
        }
        participants.sort_by_key(|p| p.id);
        let well_formed = participants
            .iter()
            .enumerate()
            .all(|(index, p)| p.id == index as u32 + 1 && p.seed == p.id);
        if !well_formed {
            warn!("discarding saved participants: ids are not seeds 1..={PARTICIPANT_COUNT}");
            return None;
        }
        Some(ParticipantRegistry { participants })
    }

    pub fn to_blob(&self) -> Result<String, String> {
        serde_json::to_string(&self.participants).map_err(|e| e.to_string())
    }

    pub fn lookup(&self, id: ParticipantId) -> Option<&Participant> {
        let index = (id as usize).checked_sub(1)?;
        self.participants.get(index)
    }

    pub fn all(&self) -> &[Participant] {
        &self.participants
    }

    /// The 32 participants seeded into `side`, in seed order.
    pub fn side_block(&self, side: Side) -> &[Participant] {
        let start = side.seed_offset() as usize;
        &self.participants[start..start + SIDE_SIZE]
    }

    pub fn update(
        &mut self,
        id: ParticipantId,
        patch: ParticipantPatch,
    ) -> Result<Participant, BracketError> {
        let index = (id as usize)
            .checked_sub(1)
            .filter(|index| *index < self.participants.len())
            .ok_or(BracketError::UnknownParticipant(id))?;
        let participant = &mut self.participants[index];

        if patch.id.is_some_and(|value| value != participant.id) {
            return Err(BracketError::ImmutableField { field: "id" });
        }
        if patch.seed.is_some_and(|value| value != participant.seed) {
            return Err(BracketError::ImmutableField { field: "seed" });
        }

        if let Some(name) = patch.name {
            participant.name = name;
        }
        if let Some(school) = patch.school {
            participant.school = school;
        }
        if let Some(photo) = patch.photo {
            participant.photo = photo;
        }
        Ok(participant.clone())
    }
}
