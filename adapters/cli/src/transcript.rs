use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use game_space_tictactoe::DifficultyTier;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const TRANSCRIPT_DOMAIN: &str = "gamespace";
const TRANSCRIPT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded transcript payload.
pub(crate) const TRANSCRIPT_HEADER: &str = "gamespace:v1";
/// Delimiter used to separate the prefix, difficulty and payload.
const FIELD_DELIMITER: char = ':';

/// Shareable record of a finished board game: the tier it was played at
/// and every mark in play order, human first.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct GameTranscript {
    /// Tier the game was played at.
    pub(crate) difficulty: DifficultyTier,
    /// Claimed cells in play order; even indexes are human marks.
    pub(crate) moves: Vec<u8>,
}

impl GameTranscript {
    /// Encodes the transcript into a single-line string suitable for
    /// clipboard transfer.
    #[must_use]
    pub(crate) fn encode(&self) -> String {
        let payload = SerializableTranscript {
            moves: self.moves.clone(),
        };
        let json = serde_json::to_vec(&payload).expect("transcript serialization never fails");
        let encoded = STANDARD_NO_PAD.encode(json);
        format!("{TRANSCRIPT_HEADER}:{}:{encoded}", self.difficulty)
    }

    /// Decodes a transcript from the provided string representation.
    pub(crate) fn decode(value: &str) -> Result<Self, TranscriptError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(TranscriptError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(TranscriptError::MissingPrefix)?;
        let version = parts.next().ok_or(TranscriptError::MissingVersion)?;
        let difficulty = parts.next().ok_or(TranscriptError::MissingDifficulty)?;
        let payload = parts.next().ok_or(TranscriptError::MissingPayload)?;

        if domain != TRANSCRIPT_DOMAIN {
            return Err(TranscriptError::InvalidPrefix(domain.to_owned()));
        }
        if version != TRANSCRIPT_VERSION {
            return Err(TranscriptError::UnsupportedVersion(version.to_owned()));
        }

        let difficulty: DifficultyTier = difficulty
            .parse()
            .map_err(|_| TranscriptError::InvalidDifficulty(difficulty.to_owned()))?;
        let bytes = STANDARD_NO_PAD.decode(payload.as_bytes())?;
        let decoded: SerializableTranscript = serde_json::from_slice(&bytes)?;

        if decoded.moves.len() > 9 {
            return Err(TranscriptError::TooManyMoves(decoded.moves.len()));
        }
        if let Some(cell) = decoded.moves.iter().copied().find(|cell| *cell >= 9) {
            return Err(TranscriptError::InvalidCell(cell));
        }

        Ok(Self {
            difficulty,
            moves: decoded.moves,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct SerializableTranscript {
    moves: Vec<u8>,
}

/// Errors that can occur while decoding transcript strings.
#[derive(Debug, Error)]
pub(crate) enum TranscriptError {
    /// The provided string was empty or contained only whitespace.
    #[error("transcript string was empty")]
    EmptyPayload,
    /// The prefix segment was missing from the encoded transcript.
    #[error("transcript is missing the prefix")]
    MissingPrefix,
    /// The encoded transcript did not contain a version segment.
    #[error("transcript is missing the version")]
    MissingVersion,
    /// The encoded transcript did not include the difficulty segment.
    #[error("transcript is missing the difficulty")]
    MissingDifficulty,
    /// The encoded transcript did not include the payload segment.
    #[error("transcript is missing the payload")]
    MissingPayload,
    /// The encoded transcript used an unexpected prefix segment.
    #[error("transcript prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The encoded transcript used an unsupported version identifier.
    #[error("transcript version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The difficulty segment named an unknown tier.
    #[error("transcript difficulty '{0}' is not recognised")]
    InvalidDifficulty(String),
    /// The base64 payload could not be decoded.
    #[error("could not decode transcript payload: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),
    /// The decoded payload could not be deserialised.
    #[error("could not parse transcript payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    /// The transcript names a cell outside the nine-cell board.
    #[error("transcript cell {0} is outside the board")]
    InvalidCell(u8),
    /// The transcript holds more moves than the board has cells.
    #[error("transcript holds {0} moves but the board has nine cells")]
    TooManyMoves(usize),
}
