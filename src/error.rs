use crate::types::RoomId;

/// Result type for room operations
pub type RoomResult<T> = Result<T, RoomError>;

/// Validation outcomes of room operations.
///
/// All of these are recoverable at the boundary. Judge failures never show up
/// here; they are absorbed by the fallback scorer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RoomError {
    #[error("Room {0} not found")]
    RoomNotFound(RoomId),

    #[error("Room is full ({max} players)")]
    RoomFull { max: usize },

    #[error("Game already in progress")]
    RoundInProgress,

    #[error("Name '{0}' already taken")]
    NameTaken(String),

    #[error("Only the host can start the game")]
    NotHost,

    #[error("Need at least {required} players to start (have {current})")]
    InsufficientPlayers { required: usize, current: usize },

    #[error("Game is not in progress")]
    InvalidState,

    #[error("Player not found in room")]
    PlayerNotInRoom,

    #[error("Already submitted for this round")]
    DuplicateSubmission,

    #[error("Not all players have submitted yet ({submitted}/{total})")]
    IncompleteSubmissions { submitted: usize, total: usize },

    #[error("Room {0} was modified concurrently, try again")]
    Conflict(RoomId),
}

impl RoomError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            RoomError::RoomNotFound(_) => "ROOM_NOT_FOUND",
            RoomError::RoomFull { .. } => "ROOM_FULL",
            RoomError::RoundInProgress => "ROUND_IN_PROGRESS",
            RoomError::NameTaken(_) => "NAME_TAKEN",
            RoomError::NotHost => "NOT_HOST",
            RoomError::InsufficientPlayers { .. } => "INSUFFICIENT_PLAYERS",
            RoomError::InvalidState => "INVALID_STATE",
            RoomError::PlayerNotInRoom => "PLAYER_NOT_IN_ROOM",
            RoomError::DuplicateSubmission => "DUPLICATE_SUBMISSION",
            RoomError::IncompleteSubmissions { .. } => "INCOMPLETE_SUBMISSIONS",
            RoomError::Conflict(_) => "CONFLICT",
        }
    }

    /// Whether polling again later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RoomError::IncompleteSubmissions { .. } | RoomError::Conflict(_)
        )
    }
}
