use std::fmt;

use crate::domain::{Connector, PLATFORM_BATCH_LIMIT, TrackSequence, UpdateOptions};

use super::error::ValidationError;

/// How the playlist to update is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistRef {
    Internal(i64),
    Connector {
        connector: Connector,
        external_id: String,
    },
}

impl PlaylistRef {
    pub fn is_empty(&self) -> bool {
        match self {
            PlaylistRef::Internal(id) => *id <= 0,
            PlaylistRef::Connector { external_id, .. } => external_id.trim().is_empty(),
        }
    }
}

impl fmt::Display for PlaylistRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaylistRef::Internal(id) => write!(f, "playlist #{}", id),
            PlaylistRef::Connector {
                connector,
                external_id,
            } => write!(f, "{} playlist {}", connector, external_id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpdateCommand {
    pub playlist: PlaylistRef,
    pub target: TrackSequence,
    pub options: UpdateOptions,
}

impl UpdateCommand {
    pub fn new(playlist: PlaylistRef, target: TrackSequence, options: UpdateOptions) -> Self {
        Self {
            playlist,
            target,
            options,
        }
    }

    /// Checks the command without touching any store or service. `max_batch_size` is the
    /// configured cap, itself clamped to the platform limit.
    pub fn validate(&self, max_batch_size: usize) -> Result<(), ValidationError> {
        if self.playlist.is_empty() {
            return Err(ValidationError::EmptyPlaylistRef);
        }
        if self.target.is_empty() {
            return Err(ValidationError::EmptyTarget);
        }

        let limit = max_batch_size.min(PLATFORM_BATCH_LIMIT);
        match self.options.batch_size {
            0 => return Err(ValidationError::BatchSizeZero),
            batch_size if batch_size > limit => {
                return Err(ValidationError::BatchSizeExceedsLimit { batch_size, limit });
            }
            _ => {}
        }

        if self.options.max_api_calls < 1 {
            return Err(ValidationError::MaxApiCallsTooLow);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Track;

    fn command(playlist: PlaylistRef) -> UpdateCommand {
        UpdateCommand::new(
            playlist,
            TrackSequence::new(vec![Track::new("Song", vec!["Artist".into()])]),
            UpdateOptions::default(),
        )
    }

    #[test]
    fn test_valid_command() {
        assert_eq!(command(PlaylistRef::Internal(1)).validate(100), Ok(()));
    }

    #[test]
    fn test_empty_refs() {
        assert_eq!(
            command(PlaylistRef::Internal(0)).validate(100),
            Err(ValidationError::EmptyPlaylistRef)
        );

        let blank = PlaylistRef::Connector {
            connector: Connector::Spotify,
            external_id: "  ".into(),
        };
        assert_eq!(
            command(blank).validate(100),
            Err(ValidationError::EmptyPlaylistRef)
        );
    }

    #[test]
    fn test_empty_target() {
        let mut cmd = command(PlaylistRef::Internal(1));
        cmd.target = TrackSequence::default();

        assert_eq!(cmd.validate(100), Err(ValidationError::EmptyTarget));
    }

    #[test]
    fn test_batch_size_bounds() {
        let mut cmd = command(PlaylistRef::Internal(1));
        cmd.options.batch_size = 0;
        assert_eq!(cmd.validate(100), Err(ValidationError::BatchSizeZero));

        cmd.options.batch_size = 60;
        assert_eq!(
            cmd.validate(50),
            Err(ValidationError::BatchSizeExceedsLimit {
                batch_size: 60,
                limit: 50
            })
        );

        // configured cap never lifts the platform limit
        cmd.options.batch_size = 101;
        assert_eq!(
            cmd.validate(500),
            Err(ValidationError::BatchSizeExceedsLimit {
                batch_size: 101,
                limit: 100
            })
        );
    }

    #[test]
    fn test_max_api_calls() {
        let mut cmd = command(PlaylistRef::Internal(1));
        cmd.options.max_api_calls = 0;

        assert_eq!(cmd.validate(100), Err(ValidationError::MaxApiCallsTooLow));
    }
}
