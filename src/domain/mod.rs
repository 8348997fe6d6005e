pub mod operation;
pub mod options;
pub mod playlist;
pub mod track;

pub use operation::{OperationKind, PlaylistDiff, PlaylistOperation, UnchangedTrack};
pub use options::{
    ConflictPolicy, MatchStrategy, OperationTarget, PLATFORM_BATCH_LIMIT, UpdateOptions,
};
pub use playlist::{MetadataPatch, Playlist, PlaylistMetadata};
pub use track::{Connector, ConnectorMap, SequenceMetadata, Track, TrackSequence};
