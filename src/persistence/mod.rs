mod playlist_repository;
mod track_repository;

pub use playlist_repository::SeaPlaylistRepository;
pub use track_repository::SeaTrackRepository;
