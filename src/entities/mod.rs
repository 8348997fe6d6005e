pub mod playlist;
pub mod playlist_connector;
pub mod playlist_track;
pub mod track;
pub mod track_connector_id;
