pub mod playlist_diff;
pub mod playlist_update;
pub mod spotify;
