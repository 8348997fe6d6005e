pub mod client;
pub mod sync_service;

pub use client::SpotifyWebClient;
pub use sync_service::SpotifySyncService;
