pub mod repository;
pub mod spotify;
pub mod sync;
