pub mod calculator;
pub mod matcher;
pub mod reorder;

pub use calculator::DiffCalculator;
