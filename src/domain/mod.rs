// Domain layer - Air-quality data models and pure logic
pub mod chart;
pub mod error;
pub mod measurement;
pub mod payload;
pub mod sensor;
pub mod station;
pub mod statistics;
