// Application layer - Browse session, fan-out coordination and transport seam
pub mod aggregation;
pub mod air_quality_api;
pub mod browse_service;
pub mod browse_session;
pub mod error;
pub mod events;
