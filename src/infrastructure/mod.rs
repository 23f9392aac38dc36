// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod event_stream;
pub mod export;
pub mod gios_client;
pub mod http_response;
pub mod station_cache;
