// Application state for HTTP handlers
use crate::application::browse_service::BrowseHandle;

#[derive(Clone)]
pub struct AppState {
    pub browse: BrowseHandle,
}
