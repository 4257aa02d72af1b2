use registry::ProjectService;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    /// Project registry and storage
    pub service: Arc<ProjectService>,
    /// Static front-end assets
    pub web_dir: PathBuf,
}

impl AppState {
    pub fn new(service: ProjectService, web_dir: PathBuf) -> Self {
        Self {
            service: Arc::new(service),
            web_dir,
        }
    }
}
