use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

use droplet::ViewContext;

#[derive(Clone)]
pub struct ViewEntry {
    pub view: Arc<Mutex<ViewContext>>,
    /// Capture key or URL the view was built from.
    pub source: String,
    created: Instant,
}

impl ViewEntry {
    pub fn new(view: ViewContext, source: String) -> Self {
        Self {
            view: Arc::new(Mutex::new(view)),
            source,
            created: Instant::now(),
        }
    }

    /// Event time for pointer input, measured from view creation.
    pub fn now(&self) -> Duration {
        self.created.elapsed()
    }
}

#[derive(Clone)]
pub struct AppState {
    // view id -> view
    pub views: Arc<RwLock<HashMap<String, ViewEntry>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            views: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, id: &str) -> Option<ViewEntry> {
        self.views.read().await.get(id).cloned()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
