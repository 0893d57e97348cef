use std::path::PathBuf;

use crate::config::Settings;
use crate::detect::Detector;
use crate::store::Store;
use rusqlite::Connection;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Everything the request loop owns. `store` is empty until a workspace is
/// selected.
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub settings: Settings,
    pub fixture_path: Option<PathBuf>,
    pub store: Store,
    pub detector: Detector,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            workspace: None,
            db: None,
            settings: Settings::default(),
            fixture_path: None,
            store: Store::default(),
            detector: Detector::default(),
        }
    }
}
