use droplet::ViewSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub id: String,
    pub version: String,
    pub description: String,
    pub connection: Connection,
    /// Directory capture keys are resolved against.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub view: ViewSettings,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Connection {
    pub ip: String,
    pub port: u16,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config: ServerConfig = serde_json::from_str(
            r#"{"name": "wavedroplet", "id": "wd", "version": "0.3.0",
                "description": "", "connection": {"ip": "127.0.0.1", "port": 0},
                "view": {"chart_width": 1400}}"#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.view.chart_width, 1400.0);
        assert_eq!(config.view.search_window, 50);
    }
}
