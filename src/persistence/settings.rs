use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::store::neo4j::Neo4jConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    // Store connection
    #[serde(default = "AppSettings::default_uri")]
    pub neo4j_uri: String,
    #[serde(default = "AppSettings::default_user")]
    pub neo4j_user: String,
    #[serde(default)]
    pub neo4j_password: String,
    // Bridge server (serves the rendered page, receives clicks)
    #[serde(default = "AppSettings::default_bind_addr")]
    pub bridge_bind_addr: String,
    #[serde(default = "AppSettings::default_port")]
    pub bridge_port: u16,
    #[serde(default = "AppSettings::default_true")]
    pub open_browser_on_start: bool,
    // If None, rendered documents go under the OS temp dir
    #[serde(default)]
    pub render_override: Option<PathBuf>,
    // If None, exports default to the OS temp dir
    #[serde(default)]
    pub export_override: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            neo4j_uri: Self::default_uri(),
            neo4j_user: Self::default_user(),
            neo4j_password: String::new(),
            bridge_bind_addr: Self::default_bind_addr(),
            bridge_port: Self::default_port(),
            open_browser_on_start: true,
            render_override: None,
            export_override: None,
        }
    }
}

impl AppSettings {
    fn config_dir() -> PathBuf {
        // Cross-platform user config dir
        #[cfg(target_os = "macos")]
        {
            // ~/Library/Application Support/Graph-Atlas
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join("Library").join("Application Support").join("Graph-Atlas");
        }
        #[cfg(target_os = "windows")]
        {
            // %APPDATA%\Graph-Atlas
            if let Ok(appdata) = std::env::var("APPDATA") {
                return PathBuf::from(appdata).join("Graph-Atlas");
            }
            return PathBuf::from("Graph-Atlas");
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // $XDG_CONFIG_HOME/Graph-Atlas or ~/.config/Graph-Atlas
            if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
                return PathBuf::from(xdg).join("Graph-Atlas");
            }
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join(".config").join("Graph-Atlas");
        }
    }

    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_dir().join("settings.json");
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let mut f = std::fs::File::open(path)?;
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        let v: Self = serde_json::from_str(&s)?;
        Ok(v)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let dir = Self::config_dir();
        fs::create_dir_all(&dir)?;
        self.save_to(&dir.join("settings.json"))
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        let s = serde_json::to_string_pretty(self)?;
        let mut f = std::fs::File::create(path)?;
        f.write_all(s.as_bytes())?;
        Ok(())
    }

    /// Return the directory where the settings file (settings.json) is stored.
    pub fn settings_dir() -> PathBuf {
        Self::config_dir()
    }

    pub fn neo4j_config(&self) -> Neo4jConfig {
        Neo4jConfig {
            uri: self.neo4j_uri.clone(),
            username: self.neo4j_user.clone(),
            password: self.neo4j_password.clone(),
        }
    }

    /// Directory the live rendered document is written to.
    pub fn render_dir(&self) -> PathBuf {
        if let Some(p) = &self.render_override {
            return p.clone();
        }
        let mut p = std::env::temp_dir();
        p.push("Graph-Atlas");
        p
    }

    /// Fixed-name path of the live view document.
    pub fn live_document_path(&self) -> PathBuf {
        self.render_dir().join("graph.html")
    }

    /// Default export directory when no override is set: OS temporary directory.
    pub fn export_default_dir() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push("Graph-Atlas");
        p.push("exports");
        p
    }

    /// Effective export directory honoring user override or falling back to OS temp.
    pub fn export_dir(&self) -> PathBuf {
        if let Some(p) = &self.export_override {
            return p.clone();
        }
        Self::export_default_dir()
    }

    pub(crate) fn default_uri() -> String { "bolt://localhost:7687".to_string() }
    pub(crate) fn default_user() -> String { "neo4j".to_string() }
    pub(crate) fn default_bind_addr() -> String { "127.0.0.1".to_string() }
    pub(crate) fn default_port() -> u16 { 8491 }
    pub(crate) fn default_true() -> bool { true }

    pub fn bridge_endpoint(&self) -> String {
        format!("{}:{}", self.bridge_bind_addr, self.bridge_port)
    }

    /// URL the browser opens to show the live view.
    pub fn bridge_url(&self) -> String {
        format!("http://{}:{}/", self.bridge_bind_addr, self.bridge_port)
    }
}
