use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::graph_utils::graph::DEFAULT_NODE_RADIUS;
use crate::layout::{LayoutParams, PlacementParams};
use crate::view::{FrameStyle, InteractionParams, ViewportParams};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    // If None, use OS default autosave directory
    #[serde(default)]
    pub autosave_override: Option<PathBuf>,
    #[serde(default = "EngineSettings::default_node_radius")]
    pub node_radius: f32,
    // Magnitude of the nudge given to coincident nodes when seeding; 0 disables it
    #[serde(default = "EngineSettings::default_coincident_jitter")]
    pub coincident_jitter: f32,
    #[serde(default)]
    pub layout: LayoutParams,
    #[serde(default)]
    pub placement: PlacementParams,
    #[serde(default)]
    pub viewport: ViewportParams,
    #[serde(default)]
    pub interaction: InteractionParams,
    #[serde(default)]
    pub frame: FrameStyle,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            autosave_override: None,
            node_radius: Self::default_node_radius(),
            coincident_jitter: Self::default_coincident_jitter(),
            layout: LayoutParams::default(),
            placement: PlacementParams::default(),
            viewport: ViewportParams::default(),
            interaction: InteractionParams::default(),
            frame: FrameStyle::default(),
        }
    }
}

impl EngineSettings {
    fn config_dir() -> PathBuf {
        // Cross-platform user config dir
        #[cfg(target_os = "macos")]
        {
            // ~/Library/Application Support/Graph-Weave
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join("Library").join("Application Support").join("Graph-Weave");
        }
        #[cfg(target_os = "windows")]
        {
            // %APPDATA%\Graph-Weave
            if let Ok(appdata) = std::env::var("APPDATA") {
                return PathBuf::from(appdata).join("Graph-Weave");
            }
            return PathBuf::from("Graph-Weave");
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // $XDG_CONFIG_HOME/graph-weave or ~/.config/graph-weave
            if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
                return PathBuf::from(xdg).join("graph-weave");
            }
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join(".config").join("graph-weave");
        }
    }

    fn autosave_default_dir() -> PathBuf {
        #[cfg(target_os = "windows")]
        {
            // %LOCALAPPDATA%\Graph-Weave\Sessions else TEMP
            if let Ok(local) = std::env::var("LOCALAPPDATA") {
                return PathBuf::from(local).join("Graph-Weave").join("Sessions");
            }
            return std::env::temp_dir().join("Graph-Weave");
        }
        #[cfg(not(target_os = "windows"))]
        {
            // $XDG_STATE_HOME/graph-weave or ~/.local/state/graph-weave, else tmp
            if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
                return PathBuf::from(xdg).join("graph-weave");
            }
            if let Ok(home) = std::env::var("HOME") {
                return PathBuf::from(home).join(".local").join("state").join("graph-weave");
            }
            return std::env::temp_dir().join("graph-weave");
        }
    }

    pub(crate) fn default_node_radius() -> f32 { DEFAULT_NODE_RADIUS }
    pub(crate) fn default_coincident_jitter() -> f32 { 1.0 }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_dir())
    }

    /// Read `settings.json` from `dir`, migrating a legacy `settings.ron` if that is all
    /// there is. Missing files give the defaults.
    pub fn load_from(dir: &Path) -> anyhow::Result<Self> {
        let json_path = dir.join("settings.json");
        if json_path.exists() {
            let s = read_to_string(&json_path)?;
            let v: Self = serde_json::from_str(&s)
                .with_context(|| format!("invalid settings in {}", json_path.display()))?;
            return Ok(v);
        }
        // Migrate from legacy RON if present
        let ron_path = dir.join("settings.ron");
        if ron_path.exists() {
            let s = read_to_string(&ron_path)?;
            let v: Self = ron::from_str(&s)
                .with_context(|| format!("invalid settings in {}", ron_path.display()))?;
            // Save immediately to JSON for future reads
            if let Err(e) = v.save_to(dir) {
                log::warn!("could not migrate {} to JSON: {:#}", ron_path.display(), e);
            }
            return Ok(v);
        }
        Ok(Self::default())
    }

    pub fn save(&self) -> anyhow::Result<PathBuf> {
        self.save_to(&Self::config_dir())
    }

    pub fn save_to(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join("settings.json");
        let s = serde_json::to_string_pretty(self)?;
        let mut f = fs::File::create(&path)?;
        f.write_all(s.as_bytes())?;
        Ok(path)
    }

    pub fn autosave_dir(&self) -> PathBuf {
        if let Some(p) = &self.autosave_override { return p.clone(); }
        Self::autosave_default_dir()
    }

    /// Return the directory where the settings file (settings.json) is stored.
    pub fn settings_dir() -> PathBuf {
        Self::config_dir()
    }
}

fn read_to_string(path: &Path) -> anyhow::Result<String> {
    let mut f = fs::File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let mut s = String::new();
    f.read_to_string(&mut s)?;
    Ok(s)
}
