use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use log::info;
use once_cell::sync::OnceCell;
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::macros::format_description;

use super::settings::EngineSettings;
use crate::graph_utils::geometry::{Point, point};
use crate::graph_utils::graph::Graph;
use crate::view::Viewport;

/// Everything needed to reopen a canvas where it was left: the graph with its node
/// positions, and the pan/zoom transform.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionFile {
    pub graph: Graph,
    pub offset: (f32, f32),
    pub scale: f32,
}

impl SessionFile {
    pub fn from_runtime(graph: &Graph, viewport: &Viewport) -> Self {
        let offset = viewport.offset();
        Self {
            graph: graph.clone(),
            offset: (offset.x, offset.y),
            scale: viewport.scale(),
        }
    }

    /// Convert a persisted SessionFile into runtime structures.
    ///
    /// This consumes `self` to avoid cloning the graph.
    #[allow(clippy::wrong_self_convention)]
    pub fn to_runtime(self) -> (Graph, Point, f32) {
        (self.graph, point(self.offset.0, self.offset.1), self.scale)
    }
}

static SETTINGS_OVERRIDE: OnceCell<EngineSettings> = OnceCell::new();

pub fn set_settings_override(settings: EngineSettings) {
    let _ = SETTINGS_OVERRIDE.set(settings);
}

pub fn autosave_dir() -> PathBuf {
    // If an override is set (e.g. from main.rs), use it.
    if let Some(settings) = SETTINGS_OVERRIDE.get() {
        return settings.autosave_dir();
    }
    // Load settings if present; else use defaults
    let settings = EngineSettings::load().unwrap_or_default();
    settings.autosave_dir()
}

pub fn active_session_path(dir: &Path) -> PathBuf {
    dir.join("session.ron")
}

pub fn versioned_session_path_now(dir: &Path) -> PathBuf {
    let now = OffsetDateTime::now_utc();
    let fmt = format_description!("[year][month][day]_[hour][minute][second]");
    let stamp = now.format(fmt).unwrap_or_else(|_| "unknown".to_string());
    dir.join(format!("session_{}.ron", stamp))
}

pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let tmp_path = path.with_extension("ron.tmp");
    {
        let mut f = File::create(&tmp_path)?;
        f.write_all(data)?;
        f.flush()?;
    }
    fs::rename(tmp_path, path)?;
    Ok(())
}

pub(crate) fn to_pretty_ron<T: Serialize>(value: &T) -> anyhow::Result<String> {
    let pretty = PrettyConfig::new()
        .separate_tuple_members(true)
        .enumerate_arrays(true);
    Ok(ron::ser::to_string_pretty(value, pretty)?)
}

pub fn save_session(dir: &Path, state: &SessionFile) -> anyhow::Result<PathBuf> {
    write_session(dir, active_session_path(dir), state)
}

pub fn save_versioned(dir: &Path, state: &SessionFile) -> anyhow::Result<PathBuf> {
    write_session(dir, versioned_session_path_now(dir), state)
}

fn write_session(dir: &Path, path: PathBuf, state: &SessionFile) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    let s = to_pretty_ron(state)?;
    atomic_write(&path, s.as_bytes())?;
    info!(
        "saved session ({} nodes, {} edges) to {}",
        state.graph.node_count(),
        state.graph.edge_count(),
        path.display()
    );
    Ok(path)
}

/// Save into the configured autosave directory.
pub fn save_active(state: &SessionFile) -> anyhow::Result<PathBuf> {
    save_session(&autosave_dir(), state)
}

pub fn load_active() -> anyhow::Result<Option<SessionFile>> {
    let path = active_session_path(&autosave_dir());
    if !path.exists() {
        return Ok(None);
    }
    load_from_path(&path).map(Some)
}

pub fn load_from_path(path: &Path) -> anyhow::Result<SessionFile> {
    let mut f = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let state: SessionFile =
        ron::from_str(&buf).with_context(|| format!("invalid session file {}", path.display()))?;
    Ok(state)
}

pub fn list_versions(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = Vec::new();
    if dir.exists() {
        for e in fs::read_dir(dir)? {
            let p = e?.path();
            if let Some(name) = p.file_name().and_then(|s| s.to_str())
                && name.starts_with("session_") && name.ends_with(".ron")
            {
                entries.push(p);
            }
        }
    }
    // sort descending by filename (timestamp)
    entries.sort();
    entries.reverse();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::ViewportParams;

    #[test]
    fn session_roundtrip_keeps_order_positions_and_view() {
        let dir = tempfile::tempdir().unwrap();
        let mut g = Graph::new(50.0);
        g.insert_node(9, "nine", "last id first", point(1.5, -2.0));
        g.insert_node(2, "two", "", point(300.0, 40.0));
        g.add_edge(9, 2, "cites");
        let mut v = Viewport::new(&ViewportParams::default());
        v.pan(point(12.0, 34.0));

        let path = save_session(dir.path(), &SessionFile::from_runtime(&g, &v)).unwrap();
        assert_eq!(path, dir.path().join("session.ron"));
        let (graph, offset, scale) = load_from_path(&path).unwrap().to_runtime();

        assert_eq!(graph.node_radius, 50.0);
        assert_eq!(graph.nodes.keys().copied().collect::<Vec<_>>(), vec![9, 2]);
        assert_eq!(graph.node(9).unwrap().position, point(1.5, -2.0));
        assert_eq!(graph.node(9).unwrap().description, "last id first");
        assert_eq!(graph.edges().len(), 1);
        assert_eq!(offset, point(12.0, 34.0));
        assert_eq!(scale, 1.0);
    }

    #[test]
    fn versions_are_listed_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["session_20240101_000000.ron", "session_20250101_000000.ron", "session.ron", "notes.txt"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let versions = list_versions(dir.path()).unwrap();
        let names: Vec<_> = versions.iter().filter_map(|p| p.file_name()?.to_str()).collect();
        assert_eq!(names, vec!["session_20250101_000000.ron", "session_20240101_000000.ron"]);
    }
}
