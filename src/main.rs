use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::info;

use graph_weave::engine::Engine;
use graph_weave::graph_utils::geometry::{Point, point};
use graph_weave::graph_utils::graph::Graph;
use graph_weave::persistence::persist::{self, SessionFile};
use graph_weave::persistence::settings::EngineSettings;
use graph_weave::persistence::store::{GraphStore, SessionFileStore};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Session file to open (RON). Defaults to the autosave session.
    #[arg(long)]
    session: Option<PathBuf>,
    /// Directory holding settings.json. Defaults to the per-user config directory.
    #[arg(long)]
    settings_dir: Option<PathBuf>,
    /// Fill an empty session with a small sample knowledge graph.
    #[arg(long)]
    sample: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Relax the graph and print the screen-space frame as JSON.
    Layout {
        #[arg(long, default_value_t = 1280.0)]
        width: f32,
        #[arg(long, default_value_t = 720.0)]
        height: f32,
        /// Store the relaxed positions back into the session file.
        #[arg(long)]
        write_back: bool,
    },
}

fn golden_spiral_position(center: Point, k: u32, base: f32) -> Point {
    // Golden angle in radians
    let golden_angle = std::f32::consts::TAU * (1.0 - 1.0 / 1.618_033_9);
    let t = k as f32;
    // sqrt growth keeps the spiral from flying out
    let r = base * t.sqrt();
    center + Point::from_angle(t * golden_angle, r)
}

fn sample_graph(node_radius: f32) -> Graph {
    const TOPICS: [(&str, &str); 8] = [
        ("Knowledge graphs", "Entities and the typed relations between them."),
        ("Ontology", "Shared vocabulary of classes and properties."),
        ("Linked data", "Publishing graphs on the web with stable identifiers."),
        ("RDF", "Subject, predicate, object triples."),
        ("Graph databases", "Storage engines built around nodes and relationships."),
        ("Force-directed layout", "Springs along edges, repulsion between nodes."),
        ("Entity resolution", "Deciding when two records describe the same thing."),
        ("Reasoning", "Deriving new facts from existing ones and rules."),
    ];
    const LINKS: [(u64, u64, &str); 9] = [
        (1, 2, "structured by"),
        (1, 3, "published as"),
        (3, 4, "encoded in"),
        (1, 5, "stored in"),
        (1, 6, "drawn with"),
        (1, 7, "cleaned by"),
        (2, 8, "enables"),
        (4, 2, "describes"),
        (5, 6, "visualised by"),
    ];
    let mut g = Graph::new(node_radius);
    for (k, (title, description)) in TOPICS.iter().enumerate() {
        let pos = golden_spiral_position(point(0.0, 0.0), k as u32, node_radius * 2.0);
        g.insert_node(k as u64 + 1, *title, *description, pos);
    }
    for (s, t, label) in LINKS {
        g.add_edge(s, t, label);
    }
    g
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let settings = match &args.settings_dir {
        Some(dir) => EngineSettings::load_from(dir)?,
        None => EngineSettings::load().unwrap_or_default(),
    };
    persist::set_settings_override(settings.clone());

    let path = args
        .session
        .clone()
        .unwrap_or_else(|| persist::active_session_path(&persist::autosave_dir()));
    let mut store = SessionFileStore::open(&path, settings.node_radius)?;
    let mut engine = Engine::new(settings.clone());

    let mut graph = store.load()?;
    let fresh = graph.is_empty() && args.sample;
    if fresh {
        graph = sample_graph(settings.node_radius);
        info!("seeding {} with the sample graph", path.display());
    }

    match args.command {
        Some(Command::Layout { width, height, write_back }) => {
            let report = engine.seed(graph);
            engine.resize(width, height);
            info!(
                "layout: {} iterations, last delta {:.4}, converged: {}",
                report.iterations, report.last_max_delta, report.converged
            );
            if write_back || fresh {
                store.reset(engine.graph().clone())?;
                let view = engine.viewport();
                store.set_view(view.offset(), view.scale())?;
            }
            println!("{}", serde_json::to_string_pretty(engine.frame())?);
            Ok(())
        }
        None => {
            if fresh {
                engine.seed(graph);
                store.reset(engine.graph().clone())?;
            } else {
                let saved = store.session();
                engine.restore(SessionFile {
                    graph,
                    offset: saved.offset,
                    scale: saved.scale,
                });
            }
            run_gui(engine, store)
        }
    }
}

#[cfg(feature = "gui")]
fn run_gui(engine: Engine, store: SessionFileStore) -> anyhow::Result<()> {
    use eframe::egui;
    use graph_weave::gui::CanvasApp;

    let commands = graph_weave::bridge::init_broker();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1300.0, 710.0])
            // Provide sensible bounds so the UI stays usable on small screens
            .with_min_inner_size([700.0, 420.0])
            .with_resizable(true),
        ..Default::default()
    };
    eframe::run_native(
        "Graph-Weave",
        options,
        Box::new(move |_cc| Ok(Box::new(CanvasApp::new(engine, store, commands)) as Box<dyn eframe::App>)),
    )
    .map_err(|e| anyhow::anyhow!("viewer failed: {e}"))
}

#[cfg(not(feature = "gui"))]
fn run_gui(_engine: Engine, _store: SessionFileStore) -> anyhow::Result<()> {
    anyhow::bail!("built without the `gui` feature; use the `layout` subcommand")
}
