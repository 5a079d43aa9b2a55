use graph_weave::bridge::{EngineCommand, command_channel};
use graph_weave::engine::{Engine, EngineEvent};
use graph_weave::graph_utils::geometry::point;
use graph_weave::graph_utils::graph::Graph;
use graph_weave::layout::{LayoutParams, PlacementParams, place, relax};
use graph_weave::persistence::persist;
use graph_weave::persistence::settings::EngineSettings;
use graph_weave::persistence::store::{GraphStore, MemoryStore, Mutation};
use graph_weave::view::{Viewport, ViewportParams, hit_test};

fn new_graph() -> Graph {
    Graph::new(120.0)
}

fn min_pairwise_distance(g: &Graph) -> f32 {
    let nodes: Vec<_> = g.nodes().collect();
    let mut min = f32::INFINITY;
    for (i, a) in nodes.iter().enumerate() {
        for b in &nodes[i + 1..] {
            min = min.min(a.position.distance(b.position));
        }
    }
    min
}

fn seeded_engine() -> Engine {
    let mut g = new_graph();
    g.insert_node(1, "alpha", "first", point(0.0, 0.0));
    g.insert_node(2, "beta", "second", point(900.0, 0.0));
    g.insert_node(3, "gamma", "third", point(0.0, 900.0));
    g.add_edge(1, 2, "knows");
    g.add_edge(1, 3, "owns");
    let mut e = Engine::new(EngineSettings::default());
    e.seed(g);
    e.resize(1280.0, 720.0);
    e
}

#[test]
fn relax_pushes_collinear_triple_apart() {
    let mut g = new_graph();
    g.insert_node(1, "a", "", point(0.0, 0.0));
    g.insert_node(2, "b", "", point(50.0, 0.0));
    g.insert_node(3, "c", "", point(100.0, 0.0));

    let report = relax(&mut g, &LayoutParams::default());
    assert_eq!(report.iterations, 200);
    assert!(report.converged, "last delta {}", report.last_max_delta);
    assert!(min_pairwise_distance(&g) >= 480.0 - 1e-2, "min distance {}", min_pairwise_distance(&g));
    // still on the x axis
    assert!(g.nodes().all(|n| n.position.y.abs() < 1e-3));
}

#[test]
fn relax_pulls_linked_pair_towards_ideal_length() {
    let mut g = new_graph();
    g.insert_node(1, "a", "", point(0.0, 0.0));
    g.insert_node(2, "b", "", point(3000.0, 0.0));
    g.add_edge(1, 2, "r");
    relax(&mut g, &LayoutParams::default());
    let d = g.node(1).unwrap().position.distance(g.node(2).unwrap().position);
    assert!((d - 800.0).abs() < 5.0, "distance {}", d);
}

#[test]
fn placement_escapes_a_dense_cluster() {
    let mut g = new_graph();
    g.insert_node(1, "c", "", point(0.0, 0.0));
    g.insert_node(2, "e", "", point(200.0, 0.0));
    g.insert_node(3, "w", "", point(-200.0, 0.0));
    g.insert_node(4, "n", "", point(0.0, 200.0));
    g.insert_node(5, "s", "", point(0.0, -200.0));

    let params = PlacementParams::default();
    let placed = place(&g, point(0.0, 0.0), &params);
    assert!(placed.resolved);
    assert!(placed.attempts <= params.max_attempts);
    for n in g.nodes() {
        assert!(n.position.distance(placed.position) >= 360.0 - 1e-3);
    }

    let id = g.add_node("new", "", point(0.0, 0.0), Some((1, "near".into())), &params);
    assert_eq!(id, 6);
    assert_eq!(g.node(id).unwrap().position, placed.position);
    assert_eq!(g.degree(1), 1);
}

#[test]
fn edge_to_missing_node_is_a_no_op() {
    let mut g = new_graph();
    g.insert_node(1, "a", "", point(0.0, 0.0));
    assert!(!g.add_edge(1, 2, "dangling"));
    assert!(!g.add_edge(9, 1, "dangling"));
    assert_eq!(g.edge_count(), 0);
}

#[test]
fn remove_node_cascades_to_its_edges() {
    let mut g = new_graph();
    g.insert_node(1, "a", "", point(0.0, 0.0));
    g.insert_node(2, "b", "", point(500.0, 0.0));
    g.insert_node(3, "c", "", point(0.0, 500.0));
    g.add_edge(1, 2, "x");
    g.add_edge(3, 1, "y");
    g.add_edge(2, 3, "z");

    assert!(g.remove_node(1));
    assert!(!g.remove_node(1));
    assert_eq!(g.edge_count(), 1);
    assert!(g.edges().iter().all(|e| !e.touches(1)));
}

#[test]
fn hit_test_prefers_the_earliest_node() {
    let mut g = new_graph();
    g.insert_node(7, "first", "", point(0.0, 0.0));
    g.insert_node(3, "second", "", point(100.0, 0.0));
    assert_eq!(hit_test(&g, point(50.0, 0.0)), Some(7));
    assert_eq!(hit_test(&g, point(200.0, 0.0)), Some(3));
    assert_eq!(hit_test(&g, point(0.0, 500.0)), None);
}

#[test]
fn zoom_in_then_out_returns_to_the_same_transform() {
    let mut g = new_graph();
    g.insert_node(1, "a", "", point(0.0, 0.0));
    g.insert_node(2, "b", "", point(2000.0, 1000.0));
    let mut vp = Viewport::new(&ViewportParams::default());
    vp.resize(1000.0, 800.0);
    assert!(vp.fit_to_bounds(g.bounds().unwrap()));
    let (scale, offset) = (vp.scale(), vp.offset());

    let focal = point(300.0, 250.0);
    let anchored = vp.screen_to_world(focal);
    vp.zoom_at(2.0, focal);
    assert!(vp.world_to_screen(anchored).distance(focal) < 1e-2);
    vp.zoom_at(0.5, focal);
    assert!((vp.scale() - scale).abs() < 1e-5);
    assert!(vp.offset().distance(offset) < 1e-2);
}

#[test]
fn session_round_trips_through_ron() {
    let dir = tempfile::tempdir().unwrap();
    let e = seeded_engine();
    let path = persist::save_session(dir.path(), &e.session()).unwrap();
    let loaded = persist::load_from_path(&path).unwrap();

    assert_eq!(loaded.scale, e.viewport().scale());
    assert_eq!(loaded.graph.node_count(), 3);
    assert_eq!(loaded.graph.edges(), e.graph().edges());
    let order: Vec<_> = loaded.graph.nodes().map(|n| n.id).collect();
    assert_eq!(order, vec![1, 2, 3]);

    let mut reopened = Engine::new(EngineSettings::default());
    reopened.restore(loaded);
    reopened.resize(1280.0, 720.0);
    assert_eq!(reopened.viewport().scale(), e.viewport().scale());
}

#[test]
fn drag_and_edits_reach_the_store() {
    let mut store = MemoryStore::new(seeded_engine().graph().clone());
    let mut e = Engine::new(EngineSettings::default());
    e.seed_from(&mut store).unwrap();
    e.resize(1280.0, 720.0);

    let start = e.viewport().world_to_screen(e.graph().node(2).unwrap().position);
    e.pointer_down(start);
    e.pointer_move(start + point(30.0, 10.0));
    e.pointer_up(start + point(30.0, 10.0));
    let moved = e.graph().node(2).unwrap().position;
    assert!(!e.graph().node(2).unwrap().pinned);

    assert!(e.update_node_text(3, "gamma prime", "edited"));
    assert_eq!(e.remove_edge(2, 1), 1);
    assert_eq!(e.flush_to(&mut store).unwrap(), 3);

    assert_eq!(store.log[0], Mutation::NodeMoved { id: 2, position: moved });
    assert_eq!(store.graph.node(2).unwrap().position, moved);
    assert_eq!(store.graph.node(3).unwrap().title, "gamma prime");
    assert_eq!(store.graph.edge_count(), 1);
    assert_eq!(store.load().unwrap().edge_count(), 1);
    // a drag is not a tap
    assert!(e.drain_events().is_empty());
}

#[test]
fn commands_from_another_thread_are_applied_in_order() {
    let mut e = seeded_engine();
    let (tx, rx) = command_channel();
    let producer = std::thread::spawn(move || {
        tx.send(EngineCommand::AddNode {
            title: "delta".into(),
            description: "from a loader".into(),
            spawn_hint: Some(point(0.0, 0.0)),
            connect_to: Some((1, "found".into())),
        })
        .unwrap();
        tx.send(EngineCommand::RemoveNode { id: 2 }).unwrap();
        tx.send(EngineCommand::AddEdge { source: 4, target: 3, label: "cites".into() }).unwrap();
    });
    producer.join().unwrap();

    assert_eq!(e.apply_commands(&rx), 3);
    assert_eq!(e.graph().node_count(), 3);
    assert_eq!(e.graph().node(4).unwrap().title, "delta");
    assert_eq!(e.graph().degree(4), 2);
    assert!(e.graph().node(2).is_none());
    assert_eq!(e.frame().nodes.len(), 3);
}

#[test]
fn tapping_a_node_reports_its_details() {
    let mut e = seeded_engine();
    let at = e.viewport().world_to_screen(e.graph().node(3).unwrap().position);
    e.pointer_down(at);
    e.pointer_up(at);
    match e.drain_events().as_slice() {
        [EngineEvent::NodeSelected(sel)] => {
            assert_eq!(sel.id, 3);
            assert_eq!(sel.title, "gamma");
            assert_eq!(sel.description, "third");
        }
        other => panic!("unexpected events {:?}", other),
    }
}

fn drag_node_two(e: &mut Engine) -> graph_weave::Point {
    let start = e.viewport().world_to_screen(e.graph().node(2).unwrap().position);
    e.pointer_down(start);
    e.pointer_move(start + point(80.0, 40.0));
    e.graph().node(2).unwrap().position
}

#[test]
fn pinch_over_a_drag_still_reports_the_drop() {
    let mut e = seeded_engine();
    let mut store = MemoryStore::new(e.graph().clone());
    let dropped = drag_node_two(&mut e);

    e.pinch(1.2, point(640.0, 360.0));
    e.pinch_end();
    e.pointer_up(point(0.0, 0.0));

    assert_eq!(e.flush_to(&mut store).unwrap(), 1);
    assert_eq!(store.log, vec![Mutation::NodeMoved { id: 2, position: dropped }]);
    assert_eq!(store.graph.node(2).unwrap().position, e.graph().node(2).unwrap().position);
}

#[test]
fn cancelled_drag_still_reports_the_drop() {
    let mut e = seeded_engine();
    let mut store = MemoryStore::new(e.graph().clone());
    let dropped = drag_node_two(&mut e);

    e.cancel_gesture();
    assert!(!e.graph().node(2).unwrap().pinned);
    e.flush_to(&mut store).unwrap();
    assert_eq!(store.graph.node(2).unwrap().position, dropped);
}

#[test]
fn second_press_without_release_reports_the_drop() {
    let mut e = seeded_engine();
    let dropped = drag_node_two(&mut e);

    let elsewhere = e.viewport().world_to_screen(e.graph().node(3).unwrap().position);
    e.pointer_down(elsewhere);
    e.pointer_up(elsewhere);
    assert_eq!(e.drain_mutations(), vec![Mutation::NodeMoved { id: 2, position: dropped }]);
    assert_eq!(e.selected(), Some(3));
}
