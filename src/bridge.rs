//! Hand-off point for mutations that originate off the engine's thread (network callbacks,
//! background loaders). Producers send [`EngineCommand`]s; the thread that owns the engine
//! drains them with [`crate::engine::Engine::apply_commands`].

use once_cell::sync::OnceCell;
use std::sync::mpsc::{Receiver, SendError, Sender};

use crate::graph_utils::geometry::Point;
use crate::graph_utils::graph::NodeId;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    AddNode {
        title: String,
        description: String,
        // None spawns at the centre of the view
        spawn_hint: Option<Point>,
        connect_to: Option<(NodeId, String)>,
    },
    AddEdge { source: NodeId, target: NodeId, label: String },
    RemoveEdge { source: NodeId, target: NodeId },
    RemoveNode { id: NodeId },
    UpdateNode { id: NodeId, title: String, description: String },
    Relayout,
}

pub type CommandSender = Sender<EngineCommand>;
pub type CommandReceiver = Receiver<EngineCommand>;

// Process-wide sender for producers that cannot be handed one directly
static COMMAND_TX: OnceCell<CommandSender> = OnceCell::new();

pub fn command_channel() -> (CommandSender, CommandReceiver) {
    std::sync::mpsc::channel()
}

pub fn set_command_sender(tx: CommandSender) -> bool {
    COMMAND_TX.set(tx).is_ok()
}

pub fn get_command_sender() -> Option<&'static CommandSender> {
    COMMAND_TX.get()
}

// Called by the host on startup: create the pair and publish the sender
pub fn init_broker() -> CommandReceiver {
    let (tx, rx) = command_channel();
    if !set_command_sender(tx) {
        log::warn!("command broker already initialised; new receiver will stay idle");
    }
    rx
}

/// Send through the published sender, if any.
pub fn submit(cmd: EngineCommand) -> Result<(), SendError<EngineCommand>> {
    match get_command_sender() {
        Some(tx) => tx.send(cmd),
        None => Err(SendError(cmd)),
    }
}
