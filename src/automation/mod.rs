pub mod sim;
pub mod tree;
pub mod types;

pub use sim::{Effect, SimulatedClient, SimulatedProcesses, SimulatedTree};
pub use tree::{UiTree, find_all_descendants, find_child, find_first_descendant, native_tree};
pub use types::{
    AutomationError, AutomationResult, ControlKind, ElementQuery, ElementRef, NodeAttributes,
    NodeId, WindowRef,
};
