//! A scriptable in-memory automation tree.
//!
//! `SimulatedTree` plays the role the real desktop plays in production: a
//! mutable UI tree the harness can only observe through [`UiTree`]. Scripts
//! attach windows and controls, schedule reveals (a control appearing some
//! time after a click, like the disconnect button once the VPN comes up),
//! and mark nodes as invoke-refusing or unreadable to exercise the fallback
//! and tolerance paths.
//!
//! It backs the unit and integration tests and the `selfcheck` command.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::tree::UiTree;
use super::types::{
    AutomationError, AutomationResult, ControlKind, NodeAttributes, NodeId, WindowRef,
};
use crate::launcher::{LaunchError, ProcessControl};

/// What activating a node does to the tree
#[derive(Debug, Clone, Copy)]
pub enum Effect {
    /// Make a node visible, optionally after a delay
    Reveal { node: NodeId, after: Duration },
    /// Take a node out of the tree
    Remove { node: NodeId },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Visibility {
    Visible,
    Hidden,
    RevealAt(Instant),
}

#[derive(Debug)]
struct SimNode {
    attrs: NodeAttributes,
    children: Vec<NodeId>,
    visibility: Visibility,
    unreadable: bool,
    refuse_invoke: bool,
    on_activate: Vec<Effect>,
    invoke_count: u32,
    click_count: u32,
}

impl SimNode {
    fn new(attrs: NodeAttributes) -> Self {
        Self {
            attrs,
            children: Vec::new(),
            visibility: Visibility::Visible,
            unreadable: false,
            refuse_invoke: false,
            on_activate: Vec::new(),
            invoke_count: 0,
            click_count: 0,
        }
    }

    fn visible_now(&self, now: Instant) -> bool {
        match self.visibility {
            Visibility::Visible => true,
            Visibility::Hidden => false,
            Visibility::RevealAt(at) => now >= at,
        }
    }
}

#[derive(Debug)]
struct SimState {
    next_id: NodeId,
    nodes: HashMap<NodeId, SimNode>,
    desktop: NodeId,
}

/// Scriptable automation tree; cheap to clone, clones share state.
#[derive(Debug, Clone)]
pub struct SimulatedTree {
    inner: Arc<Mutex<SimState>>,
}

impl SimulatedTree {
    /// An empty desktop
    pub fn new() -> Self {
        let desktop = SimNode::new(NodeAttributes {
            kind: ControlKind::Other,
            name: "Desktop".to_string(),
            automation_id: String::new(),
            class_name: String::new(),
        });
        let mut nodes = HashMap::new();
        nodes.insert(0, desktop);
        Self {
            inner: Arc::new(Mutex::new(SimState {
                next_id: 1,
                nodes,
                desktop: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.inner.lock().expect("simulated tree lock poisoned")
    }

    fn insert(&self, parent: NodeId, node: SimNode) -> NodeId {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.nodes.insert(id, node);
        if let Some(parent) = state.nodes.get_mut(&parent) {
            parent.children.push(id);
        }
        id
    }

    /// Attach a visible top-level window to the desktop
    pub fn add_window(&self, automation_id: &str, name: &str) -> WindowRef {
        let desktop = self.lock().desktop;
        let id = self.insert(
            desktop,
            SimNode::new(NodeAttributes {
                kind: ControlKind::Window,
                name: name.to_string(),
                automation_id: automation_id.to_string(),
                class_name: String::new(),
            }),
        );
        WindowRef(id)
    }

    /// Attach a hidden top-level window, to be revealed by an effect
    pub fn add_hidden_window(&self, automation_id: &str, name: &str) -> WindowRef {
        let window = self.add_window(automation_id, name);
        self.lock()
            .nodes
            .get_mut(&window.0)
            .expect("window just inserted")
            .visibility = Visibility::Hidden;
        window
    }

    /// Attach a visible child element
    pub fn add_child(&self, parent: NodeId, kind: ControlKind, automation_id: &str, name: &str) -> NodeId {
        self.insert(
            parent,
            SimNode::new(NodeAttributes {
                kind,
                name: name.to_string(),
                automation_id: automation_id.to_string(),
                class_name: String::new(),
            }),
        )
    }

    /// Attach a hidden child element, to be revealed by an effect
    pub fn add_hidden_child(&self, parent: NodeId, kind: ControlKind, automation_id: &str, name: &str) -> NodeId {
        let id = self.add_child(parent, kind, automation_id, name);
        self.lock()
            .nodes
            .get_mut(&id)
            .expect("child just inserted")
            .visibility = Visibility::Hidden;
        id
    }

    /// Script what activating `node` does
    pub fn on_activate(&self, node: NodeId, effect: Effect) {
        if let Some(node) = self.lock().nodes.get_mut(&node) {
            node.on_activate.push(effect);
        }
    }

    /// Make invoke fail for `node`, leaving only the raw click path
    pub fn refuse_invoke(&self, node: NodeId) {
        if let Some(node) = self.lock().nodes.get_mut(&node) {
            node.refuse_invoke = true;
        }
    }

    /// Make attribute reads fail for `node` (a mid-destruction element)
    pub fn set_unreadable(&self, node: NodeId, unreadable: bool) {
        if let Some(node) = self.lock().nodes.get_mut(&node) {
            node.unreadable = unreadable;
        }
    }

    /// Make `node` visible immediately
    pub fn reveal(&self, node: NodeId) {
        if let Some(node) = self.lock().nodes.get_mut(&node) {
            node.visibility = Visibility::Visible;
        }
    }

    /// Make `node` visible once `delay` has elapsed
    pub fn reveal_after(&self, node: NodeId, delay: Duration) {
        let at = Instant::now() + delay;
        if let Some(node) = self.lock().nodes.get_mut(&node) {
            node.visibility = if delay.is_zero() {
                Visibility::Visible
            } else {
                Visibility::RevealAt(at)
            };
        }
    }

    /// Take `node` out of the tree
    pub fn remove(&self, node: NodeId) {
        if let Some(node) = self.lock().nodes.get_mut(&node) {
            node.visibility = Visibility::Hidden;
        }
    }

    /// Whether `node` is currently visible
    pub fn is_visible(&self, node: NodeId) -> bool {
        let state = self.lock();
        state
            .nodes
            .get(&node)
            .map(|n| n.visible_now(Instant::now()))
            .unwrap_or(false)
    }

    /// How many times `node` was semantically invoked
    pub fn invoke_count(&self, node: NodeId) -> u32 {
        self.lock().nodes.get(&node).map(|n| n.invoke_count).unwrap_or(0)
    }

    /// How many times `node` was clicked
    pub fn click_count(&self, node: NodeId) -> u32 {
        self.lock().nodes.get(&node).map(|n| n.click_count).unwrap_or(0)
    }

    /// How many times `node` was activated through either mechanism
    pub fn activation_count(&self, node: NodeId) -> u32 {
        self.invoke_count(node) + self.click_count(node)
    }

    fn apply_effects(state: &mut SimState, node: NodeId) {
        let effects: Vec<Effect> = state
            .nodes
            .get(&node)
            .map(|n| n.on_activate.clone())
            .unwrap_or_default();
        for effect in effects {
            match effect {
                Effect::Reveal { node, after } => {
                    if let Some(target) = state.nodes.get_mut(&node) {
                        target.visibility = if after.is_zero() {
                            Visibility::Visible
                        } else {
                            Visibility::RevealAt(Instant::now() + after)
                        };
                    }
                }
                Effect::Remove { node } => {
                    if let Some(target) = state.nodes.get_mut(&node) {
                        target.visibility = Visibility::Hidden;
                    }
                }
            }
        }
    }
}

impl Default for SimulatedTree {
    fn default() -> Self {
        Self::new()
    }
}

impl UiTree for SimulatedTree {
    fn desktop(&self) -> NodeId {
        self.lock().desktop
    }

    fn children(&self, node: NodeId) -> AutomationResult<Vec<NodeId>> {
        let state = self.lock();
        let now = Instant::now();
        let parent = state.nodes.get(&node).ok_or(AutomationError::Stale(node))?;
        Ok(parent
            .children
            .iter()
            .copied()
            .filter(|id| {
                state
                    .nodes
                    .get(id)
                    .map(|n| n.visible_now(now))
                    .unwrap_or(false)
            })
            .collect())
    }

    fn attributes(&self, node: NodeId) -> AutomationResult<NodeAttributes> {
        let state = self.lock();
        let found = state.nodes.get(&node).ok_or(AutomationError::Stale(node))?;
        if found.unreadable {
            return Err(AutomationError::Stale(node));
        }
        Ok(found.attrs.clone())
    }

    fn invoke(&self, node: NodeId) -> AutomationResult<()> {
        let mut state = self.lock();
        let found = state
            .nodes
            .get_mut(&node)
            .ok_or(AutomationError::Stale(node))?;
        if found.refuse_invoke {
            return Err(AutomationError::Backend(
                "element does not support the invoke pattern".to_string(),
            ));
        }
        found.invoke_count += 1;
        Self::apply_effects(&mut state, node);
        Ok(())
    }

    fn click(&self, node: NodeId) -> AutomationResult<()> {
        let mut state = self.lock();
        let found = state
            .nodes
            .get_mut(&node)
            .ok_or(AutomationError::Stale(node))?;
        found.click_count += 1;
        Self::apply_effects(&mut state, node);
        Ok(())
    }
}

/// Process control for simulated runs.
///
/// Starting the "executable" reveals the configured window in the shared
/// tree, optionally only on the Nth attempt and after a startup delay, which
/// is all the launcher can observe of a real process.
#[derive(Debug, Clone)]
pub struct SimulatedProcesses {
    tree: SimulatedTree,
    window: WindowRef,
    succeed_on_attempt: u32,
    startup_delay: Duration,
    starts: Arc<Mutex<Vec<PathBuf>>>,
}

impl SimulatedProcesses {
    /// Reveal `window` on the first start, immediately
    pub fn new(tree: SimulatedTree, window: WindowRef) -> Self {
        Self {
            tree,
            window,
            succeed_on_attempt: 1,
            startup_delay: Duration::ZERO,
            starts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Only reveal the window on the Nth start (1-based)
    pub fn succeed_on_attempt(mut self, attempt: u32) -> Self {
        self.succeed_on_attempt = attempt;
        self
    }

    /// Delay between a successful start and the window appearing
    pub fn startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    /// How many times the executable was started
    pub fn start_count(&self) -> u32 {
        self.starts.lock().expect("start log lock poisoned").len() as u32
    }
}

impl ProcessControl for SimulatedProcesses {
    fn start(&mut self, executable: &Path) -> Result<(), LaunchError> {
        let mut starts = self.starts.lock().expect("start log lock poisoned");
        starts.push(executable.to_path_buf());
        if starts.len() as u32 >= self.succeed_on_attempt {
            self.tree.reveal_after(self.window.0, self.startup_delay);
        }
        Ok(())
    }

    fn pids_by_name(&self, _name: &str) -> Vec<u32> {
        if self.tree.is_visible(self.window.0) {
            vec![4242]
        } else {
            Vec::new()
        }
    }

    fn close_gracefully(&self, _pid: u32) -> bool {
        self.tree.remove(self.window.0);
        true
    }

    fn kill(&self, _pid: u32) -> bool {
        self.tree.remove(self.window.0);
        true
    }

    fn wait_for_exit(&self, _pid: u32, _timeout: Duration) -> bool {
        !self.tree.is_visible(self.window.0)
    }
}

/// A scripted stand-in for the whole client, wired per an [`AppProfile`].
///
/// The quick-access window stays hidden until the simulated process starts.
/// Support opens the main window; Connect grows a Disconnect button after
/// `connect_delay`; Close closes the main window; the sign-out and quit
/// buttons open their confirmation dialogs, whose confirm buttons close
/// them (quit also closes the client's windows). Cancel buttons close just
/// the dialog, which is what the abort compensation needs.
#[derive(Debug, Clone)]
pub struct SimulatedClient {
    /// The tree everything lives in
    pub tree: SimulatedTree,
    /// Quick-access panel (hidden until process start)
    pub quick_access: WindowRef,
    /// Main window (hidden until Support is clicked)
    pub main_window: WindowRef,
    /// The connect button on the home page
    pub connect_button: NodeId,
    /// The disconnect button that appears once connected
    pub disconnect_button: NodeId,
}

impl SimulatedClient {
    /// Build the scripted client for `profile`.
    pub fn new(profile: &crate::config::AppProfile, connect_delay: Duration) -> Self {
        let tree = SimulatedTree::new();

        let quick_access = tree.add_hidden_window(&profile.quick_access_window_id, "Quick Access");
        let support =
            tree.add_child(quick_access.0, ControlKind::Button, &profile.support_button_id, "Support");
        let sign_out = tree.add_child(
            quick_access.0,
            ControlKind::Button,
            &profile.sign_out_button_id,
            "Sign Out",
        );
        let quit =
            tree.add_child(quick_access.0, ControlKind::Button, &profile.quit_button_id, "Quit");

        let main_window =
            tree.add_hidden_window(&profile.main_window_id, &profile.main_window_name);
        tree.add_child(
            main_window.0,
            ControlKind::Button,
            &profile.home_button_id,
            "Home",
        );
        let close = tree.add_child(
            main_window.0,
            ControlKind::Button,
            &profile.close_button_id,
            "Close",
        );
        let tab = tree.add_child(main_window.0, ControlKind::Tab, "", "");
        let custom = tree.add_child(tab, ControlKind::Custom, "", "");
        let connect_button = tree.add_child(
            custom,
            ControlKind::Button,
            &profile.connect_button_id,
            "Connect",
        );
        let disconnect_button = tree.add_hidden_child(
            custom,
            ControlKind::Button,
            "",
            &profile.disconnect_button_name,
        );

        tree.on_activate(support, Effect::Reveal { node: main_window.0, after: Duration::ZERO });
        tree.on_activate(connect_button, Effect::Reveal { node: disconnect_button, after: connect_delay });
        tree.on_activate(close, Effect::Remove { node: main_window.0 });

        let sign_out_dialog =
            tree.add_hidden_window(&profile.sign_out_dialog_id, "Sign out of Harmony SASE?");
        let sign_out_confirm = tree.add_child(
            sign_out_dialog.0,
            ControlKind::Button,
            &profile.sign_out_confirm_button_id,
            "Sign Out",
        );
        let sign_out_cancel = tree.add_child(
            sign_out_dialog.0,
            ControlKind::Button,
            &profile.sign_out_cancel_button_id,
            "Cancel",
        );
        tree.on_activate(sign_out, Effect::Reveal { node: sign_out_dialog.0, after: Duration::ZERO });
        tree.on_activate(sign_out_confirm, Effect::Remove { node: sign_out_dialog.0 });
        tree.on_activate(sign_out_cancel, Effect::Remove { node: sign_out_dialog.0 });

        let quit_dialog = tree.add_hidden_window(&profile.quit_dialog_id, "Quit Harmony SASE?");
        let quit_confirm = tree.add_child(
            quit_dialog.0,
            ControlKind::Button,
            &profile.quit_confirm_button_id,
            "Quit",
        );
        let quit_cancel = tree.add_child(
            quit_dialog.0,
            ControlKind::Button,
            &profile.quit_cancel_button_id,
            "Cancel",
        );
        tree.on_activate(quit, Effect::Reveal { node: quit_dialog.0, after: Duration::ZERO });
        tree.on_activate(quit_confirm, Effect::Remove { node: quit_dialog.0 });
        tree.on_activate(quit_confirm, Effect::Remove { node: main_window.0 });
        tree.on_activate(quit_confirm, Effect::Remove { node: quick_access.0 });
        tree.on_activate(quit_cancel, Effect::Remove { node: quit_dialog.0 });

        Self {
            tree,
            quick_access,
            main_window,
            connect_button,
            disconnect_button,
        }
    }

    /// Process control whose `start` reveals the quick-access window.
    pub fn processes(&self) -> SimulatedProcesses {
        SimulatedProcesses::new(self.tree.clone(), self.quick_access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_window_not_enumerated() {
        let sim = SimulatedTree::new();
        let shown = sim.add_window("Shown", "Shown");
        let hidden = sim.add_hidden_window("Hidden", "Hidden");

        let children = sim.children(sim.desktop()).unwrap();
        assert!(children.contains(&shown.0));
        assert!(!children.contains(&hidden.0));
    }

    #[test]
    fn test_click_effect_reveals_node() {
        let sim = SimulatedTree::new();
        let win = sim.add_window("Win", "Win");
        let button = sim.add_child(win.0, ControlKind::Button, "Connect", "Connect");
        let target = sim.add_hidden_child(win.0, ControlKind::Button, "", "Disconnect");
        sim.on_activate(button, Effect::Reveal { node: target, after: Duration::ZERO });

        assert!(!sim.is_visible(target));
        sim.click(button).unwrap();
        assert!(sim.is_visible(target));
        assert_eq!(sim.click_count(button), 1);
    }

    #[test]
    fn test_refuse_invoke_still_clicks() {
        let sim = SimulatedTree::new();
        let win = sim.add_window("Win", "Win");
        let button = sim.add_child(win.0, ControlKind::Button, "Stubborn", "Stubborn");
        sim.refuse_invoke(button);

        assert!(sim.invoke(button).is_err());
        assert!(sim.click(button).is_ok());
        assert_eq!(sim.invoke_count(button), 0);
        assert_eq!(sim.click_count(button), 1);
    }

    #[test]
    fn test_simulated_processes_reveal_on_nth_start() {
        let sim = SimulatedTree::new();
        let window = sim.add_hidden_window("QuickAccessWindow", "Quick Access");
        let mut procs = SimulatedProcesses::new(sim.clone(), window).succeed_on_attempt(2);

        procs.start(Path::new("/opt/client")).unwrap();
        assert!(!sim.is_visible(window.0));
        procs.start(Path::new("/opt/client")).unwrap();
        assert!(sim.is_visible(window.0));
        assert_eq!(procs.start_count(), 2);
    }
}
