//! Element location, interaction and window waiting.
//!
//! Lookup policy: everything resolves fresh from the desktop root at the
//! moment of use. The target application rebuilds parts of its tree whenever
//! it feels like it, so a handle obtained before a sleep is garbage after it.
//!
//! Interaction policy: try the semantic invoke capability first, fall back to
//! a simulated click. Not every control exposes a working invoke pattern;
//! some only respond to point-and-click.

use std::thread;
use std::time::{Duration, Instant};

use crate::automation::tree::{UiTree, find_all_descendants, find_child, find_first_descendant};
use crate::automation::types::{ControlKind, ElementQuery, ElementRef, NodeId, WindowRef};

/// Fixed poll interval for window waits
pub const WINDOW_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Find a button by automation id under `scope` and activate it.
///
/// A miss dumps the buttons that *are* present (the usual cause is a renamed
/// automation id in a client update) and returns `false`; it is never an
/// error.
pub fn find_and_click_button(tree: &dyn UiTree, scope: NodeId, automation_id: &str) -> bool {
    log::debug!("Searching for button with automation id '{}'", automation_id);

    let query = ElementQuery::button(automation_id);
    let Some(button) = find_first_descendant(tree, scope, &query) else {
        log::warn!("Button with automation id '{}' not found", automation_id);
        dump_buttons(tree, scope);
        return false;
    };

    log::debug!("Button with automation id '{}' found", automation_id);
    try_activate(tree, ElementRef(button))
}

/// Activate an element: semantic invoke first, raw click as fallback.
///
/// Returns `false` only if both mechanisms fail.
pub fn try_activate(tree: &dyn UiTree, element: ElementRef) -> bool {
    match tree.invoke(element.0) {
        Ok(()) => true,
        Err(invoke_err) => {
            log::debug!("Invoke failed ({}), falling back to click", invoke_err);
            match tree.click(element.0) {
                Ok(()) => true,
                Err(click_err) => {
                    log::warn!("Both invoke and click failed: {}; {}", invoke_err, click_err);
                    false
                }
            }
        }
    }
}

/// Single scan of the desktop's top-level windows for `automation_id`.
pub fn find_window(tree: &dyn UiTree, automation_id: &str) -> Option<WindowRef> {
    find_child(tree, tree.desktop(), &ElementQuery::window(automation_id)).map(WindowRef)
}

/// Single scan of the desktop's top-level windows by display name.
pub fn find_window_named(tree: &dyn UiTree, name: &str) -> Option<WindowRef> {
    find_child(tree, tree.desktop(), &ElementQuery::window_named(name)).map(WindowRef)
}

/// Poll the desktop for a window by automation id until found or `timeout`.
///
/// Returns `None` on timeout; absence is the caller's to interpret. The wait
/// never returns early without a match, and individual windows that vanish
/// mid-scan are skipped by the underlying search.
pub fn wait_for_window(tree: &dyn UiTree, automation_id: &str, timeout: Duration) -> Option<WindowRef> {
    log::debug!(
        "Waiting for window '{}' (timeout: {:?})",
        automation_id,
        timeout
    );
    let deadline = Instant::now() + timeout;

    loop {
        if let Some(window) = find_window(tree, automation_id) {
            log::debug!("Window '{}' found", automation_id);
            return Some(window);
        }
        let now = Instant::now();
        if now >= deadline {
            log::warn!("Window '{}' not found after {:?}", automation_id, timeout);
            return None;
        }
        thread::sleep(WINDOW_POLL_INTERVAL.min(deadline - now));
    }
}

/// Log every button under `scope`, for diagnosing lookup misses.
pub fn dump_buttons(tree: &dyn UiTree, scope: NodeId) {
    let buttons = find_all_descendants(tree, scope, &ElementQuery::of_kind(ControlKind::Button));
    log::warn!("Available buttons ({}):", buttons.len());
    for button in buttons {
        match tree.attributes(button) {
            Ok(attrs) => log::warn!(
                "  - Name: '{}', AutomationId: '{}'",
                attrs.name,
                attrs.automation_id
            ),
            Err(err) => log::warn!("  - Error reading button: {}", err),
        }
    }
}

/// Recursively log the tree under `node` up to `max_depth`.
pub fn dump_tree(tree: &dyn UiTree, node: NodeId, max_depth: usize) {
    dump_tree_inner(tree, node, 0, max_depth);
}

fn dump_tree_inner(
    tree: &dyn UiTree,
    node: NodeId,
    depth: usize,
    max_depth: usize,
) {
    if depth > max_depth {
        return;
    }
    let indent = "  ".repeat(depth);
    match tree.attributes(node) {
        Ok(attrs) => log::warn!(
            "{}{:?} Name=\"{}\" AutoId=\"{}\" ClassName=\"{}\"",
            indent,
            attrs.kind,
            attrs.name,
            attrs.automation_id,
            attrs.class_name
        ),
        Err(err) => {
            log::warn!("{}[Error reading element: {}]", indent, err);
            return;
        }
    }
    if let Ok(children) = tree.children(node) {
        for child in children {
            dump_tree_inner(tree, child, depth + 1, max_depth);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::sim::{Effect, SimulatedTree};
    use crate::automation::types::ControlKind;

    #[test]
    fn test_find_and_click_miss_returns_false() {
        let sim = SimulatedTree::new();
        let win = sim.add_window("Win", "Win");
        sim.add_child(win.0, ControlKind::Button, "OtherButton", "Other");

        assert!(!find_and_click_button(&sim, win.0, "MissingButton"));
    }

    #[test]
    fn test_find_and_click_uses_invoke_first() {
        let sim = SimulatedTree::new();
        let win = sim.add_window("Win", "Win");
        let button = sim.add_child(win.0, ControlKind::Button, "GoButton", "Go");

        assert!(find_and_click_button(&sim, win.0, "GoButton"));
        assert_eq!(sim.invoke_count(button), 1);
        assert_eq!(sim.click_count(button), 0);
    }

    #[test]
    fn test_activate_falls_back_to_click() {
        let sim = SimulatedTree::new();
        let win = sim.add_window("Win", "Win");
        let button = sim.add_child(win.0, ControlKind::Button, "GoButton", "Go");
        sim.refuse_invoke(button);

        assert!(find_and_click_button(&sim, win.0, "GoButton"));
        assert_eq!(sim.invoke_count(button), 0);
        assert_eq!(sim.click_count(button), 1);
    }

    #[test]
    fn test_wait_for_window_times_out_fully() {
        let sim = SimulatedTree::new();
        let timeout = Duration::from_millis(700);

        let started = Instant::now();
        let result = wait_for_window(&sim, "NeverAppears", timeout);
        let elapsed = started.elapsed();

        assert!(result.is_none());
        assert!(
            elapsed >= timeout,
            "wait returned after {:?}, before the {:?} timeout",
            elapsed,
            timeout
        );
    }

    #[test]
    fn test_wait_for_window_sees_delayed_window() {
        let sim = SimulatedTree::new();
        let win = sim.add_hidden_window("LateWindow", "Late");
        sim.reveal_after(win.0, Duration::from_millis(300));

        let found = wait_for_window(&sim, "LateWindow", Duration::from_secs(3));
        assert_eq!(found, Some(win));
    }

    #[test]
    fn test_click_effect_through_activation() {
        let sim = SimulatedTree::new();
        let win = sim.add_window("Win", "Win");
        let button = sim.add_child(win.0, ControlKind::Button, "OpenButton", "Open");
        let dialog = sim.add_hidden_window("ConfirmDialog", "Confirm");
        sim.on_activate(button, Effect::Reveal { node: dialog.0, after: Duration::ZERO });

        assert!(find_and_click_button(&sim, win.0, "OpenButton"));
        assert!(find_window(&sim, "ConfirmDialog").is_some());
    }
}
