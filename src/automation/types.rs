// Core types for the accessibility tree boundary

/// Opaque identifier of a node in the automation tree.
///
/// A `NodeId` is only meaningful against the tree that produced it, and only
/// momentarily: the application mutates its UI tree at will, so every lookup
/// must re-resolve from the desktop root instead of caching ids.
pub type NodeId = u64;

/// Control kind of an automation element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    /// Top-level window
    Window,
    /// Push button
    Button,
    /// Tab container
    Tab,
    /// Custom-rendered content region
    Custom,
    /// Modal dialog
    Dialog,
    /// Static text
    Text,
    /// Anything else
    Other,
}

/// Readable attributes of an automation element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAttributes {
    /// Control kind
    pub kind: ControlKind,
    /// Display name (localizable, may change between releases)
    pub name: String,
    /// Stable application-assigned identifier (preferred for lookup)
    pub automation_id: String,
    /// Implementation class name, informational only
    pub class_name: String,
}

/// A live handle to an OS window.
///
/// Validity is time-bound: the handle is revoked when the underlying window
/// closes. Never hold one across a sleep point; re-resolve instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRef(pub NodeId);

/// A transient handle to a control inside a window.
///
/// Same validity rules as [`WindowRef`]: resolve, use, discard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementRef(pub NodeId);

/// A (kind, identifier-or-name) filter over automation elements.
///
/// When both `automation_id` and `name` are set, the id must match; the name
/// is only consulted for elements that expose no id at all.
#[derive(Debug, Clone, Default)]
pub struct ElementQuery {
    /// Required control kind, if any
    pub kind: Option<ControlKind>,
    /// Required automation id
    pub automation_id: Option<String>,
    /// Required display name (fallback, less reliable)
    pub name: Option<String>,
}

impl ElementQuery {
    /// Match any element of the given kind
    pub fn of_kind(kind: ControlKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Match a button by automation id
    pub fn button(automation_id: &str) -> Self {
        Self {
            kind: Some(ControlKind::Button),
            automation_id: Some(automation_id.to_string()),
            name: None,
        }
    }

    /// Match a button by display name
    pub fn button_named(name: &str) -> Self {
        Self {
            kind: Some(ControlKind::Button),
            automation_id: None,
            name: Some(name.to_string()),
        }
    }

    /// Match a top-level window by automation id
    pub fn window(automation_id: &str) -> Self {
        Self {
            kind: Some(ControlKind::Window),
            automation_id: Some(automation_id.to_string()),
            name: None,
        }
    }

    /// Match a top-level window by display name
    pub fn window_named(name: &str) -> Self {
        Self {
            kind: Some(ControlKind::Window),
            automation_id: None,
            name: Some(name.to_string()),
        }
    }

    /// Whether the given attributes satisfy this query
    pub fn matches(&self, attrs: &NodeAttributes) -> bool {
        if let Some(kind) = self.kind {
            // Dialogs surface as windows on some backends; accept either when
            // a window is asked for.
            let kind_ok = attrs.kind == kind
                || (kind == ControlKind::Window && attrs.kind == ControlKind::Dialog);
            if !kind_ok {
                return false;
            }
        }
        if let Some(id) = &self.automation_id {
            return attrs.automation_id == *id;
        }
        if let Some(name) = &self.name {
            return attrs.name == *name;
        }
        true
    }
}

/// Result type for automation operations
pub type AutomationResult<T> = Result<T, AutomationError>;

/// Errors raised at the accessibility tree boundary
#[derive(Debug)]
pub enum AutomationError {
    /// The element disappeared between resolution and use
    Stale(NodeId),
    /// The platform backend reported a failure
    Backend(String),
    /// No automation backend is available on this build/platform
    Unavailable(String),
}

impl std::fmt::Display for AutomationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AutomationError::Stale(id) => write!(f, "Element {} is no longer in the tree", id),
            AutomationError::Backend(msg) => write!(f, "Automation backend error: {}", msg),
            AutomationError::Unavailable(msg) => write!(f, "No automation backend: {}", msg),
        }
    }
}

impl std::error::Error for AutomationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_matches_by_id() {
        let query = ElementQuery::button("HomeConnectButton");
        let attrs = NodeAttributes {
            kind: ControlKind::Button,
            name: "Connect".to_string(),
            automation_id: "HomeConnectButton".to_string(),
            class_name: String::new(),
        };
        assert!(query.matches(&attrs));
    }

    #[test]
    fn test_query_id_beats_name() {
        // An id-based query must not match on name alone.
        let query = ElementQuery::button("HomeConnectButton");
        let attrs = NodeAttributes {
            kind: ControlKind::Button,
            name: "HomeConnectButton".to_string(),
            automation_id: "SomethingElse".to_string(),
            class_name: String::new(),
        };
        assert!(!query.matches(&attrs));
    }

    #[test]
    fn test_query_matches_by_name() {
        let query = ElementQuery::button_named("Disconnect");
        let attrs = NodeAttributes {
            kind: ControlKind::Button,
            name: "Disconnect".to_string(),
            automation_id: String::new(),
            class_name: String::new(),
        };
        assert!(query.matches(&attrs));
    }

    #[test]
    fn test_query_kind_mismatch() {
        let query = ElementQuery::button("CloseButton");
        let attrs = NodeAttributes {
            kind: ControlKind::Window,
            name: String::new(),
            automation_id: "CloseButton".to_string(),
            class_name: String::new(),
        };
        assert!(!query.matches(&attrs));
    }

    #[test]
    fn test_window_query_accepts_dialog() {
        let query = ElementQuery::window("QuitConfirmationDialog");
        let attrs = NodeAttributes {
            kind: ControlKind::Dialog,
            name: "Confirm".to_string(),
            automation_id: "QuitConfirmationDialog".to_string(),
            class_name: String::new(),
        };
        assert!(query.matches(&attrs));
    }
}
