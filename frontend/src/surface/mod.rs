//! The document as seen by the controllers.
//!
//! Controllers never touch `web_sys` directly. They talk to a [`Surface`],
//! which the browser build backs with the live document ([`dom::DomSurface`])
//! and the tests back with an in-memory tree.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::InteractionError;

pub mod dom;
#[cfg(test)]
pub mod fake;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    Click,
    Keydown,
    Input,
    Blur,
    Submit,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Click => "click",
            EventKind::Keydown => "keydown",
            EventKind::Input => "input",
            EventKind::Blur => "blur",
            EventKind::Submit => "submit",
        }
    }

    pub fn bubbles(self) -> bool {
        !matches!(self, EventKind::Blur)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Key {
    Escape,
    Tab,
    Enter,
    Space,
    Other(String),
}

impl Key {
    pub fn from_name(name: &str) -> Self {
        match name {
            "Escape" | "Esc" => Key::Escape,
            "Tab" => Key::Tab,
            "Enter" => Key::Enter,
            " " | "Spacebar" => Key::Space,
            other => Key::Other(other.to_string()),
        }
    }
}

/// A dispatched event, reduced to what the behaviors read.
#[derive(Debug)]
pub struct Event<N> {
    pub kind: EventKind,
    pub target: Option<N>,
    pub key: Option<Key>,
    pub shift: bool,
    default_prevented: bool,
}

impl<N> Event<N> {
    pub fn new(kind: EventKind, target: Option<N>) -> Self {
        Self {
            kind,
            target,
            key: None,
            shift: false,
            default_prevented: false,
        }
    }

    pub fn with_key(mut self, key: Key, shift: bool) -> Self {
        self.key = Some(key);
        self.shift = shift;
        self
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

pub type Handler<N> = Box<dyn FnMut(&mut Event<N>)>;

/// Capability interface over a document tree.
///
/// `Binding` detaches its listener when dropped and `Timer` cancels its
/// task when dropped, so whoever owns the handle owns the callback's
/// lifetime.
pub trait Surface: Clone + 'static {
    type Node: Clone + PartialEq + std::fmt::Debug + 'static;
    type Binding: 'static;
    type Timer: 'static;

    /// Element that receives document-wide keyboard events.
    fn root(&self) -> Option<Self::Node>;

    fn query(&self, selector: &str) -> Option<Self::Node>;
    fn query_all(&self, selector: &str) -> Vec<Self::Node>;
    fn query_in(&self, scope: &Self::Node, selector: &str) -> Option<Self::Node>;
    fn query_all_in(&self, scope: &Self::Node, selector: &str) -> Vec<Self::Node>;
    fn closest(&self, node: &Self::Node, selector: &str) -> Option<Self::Node>;
    fn contains(&self, ancestor: &Self::Node, node: &Self::Node) -> bool;
    fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;

    fn has_class(&self, node: &Self::Node, class: &str) -> bool;
    fn add_class(&self, node: &Self::Node, class: &str);
    fn remove_class(&self, node: &Self::Node, class: &str);

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;
    fn has_attribute(&self, node: &Self::Node, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }
    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str);

    fn text(&self, node: &Self::Node) -> String;
    fn set_text(&self, node: &Self::Node, text: &str);
    /// Current value of an `input` or `textarea`.
    fn value(&self, node: &Self::Node) -> String;
    /// Lowercased input type; `textarea` for text areas.
    fn field_type(&self, node: &Self::Node) -> String;
    fn set_disabled(&self, node: &Self::Node, disabled: bool);
    fn reset_form(&self, form: &Self::Node);

    fn create_element(&self, tag: &str) -> Option<Self::Node>;
    fn insert_after(&self, anchor: &Self::Node, node: &Self::Node);
    fn remove(&self, node: &Self::Node);

    fn active_element(&self) -> Option<Self::Node>;
    fn focus(&self, node: &Self::Node);

    fn body_overflow(&self) -> String;
    fn set_body_overflow(&self, value: &str);

    fn listen(
        &self,
        node: &Self::Node,
        kind: EventKind,
        handler: Handler<Self::Node>,
    ) -> Result<Self::Binding, InteractionError>;

    fn schedule(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> Self::Timer;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollOwner {
    Modal,
    Navigation,
}

#[derive(Default)]
struct LockState {
    owners: Vec<ScrollOwner>,
    saved: Option<String>,
}

/// Page scroll suspension shared by every behavior that needs it.
///
/// Scrolling stays suspended while any owner holds the lock; the body's
/// inline overflow from before the first lock comes back with the last
/// release.
pub struct ScrollLock<S: Surface> {
    surface: S,
    state: Rc<RefCell<LockState>>,
}

impl<S: Surface> Clone for ScrollLock<S> {
    fn clone(&self) -> Self {
        Self {
            surface: self.surface.clone(),
            state: Rc::clone(&self.state),
        }
    }
}

impl<S: Surface> ScrollLock<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            state: Rc::new(RefCell::new(LockState::default())),
        }
    }

    pub fn lock(&self, owner: ScrollOwner) {
        let mut state = self.state.borrow_mut();
        if state.owners.contains(&owner) {
            return;
        }
        if state.owners.is_empty() {
            state.saved = Some(self.surface.body_overflow());
            self.surface.set_body_overflow("hidden");
        }
        state.owners.push(owner);
    }

    pub fn release(&self, owner: ScrollOwner) {
        let mut state = self.state.borrow_mut();
        let before = state.owners.len();
        state.owners.retain(|held| *held != owner);
        if before > 0 && state.owners.is_empty() {
            let saved = state.saved.take().unwrap_or_default();
            self.surface.set_body_overflow(&saved);
        }
    }

    #[cfg(test)]
    pub fn is_locked(&self) -> bool {
        !self.state.borrow().owners.is_empty()
    }
}
