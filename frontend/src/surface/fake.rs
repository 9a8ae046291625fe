//! In-memory [`Surface`] for unit tests: a small element tree, a selector
//! matcher covering the compound selectors the site uses, bubbling
//! dispatch and a virtual clock.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::{Event, EventKind, Handler, Key, Surface};
use crate::error::InteractionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FakeNode(usize);

#[derive(Default)]
struct NodeData {
    tag: String,
    attrs: Vec<(String, String)>,
    classes: Vec<String>,
    parent: Option<usize>,
    children: Vec<usize>,
    value: String,
    text: String,
    disabled: bool,
}

struct Registration {
    id: u64,
    node: usize,
    kind: EventKind,
    handler: Rc<RefCell<Handler<FakeNode>>>,
    active: Rc<Cell<bool>>,
}

struct TimerEntry {
    id: u64,
    due: u64,
    task: Box<dyn FnOnce()>,
    cancelled: Rc<Cell<bool>>,
}

struct Inner {
    nodes: Vec<NodeData>,
    active: Option<usize>,
    overflow: String,
    listeners: Vec<Registration>,
    timers: Vec<TimerEntry>,
    now: u64,
    next_timer: u64,
    next_listener: u64,
}

#[derive(Clone)]
pub struct FakeSurface {
    inner: Rc<RefCell<Inner>>,
}

/// Dropping it unregisters the handler, releasing whatever it captured.
pub struct FakeBinding {
    id: u64,
    active: Rc<Cell<bool>>,
    inner: Weak<RefCell<Inner>>,
}

impl Drop for FakeBinding {
    fn drop(&mut self) {
        self.active.set(false);
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let removed: Vec<Registration> = match inner.try_borrow_mut() {
            Ok(mut inner) => {
                let (removed, kept) = std::mem::take(&mut inner.listeners)
                    .into_iter()
                    .partition(|r| r.id == self.id);
                inner.listeners = kept;
                removed
            }
            Err(_) => Vec::new(),
        };
        drop(removed);
    }
}

pub struct FakeTimer {
    cancelled: Rc<Cell<bool>>,
}

impl Drop for FakeTimer {
    fn drop(&mut self) {
        self.cancelled.set(true);
    }
}

#[derive(Debug)]
enum Cond {
    Tag(String),
    Class(String),
    Id(String),
    Attr(String, Option<String>),
    Not(Vec<Cond>),
}

fn split_ident(s: &str) -> (&str, &str) {
    let end = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(s.len());
    s.split_at(end)
}

fn parse_compound(selector: &str) -> Vec<Cond> {
    let mut conds = Vec::new();
    let mut rest = selector.trim();
    while !rest.is_empty() {
        if let Some(r) = rest.strip_prefix(":not(") {
            let end = r.find(')').expect("unterminated :not(");
            conds.push(Cond::Not(parse_compound(&r[..end])));
            rest = &r[end + 1..];
        } else if let Some(r) = rest.strip_prefix('[') {
            let end = r.find(']').expect("unterminated attribute selector");
            let body = &r[..end];
            let cond = match body.split_once('=') {
                Some((name, value)) => Cond::Attr(
                    name.trim().to_string(),
                    Some(value.trim().trim_matches('"').trim_matches('\'').to_string()),
                ),
                None => Cond::Attr(body.trim().to_string(), None),
            };
            conds.push(cond);
            rest = &r[end + 1..];
        } else if let Some(r) = rest.strip_prefix('.') {
            let (ident, tail) = split_ident(r);
            conds.push(Cond::Class(ident.to_string()));
            rest = tail;
        } else if let Some(r) = rest.strip_prefix('#') {
            let (ident, tail) = split_ident(r);
            conds.push(Cond::Id(ident.to_string()));
            rest = tail;
        } else {
            let (ident, tail) = split_ident(rest);
            assert!(!ident.is_empty(), "unsupported selector: {selector}");
            conds.push(Cond::Tag(ident.to_lowercase()));
            rest = tail;
        }
    }
    conds
}

impl Inner {
    fn attr(&self, idx: usize, name: &str) -> Option<String> {
        let node = &self.nodes[idx];
        if name == "class" {
            return (!node.classes.is_empty()).then(|| node.classes.join(" "));
        }
        node.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    fn matches_cond(&self, idx: usize, cond: &Cond) -> bool {
        let node = &self.nodes[idx];
        match cond {
            Cond::Tag(tag) => node.tag == *tag,
            Cond::Class(class) => node.classes.iter().any(|c| c == class),
            Cond::Id(id) => self.attr(idx, "id").as_deref() == Some(id.as_str()),
            Cond::Attr(name, None) => self.attr(idx, name).is_some(),
            Cond::Attr(name, Some(value)) => self.attr(idx, name).as_deref() == Some(value.as_str()),
            Cond::Not(inner) => !inner.iter().all(|c| self.matches_cond(idx, c)),
        }
    }

    fn matches(&self, idx: usize, selector: &str) -> bool {
        selector.split(',').any(|part| {
            parse_compound(part)
                .iter()
                .all(|cond| self.matches_cond(idx, cond))
        })
    }

    fn descendants(&self, idx: usize, out: &mut Vec<usize>) {
        for &child in &self.nodes[idx].children {
            out.push(child);
            self.descendants(child, out);
        }
    }

    fn select(&self, scope: usize, include_scope: bool, selector: &str) -> Vec<FakeNode> {
        let mut candidates = Vec::new();
        if include_scope {
            candidates.push(scope);
        }
        self.descendants(scope, &mut candidates);
        candidates
            .into_iter()
            .filter(|&idx| self.matches(idx, selector))
            .map(FakeNode)
            .collect()
    }

    fn detach(&mut self, idx: usize) {
        if let Some(parent) = self.nodes[idx].parent.take() {
            self.nodes[parent].children.retain(|&child| child != idx);
        }
    }
}

impl FakeSurface {
    /// An empty document: `<html><body></body></html>`.
    pub fn new() -> Self {
        let html = NodeData {
            tag: "html".into(),
            children: vec![1],
            ..Default::default()
        };
        let body = NodeData {
            tag: "body".into(),
            parent: Some(0),
            ..Default::default()
        };
        Self {
            inner: Rc::new(RefCell::new(Inner {
                nodes: vec![html, body],
                active: None,
                overflow: String::new(),
                listeners: Vec::new(),
                timers: Vec::new(),
                now: 0,
                next_timer: 0,
                next_listener: 0,
            })),
        }
    }

    pub fn body(&self) -> FakeNode {
        FakeNode(1)
    }

    /// Appends an element; a `class` attribute is split into classes and a
    /// `value` attribute seeds the field value.
    pub fn element(&self, parent: FakeNode, tag: &str, attrs: &[(&str, &str)]) -> FakeNode {
        let mut inner = self.inner.borrow_mut();
        let idx = inner.nodes.len();
        let mut node = NodeData {
            tag: tag.to_lowercase(),
            parent: Some(parent.0),
            ..Default::default()
        };
        for (name, value) in attrs {
            match *name {
                "class" => node.classes = value.split_whitespace().map(String::from).collect(),
                _ => {
                    if *name == "value" {
                        node.value = value.to_string();
                    }
                    node.attrs.push((name.to_string(), value.to_string()));
                }
            }
        }
        inner.nodes.push(node);
        inner.nodes[parent.0].children.push(idx);
        FakeNode(idx)
    }

    pub fn button(&self, parent: FakeNode, class: &str, label: &str) -> FakeNode {
        let node = self.element(parent, "button", &[("class", class)]);
        self.set_text(&node, label);
        node
    }

    pub fn set_value(&self, node: FakeNode, value: &str) {
        self.inner.borrow_mut().nodes[node.0].value = value.to_string();
    }

    pub fn is_disabled(&self, node: FakeNode) -> bool {
        self.inner.borrow().nodes[node.0].disabled
    }

    pub fn dispatch(&self, node: FakeNode, mut event: Event<FakeNode>) -> Event<FakeNode> {
        let path: Vec<usize> = {
            let inner = self.inner.borrow();
            let mut path = vec![node.0];
            if event.kind.bubbles() {
                let mut current = node.0;
                while let Some(parent) = inner.nodes[current].parent {
                    path.push(parent);
                    current = parent;
                }
            }
            path
        };
        for idx in path {
            let handlers: Vec<_> = self
                .inner
                .borrow()
                .listeners
                .iter()
                .filter(|r| r.node == idx && r.kind == event.kind && r.active.get())
                .map(|r| Rc::clone(&r.handler))
                .collect();
            for handler in handlers {
                (&mut *handler.borrow_mut())(&mut event);
            }
        }
        event
    }

    pub fn click(&self, node: FakeNode) -> Event<FakeNode> {
        self.dispatch(node, Event::new(EventKind::Click, Some(node)))
    }

    pub fn key(&self, node: FakeNode, key: Key, shift: bool) -> Event<FakeNode> {
        self.dispatch(node, Event::new(EventKind::Keydown, Some(node)).with_key(key, shift))
    }

    /// Keydown on the focused element, or the root when nothing has focus.
    pub fn press(&self, key: Key, shift: bool) -> Event<FakeNode> {
        let target = self.active_element().unwrap_or(FakeNode(0));
        self.key(target, key, shift)
    }

    pub fn blur(&self, node: FakeNode) -> Event<FakeNode> {
        self.dispatch(node, Event::new(EventKind::Blur, Some(node)))
    }

    pub fn type_text(&self, node: FakeNode, value: &str) -> Event<FakeNode> {
        self.set_value(node, value);
        self.dispatch(node, Event::new(EventKind::Input, Some(node)))
    }

    pub fn submit(&self, form: FakeNode) -> Event<FakeNode> {
        self.dispatch(form, Event::new(EventKind::Submit, Some(form)))
    }

    pub fn listener_count(&self) -> usize {
        self.inner
            .borrow()
            .listeners
            .iter()
            .filter(|r| r.active.get())
            .count()
    }

    pub fn pending_timers(&self) -> usize {
        self.inner
            .borrow()
            .timers
            .iter()
            .filter(|t| !t.cancelled.get())
            .count()
    }

    /// Moves the virtual clock forward, running due timers in order.
    pub fn advance(&self, ms: u64) {
        let target = self.inner.borrow().now + ms;
        loop {
            let task = {
                let mut inner = self.inner.borrow_mut();
                inner.timers.retain(|t| !t.cancelled.get());
                let next = inner
                    .timers
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due <= target)
                    .min_by_key(|(_, t)| (t.due, t.id))
                    .map(|(i, _)| i);
                match next {
                    Some(i) => {
                        let entry = inner.timers.remove(i);
                        inner.now = entry.due;
                        entry.task
                    }
                    None => break,
                }
            };
            task();
        }
        self.inner.borrow_mut().now = target;
    }
}

impl Surface for FakeSurface {
    type Node = FakeNode;
    type Binding = FakeBinding;
    type Timer = FakeTimer;

    fn root(&self) -> Option<FakeNode> {
        Some(FakeNode(0))
    }

    fn query(&self, selector: &str) -> Option<FakeNode> {
        self.query_all(selector).into_iter().next()
    }

    fn query_all(&self, selector: &str) -> Vec<FakeNode> {
        self.inner.borrow().select(0, true, selector)
    }

    fn query_in(&self, scope: &FakeNode, selector: &str) -> Option<FakeNode> {
        self.query_all_in(scope, selector).into_iter().next()
    }

    fn query_all_in(&self, scope: &FakeNode, selector: &str) -> Vec<FakeNode> {
        self.inner.borrow().select(scope.0, false, selector)
    }

    fn closest(&self, node: &FakeNode, selector: &str) -> Option<FakeNode> {
        let inner = self.inner.borrow();
        let mut current = Some(node.0);
        while let Some(idx) = current {
            if inner.matches(idx, selector) {
                return Some(FakeNode(idx));
            }
            current = inner.nodes[idx].parent;
        }
        None
    }

    fn contains(&self, ancestor: &FakeNode, node: &FakeNode) -> bool {
        let inner = self.inner.borrow();
        let mut current = Some(node.0);
        while let Some(idx) = current {
            if idx == ancestor.0 {
                return true;
            }
            current = inner.nodes[idx].parent;
        }
        false
    }

    fn next_sibling(&self, node: &FakeNode) -> Option<FakeNode> {
        let inner = self.inner.borrow();
        let parent = inner.nodes[node.0].parent?;
        let siblings = &inner.nodes[parent].children;
        let pos = siblings.iter().position(|&c| c == node.0)?;
        siblings.get(pos + 1).copied().map(FakeNode)
    }

    fn has_class(&self, node: &FakeNode, class: &str) -> bool {
        self.inner.borrow().nodes[node.0].classes.iter().any(|c| c == class)
    }

    fn add_class(&self, node: &FakeNode, class: &str) {
        let mut inner = self.inner.borrow_mut();
        let classes = &mut inner.nodes[node.0].classes;
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
    }

    fn remove_class(&self, node: &FakeNode, class: &str) {
        self.inner.borrow_mut().nodes[node.0].classes.retain(|c| c != class);
    }

    fn attribute(&self, node: &FakeNode, name: &str) -> Option<String> {
        self.inner.borrow().attr(node.0, name)
    }

    fn set_attribute(&self, node: &FakeNode, name: &str, value: &str) {
        let mut inner = self.inner.borrow_mut();
        let attrs = &mut inner.nodes[node.0].attrs;
        match attrs.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => attrs.push((name.to_string(), value.to_string())),
        }
    }

    fn text(&self, node: &FakeNode) -> String {
        self.inner.borrow().nodes[node.0].text.clone()
    }

    fn set_text(&self, node: &FakeNode, text: &str) {
        self.inner.borrow_mut().nodes[node.0].text = text.to_string();
    }

    fn value(&self, node: &FakeNode) -> String {
        self.inner.borrow().nodes[node.0].value.clone()
    }

    fn field_type(&self, node: &FakeNode) -> String {
        let inner = self.inner.borrow();
        let tag = &inner.nodes[node.0].tag;
        if tag == "input" {
            inner
                .attr(node.0, "type")
                .map(|t| t.to_lowercase())
                .unwrap_or_else(|| "text".to_string())
        } else {
            tag.clone()
        }
    }

    fn set_disabled(&self, node: &FakeNode, disabled: bool) {
        self.inner.borrow_mut().nodes[node.0].disabled = disabled;
    }

    fn reset_form(&self, form: &FakeNode) {
        let mut inner = self.inner.borrow_mut();
        let mut all = Vec::new();
        inner.descendants(form.0, &mut all);
        for idx in all {
            if matches!(inner.nodes[idx].tag.as_str(), "input" | "textarea") {
                let initial = inner.attr(idx, "value").unwrap_or_default();
                inner.nodes[idx].value = initial;
            }
        }
    }

    fn create_element(&self, tag: &str) -> Option<FakeNode> {
        let mut inner = self.inner.borrow_mut();
        inner.nodes.push(NodeData {
            tag: tag.to_lowercase(),
            ..Default::default()
        });
        Some(FakeNode(inner.nodes.len() - 1))
    }

    fn insert_after(&self, anchor: &FakeNode, node: &FakeNode) {
        let mut inner = self.inner.borrow_mut();
        let Some(parent) = inner.nodes[anchor.0].parent else {
            return;
        };
        inner.detach(node.0);
        let siblings = &mut inner.nodes[parent].children;
        let pos = siblings
            .iter()
            .position(|&c| c == anchor.0)
            .map_or(siblings.len(), |p| p + 1);
        siblings.insert(pos, node.0);
        inner.nodes[node.0].parent = Some(parent);
    }

    fn remove(&self, node: &FakeNode) {
        self.inner.borrow_mut().detach(node.0);
    }

    fn active_element(&self) -> Option<FakeNode> {
        self.inner.borrow().active.map(FakeNode)
    }

    /// Like a browser, moving focus blurs the element losing it before
    /// returning.
    fn focus(&self, node: &FakeNode) {
        let previous = self.inner.borrow_mut().active.replace(node.0);
        if let Some(previous) = previous.filter(|&idx| idx != node.0) {
            self.blur(FakeNode(previous));
        }
    }

    fn body_overflow(&self) -> String {
        self.inner.borrow().overflow.clone()
    }

    fn set_body_overflow(&self, value: &str) {
        self.inner.borrow_mut().overflow = value.to_string();
    }

    fn listen(
        &self,
        node: &FakeNode,
        kind: EventKind,
        handler: Handler<FakeNode>,
    ) -> Result<FakeBinding, InteractionError> {
        let active = Rc::new(Cell::new(true));
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_listener;
        inner.next_listener += 1;
        inner.listeners.push(Registration {
            id,
            node: node.0,
            kind,
            handler: Rc::new(RefCell::new(handler)),
            active: Rc::clone(&active),
        });
        Ok(FakeBinding {
            id,
            active,
            inner: Rc::downgrade(&self.inner),
        })
    }

    fn schedule(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> FakeTimer {
        let cancelled = Rc::new(Cell::new(false));
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_timer;
        inner.next_timer += 1;
        let due = inner.now + u64::from(delay_ms);
        inner.timers.push(TimerEntry {
            id,
            due,
            task,
            cancelled: Rc::clone(&cancelled),
        });
        FakeTimer { cancelled }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_matcher_handles_site_selectors() {
        let surface = FakeSurface::new();
        let body = surface.body();
        let form = surface.element(body, "form", &[("novalidate", "")]);
        let submit = surface.element(form, "button", &[("type", "submit")]);
        let skipped = surface.element(form, "div", &[("tabindex", "-1")]);
        let tabbable = surface.element(form, "div", &[("tabindex", "0")]);

        assert_eq!(surface.query("form[novalidate]"), Some(form));
        assert_eq!(surface.query_in(&form, "button[type=\"submit\"]"), Some(submit));

        let focusable = surface.query_all_in(
            &form,
            "button, [href], input, select, textarea, [tabindex]:not([tabindex=\"-1\"])",
        );
        assert_eq!(focusable, vec![submit, tabbable]);
        assert!(!focusable.contains(&skipped));
    }

    #[test]
    fn moving_focus_blurs_the_previous_element() {
        let surface = FakeSurface::new();
        let body = surface.body();
        let first = surface.element(body, "input", &[]);
        let second = surface.element(body, "input", &[]);
        let blurred = Rc::new(RefCell::new(Vec::new()));

        let _bindings: Vec<_> = [first, second]
            .into_iter()
            .map(|node| {
                let blurred = Rc::clone(&blurred);
                surface
                    .listen(
                        &node,
                        EventKind::Blur,
                        Box::new(move |event: &mut Event<FakeNode>| blurred.borrow_mut().push(event.target)),
                    )
                    .unwrap()
            })
            .collect();

        surface.focus(&first);
        surface.focus(&first);
        assert!(blurred.borrow().is_empty());

        surface.focus(&second);
        assert_eq!(*blurred.borrow(), vec![Some(first)]);
        assert_eq!(surface.active_element(), Some(second));
    }

    #[test]
    fn cancelled_timers_never_run() {
        let surface = FakeSurface::new();
        let ran = Rc::new(Cell::new(0));

        let kept = {
            let ran = Rc::clone(&ran);
            surface.schedule(10, Box::new(move || ran.set(ran.get() + 1)))
        };
        {
            let ran = Rc::clone(&ran);
            drop(surface.schedule(10, Box::new(move || ran.set(ran.get() + 10))));
        }

        surface.advance(9);
        assert_eq!(ran.get(), 0);
        surface.advance(1);
        assert_eq!(ran.get(), 1);
        drop(kept);
    }
}
