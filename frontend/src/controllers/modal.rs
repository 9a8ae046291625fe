use log::debug;

use crate::config::SiteConfig;
use crate::surface::{Event, Key, ScrollLock, ScrollOwner, Surface};

/// Open/close state, focus return and focus trap for one modal container.
pub struct ModalController<S: Surface> {
    surface: S,
    container: S::Node,
    scroll: ScrollLock<S>,
    open_class: String,
    focusable: String,
    focus_delay_ms: u32,
    open: bool,
    return_focus: Option<S::Node>,
    pending_focus: Option<S::Timer>,
}

impl<S: Surface> ModalController<S> {
    pub fn new(surface: S, container: S::Node, scroll: ScrollLock<S>, config: &SiteConfig) -> Self {
        let open = surface.has_class(&container, &config.classes.modal_open);
        surface.set_attribute(&container, "aria-hidden", if open { "false" } else { "true" });
        if open {
            scroll.lock(ScrollOwner::Modal);
        }
        Self {
            surface,
            container,
            scroll,
            open_class: config.classes.modal_open.clone(),
            focusable: config.selectors.focusable.clone(),
            focus_delay_ms: config.timing.modal_focus_delay_ms,
            open,
            return_focus: None,
            pending_focus: None,
        }
    }

    pub fn container(&self) -> &S::Node {
        &self.container
    }

    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self) {
        if self.open {
            return;
        }
        self.open = true;
        self.return_focus = self.surface.active_element();
        self.surface.add_class(&self.container, &self.open_class);
        self.surface.set_attribute(&self.container, "aria-hidden", "false");
        self.scroll.lock(ScrollOwner::Modal);

        // Give the opening transition a head start before moving focus.
        self.pending_focus = self.focusables().into_iter().next().map(|first| {
            let surface = self.surface.clone();
            self.surface
                .schedule(self.focus_delay_ms, Box::new(move || surface.focus(&first)))
        });
        debug!("Modal opened");
    }

    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        self.pending_focus = None;
        self.surface.remove_class(&self.container, &self.open_class);
        self.surface.set_attribute(&self.container, "aria-hidden", "true");
        self.scroll.release(ScrollOwner::Modal);

        if let Some(previous) = self.return_focus.take() {
            self.surface.focus(&previous);
        }
        debug!("Modal closed");
    }

    /// Clicks that land on the backdrop itself close the modal; clicks on
    /// its content bubble up here too and are ignored.
    pub fn on_backdrop_click(&mut self, target: Option<&S::Node>) {
        if target == Some(&self.container) {
            self.close();
        }
    }

    pub fn on_keydown(&mut self, event: &mut Event<S::Node>) {
        if !self.open {
            return;
        }
        match event.key {
            Some(Key::Escape) => self.close(),
            Some(Key::Tab) => self.trap_focus(event),
            _ => {}
        }
    }

    fn focusables(&self) -> Vec<S::Node> {
        self.surface.query_all_in(&self.container, &self.focusable)
    }

    fn trap_focus(&self, event: &mut Event<S::Node>) {
        let items = self.focusables();
        let (Some(first), Some(last)) = (items.first(), items.last()) else {
            event.prevent_default();
            return;
        };

        let position = self
            .surface
            .active_element()
            .and_then(|active| items.iter().position(|item| *item == active));
        let next = match (position, event.shift) {
            (Some(0), true) | (None, true) => last,
            (Some(i), false) if i == items.len() - 1 => first,
            (None, false) => first,
            _ => return,
        };

        event.prevent_default();
        self.surface.focus(next);
    }
}
