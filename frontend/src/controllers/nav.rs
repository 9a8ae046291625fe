use log::debug;

use crate::config::SiteConfig;
use crate::surface::{Event, Key, ScrollLock, ScrollOwner, Surface};

/// Hamburger-driven mobile navigation. Always starts closed.
pub struct NavController<S: Surface> {
    surface: S,
    header: S::Node,
    hamburger: S::Node,
    landmark: Option<S::Node>,
    scroll: ScrollLock<S>,
    active_class: String,
    open: bool,
}

impl<S: Surface> NavController<S> {
    pub fn new(
        surface: S,
        header: S::Node,
        hamburger: S::Node,
        landmark: Option<S::Node>,
        scroll: ScrollLock<S>,
        config: &SiteConfig,
    ) -> Self {
        let nav = Self {
            surface,
            header,
            hamburger,
            landmark,
            scroll,
            active_class: config.classes.header_active.clone(),
            open: false,
        };
        nav.apply();
        nav
    }

    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn toggle(&mut self) {
        self.open = !self.open;
        self.apply();
        debug!("Mobile navigation {}", if self.open { "opened" } else { "closed" });
    }

    pub fn close(&mut self) {
        self.open = false;
        self.apply();
    }

    pub fn on_keydown(&mut self, event: &Event<S::Node>) {
        if self.open && event.key == Some(Key::Escape) {
            self.close();
            debug!("Mobile navigation closed with Escape");
        }
    }

    fn apply(&self) {
        let open = self.open;
        if open {
            self.surface.add_class(&self.header, &self.active_class);
            self.scroll.lock(ScrollOwner::Navigation);
        } else {
            self.surface.remove_class(&self.header, &self.active_class);
            self.scroll.release(ScrollOwner::Navigation);
        }
        self.surface
            .set_attribute(&self.hamburger, "aria-expanded", &open.to_string());
        if let Some(landmark) = &self.landmark {
            self.surface
                .set_attribute(landmark, "aria-hidden", &(!open).to_string());
        }
    }
}
