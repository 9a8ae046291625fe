use log::debug;

use crate::config::SiteConfig;
use crate::surface::{Event, Key, Surface};

struct FaqEntry<N> {
    item: N,
    toggler: N,
    panel: Option<N>,
    open: bool,
}

/// Non-exclusive accordion: every entry opens and closes on its own.
pub struct FaqAccordion<S: Surface> {
    surface: S,
    entries: Vec<FaqEntry<S::Node>>,
    open_class: String,
}

impl<S: Surface> FaqAccordion<S> {
    /// Pairs each toggler with its enclosing item and panel. Togglers
    /// outside an item are skipped.
    pub fn new(surface: S, togglers: Vec<S::Node>, config: &SiteConfig) -> Self {
        let entries = togglers
            .into_iter()
            .filter_map(|toggler| {
                let item = surface.closest(&toggler, &config.selectors.faq_item)?;
                let panel = surface.query_in(&item, &config.selectors.faq_panel);
                Some(FaqEntry {
                    item,
                    toggler,
                    panel,
                    open: false,
                })
            })
            .collect();

        let accordion = Self {
            surface,
            entries,
            open_class: config.classes.faq_open.clone(),
        };
        for entry in &accordion.entries {
            accordion.apply(entry);
        }
        accordion
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn toggler(&self, index: usize) -> Option<&S::Node> {
        self.entries.get(index).map(|entry| &entry.toggler)
    }

    #[cfg(test)]
    pub fn is_open(&self, index: usize) -> bool {
        self.entries.get(index).map_or(false, |entry| entry.open)
    }

    pub fn toggle(&mut self, index: usize) {
        let Some(entry) = self.entries.get_mut(index) else {
            return;
        };
        entry.open = !entry.open;
        debug!("FAQ entry {} {}", index, if entry.open { "expanded" } else { "collapsed" });
        let entry = &self.entries[index];
        self.apply(entry);
    }

    /// Enter and Space act like a click. Both defaults are suppressed: Space
    /// would scroll the page and Enter would fire a second, synthetic click.
    pub fn on_keydown(&mut self, index: usize, event: &mut Event<S::Node>) {
        if matches!(event.key, Some(Key::Enter) | Some(Key::Space)) {
            event.prevent_default();
            self.toggle(index);
        }
    }

    fn apply(&self, entry: &FaqEntry<S::Node>) {
        if entry.open {
            self.surface.add_class(&entry.item, &self.open_class);
        } else {
            self.surface.remove_class(&entry.item, &self.open_class);
        }
        self.surface
            .set_attribute(&entry.toggler, "aria-expanded", &entry.open.to_string());
        if let Some(panel) = &entry.panel {
            self.surface
                .set_attribute(panel, "aria-hidden", &(!entry.open).to_string());
        }
    }
}
