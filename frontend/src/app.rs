use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::{debug, info};

use crate::config::SiteConfig;
use crate::controllers::faq::FaqAccordion;
use crate::controllers::form::FormController;
use crate::controllers::modal::ModalController;
use crate::controllers::nav::NavController;
use crate::error::InteractionError;
use crate::surface::{Event, EventKind, ScrollLock, Surface};

/// Element lookup that either tolerates or rejects missing markup.
struct Finder<'a, S: Surface> {
    surface: &'a S,
    strict: bool,
}

impl<'a, S: Surface> Finder<'a, S> {
    fn missing(&self, behavior: &'static str, selector: &str) -> Result<(), InteractionError> {
        if self.strict {
            return Err(InteractionError::MissingElement {
                behavior,
                selector: selector.to_string(),
            });
        }
        debug!("{}: nothing matches `{}`", behavior, selector);
        Ok(())
    }

    fn one(&self, behavior: &'static str, selector: &str) -> Result<Option<S::Node>, InteractionError> {
        let found = self.surface.query(selector);
        if found.is_none() {
            self.missing(behavior, selector)?;
        }
        Ok(found)
    }

    fn all(
        &self,
        behavior: &'static str,
        scope: Option<&S::Node>,
        selector: &str,
    ) -> Result<Vec<S::Node>, InteractionError> {
        let found = match scope {
            Some(scope) => self.surface.query_all_in(scope, selector),
            None => self.surface.query_all(selector),
        };
        if found.is_empty() {
            self.missing(behavior, selector)?;
        }
        Ok(found)
    }
}

/// Every behavior installed on a page, together with its listeners.
/// Dropping it detaches the listeners and cancels pending timers.
pub struct Interactions<S: Surface> {
    modal: Option<Rc<RefCell<ModalController<S>>>>,
    nav: Option<Rc<RefCell<NavController<S>>>>,
    faq: Option<Rc<RefCell<FaqAccordion<S>>>>,
    forms: Vec<Rc<FormController<S>>>,
    bindings: Vec<S::Binding>,
}

impl<S: Surface> Interactions<S> {
    pub fn install(surface: S, config: &SiteConfig) -> Result<Self, InteractionError> {
        let find = Finder {
            surface: &surface,
            strict: config.strict,
        };
        let scroll = ScrollLock::new(surface.clone());
        let root = surface.root();
        let mut bindings = Vec::new();

        let modal = if config.behaviors.modal {
            install_modal(&surface, &find, &scroll, root.as_ref(), config, &mut bindings)?
        } else {
            None
        };
        let nav = if config.behaviors.navigation {
            install_nav(&surface, &find, &scroll, root.as_ref(), config, &mut bindings)?
        } else {
            None
        };
        let faq = if config.behaviors.faq {
            install_faq(&surface, &find, config, &mut bindings)?
        } else {
            None
        };
        let forms = if config.behaviors.forms {
            install_forms(&surface, &find, modal.as_ref(), config, &mut bindings)?
        } else {
            Vec::new()
        };

        let installed = Self {
            modal,
            nav,
            faq,
            forms,
            bindings,
        };
        info!("Installed interactions: {}", installed);
        Ok(installed)
    }

    pub fn listener_count(&self) -> usize {
        self.bindings.len()
    }

    #[cfg(test)]
    pub fn modal(&self) -> Option<&Rc<RefCell<ModalController<S>>>> {
        self.modal.as_ref()
    }

    #[cfg(test)]
    pub fn nav(&self) -> Option<&Rc<RefCell<NavController<S>>>> {
        self.nav.as_ref()
    }

    #[cfg(test)]
    pub fn faq(&self) -> Option<&Rc<RefCell<FaqAccordion<S>>>> {
        self.faq.as_ref()
    }

    #[cfg(test)]
    pub fn forms(&self) -> &[Rc<FormController<S>>] {
        &self.forms
    }
}

impl<S: Surface> fmt::Display for Interactions<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "modal={}, navigation={}, faq entries={}, forms={}, listeners={}",
            self.modal.is_some(),
            self.nav.is_some(),
            self.faq.as_ref().map_or(0, |faq| faq.borrow().len()),
            self.forms.len(),
            self.listener_count()
        )
    }
}

fn install_modal<S: Surface>(
    surface: &S,
    find: &Finder<'_, S>,
    scroll: &ScrollLock<S>,
    root: Option<&S::Node>,
    config: &SiteConfig,
    bindings: &mut Vec<S::Binding>,
) -> Result<Option<Rc<RefCell<ModalController<S>>>>, InteractionError> {
    let selectors = &config.selectors;
    let Some(container) = find.one("modal", &selectors.modal)? else {
        return Ok(None);
    };
    let triggers = find.all("modal", None, &selectors.modal_open)?;
    let closers = find.all("modal", Some(&container), &selectors.modal_close)?;

    let modal = Rc::new(RefCell::new(ModalController::new(
        surface.clone(),
        container.clone(),
        scroll.clone(),
        config,
    )));

    for trigger in &triggers {
        let modal = Rc::clone(&modal);
        bindings.push(surface.listen(
            trigger,
            EventKind::Click,
            Box::new(move |_: &mut Event<S::Node>| modal.borrow_mut().open()),
        )?);
    }
    for closer in &closers {
        let modal = Rc::clone(&modal);
        bindings.push(surface.listen(
            closer,
            EventKind::Click,
            Box::new(move |_: &mut Event<S::Node>| modal.borrow_mut().close()),
        )?);
    }
    {
        let modal = Rc::clone(&modal);
        bindings.push(surface.listen(
            &container,
            EventKind::Click,
            Box::new(move |event: &mut Event<S::Node>| {
                modal.borrow_mut().on_backdrop_click(event.target.as_ref())
            }),
        )?);
    }
    if let Some(root) = root {
        let modal = Rc::clone(&modal);
        bindings.push(surface.listen(
            root,
            EventKind::Keydown,
            Box::new(move |event: &mut Event<S::Node>| modal.borrow_mut().on_keydown(event)),
        )?);
    }

    Ok(Some(modal))
}

fn install_nav<S: Surface>(
    surface: &S,
    find: &Finder<'_, S>,
    scroll: &ScrollLock<S>,
    root: Option<&S::Node>,
    config: &SiteConfig,
    bindings: &mut Vec<S::Binding>,
) -> Result<Option<Rc<RefCell<NavController<S>>>>, InteractionError> {
    let selectors = &config.selectors;
    let header = find.one("navigation", &selectors.header)?;
    let hamburger = find.one("navigation", &selectors.hamburger)?;
    let landmark = find.one("navigation", &selectors.navigation)?;
    let (Some(header), Some(hamburger)) = (header, hamburger) else {
        return Ok(None);
    };

    let nav = Rc::new(RefCell::new(NavController::new(
        surface.clone(),
        header,
        hamburger.clone(),
        landmark,
        scroll.clone(),
        config,
    )));

    {
        let nav = Rc::clone(&nav);
        bindings.push(surface.listen(
            &hamburger,
            EventKind::Click,
            Box::new(move |_: &mut Event<S::Node>| nav.borrow_mut().toggle()),
        )?);
    }
    if let Some(root) = root {
        let nav = Rc::clone(&nav);
        bindings.push(surface.listen(
            root,
            EventKind::Keydown,
            Box::new(move |event: &mut Event<S::Node>| nav.borrow_mut().on_keydown(event)),
        )?);
    }

    Ok(Some(nav))
}

fn install_faq<S: Surface>(
    surface: &S,
    find: &Finder<'_, S>,
    config: &SiteConfig,
    bindings: &mut Vec<S::Binding>,
) -> Result<Option<Rc<RefCell<FaqAccordion<S>>>>, InteractionError> {
    let togglers = find.all("faq", None, &config.selectors.faq_toggler)?;
    let accordion = FaqAccordion::new(surface.clone(), togglers, config);
    if accordion.is_empty() {
        return Ok(None);
    }
    let count = accordion.len();
    let faq = Rc::new(RefCell::new(accordion));

    for index in 0..count {
        let Some(toggler) = faq.borrow().toggler(index).cloned() else {
            continue;
        };
        {
            let faq = Rc::clone(&faq);
            bindings.push(surface.listen(
                &toggler,
                EventKind::Click,
                Box::new(move |_: &mut Event<S::Node>| faq.borrow_mut().toggle(index)),
            )?);
        }
        {
            let faq = Rc::clone(&faq);
            bindings.push(surface.listen(
                &toggler,
                EventKind::Keydown,
                Box::new(move |event: &mut Event<S::Node>| faq.borrow_mut().on_keydown(index, event)),
            )?);
        }
    }

    Ok(Some(faq))
}

fn install_forms<S: Surface>(
    surface: &S,
    find: &Finder<'_, S>,
    modal: Option<&Rc<RefCell<ModalController<S>>>>,
    config: &SiteConfig,
    bindings: &mut Vec<S::Binding>,
) -> Result<Vec<Rc<FormController<S>>>, InteractionError> {
    let mut forms = Vec::new();
    for form in find.all("forms", None, &config.selectors.form)? {
        let controller = Rc::new(FormController::new(surface.clone(), form.clone(), modal.cloned(), config));

        {
            let controller = Rc::clone(&controller);
            bindings.push(surface.listen(
                &form,
                EventKind::Submit,
                Box::new(move |event: &mut Event<S::Node>| controller.on_submit(event)),
            )?);
        }
        for field in controller.fields() {
            let on_blur = {
                let controller = Rc::clone(&controller);
                let field = field.clone();
                Box::new(move |_: &mut Event<S::Node>| controller.on_blur(&field))
            };
            bindings.push(surface.listen(field, EventKind::Blur, on_blur)?);

            let on_input = {
                let controller = Rc::clone(&controller);
                let field = field.clone();
                Box::new(move |_: &mut Event<S::Node>| controller.on_input(&field))
            };
            bindings.push(surface.listen(field, EventKind::Input, on_input)?);
        }
        forms.push(controller);
    }
    Ok(forms)
}
