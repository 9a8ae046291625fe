use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::debug;

use super::modal::ModalController;
use super::validation::FieldRules;
use crate::config::{Classes, SiteConfig};
use crate::surface::{Event, Surface};

/// Reads the constraints a field declares in its markup.
pub fn field_rules<S: Surface>(surface: &S, field: &S::Node) -> FieldRules {
    FieldRules::from_attributes(
        surface.has_attribute(field, "required"),
        &surface.field_type(field),
        surface.attribute(field, "minlength").as_deref(),
        surface.attribute(field, "maxlength").as_deref(),
    )
}

/// Validates one field and brings its annotation in line with the result:
/// an invalid field has exactly one error element right after it, a valid
/// one has none.
pub fn validate_field<S: Surface>(surface: &S, field: &S::Node, classes: &Classes) -> bool {
    match field_rules(surface, field).check(&surface.value(field)) {
        Ok(()) => {
            clear_error(surface, field, classes);
            true
        }
        Err(e) => {
            show_error(surface, field, &e.to_string(), classes);
            false
        }
    }
}

fn error_element<S: Surface>(surface: &S, field: &S::Node, classes: &Classes) -> Option<S::Node> {
    surface
        .next_sibling(field)
        .filter(|sibling| surface.has_class(sibling, &classes.error_message))
}

fn show_error<S: Surface>(surface: &S, field: &S::Node, message: &str, classes: &Classes) {
    let existing = error_element(surface, field, classes);
    let element = existing.or_else(|| {
        let element = surface.create_element("span")?;
        surface.add_class(&element, &classes.error_message);
        surface.set_attribute(&element, "role", "alert");
        surface.insert_after(field, &element);
        Some(element)
    });
    if let Some(element) = element {
        surface.set_text(&element, message);
    }
    surface.add_class(field, &classes.input_error);
    surface.set_attribute(field, "aria-invalid", "true");
}

fn clear_error<S: Surface>(surface: &S, field: &S::Node, classes: &Classes) {
    if let Some(element) = error_element(surface, field, classes) {
        surface.remove(&element);
    }
    surface.remove_class(field, &classes.input_error);
    surface.set_attribute(field, "aria-invalid", "false");
}

/// Client-side validation and simulated submission for one form.
pub struct FormController<S: Surface> {
    surface: S,
    form: S::Node,
    fields: Vec<S::Node>,
    submit: Option<S::Node>,
    modal: Option<Rc<RefCell<ModalController<S>>>>,
    classes: Classes,
    sent_label: String,
    reset_ms: u32,
    in_flight: Rc<Cell<bool>>,
    pending: RefCell<Option<S::Timer>>,
}

impl<S: Surface> FormController<S> {
    /// `modal` is kept only when the form sits inside its container.
    pub fn new(
        surface: S,
        form: S::Node,
        modal: Option<Rc<RefCell<ModalController<S>>>>,
        config: &SiteConfig,
    ) -> Self {
        let fields = surface.query_all_in(&form, &config.selectors.field);
        let submit = surface.query_in(&form, &config.selectors.submit);
        let modal = modal.filter(|modal| surface.contains(modal.borrow().container(), &form));
        Self {
            surface,
            form,
            fields,
            submit,
            modal,
            classes: config.classes.clone(),
            sent_label: config.labels.sent.clone(),
            reset_ms: config.timing.submit_reset_ms,
            in_flight: Rc::new(Cell::new(false)),
            pending: RefCell::new(None),
        }
    }

    pub fn fields(&self) -> &[S::Node] {
        &self.fields
    }

    #[cfg(test)]
    pub fn in_modal(&self) -> bool {
        self.modal.is_some()
    }

    #[cfg(test)]
    pub fn is_submitting(&self) -> bool {
        self.in_flight.get()
    }

    pub fn on_blur(&self, field: &S::Node) {
        validate_field(&self.surface, field, &self.classes);
    }

    /// Live re-validation, only for fields already flagged.
    pub fn on_input(&self, field: &S::Node) {
        if self.surface.has_class(field, &self.classes.input_error) {
            validate_field(&self.surface, field, &self.classes);
        }
    }

    /// Validates every field; does not stop at the first failure so each
    /// field gets its annotation.
    pub fn validate_all(&self) -> bool {
        let mut valid = true;
        for field in &self.fields {
            if !validate_field(&self.surface, field, &self.classes) {
                valid = false;
            }
        }
        valid
    }

    /// The real submission never goes out; a valid form gets a short
    /// confirmation on its submit control and is then cleared.
    pub fn on_submit(&self, event: &mut Event<S::Node>) {
        event.prevent_default();

        if self.in_flight.get() {
            debug!("Submission already pending, ignoring");
            return;
        }

        if !self.validate_all() {
            let first_invalid = self
                .fields
                .iter()
                .find(|field| self.surface.has_class(field, &self.classes.input_error));
            if let Some(field) = first_invalid {
                self.surface.focus(field);
            }
            debug!("Form submission blocked by validation");
            return;
        }

        let Some(button) = self.submit.clone() else {
            debug!("Form valid but has no submit control");
            return;
        };

        let original = self.surface.text(&button);
        self.surface.set_text(&button, &self.sent_label);
        self.surface.set_disabled(&button, true);
        self.in_flight.set(true);
        debug!("Simulated submission accepted");

        let surface = self.surface.clone();
        let form = self.form.clone();
        let in_flight = Rc::clone(&self.in_flight);
        let modal = self.modal.clone();
        let timer = self.surface.schedule(
            self.reset_ms,
            Box::new(move || {
                surface.set_text(&button, &original);
                surface.set_disabled(&button, false);
                surface.reset_form(&form);
                in_flight.set(false);
                if let Some(modal) = modal {
                    modal.borrow_mut().close();
                }
            }),
        );
        *self.pending.borrow_mut() = Some(timer);
    }
}
