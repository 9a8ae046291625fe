use gloo_timers::callback::Timeout;
use log::warn;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Document, Element, EventTarget, HtmlButtonElement, HtmlElement, HtmlFormElement,
    HtmlInputElement, HtmlTextAreaElement, KeyboardEvent, NodeList,
};

use super::{Event, EventKind, Handler, Key, Surface};
use crate::error::InteractionError;

/// [`Surface`] backed by the live browser document.
#[derive(Clone)]
pub struct DomSurface {
    document: Document,
}

impl DomSurface {
    pub fn new(document: Document) -> Self {
        Self { document }
    }
}

/// An attached DOM listener; removed from its target on drop.
pub struct DomBinding {
    target: EventTarget,
    kind: EventKind,
    callback: Closure<dyn FnMut(web_sys::Event)>,
}

impl Drop for DomBinding {
    fn drop(&mut self) {
        if let Err(e) = self
            .target
            .remove_event_listener_with_callback(self.kind.as_str(), self.callback.as_ref().unchecked_ref())
        {
            warn!("Failed to detach {} listener: {:?}", self.kind.as_str(), e);
        }
    }
}

fn elements(list: Result<NodeList, JsValue>) -> Vec<Element> {
    let Ok(list) = list else {
        return Vec::new();
    };
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

impl Surface for DomSurface {
    type Node = Element;
    type Binding = DomBinding;
    type Timer = Timeout;

    fn root(&self) -> Option<Element> {
        self.document.document_element()
    }

    fn query(&self, selector: &str) -> Option<Element> {
        self.document.query_selector(selector).ok().flatten()
    }

    fn query_all(&self, selector: &str) -> Vec<Element> {
        elements(self.document.query_selector_all(selector))
    }

    fn query_in(&self, scope: &Element, selector: &str) -> Option<Element> {
        scope.query_selector(selector).ok().flatten()
    }

    fn query_all_in(&self, scope: &Element, selector: &str) -> Vec<Element> {
        elements(scope.query_selector_all(selector))
    }

    fn closest(&self, node: &Element, selector: &str) -> Option<Element> {
        node.closest(selector).ok().flatten()
    }

    fn contains(&self, ancestor: &Element, node: &Element) -> bool {
        ancestor.contains(Some(node.as_ref()))
    }

    fn next_sibling(&self, node: &Element) -> Option<Element> {
        node.next_element_sibling()
    }

    fn has_class(&self, node: &Element, class: &str) -> bool {
        node.class_list().contains(class)
    }

    fn add_class(&self, node: &Element, class: &str) {
        if let Err(e) = node.class_list().add_1(class) {
            warn!("Failed to add class {:?} to <{}>: {:?}", class, node.tag_name(), e);
        }
    }

    fn remove_class(&self, node: &Element, class: &str) {
        if let Err(e) = node.class_list().remove_1(class) {
            warn!("Failed to remove class {:?} from <{}>: {:?}", class, node.tag_name(), e);
        }
    }

    fn attribute(&self, node: &Element, name: &str) -> Option<String> {
        node.get_attribute(name)
    }

    fn has_attribute(&self, node: &Element, name: &str) -> bool {
        node.has_attribute(name)
    }

    fn set_attribute(&self, node: &Element, name: &str, value: &str) {
        if let Err(e) = node.set_attribute(name, value) {
            warn!("Failed to set {} on <{}>: {:?}", name, node.tag_name(), e);
        }
    }

    fn text(&self, node: &Element) -> String {
        node.text_content().unwrap_or_default()
    }

    fn set_text(&self, node: &Element, text: &str) {
        node.set_text_content(Some(text));
    }

    fn value(&self, node: &Element) -> String {
        if let Some(input) = node.dyn_ref::<HtmlInputElement>() {
            input.value()
        } else if let Some(area) = node.dyn_ref::<HtmlTextAreaElement>() {
            area.value()
        } else {
            node.get_attribute("value").unwrap_or_default()
        }
    }

    fn field_type(&self, node: &Element) -> String {
        if let Some(input) = node.dyn_ref::<HtmlInputElement>() {
            input.type_().to_lowercase()
        } else {
            node.tag_name().to_lowercase()
        }
    }

    fn set_disabled(&self, node: &Element, disabled: bool) {
        if let Some(button) = node.dyn_ref::<HtmlButtonElement>() {
            button.set_disabled(disabled);
        } else if let Some(input) = node.dyn_ref::<HtmlInputElement>() {
            input.set_disabled(disabled);
        } else {
            let result = if disabled {
                node.set_attribute("disabled", "")
            } else {
                node.remove_attribute("disabled")
            };
            if let Err(e) = result {
                warn!("Failed to toggle disabled on <{}>: {:?}", node.tag_name(), e);
            }
        }
    }

    fn reset_form(&self, form: &Element) {
        if let Some(form) = form.dyn_ref::<HtmlFormElement>() {
            form.reset();
        }
    }

    fn create_element(&self, tag: &str) -> Option<Element> {
        self.document.create_element(tag).ok()
    }

    fn insert_after(&self, anchor: &Element, node: &Element) {
        if let Err(e) = anchor.insert_adjacent_element("afterend", node) {
            warn!("Failed to insert <{}> after <{}>: {:?}", node.tag_name(), anchor.tag_name(), e);
        }
    }

    fn remove(&self, node: &Element) {
        node.remove();
    }

    fn active_element(&self) -> Option<Element> {
        self.document.active_element()
    }

    fn focus(&self, node: &Element) {
        if let Some(element) = node.dyn_ref::<HtmlElement>() {
            if let Err(e) = element.focus() {
                warn!("Failed to focus <{}>: {:?}", node.tag_name(), e);
            }
        }
    }

    fn body_overflow(&self) -> String {
        self.document
            .body()
            .and_then(|body| body.style().get_property_value("overflow").ok())
            .unwrap_or_default()
    }

    fn set_body_overflow(&self, value: &str) {
        let Some(body) = self.document.body() else {
            return;
        };
        let style = body.style();
        let result = if value.is_empty() {
            style.remove_property("overflow").map(|_| ())
        } else {
            style.set_property("overflow", value)
        };
        if let Err(e) = result {
            warn!("Failed to set body overflow to {:?}: {:?}", value, e);
        }
    }

    fn listen(
        &self,
        node: &Element,
        kind: EventKind,
        mut handler: Handler<Element>,
    ) -> Result<DomBinding, InteractionError> {
        let callback = Closure::wrap(Box::new(move |raw: web_sys::Event| {
            let target = raw.target().and_then(|t| t.dyn_into::<Element>().ok());
            let mut event = Event::new(kind, target);
            if let Some(keyboard) = raw.dyn_ref::<KeyboardEvent>() {
                event = event.with_key(Key::from_name(&keyboard.key()), keyboard.shift_key());
            }
            handler(&mut event);
            if event.default_prevented() {
                raw.prevent_default();
            }
        }) as Box<dyn FnMut(web_sys::Event)>);

        let target: EventTarget = node.clone().into();
        target.add_event_listener_with_callback(kind.as_str(), callback.as_ref().unchecked_ref())?;

        Ok(DomBinding {
            target,
            kind,
            callback,
        })
    }

    fn schedule(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> Timeout {
        Timeout::new(delay_ms, task)
    }
}
