use log::Level;
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;
use web_sys::{js_sys, Document, Window};

use crate::error::InteractionError;

/// Id of the `<script type="application/json">` element the markup may use
/// to override the defaults.
pub const CONFIG_SCRIPT_ID: &str = "site-interactions-config";
/// Global object consulted before the config script.
pub const CONFIG_GLOBAL: &str = "siteInteractions";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SiteConfig {
    /// Fail install when an enabled behavior's markup is missing.
    pub strict: bool,
    pub log_level: Option<String>,
    pub behaviors: Behaviors,
    pub selectors: Selectors,
    pub classes: Classes,
    pub timing: Timing,
    pub labels: Labels,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Behaviors {
    pub modal: bool,
    pub navigation: bool,
    pub faq: bool,
    pub forms: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Selectors {
    pub modal: String,
    pub modal_open: String,
    pub modal_close: String,
    pub focusable: String,
    pub hamburger: String,
    pub header: String,
    pub navigation: String,
    pub faq_item: String,
    pub faq_toggler: String,
    pub faq_panel: String,
    pub form: String,
    pub field: String,
    pub submit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Classes {
    pub modal_open: String,
    pub header_active: String,
    pub faq_open: String,
    pub input_error: String,
    pub error_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Timing {
    pub modal_focus_delay_ms: u32,
    pub submit_reset_ms: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Labels {
    pub sent: String,
}

impl Default for Behaviors {
    fn default() -> Self {
        Self {
            modal: true,
            navigation: true,
            faq: true,
            forms: true,
        }
    }
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            modal: ".js-modal".into(),
            modal_open: ".js-modal-open".into(),
            modal_close: ".exit-button".into(),
            focusable: r#"button, [href], input, select, textarea, [tabindex]:not([tabindex="-1"])"#.into(),
            hamburger: ".header__menu-button".into(),
            header: ".header".into(),
            navigation: "#main-navigation".into(),
            faq_item: ".faq-list__item".into(),
            faq_toggler: ".faq-list__item__btn".into(),
            faq_panel: ".faq-list__item__desc".into(),
            form: "form[novalidate]".into(),
            field: "input, textarea".into(),
            submit: r#"button[type="submit"]"#.into(),
        }
    }
}

impl Default for Classes {
    fn default() -> Self {
        Self {
            modal_open: "modal-open".into(),
            header_active: "header--active".into(),
            faq_open: "faq--open".into(),
            input_error: "input-error".into(),
            error_message: "error-message".into(),
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            modal_focus_delay_ms: 100,
            submit_reset_ms: 2_000,
        }
    }
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            sent: "Sent!".into(),
        }
    }
}

#[cfg(debug_assertions)]
fn default_log_level() -> Level {
    Level::Debug
}

#[cfg(not(debug_assertions))]
fn default_log_level() -> Level {
    Level::Info
}

impl SiteConfig {
    pub fn from_json(text: &str) -> Result<Self, InteractionError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_js(value: JsValue) -> Result<Self, InteractionError> {
        Ok(serde_wasm_bindgen::from_value(value)?)
    }

    pub fn log_level(&self) -> Level {
        self.log_level
            .as_deref()
            .and_then(|level| level.parse().ok())
            .unwrap_or_else(default_log_level)
    }

    /// Resolves the page configuration: the global object first, then the
    /// config script, then the defaults. Sources that fail to decode are
    /// reported back so they can be logged once logging is up.
    pub fn load(window: &Window, document: &Document) -> (Self, Vec<InteractionError>) {
        let mut problems = Vec::new();

        match js_sys::Reflect::get(window, &JsValue::from_str(CONFIG_GLOBAL)) {
            Ok(value) if !value.is_undefined() && !value.is_null() => match Self::from_js(value) {
                Ok(config) => return (config, problems),
                Err(e) => problems.push(e),
            },
            Ok(_) => {}
            Err(e) => problems.push(e.into()),
        }

        if let Some(script) = document.get_element_by_id(CONFIG_SCRIPT_ID) {
            let text = script.text_content().unwrap_or_default();
            match Self::from_json(&text) {
                Ok(config) => return (config, problems),
                Err(e) => problems.push(e),
            }
        }

        (Self::default(), problems)
    }
}
