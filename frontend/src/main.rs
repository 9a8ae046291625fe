use std::cell::RefCell;

use log::{error, info, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

mod app;
mod config;
mod error;
mod surface;
mod controllers {
    pub mod faq;
    pub mod form;
    pub mod modal;
    pub mod nav;
    pub mod validation;
}

use app::Interactions;
use config::SiteConfig;
use surface::dom::DomSurface;

thread_local! {
    // Lives as long as the page does; dropping it would detach every listener.
    static INSTALLED: RefCell<Option<Interactions<DomSurface>>> = RefCell::new(None);
}

fn install(surface: DomSurface, config: SiteConfig) {
    match Interactions::install(surface, &config) {
        Ok(interactions) => INSTALLED.with(|slot| *slot.borrow_mut() = Some(interactions)),
        Err(e) => error!("Failed to install site interactions: {}", e),
    }
}

fn main() {
    // Initialize console error panic hook for better error messages
    console_error_panic_hook::set_once();

    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };

    let (config, problems) = SiteConfig::load(&window, &document);
    console_log::init_with_level(config.log_level()).expect("error initializing log");
    for problem in problems {
        warn!("Ignoring configuration source: {}", problem);
    }

    info!("Starting site interactions");
    let surface = DomSurface::new(document.clone());
    if document.ready_state() == "loading" {
        let on_ready = Closure::once_into_js(move || install(surface, config));
        if let Err(e) = document.add_event_listener_with_callback("DOMContentLoaded", on_ready.unchecked_ref()) {
            error!("Failed to wait for DOMContentLoaded: {:?}", e);
        }
    } else {
        install(surface, config);
    }
}
