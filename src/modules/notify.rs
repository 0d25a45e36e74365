use std::time::Duration;

use log::debug;

use crate::modules::page::{Element, Page};
use crate::modules::render::{alert_body, alert_class};
use crate::modules::types::Tone;

/// Appends dismissible banners to the alert container, or overlays them on
/// the page body when the page has none.
#[derive(Debug, Clone)]
pub struct Notifier {
    container: Element,
    overlay: bool,
    timeout: Duration,
}

impl Notifier {
    pub fn new(container: Option<Element>, page: &Page, timeout: Duration) -> Self {
        match container {
            Some(container) => Self {
                container,
                overlay: false,
                timeout,
            },
            None => Self {
                container: page.body(),
                overlay: true,
                timeout,
            },
        }
    }

    /// Shows `message` and schedules its removal. Must run inside a tokio
    /// runtime.
    pub fn show(&self, message: &str, tone: Tone) -> Element {
        debug!("notify [{tone}] {message}");
        let banner = self
            .container
            .append_child("div", &alert_class(tone), &alert_body(message));
        if self.overlay {
            banner.set_style("position", "fixed");
            banner.set_style("top", "20px");
            banner.set_style("right", "20px");
            banner.set_style("z-index", "9999");
            banner.set_style("max-width", "400px");
        }

        let expiring = banner.clone();
        let timeout = self.timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            expiring.remove();
        });
        banner
    }

    /// Banners currently shown, oldest first.
    pub fn visible(&self) -> Vec<Element> {
        self.container
            .children()
            .into_iter()
            .filter(|el| el.has_class("alert-dismissible"))
            .collect()
    }
}
