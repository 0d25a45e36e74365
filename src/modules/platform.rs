//! Browser-provided capabilities the controller depends on.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use dialoguer::Confirm;
use log::{debug, info, warn};

use crate::modules::error::DashboardError;
use crate::modules::page::Element;
use crate::modules::types::SelectedFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Widget {
    Tooltip,
    Popover,
}

#[async_trait]
pub trait Platform: Send + Sync {
    /// Blocking yes/no question.
    fn confirm(&self, prompt: &str) -> bool;

    async fn write_clipboard(&self, text: &str) -> Result<(), DashboardError>;

    /// Reads a file into a `data:` URL.
    async fn read_data_url(&self, file: &SelectedFile) -> Result<String, DashboardError>;

    fn reload(&self);

    fn show_modal(&self, modal: &Element);

    fn attach_widget(&self, widget: Widget, trigger: &Element);

    fn scroll_into_view(&self, target: &Element);
}

pub fn data_url(mime_type: &str, bytes: &[u8]) -> String {
    let mime_type = if mime_type.is_empty() {
        "application/octet-stream"
    } else {
        mime_type
    };
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}

/// Platform for running the controller from a terminal.
#[derive(Debug, Default)]
pub struct TerminalPlatform {
    /// Answer every confirmation with yes instead of prompting.
    pub assume_yes: bool,
}

#[async_trait]
impl Platform for TerminalPlatform {
    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or_else(|err| {
                warn!("confirmation failed: {err}");
                false
            })
    }

    async fn write_clipboard(&self, text: &str) -> Result<(), DashboardError> {
        let text = text.to_string();
        tokio::task::spawn_blocking(move || {
            arboard::Clipboard::new().and_then(|mut cb| cb.set_text(text))
        })
        .await
        .map_err(|err| DashboardError::Clipboard {
            detail: err.to_string(),
        })?
        .map_err(|err| DashboardError::Clipboard {
            detail: err.to_string(),
        })
    }

    async fn read_data_url(&self, file: &SelectedFile) -> Result<String, DashboardError> {
        let bytes = tokio::fs::read(&file.path).await?;
        Ok(data_url(&file.mime_type, &bytes))
    }

    fn reload(&self) {
        info!("page reload requested");
    }

    fn show_modal(&self, modal: &Element) {
        info!("showing modal {}", modal.id().unwrap_or_default());
    }

    fn attach_widget(&self, widget: Widget, trigger: &Element) {
        debug!("{widget:?} attached to <{}>", trigger.tag());
    }

    fn scroll_into_view(&self, target: &Element) {
        info!("scrolled to #{}", target.id().unwrap_or_default());
    }
}
