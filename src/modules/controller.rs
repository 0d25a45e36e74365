//! Binds page events to backend calls and renders the replies.
//!
//! [`Controller::initialize`] resolves every element handle once. Events are
//! routed through [`Controller::dispatch`], which runs the bound operation as
//! a tokio task; each operation is also callable directly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error, info, warn};
use tokio::task::JoinHandle;

use crate::modules::contract::{
    ALERT_CONTAINER, ALERTS, ANALYSIS_RESULT, ANALYZE_BUTTON, ANCHOR_LINKS, CAPTION_INPUT,
    CLAIM_BUTTONS, CONFIRM_REDEEM_BUTTON, FETCH_BUTTON, FILE_INPUTS, FILE_PREVIEW,
    POPOVER_TRIGGERS, PROFILE_FIELDS, PROFILE_LOADING, PROFILE_PIC_PREVIEW, REDEEM_BUTTONS,
    REDEEM_CODE_DISPLAY, REDEEM_MODAL, TOOLTIP_TRIGGERS, USERNAME_INPUT, profile_input_id,
};
use crate::modules::error::DashboardError;
use crate::modules::fetchers::Backend;
use crate::modules::notify::Notifier;
use crate::modules::page::{Element, Page};
use crate::modules::platform::{Platform, Widget};
use crate::modules::render::{LOADING_PLACEHOLDER, analysis_card, file_preview};
use crate::modules::serialize::Timings;
use crate::modules::types::{ProfileData, SelectedFile, Tone};

const CLAIM_PROMPT: &str = "Are you sure you want to claim this offer?";

/// A page event, carrying the element it happened on.
#[derive(Debug, Clone)]
pub enum UiEvent {
    Click(Element),
    Input(Element),
    Change(Element, Vec<SelectedFile>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    Click,
    Input,
    Change,
}

impl UiEvent {
    fn target(&self) -> &Element {
        match self {
            UiEvent::Click(el) | UiEvent::Input(el) | UiEvent::Change(el, _) => el,
        }
    }

    fn kind(&self) -> EventKind {
        match self {
            UiEvent::Click(_) => EventKind::Click,
            UiEvent::Input(_) => EventKind::Input,
            UiEvent::Change(_, _) => EventKind::Change,
        }
    }
}

#[derive(Debug, Clone)]
enum Action {
    FetchProfile,
    UsernameTyped,
    AnalyzeContent,
    PreviewFile(usize),
    ClaimOffer(String),
    OpenRedeem { claim_id: String, code: String },
    ScrollTo(Option<Element>),
}

#[derive(Debug)]
struct Listener {
    element: Element,
    kind: EventKind,
    action: Action,
}

/// Orders the requests of one operation so that only the latest issued
/// request may touch the page.
#[derive(Debug, Default)]
struct RequestSequence {
    issued: AtomicU64,
    /// Held while the count and the busy markers on the page change together.
    in_flight: Mutex<usize>,
}

impl RequestSequence {
    fn is_latest(&self, ticket: u64) -> bool {
        self.issued.load(Ordering::SeqCst) == ticket
    }

    fn in_flight(&self) -> MutexGuard<'_, usize> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keeps a control disabled and an indicator shown while any request of the
/// sequence is in flight. Dropping it settles the request, whatever the exit
/// path.
struct Busy<'a> {
    requests: &'a RequestSequence,
    ticket: u64,
    control: Option<Element>,
    indicator: Option<Element>,
}

impl<'a> Busy<'a> {
    fn start(
        requests: &'a RequestSequence,
        control: Option<Element>,
        indicator: Option<Element>,
    ) -> Self {
        let mut in_flight = requests.in_flight();
        *in_flight += 1;
        let ticket = requests.issued.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(indicator) = &indicator {
            indicator.show();
        }
        if let Some(control) = &control {
            control.set_disabled(true);
        }
        drop(in_flight);
        Self {
            requests,
            ticket,
            control,
            indicator,
        }
    }

    fn is_stale(&self) -> bool {
        !self.requests.is_latest(self.ticket)
    }
}

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.requests.in_flight();
        *in_flight = in_flight.saturating_sub(1);
        if *in_flight != 0 {
            return;
        }
        if let Some(indicator) = &self.indicator {
            indicator.hide();
        }
        if let Some(control) = &self.control {
            control.set_disabled(false);
        }
    }
}

#[derive(Debug, Default)]
struct ProfileBinding {
    input: Option<Element>,
    button: Option<Element>,
    spinner: Option<Element>,
    fields: Vec<(&'static str, Element)>,
    picture: Option<Element>,
    requests: RequestSequence,
    debounce: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Debug, Default)]
struct AnalysisBinding {
    input: Option<Element>,
    button: Option<Element>,
    panel: Option<Element>,
    requests: RequestSequence,
}

#[derive(Debug)]
struct PreviewBinding {
    input: Element,
    container: Option<Element>,
    reads: RequestSequence,
}

#[derive(Debug)]
struct RedeemModal {
    modal: Element,
    code_display: Element,
    confirm: Element,
}

struct Shared {
    backend: Arc<dyn Backend>,
    platform: Arc<dyn Platform>,
    notifier: Notifier,
    timings: Timings,
    profile: ProfileBinding,
    analysis: AnalysisBinding,
    previews: Vec<PreviewBinding>,
    redeem: Option<RedeemModal>,
    listeners: Vec<Listener>,
}

#[derive(Clone)]
pub struct Controller {
    shared: Arc<Shared>,
}

fn failure_message(err: &DashboardError, rejected: &str, broken: &str) -> String {
    match err.server_message() {
        Some(message) => message.to_string(),
        None if err.is_rejection() => rejected.to_string(),
        None => broken.to_string(),
    }
}

fn log_failure(operation: &str, err: &DashboardError) {
    if err.is_rejection() {
        warn!("{operation} rejected: {err}");
    } else {
        error!("{operation} failed: {err}");
    }
}

impl Controller {
    /// Binds handlers to the elements present in `page`. Must run inside a
    /// tokio runtime.
    pub fn initialize(
        page: &Page,
        backend: Arc<dyn Backend>,
        platform: Arc<dyn Platform>,
        timings: Timings,
    ) -> Result<Self, DashboardError> {
        for trigger in page.select(TOOLTIP_TRIGGERS)? {
            platform.attach_widget(Widget::Tooltip, &trigger);
        }
        for trigger in page.select(POPOVER_TRIGGERS)? {
            platform.attach_widget(Widget::Popover, &trigger);
        }

        let served_alerts = page.select(ALERTS)?;
        if !served_alerts.is_empty() {
            let timeout = timings.alert_timeout();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                for alert in served_alerts {
                    alert.remove();
                }
            });
        }

        let mut listeners = Vec::new();

        let profile = ProfileBinding {
            input: page.element_by_id(USERNAME_INPUT),
            button: page.element_by_id(FETCH_BUTTON),
            spinner: page.element_by_id(PROFILE_LOADING),
            fields: PROFILE_FIELDS
                .iter()
                .filter_map(|f| page.element_by_id(&profile_input_id(f)).map(|el| (*f, el)))
                .collect(),
            picture: page.element_by_id(PROFILE_PIC_PREVIEW),
            ..ProfileBinding::default()
        };
        if let (Some(input), Some(button)) = (&profile.input, &profile.button) {
            listeners.push(Listener {
                element: button.clone(),
                kind: EventKind::Click,
                action: Action::FetchProfile,
            });
            listeners.push(Listener {
                element: input.clone(),
                kind: EventKind::Input,
                action: Action::UsernameTyped,
            });
        }

        let analysis = AnalysisBinding {
            input: page.element_by_id(CAPTION_INPUT),
            button: page.element_by_id(ANALYZE_BUTTON),
            panel: page.element_by_id(ANALYSIS_RESULT),
            ..AnalysisBinding::default()
        };
        if let (Some(_), Some(button)) = (&analysis.input, &analysis.button) {
            listeners.push(Listener {
                element: button.clone(),
                kind: EventKind::Click,
                action: Action::AnalyzeContent,
            });
        }

        let mut previews = Vec::new();
        for (i, input) in page.select(FILE_INPUTS)?.into_iter().enumerate() {
            let container = match input.parent() {
                Some(parent) => parent.query(FILE_PREVIEW)?,
                None => None,
            };
            listeners.push(Listener {
                element: input.clone(),
                kind: EventKind::Change,
                action: Action::PreviewFile(i),
            });
            previews.push(PreviewBinding {
                input,
                container,
                reads: RequestSequence::default(),
            });
        }

        for button in page.select(CLAIM_BUTTONS)? {
            let Some(offer_id) = button.data("offer-id") else {
                warn!("claim button without data-offer-id, not bound");
                continue;
            };
            listeners.push(Listener {
                element: button,
                kind: EventKind::Click,
                action: Action::ClaimOffer(offer_id),
            });
        }

        for button in page.select(REDEEM_BUTTONS)? {
            let claim_id = button.data("claim-id").unwrap_or_default();
            let code = button.data("redeem-code").unwrap_or_default();
            listeners.push(Listener {
                element: button,
                kind: EventKind::Click,
                action: Action::OpenRedeem { claim_id, code },
            });
        }

        let redeem = match (
            page.element_by_id(REDEEM_MODAL),
            page.element_by_id(REDEEM_CODE_DISPLAY),
            page.element_by_id(CONFIRM_REDEEM_BUTTON),
        ) {
            (Some(modal), Some(code_display), Some(confirm)) => Some(RedeemModal {
                modal,
                code_display,
                confirm,
            }),
            _ => None,
        };

        for anchor in page.select(ANCHOR_LINKS)? {
            let href = anchor.attr("href").unwrap_or_default();
            let target = if href.len() > 1 {
                page.select(&href).ok().and_then(|found| found.into_iter().next())
            } else {
                None
            };
            listeners.push(Listener {
                element: anchor,
                kind: EventKind::Click,
                action: Action::ScrollTo(target),
            });
        }

        let notifier = Notifier::new(
            page.element_by_id(ALERT_CONTAINER),
            page,
            timings.alert_timeout(),
        );
        debug!("controller bound {} listeners", listeners.len());

        Ok(Self {
            shared: Arc::new(Shared {
                backend,
                platform,
                notifier,
                timings,
                profile,
                analysis,
                previews,
                redeem,
                listeners,
            }),
        })
    }

    pub fn notifier(&self) -> &Notifier {
        &self.shared.notifier
    }

    /// Runs every handler bound to the event's element, in binding order.
    ///
    /// Input events only (re)arm the debounce timer; when nothing else is
    /// bound the result is `None`. The returned task completes once all
    /// spawned handlers have.
    pub fn dispatch(&self, event: UiEvent) -> Option<JoinHandle<()>> {
        let kind = event.kind();
        let actions: Vec<Action> = self
            .shared
            .listeners
            .iter()
            .filter(|l| l.kind == kind && l.element == *event.target())
            .map(|l| l.action.clone())
            .collect();
        if actions.is_empty() {
            debug!("no {kind:?} listener on <{}>", event.target().tag());
            return None;
        }

        let files = match event {
            UiEvent::Change(_, files) => files,
            _ => Vec::new(),
        };
        let mut tasks = Vec::new();
        for action in actions {
            if let Action::UsernameTyped = action {
                self.schedule_profile_fetch();
                continue;
            }
            let this = self.clone();
            let files = files.clone();
            tasks.push(tokio::spawn(async move { this.run(action, files).await }));
        }

        if tasks.len() <= 1 {
            return tasks.pop();
        }
        Some(tokio::spawn(async move {
            for task in tasks {
                if let Err(err) = task.await {
                    warn!("event handler did not finish: {err}");
                }
            }
        }))
    }

    async fn run(&self, action: Action, files: Vec<SelectedFile>) {
        match action {
            Action::FetchProfile => self.request_profile().await,
            Action::UsernameTyped => self.schedule_profile_fetch(),
            Action::AnalyzeContent => self.request_analysis().await,
            Action::PreviewFile(i) => {
                if let Some(file) = files.into_iter().next() {
                    self.preview_at(i, file).await;
                }
            }
            Action::ClaimOffer(offer_id) => self.claim_offer(&offer_id).await,
            Action::OpenRedeem { claim_id, code } => self.open_redeem_modal(&claim_id, &code),
            Action::ScrollTo(target) => {
                if let Some(target) = target {
                    self.shared.platform.scroll_into_view(&target);
                }
            }
        }
    }

    pub fn notify(&self, message: &str, tone: Tone) -> Element {
        self.shared.notifier.show(message, tone)
    }

    async fn request_profile(&self) {
        let username = self
            .shared
            .profile
            .input
            .as_ref()
            .map(Element::value)
            .unwrap_or_default();
        let username = username.trim();
        if username.is_empty() {
            self.notify("Please enter an Instagram username", Tone::Warning);
            return;
        }
        self.fetch_profile(username).await;
    }

    fn schedule_profile_fetch(&self) {
        let profile = &self.shared.profile;
        let mut pending = profile
            .debounce
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = pending.take() {
            timer.abort();
        }

        let this = self.clone();
        let delay = self.shared.timings.debounce();
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let username = this
                .shared
                .profile
                .input
                .as_ref()
                .map(Element::value)
                .unwrap_or_default();
            let username = username.trim().to_string();
            if username.chars().count() < this.shared.timings.min_username_len {
                return;
            }
            // Detached so re-arming the timer never cancels a request.
            tokio::spawn(async move { this.fetch_profile(&username).await });
        }));
    }

    /// Fetches profile data for `username` and copies it into the profile
    /// inputs.
    pub async fn fetch_profile(&self, username: &str) {
        let profile = &self.shared.profile;
        let busy = Busy::start(
            &profile.requests,
            profile.button.clone(),
            profile.spinner.clone(),
        );
        info!("fetching profile data for {username}");
        let outcome = self.shared.backend.fetch_profile(username).await;
        if busy.is_stale() {
            debug!("discarding stale profile reply for {username}");
            return;
        }

        match outcome {
            Ok(data) => {
                self.apply_profile(&data);
                self.notify("Instagram data fetched successfully!", Tone::Success);
            }
            Err(err) => {
                log_failure("profile fetch", &err);
                let message = failure_message(
                    &err,
                    "Failed to fetch Instagram data",
                    "An error occurred while fetching Instagram data",
                );
                self.notify(&message, Tone::Danger);
            }
        }
    }

    fn apply_profile(&self, data: &ProfileData) {
        let profile = &self.shared.profile;
        for (field, text) in data.present_fields() {
            if let Some((_, input)) = profile.fields.iter().find(|(f, _)| *f == field) {
                input.set_value(&text);
            }
        }
        if let (Some(url), Some(picture)) = (&data.profile_pic_url, &profile.picture) {
            if !url.is_empty() {
                picture.set_attr("src", url);
                picture.show();
            }
        }
    }

    async fn request_analysis(&self) {
        let content = self
            .shared
            .analysis
            .input
            .as_ref()
            .map(Element::value)
            .unwrap_or_default();
        let content = content.trim();
        if content.is_empty() {
            self.notify("Please enter content to analyze", Tone::Warning);
            return;
        }
        self.analyze_content(content).await;
    }

    /// Sends `content` for analysis and renders the result card.
    pub async fn analyze_content(&self, content: &str) {
        let analysis = &self.shared.analysis;
        let busy = Busy::start(&analysis.requests, analysis.button.clone(), None);
        if let Some(panel) = &analysis.panel {
            panel.set_inner_html(LOADING_PLACEHOLDER);
            panel.show();
        }

        let outcome = self.shared.backend.analyze_content(content).await;
        if busy.is_stale() {
            debug!("discarding stale analysis reply");
            return;
        }

        match outcome {
            Ok(result) => {
                if let Some(panel) = &analysis.panel {
                    panel.set_inner_html(&analysis_card(&result));
                }
            }
            Err(err) => {
                log_failure("content analysis", &err);
                let message = failure_message(
                    &err,
                    "Failed to analyze content",
                    "An error occurred during content analysis",
                );
                self.notify(&message, Tone::Danger);
                if let Some(panel) = &analysis.panel {
                    panel.hide();
                }
            }
        }
    }

    /// Renders a preview of `file` next to the file input it was picked in.
    pub async fn preview_file(&self, input: &Element, file: SelectedFile) {
        match self.shared.previews.iter().position(|p| p.input == *input) {
            Some(i) => self.preview_at(i, file).await,
            None => warn!("<{}> is not a bound file input", input.tag()),
        }
    }

    async fn preview_at(&self, index: usize, file: SelectedFile) {
        let binding = &self.shared.previews[index];
        let busy = Busy::start(&binding.reads, None, None);
        let read = self.shared.platform.read_data_url(&file).await;
        if busy.is_stale() {
            debug!("discarding preview of {file}, a newer file was selected");
            return;
        }

        let data_url = match read {
            Ok(url) => url,
            Err(err) => {
                warn!("cannot read {file}: {err}");
                self.notify("Could not read the selected file", Tone::Danger);
                return;
            }
        };
        if let Some(container) = &binding.container {
            container.set_inner_html(&file_preview(&file, &data_url));
            container.show();
        }
    }

    /// Claims an offer after the user confirms, then reloads the page.
    pub async fn claim_offer(&self, offer_id: &str) {
        if !self.shared.platform.confirm(CLAIM_PROMPT) {
            debug!("claim of offer {offer_id} not confirmed");
            return;
        }

        info!("claiming offer {offer_id}");
        match self.shared.backend.claim_offer(offer_id).await {
            Ok(()) => {
                self.notify("Offer claimed successfully!", Tone::Success);
                tokio::time::sleep(self.shared.timings.reload_delay()).await;
                self.shared.platform.reload();
            }
            Err(err) => {
                log_failure("offer claim", &err);
                let message = failure_message(
                    &err,
                    "Failed to claim offer",
                    "An error occurred while claiming the offer",
                );
                self.notify(&message, Tone::Danger);
            }
        }
    }

    pub fn open_redeem_modal(&self, claim_id: &str, redeem_code: &str) {
        let Some(redeem) = &self.shared.redeem else {
            warn!("page has no redeem modal");
            return;
        };
        redeem.code_display.set_text(redeem_code);
        redeem.confirm.set_data("claim-id", claim_id);
        self.shared.platform.show_modal(&redeem.modal);
    }

    pub async fn copy_to_clipboard(&self, text: &str) {
        match self.shared.platform.write_clipboard(text).await {
            Ok(()) => {
                self.notify("Copied to clipboard!", Tone::Success);
            }
            Err(err) => {
                error!("could not copy text: {err}");
                self.notify("Failed to copy to clipboard", Tone::Danger);
            }
        }
    }
}
