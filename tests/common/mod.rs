#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use haip_dashboard::modules::controller::Controller;
use haip_dashboard::modules::error::DashboardError;
use haip_dashboard::modules::fetchers::Backend;
use haip_dashboard::modules::page::{Element, Page};
use haip_dashboard::modules::platform::{Platform, Widget, data_url};
use haip_dashboard::modules::serialize::Timings;
use haip_dashboard::modules::types::{ContentAnalysis, ProfileData, SelectedFile};
use tokio::sync::Notify;

pub const DASHBOARD_HTML: &str = include_str!("../../templates/dashboard.html");

#[derive(Debug, Clone)]
pub enum Scripted<T> {
    Reply(T),
    Rejected(Option<&'static str>),
    Broken,
}

impl<T> Scripted<T> {
    fn into_result(self) -> Result<T, DashboardError> {
        match self {
            Scripted::Reply(value) => Ok(value),
            Scripted::Rejected(message) => Err(DashboardError::Rejected {
                message: message.map(str::to_string),
            }),
            Scripted::Broken => Err(DashboardError::Decode(
                serde_json::from_str::<serde_json::Value>("<html>").unwrap_err(),
            )),
        }
    }
}

struct Step<T> {
    reply: Scripted<T>,
    gate: Option<Arc<Notify>>,
}

/// Replies handed out in order, then the fallback forever.
pub struct Script<T> {
    queue: Mutex<VecDeque<Step<T>>>,
    fallback: Mutex<Scripted<T>>,
}

impl<T: Clone> Script<T> {
    fn new(fallback: Scripted<T>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(fallback),
        }
    }

    pub fn set(&self, reply: Scripted<T>) {
        *self.fallback.lock().unwrap() = reply;
    }

    pub fn push(&self, reply: Scripted<T>) {
        self.queue.lock().unwrap().push_back(Step { reply, gate: None });
    }

    /// Queues a reply that is held back until the returned gate is notified.
    pub fn push_gated(&self, reply: Scripted<T>) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.queue.lock().unwrap().push_back(Step {
            reply,
            gate: Some(Arc::clone(&gate)),
        });
        gate
    }

    async fn next(&self) -> Result<T, DashboardError> {
        let step = self.queue.lock().unwrap().pop_front();
        let Some(step) = step else {
            let fallback = self.fallback.lock().unwrap().clone();
            return fallback.into_result();
        };
        if let Some(gate) = step.gate {
            gate.notified().await;
        }
        step.reply.into_result()
    }
}

pub fn sample_profile(followers: u64) -> ProfileData {
    serde_json::from_value(serde_json::json!({
        "follower_count": followers,
        "following_count": 310,
        "post_count": 88,
        "engagement_rate": 4.2,
        "bio": "Latte art in SF",
        "profile_pic_url": "https://cdn.example.com/coffee_sf.jpg",
    }))
    .unwrap()
}

pub fn approved_analysis() -> ContentAnalysis {
    ContentAnalysis {
        sentiment: "positive".to_string(),
        brand_mentioned: true,
        quality_score: 8.into(),
        brand_safe: true,
        recommendation: "approve".to_string(),
        feedback: None,
        issues: Vec::new(),
    }
}

pub struct FakeBackend {
    pub calls: Mutex<Vec<String>>,
    pub profile: Script<ProfileData>,
    pub analysis: Script<ContentAnalysis>,
    pub claim: Script<()>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            profile: Script::new(Scripted::Reply(sample_profile(1200))),
            analysis: Script::new(Scripted::Reply(approved_analysis())),
            claim: Script::new(Scripted::Reply(())),
        }
    }
}

impl FakeBackend {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn fetch_profile(&self, username: &str) -> Result<ProfileData, DashboardError> {
        self.record(format!("profile:{username}"));
        self.profile.next().await
    }

    async fn analyze_content(&self, content: &str) -> Result<ContentAnalysis, DashboardError> {
        self.record(format!("analyze:{content}"));
        self.analysis.next().await
    }

    async fn claim_offer(&self, offer_id: &str) -> Result<(), DashboardError> {
        self.record(format!("claim:{offer_id}"));
        self.claim.next().await
    }
}

#[derive(Default)]
pub struct FakePlatform {
    pub confirm_answer: AtomicBool,
    pub prompts: Mutex<Vec<String>>,
    pub clipboard: Mutex<Vec<String>>,
    pub clipboard_fails: AtomicBool,
    pub file_gates: Mutex<HashMap<String, Arc<Notify>>>,
    pub reloads: AtomicUsize,
    pub modals: Mutex<Vec<String>>,
    pub widgets: Mutex<Vec<(Widget, String)>>,
    pub scrolled: Mutex<Vec<String>>,
}

impl FakePlatform {
    /// Holds back reading `name` until the returned gate is notified.
    pub fn gate_file(&self, name: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.file_gates
            .lock()
            .unwrap()
            .insert(name.to_string(), Arc::clone(&gate));
        gate
    }

    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Platform for FakePlatform {
    fn confirm(&self, prompt: &str) -> bool {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.confirm_answer.load(Ordering::SeqCst)
    }

    async fn write_clipboard(&self, text: &str) -> Result<(), DashboardError> {
        if self.clipboard_fails.load(Ordering::SeqCst) {
            return Err(DashboardError::Clipboard {
                detail: "permission denied".to_string(),
            });
        }
        self.clipboard.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn read_data_url(&self, file: &SelectedFile) -> Result<String, DashboardError> {
        let gate = self.file_gates.lock().unwrap().get(&file.name).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if file.name == "unreadable.png" {
            return Err(DashboardError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "denied",
            )));
        }
        Ok(data_url(&file.mime_type, file.name.as_bytes()))
    }

    fn reload(&self) {
        self.reloads.fetch_add(1, Ordering::SeqCst);
    }

    fn show_modal(&self, modal: &Element) {
        self.modals
            .lock()
            .unwrap()
            .push(modal.id().unwrap_or_default());
    }

    fn attach_widget(&self, widget: Widget, trigger: &Element) {
        self.widgets
            .lock()
            .unwrap()
            .push((widget, trigger.tag()));
    }

    fn scroll_into_view(&self, target: &Element) {
        self.scrolled
            .lock()
            .unwrap()
            .push(target.id().unwrap_or_default());
    }
}

pub struct Harness {
    pub page: Page,
    pub controller: Controller,
    pub backend: Arc<FakeBackend>,
    pub platform: Arc<FakePlatform>,
}

impl Harness {
    /// Must be called inside a tokio runtime.
    pub fn new(html: &str) -> Self {
        let page = Page::from_html(html);
        let backend = Arc::new(FakeBackend::default());
        let platform = Arc::new(FakePlatform::default());
        let controller = Controller::initialize(
            &page,
            backend.clone(),
            platform.clone(),
            Timings::default(),
        )
        .unwrap();
        Self {
            page,
            controller,
            backend,
            platform,
        }
    }

    pub fn dashboard() -> Self {
        Self::new(DASHBOARD_HTML)
    }

    pub fn el(&self, id: &str) -> Element {
        self.page
            .element_by_id(id)
            .unwrap_or_else(|| panic!("no #{id} in page"))
    }

    /// Visible notifications as `(tone, text)`.
    pub fn banners(&self) -> Vec<(String, String)> {
        self.controller
            .notifier()
            .visible()
            .iter()
            .map(|banner| {
                let class = banner.attr("class").unwrap_or_default();
                let tone = class
                    .split_whitespace()
                    .filter(|c| *c != "alert-dismissible")
                    .find_map(|c| c.strip_prefix("alert-"))
                    .unwrap_or_default()
                    .to_string();
                (tone, banner.text().trim().to_string())
            })
            .collect()
    }
}

/// Lets spawned tasks run until they block.
pub async fn run_pending() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
