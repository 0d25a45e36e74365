use axum::extract::{Path, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use haip_dashboard::modules::contract::CSRF_HEADER;
use haip_dashboard::modules::fetchers::read_cookie;
use haip_dashboard::modules::serialize::{DashboardConfig, load_config_or_default};
use serde::Deserialize;
use serde_json::{Value, json};
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

const DASHBOARD_HTML: &str = include_str!("../../templates/dashboard.html");

#[derive(Clone)]
struct AppState {
    csrf_token: Arc<String>,
    csrf_cookie: Arc<String>,
}

#[derive(Parser)]
#[command(
    name = "dashboard_stub",
    version,
    about = "Local stand-in for the hAIpClub dashboard backend",
    long_about = None
)]
struct Cli {
    #[arg(short = 'c', long = "config", default_value = "./dashboard.toml")]
    config: String,

    #[arg(short = 't', long = "csrf-token", default_value = "stub-csrf-token")]
    csrf_token: String,
}

#[derive(Deserialize)]
struct ProfileRequest {
    #[serde(default)]
    username: String,
}

#[derive(Deserialize)]
struct AnalysisRequest {
    #[serde(default)]
    content: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config: DashboardConfig = match load_config_or_default(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("cannot read {}: {err}", cli.config);
            std::process::exit(2);
        }
    };
    let state = AppState {
        csrf_token: Arc::new(cli.csrf_token),
        csrf_cookie: Arc::new(config.csrf_cookie.clone()),
    };

    let app = Router::new()
        .route(&config.page_path, get(dashboard))
        .route(&config.endpoints.fetch_profile, post(fetch_profile))
        .route(&config.endpoints.analyze_content, post(analyze_content))
        .route(
            &config.endpoints.claim_offer.replace("{offer_id}", ":offer_id"),
            post(claim_offer),
        )
        .with_state(state);

    let port = env::var("DASHBOARD_STUB_PORT")
        .ok()
        .and_then(|val| val.parse::<u16>().ok())
        .unwrap_or(8000);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    println!("Dashboard stub running on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind port");
    axum::serve(listener, app)
        .await
        .expect("server error");
}

async fn dashboard(State(state): State<AppState>) -> Response {
    let cookie = format!("{}={}; Path=/", state.csrf_cookie, state.csrf_token);
    ([(SET_COOKIE, cookie)], Html(DASHBOARD_HTML)).into_response()
}

async fn fetch_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ProfileRequest>,
) -> Result<Json<Value>, ApiError> {
    check_csrf(&state, &headers)?;
    let username = payload.username.trim().trim_start_matches('@');
    if username.is_empty() {
        return Err(ApiError::rejected(StatusCode::BAD_REQUEST, "Username is required"));
    }
    if username.starts_with("missing") {
        return Err(ApiError::rejected(
            StatusCode::OK,
            &format!("Could not fetch profile for @{username}"),
        ));
    }

    let seed = username.bytes().map(u64::from).sum::<u64>();
    Ok(Json(json!({
        "success": true,
        "data": {
            "follower_count": 1000 + seed * 37,
            "following_count": 200 + seed % 300,
            "post_count": 40 + seed % 120,
            "engagement_rate": ((seed % 90) as f64) / 10.0,
            "bio": format!("@{username} on hAIpClub"),
            "profile_pic_url": format!("https://cdn.example.com/{username}.jpg"),
        }
    })))
}

async fn analyze_content(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AnalysisRequest>,
) -> Result<Json<Value>, ApiError> {
    check_csrf(&state, &headers)?;
    let content = payload.content.trim();
    if content.is_empty() {
        return Err(ApiError::rejected(StatusCode::BAD_REQUEST, "Content is required"));
    }

    let lower = content.to_lowercase();
    let brand_mentioned = lower.contains("haip");
    let mut issues = Vec::new();
    if !brand_mentioned {
        issues.push("Brand is not mentioned");
    }
    if content.len() < 20 {
        issues.push("Caption is very short");
    }
    let recommendation = if issues.is_empty() {
        "approve"
    } else {
        "needs_revision"
    };

    Ok(Json(json!({
        "success": true,
        "analysis": {
            "sentiment": "neutral",
            "brand_mentioned": brand_mentioned,
            "quality_score": 10 - 2 * issues.len(),
            "brand_safe": true,
            "recommendation": recommendation,
            "feedback": "Canned review from the dashboard stub.",
            "issues": issues,
        }
    })))
}

async fn claim_offer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(offer_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    check_csrf(&state, &headers)?;
    if offer_id.parse::<u32>().is_err() {
        return Err(ApiError::rejected(StatusCode::NOT_FOUND, "Offer not found"));
    }
    Ok(Json(json!({ "success": true })))
}

fn check_csrf(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let cookie = headers
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| read_cookie(v, &state.csrf_cookie));
    let header = headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok());
    match (cookie.as_deref(), header) {
        (Some(cookie), Some(header))
            if cookie == header && header == state.csrf_token.as_str() =>
        {
            Ok(())
        }
        _ => Err(ApiError::rejected(StatusCode::FORBIDDEN, "CSRF verification failed")),
    }
}

#[derive(Debug)]
struct ApiError {
    code: StatusCode,
    message: String,
}

impl ApiError {
    fn rejected(code: StatusCode, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.code,
            Json(json!({ "success": false, "message": self.message })),
        )
            .into_response()
    }
}
