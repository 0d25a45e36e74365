use std::error::Error;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use haip_dashboard::modules::contract::{
    ANALYSIS_RESULT, ANALYZE_BUTTON, CAPTION_INPUT, FETCH_BUTTON, FILE_INPUTS, FILE_PREVIEW,
    PROFILE_FIELDS, REDEEM_CODE_DISPLAY, USERNAME_INPUT, profile_input_id,
};
use haip_dashboard::modules::controller::{Controller, UiEvent};
use haip_dashboard::modules::fetchers::DashboardClient;
use haip_dashboard::modules::page::{Element, Page};
use haip_dashboard::modules::platform::TerminalPlatform;
use haip_dashboard::modules::serialize::{load_config_or_default, save_config};
use haip_dashboard::modules::types::SelectedFile;
use log::{error, info};
use simplelog::*;

#[derive(Parser)]
#[command(
    name = "haip-dashboard",
    version,
    about = "Drive the hAIpClub dashboard page from a terminal",
    long_about = None
)]
struct Cli {
    #[arg(short = 'l', long = "log-file", default_value = "haip-dashboard.log")]
    log_file: String,

    #[arg(short = 'c', long = "config", default_value = "./dashboard.toml")]
    config: String,

    /// Dashboard base URL, overrides the config file.
    #[arg(short = 'u', long = "base-url")]
    base_url: Option<String>,

    /// Local HTML file to use as the page instead of loading it from the server.
    #[arg(short = 'p', long = "page")]
    page: Option<PathBuf>,

    /// CSRF token to seed the cookie jar with.
    #[arg(long = "csrf-token")]
    csrf_token: Option<String>,

    /// Answer confirmations with yes.
    #[arg(short = 'y', long = "yes")]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch Instagram profile data into the profile form.
    Fetch { username: String },
    /// Run the AI content analysis on a caption.
    Analyze { content: String },
    /// Claim an offer.
    Claim { offer_id: String },
    /// Open the redeem modal for a claim.
    Redeem { claim_id: String, code: String },
    /// Preview a file in the first file input.
    Preview { file: PathBuf },
    /// Copy text to the clipboard.
    Copy { text: String },
    /// Write the effective configuration to the config path and exit.
    InitConfig,
}

fn init_logger(log_path: &str) -> Result<(), Box<dyn Error>> {
    WriteLogger::init(
        LevelFilter::Info,
        ConfigBuilder::new()
            .set_time_format_rfc3339()
            .build(),
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?,
    )?;
    Ok(())
}

fn require(page: &Page, id: &str) -> Result<Element, Box<dyn Error>> {
    page.element_by_id(id)
        .ok_or_else(|| format!("page has no #{id} element").into())
}

async fn settle(handle: Option<tokio::task::JoinHandle<()>>) -> Result<(), Box<dyn Error>> {
    match handle {
        Some(handle) => Ok(handle.await?),
        None => Err("the page has no handler for this action".into()),
    }
}

fn banner_tone(banner: &Element) -> String {
    banner
        .attr("class")
        .and_then(|class| {
            class
                .split_whitespace()
                .filter(|c| *c != "alert-dismissible")
                .find_map(|c| c.strip_prefix("alert-").map(str::to_string))
        })
        .unwrap_or_default()
}

fn print_profile(page: &Page) {
    for field in PROFILE_FIELDS {
        if let Some(input) = page.element_by_id(&profile_input_id(field)) {
            println!("{field}: {}", input.value());
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logger(&cli.log_file)?;

    let mut config = load_config_or_default(&cli.config)?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if let Command::InitConfig = cli.command {
        save_config(&cli.config, &config)?;
        info!("configuration written to {}", cli.config);
        println!("wrote {}", cli.config);
        return Ok(());
    }

    let client = Arc::new(DashboardClient::new(&config)?);
    if let Some(token) = &cli.csrf_token {
        client.seed_cookie(&format!("{}={token}", config.csrf_cookie));
    }

    let html = match &cli.page {
        Some(path) => fs::read_to_string(path)?,
        None => client.load_page(&config.page_path).await?,
    };
    let page = Page::from_html(&html);
    match &cli.page {
        Some(path) => info!("page loaded from {}", path.display()),
        None => info!("page loaded from {}{}", config.base_url, config.page_path),
    }

    let platform = Arc::new(TerminalPlatform { assume_yes: cli.yes });
    let controller = Controller::initialize(&page, client, platform, config.timings.clone())?;

    match cli.command {
        Command::Fetch { username } => {
            require(&page, USERNAME_INPUT)?.set_value(&username);
            let button = require(&page, FETCH_BUTTON)?;
            settle(controller.dispatch(UiEvent::Click(button))).await?;
            print_profile(&page);
        }
        Command::Analyze { content } => {
            require(&page, CAPTION_INPUT)?.set_value(&content);
            let button = require(&page, ANALYZE_BUTTON)?;
            settle(controller.dispatch(UiEvent::Click(button))).await?;
            let panel = require(&page, ANALYSIS_RESULT)?;
            if panel.is_displayed() {
                println!("{}", panel.inner_html());
            }
        }
        Command::Claim { offer_id } => {
            controller.claim_offer(&offer_id).await;
        }
        Command::Redeem { claim_id, code } => {
            controller.open_redeem_modal(&claim_id, &code);
            println!("redeem code: {}", require(&page, REDEEM_CODE_DISPLAY)?.text());
        }
        Command::Preview { file } => {
            let Some(input) = page.select(FILE_INPUTS)?.into_iter().next() else {
                error!("page has no file input");
                return Err("page has no file input".into());
            };
            let selected = SelectedFile::from_path(&file);
            settle(controller.dispatch(UiEvent::Change(input.clone(), vec![selected]))).await?;
            if let Some(parent) = input.parent() {
                if let Some(preview) = parent.query(FILE_PREVIEW)? {
                    println!("{}", preview.inner_html());
                }
            }
        }
        Command::Copy { text } => {
            controller.copy_to_clipboard(&text).await;
        }
        Command::InitConfig => {}
    }

    for banner in controller.notifier().visible() {
        println!("[{}] {}", banner_tone(&banner), banner.text().trim());
    }

    Ok(())
}
