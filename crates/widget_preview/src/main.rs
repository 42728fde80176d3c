use std::io::Write;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use widget_core::{Role, StoreChange, SCRIPT_ENDPOINT_ATTRIBUTE};
use widget_embed::{DomEvent, EmbedBootstrap, EmbedOptions, MemoryPage, ROOT_ELEMENT_ID};
use widget_runtime::{WidgetController, WidgetNotice};

/// Mount the chat widget into an in-memory page and chat with it from stdin.
#[derive(Parser, Debug)]
#[command(name = "widget-preview", version)]
struct Args {
    /// Chat endpoint, passed to the widget as its explicit URL
    #[arg(long, env = "CHAT_API_URL")]
    endpoint: Option<String>,

    /// Host page global config as JSON, e.g. '{"CHAT_API_URL": "..."}'
    #[arg(long)]
    global_config: Option<String>,

    /// Endpoint carried on the embedding script tag
    #[arg(long)]
    script_url: Option<String>,

    /// Simulate a page without isolation boundary support
    #[arg(long)]
    no_boundary: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_target(true)
                .with_line_number(true)
                .with_writer(std::io::stderr),
        )
        .init();

    let args = Args::parse();
    let page = Arc::new(build_page(&args)?);
    let bootstrap = EmbedBootstrap::new(
        page.clone(),
        EmbedOptions {
            endpoint_url: args.endpoint.clone(),
            ..EmbedOptions::default()
        },
    );
    bootstrap.install();

    let controller = bootstrap
        .controller()
        .ok_or_else(|| anyhow!("widget did not mount"))?;
    match bootstrap.endpoint_config() {
        Some(config) => tracing::info!("Chatting with {}", config.endpoint_url),
        None => tracing::warn!("No chat endpoint configured; every message will fail"),
    }

    open_panel(&page, &controller).await?;
    for message in controller.messages() {
        println!("{}> {}", speaker(message.role()), message.text());
    }

    let printer = tokio::spawn(print_replies(controller.clone()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        if line.trim().is_empty() {
            prompt()?;
            continue;
        }
        match controller.send_message(line) {
            Ok(exchange) => {
                let outcome = exchange.await.context("exchange task failed")?;
                tracing::debug!("Exchange finished: {:?}", outcome);
            }
            Err(rejected) => tracing::warn!("Message not sent: {}", rejected),
        }
        prompt()?;
    }

    bootstrap.unmount();
    printer.abort();
    Ok(())
}

fn build_page(args: &Args) -> anyhow::Result<MemoryPage> {
    let mut page = MemoryPage::new();
    if let Some(raw) = &args.global_config {
        let config: serde_json::Value =
            serde_json::from_str(raw).context("--global-config is not valid JSON")?;
        page = page.with_global_config(config);
    }
    if let Some(url) = &args.script_url {
        page = page.with_script_attribute(SCRIPT_ENDPOINT_ATTRIBUTE, url);
    }
    if args.no_boundary {
        page = page.without_boundary_support();
    }
    Ok(page)
}

/// Click the launcher and wait until the input would receive focus.
async fn open_panel(page: &MemoryPage, controller: &WidgetController) -> anyhow::Result<()> {
    let mut notices = controller.subscribe();
    page.dispatch(ROOT_ELEMENT_ID, DomEvent::LauncherClicked);
    loop {
        match notices.recv().await {
            Ok(WidgetNotice::FocusRequested) => return Ok(()),
            Ok(WidgetNotice::StateChanged(state)) => {
                tracing::debug!("Widget state: {}", state.description())
            }
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => return Err(anyhow!("widget closed before opening")),
        }
    }
}

/// Echo assistant messages to stdout as they grow.
async fn print_replies(controller: WidgetController) {
    let mut changes = controller.store().subscribe();
    let mut printed = 0usize;
    loop {
        let change = match changes.recv().await {
            Ok(change) => change,
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!("Printer lagged by {} updates", skipped);
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        let Some(last) = controller.store().last() else {
            continue;
        };
        if last.role() != Role::Assistant {
            continue;
        }

        match change {
            StoreChange::Appended { .. } => {
                print!("\nbot> {}", last.text());
                printed = last.text().chars().count();
            }
            StoreChange::Updated { .. } => {
                let fresh: String = last.text().chars().skip(printed).collect();
                printed += fresh.chars().count();
                print!("{}", fresh);
            }
            StoreChange::Replaced { .. } => {
                print!("\nbot> {}", last.text());
                printed = last.text().chars().count();
            }
        }
        if !last.is_streaming() {
            println!();
        }
        let _ = std::io::stdout().flush();
    }
}

fn prompt() -> anyhow::Result<()> {
    print!("you> ");
    std::io::stdout().flush().context("flushing stdout")
}

fn speaker(role: Role) -> &'static str {
    match role {
        Role::User => "you",
        Role::Assistant => "bot",
    }
}
