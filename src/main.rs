//! Study AI Proxy
//!
//! Serves the study endpoint that forwards tutoring, quiz, notes and planner
//! requests to a chat-completion gateway, and can ask a running proxy a
//! question from the command line.

use clap::{Parser, Subcommand};
use std::sync::Arc;
use study_ai_proxy::api::endpoints::{AppState, STUDY_AI_PATHS, create_router};
use study_ai_proxy::client::{AssistantReply, ParserLimits, StudyClient};
use study_ai_proxy::core::config::Config;
use study_ai_proxy::core::dispatcher::Dispatcher;
use study_ai_proxy::core::gateway::HttpGateway;
use study_ai_proxy::core::logging::init_logging;
use study_ai_proxy::models::study::{ChatRequest, Message, Mode};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "study-ai-proxy", version, about = "Study assistant proxy")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the proxy server (default)
    Serve,
    /// Stream an answer from a running proxy
    Ask {
        question: String,
        #[arg(long, default_value = "simple")]
        mode: String,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        topic: Option<String>,
        /// Study endpoint URL; defaults to the configured local server
        #[arg(long)]
        endpoint: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            eprintln!("Configuration Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config.server.log_level);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Ask {
            question,
            mode,
            subject,
            topic,
            endpoint,
        } => {
            let endpoint = endpoint.unwrap_or_else(|| {
                format!(
                    "http://127.0.0.1:{}{}",
                    config.server.port, STUDY_AI_PATHS[0]
                )
            });
            let request = ChatRequest {
                subject,
                topic,
                ..ChatRequest::new(Mode::parse(&mode), vec![Message::user(question)])
            };
            ask(&endpoint, request, config.stream.into()).await;
        }
    }
}

async fn serve(config: Arc<Config>) {
    let api_key = config.api_key();
    if api_key.is_none() {
        warn!(
            "{} is not set; study requests will fail until it is configured",
            config.gateway.api_key_env
        );
    }
    let api_key_configured = api_key.is_some();

    let gateway = match HttpGateway::new(&config.gateway, api_key) {
        Ok(gateway) => Arc::new(gateway),
        Err(e) => {
            error!("Failed to create gateway client: {}", e);
            std::process::exit(1);
        }
    };
    let dispatcher = Arc::new(Dispatcher::new(gateway, config.gateway.model.clone()));

    info!(
        "Forwarding to {} with model {}",
        config.gateway.base_url, config.gateway.model
    );

    let app = create_router(AppState {
        config: config.clone(),
        dispatcher,
        api_key_configured,
    });

    let addr = config.bind_addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!("Server listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn ask(endpoint: &str, request: ChatRequest, limits: ParserLimits) {
    let client = StudyClient::new(endpoint, std::env::var("STUDY_AI_PUBLISHABLE_KEY").ok())
        .with_limits(limits);

    let mut messages = request.messages.clone();
    let mut reply = AssistantReply::new(&mut messages).with_echo(true);
    client.stream_chat(&request, &mut reply).await;
    println!();

    if let Some(message) = reply.error() {
        eprintln!("Error: {}", message);
        std::process::exit(1);
    }
}
