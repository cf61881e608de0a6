//! Conversa CLI - inspect and exercise the conversation data layer
//!
//! Groups message fixtures into the dated timeline, validates cache
//! invariants, and talks to a live backend through the HTTP transport.

use chrono::Local;
use clap::{Parser, Subcommand};
use conversa::config::Config;
use conversa::grouping::{group_by_day, TimelineEntry};
use conversa::model::{ConversationKey, Direction, Message};
use conversa::pagination::{has_unique_ids, is_ordered};
use conversa::service::ConversationService;
use conversa::transport::HttpTransport;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Conversa - conversation data layer tools
#[derive(Parser)]
#[command(name = "conversa")]
#[command(about = "Inspect and exercise the conversation data layer")]
struct Cli {
    /// Backend base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Backend API key
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Group a message fixture file into the dated timeline
    Group {
        /// JSON file containing an array of messages
        file: PathBuf,
    },

    /// Validate the cache invariants of a message fixture file
    Validate {
        /// JSON file containing an array of messages
        file: PathBuf,
    },

    /// Fetch the contact list for an instance
    Contacts {
        /// Instance id
        instance: String,
    },

    /// Fetch the latest page of messages for a contact
    Messages {
        /// Instance id
        instance: String,

        /// Contact id (phone)
        contact: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut config = Config::default();
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if let Some(api_key) = cli.api_key {
        config.api_key = Some(api_key);
    }

    match cli.command {
        Commands::Group { file } => cmd_group(&file),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Contacts { instance } => cmd_contacts(config, &instance).await,
        Commands::Messages { instance, contact } => {
            cmd_messages(config, &instance, &contact).await
        }
    }
}

fn load_fixture(file: &Path) -> anyhow::Result<Vec<Message>> {
    let content = std::fs::read_to_string(file)?;
    let mut messages: Vec<Message> = serde_json::from_str(&content)?;
    messages.sort_by_key(|m| m.timestamp);
    Ok(messages)
}

fn print_timeline(messages: &[Message]) {
    let timeline = group_by_day(messages, Local::now());
    for entry in &timeline {
        match entry {
            TimelineEntry::Separator { label, .. } => println!("--- {} ---", label),
            TimelineEntry::Message(msg) => {
                let arrow = match msg.direction {
                    Direction::Incoming => "<",
                    Direction::Outgoing => ">",
                };
                let time = msg.timestamp.with_timezone(&Local).format("%H:%M");
                let body = msg.body.as_deref().unwrap_or("[media]");
                println!("[{}] {} {}", time, arrow, body);
            }
        }
    }
}

fn cmd_group(file: &Path) -> anyhow::Result<()> {
    let messages = load_fixture(file)?;
    print_timeline(&messages);
    Ok(())
}

fn cmd_validate(file: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)?;
    let messages: Vec<Message> = serde_json::from_str(&content)?;

    let ordered = is_ordered(&messages);
    let unique = has_unique_ids(&messages);

    println!("messages:   {}", messages.len());
    println!("ordered:    {}", if ordered { "ok" } else { "VIOLATED" });
    println!("unique ids: {}", if unique { "ok" } else { "VIOLATED" });

    if !ordered || !unique {
        anyhow::bail!("fixture violates cache invariants");
    }
    Ok(())
}

async fn cmd_contacts(config: Config, instance: &str) -> anyhow::Result<()> {
    let transport = Arc::new(HttpTransport::new(&config));
    let service = ConversationService::new(config, transport);
    service.load_snapshot()?;

    let result = service.fetch_all_contacts(instance).await?;
    for contact in result.contacts() {
        println!(
            "{}  {}  {}",
            contact.id,
            contact.name,
            contact.phone.as_deref().unwrap_or("-")
        );
    }

    service.save_snapshot()?;
    Ok(())
}

async fn cmd_messages(config: Config, instance: &str, contact: &str) -> anyhow::Result<()> {
    let transport = Arc::new(HttpTransport::new(&config));
    let service = ConversationService::new(config, transport);

    let key = ConversationKey::new(instance, contact);
    service.set_active_conversation(Some(key.clone()));
    let fetched = service.fetch_initial(&key).await?;
    print_timeline(fetched.messages());

    let entry = service.cache().messages(&key).unwrap_or_default();
    if entry.has_more {
        println!("(older messages available)");
    }
    Ok(())
}
