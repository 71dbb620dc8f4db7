//! audience CLI: queue contact updates and events, inspect jobs.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use audience_rs::config::{Config, RunnerConfig};
use audience_rs::db::Db;
use audience_rs::model::{Contact, ContactStatus};
use audience_rs::runner::{JobId, JobRunner};
use audience_rs::telemetry::{TelemetryConfig, init_telemetry};
use audience_rs::work::{WorkStatus, WorkStatusProvider};
use audience_rs::{Sdk, SdkBuilder};
use clap::{Parser, Subcommand, ValueEnum};
use futures::StreamExt as _;
use secrecy::ExposeSecret;

#[derive(Parser)]
#[command(name = "audience", about = "Queue updates to a marketing audience")]
struct Cli {
    /// Return as soon as work is queued instead of waiting for it to finish
    #[arg(long, global = true)]
    no_wait: bool,
    /// Runner tuning (TOML)
    #[arg(long, global = true)]
    runner_config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Contact operations
    Contact {
        #[command(subcommand)]
        action: ContactAction,
    },
    /// Tag operations
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },
    /// Merge field operations
    MergeField {
        #[command(subcommand)]
        action: MergeFieldAction,
    },
    /// Marketing permission operations
    Permission {
        #[command(subcommand)]
        action: PermissionAction,
    },
    /// Event operations
    Event {
        #[command(subcommand)]
        action: EventAction,
    },
    /// Show the status of a job
    Status { id: String },
    /// List the jobs in a chain
    Jobs { name: String },
}

#[derive(Subcommand)]
enum ContactAction {
    /// Create the contact or update it if it exists
    Upsert {
        email: String,
        /// Tag to add (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Merge field as KEY=VALUE (repeatable)
        #[arg(long = "merge-field", value_parser = parse_pair)]
        merge_fields: Vec<(String, String)>,
        /// Status applied when the contact is first created
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },
}

#[derive(Subcommand)]
enum TagAction {
    Add { email: String, tags: Vec<String> },
    Remove { email: String, tags: Vec<String> },
}

#[derive(Subcommand)]
enum MergeFieldAction {
    Set {
        email: String,
        key: String,
        value: String,
    },
}

#[derive(Subcommand)]
enum PermissionAction {
    Set {
        email: String,
        id: String,
        #[arg(action = clap::ArgAction::Set)]
        granted: bool,
    },
}

#[derive(Subcommand)]
enum EventAction {
    Add {
        email: String,
        name: String,
        /// Property as KEY=VALUE (repeatable)
        #[arg(long = "property", value_parser = parse_pair)]
        properties: Vec<(String, String)>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Subscribed,
    Transactional,
}

impl From<StatusArg> for ContactStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Subscribed => ContactStatus::Subscribed,
            StatusArg::Transactional => ContactStatus::Transactional,
        }
    }
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got {s:?}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "audience".to_string(),
        default_level: config.log_level.clone(),
    }
    .with_debug(config.sdk.debug_mode))?;

    let runner_config = match &cli.runner_config {
        Some(path) => RunnerConfig::from_toml_file(path)?,
        None => RunnerConfig::default(),
    };

    let mut builder: SdkBuilder = Sdk::builder(config.sdk).runner_config(runner_config);
    if let Some(url) = &config.database_url {
        let db = Db::connect(url.expose_secret()).await?;
        db.migrate().await?;
        builder = builder.store(Arc::new(db));
    }
    let sdk = builder.start().await?;
    let audience = sdk.audience();

    let submitted = match cli.command {
        Command::Contact {
            action:
                ContactAction::Upsert {
                    email,
                    tags,
                    merge_fields,
                    status,
                },
        } => {
            let mut contact = Contact::builder(email.as_str()).contact_status(status.map(Into::into));
            for tag in tags {
                contact = contact.add_tag(tag);
            }
            for (key, value) in merge_fields {
                contact = contact.merge_field(key, value);
            }
            Some(audience.create_or_update_contact(contact.build()).await)
        }
        Command::Tag {
            action: TagAction::Add { email, tags },
        } => Some(audience.add_tags(&email, tags).await),
        Command::Tag {
            action: TagAction::Remove { email, tags },
        } => Some(audience.remove_tags(&email, tags).await),
        Command::MergeField {
            action: MergeFieldAction::Set { email, key, value },
        } => Some(audience.set_merge_field(&email, &key, value).await),
        Command::Permission {
            action: PermissionAction::Set { email, id, granted },
        } => Some(audience.set_marketing_permission(&email, &id, granted).await),
        Command::Event {
            action:
                EventAction::Add {
                    email,
                    name,
                    properties,
                },
        } => {
            let properties: BTreeMap<String, String> = properties.into_iter().collect();
            let properties = (!properties.is_empty()).then_some(properties);
            match audience.add_contact_event(&email, &name, properties).await {
                Some(id) => Some(id),
                None => anyhow::bail!("event rejected: invalid name or property key"),
            }
        }
        Command::Status { id } => {
            let id: JobId = id.parse()?;
            let status = audience
                .status_by_id(id)
                .await
                .with_context(|| format!("looking up job {id}"))?;
            println!("{id}  {status}");
            None
        }
        Command::Jobs { name } => {
            cmd_jobs(&sdk, &name).await?;
            None
        }
    };

    if let Some(id) = submitted {
        println!("Queued: {id}");
        if !cli.no_wait {
            wait_for(&sdk, id).await;
        }
    }

    sdk.shutdown().await;
    Ok(())
}

async fn wait_for(sdk: &Sdk, id: JobId) {
    let mut statuses = sdk.audience().status_by_id_stream(id);
    while let Some(status) = statuses.next().await {
        println!("{id}  {status}");
        if matches!(status, WorkStatus::Finished | WorkStatus::Failed) {
            break;
        }
    }
}

async fn cmd_jobs(sdk: &Sdk, name: &str) -> anyhow::Result<()> {
    let jobs = sdk.runner().jobs_by_name(name).await?;
    if jobs.is_empty() {
        println!("No jobs under {name}.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<20}  {:<10}  {:<8}  UPDATED",
        "ID", "WORKER", "STATE", "ATTEMPTS"
    );
    println!("{}", "-".repeat(100));
    for job in &jobs {
        println!(
            "{:<36}  {:<20}  {:<10}  {:<8}  {}",
            job.id,
            job.worker,
            job.state,
            job.run_attempt_count,
            job.updated_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    println!("\n{} job(s)", jobs.len());
    Ok(())
}
