//! Barcode Studio command-line front end.
//!
//! Initializes:
//! - Settings ([`SettingsManager`]: `studio.yaml` + `BARCODE_STUDIO__*` overrides)
//! - Logging (daily rotating file, optional stderr mirror)
//! - A tokio runtime for renderer subprocesses and template store I/O
//! - A [`Session`] wired to the configured renderer and the JSON template store
//!
//! Sessions opened here always run in manual generation mode; `render`
//! triggers exactly one generation.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use barcode_studio::logging::{self, LogOptions};
use barcode_studio::services::{
    AlwaysConfirm, CommandRenderer, Confirm, DeleteOutcome, GenerationOutcome,
    JsonFileTemplateStore, Renderer, StaticLayout, UnconfiguredRenderer,
};
use barcode_studio::{
    APP_NAME, Collaborators, RuleTable, Session, SettingsManager, StudioSettings, VERSION,
};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "barcode-studio", version)]
#[command(about = "Barcode configuration, validation and template management")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding studio.yaml
    #[arg(short, long, default_value = ".")]
    settings_dir: Utf8PathBuf,

    /// Log at debug level
    #[arg(short, long)]
    debug: bool,

    /// Mirror log output to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default studio.yaml if none exists
    Init,

    /// Show payload rules, for one symbology or all of them
    Rules { symbology: Option<String> },

    /// Check a payload against a symbology's rules
    Validate { symbology: String, payload: String },

    /// Manage stored templates
    Templates {
        #[command(subcommand)]
        action: TemplateAction,
    },

    /// Render a configuration to a PNG file
    Render {
        /// Start from a stored template
        #[arg(short, long)]
        template: Option<String>,

        #[arg(short, long)]
        symbology: Option<String>,

        #[arg(short, long)]
        payload: Option<String>,

        /// Output PNG path
        #[arg(short, long)]
        out: Utf8PathBuf,
    },
}

#[derive(Subcommand)]
enum TemplateAction {
    /// List templates, optionally for one symbology
    List {
        #[arg(short, long)]
        symbology: Option<String>,

        /// Print the full templates as JSON
        #[arg(long)]
        json: bool,
    },

    /// Save a configuration as a new template
    Save {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long)]
        symbology: Option<String>,

        #[arg(short, long)]
        payload: Option<String>,
    },

    /// Delete a template by id
    Delete {
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

struct StdinConfirm;

#[async_trait]
impl Confirm for StdinConfirm {
    async fn confirm(&self, prompt: &str) -> bool {
        eprint!("{prompt} [y/N] ");
        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        match reader.read_line(&mut line).await {
            Ok(_) => matches!(line.trim(), "y" | "Y" | "yes"),
            Err(_) => false,
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let settings_manager = SettingsManager::new(&cli.settings_dir)?;
    let settings = settings_manager.load()?;

    let _guard = logging::setup_logging(&LogOptions {
        debug_mode: settings.debug_mode || cli.debug,
        console: cli.verbose,
        ..LogOptions::new(&settings.log_dir, APP_NAME)
    })?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("barcode-studio-worker")
        .build()?;

    let result = runtime.block_on(run(cli.command, &settings_manager, settings));

    runtime.shutdown_timeout(Duration::from_secs(5));
    tracing::info!("Shutdown complete");

    result
}

async fn run(
    command: Commands,
    settings_manager: &SettingsManager,
    settings: StudioSettings,
) -> Result<ExitCode> {
    match command {
        Commands::Init => {
            if settings_manager.init_default()? {
                println!("Wrote {}", settings_manager.settings_path());
            } else {
                println!("{} already exists", settings_manager.settings_path());
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Rules { symbology } => print_rules(symbology.as_deref()),

        Commands::Validate { symbology, payload } => {
            let messages = barcode_studio::validate(&payload, &symbology);
            if messages.is_empty() {
                println!("valid");
                return Ok(ExitCode::SUCCESS);
            }
            for message in &messages {
                println!("{message}");
            }
            Ok(ExitCode::from(2))
        }

        Commands::Templates { action } => {
            let session = open_session(&settings).await;
            let result = run_template_action(&session, action).await;
            session.shutdown();
            result
        }

        Commands::Render {
            template,
            symbology,
            payload,
            out,
        } => {
            let session = open_session(&settings).await;
            let result = render(&session, template, symbology, payload, &out).await;
            session.shutdown();
            result
        }
    }
}

fn print_rules(symbology: Option<&str>) -> Result<ExitCode> {
    let table = RuleTable::global();
    let rules: Vec<_> = match symbology {
        Some(name) => match table.lookup(name) {
            Some(rule) => vec![rule],
            None => bail!("Unknown symbology: {name}"),
        },
        None => table.iter().collect(),
    };

    for rule in rules {
        println!(
            "{:<16} {:>4}-{:<4} {:<11} {}",
            rule.symbology,
            rule.min_length,
            rule.max_length,
            rule.dimension_class,
            rule.alphabet_description.unwrap_or("-")
        );
    }
    Ok(ExitCode::SUCCESS)
}

async fn open_session(settings: &StudioSettings) -> Session {
    let renderer: Arc<dyn Renderer> = match CommandRenderer::from_settings(settings) {
        Ok(renderer) => Arc::new(renderer),
        Err(err) => {
            tracing::debug!("{}", err);
            Arc::new(UnconfiguredRenderer)
        }
    };

    let settings = StudioSettings {
        auto_generate: false,
        ..settings.clone()
    };
    Session::start(
        &settings,
        Collaborators {
            renderer,
            templates: Arc::new(JsonFileTemplateStore::new(settings.template_store_path.clone())),
            layout: Arc::new(StaticLayout::default()),
        },
    )
    .await
}

async fn run_template_action(session: &Session, action: TemplateAction) -> Result<ExitCode> {
    match action {
        TemplateAction::List { symbology, json } => {
            let templates = match symbology {
                Some(symbology) => session.templates().list(&symbology),
                None => session.templates().all(),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&templates)?);
            } else {
                for template in &templates {
                    println!(
                        "{}  {:<16} {}{}",
                        template.id,
                        template.symbology(),
                        template.name,
                        template
                            .description
                            .as_deref()
                            .map(|d| format!(" - {d}"))
                            .unwrap_or_default()
                    );
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        TemplateAction::Save {
            name,
            description,
            symbology,
            payload,
        } => {
            if let Some(symbology) = symbology {
                session.store().set_symbology(symbology);
            }
            if let Some(payload) = payload {
                session.store().set_payload(payload);
            }
            let template = session.save_template(&name, description.as_deref()).await?;
            println!("{}", template.id);
            Ok(ExitCode::SUCCESS)
        }

        TemplateAction::Delete { id, yes } => {
            let outcome = if yes {
                session.delete_template(&id, &AlwaysConfirm).await?
            } else {
                session.delete_template(&id, &StdinConfirm).await?
            };
            match outcome {
                DeleteOutcome::Deleted => println!("Deleted {id}"),
                DeleteOutcome::Declined => println!("Kept {id}"),
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn render(
    session: &Session,
    template: Option<String>,
    symbology: Option<String>,
    payload: Option<String>,
    out: &Utf8PathBuf,
) -> Result<ExitCode> {
    if let Some(id) = template {
        session.load_template(&id).await?;
    }
    if let Some(symbology) = symbology {
        session.store().set_symbology(symbology);
    }
    if let Some(payload) = payload {
        session.store().set_payload(payload);
    }

    let outcome = session.generate_now()?.await?;
    match outcome {
        GenerationOutcome::Displayed { .. } => {
            let preview = session
                .store()
                .preview()
                .context("Renderer finished without a preview")?;
            tokio::fs::write(out, &preview.png)
                .await
                .with_context(|| format!("Failed to write {}", out))?;
            println!("Wrote {} bytes to {}", preview.png.len(), out);
            Ok(ExitCode::SUCCESS)
        }
        GenerationOutcome::Failed { error, .. } => bail!(error),
        GenerationOutcome::Stale { .. } => bail!("Generation was superseded"),
    }
}
