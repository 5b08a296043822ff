//! CLI module
//!
//! This module provides the command-line interface for the garden.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::{ColoredString, Colorize};

use crate::{
    api::{serve, ClientConfig, GardenClient, HttpClient, LocalClient, ServerConfig},
    config::{self, Settings},
    models::{Category, GrowthStage, ThoughtCard, ThoughtFilter},
    storage::{MemoryStore, ThoughtStore},
    Garden, GardenError,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (defaults to config.toml in the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use a running garden server instead of the local garden
    #[arg(short, long, global = true)]
    server: Option<String>,

    /// Keep thoughts in memory only; nothing is written to storage
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

impl Cli {
    pub fn verbose(&self) -> bool {
        self.verbose
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the garden API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 3000)]
        port: u16,

        /// Address to bind; use 0.0.0.0 to reach the garden from other devices
        #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
        host: IpAddr,

        /// Plant the sample thoughts before serving
        #[arg(long)]
        example: bool,
    },

    /// Plant a new thought
    Plant {
        /// What is on your mind
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Water a thought with a follow-up note
    Water {
        /// Thought id
        id: String,

        /// The update
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// List thoughts, newest first
    List {
        /// Only this category
        #[arg(short, long)]
        category: Option<Category>,

        /// Only this growth stage
        #[arg(long)]
        stage: Option<GrowthStage>,
    },

    /// Show a thought with its update history
    Show {
        /// Thought id
        id: String,
    },

    /// Remove a thought
    Delete {
        /// Thought id
        id: String,
    },

    /// Move a thought (coordinates are percentages, clamped to 0-100)
    #[command(allow_negative_numbers = true)]
    Move { id: String, x: f32, y: f32 },

    /// Paint a thought again at its current stage
    Repaint {
        /// Thought id
        id: String,
    },

    /// Inspect or change the settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective settings, secrets masked
    Show,

    /// Print the settings file location
    Path,

    /// Save Supabase credentials, or remove them with --clear
    Storage {
        /// Project URL, e.g. https://xyz.supabase.co
        #[arg(required_unless_present = "clear")]
        url: Option<String>,

        /// Anon key
        #[arg(required_unless_present = "clear")]
        key: Option<String>,

        /// Forget the stored credentials
        #[arg(long, conflicts_with_all = ["url", "key"])]
        clear: bool,
    },
}

/// Run the CLI application
pub async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);

    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, bin_name, &mut io::stdout());
            Ok(())
        }

        Commands::Config { command } => run_config(command, &config_path),

        Commands::Serve {
            port,
            host,
            example,
        } => {
            let settings = Settings::load(Some(&config_path))?;
            let garden = build_garden(&settings, cli.ephemeral)?;
            println!(
                "Starting garden on {}:{} ({} storage)...",
                host,
                port,
                garden.store_name()
            );

            if *example {
                println!("Planting the sample thoughts...");
                garden.seed_examples().await?;
            }

            let config = ServerConfig {
                address: SocketAddr::new(*host, *port),
            };
            serve(garden, config).await
        }

        command => {
            let client = create_client(&cli, &config_path)?;
            run_client_command(command, client.as_ref()).await
        }
    }
}

async fn run_client_command(
    command: &Commands,
    client: &dyn GardenClient,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Plant { text } => {
            let thought = client.plant(text.join(" ")).await?;
            println!("{} {}", "Planted".green().bold(), thought.id().dimmed());
            print_thought(&thought);
        }

        Commands::Water { id, text } => {
            let thought = client.water(id, text.join(" ")).await?;
            if let Some(update) = thought.updates().first() {
                println!("{}", update.ai_response.italic());
                if update.previous_stage == update.new_stage {
                    println!("Still a {}", stage_label(update.new_stage));
                } else {
                    println!(
                        "{} -> {}",
                        stage_label(update.previous_stage),
                        stage_label(update.new_stage)
                    );
                }
            }
            print_next_step(&thought);
        }

        Commands::List { category, stage } => {
            let filter = ThoughtFilter {
                category: *category,
                stage: *stage,
            };
            let thoughts = client.list(filter).await?;
            if thoughts.is_empty() {
                println!("  Nothing planted yet. Try 'mindgarden plant <text>'");
            }
            for thought in &thoughts {
                print_summary(thought);
            }
        }

        Commands::Show { id } => {
            let thought = client.get(id).await?;
            print_thought(&thought);
            print_updates(&thought);
        }

        Commands::Delete { id } => {
            client.delete(id).await?;
            println!("Removed {}", id);
        }

        Commands::Move { id, x, y } => {
            let thought = client.relocate(id, *x, *y).await?;
            let position = thought.position();
            println!("Moved {} to ({:.0}, {:.0})", id, position.x, position.y);
        }

        Commands::Repaint { id } => {
            let thought = client.repaint(id).await?;
            println!("Repainted {}", thought.id());
            println!("  image: {}", truncate(thought.image_url(), 72));
        }

        Commands::Serve { .. } | Commands::Config { .. } | Commands::Completions { .. } => {}
    }
    Ok(())
}

fn run_config(
    command: &ConfigCommands,
    config_path: &std::path::Path,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        ConfigCommands::Path => println!("{}", config_path.display()),

        ConfigCommands::Show => {
            let mut settings = Settings::load(Some(config_path))?;
            settings.gemini.api_key = settings.gemini.api_key.as_deref().map(mask);
            settings.storage.supabase_key = settings.storage.supabase_key.as_deref().map(mask);
            println!("# {}", config_path.display());
            print!("{}", toml::to_string_pretty(&settings)?);
        }

        ConfigCommands::Storage { url, key, clear } => {
            let (url, key) = if *clear {
                ("", "")
            } else {
                (
                    url.as_deref().unwrap_or_default(),
                    key.as_deref().unwrap_or_default(),
                )
            };
            if config::set_storage_remote(config_path, url, key)? {
                println!("{} Supabase storage saved", "✓".green());
            } else {
                println!("Supabase storage cleared, using the local garden file");
            }
        }
    }
    Ok(())
}

fn build_garden(settings: &Settings, ephemeral: bool) -> Result<Garden, GardenError> {
    let store: Arc<dyn ThoughtStore> = if ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        settings.build_store()?
    };
    Ok(Garden::new(settings.build_ai_client(), store).with_policy(settings.garden.transition_policy))
}

fn create_client(
    cli: &Cli,
    config_path: &std::path::Path,
) -> Result<Box<dyn GardenClient>, GardenError> {
    if let Some(server_url) = &cli.server {
        let config = ClientConfig {
            base_url: server_url.to_string(),
        };
        return Ok(Box::new(HttpClient::with_config(config)));
    }

    let settings = Settings::load(Some(config_path))?;
    Ok(Box::new(LocalClient::new(build_garden(&settings, cli.ephemeral)?)))
}

fn mask(secret: &str) -> String {
    let shown: String = secret.chars().take(4).collect();
    format!("{}…", shown)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max).collect();
        format!("{}…", head)
    }
}

fn stage_label(stage: GrowthStage) -> ColoredString {
    let label = stage.as_str();
    match stage {
        GrowthStage::Seed => label.yellow(),
        GrowthStage::Sprout => label.green(),
        GrowthStage::Bloom => label.magenta(),
        GrowthStage::Fruit => label.red(),
    }
}

fn print_summary(thought: &ThoughtCard) {
    let marker = if thought.has_viewed() { " " } else { "*" };
    println!(
        "{} {}  {:<8} {:<8} {}",
        marker,
        thought.id().dimmed(),
        stage_label(thought.growth_stage()),
        thought.category().to_string().cyan(),
        thought.meta().topic
    );
}

fn print_thought(thought: &ThoughtCard) {
    let meta = thought.meta();
    println!();
    println!("  {}", meta.topic.bold());
    println!("  \"{}\"", thought.original_text());
    println!("  {}", thought.reflection().italic());
    println!(
        "  {} {} · {} · {} ({})",
        meta.plant_species.green(),
        stage_label(thought.growth_stage()),
        thought.category().to_string().cyan(),
        meta.emotion,
        meta.intensity
    );
    println!("  image: {}", truncate(thought.image_url(), 72).dimmed());
    if let Some(music) = thought.music() {
        println!("  ♪ {} - {}", music.name, music.artist);
    }
    print_next_step(thought);
}

fn print_next_step(thought: &ThoughtCard) {
    if let Some(step) = &thought.meta().next_step {
        println!("  next ({}): {}", step.kind, step.text);
    }
}

fn print_updates(thought: &ThoughtCard) {
    if thought.updates().is_empty() {
        return;
    }
    println!("\n  Updates:");
    for update in thought.updates() {
        println!(
            "  {} [{} -> {}] {}",
            update.timestamp.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            stage_label(update.previous_stage),
            stage_label(update.new_stage),
            update.text
        );
        println!("      {}", update.ai_response.italic());
    }
}
