//! Memeverse CLI
//!
//! Command-line front end for the meme store and catalog:
//! - Browse and search templates
//! - Like, comment and upload
//! - Manage the local profile and theme

use anyhow::Context;
use clap::{Parser, Subcommand};
use memeverse::config::generate_default_config;
use memeverse::remote::sort_memes;
use memeverse::{
    upload_from_file, AppState, Config, ImgflipClient, LoggingConfig, MemeCatalog, MemeId,
    MemeStore, SortOrder, UploadedMemePatch, UserProfile,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

#[derive(Parser)]
#[command(name = "memeverse")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Browse, like and comment on memes")]
#[command(long_about = "Memeverse keeps your likes, comments, profile and uploaded memes on this machine,\nand browses the Imgflip template catalog.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List catalog templates
    Trending {
        /// Sort by likes or title
        #[arg(short, long, default_value = "likes")]
        sort: String,
        /// Maximum number of memes to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Search templates by title
    Search {
        query: String,
    },

    /// Show one meme with its comments
    Show {
        id: String,
    },

    /// Like or unlike a meme
    Like {
        id: String,
    },

    /// List liked meme ids
    Liked,

    /// Manage comments
    Comment {
        #[command(subcommand)]
        action: CommentAction,
    },

    /// Show or edit the local profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Show or toggle dark mode
    Theme {
        #[command(subcommand)]
        action: ThemeAction,
    },

    /// Upload an image as a new meme
    Upload {
        /// Path to a png, jpg, gif or webp file
        path: PathBuf,
        /// Caption for the meme
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Manage uploaded memes
    Uploads {
        #[command(subcommand)]
        action: UploadsAction,
    },

    /// Generate a captioned meme from a template
    Caption {
        template_id: String,
        /// One text per caption box
        texts: Vec<String>,
    },

    /// Show the most liked memes or top creators
    Leaderboard {
        /// Show creators instead of memes
        #[arg(long)]
        users: bool,
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Erase all local data
    Clear {
        /// Skip the safety check
        #[arg(long)]
        yes: bool,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum CommentAction {
    /// Add a comment to a meme
    Add { id: String, text: String },
    /// List a meme's comments
    List { id: String },
    /// Delete a comment by its id
    Delete { id: String, comment_id: i64 },
}

#[derive(Subcommand)]
pub enum ProfileAction {
    Show,
    /// Replace the profile; omitted fields keep their current value
    Set {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        bio: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ThemeAction {
    Show,
    Toggle,
}

#[derive(Subcommand)]
pub enum UploadsAction {
    List,
    Delete { id: String },
    Rename { id: String, name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config.logging)?;
    let json = cli.format == "json";

    match cli.command {
        Commands::Trending { sort, limit } => {
            let (store, catalog) = (open_store(&config)?, open_catalog(&config)?);
            let order: SortOrder = sort.parse().map_err(anyhow::Error::msg)?;
            let mut memes = catalog.trending().await;
            sort_memes(&mut memes, order);
            memes.truncate(limit);
            emit(json, &memes, || render::print_memes(&memes, &store))?;
        }

        Commands::Search { query } => {
            let (store, catalog) = (open_store(&config)?, open_catalog(&config)?);
            let memes = catalog.search(&query).await;
            emit(json, &memes, || {
                if memes.is_empty() {
                    println!("No memes match \"{}\"", query);
                }
                render::print_memes(&memes, &store)
            })?;
        }

        Commands::Show { id } => {
            let (store, catalog) = (open_store(&config)?, open_catalog(&config)?);
            let meme_id = MemeId::from(id.as_str());
            let comments = store.get_comments(&meme_id);
            let liked = store.is_meme_liked(&meme_id);

            match catalog.get_by_id(&id).await {
                Some(meme) => {
                    let detail = serde_json::json!({
                        "meme": meme,
                        "liked": liked,
                        "comments": comments,
                    });
                    emit(json, &detail, || {
                        println!("{} [{}]", meme.title, meme.id);
                        println!("  {}", meme.url);
                        println!(
                            "  {}x{}, {} caption boxes, {} likes{}",
                            meme.width,
                            meme.height,
                            meme.box_count,
                            meme.likes,
                            if liked { " (liked)" } else { "" }
                        );
                        render::print_comments(&comments);
                    })?;
                }
                None => {
                    eprintln!("Meme not found: {}", id);
                    std::process::exit(1);
                }
            }
        }

        Commands::Like { id } => {
            let store = open_store(&config)?;
            let meme_id = MemeId::from(id.as_str());
            let liked = store
                .try_toggle_meme_like(&meme_id)
                .context("saving like")?;
            println!("{} {}", if liked { "Liked" } else { "Unliked" }, meme_id);
        }

        Commands::Liked => {
            let store = open_store(&config)?;
            let liked = store.get_liked_memes();
            emit(json, &liked, || {
                if liked.is_empty() {
                    println!("No liked memes yet");
                }
                for id in &liked {
                    println!("{}", id);
                }
            })?;
        }

        Commands::Comment { action } => {
            let store = open_store(&config)?;
            match action {
                CommentAction::Add { id, text } => {
                    let meme_id = MemeId::from(id.as_str());
                    let comment = store
                        .try_add_comment(&meme_id, &text)
                        .context("saving comment")?;
                    emit(json, &comment, || {
                        println!("Comment {} added to {}", comment.id, meme_id)
                    })?;
                }
                CommentAction::List { id } => {
                    let comments = store.get_comments(&MemeId::from(id.as_str()));
                    emit(json, &comments, || render::print_comments(&comments))?;
                }
                CommentAction::Delete { id, comment_id } => {
                    if store.delete_comment(&MemeId::from(id.as_str()), comment_id) {
                        println!("Deleted comment {}", comment_id);
                    } else {
                        eprintln!("No comment {} on {}", comment_id, id);
                        std::process::exit(1);
                    }
                }
            }
        }

        Commands::Profile { action } => {
            let store = open_store(&config)?;
            match action {
                ProfileAction::Show => {
                    let profile = store.get_user_profile();
                    emit(json, &profile, || {
                        println!(
                            "{}",
                            if profile.name.is_empty() {
                                "Anonymous User"
                            } else {
                                profile.name.as_str()
                            }
                        );
                        println!(
                            "{}",
                            if profile.bio.is_empty() {
                                "No bio yet"
                            } else {
                                profile.bio.as_str()
                            }
                        );
                    })?;
                }
                ProfileAction::Set { name, bio } => {
                    let current = store.get_user_profile();
                    let profile = UserProfile {
                        name: name.unwrap_or(current.name),
                        bio: bio.unwrap_or(current.bio),
                        extra: current.extra,
                    };
                    store
                        .try_update_user_profile(&profile)
                        .context("saving profile")?;
                    println!("Profile updated");
                }
            }
        }

        Commands::Theme { action } => {
            let state = AppState::new(open_store(&config)?);
            let dark_mode = match action {
                ThemeAction::Show => state.dark_mode(),
                ThemeAction::Toggle => state.toggle_theme(),
            };
            println!("Dark mode: {}", if dark_mode { "on" } else { "off" });
        }

        Commands::Upload { path, name } => {
            let upload = upload_from_file(&path, name.as_deref())?;
            let store = open_store(&config)?;
            let meme = store
                .try_add_uploaded_meme(upload)
                .context("saving upload")?;
            emit(json, &meme, || {
                println!("Uploaded \"{}\" as {}", meme.name, meme.id)
            })?;
        }

        Commands::Uploads { action } => {
            let store = open_store(&config)?;
            match action {
                UploadsAction::List => {
                    let uploads = store.get_uploaded_memes();
                    emit(json, &uploads, || {
                        if uploads.is_empty() {
                            println!("No uploaded memes yet");
                        }
                        for meme in &uploads {
                            println!(
                                "{:<22} {:<30} {}",
                                meme.id,
                                render::truncate(&meme.name, 30),
                                meme.uploaded_at
                            );
                        }
                    })?;
                }
                UploadsAction::Delete { id } => {
                    if store.try_delete_uploaded_meme(&id).context("deleting upload")? {
                        println!("Deleted {}", id);
                    } else {
                        println!("No upload with id {}", id);
                    }
                }
                UploadsAction::Rename { id, name } => {
                    match store.update_uploaded_meme(&id, UploadedMemePatch::default().name(name)) {
                        Some(meme) => println!("Renamed {} to \"{}\"", meme.id, meme.name),
                        None => {
                            eprintln!("No upload with id {}", id);
                            std::process::exit(1);
                        }
                    }
                }
            }
        }

        Commands::Caption { template_id, texts } => {
            match open_catalog(&config)?.create_custom_meme(&template_id, &texts).await {
                Some(url) => println!("{}", url),
                None => {
                    eprintln!("Failed to create meme (check [remote] username and password)");
                    std::process::exit(1);
                }
            }
        }

        Commands::Leaderboard { users, limit } => {
            let catalog = open_catalog(&config)?;
            if users {
                let mut users = catalog.top_users();
                users.truncate(limit);
                emit(json, &users, || {
                    for (rank, user) in users.iter().enumerate() {
                        println!(
                            "{:>3}. {:<15} {:>7} likes  {:>3} memes",
                            rank + 1,
                            user.username,
                            user.total_likes,
                            user.meme_count
                        );
                    }
                })?;
            } else {
                let store = open_store(&config)?;
                let memes = catalog.top_memes(limit).await;
                emit(json, &memes, || render::print_memes(&memes, &store))?;
            }
        }

        Commands::Clear { yes } => {
            if !yes {
                eprintln!("This erases likes, comments, profile, theme and uploads. Re-run with --yes.");
                std::process::exit(1);
            }
            open_store(&config)?
                .try_clear_all()
                .context("clearing local data")?;
            println!("All local data cleared");
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Config written to {}", path.display());
                }
                None => print!("{}", content),
            }
        }
    }

    Ok(())
}

/// Open the configured store for one command
fn open_store(config: &Config) -> anyhow::Result<Arc<MemeStore>> {
    let store = config
        .storage
        .open_store()
        .context("opening local store")?;
    tracing::info!(
        data_dir = %config.storage.data_dir,
        backend = ?config.storage.backend,
        "Store opened"
    );
    Ok(Arc::new(store))
}

fn open_catalog(config: &Config) -> anyhow::Result<MemeCatalog> {
    let client = ImgflipClient::new(config.remote.client_config())?;
    Ok(MemeCatalog::new(Arc::new(client)))
}

/// Print `value` as JSON, or run the table printer
fn emit<T: Serialize>(json: bool, value: &T, table: impl FnOnce()) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        table();
    }
    Ok(())
}

/// Install the tracing subscriber described by `config`
///
/// `RUST_LOG` wins over the configured level. Logs go to stderr unless a
/// file is configured, so command output on stdout stays parseable.
fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("memeverse={}", config.level)));

    let writer = match &config.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path))?;
            BoxMakeWriter::new(Arc::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = if config.format == "json" {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(writer)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_writer(writer).boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .init();
    Ok(())
}

/// Table rendering for memes and comments
mod render {
    use memeverse::{Comment, Meme, MemeId, MemeStore};

    pub fn print_memes(memes: &[Meme], store: &MemeStore) {
        let liked = store.get_liked_memes();
        for meme in memes {
            let mark = if liked.contains(&MemeId::from(meme.id.as_str())) {
                "♥"
            } else {
                " "
            };
            println!(
                "{} {:<12} {:<40} {:>6} likes",
                mark,
                meme.id,
                truncate(&meme.title, 40),
                meme.likes
            );
        }
    }

    pub fn print_comments(comments: &[Comment]) {
        if comments.is_empty() {
            println!("  No comments yet");
        }
        for comment in comments {
            let when = comment
                .created_at()
                .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| comment.timestamp.clone());
            println!("  [{}] {}  {}", comment.id, when, comment.text);
        }
    }

    pub fn truncate(s: &str, max: usize) -> String {
        if s.chars().count() <= max {
            s.to_string()
        } else {
            let cut: String = s.chars().take(max.saturating_sub(1)).collect();
            format!("{}…", cut)
        }
    }
}
