pub mod catalog;
pub mod config;
pub mod publish;
pub mod seed;
pub mod tick;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};

use sy_domain::actor::{Actor, Role};
use sy_domain::model::{AssetVariant, ContentType};

/// Syllabus: publication lifecycle for programs, terms and lessons.
#[derive(Debug, Parser)]
#[command(name = "syllabus", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the scheduling engine until interrupted (default when no
    /// subcommand is given).
    Serve,
    /// Run exactly one scheduling pass and print its report.
    Tick {
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Publish a program or lesson through the asset-gated manual path.
    #[command(subcommand)]
    Publish(PublishCommand),
    /// Create programs.
    #[command(subcommand)]
    Program(ProgramCommand),
    /// Create terms.
    #[command(subcommand)]
    Term(TermCommand),
    /// Create lessons.
    #[command(subcommand)]
    Lesson(LessonCommand),
    /// Attach posters and thumbnails.
    #[command(subcommand)]
    Asset(AssetCommand),
    /// Replace the catalog with the demo data.
    Seed,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

/// Identity recorded on trace events for a write.
#[derive(Debug, Clone, Args)]
pub struct ActorArgs {
    /// Name recorded as the acting user.
    #[arg(long, default_value = "cli")]
    pub actor: String,
    /// Role recorded with the actor (admin, editor, viewer, system).
    #[arg(long, default_value = "editor")]
    pub role: Role,
}

impl ActorArgs {
    pub fn to_actor(&self) -> Actor {
        Actor::new(self.actor.clone(), self.role)
    }
}

#[derive(Debug, Subcommand)]
pub enum PublishCommand {
    /// Publish a program.
    Program {
        /// Program id (UUID).
        id: String,
        #[command(flatten)]
        who: ActorArgs,
    },
    /// Publish a lesson.
    Lesson {
        /// Lesson id (UUID).
        id: String,
        #[command(flatten)]
        who: ActorArgs,
    },
}

#[derive(Debug, Subcommand)]
pub enum ProgramCommand {
    /// Create a draft program.
    Create {
        #[arg(long)]
        title: String,
        /// Primary language code.
        #[arg(long, default_value = "en")]
        language: String,
        /// Additional available languages (comma separated).
        #[arg(long, value_delimiter = ',')]
        languages: Vec<String>,
        #[arg(long)]
        description: Option<String>,
        #[command(flatten)]
        who: ActorArgs,
    },
}

#[derive(Debug, Subcommand)]
pub enum TermCommand {
    /// Add a term to a program.
    Create {
        /// Program id (UUID).
        program_id: String,
        /// Term number, unique within the program.
        #[arg(long)]
        number: u32,
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        who: ActorArgs,
    },
}

#[derive(Debug, Subcommand)]
pub enum LessonCommand {
    /// Add a lesson to a term. With `--publish-at` the lesson is created
    /// scheduled, otherwise draft.
    Create {
        /// Term id (UUID).
        term_id: String,
        /// Lesson number, unique within the term.
        #[arg(long)]
        number: u32,
        #[arg(long)]
        title: String,
        /// Primary content language code.
        #[arg(long, default_value = "en")]
        language: String,
        /// Additional available content languages (comma separated).
        #[arg(long, value_delimiter = ',')]
        languages: Vec<String>,
        /// video or article.
        #[arg(long, default_value = "video")]
        content_type: ContentType,
        #[arg(long)]
        duration_ms: Option<u64>,
        #[arg(long)]
        paid: bool,
        /// Content URL per language, as `lang=url`. Repeatable.
        #[arg(long = "url", value_parser = parse_language_url)]
        urls: Vec<(String, String)>,
        /// RFC 3339 instant at which the scheduling engine publishes it.
        #[arg(long)]
        publish_at: Option<DateTime<Utc>>,
        #[command(flatten)]
        who: ActorArgs,
    },
}

#[derive(Debug, Subcommand)]
pub enum AssetCommand {
    /// Attach a media asset to a program (poster) or lesson (thumbnail).
    Add {
        #[command(subcommand)]
        owner: AssetOwnerArg,
    },
}

#[derive(Debug, Subcommand)]
pub enum AssetOwnerArg {
    /// Attach a poster to a program.
    Program {
        /// Program id (UUID).
        id: String,
        #[command(flatten)]
        asset: AssetArgs,
    },
    /// Attach a thumbnail to a lesson.
    Lesson {
        /// Lesson id (UUID).
        id: String,
        #[command(flatten)]
        asset: AssetArgs,
    },
}

#[derive(Debug, Clone, Args)]
pub struct AssetArgs {
    /// portrait, landscape, square or banner.
    #[arg(long)]
    pub variant: AssetVariant,
    #[arg(long, default_value = "en")]
    pub language: String,
    #[arg(long)]
    pub url: String,
    #[command(flatten)]
    pub who: ActorArgs,
}

fn parse_language_url(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((lang, url)) if !lang.trim().is_empty() && !url.trim().is_empty() => {
            Ok((lang.trim().to_string(), url.trim().to_string()))
        }
        _ => Err(format!("expected lang=url, got '{value}'")),
    }
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `SY_CONFIG` (or
/// `config.toml` by default). Returns the parsed [`Config`] and the path
/// that was used. A missing file yields the defaults.
///
/// [`Config`]: sy_domain::config::Config
pub fn load_config() -> anyhow::Result<(sy_domain::config::Config, String)> {
    let config_path = std::env::var("SY_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let config = load_config_from(&config_path)?;
    Ok((config, config_path))
}

pub fn load_config_from(config_path: &str) -> anyhow::Result<sy_domain::config::Config> {
    if !std::path::Path::new(config_path).exists() {
        return Ok(sy_domain::config::Config::default());
    }
    let raw = std::fs::read_to_string(config_path)
        .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))
}
