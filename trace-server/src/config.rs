//! Command-line arguments and environment configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use trace_adapters::embeddings::DEFAULT_EMBEDDING_MODEL;
use trace_adapters::openai::DEFAULT_CHAT_MODEL;
use trace_telemetry::LogFormat;

/// Context Graph: AI decisions traced through organisational memory.
#[derive(Parser, Debug, Clone)]
#[command(name = "context-graph", version)]
#[command(about = "Decision service backed by a policy and precedent graph")]
pub struct Cli {
    /// Shared settings.
    #[command(flatten)]
    pub settings: Settings,

    /// Operation to run; defaults to `serve`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Operator subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the REST API.
    Serve,
    /// Load the knowledge base (policies, categories, tiers, workflows).
    Seed {
        /// JSON document to load instead of the bundled sample organisation.
        #[arg(long)]
        file: Option<PathBuf>,
        /// Target database.
        #[arg(long)]
        database: Option<String>,
    },
    /// Decide a single request and print the outcome as JSON.
    Decide {
        /// The customer request.
        request: String,
        /// Evidence notes; repeat for several.
        #[arg(long = "evidence")]
        evidence: Vec<String>,
        /// Actor recorded as making the decision.
        #[arg(long)]
        actor: Option<String>,
        /// Target database.
        #[arg(long)]
        database: Option<String>,
    },
    /// Print a decision with its actors, evidence, policies and approvals.
    Trace {
        /// Decision identifier.
        id: String,
        /// Target database.
        #[arg(long)]
        database: Option<String>,
    },
    /// Embed existing decisions so they can serve as precedents.
    Embed {
        /// Decision identifiers.
        #[arg(required = true)]
        ids: Vec<String>,
        /// Target database.
        #[arg(long)]
        database: Option<String>,
    },
}

impl Command {
    /// Whether the command calls the chat or embedding provider.
    #[must_use]
    pub const fn needs_model(&self) -> bool {
        !matches!(self, Self::Seed { .. })
    }
}

/// Graph backend selection.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// Neo4j over Bolt.
    Neo4j,
    /// In-process store; data is lost on exit.
    Memory,
}

/// Settings shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Address to listen on; overrides `--port`
    #[arg(long, env = "LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Port to listen on (all interfaces)
    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Graph backend
    #[arg(long, env = "STORE", value_enum, default_value_t = StoreKind::Neo4j)]
    pub store: StoreKind,

    /// Neo4j Bolt URI
    #[arg(long, env = "NEO4J_URI", default_value = "neo4j://localhost:7687")]
    pub neo4j_uri: String,

    /// Neo4j user
    #[arg(long, env = "NEO4J_USERNAME", default_value = "neo4j")]
    pub neo4j_username: String,

    /// Neo4j password
    #[arg(long, env = "NEO4J_PASSWORD", hide_env_values = true)]
    pub neo4j_password: Option<String>,

    /// Default Neo4j database
    #[arg(long, env = "NEO4J_DATABASE", default_value = "neo4j")]
    pub neo4j_database: String,

    /// `OpenAI` API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL")]
    pub openai_base_url: Option<String>,

    /// Chat model deciding requests
    #[arg(long, env = "LLM_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    pub llm_model: String,

    /// Embedding model for precedent search
    #[arg(long, env = "EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    pub embedding_model: String,

    /// Sampling temperature
    #[arg(long, env = "LLM_TEMPERATURE")]
    pub llm_temperature: Option<f32>,

    /// Provider request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 60)]
    pub request_timeout_secs: u64,

    /// Precedents retrieved per decision
    #[arg(long, env = "PRECEDENT_TOP_K", default_value_t = 5)]
    pub precedent_top_k: usize,

    /// Display name of the deciding agent
    #[arg(long, env = "ACTOR_NAME", default_value = "DecisionBot")]
    pub actor_name: String,

    /// Log level or filter directive (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format (pretty, json)
    #[arg(long, env = "LOG_FORMAT", default_value = "pretty")]
    pub log_format: LogFormat,
}

impl Settings {
    /// Socket address the server binds.
    #[must_use]
    pub fn listen_addr(&self) -> SocketAddr {
        self.listen
            .unwrap_or_else(|| SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.port))
    }

    /// Provider request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Checks the settings `command` depends on that clap cannot express.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid setting.
    pub fn validate(&self, command: &Command) -> Result<(), String> {
        if self.store == StoreKind::Neo4j
            && self
                .neo4j_password
                .as_deref()
                .is_none_or(|password| password.trim().is_empty())
        {
            return Err("NEO4J_PASSWORD is required when STORE=neo4j".into());
        }
        if command.needs_model()
            && self
                .openai_api_key
                .as_deref()
                .is_none_or(|key| key.trim().is_empty())
        {
            return Err("OPENAI_API_KEY is required".into());
        }
        if self.request_timeout_secs == 0 {
            return Err("REQUEST_TIMEOUT_SECS must be positive".into());
        }
        if self
            .llm_temperature
            .is_some_and(|temperature| !(0.0..=2.0).contains(&temperature))
        {
            return Err("LLM_TEMPERATURE must be between 0 and 2".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("context-graph").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_to_serving_on_port_8000() {
        let cli = parse(&["--openai-api-key", "k", "--store", "memory"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.settings.listen_addr().port(), 8000);
        assert_eq!(cli.settings.precedent_top_k, 5);
        assert_eq!(cli.settings.llm_model, "gpt-4.1-nano");
        assert_eq!(cli.settings.log_format, LogFormat::Pretty);
        cli.settings.validate(&Command::Serve).unwrap();
    }

    #[test]
    fn listen_overrides_port() {
        let cli = parse(&["--listen", "127.0.0.1:9000", "--port", "1234"]);
        assert_eq!(cli.settings.listen_addr(), "127.0.0.1:9000".parse().unwrap());
    }

    #[test]
    fn parses_subcommands() {
        let cli = parse(&["decide", "refund please", "--evidence", "a", "--evidence", "b"]);
        assert_eq!(
            cli.command,
            Some(Command::Decide {
                request: "refund please".into(),
                evidence: vec!["a".into(), "b".into()],
                actor: None,
                database: None,
            })
        );
        assert!(Cli::try_parse_from(["context-graph", "embed"]).is_err());
    }

    #[test]
    fn validation_requires_credentials() {
        let cli = parse(&["--store", "neo4j", "--openai-api-key", "k"]);
        assert!(cli.settings.validate(&Command::Serve).unwrap_err().contains("NEO4J_PASSWORD"));

        let cli = parse(&["--store", "memory", "--openai-api-key", "k", "--llm-temperature", "3"]);
        assert!(cli.settings.validate(&Command::Serve).is_err());
    }

    #[test]
    fn seeding_needs_no_model_key() {
        let cli = parse(&[
            "--store",
            "neo4j",
            "--neo4j-password",
            "secret",
            "--openai-api-key",
            " ",
            "seed",
        ]);
        let command = cli.command.clone().unwrap();
        assert!(!command.needs_model());
        cli.settings.validate(&command).unwrap();

        assert!(
            cli.settings
                .validate(&Command::Serve)
                .unwrap_err()
                .contains("OPENAI_API_KEY")
        );
        let decide = Command::Decide {
            request: "refund please".into(),
            evidence: Vec::new(),
            actor: None,
            database: None,
        };
        assert!(cli.settings.validate(&decide).is_err());
    }
}
