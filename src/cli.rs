//! Command-line interface for StudyBuddy

use clap::{Parser, Subcommand};

/// AI study assistant backend
#[derive(Parser)]
#[command(name = "studybuddy")]
#[command(version)]
#[command(about = "AI study assistant backend: tutor chat, quizzes, flashcards and study plans")]
#[command(
    long_about = "StudyBuddy forwards study requests to an OpenAI-compatible provider and \
    repairs the model output into validated quizzes, flashcards, explanations, schedules \
    and study plans."
)]
pub struct Cli {
    /// Path to configuration file (optional; defaults and environment are used if missing)
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Commented template configuration
pub fn generate_config_template() -> &'static str {
    r#"# StudyBuddy Configuration
# ========================
#
# Every section is optional. Environment variables override the file:
#   OPENROUTER_API_KEY, AI_MODEL, CORS_ORIGINS, PORT, STUDYBUDDY_CALL_PATH
# A .env file in the working directory is loaded at startup.

# ─────────────────────────────────────────────────────────────────────────────
# SERVER
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "0.0.0.0"
port = 8000

# ─────────────────────────────────────────────────────────────────────────────
# PROVIDER
# ─────────────────────────────────────────────────────────────────────────────
#
# Any OpenAI-compatible chat-completions endpoint. The API key is read from
# OPENROUTER_API_KEY and is never written back out.

[provider]
base_url = "https://openrouter.ai/api/v1"
model = "tngtech/deepseek-r1t2-chimera:free"

# How completions are requested:
#   - "direct": plain HTTP POST to {base_url}/chat/completions
#   - "agent": streaming query through open-agent-sdk
call_path = "direct"

# Per-attempt timeout in seconds (1-300)
timeout_seconds = 60

# ─────────────────────────────────────────────────────────────────────────────
# RETRY
# ─────────────────────────────────────────────────────────────────────────────
#
# Transient provider failures (timeouts, 429, 5xx) are retried with
# exponential backoff: base_delay_ms, then double that, and so on.

[retry]
max_attempts = 3
base_delay_ms = 500

# ─────────────────────────────────────────────────────────────────────────────
# CORS
# ─────────────────────────────────────────────────────────────────────────────

[cors]
# Browser origins allowed to call the API; ["*"] allows any origin
allowed_origins = ["http://localhost:5173"]

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error" (RUST_LOG takes precedence)
log_level = "info"

# "pretty" for humans, "json" for log shippers
log_format = "pretty"

# Prometheus metrics are always available at /metrics on the server port
"#
}
