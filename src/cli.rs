use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use docwal::client::credentials::DEFAULT_CLAIM_TOKEN_EXPIRES_HOURS;
use docwal::model::team::Role;

/// Command-line client for the DocWal credential API.
///
/// Results are printed to stdout as JSON.
#[derive(Parser, Debug)]
#[command(name = "docwal", version, about, long_about = None)]
pub struct Cli {
    /// API key (docwal_live_... or docwal_test_...)
    #[arg(long, env = "DOCWAL_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// API base URL, e.g. http://localhost:8000/api
    #[arg(long, env = "DOCWAL_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "DOCWAL_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Issue, list and revoke credentials
    #[command(subcommand)]
    Credentials(CredentialCommand),

    /// Manage credential templates
    #[command(subcommand)]
    Templates(TemplateCommand),

    /// Manage institution team members
    #[command(subcommand)]
    Team(TeamCommand),

    /// Manage the institution API key
    #[command(subcommand)]
    ApiKeys(ApiKeyCommand),
}

#[derive(Subcommand, Debug)]
pub enum CredentialCommand {
    /// Issue a single credential
    Issue {
        #[arg(long)]
        template_id: String,

        /// Recipient email
        #[arg(long)]
        email: String,

        /// Credential data as JSON, or @path to a JSON file
        #[arg(long)]
        data: String,

        /// PDF document to attach
        #[arg(long)]
        document: Option<PathBuf>,

        /// Expiry as an RFC 3339 timestamp
        #[arg(long)]
        expires_at: Option<chrono::DateTime<chrono::Utc>>,

        #[arg(long, default_value_t = DEFAULT_CLAIM_TOKEN_EXPIRES_HOURS)]
        claim_hours: u32,

        #[command(flatten)]
        notify: Notify,
    },

    /// Issue up to 1000 credentials from a JSON array of
    /// {"individual_email", "credential_data"} objects
    Batch {
        #[arg(long)]
        template_id: String,

        /// JSON array, or @path to a JSON file
        #[arg(long)]
        entries: String,

        #[command(flatten)]
        notify: Notify,
    },

    /// Upload a ZIP archive with a manifest and documents
    BatchUpload {
        #[arg(long)]
        template_id: String,

        file: PathBuf,

        #[command(flatten)]
        notify: Notify,
    },

    /// List credentials
    List {
        #[arg(long, default_value_t = docwal::client::credentials::DEFAULT_LIST_LIMIT)]
        limit: u32,

        #[arg(long, default_value_t = 0)]
        offset: u32,

        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        template_id: Option<String>,

        #[arg(long)]
        email: Option<String>,
    },

    /// Show one credential
    Get { doc_id: String },

    /// Revoke a credential
    Revoke {
        doc_id: String,

        #[arg(long)]
        reason: String,
    },

    /// Send the claim link again
    ResendClaim {
        doc_id: String,

        #[arg(long, default_value_t = DEFAULT_CLAIM_TOKEN_EXPIRES_HOURS)]
        claim_hours: u32,
    },

    /// Download the credential document
    Download {
        doc_id: String,

        /// Output file, defaults to <doc_id>.pdf
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone, Copy)]
pub struct Notify {
    /// Do not email recipients
    #[arg(long)]
    pub no_notify: bool,
}

impl Notify {
    pub fn send(self) -> bool {
        !self.no_notify
    }
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommand {
    /// List active templates
    List,

    /// Show one template
    Get { template_id: String },

    /// Create a template
    Create {
        #[arg(long)]
        name: String,

        /// Credential type, e.g. certificate, diploma, transcript
        #[arg(long = "type")]
        credential_type: String,

        #[arg(long)]
        description: Option<String>,

        /// Field schema as a JSON object, or @path to a JSON file
        #[arg(long)]
        schema: Option<String>,

        #[arg(long)]
        version: Option<String>,
    },

    /// Change some fields of a template
    Update {
        template_id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long = "type")]
        credential_type: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        schema: Option<String>,

        #[arg(long)]
        version: Option<String>,
    },

    /// Deactivate a template
    Delete { template_id: String },
}

#[derive(Subcommand, Debug)]
pub enum TeamCommand {
    /// List members and pending invitations
    List,

    /// Check whether an email can be invited
    CheckEmail { email: String },

    /// Invite a member
    Invite {
        email: String,

        #[arg(long, default_value = "issuer")]
        role: Role,

        /// Do not send the invitation email
        #[arg(long)]
        no_email: bool,

        /// Add an existing user without an invitation
        #[arg(long)]
        add_directly: bool,
    },

    /// Change a member's role
    SetRole { member_id: String, role: Role },

    /// Deactivate a member
    Deactivate {
        member_id: String,

        #[arg(long)]
        reason: Option<String>,
    },

    /// Reactivate a member
    Reactivate { member_id: String },

    /// Remove a member permanently
    Remove { member_id: String },
}

#[derive(Subcommand, Debug)]
pub enum ApiKeyCommand {
    /// Generate a key. It is printed once and cannot be shown again.
    Generate,

    /// Show the masked key and usage
    Info,

    /// Replace the current key
    Regenerate,

    /// Revoke the current key
    Revoke,
}
