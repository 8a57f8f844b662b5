use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use docwal::client::credentials::{IssueCredential, ListCredentials};
use docwal::model::api_key::ApiKey;
use docwal::model::batch::BatchEntry;
use docwal::model::team::Invite;
use docwal::model::template::{FieldDescriptor, NewTemplate, TemplateUpdate};
use docwal::{Client, Upload};
use serde::Serialize;
use url::Url;

use cli::{ApiKeyCommand, Cli, Commands, CredentialCommand, TeamCommand, TemplateCommand};
use config::{Config, Overrides};
use utils::read_json_arg;

pub mod cli;
pub mod config;
pub mod utils;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("no API key given, set DOCWAL_API_KEY or pass --api-key")]
    MissingApiKey,
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    DocWal(#[from] docwal::Error),
    #[error("invalid base URL")]
    BaseUrl(#[from] url::ParseError),
    #[error("i/o error")]
    Io(#[from] io::Error),
    #[error("invalid JSON")]
    Json(#[from] serde_json::Error),
}

pub async fn run(cli: Cli) -> Result<(), CliError> {
    let client = connect(&cli)?;

    match cli.command {
        Commands::Credentials(cmd) => credentials(&client, cmd).await,
        Commands::Templates(cmd) => templates(&client, cmd).await,
        Commands::Team(cmd) => team(&client, cmd).await,
        Commands::ApiKeys(cmd) => api_keys(&client, cmd).await,
    }
}

fn connect(cli: &Cli) -> Result<Client, CliError> {
    let api_key = cli
        .api_key
        .as_deref()
        .filter(|key| !key.trim().is_empty())
        .ok_or(CliError::MissingApiKey)?;

    let overrides = Overrides {
        base_url: cli.base_url.as_deref().map(|url| Url::parse(url.trim())).transpose()?,
        timeout: cli.timeout.map(Duration::from_secs),
    };
    let config = Config::load(cli.config.as_deref()).client_config(ApiKey::new(api_key), overrides);

    Ok(Client::from_config(config)?)
}

fn print<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn credentials(client: &Client, cmd: CredentialCommand) -> Result<(), CliError> {
    let credentials = client.credentials();

    match cmd {
        CredentialCommand::Issue {
            template_id,
            email,
            data,
            document,
            expires_at,
            claim_hours,
            notify,
        } => {
            let mut request = IssueCredential::new(template_id, email, read_json_arg(&data)?)
                .claim_token_expires_hours(claim_hours)
                .send_notifications(notify.send());
            if let Some(path) = document {
                request = request.document(Upload::from_path(path).await?);
            }
            if let Some(expires_at) = expires_at {
                request = request.expires_at(expires_at);
            }
            print(&credentials.issue(request).await?)
        }
        CredentialCommand::Batch {
            template_id,
            entries,
            notify,
        } => {
            let entries: Vec<BatchEntry> = serde_json::from_value(read_json_arg(&entries)?)?;
            print(&credentials.batch_issue(&template_id, &entries, notify.send()).await?)
        }
        CredentialCommand::BatchUpload {
            template_id,
            file,
            notify,
        } => {
            let upload = Upload::from_path(file).await?;
            print(&credentials.batch_upload(&template_id, upload, notify.send()).await?)
        }
        CredentialCommand::List {
            limit,
            offset,
            status,
            template_id,
            email,
        } => {
            let mut query = ListCredentials::page(limit, offset);
            query.status = status;
            query.template_id = template_id;
            query.individual_email = email;
            print(&credentials.list(&query).await?)
        }
        CredentialCommand::Get { doc_id } => print(&credentials.get(doc_id).await?),
        CredentialCommand::Revoke { doc_id, reason } => {
            print(&credentials.revoke(doc_id, &reason).await?)
        }
        CredentialCommand::ResendClaim { doc_id, claim_hours } => {
            print(&credentials.resend_claim_link(doc_id, claim_hours).await?)
        }
        CredentialCommand::Download { doc_id, output } => {
            let bytes = credentials.download(&doc_id).await?;
            let output = output.unwrap_or_else(|| PathBuf::from(format!("{doc_id}.pdf")));
            tokio::fs::write(&output, &bytes).await?;
            log::info!("wrote {} bytes to {}", bytes.len(), output.display());
            Ok(())
        }
    }
}

async fn templates(client: &Client, cmd: TemplateCommand) -> Result<(), CliError> {
    let templates = client.templates();

    match cmd {
        TemplateCommand::List => print(&templates.list().await?),
        TemplateCommand::Get { template_id } => print(&templates.get(template_id).await?),
        TemplateCommand::Create {
            name,
            credential_type,
            description,
            schema,
            version,
        } => {
            let mut template = NewTemplate::new(name, credential_type);
            if let Some(description) = description {
                template = template.description(description);
            }
            if let Some(version) = version {
                template = template.version(version);
            }
            if let Some(schema) = schema {
                template.schema = parse_schema(&schema)?;
            }
            print(&templates.create(&template).await?)
        }
        TemplateCommand::Update {
            template_id,
            name,
            credential_type,
            description,
            schema,
            version,
        } => {
            let update = TemplateUpdate {
                name,
                description,
                credential_type,
                schema: schema.as_deref().map(parse_schema).transpose()?,
                version,
            };
            print(&templates.update(template_id, &update).await?)
        }
        TemplateCommand::Delete { template_id } => print(&templates.delete(template_id).await?),
    }
}

fn parse_schema(arg: &str) -> Result<BTreeMap<String, FieldDescriptor>, CliError> {
    let value = read_json_arg(arg)?;
    if !value.is_object() {
        return Err(CliError::Usage(
            "schema must be a JSON object of field descriptors".to_string(),
        ));
    }
    Ok(serde_json::from_value(value)?)
}

async fn team(client: &Client, cmd: TeamCommand) -> Result<(), CliError> {
    let team = client.team();

    match cmd {
        TeamCommand::List => print(&team.list().await?),
        TeamCommand::CheckEmail { email } => print(&team.check_email(&email).await?),
        TeamCommand::Invite {
            email,
            role,
            no_email,
            add_directly,
        } => {
            let invite = Invite::new(email)
                .role(role)
                .send_email(!no_email)
                .add_directly(add_directly);
            print(&team.invite(&invite).await?)
        }
        TeamCommand::SetRole { member_id, role } => {
            print(&team.update_role(member_id, role).await?)
        }
        TeamCommand::Deactivate { member_id, reason } => {
            print(&team.deactivate(member_id, reason.as_deref()).await?)
        }
        TeamCommand::Reactivate { member_id } => print(&team.reactivate(member_id).await?),
        TeamCommand::Remove { member_id } => print(&team.remove(member_id).await?),
    }
}

async fn api_keys(client: &Client, cmd: ApiKeyCommand) -> Result<(), CliError> {
    let api_keys = client.api_keys();

    match cmd {
        ApiKeyCommand::Generate => {
            let generated = api_keys.generate().await?;
            log::warn!("store this key securely, it will not be shown again");
            print(&generated)
        }
        ApiKeyCommand::Info => print(&api_keys.info().await?),
        ApiKeyCommand::Regenerate => {
            let generated = api_keys.regenerate().await?;
            log::warn!("the previous key no longer works");
            print(&generated)
        }
        ApiKeyCommand::Revoke => print(&api_keys.revoke().await?),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Answers one connection with `response` and returns the raw request head.
    async fn serve_once(response: &'static [u8]) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("failed to bind");
        let url = format!("http://{}/api", listener.local_addr().expect("no address"));

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("failed to accept");
            let mut head = Vec::new();
            let mut buf = [0; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).await.expect("failed to read request");
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            stream.write_all(response).await.expect("failed to write response");
            stream.shutdown().await.expect("failed to close");
            String::from_utf8_lossy(&head).into_owned()
        });

        (url, handle)
    }

    #[tokio::test]
    async fn test_run_download_writes_file() {
        let (url, server) = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\nContent-Length: 13\r\n\
              Connection: close\r\n\r\n%PDF-1.7 body",
        )
        .await;
        let output = std::env::temp_dir().join(format!("docwal-cli-{}.pdf", std::process::id()));
        let output_arg = output.to_string_lossy().into_owned();

        let cli = Cli::try_parse_from([
            "docwal",
            "--api-key",
            "docwal_test_0123456789abcdef",
            "--base-url",
            &url,
            "--config",
            "/nonexistent/docwal.json",
            "credentials",
            "download",
            "DOC-1",
            "-o",
            &output_arg,
        ])
        .expect("failed to parse");
        run(cli).await.expect("download command failed");

        let written = tokio::fs::read(&output).await.expect("output file missing");
        assert_eq!(written, b"%PDF-1.7 body");
        tokio::fs::remove_file(&output).await.expect("failed to remove output");

        let head = server.await.expect("server task failed").to_ascii_lowercase();
        assert!(head.starts_with("get /api/credentials/doc-1/download/ http/1.1\r\n"));
        assert!(head.contains("\r\nx-api-key: docwal_test_0123456789abcdef\r\n"));
    }

    #[tokio::test]
    async fn test_run_reports_api_error() {
        let (url, server) = serve_once(
            b"HTTP/1.1 404 Not Found\r\nContent-Type: application/json\r\nContent-Length: 22\r\n\
              Connection: close\r\n\r\n{\"error\": \"Not found\"}",
        )
        .await;

        let cli = Cli::try_parse_from([
            "docwal",
            "--api-key",
            "docwal_test_0123456789abcdef",
            "--base-url",
            &url,
            "--config",
            "/nonexistent/docwal.json",
            "templates",
            "get",
            "t-9",
        ])
        .expect("failed to parse");
        let err = run(cli).await.expect_err("missing template should fail");
        assert!(matches!(&err, CliError::DocWal(e) if e.status().map(|s| s.as_u16()) == Some(404)));
        assert!(!utils::ErrorWithCauses(err).to_string().contains("0123456789abcdef"));

        let head = server.await.expect("server task failed");
        assert!(head.starts_with("GET /api/templates/t-9/ HTTP/1.1\r\n"));
    }

    #[test]
    fn test_connect_requires_key() {
        let cli = Cli::try_parse_from(["docwal", "--api-key", " ", "api-keys", "info"])
            .expect("failed to parse");
        assert!(matches!(connect(&cli), Err(CliError::MissingApiKey)));
    }

    #[test]
    fn test_connect_applies_flags() {
        let cli = Cli::try_parse_from([
            "docwal",
            "--api-key",
            "docwal_test_abc",
            "--base-url",
            "http://localhost:8000/api",
            "--timeout",
            "7",
            "--config",
            "/nonexistent/docwal.json",
            "templates",
            "list",
        ])
        .expect("failed to parse");

        let client = connect(&cli).expect("failed to connect");
        assert_eq!(client.http().base_url().as_str(), "http://localhost:8000/api");
        assert_eq!(client.http().timeout(), Duration::from_secs(7));

        let cli = Cli::try_parse_from([
            "docwal",
            "--api-key",
            "docwal_test_abc",
            "--base-url",
            "nope",
            "team",
            "list",
        ])
        .expect("failed to parse");
        assert!(matches!(connect(&cli), Err(CliError::BaseUrl(_))));
    }

    #[test]
    fn test_parse_schema() {
        let schema = parse_schema(r#"{"student_name": {"type": "string", "required": true}}"#)
            .expect("valid schema");
        assert!(schema["student_name"].required);

        assert!(matches!(parse_schema("[]"), Err(CliError::Usage(_))));
    }
}
