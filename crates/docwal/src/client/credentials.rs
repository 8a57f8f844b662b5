use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::http::{Bytes, Http, Request, Upload};
use super::{require, segment};
use crate::model::batch::{BatchEntry, BatchResult, MAX_BATCH_SIZE};
use crate::model::credential::{ClaimLinkResent, Credential, IssuedCredential};
use crate::model::{Listing, Message};
use crate::Error;

/// How long a claim link stays valid unless told otherwise: 30 days.
pub const DEFAULT_CLAIM_TOKEN_EXPIRES_HOURS: u32 = 720;

pub const DEFAULT_LIST_LIMIT: u32 = 100;

/// A single credential issuance.
///
/// `credential_data` must match the template schema. That is checked by the
/// service, which answers with a validation error otherwise.
#[derive(Debug)]
pub struct IssueCredential {
    template_id: String,
    individual_email: String,
    credential_data: Value,
    document: Option<Upload>,
    expires_at: Option<DateTime<Utc>>,
    claim_token_expires_hours: u32,
    send_notifications: bool,
}

impl IssueCredential {
    pub fn new(
        template_id: impl Into<String>,
        individual_email: impl Into<String>,
        credential_data: Value,
    ) -> Self {
        Self {
            template_id: template_id.into(),
            individual_email: individual_email.into(),
            credential_data,
            document: None,
            expires_at: None,
            claim_token_expires_hours: DEFAULT_CLAIM_TOKEN_EXPIRES_HOURS,
            send_notifications: true,
        }
    }

    /// Attaches a PDF; the request is then sent as multipart.
    pub fn document(mut self, document: Upload) -> Self {
        self.document = Some(document);
        self
    }

    pub fn expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn claim_token_expires_hours(mut self, hours: u32) -> Self {
        self.claim_token_expires_hours = hours;
        self
    }

    pub fn send_notifications(mut self, send: bool) -> Self {
        self.send_notifications = send;
        self
    }
}

#[derive(Serialize)]
struct IssuePayload<'a> {
    template_id: &'a str,
    individual_email: &'a str,
    credential_data: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
    claim_token_expires_hours: u32,
    send_notifications: bool,
}

#[derive(Serialize)]
struct BatchPayload<'a> {
    template_id: &'a str,
    credentials: &'a [BatchEntry],
    send_notifications: bool,
}

#[derive(Serialize)]
struct UploadFields<'a> {
    template_id: &'a str,
    send_notifications: bool,
}

/// Offset-based page of the credential listing, plus optional filters.
#[derive(Debug, Clone)]
pub struct ListCredentials {
    pub limit: u32,
    pub offset: u32,
    pub status: Option<String>,
    pub template_id: Option<String>,
    pub individual_email: Option<String>,
    pub filters: Vec<(String, String)>,
}

impl Default for ListCredentials {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
            status: None,
            template_id: None,
            individual_email: None,
            filters: Vec::new(),
        }
    }
}

impl ListCredentials {
    pub fn page(limit: u32, offset: u32) -> Self {
        Self {
            limit,
            offset,
            ..Default::default()
        }
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn template_id(mut self, template_id: impl Into<String>) -> Self {
        self.template_id = Some(template_id.into());
        self
    }

    pub fn individual_email(mut self, email: impl Into<String>) -> Self {
        self.individual_email = Some(email.into());
        self
    }

    /// Any other query filter the service understands.
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((key.into(), value.into()));
        self
    }

    fn apply(&self, mut request: Request) -> Request {
        request = request.query("limit", self.limit).query("offset", self.offset);

        let named = [
            ("status", &self.status),
            ("template_id", &self.template_id),
            ("individual_email", &self.individual_email),
        ];
        for (key, value) in named {
            if let Some(value) = value {
                request = request.query(key, value);
            }
        }

        for (key, value) in &self.filters {
            request = request.query(key.as_str(), value);
        }

        request
    }
}

/// Issuing, querying and revoking credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    http: Arc<Http>,
}

impl Credentials {
    pub(crate) fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    pub async fn issue(&self, request: IssueCredential) -> Result<IssuedCredential, Error> {
        require("template_id", &request.template_id)?;
        require("individual_email", &request.individual_email)?;

        let payload = IssuePayload {
            template_id: &request.template_id,
            individual_email: &request.individual_email,
            credential_data: &request.credential_data,
            expires_at: request.expires_at,
            claim_token_expires_hours: request.claim_token_expires_hours,
            send_notifications: request.send_notifications,
        };

        let mut req = Request::post("/credentials/issue/").json(&payload)?;
        if let Some(document) = request.document {
            req = req.file("document_file", document);
        }

        self.http.send(req).await
    }

    /// Issues up to [`MAX_BATCH_SIZE`] credentials in one call.
    ///
    /// Larger batches are rejected before anything is sent.
    pub async fn batch_issue(
        &self,
        template_id: &str,
        credentials: &[BatchEntry],
        send_notifications: bool,
    ) -> Result<BatchResult, Error> {
        require("template_id", template_id)?;
        if credentials.len() > MAX_BATCH_SIZE {
            return Err(Error::precondition(
                "credentials",
                format!(
                    "a batch holds at most {MAX_BATCH_SIZE} credentials, got {}",
                    credentials.len()
                ),
            ));
        }

        let payload = BatchPayload {
            template_id,
            credentials,
            send_notifications,
        };
        log::debug!("issuing batch of {} credentials", credentials.len());

        self.http
            .send(Request::post("/credentials/batch/").json(&payload)?)
            .await
    }

    /// Uploads a ZIP of a manifest (`credentials.csv` or JSON) plus a
    /// `documents/` folder. The archive is sent as-is and parsed server-side.
    pub async fn batch_upload(
        &self,
        template_id: &str,
        file: Upload,
        send_notifications: bool,
    ) -> Result<BatchResult, Error> {
        require("template_id", template_id)?;

        let fields = UploadFields {
            template_id,
            send_notifications,
        };
        let req = Request::post("/credentials/batch-upload/")
            .json(&fields)?
            .file("file", file);

        self.http.send(req).await
    }

    pub async fn list(&self, query: &ListCredentials) -> Result<Vec<Credential>, Error> {
        let listing: Listing<Credential> = self
            .http
            .send(query.apply(Request::get("/credentials/")))
            .await?;
        Ok(listing.into_vec())
    }

    pub async fn get(&self, doc_id: impl AsRef<str>) -> Result<Credential, Error> {
        let doc_id = segment("doc_id", doc_id.as_ref())?;
        self.http.send(Request::get(format!("/credentials/{doc_id}/"))).await
    }

    pub async fn revoke(&self, doc_id: impl AsRef<str>, reason: &str) -> Result<Message, Error> {
        let doc_id = segment("doc_id", doc_id.as_ref())?;
        let req = Request::post(format!("/credentials/{doc_id}/revoke/"))
            .json(&serde_json::json!({ "reason": reason }))?;
        self.http.send(req).await
    }

    pub async fn resend_claim_link(
        &self,
        doc_id: impl AsRef<str>,
        claim_token_expires_hours: u32,
    ) -> Result<ClaimLinkResent, Error> {
        let doc_id = segment("doc_id", doc_id.as_ref())?;
        let req = Request::post(format!("/credentials/{doc_id}/resend-claim/"))
            .json(&serde_json::json!({ "claim_token_expires_hours": claim_token_expires_hours }))?;
        self.http.send(req).await
    }

    /// Downloads the credential document (usually a PDF) as raw bytes.
    pub async fn download(&self, doc_id: impl AsRef<str>) -> Result<Bytes, Error> {
        let doc_id = segment("doc_id", doc_id.as_ref())?;
        let req = Request::get(format!("/credentials/{doc_id}/download/")).accept("*/*");
        self.http.send_bytes(req).await
    }
}
