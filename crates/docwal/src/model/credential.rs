use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::newtype_id;
use super::template::TemplateId;

newtype_id!(
    /// A credential document ID.
    DocId
);

/// An issued credential, as returned by `get` and `list`.
///
/// `issued_by_email` and `issued_by_name` are `None` for credentials issued
/// before the service recorded the issuing user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Credential {
    pub doc_id: DocId,
    pub template_id: Option<TemplateId>,
    /// Older responses send the template as `template`, either as an ID or
    /// as an object with an `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<Value>,
    pub template_name: Option<String>,
    pub individual_email: Option<String>,
    pub status: Option<String>,
    pub is_claimed: Option<bool>,
    pub document_hash: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revocation_reason: Option<String>,
    pub issued_by_email: Option<String>,
    pub issued_by_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Credential {
    /// The template ID from `template_id`, or from `template` when that is absent.
    pub fn template_ref(&self) -> Option<TemplateId> {
        if let Some(id) = &self.template_id {
            return Some(id.clone());
        }
        let template = self.template.as_ref()?;
        let id = template.get("id").unwrap_or(template);
        serde_json::from_value(id.clone()).ok()
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some() || self.status.as_deref() == Some("revoked")
    }
}

/// Response to a single issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct IssuedCredential {
    pub doc_id: DocId,
    pub claim_token: Option<String>,
    pub document_hash: Option<String>,
    pub status: Option<String>,
    pub claim_token_expires: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response to a claim link resend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ClaimLinkResent {
    pub message: Option<String>,
    pub recipient_email: Option<String>,
    pub claim_token: Option<String>,
    pub claim_token_expires: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_credential_has_no_issuer() {
        let cred: Credential = serde_json::from_str(
            r#"{
                "doc_id": "DOC-1",
                "template_id": 7,
                "individual_email": "student@example.com",
                "issued_at": "2024-05-15T10:00:00Z",
                "issued_by_email": null,
                "issued_by_name": null
            }"#,
        )
        .expect("failed to deserialize credential");

        assert_eq!(cred.doc_id.as_ref(), "DOC-1");
        assert_eq!(cred.template_id, Some(TemplateId::from("7")));
        assert_eq!(cred.issued_by_email, None);
        assert_eq!(cred.issued_by_name, None);
        assert!(!cred.is_revoked());
    }

    #[test]
    fn test_credential_keeps_unknown_fields() {
        let cred: Credential = serde_json::from_str(
            r#"{
                "doc_id": "DOC-2",
                "status": "revoked",
                "issued_by_email": "registrar@uni.edu",
                "issued_by_name": "Registrar",
                "credential_data": {"degree": "BSc"}
            }"#,
        )
        .expect("failed to deserialize credential");

        assert_eq!(cred.issued_by_email.as_deref(), Some("registrar@uni.edu"));
        assert_eq!(cred.issued_by_name.as_deref(), Some("Registrar"));
        assert_eq!(cred.extra["credential_data"]["degree"], "BSc");
        assert!(cred.is_revoked());
    }

    #[test]
    fn test_template_under_both_keys() {
        let cred: Credential = serde_json::from_str(
            r#"{
                "doc_id": "DOC-3",
                "template_id": "t-1",
                "template": {"id": "t-1", "name": "Degree"}
            }"#,
        )
        .expect("failed to deserialize credential");
        assert_eq!(cred.template_ref(), Some(TemplateId::from("t-1")));
        assert_eq!(cred.template.as_ref().map(|t| &t["name"]), Some(&Value::from("Degree")));

        let cred: Credential = serde_json::from_str(r#"{"doc_id": "DOC-4", "template": 9}"#)
            .expect("failed to deserialize credential");
        assert_eq!(cred.template_id, None);
        assert_eq!(cred.template_ref(), Some(TemplateId::from("9")));
    }
}
