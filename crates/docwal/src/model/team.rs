use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::newtype_id;

newtype_id!(
    /// A team member ID.
    MemberId
);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Admin,
    #[default]
    Issuer,
    /// A role this version of the library does not know about.
    #[serde(other)]
    Unknown,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Issuer => "issuer",
            Role::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role {:?}, expected owner, admin or issuer", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "issuer" => Ok(Role::Issuer),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Active,
    Pending,
    Deactivated,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct TeamMember {
    pub id: MemberId,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub status: Option<MemberStatus>,
    pub is_active: Option<bool>,
    pub joined_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TeamMember {
    pub fn is_deactivated(&self) -> bool {
        self.status == Some(MemberStatus::Deactivated) || self.is_active == Some(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Invitation {
    #[serde(default, deserialize_with = "optional_id")]
    pub id: Option<String>,
    pub email: String,
    pub role: Option<Role>,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<super::id::RawId>::deserialize(deserializer).map(|raw| raw.map(String::from))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct TeamListing {
    #[serde(default)]
    pub members: Vec<TeamMember>,
    #[serde(default)]
    pub pending_invitations: Vec<Invitation>,
    pub stats: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Advisory outcome of an email pre-flight check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    AddDirectly,
    SendInvitation,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct EmailCheck {
    pub valid: Option<bool>,
    pub user_exists: Option<bool>,
    pub recommendation: Option<Recommendation>,
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload for inviting a team member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invite {
    pub email: String,
    pub role: Role,
    pub send_email: bool,
    pub add_directly: bool,
}

impl Invite {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            role: Role::Issuer,
            send_email: true,
            add_directly: false,
        }
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn send_email(mut self, send: bool) -> Self {
        self.send_email = send;
        self
    }

    /// Adds an existing user straight to the team instead of sending an invitation.
    pub fn add_directly(mut self, add: bool) -> Self {
        self.add_directly = add;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct InviteResult {
    pub message: Option<String>,
    pub invitation: Option<Invitation>,
    pub member: Option<TeamMember>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
