use std::sync::Arc;

use serde_json::json;

use super::http::{Http, Request};
use super::{require, segment};
use crate::model::team::{EmailCheck, Invite, InviteResult, Role, TeamListing};
use crate::model::Message;
use crate::Error;

/// Institution team membership.
#[derive(Debug, Clone)]
pub struct Team {
    http: Arc<Http>,
}

impl Team {
    pub(crate) fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    /// Lists members and pending invitations.
    pub async fn list(&self) -> Result<TeamListing, Error> {
        self.http.send(Request::get("/institutions/team/")).await
    }

    /// Pre-flight check before inviting `email`.
    ///
    /// The returned recommendation is advisory; [`Team::invite`] does not enforce it.
    pub async fn check_email(&self, email: &str) -> Result<EmailCheck, Error> {
        require("email", email)?;
        let req =
            Request::post("/institutions/team/check-email/").json(&json!({ "email": email }))?;
        self.http.send(req).await
    }

    pub async fn invite(&self, invite: &Invite) -> Result<InviteResult, Error> {
        require("email", &invite.email)?;
        known_role(invite.role)?;
        self.http
            .send(Request::post("/institutions/team/invite/").json(invite)?)
            .await
    }

    pub async fn update_role(
        &self,
        member_id: impl AsRef<str>,
        role: Role,
    ) -> Result<Message, Error> {
        let id = segment("member_id", member_id.as_ref())?;
        known_role(role)?;
        let req = Request::patch(format!("/institutions/team/members/{id}/role/"))
            .json(&json!({ "role": role }))?;
        self.http.send(req).await
    }

    pub async fn deactivate(
        &self,
        member_id: impl AsRef<str>,
        reason: Option<&str>,
    ) -> Result<Message, Error> {
        let id = segment("member_id", member_id.as_ref())?;
        let body = match reason {
            Some(reason) if !reason.is_empty() => json!({ "reason": reason }),
            _ => json!({}),
        };
        let req =
            Request::post(format!("/institutions/team/members/{id}/deactivate/")).json(&body)?;
        self.http.send(req).await
    }

    pub async fn reactivate(&self, member_id: impl AsRef<str>) -> Result<Message, Error> {
        let id = segment("member_id", member_id.as_ref())?;
        self.http
            .send(Request::post(format!("/institutions/team/members/{id}/reactivate/")))
            .await
    }

    /// Removes a member for good, unlike [`Team::deactivate`].
    pub async fn remove(&self, member_id: impl AsRef<str>) -> Result<Message, Error> {
        let id = segment("member_id", member_id.as_ref())?;
        self.http
            .send(Request::delete(format!("/institutions/team/members/{id}/remove/")))
            .await
    }
}

fn known_role(role: Role) -> Result<(), Error> {
    match role {
        Role::Unknown => Err(Error::precondition("role", "role must be owner, admin or issuer")),
        _ => Ok(()),
    }
}
