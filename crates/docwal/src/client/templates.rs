use std::sync::Arc;

use super::http::{Http, Request};
use super::segment;
use crate::model::template::{NewTemplate, Template, TemplateUpdate};
use crate::model::{Listing, Message};
use crate::Error;

/// Credential template management.
#[derive(Debug, Clone)]
pub struct Templates {
    http: Arc<Http>,
}

impl Templates {
    pub(crate) fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    /// Lists active templates.
    pub async fn list(&self) -> Result<Vec<Template>, Error> {
        let listing: Listing<Template> = self.http.send(Request::get("/templates/")).await?;
        Ok(listing.into_vec())
    }

    pub async fn get(&self, template_id: impl AsRef<str>) -> Result<Template, Error> {
        let id = segment("template_id", template_id.as_ref())?;
        self.http.send(Request::get(format!("/templates/{id}/"))).await
    }

    pub async fn create(&self, template: &NewTemplate) -> Result<Template, Error> {
        if template.name.trim().is_empty() {
            return Err(Error::precondition("name", "name must not be empty"));
        }
        self.http.send(Request::post("/templates/").json(template)?).await
    }

    pub async fn update(
        &self,
        template_id: impl AsRef<str>,
        update: &TemplateUpdate,
    ) -> Result<Template, Error> {
        let id = segment("template_id", template_id.as_ref())?;
        if update.is_empty() {
            return Err(Error::precondition("template", "no fields to update"));
        }
        self.http
            .send(Request::patch(format!("/templates/{id}/")).json(update)?)
            .await
    }

    /// Deactivates a template. Existing credentials are kept.
    pub async fn delete(&self, template_id: impl AsRef<str>) -> Result<Message, Error> {
        let id = segment("template_id", template_id.as_ref())?;
        self.http.send(Request::delete(format!("/templates/{id}/"))).await
    }
}
