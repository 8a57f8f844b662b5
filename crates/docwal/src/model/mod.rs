use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod api_key;
pub mod batch;
pub mod credential;
pub(crate) mod id;
pub mod team;
pub mod template;

/// Generic acknowledgement returned by revoke, delete and membership changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Message {
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// List endpoints return either a bare array or a `{"results": [...]}` page.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Items(Vec<T>),
    Page { results: Vec<T> },
}

impl<T> Listing<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Items(items) | Listing::Page { results: items } => items,
        }
    }
}
