//! Client for the DocWal credential issuance API.
//!
//! ```no_run
//! # async fn run() -> Result<(), docwal::Error> {
//! use docwal::client::credentials::IssueCredential;
//! use docwal::Client;
//! use serde_json::json;
//!
//! let client = Client::new("docwal_live_...")?;
//! let data = json!({"student_name": "Ada Lovelace"});
//! let request = IssueCredential::new("42", "student@example.edu", data);
//! let issued = client.credentials().issue(request).await?;
//! println!("issued {}", issued.doc_id);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod errors;
pub mod model;

pub use client::http::Upload;
pub use client::{Client, ClientBuilder, ClientConfig};
pub use errors::{Error, ErrorKind, FieldError};
