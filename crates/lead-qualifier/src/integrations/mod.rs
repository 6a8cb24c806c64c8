//! Adapters binding the pipeline capabilities to external systems.

mod airtable;
mod clio;
mod http;
mod offline;
mod openai;
mod webhook;

pub use airtable::AirtableLeadStore;
pub use clio::ClioCaseManager;
pub use http::IntegrationError;
pub use offline::{KeywordCompletionClient, LogCaseManager, LogNotifier};
pub use openai::OpenAiCompletionClient;
pub use webhook::WebhookNotifier;
