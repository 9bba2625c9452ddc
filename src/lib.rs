// Library root
// -----------
// Blocking client for deploying worker scripts to Cloudflare and removing
// them again. The binary (`main.rs`) wraps it in a small CLI.
//
// Module responsibilities:
// - `api`: the `WorkerClient` (upload, delete, close).
// - `bindings`: function artifacts, the metadata manifest and the multipart
//   body built from them.
// - `config`: CLI flags, validation and client `Options`.
// - `models`: the JSON response envelope.
// - `tracker`: in-flight call tracking used by `WorkerClient::close`.
// - `ui`: the CLI flows driving the client.
pub mod api;
pub mod bindings;
pub mod config;
pub mod error;
pub mod models;
pub mod tracker;
pub mod ui;

pub use api::WorkerClient;
pub use bindings::{BindingKind, Function, FunctionFile, Metadata, UploadedFunction};
pub use config::{Config, Options};
pub use error::{ConfigError, Error, Result};
