// Worker script client: a blocking reqwest client bound to one account's
// `/workers/scripts` endpoint. Base URL and authorization header are worked
// out once at construction and reused by every call.

use crate::bindings::{Function, UploadBody, UploadedFunction};
use crate::config::Options;
use crate::error::{Error, Result};
use crate::models::UploadResponse;
use crate::tracker::Tracker;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{StatusCode, Url};
use serde::Serialize;
use tracing::{debug, debug_span, info, warn, Span};

#[derive(Serialize)]
struct SubdomainRequest {
    enabled: bool,
}

/// Uploads and deletes worker scripts for a single account.
#[derive(Debug)]
pub struct WorkerClient {
    client: Client,
    options: Options,
    worker_url: Url,
    authorization: HeaderValue,
    tracker: Tracker,
    span: Span,
}

impl WorkerClient {
    /// Build a client from `options`. A disabled configuration yields
    /// `Error::Disabled` and no client. Performs no network I/O.
    pub fn new(options: Options) -> Result<Self> {
        let span = debug_span!("cloudflare", log_name = %options.log_name);
        if options.disabled {
            span.in_scope(|| debug!("disabled"));
            return Err(Error::Disabled);
        }

        let raw = format!(
            "{}/accounts/{}/workers/scripts",
            options.api_base_url.trim_end_matches('/'),
            options.user_id
        );
        let worker_url = Url::parse(&raw).map_err(|e| Error::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;

        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", options.token))
            .map_err(|_| Error::InvalidToken)?;
        authorization.set_sensitive(true);

        let client = Client::builder()
            .build()
            .map_err(|source| Error::Request {
                action: "http client",
                source,
            })?;

        Ok(WorkerClient {
            client,
            options,
            worker_url,
            authorization,
            tracker: Tracker::new(),
            span,
        })
    }

    /// Refuse new calls and wait for in-flight ones to finish. Safe to call
    /// more than once.
    pub fn close(&self) {
        let _span = self.span.enter();
        debug!("closing cloudflare client");
        self.tracker.shutdown();
    }

    /// Number of upload/delete calls currently running.
    pub fn in_flight(&self) -> usize {
        self.tracker.in_flight()
    }

    pub fn upstream_root_domain(&self) -> Option<&str> {
        self.options.upstream_root_domain.as_deref()
    }

    pub fn prefix(&self) -> &str {
        &self.options.prefix
    }

    /// Remote script name for `identifier`: the configured prefix plus the identifier.
    pub fn script_name(&self, identifier: &str) -> Result<String> {
        if identifier.is_empty() {
            return Err(Error::EmptyIdentifier);
        }
        Ok(format!("{}{}", self.options.prefix, identifier))
    }

    fn script_url(&self, script_name: &str, suffix: &str) -> Result<Url> {
        let raw = format!("{}/{}{}", self.worker_url, script_name, suffix);
        Url::parse(&raw).map_err(|e| Error::InvalidUrl {
            url: raw,
            reason: e.to_string(),
        })
    }

    /// Upload `script` as the worker entry point, with every function's
    /// payload and auxiliary files bound into its environment.
    pub fn upload_function(
        &self,
        identifier: &str,
        script: &[u8],
        functions: &[Function],
    ) -> Result<UploadedFunction> {
        let _span = self.span.enter();
        let _guard = self.tracker.enter()?;
        let script_name = self.script_name(identifier)?;

        let form = UploadBody::build(script, functions)?.into_form()?;

        let mut url = self.script_url(&script_name, "")?;
        {
            let mut query = url.query_pairs_mut();
            if self.options.manage_subdomain {
                query.append_pair("include_subdomain_availability", "true");
            }
            query.append_pair("excludeScript", "true");
        }

        debug!(script = %script_name, functions = functions.len(), "uploading worker");
        let res = self
            .client
            .put(url)
            .header(AUTHORIZATION, self.authorization.clone())
            .multipart(form)
            .send()
            .map_err(|source| Error::Transport {
                action: "uploading worker",
                source,
            })?;
        let res = expect_ok(res, "uploading worker")?;

        let body = res.text().map_err(|source| Error::Transport {
            action: "reading upload response",
            source,
        })?;
        let upload: UploadResponse = serde_json::from_str(&body)?;
        if !upload.success {
            warn!(script = %script_name, errors = ?upload.errors, "upload rejected");
            return Err(Error::Unsuccessful {
                errors: upload.errors,
            });
        }

        if self.options.manage_subdomain && !upload.result.available_on_subdomain {
            self.enable_subdomain(&script_name)?;
        }

        info!(script = %script_name, etag = %upload.result.etag, "worker uploaded");
        Ok(UploadedFunction {
            identifier: identifier.to_string(),
            subdomain: script_name,
        })
    }

    fn enable_subdomain(&self, script_name: &str) -> Result<()> {
        let url = self.script_url(script_name, "/subdomain")?;
        debug!(script = %script_name, "enabling subdomain");
        let res = self
            .client
            .post(url)
            .header(AUTHORIZATION, self.authorization.clone())
            .json(&SubdomainRequest { enabled: true })
            .send()
            .map_err(|source| Error::Transport {
                action: "creating subdomain",
                source,
            })?;
        expect_ok(res, "creating subdomain")?;
        Ok(())
    }

    /// Delete the script previously uploaded as `identifier`.
    pub fn delete_function(&self, identifier: &str) -> Result<()> {
        let _span = self.span.enter();
        let _guard = self.tracker.enter()?;
        let script_name = self.script_name(identifier)?;
        let url = self.script_url(&script_name, "")?;

        debug!(script = %script_name, "deleting worker");
        let res = self
            .client
            .delete(url)
            .header(AUTHORIZATION, self.authorization.clone())
            .send()
            .map_err(|source| Error::Transport {
                action: "deleting worker",
                source,
            })?;
        expect_ok(res, "deleting worker")?;

        info!(script = %script_name, "worker deleted");
        Ok(())
    }
}

/// Anything but a 200 becomes `Error::Rejected`, with the body read best-effort.
fn expect_ok(res: Response, action: &'static str) -> Result<Response> {
    let status = res.status();
    if status == StatusCode::OK {
        return Ok(res);
    }
    let body = res.text().unwrap_or_default();
    warn!(%status, body = %body, "{} failed", action);
    Err(Error::Rejected {
        action,
        status,
        body,
    })
}
