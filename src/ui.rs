// CLI flows: load a bundle from disk, drive the `WorkerClient`, and report
// progress with an `indicatif` spinner. Deletion asks for confirmation via
// `dialoguer` unless the caller already said yes.

use crate::api::WorkerClient;
use crate::bindings::{BindingKind, Function, FunctionFile, UploadedFunction};
use anyhow::{Context, Result};
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One function entry of a bundle manifest. Paths are relative to the
/// manifest's directory.
#[derive(Deserialize, Debug)]
pub struct FunctionEntry {
    pub identifier: String,
    pub source: PathBuf,
    #[serde(default)]
    pub files: Vec<FileEntry>,
}

#[derive(Deserialize, Debug)]
pub struct FileEntry {
    pub path: PathBuf,
    pub content_type: String,
    pub extension: String,
    pub binding: String,
    pub kind: BindingKind,
}

/// Read a JSON bundle manifest and every file it references.
pub fn load_functions(manifest: &Path) -> Result<Vec<Function>> {
    let raw = fs::read_to_string(manifest)
        .with_context(|| format!("Failed to read manifest {}", manifest.display()))?;
    let entries: Vec<FunctionEntry> =
        serde_json::from_str(&raw).context("Parsing bundle manifest json")?;
    let root = manifest.parent().unwrap_or_else(|| Path::new("."));

    entries
        .into_iter()
        .map(|entry| -> Result<Function> {
            let source = read(root, &entry.source)?;
            let files = entry
                .files
                .into_iter()
                .map(|file| -> Result<FunctionFile> {
                    Ok(FunctionFile {
                        content: read(root, &file.path)?,
                        content_type: file.content_type,
                        extension: file.extension,
                        binding: file.binding,
                        kind: file.kind,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Function {
                identifier: entry.identifier,
                source,
                files,
            })
        })
        .collect()
}

fn read(root: &Path, path: &Path) -> Result<Vec<u8>> {
    let full = root.join(path);
    fs::read(&full).with_context(|| format!("Failed to read {}", full.display()))
}

/// Where a deployed function can be reached.
pub fn deployed_location(handle: &UploadedFunction, upstream_root_domain: Option<&str>) -> String {
    match upstream_root_domain {
        Some(domain) => format!("https://{}.{}", handle.subdomain, domain),
        None => handle.subdomain.clone(),
    }
}

fn spinner(msg: &'static str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message(msg);
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

/// Upload the entry script and bundle, printing where the worker landed.
pub fn upload(
    client: &WorkerClient,
    identifier: &str,
    script: &Path,
    manifest: Option<&Path>,
) -> Result<UploadedFunction> {
    let script_bytes = fs::read(script)
        .with_context(|| format!("Failed to read script {}", script.display()))?;
    let functions = match manifest {
        Some(path) => load_functions(path)?,
        None => Vec::new(),
    };

    let spinner = spinner("Uploading...")?;
    let result = client.upload_function(identifier, &script_bytes, &functions);
    spinner.finish_and_clear();

    let handle = result.with_context(|| format!("Upload of {} failed", identifier))?;
    println!(
        "Deployed {} at {}",
        handle.identifier,
        deployed_location(&handle, client.upstream_root_domain())
    );
    Ok(handle)
}

/// Delete a deployed worker. Returns false if the user backed out.
pub fn delete(client: &WorkerClient, identifier: &str, yes: bool) -> Result<bool> {
    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete worker {}{}?", client.prefix(), identifier))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Delete cancelled");
            return Ok(false);
        }
    }

    let spinner = spinner("Deleting...")?;
    let result = client.delete_function(identifier);
    spinner.finish_and_clear();

    result.with_context(|| format!("Delete of {} failed", identifier))?;
    println!("Deleted {}", identifier);
    Ok(true)
}
