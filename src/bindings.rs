// Script bundles and the multipart body they are uploaded as.
//
// `UploadBody::build` lays out every part and the metadata manifest in
// memory; `UploadBody::into_form` hands it to reqwest, which writes the
// boundaries and the closing terminator when the request is sent.

use crate::error::{Error, Result};
use reqwest::blocking::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const SCRIPT_PART: &str = "worker.js";
pub const SCRIPT_CONTENT_TYPE: &str = "application/javascript";
pub const SOURCE_CONTENT_TYPE: &str = "application/octet-stream";
pub const METADATA_PART: &str = "metadata";
pub const METADATA_FILE_NAME: &str = "metadata.json";
pub const METADATA_CONTENT_TYPE: &str = "application/json";

/// How a part is exposed to the running script.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BindingKind {
    /// Raw bytes, available as an `ArrayBuffer`.
    DataBlob,
    /// Compiled and exposed as a `WebAssembly.Module`.
    WasmModule,
    /// UTF-8 text, available as a string.
    TextBlob,
}

/// An auxiliary file shipped alongside a function's primary payload.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionFile {
    pub content: Vec<u8>,
    pub content_type: String,
    pub extension: String,
    pub binding: String,
    pub kind: BindingKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub identifier: String,
    pub source: Vec<u8>,
    pub files: Vec<FunctionFile>,
}

impl Function {
    pub fn new(identifier: impl Into<String>, source: impl Into<Vec<u8>>) -> Self {
        Function {
            identifier: identifier.into(),
            source: source.into(),
            files: Vec::new(),
        }
    }

    pub fn with_file(mut self, file: FunctionFile) -> Self {
        self.files.push(file);
        self
    }

    fn source_part(&self) -> String {
        format!("{}.bin", self.identifier)
    }

    fn file_part(&self, file: &FunctionFile) -> String {
        format!("{}.{}", self.identifier, file.extension)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    #[serde(rename = "type")]
    pub kind: BindingKind,
    pub name: String,
    pub part: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub body_part: String,
    pub bindings: Vec<Binding>,
}

/// Handle to a successfully deployed function.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UploadedFunction {
    pub identifier: String,
    pub subdomain: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadPart {
    pub name: String,
    pub file_name: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

impl UploadPart {
    fn new(name: &str, file_name: &str, content_type: &str, content: Vec<u8>) -> Self {
        UploadPart {
            name: name.to_string(),
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            content,
        }
    }
}

/// Parts in wire order, refusing any name already taken. The script and
/// metadata names are reserved from the start.
struct PartList {
    parts: Vec<UploadPart>,
    names: HashSet<String>,
}

impl PartList {
    fn new(script: &[u8]) -> Self {
        let names = HashSet::from([SCRIPT_PART.to_string(), METADATA_PART.to_string()]);
        PartList {
            parts: vec![UploadPart::new(
                SCRIPT_PART,
                SCRIPT_PART,
                SCRIPT_CONTENT_TYPE,
                script.to_vec(),
            )],
            names,
        }
    }

    fn push(&mut self, name: &str, content_type: &str, content: Vec<u8>) -> Result<()> {
        if !self.names.insert(name.to_string()) {
            return Err(Error::DuplicatePart(name.to_string()));
        }
        self.parts.push(UploadPart::new(name, name, content_type, content));
        Ok(())
    }
}

/// Every part of an upload request, in wire order, with the metadata part last.
#[derive(Debug, Clone)]
pub struct UploadBody {
    pub parts: Vec<UploadPart>,
    pub metadata: Metadata,
}

impl UploadBody {
    pub fn build(script: &[u8], functions: &[Function]) -> Result<Self> {
        let mut parts = PartList::new(script);
        for function in functions {
            let name = function.source_part();
            parts.push(&name, SOURCE_CONTENT_TYPE, function.source.clone())?;
            for file in &function.files {
                let name = function.file_part(file);
                parts.push(&name, &file.content_type, file.content.clone())?;
            }
        }

        let metadata = build_metadata(functions)?;
        let metadata_json = serde_json::to_vec(&metadata).map_err(Error::Encode)?;
        let mut parts = parts.parts;
        parts.push(UploadPart::new(
            METADATA_PART,
            METADATA_FILE_NAME,
            METADATA_CONTENT_TYPE,
            metadata_json,
        ));

        Ok(UploadBody { parts, metadata })
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| p.name.as_str())
    }

    pub fn into_form(self) -> Result<Form> {
        let mut form = Form::new();
        for part in self.parts {
            let body = Part::bytes(part.content)
                .file_name(part.file_name)
                .mime_str(&part.content_type)
                .map_err(|source| Error::Request {
                    action: "multipart",
                    source,
                })?;
            form = form.part(part.name, body);
        }
        Ok(form)
    }
}

/// Builds the manifest mapping each non-script part to its runtime binding.
pub fn build_metadata(functions: &[Function]) -> Result<Metadata> {
    let mut bindings = Vec::with_capacity(functions.len() * 2);
    let mut seen = HashSet::new();
    for function in functions {
        let source = Binding {
            kind: BindingKind::DataBlob,
            name: format!("__SF_{}", function.identifier),
            part: function.source_part(),
        };
        push_unique(&mut bindings, &mut seen, source)?;

        for file in &function.files {
            let binding = Binding {
                kind: file.kind,
                name: format!("__{}_{}", file.binding, function.identifier),
                part: function.file_part(file),
            };
            push_unique(&mut bindings, &mut seen, binding)?;
        }
    }

    Ok(Metadata {
        body_part: SCRIPT_PART.to_string(),
        bindings,
    })
}

fn push_unique(
    bindings: &mut Vec<Binding>,
    seen: &mut HashSet<String>,
    binding: Binding,
) -> Result<()> {
    if !seen.insert(binding.name.clone()) {
        return Err(Error::DuplicateBinding(binding.name));
    }
    bindings.push(binding);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn wasm_file(binding: &str) -> FunctionFile {
        FunctionFile {
            content: b"\0asm".to_vec(),
            content_type: "application/wasm".into(),
            extension: "wasm".into(),
            binding: binding.into(),
            kind: BindingKind::WasmModule,
        }
    }

    #[test]
    fn single_function_without_files() {
        let functions = vec![Function::new("fn1", vec![0u8, 1])];
        let body = UploadBody::build(b"console.log(1)", &functions).unwrap();

        let names: Vec<_> = body.part_names().collect();
        assert_eq!(names, vec!["worker.js", "fn1.bin", "metadata"]);
        assert_eq!(body.parts[0].content_type, "application/javascript");
        assert_eq!(body.parts[0].content, b"console.log(1)".to_vec());
        assert_eq!(body.parts[1].content, vec![0u8, 1]);
        assert_eq!(body.parts[2].file_name, "metadata.json");

        let json: serde_json::Value = serde_json::from_slice(&body.parts[2].content).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "body_part": "worker.js",
                "bindings": [{"type": "data_blob", "name": "__SF_fn1", "part": "fn1.bin"}]
            })
        );
    }

    #[test]
    fn part_count_and_bindings_match() {
        let functions = vec![
            Function::new("a", b"a".to_vec()).with_file(wasm_file("WASM")),
            Function::new("b", b"b".to_vec()),
            Function::new("c", b"c".to_vec())
                .with_file(wasm_file("WASM"))
                .with_file(FunctionFile {
                    content: b"{}".to_vec(),
                    content_type: "application/json".into(),
                    extension: "json".into(),
                    binding: "CONFIG".into(),
                    kind: BindingKind::TextBlob,
                }),
        ];
        let body = UploadBody::build(b"", &functions).unwrap();

        // script + 3 sources + 3 files + metadata
        assert_eq!(body.parts.len(), 1 + 3 + 3 + 1);
        assert_eq!(body.metadata.bindings.len(), 3 + 3);

        let inner: HashSet<_> = body.parts[1..body.parts.len() - 1]
            .iter()
            .map(|p| p.name.clone())
            .collect();
        let bound: HashSet<_> = body.metadata.bindings.iter().map(|b| b.part.clone()).collect();
        assert_eq!(inner, bound);
        assert_eq!(inner.len(), body.metadata.bindings.len());

        let c_config = &body.metadata.bindings[5];
        assert_eq!(c_config.name, "__CONFIG_c");
        assert_eq!(c_config.part, "c.json");
        assert_eq!(c_config.kind, BindingKind::TextBlob);
        assert_eq!(
            serde_json::to_value(c_config).unwrap()["type"],
            serde_json::json!("text_blob")
        );
        assert_eq!(body.parts[6].content_type, "application/json");
    }

    #[test]
    fn duplicate_binding_names_are_rejected() {
        let mut text = wasm_file("WASM");
        text.extension = "wat".into();
        let functions = vec![Function::new("fn1", b"x".to_vec())
            .with_file(wasm_file("WASM"))
            .with_file(text)];
        match UploadBody::build(b"", &functions) {
            Err(Error::DuplicateBinding(name)) => assert_eq!(name, "__WASM_fn1"),
            other => panic!("expected duplicate binding error, got {:?}", other),
        }
    }

    #[test]
    fn files_sharing_an_extension_are_rejected() {
        let functions = vec![Function::new("fn1", b"x".to_vec())
            .with_file(wasm_file("A"))
            .with_file(wasm_file("B"))];
        match UploadBody::build(b"", &functions) {
            Err(Error::DuplicatePart(name)) => assert_eq!(name, "fn1.wasm"),
            other => panic!("expected duplicate part error, got {:?}", other),
        }
    }

    #[test]
    fn repeated_identifiers_are_rejected() {
        let functions = vec![
            Function::new("fn1", b"x".to_vec()),
            Function::new("fn1", b"y".to_vec()),
        ];
        match UploadBody::build(b"", &functions) {
            Err(Error::DuplicatePart(name)) => assert_eq!(name, "fn1.bin"),
            other => panic!("expected duplicate part error, got {:?}", other),
        }
    }

    #[test]
    fn script_part_name_is_reserved() {
        let mut js = wasm_file("JS");
        js.extension = "js".into();
        js.content_type = "application/javascript".into();
        let functions = vec![Function::new("worker", b"x".to_vec()).with_file(js)];
        match UploadBody::build(b"", &functions) {
            Err(Error::DuplicatePart(name)) => assert_eq!(name, "worker.js"),
            other => panic!("expected duplicate part error, got {:?}", other),
        }
    }

    #[test]
    fn metadata_survives_json() {
        let functions = vec![Function::new("fn1", b"x".to_vec()).with_file(wasm_file("WASM"))];
        let metadata = build_metadata(&functions).unwrap();
        let raw = serde_json::to_string(&metadata).unwrap();
        assert!(raw.contains(r#""type":"wasm_module""#));
        let decoded: Metadata = serde_json::from_str(&raw).unwrap();
        assert_eq!(decoded, metadata);
    }

    #[test]
    fn no_functions_still_has_script_and_metadata() {
        let body = UploadBody::build(b"export default {}", &[]).unwrap();
        let names: Vec<_> = body.part_names().collect();
        assert_eq!(names, vec!["worker.js", "metadata"]);
        assert!(body.metadata.bindings.is_empty());
    }

    #[test]
    fn invalid_content_type_fails_form_assembly() {
        let mut file = wasm_file("WASM");
        file.content_type = "not a mime\n".into();
        let functions = vec![Function::new("f", b"x".to_vec()).with_file(file)];
        let body = UploadBody::build(b"", &functions).unwrap();
        assert!(matches!(body.into_form(), Err(Error::Request { .. })));
    }
}
