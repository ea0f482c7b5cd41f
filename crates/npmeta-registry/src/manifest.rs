//! Parsing of `package.json` into version metadata.

use serde_json::{Map, Value};

use crate::error::{RegistryError, Result};

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// A parsed package manifest.
///
/// `name` and `version` are copied out for routing; `document` keeps every
/// field of the original manifest in source order, with `dist.tarball`
/// already pointing at the locator it was ingested from.
#[derive(Clone, Debug, PartialEq)]
pub struct Manifest {
    /// Package name, empty when missing or not a string.
    pub name: String,
    /// Version string, empty when missing or not a string.
    pub version: String,
    pub document: Map<String, Value>,
}

impl Manifest {
    /// Whether both `name` and `version` are present.
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.version.is_empty()
    }

    /// Consumes the manifest, returning the JSON stored for this version.
    pub fn into_version_metadata(self) -> Value {
        Value::Object(self.document)
    }
}

/// Parses manifest bytes and records `locator` as the distribution tarball.
///
/// Any existing `dist` object keeps its other keys (`shasum`, `integrity`);
/// a missing or non-object `dist` is replaced by `{ "tarball": locator }`.
///
/// # Errors
///
/// * [`RegistryError::MalformedManifest`] if the bytes are not valid JSON
/// * [`RegistryError::ManifestNotObject`] if the JSON is not an object
pub fn parse_manifest(bytes: &[u8], locator: &str) -> Result<Manifest> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let value: Value = serde_json::from_slice(bytes)
        .map_err(|source| RegistryError::MalformedManifest { source })?;

    let Value::Object(mut document) = value else {
        return Err(RegistryError::ManifestNotObject);
    };

    let name = string_field(&document, "name");
    let version = string_field(&document, "version");

    let tarball = Value::String(locator.to_string());
    match document.get_mut("dist") {
        Some(Value::Object(dist)) => {
            dist.insert("tarball".to_string(), tarball);
        }
        _ => {
            let mut dist = Map::new();
            dist.insert("tarball".to_string(), tarball);
            document.insert("dist".to_string(), Value::Object(dist));
        }
    }

    Ok(Manifest {
        name,
        version,
        document,
    })
}

fn string_field(document: &Map<String, Value>, key: &str) -> String {
    document
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_manifest() {
        let raw = br#"{"name":"foo","version":"1.0.0","main":"index.js"}"#;
        let manifest = parse_manifest(raw, "foo/foo-1.0.0.tgz").unwrap();

        assert_eq!(manifest.name, "foo");
        assert_eq!(manifest.version, "1.0.0");
        assert!(manifest.is_complete());
        assert_eq!(
            manifest.into_version_metadata(),
            json!({
                "name": "foo",
                "version": "1.0.0",
                "main": "index.js",
                "dist": { "tarball": "foo/foo-1.0.0.tgz" }
            })
        );
    }

    #[test]
    fn test_field_order_preserved() {
        let raw = br#"{"version":"2.0.0","zeta":1,"name":"bar","alpha":2}"#;
        let manifest = parse_manifest(raw, "k").unwrap();
        let keys: Vec<_> = manifest.document.keys().map(String::as_str).collect();
        assert_eq!(keys, ["version", "zeta", "name", "alpha", "dist"]);
    }

    #[test]
    fn test_existing_dist_object_keeps_other_keys() {
        let raw = br#"{"name":"foo","version":"1.0.0","dist":{"tarball":"https://old/foo.tgz","shasum":"abc"}}"#;
        let manifest = parse_manifest(raw, "new-key").unwrap();
        assert_eq!(
            manifest.document["dist"],
            json!({ "tarball": "new-key", "shasum": "abc" })
        );
    }

    #[test]
    fn test_non_object_dist_replaced() {
        let raw = br#"{"name":"foo","version":"1.0.0","dist":"oops"}"#;
        let manifest = parse_manifest(raw, "k").unwrap();
        assert_eq!(manifest.document["dist"], json!({ "tarball": "k" }));
    }

    #[test]
    fn test_missing_or_non_string_fields_are_empty() {
        let manifest = parse_manifest(br#"{"version":1}"#, "k").unwrap();
        assert_eq!(manifest.name, "");
        assert_eq!(manifest.version, "");
        assert!(!manifest.is_complete());
    }

    #[test]
    fn test_bom_is_skipped() {
        let raw = b"\xef\xbb\xbf{\"name\":\"foo\",\"version\":\"1.0.0\"}";
        let manifest = parse_manifest(raw, "k").unwrap();
        assert_eq!(manifest.name, "foo");
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = parse_manifest(b"{\"name\":", "k").unwrap_err();
        assert!(matches!(err, RegistryError::MalformedManifest { .. }));
        assert!(err.is_corrupt());
    }

    #[test]
    fn test_non_object_is_rejected() {
        let err = parse_manifest(b"[1,2,3]", "k").unwrap_err();
        assert!(matches!(err, RegistryError::ManifestNotObject));
    }
}
