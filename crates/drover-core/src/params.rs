//! Parameter blobs handed to dispatched programs.
//!
//! Parameters are a JSON object, base64 encoded (URL-safe alphabet, no
//! padding) so the blob is a single shell word on a script command line.

use base64::prelude::*;
use camino::Utf8Path;
use serde_json::{Map, Value};
use thiserror::Error;

pub type Params = Map<String, Value>;

#[derive(Error, Debug)]
pub enum ParamsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Parameters are not a JSON object")]
    NotAnObject,
    #[error("Missing required parameters: {}", .0.join(", "))]
    MissingRequired(Vec<String>),
}

/// Encode parameters into a blob.
pub fn encode_params(params: &Params) -> Result<String, ParamsError> {
    let json = serde_json::to_vec(params)?;
    Ok(BASE64_URL_SAFE_NO_PAD.encode(json))
}

/// Decode a blob produced by [`encode_params`].
pub fn decode_params(blob: &str) -> Result<Params, ParamsError> {
    let bytes = BASE64_URL_SAFE_NO_PAD.decode(blob.trim())?;
    match serde_json::from_slice(&bytes)? {
        Value::Object(map) => Ok(map),
        _ => Err(ParamsError::NotAnObject),
    }
}

/// Decode a blob given inline or stored in a file.
pub fn read_params(arg: &str, as_file: bool) -> Result<Params, ParamsError> {
    if as_file {
        let content = std::fs::read_to_string(Utf8Path::new(arg))?;
        decode_params(&content)
    } else {
        decode_params(arg)
    }
}

/// Overlay `given` on `defaults` and check that `required` keys are set.
///
/// A key counts as missing when absent or `null`.
pub fn resolve_params(
    mut defaults: Params,
    given: Params,
    required: &[&str],
) -> Result<Params, ParamsError> {
    defaults.extend(given);

    let missing: Vec<String> = required
        .iter()
        .filter(|key| defaults.get(**key).is_none_or(Value::is_null))
        .map(|key| key.to_string())
        .collect();

    if missing.is_empty() {
        Ok(defaults)
    } else {
        Err(ParamsError::MissingRequired(missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn object(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_blob_is_one_shell_word() {
        let params = object(json!({
            "file_in": ["a b.nc", "c.nc"],
            "file_out": "out.nc",
            "isel": {"time": {"start": 0, "stop": 3}},
        }));
        let blob = encode_params(&params).unwrap();
        assert!(blob
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(decode_params(&blob).unwrap(), params);
    }

    #[test]
    fn test_decode_rejects_non_object() {
        let blob = BASE64_URL_SAFE_NO_PAD.encode(b"[1, 2]");
        assert!(matches!(decode_params(&blob), Err(ParamsError::NotAnObject)));
        assert!(matches!(decode_params("%%%"), Err(ParamsError::Base64(_))));
    }

    #[test]
    fn test_read_params_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("params.b64");
        let params = object(json!({"file_out": "x.nc"}));
        std::fs::write(&path, encode_params(&params).unwrap() + "\n").unwrap();

        let loaded = read_params(path.to_str().unwrap(), true).unwrap();
        assert_eq!(loaded, params);
    }

    #[test]
    fn test_resolve_params_checks_required() {
        let defaults = object(json!({"file_in": null, "file_out": null, "clobber": false}));

        let resolved = resolve_params(
            defaults.clone(),
            object(json!({"file_in": "a.nc", "file_out": "b.nc"})),
            &["file_in", "file_out"],
        )
        .unwrap();
        assert_eq!(resolved["clobber"], json!(false));
        assert_eq!(resolved["file_in"], json!("a.nc"));

        match resolve_params(defaults, object(json!({"file_in": "a.nc"})), &["file_in", "file_out"]) {
            Err(ParamsError::MissingRequired(missing)) => assert_eq!(missing, vec!["file_out"]),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
