//! Canonical encoding and fingerprinting of actions
//!
//! Two descriptors with the same logical content always encode to the same
//! bytes: object keys are sorted at every nesting level and scalars are
//! rendered by `serde_json`. The fingerprint is the SHA-256 of those bytes.
//! Description and working directory are provenance metadata and are not
//! part of the encoding.

use crate::descriptor::ActionDescriptor;
use crate::error::{ProvcacheError, ProvcacheResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Domain tag prefixed to every canonical form
const ENCODING_TAG: &[u8] = b"provcache.action.v1\n";

/// Deepest JSON nesting accepted in inputs or parameters
pub const MAX_NESTING_DEPTH: usize = 128;

/// Content identity of an action (64 lowercase hex chars)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an already-computed hex digest
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Parse a stored digest, requiring 64 lowercase hex chars
    pub fn parse(hex: &str) -> ProvcacheResult<Self> {
        let valid = hex.len() == 64
            && hex
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !valid {
            return Err(ProvcacheError::encoding(
                "fingerprint",
                format!("expected 64 lowercase hex chars, got '{hex}'"),
            ));
        }
        Ok(Self(hex.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex chars, for display
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical byte form of an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalForm {
    bytes: Vec<u8>,
    inputs: String,
    parameters: String,
}

impl CanonicalForm {
    /// Full canonical bytes, including the domain tag
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Canonical JSON of the inputs mapping
    pub fn inputs_json(&self) -> &str {
        &self.inputs
    }

    /// Canonical JSON of the parameters mapping
    pub fn parameters_json(&self) -> &str {
        &self.parameters
    }

    pub fn fingerprint(&self) -> Fingerprint {
        let digest = Sha256::digest(&self.bytes);
        Fingerprint(hex::encode(digest))
    }
}

/// Encode an action's identity-bearing fields canonically
pub fn encode(descriptor: &ActionDescriptor) -> ProvcacheResult<CanonicalForm> {
    let inputs = serde_json::to_value(descriptor.inputs())?;
    let parameters = serde_json::to_value(descriptor.parameters())?;

    let inputs = canonical_json(&inputs, "inputs")?;
    let parameters = canonical_json(&parameters, "parameters")?;

    let envelope = serde_json::json!({
        "action": descriptor.action(),
        "action_type": descriptor.action_type().as_str(),
        "name": descriptor.name(),
    });
    let mut bytes = ENCODING_TAG.to_vec();
    bytes.extend_from_slice(canonical_json(&envelope, "descriptor")?.as_bytes());
    bytes.push(b'\n');
    bytes.extend_from_slice(inputs.as_bytes());
    bytes.push(b'\n');
    bytes.extend_from_slice(parameters.as_bytes());

    Ok(CanonicalForm {
        bytes,
        inputs,
        parameters,
    })
}

/// Render a JSON value with lexicographically sorted object keys
///
/// Independent of whether `serde_json` was built with `preserve_order`.
pub fn canonical_json(value: &serde_json::Value, field: &str) -> ProvcacheResult<String> {
    let mut out = String::new();
    write_canonical(value, field, 0, &mut out)?;
    Ok(out)
}

fn write_canonical(
    value: &serde_json::Value,
    field: &str,
    depth: usize,
    out: &mut String,
) -> ProvcacheResult<()> {
    use serde_json::Value;

    if depth > MAX_NESTING_DEPTH {
        return Err(ProvcacheError::encoding(
            field,
            format!("nesting deeper than {MAX_NESTING_DEPTH} levels"),
        ));
    }

    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_canonical(&map[key], field, depth + 1, out)?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, field, depth + 1, out)?;
            }
            out.push(']');
        }
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }
    Ok(())
}

/// SHA-256 hex digest of a file's contents
pub fn file_digest(path: &Path) -> ProvcacheResult<String> {
    let mut file = fs::File::open(path)
        .map_err(|e| ProvcacheError::io(format!("opening {}", path.display()), e))?;

    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| ProvcacheError::io(format!("reading {}", path.display()), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Whether two artifact files have identical contents
pub fn same_content(origin: &Path, current: &Path) -> ProvcacheResult<bool> {
    let origin_digest = file_digest(origin)?;
    let current_digest = file_digest(current)?;
    debug!(
        "Digest {} = {}, {} = {}",
        origin.display(),
        origin_digest,
        current.display(),
        current_digest
    );
    Ok(origin_digest == current_digest)
}
