//! JSON Patch (RFC 6902) operations: representation and application.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A single patch operation.
///
/// Only the three ops the diff engine emits are modeled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    Add { path: String, value: Value },
    Replace { path: String, value: Value },
    Remove { path: String },
}

impl PatchOp {
    pub fn path(&self) -> &str {
        match self {
            PatchOp::Add { path, .. } => path,
            PatchOp::Replace { path, .. } => path,
            PatchOp::Remove { path } => path,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatchError {
    #[error("path {0:?} does not exist")]
    MissingPath(String),

    #[error("path {0:?} does not address a container")]
    NotAContainer(String),

    #[error("invalid array index {index:?} at {path:?}")]
    BadIndex { path: String, index: String },

    #[error("path {0:?} must start with '/'")]
    BadPointer(String),
}

/// Escape one JSON Pointer segment per RFC 6901.
pub(crate) fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn unescape_pointer(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Apply a patch sequence in order.
pub fn apply_patches(target: &mut Value, patches: &[PatchOp]) -> Result<(), PatchError> {
    for op in patches {
        apply_one(target, op)?;
    }
    Ok(())
}

fn apply_one(target: &mut Value, op: &PatchOp) -> Result<(), PatchError> {
    match op {
        PatchOp::Add { path, value } => add(target, path, value.clone()),
        PatchOp::Replace { path, value } => replace(target, path, value.clone()),
        PatchOp::Remove { path } => remove(target, path),
    }
}

fn split(path: &str) -> Result<Vec<String>, PatchError> {
    if path.is_empty() {
        return Ok(Vec::new());
    }
    let Some(rest) = path.strip_prefix('/') else {
        return Err(PatchError::BadPointer(path.to_string()));
    };
    Ok(rest.split('/').map(unescape_pointer).collect())
}

fn navigate<'a>(target: &'a mut Value, segments: &[String], path: &str) -> Result<&'a mut Value, PatchError> {
    let mut current = target;
    for segment in segments {
        current = match current {
            Value::Object(map) => map
                .get_mut(segment)
                .ok_or_else(|| PatchError::MissingPath(path.to_string()))?,
            Value::Array(items) => {
                let index = parse_index(segment, items.len(), path)?;
                items
                    .get_mut(index)
                    .ok_or_else(|| PatchError::MissingPath(path.to_string()))?
            }
            _ => return Err(PatchError::NotAContainer(path.to_string())),
        };
    }
    Ok(current)
}

fn parse_index(segment: &str, len: usize, path: &str) -> Result<usize, PatchError> {
    let index: usize = segment.parse().map_err(|_| PatchError::BadIndex {
        path: path.to_string(),
        index: segment.to_string(),
    })?;
    if index >= len {
        return Err(PatchError::MissingPath(path.to_string()));
    }
    Ok(index)
}

fn add(target: &mut Value, path: &str, value: Value) -> Result<(), PatchError> {
    let segments = split(path)?;
    let Some((last, parents)) = segments.split_last() else {
        *target = value;
        return Ok(());
    };
    let parent = navigate(target, parents, path)?;
    match parent {
        Value::Object(map) => {
            map.insert(last.clone(), value);
            Ok(())
        }
        Value::Array(items) => {
            if last == "-" {
                items.push(value);
                return Ok(());
            }
            let index: usize = last.parse().map_err(|_| PatchError::BadIndex {
                path: path.to_string(),
                index: last.clone(),
            })?;
            if index > items.len() {
                return Err(PatchError::MissingPath(path.to_string()));
            }
            items.insert(index, value);
            Ok(())
        }
        _ => Err(PatchError::NotAContainer(path.to_string())),
    }
}

fn replace(target: &mut Value, path: &str, value: Value) -> Result<(), PatchError> {
    let segments = split(path)?;
    let slot = navigate(target, &segments, path)?;
    *slot = value;
    Ok(())
}

fn remove(target: &mut Value, path: &str) -> Result<(), PatchError> {
    let segments = split(path)?;
    let Some((last, parents)) = segments.split_last() else {
        *target = Value::Null;
        return Ok(());
    };
    let parent = navigate(target, parents, path)?;
    match parent {
        Value::Object(map) => map
            .remove(last)
            .map(|_| ())
            .ok_or_else(|| PatchError::MissingPath(path.to_string())),
        Value::Array(items) => {
            let index = parse_index(last, items.len(), path)?;
            items.remove(index);
            Ok(())
        }
        _ => Err(PatchError::NotAContainer(path.to_string())),
    }
}
