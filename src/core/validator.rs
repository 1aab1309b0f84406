use crate::domain::model::ValidatedBundle;
use crate::utils::error::ValidationError;
use serde_json::Value;

/// 只做結構檢查：`type == "bundle"` 且 `objects` 為非空陣列
pub fn validate(bytes: &[u8]) -> Result<ValidatedBundle, ValidationError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| ValidationError::malformed(e.to_string()))?;

    let object = value
        .as_object()
        .ok_or_else(|| ValidationError::unexpected_shape("top-level value is not a JSON object"))?;

    match object.get("type").and_then(Value::as_str) {
        Some("bundle") => {}
        Some(other) => {
            return Err(ValidationError::unexpected_shape(format!(
                "expected type 'bundle', found '{}'",
                other
            )))
        }
        None => return Err(ValidationError::unexpected_shape("missing 'type' discriminator")),
    }

    let object_count = match object.get("objects") {
        Some(Value::Array(items)) if !items.is_empty() => items.len(),
        Some(Value::Array(_)) => {
            return Err(ValidationError::unexpected_shape("'objects' collection is empty"))
        }
        Some(_) => return Err(ValidationError::unexpected_shape("'objects' is not an array")),
        None => return Err(ValidationError::unexpected_shape("missing 'objects' collection")),
    };

    Ok(ValidatedBundle {
        value,
        object_count,
    })
}
