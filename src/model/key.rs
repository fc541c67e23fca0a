use super::attributes::AttributeState;
use super::descriptor::EntityDescriptor;
use crate::core::{ItemKey, ModelError, Result, Value};

/// Reads the composite key from the live attribute values.
///
/// Absent key attributes derive as `Null`; completeness is checked by
/// callers that need it.
pub fn derive_key(descriptor: &EntityDescriptor, state: &AttributeState) -> ItemKey {
    descriptor
        .key_names()
        .map(|name| {
            let value = state.get(name).cloned().unwrap_or(Value::Null);
            (name.to_string(), value)
        })
        .collect()
}

/// Fails with a precondition violation naming the first empty key attribute.
pub fn ensure_complete(descriptor: &EntityDescriptor, key: &ItemKey) -> Result<()> {
    for name in descriptor.key_names() {
        let missing = key.get(name).is_none_or(Value::is_empty_key_part);
        if missing {
            return Err(ModelError::PreconditionViolation {
                table: descriptor.table_name.clone(),
                attribute: name.to_string(),
            });
        }
    }
    Ok(())
}
