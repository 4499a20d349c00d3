//! Pure functions for serializing/deserializing values to/from cache bytes.
//!
//! Values are stored as JSON so cache contents stay human-readable and easy
//! to inspect with a plain client.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during cache serialization/deserialization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerializationError {
    /// Failed to serialize a value to bytes.
    #[error("Failed to serialize: {0}")]
    SerializeFailed(String),
    /// Failed to deserialize bytes to a value.
    #[error("Failed to deserialize: {0}")]
    DeserializeFailed(String),
}

/// Result type for serialization operations.
pub type Result<T> = std::result::Result<T, SerializationError>;

/// Serializes a value to JSON bytes.
pub fn serialize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| SerializationError::SerializeFailed(e.to_string()))
}

/// Deserializes JSON bytes to a value.
pub fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| SerializationError::DeserializeFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Note;

    #[test]
    fn test_roundtrip_entity_keeps_audit_and_drops_events() {
        use crate::entity::Entity;
        use crate::events::DomainEvent;

        let mut note = Note::new("cached");
        note.raise(DomainEvent::Created(note.clone()));

        let bytes = serialize(&note).expect("serialize should succeed");
        let back: Note = deserialize(&bytes).expect("deserialize should succeed");

        assert_eq!(back.id, note.id);
        assert_eq!(back.body, "cached");
        assert_eq!(back.audit, note.audit);
        assert!(back.events.is_empty());
    }

    #[test]
    fn test_serialize_empty_list() {
        let notes: Vec<Note> = vec![];
        assert_eq!(serialize(&notes).unwrap(), b"[]");
    }

    #[test]
    fn test_option_none_is_null() {
        let bytes = serialize(&Option::<Note>::None).unwrap();
        assert_eq!(bytes, b"null");
        assert!(deserialize::<Option<Note>>(&bytes).unwrap().is_none());
    }

    #[test]
    fn test_deserialize_malformed_bytes() {
        let err = deserialize::<Note>(b"not valid json").unwrap_err();
        assert!(matches!(err, SerializationError::DeserializeFailed(_)));
    }

    #[test]
    fn test_deserialize_wrong_shape() {
        let err = deserialize::<Vec<Note>>(b"{\"invalid\": true}").unwrap_err();
        assert!(matches!(err, SerializationError::DeserializeFailed(_)));
    }
}
