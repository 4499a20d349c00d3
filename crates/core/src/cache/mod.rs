mod error;
mod keys;
mod serialization;
mod traits;

pub use error::{CacheError, Result};
pub use keys::{by_id_key, dto_key, entity_key, entity_value_key, list_key, operations};
pub use serialization::{deserialize, serialize, SerializationError};
pub use traits::{get_or_populate, put, Cache};
