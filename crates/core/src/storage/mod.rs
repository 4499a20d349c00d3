mod changes;
mod error;
mod failure;
mod query;
mod traits;

pub use changes::{ChangeSet, Mutation, Operation, TrackedEntity, UniqueKey};
pub use error::{RepositoryError, Result};
pub use failure::{classify, status_code_hint, FailureClass};
pub use query::{find_by_identity, find_stored, query};
pub use traits::{Deleted, Dto, Repository, Store};
