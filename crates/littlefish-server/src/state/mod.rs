/*
[INPUT]:  Server configuration (storage paths, seed users)
[OUTPUT]: User datastore and login session store
[POS]:    State layer - shared server state
[UPDATE]: When adding new persisted or in-memory state
*/

pub mod sessions;
pub mod storage;

pub use sessions::{Session, SessionStore};
pub use storage::{StoreError, StoreResult, UserStore};
