//! Persistence layer for labrelay.
//!
//! Provides crash-safe JSON persistence (write to temp file, then rename) and
//! the credential store that maps chat users to their GitLab access tokens.
//!
//! # Example
//!
//! ```no_run
//! use labrelay_persistence::CredentialStore;
//!
//! let store = CredentialStore::load("tokens.json").unwrap();
//! store.put("@alice:example.org", "glpat-xxxx");
//! assert_eq!(store.get("@alice:example.org").as_deref(), Some("glpat-xxxx"));
//! ```

pub mod atomic;
pub mod credentials;
pub mod error;

pub use credentials::CredentialStore;
pub use error::{PersistenceError, Result};
