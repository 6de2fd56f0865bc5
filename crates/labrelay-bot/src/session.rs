//! Per-user GitLab sessions.
//!
//! A session is never stored: it is derived from the credential store on
//! every command. "No stored token" is the only meaning of "not logged in".

use std::sync::Arc;

use labrelay_gitlab::{ClientFactory, GitlabApi};
use labrelay_persistence::CredentialStore;
use tracing::{info, warn};

/// A GitLab client bound to one user's token.
pub type Session = Arc<dyn GitlabApi>;

/// Turns chat users into GitLab sessions.
pub struct SessionResolver {
    store: Arc<CredentialStore>,
    factory: Arc<dyn ClientFactory>,
}

impl SessionResolver {
    pub fn new(store: Arc<CredentialStore>, factory: Arc<dyn ClientFactory>) -> Self {
        Self { store, factory }
    }

    /// The session for `user_id`, if they are logged in.
    pub fn resolve(&self, user_id: &str) -> Option<Session> {
        self.store
            .get(user_id)
            .map(|token| self.factory.connect(&token))
    }

    /// Checks `token` against GitLab and stores it on success.
    ///
    /// Returns the reply for the user in every case.
    pub async fn login(&self, user_id: &str, token: &str) -> String {
        let api = self.factory.connect(token);
        match api.current_user().await {
            Ok(user) => {
                self.store.put(user_id, token);
                info!(user = %user_id, gitlab_user = %user.username, "GitLab login succeeded");
                format!(
                    "Successfully logged into GitLab at {} as {}",
                    self.factory.host(),
                    user.name
                )
            }
            Err(e) if e.is_unauthorized() => {
                info!(user = %user_id, "GitLab login rejected");
                "Invalid access token!".to_string()
            }
            Err(e) => {
                warn!(user = %user_id, error = %e, "GitLab login failed");
                format!("GitLab login failed: {}", e)
            }
        }
    }

    /// Forgets the token of `user_id`. Logging out twice is fine.
    pub fn logout(&self, user_id: &str) {
        if self.store.remove(user_id) {
            info!(user = %user_id, "GitLab token removed");
        }
    }

    /// Web base URL of the GitLab instance.
    pub fn domain(&self) -> &str {
        self.factory.domain()
    }

    /// Host name of the GitLab instance.
    pub fn host(&self) -> &str {
        self.factory.host()
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }
}
