//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use gomflow_core::{Email, ProfileId};

use super::profile::Profile;

/// Session-stored user identity.
///
/// The GOM flag is not cached here; GOM-only pages re-read the profile so a
/// promotion takes effect without signing in again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Profile ID (same as the auth provider user id).
    pub id: ProfileId,
    /// User's email address.
    pub email: Email,
}

impl From<&Profile> for CurrentUser {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id,
            email: profile.email.clone(),
        }
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the PKCE code verifier of an in-flight OAuth login.
    pub const PKCE_VERIFIER: &str = "pkce_verifier";
}
