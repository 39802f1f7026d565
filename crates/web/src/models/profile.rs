//! Profile domain types.

use chrono::{DateTime, Utc};

use gomflow_core::{Country, Email, ProfileId};

/// A user profile, keyed by the hosted-auth user id.
#[derive(Debug, Clone)]
pub struct Profile {
    /// Auth provider user id.
    pub id: ProfileId,
    /// Email reported by the auth provider.
    pub email: Email,
    /// Discord user id, when signed in through Discord.
    pub discord_id: Option<String>,
    /// Discord display name, when signed in through Discord.
    pub discord_username: Option<String>,
    /// Whether the user may run group orders.
    pub is_gom: bool,
    /// Country chosen when becoming a GOM; default for new orders.
    pub country: Option<Country>,
    /// When the profile was provisioned.
    pub created_at: DateTime<Utc>,
}

/// Data for provisioning a profile on first login.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub id: ProfileId,
    pub email: Email,
    pub discord_id: Option<String>,
    pub discord_username: Option<String>,
}
