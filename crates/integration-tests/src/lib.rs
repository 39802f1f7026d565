//! Integration tests for GOMFLOW.
//!
//! # Running Tests
//!
//! ```bash
//! # Pure tests (no services needed)
//! cargo test -p gomflow-integration-tests
//!
//! # Include the database-backed flows
//! GOMFLOW_TEST_DATABASE_URL=postgres://localhost/gomflow_test \
//!     cargo test -p gomflow-integration-tests
//! ```
//!
//! Database-backed tests return early when `GOMFLOW_TEST_DATABASE_URL` is not
//! set. Each test creates its own profile and orders, so tests can share one
//! database.
//!
//! # Test Categories
//!
//! - `order_lifecycle` - Status rules and the worked examples
//! - `codes` - Slug and tracking code generation
//! - `guest_flow` - Order creation, guest submissions, tracking, sweeps and
//!   concurrent intake (database)
//! - `sessions` - Expired session cleanup (database)

use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use sqlx::PgPool;
use url::Url;

use gomflow_core::{Country, Email, Price, ProfileId};
use gomflow_web::config::BackendConfig;
use gomflow_web::db::ProfileRepository;
use gomflow_web::models::{NewOrder, NewProfile, PaymentDetails, Profile};
use gomflow_web::services::storage::StorageClient;

/// Environment variable naming the test database.
pub const TEST_DATABASE_URL: &str = "GOMFLOW_TEST_DATABASE_URL";

/// Connect to the test database and apply migrations.
///
/// Returns `None` when no test database is configured.
///
/// # Panics
///
/// Panics if the database is configured but unreachable or a migration fails.
pub async fn test_pool() -> Option<PgPool> {
    let url = std::env::var(TEST_DATABASE_URL).ok()?;
    let pool = PgPool::connect(&url)
        .await
        .expect("Failed to connect to test database");
    sqlx::migrate!("../web/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    Some(pool)
}

/// Storage client pointed at an unroutable backend.
///
/// Flows without uploads never reach it.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn offline_storage() -> StorageClient {
    let config = BackendConfig {
        url: Url::parse("http://127.0.0.1:9").expect("valid url"),
        anon_key: SecretString::from("anon"),
        service_key: SecretString::from("service-role-key"),
    };
    StorageClient::new(&config).expect("storage client")
}

/// A unique email for a test profile.
///
/// # Panics
///
/// Never in practice: the generated address is always valid.
#[must_use]
pub fn unique_email(prefix: &str) -> Email {
    Email::parse(&format!("{prefix}-{}@gomflow.test", uuid::Uuid::new_v4())).expect("valid email")
}

/// Create a GOM profile operating in the Philippines.
///
/// # Panics
///
/// Panics if a query fails.
pub async fn create_gom(pool: &PgPool) -> Profile {
    let profiles = ProfileRepository::new(pool);
    let (profile, _) = profiles
        .provision(&NewProfile {
            id: ProfileId::random(),
            email: unique_email("gom"),
            discord_id: None,
            discord_username: Some("test-gom".to_owned()),
        })
        .await
        .expect("provision profile");
    profiles
        .become_gom(profile.id, Country::Ph)
        .await
        .expect("become gom")
}

/// A valid GCash order for `gom_id` with the given MOQ and deadline.
///
/// # Panics
///
/// Never in practice: the price literal is valid.
#[must_use]
pub fn gcash_order(gom_id: ProfileId, moq: i32, deadline: DateTime<Utc>) -> NewOrder {
    let mut payment_details = PaymentDetails::new();
    payment_details.insert("gcash".to_owned(), "0917 000 0000".to_owned());
    NewOrder {
        gom_id,
        product_name: "Album Pre-order Ver. A".to_owned(),
        product_description: Some("Sealed, with pre-order benefit".to_owned()),
        product_image_url: None,
        price: Price::parse("850.00", "PHP").expect("valid price"),
        country: Country::Ph,
        payment_methods: vec!["gcash".to_owned()],
        payment_details,
        minimum_order_quantity: moq,
        deadline,
    }
}

/// A deadline `days` from `now`.
#[must_use]
pub fn days_from(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now + Duration::days(days)
}
