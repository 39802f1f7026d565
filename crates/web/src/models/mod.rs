//! Domain models for the web application.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db`].

pub mod order;
pub mod profile;
pub mod session;
pub mod submission;

pub use order::{GroupOrder, NewOrder, OrderInputError, PaymentDetails};
pub use profile::{NewProfile, Profile};
pub use session::CurrentUser;
pub use submission::{
    NewSubmission, Shipment, Submission, SubmissionInputError, Submitter, TrackedSubmission,
};
