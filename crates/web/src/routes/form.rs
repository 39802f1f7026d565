//! Multipart form parsing for the order and submission forms.

use std::collections::HashMap;

use axum::extract::Multipart;
use axum::response::{IntoResponse, Redirect, Response};
use chrono::{DateTime, NaiveDateTime, Utc};

use gomflow_core::{Country, Email, OrderId, Price, ProfileId};

use crate::error::AppError;
use crate::models::{NewOrder, NewSubmission, PaymentDetails, Submitter};
use crate::services::ServiceError;
use crate::services::storage::{MAX_UPLOAD_BYTES, UploadedFile};

/// Request body limit for forms carrying one image.
pub const MULTIPART_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 64 * 1024;

/// Prefix of the per-method payment instruction fields.
const PAYMENT_DETAILS_PREFIX: &str = "payment_details_";

/// A parsed multipart body: repeated text fields plus uploaded files.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, Vec<String>>,
    files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    /// Read every part of the body.
    ///
    /// File inputs left empty by the browser are skipped.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the body is not valid multipart.
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("invalid form data: {e}")))?
        {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            if let Some(file_name) = field.file_name().map(str::to_owned) {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_owned();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("invalid upload: {e}")))?;
                if !file_name.is_empty() && !bytes.is_empty() {
                    form.files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            content_type,
                            bytes: bytes.to_vec(),
                        },
                    );
                }
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("invalid form data: {e}")))?;
                form.fields.entry(name).or_default().push(value);
            }
        }
        Ok(form)
    }

    /// First value of a text field.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// First value of a text field, trimmed; blank counts as missing.
    #[must_use]
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.text(name).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Every value of a repeated field, such as a checkbox group.
    #[must_use]
    pub fn all(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Take an uploaded file out of the form.
    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }

    /// Insert a text value.
    pub fn push(&mut self, name: &str, value: &str) {
        self.fields
            .entry(name.to_owned())
            .or_default()
            .push(value.to_owned());
    }

    fn required(&self, name: &str, label: &str) -> Result<&str, String> {
        self.non_empty(name).ok_or_else(|| format!("{label} is required"))
    }

    /// Build a new order from the create-order form.
    ///
    /// # Errors
    ///
    /// Returns a message for the first field that cannot be parsed. Range
    /// checks happen later in [`NewOrder::validate`].
    pub fn new_order(&self, gom_id: ProfileId) -> Result<NewOrder, String> {
        let country = Country::parse(self.required("country", "Country")?)
            .map_err(|e| e.to_string())?;
        let price = Price::parse(
            self.required("price", "Price")?,
            self.required("currency", "Currency")?,
        )
        .map_err(|e| e.to_string())?;
        let minimum_order_quantity = self
            .required("minimum_order_quantity", "Minimum order quantity")?
            .parse::<i32>()
            .map_err(|_| "Minimum order quantity must be a whole number".to_owned())?;
        let deadline = parse_deadline(self.required("deadline", "Deadline")?)?;

        let payment_methods: Vec<String> = self
            .all("payment_methods")
            .iter()
            .map(|m| m.trim().to_owned())
            .filter(|m| !m.is_empty())
            .collect();
        let payment_details: PaymentDetails = self
            .fields
            .iter()
            .filter_map(|(name, values)| {
                let method = name.strip_prefix(PAYMENT_DETAILS_PREFIX)?;
                let value = values.first()?.trim();
                (!value.is_empty()).then(|| (method.to_owned(), value.to_owned()))
            })
            .collect();

        Ok(NewOrder {
            gom_id,
            product_name: self.text("product_name").unwrap_or_default().to_owned(),
            product_description: self.non_empty("product_description").map(str::to_owned),
            product_image_url: None,
            price,
            country,
            payment_methods,
            payment_details,
            minimum_order_quantity,
            deadline,
        })
    }

    /// Build a submission from the order page form.
    ///
    /// A signed-in buyer is recorded by id and the guest email is ignored.
    ///
    /// # Errors
    ///
    /// Returns a message for the first field that cannot be parsed.
    pub fn new_submission(
        &self,
        order_id: OrderId,
        buyer: Option<ProfileId>,
    ) -> Result<NewSubmission, String> {
        let quantity = self
            .required("quantity", "Quantity")?
            .parse::<i32>()
            .map_err(|_| "Quantity must be a whole number".to_owned())?;
        let payment_method = self.required("payment_method", "Payment method")?.to_owned();
        let guest_email = if buyer.is_some() {
            None
        } else {
            Email::parse_optional(self.text("guest_email")).map_err(|e| e.to_string())?
        };
        let submitter = Submitter::resolve(buyer, guest_email).map_err(|e| e.to_string())?;

        Ok(NewSubmission {
            order_id,
            submitter,
            quantity,
            payment_method,
            payment_proof_path: None,
        })
    }
}

/// Redirect back to a form with an error message in the query string.
///
/// The message is escaped by the template on display.
pub fn redirect_with_error(path: &str, message: &str) -> Response {
    Redirect::to(&format!("{path}?error={}", urlencoding::encode(message))).into_response()
}

/// Client-facing message for a rejected form, or the error to propagate.
///
/// # Errors
///
/// Returns the mapped `AppError` when the failure is not the client's.
pub fn form_error(err: ServiceError) -> Result<String, AppError> {
    match AppError::from(err) {
        AppError::BadRequest(msg) | AppError::Conflict(msg) => Ok(msg),
        other => Err(other),
    }
}

/// Parse a deadline from a `datetime-local` input (read as UTC) or RFC 3339.
///
/// # Errors
///
/// Returns a message if neither format matches.
pub fn parse_deadline(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| "Deadline must be a date and time".to_owned())
}
