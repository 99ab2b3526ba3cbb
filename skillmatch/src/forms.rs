//! Form payloads and their validation
//!
//! Every form deserializes from `application/x-www-form-urlencoded` with all
//! fields as text, so a bad value produces a form-level message instead of a
//! rejected request. `validate` turns the raw payload into cleaned values.

use serde::Deserialize;
use std::fmt;

const MAX_CATEGORY_LEN: usize = 100;
const MAX_NAME_LEN: usize = 200;

/// Form-level validation messages, shown above the form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(Vec<String>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(message: impl Into<String>) -> Self {
        Self(vec![message.into()])
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }

    /// Append another set of messages after these
    pub fn merge(&mut self, other: FormErrors) {
        self.0.extend(other.0);
    }

    /// `Ok(value)` when no message was recorded
    pub fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("; "))
    }
}

impl std::error::Error for FormErrors {}

fn required(errors: &mut FormErrors, label: &str, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(format!("{} is required.", label));
    }
    trimmed.to_string()
}

fn max_len(errors: &mut FormErrors, label: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.push(format!("{} must be at most {} characters.", label, max));
    }
}

fn parse_number(errors: &mut FormErrors, label: &str, value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => Some(n),
        _ => {
            errors.push(format!("{} must be a number.", label));
            None
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Seeker sign-up
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeekerRegistrationForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeekerRegistration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub location: String,
}

impl SeekerRegistrationForm {
    pub fn validate(&self) -> Result<SeekerRegistration, FormErrors> {
        let mut errors = FormErrors::new();
        let username = required(&mut errors, "Username", &self.username);
        max_len(&mut errors, "Username", &username, 150);
        if self.password.is_empty() {
            errors.push("Password is required.");
        }
        errors.into_result(SeekerRegistration {
            username,
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            location: self.location.trim().to_string(),
        })
    }
}

/// Provider onboarding step 1: the account
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderAccountForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl ProviderAccountForm {
    pub fn validate(&self) -> Result<ProviderAccount, FormErrors> {
        let mut errors = FormErrors::new();
        let username = required(&mut errors, "Username", &self.username);
        max_len(&mut errors, "Username", &username, 150);
        if self.password.is_empty() {
            errors.push("Password is required.");
        }
        if self.password != self.confirm_password {
            errors.push("Passwords do not match");
        }
        errors.into_result(ProviderAccount {
            username,
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        })
    }
}

/// Provider onboarding step 2: the company profile.
/// Built from multipart text fields rather than deserialized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderProfileForm {
    pub company_name: String,
    pub contact_number: String,
    pub address: String,
    pub service_category: String,
    pub location: String,
    pub description: String,
    pub latitude: String,
    pub longitude: String,
}

impl ProviderProfileForm {
    /// Set a field by its form name; unknown names are ignored
    pub fn set_field(&mut self, name: &str, value: String) {
        match name {
            "company_name" => self.company_name = value,
            "contact_number" => self.contact_number = value,
            "address" => self.address = value,
            "service_category" => self.service_category = value,
            "location" => self.location = value,
            "description" => self.description = value,
            "latitude" => self.latitude = value,
            "longitude" => self.longitude = value,
            _ => {}
        }
    }

    pub fn validate(&self) -> Result<crate::models::NewProviderProfile, FormErrors> {
        let mut errors = FormErrors::new();
        let company_name = required(&mut errors, "Company name", &self.company_name);
        max_len(&mut errors, "Company name", &company_name, MAX_NAME_LEN);
        max_len(&mut errors, "Service category", self.service_category.trim(), MAX_CATEGORY_LEN);

        let latitude = parse_number(&mut errors, "Latitude", &self.latitude);
        let longitude = parse_number(&mut errors, "Longitude", &self.longitude);
        let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
            errors.push("You must pin your company location on the map before submitting.");
            return Err(errors);
        };

        errors.into_result(crate::models::NewProviderProfile {
            company_name,
            service_category: self.service_category.trim().to_string(),
            description: self.description.trim().to_string(),
            location: self.location.trim().to_string(),
            address: self.address.trim().to_string(),
            contact_number: self.contact_number.trim().to_string(),
            latitude,
            longitude,
        })
    }
}

/// One of the onboarding document upload slots
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentUpload {
    pub document_name: String,
    pub file_name: String,
    pub content: Vec<u8>,
}

impl DocumentUpload {
    /// Slots without a file are skipped
    pub fn has_file(&self) -> bool {
        !self.file_name.is_empty() && !self.content.is_empty()
    }

    /// Display name, falling back to the uploaded file name
    pub fn display_name(&self) -> &str {
        let name = self.document_name.trim();
        if name.is_empty() { &self.file_name } else { name }
    }
}

/// A slot that names a file but carries no bytes is an error, not a skip
pub fn validate_uploads(uploads: &[DocumentUpload]) -> Result<(), FormErrors> {
    let mut errors = FormErrors::new();
    for upload in uploads {
        if !upload.file_name.is_empty() && upload.content.is_empty() {
            errors.push("The submitted file is empty.");
        }
    }
    errors.into_result(())
}

/// Add/edit service
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceForm {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub min_price: String,
    #[serde(default)]
    pub max_price: String,
}

/// Cleaned service fields; the category is resolved to a row later
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceInput {
    pub category: String,
    pub title: String,
    pub description: String,
    pub min_price: f64,
    pub max_price: f64,
}

impl ServiceForm {
    pub fn validate(&self) -> Result<ServiceInput, FormErrors> {
        let mut errors = FormErrors::new();
        let category = required(&mut errors, "Category", &self.category);
        max_len(&mut errors, "Category", &category, MAX_CATEGORY_LEN);
        let title = required(&mut errors, "Title", &self.title);
        max_len(&mut errors, "Title", &title, MAX_NAME_LEN);
        let min_price = parse_number(&mut errors, "Minimum price", &self.min_price);
        let max_price = parse_number(&mut errors, "Maximum price", &self.max_price);
        if min_price.is_none() && self.min_price.trim().is_empty() {
            errors.push("Minimum price is required.");
        }
        if max_price.is_none() && self.max_price.trim().is_empty() {
            errors.push("Maximum price is required.");
        }

        errors.into_result(ServiceInput {
            category,
            title,
            description: self.description.trim().to_string(),
            min_price: min_price.unwrap_or_default(),
            max_price: max_price.unwrap_or_default(),
        })
    }

    /// Pre-fill from an existing service for the edit page
    pub fn from_service(service: &crate::models::Service) -> Self {
        Self {
            category: service.category.name.clone(),
            title: service.title.clone(),
            description: service.description.clone(),
            min_price: service.min_price.to_string(),
            max_price: service.max_price.to_string(),
        }
    }
}

/// Seeker's new request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestForm {
    #[serde(default)]
    pub service_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestInput {
    pub service_type: String,
    pub description: String,
    pub location: String,
}

impl RequestForm {
    pub fn validate(&self) -> Result<RequestInput, FormErrors> {
        let mut errors = FormErrors::new();
        let service_type = required(&mut errors, "Service type", &self.service_type);
        max_len(&mut errors, "Service type", &service_type, MAX_CATEGORY_LEN);
        let location = required(&mut errors, "Location", &self.location);
        max_len(&mut errors, "Location", &location, MAX_CATEGORY_LEN);
        let description = required(&mut errors, "Description", &self.description);
        errors.into_result(RequestInput {
            service_type,
            description,
            location,
        })
    }
}
