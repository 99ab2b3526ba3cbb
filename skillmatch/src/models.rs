//! Domain types shared by the repositories, services and web layer

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Account role. Persisted as `user` / `company`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    Seeker,
    #[serde(rename = "company")]
    Provider,
}

impl Role {
    /// Value stored in the `users.role` column
    pub fn as_db(&self) -> &'static str {
        match self {
            Role::Seeker => "user",
            Role::Provider => "company",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Role::Seeker),
            "company" => Some(Role::Provider),
            _ => None,
        }
    }

    /// Get display label for UI
    pub fn label(&self) -> &'static str {
        match self {
            Role::Seeker => "Service Seeker",
            Role::Provider => "Service Provider",
        }
    }
}

/// Lifecycle of a service request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Pending,
    Matched,
    Completed,
}

impl RequestStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Matched => "matched",
            RequestStatus::Completed => "completed",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "pending" => Some(RequestStatus::Pending),
            "matched" => Some(RequestStatus::Matched),
            "completed" => Some(RequestStatus::Completed),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::Matched => "Matched",
            RequestStatus::Completed => "Completed",
        }
    }
}

/// A registered account
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub phone: String,
    pub location: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

impl User {
    pub fn is_provider(&self) -> bool {
        self.role == Role::Provider
    }
}

/// Company profile owned 1:1 by a provider account
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderProfile {
    pub id: i64,
    pub user_id: i64,
    pub company_name: String,
    pub service_category: String,
    pub description: String,
    pub verified: bool,
    pub rating: f64,
    pub location: String,
    pub address: String,
    pub contact_number: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub profile_completed: bool,
}

/// Fields written when a profile is first created during onboarding
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewProviderProfile {
    pub company_name: String,
    pub service_category: String,
    pub description: String,
    pub location: String,
    pub address: String,
    pub contact_number: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// A service offered by a provider
#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    pub id: i64,
    pub provider_id: i64,
    pub category: Category,
    pub title: String,
    pub description: String,
    pub min_price: f64,
    pub max_price: f64,
}

/// Catalog row joined with the owning company (public browsing)
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub service: Service,
    pub company_name: String,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompanyDocument {
    pub id: i64,
    pub provider_id: i64,
    pub document_name: String,
    pub file_path: String,
    pub uploaded_at: NaiveDateTime,
}

/// A seeker's ask for a service
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRequest {
    pub id: i64,
    pub user_id: i64,
    pub service_type: String,
    pub description: String,
    pub location: String,
    pub status: RequestStatus,
    pub date_requested: NaiveDateTime,
    pub matched_provider_id: Option<i64>,
}

/// Request joined with the requester and matched company names (listings)
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSummary {
    pub request: ServiceRequest,
    pub username: String,
    pub matched_company: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_db_values() {
        assert_eq!(Role::Seeker.as_db(), "user");
        assert_eq!(Role::from_db("company"), Some(Role::Provider));
        assert_eq!(Role::from_db("admin"), None);
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!(RequestStatus::from_db("Matched"), Some(RequestStatus::Matched));
        assert_eq!(RequestStatus::from_db("done"), None);
        assert_eq!(RequestStatus::default(), RequestStatus::Pending);
    }
}
