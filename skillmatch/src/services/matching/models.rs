use crate::models::{ProviderProfile, ServiceRequest};

/// What a request asks for: the text the provider filters are matched against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCriteria {
    pub service_type: String,
    pub location: String,
}

impl MatchCriteria {
    pub fn new(service_type: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            service_type: service_type.into(),
            location: location.into(),
        }
    }

    /// Lowercased copy used for case-insensitive containment checks
    pub(crate) fn normalized(&self) -> (String, String) {
        (self.service_type.to_lowercase(), self.location.to_lowercase())
    }
}

impl From<&ServiceRequest> for MatchCriteria {
    fn from(request: &ServiceRequest) -> Self {
        Self::new(request.service_type.clone(), request.location.clone())
    }
}

/// Why a provider was left out of the candidate set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Unverified,
    CategoryMismatch,
    LocationMismatch,
}

impl Rejection {
    pub fn label(&self) -> &'static str {
        match self {
            Rejection::Unverified => "not verified",
            Rejection::CategoryMismatch => "category does not match",
            Rejection::LocationMismatch => "location does not match",
        }
    }
}

/// Result of a bulk matching run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchReport {
    /// Pending requests examined
    pub considered: usize,
    /// (request id, provider id) pairs that were written back
    pub matched: Vec<(i64, i64)>,
}

impl MatchReport {
    pub fn matched_count(&self) -> usize {
        self.matched.len()
    }

    pub fn summary(&self) -> String {
        format!("{} service requests matched successfully.", self.matched_count())
    }
}

/// Borrowed view over the chosen provider
#[derive(Debug, Clone, Copy)]
pub struct MatchInfo<'a> {
    pub provider: &'a ProviderProfile,
    /// Number of providers that passed every filter
    pub qualifying: usize,
}
