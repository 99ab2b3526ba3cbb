//! View models rendered by askama templates
//!
//! Handlers build these from domain types; formatting (prices, dates, CSS
//! classes) happens here so templates stay declarative.

use askama::Template;
use axum::http::StatusCode;

use crate::config::repository::sessions::Flash;
use crate::forms::{
    FormErrors, LoginForm, ProviderAccountForm, ProviderProfileForm, RequestForm,
    SeekerRegistrationForm, ServiceForm,
};
use crate::models::{
    CatalogEntry, Category, CompanyDocument, ProviderProfile, RequestSummary, Service, User,
};
use crate::services::onboarding::DOCUMENT_SLOTS;

pub struct FlashView {
    pub css_class: &'static str,
    pub message: String,
}

/// Navigation and flash messages shared by every page
#[derive(Default)]
pub struct Layout {
    pub logged_in: bool,
    pub username: String,
    pub is_provider: bool,
    pub messages: Vec<FlashView>,
    /// Hidden `csrf_token` value for forms on the page
    pub csrf_token: String,
}

impl Layout {
    pub fn new(user: Option<&User>, flashes: Vec<Flash>) -> Self {
        Self {
            logged_in: user.is_some(),
            username: user.map(|u| u.username.clone()).unwrap_or_default(),
            is_provider: user.is_some_and(|u| u.is_provider()),
            messages: flashes
                .into_iter()
                .map(|f| FlashView {
                    css_class: f.level.css_class(),
                    message: f.message,
                })
                .collect(),
            csrf_token: String::new(),
        }
    }

    pub fn with_csrf_token(self, csrf_token: String) -> Self {
        Self { csrf_token, ..self }
    }
}

pub fn format_price_range(min: f64, max: f64) -> String {
    format!("{:.2} - {:.2}", min, max)
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorView {
    pub layout: Layout,
    pub status: u16,
    pub message: String,
}

impl ErrorView {
    pub fn new(status: StatusCode, message: &str) -> Self {
        Self {
            layout: Layout::default(),
            status: status.as_u16(),
            message: message.to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "landing.html")]
pub struct LandingView {
    pub layout: Layout,
}

#[derive(Template)]
#[template(path = "get_started.html")]
pub struct GetStartedView {
    pub layout: Layout,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginView {
    pub layout: Layout,
    pub form: LoginForm,
}

#[derive(Template)]
#[template(path = "register_user.html")]
pub struct RegisterUserView {
    pub layout: Layout,
    pub form: SeekerRegistrationForm,
}

#[derive(Template)]
#[template(path = "step1_signup.html")]
pub struct ProviderAccountView {
    pub layout: Layout,
    pub form: ProviderAccountForm,
    pub errors: Vec<String>,
}

impl ProviderAccountView {
    pub fn new(layout: Layout, form: ProviderAccountForm, errors: Option<FormErrors>) -> Self {
        Self {
            layout,
            form,
            errors: errors.map(|e| e.messages().to_vec()).unwrap_or_default(),
        }
    }
}

pub struct DocumentSlotView {
    pub prefix: String,
    pub document_name: String,
}

#[derive(Template)]
#[template(path = "step2_signup.html")]
pub struct CompanyDetailsView {
    pub layout: Layout,
    pub username: String,
    pub form: ProviderProfileForm,
    pub slots: Vec<DocumentSlotView>,
    pub errors: Vec<String>,
}

impl CompanyDetailsView {
    pub fn new(
        layout: Layout,
        username: String,
        form: ProviderProfileForm,
        document_names: &[String],
        errors: Option<FormErrors>,
    ) -> Self {
        let slots = (0..DOCUMENT_SLOTS)
            .map(|i| DocumentSlotView {
                prefix: i.to_string(),
                document_name: document_names.get(i).cloned().unwrap_or_default(),
            })
            .collect();
        Self {
            layout,
            username,
            form,
            slots,
            errors: errors.map(|e| e.messages().to_vec()).unwrap_or_default(),
        }
    }
}

pub struct ServiceRow {
    pub id: i64,
    pub title: String,
    pub category: String,
    pub description: String,
    pub price_range: String,
}

impl From<&Service> for ServiceRow {
    fn from(service: &Service) -> Self {
        Self {
            id: service.id,
            title: service.title.clone(),
            category: service.category.name.clone(),
            description: service.description.clone(),
            price_range: format_price_range(service.min_price, service.max_price),
        }
    }
}

pub struct DocumentRow {
    pub name: String,
    pub uploaded_at: String,
}

impl From<&CompanyDocument> for DocumentRow {
    fn from(doc: &CompanyDocument) -> Self {
        Self {
            name: doc.document_name.clone(),
            uploaded_at: doc.uploaded_at.format("%Y-%m-%d").to_string(),
        }
    }
}

pub struct RequestRow {
    pub id: i64,
    pub service_type: String,
    pub description: String,
    pub location: String,
    pub requester: String,
    pub status: &'static str,
    pub status_class: &'static str,
    pub matched_company: String,
    pub date_requested: String,
    pub can_complete: bool,
}

impl From<&RequestSummary> for RequestRow {
    fn from(summary: &RequestSummary) -> Self {
        let request = &summary.request;
        Self {
            id: request.id,
            service_type: request.service_type.clone(),
            description: request.description.clone(),
            location: request.location.clone(),
            requester: summary.username.clone(),
            status: request.status.label(),
            status_class: request.status.as_db(),
            matched_company: summary
                .matched_company
                .clone()
                .unwrap_or_else(|| "-".to_string()),
            date_requested: request.date_requested.format("%Y-%m-%d %H:%M").to_string(),
            can_complete: request.status == crate::models::RequestStatus::Matched,
        }
    }
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardView {
    pub layout: Layout,
    pub company_name: String,
    pub service_category: String,
    pub location: String,
    pub address: String,
    pub contact_number: String,
    pub verified: bool,
    pub rating: String,
    pub profile_completed: bool,
    pub services: Vec<ServiceRow>,
    pub documents: Vec<DocumentRow>,
    pub requests: Vec<RequestRow>,
}

impl DashboardView {
    pub fn new(
        layout: Layout,
        provider: &ProviderProfile,
        services: &[Service],
        documents: &[CompanyDocument],
        requests: &[RequestSummary],
    ) -> Self {
        Self {
            layout,
            company_name: provider.company_name.clone(),
            service_category: provider.service_category.clone(),
            location: provider.location.clone(),
            address: provider.address.clone(),
            contact_number: provider.contact_number.clone(),
            verified: provider.verified,
            rating: format!("{:.1}", provider.rating),
            profile_completed: provider.profile_completed,
            services: services.iter().map(ServiceRow::from).collect(),
            documents: documents.iter().map(DocumentRow::from).collect(),
            requests: requests.iter().map(RequestRow::from).collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "service_form.html")]
pub struct ServiceFormView {
    pub layout: Layout,
    pub heading: &'static str,
    pub action: String,
    pub form: ServiceForm,
    pub categories: Vec<String>,
    pub errors: Vec<String>,
}

impl ServiceFormView {
    pub fn new(
        layout: Layout,
        heading: &'static str,
        action: String,
        form: ServiceForm,
        categories: &[Category],
        errors: Option<FormErrors>,
    ) -> Self {
        Self {
            layout,
            heading,
            action,
            form,
            categories: categories.iter().map(|c| c.name.clone()).collect(),
            errors: errors.map(|e| e.messages().to_vec()).unwrap_or_default(),
        }
    }
}

pub struct CatalogRow {
    pub title: String,
    pub category: String,
    pub company_name: String,
    pub verified: bool,
    pub description: String,
    pub price_range: String,
}

pub struct CategoryLink {
    pub name: String,
    pub slug: String,
    pub selected: bool,
}

#[derive(Template)]
#[template(path = "catalog.html")]
pub struct CatalogView {
    pub layout: Layout,
    pub categories: Vec<CategoryLink>,
    pub entries: Vec<CatalogRow>,
}

impl CatalogView {
    pub fn new(layout: Layout, categories: &[Category], selected: Option<&str>, entries: &[CatalogEntry]) -> Self {
        Self {
            layout,
            categories: categories
                .iter()
                .map(|c| CategoryLink {
                    name: c.name.clone(),
                    slug: c.slug.clone(),
                    selected: selected == Some(c.slug.as_str()),
                })
                .collect(),
            entries: entries
                .iter()
                .map(|e| CatalogRow {
                    title: e.service.title.clone(),
                    category: e.service.category.name.clone(),
                    company_name: e.company_name.clone(),
                    verified: e.verified,
                    description: e.service.description.clone(),
                    price_range: format_price_range(e.service.min_price, e.service.max_price),
                })
                .collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "requests.html")]
pub struct RequestsView {
    pub layout: Layout,
    pub requests: Vec<RequestRow>,
}

#[derive(Template)]
#[template(path = "request_form.html")]
pub struct RequestFormView {
    pub layout: Layout,
    pub form: RequestForm,
    pub errors: Vec<String>,
}
