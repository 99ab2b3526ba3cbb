pub mod auth;
pub mod onboarding;
pub mod pages;
pub mod requests;
pub mod services;
