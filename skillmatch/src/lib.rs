//! SkillMatch: a service marketplace that matches seekers' requests to
//! verified provider companies.

pub mod cli;
pub mod config;
pub mod forms;
pub mod models;
pub mod services;
pub mod web;
