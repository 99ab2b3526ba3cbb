// Business logic services layer
//
// Services sit between the web/CLI surfaces and the repositories, and are
// shared by both.

pub mod accounts;
pub mod catalog;
pub mod matching;
pub mod onboarding;
pub mod requests;
