pub mod provider;
pub mod requests;
pub mod users;

use colored::*;

/// Yes/no column, colored
pub(crate) fn flag(value: bool) -> ColoredString {
    if value { "yes".green() } else { "no".dimmed() }
}
