pub mod auth;
pub mod health;

// common validation helpers for the handlers
use regex::Regex;

/// Usernames are exactly six alphanumeric characters.
pub fn valid_username(username: &str) -> bool {
    Regex::new(r"^[a-zA-Z0-9]{6}$").is_ok_and(|re| re.is_match(username))
}

/// Passwords are between 6 and 255 characters.
pub fn valid_password(password: &str) -> bool {
    (6..=255).contains(&password.chars().count())
}
