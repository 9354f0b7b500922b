//! Field rules shared by registration, profile edits and admin edits.

use regex::Regex;
use std::sync::OnceLock;

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 8;

pub fn username(value: &str) -> Result<(), String> {
    let len = value.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(format!(
            "Username must be between {USERNAME_MIN} and {USERNAME_MAX} characters"
        ));
    }

    if !value
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(
            "Username can only contain letters, numbers, dots, hyphens, and underscores"
                .to_string(),
        );
    }

    Ok(())
}

pub fn email(value: &str) -> Result<(), String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
            .expect("Invalid regex")
    });

    if value.len() > 254 || !re.is_match(value) {
        return Err(format!("Invalid email address: {value}"));
    }

    Ok(())
}

pub fn password(value: &str) -> Result<(), String> {
    if value.chars().count() < PASSWORD_MIN {
        return Err(format!(
            "Password must be at least {PASSWORD_MIN} characters"
        ));
    }
    Ok(())
}

pub fn required(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} is required"));
    }
    Ok(())
}
