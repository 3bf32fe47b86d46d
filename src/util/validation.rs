use crate::error::validation::ValidationError;

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 20;
pub const DEVICE_NAME_MAX_LEN: usize = 64;

/// Accepts 3 to 20 characters over `[A-Za-z0-9_-]`.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let valid_len = (USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&username.len());
    let valid_chars = username
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');

    if valid_len && valid_chars {
        Ok(())
    } else {
        Err(ValidationError::InvalidUsername(username.to_string()))
    }
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() {
        return Err(ValidationError::MissingEmail);
    }
    Ok(())
}

pub fn validate_device_name(name: &str) -> Result<(), ValidationError> {
    let len = name.chars().count();
    if name.trim().is_empty() || len > DEVICE_NAME_MAX_LEN {
        return Err(ValidationError::InvalidDeviceName(name.to_string()));
    }
    Ok(())
}
