/// Input validation helpers shared by the auth handlers
use validator::ValidateEmail;

/// Validates email format according to RFC 5322
pub fn validate_email(email: &str) -> bool {
    email.validate_email()
}

/// Validates password strength
/// Requirements:
/// - Minimum 8 characters
/// - At least one letter
/// - At least one digit
pub fn validate_password(password: &str) -> bool {
    if password.len() < 8 {
        return false;
    }

    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_digit = password.chars().any(|c| c.is_numeric());

    has_letter && has_digit
}

/// Validates display-name format: 1 to 100 characters, not all whitespace
pub fn validate_name(name: &str) -> bool {
    let trimmed = name.trim();
    !trimmed.is_empty() && name.len() <= 100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email_valid() {
        assert!(validate_email("user@example.com"));
        assert!(validate_email("user+tag@example.co.uk"));
    }

    #[test]
    fn test_validate_email_invalid() {
        assert!(!validate_email("invalid-email"));
        assert!(!validate_email("@example.com"));
        assert!(!validate_email("user@"));
    }

    #[test]
    fn test_validate_password_valid() {
        assert!(validate_password("password1"));
        assert!(validate_password("S3curePass"));
    }

    #[test]
    fn test_validate_password_too_short() {
        assert!(!validate_password("pass1"));
    }

    #[test]
    fn test_validate_password_missing_digit() {
        assert!(!validate_password("passwords"));
    }

    #[test]
    fn test_validate_password_missing_letter() {
        assert!(!validate_password("12345678"));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Bob"));
        assert!(!validate_name("   "));
        assert!(!validate_name(&"x".repeat(101)));
    }
}
