//! Contact form validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ValidationError;

/// Raw contact form fields as they arrive in a request body.
///
/// Every field is optional here; [`validate_contact`] decides what is acceptable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContactFields {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

impl ContactFields {
    /// Pull the fields out of a parsed JSON or form body.
    ///
    /// Numbers and `true` are accepted as text; `null`, `false`, arrays and
    /// objects count as absent.
    pub fn from_value(body: &Value) -> Self {
        Self {
            name: text_field(body, "name"),
            email: text_field(body, "email"),
            subject: text_field(body, "subject"),
            message: text_field(body, "message"),
        }
    }
}

pub(crate) fn text_field(body: &Value, key: &str) -> Option<String> {
    match body.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

/// A contact submission that passed validation. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

/// Validate contact form fields.
pub fn validate_contact(fields: &ContactFields) -> Result<ContactSubmission, ValidationError> {
    let name = required(&fields.name)?;
    let email = required(&fields.email)?;
    let subject = required(&fields.subject)?;
    let message = required(&fields.message)?;

    if !is_valid_email(email) {
        return Err(ValidationError::InvalidEmail);
    }

    Ok(ContactSubmission {
        name: name.to_string(),
        email: email.to_string(),
        subject: subject.to_string(),
        message: message.to_string(),
    })
}

fn required(field: &Option<String>) -> Result<&str, ValidationError> {
    match field.as_deref() {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ValidationError::MissingField),
    }
}

/// Basic `local@domain.tld` shape check.
///
/// Equivalent to `^[^\s@]+@[^\s@]+\.[^\s@]+$`: exactly one `@`, no
/// whitespace, and a dot in the domain with at least one character on
/// each side.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    // The regex backtracks to any dot, so some dot must split the domain
    // into two non-empty halves.
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(name: &str, email: &str, subject: &str, message: &str) -> ContactFields {
        ContactFields {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            subject: Some(subject.to_string()),
            message: Some(message.to_string()),
        }
    }

    #[test]
    fn accepts_well_formed_submission() {
        let submission = validate_contact(&fields("A", "a@b.com", "S", "M")).unwrap();
        assert_eq!(submission.name, "A");
        assert_eq!(submission.email, "a@b.com");
        assert_eq!(submission.subject, "S");
        assert_eq!(submission.message, "M");
    }

    #[test]
    fn rejects_each_missing_field() {
        let complete = fields("A", "a@b.com", "S", "M");
        for i in 0..4 {
            let mut partial = complete.clone();
            match i {
                0 => partial.name = None,
                1 => partial.email = None,
                2 => partial.subject = None,
                _ => partial.message = None,
            }
            assert_eq!(validate_contact(&partial), Err(ValidationError::MissingField));
        }
    }

    #[test]
    fn rejects_empty_field() {
        assert_eq!(
            validate_contact(&fields("A", "a@b.com", "", "M")),
            Err(ValidationError::MissingField)
        );
    }

    #[test]
    fn missing_field_wins_over_bad_email() {
        assert_eq!(
            validate_contact(&fields("", "not-an-email", "S", "M")),
            Err(ValidationError::MissingField)
        );
    }

    #[test]
    fn rejects_invalid_email() {
        let err = validate_contact(&fields("A", "not-an-email", "S", "M")).unwrap_err();
        assert_eq!(err, ValidationError::InvalidEmail);
        assert_eq!(err.to_string(), "Invalid email address");
    }

    #[test]
    fn email_shape() {
        for ok in ["a@b.co", "first.last@school.edu", "a@b.c.d", "a@b..c", "x@.b.c"] {
            assert!(is_valid_email(ok), "{ok} should be accepted");
        }
        for bad in [
            "",
            "plain",
            "@b.com",
            "a@",
            "a@b",
            "a@.com",
            "a@b.",
            "a b@c.com",
            "a@b@c.com",
            "a@b.com ",
        ] {
            assert!(!is_valid_email(bad), "{bad} should be rejected");
        }
    }

    #[test]
    fn reads_fields_from_json_body() {
        let body = json!({
            "name": "Ali",
            "email": "ali@example.com",
            "subject": 42,
            "message": null
        });
        let fields = ContactFields::from_value(&body);
        assert_eq!(fields.name.as_deref(), Some("Ali"));
        assert_eq!(fields.subject.as_deref(), Some("42"));
        assert_eq!(fields.message, None);
    }
}
