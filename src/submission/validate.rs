use std::fmt;

use crate::models::NewSubmission;

/// Why a sign-up was turned away. `detail` goes back to the submitter and
/// may quote their input; `Display` names only the field, for logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub field: &'static str,
    pub detail: String,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}", self.field)
    }
}

/// Checks a sign-up before it is stored. The email check is a plausibility
/// test only: one `@` and one `.` somewhere in the address.
pub fn validate(input: &NewSubmission) -> Result<(), Rejection> {
    if input.name.trim().is_empty() {
        return Err(Rejection {
            field: "name",
            detail: "Name must not be empty".to_string(),
        });
    }

    if !is_plausible_email(&input.email) {
        return Err(Rejection {
            field: "email",
            detail: format!("Invalid email address: {}", input.email),
        });
    }

    Ok(())
}

pub fn is_plausible_email(email: &str) -> bool {
    email.contains('@') && email.contains('.')
}
