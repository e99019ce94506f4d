use std::fmt;

pub const MIN_PASSWORD_LENGTH: usize = 10;

const SPECIAL_CHARS: &str = "!@#$%^&*()_-+=[]{};':\",.<>/?\\|";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyViolation {
    TooShort { min: usize },
    MissingUppercase,
    MissingLowercase,
    MissingDigit,
    MissingSpecial,
    EntirelyNumeric,
    ContainsUsername,
    ContainsEmailName,
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyViolation::TooShort { min } => {
                write!(f, "must be at least {min} characters long")
            }
            PolicyViolation::MissingUppercase => write!(f, "must contain an uppercase letter"),
            PolicyViolation::MissingLowercase => write!(f, "must contain a lowercase letter"),
            PolicyViolation::MissingDigit => write!(f, "must contain a digit"),
            PolicyViolation::MissingSpecial => write!(f, "must contain a special character"),
            PolicyViolation::EntirelyNumeric => write!(f, "must not be entirely numeric"),
            PolicyViolation::ContainsUsername => write!(f, "must not contain the username"),
            PolicyViolation::ContainsEmailName => {
                write!(f, "must not contain the e-mail name (before the @)")
            }
        }
    }
}

/// Account details the password is checked against.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordContext<'a> {
    pub username: Option<&'a str>,
    pub email: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: MIN_PASSWORD_LENGTH,
        }
    }
}

impl PasswordPolicy {
    /// Returns every rule the password breaks; empty means acceptable.
    pub fn check(&self, password: &str, context: PasswordContext<'_>) -> Vec<PolicyViolation> {
        let mut violations = Vec::new();
        if password.chars().count() < self.min_length {
            violations.push(PolicyViolation::TooShort {
                min: self.min_length,
            });
        }
        if !password.chars().any(|c| c.is_ascii_uppercase()) {
            violations.push(PolicyViolation::MissingUppercase);
        }
        if !password.chars().any(|c| c.is_ascii_lowercase()) {
            violations.push(PolicyViolation::MissingLowercase);
        }
        if !password.chars().any(|c| c.is_ascii_digit()) {
            violations.push(PolicyViolation::MissingDigit);
        }
        if !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
            violations.push(PolicyViolation::MissingSpecial);
        }
        if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
            violations.push(PolicyViolation::EntirelyNumeric);
        }

        let lowered = password.to_lowercase();
        if let Some(username) = context.username.map(str::to_lowercase) {
            if !username.is_empty() && lowered.contains(&username) {
                violations.push(PolicyViolation::ContainsUsername);
            }
        }
        if let Some(email) = context.email.map(str::to_lowercase) {
            let local = email.split('@').next().unwrap_or_default();
            if !local.is_empty() && lowered.contains(local) {
                violations.push(PolicyViolation::ContainsEmailName);
            }
        }
        violations
    }
}
