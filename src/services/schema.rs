//! Validation schema resolver for the auth form.
//!
//! DESIGN
//! ======
//! Each [`WorkflowMode`] maps to its own `const` rule table. Sign-in keeps
//! an `Optional` rule for every profile field so both tables cover the same
//! fields and a mode switch recomputes every error from scratch.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// =============================================================================
// WORKFLOW MODE
// =============================================================================

/// Which auth screen the form belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowMode {
    SignIn,
    SignUp,
}

impl WorkflowMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SignIn => "sign-in",
            Self::SignUp => "sign-up",
        }
    }

    /// Route of the screen for this mode.
    #[must_use]
    pub fn route(self) -> &'static str {
        match self {
            Self::SignIn => "/sign-in",
            Self::SignUp => "/sign-up",
        }
    }

    /// The other mode, offered in the form footer.
    #[must_use]
    pub fn alternate(self) -> Self {
        match self {
            Self::SignIn => Self::SignUp,
            Self::SignUp => Self::SignIn,
        }
    }

    #[must_use]
    pub fn footer_prompt(self) -> &'static str {
        match self {
            Self::SignIn => "Don't have an account?",
            Self::SignUp => "Already have an account?",
        }
    }

    /// Label for the footer link and the idle submit button.
    #[must_use]
    pub fn action_label(self) -> &'static str {
        match self {
            Self::SignIn => "Sign in",
            Self::SignUp => "Sign up",
        }
    }
}

impl fmt::Display for WorkflowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sign-in" => Ok(Self::SignIn),
            "sign-up" => Ok(Self::SignUp),
            other => Err(format!("unknown workflow mode: {other}")),
        }
    }
}

// =============================================================================
// FORM
// =============================================================================

/// Every input of the auth form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    FirstName,
    LastName,
    Address,
    City,
    State,
    PostalCode,
    DateOfBirth,
    TaxId,
    Email,
    Password,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::FirstName,
        Field::LastName,
        Field::Address,
        Field::City,
        Field::State,
        Field::PostalCode,
        Field::DateOfBirth,
        Field::TaxId,
        Field::Email,
        Field::Password,
    ];

    /// Wire name, matching the serialized form.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
            Self::Address => "address",
            Self::City => "city",
            Self::State => "state",
            Self::PostalCode => "postalCode",
            Self::DateOfBirth => "dateOfBirth",
            Self::TaxId => "taxId",
            Self::Email => "email",
            Self::Password => "password",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::FirstName => "First Name",
            Self::LastName => "Last Name",
            Self::Address => "Address",
            Self::City => "City",
            Self::State => "State",
            Self::PostalCode => "Postal Code",
            Self::DateOfBirth => "Date of Birth",
            Self::TaxId => "SSN",
            Self::Email => "Email",
            Self::Password => "Password",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw auth form input. Every field defaults to the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CredentialForm {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub date_of_birth: String,
    pub tax_id: String,
    pub email: String,
    pub password: String,
}

impl CredentialForm {
    /// Sign-in form with only the two credential fields populated.
    #[must_use]
    pub fn sign_in(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into(), password: password.into(), ..Self::default() }
    }

    #[must_use]
    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::FirstName => &self.first_name,
            Field::LastName => &self.last_name,
            Field::Address => &self.address,
            Field::City => &self.city,
            Field::State => &self.state,
            Field::PostalCode => &self.postal_code,
            Field::DateOfBirth => &self.date_of_birth,
            Field::TaxId => &self.tax_id,
            Field::Email => &self.email,
            Field::Password => &self.password,
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let slot = match field {
            Field::FirstName => &mut self.first_name,
            Field::LastName => &mut self.last_name,
            Field::Address => &mut self.address,
            Field::City => &mut self.city,
            Field::State => &mut self.state,
            Field::PostalCode => &mut self.postal_code,
            Field::DateOfBirth => &mut self.date_of_birth,
            Field::TaxId => &mut self.tax_id,
            Field::Email => &mut self.email,
            Field::Password => &mut self.password,
        };
        *slot = value.into();
    }
}

// =============================================================================
// RULES
// =============================================================================

/// A single field constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Always passes, whatever the content.
    Optional,
    /// Bare `local@domain.tld` address: no display name, no IP literal.
    Email,
    /// Length bounds in characters, inclusive.
    Length { min: usize, max: Option<usize> },
}

impl Rule {
    /// Check `value`, returning a user-facing message on failure.
    #[must_use]
    pub fn check(self, value: &str) -> Option<String> {
        match self {
            Self::Optional => None,
            Self::Email => {
                let valid = email_address::EmailAddress::parse_with_options(
                    value,
                    email_address::Options::default()
                        .with_required_tld()
                        .without_display_text()
                        .without_domain_literal(),
                )
                .is_ok();
                (!valid).then(|| "Invalid email".to_string())
            }
            Self::Length { min, max } => {
                let len = value.chars().count();
                match max {
                    Some(max) if min == max && len != min => {
                        Some(format!("Must contain exactly {min} character(s)"))
                    }
                    _ if len < min => Some(format!("Must contain at least {min} character(s)")),
                    Some(max) if len > max => Some(format!("Must contain at most {max} character(s)")),
                    _ => None,
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub field: Field,
    pub rule: Rule,
}

const fn at_least(field: Field, min: usize) -> FieldRule {
    FieldRule { field, rule: Rule::Length { min, max: None } }
}

const fn between(field: Field, min: usize, max: usize) -> FieldRule {
    FieldRule { field, rule: Rule::Length { min, max: Some(max) } }
}

const fn optional(field: Field) -> FieldRule {
    FieldRule { field, rule: Rule::Optional }
}

const EMAIL_RULE: FieldRule = FieldRule { field: Field::Email, rule: Rule::Email };
const PASSWORD_RULE: FieldRule = at_least(Field::Password, 6);

const SIGN_IN_RULES: [FieldRule; 10] = [
    optional(Field::FirstName),
    optional(Field::LastName),
    optional(Field::Address),
    optional(Field::City),
    optional(Field::State),
    optional(Field::PostalCode),
    optional(Field::DateOfBirth),
    optional(Field::TaxId),
    EMAIL_RULE,
    PASSWORD_RULE,
];

const SIGN_UP_RULES: [FieldRule; 10] = [
    at_least(Field::FirstName, 2),
    at_least(Field::LastName, 2),
    between(Field::Address, 2, 100),
    at_least(Field::City, 2),
    between(Field::State, 2, 2),
    between(Field::PostalCode, 3, 6),
    at_least(Field::DateOfBirth, 2),
    at_least(Field::TaxId, 2),
    EMAIL_RULE,
    PASSWORD_RULE,
];

/// Field-scoped validation failures, keyed by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(f, m)| (*f, m.as_str()))
    }

    pub(crate) fn set(&mut self, field: Field, message: Option<String>) {
        match message {
            Some(message) => {
                self.0.insert(field, message);
            }
            None => {
                self.0.remove(&field);
            }
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// The resolved rule set for one mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRules {
    mode: WorkflowMode,
    rules: &'static [FieldRule],
}

impl FieldRules {
    #[must_use]
    pub fn mode(&self) -> WorkflowMode {
        self.mode
    }

    #[must_use]
    pub fn rule_for(&self, field: Field) -> Rule {
        self.rules
            .iter()
            .find(|r| r.field == field)
            .map_or(Rule::Optional, |r| r.rule)
    }

    /// Validate one field in isolation.
    #[must_use]
    pub fn check(&self, field: Field, value: &str) -> Option<String> {
        self.rule_for(field).check(value)
    }

    /// Validate every field independently.
    ///
    /// # Errors
    ///
    /// Returns every failing field with its message.
    pub fn validate(&self, form: &CredentialForm) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        for rule in self.rules {
            errors.set(rule.field, rule.rule.check(form.value(rule.field)));
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Resolve the rule set for `mode`.
#[must_use]
pub fn resolve(mode: WorkflowMode) -> FieldRules {
    let rules: &'static [FieldRule] = match mode {
        WorkflowMode::SignIn => &SIGN_IN_RULES,
        WorkflowMode::SignUp => &SIGN_UP_RULES,
    };
    FieldRules { mode, rules }
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod tests;
