//! Form validation.
//!
//! Forms hold what the user typed (signed numbers, optional selections).
//! Validation turns a form into the typed request body or a
//! [`ValidationError`], before any network call is made.

use crate::api::{MatchDraft, NewTicket, PasswordChange, ProductDraft, Registration, TicketChanges};
use crate::error::ValidationError;
use crate::types::{MatchId, Money, SeatCategory, Ticket};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 8;

/// Accepted username length range
pub const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=30;

fn price(value: f64) -> Result<Money, ValidationError> {
    if value.is_nan() {
        return Err(ValidationError::InvalidNumber { field: "Price" });
    }
    if value < 0.0 {
        return Err(ValidationError::Negative { field: "Price" });
    }
    Money::try_from(value).map_err(|_| ValidationError::InvalidNumber { field: "Price" })
}

fn count(value: i64, field: &'static str) -> Result<u32, ValidationError> {
    if value < 0 {
        return Err(ValidationError::Negative { field });
    }
    u32::try_from(value).map_err(|_| ValidationError::InvalidNumber { field })
}

fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(trimmed.to_string())
}

// ============================================================================
// Tickets
// ============================================================================

/// Admin ticket create form
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketForm {
    /// Selected match
    pub match_id: Option<MatchId>,
    /// Selected tier
    pub seat_category: SeatCategory,
    /// Price as typed
    pub price: f64,
    /// Ticket count as typed
    pub available_tickets: i64,
}

impl TicketForm {
    /// Validate for creation against the currently loaded ticket list.
    ///
    /// Rejects negative numbers, a missing match, and a (match, seat
    /// category) pair already present in `loaded`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate_new(&self, loaded: &[Ticket]) -> Result<NewTicket, ValidationError> {
        let price = price(self.price)?;
        let available_tickets = count(self.available_tickets, "Available tickets")?;
        let match_id = self.match_id.ok_or(ValidationError::Required { field: "Match" })?;

        if let Some(existing) = loaded
            .iter()
            .find(|t| t.key() == (match_id, self.seat_category))
        {
            return Err(ValidationError::Duplicate(format!(
                "A {} ticket for {}",
                self.seat_category,
                existing.fixture.title()
            )));
        }

        Ok(NewTicket {
            match_id,
            seat_category: self.seat_category,
            price,
            available_tickets,
        })
    }
}

/// Admin ticket edit form (match and tier are fixed once created)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketEditForm {
    /// Price as typed
    pub price: f64,
    /// Ticket count as typed
    pub available_tickets: i64,
}

impl TicketEditForm {
    /// Validate an edit
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Negative`] for negative numbers.
    pub fn validate(&self) -> Result<TicketChanges, ValidationError> {
        Ok(TicketChanges {
            price: price(self.price)?,
            available_tickets: count(self.available_tickets, "Available tickets")?,
        })
    }
}

// ============================================================================
// Matches
// ============================================================================

/// Admin match form
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchForm {
    /// Home team
    pub home_team: String,
    /// Away team
    pub away_team: String,
    /// Kick-off
    pub event_date: Option<DateTime<Utc>>,
    /// Venue
    pub location: String,
    /// Competition name
    pub competition: String,
    /// Image reference
    pub image: Option<String>,
}

impl MatchForm {
    /// Validate into a request body
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Required`] for empty fields and
    /// [`ValidationError::Invalid`] when both teams are the same.
    pub fn validate(&self) -> Result<MatchDraft, ValidationError> {
        let home = required(&self.home_team, "Home team")?;
        let away = required(&self.away_team, "Away team")?;
        if home.eq_ignore_ascii_case(&away) {
            return Err(ValidationError::Invalid {
                field: "Away team",
                reason: "a team cannot play itself".to_string(),
            });
        }
        let event_date = self.event_date.ok_or(ValidationError::Required { field: "Date" })?;
        Ok(MatchDraft {
            teams: vec![home, away],
            event_date,
            location: required(&self.location, "Location")?,
            competition: required(&self.competition, "Competition")?,
            image: self
                .image
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string),
        })
    }
}

// ============================================================================
// Products
// ============================================================================

/// Admin product form
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductForm {
    /// Display name
    pub name: String,
    /// Long description
    pub description: String,
    /// Shop category
    pub category: String,
    /// Price as typed
    pub price: f64,
    /// Stock as typed
    pub stock: i64,
    /// Image reference
    pub image: Option<String>,
}

impl ProductForm {
    /// Validate into a request body
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<ProductDraft, ValidationError> {
        Ok(ProductDraft {
            name: required(&self.name, "Name")?,
            description: self.description.trim().to_string(),
            category: self.category.trim().to_string(),
            price: price(self.price)?,
            stock: count(self.stock, "Stock")?,
            image: self.image.clone().filter(|s| !s.trim().is_empty()),
        })
    }
}

// ============================================================================
// Accounts
// ============================================================================

/// Check the email has a local part and a dotted domain
fn email(value: &str) -> Result<String, ValidationError> {
    let value = required(value, "Email")?;
    let valid = value
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        });
    if valid {
        Ok(value)
    } else {
        Err(ValidationError::Invalid {
            field: "Email",
            reason: "enter a valid email address".to_string(),
        })
    }
}

fn username(value: &str) -> Result<String, ValidationError> {
    let value = required(value, "Username")?;
    if !USERNAME_LEN.contains(&value.chars().count()) {
        return Err(ValidationError::Invalid {
            field: "Username",
            reason: format!(
                "must be between {} and {} characters",
                USERNAME_LEN.start(),
                USERNAME_LEN.end()
            ),
        });
    }
    Ok(value)
}

fn password(value: &str, field: &'static str) -> Result<String, ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Required { field });
    }
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::Invalid {
            field,
            reason: format!("must be at least {MIN_PASSWORD_LEN} characters"),
        });
    }
    Ok(value.to_string())
}

/// Sign-up form
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationForm {
    /// Desired login name
    pub username: String,
    /// Contact email
    pub email: String,
    /// Password
    pub password: String,
    /// Password typed again
    pub confirm_password: String,
}

impl RegistrationForm {
    /// Validate into a request body
    ///
    /// # Errors
    ///
    /// Returns the first field-level [`ValidationError`] found.
    pub fn validate(&self) -> Result<Registration, ValidationError> {
        let username = username(&self.username)?;
        let email = email(&self.email)?;
        let password = password(&self.password, "Password")?;
        if self.password != self.confirm_password {
            return Err(ValidationError::Invalid {
                field: "Confirm password",
                reason: "passwords do not match".to_string(),
            });
        }
        Ok(Registration {
            username,
            email,
            password,
        })
    }
}

/// Password change form
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordForm {
    /// Current password
    pub current_password: String,
    /// New password
    pub new_password: String,
    /// New password typed again
    pub confirm_password: String,
}

impl PasswordForm {
    /// Validate into a request body
    ///
    /// # Errors
    ///
    /// Returns the first field-level [`ValidationError`] found.
    pub fn validate(&self) -> Result<PasswordChange, ValidationError> {
        if self.current_password.is_empty() {
            return Err(ValidationError::Required { field: "Current password" });
        }
        let new_password = password(&self.new_password, "New password")?;
        if self.new_password != self.confirm_password {
            return Err(ValidationError::Invalid {
                field: "Confirm password",
                reason: "passwords do not match".to_string(),
            });
        }
        Ok(PasswordChange {
            current_password: self.current_password.clone(),
            new_password,
        })
    }
}

/// Validate a username/email pair from the profile form
///
/// # Errors
///
/// Returns the first field-level [`ValidationError`] found.
pub fn profile(username_value: &str, email_value: &str) -> Result<(String, String), ValidationError> {
    Ok((username(username_value)?, email(email_value)?))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::types::{Match, TicketId};

    fn loaded_vip(match_id: MatchId) -> Ticket {
        Ticket {
            id: TicketId::new(),
            fixture: Match {
                id: match_id,
                teams: vec!["Rovers".into(), "City".into()],
                event_date: Utc::now(),
                location: "Home Park".into(),
                competition: "League".into(),
                image: None,
            },
            seat_category: SeatCategory::Vip,
            price: Money::from_cents(10_000),
            available_tickets: 20,
        }
    }

    fn form(match_id: MatchId, seat_category: SeatCategory) -> TicketForm {
        TicketForm {
            match_id: Some(match_id),
            seat_category,
            price: 30.0,
            available_tickets: 100,
        }
    }

    #[test]
    fn rejects_duplicate_match_and_category() {
        let match_id = MatchId::new();
        let loaded = vec![loaded_vip(match_id)];
        let err = form(match_id, SeatCategory::Vip).validate_new(&loaded).unwrap_err();
        assert!(err.to_string().contains("already exists"), "{err}");

        // Another tier for the same match is fine.
        assert!(form(match_id, SeatCategory::General).validate_new(&loaded).is_ok());
    }

    #[test]
    fn rejects_negative_numbers_on_create_and_edit() {
        let mut negative_price = form(MatchId::new(), SeatCategory::General);
        negative_price.price = -1.0;
        assert_eq!(
            negative_price.validate_new(&[]),
            Err(ValidationError::Negative { field: "Price" })
        );

        let mut negative_count = form(MatchId::new(), SeatCategory::General);
        negative_count.available_tickets = -1;
        assert_eq!(
            negative_count.validate_new(&[]),
            Err(ValidationError::Negative { field: "Available tickets" })
        );

        let edit = TicketEditForm { price: -1.0, available_tickets: 5 };
        assert!(edit.validate().is_err());
        let edit = TicketEditForm { price: 5.0, available_tickets: -1 };
        assert!(edit.validate().is_err());
        let edit = TicketEditForm { price: 12.5, available_tickets: 0 };
        assert_eq!(
            edit.validate().unwrap(),
            TicketChanges { price: Money::from_cents(1250), available_tickets: 0 }
        );
    }

    #[test]
    fn requires_a_match() {
        let mut no_match = form(MatchId::new(), SeatCategory::General);
        no_match.match_id = None;
        assert_eq!(no_match.validate_new(&[]), Err(ValidationError::Required { field: "Match" }));
    }

    #[test]
    fn registration_rules() {
        let valid = RegistrationForm {
            username: "terrace_fan".into(),
            email: "fan@club.example".into(),
            password: "north-stand".into(),
            confirm_password: "north-stand".into(),
        };
        assert!(valid.validate().is_ok());

        let short_user = RegistrationForm { username: "ab".into(), ..valid.clone() };
        assert_eq!(short_user.validate().unwrap_err().field(), Some("Username"));

        let bad_email = RegistrationForm { email: "fan@club".into(), ..valid.clone() };
        assert_eq!(bad_email.validate().unwrap_err().field(), Some("Email"));

        let short_password = RegistrationForm {
            password: "short".into(),
            confirm_password: "short".into(),
            ..valid.clone()
        };
        assert_eq!(short_password.validate().unwrap_err().field(), Some("Password"));

        let mismatch = RegistrationForm { confirm_password: "other-pass".into(), ..valid };
        assert_eq!(mismatch.validate().unwrap_err().field(), Some("Confirm password"));
    }

    #[test]
    fn match_form_rules() {
        let form = MatchForm {
            home_team: "Rovers".into(),
            away_team: " rovers ".into(),
            event_date: Some(Utc::now()),
            location: "Home Park".into(),
            competition: "Cup".into(),
            image: Some("  ".into()),
        };
        assert_eq!(form.validate().unwrap_err().field(), Some("Away team"));

        let form = MatchForm { away_team: "City".into(), ..form };
        let draft = form.validate().unwrap();
        assert_eq!(draft.teams, vec!["Rovers", "City"]);
        assert_eq!(draft.image, None);
    }

    #[test]
    fn product_form_rejects_negative_stock() {
        let form = ProductForm {
            name: "Scarf".into(),
            description: String::new(),
            category: "Accessories".into(),
            price: 15.0,
            stock: -3,
            image: None,
        };
        assert_eq!(form.validate(), Err(ValidationError::Negative { field: "Stock" }));
    }
}
