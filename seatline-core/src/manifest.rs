use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PassengerCategory {
    Male,
    Female,
    Other,
}

/// One manifest entry, positionally paired with a selected seat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passenger {
    pub name: String,
    pub age: u8,
    pub category: PassengerCategory,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl Passenger {
    /// Backfill missing contact fields from the signed-in user. Never
    /// overwrites values the caller supplied.
    pub fn with_contact_defaults(mut self, user: &UserContext) -> Self {
        if self.phone.is_none() {
            self.phone = Some(user.phone.clone());
        }
        if self.email.is_none() {
            self.email = Some(user.email.clone());
        }
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is required".to_string());
        }
        if self.age == 0 || self.age > 120 {
            return Err(format!("age {} is out of range", self.age));
        }
        Ok(())
    }
}

/// Read-only context about the signed-in user, injected at workflow
/// construction. Used only to prefill manifest contact fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    pub name: String,
    pub phone: String,
    pub email: String,
}
