use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::offer::FlightOffer;

/// Hard ceiling on passengers per booking.
pub const MAX_PASSENGERS: usize = 6;

/// Position in the fixed dialogue sequence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Step {
    AskOrigin,
    AskDestination,
    AskDate,
    SelectFlight,
    AskName,
    AskAge,
    AskGender,
    AskSeat,
    AddAnotherPassenger,
    ConfirmBooking,
    AwaitingPayment,
    BookingConfirmed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn parse(input: &str) -> Option<Self> {
        if input.eq_ignore_ascii_case("male") {
            Some(Gender::Male)
        } else if input.eq_ignore_ascii_case("female") {
            Some(Gender::Female)
        } else if input.eq_ignore_ascii_case("other") {
            Some(Gender::Other)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

/// A completed passenger, immutable once appended to the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Passenger {
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub seat: String,
}

/// Passenger being collected field-by-field across dialogue steps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PassengerDraft {
    pub name: String,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
}

impl PassengerDraft {
    pub fn new(name: String) -> Self {
        Self {
            name,
            age: None,
            gender: None,
        }
    }

    /// Seal the draft with a seat label. Requires age and gender to have
    /// been collected already.
    pub fn complete(self, seat: String) -> Option<Passenger> {
        Some(Passenger {
            name: self.name,
            age: self.age?,
            gender: self.gender?,
            seat,
        })
    }
}

/// Per-user ephemeral conversation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub step: Step,
    pub origin: String,
    pub destination: String,
    pub date: Option<NaiveDate>,
    pub flights: Vec<FlightOffer>,
    pub selected_flight: Option<FlightOffer>,
    pub passengers: Vec<Passenger>,
    pub current_passenger: Option<PassengerDraft>,
    pub payment_confirmed: bool,
    pub payment_reference: Option<String>,
    pub booking_reference: Option<String>,
    pub last_interaction: DateTime<Utc>,
}

impl Session {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            step: Step::AskOrigin,
            origin: String::new(),
            destination: String::new(),
            date: None,
            flights: Vec::new(),
            selected_flight: None,
            passengers: Vec::new(),
            current_passenger: None,
            payment_confirmed: false,
            payment_reference: None,
            booking_reference: None,
            last_interaction: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl_seconds: i64) -> bool {
        now - self.last_interaction > Duration::seconds(ttl_seconds)
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_interaction = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gender_parses_case_insensitively() {
        assert_eq!(Gender::parse("MALE"), Some(Gender::Male));
        assert_eq!(Gender::parse("female"), Some(Gender::Female));
        assert_eq!(Gender::parse("Other"), Some(Gender::Other));
        assert_eq!(Gender::parse("unknown"), None);
    }

    #[test]
    fn draft_completes_only_with_all_fields() {
        let draft = PassengerDraft::new("Asha Rao".to_string());
        assert!(draft.clone().complete("12A".to_string()).is_none());

        let mut draft = draft;
        draft.age = Some(34);
        draft.gender = Some(Gender::Female);
        let passenger = draft.complete("12A".to_string()).unwrap();
        assert_eq!(passenger.name, "Asha Rao");
        assert_eq!(passenger.seat, "12A");
    }

    #[test]
    fn session_expiry_uses_last_interaction() {
        let now = Utc::now();
        let mut session = Session::new(now - Duration::hours(2));
        assert!(session.is_expired(now, 3600));

        session.touch(now);
        assert!(!session.is_expired(now, 3600));
    }
}
