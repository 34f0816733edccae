//! Booking finalizer: runs once at the confirm step, turning the session's
//! selection and passengers into persisted rows plus a payment link.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use uuid::Uuid;

use crate::contract::{BookingRecord, BookingRepository, PassengerRecord, PaymentGateway};
use crate::prompts;
use crate::session::{Session, Step};
use crate::{CoreError, CoreResult};

pub enum FinalizeOutcome {
    /// Booking persisted, payment link issued; the reply carries the link.
    Booked(String),
    /// Payment-link creation failed before any database write.
    LinkFailed,
}

pub async fn finalize_booking(
    payments: &dyn PaymentGateway,
    bookings: &dyn BookingRepository,
    user_id: &str,
    session: &mut Session,
    now: DateTime<Utc>,
) -> CoreResult<FinalizeOutcome> {
    let flight = session
        .selected_flight
        .clone()
        .ok_or_else(|| CoreError::InternalError("no selected flight at confirmation".into()))?;
    let lead = session
        .passengers
        .first()
        .ok_or_else(|| CoreError::InternalError("no passengers at confirmation".into()))?
        .clone();

    let booking_reference = format!("FB-{}", now.format("%Y%m%d%H%M%S"));
    let pid = Uuid::new_v4();
    let amount_minor = (flight.price * 100.0).round() as i64;
    let contact = user_id.strip_prefix("whatsapp:").unwrap_or(user_id);
    let description = format!("Flight booking {}", booking_reference);

    let link = match payments
        .create_payment_link(amount_minor, &flight.currency, &lead.name, contact, &description)
        .await
    {
        Ok(link) => link,
        Err(err) => {
            tracing::error!(user = user_id, error = %err, "payment link creation failed");
            return Ok(FinalizeOutcome::LinkFailed);
        }
    };

    // Payment link secured; persist the booking and its passengers.
    bookings
        .ensure_user(user_id)
        .await
        .map_err(|e| CoreError::PersistenceError(e.to_string()))?;

    let record = BookingRecord {
        pid,
        user_id: user_id.to_string(),
        origin_code: flight.departure_code.clone(),
        destination_code: flight.arrival_code.clone(),
        departure_at: flight.departure_at.clone(),
        arrival_at: flight.arrival_at.clone(),
        price: flight.price,
        airline_code: flight.airline_code.clone(),
        total_passengers: session.passengers.len() as i32,
        booking_reference: booking_reference.clone(),
        payment_reference: link.id.clone(),
    };
    bookings
        .insert_booking(&record)
        .await
        .map_err(|e| CoreError::PersistenceError(e.to_string()))?;

    let today = now.date_naive();
    for passenger in &session.passengers {
        let row = PassengerRecord {
            psrid: Uuid::new_v4(),
            pid,
            name: passenger.name.clone(),
            dob: derive_dob(passenger.age, today),
            gender: passenger.gender,
            seat: passenger.seat.clone(),
        };
        bookings
            .insert_passenger(&row)
            .await
            .map_err(|e| CoreError::PersistenceError(e.to_string()))?;
    }

    session.step = Step::AwaitingPayment;
    session.payment_reference = Some(link.id);
    session.booking_reference = Some(booking_reference.clone());

    let reply = prompts::booking_created(
        &booking_reference,
        &flight,
        session.passengers.len(),
        &link.url,
    );
    Ok(FinalizeOutcome::Booked(reply))
}

/// Implied birth date from age: today's month and day, year minus age.
/// Loses real-DOB precision by design; a Feb 29 anchor in a non-leap target
/// year falls back to Feb 28.
fn derive_dob(age: u32, today: NaiveDate) -> NaiveDate {
    let year = today.year() - age as i32;
    NaiveDate::from_ymd_opt(year, today.month(), today.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, today.month(), today.day() - 1))
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, 1, 1).expect("valid fallback date"))
}
