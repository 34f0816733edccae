//! User-facing reply text for every dialogue step.

use chrono::{Duration, NaiveDate};

use crate::contract::BookingSummary;
use crate::offer::FlightOffer;

pub const WAIT_NOTICE: &str = "Please wait a moment before sending another message.";

pub const WELCOME: &str =
    "Welcome to ✈️ Farebot!\n\nPlease enter the *departure city name* (e.g., New Delhi):";

pub const SESSION_STARTED: &str =
    "Session started.\n\nPlease enter the *departure city name* (e.g., New Delhi):";

pub const FATAL: &str =
    "An error occurred. Please try again later. Reply *hi* to start again.";

pub const ASK_ORIGIN_RETRY: &str = "Please enter a departure city name.";

pub const ASK_DESTINATION: &str =
    "Great! Now enter the *destination city name* (e.g., Mumbai):";

pub const ASK_DESTINATION_RETRY: &str = "Please enter a destination city name.";

pub const ASK_DATE: &str =
    "Awesome! Please enter the *departure date* in YYYY-MM-DD format:";

pub const INVALID_CITIES: &str = "❌ Invalid city names. Please check and try again.";

pub const NO_FLIGHTS: &str = "No flights found. Try a different date or route.";

pub const ASK_AGE: &str = "Enter their *age*:";

pub const INVALID_AGE: &str = "Please enter a valid age.";

pub const ASK_GENDER: &str = "Enter their *gender* (Male/Female/Other):";

pub const INVALID_GENDER: &str = "Please enter a valid gender.";

pub const ASK_SEAT: &str = "Enter their *preferred seat* (e.g., 12A):";

pub const ASK_SEAT_RETRY: &str = "Please enter a seat preference.";

pub const ASK_NAME_RETRY: &str = "Please enter the passenger's name.";

pub const MAX_PASSENGERS_REACHED: &str =
    "Max 6 passengers reached. Ready to confirm your booking. Reply *confirm* to proceed.";

pub const YES_OR_NO: &str = "Please reply with *yes* or *no*.";

pub const DETAILS_COMPLETED: &str =
    "Booking details completed. Reply *confirm* to proceed to payment.";

pub const CONFIRM_RETRY: &str = "Please reply with *confirm* to proceed to payment.";

pub const PAYMENT_LINK_FAILED: &str =
    "Failed to create payment link. Please try again later.";

pub const PAYMENT_INFO_MISSING: &str = "Payment info missing. Please contact support.";

pub const PAYMENT_NOT_DETECTED: &str =
    "⚠️ Payment not detected yet. Please make sure you completed the payment.\nIf you have paid, wait a moment and reply *paid* again.";

pub const AWAITING_PAYMENT_REMINDER: &str =
    "Waiting for payment confirmation.\nPlease reply with *paid* once you complete the payment.";

pub const ALREADY_CONFIRMED: &str =
    "Your booking is already confirmed.\nFor new booking, reply *hi* or *start*.";

pub const NO_BOOKING_HISTORY: &str = "❌ No bookings found for your number.";

pub fn invalid_date(today: NaiveDate, window_days: i64) -> String {
    let mut reply = format!(
        "❌ Invalid date.\n\nYou can only book flights from *today* to *{} days from today*.\nValid dates:\n",
        window_days
    );
    for i in 0..=window_days {
        let date = today + Duration::days(i);
        reply.push_str(&format!("✅ {}\n", date.format("%Y-%m-%d")));
    }
    reply
}

pub fn offer_list(offers: &[FlightOffer]) -> String {
    let mut reply = String::from("✈️ Available Flights:\n\n");
    for (idx, offer) in offers.iter().enumerate() {
        reply.push_str(&format!(
            "{}. {} ({}) ➡️ {} ({})\n   Airline: {}, Price: {} {:.2}\n\n",
            idx + 1,
            offer.departure_code,
            offer.departure_at,
            offer.arrival_code,
            offer.arrival_at,
            offer.airline_code,
            offer.currency,
            offer.price,
        ));
    }
    reply.push_str(&format!(
        "Please reply with the flight number (1–{}) to confirm your choice.",
        offers.len()
    ));
    reply
}

pub fn invalid_flight_choice(count: usize) -> String {
    format!(
        "Invalid choice. Please reply with a number between 1 and {}.",
        count
    )
}

pub fn ask_passenger_name(number: usize) -> String {
    format!("Please enter the *name* of passenger {}:", number)
}

pub fn passenger_added(number: usize) -> String {
    format!(
        "Passenger {} added ✅\nDo you want to add another passenger? (yes/no)",
        number
    )
}

pub fn booking_created(
    booking_reference: &str,
    flight: &FlightOffer,
    total_passengers: usize,
    payment_url: &str,
) -> String {
    format!(
        "🎉 Booking Created!\n\n\
         📌 Ref: *{}*\n\
         {} → {}\n\
         Departure: {}\n\
         Arrival: {}\n\
         Airline: {}\n\
         Total Passengers: {}\n\n\
         💰 Price: {} {:.2}\n\
         Please complete your payment using the following link:\n{}\n\n\
         After payment, reply with *paid* to confirm your booking.",
        booking_reference,
        flight.departure_code,
        flight.arrival_code,
        flight.departure_at,
        flight.arrival_at,
        flight.airline_code,
        total_passengers,
        flight.currency,
        flight.price,
        payment_url,
    )
}

pub fn payment_confirmed(ticket_reference: Option<&str>) -> String {
    let mut reply = String::from(
        "✅ Payment confirmed.\n\
         Your ticket booking is successful! 🎉\n\
         Thank you for booking with Farebot.\n\
         Have a pleasant journey! ✈️",
    );
    if let Some(ticket) = ticket_reference {
        reply.push_str(&format!("\nYou can download your ticket here: {}", ticket));
    }
    reply
}

pub fn booking_history(bookings: &[BookingSummary]) -> String {
    let mut reply = String::from("🧾 *Your Recent Bookings:*\n\n");
    for (idx, b) in bookings.iter().enumerate() {
        reply.push_str(&format!(
            "{}. Ref: *{}*\n   ✈️ {} → {}\n   🕒 {} → {}\n   👥 Passengers: {}\n   💰 Price: {:.2}\n\n",
            idx + 1,
            b.booking_reference,
            b.origin_code,
            b.destination_code,
            b.departure_at,
            b.arrival_at,
            b.total_passengers,
            b.price,
        ));
    }
    reply.push_str("Reply *hi* to start a new booking.");
    reply
}
