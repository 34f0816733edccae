//! The conversation state machine: pre-step rules (debounce, greeting,
//! history, expiry) followed by per-step dispatch. One inbound message in,
//! one reply out; the session store is updated only when a step completes.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use dashmap::DashMap;

use crate::contract::{
    BookingRepository, FlightSearch, LocationResolver, PaymentGateway, SessionStore,
    TicketRenderer,
};
use crate::finalizer::{finalize_booking, FinalizeOutcome};
use crate::normalize::{title_case, Normalized};
use crate::prompts;
use crate::session::{Gender, PassengerDraft, Session, Step, MAX_PASSENGERS};
use crate::{CoreError, CoreResult};

const GREETINGS: [&str; 3] = ["Hi", "Hello", "Start"];
const PAYMENT_KEYWORDS: [&str; 3] = ["paid", "payment done", "done"];
const HISTORY_LIMIT: i64 = 5;

/// Dialogue tunables. Defaults match the product rules: 2 s debounce,
/// 1 h session expiry, bookings up to 10 days out, 5 offers shown.
#[derive(Debug, Clone)]
pub struct ConversationRules {
    pub debounce_seconds: i64,
    pub session_ttl_seconds: i64,
    pub booking_window_days: i64,
    pub max_offers: usize,
}

impl Default for ConversationRules {
    fn default() -> Self {
        Self {
            debounce_seconds: 2,
            session_ttl_seconds: 3600,
            booking_window_days: 10,
            max_offers: 5,
        }
    }
}

/// The collaborators the dialogue engine drives.
pub struct EngineDeps {
    pub sessions: Arc<dyn SessionStore>,
    pub resolver: Arc<dyn LocationResolver>,
    pub search: Arc<dyn FlightSearch>,
    pub payments: Arc<dyn PaymentGateway>,
    pub bookings: Arc<dyn BookingRepository>,
    pub tickets: Arc<dyn TicketRenderer>,
}

pub struct DialogueEngine {
    deps: EngineDeps,
    rules: ConversationRules,
    last_seen: DashMap<String, DateTime<Utc>>,
}

impl DialogueEngine {
    pub fn new(deps: EngineDeps, rules: ConversationRules) -> Self {
        Self {
            deps,
            rules,
            last_seen: DashMap::new(),
        }
    }

    /// Handle one inbound message and produce the reply body. Never fails:
    /// an unexpected error discards the session and yields a restart notice.
    pub async fn handle_message(&self, user_id: &str, body: &str) -> String {
        let now = Utc::now();

        // Debounce before touching any state; a rejected message does not
        // count as an interaction.
        let debounced = self
            .last_seen
            .get(user_id)
            .map(|seen| now - *seen < Duration::seconds(self.rules.debounce_seconds))
            .unwrap_or(false);
        if debounced {
            return prompts::WAIT_NOTICE.to_string();
        }
        self.last_seen.insert(user_id.to_string(), now);

        let input = Normalized::new(body);
        match self.process(user_id, &input, now).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::error!(user = user_id, error = %err, "dialogue step failed, discarding session");
                if let Err(del_err) = self.deps.sessions.delete(user_id).await {
                    tracing::warn!(user = user_id, error = %del_err, "failed to discard session");
                }
                prompts::FATAL.to_string()
            }
        }
    }

    async fn process(
        &self,
        user_id: &str,
        input: &Normalized,
        now: DateTime<Utc>,
    ) -> CoreResult<String> {
        // Greeting commands restart the dialogue from any step.
        if GREETINGS.contains(&input.canonical.as_str()) {
            self.reset_session(user_id, now).await?;
            return Ok(prompts::WELCOME.to_string());
        }

        // Read-only lookup; leaves the session untouched.
        if input.is("history") {
            return self.booking_history(user_id).await;
        }

        let existing = self
            .deps
            .sessions
            .get(user_id)
            .await
            .map_err(|e| CoreError::StoreError(e.to_string()))?;
        let mut session = match existing {
            Some(s) if !s.is_expired(now, self.rules.session_ttl_seconds) => s,
            _ => {
                // The triggering message is consumed by the reset.
                self.reset_session(user_id, now).await?;
                return Ok(prompts::SESSION_STARTED.to_string());
            }
        };

        session.touch(now);
        let reply = self.dispatch(user_id, &mut session, input, now).await?;
        self.deps
            .sessions
            .put(user_id, session)
            .await
            .map_err(|e| CoreError::StoreError(e.to_string()))?;
        Ok(reply)
    }

    async fn dispatch(
        &self,
        user_id: &str,
        session: &mut Session,
        input: &Normalized,
        now: DateTime<Utc>,
    ) -> CoreResult<String> {
        match session.step {
            Step::AskOrigin => Ok(on_origin(session, input)),
            Step::AskDestination => Ok(on_destination(session, input)),
            Step::AskDate => self.on_date(session, input, now).await,
            Step::SelectFlight => Ok(on_select_flight(session, input)),
            Step::AskName => Ok(on_name(session, input)),
            Step::AskAge => on_age(session, input),
            Step::AskGender => on_gender(session, input),
            Step::AskSeat => on_seat(session, input),
            Step::AddAnotherPassenger => Ok(on_add_another(session, input)),
            Step::ConfirmBooking => self.on_confirm(user_id, session, input, now).await,
            Step::AwaitingPayment => self.on_awaiting_payment(session, input).await,
            Step::BookingConfirmed => Ok(prompts::ALREADY_CONFIRMED.to_string()),
        }
    }

    async fn reset_session(&self, user_id: &str, now: DateTime<Utc>) -> CoreResult<()> {
        self.deps
            .sessions
            .put(user_id, Session::new(now))
            .await
            .map_err(|e| CoreError::StoreError(e.to_string()))
    }

    async fn booking_history(&self, user_id: &str) -> CoreResult<String> {
        let bookings = self
            .deps
            .bookings
            .recent_bookings(user_id, HISTORY_LIMIT)
            .await
            .map_err(|e| CoreError::PersistenceError(e.to_string()))?;
        if bookings.is_empty() {
            return Ok(prompts::NO_BOOKING_HISTORY.to_string());
        }
        Ok(prompts::booking_history(&bookings))
    }

    async fn on_date(
        &self,
        session: &mut Session,
        input: &Normalized,
        now: DateTime<Utc>,
    ) -> CoreResult<String> {
        let today = now.date_naive();
        let date = match parse_departure_date(&input.raw, today, self.rules.booking_window_days) {
            Some(date) => date,
            None => return Ok(prompts::invalid_date(today, self.rules.booking_window_days)),
        };
        session.date = Some(date);

        let origin_code = match self.resolve(&session.origin).await {
            Some(code) => code,
            None => return Ok(prompts::INVALID_CITIES.to_string()),
        };
        let destination_code = match self.resolve(&session.destination).await {
            Some(code) => code,
            None => return Ok(prompts::INVALID_CITIES.to_string()),
        };

        let offers = match self
            .deps
            .search
            .search_offers(&origin_code, &destination_code, date)
            .await
        {
            Ok(offers) => offers,
            Err(err) => {
                tracing::warn!(error = %err, "flight search failed");
                Vec::new()
            }
        };
        if offers.is_empty() {
            return Ok(prompts::NO_FLIGHTS.to_string());
        }

        session.flights = offers
            .into_iter()
            .take(self.rules.max_offers)
            .collect();
        session.step = Step::SelectFlight;
        Ok(prompts::offer_list(&session.flights))
    }

    async fn resolve(&self, city: &str) -> Option<String> {
        match self.deps.resolver.resolve_location_code(city).await {
            Ok(code) => code,
            Err(err) => {
                tracing::warn!(city, error = %err, "location resolution failed");
                None
            }
        }
    }

    async fn on_confirm(
        &self,
        user_id: &str,
        session: &mut Session,
        input: &Normalized,
        now: DateTime<Utc>,
    ) -> CoreResult<String> {
        if !input.is("confirm") {
            return Ok(prompts::CONFIRM_RETRY.to_string());
        }
        let outcome = finalize_booking(
            self.deps.payments.as_ref(),
            self.deps.bookings.as_ref(),
            user_id,
            session,
            now,
        )
        .await?;
        match outcome {
            FinalizeOutcome::Booked(reply) => Ok(reply),
            FinalizeOutcome::LinkFailed => Ok(prompts::PAYMENT_LINK_FAILED.to_string()),
        }
    }

    async fn on_awaiting_payment(
        &self,
        session: &mut Session,
        input: &Normalized,
    ) -> CoreResult<String> {
        let lowered = input.raw.to_lowercase();
        if !PAYMENT_KEYWORDS.contains(&lowered.as_str()) {
            return Ok(prompts::AWAITING_PAYMENT_REMINDER.to_string());
        }

        let reference = match session.payment_reference.clone() {
            Some(reference) => reference,
            None => return Ok(prompts::PAYMENT_INFO_MISSING.to_string()),
        };

        // Fail closed: a provider error reads as "not captured yet".
        let captured = self
            .deps
            .payments
            .is_payment_captured(&reference)
            .await
            .unwrap_or_else(|err| {
                tracing::warn!(%reference, error = %err, "payment status check failed");
                false
            });
        if !captured {
            return Ok(prompts::PAYMENT_NOT_DETECTED.to_string());
        }

        session.payment_confirmed = true;
        session.step = Step::BookingConfirmed;

        // The capture itself is verified; the row can be reconciled from the
        // provider by reference if this update is lost.
        if let Err(err) = self.deps.bookings.mark_paid(&reference).await {
            tracing::error!(%reference, error = %err, "failed to mark booking paid");
        }

        let ticket = match (&session.booking_reference, &session.selected_flight) {
            (Some(booking_reference), Some(flight)) => self
                .deps
                .tickets
                .render_ticket(booking_reference, flight, &session.passengers)
                .await
                .map_err(|err| {
                    tracing::error!(error = %err, "ticket rendering failed");
                })
                .ok(),
            _ => None,
        };
        Ok(prompts::payment_confirmed(ticket.as_deref()))
    }
}

fn parse_departure_date(raw: &str, today: NaiveDate, window_days: i64) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .filter(|date| *date >= today && *date <= today + Duration::days(window_days))
}

fn on_origin(session: &mut Session, input: &Normalized) -> String {
    if input.is_empty() {
        return prompts::ASK_ORIGIN_RETRY.to_string();
    }
    session.origin = input.canonical.clone();
    session.step = Step::AskDestination;
    prompts::ASK_DESTINATION.to_string()
}

fn on_destination(session: &mut Session, input: &Normalized) -> String {
    if input.is_empty() {
        return prompts::ASK_DESTINATION_RETRY.to_string();
    }
    session.destination = input.canonical.clone();
    session.step = Step::AskDate;
    prompts::ASK_DATE.to_string()
}

fn on_select_flight(session: &mut Session, input: &Normalized) -> String {
    let count = session.flights.len();
    let choice = input
        .raw
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=count).contains(n));
    match choice {
        Some(n) => {
            session.selected_flight = Some(session.flights[n - 1].clone());
            session.step = Step::AskName;
            prompts::ask_passenger_name(1)
        }
        None => prompts::invalid_flight_choice(count),
    }
}

fn on_name(session: &mut Session, input: &Normalized) -> String {
    if input.is_empty() {
        return prompts::ASK_NAME_RETRY.to_string();
    }
    session.current_passenger = Some(PassengerDraft::new(title_case(&input.raw)));
    session.step = Step::AskAge;
    prompts::ASK_AGE.to_string()
}

fn on_age(session: &mut Session, input: &Normalized) -> CoreResult<String> {
    let draft = session
        .current_passenger
        .as_mut()
        .ok_or_else(|| CoreError::InternalError("no passenger draft at age step".into()))?;
    match input.raw.parse::<u32>() {
        Ok(age) if age > 0 => {
            draft.age = Some(age);
            session.step = Step::AskGender;
            Ok(prompts::ASK_GENDER.to_string())
        }
        _ => Ok(prompts::INVALID_AGE.to_string()),
    }
}

fn on_gender(session: &mut Session, input: &Normalized) -> CoreResult<String> {
    let draft = session
        .current_passenger
        .as_mut()
        .ok_or_else(|| CoreError::InternalError("no passenger draft at gender step".into()))?;
    match Gender::parse(&input.raw) {
        Some(gender) => {
            draft.gender = Some(gender);
            session.step = Step::AskSeat;
            Ok(prompts::ASK_SEAT.to_string())
        }
        None => Ok(prompts::INVALID_GENDER.to_string()),
    }
}

fn on_seat(session: &mut Session, input: &Normalized) -> CoreResult<String> {
    if input.is_empty() {
        return Ok(prompts::ASK_SEAT_RETRY.to_string());
    }
    let draft = session
        .current_passenger
        .take()
        .ok_or_else(|| CoreError::InternalError("no passenger draft at seat step".into()))?;
    let passenger = draft
        .complete(input.raw.to_uppercase())
        .ok_or_else(|| CoreError::InternalError("incomplete passenger draft at seat step".into()))?;
    session.passengers.push(passenger);

    let count = session.passengers.len();
    if count < MAX_PASSENGERS {
        session.step = Step::AddAnotherPassenger;
        Ok(prompts::passenger_added(count))
    } else {
        session.step = Step::ConfirmBooking;
        Ok(prompts::MAX_PASSENGERS_REACHED.to_string())
    }
}

fn on_add_another(session: &mut Session, input: &Normalized) -> String {
    if input.is("yes") {
        session.step = Step::AskName;
        prompts::ask_passenger_name(session.passengers.len() + 1)
    } else if input.is("no") {
        session.step = Step::ConfirmBooking;
        prompts::DETAILS_COMPLETED.to_string()
    } else {
        prompts::YES_OR_NO.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{
        BookingRecord, BookingSummary, PassengerRecord, PaymentLink,
    };
    use crate::offer::FlightOffer;
    use crate::session::Passenger;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    type BoxError = Box<dyn std::error::Error + Send + Sync>;

    #[derive(Default)]
    struct MemoryStore {
        sessions: DashMap<String, Session>,
    }

    #[async_trait]
    impl SessionStore for MemoryStore {
        async fn get(&self, user_id: &str) -> Result<Option<Session>, BoxError> {
            Ok(self.sessions.get(user_id).map(|s| s.clone()))
        }

        async fn put(&self, user_id: &str, session: Session) -> Result<(), BoxError> {
            self.sessions.insert(user_id.to_string(), session);
            Ok(())
        }

        async fn delete(&self, user_id: &str) -> Result<(), BoxError> {
            self.sessions.remove(user_id);
            Ok(())
        }
    }

    struct StaticResolver;

    #[async_trait]
    impl LocationResolver for StaticResolver {
        async fn resolve_location_code(
            &self,
            city_name: &str,
        ) -> Result<Option<String>, BoxError> {
            Ok(match city_name.to_lowercase().as_str() {
                "new delhi" => Some("DEL".to_string()),
                "mumbai" => Some("BOM".to_string()),
                _ => None,
            })
        }
    }

    struct StaticSearch {
        offers: Vec<FlightOffer>,
    }

    #[async_trait]
    impl FlightSearch for StaticSearch {
        async fn search_offers(
            &self,
            _origin_code: &str,
            _destination_code: &str,
            _date: NaiveDate,
        ) -> Result<Vec<FlightOffer>, BoxError> {
            Ok(self.offers.clone())
        }
    }

    #[derive(Default)]
    struct RecordingPayments {
        fail_link: bool,
        captured: AtomicBool,
        amounts: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl PaymentGateway for RecordingPayments {
        async fn create_payment_link(
            &self,
            amount_minor: i64,
            _currency: &str,
            _customer_name: &str,
            _customer_contact: &str,
            _description: &str,
        ) -> Result<PaymentLink, BoxError> {
            if self.fail_link {
                return Err("gateway unavailable".into());
            }
            self.amounts.lock().unwrap().push(amount_minor);
            Ok(PaymentLink {
                id: "plink_test".to_string(),
                url: "https://pay.example/plink_test".to_string(),
            })
        }

        async fn is_payment_captured(
            &self,
            _payment_reference: &str,
        ) -> Result<bool, BoxError> {
            Ok(self.captured.load(Ordering::SeqCst))
        }
    }

    #[derive(Default)]
    struct RecordingRepo {
        fail_writes: bool,
        bookings: Mutex<Vec<BookingRecord>>,
        passengers: Mutex<Vec<PassengerRecord>>,
        paid: Mutex<Vec<String>>,
        history: Vec<BookingSummary>,
    }

    #[async_trait]
    impl BookingRepository for RecordingRepo {
        async fn ensure_user(&self, _user_id: &str) -> Result<(), BoxError> {
            if self.fail_writes {
                return Err("database unavailable".into());
            }
            Ok(())
        }

        async fn insert_booking(&self, booking: &BookingRecord) -> Result<(), BoxError> {
            if self.fail_writes {
                return Err("database unavailable".into());
            }
            self.bookings.lock().unwrap().push(booking.clone());
            Ok(())
        }

        async fn insert_passenger(&self, passenger: &PassengerRecord) -> Result<(), BoxError> {
            self.passengers.lock().unwrap().push(passenger.clone());
            Ok(())
        }

        async fn mark_paid(&self, payment_reference: &str) -> Result<(), BoxError> {
            self.paid.lock().unwrap().push(payment_reference.to_string());
            Ok(())
        }

        async fn recent_bookings(
            &self,
            _user_id: &str,
            _limit: i64,
        ) -> Result<Vec<BookingSummary>, BoxError> {
            Ok(self.history.clone())
        }
    }

    struct FakeTickets;

    #[async_trait]
    impl TicketRenderer for FakeTickets {
        async fn render_ticket(
            &self,
            booking_reference: &str,
            _flight: &FlightOffer,
            _passengers: &[Passenger],
        ) -> Result<String, BoxError> {
            Ok(format!("{}.pdf", booking_reference))
        }
    }

    struct Harness {
        engine: DialogueEngine,
        store: Arc<MemoryStore>,
        payments: Arc<RecordingPayments>,
        repo: Arc<RecordingRepo>,
    }

    const USER: &str = "whatsapp:+919800000001";

    fn sample_offers(n: usize) -> Vec<FlightOffer> {
        (0..n)
            .map(|i| FlightOffer {
                departure_code: "DEL".to_string(),
                departure_at: format!("2026-08-10T0{}:30:00", i + 1),
                arrival_code: "BOM".to_string(),
                arrival_at: format!("2026-08-10T0{}:40:00", i + 3),
                airline_code: "AI".to_string(),
                price: 5000.0 + i as f64,
                currency: "INR".to_string(),
            })
            .collect()
    }

    fn harness_with(
        offers: Vec<FlightOffer>,
        payments: RecordingPayments,
        repo: RecordingRepo,
        rules: ConversationRules,
    ) -> Harness {
        let store = Arc::new(MemoryStore::default());
        let payments = Arc::new(payments);
        let repo = Arc::new(repo);
        let engine = DialogueEngine::new(
            EngineDeps {
                sessions: store.clone(),
                resolver: Arc::new(StaticResolver),
                search: Arc::new(StaticSearch { offers }),
                payments: payments.clone(),
                bookings: repo.clone(),
                tickets: Arc::new(FakeTickets),
            },
            rules,
        );
        Harness {
            engine,
            store,
            payments,
            repo,
        }
    }

    fn harness(offers: Vec<FlightOffer>) -> Harness {
        harness_with(
            offers,
            RecordingPayments::default(),
            RecordingRepo::default(),
            ConversationRules {
                debounce_seconds: 0,
                ..ConversationRules::default()
            },
        )
    }

    fn step_of(h: &Harness) -> Step {
        h.store.sessions.get(USER).unwrap().step
    }

    fn valid_date() -> String {
        (Utc::now().date_naive() + Duration::days(3))
            .format("%Y-%m-%d")
            .to_string()
    }

    async fn drive_to_date(h: &Harness) {
        h.engine.handle_message(USER, "hi").await;
        h.engine.handle_message(USER, "New Delhi").await;
        h.engine.handle_message(USER, "Mumbai").await;
        assert_eq!(step_of(h), Step::AskDate);
    }

    async fn add_passenger(h: &Harness, name: &str) {
        h.engine.handle_message(USER, name).await;
        h.engine.handle_message(USER, "30").await;
        h.engine.handle_message(USER, "female").await;
        h.engine.handle_message(USER, "12a").await;
    }

    async fn drive_to_confirm(h: &Harness) {
        drive_to_date(h).await;
        h.engine.handle_message(USER, &valid_date()).await;
        h.engine.handle_message(USER, "2").await;
        add_passenger(h, "asha rao").await;
        h.engine.handle_message(USER, "no").await;
        assert_eq!(step_of(h), Step::ConfirmBooking);
    }

    async fn drive_to_awaiting_payment(h: &Harness) {
        drive_to_confirm(h).await;
        h.engine.handle_message(USER, "confirm").await;
        assert_eq!(step_of(h), Step::AwaitingPayment);
    }

    #[tokio::test]
    async fn greeting_starts_session() {
        let h = harness(sample_offers(3));
        let reply = h.engine.handle_message(USER, "hi").await;
        assert_eq!(reply, prompts::WELCOME);
        assert_eq!(step_of(&h), Step::AskOrigin);
    }

    #[tokio::test]
    async fn greeting_resets_mid_flow() {
        let h = harness(sample_offers(3));
        drive_to_date(&h).await;
        let reply = h.engine.handle_message(USER, "Hello").await;
        assert_eq!(reply, prompts::WELCOME);
        let session = h.store.sessions.get(USER).unwrap().clone();
        assert_eq!(session.step, Step::AskOrigin);
        assert!(session.origin.is_empty());
        assert!(session.passengers.is_empty());
    }

    #[tokio::test]
    async fn date_outside_window_rejected_with_valid_dates() {
        let h = harness(sample_offers(3));
        drive_to_date(&h).await;
        let late = (Utc::now().date_naive() + Duration::days(20))
            .format("%Y-%m-%d")
            .to_string();
        let reply = h.engine.handle_message(USER, &late).await;
        assert!(reply.contains("Invalid date"));
        assert_eq!(reply.matches('✅').count(), 11);
        assert_eq!(step_of(&h), Step::AskDate);

        let reply = h.engine.handle_message(USER, "not-a-date").await;
        assert!(reply.contains("Invalid date"));
        assert_eq!(step_of(&h), Step::AskDate);
    }

    #[tokio::test]
    async fn unknown_city_keeps_date_step() {
        let h = harness(sample_offers(3));
        h.engine.handle_message(USER, "hi").await;
        h.engine.handle_message(USER, "Atlantis").await;
        h.engine.handle_message(USER, "Mumbai").await;
        let reply = h.engine.handle_message(USER, &valid_date()).await;
        assert_eq!(reply, prompts::INVALID_CITIES);
        assert_eq!(step_of(&h), Step::AskDate);
    }

    #[tokio::test]
    async fn empty_search_keeps_date_step() {
        let h = harness(Vec::new());
        drive_to_date(&h).await;
        let reply = h.engine.handle_message(USER, &valid_date()).await;
        assert_eq!(reply, prompts::NO_FLIGHTS);
        assert_eq!(step_of(&h), Step::AskDate);
    }

    #[tokio::test]
    async fn flight_selection_bounds_checked() {
        let h = harness(sample_offers(3));
        drive_to_date(&h).await;
        h.engine.handle_message(USER, &valid_date()).await;
        assert_eq!(step_of(&h), Step::SelectFlight);

        let reply = h.engine.handle_message(USER, "5").await;
        assert!(reply.contains("between 1 and 3"));
        assert_eq!(step_of(&h), Step::SelectFlight);

        let reply = h.engine.handle_message(USER, "0").await;
        assert!(reply.contains("Invalid choice"));

        h.engine.handle_message(USER, "2").await;
        let session = h.store.sessions.get(USER).unwrap().clone();
        assert_eq!(session.step, Step::AskName);
        assert_eq!(session.selected_flight.as_ref(), session.flights.get(1));
    }

    #[tokio::test]
    async fn invalid_age_and_gender_reprompt() {
        let h = harness(sample_offers(3));
        drive_to_date(&h).await;
        h.engine.handle_message(USER, &valid_date()).await;
        h.engine.handle_message(USER, "1").await;
        h.engine.handle_message(USER, "asha rao").await;

        assert_eq!(
            h.engine.handle_message(USER, "-3").await,
            prompts::INVALID_AGE
        );
        assert_eq!(
            h.engine.handle_message(USER, "0").await,
            prompts::INVALID_AGE
        );
        h.engine.handle_message(USER, "30").await;

        assert_eq!(
            h.engine.handle_message(USER, "unsure").await,
            prompts::INVALID_GENDER
        );
        h.engine.handle_message(USER, "FEMALE").await;
        assert_eq!(step_of(&h), Step::AskSeat);
    }

    #[tokio::test]
    async fn passenger_fields_are_normalized() {
        let h = harness(sample_offers(3));
        drive_to_confirm(&h).await;
        let session = h.store.sessions.get(USER).unwrap().clone();
        let passenger = &session.passengers[0];
        assert_eq!(passenger.name, "Asha Rao");
        assert_eq!(passenger.seat, "12A");
        assert_eq!(passenger.gender, Gender::Female);
    }

    #[tokio::test]
    async fn passenger_cap_forces_confirmation() {
        let h = harness(sample_offers(3));
        drive_to_date(&h).await;
        h.engine.handle_message(USER, &valid_date()).await;
        h.engine.handle_message(USER, "1").await;

        for i in 0..5 {
            add_passenger(&h, &format!("passenger {}", i + 1)).await;
            assert_eq!(step_of(&h), Step::AddAnotherPassenger);
            h.engine.handle_message(USER, "yes").await;
        }
        add_passenger(&h, "passenger 6").await;

        let session = h.store.sessions.get(USER).unwrap().clone();
        assert_eq!(session.passengers.len(), MAX_PASSENGERS);
        assert_eq!(session.step, Step::ConfirmBooking);

        // Further "add another" answers cannot reopen passenger entry.
        let reply = h.engine.handle_message(USER, "yes").await;
        assert_eq!(reply, prompts::CONFIRM_RETRY);
        assert_eq!(step_of(&h), Step::ConfirmBooking);
    }

    #[tokio::test]
    async fn confirm_creates_booking_and_payment_link() {
        let h = harness(sample_offers(3));
        drive_to_confirm(&h).await;
        let reply = h.engine.handle_message(USER, "confirm").await;
        assert!(reply.contains("Booking Created"));
        assert!(reply.contains("https://pay.example/plink_test"));

        let session = h.store.sessions.get(USER).unwrap().clone();
        assert_eq!(session.step, Step::AwaitingPayment);
        assert_eq!(session.payment_reference.as_deref(), Some("plink_test"));
        assert!(session.booking_reference.as_deref().unwrap().starts_with("FB-"));

        let bookings = h.repo.bookings.lock().unwrap();
        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0].total_passengers, 1);
        assert_eq!(bookings[0].payment_reference, "plink_test");
        assert_eq!(h.repo.passengers.lock().unwrap().len(), 1);
        // Second offer of the sample set, in minor units.
        assert_eq!(h.payments.amounts.lock().unwrap()[0], 500_100);
    }

    #[tokio::test]
    async fn link_failure_keeps_confirm_state_and_writes_nothing() {
        let h = harness_with(
            sample_offers(3),
            RecordingPayments {
                fail_link: true,
                ..RecordingPayments::default()
            },
            RecordingRepo::default(),
            ConversationRules {
                debounce_seconds: 0,
                ..ConversationRules::default()
            },
        );
        drive_to_confirm(&h).await;
        let reply = h.engine.handle_message(USER, "confirm").await;
        assert_eq!(reply, prompts::PAYMENT_LINK_FAILED);
        assert_eq!(step_of(&h), Step::ConfirmBooking);
        assert!(h.repo.bookings.lock().unwrap().is_empty());
        assert!(h.repo.passengers.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn awaiting_payment_is_idempotent_for_unrecognized_input() {
        let h = harness(sample_offers(3));
        drive_to_awaiting_payment(&h).await;

        let reply = h.engine.handle_message(USER, "when is my flight?").await;
        assert_eq!(reply, prompts::AWAITING_PAYMENT_REMINDER);
        let session = h.store.sessions.get(USER).unwrap().clone();
        assert_eq!(session.step, Step::AwaitingPayment);
        assert!(!session.payment_confirmed);

        let reply = h.engine.handle_message(USER, "paid").await;
        assert_eq!(reply, prompts::PAYMENT_NOT_DETECTED);
        let session = h.store.sessions.get(USER).unwrap().clone();
        assert_eq!(session.step, Step::AwaitingPayment);
        assert!(!session.payment_confirmed);
    }

    #[tokio::test]
    async fn capture_confirms_booking_and_renders_ticket() {
        let h = harness(sample_offers(3));
        drive_to_awaiting_payment(&h).await;
        h.payments.captured.store(true, Ordering::SeqCst);

        let reply = h.engine.handle_message(USER, "Payment Done").await;
        assert!(reply.contains("Payment confirmed"));
        assert!(reply.contains(".pdf"));

        let session = h.store.sessions.get(USER).unwrap().clone();
        assert_eq!(session.step, Step::BookingConfirmed);
        assert!(session.payment_confirmed);
        assert_eq!(h.repo.paid.lock().unwrap().as_slice(), ["plink_test"]);

        let reply = h.engine.handle_message(USER, "thanks").await;
        assert_eq!(reply, prompts::ALREADY_CONFIRMED);
    }

    #[tokio::test]
    async fn debounce_rejects_rapid_messages() {
        let h = harness_with(
            sample_offers(3),
            RecordingPayments::default(),
            RecordingRepo::default(),
            ConversationRules::default(),
        );
        let reply = h.engine.handle_message(USER, "hi").await;
        assert_eq!(reply, prompts::WELCOME);

        let reply = h.engine.handle_message(USER, "New Delhi").await;
        assert_eq!(reply, prompts::WAIT_NOTICE);
        assert_eq!(step_of(&h), Step::AskOrigin);
    }

    #[tokio::test]
    async fn expired_session_restarts_dialogue() {
        let h = harness(sample_offers(3));
        let mut stale = Session::new(Utc::now() - Duration::hours(2));
        stale.step = Step::AskDate;
        h.store.sessions.insert(USER.to_string(), stale);

        let reply = h.engine.handle_message(USER, "Mumbai").await;
        assert_eq!(reply, prompts::SESSION_STARTED);
        assert_eq!(step_of(&h), Step::AskOrigin);
    }

    #[tokio::test]
    async fn missing_session_restarts_dialogue() {
        let h = harness(sample_offers(3));
        let reply = h.engine.handle_message(USER, "Mumbai").await;
        assert_eq!(reply, prompts::SESSION_STARTED);
        assert_eq!(step_of(&h), Step::AskOrigin);
    }

    #[tokio::test]
    async fn history_lists_recent_bookings_without_touching_session() {
        let h = harness_with(
            sample_offers(3),
            RecordingPayments::default(),
            RecordingRepo {
                history: vec![BookingSummary {
                    booking_reference: "FB-20260801120000".to_string(),
                    origin_code: "DEL".to_string(),
                    destination_code: "BOM".to_string(),
                    departure_at: "2026-08-10T07:30:00".to_string(),
                    arrival_at: "2026-08-10T09:40:00".to_string(),
                    total_passengers: 2,
                    price: 10800.0,
                }],
                ..RecordingRepo::default()
            },
            ConversationRules {
                debounce_seconds: 0,
                ..ConversationRules::default()
            },
        );

        let reply = h.engine.handle_message(USER, "history").await;
        assert!(reply.contains("FB-20260801120000"));
        assert!(h.store.sessions.get(USER).is_none());
    }

    #[tokio::test]
    async fn history_with_no_bookings() {
        let h = harness(sample_offers(3));
        let reply = h.engine.handle_message(USER, "HISTORY").await;
        assert_eq!(reply, prompts::NO_BOOKING_HISTORY);
    }

    #[tokio::test]
    async fn persistence_failure_discards_session() {
        let h = harness_with(
            sample_offers(3),
            RecordingPayments::default(),
            RecordingRepo {
                fail_writes: true,
                ..RecordingRepo::default()
            },
            ConversationRules {
                debounce_seconds: 0,
                ..ConversationRules::default()
            },
        );
        drive_to_confirm(&h).await;
        let reply = h.engine.handle_message(USER, "confirm").await;
        assert_eq!(reply, prompts::FATAL);
        assert!(h.store.sessions.get(USER).is_none());
    }
}
