use chrono::{Duration, NaiveDate, Utc};
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::db::queries;
use crate::models::{weekday_index, AvailabilityDay, Booking, BookingStatus, Slot};

#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid email format")]
    InvalidEmail,
    #[error("invalid slot: must be one of morning, afternoon, evening")]
    InvalidSlot,
    #[error("invalid date: use YYYY-MM-DD")]
    InvalidDate,
    #[error("date is in the past")]
    PastDate,
    #[error("invalid day of week: use 0-6 (Sunday = 0)")]
    InvalidWeekday,
    #[error("business is not open for that slot on that date")]
    SlotNotOffered { open_slots: Vec<Slot> },
    #[error("slot is already booked")]
    SlotConflict,
    #[error("booking not found")]
    NotFound,
    #[error("invalid status: must be one of pending, confirmed, completed, cancelled")]
    InvalidStatus,
    #[error("store unavailable: {0}")]
    Store(#[from] rusqlite::Error),
}

/// A bookable calendar date with the slots still open on it.
#[derive(Debug, Clone, Serialize)]
pub struct AvailableDate {
    pub date: NaiveDate,
    pub day_of_week: u8,
    pub open_slots: Vec<Slot>,
}

/// Incoming booking request. Every field is optional at the wire level so
/// that missing-field errors name the field instead of failing to parse.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationRequest {
    pub business_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_address: Option<String>,
    pub service_type: Option<String>,
    pub date: Option<String>,
    pub slot: Option<String>,
    pub description: Option<String>,
}

/// Upper bound on how far ahead a scan will look. The scan runs one
/// template lookup and one conflict query per day while the caller holds
/// the connection, so the horizon must stay bounded no matter what the
/// request asks for.
pub const MAX_HORIZON_DAYS: i64 = 365;

/// Walks the calendar from tomorrow through `horizon_days` days out and
/// returns every date where the weekly template is open and at least one
/// slot has no active booking. Dates are emitted in ascending order.
/// Horizons beyond [`MAX_HORIZON_DAYS`] are clamped.
pub fn available_dates(
    conn: &Connection,
    business_id: &str,
    horizon_days: i64,
    today: NaiveDate,
) -> Result<Vec<AvailableDate>, SchedulingError> {
    let horizon_days = horizon_days.clamp(0, MAX_HORIZON_DAYS);
    let week = queries::get_week_availability(conn, business_id)?;
    if !week.iter().any(|day| day.any_open()) {
        return Ok(vec![]);
    }

    let mut dates = vec![];
    for offset in 1..=horizon_days {
        let date = today + Duration::days(offset);
        let weekday = weekday_index(date);

        let day = match week.iter().find(|d| d.day_of_week == weekday) {
            Some(day) if day.any_open() => day,
            _ => continue,
        };

        let booked = queries::booked_slots(conn, business_id, date)?;
        let open_slots: Vec<Slot> = day
            .open_slots()
            .into_iter()
            .filter(|slot| !booked.contains(slot))
            .collect();
        if open_slots.is_empty() {
            continue;
        }

        dates.push(AvailableDate {
            date,
            day_of_week: weekday,
            open_slots,
        });
    }
    Ok(dates)
}

/// Open slots on a specific date: the weekly template for that weekday
/// minus slots already held by an active booking.
pub fn open_slots_on_date(
    conn: &Connection,
    business_id: &str,
    date: &str,
    today: NaiveDate,
) -> Result<Vec<Slot>, SchedulingError> {
    let date = parse_date(date)?;
    if date < today {
        return Err(SchedulingError::PastDate);
    }
    remaining_slots(conn, business_id, date)
}

fn remaining_slots(
    conn: &Connection,
    business_id: &str,
    date: NaiveDate,
) -> Result<Vec<Slot>, SchedulingError> {
    let offered = queries::get_availability_day(conn, business_id, weekday_index(date))?
        .map(|day| day.open_slots())
        .unwrap_or_default();
    if offered.is_empty() {
        return Ok(vec![]);
    }
    let booked = queries::booked_slots(conn, business_id, date)?;
    Ok(offered
        .into_iter()
        .filter(|slot| !booked.contains(slot))
        .collect())
}

/// Validates a reservation request and inserts the booking inside an
/// immediate transaction. The partial unique index on active bookings is
/// the last line of defense: if another writer claims the slot between
/// the availability check and the insert, the insert fails and the caller
/// sees the same `SlotConflict` as if the check had caught it.
pub fn reserve(
    conn: &mut Connection,
    request: &ReservationRequest,
    today: NaiveDate,
) -> Result<Booking, SchedulingError> {
    let business_id = required(request.business_id.as_deref(), "business_id")?;
    let customer_name = required(request.customer_name.as_deref(), "customer_name")?;
    let customer_email = required(request.customer_email.as_deref(), "customer_email")?;
    let service_type = required(request.service_type.as_deref(), "service_type")?;
    let date_str = required(request.date.as_deref(), "date")?;
    let slot_str = required(request.slot.as_deref(), "slot")?;

    if !email_looks_valid(customer_email) {
        return Err(SchedulingError::InvalidEmail);
    }
    let slot = Slot::parse(slot_str).ok_or(SchedulingError::InvalidSlot)?;
    let date = parse_date(date_str)?;
    if date < today {
        return Err(SchedulingError::PastDate);
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let offered = queries::get_availability_day(&tx, business_id, weekday_index(date))?
        .map(|day| day.open_slots())
        .unwrap_or_default();
    if !offered.contains(&slot) {
        let booked = queries::booked_slots(&tx, business_id, date)?;
        let open_slots = offered
            .into_iter()
            .filter(|s| !booked.contains(s))
            .collect();
        return Err(SchedulingError::SlotNotOffered { open_slots });
    }

    if queries::is_slot_taken(&tx, business_id, date, slot)? {
        return Err(SchedulingError::SlotConflict);
    }

    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        business_id: business_id.to_string(),
        customer_name: customer_name.to_string(),
        customer_email: customer_email.to_string(),
        customer_phone: request.customer_phone.clone(),
        customer_address: request.customer_address.clone(),
        service_type: service_type.to_string(),
        booking_date: date,
        slot,
        description: request.description.clone(),
        status: BookingStatus::Pending,
        created_at: Utc::now().naive_utc(),
    };

    match queries::insert_booking(&tx, &booking) {
        Ok(()) => {}
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            return Err(SchedulingError::SlotConflict);
        }
        Err(e) => return Err(e.into()),
    }

    tx.commit()?;

    tracing::info!(
        booking_id = %booking.id,
        business_id = %booking.business_id,
        date = %booking.booking_date,
        slot = booking.slot.as_str(),
        "booking created"
    );
    Ok(booking)
}

/// Moves a booking to a new lifecycle status. Any status can follow any
/// other; cancelling is what frees the slot for rebooking.
pub fn update_status(
    conn: &Connection,
    booking_id: &str,
    status: &str,
) -> Result<Booking, SchedulingError> {
    let status = BookingStatus::parse(status).ok_or(SchedulingError::InvalidStatus)?;

    if !queries::update_booking_status(conn, booking_id, status)? {
        return Err(SchedulingError::NotFound);
    }
    let booking = queries::get_booking(conn, booking_id)?.ok_or(SchedulingError::NotFound)?;

    tracing::info!(
        booking_id = %booking.id,
        status = status.as_str(),
        "booking status updated"
    );
    Ok(booking)
}

pub fn set_weekday_availability(
    conn: &Connection,
    business_id: &str,
    day_of_week: u8,
    morning: bool,
    afternoon: bool,
    evening: bool,
) -> Result<AvailabilityDay, SchedulingError> {
    if day_of_week > 6 {
        return Err(SchedulingError::InvalidWeekday);
    }
    let day = AvailabilityDay {
        business_id: business_id.to_string(),
        day_of_week,
        morning,
        afternoon,
        evening,
    };
    queries::upsert_availability_day(conn, &day)?;
    Ok(day)
}

pub fn parse_date(s: &str) -> Result<NaiveDate, SchedulingError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| SchedulingError::InvalidDate)
}

/// Same shape check the booking form applies client-side: one `@`, a dot
/// in the domain, no whitespace.
pub fn email_looks_valid(email: &str) -> bool {
    if email.chars().any(|c| c.is_whitespace()) {
        return false;
    }
    let (local, domain) = match email.split_once('@') {
        Some(parts) => parts,
        None => return false,
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

fn required<'a>(
    value: Option<&'a str>,
    field: &'static str,
) -> Result<&'a str, SchedulingError> {
    match value {
        Some(s) if !s.trim().is_empty() => Ok(s.trim()),
        _ => Err(SchedulingError::MissingField(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::Business;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    // 2025-06-16 is a Monday
    fn today() -> NaiveDate {
        d("2025-06-16")
    }

    fn seed_business(conn: &Connection) -> String {
        let business = Business {
            id: "biz-1".to_string(),
            business_name: "Soft Water Services".to_string(),
            owner_name: "Garrett".to_string(),
            email: "garrett@example.com".to_string(),
            phone: None,
            service_types: vec!["Salt Delivery".to_string()],
            created_at: Utc::now().naive_utc(),
        };
        queries::create_business(conn, &business).unwrap();
        business.id
    }

    fn open_day(conn: &Connection, business_id: &str, day: u8, m: bool, a: bool, e: bool) {
        set_weekday_availability(conn, business_id, day, m, a, e).unwrap();
    }

    fn request(business_id: &str, date: &str, slot: &str) -> ReservationRequest {
        ReservationRequest {
            business_id: Some(business_id.to_string()),
            customer_name: Some("Alice".to_string()),
            customer_email: Some("alice@example.com".to_string()),
            customer_phone: Some("555-0100".to_string()),
            customer_address: None,
            service_type: Some("Salt Delivery".to_string()),
            date: Some(date.to_string()),
            slot: Some(slot.to_string()),
            description: None,
        }
    }

    fn booking_row(id: &str, business_id: &str, date: &str, slot: Slot, status: BookingStatus) -> Booking {
        Booking {
            id: id.to_string(),
            business_id: business_id.to_string(),
            customer_name: "Alice".to_string(),
            customer_email: "alice@example.com".to_string(),
            customer_phone: None,
            customer_address: None,
            service_type: "Salt Delivery".to_string(),
            booking_date: d(date),
            slot,
            description: None,
            status,
            created_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_available_dates_empty_without_template() {
        let conn = setup_db();
        let biz = seed_business(&conn);
        let dates = available_dates(&conn, &biz, 30, today()).unwrap();
        assert!(dates.is_empty());
    }

    #[test]
    fn test_available_dates_follows_weekly_pattern() {
        let conn = setup_db();
        let biz = seed_business(&conn);
        // Mondays only
        open_day(&conn, &biz, 1, true, true, false);

        let dates = available_dates(&conn, &biz, 14, today()).unwrap();
        // Today itself is a Monday but the scan starts tomorrow.
        assert_eq!(dates.len(), 2);
        assert_eq!(dates[0].date, d("2025-06-23"));
        assert_eq!(dates[1].date, d("2025-06-30"));
        assert_eq!(dates[0].day_of_week, 1);
        assert_eq!(dates[0].open_slots, vec![Slot::Morning, Slot::Afternoon]);
    }

    #[test]
    fn test_available_dates_skips_fully_booked_day() {
        let conn = setup_db();
        let biz = seed_business(&conn);
        open_day(&conn, &biz, 1, false, false, true);

        let row = booking_row("bk-1", &biz, "2025-06-23", Slot::Evening, BookingStatus::Pending);
        queries::insert_booking(&conn, &row).unwrap();

        let dates = available_dates(&conn, &biz, 14, today()).unwrap();
        assert_eq!(dates.len(), 1);
        assert_eq!(dates[0].date, d("2025-06-30"));
    }

    #[test]
    fn test_available_dates_clamps_huge_horizon() {
        let conn = setup_db();
        let biz = seed_business(&conn);
        open_day(&conn, &biz, 1, true, false, false);

        // A pathological horizon must not walk the calendar forever; the
        // scan stops at the cap and returns one Monday per week inside it.
        let dates = available_dates(&conn, &biz, i64::MAX, today()).unwrap();
        assert_eq!(dates.len(), 52);
        let last = dates.last().unwrap().date;
        assert!(last <= today() + Duration::days(MAX_HORIZON_DAYS));

        // Negative horizons scan nothing.
        let dates = available_dates(&conn, &biz, -5, today()).unwrap();
        assert!(dates.is_empty());
    }

    #[test]
    fn test_open_slots_rejects_malformed_date() {
        let conn = setup_db();
        let biz = seed_business(&conn);
        let err = open_slots_on_date(&conn, &biz, "2099-02-30", today()).unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidDate));
        let err = open_slots_on_date(&conn, &biz, "not-a-date", today()).unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidDate));
    }

    #[test]
    fn test_open_slots_rejects_past_date() {
        let conn = setup_db();
        let biz = seed_business(&conn);
        let err = open_slots_on_date(&conn, &biz, "2025-06-15", today()).unwrap_err();
        assert!(matches!(err, SchedulingError::PastDate));
    }

    #[test]
    fn test_open_slots_allows_today() {
        let conn = setup_db();
        let biz = seed_business(&conn);
        open_day(&conn, &biz, 1, true, false, true);
        let slots = open_slots_on_date(&conn, &biz, "2025-06-16", today()).unwrap();
        assert_eq!(slots, vec![Slot::Morning, Slot::Evening]);
    }

    #[test]
    fn test_reserve_creates_pending_booking() {
        let mut conn = setup_db();
        let biz = seed_business(&conn);
        open_day(&conn, &biz, 1, true, true, false);

        let booking = reserve(&mut conn, &request(&biz, "2025-06-23", "morning"), today()).unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.booking_date, d("2025-06-23"));
        assert_eq!(booking.slot, Slot::Morning);

        let stored = queries::get_booking(&conn, &booking.id).unwrap().unwrap();
        assert_eq!(stored.customer_name, "Alice");
    }

    #[test]
    fn test_reserve_reports_first_missing_field() {
        let mut conn = setup_db();
        seed_business(&conn);

        let err = reserve(&mut conn, &ReservationRequest::default(), today()).unwrap_err();
        assert!(matches!(err, SchedulingError::MissingField("business_id")));

        let mut req = ReservationRequest {
            business_id: Some("biz-1".to_string()),
            ..Default::default()
        };
        let err = reserve(&mut conn, &req, today()).unwrap_err();
        assert!(matches!(err, SchedulingError::MissingField("customer_name")));

        // Whitespace-only counts as missing.
        req.customer_name = Some("   ".to_string());
        let err = reserve(&mut conn, &req, today()).unwrap_err();
        assert!(matches!(err, SchedulingError::MissingField("customer_name")));
    }

    #[test]
    fn test_reserve_rejects_bad_email() {
        let mut conn = setup_db();
        let biz = seed_business(&conn);
        open_day(&conn, &biz, 1, true, true, false);

        for bad in ["nope", "a@b", "a @b.com", "@b.com", "a@.com", "a@b."] {
            let mut req = request(&biz, "2025-06-23", "morning");
            req.customer_email = Some(bad.to_string());
            let err = reserve(&mut conn, &req, today()).unwrap_err();
            assert!(matches!(err, SchedulingError::InvalidEmail), "accepted: {bad}");
        }
    }

    #[test]
    fn test_reserve_rejects_unknown_slot() {
        let mut conn = setup_db();
        let biz = seed_business(&conn);
        let err = reserve(&mut conn, &request(&biz, "2025-06-23", "midnight"), today()).unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidSlot));
    }

    #[test]
    fn test_reserve_rejects_bad_and_past_dates() {
        let mut conn = setup_db();
        let biz = seed_business(&conn);

        let err = reserve(&mut conn, &request(&biz, "June 23rd", "morning"), today()).unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidDate));

        let err = reserve(&mut conn, &request(&biz, "2025-06-15", "morning"), today()).unwrap_err();
        assert!(matches!(err, SchedulingError::PastDate));
    }

    #[test]
    fn test_reserve_closed_slot_reports_remaining_alternatives() {
        let mut conn = setup_db();
        let biz = seed_business(&conn);
        open_day(&conn, &biz, 1, true, true, false);

        reserve(&mut conn, &request(&biz, "2025-06-23", "morning"), today()).unwrap();

        // Evening is closed on Mondays; morning is already taken, so only
        // the afternoon comes back as an alternative.
        let err = reserve(&mut conn, &request(&biz, "2025-06-23", "evening"), today()).unwrap_err();
        match err {
            SchedulingError::SlotNotOffered { open_slots } => {
                assert_eq!(open_slots, vec![Slot::Afternoon]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_reserve_unknown_business_offers_nothing() {
        let mut conn = setup_db();
        seed_business(&conn);

        let err = reserve(&mut conn, &request("no-such-biz", "2025-06-23", "morning"), today())
            .unwrap_err();
        match err {
            SchedulingError::SlotNotOffered { open_slots } => assert!(open_slots.is_empty()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_reserve_conflict_on_taken_slot() {
        let mut conn = setup_db();
        let biz = seed_business(&conn);
        open_day(&conn, &biz, 1, true, true, false);

        reserve(&mut conn, &request(&biz, "2025-06-23", "morning"), today()).unwrap();
        let err = reserve(&mut conn, &request(&biz, "2025-06-23", "morning"), today()).unwrap_err();
        assert!(matches!(err, SchedulingError::SlotConflict));
    }

    #[test]
    fn test_cancelled_slot_can_be_rebooked() {
        let mut conn = setup_db();
        let biz = seed_business(&conn);
        open_day(&conn, &biz, 1, true, true, false);

        let first = reserve(&mut conn, &request(&biz, "2025-06-23", "morning"), today()).unwrap();
        update_status(&conn, &first.id, "cancelled").unwrap();

        let second = reserve(&mut conn, &request(&biz, "2025-06-23", "morning"), today()).unwrap();
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_same_slot_different_businesses_do_not_collide() {
        let mut conn = setup_db();
        let biz = seed_business(&conn);
        let other = Business {
            id: "biz-2".to_string(),
            business_name: "Rival Water Services".to_string(),
            owner_name: "Dana".to_string(),
            email: "dana@example.com".to_string(),
            phone: None,
            service_types: vec![],
            created_at: Utc::now().naive_utc(),
        };
        queries::create_business(&conn, &other).unwrap();
        open_day(&conn, &biz, 1, true, false, false);
        open_day(&conn, &other.id, 1, true, false, false);

        reserve(&mut conn, &request(&biz, "2025-06-23", "morning"), today()).unwrap();
        reserve(&mut conn, &request(&other.id, "2025-06-23", "morning"), today()).unwrap();
    }

    #[test]
    fn test_update_status_validates_input() {
        let conn = setup_db();

        let err = update_status(&conn, "whatever", "paused").unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidStatus));

        let err = update_status(&conn, "missing-id", "confirmed").unwrap_err();
        assert!(matches!(err, SchedulingError::NotFound));
    }

    #[test]
    fn test_update_status_allows_any_transition() {
        let mut conn = setup_db();
        let biz = seed_business(&conn);
        open_day(&conn, &biz, 1, true, true, false);
        let booking = reserve(&mut conn, &request(&biz, "2025-06-23", "morning"), today()).unwrap();

        for status in ["confirmed", "completed", "cancelled", "pending"] {
            let updated = update_status(&conn, &booking.id, status).unwrap();
            assert_eq!(updated.status.as_str(), status);
        }
    }

    #[test]
    fn test_set_weekday_availability_rejects_bad_weekday() {
        let conn = setup_db();
        let biz = seed_business(&conn);
        let err = set_weekday_availability(&conn, &biz, 7, true, true, true).unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidWeekday));
    }

    #[test]
    fn test_set_weekday_availability_upsert_is_idempotent() {
        let conn = setup_db();
        let biz = seed_business(&conn);

        set_weekday_availability(&conn, &biz, 3, true, false, true).unwrap();
        set_weekday_availability(&conn, &biz, 3, true, false, true).unwrap();

        let week = queries::get_week_availability(&conn, &biz).unwrap();
        assert_eq!(week.len(), 1);
        assert_eq!(week[0].day_of_week, 3);
        assert!(week[0].morning && !week[0].afternoon && week[0].evening);
    }

    #[test]
    fn test_unique_index_is_the_backstop() {
        let conn = setup_db();
        let biz = seed_business(&conn);

        // Insert directly, skipping the reserve() checks entirely.
        let first = booking_row("bk-1", &biz, "2025-06-23", Slot::Morning, BookingStatus::Pending);
        queries::insert_booking(&conn, &first).unwrap();

        let second = booking_row("bk-2", &biz, "2025-06-23", Slot::Morning, BookingStatus::Confirmed);
        let err = queries::insert_booking(&conn, &second).unwrap_err();
        match err {
            rusqlite::Error::SqliteFailure(e, _) => {
                assert_eq!(e.code, rusqlite::ErrorCode::ConstraintViolation);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // A cancelled row does not hold the slot.
        update_status(&conn, "bk-1", "cancelled").unwrap();
        queries::insert_booking(&conn, &second).unwrap();
    }

    #[test]
    fn test_booked_slots_fails_on_corrupt_slot_value() {
        let conn = setup_db();
        let biz = seed_business(&conn);

        // Sneak a row past the CHECK constraint; a value outside the
        // enumeration must surface as an error, not silently free the slot.
        conn.execute_batch("PRAGMA ignore_check_constraints = ON;").unwrap();
        conn.execute(
            "INSERT INTO bookings (id, business_id, customer_name, customer_email,
                                   service_type, booking_date, slot, status)
             VALUES ('bk-x', ?1, 'Alice', 'alice@example.com', 'Salt Delivery',
                     '2025-06-23', 'brunch', 'pending')",
            [&biz],
        )
        .unwrap();

        let err = queries::booked_slots(&conn, &biz, d("2025-06-23")).unwrap_err();
        assert!(matches!(err, rusqlite::Error::FromSqlConversionFailure(..)));
    }

    #[test]
    fn test_email_shape_check() {
        assert!(email_looks_valid("alice@example.com"));
        assert!(email_looks_valid("a.b+c@sub.example.co"));
        assert!(!email_looks_valid("alice@example"));
        assert!(!email_looks_valid("alice example.com"));
        assert!(!email_looks_valid("alice@@example.com"));
    }
}
