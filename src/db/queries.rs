use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection};

use crate::models::{AvailabilityDay, Booking, BookingStatus, Business, Slot};

// ── Businesses ──

pub fn create_business(conn: &Connection, business: &Business) -> rusqlite::Result<()> {
    let service_types =
        serde_json::to_string(&business.service_types).unwrap_or_else(|_| "[]".to_string());
    let created_at = business.created_at.format("%Y-%m-%d %H:%M:%S").to_string();

    conn.execute(
        "INSERT INTO businesses (id, business_name, owner_name, email, phone, service_types, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            business.id,
            business.business_name,
            business.owner_name,
            business.email,
            business.phone,
            service_types,
            created_at,
        ],
    )?;
    Ok(())
}

pub fn get_business(conn: &Connection, id: &str) -> rusqlite::Result<Option<Business>> {
    let result = conn.query_row(
        "SELECT id, business_name, owner_name, email, phone, service_types, created_at
         FROM businesses WHERE id = ?1",
        params![id],
        business_from_row,
    );

    match result {
        Ok(business) => Ok(Some(business)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn get_business_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<Business>> {
    let result = conn.query_row(
        "SELECT id, business_name, owner_name, email, phone, service_types, created_at
         FROM businesses WHERE email = ?1",
        params![email],
        business_from_row,
    );

    match result {
        Ok(business) => Ok(Some(business)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn list_businesses(conn: &Connection) -> rusqlite::Result<Vec<Business>> {
    let mut stmt = conn.prepare(
        "SELECT id, business_name, owner_name, email, phone, service_types, created_at
         FROM businesses ORDER BY created_at DESC",
    )?;
    let rows = stmt.query_map([], business_from_row)?;

    let mut businesses = vec![];
    for row in rows {
        businesses.push(row?);
    }
    Ok(businesses)
}

pub fn update_business(conn: &Connection, business: &Business) -> rusqlite::Result<bool> {
    let service_types =
        serde_json::to_string(&business.service_types).unwrap_or_else(|_| "[]".to_string());
    let count = conn.execute(
        "UPDATE businesses
         SET business_name = ?1, owner_name = ?2, email = ?3, phone = ?4, service_types = ?5
         WHERE id = ?6",
        params![
            business.business_name,
            business.owner_name,
            business.email,
            business.phone,
            service_types,
            business.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn delete_business(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    let count = conn.execute("DELETE FROM businesses WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

// ── Availability ──

pub fn upsert_availability_day(conn: &Connection, day: &AvailabilityDay) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO availability (business_id, day_of_week, morning, afternoon, evening)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(business_id, day_of_week) DO UPDATE SET
           morning = excluded.morning,
           afternoon = excluded.afternoon,
           evening = excluded.evening",
        params![
            day.business_id,
            day.day_of_week,
            day.morning as i32,
            day.afternoon as i32,
            day.evening as i32,
        ],
    )?;
    Ok(())
}

pub fn get_week_availability(
    conn: &Connection,
    business_id: &str,
) -> rusqlite::Result<Vec<AvailabilityDay>> {
    let mut stmt = conn.prepare(
        "SELECT business_id, day_of_week, morning, afternoon, evening
         FROM availability WHERE business_id = ?1 ORDER BY day_of_week ASC",
    )?;
    let rows = stmt.query_map(params![business_id], availability_from_row)?;

    let mut days = vec![];
    for row in rows {
        days.push(row?);
    }
    Ok(days)
}

pub fn get_availability_day(
    conn: &Connection,
    business_id: &str,
    day_of_week: u8,
) -> rusqlite::Result<Option<AvailabilityDay>> {
    let result = conn.query_row(
        "SELECT business_id, day_of_week, morning, afternoon, evening
         FROM availability WHERE business_id = ?1 AND day_of_week = ?2",
        params![business_id, day_of_week],
        availability_from_row,
    );

    match result {
        Ok(day) => Ok(Some(day)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

// ── Bookings ──

pub fn insert_booking(conn: &Connection, booking: &Booking) -> rusqlite::Result<()> {
    let booking_date = booking.booking_date.format("%Y-%m-%d").to_string();
    let created_at = booking.created_at.format("%Y-%m-%d %H:%M:%S").to_string();

    conn.execute(
        "INSERT INTO bookings (id, business_id, customer_name, customer_email, customer_phone,
                               customer_address, service_type, booking_date, slot, description,
                               status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            booking.id,
            booking.business_id,
            booking.customer_name,
            booking.customer_email,
            booking.customer_phone,
            booking.customer_address,
            booking.service_type,
            booking_date,
            booking.slot.as_str(),
            booking.description,
            booking.status.as_str(),
            created_at,
        ],
    )?;
    Ok(())
}

pub fn get_booking(conn: &Connection, id: &str) -> rusqlite::Result<Option<Booking>> {
    let result = conn.query_row(
        "SELECT id, business_id, customer_name, customer_email, customer_phone, customer_address,
                service_type, booking_date, slot, description, status, created_at
         FROM bookings WHERE id = ?1",
        params![id],
        booking_from_row,
    );

    match result {
        Ok(booking) => Ok(Some(booking)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn get_bookings_for_business(
    conn: &Connection,
    business_id: &str,
    date: Option<NaiveDate>,
    status: Option<BookingStatus>,
) -> rusqlite::Result<Vec<Booking>> {
    let mut sql = String::from(
        "SELECT id, business_id, customer_name, customer_email, customer_phone, customer_address,
                service_type, booking_date, slot, description, status, created_at
         FROM bookings WHERE business_id = ?1",
    );
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> =
        vec![Box::new(business_id.to_string())];

    if let Some(date) = date {
        params_vec.push(Box::new(date.format("%Y-%m-%d").to_string()));
        sql.push_str(&format!(" AND booking_date = ?{}", params_vec.len()));
    }
    if let Some(status) = status {
        params_vec.push(Box::new(status.as_str().to_string()));
        sql.push_str(&format!(" AND status = ?{}", params_vec.len()));
    }
    sql.push_str(
        " ORDER BY booking_date ASC,
           CASE slot WHEN 'morning' THEN 0 WHEN 'afternoon' THEN 1 ELSE 2 END ASC",
    );

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), booking_from_row)?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row?);
    }
    Ok(bookings)
}

pub fn get_upcoming_bookings(
    conn: &Connection,
    business_id: &str,
    today: NaiveDate,
    days: i64,
) -> rusqlite::Result<Vec<Booking>> {
    let start = today.format("%Y-%m-%d").to_string();
    let end = (today + chrono::Duration::days(days))
        .format("%Y-%m-%d")
        .to_string();

    let mut stmt = conn.prepare(
        "SELECT id, business_id, customer_name, customer_email, customer_phone, customer_address,
                service_type, booking_date, slot, description, status, created_at
         FROM bookings
         WHERE business_id = ?1 AND booking_date BETWEEN ?2 AND ?3
           AND status NOT IN ('cancelled', 'completed')
         ORDER BY booking_date ASC,
           CASE slot WHEN 'morning' THEN 0 WHEN 'afternoon' THEN 1 ELSE 2 END ASC",
    )?;
    let rows = stmt.query_map(params![business_id, start, end], booking_from_row)?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row?);
    }
    Ok(bookings)
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id],
    )?;
    Ok(count > 0)
}

pub fn delete_booking(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    let count = conn.execute("DELETE FROM bookings WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

/// Slots on a date already claimed by a non-cancelled booking.
pub fn booked_slots(
    conn: &Connection,
    business_id: &str,
    date: NaiveDate,
) -> rusqlite::Result<Vec<Slot>> {
    let date_str = date.format("%Y-%m-%d").to_string();
    let mut stmt = conn.prepare(
        "SELECT slot FROM bookings
         WHERE business_id = ?1 AND booking_date = ?2 AND status != 'cancelled'",
    )?;
    let rows = stmt.query_map(params![business_id, date_str], |row| {
        row.get::<_, String>(0)
    })?;

    let mut slots = vec![];
    for row in rows {
        let value = row?;
        let slot = Slot::parse(&value).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                Type::Text,
                format!("unknown slot: {value}").into(),
            )
        })?;
        slots.push(slot);
    }
    Ok(slots)
}

pub fn is_slot_taken(
    conn: &Connection,
    business_id: &str,
    date: NaiveDate,
    slot: Slot,
) -> rusqlite::Result<bool> {
    let date_str = date.format("%Y-%m-%d").to_string();
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings
         WHERE business_id = ?1 AND booking_date = ?2 AND slot = ?3 AND status != 'cancelled'",
        params![business_id, date_str, slot.as_str()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

// ── Row mapping ──

fn business_from_row(row: &rusqlite::Row) -> rusqlite::Result<Business> {
    let service_types_json: String = row.get(5)?;
    let created_at_str: String = row.get(6)?;

    let service_types: Vec<String> =
        serde_json::from_str(&service_types_json).unwrap_or_default();
    let created_at = NaiveDateTime::parse_from_str(&created_at_str, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|_| Utc::now().naive_utc());

    Ok(Business {
        id: row.get(0)?,
        business_name: row.get(1)?,
        owner_name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        service_types,
        created_at,
    })
}

fn availability_from_row(row: &rusqlite::Row) -> rusqlite::Result<AvailabilityDay> {
    Ok(AvailabilityDay {
        business_id: row.get(0)?,
        day_of_week: row.get(1)?,
        morning: row.get::<_, i32>(2)? != 0,
        afternoon: row.get::<_, i32>(3)? != 0,
        evening: row.get::<_, i32>(4)? != 0,
    })
}

fn booking_from_row(row: &rusqlite::Row) -> rusqlite::Result<Booking> {
    let booking_date_str: String = row.get(7)?;
    let slot_str: String = row.get(8)?;
    let status_str: String = row.get(10)?;
    let created_at_str: String = row.get(11)?;

    // The date, slot and status columns are constrained by the schema, so a
    // bad value means the row is corrupt and the read should fail loudly.
    let booking_date = NaiveDate::parse_from_str(&booking_date_str, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;
    let slot = Slot::parse(&slot_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            8,
            Type::Text,
            format!("unknown slot: {slot_str}").into(),
        )
    })?;
    let status = BookingStatus::parse(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            10,
            Type::Text,
            format!("unknown status: {status_str}").into(),
        )
    })?;
    let created_at = NaiveDateTime::parse_from_str(&created_at_str, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|_| Utc::now().naive_utc());

    Ok(Booking {
        id: row.get(0)?,
        business_id: row.get(1)?,
        customer_name: row.get(2)?,
        customer_email: row.get(3)?,
        customer_phone: row.get(4)?,
        customer_address: row.get(5)?,
        service_type: row.get(6)?,
        booking_date,
        slot,
        description: row.get(9)?,
        status,
        created_at,
    })
}
