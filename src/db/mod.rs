pub mod migrations;
pub mod queries;

use anyhow::Context;
use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::models::{AvailabilityDay, Business};

pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    let conn = Connection::open(path).context("failed to open database")?;

    conn.execute_batch(
        "PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;",
    )
    .context("failed to set database pragmas")?;

    migrations::run_migrations(&conn)?;

    Ok(conn)
}

/// Creates the default business and its weekly template on first run.
/// Does nothing if a business with the configured email already exists.
pub fn seed_initial_data(conn: &Connection, config: &AppConfig) -> anyhow::Result<()> {
    if queries::get_business_by_email(conn, &config.default_business_email)
        .context("failed to check for seed business")?
        .is_some()
    {
        return Ok(());
    }

    let business = Business {
        id: Uuid::new_v4().to_string(),
        business_name: config.default_business_name.clone(),
        owner_name: "Garrett".to_string(),
        email: config.default_business_email.clone(),
        phone: Some("555-0123".to_string()),
        service_types: vec![
            "Water Softener Installation".to_string(),
            "Water Softener Repair".to_string(),
            "Water Softener Maintenance".to_string(),
            "Water Quality Testing".to_string(),
            "Salt Delivery".to_string(),
        ],
        created_at: Utc::now().naive_utc(),
    };
    queries::create_business(conn, &business).context("failed to seed business")?;

    // Closed Sunday mornings, weekday evenings off, full Saturdays.
    let week: [(u8, bool, bool, bool); 7] = [
        (0, false, true, true),
        (1, true, true, false),
        (2, true, true, false),
        (3, true, true, false),
        (4, true, true, false),
        (5, true, true, false),
        (6, true, true, true),
    ];
    for (day_of_week, morning, afternoon, evening) in week {
        let day = AvailabilityDay {
            business_id: business.id.clone(),
            day_of_week,
            morning,
            afternoon,
            evening,
        };
        queries::upsert_availability_day(conn, &day)
            .context("failed to seed availability")?;
    }

    tracing::info!(business_id = %business.id, "seeded default business");
    Ok(())
}
