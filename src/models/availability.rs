use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// The three bookable parts of a day. Stored in the database as lowercase
/// text and rendered the same way on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Morning,
    Afternoon,
    Evening,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Morning => "morning",
            Slot::Afternoon => "afternoon",
            Slot::Evening => "evening",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "morning" => Some(Slot::Morning),
            "afternoon" => Some(Slot::Afternoon),
            "evening" => Some(Slot::Evening),
            _ => None,
        }
    }
}

/// One row of a business's weekly template: which day parts are open on a
/// given weekday. Weekdays are numbered 0-6 with Sunday as 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityDay {
    pub business_id: String,
    pub day_of_week: u8,
    pub morning: bool,
    pub afternoon: bool,
    pub evening: bool,
}

impl AvailabilityDay {
    pub fn closed(business_id: &str, day_of_week: u8) -> Self {
        Self {
            business_id: business_id.to_string(),
            day_of_week,
            morning: false,
            afternoon: false,
            evening: false,
        }
    }

    /// The open slots for this weekday, in morning/afternoon/evening order.
    pub fn open_slots(&self) -> Vec<Slot> {
        let mut slots = Vec::new();
        if self.morning {
            slots.push(Slot::Morning);
        }
        if self.afternoon {
            slots.push(Slot::Afternoon);
        }
        if self.evening {
            slots.push(Slot::Evening);
        }
        slots
    }

    pub fn any_open(&self) -> bool {
        self.morning || self.afternoon || self.evening
    }
}

/// Weekday index for a calendar date, 0-6 with Sunday as 0.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}
