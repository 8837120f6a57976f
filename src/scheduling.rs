//! Appointment conflict detection and slot suggestion.
//!
//! Appointments occupy fixed 60-minute slots. Two appointments on the
//! same date conflict when their start times are less than 60 minutes
//! apart. Times are handled as minutes since midnight; the wire format
//! is zero-padded `HH:MM`.

use crate::models::Appointment;

/// Length of one appointment slot.
pub const SLOT_MINUTES: u32 = 60;
/// First bookable slot start (08:00).
pub const FIRST_SLOT_START: u32 = 8 * 60;
/// Last bookable slot start (16:00), inclusive.
pub const LAST_SLOT_START: u32 = 16 * 60;
/// Suggestions offered alongside a conflict.
pub const MAX_SUGGESTIONS: usize = 3;
/// Returned instead of an empty suggestion list.
pub const NO_SLOTS_PLACEHOLDER: &str = "No available slots on this date";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: '{0}' (expected HH:MM)")]
    Format(String),
    #[error("Time out of range: '{0}'")]
    OutOfRange(String),
}

/// Parse `HH:MM` (or `H:MM`) into minutes since midnight.
pub fn parse_time(value: &str) -> Result<u32, TimeParseError> {
    let trimmed = value.trim();
    let (hours, minutes) = trimmed
        .split_once(':')
        .ok_or_else(|| TimeParseError::Format(value.to_string()))?;

    if hours.is_empty() || hours.len() > 2 || minutes.len() != 2 {
        return Err(TimeParseError::Format(value.to_string()));
    }
    let hours: u32 = hours
        .parse()
        .map_err(|_| TimeParseError::Format(value.to_string()))?;
    let minutes: u32 = minutes
        .parse()
        .map_err(|_| TimeParseError::Format(value.to_string()))?;

    if hours > 23 || minutes > 59 {
        return Err(TimeParseError::OutOfRange(value.to_string()));
    }
    Ok(hours * 60 + minutes)
}

/// Format minutes since midnight as zero-padded `HH:MM`.
pub fn format_time(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

fn too_close(a: u32, b: u32) -> bool {
    a.abs_diff(b) < SLOT_MINUTES
}

/// Return the first existing appointment starting within 60 minutes of
/// `requested`. `existing` must already be restricted to one date; scan
/// order decides which conflict is reported.
///
/// Stored appointments whose time no longer parses are skipped.
pub fn find_conflict(requested: u32, existing: &[Appointment]) -> Option<&Appointment> {
    existing.iter().find(|appt| match parse_time(&appt.time) {
        Ok(start) => too_close(requested, start),
        Err(e) => {
            tracing::warn!(appointment_id = appt.id, error = %e, "Skipping unparsable appointment time");
            false
        }
    })
}

/// Up to three free slot starts between 08:00 and 16:00, earliest first.
pub fn suggest_slots(existing: &[Appointment]) -> Vec<String> {
    let occupied: Vec<u32> = existing
        .iter()
        .filter_map(|appt| parse_time(&appt.time).ok())
        .collect();

    (FIRST_SLOT_START..=LAST_SLOT_START)
        .step_by(SLOT_MINUTES as usize)
        .filter(|candidate| !occupied.iter().any(|&taken| too_close(*candidate, taken)))
        .take(MAX_SUGGESTIONS)
        .map(format_time)
        .collect()
}

/// Slot suggestions, or the single placeholder message when the day is full.
pub fn suggested_times_or_placeholder(existing: &[Appointment]) -> Vec<String> {
    let slots = suggest_slots(existing);
    if slots.is_empty() {
        vec![NO_SLOTS_PLACEHOLDER.to_string()]
    } else {
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn appt(id: i64, time: &str) -> Appointment {
        Appointment {
            id,
            date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            time: time.into(),
            client_name: format!("Client {id}"),
            email: None,
            id_number: None,
            service: "Consultation".into(),
            created_at: "2024-01-01T00:00:00+00:00".into(),
        }
    }

    #[test]
    fn parse_accepts_padded_and_unpadded_hours() {
        assert_eq!(parse_time("09:30"), Ok(570));
        assert_eq!(parse_time("9:30"), Ok(570));
        assert_eq!(parse_time("00:00"), Ok(0));
        assert_eq!(parse_time("23:59"), Ok(1439));
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert!(matches!(parse_time("0930"), Err(TimeParseError::Format(_))));
        assert!(matches!(parse_time("9:3"), Err(TimeParseError::Format(_))));
        assert!(matches!(parse_time("ab:cd"), Err(TimeParseError::Format(_))));
        assert!(matches!(parse_time(""), Err(TimeParseError::Format(_))));
        assert!(matches!(parse_time("24:00"), Err(TimeParseError::OutOfRange(_))));
        assert!(matches!(parse_time("12:60"), Err(TimeParseError::OutOfRange(_))));
    }

    #[test]
    fn format_zero_pads() {
        assert_eq!(format_time(480), "08:00");
        assert_eq!(format_time(965), "16:05");
        assert_eq!(format_time(5), "00:05");
    }

    #[test]
    fn conflict_within_an_hour() {
        let existing = vec![appt(1, "09:00"), appt(2, "11:00")];
        let hit = find_conflict(parse_time("09:30").unwrap(), &existing).unwrap();
        assert_eq!(hit.id, 1);

        let hit = find_conflict(parse_time("10:30").unwrap(), &existing).unwrap();
        assert_eq!(hit.id, 2);
    }

    #[test]
    fn exactly_sixty_minutes_apart_is_not_a_conflict() {
        let existing = vec![appt(1, "09:00"), appt(2, "11:00")];
        assert!(find_conflict(parse_time("10:00").unwrap(), &existing).is_none());
        assert!(find_conflict(parse_time("08:00").unwrap(), &existing).is_none());
    }

    #[test]
    fn first_match_in_scan_order_wins() {
        let existing = vec![appt(1, "09:00"), appt(2, "09:20")];
        let hit = find_conflict(parse_time("09:10").unwrap(), &existing).unwrap();
        assert_eq!(hit.id, 1);
    }

    #[test]
    fn unparsable_stored_time_is_skipped() {
        let existing = vec![appt(1, "garbage"), appt(2, "09:00")];
        let hit = find_conflict(parse_time("09:15").unwrap(), &existing).unwrap();
        assert_eq!(hit.id, 2);
    }

    #[test]
    fn empty_day_suggests_first_three_slots() {
        assert_eq!(suggest_slots(&[]), vec!["08:00", "09:00", "10:00"]);
    }

    #[test]
    fn suggestions_skip_slots_near_bookings() {
        let existing = vec![appt(1, "08:30"), appt(2, "10:00")];
        // 08:00 and 09:00 sit within an hour of 08:30; 10:00 is taken.
        assert_eq!(suggest_slots(&existing), vec!["11:00", "12:00", "13:00"]);
    }

    #[test]
    fn suggestions_around_hourly_bookings() {
        let existing = vec![appt(1, "09:00"), appt(2, "11:00")];
        assert_eq!(suggest_slots(&existing), vec!["08:00", "10:00", "12:00"]);
    }

    #[test]
    fn late_day_returns_fewer_than_three() {
        let existing: Vec<Appointment> = ["08:00", "09:00", "10:00", "11:00", "12:00", "13:00", "14:00"]
            .iter()
            .enumerate()
            .map(|(i, t)| appt(i as i64, t))
            .collect();
        assert_eq!(suggest_slots(&existing), vec!["15:00", "16:00"]);
    }

    #[test]
    fn fully_booked_day_has_no_suggestions() {
        let existing: Vec<Appointment> = (8..=16)
            .map(|h| appt(h as i64, &format_time(h * 60)))
            .collect();
        assert!(suggest_slots(&existing).is_empty());
        assert_eq!(
            suggested_times_or_placeholder(&existing),
            vec![NO_SLOTS_PLACEHOLDER.to_string()]
        );
    }
}
