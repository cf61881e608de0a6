//! Date grouping for the conversation timeline
//!
//! Turns a flat ascending message list into an alternating sequence of
//! date separators and messages. Day boundaries are local midnights in
//! the caller's timezone, not rolling 24h windows. Pure and stable: the
//! renderer and the pinned-date scan both recompute it freely.

use crate::model::Message;
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone};

/// Separator labels and weekday/month names are pt-BR, matching the
/// product UI.
const WEEKDAYS: [&str; 7] = [
    "segunda-feira",
    "terça-feira",
    "quarta-feira",
    "quinta-feira",
    "sexta-feira",
    "sábado",
    "domingo",
];

const MONTHS: [&str; 12] = [
    "janeiro", "fevereiro", "março", "abril", "maio", "junho", "julho", "agosto", "setembro",
    "outubro", "novembro", "dezembro",
];

/// One entry of the rendered timeline
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEntry {
    Separator { label: String, day: NaiveDate },
    Message(Message),
}

impl TimelineEntry {
    pub fn is_separator(&self) -> bool {
        matches!(self, TimelineEntry::Separator { .. })
    }
}

/// Human label for a calendar day relative to `today`
pub fn day_label(day: NaiveDate, today: NaiveDate) -> String {
    if day == today {
        return "Hoje".to_string();
    }
    if day == today - Duration::days(1) {
        return "Ontem".to_string();
    }
    let weekday = WEEKDAYS[day.weekday().num_days_from_monday() as usize];
    let month = MONTHS[day.month0() as usize];
    format!("{}, {} de {} de {}", weekday, day.day(), month, day.year())
}

/// Group an ascending message list into a dated timeline.
///
/// `now` fixes both "today" for labeling and the timezone used to place
/// each message on a calendar day.
pub fn group_by_day<Tz: TimeZone>(messages: &[Message], now: DateTime<Tz>) -> Vec<TimelineEntry> {
    let tz = now.timezone();
    let today = now.date_naive();

    let mut timeline = Vec::with_capacity(messages.len() + 4);
    let mut current_day: Option<NaiveDate> = None;

    for msg in messages {
        let day = msg.timestamp.with_timezone(&tz).date_naive();
        if current_day != Some(day) {
            timeline.push(TimelineEntry::Separator {
                label: day_label(day, today),
                day,
            });
            current_day = Some(day);
        }
        timeline.push(TimelineEntry::Message(msg.clone()));
    }

    timeline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Direction;
    use chrono::{FixedOffset, Utc};

    fn msg(id: &str, ts: DateTime<Utc>) -> Message {
        Message {
            id: id.to_string(),
            client_temp_id: None,
            direction: Direction::Incoming,
            timestamp: ts,
            body: Some("oi".to_string()),
            media_url: None,
            media_type: None,
            ack: 0,
            status: None,
        }
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_empty_list() {
        let now = at(2026, 8, 30, 12, 0);
        assert!(group_by_day(&[], now).is_empty());
    }

    #[test]
    fn test_single_day_one_separator() {
        let now = at(2026, 8, 30, 12, 0);
        let messages = vec![
            msg("a", at(2026, 8, 30, 9, 0)),
            msg("b", at(2026, 8, 30, 10, 0)),
        ];
        let timeline = group_by_day(&messages, now);
        assert_eq!(timeline.len(), 3);
        assert_eq!(
            timeline[0],
            TimelineEntry::Separator {
                label: "Hoje".to_string(),
                day: NaiveDate::from_ymd_opt(2026, 8, 30).unwrap(),
            }
        );
        assert!(!timeline[1].is_separator());
        assert!(!timeline[2].is_separator());
    }

    #[test]
    fn test_yesterday_label() {
        let now = at(2026, 8, 30, 12, 0);
        let timeline = group_by_day(&[msg("a", at(2026, 8, 29, 23, 0))], now);
        match &timeline[0] {
            TimelineEntry::Separator { label, .. } => assert_eq!(label, "Ontem"),
            other => panic!("expected separator, got {:?}", other),
        }
    }

    #[test]
    fn test_older_day_weekday_label() {
        // 2026-08-25 is a Tuesday
        let now = at(2026, 8, 30, 12, 0);
        let timeline = group_by_day(&[msg("a", at(2026, 8, 25, 8, 0))], now);
        match &timeline[0] {
            TimelineEntry::Separator { label, .. } => {
                assert_eq!(label, "terça-feira, 25 de agosto de 2026");
            }
            other => panic!("expected separator, got {:?}", other),
        }
    }

    #[test]
    fn test_midnight_boundary_splits_groups() {
        // 23:30 and 01:30, two hours apart but across midnight
        let now = at(2026, 8, 30, 12, 0);
        let messages = vec![
            msg("a", at(2026, 8, 28, 23, 30)),
            msg("b", at(2026, 8, 29, 1, 30)),
        ];
        let timeline = group_by_day(&messages, now);
        let separators = timeline.iter().filter(|e| e.is_separator()).count();
        assert_eq!(separators, 2);
    }

    #[test]
    fn test_local_timezone_day_placement() {
        // 2026-08-30 01:00 UTC is still 2026-08-29 at UTC-3 (São Paulo)
        let tz = FixedOffset::west_opt(3 * 3600).unwrap();
        let now = at(2026, 8, 30, 15, 0).with_timezone(&tz);
        let timeline = group_by_day(&[msg("a", at(2026, 8, 30, 1, 0))], now);
        match &timeline[0] {
            TimelineEntry::Separator { day, .. } => {
                assert_eq!(*day, NaiveDate::from_ymd_opt(2026, 8, 29).unwrap());
            }
            other => panic!("expected separator, got {:?}", other),
        }
    }

    #[test]
    fn test_grouping_deterministic() {
        let now = at(2026, 8, 30, 12, 0);
        let messages = vec![
            msg("a", at(2026, 8, 28, 9, 0)),
            msg("b", at(2026, 8, 29, 9, 0)),
            msg("c", at(2026, 8, 30, 9, 0)),
        ];
        let first = group_by_day(&messages, now);
        let second = group_by_day(&messages, now);
        assert_eq!(first, second);
    }

    #[test]
    fn test_starts_with_separator_and_never_two_in_a_row() {
        let now = at(2026, 8, 30, 12, 0);
        let messages: Vec<Message> = (0..10)
            .map(|i| msg(&format!("m{}", i), at(2026, 8, 24 + (i % 5), 8 + i, 0)))
            .collect();
        let mut sorted = messages;
        sorted.sort_by_key(|m| m.timestamp);

        let timeline = group_by_day(&sorted, now);
        assert!(timeline[0].is_separator());
        for pair in timeline.windows(2) {
            assert!(!(pair[0].is_separator() && pair[1].is_separator()));
        }
    }
}
