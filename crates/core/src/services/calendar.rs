//! Calendar export for finalized events.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use eventhub_common::{AppError, AppResult};
use eventhub_db::{
    entities::event::{self, EventStatus},
    repositories::EventRepository,
};
use sea_orm::DatabaseConnection;

/// MIME type of a rendered calendar.
pub const CALENDAR_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

const DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// A rendered `.ics` document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarExport {
    /// Suggested download name, `<event id>.ics`.
    pub filename: String,
    pub body: String,
}

/// Calendar service.
#[derive(Clone)]
pub struct CalendarService {
    db: Arc<DatabaseConnection>,
    event_repo: EventRepository,
}

impl CalendarService {
    /// Create a new calendar service.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            event_repo: EventRepository::new(),
        }
    }

    /// Render a finalized event as an iCalendar document.
    pub async fn export(&self, event_id: &str) -> AppResult<CalendarExport> {
        let event = self.event_repo.get_by_id(self.db.as_ref(), event_id).await?;

        if event.status != EventStatus::Finalized {
            return Err(AppError::Conflict("Only finalized events can be exported".to_string()));
        }

        Ok(CalendarExport {
            filename: format!("{}.ics", event.id),
            body: render_ics(&event, Utc::now()),
        })
    }
}

/// Render one event as a VCALENDAR with a single VEVENT.
///
/// The event starts at its final date (two hours long); `now` stands in when
/// no usable date was recorded.
#[must_use]
pub fn render_ics(event: &event::Model, now: DateTime<Utc>) -> String {
    let start = event
        .final_date
        .as_deref()
        .and_then(parse_start)
        .unwrap_or(now);
    let end = start + Duration::hours(2);

    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        "PRODID:-//Event Hub//EventHub//EN".to_string(),
        "CALSCALE:GREGORIAN".to_string(),
        "METHOD:PUBLISH".to_string(),
        "BEGIN:VEVENT".to_string(),
        format!("UID:{}@eventhub", event.id),
        format!("DTSTAMP:{}", now.format(DATE_FORMAT)),
        format!("DTSTART:{}", start.format(DATE_FORMAT)),
        format!("DTEND:{}", end.format(DATE_FORMAT)),
        format!("SUMMARY:{}", escape_text(&event.title)),
    ];

    let optional = [
        ("DESCRIPTION", event.description.as_deref()),
        ("LOCATION", event.final_location.as_deref()),
        ("COMMENT", event.final_details.as_deref()),
    ];
    for (name, value) in optional {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            lines.push(format!("{name}:{}", escape_text(value)));
        }
    }

    lines.push("END:VEVENT".to_string());
    lines.push("END:VCALENDAR".to_string());

    let mut body = lines.join("\r\n");
    body.push_str("\r\n");
    body
}

fn parse_start(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use eventhub_db::entities::event::{EventCategory, EventKind};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn finalized_event() -> event::Model {
        event::Model {
            id: "e1".to_string(),
            title: "Movie night".to_string(),
            description: Some("Bring snacks, blankets".to_string()),
            kind: EventKind::Poll,
            status: EventStatus::Finalized,
            category: EventCategory::Cinema,
            creator_id: "m1".to_string(),
            created_at: Utc::now().into(),
            finalized_at: Some(Utc::now().into()),
            final_date: Some("2026-11-06T19:30:00Z".to_string()),
            final_location: Some("Room 4; upstairs".to_string()),
            final_details: None,
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_render_uses_final_date_and_two_hour_window() {
        let ics = render_ics(&finalized_event(), fixed_now());

        assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(ics.ends_with("END:VCALENDAR\r\n"));
        assert!(ics.contains("UID:e1@eventhub\r\n"));
        assert!(ics.contains("DTSTAMP:20261001T120000Z\r\n"));
        assert!(ics.contains("DTSTART:20261106T193000Z\r\n"));
        assert!(ics.contains("DTEND:20261106T213000Z\r\n"));
        assert!(!ics.contains("COMMENT:"));
    }

    #[test]
    fn test_render_escapes_text_values() {
        let mut event = finalized_event();
        event.final_details = Some("Line one\nLine two \\ end".to_string());

        let ics = render_ics(&event, fixed_now());

        assert!(ics.contains("DESCRIPTION:Bring snacks\\, blankets\r\n"));
        assert!(ics.contains("LOCATION:Room 4\\; upstairs\r\n"));
        assert!(ics.contains("COMMENT:Line one\\nLine two \\\\ end\r\n"));
    }

    #[test]
    fn test_naive_date_is_taken_as_utc() {
        let mut event = finalized_event();
        event.final_date = Some("2026-12-24T18:00".to_string());

        let ics = render_ics(&event, fixed_now());

        assert!(ics.contains("DTSTART:20261224T180000Z\r\n"));
    }

    #[test]
    fn test_offset_date_is_converted_to_utc() {
        let mut event = finalized_event();
        event.final_date = Some("2026-11-06T21:00:00+02:00".to_string());

        let ics = render_ics(&event, fixed_now());

        assert!(ics.contains("DTSTART:20261106T190000Z\r\n"));
    }

    #[test]
    fn test_unparseable_date_falls_back_to_now() {
        let mut event = finalized_event();
        event.final_date = Some("next friday".to_string());

        let ics = render_ics(&event, fixed_now());

        assert!(ics.contains("DTSTART:20261001T120000Z\r\n"));
        assert!(ics.contains("DTEND:20261001T140000Z\r\n"));
    }

    #[tokio::test]
    async fn test_export_open_event_is_conflict() {
        let mut event = finalized_event();
        event.status = EventStatus::Open;
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[event]])
                .into_connection(),
        );
        let service = CalendarService::new(db);

        assert!(matches!(
            service.export("e1").await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_export_names_file_after_event() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[finalized_event()]])
                .into_connection(),
        );
        let service = CalendarService::new(db);

        let export = service.export("e1").await.unwrap();

        assert_eq!(export.filename, "e1.ics");
        assert!(export.body.contains("SUMMARY:Movie night\r\n"));
    }
}
