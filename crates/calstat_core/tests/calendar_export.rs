use calstat_core::service::export_service::export_calendar;
use calstat_core::service::import_service::import_fresh;
use calstat_core::{
    AnalyticsEngine, Dimension, EngineConfig, ExportError, ItemFilter, RankingScope, Store,
    TimeWindow, UsageRow, ValueOrder,
};
use std::path::Path;

fn write_ics(dir: &Path, file_name: &str, lines: &[&str]) {
    let mut text = lines.join("\r\n");
    text.push_str("\r\n");
    std::fs::write(dir.join(file_name), text).unwrap();
}

fn import_dir(dir: &Path) -> Store {
    let config = EngineConfig::new("unused.db", dir);
    let mut store = Store::open_in_memory().unwrap();
    import_fresh(&mut store, &config).unwrap();
    store
}

fn ranking(analytics: &AnalyticsEngine<'_>) -> Vec<UsageRow> {
    analytics
        .usage_ranking(RankingScope::Calendars, TimeWindow::all(), None)
        .unwrap()
}

#[test]
fn export_then_reimport_preserves_taxonomy_and_totals() {
    let sources = tempfile::tempdir().unwrap();
    write_ics(
        sources.path(),
        "work.ics",
        &[
            "BEGIN:VCALENDAR",
            "VERSION:2.0",
            "PRODID:-//calstat//test//EN",
            "X-WR-TIMEZONE:Europe/Berlin",
            "BEGIN:VEVENT",
            "UID:1@test",
            "DTSTART:20250101T090000Z",
            "DTEND:20250101T110000Z",
            "SUMMARY:Dev: Build feature",
            "DESCRIPTION:Area: Dev<br>Type: Coding<br>Project: Calstat<br>Tags: python\\, cli<br>Difficulty: hard<br>Detail: Parser rewrite",
            "END:VEVENT",
            "BEGIN:VEVENT",
            "UID:2@test",
            "DTSTART;VALUE=DATE:20250102",
            "DTEND;VALUE=DATE:20250103",
            "SUMMARY:Conference",
            "DESCRIPTION:Area: Dev",
            "END:VEVENT",
            "END:VCALENDAR",
        ],
    );
    let original = import_dir(sources.path());

    let document = export_calendar(&original, "work").unwrap();
    assert!(document.contains("BEGIN:VCALENDAR"));
    assert!(document.contains("TZID=Europe/Berlin"));
    assert!(document.contains("20250101T100000"));
    assert!(document.contains("VALUE=DATE"));

    let exported = tempfile::tempdir().unwrap();
    std::fs::write(exported.path().join("work.ics"), &document).unwrap();
    let reimported = import_dir(exported.path());

    let before = AnalyticsEngine::new(&original);
    let after = AnalyticsEngine::new(&reimported);
    assert_eq!(ranking(&before), ranking(&after));

    let work = after.calendar_by_name("work").unwrap().unwrap();
    assert_eq!(work.timezone.as_deref(), Some("Europe/Berlin"));
    for dimension in Dimension::ALL {
        assert_eq!(
            before
                .distinct_values(work.id, dimension, TimeWindow::all(), ValueOrder::Name)
                .unwrap(),
            after
                .distinct_values(work.id, dimension, TimeWindow::all(), ValueOrder::Name)
                .unwrap()
        );
    }

    let report = after
        .report(
            work.id,
            TimeWindow::month(2025, 1),
            Some(ItemFilter::new(Dimension::Project, "calstat")),
        )
        .unwrap();
    assert_eq!(report.total_hours, 2.0);

    let tags = reimported
        .fetch_all("SELECT name FROM tags ORDER BY name;", [], |row| {
            row.get::<_, String>(0)
        })
        .unwrap();
    assert_eq!(tags, vec!["cli", "python"]);
    let detail = reimported
        .fetch_one(
            "SELECT detail FROM events WHERE detail IS NOT NULL;",
            [],
            |row| row.get::<_, String>(0),
        )
        .unwrap();
    assert_eq!(detail.as_deref(), Some("Parser rewrite"));
}

#[test]
fn exporting_unknown_calendar_fails() {
    let store = Store::open_in_memory().unwrap();
    let err = export_calendar(&store, "missing").unwrap_err();
    assert!(matches!(err, ExportError::CalendarNotFound(name) if name == "missing"));
}

#[test]
fn exported_text_round_trips_escaped_characters() {
    let sources = tempfile::tempdir().unwrap();
    write_ics(
        sources.path(),
        "life.ics",
        &[
            "BEGIN:VCALENDAR",
            "VERSION:2.0",
            "PRODID:-//calstat//test//EN",
            "BEGIN:VEVENT",
            "UID:1@test",
            "DTSTART:20250101T120000Z",
            "DTEND:20250101T130000Z",
            "SUMMARY:Lunch\\, walk",
            "DESCRIPTION:Detail: C:\\\\new",
            "END:VEVENT",
            "END:VCALENDAR",
        ],
    );
    let original = import_dir(sources.path());

    let document = export_calendar(&original, "life").unwrap();
    assert!(document.contains("SUMMARY:Lunch\\, walk"));
    assert!(!document.contains("Lunch\\\\"));

    let exported = tempfile::tempdir().unwrap();
    std::fs::write(exported.path().join("life.ics"), &document).unwrap();
    let reimported = import_dir(exported.path());
    let (summary, detail) = reimported
        .fetch_one("SELECT summary, detail FROM events;", [], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .unwrap()
        .unwrap();
    assert_eq!(summary, "Lunch, walk");
    assert_eq!(detail, r"C:\new");
}
