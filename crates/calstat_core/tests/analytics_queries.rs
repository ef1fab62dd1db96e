use calstat_core::service::import_service::import_fresh;
use calstat_core::{
    AnalyticsEngine, DimensionReport, Dimension, EngineConfig, EntityId, ItemFilter,
    RankingScope, Store, TimeWindow, ValueOrder,
};
use chrono::NaiveDate;
use std::path::Path;

fn timed(uid: &str, start: &str, end: &str, description: &str) -> Vec<String> {
    let mut lines = vec![
        "BEGIN:VEVENT".to_string(),
        format!("UID:{uid}@test"),
        format!("DTSTART:{start}"),
        format!("DTEND:{end}"),
        format!("SUMMARY:{uid}"),
    ];
    if !description.is_empty() {
        lines.push(format!("DESCRIPTION:{description}"));
    }
    lines.push("END:VEVENT".to_string());
    lines
}

fn write_ics(dir: &Path, file_name: &str, events: &[Vec<String>]) {
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        "PRODID:-//calstat//test//EN".to_string(),
    ];
    for event in events {
        lines.extend(event.iter().cloned());
    }
    lines.push("END:VCALENDAR".to_string());
    let mut text = lines.join("\r\n");
    text.push_str("\r\n");
    std::fs::write(dir.join(file_name), text).unwrap();
}

/// work: 8h over six events (one all-day), study: 2h, alpha: 2h, empty: none.
fn seeded_store() -> Store {
    let sources = tempfile::tempdir().unwrap();
    write_ics(
        sources.path(),
        "work.ics",
        &[
            timed(
                "w1",
                "20250101T090000Z",
                "20250101T110000Z",
                "Area: Dev\\nType: Coding\\nProject: calstat\\nTags: rust",
            ),
            timed(
                "w2",
                "20250101T140000Z",
                "20250101T150000Z",
                "Area: Dev\\nType: Review",
            ),
            timed(
                "w3",
                "20250103T100000Z",
                "20250103T130000Z",
                "Area: dev\\nType: coding",
            ),
            timed("w4", "20250105T080000Z", "20250105T090000Z", "Area: Admin"),
            timed("w5", "20250210T090000Z", "20250210T100000Z", ""),
            vec![
                "BEGIN:VEVENT".to_string(),
                "UID:w6@test".to_string(),
                "DTSTART;VALUE=DATE:20241231".to_string(),
                "DTEND;VALUE=DATE:20250101".to_string(),
                "SUMMARY:w6".to_string(),
                "DESCRIPTION:Area: Dev".to_string(),
                "END:VEVENT".to_string(),
            ],
        ],
    );
    write_ics(
        sources.path(),
        "study.ics",
        &[timed(
            "s1",
            "20250102T180000Z",
            "20250102T200000Z",
            "Area: Reading",
        )],
    );
    write_ics(
        sources.path(),
        "alpha.ics",
        &[timed("a1", "20250301T100000Z", "20250301T120000Z", "")],
    );
    write_ics(sources.path(), "empty.ics", &[]);

    let config = EngineConfig::new("unused.db", sources.path());
    let mut store = Store::open_in_memory().unwrap();
    let report = import_fresh(&mut store, &config).unwrap();
    assert_eq!(report.calendars_imported, 4);
    assert_eq!(report.events_imported, 8);
    store
}

fn calendar_id(analytics: &AnalyticsEngine<'_>, name: &str) -> EntityId {
    analytics.calendar_by_name(name).unwrap().unwrap().id
}

#[test]
fn calendar_ranking_orders_by_duration_then_name() {
    let store = seeded_store();
    let analytics = AnalyticsEngine::new(&store);

    let ranked = analytics
        .usage_ranking(RankingScope::Calendars, TimeWindow::all(), None)
        .unwrap();
    let summary = ranked
        .iter()
        .map(|row| (row.name.as_str(), row.total_duration, row.total_events))
        .collect::<Vec<_>>();
    assert_eq!(
        summary,
        vec![
            ("work", 8.0, 6),
            ("alpha", 2.0, 1),
            ("study", 2.0, 1),
            ("empty", 0.0, 0),
        ]
    );
    assert!(ranked.iter().all(|row| row.color.is_some()));

    let top = analytics
        .usage_ranking(RankingScope::Calendars, TimeWindow::all(), Some(1))
        .unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].name, "work");
}

#[test]
fn calendar_ranking_respects_time_window() {
    let store = seeded_store();
    let analytics = AnalyticsEngine::new(&store);

    let january = analytics
        .usage_ranking(RankingScope::Calendars, TimeWindow::month(2025, 1), None)
        .unwrap();
    let summary = january
        .iter()
        .map(|row| (row.name.as_str(), row.total_duration, row.total_events))
        .collect::<Vec<_>>();
    assert_eq!(
        summary,
        vec![
            ("work", 7.0, 4),
            ("study", 2.0, 1),
            ("alpha", 0.0, 0),
            ("empty", 0.0, 0),
        ]
    );
}

#[test]
fn dimension_ranking_is_scoped_to_one_calendar() {
    let store = seeded_store();
    let analytics = AnalyticsEngine::new(&store);
    let work = calendar_id(&analytics, "work");

    let areas = analytics
        .usage_ranking(
            RankingScope::Dimension {
                calendar_id: work,
                dimension: Dimension::Area,
            },
            TimeWindow::all(),
            None,
        )
        .unwrap();
    let summary = areas
        .iter()
        .map(|row| (row.name.as_str(), row.total_duration, row.total_events))
        .collect::<Vec<_>>();
    assert_eq!(summary, vec![("dev", 6.0, 4), ("admin", 1.0, 1)]);
    assert!(areas.iter().all(|row| row.color.is_none()));
}

#[test]
fn distinct_values_support_both_orders_and_windows() {
    let store = seeded_store();
    let analytics = AnalyticsEngine::new(&store);
    let work = calendar_id(&analytics, "work");

    assert_eq!(
        analytics
            .distinct_values(work, Dimension::Area, TimeWindow::all(), ValueOrder::Name)
            .unwrap(),
        vec!["admin", "dev"]
    );
    assert_eq!(
        analytics
            .distinct_values(
                work,
                Dimension::Area,
                TimeWindow::all(),
                ValueOrder::TotalDuration
            )
            .unwrap(),
        vec!["dev", "admin"]
    );
    assert_eq!(
        analytics
            .distinct_values(
                work,
                Dimension::Type,
                TimeWindow::month(2025, 1),
                ValueOrder::Name
            )
            .unwrap(),
        vec!["coding", "review"]
    );
    assert!(analytics
        .distinct_values(
            work,
            Dimension::Project,
            TimeWindow::month(2025, 2),
            ValueOrder::Name
        )
        .unwrap()
        .is_empty());
}

#[test]
fn distinct_years_and_months_follow_local_dates() {
    let store = seeded_store();
    let analytics = AnalyticsEngine::new(&store);
    let work = calendar_id(&analytics, "work");

    assert_eq!(analytics.distinct_years(Some(work)).unwrap(), vec![2024, 2025]);
    assert_eq!(analytics.distinct_years(None).unwrap(), vec![2024, 2025]);
    assert_eq!(
        analytics.distinct_months(Some(work), Some(2025)).unwrap(),
        vec![1, 2]
    );
    assert_eq!(
        analytics.distinct_months(Some(work), None).unwrap(),
        vec![1, 2, 12]
    );

    let empty = calendar_id(&analytics, "empty");
    assert!(analytics.distinct_years(Some(empty)).unwrap().is_empty());
}

#[test]
fn daily_breakdown_sums_to_report_total() {
    let store = seeded_store();
    let analytics = AnalyticsEngine::new(&store);
    let work = calendar_id(&analytics, "work");
    let dev = ItemFilter::new(Dimension::Area, "Dev");

    let days = analytics.daily_breakdown(work, 2025, 1, Some(dev)).unwrap();
    let summary = days
        .iter()
        .map(|day| (day.day, day.total_duration, day.event_count))
        .collect::<Vec<_>>();
    assert_eq!(summary, vec![(1, 3.0, 2), (3, 3.0, 1)]);

    let report = analytics
        .report(work, TimeWindow::month(2025, 1), Some(dev))
        .unwrap();
    let daily_total: f64 = days.iter().map(|day| day.total_duration).sum();
    assert_eq!(daily_total, report.total_hours);

    assert_eq!(
        report,
        DimensionReport {
            first_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            last_date: NaiveDate::from_ymd_opt(2025, 1, 3),
            total_days: 2,
            average_day: 3.0,
            total_events: 3,
            total_hours: 6.0,
            average_duration: 2.0,
            max_duration: 3.0,
            min_duration: 1.0,
        }
    );
}

#[test]
fn report_without_item_covers_whole_calendar() {
    let store = seeded_store();
    let analytics = AnalyticsEngine::new(&store);
    let work = calendar_id(&analytics, "work");

    let report = analytics.report(work, TimeWindow::all(), None).unwrap();
    assert_eq!(report.first_date, NaiveDate::from_ymd_opt(2024, 12, 31));
    assert_eq!(report.last_date, NaiveDate::from_ymd_opt(2025, 2, 10));
    assert_eq!(report.total_events, 6);
    assert_eq!(report.total_days, 5);
    assert_eq!(report.total_hours, 8.0);
    assert_eq!(report.min_duration, 0.0);

    let february = analytics.daily_breakdown(work, 2025, 2, None).unwrap();
    assert_eq!(february.len(), 1);
    assert_eq!(february[0].day, 10);
}

#[test]
fn unknown_or_blank_item_yields_zero_report() {
    let store = seeded_store();
    let analytics = AnalyticsEngine::new(&store);
    let work = calendar_id(&analytics, "work");

    for name in ["nonexistent", "   "] {
        let item = ItemFilter::new(Dimension::Project, name);
        let report = analytics.report(work, TimeWindow::all(), Some(item)).unwrap();
        assert_eq!(report, DimensionReport::default());
        assert!(analytics
            .daily_breakdown(work, 2025, 1, Some(item))
            .unwrap()
            .is_empty());
    }

    let empty = calendar_id(&analytics, "empty");
    let report = analytics.report(empty, TimeWindow::all(), None).unwrap();
    assert_eq!(report.total_events, 0);
    assert_eq!(report.first_date, None);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["total_hours"], 0.0);
    assert!(json["first_date"].is_null());
}

#[test]
fn unclassified_usage_counts_events_without_a_value() {
    let store = seeded_store();
    let analytics = AnalyticsEngine::new(&store);
    let work = calendar_id(&analytics, "work");

    let no_area = analytics
        .unclassified_usage(work, Dimension::Area, TimeWindow::all())
        .unwrap();
    assert_eq!((no_area.total_duration, no_area.total_events), (1.0, 1));

    let no_type = analytics
        .unclassified_usage(work, Dimension::Type, TimeWindow::all())
        .unwrap();
    assert_eq!((no_type.total_duration, no_type.total_events), (2.0, 3));

    let no_type_january = analytics
        .unclassified_usage(work, Dimension::Type, TimeWindow::month(2025, 1))
        .unwrap();
    assert_eq!(
        (no_type_january.total_duration, no_type_january.total_events),
        (1.0, 1)
    );
}

#[test]
fn single_event_report_matches_source_duration() {
    let sources = tempfile::tempdir().unwrap();
    write_ics(
        sources.path(),
        "work.ics",
        &[timed(
            "dev",
            "20250101T090000Z",
            "20250101T110000Z",
            "Area: Dev\\nTags: python\\, cli\\nDifficulty: 3",
        )],
    );
    let config = EngineConfig::new("unused.db", sources.path());
    let mut store = Store::open_in_memory().unwrap();
    import_fresh(&mut store, &config).unwrap();

    let analytics = AnalyticsEngine::new(&store);
    let work = calendar_id(&analytics, "work");
    let report = analytics
        .report(
            work,
            TimeWindow::month(2025, 1),
            Some(ItemFilter::new(Dimension::Area, "dev")),
        )
        .unwrap();
    assert_eq!(report.total_hours, 2.0);
    assert_eq!(report.total_days, 1);
    assert_eq!(report.average_day, 2.0);
    assert_eq!(report.max_duration, 2.0);
    assert_eq!(report.min_duration, 2.0);
}
