use chrono::{Duration, NaiveDate};
use rusqlite::Connection;
use totka_core::db::open_db_in_memory;
use totka_core::{
    AlertCommand, AlertContent, AlertError, AlertEvent, AlertEventKind, AlertHandle,
    AlertPayload, AlertPlatform, AlertResult, AlertSyncReport, ArmedAlert, DoseTime, FixedClock,
    QueuedAlertPlatform, ReminderService, SqliteKeyValueStore,
};
use uuid::Uuid;

type Service<'a> = ReminderService<SqliteKeyValueStore<'a>, QueuedAlertPlatform, FixedClock>;

fn service<'a>(conn: &'a Connection, clock: &'a FixedClock) -> Service<'a> {
    ReminderService::new(
        SqliteKeyValueStore::new(conn),
        QueuedAlertPlatform::new(),
        clock.clone(),
    )
}

fn armed_pairs(service: &Service<'_>) -> Vec<(Uuid, String)> {
    let mut pairs = service
        .scheduler()
        .armed()
        .into_iter()
        .map(|alert| (alert.payload.medicine_id, alert.payload.time.to_string()))
        .collect::<Vec<_>>();
    pairs.sort();
    pairs
}

fn event(kind: AlertEventKind, payload: AlertPayload) -> AlertEvent {
    AlertEvent {
        kind,
        handle: None,
        payload,
    }
}

fn payload_for(service: &Service<'_>, id: Uuid, time: &str) -> AlertPayload {
    service
        .scheduler()
        .armed()
        .into_iter()
        .find(|alert| alert.payload.medicine_id == id && alert.payload.time.to_string() == time)
        .map(|alert| alert.payload)
        .expect("pair should be armed")
}

#[test]
fn add_medicine_arms_one_alert_per_time() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::at_local(2026, 3, 10, 8, 0).unwrap();
    let service = service(&conn, &clock);

    let medicine = service
        .add_medicine("Aspirin", &["22:00", "09:00", "09:00"])
        .unwrap();

    assert_eq!(
        armed_pairs(&service),
        vec![
            (medicine.id, "09:00".to_string()),
            (medicine.id, "22:00".to_string())
        ]
    );
    let delays = service
        .scheduler()
        .platform()
        .take_pending()
        .unwrap()
        .into_iter()
        .map(|command| match command {
            AlertCommand::Arm { delay_seconds, .. } => delay_seconds,
            other => panic!("unexpected command: {other:?}"),
        })
        .collect::<Vec<_>>();
    assert_eq!(delays, vec![3600, 14 * 3600]);
}

#[test]
fn invalid_add_arms_nothing() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::at_local(2026, 3, 10, 8, 0).unwrap();
    let service = service(&conn, &clock);

    assert!(service.add_medicine("Aspirin", &["nope"]).is_err());
    assert!(service.scheduler().armed().is_empty());
    assert!(service.list_medicines().is_empty());
}

#[test]
fn delete_medicine_cancels_its_alerts_only() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::at_local(2026, 3, 10, 8, 0).unwrap();
    let service = service(&conn, &clock);
    let aspirin = service.add_medicine("Aspirin", &["09:00", "22:00"]).unwrap();
    let vitamin = service.add_medicine("Vitamin D", &["09:00"]).unwrap();

    service.delete_medicine(aspirin.id).unwrap();
    service.delete_medicine(aspirin.id).unwrap();

    assert_eq!(service.list_medicines(), vec![vitamin.clone()]);
    assert_eq!(armed_pairs(&service), vec![(vitamin.id, "09:00".to_string())]);
}

#[test]
fn update_times_cancels_removed_and_arms_added() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::at_local(2026, 3, 10, 8, 0).unwrap();
    let service = service(&conn, &clock);
    let medicine = service.add_medicine("Aspirin", &["09:00", "22:00"]).unwrap();
    let kept_payload = payload_for(&service, medicine.id, "09:00");

    service
        .update_medicine_times(medicine.id, &["09:00", "13:00"])
        .unwrap();

    assert_eq!(
        armed_pairs(&service),
        vec![
            (medicine.id, "09:00".to_string()),
            (medicine.id, "13:00".to_string())
        ]
    );
    assert_eq!(payload_for(&service, medicine.id, "09:00"), kept_payload);
}

#[test]
fn mark_taken_shows_in_todays_view_only_for_today() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::at_local(2026, 3, 10, 9, 1).unwrap();
    let service = service(&conn, &clock);
    let medicine = service.add_medicine("Aspirin", &["09:00", "22:00"]).unwrap();

    service.mark_taken(medicine.id, "Aspirin", "9:00").unwrap();
    assert!(service.mark_taken(medicine.id, "Aspirin", "9am").is_err());

    let today = service.todays_medicines_with_status();
    assert_eq!(today.len(), 1);
    assert!(today[0].is_taken(DoseTime::new(9, 0).unwrap()));
    assert!(!today[0].is_taken(DoseTime::new(22, 0).unwrap()));

    clock.advance(Duration::days(1));
    let tomorrow = service.todays_medicines_with_status();
    assert!(tomorrow[0].todays_status.is_empty());
    assert_eq!(
        service.history_dates(),
        vec![NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()]
    );
}

#[test]
fn fired_alert_is_replaced_by_tomorrows() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::at_local(2026, 3, 10, 8, 0).unwrap();
    let service = service(&conn, &clock);
    let medicine = service.add_medicine("Aspirin", &["09:00"]).unwrap();
    let fired = payload_for(&service, medicine.id, "09:00");
    service.scheduler().platform().take_pending().unwrap();

    clock.advance(Duration::hours(1));
    let handle = service
        .handle_alert_event(&event(AlertEventKind::Fired, fired.clone()))
        .expect("next alert should be armed");

    let armed = service.scheduler().armed();
    assert_eq!(armed.len(), 1);
    assert_eq!(armed[0].handle, handle);
    assert_eq!(
        armed[0].payload.scheduled_time - fired.scheduled_time,
        Duration::days(1).num_milliseconds()
    );
    assert!(service.todays_medicines_with_status()[0]
        .todays_status
        .is_empty());
}

#[test]
fn tapped_alert_records_dose_and_keeps_one_alert_armed() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::at_local(2026, 3, 10, 8, 0).unwrap();
    let service = service(&conn, &clock);
    let medicine = service.add_medicine("Aspirin", &["09:00"]).unwrap();
    let payload = payload_for(&service, medicine.id, "09:00");

    clock.advance(Duration::minutes(61));
    service.handle_alert_event(&event(AlertEventKind::Fired, payload.clone()));
    service.handle_alert_event(&event(AlertEventKind::Tapped, payload));

    assert_eq!(service.scheduler().armed().len(), 1);
    let today = service.todays_medicines_with_status();
    assert!(today[0].is_taken(DoseTime::new(9, 0).unwrap()));
}

#[test]
fn events_for_deleted_medicine_are_not_rearmed() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::at_local(2026, 3, 10, 8, 0).unwrap();
    let service = service(&conn, &clock);
    let medicine = service.add_medicine("Aspirin", &["09:00"]).unwrap();
    let payload = payload_for(&service, medicine.id, "09:00");
    service.delete_medicine(medicine.id).unwrap();

    let rearmed = service.handle_alert_event(&event(AlertEventKind::Tapped, payload));

    assert!(rearmed.is_none());
    assert!(service.scheduler().armed().is_empty());
    let day = service
        .history_for_date(NaiveDate::from_ymd_opt(2026, 3, 10).unwrap())
        .expect("tap should still be recorded");
    assert_eq!(day.medicines[&medicine.id].name, "Aspirin");
}

#[test]
fn sync_alerts_converges_to_one_alert_per_pair() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::at_local(2026, 3, 10, 8, 0).unwrap();
    let service = service(&conn, &clock);
    let medicine = service.add_medicine("Aspirin", &["09:00", "21:00"]).unwrap();
    let nine = payload_for(&service, medicine.id, "09:00");
    let platform = service.scheduler().platform();

    // Simulate a restart: the OS holds a duplicate and an orphan, and lost 21:00.
    let orphan = AlertPayload {
        medicine_id: Uuid::now_v7(),
        ..nine.clone()
    };
    platform
        .restore_armed(vec![
            ArmedAlert {
                handle: AlertHandle("a".to_string()),
                payload: nine.clone(),
            },
            ArmedAlert {
                handle: AlertHandle("b".to_string()),
                payload: nine,
            },
            ArmedAlert {
                handle: AlertHandle("c".to_string()),
                payload: orphan,
            },
        ])
        .unwrap();

    let report = service.sync_alerts();

    assert_eq!(report.cancelled, 2);
    assert_eq!(report.armed, 1);
    assert_eq!(
        armed_pairs(&service),
        vec![
            (medicine.id, "09:00".to_string()),
            (medicine.id, "21:00".to_string())
        ]
    );
    assert_eq!(service.sync_alerts().armed, 0);
}

#[test]
fn factory_reset_clears_documents_and_alerts() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::at_local(2026, 3, 10, 9, 0).unwrap();
    let service = service(&conn, &clock);
    let medicine = service.add_medicine("Aspirin", &["09:00"]).unwrap();
    service.mark_taken(medicine.id, "Aspirin", "09:00").unwrap();

    service.factory_reset().unwrap();

    assert!(service.list_medicines().is_empty());
    assert!(service.history_dates().is_empty());
    assert!(service.scheduler().armed().is_empty());
}

struct BrokenPlatform;

impl AlertPlatform for BrokenPlatform {
    fn arm_one_shot(
        &self,
        _delay_seconds: u64,
        _content: &AlertContent,
        _payload: &AlertPayload,
    ) -> AlertResult<AlertHandle> {
        Err(AlertError::Platform("notifications disabled".to_string()))
    }

    fn cancel(&self, _handle: &AlertHandle) -> AlertResult<()> {
        Err(AlertError::Platform("notifications disabled".to_string()))
    }

    fn list_armed(&self) -> AlertResult<Vec<ArmedAlert>> {
        Err(AlertError::Platform("notifications disabled".to_string()))
    }
}

#[test]
fn alert_failures_do_not_block_data_changes() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::at_local(2026, 3, 10, 8, 0).unwrap();
    let service = ReminderService::new(SqliteKeyValueStore::new(&conn), BrokenPlatform, clock);

    let medicine = service.add_medicine("Aspirin", &["09:00"]).unwrap();
    assert_eq!(service.list_medicines(), vec![medicine.clone()]);

    assert_eq!(service.sync_alerts().armed, 0);
    service.delete_medicine(medicine.id).unwrap();
    assert!(service.list_medicines().is_empty());
}

#[test]
fn tap_without_fired_event_arms_tomorrows_alert() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::at_local(2026, 3, 10, 8, 0).unwrap();
    let service = service(&conn, &clock);
    let medicine = service.add_medicine("Aspirin", &["09:00"]).unwrap();
    let delivered = service.scheduler().armed().remove(0);

    // Delivered in the background; the first callback is the tap.
    clock.advance(Duration::minutes(65));
    let rearmed = service
        .handle_alert_event(&AlertEvent {
            kind: AlertEventKind::Tapped,
            handle: Some(delivered.handle.clone()),
            payload: delivered.payload.clone(),
        })
        .expect("tomorrow's alert should be armed");

    let armed = service.scheduler().armed();
    assert_eq!(armed.len(), 1);
    assert_eq!(armed[0].handle, rearmed);
    assert_ne!(armed[0].handle, delivered.handle);
    assert_eq!(
        armed[0].payload.scheduled_time - delivered.payload.scheduled_time,
        Duration::days(1).num_milliseconds()
    );
    assert!(service.todays_medicines_with_status()[0].is_taken(DoseTime::new(9, 0).unwrap()));
    assert_eq!(service.scheduler().upcoming().len(), 1);
    assert_eq!(armed[0].payload.medicine_id, medicine.id);
}

#[test]
fn sync_after_missed_fire_replaces_delivered_alert() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::at_local(2026, 3, 10, 8, 0).unwrap();
    let service = service(&conn, &clock);
    let medicine = service.add_medicine("Aspirin", &["09:00"]).unwrap();
    let delivered = payload_for(&service, medicine.id, "09:00");

    clock.advance(Duration::minutes(65));
    let report = service.sync_alerts();

    assert_eq!(report, AlertSyncReport { armed: 1, cancelled: 1 });
    let upcoming = service.scheduler().upcoming();
    assert_eq!(upcoming.len(), 1);
    assert_eq!(
        upcoming[0].payload.scheduled_time - delivered.scheduled_time,
        Duration::days(1).num_milliseconds()
    );
    assert_eq!(service.scheduler().armed().len(), 1);
    assert_eq!(service.sync_alerts(), AlertSyncReport::default());
}

#[test]
fn tapped_dose_is_recorded_under_the_payload_name() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::at_local(2026, 3, 10, 8, 0).unwrap();
    let service = service(&conn, &clock);
    let medicine = service.add_medicine("Aspirin", &["09:00"]).unwrap();
    let payload = AlertPayload {
        medicine_name: "Aspirin 500mg".to_string(),
        ..payload_for(&service, medicine.id, "09:00")
    };

    clock.advance(Duration::minutes(5));
    service.handle_alert_event(&event(AlertEventKind::Tapped, payload));

    let day = service
        .history_for_date(NaiveDate::from_ymd_opt(2026, 3, 10).unwrap())
        .expect("tap should be recorded");
    assert_eq!(day.medicines[&medicine.id].name, "Aspirin 500mg");
}
