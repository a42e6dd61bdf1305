use crate::capture::{CaptureError, CapturedImage, FrameSource};
use crate::models::{AttendanceHistoryResponse, AttendanceKind, AttendanceRecord, DayGroup};
use crate::store::{RecordStore, StoreError, Subscription};
use chrono::{DateTime, Local, NaiveDate, SecondsFormat, TimeDelta, TimeZone, Utc};
use std::{cmp::Ordering, collections::BTreeMap, sync::Arc};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error(transparent)]
    CaptureUnavailable(#[from] CaptureError),
    #[error("failed to save attendance record: {0}")]
    Persistence(#[from] StoreError),
    #[error("{kind} was already registered {elapsed_secs}s ago")]
    DuplicateSubmission {
        kind: AttendanceKind,
        elapsed_secs: i64,
    },
}

/// Kind the next registration must have: check-in for an empty log,
/// otherwise the opposite of the newest record.
pub fn next_expected_kind(log: &[AttendanceRecord]) -> AttendanceKind {
    latest(log)
        .map(|record| record.kind.opposite())
        .unwrap_or(AttendanceKind::CheckIn)
}

pub fn build_record(
    log: &[AttendanceRecord],
    image: CapturedImage,
    now: DateTime<Utc>,
) -> AttendanceRecord {
    AttendanceRecord {
        id: now.to_rfc3339_opts(SecondsFormat::Nanos, true),
        kind: next_expected_kind(log),
        occurred_at: now,
        image_ref: image.into_inner(),
    }
}

pub fn group_by_day(log: &[AttendanceRecord]) -> Vec<DayGroup> {
    group_by_day_in(log, &Local)
}

/// Most recent day first; records within a day in ascending time order.
pub fn group_by_day_in<Tz: TimeZone>(log: &[AttendanceRecord], tz: &Tz) -> Vec<DayGroup> {
    let mut days: BTreeMap<NaiveDate, Vec<AttendanceRecord>> = BTreeMap::new();
    for record in log {
        let date = record.occurred_at.with_timezone(tz).date_naive();
        days.entry(date).or_default().push(record.clone());
    }

    days.into_iter()
        .rev()
        .map(|(date, mut records)| {
            records.sort_by(chronological);
            DayGroup { date, records }
        })
        .collect()
}

fn chronological(a: &AttendanceRecord, b: &AttendanceRecord) -> Ordering {
    a.occurred_at
        .cmp(&b.occurred_at)
        .then_with(|| a.id.cmp(&b.id))
}

fn latest(log: &[AttendanceRecord]) -> Option<&AttendanceRecord> {
    log.iter().max_by(|a, b| chronological(a, b))
}

pub struct AttendanceTracker<S> {
    store: S,
    min_gap: TimeDelta,
    in_flight: Arc<Mutex<()>>,
}

impl<S: Clone> Clone for AttendanceTracker<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            min_gap: self.min_gap,
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<S: RecordStore> AttendanceTracker<S> {
    pub fn new(store: S, min_gap: TimeDelta) -> Self {
        Self {
            store,
            min_gap,
            in_flight: Arc::new(Mutex::new(())),
        }
    }

    pub async fn history(&self, user: &str) -> Result<AttendanceHistoryResponse, AttendanceError> {
        let log = self.store.attendance(user).await?;
        Ok(AttendanceHistoryResponse {
            next_kind: next_expected_kind(&log),
            days: group_by_day(&log),
        })
    }

    /// Live feed of the user's full log, for views that redraw on every change.
    pub async fn subscribe(&self, user: &str) -> Subscription<AttendanceRecord> {
        self.store.subscribe_attendance(user).await
    }

    pub async fn register_event<F: FrameSource + Sync>(
        &self,
        user: &str,
        source: &F,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let image = capture_frame(source)?;
        self.register_image_at(user, image, None).await
    }

    /// Same as [`Self::register_event`] with a fixed clock.
    pub async fn register_event_at<F: FrameSource + Sync>(
        &self,
        user: &str,
        source: &F,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let image = capture_frame(source)?;
        self.register_image_at(user, image, Some(now)).await
    }

    async fn register_image_at(
        &self,
        user: &str,
        image: CapturedImage,
        now: Option<DateTime<Utc>>,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let _guard = self.in_flight.lock().await;
        let now = now.unwrap_or_else(Utc::now);

        let log = self.store.attendance(user).await?;
        if let Some(last) = latest(&log) {
            let elapsed = now - last.occurred_at;
            // A newest record ahead of our clock comes from another session.
            if self.min_gap > TimeDelta::zero()
                && elapsed >= TimeDelta::zero()
                && elapsed < self.min_gap
            {
                warn!(user, kind = %last.kind, "rejected duplicate attendance registration");
                return Err(AttendanceError::DuplicateSubmission {
                    kind: last.kind,
                    elapsed_secs: elapsed.num_seconds(),
                });
            }
        }

        let record = build_record(&log, image, now);
        self.store.append_attendance(user, record.clone()).await?;
        info!(user, kind = %record.kind, id = %record.id, "registered attendance");
        Ok(record)
    }
}

/// The session is released before returning, whether or not a frame was grabbed.
fn capture_frame<F: FrameSource>(source: &F) -> Result<CapturedImage, CaptureError> {
    let mut session = source.acquire()?;
    let frame = session.grab_frame();
    session.release();
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::DataUrlSource;
    use crate::store::MemoryStore;
    use chrono::FixedOffset;

    const PNG: &str = "data:image/png;base64,iVBORw0KGgo=";

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, day, hour, minute, 0).unwrap()
    }

    fn record(id: &str, kind: AttendanceKind, occurred_at: DateTime<Utc>) -> AttendanceRecord {
        AttendanceRecord {
            id: id.into(),
            kind,
            occurred_at,
            image_ref: PNG.into(),
        }
    }

    fn camera() -> DataUrlSource {
        DataUrlSource::new(Some(PNG.to_string()))
    }

    #[test]
    fn empty_log_expects_check_in() {
        assert_eq!(next_expected_kind(&[]), AttendanceKind::CheckIn);
    }

    #[test]
    fn next_kind_follows_newest_record_not_insertion_order() {
        let log = vec![
            record("b", AttendanceKind::CheckOut, at(15, 13, 0)),
            record("a", AttendanceKind::CheckIn, at(15, 9, 0)),
        ];
        assert_eq!(next_expected_kind(&log), AttendanceKind::CheckIn);

        let log = vec![
            record("c", AttendanceKind::CheckIn, at(16, 9, 0)),
            record("b", AttendanceKind::CheckOut, at(15, 13, 0)),
        ];
        assert_eq!(next_expected_kind(&log), AttendanceKind::CheckOut);
    }

    #[test]
    fn group_by_day_orders_days_descending_and_records_ascending() {
        let log = vec![
            record("2", AttendanceKind::CheckOut, at(15, 13, 0)),
            record("3", AttendanceKind::CheckIn, at(16, 8, 30)),
            record("1", AttendanceKind::CheckIn, at(15, 9, 0)),
        ];
        let days = group_by_day_in(&log, &Utc);

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2025, 7, 16).unwrap());
        assert_eq!(days[1].date, NaiveDate::from_ymd_opt(2025, 7, 15).unwrap());
        let ids: Vec<_> = days[1].records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["1", "2"]);
    }

    #[test]
    fn group_by_day_uses_the_given_timezone() {
        let log = vec![record("1", AttendanceKind::CheckIn, at(16, 1, 0))];
        let sao_paulo = FixedOffset::west_opt(3 * 3600).unwrap();
        let days = group_by_day_in(&log, &sao_paulo);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2025, 7, 15).unwrap());
    }

    #[tokio::test]
    async fn registering_after_check_in_produces_check_out() {
        let store = MemoryStore::new();
        store
            .append_attendance("ana", record("1", AttendanceKind::CheckIn, at(15, 9, 0)))
            .await
            .unwrap();
        let tracker = AttendanceTracker::new(store.clone(), TimeDelta::seconds(5));

        let created = tracker
            .register_event_at("ana", &camera(), at(15, 13, 0))
            .await
            .unwrap();
        assert_eq!(created.kind, AttendanceKind::CheckOut);
        assert_eq!(created.image_ref, PNG);

        let log = store.attendance("ana").await.unwrap();
        let days = group_by_day_in(&log, &Utc);
        assert_eq!(days.len(), 1);
        let kinds: Vec<_> = days[0].records.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, [AttendanceKind::CheckIn, AttendanceKind::CheckOut]);
    }

    #[tokio::test]
    async fn missing_capture_aborts_registration() {
        let store = MemoryStore::new();
        let tracker = AttendanceTracker::new(store.clone(), TimeDelta::zero());

        let result = tracker
            .register_event("ana", &DataUrlSource::new(None))
            .await;
        assert!(matches!(result, Err(AttendanceError::CaptureUnavailable(_))));
        assert!(store.attendance("ana").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_failure_is_propagated() {
        let store = MemoryStore::new();
        store.set_reject_writes(true);
        let tracker = AttendanceTracker::new(store.clone(), TimeDelta::zero());

        let result = tracker.register_event("ana", &camera()).await;
        assert!(matches!(
            result,
            Err(AttendanceError::Persistence(StoreError::Rejected))
        ));
        assert!(store.attendance("ana").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rapid_second_registration_is_rejected() {
        let store = MemoryStore::new();
        let tracker = AttendanceTracker::new(store.clone(), TimeDelta::seconds(5));

        tracker
            .register_event_at("ana", &camera(), at(15, 9, 0))
            .await
            .unwrap();
        let second = tracker
            .register_event_at("ana", &camera(), at(15, 9, 0) + TimeDelta::seconds(2))
            .await;
        assert!(matches!(
            second,
            Err(AttendanceError::DuplicateSubmission {
                kind: AttendanceKind::CheckIn,
                ..
            })
        ));

        let later = tracker
            .register_event_at("ana", &camera(), at(15, 9, 1))
            .await
            .unwrap();
        assert_eq!(later.kind, AttendanceKind::CheckOut);
    }

    #[tokio::test]
    async fn zero_gap_accepts_registration_after_future_record() {
        let store = MemoryStore::new();
        store
            .append_attendance("ana", record("1", AttendanceKind::CheckIn, at(15, 9, 2)))
            .await
            .unwrap();
        let tracker = AttendanceTracker::new(store.clone(), TimeDelta::zero());

        let created = tracker
            .register_event_at("ana", &camera(), at(15, 9, 0))
            .await
            .unwrap();
        assert_eq!(created.kind, AttendanceKind::CheckOut);
        assert_eq!(store.attendance("ana").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn gap_ignores_record_ahead_of_the_clock() {
        let store = MemoryStore::new();
        store
            .append_attendance("ana", record("1", AttendanceKind::CheckIn, at(15, 9, 2)))
            .await
            .unwrap();
        let tracker = AttendanceTracker::new(store, TimeDelta::seconds(5));

        let result = tracker
            .register_event_at("ana", &camera(), at(15, 9, 0))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn concurrent_registrations_append_once() {
        let store = MemoryStore::new();
        let tracker = AttendanceTracker::new(store.clone(), TimeDelta::seconds(5));
        let source = camera();

        let (first, second) = tokio::join!(
            tracker.register_event("ana", &source),
            tracker.register_event("ana", &source),
        );
        assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
        assert_eq!(store.attendance("ana").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn subscribers_see_registered_record() {
        let tracker = AttendanceTracker::new(MemoryStore::new(), TimeDelta::zero());
        let mut feed = tracker.subscribe("ana").await;

        tracker.register_event("ana", &camera()).await.unwrap();
        let snapshot = feed.changed().await.unwrap();
        assert_eq!(next_expected_kind(&snapshot), AttendanceKind::CheckOut);

        feed.unsubscribe();
        feed.unsubscribe();
        assert!(feed.changed().await.is_none());
    }

    #[tokio::test]
    async fn history_reports_next_kind_and_days() {
        let store = MemoryStore::new();
        let tracker = AttendanceTracker::new(store, TimeDelta::zero());
        tracker.register_event("ana", &camera()).await.unwrap();

        let history = tracker.history("ana").await.unwrap();
        assert_eq!(history.next_kind, AttendanceKind::CheckOut);
        assert_eq!(history.days.len(), 1);
    }
}
