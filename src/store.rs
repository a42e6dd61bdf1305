//! Record stores holding attendance and sale records per user.
//!
//! Stores push full snapshots to subscribers on every change. Subscribers
//! replace their view with the snapshot; there is no incremental merge.

use crate::models::{AppData, AttendanceRecord, SaleRecord};
use crate::storage::{load_data, persist_data};
use std::{
    collections::HashMap,
    future::Future,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tracing::error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("failed to write records: {0}")]
    Write(String),
    #[error("failed to encode records: {0}")]
    Encode(String),
    #[error("store rejected the write")]
    Rejected,
}

pub trait RecordStore: Clone + Send + Sync + 'static {
    fn attendance(
        &self,
        user: &str,
    ) -> impl Future<Output = Result<Vec<AttendanceRecord>, StoreError>> + Send;

    fn append_attendance(
        &self,
        user: &str,
        record: AttendanceRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn sales(&self, user: &str) -> impl Future<Output = Result<Vec<SaleRecord>, StoreError>> + Send;

    fn append_sale(
        &self,
        user: &str,
        record: SaleRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn subscribe_attendance(
        &self,
        user: &str,
    ) -> impl Future<Output = Subscription<AttendanceRecord>> + Send;

    fn subscribe_sales(&self, user: &str) -> impl Future<Output = Subscription<SaleRecord>> + Send;
}

/// A feed of full collection snapshots. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription<T> {
    receiver: Option<watch::Receiver<Arc<Vec<T>>>>,
}

impl<T> Subscription<T> {
    fn new(receiver: watch::Receiver<Arc<Vec<T>>>) -> Self {
        Self {
            receiver: Some(receiver),
        }
    }

    pub fn is_active(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn snapshot(&self) -> Arc<Vec<T>> {
        match &self.receiver {
            Some(receiver) => Arc::clone(&receiver.borrow()),
            None => Arc::new(Vec::new()),
        }
    }

    /// Waits for the next snapshot. Returns `None` once unsubscribed or the
    /// store has gone away.
    pub async fn changed(&mut self) -> Option<Arc<Vec<T>>> {
        let receiver = self.receiver.as_mut()?;
        receiver.changed().await.ok()?;
        Some(Arc::clone(&receiver.borrow_and_update()))
    }

    pub fn unsubscribe(&mut self) {
        self.receiver = None;
    }
}

type Feed<T> = watch::Sender<Arc<Vec<T>>>;

#[derive(Debug, Default)]
struct Collections {
    data: AppData,
    attendance_feeds: HashMap<String, Feed<AttendanceRecord>>,
    sales_feeds: HashMap<String, Feed<SaleRecord>>,
}

impl Collections {
    fn new(data: AppData) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    fn attendance(&self, user: &str) -> Vec<AttendanceRecord> {
        self.data
            .users
            .get(user)
            .map(|records| records.attendance.clone())
            .unwrap_or_default()
    }

    fn sales(&self, user: &str) -> Vec<SaleRecord> {
        self.data
            .users
            .get(user)
            .map(|records| records.sales.clone())
            .unwrap_or_default()
    }

    fn push_attendance(&mut self, user: &str, record: AttendanceRecord) {
        self.data
            .users
            .entry(user.to_string())
            .or_default()
            .attendance
            .push(record);
    }

    fn pop_attendance(&mut self, user: &str) {
        if let Some(records) = self.data.users.get_mut(user) {
            records.attendance.pop();
        }
    }

    fn push_sale(&mut self, user: &str, record: SaleRecord) {
        self.data
            .users
            .entry(user.to_string())
            .or_default()
            .sales
            .push(record);
    }

    fn pop_sale(&mut self, user: &str) {
        if let Some(records) = self.data.users.get_mut(user) {
            records.sales.pop();
        }
    }

    /// Feeds nobody listens to any more are dropped instead of updated.
    fn publish_attendance(&mut self, user: &str) {
        let idle = match self.attendance_feeds.get(user) {
            Some(feed) => feed.receiver_count() == 0,
            None => return,
        };
        if idle {
            self.attendance_feeds.remove(user);
            return;
        }
        let snapshot = Arc::new(self.attendance(user));
        if let Some(feed) = self.attendance_feeds.get(user) {
            feed.send_replace(snapshot);
        }
    }

    fn publish_sales(&mut self, user: &str) {
        let idle = match self.sales_feeds.get(user) {
            Some(feed) => feed.receiver_count() == 0,
            None => return,
        };
        if idle {
            self.sales_feeds.remove(user);
            return;
        }
        let snapshot = Arc::new(self.sales(user));
        if let Some(feed) = self.sales_feeds.get(user) {
            feed.send_replace(snapshot);
        }
    }

    fn subscribe_attendance(&mut self, user: &str) -> Subscription<AttendanceRecord> {
        let snapshot = Arc::new(self.attendance(user));
        let feed = self
            .attendance_feeds
            .entry(user.to_string())
            .or_insert_with(|| watch::channel(Arc::clone(&snapshot)).0);
        Subscription::new(feed.subscribe())
    }

    fn subscribe_sales(&mut self, user: &str) -> Subscription<SaleRecord> {
        let snapshot = Arc::new(self.sales(user));
        let feed = self
            .sales_feeds
            .entry(user.to_string())
            .or_insert_with(|| watch::channel(Arc::clone(&snapshot)).0);
        Subscription::new(feed.subscribe())
    }
}

/// In-memory collection, used for demos and tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Collections>>,
    reject_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: AppData) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Collections::new(data))),
            reject_writes: Arc::default(),
        }
    }

    /// Makes every subsequent append fail with [`StoreError::Rejected`].
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected);
        }
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    async fn attendance(&self, user: &str) -> Result<Vec<AttendanceRecord>, StoreError> {
        Ok(self.inner.lock().await.attendance(user))
    }

    async fn append_attendance(
        &self,
        user: &str,
        record: AttendanceRecord,
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut inner = self.inner.lock().await;
        inner.push_attendance(user, record);
        inner.publish_attendance(user);
        Ok(())
    }

    async fn sales(&self, user: &str) -> Result<Vec<SaleRecord>, StoreError> {
        Ok(self.inner.lock().await.sales(user))
    }

    async fn append_sale(&self, user: &str, record: SaleRecord) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut inner = self.inner.lock().await;
        inner.push_sale(user, record);
        inner.publish_sales(user);
        Ok(())
    }

    async fn subscribe_attendance(&self, user: &str) -> Subscription<AttendanceRecord> {
        self.inner.lock().await.subscribe_attendance(user)
    }

    async fn subscribe_sales(&self, user: &str) -> Subscription<SaleRecord> {
        self.inner.lock().await.subscribe_sales(user)
    }
}

/// Local-only store: a single JSON document rewritten on every append.
#[derive(Clone)]
pub struct JsonFileStore {
    path: Arc<PathBuf>,
    inner: Arc<Mutex<Collections>>,
}

impl JsonFileStore {
    pub async fn open(path: PathBuf) -> Self {
        let data = load_data(&path).await;
        Self {
            path: Arc::new(path),
            inner: Arc::new(Mutex::new(Collections::new(data))),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl RecordStore for JsonFileStore {
    async fn attendance(&self, user: &str) -> Result<Vec<AttendanceRecord>, StoreError> {
        Ok(self.inner.lock().await.attendance(user))
    }

    async fn append_attendance(
        &self,
        user: &str,
        record: AttendanceRecord,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.push_attendance(user, record);
        if let Err(err) = persist_data(&self.path, &inner.data).await {
            error!(user, "failed to persist attendance record: {err}");
            inner.pop_attendance(user);
            return Err(err);
        }
        inner.publish_attendance(user);
        Ok(())
    }

    async fn sales(&self, user: &str) -> Result<Vec<SaleRecord>, StoreError> {
        Ok(self.inner.lock().await.sales(user))
    }

    async fn append_sale(&self, user: &str, record: SaleRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.push_sale(user, record);
        if let Err(err) = persist_data(&self.path, &inner.data).await {
            error!(user, "failed to persist sale record: {err}");
            inner.pop_sale(user);
            return Err(err);
        }
        inner.publish_sales(user);
        Ok(())
    }

    async fn subscribe_attendance(&self, user: &str) -> Subscription<AttendanceRecord> {
        self.inner.lock().await.subscribe_attendance(user)
    }

    async fn subscribe_sales(&self, user: &str) -> Subscription<SaleRecord> {
        self.inner.lock().await.subscribe_sales(user)
    }
}
