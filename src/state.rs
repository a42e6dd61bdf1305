use crate::attendance::AttendanceTracker;
use crate::config::Config;
use crate::models::TicketOrder;
use crate::orders::demo_orders;
use crate::sales::{SalesAggregator, SalesError};
use crate::store::RecordStore;
use std::sync::Arc;

pub struct AppState<S> {
    pub store: S,
    pub attendance: AttendanceTracker<S>,
    pub sales: SalesAggregator,
    pub orders: Arc<Vec<TicketOrder>>,
    pub qr_image_base_url: Arc<str>,
}

impl<S: Clone> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            attendance: self.attendance.clone(),
            sales: self.sales,
            orders: Arc::clone(&self.orders),
            qr_image_base_url: Arc::clone(&self.qr_image_base_url),
        }
    }
}

impl<S: RecordStore> AppState<S> {
    pub fn new(store: S, config: &Config) -> Result<Self, SalesError> {
        Ok(Self {
            attendance: AttendanceTracker::new(store.clone(), config.attendance_min_gap),
            sales: SalesAggregator::new(config.monthly_goal, config.recent_sales_limit)?,
            orders: Arc::new(demo_orders()),
            qr_image_base_url: Arc::from(config.qr_image_base_url.as_str()),
            store,
        })
    }
}
