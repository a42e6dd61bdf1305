pub mod app;
pub mod attendance;
pub mod capture;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod orders;
pub mod sales;
pub mod state;
pub mod storage;
pub mod store;
pub mod ui;

pub use app::router;
pub use config::{Config, StoreBackend};
pub use state::AppState;
pub use store::{JsonFileStore, MemoryStore, RecordStore};
