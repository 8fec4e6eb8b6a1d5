pub mod app_config;
pub mod database;
pub mod event_log;
pub mod match_repo;
pub mod memory;
pub mod swap_repo;
pub mod target_repo;

pub use database::DbClient;
pub use event_log::PostgresTargetEventLog;
pub use match_repo::PostgresMatchRepository;
pub use memory::MemoryStore;
pub use swap_repo::{PostgresBookingDirectory, PostgresSwapRepository};
pub use target_repo::PostgresTargetRepository;
