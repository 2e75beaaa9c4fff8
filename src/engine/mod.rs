pub mod audit;
pub mod board;
pub mod dashboard;
pub mod missions;
pub mod profiles;

pub use audit::{AuditLog, LOGS_PAGE_SIZE};
pub use board::MissionBoard;
pub use dashboard::DashboardStats;
pub use missions::{MissionService, MissionUpdate};
pub use profiles::ProfileService;
