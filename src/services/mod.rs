pub mod store;
pub mod redis_service;
pub mod memory_store;
pub mod system_monitor;

pub use store::UserStore;
pub use redis_service::RedisService;
pub use memory_store::MemoryUserStore;
pub use system_monitor::{spawn_sampler, HostMetrics, SystemMonitor};
