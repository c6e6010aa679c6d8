mod monitor_loop;
mod monitoring;
mod prober;

pub use monitor_loop::MonitorLoop;
pub use monitoring::MonitoringService;
pub use prober::Prober;
