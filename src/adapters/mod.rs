pub mod probe;
pub mod store;

pub use probe::{HttpProbe, IcmpProbe, TcpProbe};
pub use store::{HostFile, MemoryStore};
