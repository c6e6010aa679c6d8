mod host_file;
mod memory;

pub use host_file::HostFile;
pub use memory::MemoryStore;
