use thiserror::Error;

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Port for keeping the host list visible outside this process
pub trait HostMirror: Send + Sync {
    /// Hosts currently mirrored; empty when nothing was saved yet
    fn load(&self) -> Result<Vec<String>, MirrorError>;

    /// Replace the mirrored list
    fn save(&self, hosts: &[String]) -> Result<(), MirrorError>;
}
