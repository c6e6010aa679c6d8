use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::ports::{HostMirror, MirrorError};

/// Host list mirrored to a plain text file, one host per line
#[derive(Debug, Clone)]
pub struct HostFile {
    path: PathBuf,
}

impl HostFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl HostMirror for HostFile {
    fn load(&self) -> Result<Vec<String>, MirrorError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let hosts: BTreeSet<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        Ok(hosts.into_iter().collect())
    }

    fn save(&self, hosts: &[String]) -> Result<(), MirrorError> {
        let sorted: BTreeSet<&str> = hosts.iter().map(String::as_str).collect();
        let mut content = String::new();
        for host in sorted {
            content.push_str(host);
            content.push('\n');
        }

        // Readers only ever see a complete list
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
