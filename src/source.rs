//! Read-Only Accessors
//!
//! Components never reach into orchestrator state. They are handed one of
//! these at construction and pull a snapshot once per pass.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::contribution::ItemsContributions;
use crate::renders::ItemsRenders;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read contributions: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid contributions file: {0}")]
    Parse(#[from] serde_json::Error),
}

pub trait ContributionSource: Send + Sync {
    fn contributions(&self) -> ItemsContributions;
}

pub trait RenderSource: Send + Sync {
    fn renders(&self) -> ItemsRenders;
}

impl ContributionSource for ItemsContributions {
    fn contributions(&self) -> ItemsContributions {
        self.clone()
    }
}

impl RenderSource for ItemsRenders {
    fn renders(&self) -> ItemsRenders {
        self.clone()
    }
}

/// Load `{ "<itemId>": [ {"kind": ..., "data": ...}, ... ] }` from disk
pub fn load_contributions(path: &Path) -> Result<ItemsContributions, SourceError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_contributions_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"2": [{{"kind": "ItemAttributesGenerator", "data": {{"dna": "x", "attributes": {{"Body": "red"}}}}}}],
                "1": [{{"kind": "Other", "data": null}}]}}"#
        )
        .unwrap();

        let items = load_contributions(file.path()).unwrap();
        let ids: Vec<_> = items.keys().cloned().collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert!(items["2"][0].as_traits().is_some());
        assert_eq!(items["1"][0].kind(), None);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_contributions(Path::new("/nonexistent/contributions.json")).unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
    }
}
