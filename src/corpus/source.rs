use super::{SongLink, SongRecord};
use anyhow::Result;

/// Where songs and the key-equivalence configuration come from.
///
/// Read once at startup and again on every reload.
pub trait CorpusSource: Send + Sync {
    fn load_records(&self) -> Result<Vec<SongRecord>>;

    /// Key-group configuration stored alongside the corpus, if any.
    fn load_key_groups(&self) -> Result<Option<String>>;

    /// Links to attach to songs. Sources without any return nothing.
    fn load_links(&self) -> Result<Vec<SongLink>> {
        Ok(vec![])
    }

    /// Human readable description, used in logs.
    fn describe(&self) -> String;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCorpusSource {
    pub records: Vec<SongRecord>,
    pub key_groups: Option<String>,
    pub links: Vec<SongLink>,
}

impl InMemoryCorpusSource {
    pub fn new(records: Vec<SongRecord>) -> InMemoryCorpusSource {
        InMemoryCorpusSource {
            records,
            key_groups: None,
            links: vec![],
        }
    }
}

impl CorpusSource for InMemoryCorpusSource {
    fn load_records(&self) -> Result<Vec<SongRecord>> {
        Ok(self.records.clone())
    }

    fn load_key_groups(&self) -> Result<Option<String>> {
        Ok(self.key_groups.clone())
    }

    fn load_links(&self) -> Result<Vec<SongLink>> {
        Ok(self.links.clone())
    }

    fn describe(&self) -> String {
        format!("in-memory corpus ({} records)", self.records.len())
    }
}
