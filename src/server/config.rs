use super::RequestsLoggingLevel;
use crate::music::Key;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    pub metrics_port: u16,
    /// Upper bound for a single similarity query.
    pub query_timeout_sec: u64,
    /// Key groups to use on reload. `None` reads them from the corpus source.
    pub key_groups: Option<String>,
    pub reference_key: Key,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3010,
            metrics_port: 9100,
            query_timeout_sec: 10,
            key_groups: None,
            reference_key: Key::major(0),
        }
    }
}
