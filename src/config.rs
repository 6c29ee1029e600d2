/// Configuration options for the descriptor engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Record key that holds the pre-parsed MARC view
    pub marc_key: String,

    /// Emit `tracing` warnings while evaluating (warnings are collected in
    /// the per-record result either way)
    pub log_warnings: bool,
}

impl EngineConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern methods
    pub fn with_marc_key(mut self, key: impl Into<String>) -> Self {
        self.marc_key = key.into();
        self
    }

    pub fn with_log_warnings(mut self, enable: bool) -> Self {
        self.log_warnings = enable;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            marc_key: "fullrecord".to_string(),
            log_warnings: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.marc_key, "fullrecord");
        assert!(config.log_warnings);
    }

    #[test]
    fn test_builder_pattern() {
        let config = EngineConfig::new()
            .with_marc_key("marc21")
            .with_log_warnings(false);

        assert_eq!(config.marc_key, "marc21");
        assert!(!config.log_warnings);
    }
}
