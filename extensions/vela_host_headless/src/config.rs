//! Headless host configuration (vela_host.toml)

use serde::{Deserialize, Serialize};
use vela_extension::{ClientKind, ExtensionError, HostScope, Result};

/// Host configuration for a headless run
#[derive(Debug, Deserialize, Serialize)]
pub struct HostConfig {
    /// Client kind the host presents itself as: "desktop", "mobile", "web",
    /// or "headless"
    #[serde(default = "default_client")]
    pub client: String,

    /// Editor surface the host exposes, if any (extensions scoped to an
    /// editor only compose when this matches)
    #[serde(default)]
    pub editor: Option<String>,

    /// Upper bound on retained event-log entries; older entries drop first
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

fn default_client() -> String {
    "headless".to_string()
}

fn default_log_capacity() -> usize {
    256
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            client: default_client(),
            editor: None,
            log_capacity: default_log_capacity(),
        }
    }
}

impl HostConfig {
    /// Parse a configuration from TOML, validating the client kind
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: HostConfig =
            toml::from_str(raw).map_err(|e| ExtensionError::config(e.to_string()))?;
        config.client_kind()?;
        Ok(config)
    }

    /// The configured client kind
    pub fn client_kind(&self) -> Result<ClientKind> {
        match self.client.as_str() {
            "desktop" => Ok(ClientKind::Desktop),
            "mobile" => Ok(ClientKind::Mobile),
            "web" => Ok(ClientKind::Web),
            "headless" => Ok(ClientKind::Headless),
            other => Err(ExtensionError::config(format!(
                "unknown client kind '{other}'"
            ))),
        }
    }

    /// The host scope compositions should be built against
    pub fn host_scope(&self) -> Result<HostScope> {
        let client = self.client_kind()?;
        Ok(match &self.editor {
            Some(editor) => HostScope::with_editor(client, editor.clone()),
            None => HostScope::new(client),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HostConfig::default();
        assert_eq!(config.client, "headless");
        assert_eq!(config.editor, None);
        assert_eq!(config.log_capacity, 256);
        assert_eq!(config.client_kind().unwrap(), ClientKind::Headless);
        assert_eq!(config.host_scope().unwrap(), HostScope::headless());
    }

    #[test]
    fn test_from_toml_with_partial_fields() {
        let config = HostConfig::from_toml(
            r#"
            editor = "canvas"
            log_capacity = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.client, "headless");
        assert_eq!(config.editor.as_deref(), Some("canvas"));
        assert_eq!(config.log_capacity, 8);
        assert_eq!(
            config.host_scope().unwrap(),
            HostScope::with_editor(ClientKind::Headless, "canvas")
        );
    }

    #[test]
    fn test_unknown_client_kind_is_rejected() {
        let err = HostConfig::from_toml(r#"client = "toaster""#).unwrap_err();
        assert!(matches!(err, ExtensionError::Config(_)));
    }

    #[test]
    fn test_malformed_toml_is_rejected() {
        assert!(HostConfig::from_toml("client = [not toml").is_err());
    }
}
