use std::path::Path;

use config::{Config, File, FileFormat};
use eyre::{Context, Result};

use crate::config::models::GatewayConfig;

/// Load configuration from a file using the config crate
/// Supports multiple formats: YAML, JSON, TOML, etc.
pub fn load_config(config_path: &str) -> Result<GatewayConfig> {
    let config_path = Path::new(config_path);

    // Determine file format based on extension
    let format = match config_path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        Some("toml") => FileFormat::Toml,
        Some("ini") => FileFormat::Ini,
        _ => FileFormat::Yaml, // Default to YAML
    };

    let settings = Config::builder()
        .add_source(File::new(
            config_path
                .to_str()
                .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", config_path.display()))?,
            format,
        ))
        .build()
        .with_context(|| format!("Failed to build config from {}", config_path.display()))?;

    let gateway_config: GatewayConfig = settings.try_deserialize().with_context(|| {
        format!(
            "Failed to deserialize config from {}",
            config_path.display()
        )
    })?;

    Ok(gateway_config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::core::auth::AuthRequirement;

    #[test]
    fn test_load_yaml_config() {
        let yaml_content = r#"
listen_addr: "0.0.0.0:8000"
identity:
  base_url: "http://userservice-app:8080/user"
routes:
  - prefix: "/loan/borrow"
    target: "http://loanservice-app:8082"
    auth: valid
  - prefix: "/admin/*"
    target: "http://bookservice-app:8081"
    auth: admin
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml_content).unwrap();

        let config = load_config(temp_file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8000");
        assert_eq!(config.routes.len(), 2);
        // Declaration order is registration order
        assert_eq!(config.routes[0].prefix, "/loan/borrow");
        assert_eq!(config.routes[0].auth, AuthRequirement::Valid);
        assert_eq!(config.routes[1].prefix, "/admin/*");
        assert_eq!(config.routes[1].auth, AuthRequirement::Admin);
    }

    #[test]
    fn test_load_json_config() {
        let json_content = r#"
{
  "listen_addr": "0.0.0.0:8000",
  "identity": {
    "base_url": "http://userservice-app:8080/user",
    "timeout_secs": 3
  },
  "routes": [
    {
      "prefix": "/auth/*",
      "target": "http://userservice-app:8080"
    }
  ]
}
"#;

        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        write!(temp_file, "{}", json_content).unwrap();

        let config = load_config(temp_file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.identity.timeout_secs, 3);
        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.routes[0].auth, AuthRequirement::None);
    }

    #[test]
    fn test_missing_required_field_fails() {
        let yaml_content = r#"
listen_addr: "0.0.0.0:8000"
routes: []
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml_content).unwrap();

        // identity is required
        assert!(load_config(temp_file.path().to_str().unwrap()).is_err());
    }
}
