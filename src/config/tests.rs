use super::*;
use std::fs;
use tempfile::TempDir;

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn config_file_persistence() {
        let temp_dir = TempDir::new().expect("should create TempDir successfully");
        let config_path = temp_dir.path().join("config.toml");

        let original_config = Config {
            ollama: OllamaConfig {
                protocol: "https".to_string(),
                host: "test-host".to_string(),
                port: 8080,
                embedding_model: "test-embed".to_string(),
                generation_model: "test-gen".to_string(),
                embedding_dimension: 384,
                timeout_seconds: 120,
            },
            base_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        };

        let toml_content = toml::to_string_pretty(&original_config)
            .expect("config should convert to toml string successfully");
        fs::write(&config_path, toml_content).expect("should write to config_path successfully");

        let loaded_config =
            Config::load_from(temp_dir.path()).expect("should load config successfully");

        assert_eq!(original_config, loaded_config);
    }

    #[test]
    fn invalid_toml_handling() {
        let invalid_toml = r#"
            [ollama
            host = "localhost"
            port = "invalid_port"
        "#;

        let result: Result<Config, toml::de::Error> = toml::from_str(invalid_toml);
        assert!(result.is_err());
    }

    #[test]
    fn partial_config_with_defaults() {
        let partial_toml = r#"
            [ollama]
            host = "custom-host"

            [retrieval]
            top_k = 6
        "#;

        let config: Config = toml::from_str(partial_toml).expect("should parse partial toml");
        assert_eq!(config.ollama.host, "custom-host");
        assert_eq!(config.ollama.port, 11434);
        assert_eq!(config.retrieval.top_k, 6);
        assert_eq!(config.retrieval.max_context_chars, 1000);
        assert_eq!(config.generation.stop, vec!["\n\n", "Question:", "---"]);
        assert!(config.assets.template_path.is_none());
    }

    #[test]
    fn missing_ollama_section_is_rejected() {
        let result: Result<Config, toml::de::Error> = toml::from_str("[retrieval]\ntop_k = 2\n");
        assert!(result.is_err());
    }

    #[test]
    fn empty_host_is_invalid() {
        let config = Config {
            ollama: OllamaConfig {
                host: String::new(),
                ..OllamaConfig::default()
            },
            ..Config::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn ollama_url_generation_with_different_hosts() {
        let configs = vec![
            ("http", "localhost", 11434, "http://localhost:11434/"),
            ("http", "127.0.0.1", 8080, "http://127.0.0.1:8080/"),
            (
                "https",
                "secure.example.com",
                443,
                "https://secure.example.com/",
            ),
        ];

        for (protocol, host, port, expected_url) in configs {
            let config = Config {
                ollama: OllamaConfig {
                    protocol: protocol.to_string(),
                    host: host.to_string(),
                    port,
                    ..OllamaConfig::default()
                },
                ..Config::default()
            };

            let url = config.ollama_url().expect("ollama_url is ok");
            assert_eq!(url.as_str(), expected_url);
        }
    }

    #[test]
    fn error_display_messages() {
        let errors = vec![
            ConfigError::InvalidProtocol("ftp".to_string()),
            ConfigError::InvalidPort(0),
            ConfigError::InvalidTopK(0),
            ConfigError::InvalidModel(String::new()),
            ConfigError::InvalidUrl("invalid-url".to_string()),
            ConfigError::InvalidAssetPath("embeddings_path"),
        ];

        for error in errors {
            let message = format!("{error}");
            assert!(message.len() > 10);
        }
    }
}
