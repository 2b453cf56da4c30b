/*!
 * Tests for application configuration functionality
 */

use std::time::Duration;

use bookwash::app_config::{Config, LogLevel, ProviderConfig, ProviderKind};
use bookwash::bookwash::{Axis, Level, Targets};

use crate::common;

/// Test default configuration values
#[test]
fn test_defaultConfig_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.ai.provider, ProviderKind::Ollama);
    assert_eq!(config.ai.available_providers.len(), 4);
    assert_eq!(config.ai.get_model(), "llama3");
    assert_eq!(config.ai.get_fallback_model(), None);

    assert_eq!(config.cleaning.targets(), Targets::new(Level::PG, Level::PG, Level::PG13));
    assert_eq!(config.cleaning.max_iterations, 3);
    assert!(config.cleaning.verify);
    assert_eq!(config.cleaning.strict_axes, vec![Axis::Language, Axis::Sexual]);
    assert_eq!(config.log_level, LogLevel::Info);
}

/// Test configuration validation
#[test]
fn test_configValidation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    // Hosted provider without a key
    config.ai.provider = ProviderKind::OpenAI;
    assert!(config.validate().is_err());

    config.ai.active_provider_config_mut().api_key = "sk-test".to_string();
    assert!(config.validate().is_ok());

    config.cleaning.max_iterations = 0;
    assert!(config.validate().is_err());
    config.cleaning.max_iterations = 2;

    config.cleaning.similarity_threshold = 1.5;
    assert!(config.validate().is_err());
    config.cleaning.similarity_threshold = 0.3;

    config.cleaning.classify_char_budget = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_providerConfig_new_shouldUseProviderDefaults() {
    let openai = ProviderConfig::new(ProviderKind::OpenAI);
    assert_eq!(openai.provider_type, "openai");
    assert_eq!(openai.fallback_model, "gpt-3.5-turbo");
    assert_eq!(openai.rate_limit, Some(60));

    let lmstudio = ProviderConfig::new(ProviderKind::LMStudio);
    assert_eq!(lmstudio.endpoint, "http://localhost:1234/v1");
    assert!(!ProviderKind::LMStudio.requires_api_key());
}

#[test]
fn test_resolvedProviderConfig_withEmptyFields_shouldFillFromDefaults() {
    let mut config = Config::default();
    config.ai.provider = ProviderKind::Anthropic;
    config.ai.available_providers = vec![ProviderConfig {
        provider_type: "anthropic".to_string(),
        model: String::new(),
        fallback_model: String::new(),
        api_key: "key".to_string(),
        endpoint: String::new(),
        timeout_secs: 10,
        rate_limit: None,
    }];

    let resolved = config.ai.resolved_provider_config();

    assert_eq!(resolved.model, "claude-3-5-haiku-latest");
    assert!(!resolved.endpoint.is_empty());
    assert_eq!(resolved.timeout_secs, 10);
    // An explicitly empty fallback disables the switch
    assert_eq!(config.ai.get_fallback_model(), None);
}

#[test]
fn test_minInterval_shouldTakeLargerOfCommonAndRateLimit() {
    let mut config = Config::default();
    config.ai.provider = ProviderKind::Anthropic;
    // 45 requests per minute
    assert_eq!(config.ai.min_interval(), Duration::from_millis(60_000 / 45));

    config.ai.common.min_interval_ms = 5_000;
    assert_eq!(config.ai.min_interval(), Duration::from_millis(5_000));

    config.ai.provider = ProviderKind::Ollama;
    config.ai.common.min_interval_ms = 0;
    assert_eq!(config.ai.min_interval(), Duration::ZERO);
}

#[test]
fn test_pipelineConfig_shouldCarryCleaningSettings() {
    let mut config = Config::default();
    config.cleaning.target_violence = Level::R;
    config.cleaning.max_iterations = 5;
    config.cleaning.verify = false;
    config.cleaning.strict_threshold = Level::G;
    config.cleaning.similarity_threshold = 0.5;

    let pipeline = config.cleaning.pipeline_config();

    assert_eq!(pipeline.targets.violence, Level::R);
    assert_eq!(pipeline.max_iterations, 5);
    assert!(!pipeline.verify);
    assert!(!pipeline.rerate);
    assert_eq!(pipeline.escalation.strict_threshold, Level::G);
    assert_eq!(pipeline.alignment.similarity_threshold, 0.5);
}

#[test]
fn test_deserialize_withPartialJson_shouldApplyDefaults() {
    let json = r#"{
        "ai": {
            "provider": "openai",
            "available_providers": [
                { "type": "openai", "model": "gpt-4o", "api_key": "sk-test" }
            ]
        },
        "cleaning": { "target_language": "G", "target_violence": "PG-13", "strict_axes": ["language"] },
        "log_level": "debug"
    }"#;

    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.ai.provider, ProviderKind::OpenAI);
    assert_eq!(config.ai.get_model(), "gpt-4o");
    assert_eq!(config.ai.get_api_key(), "sk-test");
    assert_eq!(config.ai.common.retry_count, 3);
    assert_eq!(config.cleaning.target_language, Level::G);
    assert_eq!(config.cleaning.target_sexual, Level::PG);
    assert_eq!(config.cleaning.target_violence, Level::PG13);
    assert_eq!(config.cleaning.strict_axes, vec![Axis::Language]);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert!(config.validate().is_ok());
}

#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefault() {
    let temp_dir = common::create_temp_dir().unwrap();
    let path = temp_dir.path().join("conf.json");

    let config = Config::load_or_create(&path).unwrap();

    assert!(path.exists());
    assert_eq!(config.cleaning.max_iterations, 3);

    // Reload what was written
    let reloaded = Config::load(&path).unwrap();
    assert_eq!(reloaded.ai.get_model(), config.ai.get_model());
}

#[test]
fn test_load_withInvalidJson_shouldFail() {
    let temp_dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{ not json").unwrap();

    assert!(Config::load(&path).is_err());
}

#[test]
fn test_providerKind_fromStr_shouldParseCaseInsensitively() {
    assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAI);
    assert_eq!("lmstudio".parse::<ProviderKind>().unwrap(), ProviderKind::LMStudio);
    assert!("gemini".parse::<ProviderKind>().is_err());
    assert_eq!(ProviderKind::Anthropic.to_string(), "anthropic");
}
