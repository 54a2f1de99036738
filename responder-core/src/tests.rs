use crate::{AppConfig, ConfigError, ConfigFormat, Credentials, MediaItem, Post, PostId};
use std::path::Path;

#[test]
fn test_post_id_canonical_form() {
    assert_eq!(PostId::parse("00123").unwrap().as_str(), "123");
    assert_eq!(PostId::parse("0").unwrap().as_str(), "0");
    assert_eq!(PostId::parse("000").unwrap().as_str(), "0");
    assert!(PostId::parse("000").unwrap().is_zero());
}

#[test]
fn test_post_id_rejects_non_digits() {
    assert!(PostId::parse("").is_err());
    assert!(PostId::parse("12a").is_err());
    assert!(PostId::parse("-5").is_err());
    assert!(PostId::parse("1.5e3").is_err());
    assert!(PostId::parse(" 42\n").is_err());
    assert!(PostId::parse("42 ").is_err());
}

#[test]
fn test_post_id_orders_numerically() {
    let small = PostId::parse("99").unwrap();
    let large = PostId::parse("100").unwrap();
    assert!(small < large);

    // Adjacent ids above 2^53 collapse when routed through f64
    let a = PostId::parse("1234567890123456789").unwrap();
    let b = PostId::parse("1234567890123456790").unwrap();
    assert!(a < b);
    assert_eq!(a.clone().max(b.clone()), b);

    let padded = PostId::parse("0100").unwrap();
    assert_eq!(padded, large);
}

#[test]
fn test_post_id_serde_validates() {
    let id: PostId = serde_json::from_str("\"0077\"").unwrap();
    assert_eq!(id.as_str(), "77");
    assert!(serde_json::from_str::<PostId>("\"abc\"").is_err());
}

#[test]
fn test_post_has_photo() {
    let mut post = Post {
        id: PostId::parse("1").unwrap(),
        author_handle: "alice".to_string(),
        text: "hi".to_string(),
        is_retweet: false,
        media: vec![MediaItem {
            kind: "video".to_string(),
        }],
    };
    assert!(!post.has_photo());

    post.media.push(MediaItem {
        kind: "photo".to_string(),
    });
    assert!(post.has_photo());
}

const SAMPLE_JSON: &str = r##"{
    "searchQuery": "#rustlang",
    "excludeScreenNames": ["bot1", "@bot2"],
    "photoTweetsOnly": true,
    "replyWith": ["Nice one $SCREEN_NAME$!"],
    "redisPrefix": "custom:",
    "credentials": { "accessToken": "token" }
}"##;

#[test]
fn test_json_config_parsing() {
    let config = AppConfig::parse(SAMPLE_JSON, ConfigFormat::Json).unwrap();
    assert_eq!(config.search_query, "#rustlang");
    assert_eq!(config.key_prefix, "custom:");
    assert_eq!(config.max_fetch_count, 15);
    assert_eq!(config.poll_interval_seconds, 60);
    assert_eq!(config.database_url, "sqlite://hashtag-responder.db");
    assert!(config.validate().is_ok());

    let run = config.run_config(false);
    assert!(run.photos_only);
    assert!(!run.dry_run);
    assert!(run.exclude_handles.contains("bot1"));
    assert!(run.exclude_handles.contains("bot2"));
    assert_eq!(run.reply_templates.len(), 1);
}

#[test]
fn test_dry_run_flag_overrides_config() {
    let config = AppConfig::parse(SAMPLE_JSON, ConfigFormat::Json).unwrap();
    assert!(config.run_config(true).dry_run);
}

#[test]
fn test_default_key_prefix_and_alias() {
    let config = AppConfig::parse(r#"{"searchQuery": "q"}"#, ConfigFormat::Json).unwrap();
    assert_eq!(config.key_prefix, "hashtag-responder:");

    let config = AppConfig::parse(
        r#"{"searchQuery": "q", "keyPrefix": "alias:"}"#,
        ConfigFormat::Json,
    )
    .unwrap();
    assert_eq!(config.key_prefix, "alias:");
}

#[test]
fn test_toml_config_parsing() {
    let contents = r##"
searchQuery = "#rustlang"
replyWith = ["hello $SCREEN_NAME$"]
maxFetchCount = 10

[credentials]
clientId = "id"
refreshToken = "refresh"
"##;
    let config = AppConfig::parse(contents, ConfigFormat::Toml).unwrap();
    assert_eq!(config.max_fetch_count, 10);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_format_detection() {
    assert_eq!(
        ConfigFormat::from_path(Path::new("config.toml")),
        ConfigFormat::Toml
    );
    assert_eq!(
        ConfigFormat::from_path(Path::new("config.json")),
        ConfigFormat::Json
    );
    assert_eq!(ConfigFormat::from_path(Path::new("config")), ConfigFormat::Json);
}

#[test]
fn test_validation_errors() {
    let config = AppConfig::parse(r#"{"replyWith": ["x"]}"#, ConfigFormat::Json).unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::MissingField { field }) if field == "searchQuery"
    ));

    let config = AppConfig::parse(r#"{"searchQuery": "q"}"#, ConfigFormat::Json).unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::MissingField { field }) if field == "replyWith"
    ));

    let config = AppConfig::parse(
        r#"{"searchQuery": "q", "replyWith": ["x"], "maxFetchCount": 0}"#,
        ConfigFormat::Json,
    )
    .unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidValue { .. })
    ));

    let config = AppConfig::parse(
        r#"{"searchQuery": "q", "replyWith": ["x"], "pollIntervalSeconds": 1}"#,
        ConfigFormat::Json,
    )
    .unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ValidationFailed { .. })
    ));

    let config = AppConfig::parse(
        r#"{"searchQuery": "q", "replyWith": ["x"]}"#,
        ConfigFormat::Json,
    )
    .unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::MissingField { field }) if field == "credentials.accessToken"
    ));
}

#[test]
fn test_invalid_json_is_reported() {
    let result = AppConfig::parse("{ not json", ConfigFormat::Json);
    assert!(matches!(result, Err(ConfigError::InvalidFormat { .. })));
}

#[test]
fn test_credential_overrides() {
    let mut credentials = Credentials {
        access_token: Some("from-file".to_string()),
        ..Default::default()
    };

    credentials.apply_overrides(|name| match name {
        "TWITTER_ACCESS_TOKEN" => Some("from-env".to_string()),
        "TWITTER_CLIENT_ID" => Some("   ".to_string()),
        _ => None,
    });

    assert_eq!(credentials.access_token.as_deref(), Some("from-env"));
    assert!(credentials.client_id.is_none());
}

#[test]
fn test_credentials_debug_is_redacted() {
    let credentials = Credentials {
        client_id: Some("app".to_string()),
        access_token: Some("super-secret".to_string()),
        ..Default::default()
    };

    let rendered = format!("{:?}", credentials);
    assert!(!rendered.contains("super-secret"));
    assert!(rendered.contains("<redacted>"));
}

#[tokio::test]
async fn test_load_missing_file() {
    let result = AppConfig::load(Path::new("/nonexistent/hashtag-responder.json")).await;
    assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
}
