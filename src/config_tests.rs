// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config.rs`

#[cfg(test)]
mod tests {
    use crate::config::{Config, ConfigError};
    use clap::Parser;
    use std::time::Duration;

    const REQUIRED: [&str; 7] = [
        "svcdns",
        "--subscription",
        "sub-1",
        "--resource-group",
        "rg-1",
        "--zone-name",
        "cluster.example",
    ];

    fn parse(extra: &[&str]) -> Config {
        let args: Vec<&str> = REQUIRED.iter().chain(extra.iter()).copied().collect();
        Config::try_parse_from(args).expect("arguments should parse")
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--access-token", "t0ken"]);

        assert_eq!(config.arm_endpoint, "https://management.azure.com");
        assert_eq!(config.record_ttl, 300);
        assert!(!config.publish_headless);
        assert!(!config.dry_run);
        assert_eq!(config.namespace, None);
        assert_eq!(config.metrics_port, 8080);
        assert_eq!(config.validate(), Ok(()));

        let settings = config.reconcile_settings();
        assert_eq!(settings.record_ttl, 300);
        assert_eq!(settings.reconcile_timeout, Duration::from_secs(60));
        assert_eq!(settings.resync_interval, None);
    }

    #[test]
    fn test_legacy_flag_spellings() {
        let config = Config::try_parse_from([
            "svcdns",
            "--subscription",
            "sub-1",
            "--resourcegroup",
            "rg-legacy",
            "--zoneName",
            "legacy.example",
            "--dry-run",
        ])
        .expect("legacy spellings should parse");

        assert_eq!(config.resource_group, "rg-legacy");
        assert_eq!(config.zone_name, "legacy.example");
    }

    #[test]
    fn test_missing_required_flag_is_rejected() {
        let result = Config::try_parse_from(["svcdns", "--subscription", "sub-1"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_identifier_is_rejected() {
        let config = Config::try_parse_from([
            "svcdns",
            "--subscription",
            " ",
            "--resource-group",
            "rg-1",
            "--zone-name",
            "cluster.example",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(
            config.validate(),
            Err(ConfigError::Empty {
                flag: "--subscription"
            })
        );
    }

    #[test]
    fn test_zero_values_are_rejected() {
        let config = parse(&["--dry-run", "--record-ttl", "0"]);
        assert_eq!(
            config.validate(),
            Err(ConfigError::Zero {
                flag: "--record-ttl"
            })
        );

        let config = parse(&["--dry-run", "--reconcile-timeout-secs", "0"]);
        assert!(matches!(config.validate(), Err(ConfigError::Zero { .. })));

        let config = parse(&["--dry-run", "--resync-interval-secs", "0"]);
        assert!(matches!(config.validate(), Err(ConfigError::Zero { .. })));
    }

    #[test]
    fn test_credentials_are_required_unless_dry_run() {
        assert_eq!(parse(&[]).validate(), Err(ConfigError::MissingCredentials));
        assert_eq!(parse(&["--dry-run"]).validate(), Ok(()));
    }

    #[test]
    fn test_conflicting_credentials_are_rejected() {
        let config = parse(&["--access-token", "abc", "--access-token-file", "/var/run/token"]);

        assert_eq!(config.validate(), Err(ConfigError::ConflictingCredentials));
        assert!(config.token_source().is_err());
    }

    #[test]
    fn test_token_source_selection() {
        assert!(parse(&["--access-token", "abc"]).token_source().is_ok());
        assert!(parse(&["--access-token-file", "/var/run/token"])
            .token_source()
            .is_ok());
        assert_eq!(
            parse(&["--dry-run"]).token_source().err(),
            Some(ConfigError::MissingCredentials)
        );
    }

    #[test]
    fn test_invalid_endpoint_and_bind_address() {
        let config = parse(&["--dry-run", "--arm-endpoint", "not a url"]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                flag: "--arm-endpoint",
                ..
            })
        ));

        let config = parse(&["--dry-run", "--metrics-bind-address", "localhost"]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                flag: "--metrics-bind-address",
                ..
            })
        ));
    }

    #[test]
    fn test_derived_settings() {
        let config = parse(&[
            "--dry-run",
            "--publish-headless",
            "--namespace",
            "prod",
            "--record-ttl",
            "60",
            "--http-timeout-secs",
            "5",
            "--resync-interval-secs",
            "600",
            "--metrics-port",
            "9090",
            "--metrics-bind-address",
            "127.0.0.1",
        ]);
        assert_eq!(config.validate(), Ok(()));

        let zone = config.zone_config();
        assert_eq!(zone.subscription_id, "sub-1");
        assert_eq!(zone.resource_group, "rg-1");
        assert_eq!(zone.zone_name, "cluster.example");
        assert_eq!(zone.http_timeout, Duration::from_secs(5));

        let settings = config.reconcile_settings();
        assert!(settings.publish_headless);
        assert_eq!(settings.record_ttl, 60);
        assert_eq!(settings.resync_interval, Some(Duration::from_secs(600)));

        assert_eq!(
            config.metrics_addr().unwrap().to_string(),
            "127.0.0.1:9090"
        );
        assert_eq!(config.namespace.as_deref(), Some("prod"));
    }
}
