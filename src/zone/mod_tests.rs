// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the zone client contract, exercised through `InMemoryZone`.

#[cfg(test)]
mod tests {
    use crate::dns_errors::ZoneError;
    use crate::record_codec::{build_record_set, RecordData, RecordKind};
    use crate::zone::credentials::{StaticToken, TokenFile, TokenSource};
    use crate::zone::memory::{InMemoryZone, ZoneCall};
    use crate::zone::ZoneClient;
    use std::io::Write;

    #[tokio::test]
    async fn test_upsert_replaces_instead_of_appending() {
        let zone = InMemoryZone::new();

        let first = build_record_set("web.default.svc", RecordKind::A, &["10.0.0.5"], 300);
        let second = build_record_set("web.default.svc", RecordKind::A, &["10.0.0.9"], 300);
        zone.upsert(&first).await.unwrap();
        zone.upsert(&second).await.unwrap();

        assert_eq!(zone.records(), vec![second]);
    }

    #[tokio::test]
    async fn test_upsert_twice_is_idempotent() {
        let zone = InMemoryZone::new();
        let record_set = build_record_set("web.default.svc", RecordKind::A, &["10.0.0.5"], 300);

        zone.upsert(&record_set).await.unwrap();
        let once = zone.records();
        zone.upsert(&record_set).await.unwrap();

        assert_eq!(zone.records(), once);
    }

    #[tokio::test]
    async fn test_delete_missing_name_is_ok() {
        let zone = InMemoryZone::new();
        assert!(zone.delete("never.default.svc").await.is_ok());
        assert_eq!(
            zone.calls(),
            vec![
                ZoneCall::DeleteRecordSet {
                    name: "never.default.svc".to_string(),
                    kind: RecordKind::A,
                },
                ZoneCall::DeleteRecordSet {
                    name: "never.default.svc".to_string(),
                    kind: RecordKind::Aaaa,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_leaves_other_names_alone() {
        let zone = InMemoryZone::new();
        let web = build_record_set("web.default.svc", RecordKind::A, &["10.0.0.5"], 300);
        let api = build_record_set("api.default.svc", RecordKind::A, &["10.0.0.6"], 300);
        zone.upsert(&web).await.unwrap();
        zone.upsert(&api).await.unwrap();

        zone.delete("web.default.svc").await.unwrap();

        assert_eq!(zone.records(), vec![api]);
    }

    #[tokio::test]
    async fn test_delete_stops_at_first_failure() {
        let zone = InMemoryZone::new();
        zone.fail_next_delete(ZoneError::Timeout {
            record: "A web.default.svc".to_string(),
        });

        assert!(zone.delete("web.default.svc").await.is_err());
        assert_eq!(zone.calls().len(), 1, "AAAA delete must not be attempted");
    }

    #[tokio::test]
    async fn test_version_marker_is_a_txt_record() {
        let zone = InMemoryZone::new();
        zone.set_version_marker("1.1.0", 300).await.unwrap();
        zone.set_version_marker("1.1.0", 300).await.unwrap();

        let records = zone.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "dns-version");
        assert_eq!(records[0].data, RecordData::Txt(vec!["1.1.0".to_string()]));
    }

    #[tokio::test]
    async fn test_static_token() {
        assert_eq!(
            StaticToken::new(" abc \n").bearer_token().await.unwrap(),
            "abc"
        );
        assert!(StaticToken::new("").bearer_token().await.is_err());
    }

    #[tokio::test]
    async fn test_token_file_is_reread() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "first-token").unwrap();
        let source = TokenFile::new(file.path());

        assert_eq!(source.bearer_token().await.unwrap(), "first-token");

        std::fs::write(file.path(), "second-token\n").unwrap();
        assert_eq!(source.bearer_token().await.unwrap(), "second-token");
    }

    #[tokio::test]
    async fn test_token_file_missing_or_empty() {
        let missing = TokenFile::new("/nonexistent/svcdns/token");
        assert!(matches!(
            missing.bearer_token().await,
            Err(ZoneError::Credentials { .. })
        ));

        let empty = tempfile::NamedTempFile::new().unwrap();
        let source = TokenFile::new(empty.path());
        assert!(matches!(
            source.bearer_token().await,
            Err(ZoneError::Credentials { .. })
        ));
    }
}
