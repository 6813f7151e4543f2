// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `pagination.rs`

#[cfg(test)]
mod tests {
    use crate::constants::KUBE_LIST_PAGE_SIZE;
    use kube::api::ListParams;

    #[test]
    fn test_pagination_constant() {
        #[allow(clippy::assertions_on_constants)]
        {
            assert!(
                KUBE_LIST_PAGE_SIZE >= 50,
                "Page size should be at least 50 to avoid excessive API calls"
            );
            assert!(
                KUBE_LIST_PAGE_SIZE <= 500,
                "Page size should not exceed 500 to avoid memory pressure"
            );
        }
    }

    /// Label selectors survive the page size override
    #[test]
    fn test_page_limit_keeps_label_selector() {
        let mut params = ListParams::default().labels("app=web,tier=frontend");
        params.limit = Some(KUBE_LIST_PAGE_SIZE);

        assert_eq!(
            params.label_selector.as_deref(),
            Some("app=web,tier=frontend")
        );
        assert_eq!(params.limit, Some(KUBE_LIST_PAGE_SIZE));
    }
}
