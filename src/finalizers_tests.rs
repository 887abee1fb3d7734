// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `finalizers.rs`
//!
//! API interaction is covered in `tests/sweep_mock_api.rs`.

#[cfg(test)]
mod tests {
    use crate::finalizers::{DefaultFinalizersHandler, FinalizersHandler, InstanceRef, SweepReport};
    use serde_json::json;

    #[test]
    fn test_instance_ref_display() {
        let namespaced = InstanceRef {
            namespace: Some("kyma-system".to_string()),
            name: "console".to_string(),
        };
        let cluster_scoped = InstanceRef {
            namespace: None,
            name: "console".to_string(),
        };

        assert_eq!(namespaced.to_string(), "kyma-system/console");
        assert_eq!(cluster_scoped.to_string(), "console");
    }

    #[test]
    fn test_missing_crd_report() {
        let report = SweepReport::crd_missing("oauth2clients.hydra.ory.sh", false);

        assert!(!report.crd_found);
        assert_eq!(report.instances, 0);
        assert!(report.cleared.is_empty());
        assert!(report.resource.is_none());
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = SweepReport {
            crd_name: "oauth2clients.hydra.ory.sh".to_string(),
            resource: Some("oauth2clients.hydra.ory.sh/v1alpha1".to_string()),
            crd_found: true,
            instances: 2,
            cleared: vec![InstanceRef {
                namespace: Some("default".to_string()),
                name: "client-a".to_string(),
            }],
            dry_run: true,
        };

        let value = serde_json::to_value(&report).expect("report should serialize");

        assert_eq!(
            value,
            json!({
                "crdName": "oauth2clients.hydra.ory.sh",
                "resource": "oauth2clients.hydra.ory.sh/v1alpha1",
                "crdFound": true,
                "instances": 2,
                "cleared": [{ "namespace": "default", "name": "client-a" }],
                "dryRun": true
            })
        );
    }

    #[test]
    fn test_default_handler_is_object_safe() {
        let handler: Box<dyn FinalizersHandler> = Box::new(DefaultFinalizersHandler::new());
        drop(handler);
    }
}
