// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `errors.rs`

#[cfg(test)]
mod tests {
    use crate::errors::SweepError;
    use serde_json::json;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(
            serde_json::from_value(json!({
                "status": "Failure",
                "message": format!("{reason} from test"),
                "reason": reason,
                "code": code,
            }))
            .expect("status body should deserialize"),
        )
    }

    fn service_error() -> kube::Error {
        let io: Box<dyn std::error::Error + Send + Sync> = Box::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "Connection failed",
        ));
        kube::Error::Service(io)
    }

    #[test]
    fn test_not_found_classification() {
        let err = SweepError::Kube(api_error(404, "NotFound"));

        assert_eq!(err.status_code(), Some(404));
        assert!(err.is_not_found());
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_conflict_classification() {
        let err = SweepError::Kube(api_error(409, "Conflict"));

        assert!(err.is_conflict());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_instance_update_inherits_status_of_wrapped_error() {
        let err = SweepError::InstanceUpdate {
            resource: "oauth2clients.hydra.ory.sh/v1alpha1".to_string(),
            name: "my-client".to_string(),
            source: Box::new(SweepError::Kube(api_error(409, "Conflict"))),
        };

        assert!(err.is_conflict());
    }

    #[test]
    fn test_network_error_has_no_status_code() {
        let err = SweepError::Kube(service_error());

        assert_eq!(err.status_code(), None);
        assert!(!err.is_not_found());
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_no_served_version_message() {
        let err = SweepError::NoServedVersion("oauth2clients.hydra.ory.sh".to_string());

        assert_eq!(
            err.to_string(),
            "CustomResourceDefinition oauth2clients.hydra.ory.sh has no storage or served version"
        );
    }

    #[test]
    fn test_instance_update_message_names_resource_and_instance() {
        let err = SweepError::InstanceUpdate {
            resource: "oauth2clients.hydra.ory.sh/v1alpha1".to_string(),
            name: "my-client".to_string(),
            source: Box::new(SweepError::NoServedVersion("x".to_string())),
        };

        let message = err.to_string();
        assert!(
            message.starts_with(
                "removing finalizers from oauth2clients.hydra.ory.sh/v1alpha1 \"my-client\" failed"
            ),
            "unexpected message: {message}"
        );
    }

    #[test]
    fn test_instance_update_exposes_source_chain() {
        use std::error::Error as _;

        let err = SweepError::InstanceUpdate {
            resource: "oauth2clients.hydra.ory.sh/v1alpha1".to_string(),
            name: "my-client".to_string(),
            source: Box::new(SweepError::Kube(service_error())),
        };

        assert!(err.source().is_some(), "wrapped error should be the source");
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn test_retries_exhausted_message() {
        let err = SweepError::RetriesExhausted {
            operation: "list oauth2clients".to_string(),
            attempts: 7,
            source: service_error(),
        };

        assert!(err
            .to_string()
            .starts_with("list oauth2clients gave up after 7 attempts"));
        assert!(!err.is_conflict());
    }
}
