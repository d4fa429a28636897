//! Unit tests for the wire format of domain models.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

mod issue_tests {
    use super::*;
    use issue_tracker::models::{AdminStats, Issue, IssueStatus, StatusCount};
    use std::str::FromStr;

    fn sample_issue(status: IssueStatus) -> Issue {
        let now = Utc::now();
        Issue {
            id: 7,
            user_id: Uuid::new_v4(),
            user_name: "Ada".to_string(),
            title: "Crash on save".to_string(),
            description: "Saving an empty file crashes".to_string(),
            status,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_status_wire_spelling() {
        assert_eq!(
            serde_json::to_value(IssueStatus::Incomplete).unwrap(),
            json!("Incomplete")
        );
        assert_eq!(
            serde_json::to_value(IssueStatus::InProgress).unwrap(),
            json!("In-Progress")
        );
        assert_eq!(
            serde_json::to_value(IssueStatus::Complete).unwrap(),
            json!("Complete")
        );
    }

    #[test]
    fn test_status_parse_is_exact() {
        assert_eq!(IssueStatus::from_str("In-Progress"), Ok(IssueStatus::InProgress));
        assert!(IssueStatus::from_str("in-progress").is_err());
        assert!(IssueStatus::from_str("InProgress").is_err());
        assert!(IssueStatus::from_str("").is_err());
    }

    #[test]
    fn test_status_display_matches_wire() {
        for status in IssueStatus::ALL {
            let wire = serde_json::to_value(status).unwrap();
            assert_eq!(wire, json!(status.to_string()));
        }
    }

    #[test]
    fn test_issue_serialization() {
        let issue = sample_issue(IssueStatus::InProgress);
        let value = serde_json::to_value(&issue).unwrap();

        assert_eq!(value["id"], 7);
        assert_eq!(value["user_name"], "Ada");
        assert_eq!(value["status"], "In-Progress");
        assert!(value["created_at"].is_string());
        assert_eq!(value["user_id"], json!(issue.user_id.to_string()));
    }

    #[test]
    fn test_admin_stats_shape() {
        let stats = AdminStats {
            total_users: 2,
            total_issues: 3,
            issues_by_status: vec![StatusCount {
                status: IssueStatus::Complete,
                count: 3,
            }],
        };

        assert_eq!(
            serde_json::to_value(&stats).unwrap(),
            json!({
                "total_users": 2,
                "total_issues": 3,
                "issues_by_status": [{ "status": "Complete", "count": 3 }]
            })
        );
    }
}

mod user_tests {
    use super::*;
    use issue_tracker::auth::Permissions;
    use issue_tracker::models::User;

    #[test]
    fn test_password_hash_is_never_serialized() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            name: "Ada".to_string(),
            permissions: Permissions::DEFAULT,
            created_at: now,
            updated_at: now,
        };

        let text = serde_json::to_string(&user).unwrap();
        assert!(!text.contains("password_hash"));
        assert!(!text.contains("argon2"));

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["permissions"], 3);
    }

    #[test]
    fn test_user_roundtrip_without_hash() {
        let body = json!({
            "id": Uuid::new_v4(),
            "email": "ada@example.com",
            "name": "Ada",
            "permissions": 7,
            "created_at": Utc::now(),
            "updated_at": Utc::now(),
        });

        let user: User = serde_json::from_value(body).unwrap();
        assert!(user.password_hash.is_empty());
        assert!(user.permissions.has(Permissions::ADMIN));
    }
}

mod request_tests {
    use issue_tracker::models::{
        CreateIssueRequest, LoginRequest, RegisterRequest, UpdateStatusRequest,
    };

    #[test]
    fn test_missing_fields_default_to_empty() {
        let req: RegisterRequest = serde_json::from_str(r#"{"email": "a@b.co"}"#).unwrap();
        assert_eq!(req.email, "a@b.co");
        assert!(req.name.is_empty());
        assert!(req.password.is_empty());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<LoginRequest>(r#"{"email": "", "admin": true}"#).is_err());
        assert!(
            serde_json::from_str::<CreateIssueRequest>(r#"{"title": "t", "status": "Complete"}"#)
                .is_err()
        );
    }

    #[test]
    fn test_status_request_accepts_any_string() {
        // Unknown values are a validation concern, not a decode error
        let req: UpdateStatusRequest = serde_json::from_str(r#"{"status": "Done"}"#).unwrap();
        assert_eq!(req.status, "Done");
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        assert!(serde_json::from_str::<CreateIssueRequest>(r#"{"title": 42}"#).is_err());
    }
}
