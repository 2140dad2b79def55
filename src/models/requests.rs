use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to toggle a favorite, block a user, or anything else aimed at one target
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TargetRequest {
    #[validate(length(min = 1, max = 64))]
    #[serde(alias = "target_user_id", rename = "targetUserId")]
    pub target_user_id: String,
}

/// Request to record a profile visit
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecordVisitRequest {
    #[validate(length(min = 1, max = 64))]
    #[serde(alias = "profile_user_id", rename = "profileUserId")]
    pub profile_user_id: String,
}

/// Query parameters for list endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: u16,
}

fn default_limit() -> u16 {
    25
}

impl ListQuery {
    /// Cap limit at 100 to prevent excessive queries
    pub fn capped(&self) -> usize {
        self.limit.clamp(1, 100) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_request_accepts_snake_case_alias() {
        let req: TargetRequest = serde_json::from_str(r#"{"target_user_id":"u2"}"#).unwrap();
        assert_eq!(req.target_user_id, "u2");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_empty_target_fails_validation() {
        let req = TargetRequest {
            target_user_id: String::new(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_list_query_capped() {
        assert_eq!(ListQuery { limit: 500 }.capped(), 100);
        assert_eq!(ListQuery { limit: 0 }.capped(), 1);
        assert_eq!(ListQuery { limit: 10 }.capped(), 10);
    }
}
