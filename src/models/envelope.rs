use serde::{Deserialize, Serialize};

/// Result wrapper every remote collaborator answers with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn ok_empty(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    /// Split into the payload on success or the remote message on failure.
    pub fn into_result(self) -> Result<Option<T>, String> {
        if self.success {
            Ok(self.data)
        } else {
            Err(self.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_result() {
        assert_eq!(Envelope::ok("done", 3).into_result(), Ok(Some(3)));
        assert_eq!(Envelope::<u8>::ok_empty("done").into_result(), Ok(None));
        assert_eq!(
            Envelope::<u8>::failure("disk full").into_result(),
            Err("disk full".to_string())
        );
    }

    #[test]
    fn test_missing_data_field() {
        let envelope: Envelope<Vec<u8>> =
            serde_json::from_str(r#"{"success":false,"message":"nope"}"#).unwrap();
        assert!(!envelope.success);
        assert!(envelope.data.is_none());
    }
}
