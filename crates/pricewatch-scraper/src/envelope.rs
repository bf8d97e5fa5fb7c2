//! Wire shape of a discovery outcome: exactly one of `{"response": …}` or
//! `{"error": "…"}`.

use serde::{Deserialize, Serialize};

use crate::error::DiscoveryResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Envelope<T> {
    Response(T),
    Error(String),
}

impl<T> Envelope<T> {
    #[must_use]
    pub fn is_response(&self) -> bool {
        matches!(self, Envelope::Response(_))
    }
}

impl<T> From<DiscoveryResult<T>> for Envelope<T> {
    fn from(result: DiscoveryResult<T>) -> Self {
        match result {
            Ok(value) => Envelope::Response(value),
            Err(err) => Envelope::Error(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScraperError;

    #[test]
    fn ok_serializes_as_response_only() {
        let env: Envelope<&str> = Ok("https://x/Stores.xml").into();
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json, serde_json::json!({ "response": "https://x/Stores.xml" }));
    }

    #[test]
    fn err_serializes_as_error_only() {
        let env: Envelope<String> = Err(ScraperError::NoXmlInArchive).into();
        let json = serde_json::to_value(&env).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert_eq!(obj["error"], "archive contains no .xml entry");
        assert!(!env.is_response());
    }

    #[test]
    fn deserializes_back() {
        let env: Envelope<u32> = serde_json::from_str(r#"{"response": 7}"#).unwrap();
        assert_eq!(env, Envelope::Response(7));
    }
}
