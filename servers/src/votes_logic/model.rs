use base64::engine::general_purpose;
use base64::Engine as _;
use serde::Deserialize;

/// One decoded inbound chat frame.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedMessage {
    #[serde(rename = "Message")]
    pub message: String,
}

/// Identity presented to the chat server on the websocket handshake.
#[derive(Debug, Clone)]
pub struct FeedAuth {
    pub name: String,
    pub avatar_url: String,
}

impl Default for FeedAuth {
    fn default() -> Self {
        Self {
            name: "Anonymous".to_string(),
            avatar_url: "www.gravatar.com/avatar/0bc83cb571cd1c50ba6f3e8a78ef1346".to_string(),
        }
    }
}

impl FeedAuth {
    /// Returns the value of the `auth` handshake cookie: the identity as a
    /// base64-encoded JSON object.
    pub fn cookie_value(&self) -> String {
        let json = serde_json::json!({
            "name": self.name,
            "avatar_url": self.avatar_url,
        });
        general_purpose::STANDARD.encode(json.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_message_decodes_the_wire_shape() {
        let frame: FeedMessage = serde_json::from_str(r#"{"Message":"Go Packers!"}"#).unwrap();
        assert_eq!(frame.message, "Go Packers!");
    }

    #[test]
    fn feed_message_rejects_other_shapes() {
        assert!(serde_json::from_str::<FeedMessage>(r#"{"text":"hi"}"#).is_err());
    }

    #[test]
    fn auth_cookie_is_base64_json() {
        let cookie = FeedAuth::default().cookie_value();
        let decoded = general_purpose::STANDARD.decode(cookie).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(value["name"], "Anonymous");
        assert!(value["avatar_url"].as_str().unwrap().contains("gravatar"));
    }
}
