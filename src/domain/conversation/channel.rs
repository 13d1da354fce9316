//! Channels and the prospect identities that key a conversation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Transport a conversation runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Phone-network messaging; replies leave through the messaging API.
    Phone,
    /// Embedded web chat widget; replies travel over the socket.
    Web,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Phone => "phone",
            Channel::Web => "web",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "phone" => Ok(Channel::Phone),
            "web" => Ok(Channel::Web),
            other => Err(ValidationError::invalid_format(
                "channel",
                format!("unknown channel '{}'", other),
            )),
        }
    }
}

/// Who the prospect is, as far as the channel can tell.
///
/// A conversation carries exactly one of a phone number or a web session
/// id, and the variant fixes the channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum ProspectIdentity {
    Phone { phone_number: String },
    Web { web_session_id: String },
}

impl ProspectIdentity {
    pub fn phone(number: impl Into<String>) -> Result<Self, ValidationError> {
        let number = number.into().trim().to_string();
        if number.is_empty() {
            return Err(ValidationError::empty_field("phone_number"));
        }
        Ok(ProspectIdentity::Phone {
            phone_number: number,
        })
    }

    pub fn web(session_id: impl Into<String>) -> Result<Self, ValidationError> {
        let session_id = session_id.into().trim().to_string();
        if session_id.is_empty() {
            return Err(ValidationError::empty_field("web_session_id"));
        }
        Ok(ProspectIdentity::Web {
            web_session_id: session_id,
        })
    }

    /// Builds an identity for `channel` from a raw key.
    pub fn for_channel(channel: Channel, key: impl Into<String>) -> Result<Self, ValidationError> {
        match channel {
            Channel::Phone => Self::phone(key),
            Channel::Web => Self::web(key),
        }
    }

    pub fn channel(&self) -> Channel {
        match self {
            ProspectIdentity::Phone { .. } => Channel::Phone,
            ProspectIdentity::Web { .. } => Channel::Web,
        }
    }

    /// The raw key: a phone number or a session id.
    pub fn key(&self) -> &str {
        match self {
            ProspectIdentity::Phone { phone_number } => phone_number,
            ProspectIdentity::Web { web_session_id } => web_session_id,
        }
    }

    pub fn phone_number(&self) -> Option<&str> {
        match self {
            ProspectIdentity::Phone { phone_number } => Some(phone_number),
            ProspectIdentity::Web { .. } => None,
        }
    }

    pub fn web_session_id(&self) -> Option<&str> {
        match self {
            ProspectIdentity::Web { web_session_id } => Some(web_session_id),
            ProspectIdentity::Phone { .. } => None,
        }
    }
}

impl fmt::Display for ProspectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel(), self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_identity_reports_phone_channel() {
        let id = ProspectIdentity::phone("+2348000000001").unwrap();
        assert_eq!(id.channel(), Channel::Phone);
        assert_eq!(id.phone_number(), Some("+2348000000001"));
        assert_eq!(id.web_session_id(), None);
    }

    #[test]
    fn web_identity_reports_web_channel() {
        let id = ProspectIdentity::web("sess-123").unwrap();
        assert_eq!(id.channel(), Channel::Web);
        assert_eq!(id.web_session_id(), Some("sess-123"));
        assert_eq!(id.phone_number(), None);
    }

    #[test]
    fn blank_keys_are_rejected() {
        assert!(ProspectIdentity::phone("  ").is_err());
        assert!(ProspectIdentity::web("").is_err());
    }

    #[test]
    fn identity_serializes_with_channel_tag() {
        let id = ProspectIdentity::web("sess-9").unwrap();
        let json = serde_json::to_value(&id).unwrap();
        assert_eq!(json["channel"], "web");
        assert_eq!(json["web_session_id"], "sess-9");
    }

    #[test]
    fn channel_parses_lowercase_names() {
        assert_eq!("phone".parse::<Channel>().unwrap(), Channel::Phone);
        assert_eq!("web".parse::<Channel>().unwrap(), Channel::Web);
        assert!("fax".parse::<Channel>().is_err());
    }
}
