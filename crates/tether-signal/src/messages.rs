//! Relay protocol messages
//!
//! JSON text frames tagged by `type`. The `data` of a signal is opaque to the
//! server and forwarded as-is. An explicit `null` stays `null`; only a missing
//! `data` is omitted on the way out.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Messages the server sends to a peer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Sent once on admission with the ids of everyone already present
    #[serde(rename_all = "camelCase")]
    Hello { peer_id: String, peers: Vec<String> },

    #[serde(rename_all = "camelCase")]
    PeerJoin { peer_id: String },

    #[serde(rename_all = "camelCase")]
    PeerLeave { peer_id: String },

    /// Negotiation payload relayed from another peer
    Signal {
        from: String,
        #[serde(
            default,
            deserialize_with = "present",
            skip_serializing_if = "Option::is_none"
        )]
        data: Option<Value>,
    },
}

/// Messages a peer sends to the server
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Payload for one other peer in the same room
    Signal {
        target: String,
        #[serde(
            default,
            deserialize_with = "present",
            skip_serializing_if = "Option::is_none"
        )]
        data: Option<Value>,
    },
}

/// Any present `data`, `null` included, becomes `Some`
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl ServerMessage {
    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ClientMessage {
    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_server_message_shapes() {
        let hello = ServerMessage::Hello {
            peer_id: "aa".into(),
            peers: vec!["bb".into()],
        };
        assert_eq!(
            serde_json::to_value(&hello).unwrap(),
            json!({"type": "hello", "peerId": "aa", "peers": ["bb"]})
        );

        let join = ServerMessage::PeerJoin { peer_id: "bb".into() };
        assert_eq!(
            serde_json::to_value(&join).unwrap(),
            json!({"type": "peer-join", "peerId": "bb"})
        );

        let leave = ServerMessage::PeerLeave { peer_id: "bb".into() };
        assert_eq!(
            serde_json::to_value(&leave).unwrap(),
            json!({"type": "peer-leave", "peerId": "bb"})
        );
    }

    #[test]
    fn test_signal_payload_is_verbatim() {
        let data = json!({"sdp": "v=0\r\n", "kind": "offer", "n": [1, 2.5, null]});
        let msg = ServerMessage::Signal {
            from: "aa".into(),
            data: Some(data.clone()),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "signal", "from": "aa", "data": data})
        );
    }

    #[test]
    fn test_parse_client_signal() {
        let msg = ClientMessage::from_json(r#"{"type":"signal","target":"bb","data":"X"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Signal {
                target: "bb".into(),
                data: Some(json!("X")),
            }
        );

        let msg = ClientMessage::from_json(r#"{"type":"signal","target":"bb"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Signal {
                target: "bb".into(),
                data: None,
            }
        );
    }

    #[test]
    fn test_null_data_is_kept() {
        let msg = ClientMessage::from_json(r#"{"type":"signal","target":"bb","data":null}"#).unwrap();
        let ClientMessage::Signal { data, .. } = msg;
        assert_eq!(data, Some(Value::Null));

        let out = ServerMessage::Signal {
            from: "aa".into(),
            data,
        };
        assert_eq!(
            out.to_json().unwrap(),
            r#"{"type":"signal","from":"aa","data":null}"#
        );

        let absent = ServerMessage::Signal {
            from: "aa".into(),
            data: None,
        };
        assert_eq!(absent.to_json().unwrap(), r#"{"type":"signal","from":"aa"}"#);
    }

    #[test]
    fn test_reject_malformed() {
        assert!(ClientMessage::from_json("not json").is_err());
        assert!(ClientMessage::from_json(r#"{"type":"signal","data":"X"}"#).is_err());
        assert!(ClientMessage::from_json(r#"{"type":"hello"}"#).is_err());
    }
}
