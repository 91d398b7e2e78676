//! Wire protocol for the signaling relay.
//!
//! Every frame on the wire is a UTF-8 JSON envelope `{"type": "...", "data":
//! {...}}`. Inbound envelopes are parsed into the closed [`InboundFrame`]
//! enum; unknown types and unparsable payloads both fail parsing and are
//! answered with the generic `error` frame. Outbound frames are built from
//! [`OutboundFrame`] and serialized back into the same envelope shape.
//!
//! The negotiation frames (`offer`, `answer`, `ice-candidate`) are never
//! interpreted beyond extracting `callId` for routing: the relay forwards
//! the sender's original text byte-for-byte.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client-facing message for unparsable or unknown frames.
pub const MSG_INVALID_FORMAT: &str = "Invalid message format";

/// Client-facing message for frames sent before authentication.
pub const MSG_NOT_AUTHENTICATED: &str = "Not authenticated";

/// Client-facing message when a call target has no bound session.
pub const MSG_USER_NOT_AVAILABLE: &str = "user not available";

/// Client-facing message when answering a call that does not exist.
pub const MSG_CALL_NOT_FOUND: &str = "call not found";

/// Raw envelope shape shared by every frame.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Media kind of a call, declared by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Audio,
    Video,
}

impl CallKind {
    /// Stable label for logs and metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CallKind::Audio => "audio",
            CallKind::Video => "video",
        }
    }
}

/// Which of the three opaque negotiation frame types a relay frame is.
///
/// Only used for logging and metric labels; the payload itself is opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayKind {
    Offer,
    Answer,
    IceCandidate,
}

impl RelayKind {
    /// Stable label for logs and metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RelayKind::Offer => "offer",
            RelayKind::Answer => "answer",
            RelayKind::IceCandidate => "ice-candidate",
        }
    }
}

/// Parse failures for inbound frames.
///
/// Both variants are answered with the same generic client message
/// ([`MSG_INVALID_FORMAT`]); the distinction exists for server-side logs.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Envelope or payload did not parse.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Envelope parsed but the type is not part of the protocol.
    #[error("unknown frame type: {0}")]
    UnknownType(String),
}

#[derive(Debug, Deserialize)]
struct AuthData {
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallStartData {
    call_id: String,
    receiver_id: String,
    #[serde(rename = "type")]
    kind: CallKind,
    /// Opaque caller profile snippet, forwarded verbatim in `call:incoming`.
    #[serde(default)]
    caller: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallAnswerData {
    call_id: String,
    accepted: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallRefData {
    call_id: String,
}

/// One parsed inbound frame.
///
/// This is the closed set of frame types the relay accepts; dispatch is a
/// single `match` in the relay actor.
#[derive(Debug)]
pub enum InboundFrame {
    /// `auth{token}` - authenticate this session.
    Auth { token: String },

    /// `call:start{callId, receiverId, type, caller}` - ring another user.
    CallStart {
        call_id: String,
        receiver_id: String,
        kind: CallKind,
        caller: Value,
    },

    /// `call:answer{callId, accepted}` - accept or reject a ringing call.
    CallAnswer { call_id: String, accepted: bool },

    /// `call:decline{callId}` - reject a ringing call.
    CallDecline { call_id: String },

    /// `call:end{callId}` - hang up, in any call state.
    CallEnd { call_id: String },

    /// `offer` / `answer` / `ice-candidate` - opaque negotiation payload.
    /// The caller keeps the original text for verbatim forwarding.
    Relay { kind: RelayKind, call_id: String },
}

impl InboundFrame {
    /// Parse one inbound envelope.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] if the envelope does not parse, a payload
    /// field is missing or mistyped, or the type is not part of the
    /// protocol.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let envelope: Envelope = serde_json::from_str(text)?;

        match envelope.kind.as_str() {
            "auth" => {
                let data: AuthData = serde_json::from_value(envelope.data)?;
                Ok(InboundFrame::Auth { token: data.token })
            }
            "call:start" => {
                let data: CallStartData = serde_json::from_value(envelope.data)?;
                Ok(InboundFrame::CallStart {
                    call_id: data.call_id,
                    receiver_id: data.receiver_id,
                    kind: data.kind,
                    caller: data.caller,
                })
            }
            "call:answer" => {
                let data: CallAnswerData = serde_json::from_value(envelope.data)?;
                Ok(InboundFrame::CallAnswer {
                    call_id: data.call_id,
                    accepted: data.accepted,
                })
            }
            "call:decline" => {
                let data: CallRefData = serde_json::from_value(envelope.data)?;
                Ok(InboundFrame::CallDecline {
                    call_id: data.call_id,
                })
            }
            "call:end" => {
                let data: CallRefData = serde_json::from_value(envelope.data)?;
                Ok(InboundFrame::CallEnd {
                    call_id: data.call_id,
                })
            }
            "offer" => Self::parse_relay(RelayKind::Offer, envelope.data),
            "answer" => Self::parse_relay(RelayKind::Answer, envelope.data),
            "ice-candidate" => Self::parse_relay(RelayKind::IceCandidate, envelope.data),
            other => Err(FrameError::UnknownType(other.to_string())),
        }
    }

    /// Wire-level type string, for logs and metric labels.
    #[must_use]
    pub fn frame_type(&self) -> &'static str {
        match self {
            InboundFrame::Auth { .. } => "auth",
            InboundFrame::CallStart { .. } => "call:start",
            InboundFrame::CallAnswer { .. } => "call:answer",
            InboundFrame::CallDecline { .. } => "call:decline",
            InboundFrame::CallEnd { .. } => "call:end",
            InboundFrame::Relay { kind, .. } => kind.as_str(),
        }
    }

    fn parse_relay(kind: RelayKind, data: Value) -> Result<Self, FrameError> {
        // Only callId is read; the rest of the payload stays opaque.
        let data: CallRefData = serde_json::from_value(data)?;
        Ok(InboundFrame::Relay {
            kind,
            call_id: data.call_id,
        })
    }
}

/// One outbound frame built by the relay itself.
///
/// Relayed negotiation frames do not appear here: those are forwarded as
/// the sender's original text, never re-serialized.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum OutboundFrame {
    #[serde(rename = "auth:success", rename_all = "camelCase")]
    AuthSuccess { user_id: String },

    #[serde(rename = "auth:error")]
    AuthError { message: String },

    #[serde(rename = "call:incoming", rename_all = "camelCase")]
    CallIncoming {
        call_id: String,
        caller: Value,
        #[serde(rename = "type")]
        kind: CallKind,
    },

    #[serde(rename = "call:answer", rename_all = "camelCase")]
    CallAnswer { call_id: String, accepted: bool },

    #[serde(rename = "call:decline", rename_all = "camelCase")]
    CallDecline { call_id: String },

    #[serde(rename = "call:end", rename_all = "camelCase")]
    CallEnd { call_id: String },

    #[serde(rename = "call:error")]
    CallError { message: String },

    #[serde(rename = "error")]
    Error { message: String },
}

impl OutboundFrame {
    /// Serialize to envelope text for the wire.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails; callers log and
    /// drop the frame rather than tearing down the transport.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_auth() {
        let frame = InboundFrame::parse(r#"{"type":"auth","data":{"token":"abc.def.ghi"}}"#)
            .expect("should parse");
        assert!(matches!(frame, InboundFrame::Auth { token } if token == "abc.def.ghi"));
    }

    #[test]
    fn test_parse_call_start() {
        let text = r#"{"type":"call:start","data":{"callId":"c1","receiverId":"user-b","type":"video","caller":{"name":"Alice"}}}"#;
        let frame = InboundFrame::parse(text).expect("should parse");

        match frame {
            InboundFrame::CallStart {
                call_id,
                receiver_id,
                kind,
                caller,
            } => {
                assert_eq!(call_id, "c1");
                assert_eq!(receiver_id, "user-b");
                assert_eq!(kind, CallKind::Video);
                assert_eq!(caller["name"], "Alice");
            }
            other => panic!("wrong frame: {other:?}"),
        }
    }

    #[test]
    fn test_parse_call_start_without_caller_profile() {
        let text = r#"{"type":"call:start","data":{"callId":"c1","receiverId":"b","type":"audio"}}"#;
        let frame = InboundFrame::parse(text).expect("should parse");
        assert!(matches!(
            frame,
            InboundFrame::CallStart {
                caller: Value::Null,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_call_answer() {
        let text = r#"{"type":"call:answer","data":{"callId":"c1","accepted":true}}"#;
        let frame = InboundFrame::parse(text).expect("should parse");
        assert!(matches!(
            frame,
            InboundFrame::CallAnswer { call_id, accepted: true } if call_id == "c1"
        ));
    }

    #[test]
    fn test_parse_relay_frames_extract_call_id_only() {
        for (kind_str, kind) in [
            ("offer", RelayKind::Offer),
            ("answer", RelayKind::Answer),
            ("ice-candidate", RelayKind::IceCandidate),
        ] {
            let text = format!(
                r#"{{"type":"{kind_str}","data":{{"callId":"c9","sdp":"v=0...","extra":[1,2,3]}}}}"#
            );
            let frame = InboundFrame::parse(&text).expect("should parse");
            match frame {
                InboundFrame::Relay {
                    kind: parsed_kind,
                    call_id,
                } => {
                    assert_eq!(parsed_kind, kind);
                    assert_eq!(call_id, "c9");
                }
                other => panic!("wrong frame: {other:?}"),
            }
        }
    }

    #[test]
    fn test_parse_unknown_type_rejected() {
        let result = InboundFrame::parse(r#"{"type":"call:mute","data":{"callId":"c1"}}"#);
        assert!(matches!(result, Err(FrameError::UnknownType(t)) if t == "call:mute"));
    }

    #[test]
    fn test_parse_malformed_envelope_rejected() {
        assert!(matches!(
            InboundFrame::parse("not json at all"),
            Err(FrameError::Malformed(_))
        ));
        assert!(matches!(
            InboundFrame::parse(r#"{"data":{}}"#),
            Err(FrameError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_missing_payload_field_rejected() {
        // call:answer without `accepted`
        let result = InboundFrame::parse(r#"{"type":"call:answer","data":{"callId":"c1"}}"#);
        assert!(matches!(result, Err(FrameError::Malformed(_))));
    }

    #[test]
    fn test_parse_invalid_call_kind_rejected() {
        let text = r#"{"type":"call:start","data":{"callId":"c1","receiverId":"b","type":"hologram"}}"#;
        assert!(matches!(
            InboundFrame::parse(text),
            Err(FrameError::Malformed(_))
        ));
    }

    #[test]
    fn test_outbound_auth_success_shape() {
        let text = OutboundFrame::AuthSuccess {
            user_id: "user-a".to_string(),
        }
        .to_text()
        .expect("serialize");

        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "auth:success");
        assert_eq!(value["data"]["userId"], "user-a");
    }

    #[test]
    fn test_outbound_call_incoming_shape() {
        let text = OutboundFrame::CallIncoming {
            call_id: "c1".to_string(),
            caller: serde_json::json!({"name": "Alice"}),
            kind: CallKind::Video,
        }
        .to_text()
        .expect("serialize");

        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "call:incoming");
        assert_eq!(value["data"]["callId"], "c1");
        assert_eq!(value["data"]["type"], "video");
        assert_eq!(value["data"]["caller"]["name"], "Alice");
    }

    #[test]
    fn test_outbound_call_error_shape() {
        let text = OutboundFrame::CallError {
            message: MSG_USER_NOT_AVAILABLE.to_string(),
        }
        .to_text()
        .expect("serialize");

        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "call:error");
        assert_eq!(value["data"]["message"], "user not available");
    }

    #[test]
    fn test_outbound_call_end_shape() {
        let text = OutboundFrame::CallEnd {
            call_id: "c1".to_string(),
        }
        .to_text()
        .expect("serialize");

        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "call:end");
        assert_eq!(value["data"]["callId"], "c1");
    }
}
