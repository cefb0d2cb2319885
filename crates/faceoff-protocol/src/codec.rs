//! Codec trait and the JSON implementation.
//!
//! The event router doesn't care how events are serialized — it goes
//! through the [`Codec`] trait, so a binary codec could be swapped in
//! without touching the router. [`JsonCodec`] is what ships: the browser
//! client speaks JSON, and frames stay inspectable in DevTools.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to frames and decodes frames back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed,
    /// carry an unknown event tag, or are missing required fields.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON via `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClientEvent, RoomCode};

    #[test]
    fn test_json_codec_round_trips_client_events() {
        let codec = JsonCodec;
        let ev = ClientEvent::EndTurn {
            code: RoomCode::new("ABC123"),
        };
        let bytes = codec.encode(&ev).unwrap();
        let decoded: ClientEvent = codec.decode(&bytes).unwrap();
        assert_eq!(ev, decoded);
    }

    #[test]
    fn test_json_codec_decode_rejects_malformed_input() {
        let codec = JsonCodec;
        let result: Result<ClientEvent, _> = codec.decode(b"{]");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
