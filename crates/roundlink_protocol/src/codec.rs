//! CBOR encode/decode helpers.
//!
//! One schema serves both the wire and the at-rest files, so the store
//! and the transport share these helpers.

use crate::error::{ProtocolError, ProtocolResult};
use crate::messages::SyncMessage;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes any serde value to CBOR bytes.
pub fn to_cbor<T: Serialize>(value: &T) -> ProtocolResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf).map_err(|e| ProtocolError::encode(e.to_string()))?;
    Ok(buf)
}

/// Decodes any serde value from CBOR bytes.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> ProtocolResult<T> {
    ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::decode(e.to_string()))
}

/// Encodes a sync message for transmission.
pub fn encode_message(message: &SyncMessage) -> ProtocolResult<Vec<u8>> {
    to_cbor(message)
}

/// Decodes a sync message received from the peer.
pub fn decode_message(bytes: &[u8]) -> ProtocolResult<SyncMessage> {
    from_cbor(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use roundlink_model::{GeoPoint, Round};

    #[test]
    fn message_roundtrip() {
        let round = Round::new("c1", "Pebble Creek", Vec::new());
        let id = round.id;
        let bytes = encode_message(&SyncMessage::RoundSnapshot(round)).unwrap();
        match decode_message(&bytes).unwrap() {
            SyncMessage::RoundSnapshot(decoded) => assert_eq!(decoded.id, id),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let result = decode_message(&[0xff, 0x00, 0x13]);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn plain_value_roundtrip() {
        let point = GeoPoint::new(36.5725, -121.9486);
        let bytes = to_cbor(&point).unwrap();
        let decoded: GeoPoint = from_cbor(&bytes).unwrap();
        assert_eq!(decoded, point);
    }
}
