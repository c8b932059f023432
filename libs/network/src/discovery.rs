//! Discovery handshake
//!
//! Immediately after connect, each side sends a request addressed to the
//! reserved system function advertising its own identity and the service
//! keys it can serve; the peer answers in kind. Both payloads drive
//! `Dispatcher::add_connection` on the receiving side.
//!
//! Payload layout (little-endian): `i32 origin_id, i32 count, i32 keys[count]`.

use byteorder::{LittleEndian, ReadBytesExt};
use bytes::{BufMut, BytesMut};
use std::io::Cursor;
use types::{BufferPool, IdSequences, Priority, ServiceAddress, ServiceKey, WorkItem};

use crate::connection::OriginId;
use crate::error::{DispatchError, Result};

/// Service key of the reserved discovery function.
pub const DISCOVERY_KEY: ServiceKey = 1_001_001;

/// Reserved system address carrying the discovery handshake.
pub fn discovery_address() -> ServiceAddress {
    ServiceAddress::new(1, 1, 1)
}

/// A node's advertisement: its identity and the service keys it serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryData {
    pub origin_id: OriginId,
    pub service_keys: Vec<ServiceKey>,
}

impl DiscoveryData {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(8 + 4 * self.service_keys.len());
        buf.put_i32_le(self.origin_id);
        buf.put_i32_le(self.service_keys.len() as i32);
        for &key in &self.service_keys {
            buf.put_i32_le(key as i32);
        }
        buf.to_vec()
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < 8 {
            return Err(DispatchError::protocol(format!(
                "discovery payload too short: {} bytes",
                data.len()
            )));
        }
        let mut cursor = Cursor::new(data);
        let origin_id = cursor.read_i32::<LittleEndian>().unwrap_or(0);
        let count = cursor.read_i32::<LittleEndian>().unwrap_or(0);
        if count < 0 || data.len() != 8 + 4 * count as usize {
            return Err(DispatchError::protocol(format!(
                "discovery payload declares {} keys but carries {} bytes",
                count,
                data.len()
            )));
        }

        let mut service_keys = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let key = cursor.read_i32::<LittleEndian>().unwrap_or(0);
            if key < 0 {
                return Err(DispatchError::protocol(format!(
                    "discovery payload advertises negative service key {key}"
                )));
            }
            service_keys.push(key as ServiceKey);
        }

        Ok(Self {
            origin_id,
            service_keys,
        })
    }

    /// Build the handshake request sent right after connect.
    pub fn to_work_item(&self, pool: &BufferPool, sequences: &IdSequences) -> WorkItem {
        let mut item = WorkItem::request(
            discovery_address(),
            discovery_address(),
            Priority::Critical,
            true,
            sequences,
        );
        item.origin_id = self.origin_id;
        item.with_request_payload(pool.payload_from_slice(&self.encode()))
    }

    /// Answer a peer's handshake request with this node's own advertisement.
    pub fn reply_to(&self, request: &WorkItem, pool: &BufferPool) -> WorkItem {
        let mut reply = request.reply();
        reply.request_payload = None;
        reply.response_payload = pool.payload_from_slice(&self.encode());
        reply
    }

    /// Extract an advertisement from either side of the handshake.
    pub fn from_work_item(item: &WorkItem) -> Result<Self> {
        let payload = if item.is_reply {
            item.response_payload.as_ref()
        } else {
            item.request_payload.as_ref()
        };
        let payload =
            payload.ok_or_else(|| DispatchError::protocol("discovery envelope has no payload"))?;
        Self::decode(payload.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_round_trip() {
        let data = DiscoveryData {
            origin_id: 42,
            service_keys: vec![5_101_007, 1_001_001],
        };
        assert_eq!(DiscoveryData::decode(&data.encode()).unwrap(), data);
    }

    #[test]
    fn test_empty_key_set_round_trips() {
        let data = DiscoveryData {
            origin_id: -1,
            service_keys: Vec::new(),
        };
        let encoded = data.encode();
        assert_eq!(encoded.len(), 8);
        assert_eq!(DiscoveryData::decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_count_mismatch_rejected() {
        let data = DiscoveryData {
            origin_id: 1,
            service_keys: vec![7],
        };
        let mut encoded = data.encode();
        encoded.truncate(encoded.len() - 1);
        assert!(DiscoveryData::decode(&encoded).is_err());
        assert!(DiscoveryData::decode(&[1, 2]).is_err());
    }

    #[test]
    fn test_negative_advertised_key_rejected() {
        let mut encoded = BytesMut::new();
        encoded.put_i32_le(42);
        encoded.put_i32_le(2);
        encoded.put_i32_le(5_101_007);
        encoded.put_i32_le(-3);
        assert!(DiscoveryData::decode(&encoded).is_err());
    }

    #[test]
    fn test_handshake_envelopes() {
        let pool = BufferPool::new();
        let sequences = IdSequences::new();
        let advert = DiscoveryData {
            origin_id: 7,
            service_keys: vec![DISCOVERY_KEY, 2_002_002],
        };

        let request = advert.to_work_item(&pool, &sequences);
        assert_eq!(request.destination_key(), DISCOVERY_KEY);
        assert!(request.reply_requested);
        assert_eq!(request.origin_id, 7);
        assert_eq!(DiscoveryData::from_work_item(&request).unwrap(), advert);

        let peer = DiscoveryData {
            origin_id: 9,
            service_keys: vec![3_003_003],
        };
        let reply = peer.reply_to(&request, &pool);
        assert!(reply.is_reply);
        assert_eq!(reply.unique_id, request.unique_id);
        assert_eq!(DiscoveryData::from_work_item(&reply).unwrap(), peer);
    }
}
