use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;

use super::Digest;
use super::MapValue;
use crate::cluster::NodeId;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct UpdateEntry<K, V> {
    pub(crate) key: K,
    pub(crate) value: MapValue<V>,
}

/// Wire protocol between replicas of one map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) enum EcMapMessage<K, V> {
    /// Entries pushed by the writer, or in answer to an advertisement
    Updates(Vec<UpdateEntry<K, V>>),

    /// Digest of every entry held by `sender`, tombstones included
    Advertisement {
        sender: NodeId,
        created_at: u64,
        digest: Vec<(K, Digest)>,
    },

    /// Sent back once an advertisement was processed
    AdvertisementAck { sender: NodeId, created_at: u64 },

    /// Keys for which the requester holds nothing or an older value
    UpdateRequest { sender: NodeId, keys: Vec<K> },
}

impl<K, V> EcMapMessage<K, V>
where
    K: Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
{
    pub(crate) fn encode(&self) -> Result<Bytes> {
        Ok(Bytes::from(bincode::serialize(self)?))
    }

    pub(crate) fn decode(payload: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(payload)?)
    }
}
