use crate::errors::{GraphError, GraphResult};
use chunkedgraph_ids::NodeId;
use serde::{de::DeserializeOwned, Serialize};

/// bincode encode/decode for cell values. Every row/column in §3 stores one
/// of a handful of value shapes (`NodeId`, `NodeId[]`, `f32[]`, `u64[]`,
/// strings); this keeps that encoding in one place instead of repeating
/// `bincode::serialize`/`deserialize` call sites across crates.
pub fn encode<T: Serialize>(value: &T) -> GraphResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| GraphError::StoreUnavailable(e.to_string()))
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> GraphResult<T> {
    bincode::deserialize(bytes).map_err(|e| GraphError::StoreUnavailable(e.to_string()))
}

pub fn encode_node_id(id: NodeId) -> Vec<u8> {
    id.raw().to_be_bytes().to_vec()
}

pub fn decode_node_id(bytes: &[u8]) -> GraphResult<NodeId> {
    let arr: [u8; 8] = bytes.try_into().map_err(|_| GraphError::StoreUnavailable("malformed NodeId cell".into()))?;
    Ok(NodeId::new(u64::from_be_bytes(arr)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_round_trips() {
        let id = NodeId::new(0x0102_0304_0506_0708);
        assert_eq!(decode_node_id(&encode_node_id(id)).unwrap(), id);
    }

    #[test]
    fn vec_round_trips_through_bincode() {
        let ids = vec![NodeId::new(1), NodeId::new(2), NodeId::new(3)];
        let bytes = encode(&ids).unwrap();
        let decoded: Vec<NodeId> = decode(&bytes).unwrap();
        assert_eq!(decoded, ids);
    }
}
