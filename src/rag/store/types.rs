use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rag::chunker::Chunk;

/// Similarity metric a collection is declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    #[default]
    Cosine,
    Dot,
    Euclid,
}

impl Distance {
    /// Name used by the Qdrant API.
    pub fn qdrant_name(self) -> &'static str {
        match self {
            Distance::Cosine => "Cosine",
            Distance::Dot => "Dot",
            Distance::Euclid => "Euclid",
        }
    }

    pub fn from_qdrant_name(name: &str) -> Option<Self> {
        match name {
            "Cosine" => Some(Distance::Cosine),
            "Dot" => Some(Distance::Dot),
            "Euclid" => Some(Distance::Euclid),
            _ => None,
        }
    }
}

/// Name, vector size and metric of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub name: String,
    pub dimension: usize,
    pub distance: Distance,
}

impl CollectionSpec {
    pub fn new(name: impl Into<String>, dimension: usize, distance: Distance) -> Self {
        Self {
            name: name.into(),
            dimension,
            distance,
        }
    }
}

/// Stored alongside every vector. Field names are part of the on-store schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointPayload {
    pub text: String,
    pub chunk_index: usize,
    pub start: usize,
    pub end: usize,
    pub page: Option<u32>,
}

impl PointPayload {
    pub fn from_chunk(chunk: &Chunk, chunk_index: usize) -> Self {
        Self {
            text: chunk.text.clone(),
            chunk_index,
            start: chunk.start,
            end: chunk.end,
            page: chunk.page,
        }
    }

    pub fn to_chunk(&self) -> Chunk {
        Chunk {
            text: self.text.clone(),
            start: self.start,
            end: self.end,
            page: self.page,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPoint {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: PointPayload,
}

/// A search hit; larger scores are more similar under every metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub payload: PointPayload,
    pub score: f32,
}

impl ScoredPoint {
    pub fn new(payload: PointPayload, score: f32) -> Self {
        Self { payload, score }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_field_names() {
        let payload = PointPayload {
            text: "hello".into(),
            chunk_index: 3,
            start: 10,
            end: 15,
            page: Some(2),
        };
        let json = serde_json::to_value(&payload).unwrap();
        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        keys.sort();
        assert_eq!(keys, vec!["chunk_index", "end", "page", "start", "text"]);
    }

    #[test]
    fn test_distance_names() {
        for d in [Distance::Cosine, Distance::Dot, Distance::Euclid] {
            assert_eq!(Distance::from_qdrant_name(d.qdrant_name()), Some(d));
        }
        assert_eq!(Distance::from_qdrant_name("Manhattan"), None);
    }
}
