//! Stage and tag records
//!
//! A stage is one node of the derivation DAG. The DAG is never held in
//! memory; it exists through `parent` pointers in the stored records and is
//! walked on demand.

use crate::store::digest::digest_stage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three kinds of stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageType {
    /// A downloaded base image
    Url,
    /// A Smalltalk chunk applied to a parent image
    Stage,
    /// A fingerprint of a local file attached to the graph
    Resource,
}

impl StageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Stage => "stage",
            Self::Resource => "resource",
        }
    }
}

impl fmt::Display for StageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific stage fields, tagged by `stage_type` in the stored JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "stage_type", rename_all = "lowercase")]
pub enum StageBody {
    Url {
        url: String,
    },
    Stage {
        parent: String,
        chunk: String,
        vm: String,
        digest_inputs: Vec<String>,
    },
    Resource {
        parent: String,
        resource_path: String,
        /// Absent iff the file was absent at build time
        #[serde(skip_serializing_if = "Option::is_none")]
        resource_digest: Option<String>,
        digest_inputs: Vec<String>,
    },
}

/// One node of the derivation DAG, stored as JSON under `stages/<stage_digest>`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage_key: String,
    pub stage_digest: String,
    pub image_digest: String,
    #[serde(flatten)]
    pub body: StageBody,
}

impl StageRecord {
    /// Build a record, deriving `stage_digest` from the type and key
    pub fn new(stage_key: String, image_digest: String, body: StageBody) -> Self {
        let stage_digest = digest_stage(body.stage_type().as_str(), &stage_key);
        Self {
            stage_key,
            stage_digest,
            image_digest,
            body,
        }
    }

    pub fn stage_type(&self) -> StageType {
        self.body.stage_type()
    }

    /// The parent stage digest, if this stage has one
    pub fn parent(&self) -> Option<&str> {
        match &self.body {
            StageBody::Url { .. } => None,
            StageBody::Stage { parent, .. } => Some(parent),
            StageBody::Resource { parent, .. } => Some(parent),
        }
    }

    /// Short digest for display
    pub fn short_digest(&self) -> &str {
        &self.stage_digest[..12.min(self.stage_digest.len())]
    }
}

impl StageBody {
    pub fn stage_type(&self) -> StageType {
        match self {
            Self::Url { .. } => StageType::Url,
            Self::Stage { .. } => StageType::Stage,
            Self::Resource { .. } => StageType::Resource,
        }
    }
}

/// A human-meaningful name for a stage, stored under `tags/<name>`.
/// Tags are the GC roots; tagging overwrites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub tag: String,
    pub stage_digest: String,
    pub image_digest: String,
}
