//! Shared types for work dispatch between organs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a request that has not been answered yet.
pub const STATUS_PENDING: u16 = 0;

/// Status of work a worker completed successfully.
pub const STATUS_OK: u16 = 200;

/// Status of work that could not be done: no worker, no resources, or the
/// deadline elapsed.
pub const STATUS_UNAVAILABLE: u16 = 503;

/// Category of labor a worker can perform.
///
/// The named constants are the work types the organism uses; any other
/// value is a valid custom tag and compares by number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkType(pub u32);

impl WorkType {
    pub const NOTHING: WorkType = WorkType(0);
    /// Reserved for material diffusion between neighbouring organs.
    pub const DIFFUSION: WorkType = WorkType(1);
    pub const COVER: WorkType = WorkType(2);
    pub const EXCHANGE: WorkType = WorkType(3);
    pub const EXHALE: WorkType = WorkType(4);
    pub const PUMP: WorkType = WorkType(5);
    pub const MOVE: WorkType = WorkType(6);
    pub const THINK: WorkType = WorkType(7);
    pub const DIGEST: WorkType = WorkType(8);
    pub const FILTER: WorkType = WorkType(9);

    /// Create a work type from its numeric tag.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the underlying numeric tag.
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Name of a well-known work type, `None` for custom tags.
    pub fn name(&self) -> Option<&'static str> {
        match self.0 {
            0 => Some("nothing"),
            1 => Some("diffusion"),
            2 => Some("cover"),
            3 => Some("exchange"),
            4 => Some("exhale"),
            5 => Some("pump"),
            6 => Some("move"),
            7 => Some("think"),
            8 => Some("digest"),
            9 => Some("filter"),
            _ => None,
        }
    }
}

impl From<u32> for WorkType {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "work-{}", self.0),
        }
    }
}

/// A unit of work travelling between organs.
///
/// A status of [`STATUS_PENDING`] marks a request; anything else marks a
/// completed result. Completion consumes the request, and a completed
/// `Work` ignores further attempts to complete it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Work {
    work_type: WorkType,
    status: u16,
    result: String,
}

impl Work {
    /// A pending request for work of the given type.
    pub fn request(work_type: WorkType) -> Self {
        Self {
            work_type,
            status: STATUS_PENDING,
            result: String::new(),
        }
    }

    /// The result handed back when no answer arrived before the deadline.
    pub fn timeout(work_type: WorkType) -> Self {
        Self {
            work_type,
            status: STATUS_UNAVAILABLE,
            result: "Timeout".to_string(),
        }
    }

    /// Rebuild a `Work` from its wire fields.
    pub fn from_parts(work_type: WorkType, status: u16, result: impl Into<String>) -> Self {
        Self {
            work_type,
            status,
            result: result.into(),
        }
    }

    pub fn work_type(&self) -> WorkType {
        self.work_type
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn result(&self) -> &str {
        &self.result
    }

    pub fn is_pending(&self) -> bool {
        self.status == STATUS_PENDING
    }

    pub fn is_completed(&self) -> bool {
        !self.is_pending()
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Complete the request successfully.
    pub fn complete(self, result: impl Into<String>) -> Self {
        self.respond(STATUS_OK, result)
    }

    /// Complete the request as unavailable.
    pub fn fail(self, result: impl Into<String>) -> Self {
        self.respond(STATUS_UNAVAILABLE, result)
    }

    /// Complete the request with an explicit status.
    ///
    /// Already-completed work is returned unchanged, and a status of
    /// [`STATUS_PENDING`] is treated as [`STATUS_UNAVAILABLE`] so the result
    /// can never travel back as a request.
    pub fn respond(self, status: u16, result: impl Into<String>) -> Self {
        if self.is_completed() {
            return self;
        }
        let status = if status == STATUS_PENDING {
            STATUS_UNAVAILABLE
        } else {
            status
        };
        Self {
            work_type: self.work_type,
            status,
            result: result.into(),
        }
    }
}

impl fmt::Display for Work {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_pending() {
            write!(f, "{} (pending)", self.work_type)
        } else {
            write!(f, "{} [{}] {}", self.work_type, self.status, self.result)
        }
    }
}

/// Relationship an edge between two organs represents.
///
/// Dispatch floods every edge regardless of type; diffusion skips
/// [`EdgeType::Neuronal`] edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeType {
    Cardiovascular,
    Neuronal,
    Lymphatic,
    Muscular,
    Skeletal,
    GutLining,
    BloodBrainBarrier,
}

impl EdgeType {
    /// Whether materials may diffuse along this edge.
    pub fn carries_diffusion(&self) -> bool {
        !matches!(self, EdgeType::Neuronal)
    }
}

impl Default for EdgeType {
    fn default() -> Self {
        EdgeType::Cardiovascular
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeType::Cardiovascular => write!(f, "cardiovascular"),
            EdgeType::Neuronal => write!(f, "neuronal"),
            EdgeType::Lymphatic => write!(f, "lymphatic"),
            EdgeType::Muscular => write!(f, "muscular"),
            EdgeType::Skeletal => write!(f, "skeletal"),
            EdgeType::GutLining => write!(f, "gut-lining"),
            EdgeType::BloodBrainBarrier => write!(f, "blood-brain-barrier"),
        }
    }
}
