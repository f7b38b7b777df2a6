use chunkedgraph_ids::NodeId;
use serde::{Deserialize, Serialize};

/// One atomic edge, as persisted in `AddedEdge[]`/`RemovedEdge[]` (§3 Log row).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub a: NodeId,
    pub b: NodeId,
}

/// A voxel-space coordinate, used for `SourceCoordinate`/`SinkCoordinate`.
pub type Coordinate = [i64; 3];

/// Shared fields every operation kind logs, plus the tag that distinguishes
/// them. A tagged enum rather than a class hierarchy, per the design notes:
/// the original's `Merge`/`Split`/`Multicut`/`Undo`/`Redo` subclasses of one
/// log-row shape become five variants of one enum, all sharing `user_id` and
/// `root_id`.
#[derive(Clone, Debug, PartialEq)]
pub enum LogEntry {
    Merge {
        user_id: String,
        root_id: Vec<NodeId>,
        source_id: Vec<NodeId>,
        sink_id: Vec<NodeId>,
        source_coordinate: Option<Coordinate>,
        sink_coordinate: Option<Coordinate>,
        added_edge: Vec<EdgeRecord>,
        affinity: Vec<f32>,
    },
    Split {
        user_id: String,
        root_id: Vec<NodeId>,
        source_id: Vec<NodeId>,
        sink_id: Vec<NodeId>,
        removed_edge: Vec<EdgeRecord>,
    },
    Multicut {
        user_id: String,
        root_id: Vec<NodeId>,
        source_id: Vec<NodeId>,
        sink_id: Vec<NodeId>,
        source_coordinate: Option<Coordinate>,
        sink_coordinate: Option<Coordinate>,
        bounding_box_offset: Coordinate,
        removed_edge: Vec<EdgeRecord>,
    },
    Undo {
        user_id: String,
        root_id: Vec<NodeId>,
        undo_operation_id: u64,
    },
    Redo {
        user_id: String,
        root_id: Vec<NodeId>,
        redo_operation_id: u64,
    },
}

impl LogEntry {
    pub fn user_id(&self) -> &str {
        match self {
            LogEntry::Merge { user_id, .. }
            | LogEntry::Split { user_id, .. }
            | LogEntry::Multicut { user_id, .. }
            | LogEntry::Undo { user_id, .. }
            | LogEntry::Redo { user_id, .. } => user_id,
        }
    }

    pub fn root_id(&self) -> &[NodeId] {
        match self {
            LogEntry::Merge { root_id, .. }
            | LogEntry::Split { root_id, .. }
            | LogEntry::Multicut { root_id, .. }
            | LogEntry::Undo { root_id, .. }
            | LogEntry::Redo { root_id, .. } => root_id,
        }
    }

    /// `true` for operations whose log row carries `AddedEdge`, the
    /// discriminant `Lineage::change_log` uses to classify a predecessor's
    /// operation as merge vs. split (§4.4).
    pub fn is_merge(&self) -> bool {
        matches!(self, LogEntry::Merge { .. })
    }

    pub fn added_edges(&self) -> &[EdgeRecord] {
        match self {
            LogEntry::Merge { added_edge, .. } => added_edge,
            _ => &[],
        }
    }

    pub fn removed_edges(&self) -> &[EdgeRecord] {
        match self {
            LogEntry::Split { removed_edge, .. } | LogEntry::Multicut { removed_edge, .. } => removed_edge,
            _ => &[],
        }
    }
}
