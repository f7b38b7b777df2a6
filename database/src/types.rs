use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;

/// All generations of every column currently stored for one row.
pub type RowCells = BTreeMap<Column, Vec<Cell>>;

/// Microsecond timestamp. Cells are ordered newest-first by this value.
pub type Timestamp = i64;

/// An opaque, orderable row key. The core constructs these as zero-padded
/// decimal `NodeId`s (19 digits) or `i<padded_chunk>[_<shard>]` counter keys;
/// this crate never interprets the bytes.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowKey(SmallVec<[u8; 24]>);

impl RowKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(SmallVec::from_vec(bytes.into()))
    }
}

impl AsRef<[u8]> for RowKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for RowKey {
    fn from(v: Vec<u8>) -> Self {
        Self::new(v)
    }
}

impl From<&[u8]> for RowKey {
    fn from(v: &[u8]) -> Self {
        Self::new(v.to_vec())
    }
}

impl fmt::Debug for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RowKey({})", faster_hex::hex_string(&self.0))
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// A column family, coarse grouping for a row's columns: data (§3 `Hierarchy`/
/// `Connectivity`), counters, log, cross-edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Family {
    Data = 0,
    Counters = 1,
    Log = 2,
    CrossEdges = 3,
}

/// `(family, qualifier)` — a column within a row.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Column {
    pub family: Family,
    pub qualifier: SmallVec<[u8; 16]>,
}

impl Column {
    pub fn new(family: Family, qualifier: impl Into<Vec<u8>>) -> Self {
        Self { family, qualifier: SmallVec::from_vec(qualifier.into()) }
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{}", self.family, String::from_utf8_lossy(&self.qualifier))
    }
}

/// One versioned value in a column's generation list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    pub timestamp: Timestamp,
    pub value: Vec<u8>,
}

/// How to select rows for a read.
#[derive(Clone, Debug)]
pub enum RowSelector {
    Keys(Vec<RowKey>),
    /// Inclusive lower bound; `end` is exclusive unless `end_inclusive` is set.
    Range { start: RowKey, end: Option<RowKey>, end_inclusive: bool },
}

/// A point-in-time-bounded, optionally column-filtered row read.
#[derive(Clone, Debug)]
pub struct ReadRequest {
    pub rows: RowSelector,
    pub columns: Option<Vec<Column>>,
    pub start_time: Option<Timestamp>,
    pub end_time: Option<Timestamp>,
}

impl ReadRequest {
    pub fn keys(rows: Vec<RowKey>) -> Self {
        Self { rows: RowSelector::Keys(rows), columns: None, start_time: None, end_time: None }
    }

    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn at(mut self, end_time: Timestamp) -> Self {
        self.end_time = Some(end_time);
        self
    }
}

/// A pending mutation to one row: columns to set, plus an optional shared
/// timestamp (defaults to "now" at write time if unset).
#[derive(Clone, Debug, Default)]
pub struct RowMutation {
    pub row: Option<RowKey>,
    pub sets: Vec<(Column, Vec<u8>)>,
    pub timestamp: Option<Timestamp>,
}

impl RowMutation {
    pub fn new(row: RowKey) -> Self {
        Self { row: Some(row), sets: Vec::new(), timestamp: None }
    }

    pub fn set(mut self, column: Column, value: Vec<u8>) -> Self {
        self.sets.push((column, value));
        self
    }

    pub fn at(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}
