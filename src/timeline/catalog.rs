use std::collections::BTreeMap;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::timeline::generators;
use crate::timeline::loader::{load_timeline, VALUES_PER_NOTE};
use crate::timeline::types::{NoteEvent, Timeline};

pub const PIECE_DATA_VERSION: u32 = 1;

/// Key of the piece loaded when the piano starts.
pub const DEFAULT_PIECE: &str = "c_major_scale";

/// On-disk piece format: `{"pieceDataVersion": 1, "pieceData": [...]}` with
/// repeating (start ms, end ms, pitch, velocity) values.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PieceFile {
    pub piece_data_version: u32,
    pub piece_data: Vec<f64>,
}

impl PieceFile {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let file: PieceFile = serde_json::from_str(json).context("Invalid piece JSON")?;
        if file.piece_data_version != PIECE_DATA_VERSION {
            bail!(
                "Unsupported pieceDataVersion {} (expected {})",
                file.piece_data_version,
                PIECE_DATA_VERSION
            );
        }
        Ok(file)
    }

    /// Flatten notes into the piece format, sorted by start time.
    pub fn from_notes(notes: &[NoteEvent]) -> Self {
        let mut sorted = notes.to_vec();
        sorted.sort_by(|a, b| a.start_ms.total_cmp(&b.start_ms));

        let mut piece_data = Vec::with_capacity(sorted.len() * VALUES_PER_NOTE);
        for note in &sorted {
            piece_data.extend([note.start_ms, note.end_ms, note.pitch, note.intensity]);
        }

        PieceFile {
            piece_data_version: PIECE_DATA_VERSION,
            piece_data,
        }
    }

    pub fn timeline(&self) -> Timeline {
        load_timeline(&self.piece_data)
    }
}

/// Fixed set of named pieces. Piece switches are key lookups into it.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pieces: BTreeMap<String, Timeline>,
}

impl Catalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The generated pieces that ship with the crate.
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        let builtins = [
            (DEFAULT_PIECE, "major_scale", "C4", 120.0),
            ("chromatic_walk", "chromatic", "G3", 100.0),
            ("arpeggios", "arpeggios", "D4", 110.0),
            ("cadence", "cadence", "C4", 72.0),
        ];
        for (key, kind, root, tempo) in builtins {
            match generators::generate(kind, root, tempo) {
                Ok(notes) => catalog.insert(key, PieceFile::from_notes(&notes).timeline()),
                Err(e) => log::warn!("skipping built-in piece {}: {}", key, e),
            }
        }
        catalog
    }

    pub fn insert(&mut self, key: &str, timeline: Timeline) {
        self.pieces.insert(key.to_string(), timeline);
    }

    pub fn register_json(&mut self, key: &str, json: &str) -> anyhow::Result<&Timeline> {
        let file = PieceFile::from_json(json).with_context(|| format!("Piece '{}'", key))?;
        self.insert(key, file.timeline());
        self.pieces
            .get(key)
            .with_context(|| format!("Piece '{}' missing after insert", key))
    }

    pub fn get(&self, key: &str) -> Option<&Timeline> {
        self.pieces.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pieces.contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.pieces.keys().cloned().collect()
    }
}
