use crate::records::result::InferenceResult;
use std::fmt::Display;

/// 1-based number of an output partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionId(u64);

impl PartitionId {
    pub fn first() -> Self {
        Self(1)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    pub fn file_name(self) -> String {
        format!("part-{}.jsonl", self.0)
    }

    /// `{output_path}/part-{n}.jsonl`. Works for local directories and
    /// object-store prefixes alike.
    pub fn path_in(self, output_path: &str) -> String {
        let base = output_path.trim_end_matches('/');
        format!("{base}/{}", self.file_name())
    }
}

impl Default for PartitionId {
    fn default() -> Self {
        Self::first()
    }
}

impl Display for PartitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Serialize a batch as newline-joined JSON objects (no trailing newline).
pub fn encode_jsonl(results: &[InferenceResult]) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::with_capacity(results.len() * 128);
    for (idx, result) in results.iter().enumerate() {
        if idx > 0 {
            out.push(b'\n');
        }
        serde_json::to_writer(&mut out, result)?;
    }
    Ok(out)
}
