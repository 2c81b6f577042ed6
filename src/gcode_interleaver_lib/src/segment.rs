use std::borrow::Cow;
use std::fs;
use std::io::{self, Read};
use std::mem;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{InterleaveError, Result};

pub const DEFAULT_LAYER_MARKER: &str = ";LAYER_CHANGE";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layer {
    // 1-based, contiguous within a document
    pub index: usize,
    // each line keeps its own terminator, so concatenating them gives back the source text
    pub lines: Vec<String>,
}

impl Layer {
    pub fn new(index: usize, lines: Vec<String>) -> Layer {
        Layer { index, lines }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolpathDocument {
    pub layers: Vec<Layer>,
    // Lines strictly before the first marker. These are also part of layer 1; only the target
    // document's preamble gets written back in front of the merged stream.
    pub preamble: Vec<String>,
}

impl ToolpathDocument {
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

/// Splits `text` into layers, each starting at a line beginning with `marker`.
///
/// Lines before the first marker (or every line, if there is no marker) land in
/// the first layer rather than being dropped.
pub fn segment(text: &str, marker: &str) -> ToolpathDocument {
    let mut layers: Vec<Layer> = vec![];
    let mut preamble: Vec<String> = vec![];
    let mut current_lines: Vec<String> = vec![];
    let mut seen_marker = false;

    for line in text.split_inclusive('\n') {
        if line.starts_with(marker) {
            if !current_lines.is_empty() {
                let index = layers.len() + 1;
                layers.push(Layer::new(index, mem::take(&mut current_lines)));
            }
            seen_marker = true;
        } else if !seen_marker {
            preamble.push(line.to_owned());
        }
        current_lines.push(line.to_owned());
    }
    if !current_lines.is_empty() {
        let index = layers.len() + 1;
        layers.push(Layer::new(index, current_lines));
    }

    debug!(layers = layers.len(), preamble_lines = preamble.len(), "segmented toolpath");
    ToolpathDocument { layers, preamble }
}

/// Reads the whole file into memory, then segments it. Invalid UTF-8 is
/// replaced with U+FFFD.
pub fn read_document(path: &Path, marker: &str) -> Result<ToolpathDocument> {
    let file = fs::File::open(path).map_err(|e| InterleaveError::from_io(path, e))?;
    let mut bytes = Vec::new();
    io::BufReader::with_capacity(64 * 1024, file)
        .read_to_end(&mut bytes)
        .map_err(|e| InterleaveError::from_io(path, e))?;
    let text = String::from_utf8_lossy(&bytes);
    if let Cow::Owned(_) = text {
        warn!(path = %path.display(), "toolpath is not valid UTF-8, replaced undecodable bytes");
    }
    Ok(segment(&text, marker))
}
