use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tracing::info;

use crate::error::{InterleaveError, Result};

/// Writes `preamble` followed by `merged` into `writer`.
///
/// A line without a terminator is only left that way if it is the very last one.
pub fn write_lines<W: Write>(writer: &mut W, preamble: &[String], merged: &[String]) -> io::Result<()> {
    let mut lines = preamble.iter().chain(merged).peekable();
    while let Some(line) = lines.next() {
        writer.write_all(line.as_bytes())?;
        if !line.ends_with('\n') && lines.peek().is_some() {
            writer.write_all(b"\n")?;
        }
    }
    Ok(())
}

/// Replaces the whole content of `path` with `preamble` + `merged`.
///
/// The file is truncated and rewritten in place, there is no temp file; an
/// interrupted write leaves a partial file behind.
pub fn write_output(path: &Path, preamble: &[String], merged: &[String]) -> Result<()> {
    let file = fs::File::create(path).map_err(|e| InterleaveError::from_io(path, e))?;
    let mut buf_writer = io::BufWriter::with_capacity(8 * 1024, file);
    write_lines(&mut buf_writer, preamble, merged)
        .and_then(|()| buf_writer.flush())
        .map_err(|e| InterleaveError::from_io(path, e))?;
    info!(
        path = %path.display(),
        preamble_lines = preamble.len(),
        merged_lines = merged.len(),
        "wrote merged toolpath"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    fn assemble(preamble: &[String], merged: &[String]) -> String {
        let mut buf = Vec::new();
        write_lines(&mut buf, preamble, merged).expect("write to Vec");
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn preamble_comes_first() {
        let text = assemble(&strings(&["; header\n", "M83\n"]), &strings(&["G1 X1\n", "; end\n"]));
        assert_eq!(text, "; header\nM83\nG1 X1\n; end\n");
    }

    #[test]
    fn unterminated_preamble_line_is_separated() {
        let text = assemble(&strings(&["M84"]), &strings(&["; merged\n", "G28"]));
        assert_eq!(text, "M84\n; merged\nG28");
    }

    #[test]
    fn empty_preamble() {
        assert_eq!(assemble(&[], &strings(&["G1 X1\n"])), "G1 X1\n");
        assert_eq!(assemble(&[], &[]), "");
    }

    #[test]
    fn write_output_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.gcode");
        fs::write(&path, "old content that is much longer than the new one\n").unwrap();
        write_output(&path, &strings(&["; pre\n"]), &strings(&["G1 X1\n"])).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "; pre\nG1 X1\n");
    }
}
