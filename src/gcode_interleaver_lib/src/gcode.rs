use regex::Regex;
use std::sync::LazyLock;

// This way we can switch to f32 easily if memory ever matters for huge prints.
pub use f64 as Mm;
pub use f64 as Factor;
pub use f64 as Seconds;

// strip off the command word and the comment; G0/G00/G1/G01 only, so G10, G17 etc. don't match
static MOVE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?<cmd>G0?[01])(?<fields>[ \t][^;]*)?(?<comment>;.*)?$").unwrap()
});

pub const RETRACT_FEED_RATE: u32 = 3000;
pub const FAN_FULL_SPEED: u32 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
    E,
}

impl Axis {
    fn from_letter(letter: u8) -> Option<Axis> {
        match letter {
            b'X' => Some(Axis::X),
            b'Y' => Some(Axis::Y),
            b'Z' => Some(Axis::Z),
            b'E' => Some(Axis::E),
            _ => None,
        }
    }
}

/// A `G0`/`G1` line split into its parts. Borrowed from the source line.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveLine<'a> {
    pub command: &'a str,
    pub fields: Vec<&'a str>,
    pub comment: Option<&'a str>,
    /// `"\n"`, `"\r\n"` or `""` for an unterminated last line.
    pub eol: &'a str,
}

pub fn split_eol(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

/// Returns `None` for anything that isn't a linear move.
pub fn parse_move(line: &str) -> Option<MoveLine<'_>> {
    let (body, eol) = split_eol(line);
    let captures = MOVE_LINE.captures(body)?;
    let command = captures.name("cmd")?.as_str();
    let fields = captures
        .name("fields")
        .map(|m| m.as_str().split_whitespace().collect())
        .unwrap_or_default();
    let comment = captures.name("comment").map(|m| m.as_str());
    Some(MoveLine {
        command,
        fields,
        comment,
        eol,
    })
}

/// Splits `X10.5` into `(Axis::X, "10.5")`. Non-axis fields (F, S, ...) give `None`.
pub fn axis_field(field: &str) -> Option<(Axis, &str)> {
    let axis = Axis::from_letter(*field.as_bytes().first()?)?;
    Some((axis, &field[1..]))
}

// finite numbers only
pub fn parse_coordinate(payload: &str) -> Option<Mm> {
    payload.parse::<Mm>().ok().filter(|v| v.is_finite())
}

impl MoveLine<'_> {
    /// Re-assembles the line from (possibly replaced) fields, single-space joined.
    pub fn render(&self, fields: &[String]) -> String {
        let mut line = String::from(self.command);
        for field in fields {
            line.push(' ');
            line.push_str(field);
        }
        if let Some(comment) = self.comment {
            line.push(' ');
            line.push_str(comment);
        }
        line.push_str(self.eol);
        line
    }
}

pub fn retract(length: Mm, note: &str) -> String {
    format!("G1 E-{:.3} F{} ; {}\n", length, RETRACT_FEED_RATE, note)
}

pub fn unretract(length: Mm, note: &str) -> String {
    format!("G1 E{:.3} F{} ; {}\n", length, RETRACT_FEED_RATE, note)
}

pub fn fan_on(note: &str) -> String {
    format!("M106 S{} ; {}\n", FAN_FULL_SPEED, note)
}

pub fn fan_off(note: &str) -> String {
    format!("M107 ; {}\n", note)
}

pub fn travel_xy(x: Mm, y: Mm, note: &str) -> String {
    format!("G0 X{:.3} Y{:.3} ; {}\n", x, y, note)
}

pub fn travel_z(z: Mm, note: &str) -> String {
    format!("G0 Z{:.3} ; {}\n", z, note)
}

/// `G4 P<ms>`; the millisecond count is truncated, not rounded.
pub fn dwell(seconds: Seconds, note: &str) -> String {
    format!("G4 P{} ; {}\n", dwell_millis(seconds), note)
}

pub fn dwell_millis(seconds: Seconds) -> u64 {
    (seconds * 1000.0) as u64
}
