//! Layer-by-layer merge of the two toolpaths.
//!
//! Layers before `start_layer` come from the first toolpath alone. From
//! `start_layer` on, each layer of the first toolpath is followed by the same
//! layer of the (already offset) second toolpath, wrapped in the swap
//! sequence: retract, park at rest 1, dwell, fan on, return to where the
//! second toolpath starts, print, park at rest 2, dwell. Whichever toolpath
//! has more layers simply continues alone once the other runs out.
//!
//! Filament retraction is tracked across the whole run so that retracts and
//! unretracts strictly alternate and the run never ends retracted.

use tracing::{debug, info};

use crate::config::InterleavePolicy;
use crate::gcode::{self, axis_field, parse_coordinate, parse_move, Axis, Mm};
use crate::segment::Layer;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RetractionState {
    Retracted,
    #[default]
    Extended,
}

/// Where a layer's first moves put the head. Any axis may be missing.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct StartPosition {
    pub x: Option<Mm>,
    pub y: Option<Mm>,
    pub z: Option<Mm>,
}

impl StartPosition {
    pub fn is_complete(&self) -> bool {
        self.x.is_some() && self.y.is_some() && self.z.is_some()
    }

    pub fn xy(&self) -> Option<(Mm, Mm)> {
        Some((self.x?, self.y?))
    }
}

/// Single pass over the layer's move fields, keeping the first X, first Y and
/// first Z seen. Stops as soon as all three are known. Comments are never
/// looked at.
pub fn scan_start_position(layer: &Layer) -> StartPosition {
    let mut start = StartPosition::default();
    for line in &layer.lines {
        let Some(move_line) = parse_move(line) else {
            continue;
        };
        for field in move_line.fields {
            let Some((axis, payload)) = axis_field(field) else {
                continue;
            };
            let slot = match axis {
                Axis::X => &mut start.x,
                Axis::Y => &mut start.y,
                Axis::Z => &mut start.z,
                Axis::E => continue,
            };
            if slot.is_none() {
                *slot = parse_coordinate(payload);
            }
        }
        if start.is_complete() {
            break;
        }
    }
    start
}

/// One merge run. Owns the retraction state and the output being built.
pub struct InterleaveEngine<'a> {
    policy: &'a InterleavePolicy,
    retraction: RetractionState,
    output: Vec<String>,
    retract_count: usize,
}

impl<'a> InterleaveEngine<'a> {
    pub fn new(policy: &'a InterleavePolicy) -> InterleaveEngine<'a> {
        InterleaveEngine {
            policy,
            retraction: RetractionState::Extended,
            output: vec![],
            retract_count: 0,
        }
    }

    /// Merges `layers1` with `layers2_offset` and returns the merged lines, each
    /// terminated.
    pub fn run(mut self, layers1: &[Layer], layers2_offset: &[Layer]) -> Vec<String> {
        let len1 = layers1.len();
        let len2 = layers2_offset.len();
        let start = self.policy.start_layer.max(1);

        self.queue_line("; --- Combined G-code with alternating layers and fan control ---\n".to_string());
        self.queue_line(format!("; --- Interleaving starts from layer {} ---\n", start));

        for (i, layer) in layers1.iter().enumerate().take(start - 1) {
            self.queue_layer(layer, &format!("; --- Layer {} from Model 1 (Pre-interleave) ---\n", i + 1));
            // the last pre-interleave layer retracts if a second-toolpath layer follows the first
            // interleaved layer
            if self.retraction_enabled() && i + 1 >= start - 1 && i + 1 < len2 {
                self.retract("Retract filament before Model 2 (Pre-interleave)");
            }
        }

        for i in (start - 1)..len1.max(len2) {
            if let Some(layer) = layers1.get(i) {
                self.interleave_first(i, layer, i < len2);
            }
            if let Some(layer) = layers2_offset.get(i) {
                self.interleave_second(i, layer);
            }
        }

        if self.retraction == RetractionState::Retracted {
            self.unretract("Final unretract after last Model 2 layer");
        }

        info!(
            layers1 = len1,
            layers2 = len2,
            start_layer = start,
            retracts = self.retract_count,
            lines = self.output.len(),
            "interleaved toolpaths"
        );
        self.output
    }

    fn interleave_first(&mut self, i: usize, layer: &Layer, second_follows: bool) {
        debug!(layer = i + 1, second_follows, "first toolpath layer");
        self.unretract("Unretract filament for Model 1");
        if self.policy.fan_control {
            self.queue_line(gcode::fan_off("Turn off fan (Model 1)"));
        }
        self.queue_layer(layer, &format!("; --- Layer {} from Model 1 ---\n", i + 1));
        if self.retraction_enabled() && second_follows {
            self.retract("Retract filament before Model 2");
        }
    }

    fn interleave_second(&mut self, i: usize, layer: &Layer) {
        let policy = self.policy;
        let start = scan_start_position(layer);
        debug!(layer = i + 1, ?start, "second toolpath layer");

        if let Some((x, y)) = policy.rest1_position {
            self.queue_line(gcode::travel_xy(x, y, "Move to rest1 position (Model 2 travel)"));
            if gcode::dwell_millis(policy.rest1_time) > 0 {
                let note = format!("Dwell at rest1 position for {} seconds", policy.rest1_time);
                self.queue_line(gcode::dwell(policy.rest1_time, &note));
            }
        }

        if policy.fan_control {
            self.queue_line(gcode::fan_on("Turn on fan (Model 2)"));
        }

        if policy.rest1_position.is_some() {
            if let Some((x, y)) = start.xy() {
                if let Some(z) = start.z {
                    self.queue_line(gcode::travel_z(z, "Return Z from rest position (Model 2 travel)"));
                }
                self.queue_line(gcode::travel_xy(x, y, "Return X/Y from rest position (Model 2 travel)"));
            }
        }

        self.queue_layer(layer, &format!("; --- Layer {} from Model 2 (offset) ---\n", i + 1));

        if let Some((x, y)) = policy.rest2_position {
            self.queue_line(gcode::travel_xy(x, y, "Move to rest2 position (after Model 2 layer)"));
            if gcode::dwell_millis(policy.rest2_time) > 0 {
                if policy.fan_control {
                    self.queue_line(gcode::fan_off("Turn off fan during rest2_time (Model 2)"));
                }
                let note = format!("Dwell at rest2 position for {} seconds", policy.rest2_time);
                self.queue_line(gcode::dwell(policy.rest2_time, &note));
            }
        }
    }

    fn retraction_enabled(&self) -> bool {
        self.policy.retraction_length > 0.0
    }

    // Only transition into Retracted. No-op when already retracted or retraction is off.
    fn retract(&mut self, note: &str) {
        if !self.retraction_enabled() || self.retraction == RetractionState::Retracted {
            return;
        }
        self.queue_line(gcode::retract(self.policy.retraction_length, note));
        self.retraction = RetractionState::Retracted;
        self.retract_count += 1;
    }

    // Only transition into Extended. No-op unless currently retracted.
    fn unretract(&mut self, note: &str) {
        if self.retraction != RetractionState::Retracted {
            return;
        }
        self.queue_line(gcode::unretract(self.policy.retraction_length, note));
        self.retraction = RetractionState::Extended;
    }

    fn queue_layer(&mut self, layer: &Layer, annotation: &str) {
        for line in &layer.lines {
            self.queue_line(line.clone());
        }
        self.queue_line(annotation.to_string());
    }

    // An unterminated line (end of a source file) gets terminated before anything follows it.
    fn queue_line(&mut self, line: String) {
        if let Some(last) = self.output.last_mut() {
            if !last.ends_with('\n') {
                last.push('\n');
            }
        }
        self.output.push(line);
    }
}

/// Convenience wrapper: one engine run.
pub fn interleave(layers1: &[Layer], layers2_offset: &[Layer], policy: &InterleavePolicy) -> Vec<String> {
    InterleaveEngine::new(policy).run(layers1, layers2_offset)
}
