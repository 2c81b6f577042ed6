use tracing::warn;

use crate::gcode::{axis_field, parse_coordinate, parse_move, Axis, Factor, Mm};
use crate::segment::Layer;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisOffsets {
    pub x: Mm,
    pub y: Mm,
    pub z: Mm,
}

impl AxisOffsets {
    pub fn new(x: Mm, y: Mm, z: Mm) -> AxisOffsets {
        AxisOffsets { x, y, z }
    }
}

/// Offsets X/Y/Z and scales E on every `G0`/`G1` line of `layer`.
///
/// Other lines are copied untouched. A move line in which no field changed is
/// copied byte-for-byte, so its spacing and comment stay as they were.
pub fn transform(layer: &Layer, offsets: &AxisOffsets, extrusion_multiplier: Factor) -> Layer {
    let lines = layer
        .lines
        .iter()
        .map(|line| {
            transform_line(line, offsets, extrusion_multiplier).unwrap_or_else(|| line.clone())
        })
        .collect();
    Layer::new(layer.index, lines)
}

pub fn transform_layers(layers: &[Layer], offsets: &AxisOffsets, extrusion_multiplier: Factor) -> Vec<Layer> {
    layers
        .iter()
        .map(|layer| transform(layer, offsets, extrusion_multiplier))
        .collect()
}

/// `None` when the line is not a move or no field in it could be rewritten.
pub fn transform_line(line: &str, offsets: &AxisOffsets, extrusion_multiplier: Factor) -> Option<String> {
    let move_line = parse_move(line)?;
    let mut modified = false;
    let fields: Vec<String> = move_line
        .fields
        .iter()
        .map(|&field| {
            let Some((axis, payload)) = axis_field(field) else {
                return field.to_owned();
            };
            let Some(value) = parse_coordinate(payload) else {
                warn!(field, line = line.trim_end(), "unparsable axis value, leaving field unchanged");
                return field.to_owned();
            };
            modified = true;
            match axis {
                Axis::X => format!("X{:.3}", value + offsets.x),
                Axis::Y => format!("Y{:.3}", value + offsets.y),
                Axis::Z => format!("Z{:.3}", value + offsets.z),
                Axis::E => format!("E{:.5}", value * extrusion_multiplier),
            }
        })
        .collect();

    if !modified {
        return None;
    }
    Some(move_line.render(&fields))
}
