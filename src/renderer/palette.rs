//! Square colour gradient
//!
//! Squares are coloured by walking a fixed seven-entry table with their
//! payload. The same table and formula are emitted into the fragment shader;
//! the CPU copy is used by tests and by anything that needs to preview a
//! colour without a GPU.

/// Gradient stops, lowest payload first
pub const GRADIENT: [[f32; 3]; 7] = [
    [1.0, 1.0, 0.0],    // yellow
    [0.0, 1.0, 0.0],    // green
    [0.0, 0.0, 1.0],    // blue
    [0.29, 0.0, 0.51],  // indigo
    [0.93, 0.51, 0.93], // violet
    [1.0, 0.0, 0.0],    // red
    [1.0, 0.5, 0.0],    // orange
];

/// Label colour drawn over squares
pub const LABEL: [f32; 3] = [0.0, 0.0, 0.0];

/// Ball and spawn marker colour
pub const BALL: [f32; 3] = [1.0, 1.0, 1.0];

/// Position along the table, in [0, 7]
pub fn gradient_position(payload: u32, max_payload: u32) -> f32 {
    let span = max_payload.saturating_sub(1).max(1) as f32;
    let t = (payload.saturating_sub(1) as f32 / span).min(1.0);
    GRADIENT.len() as f32 * t
}

/// Colour of a square with `payload`; blends neighbouring stops, clamping at the last
pub fn square_color(payload: u32, max_payload: u32) -> [f32; 3] {
    let r = gradient_position(payload, max_payload);
    let last = GRADIENT.len() - 1;
    let i0 = (r.floor() as usize).min(last);
    let i1 = (i0 + 1).min(last);
    let f = r - r.floor();
    let (a, b) = (GRADIENT[i0], GRADIENT[i1]);
    [
        a[0] + (b[0] - a[0]) * f,
        a[1] + (b[1] - a[1]) * f,
        a[2] + (b[2] - a[2]) * f,
    ]
}
