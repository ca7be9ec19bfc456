//! Procedural WGSL generation
//!
//! The shader is assembled from arena geometry, the numeric kind encoding and
//! (optionally) the digit glyph metrics. Generation is a pure function of its
//! inputs; `validate` runs the result through naga so a broken program is
//! reported with full diagnostics before any pipeline is created.
//!
//! Stages:
//! - vertex: world position to clip space, pass payload and kind through
//! - expansion: one instanced quad per entity, half extents picked by kind;
//!   invisible kinds collapse to a point
//! - coloring: gradient + digit label for squares, feathered disc for balls,
//!   nested square rings for spawn markers, nothing for everything else

use glam::Vec2;

use super::glyph_atlas::GlyphMetrics;
use super::palette;
use crate::error::ShaderError;
use crate::settings::{ArenaConfig, RenderConfig};
use crate::sim::EntityKind;

/// Label layout caps numbers at this many digits
pub const MAX_LABEL_DIGITS: u32 = 4;

/// Geometry and tuning baked into the generated source
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderParams {
    pub arena_width: f32,
    pub arena_height: f32,
    pub square_size: f32,
    pub ball_radius: f32,
    /// Spawn marker footprint relative to a square
    pub ball_spawn_rel_size: f32,
    /// Spawn marker quad half extent relative to a square's
    pub spawn_marker_extent: f32,
    pub ball_feather: f32,
    pub max_payload: u32,
}

impl ShaderParams {
    pub fn new(arena: &ArenaConfig, render: &RenderConfig) -> Self {
        Self {
            arena_width: arena.width(),
            arena_height: arena.height(),
            square_size: arena.square_size,
            ball_radius: arena.ball_radius,
            ball_spawn_rel_size: arena.ball_spawn_rel_size,
            spawn_marker_extent: render.spawn_marker_extent,
            ball_feather: render.ball_feather,
            max_payload: render.max_payload,
        }
    }
}

impl Default for ShaderParams {
    fn default() -> Self {
        Self::new(&ArenaConfig::default(), &RenderConfig::default())
    }
}

/// Digit metrics as the label code consumes them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelGlyphs {
    pub height: f32,
    pub glyphs: [GlyphMetrics; 10],
}

/// One digit of a laid-out label, relative to the square's center
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphBox {
    pub digit: u32,
    pub min: Vec2,
    pub size: Vec2,
}

impl LabelGlyphs {
    /// Decimal digits drawn for `payload`, most significant first
    pub fn digits(payload: u32) -> Vec<u32> {
        let mut n = payload.min(10u32.pow(MAX_LABEL_DIGITS) - 1);
        let mut digits = Vec::with_capacity(MAX_LABEL_DIGITS as usize);
        loop {
            digits.push(n % 10);
            n /= 10;
            if n == 0 {
                break;
            }
        }
        digits.reverse();
        digits
    }

    /// Label layout as `label_coverage` computes it on the GPU
    ///
    /// Digits sit on a shared baseline, the pen advancing left to right; the
    /// bounding box of all glyphs is then centered on the origin.
    pub fn layout(&self, payload: u32) -> Vec<GlyphBox> {
        let mut pen = 0.0;
        let mut boxes: Vec<GlyphBox> = Self::digits(payload)
            .into_iter()
            .map(|digit| {
                let g = &self.glyphs[digit as usize];
                let min = Vec2::new(pen + g.bearing_x, g.bearing_y - self.height);
                pen += g.advance;
                GlyphBox {
                    digit,
                    min,
                    size: Vec2::new(g.width as f32, self.height),
                }
            })
            .collect();

        let (lo, hi) = boxes.iter().fold(
            (Vec2::splat(f32::MAX), Vec2::splat(f32::MIN)),
            |(lo, hi), b| (lo.min(b.min), hi.max(b.min + b.size)),
        );
        let center = 0.5 * (lo + hi);
        for b in &mut boxes {
            b.min -= center;
        }
        boxes
    }

    /// Digit and atlas coordinate under `offset` from the square's center
    pub fn sample_at(&self, payload: u32, offset: Vec2) -> Option<(u32, Vec2)> {
        let b = self
            .layout(payload)
            .into_iter()
            .find(|b| offset.cmpge(b.min).all() && offset.cmplt(b.min + b.size).all())?;
        let f = (offset - b.min) / b.size;
        let [u0, v0, u1, v1] = self.glyphs[b.digit as usize].uv;
        Some((b.digit, Vec2::new(u0 + (u1 - u0) * f.x, v1 + (v0 - v1) * f.y)))
    }
}

/// WGSL float literal
fn float(v: f32) -> String {
    let s = format!("{v:?}");
    if s.contains(['.', 'e', 'E']) {
        s
    } else {
        format!("{s}.0")
    }
}

fn vec2(v: [f32; 2]) -> String {
    format!("vec2<f32>({}, {})", float(v[0]), float(v[1]))
}

fn vec3(v: [f32; 3]) -> String {
    format!("vec3<f32>({}, {}, {})", float(v[0]), float(v[1]), float(v[2]))
}

fn vec4(v: [f32; 4]) -> String {
    format!(
        "vec4<f32>({}, {}, {}, {})",
        float(v[0]),
        float(v[1]),
        float(v[2]),
        float(v[3])
    )
}

/// `var<private>` array initialized from `items`
fn private_array(name: &str, ty: &str, items: impl IntoIterator<Item = String>) -> String {
    let items: Vec<String> = items.into_iter().collect();
    format!(
        "var<private> {name}: array<{ty}, {n}> = array<{ty}, {n}>(\n    {}\n);\n",
        items.join(",\n    "),
        n = items.len()
    )
}

/// Constants shared by all stages
pub fn header(params: &ShaderParams) -> String {
    let mut src = String::new();
    for kind in EntityKind::ALL {
        src.push_str(&format!("const {}: u32 = {}u;\n", kind.shader_name(), kind.code()));
    }
    let square_half = 0.5 * params.square_size;
    src.push_str(&format!(
        "\nconst ARENA_SIZE: vec2<f32> = {};\n",
        vec2([params.arena_width, params.arena_height])
    ));
    src.push_str(&format!("const SQUARE_HALF: f32 = {};\n", float(square_half)));
    src.push_str(&format!(
        "const SPAWN_MARKER_HALF: f32 = {};\n",
        float(params.spawn_marker_extent * square_half)
    ));
    src.push_str(&format!("const BALL_HALF: f32 = {};\n", float(params.ball_radius)));
    src
}

/// Vertex stage: position to clip space
pub fn vertex_stage() -> String {
    r#"
struct Instance {
    @location(0) position: vec2<f32>,
    @location(1) payload: u32,
    @location(2) kind: u32,
}

struct Expanded {
    @builtin(position) clip: vec4<f32>,
    @location(0) world: vec2<f32>,
    @location(1) @interpolate(flat) origin: vec2<f32>,
    @location(2) @interpolate(flat) payload: u32,
    @location(3) @interpolate(flat) kind: u32,
}

fn to_clip(world: vec2<f32>) -> vec4<f32> {
    let ndc = 2.0 * world / ARENA_SIZE - vec2<f32>(1.0, 1.0);
    return vec4<f32>(ndc, 0.0, 1.0);
}
"#
    .to_string()
}

/// Expansion stage: corner `vertex_index` of the entity's quad
pub fn expansion_stage() -> String {
    let corners = [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]];
    let mut src = private_array("CORNERS", "vec2<f32>", corners.map(vec2));
    src.push_str(
        r#"
fn half_extent(kind: u32) -> f32 {
    if kind == KIND_ACTIVE_CELL {
        return SQUARE_HALF;
    } else if kind == KIND_SPAWN_MARKER {
        return SPAWN_MARKER_HALF;
    } else if kind == KIND_ACTIVE_BALL {
        return BALL_HALF;
    }
    return 0.0;
}

@vertex
fn vs_main(@builtin(vertex_index) corner: u32, instance: Instance) -> Expanded {
    let world = instance.position + half_extent(instance.kind) * CORNERS[corner & 3u];
    var out: Expanded;
    out.clip = to_clip(world);
    out.world = world;
    out.origin = instance.position;
    out.payload = instance.payload;
    out.kind = instance.kind;
    return out;
}
"#,
    );
    src
}

/// Glyph tables; zeroed with labels disabled when there is no atlas
fn glyph_tables(labels: Option<&LabelGlyphs>) -> String {
    let zero = GlyphMetrics::default();
    let (enabled, height, glyphs) = match labels {
        Some(l) => (true, l.height, l.glyphs),
        None => (false, 0.0, [zero; 10]),
    };
    let mut src = format!(
        "\nconst LABELS_ENABLED: bool = {enabled};\nconst MAX_LABEL_DIGITS: u32 = {MAX_LABEL_DIGITS}u;\nconst LABEL_MAX_VALUE: u32 = {}u;\nconst GLYPH_HEIGHT: f32 = {};\n",
        10u32.pow(MAX_LABEL_DIGITS) - 1,
        float(height)
    );
    src.push_str(&private_array(
        "GLYPH_WIDTH",
        "f32",
        glyphs.iter().map(|g| float(g.width as f32)),
    ));
    src.push_str(&private_array(
        "GLYPH_BEARING",
        "vec2<f32>",
        glyphs.iter().map(|g| vec2([g.bearing_x, g.bearing_y])),
    ));
    src.push_str(&private_array(
        "GLYPH_ADVANCE",
        "f32",
        glyphs.iter().map(|g| float(g.advance)),
    ));
    src.push_str(&private_array(
        "GLYPH_UV",
        "vec4<f32>",
        glyphs.iter().map(|g| vec4(g.uv)),
    ));
    src
}

/// Coloring stage
pub fn coloring_stage(params: &ShaderParams, labels: Option<&LabelGlyphs>) -> String {
    let size = params.ball_spawn_rel_size;
    let mut src = String::from(
        "\n@group(0) @binding(0) var glyph_atlas: texture_2d<f32>;\n@group(0) @binding(1) var glyph_sampler: sampler;\n\n",
    );
    let constants = [
        ("GRADIENT_LEN", "f32", float(palette::GRADIENT.len() as f32)),
        ("GRADIENT_LAST", "u32", format!("{}u", palette::GRADIENT.len() - 1)),
        (
            "PAYLOAD_SPAN",
            "f32",
            float(params.max_payload.saturating_sub(1).max(1) as f32),
        ),
        ("BALL_FEATHER", "f32", float(params.ball_feather)),
        ("MARKER_CORE", "f32", float(size - 0.3)),
        ("MARKER_RING_INNER", "f32", float(size - 0.1)),
        ("MARKER_RING_OUTER", "f32", float(size)),
        ("LABEL_COLOR", "vec3<f32>", vec3(palette::LABEL)),
        ("BALL_COLOR", "vec3<f32>", vec3(palette::BALL)),
    ];
    for (name, ty, value) in constants {
        src.push_str(&format!("const {name}: {ty} = {value};\n"));
    }
    src.push_str(&private_array(
        "GRADIENT",
        "vec3<f32>",
        palette::GRADIENT.map(vec3),
    ));
    src.push_str(&glyph_tables(labels));
    src.push_str(
        r#"
fn square_color(payload: u32) -> vec3<f32> {
    let t = min(1.0, f32(max(payload, 1u) - 1u) / PAYLOAD_SPAN);
    let r = GRADIENT_LEN * t;
    let i0 = min(u32(floor(r)), GRADIENT_LAST);
    let i1 = min(i0 + 1u, GRADIENT_LAST);
    return mix(GRADIENT[i0], GRADIENT[i1], r - floor(r));
}

// Lower-left corner of digit `d` at pen position `pen`, baseline at y = 0
fn glyph_min(d: u32, pen: f32) -> vec2<f32> {
    return vec2<f32>(pen + GLYPH_BEARING[d].x, GLYPH_BEARING[d].y - GLYPH_HEIGHT);
}

fn label_coverage(world: vec2<f32>, origin: vec2<f32>, payload: u32) -> f32 {
    if !LABELS_ENABLED {
        return 0.0;
    }

    // Least significant digit first
    var digits: array<u32, MAX_LABEL_DIGITS>;
    var n = min(payload, LABEL_MAX_VALUE);
    var count = 0u;
    loop {
        digits[count] = n % 10u;
        n = n / 10u;
        count = count + 1u;
        if n == 0u || count == MAX_LABEL_DIGITS {
            break;
        }
    }

    var pen = 0.0;
    var bmin = vec2<f32>(3.0e38, 3.0e38);
    var bmax = vec2<f32>(-3.0e38, -3.0e38);
    for (var k = 0u; k < count; k = k + 1u) {
        let d = digits[count - 1u - k];
        let lo = glyph_min(d, pen);
        bmin = min(bmin, lo);
        bmax = max(bmax, lo + vec2<f32>(GLYPH_WIDTH[d], GLYPH_HEIGHT));
        pen = pen + GLYPH_ADVANCE[d];
    }

    let local = world - (origin - 0.5 * (bmin + bmax));
    pen = 0.0;
    for (var k = 0u; k < count; k = k + 1u) {
        let d = digits[count - 1u - k];
        let lo = glyph_min(d, pen);
        let size = vec2<f32>(GLYPH_WIDTH[d], GLYPH_HEIGHT);
        if all(local >= lo) && all(local < lo + size) {
            let f = (local - lo) / size;
            let uv = GLYPH_UV[d];
            let tex = vec2<f32>(mix(uv.x, uv.z, f.x), mix(uv.w, uv.y, f.y));
            return textureSampleLevel(glyph_atlas, glyph_sampler, tex, 0.0).r;
        }
        pen = pen + GLYPH_ADVANCE[d];
    }
    return 0.0;
}

fn ball_alpha(world: vec2<f32>, origin: vec2<f32>) -> f32 {
    let r = length(world - origin) / BALL_HALF;
    return 1.0 - clamp((r - BALL_FEATHER) / (1.0 - BALL_FEATHER), 0.0, 1.0);
}

fn spawn_marker_alpha(world: vec2<f32>, origin: vec2<f32>) -> f32 {
    let d = abs(world - origin) / SQUARE_HALF;
    let q = max(d.x, d.y);
    if q < MARKER_CORE || (q > MARKER_RING_INNER && q < MARKER_RING_OUTER) {
        return 1.0;
    }
    return 0.0;
}

@fragment
fn fs_main(frag: Expanded) -> @location(0) vec4<f32> {
    if frag.kind == KIND_ACTIVE_CELL {
        let base = square_color(frag.payload);
        let coverage = label_coverage(frag.world, frag.origin, frag.payload);
        return vec4<f32>(mix(base, LABEL_COLOR, coverage), 1.0);
    } else if frag.kind == KIND_ACTIVE_BALL {
        return vec4<f32>(BALL_COLOR, ball_alpha(frag.world, frag.origin));
    } else if frag.kind == KIND_SPAWN_MARKER {
        return vec4<f32>(BALL_COLOR, spawn_marker_alpha(frag.world, frag.origin));
    }
    return vec4<f32>(0.0, 0.0, 0.0, 0.0);
}
"#,
    );
    src
}

/// Full shader source
pub fn generate(params: &ShaderParams, labels: Option<&LabelGlyphs>) -> String {
    let mut src = String::from("// Generated arena shader\n\n");
    src.push_str(&header(params));
    src.push_str(&vertex_stage());
    src.push_str(&expansion_stage());
    src.push_str(&coloring_stage(params, labels));
    src
}

/// Parse and validate WGSL, returning naga's diagnostics on failure
pub fn validate(source: &str) -> Result<naga::Module, ShaderError> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| ShaderError::Parse(e.emit_to_string(source)))?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::empty(),
    )
    .validate(&module)
    .map_err(|e| ShaderError::Validation(e.emit_to_string(source)))?;
    Ok(module)
}
