//! Built-in fragment stages and their permanent IDs
//!
//! IDs here are persisted in pipeline keys; never renumber or reuse one.

use super::blend::BlendModeSet;
use super::fragment_stage::{ExpressionGenerator, FragmentStage, ReqFlags, Sampler, StageArgs, Uniform};
use super::pipeline::{FragmentEmitter, FragmentNode};
use super::shader_var::SlType;
use super::stage_registry::FIRST_FIXED_BLEND_STAGE_ID;

/// Stable IDs of the built-in stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum BuiltinStageId {
    Error = 0,
    Passthrough = 1,
    SolidColorShader = 2,
    RgbOpaquePaintColor = 3,
    AlphaOnlyPaintColor = 4,
    LinearGradientShader4 = 5,
    LinearGradientShader8 = 6,
    RadialGradientShader4 = 7,
    RadialGradientShader8 = 8,
    AngularGradientShader4 = 9,
    AngularGradientShader8 = 10,
    LocalMatrixShader = 16,
    ImageShader = 17,
    CubicImageShader = 18,
    HwImageShader = 19,
    AnalyticRRectShader = 20,
    DitherShader = 21,
    ColorSpaceXformColorFilter = 22,
    /// Children: src, dst, blender
    Blend = 23,
    BlendModeBlender = 24,
    PorterDuffBlender = 25,
    PrimitiveColor = 26,
    /// Children: inner, outer
    Compose = 27,
}

impl BuiltinStageId {
    /// Numeric ID
    pub const fn id(self) -> u32 {
        self as u32
    }
}

/// First stage registered outside the built-in table
pub const MIPMAP_BLUR_STAGE_ID: u32 = 128;

/// Shared by every gradient stage
pub static GRADIENT_LIBRARY: &str = "\
float tile_grad(int tileMode, float t) {
    if (tileMode == 1) { return fract(t); }
    if (tileMode == 2) { float m = mod(t, 2.0); return m > 1.0 ? 2.0 - m : m; }
    return clamp(t, 0.0, 1.0);
}
";

macro_rules! gradient_functions {
    ($colorize:ident, $linear:ident, $radial:ident, $angular:ident, $n:literal) => {
        static $colorize: &str = concat!(
            "vec4 colorize_grad_", $n, "(vec4 colors[", $n, "], float offsets[", $n, "], float t) {\n",
            "    if (t <= offsets[0]) { return colors[0]; }\n",
            "    for (int i = 1; i < ", $n, "; ++i) {\n",
            "        if (t <= offsets[i]) {\n",
            "            float f = (t - offsets[i - 1]) / max(offsets[i] - offsets[i - 1], 1e-5);\n",
            "            return mix(colors[i - 1], colors[i], f);\n",
            "        }\n",
            "    }\n",
            "    return colors[", $n, " - 1];\n",
            "}\n",
        );
        static $linear: &str = concat!(
            "vec4 sk_linear_grad_", $n, "_shader(vec2 coords, vec4 colors[", $n, "], float offsets[", $n, "], ",
            "vec2 point0, vec2 point1, int tileMode) {\n",
            "    vec2 delta = point1 - point0;\n",
            "    float t = dot(coords - point0, delta) / max(dot(delta, delta), 1e-5);\n",
            "    return colorize_grad_", $n, "(colors, offsets, tile_grad(tileMode, t));\n",
            "}\n",
        );
        static $radial: &str = concat!(
            "vec4 sk_radial_grad_", $n, "_shader(vec2 coords, vec4 colors[", $n, "], float offsets[", $n, "], ",
            "vec2 center, float radius, int tileMode) {\n",
            "    float t = length(coords - center) / max(radius, 1e-5);\n",
            "    return colorize_grad_", $n, "(colors, offsets, tile_grad(tileMode, t));\n",
            "}\n",
        );
        static $angular: &str = concat!(
            "vec4 sk_angular_grad_", $n, "_shader(vec2 coords, vec4 colors[", $n, "], float offsets[", $n, "], ",
            "vec2 center, float bias, float scale, int tileMode) {\n",
            "    vec2 d = coords - center;\n",
            "    float t = (atan(-d.y, -d.x) * 0.1591549430918953 + 0.5 + bias) * scale;\n",
            "    return colorize_grad_", $n, "(colors, offsets, tile_grad(tileMode, t));\n",
            "}\n",
        );
    };
}

gradient_functions!(COLORIZE_4, LINEAR_GRAD_4, RADIAL_GRAD_4, ANGULAR_GRAD_4, 4);
gradient_functions!(COLORIZE_8, LINEAR_GRAD_8, RADIAL_GRAD_8, ANGULAR_GRAD_8, 8);

static IMAGE_SHADER: &str = "\
vec4 sk_image_shader(vec2 coords, vec2 invImgSize, vec4 subset, sampler2D s) {
    return texture(s, clamp(coords, subset.xy, subset.zw) * invImgSize);
}
";

static CUBIC_IMAGE_SHADER: &str = "\
vec4 sk_cubic_image_shader(vec2 coords, vec2 invImgSize, vec4 subset, mat4 coeffs, sampler2D s) {
    vec2 pos = clamp(coords, subset.xy, subset.zw) - 0.5;
    vec2 f = fract(pos);
    pos -= f;
    vec4 wx = coeffs * vec4(1.0, f.x, f.x * f.x, f.x * f.x * f.x);
    vec4 wy = coeffs * vec4(1.0, f.y, f.y * f.y, f.y * f.y * f.y);
    vec4 color = vec4(0.0);
    for (int y = 0; y < 4; ++y) {
        vec4 row = vec4(0.0);
        for (int x = 0; x < 4; ++x) {
            row += wx[x] * texture(s, (pos + vec2(float(x) - 0.5, float(y) - 0.5)) * invImgSize);
        }
        color += wy[y] * row;
    }
    return color;
}
";

static ANALYTIC_RRECT: &str = "\
float sk_analytic_rrect_coverage(vec2 coords, vec4 rect, float radius) {
    vec2 center = (rect.xy + rect.zw) * 0.5;
    vec2 halfSize = (rect.zw - rect.xy) * 0.5;
    vec2 q = abs(coords - center) - halfSize + radius;
    float dist = length(max(q, 0.0)) + min(max(q.x, q.y), 0.0) - radius;
    return clamp(0.5 - dist, 0.0, 1.0);
}
";

static DITHER: &str = "\
float sk_dither_value(vec2 fragCoord) {
    return fract(sin(dot(fragCoord, vec2(12.9898, 78.233))) * 43758.5453) - 0.5;
}
";

static COLOR_SPACE_XFORM: &str = "\
vec4 sk_color_space_transform(vec4 color, int flags, mat3 gamut) {
    if ((flags & 1) != 0 && color.a > 0.0) { color.rgb /= color.a; }
    if ((flags & 2) != 0) { color.rgb = gamut * color.rgb; }
    if ((flags & 4) != 0) { color.rgb *= color.a; }
    return color;
}
";

/// `blend(mode, src, dst)` for every blend mode ordinal
pub static BLEND_LIBRARY: &str = "\
const vec4 PD_COEFFS[13] = vec4[13](
    vec4(0, 0, 0, 0), vec4(1, 0, 0, 0), vec4(0, 1, 0, 0), vec4(1, 1, 0, -1),
    vec4(1, 1, -1, 0), vec4(0, 0, 1, 0), vec4(0, 0, 0, 1), vec4(1, 0, -1, 0),
    vec4(0, 1, 0, -1), vec4(0, 1, 1, -1), vec4(1, 0, -1, 1), vec4(1, 1, -1, -1),
    vec4(1, 1, 0, 0));

vec4 blend_porter_duff(vec4 k, vec4 src, vec4 dst) {
    return src * (k.x + k.z * dst.a) + dst * (k.y + k.w * src.a);
}

float blend_luminance(vec3 c) { return dot(c, vec3(0.3, 0.59, 0.11)); }

float blend_saturation(vec3 c) { return max(max(c.r, c.g), c.b) - min(min(c.r, c.g), c.b); }

vec3 blend_set_luminance(vec3 c, float l) {
    c += l - blend_luminance(c);
    float lum = blend_luminance(c);
    float lo = min(min(c.r, c.g), c.b);
    float hi = max(max(c.r, c.g), c.b);
    if (lo < 0.0) { c = lum + (c - lum) * lum / max(lum - lo, 1e-5); }
    if (hi > 1.0) { c = lum + (c - lum) * (1.0 - lum) / max(hi - lum, 1e-5); }
    return c;
}

vec3 blend_set_saturation(vec3 c, float s) {
    float sat = blend_saturation(c);
    return sat > 0.0 ? (c - min(min(c.r, c.g), c.b)) * s / sat : vec3(0.0);
}

float blend_channel(int mode, float s, float d) {
    switch (mode) {
        case 17: return s * d;
        case 18: return s + d - s * d;
        case 19: return d <= 0.5 ? 2.0 * s * d : 1.0 - 2.0 * (1.0 - s) * (1.0 - d);
        case 20: return min(s, d);
        case 21: return max(s, d);
        case 22: return d <= 0.0 ? 0.0 : (s >= 1.0 ? 1.0 : min(1.0, d / (1.0 - s)));
        case 23: return d >= 1.0 ? 1.0 : (s <= 0.0 ? 0.0 : 1.0 - min(1.0, (1.0 - d) / s));
        case 24: return s <= 0.5 ? 2.0 * s * d : 1.0 - 2.0 * (1.0 - s) * (1.0 - d);
        case 25: return s <= 0.5
            ? d - (1.0 - 2.0 * s) * d * (1.0 - d)
            : d + (2.0 * s - 1.0) * ((d <= 0.25 ? ((16.0 * d - 12.0) * d + 4.0) * d : sqrt(d)) - d);
        case 26: return abs(s - d);
        case 27: return s + d - 2.0 * s * d;
        case 28: return max(d - s, 0.0);
        case 29: return s <= 0.0 ? 1.0 : min(d / s, 1.0);
        case 30: return min(s + d, 1.0);
        case 31: return max(s + d - 1.0, 0.0);
        case 32: return s <= 0.5
            ? (s <= 0.0 ? 0.0 : max(1.0 - (1.0 - d) / (2.0 * s), 0.0))
            : (s >= 1.0 ? 1.0 : min(d / (2.0 * (1.0 - s)), 1.0));
        case 33: return clamp(d + 2.0 * s - 1.0, 0.0, 1.0);
        case 34: return s <= 0.5 ? min(d, 2.0 * s) : max(d, 2.0 * s - 1.0);
        case 35: return s + d >= 1.0 ? 1.0 : 0.0;
    }
    return s;
}

vec3 blend_non_separable(int mode, vec3 s, vec3 d) {
    switch (mode) {
        case 36: return blend_luminance(s) < blend_luminance(d) ? s : d;
        case 37: return blend_luminance(s) > blend_luminance(d) ? s : d;
        case 38: return blend_set_luminance(blend_set_saturation(s, blend_saturation(d)), blend_luminance(d));
        case 39: return blend_set_luminance(blend_set_saturation(d, blend_saturation(s)), blend_luminance(d));
        case 40: return blend_set_luminance(s, blend_luminance(d));
        case 41: return blend_set_luminance(d, blend_luminance(s));
    }
    return s;
}

vec4 blend(int mode, vec4 src, vec4 dst) {
    if (mode <= 12) { return blend_porter_duff(PD_COEFFS[mode], src, dst); }
    float a = src.a + (1.0 - src.a) * dst.a;
    switch (mode) {
        case 13: return min(src + dst, vec4(1.0));
        case 14: return vec4(dst.rgb - src.rgb, a);
        case 15: return vec4(max(dst.rgb - src.rgb, 0.0), a);
        case 16: return src * dst;
    }
    vec3 s = src.a > 0.0 ? src.rgb / src.a : vec3(0.0);
    vec3 d = dst.a > 0.0 ? dst.rgb / dst.a : vec3(0.0);
    vec3 b = mode >= 36
        ? blend_non_separable(mode, s, d)
        : vec3(blend_channel(mode, s.r, d.r), blend_channel(mode, s.g, d.g), blend_channel(mode, s.b, d.b));
    vec3 rgb = (1.0 - dst.a) * src.rgb + (1.0 - src.a) * dst.rgb + src.a * dst.a * b;
    return vec4(rgb, a);
}
";

/// Assign `output = function(leading..., uniforms..., samplers...)`
fn emit_static_call(emitter: &mut FragmentEmitter, node: &FragmentNode<'_>, args: &StageArgs<'_>, leading: &[&str]) {
    let stage = node.stage();
    let Some(function) = stage.static_function_name else {
        log::warn!("[PIPELINE] Stage {} has no function to call", stage.name);
        emitter.line(&format!("{} = vec4(1.0, 0.0, 1.0, 1.0);", args.output));
        return;
    };
    let mut params: Vec<String> = leading.iter().map(|s| (*s).to_string()).collect();
    params.extend(stage.uniforms.iter().map(|u| emitter.uniform(node, u.name)));
    params.extend(stage.samplers.iter().map(|s| emitter.uniform(node, s.name)));
    emitter.line(&format!("{} = {}({});", args.output, function, params.join(", ")));
}

fn error_expression(emitter: &mut FragmentEmitter, _: &FragmentNode<'_>, args: &StageArgs<'_>) {
    emitter.line(&format!("{} = vec4(1.0, 0.0, 1.0, 1.0);", args.output));
}

fn passthrough_expression(emitter: &mut FragmentEmitter, _: &FragmentNode<'_>, args: &StageArgs<'_>) {
    emitter.line(&format!("{} = {};", args.output, args.prior_stage_output));
}

fn solid_color_expression(emitter: &mut FragmentEmitter, node: &FragmentNode<'_>, args: &StageArgs<'_>) {
    let color = emitter.uniform(node, "color");
    emitter.line(&format!("{} = {color};", args.output));
}

fn rgb_opaque_expression(emitter: &mut FragmentEmitter, node: &FragmentNode<'_>, args: &StageArgs<'_>) {
    let color = emitter.uniform(node, "paintColor");
    emitter.line(&format!("{} = vec4({color}.rgb, 1.0);", args.output));
}

fn alpha_only_expression(emitter: &mut FragmentEmitter, node: &FragmentNode<'_>, args: &StageArgs<'_>) {
    let color = emitter.uniform(node, "paintColor");
    emitter.line(&format!("{} = vec4(0.0, 0.0, 0.0, {color}.a);", args.output));
}

fn local_coords_call(emitter: &mut FragmentEmitter, node: &FragmentNode<'_>, args: &StageArgs<'_>) {
    emit_static_call(emitter, node, args, &[args.local_coords]);
}

fn prior_output_call(emitter: &mut FragmentEmitter, node: &FragmentNode<'_>, args: &StageArgs<'_>) {
    emit_static_call(emitter, node, args, &[args.prior_stage_output]);
}

fn local_matrix_expression(emitter: &mut FragmentEmitter, node: &FragmentNode<'_>, args: &StageArgs<'_>) {
    let matrix = emitter.uniform(node, "localMatrix");
    let coords = format!("coords_{}", node.stage_index());
    emitter.line(&format!("vec2 {coords} = ({matrix} * vec3({}, 1.0)).xy;", args.local_coords));
    let child_args = StageArgs { local_coords: &coords, ..*args };
    let child = emitter.emit_child(node, 0, &child_args);
    emitter.line(&format!("{} = {child};", args.output));
}

fn hw_image_expression(emitter: &mut FragmentEmitter, node: &FragmentNode<'_>, args: &StageArgs<'_>) {
    let inv_size = emitter.uniform(node, "invImgSize");
    let image = emitter.uniform(node, "image");
    emitter.line(&format!("{} = texture({image}, {} * {inv_size});", args.output, args.local_coords));
}

fn analytic_rrect_expression(emitter: &mut FragmentEmitter, node: &FragmentNode<'_>, args: &StageArgs<'_>) {
    let rect = emitter.uniform(node, "rect");
    let radius = emitter.uniform(node, "radius");
    emitter.line(&format!(
        "{} = {} * sk_analytic_rrect_coverage({}, {rect}, {radius});",
        args.output, args.prior_stage_output, args.local_coords
    ));
}

fn dither_expression(emitter: &mut FragmentEmitter, node: &FragmentNode<'_>, args: &StageArgs<'_>) {
    let range = emitter.uniform(node, "range");
    let prior = args.prior_stage_output;
    emitter.line(&format!(
        "{} = vec4(clamp({prior}.rgb + sk_dither_value(gl_FragCoord.xy) * {range}, 0.0, {prior}.a), {prior}.a);",
        args.output
    ));
}

fn blend_expression(emitter: &mut FragmentEmitter, node: &FragmentNode<'_>, args: &StageArgs<'_>) {
    let src = emitter.emit_child(node, 0, args);
    let dst = emitter.emit_child(node, 1, args);
    let blender_args = StageArgs {
        prior_stage_output: &src,
        blender_dst_color: &dst,
        ..*args
    };
    let blended = emitter.emit_child(node, 2, &blender_args);
    emitter.line(&format!("{} = {blended};", args.output));
}

fn blend_mode_blender_expression(emitter: &mut FragmentEmitter, node: &FragmentNode<'_>, args: &StageArgs<'_>) {
    let mode = emitter.uniform(node, "blendMode");
    emitter.line(&format!(
        "{} = blend({mode}, {}, {});",
        args.output, args.prior_stage_output, args.blender_dst_color
    ));
}

fn porter_duff_blender_expression(emitter: &mut FragmentEmitter, node: &FragmentNode<'_>, args: &StageArgs<'_>) {
    let coeffs = emitter.uniform(node, "coeffs");
    emitter.line(&format!(
        "{} = blend_porter_duff({coeffs}, {}, {});",
        args.output, args.prior_stage_output, args.blender_dst_color
    ));
}

fn primitive_color_expression(emitter: &mut FragmentEmitter, _: &FragmentNode<'_>, args: &StageArgs<'_>) {
    emitter.line(&format!("{} = primitiveColor;", args.output));
}

fn compose_expression(emitter: &mut FragmentEmitter, node: &FragmentNode<'_>, args: &StageArgs<'_>) {
    let inner = emitter.emit_child(node, 0, args);
    let outer_args = StageArgs {
        prior_stage_output: &inner,
        ..*args
    };
    let outer = emitter.emit_child(node, 1, &outer_args);
    emitter.line(&format!("{} = {outer};", args.output));
}

fn fixed_blend_expression(emitter: &mut FragmentEmitter, node: &FragmentNode<'_>, args: &StageArgs<'_>) {
    let ordinal = node.stage_id() - FIRST_FIXED_BLEND_STAGE_ID;
    emitter.line(&format!(
        "{} = blend({ordinal}, {}, {});",
        args.output, args.prior_stage_output, args.blender_dst_color
    ));
}

fn mipmap_blur_expression(emitter: &mut FragmentEmitter, node: &FragmentNode<'_>, args: &StageArgs<'_>) {
    let inv_size = emitter.uniform(node, "invImgSize");
    let lod = emitter.uniform(node, "lod");
    let image = emitter.uniform(node, "image");
    emitter.line(&format!(
        "{} = textureLod({image}, {} * {inv_size}, {lod});",
        args.output, args.local_coords
    ));
}

/// Uniforms shared by every gradient stage, in declaration order
fn gradient_uniforms(stops: u32, geometry: &[Uniform]) -> Vec<Uniform> {
    let mut uniforms = vec![
        Uniform::array(SlType::Float4, "colors", stops),
        Uniform::array(SlType::Float, "offsets", stops),
    ];
    uniforms.extend_from_slice(geometry);
    uniforms.push(Uniform::new(SlType::Int, "tileMode"));
    uniforms
}

const LINEAR_GEOMETRY: [Uniform; 2] = [
    Uniform::new(SlType::Float2, "point0"),
    Uniform::new(SlType::Float2, "point1"),
];

const RADIAL_GEOMETRY: [Uniform; 2] = [
    Uniform::new(SlType::Float2, "center"),
    Uniform::new(SlType::Float, "radius"),
];

const ANGULAR_GEOMETRY: [Uniform; 3] = [
    Uniform::new(SlType::Float2, "center"),
    Uniform::new(SlType::Float, "bias"),
    Uniform::new(SlType::Float, "scale"),
];

fn gradient_stage(
    name: &'static str,
    function: &'static str,
    helpers: &[&'static str],
    stops: u32,
    geometry: &[Uniform],
) -> FragmentStage {
    FragmentStage::new(name, ReqFlags::LOCAL_COORDS, local_coords_call as ExpressionGenerator)
        .with_function(function, helpers)
        .with_uniforms(&gradient_uniforms(stops, geometry))
}

/// Every built-in stage with its ID, in ID order
pub fn builtin_stages() -> Vec<(u32, FragmentStage)> {
    use BuiltinStageId as Id;

    let image_uniforms = [
        Uniform::new(SlType::Float2, "invImgSize"),
        Uniform::new(SlType::Float4, "subset"),
    ];
    let image_sampler = [Sampler::new(SlType::Sampler2D, "image")];

    vec![
        (Id::Error.id(), FragmentStage::new("Error", ReqFlags::NONE, error_expression)),
        (
            Id::Passthrough.id(),
            FragmentStage::new("Passthrough", ReqFlags::PRIOR_STAGE_OUTPUT, passthrough_expression),
        ),
        (
            Id::SolidColorShader.id(),
            FragmentStage::new("SolidColor", ReqFlags::NONE, solid_color_expression)
                .with_uniforms(&[Uniform::new(SlType::Float4, "color")]),
        ),
        (
            Id::RgbOpaquePaintColor.id(),
            FragmentStage::new("RGBOpaquePaintColor", ReqFlags::NONE, rgb_opaque_expression)
                .with_uniforms(&[Uniform::new(SlType::Float4, "paintColor")]),
        ),
        (
            Id::AlphaOnlyPaintColor.id(),
            FragmentStage::new("AlphaOnlyPaintColor", ReqFlags::NONE, alpha_only_expression)
                .with_uniforms(&[Uniform::new(SlType::Float4, "paintColor")]),
        ),
        (
            Id::LinearGradientShader4.id(),
            gradient_stage(
                "LinearGradient4",
                "sk_linear_grad_4_shader",
                &[GRADIENT_LIBRARY, COLORIZE_4, LINEAR_GRAD_4],
                4,
                &LINEAR_GEOMETRY,
            ),
        ),
        (
            Id::LinearGradientShader8.id(),
            gradient_stage(
                "LinearGradient8",
                "sk_linear_grad_8_shader",
                &[GRADIENT_LIBRARY, COLORIZE_8, LINEAR_GRAD_8],
                8,
                &LINEAR_GEOMETRY,
            ),
        ),
        (
            Id::RadialGradientShader4.id(),
            gradient_stage(
                "RadialGradient4",
                "sk_radial_grad_4_shader",
                &[GRADIENT_LIBRARY, COLORIZE_4, RADIAL_GRAD_4],
                4,
                &RADIAL_GEOMETRY,
            ),
        ),
        (
            Id::RadialGradientShader8.id(),
            gradient_stage(
                "RadialGradient8",
                "sk_radial_grad_8_shader",
                &[GRADIENT_LIBRARY, COLORIZE_8, RADIAL_GRAD_8],
                8,
                &RADIAL_GEOMETRY,
            ),
        ),
        (
            Id::AngularGradientShader4.id(),
            gradient_stage(
                "AngularGradient4",
                "sk_angular_grad_4_shader",
                &[GRADIENT_LIBRARY, COLORIZE_4, ANGULAR_GRAD_4],
                4,
                &ANGULAR_GEOMETRY,
            ),
        ),
        (
            Id::AngularGradientShader8.id(),
            gradient_stage(
                "AngularGradient8",
                "sk_angular_grad_8_shader",
                &[GRADIENT_LIBRARY, COLORIZE_8, ANGULAR_GRAD_8],
                8,
                &ANGULAR_GEOMETRY,
            ),
        ),
        (
            Id::LocalMatrixShader.id(),
            FragmentStage::new("LocalMatrix", ReqFlags::LOCAL_COORDS, local_matrix_expression)
                .with_uniforms(&[Uniform::new(SlType::Float3x3, "localMatrix")])
                .with_children(1),
        ),
        (
            Id::ImageShader.id(),
            FragmentStage::new("Image", ReqFlags::LOCAL_COORDS, local_coords_call)
                .with_function("sk_image_shader", &[IMAGE_SHADER])
                .with_uniforms(&image_uniforms)
                .with_samplers(&image_sampler),
        ),
        (
            Id::CubicImageShader.id(),
            FragmentStage::new("CubicImage", ReqFlags::LOCAL_COORDS, local_coords_call)
                .with_function("sk_cubic_image_shader", &[CUBIC_IMAGE_SHADER])
                .with_uniforms(&[
                    image_uniforms[0],
                    image_uniforms[1],
                    Uniform::new(SlType::Float4x4, "cubicCoeffs"),
                ])
                .with_samplers(&image_sampler),
        ),
        (
            Id::HwImageShader.id(),
            FragmentStage::new("HardwareImage", ReqFlags::LOCAL_COORDS, hw_image_expression)
                .with_uniforms(&[Uniform::new(SlType::Float2, "invImgSize")])
                .with_samplers(&image_sampler),
        ),
        (
            Id::AnalyticRRectShader.id(),
            FragmentStage::new(
                "AnalyticRRect",
                ReqFlags::LOCAL_COORDS | ReqFlags::PRIOR_STAGE_OUTPUT,
                analytic_rrect_expression,
            )
            .with_function("sk_analytic_rrect_coverage", &[ANALYTIC_RRECT])
            .with_uniforms(&[Uniform::new(SlType::Float4, "rect"), Uniform::new(SlType::Float, "radius")]),
        ),
        (
            Id::DitherShader.id(),
            FragmentStage::new("Dither", ReqFlags::PRIOR_STAGE_OUTPUT, dither_expression)
                .with_function("sk_dither_value", &[DITHER])
                .with_uniforms(&[Uniform::new(SlType::Float, "range")]),
        ),
        (
            Id::ColorSpaceXformColorFilter.id(),
            FragmentStage::new("ColorSpaceTransform", ReqFlags::PRIOR_STAGE_OUTPUT, prior_output_call)
                .with_function("sk_color_space_transform", &[COLOR_SPACE_XFORM])
                .with_uniforms(&[Uniform::new(SlType::Int, "flags"), Uniform::new(SlType::Float3x3, "gamut")]),
        ),
        (
            Id::Blend.id(),
            FragmentStage::new("Blend", ReqFlags::NONE, blend_expression).with_children(3),
        ),
        (
            Id::BlendModeBlender.id(),
            FragmentStage::new(
                "BlendModeBlender",
                ReqFlags::PRIOR_STAGE_OUTPUT | ReqFlags::BLENDER_DST_COLOR,
                blend_mode_blender_expression,
            )
            .with_function("blend", &[BLEND_LIBRARY])
            .with_uniforms(&[Uniform::new(SlType::Int, "blendMode")]),
        ),
        (
            Id::PorterDuffBlender.id(),
            FragmentStage::new(
                "PorterDuffBlender",
                ReqFlags::PRIOR_STAGE_OUTPUT | ReqFlags::BLENDER_DST_COLOR,
                porter_duff_blender_expression,
            )
            .with_function("blend_porter_duff", &[BLEND_LIBRARY])
            .with_uniforms(&[Uniform::new(SlType::Float4, "coeffs")]),
        ),
        (
            Id::PrimitiveColor.id(),
            FragmentStage::new("PrimitiveColor", ReqFlags::PRIMITIVE_COLOR, primitive_color_expression),
        ),
        (
            Id::Compose.id(),
            FragmentStage::new("Compose", ReqFlags::NONE, compose_expression).with_children(2),
        ),
    ]
}

/// Stage applying `mode` with the shared blend library
pub fn fixed_blend_stage<B: BlendModeSet>(mode: B) -> FragmentStage {
    FragmentStage::new(
        format!("FixedBlend_{}", mode.name()),
        ReqFlags::PRIOR_STAGE_OUTPUT | ReqFlags::BLENDER_DST_COLOR,
        fixed_blend_expression,
    )
    .with_function("blend", &[BLEND_LIBRARY])
}

/// Single-pass blur sampling a mip chain
pub fn mipmap_blur_stage() -> FragmentStage {
    FragmentStage::new("MipmapBlur", ReqFlags::LOCAL_COORDS, mipmap_blur_expression)
        .with_uniforms(&[Uniform::new(SlType::Float2, "invImgSize"), Uniform::new(SlType::Float, "lod")])
        .with_samplers(&[Sampler::new(SlType::Sampler2D, "image")])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::granite::blend::BlendMode;

    #[test]
    fn test_ids_are_unique_and_below_fixed_blends() {
        let stages = builtin_stages();
        let mut ids: Vec<u32> = stages.iter().map(|(id, _)| *id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), stages.len());
        assert!(ids.iter().all(|id| *id < FIRST_FIXED_BLEND_STAGE_ID));
    }

    #[test]
    fn test_child_counts() {
        let stages = builtin_stages();
        let children = |id: BuiltinStageId| {
            stages.iter().find(|(sid, _)| *sid == id.id()).map(|(_, stage)| stage.num_children)
        };
        assert_eq!(children(BuiltinStageId::Blend), Some(3));
        assert_eq!(children(BuiltinStageId::Compose), Some(2));
        assert_eq!(children(BuiltinStageId::LocalMatrixShader), Some(1));
        assert_eq!(children(BuiltinStageId::SolidColorShader), Some(0));
    }

    #[test]
    fn test_blend_library_ordinals() {
        // The library switches on these numbers directly
        assert_eq!(BlendMode::Plus.ordinal(), 12);
        assert_eq!(BlendMode::PlusClamped.ordinal(), 13);
        assert_eq!(BlendMode::Modulate.ordinal(), 16);
        assert_eq!(BlendMode::Multiply.ordinal(), 17);
        assert_eq!(BlendMode::HardMix.ordinal(), 35);
        assert_eq!(BlendMode::DarkerColor.ordinal(), 36);
        assert_eq!(BlendMode::Luminosity.ordinal(), 41);
    }

    #[test]
    fn test_porter_duff_table_matches_coefficients() {
        for mode in &BlendMode::ALL[..=BlendMode::Plus.ordinal()] {
            let [a, b, c, d] = mode.porter_duff_coefficients().unwrap();
            let entry = format!("vec4({}, {}, {}, {})", a as i32, b as i32, c as i32, d as i32);
            assert!(BLEND_LIBRARY.contains(&entry), "{mode} missing {entry}");
        }
    }

    #[test]
    fn test_gradient_helpers_are_sized() {
        assert!(COLORIZE_8.contains("vec4 colors[8]"));
        assert!(LINEAR_GRAD_4.starts_with("vec4 sk_linear_grad_4_shader("));
        assert!(ANGULAR_GRAD_8.contains("colorize_grad_8("));
    }
}
