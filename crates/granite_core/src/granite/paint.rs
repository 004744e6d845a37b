//! Paints and the stage keys they produce
//!
//! A paint becomes two roots: the shader subtree followed by the fixed blend
//! stage for its blend mode. Uniform values are gathered in the same pre-order
//! the pipeline assembler registers them in, so the bytes line up with the
//! generated uniform block.

use super::blend::BlendMode;
use super::builtin_stages::BuiltinStageId;
use super::stage_registry::StageRegistry;
use super::uniform_handler::UniformDataGatherer;

/// Unpremultiplied RGBA color
pub type Color4f = [f32; 4];

/// Column-major 3x3 matrix
pub type Matrix3 = [[f32; 3]; 3];

/// Most stops a gradient stage can hold
pub const MAX_GRADIENT_STOPS: usize = 8;

/// How gradients extend past their end stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TileMode {
    /// Repeat the edge colors
    #[default]
    Clamp = 0,
    /// Restart from the first stop
    Repeat = 1,
    /// Alternate direction every period
    Mirror = 2,
}

/// Gradient shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GradientGeometry {
    /// Along the line `start -> end`
    Linear {
        /// Position of offset 0
        start: [f32; 2],
        /// Position of offset 1
        end: [f32; 2],
    },
    /// Outward from `center`
    Radial {
        /// Position of offset 0
        center: [f32; 2],
        /// Distance of offset 1
        radius: f32,
    },
    /// Around `center`, angles in degrees
    Angular {
        /// Pivot
        center: [f32; 2],
        /// Angle of offset 0
        start_angle: f32,
        /// Angle of offset 1
        end_angle: f32,
    },
}

/// Color stops plus geometry
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    geometry: GradientGeometry,
    colors: Vec<Color4f>,
    offsets: Vec<f32>,
    tile_mode: TileMode,
}

impl Gradient {
    /// Gradient over `colors`, `None` for fewer than two or more than
    /// [`MAX_GRADIENT_STOPS`] stops or mismatched offsets
    ///
    /// Offsets default to even spacing.
    pub fn new(geometry: GradientGeometry, colors: &[Color4f], offsets: Option<&[f32]>, tile_mode: TileMode) -> Option<Self> {
        if !(2..=MAX_GRADIENT_STOPS).contains(&colors.len()) {
            log::warn!("[PAINT] Gradient with {} stops is not supported", colors.len());
            return None;
        }
        let offsets = match offsets {
            Some(offsets) if offsets.len() == colors.len() => offsets.to_vec(),
            Some(offsets) => {
                log::warn!(
                    "[PAINT] Gradient has {} colors but {} offsets",
                    colors.len(),
                    offsets.len()
                );
                return None;
            }
            None => {
                let last = (colors.len() - 1) as f32;
                (0..colors.len()).map(|i| i as f32 / last).collect()
            }
        };
        Some(Self {
            geometry,
            colors: colors.to_vec(),
            offsets,
            tile_mode,
        })
    }

    /// Number of stops
    pub fn stop_count(&self) -> usize {
        self.colors.len()
    }

    /// Stop capacity of the stage that renders this gradient
    fn stage_stops(&self) -> u32 {
        if self.colors.len() <= 4 {
            4
        } else {
            8
        }
    }

    fn stage_id(&self) -> BuiltinStageId {
        let small = self.stage_stops() == 4;
        match (self.geometry, small) {
            (GradientGeometry::Linear { .. }, true) => BuiltinStageId::LinearGradientShader4,
            (GradientGeometry::Linear { .. }, false) => BuiltinStageId::LinearGradientShader8,
            (GradientGeometry::Radial { .. }, true) => BuiltinStageId::RadialGradientShader4,
            (GradientGeometry::Radial { .. }, false) => BuiltinStageId::RadialGradientShader8,
            (GradientGeometry::Angular { .. }, true) => BuiltinStageId::AngularGradientShader4,
            (GradientGeometry::Angular { .. }, false) => BuiltinStageId::AngularGradientShader8,
        }
    }

    fn write_uniforms(&self, gatherer: &mut UniformDataGatherer) {
        let stops = self.stage_stops();
        // Pad with the last stop so colorization never reads past it
        let last_color = self.colors[self.colors.len() - 1];
        let mut colors = self.colors.clone();
        colors.resize(stops as usize, last_color);
        let mut offsets = self.offsets.clone();
        offsets.resize(stops as usize, 1.0);

        gatherer.write_float4_array(&colors, stops);
        gatherer.write_float_array(&offsets, stops);
        match self.geometry {
            GradientGeometry::Linear { start, end } => {
                gatherer.write_float2(start);
                gatherer.write_float2(end);
            }
            GradientGeometry::Radial { center, radius } => {
                gatherer.write_float2(center);
                gatherer.write_float(radius);
            }
            GradientGeometry::Angular { center, start_angle, end_angle } => {
                let sweep = end_angle - start_angle;
                let scale = if sweep.abs() > f32::EPSILON { 360.0 / sweep } else { 1.0 };
                gatherer.write_float2(center);
                gatherer.write_float(-start_angle / 360.0);
                gatherer.write_float(scale);
            }
        }
        gatherer.write_int(self.tile_mode as i32);
    }
}

/// What a shader computes
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderKind {
    /// One color everywhere
    Color(Color4f),
    /// Color ramp
    Gradient(Gradient),
}

/// Source color generator with an optional local matrix
#[derive(Debug, Clone, PartialEq)]
pub struct Shader {
    kind: ShaderKind,
    local_matrix: Option<Matrix3>,
}

impl Shader {
    /// Solid color
    pub fn color(color: Color4f) -> Self {
        Self {
            kind: ShaderKind::Color(color),
            local_matrix: None,
        }
    }

    /// Linear gradient, see [`Gradient::new`] for when this is `None`
    pub fn linear_gradient(
        start: [f32; 2],
        end: [f32; 2],
        colors: &[Color4f],
        offsets: Option<&[f32]>,
        tile_mode: TileMode,
    ) -> Option<Self> {
        Gradient::new(GradientGeometry::Linear { start, end }, colors, offsets, tile_mode).map(Self::gradient)
    }

    /// Radial gradient
    pub fn radial_gradient(
        center: [f32; 2],
        radius: f32,
        colors: &[Color4f],
        offsets: Option<&[f32]>,
        tile_mode: TileMode,
    ) -> Option<Self> {
        Gradient::new(GradientGeometry::Radial { center, radius }, colors, offsets, tile_mode).map(Self::gradient)
    }

    /// Angular (sweep) gradient between two angles in degrees
    pub fn angular_gradient(
        center: [f32; 2],
        start_angle: f32,
        end_angle: f32,
        colors: &[Color4f],
        offsets: Option<&[f32]>,
        tile_mode: TileMode,
    ) -> Option<Self> {
        let geometry = GradientGeometry::Angular { center, start_angle, end_angle };
        Gradient::new(geometry, colors, offsets, tile_mode).map(Self::gradient)
    }

    fn gradient(gradient: Gradient) -> Self {
        Self {
            kind: ShaderKind::Gradient(gradient),
            local_matrix: None,
        }
    }

    /// Same shader evaluated in coordinates mapped by `matrix`
    pub fn with_local_matrix(mut self, matrix: Matrix3) -> Self {
        self.local_matrix = Some(matrix);
        self
    }

    /// What the shader computes
    pub fn kind(&self) -> &ShaderKind {
        &self.kind
    }

    fn add_to_key(&self, key: &mut PaintKey) {
        if let Some(matrix) = self.local_matrix {
            key.stage_ids.push(BuiltinStageId::LocalMatrixShader.id());
            key.gatherer.write_float3x3(matrix);
        }
        match &self.kind {
            ShaderKind::Color(color) => {
                key.stage_ids.push(BuiltinStageId::SolidColorShader.id());
                key.gatherer.write_float4(*color);
            }
            ShaderKind::Gradient(gradient) => {
                key.stage_ids.push(gradient.stage_id().id());
                gradient.write_uniforms(&mut key.gatherer);
            }
        }
    }
}

/// Stage IDs and matching uniform bytes for one paint
#[derive(Debug, Clone, Default)]
pub struct PaintKey {
    /// Pre-order stage IDs
    pub stage_ids: Vec<u32>,
    gatherer: UniformDataGatherer,
}

impl PaintKey {
    /// Uniform bytes padded to the block size
    pub fn uniform_data(&self) -> Vec<u8> {
        self.gatherer.clone().finish()
    }
}

/// How to color a draw
#[derive(Debug, Clone, PartialEq)]
pub struct Paint {
    /// Color used when there is no shader
    pub color: Color4f,
    /// Color generator, overrides `color`
    pub shader: Option<Shader>,
    /// How the result combines with the destination
    pub blend_mode: BlendMode,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            color: [0.0, 0.0, 0.0, 1.0],
            shader: None,
            blend_mode: BlendMode::DEFAULT,
        }
    }
}

impl Paint {
    /// Solid paint
    pub fn new(color: Color4f) -> Self {
        Self { color, ..Self::default() }
    }

    /// Use `shader` for color
    pub fn with_shader(mut self, shader: Shader) -> Self {
        self.shader = Some(shader);
        self
    }

    /// Use `blend_mode`
    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    /// Stage IDs and uniform data for this paint
    pub fn build_key(&self, registry: &StageRegistry) -> PaintKey {
        let mut key = PaintKey::default();
        match &self.shader {
            Some(shader) => shader.add_to_key(&mut key),
            None => Shader::color(self.color).add_to_key(&mut key),
        }
        key.stage_ids.push(registry.fixed_blend_stage_id(self.blend_mode));
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::format::BackendFormat;
    use crate::engine::resource::PipelineKey;
    use crate::engine::types::ColorType;
    use crate::granite::pipeline::generate_pipeline_desc;

    const RED: Color4f = [1.0, 0.0, 0.0, 1.0];
    const BLUE: Color4f = [0.0, 0.0, 1.0, 1.0];

    fn block_size(key: &PaintKey) -> u32 {
        let pipeline_key = PipelineKey::new(key.stage_ids.clone(), BackendFormat::mock(ColorType::Rgba8888), 1);
        generate_pipeline_desc(StageRegistry::global(), &pipeline_key)
            .unwrap()
            .uniform_block_size
    }

    #[test]
    fn test_solid_paint_key() {
        let registry = StageRegistry::global();
        let key = Paint::new(RED).build_key(registry);
        assert_eq!(
            key.stage_ids,
            [BuiltinStageId::SolidColorShader.id(), registry.fixed_blend_stage_id(BlendMode::SrcOver)]
        );
        let data = key.uniform_data();
        assert_eq!(data.len(), 16);
        assert_eq!(&data[..4], bytemuck::bytes_of(&1.0f32));
    }

    #[test]
    fn test_gradient_stage_follows_stop_count() {
        let registry = StageRegistry::global();
        let four = Shader::linear_gradient([0.0, 0.0], [1.0, 0.0], &[RED, BLUE], None, TileMode::Clamp).unwrap();
        let key = Paint::default().with_shader(four).build_key(registry);
        assert_eq!(key.stage_ids[0], BuiltinStageId::LinearGradientShader4.id());

        let colors = [RED; 6];
        let eight = Shader::radial_gradient([0.0, 0.0], 4.0, &colors, None, TileMode::Mirror).unwrap();
        let key = Paint::default().with_shader(eight).build_key(registry);
        assert_eq!(key.stage_ids[0], BuiltinStageId::RadialGradientShader8.id());
    }

    #[test]
    fn test_gradient_stop_limits() {
        assert!(Shader::linear_gradient([0.0; 2], [1.0; 2], &[RED], None, TileMode::Clamp).is_none());
        assert!(Shader::linear_gradient([0.0; 2], [1.0; 2], &[RED; 9], None, TileMode::Clamp).is_none());
        assert!(Shader::linear_gradient([0.0; 2], [1.0; 2], &[RED, BLUE], Some(&[0.0]), TileMode::Clamp).is_none());
    }

    #[test]
    fn test_uniform_data_matches_generated_block() {
        let registry = StageRegistry::global();
        let identity = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let shaders = [
            Shader::linear_gradient([0.0; 2], [8.0, 0.0], &[RED, BLUE], None, TileMode::Repeat)
                .unwrap()
                .with_local_matrix(identity),
            Shader::angular_gradient([4.0; 2], 0.0, 180.0, &[RED; 5], None, TileMode::Clamp).unwrap(),
            Shader::radial_gradient([4.0; 2], 2.0, &[RED, BLUE, RED], None, TileMode::Clamp).unwrap(),
            Shader::color(BLUE),
        ];
        for shader in shaders {
            let key = Paint::default()
                .with_shader(shader)
                .with_blend_mode(BlendMode::Multiply)
                .build_key(registry);
            assert_eq!(key.uniform_data().len() as u32, block_size(&key), "{:?}", key.stage_ids);
        }
    }

    #[test]
    fn test_local_matrix_wraps_shader() {
        let registry = StageRegistry::global();
        let shader = Shader::color(RED).with_local_matrix([[2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 1.0]]);
        let key = Paint::default().with_shader(shader).build_key(registry);
        assert_eq!(
            &key.stage_ids[..2],
            [BuiltinStageId::LocalMatrixShader.id(), BuiltinStageId::SolidColorShader.id()]
        );
        assert_eq!(key.uniform_data().len(), 64);
    }
}
