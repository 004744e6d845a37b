//! Uniform and sampler declarations for one pipeline
//!
//! Names are qualified with the owning stage's index so two instances of the
//! same stage in one pipeline never alias. Offsets follow std140 in
//! registration order; [`UniformDataGatherer`] must write values in the same
//! order to produce a matching buffer.

use super::shader_var::{align_to, std140_layout, ShaderFlags, ShaderVar, SlType, NON_ARRAY};

/// Binding of the fragment uniform block; samplers follow it
pub const UNIFORM_BINDING: u32 = 0;

/// Index of a registered uniform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformHandle(pub usize);

/// Index of a registered sampler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerHandle(pub usize);

/// A registered uniform and its place in the block
#[derive(Debug, Clone, PartialEq)]
pub struct UniformInfo {
    /// Qualified variable
    pub var: ShaderVar,
    /// Stages that read it
    pub visibility: ShaderFlags,
    /// std140 byte offset in the block
    pub offset: u32,
}

/// A registered sampler and its binding
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerInfo {
    /// Qualified variable
    pub var: ShaderVar,
    /// Descriptor binding
    pub binding: u32,
}

/// Collects uniform/sampler declarations while a pipeline is assembled
#[derive(Debug, Default)]
pub struct UniformHandler {
    uniforms: Vec<UniformInfo>,
    samplers: Vec<SamplerInfo>,
    current_offset: u32,
}

/// `name` qualified by `stage_index`, or unchanged without one
pub fn mangled_name(name: &str, stage_index: Option<usize>) -> String {
    match stage_index {
        Some(index) => format!("{name}_{index}"),
        None => name.to_string(),
    }
}

impl UniformHandler {
    /// Empty handler
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a uniform, an array when `array_size != NON_ARRAY`
    pub fn add_uniform_array(
        &mut self,
        visibility: ShaderFlags,
        ty: SlType,
        name: &str,
        array_size: u32,
        stage_index: Option<usize>,
    ) -> UniformHandle {
        debug_assert!(!ty.is_sampler(), "samplers go through add_sampler");
        let name = mangled_name(name, stage_index);
        debug_assert!(
            self.uniforms.iter().all(|u| u.var.name != name),
            "uniform '{name}' registered twice"
        );

        let (alignment, size) = std140_layout(ty, array_size);
        let offset = align_to(self.current_offset, alignment);
        self.current_offset = offset + size;

        self.uniforms.push(UniformInfo {
            var: ShaderVar::new(ty, name, array_size),
            visibility,
            offset,
        });
        UniformHandle(self.uniforms.len() - 1)
    }

    /// Register a non-array uniform
    pub fn add_uniform(&mut self, visibility: ShaderFlags, ty: SlType, name: &str, stage_index: Option<usize>) -> UniformHandle {
        self.add_uniform_array(visibility, ty, name, NON_ARRAY, stage_index)
    }

    /// Register a sampler; bindings are assigned after the uniform block
    pub fn add_sampler(&mut self, ty: SlType, name: &str, stage_index: Option<usize>) -> SamplerHandle {
        debug_assert!(ty.is_sampler());
        let binding = UNIFORM_BINDING + 1 + self.samplers.len() as u32;
        self.samplers.push(SamplerInfo {
            var: ShaderVar::new(ty, mangled_name(name, stage_index), NON_ARRAY),
            binding,
        });
        SamplerHandle(self.samplers.len() - 1)
    }

    /// Registered uniforms in order
    pub fn uniforms(&self) -> &[UniformInfo] {
        &self.uniforms
    }

    /// Registered samplers in order
    pub fn samplers(&self) -> &[SamplerInfo] {
        &self.samplers
    }

    /// Uniform by handle
    pub fn uniform(&self, handle: UniformHandle) -> &UniformInfo {
        &self.uniforms[handle.0]
    }

    /// Block size rounded to 16 bytes
    pub fn block_size(&self) -> u32 {
        align_to(self.current_offset, 16)
    }

    /// Emit the uniform block and sampler declarations visible to `visibility`
    pub fn append_declarations(&self, visibility: ShaderFlags, out: &mut String) {
        let visible: Vec<&UniformInfo> = self
            .uniforms
            .iter()
            .filter(|u| u.visibility.intersects(visibility))
            .collect();
        if !visible.is_empty() {
            out.push_str(&format!("layout(std140, binding = {UNIFORM_BINDING}) uniform UniformBlock {{\n"));
            for uniform in visible {
                out.push_str(&format!("    layout(offset = {}) {};\n", uniform.offset, uniform.var.declaration()));
            }
            out.push_str("};\n");
        }
        if visibility.contains(ShaderFlags::FRAGMENT) {
            for sampler in &self.samplers {
                out.push_str(&format!(
                    "layout(binding = {}) uniform {};\n",
                    sampler.binding,
                    sampler.var.declaration()
                ));
            }
        }
    }
}

/// Packs uniform values in std140 layout
///
/// Values must be appended in the order the matching uniforms were
/// registered with a [`UniformHandler`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UniformDataGatherer {
    data: Vec<u8>,
}

impl UniformDataGatherer {
    /// Empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&mut self, ty: SlType, array_size: u32, values: &[[f32; 4]]) {
        let (alignment, size) = std140_layout(ty, array_size);
        let start = align_to(self.data.len() as u32, alignment) as usize;
        self.data.resize(start, 0);

        let count = if array_size == NON_ARRAY { 1 } else { array_size as usize };
        let element_stride = if array_size == NON_ARRAY { size as usize } else { size as usize / count };
        for i in 0..count {
            let element_start = start + i * element_stride;
            self.data.resize(element_start, 0);
            let element = values.get(i).copied().unwrap_or_default();
            let components = ty.component_count().min(4) as usize;
            self.data.extend_from_slice(bytemuck::cast_slice(&element[..components]));
        }
        self.data.resize(start + size as usize, 0);
    }

    /// Append a `float`
    pub fn write_float(&mut self, value: f32) {
        self.write(SlType::Float, NON_ARRAY, &[[value, 0.0, 0.0, 0.0]]);
    }

    /// Append a `vec2`
    pub fn write_float2(&mut self, value: [f32; 2]) {
        self.write(SlType::Float2, NON_ARRAY, &[[value[0], value[1], 0.0, 0.0]]);
    }

    /// Append a `vec4`
    pub fn write_float4(&mut self, value: [f32; 4]) {
        self.write(SlType::Float4, NON_ARRAY, &[value]);
    }

    /// Append a `vec4[N]`, padding missing elements with zeros
    pub fn write_float4_array(&mut self, values: &[[f32; 4]], array_size: u32) {
        self.write(SlType::Float4, array_size, values);
    }

    /// Append a `float[N]`; each element occupies a 16-byte slot
    pub fn write_float_array(&mut self, values: &[f32], array_size: u32) {
        let elements: Vec<[f32; 4]> = values.iter().map(|&v| [v, 0.0, 0.0, 0.0]).collect();
        self.write(SlType::Float, array_size, &elements);
    }

    /// Append an `int`
    pub fn write_int(&mut self, value: i32) {
        let (alignment, size) = std140_layout(SlType::Int, NON_ARRAY);
        let start = align_to(self.data.len() as u32, alignment) as usize;
        self.data.resize(start, 0);
        self.data.extend_from_slice(bytemuck::bytes_of(&value));
        self.data.resize(start + size as usize, 0);
    }

    /// Append a column-major `mat3`
    pub fn write_float3x3(&mut self, columns: [[f32; 3]; 3]) {
        let (alignment, size) = std140_layout(SlType::Float3x3, NON_ARRAY);
        let start = align_to(self.data.len() as u32, alignment) as usize;
        self.data.resize(start, 0);
        for (i, column) in columns.iter().enumerate() {
            self.data.resize(start + i * 16, 0);
            self.data.extend_from_slice(bytemuck::cast_slice(column.as_slice()));
        }
        self.data.resize(start + size as usize, 0);
    }

    /// Packed bytes so far, without trailing block padding
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Packed bytes padded to a 16-byte block
    pub fn finish(mut self) -> Vec<u8> {
        let size = align_to(self.data.len() as u32, 16) as usize;
        self.data.resize(size, 0);
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_stage_twice_does_not_alias() {
        let mut handler = UniformHandler::new();
        handler.add_uniform(ShaderFlags::FRAGMENT, SlType::Float4, "color", Some(0));
        handler.add_uniform(ShaderFlags::FRAGMENT, SlType::Float4, "color", Some(3));
        let names: Vec<&str> = handler.uniforms().iter().map(|u| u.var.name.as_str()).collect();
        assert_eq!(names, ["color_0", "color_3"]);
    }

    #[test]
    fn test_std140_offsets() {
        let mut handler = UniformHandler::new();
        let a = handler.add_uniform(ShaderFlags::FRAGMENT, SlType::Float, "a", None);
        let b = handler.add_uniform(ShaderFlags::FRAGMENT, SlType::Float4, "b", None);
        let c = handler.add_uniform(ShaderFlags::FRAGMENT, SlType::Float2, "c", None);
        let d = handler.add_uniform_array(ShaderFlags::FRAGMENT, SlType::Float, "d", 3, None);
        assert_eq!(handler.uniform(a).offset, 0);
        assert_eq!(handler.uniform(b).offset, 16);
        assert_eq!(handler.uniform(c).offset, 32);
        assert_eq!(handler.uniform(d).offset, 48);
        assert_eq!(handler.block_size(), 96);
    }

    #[test]
    fn test_sampler_bindings_follow_block() {
        let mut handler = UniformHandler::new();
        handler.add_sampler(SlType::Sampler2D, "image", Some(1));
        handler.add_sampler(SlType::Sampler2D, "image", Some(4));
        let bindings: Vec<u32> = handler.samplers().iter().map(|s| s.binding).collect();
        assert_eq!(bindings, [1, 2]);

        let mut out = String::new();
        handler.append_declarations(ShaderFlags::FRAGMENT, &mut out);
        assert!(out.contains("layout(binding = 2) uniform sampler2D image_4;"));
        assert!(!out.contains("UniformBlock"));
    }

    #[test]
    fn test_gatherer_matches_handler_layout() {
        let mut handler = UniformHandler::new();
        handler.add_uniform(ShaderFlags::FRAGMENT, SlType::Float, "a", None);
        handler.add_uniform(ShaderFlags::FRAGMENT, SlType::Float4, "b", None);
        handler.add_uniform_array(ShaderFlags::FRAGMENT, SlType::Float4, "c", 4, None);
        handler.add_uniform(ShaderFlags::FRAGMENT, SlType::Int, "d", None);

        let mut gatherer = UniformDataGatherer::new();
        gatherer.write_float(1.0);
        gatherer.write_float4([1.0, 2.0, 3.0, 4.0]);
        gatherer.write_float4_array(&[[0.5; 4]; 2], 4);
        gatherer.write_int(7);
        let data = gatherer.finish();

        assert_eq!(data.len() as u32, handler.block_size());
        assert_eq!(&data[16..20], bytemuck::bytes_of(&1.0f32));
        assert_eq!(&data[96..100], bytemuck::bytes_of(&7i32));
    }
}
