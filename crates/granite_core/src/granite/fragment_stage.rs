//! # Fragment Stages
//!
//! A fragment stage is one reusable snippet of fragment shader code. Stages
//! are immutable once built and are looked up by numeric ID through the
//! [`StageRegistry`](super::stage_registry::StageRegistry).
//!
//! A stage declares what it needs ([`ReqFlags`]), which helper functions
//! must be present in the shader, its uniforms and samplers, and a callback
//! that emits the statement computing its output color.

use std::borrow::Cow;

use bitflags::bitflags;

use super::pipeline::{FragmentEmitter, FragmentNode};
use super::shader_var::{ShaderFlags, SlType, NON_ARRAY};
use super::uniform_handler::UniformHandler;

bitflags! {
    /// Inputs a stage reads
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ReqFlags: u32 {
        /// Geometry local coordinates
        const LOCAL_COORDS = 0x1;
        /// Output of the previous stage, the "src" of a blender
        const PRIOR_STAGE_OUTPUT = 0x2;
        /// Destination color, the "dst" of a blender
        const BLENDER_DST_COLOR = 0x4;
        /// Per-vertex primitive color
        const PRIMITIVE_COLOR = 0x10;
    }
}

impl ReqFlags {
    /// No requirements
    pub const NONE: Self = Self::empty();
}

/// A uniform declared by a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uniform {
    /// Type
    pub ty: SlType,
    /// Unqualified name
    pub name: &'static str,
    /// Element count, [`NON_ARRAY`] for a plain value
    pub array_size: u32,
}

impl Uniform {
    /// Plain uniform
    pub const fn new(ty: SlType, name: &'static str) -> Self {
        Self { ty, name, array_size: NON_ARRAY }
    }

    /// Array uniform
    pub const fn array(ty: SlType, name: &'static str, array_size: u32) -> Self {
        Self { ty, name, array_size }
    }
}

/// A sampler declared by a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sampler {
    /// Type
    pub ty: SlType,
    /// Unqualified name
    pub name: &'static str,
}

impl Sampler {
    /// New sampler
    pub const fn new(ty: SlType, name: &'static str) -> Self {
        Self { ty, name }
    }
}

/// Names of the values a stage's expression reads and writes
#[derive(Debug, Clone, Copy)]
pub struct StageArgs<'a> {
    /// Local coordinates expression
    pub local_coords: &'a str,
    /// Prior stage output expression
    pub prior_stage_output: &'a str,
    /// Blend destination expression
    pub blender_dst_color: &'a str,
    /// Variable the stage assigns
    pub output: &'a str,
}

/// Emits the statements assigning `args.output` for `node`
pub type ExpressionGenerator = fn(&mut FragmentEmitter, &FragmentNode<'_>, &StageArgs<'_>);

/// One reusable fragment shader snippet
#[derive(Debug, Clone)]
pub struct FragmentStage {
    /// Display name
    pub name: Cow<'static, str>,
    /// Inputs the stage reads
    pub requirement_flags: ReqFlags,
    /// Helper function the expression calls, if any
    pub static_function_name: Option<&'static str>,
    /// Helper function sources, deduplicated by identity across a pipeline
    pub required_functions: Vec<&'static str>,
    /// Uniform declarations
    pub uniforms: Vec<Uniform>,
    /// Sampler declarations
    pub samplers: Vec<Sampler>,
    /// Code emission callback
    pub expression: ExpressionGenerator,
    /// Number of child subtrees following this stage in a key
    pub num_children: usize,
}

impl FragmentStage {
    /// Stage with no helpers, uniforms, samplers or children
    pub fn new(name: impl Into<Cow<'static, str>>, requirement_flags: ReqFlags, expression: ExpressionGenerator) -> Self {
        Self {
            name: name.into(),
            requirement_flags,
            static_function_name: None,
            required_functions: Vec::new(),
            uniforms: Vec::new(),
            samplers: Vec::new(),
            expression,
            num_children: 0,
        }
    }

    /// Set the helper function the expression calls and its source
    pub fn with_function(mut self, static_function_name: &'static str, required_functions: &[&'static str]) -> Self {
        self.static_function_name = Some(static_function_name);
        self.required_functions = required_functions.to_vec();
        self
    }

    /// Set uniform declarations
    pub fn with_uniforms(mut self, uniforms: &[Uniform]) -> Self {
        self.uniforms = uniforms.to_vec();
        self
    }

    /// Set sampler declarations
    pub fn with_samplers(mut self, samplers: &[Sampler]) -> Self {
        self.samplers = samplers.to_vec();
        self
    }

    /// Set the child count
    pub fn with_children(mut self, num_children: usize) -> Self {
        self.num_children = num_children;
        self
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register this stage's uniforms and samplers, qualified by `stage_index`
    pub fn generate_uniforms(&self, uniform_handler: &mut UniformHandler, stage_index: usize) {
        for uniform in &self.uniforms {
            uniform_handler.add_uniform_array(
                ShaderFlags::FRAGMENT,
                uniform.ty,
                uniform.name,
                uniform.array_size,
                Some(stage_index),
            );
        }
        for sampler in &self.samplers {
            uniform_handler.add_sampler(sampler.ty, sampler.name, Some(stage_index));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut FragmentEmitter, _: &FragmentNode<'_>, _: &StageArgs<'_>) {}

    #[test]
    fn test_generate_uniforms_qualifies_names() {
        let stage = FragmentStage::new("Test", ReqFlags::LOCAL_COORDS, noop)
            .with_uniforms(&[
                Uniform::array(SlType::Float4, "colors", 4),
                Uniform::new(SlType::Float2, "point"),
            ])
            .with_samplers(&[Sampler::new(SlType::Sampler2D, "image")]);

        let mut handler = UniformHandler::new();
        stage.generate_uniforms(&mut handler, 2);
        stage.generate_uniforms(&mut handler, 5);

        let names: Vec<&str> = handler.uniforms().iter().map(|u| u.var.name.as_str()).collect();
        assert_eq!(names, ["colors_2", "point_2", "colors_5", "point_5"]);
        assert_eq!(handler.uniforms()[0].var.array_size, 4);
        assert_eq!(handler.samplers()[1].var.name, "image_5");
    }

    #[test]
    fn test_requirement_flag_bits() {
        assert_eq!(ReqFlags::NONE.bits(), 0);
        assert_eq!(ReqFlags::LOCAL_COORDS.bits(), 0x1);
        assert_eq!(ReqFlags::PRIOR_STAGE_OUTPUT.bits(), 0x2);
        assert_eq!(ReqFlags::BLENDER_DST_COLOR.bits(), 0x4);
        assert_eq!(ReqFlags::PRIMITIVE_COLOR.bits(), 0x10);
    }
}
