//! # Pipeline Assembly
//!
//! Turns a [`PipelineKey`] into a [`GraphicsPipelineDesc`].
//!
//! A key's stage IDs are a pre-order walk of a forest of stage trees: each
//! stage is followed by its `num_children` child subtrees. Roots run in order,
//! each one reading the previous root's output as its prior stage output. A
//! stage's index is its position in the key, which is what qualifies its
//! uniform and sampler names.

use std::fmt::Write as _;

use super::fragment_stage::{FragmentStage, ReqFlags, StageArgs};
use super::shader_var::{ShaderFlags, SlType};
use super::stage_registry::StageRegistry;
use super::uniform_handler::{mangled_name, UniformHandler};
use crate::engine::device::GraphicsPipelineDesc;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::resource::PipelineKey;

const LOCAL_COORDS: &str = "localCoords";
const PRIMITIVE_COLOR: &str = "primitiveColor";
const DST_COLOR: &str = "dstColor";
const INITIAL_COLOR: &str = "initialColor";

/// One stage instance in a parsed key
#[derive(Debug)]
pub struct FragmentNode<'r> {
    stage_id: u32,
    stage: &'r FragmentStage,
    stage_index: usize,
    children: Vec<FragmentNode<'r>>,
    requirement_flags: ReqFlags,
}

impl<'r> FragmentNode<'r> {
    /// Registry ID
    pub fn stage_id(&self) -> u32 {
        self.stage_id
    }

    /// Stage definition
    pub fn stage(&self) -> &'r FragmentStage {
        self.stage
    }

    /// Position of this node in the key
    pub fn stage_index(&self) -> usize {
        self.stage_index
    }

    /// Child subtrees in key order
    pub fn children(&self) -> &[FragmentNode<'r>] {
        &self.children
    }

    /// Requirements of this node and every descendant
    pub fn requirement_flags(&self) -> ReqFlags {
        self.requirement_flags
    }

    fn visit<'a>(&'a self, f: &mut impl FnMut(&'a FragmentNode<'r>)) {
        f(self);
        for child in &self.children {
            child.visit(f);
        }
    }
}

fn parse_node<'r>(registry: &'r StageRegistry, stage_ids: &[u32], cursor: &mut usize) -> EngineResult<FragmentNode<'r>> {
    let stage_index = *cursor;
    let stage_id = stage_ids[stage_index];
    let stage = registry.get(stage_id).ok_or(EngineError::UnknownStage(stage_id))?;
    *cursor += 1;

    let mut children = Vec::with_capacity(stage.num_children);
    let mut requirement_flags = stage.requirement_flags;
    for child in 0..stage.num_children {
        if *cursor >= stage_ids.len() {
            return Err(EngineError::MalformedKey {
                reason: format!(
                    "stage {} ({}) at index {} expects {} children, key ends after {}",
                    stage_id, stage.name, stage_index, stage.num_children, child
                ),
            });
        }
        let node = parse_node(registry, stage_ids, cursor)?;
        requirement_flags |= node.requirement_flags;
        children.push(node);
    }

    Ok(FragmentNode {
        stage_id,
        stage,
        stage_index,
        children,
        requirement_flags,
    })
}

/// Parse a pre-order stage ID list into root nodes
pub fn build_stage_tree<'r>(registry: &'r StageRegistry, stage_ids: &[u32]) -> EngineResult<Vec<FragmentNode<'r>>> {
    if stage_ids.is_empty() {
        return Err(EngineError::MalformedKey {
            reason: "no stages".to_string(),
        });
    }
    let mut cursor = 0;
    let mut roots = Vec::new();
    while cursor < stage_ids.len() {
        roots.push(parse_node(registry, stage_ids, &mut cursor)?);
    }
    Ok(roots)
}

/// Accumulates the body of the generated `main`
#[derive(Debug, Default)]
pub struct FragmentEmitter {
    body: String,
}

impl FragmentEmitter {
    fn new() -> Self {
        Self::default()
    }

    /// Append one statement line
    pub fn line(&mut self, statement: &str) {
        self.body.push_str("    ");
        self.body.push_str(statement);
        self.body.push('\n');
    }

    /// Qualified name of `node`'s uniform or sampler `name`
    pub fn uniform(&self, node: &FragmentNode<'_>, name: &str) -> String {
        mangled_name(name, Some(node.stage_index()))
    }

    /// Emit child `child_index` of `node` and return its output variable
    ///
    /// The child sees the same inputs as its parent.
    pub fn emit_child(&mut self, node: &FragmentNode<'_>, child_index: usize, args: &StageArgs<'_>) -> String {
        let child = &node.children()[child_index];
        self.emit_node(child, args)
    }

    fn emit_node(&mut self, node: &FragmentNode<'_>, args: &StageArgs<'_>) -> String {
        let output = format!("outColor_{}", node.stage_index());
        self.line(&format!("vec4 {output};"));
        let node_args = StageArgs { output: &output, ..*args };
        (node.stage().expression)(self, node, &node_args);
        output
    }

    fn finish(self) -> String {
        self.body
    }
}

/// Helper sources of every node, first occurrence wins
///
/// Two stages sharing a helper reference the same static string, so identity
/// is enough to deduplicate.
fn collect_helpers(roots: &[FragmentNode<'_>]) -> Vec<&'static str> {
    let mut helpers: Vec<&'static str> = Vec::new();
    for root in roots {
        root.visit(&mut |node| {
            for &function in &node.stage().required_functions {
                if !helpers.iter().any(|&h| std::ptr::eq(h, function)) {
                    helpers.push(function);
                }
            }
        });
    }
    helpers
}

fn vertex_source(flags: ReqFlags) -> String {
    let mut source = String::from("#version 450\n");
    source.push_str("layout(location = 0) in vec2 position;\n");
    if flags.contains(ReqFlags::LOCAL_COORDS) {
        source.push_str("layout(location = 1) in vec2 inLocalCoords;\n");
        let _ = writeln!(source, "layout(location = 0) out vec2 {LOCAL_COORDS};");
    }
    if flags.contains(ReqFlags::PRIMITIVE_COLOR) {
        source.push_str("layout(location = 2) in vec4 inColor;\n");
        let _ = writeln!(source, "layout(location = 1) out vec4 {PRIMITIVE_COLOR};");
    }
    source.push_str("void main() {\n");
    if flags.contains(ReqFlags::LOCAL_COORDS) {
        let _ = writeln!(source, "    {LOCAL_COORDS} = inLocalCoords;");
    }
    if flags.contains(ReqFlags::PRIMITIVE_COLOR) {
        let _ = writeln!(source, "    {PRIMITIVE_COLOR} = inColor;");
    }
    source.push_str("    gl_Position = vec4(position, 0.0, 1.0);\n}\n");
    source
}

/// Generate shaders and layout for `key`
pub fn generate_pipeline_desc(registry: &StageRegistry, key: &PipelineKey) -> EngineResult<GraphicsPipelineDesc> {
    let roots = build_stage_tree(registry, &key.stage_ids)?;
    let flags = roots.iter().fold(ReqFlags::NONE, |acc, root| acc | root.requirement_flags());

    let mut uniform_handler = UniformHandler::new();
    for root in &roots {
        root.visit(&mut |node| node.stage().generate_uniforms(&mut uniform_handler, node.stage_index()));
    }
    if flags.contains(ReqFlags::BLENDER_DST_COLOR) {
        uniform_handler.add_sampler(SlType::Sampler2D, "dstCopy", None);
    }

    let mut emitter = FragmentEmitter::new();
    emitter.line(&format!("vec4 {INITIAL_COLOR} = vec4(0.0);"));
    if flags.contains(ReqFlags::BLENDER_DST_COLOR) {
        emitter.line(&format!("vec4 {DST_COLOR} = texelFetch(dstCopy, ivec2(gl_FragCoord.xy), 0);"));
    }
    let mut prior = INITIAL_COLOR.to_string();
    for root in &roots {
        let args = StageArgs {
            local_coords: LOCAL_COORDS,
            prior_stage_output: &prior,
            blender_dst_color: DST_COLOR,
            output: "",
        };
        prior = emitter.emit_node(root, &args);
    }
    emitter.line(&format!("sk_FragColor = {prior};"));

    let mut fragment = String::from("#version 450\n");
    if flags.contains(ReqFlags::LOCAL_COORDS) {
        let _ = writeln!(fragment, "layout(location = 0) in vec2 {LOCAL_COORDS};");
    }
    if flags.contains(ReqFlags::PRIMITIVE_COLOR) {
        let _ = writeln!(fragment, "layout(location = 1) in vec4 {PRIMITIVE_COLOR};");
    }
    fragment.push_str("layout(location = 0) out vec4 sk_FragColor;\n");
    uniform_handler.append_declarations(ShaderFlags::FRAGMENT, &mut fragment);
    for helper in collect_helpers(&roots) {
        fragment.push_str(helper);
        if !helper.ends_with('\n') {
            fragment.push('\n');
        }
    }
    fragment.push_str("void main() {\n");
    fragment.push_str(&emitter.finish());
    fragment.push_str("}\n");

    let names: Vec<&str> = roots.iter().map(|root| root.stage().name()).collect();
    log::debug!(
        "[PIPELINE] Assembled {} for key {} ({} bytes uniforms, {} samplers)",
        names.join(" -> "),
        key,
        uniform_handler.block_size(),
        uniform_handler.samplers().len()
    );

    Ok(GraphicsPipelineDesc {
        label: format!("Pipeline {key}"),
        vertex_source: vertex_source(flags),
        fragment_source: fragment,
        uniform_block_size: uniform_handler.block_size(),
        sampler_count: uniform_handler.samplers().len() as u32,
        color_format: key.format,
        sample_count: key.sample_count,
    })
}
