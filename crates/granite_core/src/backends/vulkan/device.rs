//! Vulkan device wrapper
//!
//! Wraps a caller-created instance/device/queue. Images and pipelines created
//! here release their native handles on drop; the instance and device
//! themselves are never destroyed by this module.

use std::ffi::CStr;
use std::sync::Arc;

use ash::vk;

use super::caps::VulkanCaps;
use super::util;
use crate::engine::caps::Caps;
use crate::engine::device::{BackendImage, BackendPipeline, Device, GraphicsPipelineDesc};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::types::{BackendApi, ImageDesc, LoadOp};

/// Shader stage a source string is compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    /// Vertex stage
    Vertex,
    /// Fragment stage
    Fragment,
}

/// Turns generated shader source into SPIR-V
///
/// The shading language front end lives outside this crate and is injected
/// here.
pub trait ShaderCompiler: Send + Sync {
    /// Compile `source` to SPIR-V words
    fn compile(&self, stage: ShaderStage, source: &str) -> EngineResult<Vec<u32>>;
}

/// Native handles supplied by the caller
///
/// They must outlive the [`VulkanDevice`] and everything created through it.
#[derive(Clone)]
pub struct VulkanBackendContext {
    /// Instance dispatch table
    pub instance: ash::Instance,
    /// Physical device
    pub physical_device: vk::PhysicalDevice,
    /// Logical device dispatch table
    pub device: ash::Device,
    /// Graphics queue
    pub queue: vk::Queue,
    /// Family of `queue`
    pub queue_family_index: u32,
}

impl std::fmt::Debug for VulkanBackendContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanBackendContext")
            .field("physical_device", &self.physical_device)
            .field("device", &self.device.handle())
            .field("queue", &self.queue)
            .field("queue_family_index", &self.queue_family_index)
            .finish()
    }
}

/// Image with bound device-local memory and a default view
pub struct VulkanImage {
    device: Arc<ash::Device>,
    image: vk::Image,
    memory: vk::DeviceMemory,
    view: vk::ImageView,
    desc: ImageDesc,
    label: String,
}

impl VulkanImage {
    /// Image handle
    pub fn handle(&self) -> vk::Image {
        self.image
    }

    /// Default view covering every mip level
    pub fn view(&self) -> vk::ImageView {
        self.view
    }
}

impl std::fmt::Debug for VulkanImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanImage")
            .field("image", &self.image)
            .field("label", &self.label)
            .finish()
    }
}

impl BackendImage for VulkanImage {
    fn desc(&self) -> &ImageDesc {
        &self.desc
    }

    fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for VulkanImage {
    fn drop(&mut self) {
        log::debug!("[VULKAN] Destroying image '{}' {:?}", self.label, self.image);
        unsafe {
            self.device.destroy_image_view(self.view, None);
            self.device.destroy_image(self.image, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

/// SPIR-V module, destroyed on drop
struct ShaderModule {
    device: Arc<ash::Device>,
    module: vk::ShaderModule,
}

impl ShaderModule {
    fn new(device: &Arc<ash::Device>, code: &[u32]) -> EngineResult<Self> {
        let create_info = vk::ShaderModuleCreateInfo::builder().code(code);
        let module = unsafe {
            device.create_shader_module(&create_info, None).map_err(|e| {
                log::error!("[PIPELINE] vkCreateShaderModule failed: {}", util::result_code_to_message(e));
                EngineError::Vulkan(e)
            })?
        };
        Ok(Self {
            device: Arc::clone(device),
            module,
        })
    }

    fn stage_info(&self, stage: vk::ShaderStageFlags, entry_point: &CStr) -> vk::PipelineShaderStageCreateInfo {
        vk::PipelineShaderStageCreateInfo::builder()
            .stage(stage)
            .module(self.module)
            .name(entry_point)
            .build()
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}

/// Graphics pipeline plus the layout objects it was built against
pub struct VulkanPipeline {
    device: Arc<ash::Device>,
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
    descriptor_set_layout: vk::DescriptorSetLayout,
    render_pass: vk::RenderPass,
    label: String,
}

impl VulkanPipeline {
    /// Pipeline handle
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    /// Pipeline layout handle
    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }

    /// Render pass the pipeline is compatible with
    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }
}

impl std::fmt::Debug for VulkanPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanPipeline")
            .field("pipeline", &self.pipeline)
            .field("label", &self.label)
            .finish()
    }
}

impl BackendPipeline for VulkanPipeline {
    fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for VulkanPipeline {
    fn drop(&mut self) {
        log::debug!("[PIPELINE] Dropping pipeline '{}' {:?}", self.label, self.pipeline);
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.layout, None);
            self.device.destroy_descriptor_set_layout(self.descriptor_set_layout, None);
            self.device.destroy_render_pass(self.render_pass, None);
        }
    }
}

/// [`Device`] backed by a Vulkan logical device
pub struct VulkanDevice {
    context: VulkanBackendContext,
    device: Arc<ash::Device>,
    caps: Arc<VulkanCaps>,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    compiler: Box<dyn ShaderCompiler>,
}

impl VulkanDevice {
    /// Wrap caller-owned native handles
    pub fn new(context: VulkanBackendContext, compiler: Box<dyn ShaderCompiler>) -> Self {
        let caps = Arc::new(VulkanCaps::new(&context.instance, context.physical_device));
        let memory_properties =
            unsafe { context.instance.get_physical_device_memory_properties(context.physical_device) };
        Self {
            device: Arc::new(context.device.clone()),
            context,
            caps,
            memory_properties,
            compiler,
        }
    }

    /// Native handles this device wraps
    pub fn backend_context(&self) -> &VulkanBackendContext {
        &self.context
    }

    /// Vulkan-specific capability table
    pub fn vulkan_caps(&self) -> &VulkanCaps {
        &self.caps
    }

    fn find_memory_type(&self, type_filter: u32, properties: vk::MemoryPropertyFlags) -> EngineResult<u32> {
        (0..self.memory_properties.memory_type_count)
            .find(|&i| {
                (type_filter & (1 << i)) != 0
                    && self.memory_properties.memory_types[i as usize]
                        .property_flags
                        .contains(properties)
            })
            .ok_or_else(|| EngineError::ImageCreation("no suitable memory type".to_string()))
    }

    fn create_render_pass(
        &self,
        format: vk::Format,
        samples: vk::SampleCountFlags,
        load_op: LoadOp,
    ) -> EngineResult<vk::RenderPass> {
        let (vk_load_op, initial_layout) = util::to_vk_load_op(load_op);
        let attachments = [vk::AttachmentDescription::builder()
            .format(format)
            .samples(samples)
            .load_op(vk_load_op)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(initial_layout)
            .final_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .build()];
        let color_refs = [vk::AttachmentReference {
            attachment: 0,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        }];
        let subpasses = [vk::SubpassDescription::builder()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs)
            .build()];
        let create_info = vk::RenderPassCreateInfo::builder()
            .attachments(&attachments)
            .subpasses(&subpasses);
        unsafe { self.device.create_render_pass(&create_info, None) }.map_err(EngineError::Vulkan)
    }

    fn create_descriptor_set_layout(&self, sampler_count: u32) -> EngineResult<vk::DescriptorSetLayout> {
        let mut bindings = vec![vk::DescriptorSetLayoutBinding::builder()
            .binding(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::FRAGMENT)
            .build()];
        bindings.extend((0..sampler_count).map(|i| {
            vk::DescriptorSetLayoutBinding::builder()
                .binding(i + 1)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::FRAGMENT)
                .build()
        }));
        let create_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&bindings);
        unsafe { self.device.create_descriptor_set_layout(&create_info, None) }.map_err(EngineError::Vulkan)
    }
}

impl std::fmt::Debug for VulkanDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanDevice")
            .field("context", &self.context)
            .field("caps", &self.caps)
            .finish_non_exhaustive()
    }
}

impl Device for VulkanDevice {
    fn backend(&self) -> BackendApi {
        BackendApi::Vulkan
    }

    fn caps(&self) -> Arc<dyn Caps> {
        self.caps.clone()
    }

    fn create_image(&self, desc: &ImageDesc, label: &str) -> EngineResult<Box<dyn BackendImage>> {
        let format = desc
            .format
            .vk_format()
            .ok_or_else(|| EngineError::ImageCreation(format!("'{label}': not a Vulkan format")))?;
        let samples = util::to_vk_sample_count(desc.sample_count);
        if samples.is_empty() {
            return Err(EngineError::ImageCreation(format!(
                "'{label}': invalid sample count {}",
                desc.sample_count
            )));
        }

        let mut usage = vk::ImageUsageFlags::SAMPLED
            | vk::ImageUsageFlags::TRANSFER_SRC
            | vk::ImageUsageFlags::TRANSFER_DST;
        if desc.renderable {
            usage |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
        }

        let image_create_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: desc.width,
                height: desc.height,
                depth: 1,
            })
            .mip_levels(desc.mip_levels)
            .array_layers(1)
            .format(format)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(samples);

        let image = unsafe { self.device.create_image(&image_create_info, None) }.map_err(|e| {
            log::error!("[VULKAN] Failed to create image '{}': {}", label, util::result_code_to_message(e));
            EngineError::Vulkan(e)
        })?;

        let memory_requirements = unsafe { self.device.get_image_memory_requirements(image) };
        let memory = self
            .find_memory_type(memory_requirements.memory_type_bits, vk::MemoryPropertyFlags::DEVICE_LOCAL)
            .and_then(|memory_type_index| {
                let allocate_info = vk::MemoryAllocateInfo::builder()
                    .allocation_size(memory_requirements.size)
                    .memory_type_index(memory_type_index);
                unsafe { self.device.allocate_memory(&allocate_info, None) }.map_err(EngineError::Vulkan)
            });
        let memory = match memory {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { self.device.destroy_image(image, None) };
                return Err(e);
            }
        };

        let aspect_mask = util::image_aspect(format);
        let view_create_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask,
                base_mip_level: 0,
                level_count: desc.mip_levels,
                base_array_layer: 0,
                layer_count: 1,
            });

        let view = unsafe {
            self.device
                .bind_image_memory(image, memory, 0)
                .and_then(|()| self.device.create_image_view(&view_create_info, None))
        };
        let view = match view {
            Ok(view) => view,
            Err(e) => {
                unsafe {
                    self.device.destroy_image(image, None);
                    self.device.free_memory(memory, None);
                }
                return Err(EngineError::Vulkan(e));
            }
        };

        log::debug!("[VULKAN] Created image '{}' {}x{} {}", label, desc.width, desc.height, desc.format);
        Ok(Box::new(VulkanImage {
            device: Arc::clone(&self.device),
            image,
            memory,
            view,
            desc: *desc,
            label: label.to_string(),
        }))
    }

    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc) -> EngineResult<Box<dyn BackendPipeline>> {
        let color_format = desc.color_format.vk_format().ok_or_else(|| {
            EngineError::PipelineCompilation(format!("'{}': color format is not a Vulkan format", desc.label))
        })?;
        let samples = util::to_vk_sample_count(desc.sample_count);
        if samples.is_empty() {
            return Err(EngineError::PipelineCompilation(format!(
                "'{}': invalid sample count {}",
                desc.label, desc.sample_count
            )));
        }

        let vertex_code = self.compiler.compile(ShaderStage::Vertex, &desc.vertex_source)?;
        let fragment_code = self.compiler.compile(ShaderStage::Fragment, &desc.fragment_source)?;
        let vertex_shader = ShaderModule::new(&self.device, &vertex_code)?;
        let fragment_shader = ShaderModule::new(&self.device, &fragment_code)?;

        let entry_point = CStr::from_bytes_with_nul(b"main\0")
            .map_err(|e| EngineError::PipelineCompilation(e.to_string()))?;
        let shader_stages = [
            vertex_shader.stage_info(vk::ShaderStageFlags::VERTEX, entry_point),
            fragment_shader.stage_info(vk::ShaderStageFlags::FRAGMENT, entry_point),
        ];

        let vertex_input = vk::PipelineVertexInputStateCreateInfo::builder();
        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_STRIP)
            .primitive_restart_enable(false);
        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1);
        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);
        let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::NONE)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE);
        let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(samples);
        // Blending happens in the fragment stages
        let color_blend_attachments = [vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(false)
            .build()];
        let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        // Load ops do not affect render pass compatibility
        let render_pass = self.create_render_pass(color_format, samples, LoadOp::Load)?;
        let descriptor_set_layout = match self.create_descriptor_set_layout(desc.sampler_count) {
            Ok(layout) => layout,
            Err(e) => {
                unsafe { self.device.destroy_render_pass(render_pass, None) };
                return Err(e);
            }
        };
        let set_layouts = [descriptor_set_layout];
        let layout_info = vk::PipelineLayoutCreateInfo::builder().set_layouts(&set_layouts);
        let layout = match unsafe { self.device.create_pipeline_layout(&layout_info, None) } {
            Ok(layout) => layout,
            Err(e) => {
                unsafe {
                    self.device.destroy_descriptor_set_layout(descriptor_set_layout, None);
                    self.device.destroy_render_pass(render_pass, None);
                }
                return Err(EngineError::Vulkan(e));
            }
        };

        // From here on the wrapper owns every handle and cleans up on error
        let mut pipeline = VulkanPipeline {
            device: Arc::clone(&self.device),
            pipeline: vk::Pipeline::null(),
            layout,
            descriptor_set_layout,
            render_pass,
            label: desc.label.clone(),
        };

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0);

        let pipelines = unsafe {
            self.device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info.build()], None)
                .map_err(|(_, e)| {
                    log::error!("[PIPELINE] '{}' failed: {}", desc.label, util::result_code_to_message(e));
                    EngineError::Vulkan(e)
                })?
        };
        pipeline.pipeline = pipelines
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::PipelineCompilation(format!("'{}': no pipeline returned", desc.label)))?;

        log::debug!("[PIPELINE] Created pipeline '{}' {:?}", desc.label, pipeline.pipeline);
        Ok(Box::new(pipeline))
    }
}
