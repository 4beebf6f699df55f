use std::collections::HashMap;
use std::sync::mpsc;

use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::RgbaImage;
use wgpu::util::DeviceExt;

use crate::error::RenderError;

use super::context::{
    AttributeFormat, BlendMode, BufferId, BufferKind, DepthFunc, DepthState, DrawCall,
    DrawUniforms, GpuContext, ProgramId, RowOrder, Sampling, Size, TextureId, TextureImage,
    VertexBinding, Wrap,
};
use super::options::ContextOptions;
use super::surface::{self, PresentSurface, SurfaceErrorAction};

/// Format of the offscreen target and of uploaded textures.
///
/// Both are linear `Unorm` so lighting multiplies and glint adds operate on
/// the stored byte values, not on sRGB-decoded ones.
const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;
const MSAA_SAMPLES: u32 = 4;

/// wgpu-backed [`GpuContext`].
///
/// Frames always render into an offscreen texture that can be read back.
/// When built over a window surface, [`present`](GpuContext::present) renders
/// the frame into the swapchain instead.
///
/// Draw commands are recorded on the CPU and encoded into a single render
/// pass when the frame is finished, since wgpu bakes depth and blend state
/// into pipelines. One pipeline is built per distinct state combination.
pub struct WgpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    size: Size,
    sample_count: u32,

    present: Option<PresentSurface>,

    offscreen: wgpu::Texture,
    offscreen_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    msaa_views: HashMap<wgpu::TextureFormat, wgpu::TextureView>,
    readback: Option<Readback>,

    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    samplers: HashMap<Sampling, wgpu::Sampler>,

    buffers: Vec<wgpu::Buffer>,
    programs: Vec<Program>,
    /// Slots are emptied by `delete_texture`; ids are never reused.
    textures: Vec<Option<GpuTexture>>,

    depth: DepthState,
    blend: BlendMode,
    frame: Option<PendingFrame>,
    released: bool,
}

struct Program {
    module: wgpu::ShaderModule,
    layout: wgpu::PipelineLayout,
    attributes: HashMap<String, u32>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    format: wgpu::TextureFormat,
    depth: DepthState,
    blend: BlendMode,
    attributes: Vec<(u32, AttributeFormat)>,
}

struct GpuTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

struct Readback {
    buffer: wgpu::Buffer,
    padded_row_bytes: u32,
}

#[derive(Default)]
struct PendingFrame {
    clear: Option<wgpu::Color>,
    draws: Vec<PendingDraw>,
}

struct PendingDraw {
    program: ProgramId,
    depth: DepthState,
    blend: BlendMode,
    attributes: Vec<VertexBinding>,
    indices: BufferId,
    index_count: u32,
    texture: TextureId,
    uniforms: wgpu::BindGroup,
}

impl PendingDraw {
    fn key(&self, format: wgpu::TextureFormat) -> PipelineKey {
        PipelineKey {
            format,
            depth: self.depth,
            blend: self.blend,
            attributes: self
                .attributes
                .iter()
                .map(|a| (a.location, a.format))
                .collect(),
        }
    }
}

impl WgpuContext {
    /// Creates an offscreen context. Frames are only observable through
    /// [`read_pixels`](GpuContext::read_pixels).
    pub fn headless(size: Size, options: &ContextOptions) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        pollster::block_on(Self::new(instance, None, size, options))
    }

    /// Creates a context that presents into `surface`.
    ///
    /// `instance` must be the instance the surface was created from.
    pub fn with_surface(
        instance: wgpu::Instance,
        surface: wgpu::Surface<'static>,
        size: Size,
        options: &ContextOptions,
    ) -> Result<Self> {
        pollster::block_on(Self::new(instance, Some(surface), size, options))
    }

    async fn new(
        instance: wgpu::Instance,
        surface: Option<wgpu::Surface<'static>>,
        size: Size,
        options: &ContextOptions,
    ) -> Result<Self> {
        anyhow::ensure!(size.width > 0 && size.height > 0, "canvas has zero size");

        for key in options.attributes.keys() {
            if key != "power_preference" && key != "present_mode" {
                log::debug!("ignoring unsupported context attribute `{key}`");
            }
        }

        let power_preference = match options.attribute("power_preference") {
            Some("low-power") => wgpu::PowerPreference::LowPower,
            Some("high-performance") => wgpu::PowerPreference::HighPerformance,
            _ => wgpu::PowerPreference::default(),
        };

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: surface.as_ref(),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("blockicon device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::MemoryUsage,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let present = match surface {
            Some(surface) => {
                let caps = surface.get_capabilities(&adapter);
                let format = surface::choose_surface_format(&caps.formats)
                    .context("no supported surface formats")?;
                let config = wgpu::SurfaceConfiguration {
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    format,
                    width: size.width,
                    height: size.height,
                    present_mode: surface::parse_present_mode(options.attribute("present_mode")),
                    alpha_mode: surface::choose_alpha_mode(&caps),
                    view_formats: vec![],
                    desired_maximum_frame_latency: 2,
                };
                surface.configure(&device, &config);
                Some(PresentSurface { surface, config })
            }
            None => None,
        };

        let sample_count = if options.antialias { MSAA_SAMPLES } else { 1 };

        let extent = wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        };

        let offscreen = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("blockicon offscreen target"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OFFSCREEN_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let offscreen_view = offscreen.create_view(&wgpu::TextureViewDescriptor::default());

        let depth_view = device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("blockicon depth"),
                size: extent,
                mip_level_count: 1,
                sample_count,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default());

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("blockicon uniforms bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<DrawUniforms>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("blockicon texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        log::debug!(
            "wgpu context ready: {size}, {} samples, {}",
            sample_count,
            if present.is_some() { "surface" } else { "headless" }
        );

        Ok(Self {
            device,
            queue,
            size,
            sample_count,
            present,
            offscreen,
            offscreen_view,
            depth_view,
            msaa_views: HashMap::new(),
            readback: None,
            uniform_layout,
            texture_layout,
            samplers: HashMap::new(),
            buffers: Vec::new(),
            programs: Vec::new(),
            textures: Vec::new(),
            depth: DepthState::OPAQUE,
            blend: BlendMode::Alpha,
            frame: None,
            released: false,
        })
    }

    fn ensure_alive(&self) -> Result<(), RenderError> {
        if self.released {
            Err(RenderError::ContextLost)
        } else {
            Ok(())
        }
    }

    fn sampler(&mut self, sampling: Sampling) -> wgpu::Sampler {
        self.samplers
            .entry(sampling)
            .or_insert_with(|| {
                let mode = match sampling.wrap {
                    Wrap::Repeat => wgpu::AddressMode::Repeat,
                    Wrap::ClampToEdge => wgpu::AddressMode::ClampToEdge,
                };
                self.device.create_sampler(&wgpu::SamplerDescriptor {
                    label: Some("blockicon sampler"),
                    address_mode_u: mode,
                    address_mode_v: mode,
                    address_mode_w: mode,
                    mag_filter: wgpu::FilterMode::Nearest,
                    min_filter: wgpu::FilterMode::Nearest,
                    lod_max_clamp: if sampling.mipmaps { 32.0 } else { 0.0 },
                    ..Default::default()
                })
            })
            .clone()
    }

    /// Builds the pipelines and multisample targets a frame needs for `format`.
    fn prepare_frame(&mut self, frame: &PendingFrame, format: wgpu::TextureFormat) {
        if self.sample_count > 1 && !self.msaa_views.contains_key(&format) {
            let view = self
                .device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some("blockicon msaa color"),
                    size: wgpu::Extent3d {
                        width: self.size.width,
                        height: self.size.height,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: self.sample_count,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default());
            self.msaa_views.insert(format, view);
        }

        for draw in &frame.draws {
            let key = draw.key(format);
            let sample_count = self.sample_count;
            let Some(program) = self.programs.get_mut(draw.program.0 as usize) else {
                continue;
            };
            if program.pipelines.contains_key(&key) {
                continue;
            }
            let pipeline = build_pipeline(&self.device, program, &key, sample_count);
            program.pipelines.insert(key, pipeline);
        }
    }

    /// Records the frame's single render pass into `encoder`, targeting `view`.
    fn record_frame(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        frame: &PendingFrame,
        view: &wgpu::TextureView,
        format: wgpu::TextureFormat,
    ) {
        let (attachment, resolve_target) = match self.msaa_views.get(&format) {
            Some(msaa) if self.sample_count > 1 => (msaa, Some(view)),
            _ => (view, None),
        };

        let color_load = match frame.clear {
            Some(color) => wgpu::LoadOp::Clear(color),
            None => wgpu::LoadOp::Load,
        };
        let depth_load = if frame.clear.is_some() {
            wgpu::LoadOp::Clear(1.0)
        } else {
            wgpu::LoadOp::Load
        };

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("blockicon frame pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: attachment,
                resolve_target,
                ops: wgpu::Operations {
                    load: color_load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: depth_load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        for draw in &frame.draws {
            let Some(program) = self.programs.get(draw.program.0 as usize) else { continue };
            let Some(pipeline) = program.pipelines.get(&draw.key(format)) else { continue };
            let Some(texture) = self
                .textures
                .get(draw.texture.0 as usize)
                .and_then(Option::as_ref)
            else {
                continue;
            };
            let Some(indices) = self.buffers.get(draw.indices.0 as usize) else { continue };

            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, &draw.uniforms, &[]);
            rpass.set_bind_group(1, &texture.bind_group, &[]);
            for (slot, binding) in draw.attributes.iter().enumerate() {
                if let Some(buffer) = self.buffers.get(binding.buffer.0 as usize) {
                    rpass.set_vertex_buffer(slot as u32, buffer.slice(..));
                }
            }
            rpass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint16);
            rpass.draw_indexed(0..draw.index_count, 0, 0..1);
        }
    }

    fn readback(&mut self) -> (wgpu::Buffer, u32) {
        let width = self.size.width;
        let height = self.size.height;
        let readback = self.readback.get_or_insert_with(|| {
            // Rows must be aligned to COPY_BYTES_PER_ROW_ALIGNMENT (256).
            let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
            let padded_row_bytes = (width * 4).div_ceil(align) * align;
            let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("blockicon readback"),
                size: padded_row_bytes as u64 * height as u64,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            });
            Readback {
                buffer,
                padded_row_bytes,
            }
        });
        (readback.buffer.clone(), readback.padded_row_bytes)
    }

    fn upload_levels(&self, texture: &wgpu::Texture, levels: &[RgbaImage]) {
        for (level, img) in levels.iter().enumerate() {
            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture,
                    mip_level: level as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                img.as_raw(),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * img.width()),
                    rows_per_image: Some(img.height()),
                },
                wgpu::Extent3d {
                    width: img.width(),
                    height: img.height(),
                    depth_or_array_layers: 1,
                },
            );
        }
    }
}

impl GpuContext for WgpuContext {
    fn size(&self) -> Size {
        self.size
    }

    fn readback_order(&self) -> RowOrder {
        RowOrder::TopDown
    }

    fn create_buffer(&mut self, kind: BufferKind, contents: &[u8]) -> Result<BufferId, RenderError> {
        self.ensure_alive()?;
        let usage = match kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
        };
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("blockicon model buffer"),
                contents,
                usage,
            });
        self.buffers.push(buffer);
        Ok(BufferId(self.buffers.len() as u32 - 1))
    }

    fn create_program(&mut self, label: &str, wgsl: &str) -> Result<ProgramId, RenderError> {
        self.ensure_alive()?;

        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(wgsl.into()),
            });
        if let Some(err) = pollster::block_on(scope.pop()) {
            return Err(RenderError::ShaderBuild {
                log: err.to_string(),
            });
        }

        let layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("blockicon pipeline layout"),
                bind_group_layouts: &[&self.uniform_layout, &self.texture_layout],
                immediate_size: 0,
            });

        self.programs.push(Program {
            module,
            layout,
            attributes: vertex_input_locations(wgsl),
            pipelines: HashMap::new(),
        });
        Ok(ProgramId(self.programs.len() as u32 - 1))
    }

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        self.programs
            .get(program.0 as usize)?
            .attributes
            .get(name)
            .copied()
    }

    fn create_texture(
        &mut self,
        image: TextureImage<'_>,
        sampling: Sampling,
    ) -> Result<TextureId, RenderError> {
        self.ensure_alive()?;

        if image.width == 0 || image.height == 0 {
            return Err(RenderError::Gpu("cannot upload an empty texture".into()));
        }
        let base = RgbaImage::from_raw(image.width, image.height, image.rgba.to_vec()).ok_or(
            RenderError::PixelBufferSize {
                width: image.width,
                height: image.height,
                len: image.rgba.len(),
                expected: Size::new(image.width, image.height).rgba_len(),
            },
        )?;

        let levels = if sampling.mipmaps {
            mip_chain(base)
        } else {
            vec![base]
        };

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("blockicon texture"),
            size: wgpu::Extent3d {
                width: image.width,
                height: image.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: levels.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.upload_levels(&texture, &levels);

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = self.sampler(sampling);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("blockicon texture bind group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        self.textures.push(Some(GpuTexture { texture, bind_group }));
        Ok(TextureId(self.textures.len() as u32 - 1))
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if let Some(slot) = self.textures.get_mut(texture.0 as usize)
            && let Some(gpu) = slot.take()
        {
            gpu.texture.destroy();
        }
    }

    fn set_depth(&mut self, depth: DepthState) {
        self.depth = depth;
    }

    fn set_blend(&mut self, blend: BlendMode) {
        self.blend = blend;
    }

    fn clear(&mut self, color: [f32; 4]) {
        if self.frame.is_some() {
            log::debug!("discarding unfinished frame");
        }
        let [r, g, b, a] = color.map(f64::from);
        self.frame = Some(PendingFrame {
            clear: Some(wgpu::Color { r, g, b, a }),
            draws: Vec::new(),
        });
    }

    fn draw(&mut self, call: &DrawCall<'_>) {
        if self.released {
            return;
        }

        let ubo = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("blockicon draw uniforms"),
                contents: bytemuck::bytes_of(&call.uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let uniforms = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("blockicon draw bind group"),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.as_entire_binding(),
            }],
        });

        let draw = PendingDraw {
            program: call.program,
            depth: self.depth,
            blend: self.blend,
            attributes: call.attributes.to_vec(),
            indices: call.indices,
            index_count: call.index_count,
            texture: call.texture,
            uniforms,
        };
        self.frame.get_or_insert_with(PendingFrame::default).draws.push(draw);
    }

    fn read_pixels(&mut self, out: &mut [u8]) -> Result<(), RenderError> {
        self.ensure_alive()?;
        if out.len() != self.size.rgba_len() {
            return Err(RenderError::PixelBufferSize {
                width: self.size.width,
                height: self.size.height,
                len: out.len(),
                expected: self.size.rgba_len(),
            });
        }

        let frame = self.frame.take().unwrap_or_default();
        self.prepare_frame(&frame, OFFSCREEN_FORMAT);
        let (buffer, padded_row_bytes) = self.readback();

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("blockicon readback encoder"),
            });
        self.record_frame(&mut encoder, &frame, &self.offscreen_view, OFFSCREEN_FORMAT);
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.offscreen,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row_bytes),
                    rows_per_image: Some(self.size.height),
                },
            },
            wgpu::Extent3d {
                width: self.size.width,
                height: self.size.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        let _ = self.device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: None,
        });
        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(RenderError::Gpu(format!("readback map failed: {err}"))),
            Err(_) => return Err(RenderError::Gpu("readback map callback dropped".into())),
        }

        {
            let data = slice.get_mapped_range();
            let row_bytes = self.size.width as usize * 4;
            for (y, row) in out.chunks_exact_mut(row_bytes).enumerate() {
                let src = y * padded_row_bytes as usize;
                row.copy_from_slice(&data[src..src + row_bytes]);
            }
        }
        buffer.unmap();
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderError> {
        self.ensure_alive()?;
        let frame = self.frame.take().unwrap_or_default();

        let Some(present) = self.present.as_ref() else {
            // Headless: keep the frame in the offscreen target.
            self.prepare_frame(&frame, OFFSCREEN_FORMAT);
            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("blockicon frame encoder"),
                });
            self.record_frame(&mut encoder, &frame, &self.offscreen_view, OFFSCREEN_FORMAT);
            self.queue.submit(std::iter::once(encoder.finish()));
            return Ok(());
        };

        let surface_texture = match present.surface.get_current_texture() {
            Ok(t) => t,
            Err(err) => {
                return match surface::map_surface_error(present, &self.device, err) {
                    SurfaceErrorAction::Fatal => {
                        Err(RenderError::Gpu("surface ran out of memory".into()))
                    }
                    action => {
                        log::debug!("skipping frame after surface error: {action:?}");
                        Ok(())
                    }
                };
            }
        };
        let format = present.config.format;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.prepare_frame(&frame, format);
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("blockicon frame encoder"),
            });
        self.record_frame(&mut encoder, &frame, &view, format);
        self.queue.submit(std::iter::once(encoder.finish()));
        drop(view);
        surface_texture.present();
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.frame = None;
        self.programs.clear();
        self.textures.clear();
        self.buffers.clear();
        self.samplers.clear();
        self.msaa_views.clear();
        self.readback = None;
        self.present = None;
        self.device.destroy();
        log::debug!("wgpu context {} released", self.size);
    }
}

fn build_pipeline(
    device: &wgpu::Device,
    program: &Program,
    key: &PipelineKey,
    sample_count: u32,
) -> wgpu::RenderPipeline {
    let attributes: Vec<[wgpu::VertexAttribute; 1]> = key
        .attributes
        .iter()
        .map(|&(location, format)| {
            [wgpu::VertexAttribute {
                format: match format {
                    AttributeFormat::Float2 => wgpu::VertexFormat::Float32x2,
                    AttributeFormat::Float3 => wgpu::VertexFormat::Float32x3,
                },
                offset: 0,
                shader_location: location,
            }]
        })
        .collect();
    let buffers: Vec<wgpu::VertexBufferLayout<'_>> = key
        .attributes
        .iter()
        .zip(&attributes)
        .map(|(&(_, format), attrs)| wgpu::VertexBufferLayout {
            array_stride: format.byte_stride(),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: attrs,
        })
        .collect();

    let blend = match key.blend {
        BlendMode::Alpha => wgpu::BlendState::ALPHA_BLENDING,
        BlendMode::Additive => {
            let component = wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::Src,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            };
            wgpu::BlendState {
                color: component,
                alpha: component,
            }
        }
    };

    let depth_compare = match key.depth.func {
        DepthFunc::LessEqual => wgpu::CompareFunction::LessEqual,
        DepthFunc::Equal => wgpu::CompareFunction::Equal,
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("blockicon pipeline"),
        layout: Some(&program.layout),
        vertex: wgpu::VertexState {
            module: &program.module,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &buffers,
        },
        fragment: Some(wgpu::FragmentState {
            module: &program.module,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: key.format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: key.depth.write,
            depth_compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: sample_count,
            ..Default::default()
        },
        multiview_mask: None,
        cache: None,
    })
}

/// Successive half-size levels down to 1x1. Only called for power-of-two
/// images, so every level halves exactly.
fn mip_chain(base: RgbaImage) -> Vec<RgbaImage> {
    let mut levels = vec![base];
    loop {
        let Some(prev) = levels.last() else { break };
        let (w, h) = (prev.width(), prev.height());
        if w == 1 && h == 1 {
            break;
        }
        let next = imageops::resize(prev, (w / 2).max(1), (h / 2).max(1), FilterType::Triangle);
        levels.push(next);
    }
    levels
}

/// Maps attribute names to `@location`s from the `VertexInput` struct.
fn vertex_input_locations(wgsl: &str) -> HashMap<String, u32> {
    let mut locations = HashMap::new();
    let Some(start) = wgsl.find("struct VertexInput") else {
        return locations;
    };
    let body = &wgsl[start..];
    let Some(open) = body.find('{') else { return locations };
    let Some(close) = body.find('}') else { return locations };

    for field in body[open + 1..close].split(',') {
        let field = field.trim();
        let Some(rest) = field.strip_prefix("@location(") else { continue };
        let Some((index, rest)) = rest.split_once(')') else { continue };
        let Ok(index) = index.trim().parse::<u32>() else { continue };
        let Some((name, _ty)) = rest.split_once(':') else { continue };
        locations.insert(name.trim().to_string(), index);
    }
    locations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_locations_from_wgsl() {
        let src = "struct VertexInput {\n  @location(0) a_position: vec3<f32>,\n  @location(2) a_lighting: vec3<f32>,\n}";
        let locs = vertex_input_locations(src);
        assert_eq!(locs.get("a_position"), Some(&0));
        assert_eq!(locs.get("a_lighting"), Some(&2));
        assert_eq!(locs.len(), 2);
    }

    #[test]
    fn vertex_locations_without_struct() {
        assert!(vertex_input_locations("fn main() {}").is_empty());
    }

    #[test]
    fn mip_chain_halves_to_one() {
        let base = RgbaImage::from_pixel(8, 4, image::Rgba([255; 4]));
        let sizes: Vec<_> = mip_chain(base).iter().map(|l| l.dimensions()).collect();
        assert_eq!(sizes, vec![(8, 4), (4, 2), (2, 1), (1, 1)]);
    }

    fn headless() -> Option<WgpuContext> {
        match WgpuContext::headless(Size::new(4, 4), &ContextOptions::default()) {
            Ok(ctx) => Some(ctx),
            Err(err) => {
                eprintln!("skipping: no GPU adapter ({err:#})");
                None
            }
        }
    }

    #[test]
    fn broken_wgsl_reports_shader_log() {
        let Some(mut ctx) = headless() else { return };
        match ctx.create_program("broken", "fn vs_main( {") {
            Err(RenderError::ShaderBuild { log }) => assert!(!log.is_empty()),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("broken shader compiled"),
        }
    }

    #[test]
    fn deleted_texture_slot_is_emptied() {
        let Some(mut ctx) = headless() else { return };
        let rgba = [200u8; 4 * 4 * 4];
        let image = TextureImage {
            width: 4,
            height: 4,
            rgba: &rgba,
        };
        let sampling = Sampling {
            mipmaps: true,
            wrap: Wrap::Repeat,
        };
        let first = ctx.create_texture(image, sampling).unwrap();
        let second = ctx.create_texture(image, sampling).unwrap();

        ctx.delete_texture(first);
        ctx.delete_texture(first);
        assert!(ctx.textures[first.0 as usize].is_none());
        assert!(ctx.textures[second.0 as usize].is_some());
    }
}
