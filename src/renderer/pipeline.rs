//! Render bridge
//!
//! Owns the GPU copy of the entity store, the glyph atlas texture and the
//! generated pipeline. The instance buffer is laid out exactly like the store
//! and only the dirty range is re-uploaded on `sync`.

use wgpu::util::DeviceExt;

use super::glyph_atlas::GlyphAtlas;
use super::shader::{self, LabelGlyphs, ShaderParams};
use super::vertex::GpuEntity;
use crate::error::ShaderError;
use crate::sim::Arena;

pub struct ArenaRenderer {
    /// `None` when the generated shader was rejected; drawing is then skipped
    pipeline: Option<wgpu::RenderPipeline>,
    shader_error: Option<ShaderError>,
    entity_buffer: wgpu::Buffer,
    entity_count: u32,
    atlas_texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

impl ArenaRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        arena: &mut Arena,
        atlas: Option<&GlyphAtlas>,
        params: &ShaderParams,
    ) -> Self {
        let entities = arena.gpu_entities(0..arena.entities().len());
        arena.take_dirty();
        let entity_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("arena_entities"),
            contents: bytemuck::cast_slice(&entities),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        let atlas_texture = create_atlas_texture(device, queue, atlas);
        let atlas_view = atlas_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("glyph_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("arena_bind_group_layout"),
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

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("arena_bind_group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&atlas_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let labels = atlas.map(|a| LabelGlyphs {
            height: a.height() as f32,
            glyphs: *a.glyphs(),
        });
        let source = shader::generate(params, labels.as_ref());
        let (pipeline, shader_error) = match shader::validate(&source) {
            Ok(_) => {
                let pipeline = create_pipeline(device, format, &bind_group_layout, &source);
                (Some(pipeline), None)
            }
            Err(e) => {
                log::error!("Arena shader rejected, rendering disabled: {e}");
                (None, Some(e))
            }
        };

        log::info!(
            "Arena renderer ready: {} entities, labels {}",
            entities.len(),
            if atlas.is_some() { "on" } else { "off" }
        );

        Self {
            pipeline,
            shader_error,
            entity_buffer,
            entity_count: entities.len() as u32,
            atlas_texture,
            bind_group,
        }
    }

    /// Whether the shader failed and `draw` does nothing
    pub fn is_degraded(&self) -> bool {
        self.pipeline.is_none()
    }

    pub fn shader_error(&self) -> Option<&ShaderError> {
        self.shader_error.as_ref()
    }

    /// Upload whatever changed in the store since the last sync
    pub fn sync(&self, queue: &wgpu::Queue, arena: &mut Arena) {
        let Some(range) = arena.take_dirty() else {
            return;
        };
        let offset = range.start as wgpu::BufferAddress * GpuEntity::SIZE;
        let data = arena.gpu_entities(range);
        queue.write_buffer(&self.entity_buffer, offset, bytemuck::cast_slice(&data));
    }

    /// Record the arena draw: one 4-vertex strip per entity
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        let Some(pipeline) = &self.pipeline else {
            return;
        };
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.entity_buffer.slice(..));
        pass.draw(0..4, 0..self.entity_count);
    }
}

impl Drop for ArenaRenderer {
    fn drop(&mut self) {
        self.entity_buffer.destroy();
        self.atlas_texture.destroy();
    }
}

/// R8 atlas texture; a single blank texel stands in when labels are off
fn create_atlas_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    atlas: Option<&GlyphAtlas>,
) -> wgpu::Texture {
    let blank = [0u8];
    let (width, height, pixels) = match atlas {
        Some(a) => (a.width(), a.height(), a.pixels()),
        None => (1, 1, &blank[..]),
    };
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("glyph_atlas"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::R8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width),
            rows_per_image: Some(height),
        },
        size,
    );
    texture
}

fn create_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    bind_group_layout: &wgpu::BindGroupLayout,
    source: &str,
) -> wgpu::RenderPipeline {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("arena_shader"),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("arena_pipeline_layout"),
        bind_group_layouts: &[bind_group_layout],
        immediate_size: 0,
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("arena_pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: Some("vs_main"),
            buffers: &[GpuEntity::desc()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}
