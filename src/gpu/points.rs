//! Instanced billboard rendering for particle fields.
//!
//! Every point layer draws six vertices per particle from four per-instance
//! vertex buffers (position, size, phase, color). Columns a field does not
//! have are filled with a constant once when the buffers are created.

use std::collections::HashMap;

use glam::Vec3;

use super::{DEPTH_FORMAT, HDR_FORMAT};
use crate::field::PointColumns;
use crate::shader::{LayerUniforms, PointShader};
use crate::textures::TextureConfig;
use crate::visuals::BlendMode;

const POSITION_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
const SIZE_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32];
const PHASE_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32];
const COLOR_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![3 => Float32x3];

fn instance_layouts() -> [wgpu::VertexBufferLayout<'static>; 4] {
    let layout = |stride: usize, attributes: &'static [wgpu::VertexAttribute]| {
        wgpu::VertexBufferLayout {
            array_stride: stride as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes,
        }
    };
    [
        layout(12, &POSITION_ATTRS),
        layout(4, &SIZE_ATTRS),
        layout(4, &PHASE_ATTRS),
        layout(12, &COLOR_ATTRS),
    ]
}

impl PointShader {
    fn blend_mode(self) -> BlendMode {
        match self {
            PointShader::SnowSprite => BlendMode::Alpha,
            _ => BlendMode::Additive,
        }
    }
}

/// Render pipelines for every point layer plus the layouts they share.
pub struct PointPipelines {
    pipelines: HashMap<PointShader, wgpu::RenderPipeline>,
    pub uniform_layout: wgpu::BindGroupLayout,
    pub texture_layout: wgpu::BindGroupLayout,
}

impl PointPipelines {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Point Layer Uniform Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Point Sprite Layout"),
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

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Point Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let buffers = instance_layouts();
        let pipelines = PointShader::ALL
            .iter()
            .map(|&kind| {
                let source = kind.source();
                let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(kind.label()),
                    source: wgpu::ShaderSource::Wgsl(source.into()),
                });
                let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(kind.label()),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &module,
                        entry_point: Some("vs_main"),
                        buffers: &buffers,
                        compilation_options: Default::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &module,
                        entry_point: Some("fs_main"),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: HDR_FORMAT,
                            blend: Some(kind.blend_mode().to_blend_state()),
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                        compilation_options: Default::default(),
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        ..Default::default()
                    },
                    // Particles test against depth but never write it.
                    depth_stencil: Some(wgpu::DepthStencilState {
                        format: DEPTH_FORMAT,
                        depth_write_enabled: false,
                        depth_compare: wgpu::CompareFunction::Less,
                        stencil: wgpu::StencilState::default(),
                        bias: wgpu::DepthBiasState::default(),
                    }),
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                });
                (kind, pipeline)
            })
            .collect();

        Self {
            pipelines,
            uniform_layout,
            texture_layout,
        }
    }

    pub fn get(&self, kind: PointShader) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(&kind)
    }
}

/// A texture uploaded for sampling by point layers.
pub struct SpriteTexture {
    pub bind_group: wgpu::BindGroup,
    /// Edge length of the source image, used to detect changes.
    pub size: u32,
}

impl SpriteTexture {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        config: &TextureConfig,
    ) -> Self {
        let extent = wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Sprite Texture"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
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
            &config.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(config.width * 4),
                rows_per_image: Some(config.height),
            },
            extent,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let filter = config.filter.to_wgpu();
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Sprite Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sprite Bind Group"),
            layout,
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
        Self {
            bind_group,
            size: config.width,
        }
    }
}

struct InstanceBuffers {
    positions: wgpu::Buffer,
    sizes: wgpu::Buffer,
    phases: wgpu::Buffer,
    colors: wgpu::Buffer,
    len: usize,
}

impl InstanceBuffers {
    fn new(device: &wgpu::Device, label: &str, len: usize) -> Self {
        let buffer = |name: &str, stride: usize| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("{label} {name}")),
                size: (len.max(1) * stride) as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        Self {
            positions: buffer("Positions", 12),
            sizes: buffer("Sizes", 4),
            phases: buffer("Phases", 4),
            colors: buffer("Colors", 12),
            len,
        }
    }
}

/// GPU side of one particle field.
pub struct PointLayer {
    label: &'static str,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    instances: Option<InstanceBuffers>,
}

impl PointLayer {
    pub fn new(device: &wgpu::Device, pipelines: &PointPipelines, label: &'static str) -> Self {
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<LayerUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &pipelines.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        Self {
            label,
            uniform_buffer,
            uniform_bind_group,
            instances: None,
        }
    }

    /// Push changed columns to the GPU, reallocating when the particle
    /// count changed.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        mut columns: PointColumns<'_>,
    ) {
        let len = columns.positions.len();
        let fresh = self.instances.as_ref().map_or(true, |b| b.len != len);
        if fresh {
            log::debug!("allocating {} instance buffers for {len} particles", self.label);
            let buffers = InstanceBuffers::new(device, self.label, len);
            if columns.sizes.is_none() {
                queue.write_buffer(&buffers.sizes, 0, bytemuck::cast_slice(&vec![1.0f32; len]));
            }
            if columns.phases.is_none() {
                queue.write_buffer(&buffers.phases, 0, bytemuck::cast_slice(&vec![0.0f32; len]));
            }
            if columns.colors.is_none() {
                queue.write_buffer(&buffers.colors, 0, bytemuck::cast_slice(&vec![Vec3::ONE; len]));
            }
            self.instances = Some(buffers);
        }
        let Some(buffers) = self.instances.as_ref() else {
            return;
        };

        if columns.positions.take_dirty() || fresh {
            queue.write_buffer(&buffers.positions, 0, columns.positions.as_bytes());
        }
        if let Some(sizes) = columns.sizes {
            if sizes.take_dirty() || fresh {
                queue.write_buffer(&buffers.sizes, 0, sizes.as_bytes());
            }
        }
        if let Some(phases) = columns.phases {
            if phases.take_dirty() || fresh {
                queue.write_buffer(&buffers.phases, 0, phases.as_bytes());
            }
        }
        if let Some(colors) = columns.colors {
            if colors.take_dirty() || fresh {
                queue.write_buffer(&buffers.colors, 0, colors.as_bytes());
            }
        }
    }

    pub fn write_uniforms(&self, queue: &wgpu::Queue, uniforms: &LayerUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    pub fn draw(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        pipeline: &wgpu::RenderPipeline,
        sprite: &wgpu::BindGroup,
    ) {
        let Some(buffers) = self.instances.as_ref() else {
            return;
        };
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        pass.set_bind_group(1, sprite, &[]);
        pass.set_vertex_buffer(0, buffers.positions.slice(..));
        pass.set_vertex_buffer(1, buffers.sizes.slice(..));
        pass.set_vertex_buffer(2, buffers.phases.slice(..));
        pass.set_vertex_buffer(3, buffers.colors.slice(..));
        pass.draw(0..6, 0..buffers.len as u32);
    }
}
