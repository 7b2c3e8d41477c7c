use std::sync::Arc;

use anyhow::Context;
use bytemuck::{Pod, Zeroable};
use wgpu::CommandEncoderDescriptor;
use winit::window::Window;

use crate::camera::{Camera, CameraUniform};
use crate::geometry::GeometryId;
use crate::light::aggregate_lights;
use crate::math::Mat4;
use crate::rendering::mesh_buffers::{MeshBufferCache, ModelUniform};
use crate::rendering::texture::DepthTexture;
use crate::scene_graph::{NodeId, NodeKind, Scene};

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.94,
    g: 0.94,
    b: 0.96,
    a: 1.0,
};

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct LightsUniform {
    ambient: [f32; 4],
    directional_color: [f32; 4],
    directional_dir: [f32; 4],
}

pub struct Renderer {
    pub window: Arc<Window>,
    pub size: winit::dpi::PhysicalSize<u32>,

    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,

    depth_texture: DepthTexture,
    pipeline: wgpu::RenderPipeline,
    frame_bind_group: wgpu::BindGroup,
    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,
    lights_buffer: wgpu::Buffer,
    model_bind_group_layout: wgpu::BindGroupLayout,
    cache: MeshBufferCache,
}

impl Renderer {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Renderer> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window.clone())
            .context("Failed to create rendering surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No compatible GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                label: None,
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Failed to acquire GPU device")?;

        let capabilities = surface.get_capabilities(&adapter);
        let format = capabilities
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(capabilities.formats[0]);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: capabilities.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = DepthTexture::new(&device, &config, "Depth texture");

        let camera_uniform = CameraUniform::new();
        let camera_buffer = camera_uniform.create_buffer(&device);
        let lights_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Lights uniform buffer"),
            size: std::mem::size_of::<LightsUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("frame_bind_group_layout"),
                entries: &[
                    uniform_layout_entry(0),
                    uniform_layout_entry(1),
                ],
            });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame_bind_group"),
            layout: &frame_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lights_buffer.as_entire_binding(),
                },
            ],
        });

        let model_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("model_bind_group_layout"),
                entries: &[uniform_layout_entry(0)],
            });

        let pipeline = create_pipeline(
            &device,
            format,
            &frame_bind_group_layout,
            &model_bind_group_layout,
        );

        Ok(Self {
            window,
            size,
            surface,
            device,
            queue,
            config,
            depth_texture,
            pipeline,
            frame_bind_group,
            camera_uniform,
            camera_buffer,
            lights_buffer,
            model_bind_group_layout,
            cache: MeshBufferCache::new(),
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture.resize(&self.device, &self.config);
        }
    }

    pub fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height.max(1) as f32
    }

    /// Frees the device buffers for geometries that permanently left the
    /// scene, such as a replaced model's meshes.
    pub fn release_geometries(&mut self, ids: &[GeometryId]) {
        for &id in ids {
            self.cache.release(id);
        }
    }

    /// Draws one frame. The scene's world transforms must already be up to
    /// date for this frame.
    pub fn render(
        &mut self,
        scene: &Scene,
        camera: &Camera,
        camera_node: NodeId,
    ) -> Result<(), wgpu::SurfaceError> {
        let camera_world = scene
            .get(camera_node)
            .map(|node| node.transform.world_matrix())
            .unwrap_or(Mat4::IDENTITY);
        self.camera_uniform
            .update(camera, &camera_world, self.aspect());
        self.camera_uniform
            .update_buffer(&self.queue, &self.camera_buffer);

        let totals = aggregate_lights(scene);
        let lights = LightsUniform {
            ambient: [totals.ambient.x, totals.ambient.y, totals.ambient.z, 0.0],
            directional_color: [
                totals.directional_color.x,
                totals.directional_color.y,
                totals.directional_color.z,
                0.0,
            ],
            directional_dir: [
                totals.direction.x,
                totals.direction.y,
                totals.direction.z,
                0.0,
            ],
        };
        self.queue
            .write_buffer(&self.lights_buffer, 0, bytemuck::cast_slice(&[lights]));

        // Upload pass: make sure every visible geometry has device buffers
        // and fresh per-draw uniforms before the render pass borrows the
        // cache immutably.
        let mut draws: Vec<GeometryId> = Vec::new();
        {
            let cache = &mut self.cache;
            let device = &self.device;
            let queue = &self.queue;
            let layout = &self.model_bind_group_layout;
            scene.traverse(scene.root(), &mut |_, node| {
                let NodeKind::Mesh(payload) = &node.kind else {
                    return;
                };
                cache.ensure(device, layout, &payload.geometry);

                let world = node.transform.world_matrix();
                let color = payload.material.base_color;
                let uniform = ModelUniform {
                    model: world,
                    normal: world.inverse().transpose(),
                    base_color: [color.x, color.y, color.z, 1.0],
                    params: [
                        if payload.material.vertex_colors { 1.0 } else { 0.0 },
                        0.0,
                        0.0,
                        0.0,
                    ],
                };
                if let Some(entry) = cache.get(payload.geometry.id()) {
                    queue.write_buffer(&entry.uniform, 0, bytemuck::cast_slice(&[uniform]));
                }
                draws.push(payload.geometry.id());
            });
        }

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("Render encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Model pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.depth_texture.view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.frame_bind_group, &[]);

            for id in draws {
                let Some(entry) = self.cache.get(id) else {
                    continue;
                };
                render_pass.set_bind_group(1, &entry.bind_group, &[]);
                render_pass.set_vertex_buffer(0, entry.position.slice(..));
                render_pass.set_vertex_buffer(1, entry.normal.slice(..));
                render_pass.set_vertex_buffer(2, entry.color.slice(..));

                match &entry.index {
                    Some((buffer, format, count)) => {
                        render_pass.set_index_buffer(buffer.slice(..), *format);
                        render_pass.draw_indexed(0..*count, 0, 0..1);
                    }
                    None => {
                        render_pass.draw(0..entry.vertex_count, 0..1);
                    }
                }
            }
        }

        self.queue.submit([encoder.finish()]);
        output.present();

        Ok(())
    }
}

fn uniform_layout_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    frame_layout: &wgpu::BindGroupLayout,
    model_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    // Shader or pipeline validation failure here is fatal for the session;
    // there is no fallback shader.
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Lambert shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Render pipeline layout"),
        bind_group_layouts: &[frame_layout, model_layout],
        push_constant_ranges: &[],
    });

    fn vec3_layout(attributes: &[wgpu::VertexAttribute]) -> wgpu::VertexBufferLayout {
        wgpu::VertexBufferLayout {
            array_stride: 12,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }
    }

    const POSITION: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
    const NORMAL: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x3];
    const COLOR: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32x3];

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Lambert render pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[
                vec3_layout(&POSITION),
                vec3_layout(&NORMAL),
                vec3_layout(&COLOR),
            ],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
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
            format: DepthTexture::DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}
