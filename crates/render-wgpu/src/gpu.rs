use crate::shaders;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use globe_common::{CameraState, Transform, VariantId};
use globe_kernel::{GlobeScene, SceneNode};
use globe_surface::{Geometry, Resolution, SurfaceVariant};
use std::collections::HashMap;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    light_dir: [f32; 4],
    light_color: [f32; 4],
    ambient: [f32; 4],
    star: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
    /// Elevation normalised to `[0, 1]` over the material's displacement range.
    relief: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct InstanceData {
    model_0: [f32; 4],
    model_1: [f32; 4],
    model_2: [f32; 4],
    model_3: [f32; 4],
    color: [f32; 4],
    /// Specular colour in rgb, shininess in w.
    specular: [f32; 4],
    /// Bump scale in x.
    surface: [f32; 4],
}

impl InstanceData {
    fn new(
        transform: &Transform,
        color: [f32; 4],
        specular: [f32; 3],
        shininess: f32,
        bump_scale: f32,
    ) -> Self {
        let cols = transform.matrix().to_cols_array_2d();
        Self {
            model_0: cols[0],
            model_1: cols[1],
            model_2: cols[2],
            model_3: cols[3],
            color,
            specular: [specular[0], specular[1], specular[2], shininess],
            surface: [bump_scale, 0.0, 0.0, 0.0],
        }
    }
}

/// Instance slots in the shared instance buffer.
const SURFACE_SLOT: u64 = 0;
const CLOUD_SLOT: u64 = 1;

/// Index and vertex buffers for one mesh.
struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    /// Geometry generation this upload reflects.
    generation: u64,
}

impl GpuMesh {
    fn upload(device: &wgpu::Device, label: &str, vertices: &[Vertex], indices: &[u32], generation: u64) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            generation,
        }
    }
}

/// Star billboard half extent in clip units for a world-space `size`
/// (diameter), followed by the size of one pixel in NDC.
fn star_extent(size: f32, projection: Mat4, width: u32, height: u32) -> [f32; 4] {
    let half = size.max(0.0) * 0.5;
    [
        projection.x_axis.x * half,
        projection.y_axis.y * half,
        1.0 / width.max(1) as f32,
        1.0 / height.max(1) as f32,
    ]
}

/// Interleave a variant's displaced geometry with normalised relief.
fn variant_vertices(variant: &SurfaceVariant) -> Vec<Vertex> {
    let geometry = variant.geometry();
    let material = variant.material();
    let radius = geometry.radius();
    let scale = material.displacement_scale;
    let bias = material.displacement_bias;
    geometry
        .positions()
        .iter()
        .zip(geometry.normals())
        .map(|(p, n)| {
            let relief = if material.displacement.is_some() && scale.abs() > f32::EPSILON {
                ((p.length() - radius - bias) / scale).clamp(0.0, 1.0)
            } else {
                0.0
            };
            Vertex {
                position: p.to_array(),
                normal: n.to_array(),
                relief,
            }
        })
        .collect()
}

fn plain_vertices(geometry: &Geometry) -> Vec<Vertex> {
    geometry
        .positions()
        .iter()
        .zip(geometry.normals())
        .map(|(p, n)| Vertex {
            position: p.to_array(),
            normal: n.to_array(),
            relief: 0.0,
        })
        .collect()
}

/// wgpu-based globe renderer: surface variants, clouds and stars.
pub struct GlobeRenderer {
    surface_pipeline: wgpu::RenderPipeline,
    cloud_pipeline: wgpu::RenderPipeline,
    star_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    instance_buffer: wgpu::Buffer,
    variant_meshes: HashMap<VariantId, GpuMesh>,
    cloud_mesh: Option<GpuMesh>,
    star_buffer: Option<(wgpu::Buffer, u32)>,
    depth_texture: wgpu::TextureView,
    surface_format: wgpu::TextureFormat,
    viewport: (u32, u32),
}

impl GlobeRenderer {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("uniform_buffer"),
            contents: bytemuck::bytes_of(&Uniforms {
                view_proj: Mat4::IDENTITY.to_cols_array_2d(),
                camera_pos: [0.0; 4],
                light_dir: [0.0, 1.0, 0.0, 0.0],
                light_color: [1.0; 4],
                ambient: [0.5, 0.5, 0.5, 1.0],
                star: [0.0; 4],
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let globe_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("globe_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::GLOBE_SHADER.into()),
        });

        let mesh_buffers = [
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![
                    0 => Float32x3,
                    1 => Float32x3,
                    2 => Float32,
                ],
            },
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<InstanceData>() as u64,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &wgpu::vertex_attr_array![
                    3 => Float32x4,
                    4 => Float32x4,
                    5 => Float32x4,
                    6 => Float32x4,
                    7 => Float32x4,
                    8 => Float32x4,
                    9 => Float32x4,
                ],
            },
        ];

        let mesh_pipeline = |label: &str, entry: &str, blend: wgpu::BlendState, depth_write: bool| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &globe_shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &mesh_buffers,
                },
                fragment: Some(wgpu::FragmentState {
                    module: &globe_shader,
                    entry_point: Some(entry),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: surface_format,
                        blend: Some(blend),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: Some(wgpu::Face::Back),
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: wgpu::TextureFormat::Depth32Float,
                    depth_write_enabled: depth_write,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: Default::default(),
                    bias: Default::default(),
                }),
                multisample: Default::default(),
                multiview: None,
                cache: None,
            })
        };

        let surface_pipeline =
            mesh_pipeline("surface_pipeline", "fs_surface", wgpu::BlendState::REPLACE, true);
        let cloud_pipeline = mesh_pipeline(
            "cloud_pipeline",
            "fs_cloud",
            wgpu::BlendState::ALPHA_BLENDING,
            false,
        );

        let star_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("star_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::STAR_SHADER.into()),
        });

        let star_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("star_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &star_shader,
                entry_point: Some("vs_star"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 3]>() as u64,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &star_shader,
                entry_point: Some("fs_star"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("instance_buffer"),
            size: 2 * std::mem::size_of::<InstanceData>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let depth_texture = Self::create_depth_texture(device, width, height);

        Self {
            surface_pipeline,
            cloud_pipeline,
            star_pipeline,
            uniform_buffer,
            uniform_bind_group,
            instance_buffer,
            variant_meshes: HashMap::new(),
            cloud_mesh: None,
            star_buffer: None,
            depth_texture,
            surface_format,
            viewport: (width, height),
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_texture = Self::create_depth_texture(device, width, height);
        self.viewport = (width, height);
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    /// Number of variant meshes currently resident on the GPU.
    pub fn cached_variants(&self) -> usize {
        self.variant_meshes.len()
    }

    /// Upload (or re-upload) the mesh for `variant` if its geometry changed.
    fn sync_variant(&mut self, device: &wgpu::Device, variant: &SurfaceVariant) {
        let generation = variant.geometry().generation();
        let stale = self
            .variant_meshes
            .get(&variant.id())
            .is_none_or(|mesh| mesh.generation != generation);
        if stale {
            tracing::debug!(
                variant = %variant.id().short(),
                generation,
                "uploading variant mesh"
            );
            let mesh = GpuMesh::upload(
                device,
                "variant_mesh",
                &variant_vertices(variant),
                variant.geometry().indices(),
                generation,
            );
            self.variant_meshes.insert(variant.id(), mesh);
        }
    }

    fn ensure_static_meshes(&mut self, device: &wgpu::Device, scene: &GlobeScene) {
        if self.cloud_mesh.is_none() {
            let clouds = scene.clouds();
            let segments = clouds.segments.max(3);
            match Geometry::uv_sphere(clouds.radius, Resolution::new(segments, segments)) {
                Ok(geometry) => {
                    self.cloud_mesh = Some(GpuMesh::upload(
                        device,
                        "cloud_mesh",
                        &plain_vertices(&geometry),
                        geometry.indices(),
                        geometry.generation(),
                    ));
                }
                Err(e) => tracing::error!("failed to build cloud shell: {e}"),
            }
        }
        if self.star_buffer.is_none() {
            let positions: Vec<[f32; 3]> =
                scene.stars().positions().iter().map(|p| p.to_array()).collect();
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("star_buffer"),
                contents: bytemuck::cast_slice(&positions),
                usage: wgpu::BufferUsages::VERTEX,
            });
            self.star_buffer = Some((buffer, positions.len() as u32));
        }
    }

    /// Render one frame: stars, visible surface variant, clouds.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view: &wgpu::TextureView,
        scene: &GlobeScene,
        camera: &CameraState,
    ) {
        self.ensure_static_meshes(device, scene);

        let mut visible: Option<(&SurfaceVariant, Transform)> = None;
        let mut uniforms = Uniforms {
            view_proj: camera.view_projection().to_cols_array_2d(),
            camera_pos: camera.position.extend(1.0).to_array(),
            light_dir: [0.0, 1.0, 0.0, 0.0],
            light_color: [0.0, 0.0, 0.0, 1.0],
            ambient: [0.0, 0.0, 0.0, 1.0],
            star: [0.0; 4],
        };
        let mut cloud_instance = None;
        for node in scene.nodes() {
            match node {
                SceneNode::Variant { variant, transform } if variant.is_visible() => {
                    visible = Some((variant, transform));
                }
                SceneNode::Variant { .. } => {}
                SceneNode::Stars(stars) => {
                    let (width, height) = self.viewport;
                    uniforms.star =
                        star_extent(stars.size, camera.projection_matrix(), width, height);
                }
                SceneNode::Clouds(clouds) => {
                    cloud_instance = Some(InstanceData::new(
                        &clouds.transform(),
                        [1.0, 1.0, 1.0, clouds.opacity],
                        [0.0; 3],
                        1.0,
                        0.0,
                    ));
                }
                SceneNode::Ambient(light) => {
                    let c = Vec3::from(light.color) * light.intensity;
                    uniforms.ambient = c.extend(1.0).to_array();
                }
                SceneNode::Directional(light) => {
                    let c = Vec3::from(light.color) * light.intensity;
                    uniforms.light_color = c.extend(1.0).to_array();
                    uniforms.light_dir = light.direction().extend(0.0).to_array();
                }
            }
        }
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        if let Some((variant, _)) = visible {
            self.sync_variant(device, variant);
        }
        // drop meshes of variants that left the scene
        let live: Vec<VariantId> = scene.lod().variants().iter().map(|v| v.id()).collect();
        self.variant_meshes.retain(|id, _| live.contains(id));

        let instance_size = std::mem::size_of::<InstanceData>() as u64;
        if let Some((variant, transform)) = visible {
            let material = variant.material();
            let instance = InstanceData::new(
                &transform,
                material.base_color,
                material.specular,
                material.shininess,
                material.bump_scale,
            );
            queue.write_buffer(
                &self.instance_buffer,
                SURFACE_SLOT * instance_size,
                bytemuck::bytes_of(&instance),
            );
        }
        if let Some(instance) = &cloud_instance {
            queue.write_buffer(
                &self.instance_buffer,
                CLOUD_SLOT * instance_size,
                bytemuck::bytes_of(instance),
            );
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("render_encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);

            if let Some((buffer, count)) = &self.star_buffer {
                pass.set_pipeline(&self.star_pipeline);
                pass.set_vertex_buffer(0, buffer.slice(..));
                pass.draw(0..6, 0..*count);
            }

            let surface_mesh = visible.and_then(|(v, _)| self.variant_meshes.get(&v.id()));
            if let Some(mesh) = surface_mesh {
                pass.set_pipeline(&self.surface_pipeline);
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                let slot = SURFACE_SLOT as u32;
                pass.draw_indexed(0..mesh.index_count, 0, slot..slot + 1);
            }

            if let (Some(mesh), Some(_)) = (&self.cloud_mesh, &cloud_instance) {
                pass.set_pipeline(&self.cloud_pipeline);
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                let slot = CLOUD_SLOT as u32;
                pass.draw_indexed(0..mesh.index_count, 0, slot..slot + 1);
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use globe_surface::{DisplacementMap, Material};
    use std::sync::Arc;

    #[test]
    fn vertex_layouts_are_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 7 * 4);
        assert_eq!(std::mem::size_of::<InstanceData>(), 28 * 4);
        assert_eq!(std::mem::size_of::<Uniforms>(), 36 * 4);
    }

    #[test]
    fn relief_spans_displacement_range() {
        let map = DisplacementMap::new(2, 1, vec![0.0, 1.0]).unwrap();
        let material = Material {
            displacement: Some(map),
            displacement_scale: 0.5,
            ..Material::default()
        };
        let mut variant =
            SurfaceVariant::new(Resolution::new(4, 8), 5.0, Arc::new(material)).unwrap();
        variant.recompute_normals();
        let vertices = variant_vertices(&variant);
        assert_eq!(vertices.len(), variant.geometry().vertex_count());
        assert!(vertices.iter().all(|v| (0.0..=1.0).contains(&v.relief)));
        let max = vertices.iter().map(|v| v.relief).fold(0.0, f32::max);
        assert!(max > 0.5);
    }

    #[test]
    fn flat_surface_has_zero_relief() {
        let variant =
            SurfaceVariant::new(Resolution::new(4, 8), 5.0, Arc::new(Material::default())).unwrap();
        assert!(variant_vertices(&variant).iter().all(|v| v.relief == 0.0));
    }

    #[test]
    fn instance_carries_shininess() {
        let instance = InstanceData::new(&Transform::default(), [1.0; 4], [0.2; 3], 25.0, 0.05);
        assert_eq!(instance.specular[3], 25.0);
        assert_eq!(instance.surface[0], 0.05);
        assert_eq!(instance.model_0, [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn material_bump_scale_reaches_instance() {
        let material = Material {
            bump_scale: 0.2,
            ..Material::default()
        };
        let instance = InstanceData::new(
            &Transform::default(),
            material.base_color,
            material.specular,
            material.shininess,
            material.bump_scale,
        );
        assert_eq!(instance.surface, [0.2, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn star_extent_follows_size_and_projection() {
        let camera = CameraState::default();
        let projection = camera.projection_matrix();
        let extent = star_extent(0.1, projection, 1280, 720);
        assert!((extent[0] - projection.x_axis.x * 0.05).abs() < 1e-7);
        assert!((extent[1] - projection.y_axis.y * 0.05).abs() < 1e-7);
        assert_eq!(extent[2], 1.0 / 1280.0);
        assert_eq!(extent[3], 1.0 / 720.0);

        let larger = star_extent(0.4, projection, 1280, 720);
        assert!(larger[0] > extent[0] && larger[1] > extent[1]);
    }

    #[test]
    fn star_extent_tolerates_degenerate_input() {
        let extent = star_extent(-1.0, Mat4::IDENTITY, 0, 0);
        assert_eq!(extent, [0.0, 0.0, 1.0, 1.0]);
    }
}
