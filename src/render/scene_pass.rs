use fnv::{FnvHashMap, FnvHashSet};
use glam::{Mat3, Mat4};
use ring_core::compositor::{draw_phase, DrawPhase};
use ring_core::lights::PointLight;
use ring_core::{DrawItem, Experience, MeshData, MeshId, NodeId, Scene, MAX_SKIN_JOINTS};
use wgpu::util::DeviceExt;

use super::helpers::{linear_rgb, DEPTH_STENCIL_FORMAT, HDR_FORMAT};
use crate::constants::{
    INITIAL_JOINT_SLOTS, INITIAL_MODEL_SLOTS, JOINT_PALETTE_STRIDE, MODEL_UNIFORM_STRIDE,
};

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
    joints: [u16; 4],
    weights: [f32; 4],
}

const VERTEX_ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x3,
    2 => Uint16x4,
    3 => Float32x4
];

const IDENTITY_COLS: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
];

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct LightPacked {
    position_distance: [f32; 4],
    color_decay: [f32; 4],
}

impl LightPacked {
    fn from_light(light: &PointLight) -> Self {
        let c = linear_rgb(light.color) * light.intensity;
        Self {
            position_distance: light.position.extend(light.distance).to_array(),
            color_decay: c.extend(light.decay).to_array(),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct SceneUniforms {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    ambient: [f32; 4],
    key: LightPacked,
    fill: LightPacked,
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ModelUniforms {
    model: [[f32; 4]; 4],
    normal_mat: [[f32; 4]; 4],
    color_emissive: [f32; 4],
    params: [f32; 4], // metalness, roughness, bloom flag, unused
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

/// Forward pass over the scene's draw items.
///
/// Three pipelines cover the stencil roles: cutouts paint their black
/// material and stamp their id without writing depth, tile content tests
/// `Equal` against it, and everything else ignores the stencil. The stencil
/// reference is set per draw from the item's material.
///
/// Skinned nodes get one slot each in the joint palette buffer; slot 0 holds
/// identity matrices and is bound for static draws.
pub(crate) struct ScenePass {
    scene_uniform_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,
    model_bgl: wgpu::BindGroupLayout,
    model_buffer: wgpu::Buffer,
    model_bind_group: wgpu::BindGroup,
    model_capacity: usize,
    staging: Vec<u8>,
    joint_bgl: wgpu::BindGroupLayout,
    joint_buffer: wgpu::Buffer,
    joint_bind_group: wgpu::BindGroup,
    joint_capacity: usize,
    joint_staging: Vec<[f32; 16]>,
    /// Palette slot per draw, parallel to the prepared draw list.
    joint_slots: Vec<u32>,
    palette_limit_warned: FnvHashSet<NodeId>,
    writer_pipeline: wgpu::RenderPipeline,
    reader_pipeline: wgpu::RenderPipeline,
    plain_pipeline: wgpu::RenderPipeline,
    meshes: FnvHashMap<MeshId, GpuMesh>,
}

fn uniform_entry(dynamic: bool, size: u64) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size: wgpu::BufferSize::new(size),
        },
        count: None,
    }
}

fn stencil_face(compare: wgpu::CompareFunction, pass_op: wgpu::StencilOperation) -> wgpu::StencilFaceState {
    wgpu::StencilFaceState {
        compare,
        fail_op: wgpu::StencilOperation::Keep,
        depth_fail_op: wgpu::StencilOperation::Keep,
        pass_op,
    }
}

fn make_scene_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    phase: DrawPhase,
) -> wgpu::RenderPipeline {
    let face = match phase {
        DrawPhase::StencilWrite => {
            stencil_face(wgpu::CompareFunction::Always, wgpu::StencilOperation::Replace)
        }
        DrawPhase::StencilTest => {
            stencil_face(wgpu::CompareFunction::Equal, wgpu::StencilOperation::Replace)
        }
        DrawPhase::Plain => stencil_face(wgpu::CompareFunction::Always, wgpu::StencilOperation::Keep),
    };
    let write_mask = if phase.writes_color() {
        wgpu::ColorWrites::ALL
    } else {
        wgpu::ColorWrites::empty()
    };
    let color_target = Some(wgpu::ColorTargetState {
        format: HDR_FORMAT,
        blend: None,
        write_mask,
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &VERTEX_ATTRS,
            }],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_STENCIL_FORMAT,
            depth_write_enabled: phase.writes_depth(),
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState {
                front: face,
                back: face,
                read_mask: 0xff,
                write_mask: 0xff,
            },
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[color_target.clone(), color_target],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        cache: None,
        multiview: None,
    })
}

fn create_model_buffer(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    slots: usize,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("model_uniforms"),
        size: slots as u64 * MODEL_UNIFORM_STRIDE,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("model_bg"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(std::mem::size_of::<ModelUniforms>() as u64),
            }),
        }],
    });
    (buffer, bind_group)
}

fn create_joint_buffer(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    slots: usize,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let identity = vec![IDENTITY_COLS; MAX_SKIN_JOINTS * slots];
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("joint_palettes"),
        contents: bytemuck::cast_slice(&identity),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("joint_bg"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(JOINT_PALETTE_STRIDE),
            }),
        }],
    });
    (buffer, bind_group)
}

fn upload_mesh(device: &wgpu::Device, id: MeshId, mesh: &MeshData) -> GpuMesh {
    let vertices: Vec<Vertex> = mesh
        .positions
        .iter()
        .zip(mesh.normals.iter())
        .enumerate()
        .map(|(i, (p, n))| {
            let (joints, weights) = match &mesh.skin {
                Some(skin) => (
                    skin.joints.get(i).copied().unwrap_or([0; 4]),
                    skin.weights.get(i).copied().unwrap_or([0.0; 4]),
                ),
                None => ([0; 4], [0.0; 4]),
            };
            Vertex {
                position: *p,
                normal: *n,
                joints,
                weights,
            }
        })
        .collect();
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("mesh{}_vertices", id.index())),
        contents: bytemuck::cast_slice(&vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("mesh{}_indices", id.index())),
        contents: bytemuck::cast_slice(&mesh.indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    GpuMesh {
        vertex_buffer,
        index_buffer,
        index_count: mesh.indices.len() as u32,
    }
}

impl ScenePass {
    pub(crate) fn new(device: &wgpu::Device, shader: &wgpu::ShaderModule) -> Self {
        let scene_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene_bgl"),
            entries: &[uniform_entry(
                false,
                std::mem::size_of::<SceneUniforms>() as u64,
            )],
        });
        let model_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("model_bgl"),
            entries: &[uniform_entry(
                true,
                std::mem::size_of::<ModelUniforms>() as u64,
            )],
        });
        let scene_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scene_uniforms"),
            size: std::mem::size_of::<SceneUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene_bg"),
            layout: &scene_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: scene_uniform_buffer.as_entire_binding(),
            }],
        });
        let joint_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("joint_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                visibility: wgpu::ShaderStages::VERTEX,
                ..uniform_entry(true, JOINT_PALETTE_STRIDE)
            }],
        });
        let (model_buffer, model_bind_group) =
            create_model_buffer(device, &model_bgl, INITIAL_MODEL_SLOTS);
        let (joint_buffer, joint_bind_group) =
            create_joint_buffer(device, &joint_bgl, INITIAL_JOINT_SLOTS);

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_pl"),
            bind_group_layouts: &[&scene_bgl, &model_bgl, &joint_bgl],
            push_constant_ranges: &[],
        });
        let writer_pipeline = make_scene_pipeline(
            device,
            "stencil_writer_pipeline",
            &layout,
            shader,
            DrawPhase::StencilWrite,
        );
        let reader_pipeline = make_scene_pipeline(
            device,
            "stencil_reader_pipeline",
            &layout,
            shader,
            DrawPhase::StencilTest,
        );
        let plain_pipeline =
            make_scene_pipeline(device, "plain_pipeline", &layout, shader, DrawPhase::Plain);

        Self {
            scene_uniform_buffer,
            scene_bind_group,
            model_bgl,
            model_buffer,
            model_bind_group,
            model_capacity: INITIAL_MODEL_SLOTS,
            staging: Vec::new(),
            joint_bgl,
            joint_buffer,
            joint_bind_group,
            joint_capacity: INITIAL_JOINT_SLOTS,
            joint_staging: Vec::new(),
            joint_slots: Vec::new(),
            palette_limit_warned: FnvHashSet::default(),
            writer_pipeline,
            reader_pipeline,
            plain_pipeline,
            meshes: FnvHashMap::default(),
        }
    }

    /// Upload any meshes not yet on the GPU and write this frame's uniforms.
    pub(crate) fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        experience: &Experience,
        draws: &[DrawItem],
    ) {
        self.upload_missing(device, experience.scene(), draws);

        let cam = experience.camera().camera();
        let lights = experience.lights();
        let scene = SceneUniforms {
            view_proj: cam.view_proj().to_cols_array_2d(),
            camera_pos: cam.position.extend(1.0).to_array(),
            ambient: (linear_rgb(lights.ambient_color) * lights.ambient_intensity)
                .extend(1.0)
                .to_array(),
            key: LightPacked::from_light(&lights.key),
            fill: LightPacked::from_light(&lights.fill),
        };
        queue.write_buffer(&self.scene_uniform_buffer, 0, bytemuck::bytes_of(&scene));

        self.prepare_palettes(device, queue, experience.scene(), draws);
        if draws.is_empty() {
            return;
        }
        if draws.len() > self.model_capacity {
            let slots = draws.len().next_power_of_two();
            (self.model_buffer, self.model_bind_group) =
                create_model_buffer(device, &self.model_bgl, slots);
            self.model_capacity = slots;
            log::debug!("[gpu] model uniform slots grown to {slots}");
        }
        let stride = MODEL_UNIFORM_STRIDE as usize;
        self.staging.clear();
        self.staging.resize(draws.len() * stride, 0);
        let bloom = experience.bloom_selection();
        for (slot, item) in draws.iter().enumerate() {
            let m = &item.material;
            let normal_mat = Mat4::from_mat3(Mat3::from_mat4(item.world).inverse().transpose());
            let uniforms = ModelUniforms {
                model: item.world.to_cols_array_2d(),
                normal_mat: normal_mat.to_cols_array_2d(),
                color_emissive: linear_rgb(m.color).extend(m.emissive).to_array(),
                params: [
                    m.metalness,
                    m.roughness,
                    if bloom.contains(item.node) { 1.0 } else { 0.0 },
                    0.0,
                ],
            };
            let bytes = bytemuck::bytes_of(&uniforms);
            let start = slot * stride;
            self.staging[start..start + bytes.len()].copy_from_slice(bytes);
        }
        queue.write_buffer(&self.model_buffer, 0, &self.staging);
    }

    /// Assign palette slots to skinned nodes and upload their matrices.
    fn prepare_palettes(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &Scene,
        draws: &[DrawItem],
    ) {
        self.joint_slots.clear();
        // Slot 0 stays identity.
        let mut slot_of: FnvHashMap<NodeId, u32> = FnvHashMap::default();
        let mut palettes: Vec<&[Mat4]> = Vec::new();
        for item in draws {
            let slot = match (item.skinned, scene.joint_palette(item.node)) {
                (true, Some(palette)) => *slot_of.entry(item.node).or_insert_with(|| {
                    palettes.push(palette);
                    palettes.len() as u32
                }),
                _ => 0,
            };
            self.joint_slots.push(slot);
        }
        if palettes.is_empty() {
            return;
        }

        let needed = palettes.len() + 1;
        if needed > self.joint_capacity {
            let slots = needed.next_power_of_two();
            (self.joint_buffer, self.joint_bind_group) =
                create_joint_buffer(device, &self.joint_bgl, slots);
            self.joint_capacity = slots;
            log::debug!("[gpu] joint palette slots grown to {slots}");
        }

        self.joint_staging.clear();
        self.joint_staging
            .resize(palettes.len() * MAX_SKIN_JOINTS, IDENTITY_COLS);
        for (node, &slot) in &slot_of {
            let palette = palettes[slot as usize - 1];
            if palette.len() > MAX_SKIN_JOINTS && self.palette_limit_warned.insert(*node) {
                log::warn!(
                    "[gpu] node {} has {} joints; only the first {MAX_SKIN_JOINTS} are skinned",
                    node.index(),
                    palette.len()
                );
            }
            let start = (slot as usize - 1) * MAX_SKIN_JOINTS;
            for (dst, m) in self.joint_staging[start..start + MAX_SKIN_JOINTS]
                .iter_mut()
                .zip(palette)
            {
                *dst = m.to_cols_array();
            }
        }
        queue.write_buffer(
            &self.joint_buffer,
            JOINT_PALETTE_STRIDE,
            bytemuck::cast_slice(&self.joint_staging),
        );
    }

    fn upload_missing(&mut self, device: &wgpu::Device, scene: &Scene, draws: &[DrawItem]) {
        for item in draws {
            if self.meshes.contains_key(&item.mesh) {
                continue;
            }
            let Some(mesh) = scene.mesh(item.mesh) else {
                continue;
            };
            self.meshes.insert(item.mesh, upload_mesh(device, item.mesh, mesh));
            log::debug!(
                "[gpu] uploaded mesh {} ({} triangles)",
                item.mesh.index(),
                mesh.triangle_count()
            );
        }
    }

    /// Record the draws; `draws` must be the slice given to [`Self::prepare`].
    pub(crate) fn draw(&self, rpass: &mut wgpu::RenderPass<'_>, draws: &[DrawItem]) {
        rpass.set_bind_group(0, &self.scene_bind_group, &[]);
        for (slot, item) in draws.iter().enumerate() {
            let Some(mesh) = self.meshes.get(&item.mesh) else {
                continue;
            };
            if mesh.index_count == 0 {
                continue;
            }
            let pipeline = match draw_phase(item) {
                DrawPhase::StencilWrite => &self.writer_pipeline,
                DrawPhase::StencilTest => &self.reader_pipeline,
                DrawPhase::Plain => &self.plain_pipeline,
            };
            rpass.set_pipeline(pipeline);
            rpass.set_stencil_reference(item.material.stencil.reference as u32);
            let offset = (slot as u64 * MODEL_UNIFORM_STRIDE) as u32;
            rpass.set_bind_group(1, &self.model_bind_group, &[offset]);
            let joint_slot = self.joint_slots.get(slot).copied().unwrap_or(0);
            let joint_offset = (joint_slot as u64 * JOINT_PALETTE_STRIDE) as u32;
            rpass.set_bind_group(2, &self.joint_bind_group, &[joint_offset]);
            rpass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            rpass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }
}
