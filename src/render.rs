use ring_core::{Experience, PassKind};
use smallvec::SmallVec;
use web_sys as web;
use wgpu;

use crate::constants::CLEAR_COLOR_HEX;
use crate::trail::Trail;

mod helpers;
mod post;
mod scene_pass;
mod targets;

use helpers::TRAIL_FORMAT;
use post::PostResources;
use scene_pass::ScenePass;
use targets::RenderTargets;

// Bloom threshold soft knee width
const BLOOM_SMOOTHING: f32 = 0.025;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct PostUniforms {
    threshold: f32,
    smoothing: f32,
    bloom_intensity: f32,
    bloom_radius: f32,
    distortion_amplitude: f32,
    distortion_blend: f32,
    _pad: [f32; 2],
}

/// Bind groups that reference the size-dependent targets; rebuilt on resize.
struct PostBindGroups {
    hdr: wgpu::BindGroup,
    distorted: wgpu::BindGroup,
    bloom_src: wgpu::BindGroup,
    // group0 per bloom mip, used as the source of down/upsample passes
    mips: SmallVec<[wgpu::BindGroup; 8]>,
    // group1 for composite, sampling bloom mip 0
    bloom_only: wgpu::BindGroup,
    trail_only: wgpu::BindGroup,
}

pub struct GpuState<'a> {
    surface: wgpu::Surface<'a>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    scene_pass: ScenePass,
    post: PostResources,
    targets: RenderTargets,
    bind_groups: PostBindGroups,
    linear_sampler: wgpu::Sampler,
    trail_tex: wgpu::Texture,
    trail_view: wgpu::TextureView,
    trail_size: u32,
    width: u32,
    height: u32,
    clear_color: wgpu::Color,
}

impl<'a> GpuState<'a> {
    pub async fn new(
        canvas: &'a web::HtmlCanvasElement,
        bloom_levels: u32,
        trail_size: u32,
    ) -> anyhow::Result<Self> {
        let width = canvas.width().max(1);
        let height = canvas.height().max(1);

        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("No WebGPU adapter"))?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    // Default limits: older WebGPU implementations reject unknown fields
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                    label: None,
                },
                None,
            )
            .await
            .map_err(|e| anyhow::anyhow!(format!("request_device error: {:?}", e)))?;
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| {
                matches!(
                    f,
                    wgpu::TextureFormat::Bgra8UnormSrgb | wgpu::TextureFormat::Rgba8UnormSrgb
                )
            })
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("surface reports no formats"))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        log::info!("[gpu] surface {width}x{height} {format:?}");

        let scene_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(crate::core::SCENE_WGSL.into()),
        });
        let post_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("post_shader"),
            source: wgpu::ShaderSource::Wgsl(crate::core::POST_WGSL.into()),
        });
        let linear_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("linear_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let scene_pass = ScenePass::new(&device, &scene_shader);
        let post = post::create_post_resources(&device, &post_shader, format);
        let targets = RenderTargets::new(&device, width, height, bloom_levels);
        let (trail_tex, trail_view) = helpers::create_color_texture(
            &device,
            "trail_tex",
            trail_size,
            trail_size,
            TRAIL_FORMAT,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        let bind_groups =
            build_post_bind_groups(&device, &post, &targets, &trail_view, &linear_sampler);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            scene_pass,
            post,
            targets,
            bind_groups,
            linear_sampler,
            trail_tex,
            trail_view,
            trail_size,
            width,
            height,
            clear_color: helpers::linear_clear_color(CLEAR_COLOR_HEX),
        })
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn resize_if_needed(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if width != self.width || height != self.height {
            self.width = width;
            self.height = height;
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
            self.targets.recreate(&self.device, width, height);
            self.rebuild_post_bind_groups();
            log::debug!("[gpu] resized to {width}x{height}");
        }
    }

    /// Copy the trail image into its texture. Sizes must match.
    pub fn upload_trail(&mut self, trail: &Trail) {
        if trail.size() != self.trail_size {
            log::warn!(
                "[gpu] trail size {} does not match texture size {}",
                trail.size(),
                self.trail_size
            );
            return;
        }
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.trail_tex,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            trail.pixels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * self.trail_size),
                rows_per_image: Some(self.trail_size),
            },
            wgpu::Extent3d {
                width: self.trail_size,
                height: self.trail_size,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Scene pass with stencil masking, then the compositor chain: optional
    /// trail distortion, selective bloom, composite to the surface.
    pub fn render(&mut self, experience: &Experience) -> Result<(), wgpu::SurfaceError> {
        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("encoder"),
            });

        let draws = experience.draw_items();
        self.scene_pass
            .prepare(&self.device, &self.queue, experience, &draws);

        // Settings do not change between passes, so one write covers the frame.
        let settings = experience.compositor();
        let passes = settings.passes();
        let distortion = settings
            .distortion
            .filter(|_| passes.contains(&PassKind::Distortion));
        let bloom_on = passes.contains(&PassKind::SelectiveBloom);
        let post = PostUniforms {
            threshold: settings.bloom.luminance_threshold,
            smoothing: BLOOM_SMOOTHING,
            bloom_intensity: if bloom_on { settings.bloom.intensity } else { 0.0 },
            bloom_radius: settings.bloom.radius,
            distortion_amplitude: distortion.map(|d| d.max_amplitude).unwrap_or(0.0),
            distortion_blend: distortion.map(|d| d.blend).unwrap_or(0.0),
            _pad: [0.0; 2],
        };
        self.queue
            .write_buffer(&self.post.uniform_buffer, 0, bytemuck::bytes_of(&post));

        // Pass 1: scene into HDR + bloom source, stencil/depth/colour cleared
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[
                    Some(wgpu::RenderPassColorAttachment {
                        view: &self.targets.hdr_view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(self.clear_color),
                            store: wgpu::StoreOp::Store,
                        },
                    }),
                    Some(wgpu::RenderPassColorAttachment {
                        view: &self.targets.bloom_src_view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                            store: wgpu::StoreOp::Store,
                        },
                    }),
                ],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(0),
                        store: wgpu::StoreOp::Store,
                    }),
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.scene_pass.draw(&mut rpass, &draws);
        }

        // Pass 2: trail distortion HDR -> distorted
        let composite_src = if distortion.is_some() {
            post::blit(
                &mut encoder,
                "distortion_pass",
                &self.targets.distorted_view,
                wgpu::Color::BLACK,
                &self.post.distort_pipeline,
                &self.bind_groups.hdr,
                Some(&self.bind_groups.trail_only),
            );
            &self.bind_groups.distorted
        } else {
            &self.bind_groups.hdr
        };

        // Pass 3: selective bloom. Bright pass from the selected-only source,
        // then a mip chain down and back up.
        if bloom_on {
            let mips = &self.targets.bloom_mips;
            if let Some((_, mip0)) = mips.first() {
                post::blit(
                    &mut encoder,
                    "bloom_bright",
                    mip0,
                    wgpu::Color::BLACK,
                    &self.post.bright_pipeline,
                    &self.bind_groups.bloom_src,
                    None,
                );
            }
            for i in 1..mips.len() {
                post::blit(
                    &mut encoder,
                    "bloom_down",
                    &mips[i].1,
                    wgpu::Color::BLACK,
                    &self.post.downsample_pipeline,
                    &self.bind_groups.mips[i - 1],
                    None,
                );
            }
            for i in (1..mips.len()).rev() {
                post::blend_onto(
                    &mut encoder,
                    "bloom_up",
                    &mips[i - 1].1,
                    &self.post.upsample_pipeline,
                    &self.bind_groups.mips[i],
                    settings.bloom.radius as f64,
                );
            }
        }

        // Pass 4: composite to swapchain
        post::blit(
            &mut encoder,
            "composite",
            &view,
            self.clear_color,
            &self.post.composite_pipeline,
            composite_src,
            Some(&self.bind_groups.bloom_only),
        );

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    /// Reconfigure after a lost or outdated surface.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }
}

impl<'a> GpuState<'a> {
    fn rebuild_post_bind_groups(&mut self) {
        self.bind_groups = build_post_bind_groups(
            &self.device,
            &self.post,
            &self.targets,
            &self.trail_view,
            &self.linear_sampler,
        );
    }
}

fn build_post_bind_groups(
    device: &wgpu::Device,
    post: &PostResources,
    targets: &RenderTargets,
    trail_view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> PostBindGroups {
    let uniforms = Some(&post.uniform_buffer);
    let group0 = |label: &str, view: &wgpu::TextureView| {
        helpers::texture_bind_group(device, label, &post.bgl0, view, sampler, uniforms)
    };
    let group1 = |label: &str, view: &wgpu::TextureView| {
        helpers::texture_bind_group(device, label, &post.bgl1, view, sampler, None)
    };
    let mips = targets
        .bloom_mips
        .iter()
        .enumerate()
        .map(|(i, (_, view))| group0(&format!("bg_bloom_mip{i}"), view))
        .collect();
    let bloom_only = match targets.bloom_mips.first() {
        Some((_, view)) => group1("bg_bloom_only", view),
        // Targets always hold at least one mip; kept total for the type.
        None => group1("bg_bloom_only", &targets.bloom_src_view),
    };
    PostBindGroups {
        hdr: group0("bg_hdr", &targets.hdr_view),
        distorted: group0("bg_distorted", &targets.distorted_view),
        bloom_src: group0("bg_bloom_src", &targets.bloom_src_view),
        mips,
        bloom_only,
        trail_only: group1("bg_trail_only", trail_view),
    }
}
