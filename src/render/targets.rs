use smallvec::SmallVec;
use wgpu;

use super::helpers;

/// Offscreen targets for one frame.
///
/// - `hdr_*` is the lit scene and `bloom_src_*` the same pass's second
///   attachment, holding only bloom-selected meshes.
/// - `distorted_*` receives the trail distortion when that pass is on.
/// - `depth_*` is the shared depth + stencil buffer the tile cutouts stamp.
/// - `bloom_mips` halve from the frame size; mip 0 is what composite reads.
// Textures are only held so their views stay valid.
#[allow(dead_code)]
pub(crate) struct RenderTargets {
    pub(crate) hdr_tex: wgpu::Texture,
    pub(crate) hdr_view: wgpu::TextureView,
    pub(crate) bloom_src_tex: wgpu::Texture,
    pub(crate) bloom_src_view: wgpu::TextureView,
    pub(crate) distorted_tex: wgpu::Texture,
    pub(crate) distorted_view: wgpu::TextureView,
    pub(crate) depth_tex: wgpu::Texture,
    pub(crate) depth_view: wgpu::TextureView,
    pub(crate) bloom_mips: SmallVec<[(wgpu::Texture, wgpu::TextureView); 8]>,
}

impl RenderTargets {
    pub(crate) fn new(device: &wgpu::Device, width: u32, height: u32, bloom_levels: u32) -> Self {
        let (hdr_tex, hdr_view) = helpers::create_hdr_target(device, "hdr_tex", width, height);
        let (bloom_src_tex, bloom_src_view) =
            helpers::create_hdr_target(device, "bloom_src", width, height);
        let (distorted_tex, distorted_view) =
            helpers::create_hdr_target(device, "distorted", width, height);
        let (depth_tex, depth_view) = create_depth_stencil(device, width, height);
        Self {
            hdr_tex,
            hdr_view,
            bloom_src_tex,
            bloom_src_view,
            distorted_tex,
            distorted_view,
            depth_tex,
            depth_view,
            bloom_mips: create_bloom_mips(device, width, height, bloom_levels),
        }
    }

    pub(crate) fn recreate(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        let levels = self.bloom_mips.len() as u32;
        *self = Self::new(device, width, height, levels);
    }
}

fn create_depth_stencil(
    device: &wgpu::Device,
    width: u32,
    height: u32,
) -> (wgpu::Texture, wgpu::TextureView) {
    helpers::create_color_texture(
        device,
        "depth_stencil",
        width,
        height,
        helpers::DEPTH_STENCIL_FORMAT,
        wgpu::TextureUsages::RENDER_ATTACHMENT,
    )
}

fn create_bloom_mips(
    device: &wgpu::Device,
    width: u32,
    height: u32,
    levels: u32,
) -> SmallVec<[(wgpu::Texture, wgpu::TextureView); 8]> {
    ring_core::compositor::bloom_mip_sizes(width, height, levels.max(1))
        .into_iter()
        .enumerate()
        .map(|(i, (w, h))| helpers::create_hdr_target(device, &format!("bloom_mip{i}"), w, h))
        .collect()
}
