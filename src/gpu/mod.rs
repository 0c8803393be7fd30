//! GPU rendering of a composed scene.
//!
//! [`Renderer`] owns the surface, device and one [`PointLayer`] per
//! particle field. Each frame it uploads the columns that changed since the
//! last frame, draws every layer into an HDR target and composites that
//! onto the swapchain.

mod mesh;
mod points;
mod post_process;

use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3, Vec4};
use winit::window::Window;

use crate::error::GpuError;
use crate::field::ParticleField;
use crate::ring::POINT_SCALE as RING_POINT_SCALE;
use crate::scene::{RenderProfile, SceneComposer};
use crate::shader::{LayerUniforms, MeshUniforms, PointShader};
use crate::snow::{SnowRenderMode, POINT_SCALE as SNOW_POINT_SCALE, SPRITE_OPACITY};
use crate::stars::POINT_SCALE as STAR_POINT_SCALE;
use crate::textures::TextureConfig;
use crate::tree::{icosahedron, TopperMaterial, TOPPER_RADIUS};

use mesh::MeshRenderer;
use points::{PointLayer, PointPipelines, SpriteTexture};
use post_process::PostProcessState;
pub use post_process::post_uniforms;

pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
pub(crate) const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Tree points are drawn at 90% opacity.
const TREE_OPACITY: f32 = 0.9;
const SPARK_OPACITY: f32 = 0.9;
const SPARK_EMISSIVE: f32 = 2.5;
/// World diameter of a spark at scale 1, twice its sphere radius.
const SPARK_DIAMETER: f32 = 2.0 * crate::fireworks::SPARK_RADIUS;

/// Camera and viewport shared by every layer in one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameView {
    pub view: Mat4,
    pub proj: Mat4,
    pub viewport: Vec2,
}

impl FrameView {
    pub fn from_scene(scene: &SceneComposer) -> Self {
        let camera = scene.camera();
        Self {
            view: camera.view_matrix(),
            proj: camera.projection_matrix(),
            viewport: scene.viewport(),
        }
    }

    fn layer(&self, time: f32, size_scale: f32) -> LayerUniforms {
        LayerUniforms {
            view: self.view.to_cols_array_2d(),
            proj: self.proj.to_cols_array_2d(),
            model: Mat4::IDENTITY.to_cols_array_2d(),
            params: [time, size_scale, self.viewport.x, self.viewport.y],
            ..Default::default()
        }
    }

    /// Pixels per world unit at view depth 1, the way point sprites with
    /// size attenuation are scaled.
    fn attenuated_scale(&self) -> f32 {
        self.viewport.y * 0.5
    }
}

fn with_fog(mut uniforms: LayerUniforms, profile: &RenderProfile) -> LayerUniforms {
    uniforms.fog = profile.fog_color.extend(1.0).to_array();
    uniforms.extra[0] = profile.fog_near;
    uniforms.extra[1] = profile.fog_far;
    uniforms
}

pub fn star_uniforms(frame: &FrameView, scene: &SceneComposer) -> LayerUniforms {
    let stars = scene.stars();
    let mut u = frame.layer(stars.time(), STAR_POINT_SCALE);
    u.color_b[3] = if stars.config().fade { 1.0 } else { 0.0 };
    u
}

pub fn tree_uniforms(frame: &FrameView, scene: &SceneComposer) -> LayerUniforms {
    let tree = scene.tree();
    let mut u = frame.layer(tree.time(), frame.attenuated_scale());
    u.model = tree.model_matrix().to_cols_array_2d();
    u.color_a = [1.0, 1.0, 1.0, TREE_OPACITY];
    u.extra[2] = tree.config().point_size;
    with_fog(u, scene.profile())
}

pub fn ring_uniforms(frame: &FrameView, scene: &SceneComposer) -> LayerUniforms {
    let ring = scene.ring();
    let config = ring.config();
    let mut u = frame.layer(ring.time(), RING_POINT_SCALE);
    u.color_a = config.color_a.extend(config.alpha).to_array();
    u.color_b = config.color_b.extend(config.soft).to_array();
    u
}

/// `None` while snow is off.
pub fn snow_uniforms(frame: &FrameView, scene: &SceneComposer) -> Option<LayerUniforms> {
    let snow = scene.snow()?;
    let config = snow.config();
    let u = match snow.render_mode() {
        SnowRenderMode::Shader => {
            let mut u = frame.layer(snow.time(), SNOW_POINT_SCALE);
            u.color_a = [1.0, 1.0, 1.0, config.alpha];
            u.color_b[3] = config.soft;
            u
        }
        SnowRenderMode::Sprite => {
            let mut u = frame.layer(snow.time(), frame.attenuated_scale());
            u.color_a = [1.0, 1.0, 1.0, SPRITE_OPACITY];
            u.extra[2] = config.sprite_size;
            with_fog(u, scene.profile())
        }
    };
    Some(u)
}

pub fn firework_uniforms(frame: &FrameView, scene: &SceneComposer) -> LayerUniforms {
    let profile = scene.profile();
    // Sparks are spheres of radius SPARK_RADIUS * scale; project their
    // diameter the way the perspective matrix scales height.
    let size_scale = SPARK_DIAMETER * frame.proj.y_axis.y * frame.viewport.y * 0.5;
    let mut u = frame.layer(scene.fireworks().time(), size_scale);
    let light = frame
        .view
        .transform_vector3(profile.light_position)
        .normalize_or_zero();
    u.color_a = Vec3::splat(profile.ambient_intensity)
        .extend(SPARK_OPACITY)
        .to_array();
    u.color_b = light.extend(profile.light_intensity).to_array();
    u.extra[3] = SPARK_EMISSIVE;
    with_fog(u, profile)
}

pub fn topper_uniforms(scene: &SceneComposer, material: &TopperMaterial) -> MeshUniforms {
    let camera = scene.camera();
    let profile = scene.profile();
    MeshUniforms {
        view_proj: camera.view_projection().to_cols_array_2d(),
        model: Mat4::from_translation(scene.tree().apex()).to_cols_array_2d(),
        camera_position: camera.position().extend(1.0).to_array(),
        color: material.color.extend(material.roughness).to_array(),
        emissive: material
            .emissive
            .extend(material.emissive_intensity)
            .to_array(),
        light: profile
            .light_position
            .normalize_or_zero()
            .extend(profile.light_intensity)
            .to_array(),
        params: Vec4::new(
            profile.ambient_intensity,
            material.metalness,
            profile.fog_near,
            profile.fog_far,
        )
        .to_array(),
        fog: profile.fog_color.extend(0.0).to_array(),
    }
}

struct Layers {
    stars: PointLayer,
    tree: PointLayer,
    ring: PointLayer,
    snow: PointLayer,
    fireworks: PointLayer,
}

pub struct Renderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pipelines: PointPipelines,
    layers: Layers,
    topper: MeshRenderer,
    material: TopperMaterial,
    post: PostProcessState,
    /// 1x1 white texture bound for layers that do not sample a sprite.
    blank: SpriteTexture,
    sprite: Option<SpriteTexture>,
}

impl Renderer {
    pub async fn new(window: Arc<Window>) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        log::info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(GpuError::UnsupportedSurface)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .ok_or(GpuError::UnsupportedSurface)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let pipelines = PointPipelines::new(&device);
        let layers = Layers {
            stars: PointLayer::new(&device, &pipelines, "Stars"),
            tree: PointLayer::new(&device, &pipelines, "Tree"),
            ring: PointLayer::new(&device, &pipelines, "Ring"),
            snow: PointLayer::new(&device, &pipelines, "Snow"),
            fireworks: PointLayer::new(&device, &pipelines, "Fireworks"),
        };
        let topper = MeshRenderer::new(&device, &icosahedron(TOPPER_RADIUS, Vec3::ZERO));
        let post = PostProcessState::new(&device, config.width, config.height, surface_format);
        let blank = SpriteTexture::new(
            &device,
            &queue,
            &pipelines.texture_layout,
            &TextureConfig::solid(255, 255, 255, 255),
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            pipelines,
            layers,
            topper,
            material: TopperMaterial::default(),
            post,
            blank,
            sprite: None,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.post.resize(&self.device, width, height);
    }

    /// Keep the bound snowflake texture in step with the snow field.
    fn sync_sprite(&mut self, texture: Option<&TextureConfig>) {
        match texture {
            Some(tex) if self.sprite.as_ref().is_some_and(|s| s.size == tex.width) => {}
            Some(tex) => {
                log::debug!("uploading {}px snowflake sprite", tex.width);
                self.sprite = Some(SpriteTexture::new(
                    &self.device,
                    &self.queue,
                    &self.pipelines.texture_layout,
                    tex,
                ));
            }
            None => self.sprite = None,
        }
    }

    fn upload(&mut self, scene: &mut SceneComposer) {
        let (device, queue) = (&self.device, &self.queue);
        self.layers.stars.upload(device, queue, scene.stars_mut().columns_mut());
        self.layers.tree.upload(device, queue, scene.tree_mut().columns_mut());
        self.layers.ring.upload(device, queue, scene.ring_mut().columns_mut());
        if let Some(snow) = scene.snow_mut() {
            self.layers.snow.upload(device, queue, snow.columns_mut());
        }
        self.layers
            .fireworks
            .upload(device, queue, scene.fireworks_mut().columns_mut());
    }

    pub fn render(&mut self, scene: &mut SceneComposer) -> Result<(), wgpu::SurfaceError> {
        let frame = FrameView::from_scene(scene);
        let sprite = scene.snow().and_then(|s| s.sprite()).cloned();
        self.sync_sprite(sprite.as_deref());
        self.upload(scene);

        let queue = &self.queue;
        self.layers.stars.write_uniforms(queue, &star_uniforms(&frame, scene));
        self.layers.tree.write_uniforms(queue, &tree_uniforms(&frame, scene));
        self.layers.ring.write_uniforms(queue, &ring_uniforms(&frame, scene));
        let snow = snow_uniforms(&frame, scene);
        if let Some(u) = &snow {
            self.layers.snow.write_uniforms(queue, u);
        }
        self.layers
            .fireworks
            .write_uniforms(queue, &firework_uniforms(&frame, scene));
        self.topper
            .write_uniforms(queue, &topper_uniforms(scene, &self.material));
        self.post.write_uniforms(
            queue,
            &post_uniforms(scene.profile(), self.config.width, self.config.height, scene.time()),
        );

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let background = scene.profile().background;
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.post.scene_view(),
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: background.x as f64,
                            g: background.y as f64,
                            b: background.z as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.post.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let pipelines = &self.pipelines;
            let blank = &self.blank.bind_group;
            draw_layer(&mut pass, pipelines, &self.layers.stars, PointShader::Stars, blank);
            self.topper.draw(&mut pass);
            draw_layer(&mut pass, pipelines, &self.layers.tree, PointShader::Tree, blank);
            draw_layer(&mut pass, pipelines, &self.layers.ring, PointShader::Ring, blank);
            if snow.is_some() {
                let mode = scene.snow().map(|s| s.render_mode());
                match (mode, self.sprite.as_ref()) {
                    (Some(SnowRenderMode::Sprite), Some(sprite)) => draw_layer(
                        &mut pass,
                        pipelines,
                        &self.layers.snow,
                        PointShader::SnowSprite,
                        &sprite.bind_group,
                    ),
                    _ => draw_layer(&mut pass, pipelines, &self.layers.snow, PointShader::Snow, blank),
                }
            }
            draw_layer(
                &mut pass,
                pipelines,
                &self.layers.fireworks,
                PointShader::Fireworks,
                blank,
            );
        }

        self.post.render(&mut encoder, &view);

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

fn draw_layer(
    pass: &mut wgpu::RenderPass<'_>,
    pipelines: &PointPipelines,
    layer: &PointLayer,
    kind: PointShader,
    sprite: &wgpu::BindGroup,
) {
    if let Some(pipeline) = pipelines.get(kind) {
        layer.draw(pass, pipeline, sprite);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    fn scene(is_mobile: bool) -> SceneComposer {
        let mut settings = Settings::for_tier(is_mobile);
        settings.snow_count = 40;
        settings.tree_density = 300;
        settings.ring_count = 30;
        SceneComposer::with_settings(settings, Vec2::new(1200.0, 800.0)).unwrap()
    }

    #[test]
    fn test_fog_only_on_fogged_layers() {
        let s = scene(false);
        let f = FrameView::from_scene(&s);
        assert_eq!(tree_uniforms(&f, &s).fog[3], 1.0);
        assert_eq!(firework_uniforms(&f, &s).fog[3], 1.0);
        assert_eq!(ring_uniforms(&f, &s).fog[3], 0.0);
        assert_eq!(star_uniforms(&f, &s).fog[3], 0.0);
        assert_eq!(snow_uniforms(&f, &s).unwrap().fog[3], 0.0);
    }

    #[test]
    fn test_sprite_snow_uses_constant_size() {
        let s = scene(true);
        let f = FrameView::from_scene(&s);
        let u = snow_uniforms(&f, &s).unwrap();
        assert_eq!(u.extra[2], s.snow().unwrap().config().sprite_size);
        assert_eq!(u.params[1], 400.0);
        assert_eq!(u.fog[3], 1.0);
    }

    #[test]
    fn test_snow_uniforms_absent_when_snow_off() {
        let mut settings = Settings::for_tier(false);
        settings.snow = false;
        settings.tree_density = 300;
        settings.ring_count = 30;
        let s = SceneComposer::with_settings(settings, Vec2::new(800.0, 600.0)).unwrap();
        assert!(snow_uniforms(&FrameView::from_scene(&s), &s).is_none());
    }

    #[test]
    fn test_tree_uniforms_carry_spin() {
        let mut s = scene(false);
        s.frame(0.5).unwrap();
        let f = FrameView::from_scene(&s);
        let u = tree_uniforms(&f, &s);
        assert_eq!(u.model, s.tree().model_matrix().to_cols_array_2d());
        assert_eq!(u.extra[2], 0.15);
    }

    #[test]
    fn test_topper_sits_at_apex() {
        let s = scene(false);
        let u = topper_uniforms(&s, &TopperMaterial::default());
        let model = Mat4::from_cols_array_2d(&u.model);
        assert!((model.w_axis.truncate() - s.tree().apex()).length() < 1e-6);
        assert_eq!(u.emissive[3], 2.5);
    }
}
