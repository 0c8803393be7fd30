//! WGSL sources and the uniform blocks they read.

use bytemuck::{Pod, Zeroable};

pub const POINTS_COMMON: &str = include_str!("shaders/points_common.wgsl");
pub const TOPPER_SOURCE: &str = include_str!("shaders/topper.wgsl");
pub const POST_PROCESS_SOURCE: &str = include_str!("shaders/post_process.wgsl");

/// Which point layer a pipeline draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointShader {
    Snow,
    SnowSprite,
    Tree,
    Ring,
    Stars,
    Fireworks,
}

impl PointShader {
    pub const ALL: [PointShader; 6] = [
        PointShader::Snow,
        PointShader::SnowSprite,
        PointShader::Tree,
        PointShader::Ring,
        PointShader::Stars,
        PointShader::Fireworks,
    ];

    fn body(self) -> &'static str {
        match self {
            PointShader::Snow => include_str!("shaders/snow.wgsl"),
            PointShader::SnowSprite => include_str!("shaders/snow_sprite.wgsl"),
            PointShader::Tree => include_str!("shaders/tree.wgsl"),
            PointShader::Ring => include_str!("shaders/ring.wgsl"),
            PointShader::Stars => include_str!("shaders/stars.wgsl"),
            PointShader::Fireworks => include_str!("shaders/fireworks.wgsl"),
        }
    }

    /// Complete module: shared declarations followed by the layer's stages.
    pub fn source(self) -> String {
        format!("{POINTS_COMMON}\n{}", self.body())
    }

    pub fn label(self) -> &'static str {
        match self {
            PointShader::Snow => "Snow",
            PointShader::SnowSprite => "Snow Sprite",
            PointShader::Tree => "Tree",
            PointShader::Ring => "Ring",
            PointShader::Stars => "Stars",
            PointShader::Fireworks => "Fireworks",
        }
    }
}

/// Mirrors `Layer` in `points_common.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct LayerUniforms {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub color_a: [f32; 4],
    pub color_b: [f32; 4],
    pub params: [f32; 4],
    pub fog: [f32; 4],
    pub extra: [f32; 4],
}

/// Mirrors `Mesh` in `topper.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct MeshUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub color: [f32; 4],
    pub emissive: [f32; 4],
    pub light: [f32; 4],
    pub params: [f32; 4],
    pub fog: [f32; 4],
}

/// Mirrors `Post` in `post_process.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct PostUniforms {
    pub bloom: [f32; 4],
    pub vignette: [f32; 4],
    pub tone: [f32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_sizes_are_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<LayerUniforms>(), 3 * 64 + 5 * 16);
        assert_eq!(std::mem::size_of::<MeshUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<PostUniforms>(), 48);
    }

    #[test]
    fn test_sources_compose() {
        for shader in PointShader::ALL {
            let src = shader.source();
            assert!(src.contains("struct Layer"));
            assert!(src.contains("fn vs_main"));
            assert!(src.contains("fn fs_main"));
        }
    }
}
