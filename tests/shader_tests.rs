//! Validation of every WGSL module the renderer compiles, and of the
//! uniform layouts the CPU side writes into them.

use yuletide::shader::{
    LayerUniforms, MeshUniforms, PointShader, PostUniforms, POST_PROCESS_SOURCE, TOPPER_SOURCE,
};

fn parse_and_validate(label: &str, source: &str) -> naga::Module {
    let module = naga::front::wgsl::parse_str(source)
        .unwrap_or_else(|e| panic!("{label}: WGSL parse error: {}", e.emit_to_string(source)));

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .unwrap_or_else(|e| panic!("{label}: WGSL validation error: {e:?}"));

    module
}

/// Byte size naga computes for the named struct.
fn struct_span(module: &naga::Module, name: &str) -> u32 {
    module
        .types
        .iter()
        .find_map(|(_, ty)| match &ty.inner {
            naga::TypeInner::Struct { span, .. } if ty.name.as_deref() == Some(name) => {
                Some(*span)
            }
            _ => None,
        })
        .unwrap_or_else(|| panic!("struct {name} not found"))
}

fn has_entry_point(module: &naga::Module, name: &str, stage: naga::ShaderStage) -> bool {
    module
        .entry_points
        .iter()
        .any(|ep| ep.name == name && ep.stage == stage)
}

// ============================================================================
// Point layers
// ============================================================================

#[test]
fn test_point_shaders_validate() {
    for shader in PointShader::ALL {
        let module = parse_and_validate(shader.label(), &shader.source());
        assert!(has_entry_point(&module, "vs_main", naga::ShaderStage::Vertex));
        assert!(has_entry_point(&module, "fs_main", naga::ShaderStage::Fragment));
    }
}

#[test]
fn test_layer_uniform_layout_matches() {
    for shader in PointShader::ALL {
        let module = parse_and_validate(shader.label(), &shader.source());
        assert_eq!(
            struct_span(&module, "Layer") as usize,
            std::mem::size_of::<LayerUniforms>(),
            "{}",
            shader.label()
        );
    }
}

// ============================================================================
// Topper and post-processing
// ============================================================================

#[test]
fn test_topper_shader_validates() {
    let module = parse_and_validate("topper", TOPPER_SOURCE);
    assert!(has_entry_point(&module, "vs_main", naga::ShaderStage::Vertex));
    assert_eq!(
        struct_span(&module, "Mesh") as usize,
        std::mem::size_of::<MeshUniforms>()
    );
}

#[test]
fn test_post_process_shader_validates() {
    let module = parse_and_validate("post process", POST_PROCESS_SOURCE);
    assert!(has_entry_point(&module, "fs_main", naga::ShaderStage::Fragment));
    assert_eq!(
        struct_span(&module, "Post") as usize,
        std::mem::size_of::<PostUniforms>()
    );
}

#[test]
fn test_point_fog_ramps_linearly() {
    for shader in PointShader::ALL {
        let source = shader.source();
        assert!(
            source.contains("clamp((depth - layer.extra.x) / (layer.extra.y - layer.extra.x), 0.0, 1.0)"),
            "{}",
            shader.label()
        );
        assert!(!source.contains("smoothstep(layer.extra.x"));
    }
}

#[test]
fn test_topper_fog_ramps_linearly() {
    assert!(TOPPER_SOURCE
        .contains("clamp((depth - topper.params.z) / (topper.params.w - topper.params.z), 0.0, 1.0)"));
}
