// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::Arc;
use vesper_core::math::{Extent2D, LinearRgba, Rect, Viewport};
use vesper_core::renderer::{
    ClearMask, CompareFunction, FeatureLayout, FeatureRegistry, PipelineFeatures, PixelFormat,
    PolygonMode, PrimitiveType, ProgramId, RenderError, RenderFrame, RenderTargetId, ShaderHandle,
    StateBlock, StateChain, TextureId, TriangleFace, Ubershader,
};
use vesper_infra::{Created, DeviceCall, TraceDevice};
use vesper_rvm::{BaselineState, Rvm, RvmSettings};

const VS: &str = "void main() { gl_Position = position; }\n";
const FS: &str = "void main() { color = vec4(1.0); }\n";

fn rvm_with(features: FeatureRegistry, settings: RvmSettings) -> Rvm<TraceDevice> {
    let mut rvm = Rvm::new(TraceDevice::new(800, 600), features, settings);
    rvm.device_mut().clear_calls();
    rvm
}

fn rvm() -> Rvm<TraceDevice> {
    rvm_with(FeatureRegistry::new(), RvmSettings::default())
}

fn shader(rvm: &mut Rvm<TraceDevice>, label: &str, layout: FeatureLayout) -> ShaderHandle {
    rvm.registry_mut()
        .intern_shader(Arc::new(Ubershader::new(label, VS, FS, layout)))
}

fn reset_tail(baseline: BaselineState, texture_slots: u8) -> Vec<DeviceCall> {
    let mut calls = vec![
        DeviceCall::SetCullFace(baseline.cull_face),
        DeviceCall::SetPolygonMode(baseline.polygon_mode),
        DeviceCall::BindProgram(None),
        DeviceCall::BindVertexBuffer(None),
    ];
    calls.extend((0..texture_slots).map(|sampler| DeviceCall::BindTexture {
        sampler,
        texture: None,
    }));
    calls.push(DeviceCall::SetDepthState {
        write: baseline.depth_write,
        function: baseline.depth_function,
    });
    calls.push(DeviceCall::SetAlphaTest {
        function: baseline.alpha_function,
        reference: 0.0,
    });
    calls
}

fn default_tail() -> Vec<DeviceCall> {
    reset_tail(BaselineState::default(), 8)
}

fn programs(device: &TraceDevice) -> Vec<(ProgramId, PipelineFeatures, String)> {
    device
        .created()
        .iter()
        .filter_map(|c| match c {
            Created::Program {
                id,
                features,
                vertex,
                ..
            } => Some((*id, *features, vertex.clone())),
            _ => None,
        })
        .collect()
}

fn render_targets(device: &TraceDevice) -> Vec<RenderTargetId> {
    device
        .created()
        .iter()
        .filter_map(|c| match c {
            Created::RenderTarget { id, .. } => Some(*id),
            _ => None,
        })
        .collect()
}

fn draws(device: &TraceDevice) -> Vec<u32> {
    device
        .calls()
        .iter()
        .filter_map(|c| match c {
            DeviceCall::DrawPrimitives { count, .. } | DeviceCall::DrawIndexed { count, .. } => {
                Some(*count)
            }
            _ => None,
        })
        .collect()
}

#[test]
fn test_clear_and_draw_issue_minimal_calls() {
    let mut rvm = rvm();
    let basic = shader(&mut rvm, "basic", FeatureLayout::new());
    let vb = rvm.registry_mut().create_vertex_buffer(&[0; 36]);

    let mut frame = RenderFrame::new();
    let block = frame.alloc_state_block(StateBlock::new().bind_shader(basic).bind_vertex_buffer(vb));
    let entry = frame.entry_point();
    let buffer = frame.command_buffer_mut(entry);
    buffer.clear(LinearRgba::BLACK, ClearMask::ALL);
    buffer.draw_indexed(0, PrimitiveType::Triangles, 0, 3, block);

    let stats = rvm.display(&mut frame).unwrap();

    let program = programs(rvm.device())[0].0;
    let vb_id = rvm.registry().resolve_vertex_buffer(vb).id;
    let mut expected = vec![
        DeviceCall::Clear {
            mask: ClearMask::ALL,
            color: LinearRgba::BLACK,
            depth: 1.0,
            stencil: 0,
        },
        DeviceCall::BindProgram(Some(program)),
        DeviceCall::BindVertexBuffer(Some(vb_id)),
        DeviceCall::DrawIndexed {
            primitive: PrimitiveType::Triangles,
            first: 0,
            count: 3,
        },
    ];
    expected.extend(default_tail());
    assert_eq!(rvm.device().calls(), expected.as_slice());

    assert_eq!(stats.command_buffers, 1);
    assert_eq!(stats.clears, 1);
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(stats.state_changes, 2);
    assert_eq!(stats.permutations_compiled, 1);
    assert_eq!(frame.block_count(), 0, "display clears the frame");
}

#[test]
fn test_nested_render_targets_restore_parent() {
    let mut rvm = rvm();
    let mut frame = RenderFrame::new();
    let entry = frame.entry_point();
    let half = Viewport::new(0.0, 0.0, 0.5, 0.5);
    let quarter = Viewport::new(0.25, 0.25, 0.25, 0.25);

    let t1 = frame
        .command_buffer_mut(entry)
        .acquire_texture(256, 256, PixelFormat::Rgba8);
    let outer = frame.render_to_target(entry, Some(t1), half);
    let t2 = frame
        .command_buffer_mut(outer)
        .acquire_texture(128, 128, PixelFormat::Rgba8);
    let inner = frame.render_to_target(outer, Some(t2), quarter);
    frame
        .command_buffer_mut(inner)
        .clear(LinearRgba::RED, ClearMask::COLOR);
    frame.command_buffer_mut(outer).release_texture(t2);
    frame.command_buffer_mut(entry).release_texture(t1);

    let stats = rvm.display(&mut frame).unwrap();

    let targets = render_targets(rvm.device());
    assert_eq!(targets.len(), 2);
    let outer_rect = Rect {
        x: 0,
        y: 0,
        width: 128,
        height: 128,
    };
    let mut expected = vec![
        DeviceCall::BindRenderTarget(Some(targets[0])),
        DeviceCall::SetViewport(outer_rect),
        DeviceCall::BindRenderTarget(Some(targets[1])),
        DeviceCall::SetViewport(Rect {
            x: 32,
            y: 32,
            width: 32,
            height: 32,
        }),
        DeviceCall::Clear {
            mask: ClearMask::COLOR,
            color: LinearRgba::RED,
            depth: 1.0,
            stencil: 0,
        },
        DeviceCall::BindRenderTarget(Some(targets[0])),
        DeviceCall::SetViewport(outer_rect),
        DeviceCall::BindRenderTarget(None),
        DeviceCall::SetViewport(Rect::from_extent(Extent2D::new(800, 600))),
    ];
    expected.extend(default_tail());
    assert_eq!(rvm.device().calls(), expected.as_slice());

    assert_eq!(stats.command_buffers, 3);
    assert_eq!(stats.render_targets, 2);
    assert_eq!(stats.leaked_transients, 0);
    assert_eq!(rvm.registry().available_render_targets(), 2);
}

#[test]
fn test_identical_draws_bind_states_once() {
    let mut rvm = rvm();
    let basic = shader(&mut rvm, "basic", FeatureLayout::new());
    let vb = rvm.registry_mut().create_vertex_buffer(&[0; 36]);

    let mut frame = RenderFrame::new();
    let block = frame.alloc_state_block(StateBlock::new().bind_shader(basic).bind_vertex_buffer(vb));
    let entry = frame.entry_point();
    let buffer = frame.command_buffer_mut(entry);
    buffer.draw_primitives(0, PrimitiveType::Triangles, 0, 3, block);
    buffer.draw_primitives(0, PrimitiveType::Triangles, 3, 3, block);

    let stats = rvm.display(&mut frame).unwrap();

    let calls = rvm.device().calls();
    assert!(matches!(calls[0], DeviceCall::BindProgram(Some(_))));
    assert!(matches!(calls[1], DeviceCall::BindVertexBuffer(Some(_))));
    assert!(calls[2].is_draw());
    assert!(calls[3].is_draw());
    assert_eq!(&calls[4..], default_tail().as_slice());

    assert_eq!(stats.state_changes, 2);
    assert_eq!(stats.redundant_states, 2);
    assert_eq!(stats.permutation_switches, 1);
}

#[test]
fn test_permutations_are_reused_across_frames() {
    let mut rvm = rvm();
    let basic = shader(&mut rvm, "basic", FeatureLayout::new());

    let mut frame = RenderFrame::new();
    for _ in 0..3 {
        let block = frame.alloc_state_block(StateBlock::new().bind_shader(basic));
        let entry = frame.entry_point();
        frame
            .command_buffer_mut(entry)
            .draw_primitives(0, PrimitiveType::Points, 0, 1, block);
        rvm.display(&mut frame).unwrap();
    }

    assert_eq!(programs(rvm.device()).len(), 1);
    assert_eq!(rvm.permutations().len(), 1);
    let program = programs(rvm.device())[0].0;
    let binds = rvm
        .device()
        .calls()
        .iter()
        .filter(|c| **c == DeviceCall::BindProgram(Some(program)))
        .count();
    assert_eq!(binds, 3, "reset unbinds the program after every frame");
}

#[test]
fn test_nearest_block_wins_and_covered_blocks_are_skipped() {
    let mut rvm = rvm();
    let basic = shader(&mut rvm, "basic", FeatureLayout::new());
    let vb = rvm.registry_mut().create_vertex_buffer(&[0; 12]);

    let mut frame = RenderFrame::new();
    let far = frame.alloc_state_block(
        StateBlock::new()
            .bind_shader(basic)
            .set_cull_face(TriangleFace::Front)
            .set_polygon_mode(PolygonMode::Wireframe),
    );
    let near = frame.alloc_state_block(StateBlock::new().set_cull_face(TriangleFace::FrontAndBack));
    let covered = frame.alloc_state_block(StateBlock::new().bind_vertex_buffer(vb));
    let covering = frame.alloc_state_block(StateBlock::new().bind_shader(basic).bind_vertex_buffer(vb));

    let entry = frame.entry_point();
    let buffer = frame.command_buffer_mut(entry);
    buffer.draw_primitives(0, PrimitiveType::Triangles, 0, 3, StateChain::from_ids(&[near, far]));
    buffer.draw_primitives(
        0,
        PrimitiveType::Triangles,
        0,
        3,
        StateChain::from_ids(&[covering, covered]),
    );

    let stats = rvm.display(&mut frame).unwrap();
    let calls = rvm.device().calls();
    assert!(calls.contains(&DeviceCall::SetCullFace(TriangleFace::FrontAndBack)));
    assert!(!calls.contains(&DeviceCall::SetCullFace(TriangleFace::Front)));
    assert!(calls.contains(&DeviceCall::SetPolygonMode(PolygonMode::Wireframe)));
    assert_eq!(stats.skipped_blocks, 1);
}

#[test]
fn test_state_stack_chains_nearest_first() {
    let mut rvm = rvm();
    let basic = shader(&mut rvm, "basic", FeatureLayout::new());

    let mut frame = RenderFrame::new();
    let base = frame.alloc_state_block(
        StateBlock::new()
            .bind_shader(basic)
            .set_depth_state(true, CompareFunction::Less),
    );
    let overlay = frame.alloc_state_block(
        StateBlock::new().set_depth_state(false, CompareFunction::Always),
    );
    {
        let mut scope = frame.push_state_scope(base);
        let mut inner = scope.push_state_scope(overlay);
        let chain = inner.state_chain();
        let entry = inner.entry_point();
        inner
            .command_buffer_mut(entry)
            .draw_primitives(0, PrimitiveType::Triangles, 0, 3, chain);
    }
    assert!(frame.state_stack().is_empty());

    rvm.display(&mut frame).unwrap();
    let calls = rvm.device().calls();
    assert!(calls.contains(&DeviceCall::SetDepthState {
        write: false,
        function: CompareFunction::Always,
    }));
    assert!(!calls.contains(&DeviceCall::SetDepthState {
        write: true,
        function: CompareFunction::Less,
    }));
}

#[test]
fn test_user_features_select_permutations() {
    let mut features = FeatureRegistry::new();
    let pink = features.register("F_Pink");
    let glow = features.register("F_Glow");
    let mut rvm = rvm_with(features, RvmSettings::default());
    let layout = FeatureLayout::new().with("F_Pink", pink);
    let pinkable = shader(&mut rvm, "pinkable", layout);

    let mut frame = RenderFrame::new();
    let material = frame.alloc_state_block(
        StateBlock::new()
            .bind_shader(pinkable)
            .enable_features(pink | glow),
    );
    let plain = frame.alloc_state_block(StateBlock::new().disable_features(pink));
    let entry = frame.entry_point();
    let buffer = frame.command_buffer_mut(entry);
    buffer.draw_primitives(0, PrimitiveType::Triangles, 0, 3, material);
    buffer.draw_primitives(
        0,
        PrimitiveType::Triangles,
        0,
        3,
        StateChain::from_ids(&[plain, material]),
    );

    let stats = rvm.display(&mut frame).unwrap();

    let compiled = programs(rvm.device());
    assert_eq!(compiled.len(), 2);
    assert_eq!(compiled[0].1, pink, "unsupported features are masked out");
    assert!(compiled[0].2.starts_with("#define F_Pink\n"));
    assert_eq!(compiled[1].1, PipelineFeatures::EMPTY);
    assert!(!compiled[1].2.contains("F_Pink"));
    assert_eq!(stats.permutation_switches, 2);
    assert_eq!(rvm.features().names_of(compiled[0].1), vec!["F_Pink"]);
}

#[test]
fn test_transient_target_is_sampled_through_its_attachment() {
    let mut rvm = rvm();
    let layout = FeatureLayout::new().with("F_Diffuse", PipelineFeatures::sampler(0));
    let post = shader(&mut rvm, "post", layout);

    let mut frame = RenderFrame::new();
    let entry = frame.entry_point();
    let scene = frame
        .command_buffer_mut(entry)
        .acquire_texture(256, 256, PixelFormat::Rgba16F);
    let pass = frame.render_to_target(entry, Some(scene), Viewport::FULL);
    frame
        .command_buffer_mut(pass)
        .clear(LinearRgba::BLUE, ClearMask::ALL);
    let block = frame.alloc_state_block(
        StateBlock::new()
            .bind_shader(post)
            .bind_transient_texture(scene, 0, 0),
    );
    let buffer = frame.command_buffer_mut(entry);
    buffer.draw_primitives(0, PrimitiveType::TriangleStrip, 0, 4, block);
    buffer.release_texture(scene);

    rvm.display(&mut frame).unwrap();

    let attachment = rvm
        .device()
        .created()
        .iter()
        .find_map(|c| match c {
            Created::Texture { id, .. } => Some(*id),
            _ => None,
        })
        .unwrap();
    let calls = rvm.device().calls();
    let bind = calls
        .iter()
        .position(|c| {
            *c == DeviceCall::BindTexture {
                sampler: 0,
                texture: Some(attachment),
            }
        })
        .expect("attachment bound to sampler 0");
    let draw = calls.iter().position(DeviceCall::is_draw).unwrap();
    assert!(bind < draw);
    assert_eq!(programs(rvm.device())[0].1, PipelineFeatures::sampler(0));
}

#[test]
fn test_persistent_resources_bind_and_select_features() {
    let mut rvm = rvm();
    let layout = FeatureLayout::new()
        .with("F_Lights", PipelineFeatures::constant_buffer(1))
        .with("F_Albedo", PipelineFeatures::sampler(2));
    let lit = shader(&mut rvm, "lit", layout);
    let lights = rvm.registry_mut().create_constant_buffer(64);
    let texture = rvm.registry_mut().intern_texture(Arc::new(vesper_core::renderer::TextureData {
        descriptor: vesper_core::renderer::TextureDescriptor {
            size: Extent2D::new(2, 2),
            format: PixelFormat::Rgba8,
        },
        pixels: vec![255; 16],
    }));

    let mut frame = RenderFrame::new();
    let block = frame.alloc_state_block(
        StateBlock::new()
            .bind_shader(lit)
            .bind_constant_buffer(lights, 1)
            .bind_texture(texture, 2),
    );
    let entry = frame.entry_point();
    frame
        .command_buffer_mut(entry)
        .draw_primitives(0, PrimitiveType::Triangles, 0, 3, block);
    rvm.display(&mut frame).unwrap();

    let lights_id = rvm.registry().resolve_constant_buffer(lights).id;
    let texture_id: TextureId = rvm.registry().resolve_texture(texture);
    let calls = rvm.device().calls();
    assert!(calls.contains(&DeviceCall::BindConstantBuffer {
        slot: 1,
        buffer: Some(lights_id),
    }));
    assert!(calls.contains(&DeviceCall::BindTexture {
        sampler: 2,
        texture: Some(texture_id),
    }));
    assert_eq!(
        programs(rvm.device())[0].1,
        PipelineFeatures::constant_buffer(1) | PipelineFeatures::sampler(2)
    );
}

#[test]
fn test_leaked_transients_are_reported_and_recycled() {
    let mut rvm = rvm();
    let mut frame = RenderFrame::new();
    let entry = frame.entry_point();
    frame
        .command_buffer_mut(entry)
        .acquire_texture(64, 64, PixelFormat::Rgba8);

    let stats = rvm.display(&mut frame).unwrap();
    assert_eq!(stats.leaked_transients, 1);
    assert_eq!(rvm.registry().available_render_targets(), 1);

    let entry = frame.entry_point();
    let slot = frame
        .command_buffer_mut(entry)
        .acquire_texture(64, 64, PixelFormat::Rgba8);
    frame.command_buffer_mut(entry).release_texture(slot);
    let stats = rvm.display(&mut frame).unwrap();
    assert_eq!(stats.leaked_transients, 0);
    assert_eq!(render_targets(rvm.device()).len(), 1);
}

#[test]
fn test_resources_are_constructed_on_display() {
    let mut rvm = rvm();
    rvm.registry_mut().create_vertex_buffer(&[1, 2, 3, 4]);
    rvm.registry_mut().create_index_buffer(&[0, 1, 2]);
    assert!(rvm.device().created().is_empty());
    assert_eq!(rvm.registry().pending_count(), 2);

    let mut frame = RenderFrame::new();
    rvm.display(&mut frame).unwrap();
    assert_eq!(rvm.registry().pending_count(), 0);
    assert_eq!(rvm.device().created().len(), 2);
}

#[test]
fn test_uploads_write_device_buffers() {
    let mut rvm = rvm();
    let constants = rvm.registry_mut().create_constant_buffer(16);
    let vertices = rvm.registry_mut().create_vertex_buffer(&[0; 8]);

    let mut frame = RenderFrame::new();
    let entry = frame.entry_point();
    let buffer = frame.command_buffer_mut(entry);
    buffer.upload_constant_buffer_pod(constants, &[1.0f32, 2.0, 3.0, 4.0]);
    buffer.upload_vertex_buffer(vertices, &[9, 8, 7]);

    let stats = rvm.display(&mut frame).unwrap();
    assert_eq!(stats.uploads, 2);

    let constants_id = rvm.registry().resolve_constant_buffer(constants).id;
    let vertices_id = rvm.registry().resolve_vertex_buffer(vertices).id;
    assert_eq!(
        rvm.device().buffer_contents(constants_id),
        bytemuck::cast_slice::<f32, u8>(&[1.0, 2.0, 3.0, 4.0])
    );
    assert_eq!(
        rvm.device().buffer_contents(vertices_id),
        &[9u8, 8, 7, 0, 0, 0, 0, 0][..]
    );
}

#[test]
#[should_panic(expected = "exceeds constant buffer")]
fn test_oversized_upload_panics() {
    let mut rvm = rvm();
    let constants = rvm.registry_mut().create_constant_buffer(4);
    let mut frame = RenderFrame::new();
    let entry = frame.entry_point();
    frame
        .command_buffer_mut(entry)
        .upload_constant_buffer(constants, &[0; 8]);
    let _ = rvm.display(&mut frame);
}

#[test]
fn test_sorted_draws_execute_in_key_order() {
    let mut rvm = rvm();
    let basic = shader(&mut rvm, "basic", FeatureLayout::new());

    let mut frame = RenderFrame::new();
    let block = frame.alloc_state_block(StateBlock::new().bind_shader(basic));
    let entry = frame.entry_point();
    let buffer = frame.command_buffer_mut(entry);
    buffer.draw_primitives(2, PrimitiveType::Points, 0, 10, block);
    buffer.draw_primitives(1, PrimitiveType::Points, 0, 20, block);
    buffer.draw_primitives(2, PrimitiveType::Points, 0, 30, block);
    buffer.begin_sequence();
    buffer.draw_primitives(0, PrimitiveType::Points, 0, 40, block);
    buffer.sort();

    rvm.display(&mut frame).unwrap();
    assert_eq!(draws(rvm.device()), vec![20, 10, 30, 40]);
}

#[test]
#[should_panic(expected = "draw call issued without a valid shader")]
fn test_draw_without_shader_panics() {
    let mut rvm = rvm();
    let vb = rvm.registry_mut().create_vertex_buffer(&[0; 12]);
    let mut frame = RenderFrame::new();
    let block = frame.alloc_state_block(StateBlock::new().bind_vertex_buffer(vb));
    let entry = frame.entry_point();
    frame
        .command_buffer_mut(entry)
        .draw_primitives(0, PrimitiveType::Triangles, 0, 3, block);
    let _ = rvm.display(&mut frame);
}

#[test]
fn test_compile_failure_abandons_frame_and_resets() {
    let mut rvm = rvm();
    let basic = shader(&mut rvm, "basic", FeatureLayout::new());
    rvm.device_mut().fail_program_compilation(true);

    let mut frame = RenderFrame::new();
    let block = frame.alloc_state_block(StateBlock::new().bind_shader(basic));
    let entry = frame.entry_point();
    frame
        .command_buffer_mut(entry)
        .draw_primitives(0, PrimitiveType::Triangles, 0, 3, block);

    let err = rvm.display(&mut frame).unwrap_err();
    assert!(matches!(err, RenderError::Shader(_)));
    assert_eq!(rvm.device().calls(), default_tail().as_slice());
    assert_eq!(frame.block_count(), 0);

    rvm.device_mut().fail_program_compilation(false);
    rvm.device_mut().clear_calls();
    let block = frame.alloc_state_block(StateBlock::new().bind_shader(basic));
    let entry = frame.entry_point();
    frame
        .command_buffer_mut(entry)
        .draw_primitives(0, PrimitiveType::Triangles, 0, 3, block);
    assert_eq!(rvm.display(&mut frame).unwrap().draw_calls, 1);
}

#[test]
fn test_creation_failure_unwinds_transient_targets() {
    let mut rvm = rvm();
    let mut frame = RenderFrame::new();

    let entry = frame.entry_point();
    let slot = frame
        .command_buffer_mut(entry)
        .acquire_texture(256, 256, PixelFormat::Rgba8);
    frame.command_buffer_mut(entry).release_texture(slot);
    rvm.display(&mut frame).unwrap();

    let entry = frame.entry_point();
    let outer_slot = frame
        .command_buffer_mut(entry)
        .acquire_texture(256, 256, PixelFormat::Rgba8);
    let pass = frame.render_to_target(entry, Some(outer_slot), Viewport::FULL);
    frame
        .command_buffer_mut(pass)
        .acquire_texture(128, 128, PixelFormat::Rgba8);
    rvm.device_mut().fail_next_creation("out of memory");

    let err = rvm.display(&mut frame).unwrap_err();
    assert!(matches!(err, RenderError::Resource(_)));
    assert_eq!(rvm.registry().available_render_targets(), 1);

    let entry = frame.entry_point();
    let slot = frame
        .command_buffer_mut(entry)
        .acquire_texture(256, 256, PixelFormat::Rgba8);
    frame.command_buffer_mut(entry).release_texture(slot);
    assert!(rvm.display(&mut frame).is_ok());
}

#[test]
fn test_reset_follows_configured_baseline() {
    let settings = RvmSettings {
        reset_texture_slots: 2,
        baseline: BaselineState {
            cull_face: TriangleFace::Front,
            ..BaselineState::default()
        },
        ..RvmSettings::default()
    };
    let mut rvm = rvm_with(FeatureRegistry::new(), settings.clone());
    let mut frame = RenderFrame::new();
    rvm.display(&mut frame).unwrap();

    assert_eq!(
        rvm.device().calls(),
        reset_tail(settings.baseline, 2).as_slice(),
        "an empty frame only resets the device"
    );
}

#[test]
#[should_panic(expected = "stale state block id")]
fn test_block_ids_do_not_survive_display() {
    let mut rvm = rvm();
    let mut frame = RenderFrame::new();
    let block = frame.alloc_state_block(StateBlock::new());
    rvm.display(&mut frame).unwrap();
    frame.state_block(block);
}
