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

// Vesper Sandbox
// Records a scene pass and a post-process pass, then replays them.

use std::sync::Arc;

use anyhow::Result;
use vesper_core::math::{LinearRgba, Viewport};
use vesper_core::renderer::{
    ClearMask, CompareFunction, FeatureLayout, FeatureRegistry, PipelineFeatures, PixelFormat,
    PrimitiveType, RenderDevice, RenderFrame, StateBlock, Ubershader, VertexFormat,
};
use vesper_infra::telemetry::init_logging;
use vesper_infra::TraceDevice;
use vesper_rvm::{Rvm, RvmSettings};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    color: [f32; 4],
}

const VERTICES: &[Vertex] = &[
    Vertex {
        position: [0.0, 0.5, 0.0],
        color: [1.0, 0.0, 0.0, 1.0],
    },
    Vertex {
        position: [-0.5, -0.5, 0.0],
        color: [0.0, 1.0, 0.0, 1.0],
    },
    Vertex {
        position: [0.5, -0.5, 0.0],
        color: [0.0, 0.0, 1.0, 1.0],
    },
];

const INDICES: &[u16] = &[0, 1, 2];

const SCENE_VS: &str = "in vec3 position;\n#ifdef F_VertexColor\nin vec4 color;\n#endif\n";
const SCENE_FS: &str = "#ifdef F_Tint\nuniform vec4 tint;\n#endif\n";
const POST_VS: &str = "in vec3 position;\n";
const POST_FS: &str = "#ifdef F_Source\nuniform sampler2D source;\n#endif\n";

fn main() -> Result<()> {
    init_logging("info");

    let settings = RvmSettings::from_ron_str(include_str!("../rvm.ron"))?;
    let mut features = FeatureRegistry::new();
    let tint = features.register("F_Tint");

    let mut rvm = Rvm::new(TraceDevice::new(1280, 720), features, settings);

    let format = VertexFormat::POSITION | VertexFormat::COLOR;
    let registry = rvm.registry_mut();
    let vertices = registry.create_vertex_buffer(bytemuck::cast_slice(VERTICES));
    let indices = registry.create_index_buffer(INDICES);
    let layout = registry.create_input_layout(format);
    let tint_buffer = registry.create_constant_buffer(16);
    let scene_shader = registry.intern_shader(Arc::new(Ubershader::new(
        "scene",
        SCENE_VS,
        SCENE_FS,
        FeatureLayout::new()
            .with("F_VertexColor", VertexFormat::COLOR.features())
            .with("F_Tint", tint),
    )));
    let post_shader = registry.intern_shader(Arc::new(Ubershader::new(
        "post",
        POST_VS,
        POST_FS,
        FeatureLayout::new().with("F_Source", PipelineFeatures::sampler(0)),
    )));

    let mut frame = RenderFrame::new();
    for index in 0..2 {
        let size = rvm.device().backbuffer_size();
        let mesh = frame.alloc_state_block(
            StateBlock::new()
                .bind_vertex_buffer(vertices)
                .bind_index_buffer(indices)
                .bind_input_layout(layout),
        );
        let material = frame.alloc_state_block(
            StateBlock::new()
                .bind_shader(scene_shader)
                .bind_constant_buffer(tint_buffer, 0)
                .set_depth_state(true, CompareFunction::Less)
                .enable_features(tint),
        );

        let entry = frame.entry_point();
        let scene = frame
            .command_buffer_mut(entry)
            .acquire_texture(size.width, size.height, PixelFormat::Rgba16F);
        let pass = frame.render_to_target(entry, Some(scene), Viewport::FULL);
        {
            let mut scope = frame.push_state_scope(material);
            let mut scope = scope.push_state_scope(mesh);
            let chain = scope.state_chain();
            let buffer = scope.command_buffer_mut(pass);
            buffer.clear(LinearRgba::BLACK, ClearMask::ALL);
            buffer.upload_constant_buffer_pod(tint_buffer, &LinearRgba::RED.to_array());
            buffer.draw_indexed(0, PrimitiveType::Triangles, 0, INDICES.len() as u32, chain);
        }

        let post = frame.alloc_state_block(
            StateBlock::new()
                .bind_shader(post_shader)
                .bind_vertex_buffer(vertices)
                .bind_transient_texture(scene, 0, 0)
                .set_depth_state(false, CompareFunction::Always),
        );
        let buffer = frame.command_buffer_mut(entry);
        buffer.draw_primitives(0, PrimitiveType::Triangles, 0, 3, post);
        buffer.release_texture(scene);
        buffer.dump("entry point");

        let stats = rvm.display(&mut frame)?;
        log::info!("Frame {index}: {stats}");
    }

    for call in rvm.device_mut().take_calls() {
        log::info!("{call:?}");
    }
    log::info!(
        "{} permutations compiled, {} render targets available",
        rvm.permutations().len(),
        rvm.registry().available_render_targets()
    );
    Ok(())
}
