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

use crate::math::{Extent2D, LinearRgba, Rect};
use crate::renderer::api::*;
use crate::renderer::error::{ResourceError, ShaderError};
use std::fmt::Debug;

/// The device a backend exposes to the executor.
///
/// Resource construction is fallible and reports backend failures. Pipeline
/// calls are infallible: the executor only issues them with ids the backend
/// handed out itself. Every method takes `&mut self` since a device is
/// driven from a single thread.
pub trait RenderDevice: Debug {
    /// Returns the size of the back buffer in pixels.
    fn backbuffer_size(&self) -> Extent2D;

    /// Creates a buffer.
    /// ## Arguments
    /// * `descriptor` - The usage, size and optional initial contents.
    /// ## Returns
    /// A `Result` containing the ID of the created buffer or an error if the creation fails.
    fn create_buffer(&mut self, descriptor: &BufferDescriptor<'_>) -> Result<BufferId, ResourceError>;

    /// Writes data to a buffer.
    /// ## Arguments
    /// * `id` - The ID of the buffer to write to.
    /// * `offset` - The offset in the buffer where the data will be written.
    /// * `data` - The bytes to write.
    /// ## Returns
    /// A `Result` indicating success or failure of the operation.
    fn write_buffer(&mut self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError>;

    /// Creates an input layout for interleaved vertices of `format`.
    fn create_input_layout(&mut self, format: VertexFormat) -> Result<InputLayoutId, ResourceError>;

    /// Creates a texture.
    /// ## Arguments
    /// * `descriptor` - The size and format of the texture.
    /// * `pixels` - Optional tightly packed initial pixels.
    /// ## Returns
    /// A `Result` containing the ID of the created texture or an error if the creation fails.
    fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor,
        pixels: Option<&[u8]>,
    ) -> Result<TextureId, ResourceError>;

    /// Creates a render target whose color attachments can be sampled.
    fn create_render_target(
        &mut self,
        descriptor: &RenderTargetDescriptor,
    ) -> Result<DeviceRenderTarget, ResourceError>;

    /// Compiles one ubershader permutation into a program.
    /// ## Arguments
    /// * `descriptor` - The preprocessed stage sources and the feature set they were built for.
    /// ## Returns
    /// A `Result` containing the ID of the compiled program or an error if compilation fails.
    fn compile_program(&mut self, descriptor: &ProgramDescriptor<'_>) -> Result<ProgramId, ShaderError>;

    /// Clears the planes in `mask` of the bound target.
    fn clear(&mut self, mask: ClearMask, color: LinearRgba, depth: f32, stencil: u8);

    /// Sets the viewport in pixels of the bound target.
    fn set_viewport(&mut self, rect: Rect);

    /// Binds a render target, `None` binds the back buffer.
    fn bind_render_target(&mut self, target: Option<RenderTargetId>);

    /// Binds a program, `None` unbinds.
    fn bind_program(&mut self, program: Option<ProgramId>);

    /// Binds a vertex buffer, `None` unbinds.
    fn bind_vertex_buffer(&mut self, buffer: Option<BufferId>);

    /// Binds an index buffer, `None` unbinds.
    fn bind_index_buffer(&mut self, buffer: Option<BufferId>);

    /// Binds a constant buffer to `slot`, `None` unbinds.
    fn bind_constant_buffer(&mut self, slot: u8, buffer: Option<BufferId>);

    /// Binds an input layout, `None` unbinds.
    fn bind_input_layout(&mut self, layout: Option<InputLayoutId>);

    /// Binds a texture to `sampler`, `None` unbinds.
    fn bind_texture(&mut self, sampler: u8, texture: Option<TextureId>);

    /// Sets the alpha test. `CompareFunction::Disabled` turns it off.
    fn set_alpha_test(&mut self, function: CompareFunction, reference: f32);

    /// Sets depth write and the depth compare function.
    fn set_depth_state(&mut self, write: bool, function: CompareFunction);

    /// Sets the blend factors.
    fn set_blend_factors(&mut self, src: BlendFactor, dst: BlendFactor);

    /// Sets the culled triangle face.
    fn set_cull_face(&mut self, face: TriangleFace);

    /// Sets the polygon offset.
    fn set_polygon_offset(&mut self, factor: f32, units: f32);

    /// Sets the rasterization mode.
    fn set_polygon_mode(&mut self, mode: PolygonMode);

    /// Draws `count` indices starting at `first` from the bound index buffer.
    fn draw_indexed(&mut self, primitive: PrimitiveType, first: u32, count: u32);

    /// Draws `count` vertices starting at `first` from the bound vertex buffer.
    fn draw_primitives(&mut self, primitive: PrimitiveType, first: u32, count: u32);
}
