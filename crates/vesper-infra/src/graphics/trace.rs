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

//! A headless device that records every call it receives.
//!
//! The trace device backs tests and tooling: it hands out sequential ids,
//! keeps buffer contents so uploads can be inspected, and stores pipeline
//! calls in issue order. Resource creation is recorded separately from
//! pipeline calls so a trace only shows what the executor bound and drew.

use std::collections::HashMap;
use vesper_core::math::{Extent2D, LinearRgba, Rect};
use vesper_core::renderer::{
    BlendFactor, BufferDescriptor, BufferId, BufferUsage, ClearMask, CompareFunction,
    DeviceRenderTarget, InputLayoutId, PipelineFeatures, PolygonMode, PrimitiveType,
    ProgramDescriptor, ProgramId, RenderDevice, RenderTargetDescriptor, RenderTargetId,
    ResourceError, ShaderError, TextureDescriptor, TextureId, TriangleFace, VertexFormat,
};

/// A pipeline call received by a [`TraceDevice`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceCall {
    Clear {
        mask: ClearMask,
        color: LinearRgba,
        depth: f32,
        stencil: u8,
    },
    SetViewport(Rect),
    BindRenderTarget(Option<RenderTargetId>),
    BindProgram(Option<ProgramId>),
    BindVertexBuffer(Option<BufferId>),
    BindIndexBuffer(Option<BufferId>),
    BindConstantBuffer {
        slot: u8,
        buffer: Option<BufferId>,
    },
    BindInputLayout(Option<InputLayoutId>),
    BindTexture {
        sampler: u8,
        texture: Option<TextureId>,
    },
    SetAlphaTest {
        function: CompareFunction,
        reference: f32,
    },
    SetDepthState {
        write: bool,
        function: CompareFunction,
    },
    SetBlendFactors {
        src: BlendFactor,
        dst: BlendFactor,
    },
    SetCullFace(TriangleFace),
    SetPolygonOffset {
        factor: f32,
        units: f32,
    },
    SetPolygonMode(PolygonMode),
    DrawIndexed {
        primitive: PrimitiveType,
        first: u32,
        count: u32,
    },
    DrawPrimitives {
        primitive: PrimitiveType,
        first: u32,
        count: u32,
    },
    WriteBuffer {
        id: BufferId,
        offset: u64,
        len: usize,
    },
}

impl DeviceCall {
    /// Returns `true` for the two draw calls.
    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            DeviceCall::DrawIndexed { .. } | DeviceCall::DrawPrimitives { .. }
        )
    }
}

/// A resource created by a [`TraceDevice`].
#[derive(Debug, Clone, PartialEq)]
pub enum Created {
    Buffer {
        id: BufferId,
        usage: BufferUsage,
        size: u64,
    },
    InputLayout {
        id: InputLayoutId,
        format: VertexFormat,
    },
    Texture {
        id: TextureId,
        descriptor: TextureDescriptor,
    },
    RenderTarget {
        id: RenderTargetId,
        descriptor: RenderTargetDescriptor,
    },
    Program {
        id: ProgramId,
        label: String,
        features: PipelineFeatures,
        vertex: String,
        fragment: String,
    },
}

/// A recording [`RenderDevice`] without a GPU behind it.
#[derive(Debug)]
pub struct TraceDevice {
    size: Extent2D,
    calls: Vec<DeviceCall>,
    created: Vec<Created>,
    buffers: HashMap<BufferId, Vec<u8>>,
    next_id: usize,
    pending_failure: Option<String>,
    fail_compilation: bool,
}

impl TraceDevice {
    /// Creates a device with a back buffer of `width` x `height` pixels.
    pub fn new(width: u32, height: u32) -> Self {
        log::debug!("TraceDevice: created with a {width}x{height} back buffer");
        Self {
            size: Extent2D::new(width, height),
            calls: Vec::new(),
            created: Vec::new(),
            buffers: HashMap::new(),
            next_id: 0,
            pending_failure: None,
            fail_compilation: false,
        }
    }

    /// Returns the pipeline calls received so far, in issue order.
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    /// Returns and forgets the pipeline calls received so far.
    pub fn take_calls(&mut self) -> Vec<DeviceCall> {
        std::mem::take(&mut self.calls)
    }

    /// Forgets the pipeline calls received so far.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Returns the resources created so far, in creation order.
    pub fn created(&self) -> &[Created] {
        &self.created
    }

    /// Returns the current contents of a buffer.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not created by this device.
    pub fn buffer_contents(&self, id: BufferId) -> &[u8] {
        self.buffers
            .get(&id)
            .unwrap_or_else(|| panic!("TraceDevice: unknown buffer {id:?}"))
    }

    /// Makes the next resource creation fail with `details`.
    pub fn fail_next_creation(&mut self, details: &str) {
        self.pending_failure = Some(details.to_owned());
    }

    /// Makes every program compilation fail while `fail` is set.
    pub fn fail_program_compilation(&mut self, fail: bool) {
        self.fail_compilation = fail;
    }

    fn next_id(&mut self) -> usize {
        self.next_id += 1;
        self.next_id
    }

    fn check_failure(&mut self, kind: &'static str) -> Result<(), ResourceError> {
        match self.pending_failure.take() {
            Some(details) => {
                log::warn!("TraceDevice: failing creation of {kind}: {details}");
                Err(ResourceError::CreationFailed { kind, details })
            }
            None => Ok(()),
        }
    }

    fn record(&mut self, call: DeviceCall) {
        log::trace!("TraceDevice: {call:?}");
        self.calls.push(call);
    }
}

impl RenderDevice for TraceDevice {
    fn backbuffer_size(&self) -> Extent2D {
        self.size
    }

    fn create_buffer(&mut self, descriptor: &BufferDescriptor<'_>) -> Result<BufferId, ResourceError> {
        let kind = match descriptor.usage {
            BufferUsage::Vertex => "vertex buffer",
            BufferUsage::Index => "index buffer",
            BufferUsage::Constant => "constant buffer",
        };
        self.check_failure(kind)?;

        let mut contents = vec![0; descriptor.size as usize];
        if let Some(data) = descriptor.contents {
            if data.len() as u64 != descriptor.size {
                return Err(ResourceError::Backend(format!(
                    "{kind} of {} bytes created with {} bytes of contents",
                    descriptor.size,
                    data.len()
                )));
            }
            contents.copy_from_slice(data);
        }

        let id = BufferId(self.next_id());
        self.buffers.insert(id, contents);
        self.created.push(Created::Buffer {
            id,
            usage: descriptor.usage,
            size: descriptor.size,
        });
        log::debug!("TraceDevice: created {kind} {id:?} ({} bytes)", descriptor.size);
        Ok(id)
    }

    fn write_buffer(&mut self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let buffer = self
            .buffers
            .get_mut(&id)
            .ok_or_else(|| ResourceError::Backend(format!("unknown buffer {id:?}")))?;
        let size = buffer.len() as u64;
        let end = offset + data.len() as u64;
        if end > size {
            return Err(ResourceError::OutOfBounds {
                offset,
                len: data.len(),
                size,
            });
        }
        buffer[offset as usize..end as usize].copy_from_slice(data);
        self.record(DeviceCall::WriteBuffer {
            id,
            offset,
            len: data.len(),
        });
        Ok(())
    }

    fn create_input_layout(&mut self, format: VertexFormat) -> Result<InputLayoutId, ResourceError> {
        self.check_failure("input layout")?;
        let id = InputLayoutId(self.next_id());
        self.created.push(Created::InputLayout { id, format });
        Ok(id)
    }

    fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor,
        pixels: Option<&[u8]>,
    ) -> Result<TextureId, ResourceError> {
        self.check_failure("texture")?;
        if let Some(pixels) = pixels {
            if pixels.len() != descriptor.byte_size() {
                return Err(ResourceError::Backend(format!(
                    "texture expects {} bytes of pixels, got {}",
                    descriptor.byte_size(),
                    pixels.len()
                )));
            }
        }
        let id = TextureId(self.next_id());
        self.created.push(Created::Texture {
            id,
            descriptor: *descriptor,
        });
        Ok(id)
    }

    fn create_render_target(
        &mut self,
        descriptor: &RenderTargetDescriptor,
    ) -> Result<DeviceRenderTarget, ResourceError> {
        self.check_failure("render target")?;
        let attachments = (0..descriptor.color_attachments)
            .map(|_| {
                let id = TextureId(self.next_id());
                self.created.push(Created::Texture {
                    id,
                    descriptor: TextureDescriptor {
                        size: descriptor.size,
                        format: descriptor.color_format,
                    },
                });
                id
            })
            .collect();
        let id = RenderTargetId(self.next_id());
        self.created.push(Created::RenderTarget {
            id,
            descriptor: *descriptor,
        });
        log::debug!(
            "TraceDevice: created render target {id:?} ({}x{})",
            descriptor.size.width,
            descriptor.size.height
        );
        Ok(DeviceRenderTarget {
            id,
            size: descriptor.size,
            attachments,
        })
    }

    fn compile_program(&mut self, descriptor: &ProgramDescriptor<'_>) -> Result<ProgramId, ShaderError> {
        if self.fail_compilation {
            return Err(ShaderError::CompilationFailed {
                label: descriptor.label.to_owned(),
                features: descriptor.features,
                details: "compilation disabled on this trace device".to_owned(),
            });
        }
        let id = ProgramId(self.next_id());
        self.created.push(Created::Program {
            id,
            label: descriptor.label.to_owned(),
            features: descriptor.features,
            vertex: descriptor.vertex.to_owned(),
            fragment: descriptor.fragment.to_owned(),
        });
        log::debug!(
            "TraceDevice: compiled program {id:?} for '{}' with {:?}",
            descriptor.label,
            descriptor.features
        );
        Ok(id)
    }

    fn clear(&mut self, mask: ClearMask, color: LinearRgba, depth: f32, stencil: u8) {
        self.record(DeviceCall::Clear {
            mask,
            color,
            depth,
            stencil,
        });
    }

    fn set_viewport(&mut self, rect: Rect) {
        self.record(DeviceCall::SetViewport(rect));
    }

    fn bind_render_target(&mut self, target: Option<RenderTargetId>) {
        self.record(DeviceCall::BindRenderTarget(target));
    }

    fn bind_program(&mut self, program: Option<ProgramId>) {
        self.record(DeviceCall::BindProgram(program));
    }

    fn bind_vertex_buffer(&mut self, buffer: Option<BufferId>) {
        self.record(DeviceCall::BindVertexBuffer(buffer));
    }

    fn bind_index_buffer(&mut self, buffer: Option<BufferId>) {
        self.record(DeviceCall::BindIndexBuffer(buffer));
    }

    fn bind_constant_buffer(&mut self, slot: u8, buffer: Option<BufferId>) {
        self.record(DeviceCall::BindConstantBuffer { slot, buffer });
    }

    fn bind_input_layout(&mut self, layout: Option<InputLayoutId>) {
        self.record(DeviceCall::BindInputLayout(layout));
    }

    fn bind_texture(&mut self, sampler: u8, texture: Option<TextureId>) {
        self.record(DeviceCall::BindTexture { sampler, texture });
    }

    fn set_alpha_test(&mut self, function: CompareFunction, reference: f32) {
        self.record(DeviceCall::SetAlphaTest {
            function,
            reference,
        });
    }

    fn set_depth_state(&mut self, write: bool, function: CompareFunction) {
        self.record(DeviceCall::SetDepthState { write, function });
    }

    fn set_blend_factors(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.record(DeviceCall::SetBlendFactors { src, dst });
    }

    fn set_cull_face(&mut self, face: TriangleFace) {
        self.record(DeviceCall::SetCullFace(face));
    }

    fn set_polygon_offset(&mut self, factor: f32, units: f32) {
        self.record(DeviceCall::SetPolygonOffset { factor, units });
    }

    fn set_polygon_mode(&mut self, mode: PolygonMode) {
        self.record(DeviceCall::SetPolygonMode(mode));
    }

    fn draw_indexed(&mut self, primitive: PrimitiveType, first: u32, count: u32) {
        self.record(DeviceCall::DrawIndexed {
            primitive,
            first,
            count,
        });
    }

    fn draw_primitives(&mut self, primitive: PrimitiveType, first: u32, count: u32) {
        self.record(DeviceCall::DrawPrimitives {
            primitive,
            first,
            count,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vesper_core::renderer::PixelFormat;

    #[test]
    fn test_ids_are_sequential_across_kinds() {
        let mut device = TraceDevice::new(4, 4);
        let buffer = device
            .create_buffer(&BufferDescriptor {
                usage: BufferUsage::Vertex,
                size: 4,
                contents: None,
            })
            .unwrap();
        let layout = device.create_input_layout(VertexFormat::POSITION).unwrap();
        assert_eq!(buffer, BufferId(1));
        assert_eq!(layout, InputLayoutId(2));
        assert_eq!(device.created().len(), 2);
        assert!(device.calls().is_empty());
    }

    #[test]
    fn test_write_buffer_checks_bounds() {
        let mut device = TraceDevice::new(4, 4);
        let id = device
            .create_buffer(&BufferDescriptor {
                usage: BufferUsage::Constant,
                size: 8,
                contents: None,
            })
            .unwrap();
        device.write_buffer(id, 4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(device.buffer_contents(id), &[0, 0, 0, 0, 1, 2, 3, 4][..]);

        let err = device.write_buffer(id, 6, &[9, 9, 9]).unwrap_err();
        assert!(matches!(err, ResourceError::OutOfBounds { size: 8, .. }));
    }

    #[test]
    fn test_render_target_exposes_attachments() {
        let mut device = TraceDevice::new(4, 4);
        let descriptor = RenderTargetDescriptor {
            color_attachments: 2,
            ..RenderTargetDescriptor::color(16, 16, PixelFormat::Rgba8)
        };
        let target = device.create_render_target(&descriptor).unwrap();
        assert_eq!(target.attachments, vec![TextureId(1), TextureId(2)]);
        assert_eq!(target.id, RenderTargetId(3));
    }

    #[test]
    fn test_injected_failure_fires_once() {
        let mut device = TraceDevice::new(4, 4);
        device.fail_next_creation("device lost");
        assert!(device.create_input_layout(VertexFormat::POSITION).is_err());
        assert!(device.create_input_layout(VertexFormat::POSITION).is_ok());
    }

    #[test]
    fn test_calls_are_recorded_in_order() {
        let mut device = TraceDevice::new(4, 4);
        device.bind_program(None);
        device.draw_primitives(PrimitiveType::Points, 0, 1);
        let calls = device.take_calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].is_draw());
        assert!(device.calls().is_empty());
    }
}
