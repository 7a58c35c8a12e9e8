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

//! Maps persistent handles to device resources.
//!
//! Every resource category has its own pool. `create_*` appends a pending
//! request and returns `index + 1`, so no device is needed at creation time;
//! [`ResourceRegistry::construct_pending`] turns the requests into device
//! objects and runs at the start of every display. Resolving a handle is an
//! O(1) index lookup that treats invalid, out-of-range and unconstructed
//! handles as fatal errors.
//!
//! Render targets are never requested ahead of time: they are created on
//! demand by [`ResourceRegistry::acquire_render_target`] and recycled.

use ahash::AHashMap;
use std::sync::Arc;
use vesper_core::renderer::{
    BufferDescriptor, BufferId, BufferUsage, ConstantBufferHandle, DeviceRenderTarget,
    IndexBufferHandle, InputLayoutHandle, InputLayoutId, PipelineFeatures, RenderDevice,
    RenderTargetDescriptor, RenderTargetHandle, ResourceError, ShaderHandle, TextureData,
    TextureDescriptor, TextureHandle, TextureId, Ubershader, VertexBufferHandle, VertexFormat,
};

enum Entry<R, O> {
    Pending(R),
    Ready(O),
}

struct Pool<R, O> {
    kind: &'static str,
    entries: Vec<Entry<R, O>>,
    pending: usize,
}

impl<R, O> Pool<R, O> {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            pending: 0,
        }
    }

    fn create(&mut self, request: R) -> usize {
        self.entries.push(Entry::Pending(request));
        self.pending += 1;
        self.entries.len() - 1
    }

    fn insert_ready(&mut self, object: O) -> usize {
        self.entries.push(Entry::Ready(object));
        self.entries.len() - 1
    }

    fn resolve(&self, raw: u32) -> &O {
        assert!(raw > 0, "invalid identifier: {} handle 0", self.kind);
        match self.entries.get(raw as usize - 1) {
            Some(Entry::Ready(object)) => object,
            Some(Entry::Pending(_)) => {
                panic!("{} {raw} is used before it was constructed", self.kind)
            }
            None => panic!(
                "invalid identifier: {} {raw} out of {}",
                self.kind,
                self.entries.len()
            ),
        }
    }

    fn construct(
        &mut self,
        mut build: impl FnMut(&R) -> Result<O, ResourceError>,
    ) -> Result<usize, ResourceError> {
        if self.pending == 0 {
            return Ok(0);
        }
        let mut constructed = 0;
        for entry in &mut self.entries {
            if let Entry::Pending(request) = entry {
                let object = build(request)?;
                *entry = Entry::Ready(object);
                self.pending -= 1;
                constructed += 1;
            }
        }
        Ok(constructed)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A device buffer and its size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSlot {
    /// The device buffer.
    pub id: BufferId,
    /// The size in bytes.
    pub size: u64,
}

/// A device input layout and the vertex features it provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutSlot {
    /// The device layout.
    pub id: InputLayoutId,
    /// The vertex-attribute features of its format.
    pub features: PipelineFeatures,
}

#[derive(Debug)]
struct RenderTargetSlot {
    descriptor: RenderTargetDescriptor,
    target: DeviceRenderTarget,
}

/// Owns the pools of persistent resources.
pub struct ResourceRegistry {
    vertex_buffers: Pool<Vec<u8>, BufferSlot>,
    index_buffers: Pool<Vec<u16>, BufferSlot>,
    constant_buffers: Pool<usize, BufferSlot>,
    input_layouts: Pool<VertexFormat, LayoutSlot>,
    textures: Pool<Arc<TextureData>, TextureId>,
    render_targets: Pool<(), RenderTargetSlot>,
    shaders: Vec<Arc<Ubershader>>,
    interned_shaders: AHashMap<usize, ShaderHandle>,
    interned_textures: AHashMap<usize, (Arc<TextureData>, TextureHandle)>,
    available_targets: Vec<RenderTargetHandle>,
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("vertex_buffers", &self.vertex_buffers.len())
            .field("index_buffers", &self.index_buffers.len())
            .field("constant_buffers", &self.constant_buffers.len())
            .field("input_layouts", &self.input_layouts.len())
            .field("textures", &self.textures.len())
            .field("render_targets", &self.render_targets.len())
            .field("shaders", &self.shaders.len())
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            vertex_buffers: Pool::new("vertex buffer"),
            index_buffers: Pool::new("index buffer"),
            constant_buffers: Pool::new("constant buffer"),
            input_layouts: Pool::new("input layout"),
            textures: Pool::new("texture"),
            render_targets: Pool::new("render target"),
            shaders: Vec::new(),
            interned_shaders: AHashMap::new(),
            interned_textures: AHashMap::new(),
            available_targets: Vec::new(),
        }
    }

    /// Creates a vertex buffer holding a copy of `bytes`.
    pub fn create_vertex_buffer(&mut self, bytes: &[u8]) -> VertexBufferHandle {
        VertexBufferHandle::from_index(self.vertex_buffers.create(bytes.to_vec()))
    }

    /// Creates an index buffer of 16-bit indices.
    pub fn create_index_buffer(&mut self, indices: &[u16]) -> IndexBufferHandle {
        IndexBufferHandle::from_index(self.index_buffers.create(indices.to_vec()))
    }

    /// Creates a constant buffer of `size` bytes.
    pub fn create_constant_buffer(&mut self, size: usize) -> ConstantBufferHandle {
        ConstantBufferHandle::from_index(self.constant_buffers.create(size))
    }

    /// Creates an input layout for `format`.
    pub fn create_input_layout(&mut self, format: VertexFormat) -> InputLayoutHandle {
        InputLayoutHandle::from_index(self.input_layouts.create(format))
    }

    /// Creates a texture. `pixels` may be empty for an uninitialised texture.
    ///
    /// # Panics
    ///
    /// Panics if `pixels` is neither empty nor exactly one image of `descriptor`.
    pub fn create_texture(&mut self, descriptor: TextureDescriptor, pixels: Vec<u8>) -> TextureHandle {
        assert!(
            pixels.is_empty() || pixels.len() == descriptor.byte_size(),
            "texture of {}x{} {:?} expects {} bytes, got {}",
            descriptor.size.width,
            descriptor.size.height,
            descriptor.format,
            descriptor.byte_size(),
            pixels.len()
        );
        let data = Arc::new(TextureData { descriptor, pixels });
        TextureHandle::from_index(self.textures.create(data))
    }

    /// Returns the handle of `shader`, adding it on first use.
    ///
    /// Interning is by identity: two `Arc`s with equal contents get distinct
    /// handles.
    pub fn intern_shader(&mut self, shader: Arc<Ubershader>) -> ShaderHandle {
        let key = Arc::as_ptr(&shader) as usize;
        if let Some(handle) = self.interned_shaders.get(&key) {
            return *handle;
        }
        self.shaders.push(shader);
        let handle = ShaderHandle::from_index(self.shaders.len() - 1);
        self.interned_shaders.insert(key, handle);
        handle
    }

    /// Returns the handle of `texture`, creating it on first use.
    ///
    /// Interning is by identity, like [`intern_shader`](Self::intern_shader).
    pub fn intern_texture(&mut self, texture: Arc<TextureData>) -> TextureHandle {
        let key = Arc::as_ptr(&texture) as usize;
        if let Some((_, handle)) = self.interned_textures.get(&key) {
            return *handle;
        }
        let handle = TextureHandle::from_index(self.textures.create(texture.clone()));
        // The pool drops its copy once constructed; this one keeps the key's address alive.
        self.interned_textures.insert(key, (texture, handle));
        handle
    }

    /// Returns the number of requests not yet turned into device objects.
    pub fn pending_count(&self) -> usize {
        self.vertex_buffers.pending
            + self.index_buffers.pending
            + self.constant_buffers.pending
            + self.input_layouts.pending
            + self.textures.pending
    }

    /// Constructs every pending resource on `device` and returns how many
    /// were constructed.
    ///
    /// Stops at the first backend failure; resources constructed before it
    /// stay constructed and the rest remain pending.
    pub fn construct_pending<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
    ) -> Result<usize, ResourceError> {
        let mut constructed = 0;

        constructed += self.vertex_buffers.construct(|bytes| {
            let size = bytes.len() as u64;
            let id = device.create_buffer(&BufferDescriptor {
                usage: BufferUsage::Vertex,
                size,
                contents: Some(bytes),
            })?;
            Ok(BufferSlot { id, size })
        })?;

        constructed += self.index_buffers.construct(|indices| {
            let bytes: &[u8] = bytemuck::cast_slice(indices);
            let size = bytes.len() as u64;
            let id = device.create_buffer(&BufferDescriptor {
                usage: BufferUsage::Index,
                size,
                contents: Some(bytes),
            })?;
            Ok(BufferSlot { id, size })
        })?;

        constructed += self.constant_buffers.construct(|size| {
            let size = *size as u64;
            let id = device.create_buffer(&BufferDescriptor {
                usage: BufferUsage::Constant,
                size,
                contents: None,
            })?;
            Ok(BufferSlot { id, size })
        })?;

        constructed += self.input_layouts.construct(|format| {
            let id = device.create_input_layout(*format)?;
            Ok(LayoutSlot {
                id,
                features: format.features(),
            })
        })?;

        constructed += self.textures.construct(|data| {
            let pixels = (!data.pixels.is_empty()).then_some(data.pixels.as_slice());
            device.create_texture(&data.descriptor, pixels)
        })?;

        if constructed > 0 {
            log::debug!("Constructed {constructed} pending resources");
        }
        Ok(constructed)
    }

    /// Resolves a vertex buffer.
    pub fn resolve_vertex_buffer(&self, handle: VertexBufferHandle) -> BufferSlot {
        *self.vertex_buffers.resolve(handle.raw())
    }

    /// Resolves an index buffer.
    pub fn resolve_index_buffer(&self, handle: IndexBufferHandle) -> BufferSlot {
        *self.index_buffers.resolve(handle.raw())
    }

    /// Resolves a constant buffer.
    pub fn resolve_constant_buffer(&self, handle: ConstantBufferHandle) -> BufferSlot {
        *self.constant_buffers.resolve(handle.raw())
    }

    /// Resolves an input layout.
    pub fn resolve_input_layout(&self, handle: InputLayoutHandle) -> LayoutSlot {
        *self.input_layouts.resolve(handle.raw())
    }

    /// Resolves a texture.
    pub fn resolve_texture(&self, handle: TextureHandle) -> TextureId {
        *self.textures.resolve(handle.raw())
    }

    /// Resolves a render target.
    pub fn resolve_render_target(&self, handle: RenderTargetHandle) -> &DeviceRenderTarget {
        &self.render_targets.resolve(handle.raw()).target
    }

    /// Returns an interned shader.
    pub fn shader(&self, handle: ShaderHandle) -> &Arc<Ubershader> {
        assert!(handle.is_valid(), "invalid identifier: shader handle 0");
        self.shaders.get(handle.index()).unwrap_or_else(|| {
            panic!(
                "invalid identifier: shader {} out of {}",
                handle.raw(),
                self.shaders.len()
            )
        })
    }

    /// Returns an available render target matching `descriptor`, creating
    /// one if none is free.
    pub fn acquire_render_target<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        descriptor: RenderTargetDescriptor,
    ) -> Result<RenderTargetHandle, ResourceError> {
        let reusable = self
            .available_targets
            .iter()
            .position(|h| self.render_targets.resolve(h.raw()).descriptor == descriptor);
        if let Some(position) = reusable {
            return Ok(self.available_targets.swap_remove(position));
        }

        let target = device.create_render_target(&descriptor)?;
        log::debug!(
            "Created transient render target {}x{} ({:?})",
            descriptor.size.width,
            descriptor.size.height,
            descriptor.color_format
        );
        let index = self.render_targets.insert_ready(RenderTargetSlot { descriptor, target });
        Ok(RenderTargetHandle::from_index(index))
    }

    /// Makes a render target available to later acquisitions.
    pub fn release_render_target(&mut self, handle: RenderTargetHandle) {
        self.render_targets.resolve(handle.raw());
        assert!(
            !self.available_targets.contains(&handle),
            "render target {} released twice",
            handle.raw()
        );
        self.available_targets.push(handle);
    }

    /// Returns the number of render targets waiting to be reused.
    pub fn available_render_targets(&self) -> usize {
        self.available_targets.len()
    }
}
