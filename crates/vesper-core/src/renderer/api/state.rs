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

//! Pipeline state values, state blocks and the state stack.
//!
//! A [`State`] is one typed pipeline setting with a payload of at most eight
//! bytes. A [`StateBlock`] is an immutable, ordered set of them together with
//! the [`StateMask`] of the slots it writes and the user features it
//! declares. Blocks live in the arena of a [`RenderFrame`] and are referred
//! to by [`StateBlockId`]; a draw call carries a [`StateChain`] of up to
//! [`MAX_STATE_STACK_DEPTH`] ids ordered nearest first.
//!
//! [`RenderFrame`]: super::frame::RenderFrame

use super::common::{BlendFactor, CompareFunction, PolygonMode, TriangleFace};
use super::feature::PipelineFeatures;
use super::handle::{
    ConstantBufferHandle, IndexBufferHandle, InputLayoutHandle, ShaderHandle, TextureHandle,
    TransientTexture, VertexBufferHandle,
};
use crate::vesper_bitflags;
use smallvec::SmallVec;
use std::ops::{Deref, DerefMut};

/// The maximum number of blocks a state chain or the state stack can hold.
pub const MAX_STATE_STACK_DEPTH: usize = 8;

/// The number of constant buffer slots.
pub const MAX_CONSTANT_BUFFERS: u8 = 8;

/// The number of texture samplers.
pub const MAX_TEXTURE_SAMPLERS: u8 = 8;

vesper_bitflags! {
    /// One bit per pipeline state slot.
    ///
    /// Constant buffer slots and texture samplers get a bit each so a single
    /// block can bind several of them.
    pub struct StateMask: u32 {
        /// Alpha test function and reference.
        const ALPHA_TEST = 1 << 0;
        /// Depth write and compare function.
        const DEPTH_STATE = 1 << 1;
        /// Blend factors.
        const BLENDING = 1 << 2;
        /// The bound ubershader.
        const SHADER = 1 << 3;
        /// The bound vertex buffer.
        const VERTEX_BUFFER = 1 << 4;
        /// The bound index buffer.
        const INDEX_BUFFER = 1 << 5;
        /// The bound input layout.
        const INPUT_LAYOUT = 1 << 6;
        /// The culled triangle face.
        const CULL_FACE = 1 << 7;
        /// The polygon offset.
        const POLYGON_OFFSET = 1 << 8;
        /// The polygon rasterization mode.
        const POLYGON_MODE = 1 << 9;
        /// Every constant buffer slot.
        const CONSTANT_BUFFERS = 0xFF << 16;
        /// Every texture sampler.
        const TEXTURES = 0xFF << 24;
    }
}

impl StateMask {
    /// The bit of a constant buffer slot.
    pub fn constant_buffer(slot: u8) -> Self {
        assert!(
            slot < MAX_CONSTANT_BUFFERS,
            "constant buffer slot {slot} is out of range"
        );
        Self::from_bits_truncate(1 << (16 + slot as u32))
    }

    /// The bit of a texture sampler.
    pub fn texture(sampler: u8) -> Self {
        assert!(
            sampler < MAX_TEXTURE_SAMPLERS,
            "texture sampler {sampler} is out of range"
        );
        Self::from_bits_truncate(1 << (24 + sampler as u32))
    }
}

/// Where a texture state samples from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureSource {
    /// A persistent texture from the registry. The invalid handle unbinds.
    Persistent(TextureHandle),
    /// An attachment of a transient render target in the active stack frame.
    Transient {
        /// The transient slot.
        slot: TransientTexture,
        /// The render-target attachment index.
        attachment: u8,
    },
}

/// A single pipeline setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Alpha test; `reference` is in 1/255 steps.
    AlphaTest {
        /// The compare function, `Disabled` turns the test off.
        function: CompareFunction,
        /// The reference value.
        reference: u8,
    },
    /// Depth write and compare function.
    DepthState {
        /// Whether depth is written.
        write: bool,
        /// The compare function, `Disabled` turns the test off.
        function: CompareFunction,
    },
    /// Blend factors; `One`/`Zero` disables blending.
    Blending {
        /// The source factor.
        src: BlendFactor,
        /// The destination factor.
        dst: BlendFactor,
    },
    /// The ubershader to draw with.
    Shader(ShaderHandle),
    /// A constant buffer bound to a slot.
    ConstantBuffer {
        /// The buffer.
        handle: ConstantBufferHandle,
        /// The slot index.
        slot: u8,
    },
    /// The vertex buffer.
    VertexBuffer(VertexBufferHandle),
    /// The index buffer.
    IndexBuffer(IndexBufferHandle),
    /// The input layout.
    InputLayout(InputLayoutHandle),
    /// A texture bound to a sampler.
    ///
    /// A non-negative `id` is a persistent texture handle. A negative `id`
    /// names the transient slot `-id`, and the high nibble of `sampler` picks
    /// the attachment of that render target. The low nibble is the sampler.
    Texture {
        /// The encoded texture id.
        id: i16,
        /// The encoded sampler.
        sampler: u8,
    },
    /// The culled triangle face.
    CullFace(TriangleFace),
    /// Polygon offset in 1/128 steps.
    PolygonOffset {
        /// The slope factor.
        factor: i16,
        /// The constant units.
        units: i16,
    },
    /// The rasterization mode.
    PolygonMode(PolygonMode),
}

impl State {
    /// A persistent texture bound to `sampler`.
    pub fn texture(handle: TextureHandle, sampler: u8) -> Self {
        let id = i16::try_from(handle.raw())
            .unwrap_or_else(|_| panic!("texture handle {} does not fit a state", handle.raw()));
        assert!(
            sampler < MAX_TEXTURE_SAMPLERS,
            "texture sampler {sampler} is out of range"
        );
        State::Texture { id, sampler }
    }

    /// An attachment of a transient render target bound to `sampler`.
    pub fn transient_texture(texture: TransientTexture, attachment: u8, sampler: u8) -> Self {
        assert!(attachment < 16, "attachment {attachment} is out of range");
        assert!(
            sampler < MAX_TEXTURE_SAMPLERS,
            "texture sampler {sampler} is out of range"
        );
        State::Texture {
            id: -(texture.slot() as i16),
            sampler: (attachment << 4) | sampler,
        }
    }

    /// A polygon offset from real factor and units.
    pub fn polygon_offset(factor: f32, units: f32) -> Self {
        State::PolygonOffset {
            factor: (factor * 128.0).round() as i16,
            units: (units * 128.0).round() as i16,
        }
    }

    /// Decodes the payload of a texture state into its source and sampler.
    pub fn decode_texture(id: i16, sampler: u8) -> (TextureSource, u8) {
        let index = sampler & 0xF;
        if id < 0 {
            let slot = TransientTexture::new((-id) as u8);
            (
                TextureSource::Transient {
                    slot,
                    attachment: sampler >> 4,
                },
                index,
            )
        } else {
            (
                TextureSource::Persistent(TextureHandle::from_raw(id as u32)),
                index,
            )
        }
    }

    /// Returns the slot bit this state writes.
    pub fn mask(&self) -> StateMask {
        match *self {
            State::AlphaTest { .. } => StateMask::ALPHA_TEST,
            State::DepthState { .. } => StateMask::DEPTH_STATE,
            State::Blending { .. } => StateMask::BLENDING,
            State::Shader(_) => StateMask::SHADER,
            State::ConstantBuffer { slot, .. } => StateMask::constant_buffer(slot),
            State::VertexBuffer(_) => StateMask::VERTEX_BUFFER,
            State::IndexBuffer(_) => StateMask::INDEX_BUFFER,
            State::InputLayout(_) => StateMask::INPUT_LAYOUT,
            State::Texture { sampler, .. } => StateMask::texture(sampler & 0xF),
            State::CullFace(_) => StateMask::CULL_FACE,
            State::PolygonOffset { .. } => StateMask::POLYGON_OFFSET,
            State::PolygonMode(_) => StateMask::POLYGON_MODE,
        }
    }
}

/// An immutable, ordered set of states plus the user features it declares.
///
/// Built by value:
///
/// ```
/// use vesper_core::renderer::{ShaderHandle, StateBlock, VertexBufferHandle};
///
/// let block = StateBlock::new()
///     .bind_shader(ShaderHandle::from_raw(1))
///     .bind_vertex_buffer(VertexBufferHandle::from_raw(1));
/// assert_eq!(block.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateBlock {
    states: SmallVec<[State; 4]>,
    mask: StateMask,
    features: u64,
    feature_mask: u64,
}

impl Default for StateBlock {
    fn default() -> Self {
        Self {
            states: SmallVec::new(),
            mask: StateMask::EMPTY,
            features: 0,
            feature_mask: u64::MAX,
        }
    }
}

impl StateBlock {
    /// Creates an empty block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a state, replacing any earlier state of the same slot.
    #[must_use]
    pub fn with(mut self, state: State) -> Self {
        let bit = state.mask();
        if self.mask.intersects(bit) {
            if let Some(existing) = self.states.iter_mut().find(|s| s.mask() == bit) {
                *existing = state;
            }
        } else {
            self.states.push(state);
            self.mask.insert(bit);
        }
        self
    }

    /// Binds an ubershader.
    #[must_use]
    pub fn bind_shader(self, shader: ShaderHandle) -> Self {
        self.with(State::Shader(shader))
    }

    /// Binds a vertex buffer.
    #[must_use]
    pub fn bind_vertex_buffer(self, buffer: VertexBufferHandle) -> Self {
        self.with(State::VertexBuffer(buffer))
    }

    /// Binds an index buffer.
    #[must_use]
    pub fn bind_index_buffer(self, buffer: IndexBufferHandle) -> Self {
        self.with(State::IndexBuffer(buffer))
    }

    /// Binds an input layout.
    #[must_use]
    pub fn bind_input_layout(self, layout: InputLayoutHandle) -> Self {
        self.with(State::InputLayout(layout))
    }

    /// Binds a constant buffer to `slot`.
    #[must_use]
    pub fn bind_constant_buffer(self, buffer: ConstantBufferHandle, slot: u8) -> Self {
        assert!(
            slot < MAX_CONSTANT_BUFFERS,
            "constant buffer slot {slot} is out of range"
        );
        self.with(State::ConstantBuffer {
            handle: buffer,
            slot,
        })
    }

    /// Binds a persistent texture to `sampler`.
    #[must_use]
    pub fn bind_texture(self, texture: TextureHandle, sampler: u8) -> Self {
        self.with(State::texture(texture, sampler))
    }

    /// Binds attachment `attachment` of a transient render target to `sampler`.
    #[must_use]
    pub fn bind_transient_texture(
        self,
        texture: TransientTexture,
        attachment: u8,
        sampler: u8,
    ) -> Self {
        self.with(State::transient_texture(texture, attachment, sampler))
    }

    /// Sets the alpha test; `reference` is in `0.0..=1.0`.
    #[must_use]
    pub fn set_alpha_test(self, function: CompareFunction, reference: f32) -> Self {
        self.with(State::AlphaTest {
            function,
            reference: (reference.clamp(0.0, 1.0) * 255.0).round() as u8,
        })
    }

    /// Sets depth write and compare function.
    #[must_use]
    pub fn set_depth_state(self, write: bool, function: CompareFunction) -> Self {
        self.with(State::DepthState { write, function })
    }

    /// Sets the blend factors.
    #[must_use]
    pub fn set_blending(self, src: BlendFactor, dst: BlendFactor) -> Self {
        self.with(State::Blending { src, dst })
    }

    /// Disables blending.
    #[must_use]
    pub fn disable_blending(self) -> Self {
        self.set_blending(BlendFactor::One, BlendFactor::Zero)
    }

    /// Sets the culled face.
    #[must_use]
    pub fn set_cull_face(self, face: TriangleFace) -> Self {
        self.with(State::CullFace(face))
    }

    /// Sets the polygon offset.
    #[must_use]
    pub fn set_polygon_offset(self, factor: f32, units: f32) -> Self {
        self.with(State::polygon_offset(factor, units))
    }

    /// Sets the rasterization mode.
    #[must_use]
    pub fn set_polygon_mode(self, mode: PolygonMode) -> Self {
        self.with(State::PolygonMode(mode))
    }

    /// Declares user features. Only the user range of `features` is kept.
    #[must_use]
    pub fn enable_features(mut self, features: PipelineFeatures) -> Self {
        self.features |= features.user_bits();
        self
    }

    /// Masks out user features declared by farther blocks of a chain.
    #[must_use]
    pub fn disable_features(mut self, features: PipelineFeatures) -> Self {
        self.feature_mask &= !features.user_bits();
        self
    }

    /// Returns the states in insertion order.
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// Returns the slots written by this block.
    pub fn mask(&self) -> StateMask {
        self.mask
    }

    /// Returns the declared user features, unshifted.
    pub fn features(&self) -> u64 {
        self.features
    }

    /// Returns the user feature mask, unshifted.
    pub fn feature_mask(&self) -> u64 {
        self.feature_mask
    }

    /// Returns the number of states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns `true` if the block holds no state.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// An id of a state block in a frame arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateBlockId {
    index: u32,
    generation: u32,
}

impl StateBlockId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns the arena index.
    pub const fn index(self) -> usize {
        self.index as usize
    }

    /// Returns the generation of the frame that allocated the block.
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

/// A snapshot of up to [`MAX_STATE_STACK_DEPTH`] blocks, nearest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateChain {
    blocks: [Option<StateBlockId>; MAX_STATE_STACK_DEPTH],
}

impl StateChain {
    /// Creates a chain from ids ordered nearest first.
    ///
    /// # Panics
    ///
    /// Panics if more than [`MAX_STATE_STACK_DEPTH`] ids are given.
    pub fn from_ids(ids: &[StateBlockId]) -> Self {
        assert!(
            ids.len() <= MAX_STATE_STACK_DEPTH,
            "state chain of {} blocks exceeds the maximum depth of {MAX_STATE_STACK_DEPTH}",
            ids.len()
        );
        let mut blocks = [None; MAX_STATE_STACK_DEPTH];
        for (dst, id) in blocks.iter_mut().zip(ids) {
            *dst = Some(*id);
        }
        Self { blocks }
    }

    /// Iterates over the ids nearest first, stopping at the first gap.
    pub fn iter(&self) -> impl Iterator<Item = StateBlockId> + '_ {
        self.blocks.iter().map_while(|b| *b)
    }

    /// Returns the number of blocks.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Returns `true` if the chain holds no block.
    pub fn is_empty(&self) -> bool {
        self.blocks[0].is_none()
    }
}

impl From<StateBlockId> for StateChain {
    fn from(id: StateBlockId) -> Self {
        Self::from_ids(&[id])
    }
}

impl From<&StateStack> for StateChain {
    fn from(stack: &StateStack) -> Self {
        stack.chain()
    }
}

/// A bounded stack of state blocks. The most recently pushed block is the
/// nearest one of the chains it produces.
#[derive(Debug, Clone, Default)]
pub struct StateStack {
    blocks: [Option<StateBlockId>; MAX_STATE_STACK_DEPTH],
    len: usize,
}

impl StateStack {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a block.
    ///
    /// # Panics
    ///
    /// Panics when the stack already holds [`MAX_STATE_STACK_DEPTH`] blocks.
    pub fn push(&mut self, id: StateBlockId) {
        assert!(
            self.len < MAX_STATE_STACK_DEPTH,
            "state stack overflow: depth is limited to {MAX_STATE_STACK_DEPTH}"
        );
        self.blocks[self.len] = Some(id);
        self.len += 1;
    }

    /// Pops the most recently pushed block.
    ///
    /// # Panics
    ///
    /// Panics on an empty stack.
    pub fn pop(&mut self) -> StateBlockId {
        assert!(self.len > 0, "state stack underflow");
        self.len -= 1;
        let id = self.blocks[self.len].take();
        id.unwrap_or_else(|| unreachable!("occupied stack entry below len"))
    }

    /// Pushes a block and returns a guard that pops it when dropped.
    pub fn push_scope(&mut self, id: StateBlockId) -> StateScope<'_> {
        self.push(id);
        StateScope { stack: self }
    }

    /// Returns a snapshot of the stack, nearest first.
    pub fn chain(&self) -> StateChain {
        let mut blocks = [None; MAX_STATE_STACK_DEPTH];
        for (dst, src) in blocks.iter_mut().zip(self.blocks[..self.len].iter().rev()) {
            *dst = *src;
        }
        StateChain { blocks }
    }

    /// Returns the number of pushed blocks.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no block is pushed.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drops every pushed block.
    pub fn clear(&mut self) {
        self.blocks = [None; MAX_STATE_STACK_DEPTH];
        self.len = 0;
    }
}

/// Pops its block from a [`StateStack`] when dropped.
#[derive(Debug)]
pub struct StateScope<'a> {
    stack: &'a mut StateStack,
}

impl Deref for StateScope<'_> {
    type Target = StateStack;
    fn deref(&self) -> &StateStack {
        self.stack
    }
}

impl DerefMut for StateScope<'_> {
    fn deref_mut(&mut self) -> &mut StateStack {
        self.stack
    }
}

impl Drop for StateScope<'_> {
    fn drop(&mut self) {
        self.stack.pop();
    }
}
