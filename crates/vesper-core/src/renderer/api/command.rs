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

//! Opcodes, sorting keys and the command buffer.
//!
//! A [`CommandBuffer`] is an append-only log of [`OpCode`]s. Recording never
//! touches a device: the buffer only stores data, including a private byte
//! store that upload opcodes reference through [`ByteRange`]s. Nested
//! buffers are owned by the [`RenderFrame`] and referenced by
//! [`CommandBufferId`].
//!
//! [`RenderFrame`]: super::frame::RenderFrame

use super::common::{ClearMask, PixelFormat, PrimitiveType};
use super::handle::{ConstantBufferHandle, TransientTexture, VertexBufferHandle, STACK_FRAME_SIZE};
use super::state::StateChain;
use crate::math::{LinearRgba, Viewport};

/// The bit position of the sequence number in a [`SortKey`].
pub const SEQUENCE_SHIFT: u32 = 56;
/// The bit position of the caller priority in a [`SortKey`].
pub const PRIORITY_SHIFT: u32 = 32;
/// The largest caller priority a draw call may use.
pub const MAX_SORT_PRIORITY: u32 = (1 << 24) - 1;

/// A 64-bit sorting key.
///
/// ```text
/// bits 63..56  sequence number
/// bits 55..32  caller priority
/// bits 31..0   recording index
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SortKey(u64);

impl SortKey {
    /// Composes a key.
    ///
    /// # Panics
    ///
    /// Panics if `priority` does not fit in 24 bits.
    pub fn new(sequence: u8, priority: u32, index: u32) -> Self {
        assert!(
            priority <= MAX_SORT_PRIORITY,
            "sorting key {priority:#x} does not fit the 24 bits reserved for callers"
        );
        Self(
            (sequence as u64) << SEQUENCE_SHIFT | (priority as u64) << PRIORITY_SHIFT | index as u64,
        )
    }

    /// Returns the raw key.
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Returns the sequence number.
    pub const fn sequence(self) -> u8 {
        (self.0 >> SEQUENCE_SHIFT) as u8
    }

    /// Returns the caller priority.
    pub const fn priority(self) -> u32 {
        ((self.0 >> PRIORITY_SHIFT) as u32) & MAX_SORT_PRIORITY
    }

    /// Returns the recording index.
    pub const fn index(self) -> u32 {
        self.0 as u32
    }
}

impl std::fmt::Debug for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SortKey({}:{}:{})",
            self.sequence(),
            self.priority(),
            self.index()
        )
    }
}

/// A range of the owning buffer's byte store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    offset: u32,
    len: u32,
}

impl ByteRange {
    /// Returns the length in bytes.
    pub const fn len(self) -> usize {
        self.len as usize
    }

    /// Returns `true` for an empty range.
    pub const fn is_empty(self) -> bool {
        self.len == 0
    }
}

/// An id of a command buffer owned by a [`RenderFrame`](super::frame::RenderFrame).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandBufferId {
    index: u32,
    generation: u32,
}

impl CommandBufferId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns the index of the buffer in its frame.
    pub const fn index(self) -> usize {
        self.index as usize
    }

    /// Returns the generation of the frame that created the buffer.
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

/// One recorded unit of rendering work.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpCode {
    /// Clears the planes of the bound target.
    Clear {
        /// The planes to clear.
        mask: ClearMask,
        /// The clear color.
        color: LinearRgba,
        /// The clear depth.
        depth: f32,
        /// The clear stencil value.
        stencil: u8,
    },
    /// Draws indexed primitives with the state of `states`.
    DrawIndexed {
        /// The primitive topology.
        primitive: PrimitiveType,
        /// The first index.
        first: u32,
        /// The number of indices.
        count: u32,
        /// The state chain, nearest first.
        states: StateChain,
    },
    /// Draws non-indexed primitives with the state of `states`.
    DrawPrimitives {
        /// The primitive topology.
        primitive: PrimitiveType,
        /// The first vertex.
        first: u32,
        /// The number of vertices.
        count: u32,
        /// The state chain, nearest first.
        states: StateChain,
    },
    /// Writes bytes into a constant buffer.
    UploadConstantBuffer {
        /// The target buffer.
        handle: ConstantBufferHandle,
        /// The bytes in the recording buffer.
        bytes: ByteRange,
    },
    /// Writes bytes into a vertex buffer.
    UploadVertexBuffer {
        /// The target buffer.
        handle: VertexBufferHandle,
        /// The bytes in the recording buffer.
        bytes: ByteRange,
    },
    /// Renders a nested buffer into a target.
    PushRenderTarget {
        /// The transient target, or `None` for the back buffer.
        target: Option<TransientTexture>,
        /// The normalised viewport.
        viewport: Viewport,
        /// The nested buffer.
        commands: CommandBufferId,
    },
    /// Acquires a transient render target into a slot of the active stack frame.
    AcquireTransientTexture {
        /// The slot.
        slot: TransientTexture,
        /// The width in pixels.
        width: u32,
        /// The height in pixels.
        height: u32,
        /// The color format.
        format: PixelFormat,
    },
    /// Releases a transient render target.
    ReleaseTransientTexture {
        /// The slot.
        slot: TransientTexture,
    },
    /// Executes a nested buffer.
    Execute {
        /// The nested buffer.
        commands: CommandBufferId,
    },
}

impl OpCode {
    /// Returns `true` for the draw opcodes.
    pub const fn is_draw(&self) -> bool {
        matches!(self, OpCode::DrawIndexed { .. } | OpCode::DrawPrimitives { .. })
    }
}

/// An opcode and its sorting key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Command {
    /// The sorting key.
    pub key: SortKey,
    /// The opcode.
    pub op: OpCode,
}

/// An append-only, replayable log of opcodes.
#[derive(Debug, Clone, Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
    bytes: Vec<u8>,
    transient_index: u8,
    sequence: u8,
}

impl CommandBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, priority: u32, op: OpCode) {
        let index = u32::try_from(self.commands.len())
            .unwrap_or_else(|_| panic!("command buffer exceeds {} opcodes", u32::MAX));
        let key = SortKey::new(self.sequence, priority, index);
        self.commands.push(Command { key, op });
    }

    fn store(&mut self, data: &[u8]) -> ByteRange {
        let offset = u32::try_from(self.bytes.len())
            .unwrap_or_else(|_| panic!("command buffer byte store exceeds 4 GiB"));
        let len = u32::try_from(data.len())
            .unwrap_or_else(|_| panic!("upload of {} bytes is too large", data.len()));
        self.bytes.extend_from_slice(data);
        ByteRange { offset, len }
    }

    /// Clears the bound target with depth `1.0` and stencil `0`.
    pub fn clear(&mut self, color: LinearRgba, mask: ClearMask) {
        self.push(
            0,
            OpCode::Clear {
                mask,
                color,
                depth: 1.0,
                stencil: 0,
            },
        );
    }

    /// Records an indexed draw.
    ///
    /// # Panics
    ///
    /// Panics if `sorting` exceeds [`MAX_SORT_PRIORITY`].
    pub fn draw_indexed(
        &mut self,
        sorting: u32,
        primitive: PrimitiveType,
        first: u32,
        count: u32,
        states: impl Into<StateChain>,
    ) {
        let states = states.into();
        self.push(
            sorting,
            OpCode::DrawIndexed {
                primitive,
                first,
                count,
                states,
            },
        );
    }

    /// Records a non-indexed draw.
    ///
    /// # Panics
    ///
    /// Panics if `sorting` exceeds [`MAX_SORT_PRIORITY`].
    pub fn draw_primitives(
        &mut self,
        sorting: u32,
        primitive: PrimitiveType,
        first: u32,
        count: u32,
        states: impl Into<StateChain>,
    ) {
        let states = states.into();
        self.push(
            sorting,
            OpCode::DrawPrimitives {
                primitive,
                first,
                count,
                states,
            },
        );
    }

    /// Records the acquisition of a transient render target and returns its slot.
    ///
    /// Slots are handed out sequentially; the pairing with
    /// [`release_texture`](Self::release_texture) is checked at execution time.
    ///
    /// # Panics
    ///
    /// Panics once more than [`STACK_FRAME_SIZE`] textures were acquired.
    pub fn acquire_texture(&mut self, width: u32, height: u32, format: PixelFormat) -> TransientTexture {
        assert!(
            (self.transient_index as usize) < STACK_FRAME_SIZE,
            "too many transient textures acquired by one command buffer (limit {STACK_FRAME_SIZE})"
        );
        self.transient_index += 1;
        let slot = TransientTexture::new(self.transient_index);
        self.push(
            0,
            OpCode::AcquireTransientTexture {
                slot,
                width,
                height,
                format,
            },
        );
        slot
    }

    /// Records the release of a transient render target.
    pub fn release_texture(&mut self, slot: TransientTexture) {
        self.push(0, OpCode::ReleaseTransientTexture { slot });
    }

    /// Records rendering `commands` into `target` (or the back buffer).
    pub fn render_to_target(
        &mut self,
        commands: CommandBufferId,
        target: Option<TransientTexture>,
        viewport: Viewport,
    ) {
        self.push(
            0,
            OpCode::PushRenderTarget {
                target,
                viewport,
                commands,
            },
        );
    }

    /// Records an upload of raw bytes into a constant buffer.
    pub fn upload_constant_buffer(&mut self, handle: ConstantBufferHandle, data: &[u8]) {
        let bytes = self.store(data);
        self.push(0, OpCode::UploadConstantBuffer { handle, bytes });
    }

    /// Records an upload of plain values into a constant buffer.
    pub fn upload_constant_buffer_pod<T: bytemuck::Pod>(
        &mut self,
        handle: ConstantBufferHandle,
        data: &[T],
    ) {
        self.upload_constant_buffer(handle, bytemuck::cast_slice(data));
    }

    /// Records an upload of raw bytes into a vertex buffer.
    pub fn upload_vertex_buffer(&mut self, handle: VertexBufferHandle, data: &[u8]) {
        let bytes = self.store(data);
        self.push(0, OpCode::UploadVertexBuffer { handle, bytes });
    }

    /// Records an upload of plain values into a vertex buffer.
    pub fn upload_vertex_buffer_pod<T: bytemuck::Pod>(
        &mut self,
        handle: VertexBufferHandle,
        data: &[T],
    ) {
        self.upload_vertex_buffer(handle, bytemuck::cast_slice(data));
    }

    /// Records the execution of a nested buffer.
    pub fn execute(&mut self, commands: CommandBufferId) {
        self.push(0, OpCode::Execute { commands });
    }

    /// Advances the sequence number so later draws sort after earlier ones.
    pub fn begin_sequence(&mut self) {
        assert!(self.sequence < u8::MAX, "sequence number overflow");
        self.sequence += 1;
    }

    /// Sorts every maximal run of consecutive draw opcodes by key.
    ///
    /// Other opcodes stay in place and separate runs. Equal priorities keep
    /// their recording order.
    pub fn sort(&mut self) {
        let mut start = 0;
        while start < self.commands.len() {
            if !self.commands[start].op.is_draw() {
                start += 1;
                continue;
            }
            let end = self.commands[start..]
                .iter()
                .position(|c| !c.op.is_draw())
                .map_or(self.commands.len(), |n| start + n);
            self.commands[start..end].sort_by_key(|c| c.key);
            start = end;
        }
    }

    /// Drops every recorded opcode and byte.
    pub fn reset(&mut self) {
        self.commands.clear();
        self.bytes.clear();
        self.transient_index = 0;
        self.sequence = 0;
    }

    /// Returns the recorded commands.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Returns the bytes of an upload.
    pub fn bytes(&self, range: ByteRange) -> &[u8] {
        let start = range.offset as usize;
        &self.bytes[start..start + range.len as usize]
    }

    /// Returns the number of recorded commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Logs every command at debug level.
    pub fn dump(&self, label: &str) {
        log::debug!(
            "{label}: {} commands, {} bytes",
            self.commands.len(),
            self.bytes.len()
        );
        for (i, command) in self.commands.iter().enumerate() {
            log::debug!("  {i:>4} {:?} {:?}", command.key, command.op);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::state::StateBlockId;

    fn block() -> StateBlockId {
        StateBlockId::new(0, 1)
    }

    fn draw_priorities(buffer: &CommandBuffer) -> Vec<(u32, u32)> {
        buffer
            .commands()
            .iter()
            .filter(|c| c.op.is_draw())
            .map(|c| (c.key.priority(), c.key.index()))
            .collect()
    }

    #[test]
    fn test_sort_key_layout() {
        let key = SortKey::new(2, 0xABCDEF, 7);
        assert_eq!(key.bits(), (2u64 << 56) | (0xABCDEFu64 << 32) | 7);
        assert_eq!(key.sequence(), 2);
        assert_eq!(key.priority(), 0xABCDEF);
        assert_eq!(key.index(), 7);
    }

    #[test]
    #[should_panic(expected = "does not fit")]
    fn test_sorting_key_overflow_panics() {
        let mut buffer = CommandBuffer::new();
        buffer.draw_indexed(1 << 24, PrimitiveType::Triangles, 0, 3, block());
    }

    #[test]
    fn test_clear_uses_default_depth_and_stencil() {
        let mut buffer = CommandBuffer::new();
        buffer.clear(LinearRgba::BLACK, ClearMask::ALL);
        assert_eq!(
            buffer.commands()[0].op,
            OpCode::Clear {
                mask: ClearMask::ALL,
                color: LinearRgba::BLACK,
                depth: 1.0,
                stencil: 0
            }
        );
    }

    #[test]
    fn test_sort_is_stable_for_equal_priorities() {
        let mut buffer = CommandBuffer::new();
        for priority in [5, 1, 5, 1] {
            buffer.draw_primitives(priority, PrimitiveType::Points, 0, 1, block());
        }
        buffer.sort();
        assert_eq!(draw_priorities(&buffer), vec![(1, 1), (1, 3), (5, 0), (5, 2)]);
    }

    #[test]
    fn test_sort_treats_other_opcodes_as_barriers() {
        let mut buffer = CommandBuffer::new();
        buffer.draw_primitives(9, PrimitiveType::Points, 0, 1, block());
        buffer.clear(LinearRgba::BLACK, ClearMask::COLOR);
        buffer.draw_primitives(3, PrimitiveType::Points, 0, 1, block());
        buffer.draw_primitives(1, PrimitiveType::Points, 0, 1, block());
        buffer.sort();
        assert!(buffer.commands()[0].op.is_draw());
        assert_eq!(buffer.commands()[0].key.priority(), 9);
        assert!(!buffer.commands()[1].op.is_draw());
        assert_eq!(draw_priorities(&buffer), vec![(9, 0), (1, 3), (3, 2)]);
    }

    #[test]
    fn test_later_sequence_sorts_after_higher_priority() {
        let mut buffer = CommandBuffer::new();
        buffer.draw_primitives(100, PrimitiveType::Points, 0, 1, block());
        buffer.begin_sequence();
        buffer.draw_primitives(0, PrimitiveType::Points, 0, 1, block());
        buffer.sort();
        assert_eq!(draw_priorities(&buffer), vec![(100, 0), (0, 1)]);
    }

    #[test]
    fn test_acquire_hands_out_sequential_slots() {
        let mut buffer = CommandBuffer::new();
        let a = buffer.acquire_texture(64, 64, PixelFormat::Rgba8);
        let b = buffer.acquire_texture(64, 64, PixelFormat::Rgba8);
        assert_eq!((a.slot(), b.slot()), (1, 2));
        buffer.release_texture(b);
        buffer.release_texture(a);
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    #[should_panic(expected = "too many transient textures")]
    fn test_acquire_past_frame_width_panics() {
        let mut buffer = CommandBuffer::new();
        for _ in 0..=STACK_FRAME_SIZE {
            buffer.acquire_texture(1, 1, PixelFormat::R8);
        }
    }

    #[test]
    fn test_uploads_copy_bytes() {
        let mut buffer = CommandBuffer::new();
        buffer.upload_constant_buffer_pod(ConstantBufferHandle::from_raw(1), &[1.0f32, 2.0]);
        buffer.upload_vertex_buffer(VertexBufferHandle::from_raw(1), &[7, 8, 9]);
        let ranges: Vec<ByteRange> = buffer
            .commands()
            .iter()
            .filter_map(|c| match c.op {
                OpCode::UploadConstantBuffer { bytes, .. }
                | OpCode::UploadVertexBuffer { bytes, .. } => Some(bytes),
                _ => None,
            })
            .collect();
        assert_eq!(ranges[0].len(), 8);
        assert_eq!(
            buffer.bytes(ranges[0]),
            bytemuck::cast_slice::<f32, u8>(&[1.0, 2.0])
        );
        assert_eq!(buffer.bytes(ranges[1]), &[7u8, 8, 9][..]);
    }

    #[test]
    fn test_reset_makes_buffer_reusable() {
        let mut buffer = CommandBuffer::new();
        buffer.acquire_texture(4, 4, PixelFormat::Rgba8);
        buffer.upload_vertex_buffer(VertexBufferHandle::from_raw(1), &[1, 2]);
        buffer.begin_sequence();
        buffer.reset();
        assert!(buffer.is_empty());
        assert_eq!(buffer.acquire_texture(4, 4, PixelFormat::Rgba8).slot(), 1);
        assert_eq!(buffer.commands()[0].key.sequence(), 0);
    }
}
