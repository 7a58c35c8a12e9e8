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

//! The per-frame container handed to the executor.

use super::command::{CommandBuffer, CommandBufferId};
use super::handle::TransientTexture;
use super::state::{StateBlock, StateBlockId, StateChain, StateStack};
use crate::math::Viewport;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_GENERATION: AtomicU32 = AtomicU32::new(1);

fn next_generation() -> u32 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// Everything recorded for one rendered frame.
///
/// A frame owns an entry-point command buffer, the nested buffers spawned
/// from it, an arena of state blocks and a state stack. Ids handed out by a
/// frame carry its generation; [`clear`](Self::clear) drops everything and
/// moves to a fresh generation, so an id kept across frames is caught as a
/// stale id instead of silently reading another frame's data.
#[derive(Debug)]
pub struct RenderFrame {
    generation: u32,
    buffers: Vec<CommandBuffer>,
    blocks: Vec<StateBlock>,
    state_stack: StateStack,
}

impl Default for RenderFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderFrame {
    /// Creates a frame with an empty entry-point buffer.
    pub fn new() -> Self {
        Self {
            generation: next_generation(),
            buffers: vec![CommandBuffer::new()],
            blocks: Vec::new(),
            state_stack: StateStack::new(),
        }
    }

    /// Returns the generation of this frame's ids.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Returns the id of the entry-point buffer.
    pub fn entry_point(&self) -> CommandBufferId {
        CommandBufferId::new(0, self.generation)
    }

    /// Creates an empty nested buffer.
    pub fn new_command_buffer(&mut self) -> CommandBufferId {
        let index = self.buffers.len() as u32;
        self.buffers.push(CommandBuffer::new());
        CommandBufferId::new(index, self.generation)
    }

    /// Creates a nested buffer rendered into `target` (or the back buffer)
    /// and records it into `parent`. Returns the nested buffer.
    pub fn render_to_target(
        &mut self,
        parent: CommandBufferId,
        target: Option<TransientTexture>,
        viewport: Viewport,
    ) -> CommandBufferId {
        self.check_buffer(parent);
        let nested = self.new_command_buffer();
        self.command_buffer_mut(parent)
            .render_to_target(nested, target, viewport);
        nested
    }

    fn check_buffer(&self, id: CommandBufferId) {
        assert!(
            id.generation() == self.generation,
            "stale command buffer id: generation {} used with frame generation {}",
            id.generation(),
            self.generation
        );
        assert!(
            id.index() < self.buffers.len(),
            "invalid identifier: command buffer {} does not exist",
            id.index()
        );
    }

    /// Returns a buffer.
    ///
    /// # Panics
    ///
    /// Panics on a stale or unknown id.
    pub fn command_buffer(&self, id: CommandBufferId) -> &CommandBuffer {
        self.check_buffer(id);
        &self.buffers[id.index()]
    }

    /// Returns a buffer for recording.
    ///
    /// # Panics
    ///
    /// Panics on a stale or unknown id.
    pub fn command_buffer_mut(&mut self, id: CommandBufferId) -> &mut CommandBuffer {
        self.check_buffer(id);
        &mut self.buffers[id.index()]
    }

    /// Returns the number of buffers, the entry point included.
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Moves a block into the arena.
    pub fn alloc_state_block(&mut self, block: StateBlock) -> StateBlockId {
        let index = self.blocks.len() as u32;
        self.blocks.push(block);
        StateBlockId::new(index, self.generation)
    }

    /// Returns a block of the arena.
    ///
    /// # Panics
    ///
    /// Panics on a stale or unknown id.
    pub fn state_block(&self, id: StateBlockId) -> &StateBlock {
        assert!(
            id.generation() == self.generation,
            "stale state block id: generation {} used with frame generation {}",
            id.generation(),
            self.generation
        );
        self.blocks.get(id.index()).unwrap_or_else(|| {
            panic!(
                "invalid identifier: state block {} does not exist",
                id.index()
            )
        })
    }

    /// Returns the number of blocks in the arena.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the state stack.
    pub fn state_stack(&self) -> &StateStack {
        &self.state_stack
    }

    /// Returns the state stack for pushing and popping.
    pub fn state_stack_mut(&mut self) -> &mut StateStack {
        &mut self.state_stack
    }

    /// Returns a snapshot of the state stack, nearest first.
    pub fn state_chain(&self) -> StateChain {
        self.state_stack.chain()
    }

    /// Pushes a block on the state stack and returns a guard that pops it
    /// when dropped. The guard gives access to the whole frame so recording
    /// can continue inside the scope.
    pub fn push_state_scope(&mut self, id: StateBlockId) -> FrameStateScope<'_> {
        self.state_block(id);
        self.state_stack.push(id);
        FrameStateScope { frame: self }
    }

    /// Drops every buffer, block and stacked state and moves to a new
    /// generation. The entry point is recreated empty.
    pub fn clear(&mut self) {
        self.generation = next_generation();
        self.buffers.clear();
        self.buffers.push(CommandBuffer::new());
        self.blocks.clear();
        self.state_stack.clear();
    }
}

/// A state stack scope over a whole [`RenderFrame`].
#[derive(Debug)]
pub struct FrameStateScope<'a> {
    frame: &'a mut RenderFrame,
}

impl Deref for FrameStateScope<'_> {
    type Target = RenderFrame;
    fn deref(&self) -> &RenderFrame {
        self.frame
    }
}

impl DerefMut for FrameStateScope<'_> {
    fn deref_mut(&mut self) -> &mut RenderFrame {
        self.frame
    }
}

impl Drop for FrameStateScope<'_> {
    fn drop(&mut self) {
        self.frame.state_stack.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::{OpCode, ShaderHandle};

    #[test]
    fn test_new_frame_has_an_empty_entry_point() {
        let frame = RenderFrame::new();
        assert_eq!(frame.buffer_count(), 1);
        assert!(frame.command_buffer(frame.entry_point()).is_empty());
    }

    #[test]
    fn test_render_to_target_records_into_parent() {
        let mut frame = RenderFrame::new();
        let root = frame.entry_point();
        let nested = frame.render_to_target(root, None, Viewport::FULL);
        assert_eq!(frame.buffer_count(), 2);
        assert_eq!(
            frame.command_buffer(root).commands()[0].op,
            OpCode::PushRenderTarget {
                target: None,
                viewport: Viewport::FULL,
                commands: nested
            }
        );
    }

    #[test]
    fn test_scopes_feed_draw_chains() {
        let mut frame = RenderFrame::new();
        let outer = frame.alloc_state_block(StateBlock::new().bind_shader(ShaderHandle::from_raw(1)));
        let inner = frame.alloc_state_block(StateBlock::new());
        {
            let mut scope = frame.push_state_scope(outer);
            let scope = scope.push_state_scope(inner);
            let chain = scope.state_chain();
            assert_eq!(chain.iter().collect::<Vec<_>>(), vec![inner, outer]);
        }
        assert!(frame.state_stack().is_empty());
    }

    #[test]
    #[should_panic(expected = "stale state block id")]
    fn test_ids_do_not_survive_clear() {
        let mut frame = RenderFrame::new();
        let id = frame.alloc_state_block(StateBlock::new());
        frame.clear();
        frame.state_block(id);
    }

    #[test]
    #[should_panic(expected = "stale command buffer id")]
    fn test_buffer_ids_are_bound_to_their_frame() {
        let other = RenderFrame::new();
        let mut frame = RenderFrame::new();
        frame.command_buffer_mut(other.entry_point());
    }

    #[test]
    fn test_frames_can_be_recorded_off_the_device_thread() {
        let mut frame = RenderFrame::new();
        let handle = std::thread::spawn(move || {
            let entry = frame.entry_point();
            frame
                .command_buffer_mut(entry)
                .clear(crate::math::LinearRgba::WHITE, crate::renderer::api::ClearMask::COLOR);
            frame
        });
        let frame = handle.join().unwrap();
        assert_eq!(frame.command_buffer(frame.entry_point()).len(), 1);
    }
}
