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

//! The intermediate target stack.
//!
//! Every executed command buffer pushes one stack frame of
//! [`STACK_FRAME_SIZE`] transient slots. Acquire and release opcodes fill
//! and empty the slots of the active frame; texture states with a negative
//! id sample from them.

use crate::registry::ResourceRegistry;
use vesper_core::renderer::{
    PixelFormat, RenderDevice, RenderTargetDescriptor, RenderTargetHandle, ResourceError,
    TransientTexture, STACK_FRAME_SIZE,
};

/// A bounded stack of transient render-target slots.
#[derive(Debug)]
pub struct IntermediateTargetStack {
    slots: Vec<Option<RenderTargetHandle>>,
    max_frames: usize,
    depth: usize,
}

impl IntermediateTargetStack {
    /// Creates a stack holding at most `max_frames` frames.
    pub fn new(max_frames: usize) -> Self {
        assert!(max_frames > 0, "intermediate target stack needs at least one frame");
        Self {
            slots: vec![None; max_frames * STACK_FRAME_SIZE],
            max_frames,
            depth: 0,
        }
    }

    /// Returns the number of pushed frames.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the maximum number of frames.
    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    /// Pushes an empty stack frame.
    ///
    /// # Panics
    ///
    /// Panics when `max_frames` frames are already pushed.
    pub fn push_frame(&mut self) {
        assert!(
            self.depth < self.max_frames,
            "intermediate target stack overflow: at most {} nested stack frames",
            self.max_frames
        );
        self.depth += 1;
    }

    /// Pops the active stack frame and returns the targets it still held.
    ///
    /// Every returned target was never released by its buffer and is
    /// reported as a warning. The caller decides when to hand them back to
    /// the registry.
    ///
    /// # Panics
    ///
    /// Panics on an empty stack.
    pub fn pop_frame(&mut self) -> Vec<RenderTargetHandle> {
        assert!(self.depth > 0, "intermediate target stack underflow");
        let start = (self.depth - 1) * STACK_FRAME_SIZE;
        let mut leaked = Vec::new();
        for (i, slot) in self.slots[start..start + STACK_FRAME_SIZE].iter_mut().enumerate() {
            if let Some(handle) = slot.take() {
                log::warn!(
                    "An intermediate render target was not released before popping a stack frame (slot {}, target {})",
                    i + 1,
                    handle.raw()
                );
                leaked.push(handle);
            }
        }
        self.depth -= 1;
        leaked
    }

    fn index(&self, slot: TransientTexture) -> usize {
        assert!(
            self.depth > 0,
            "transient slot {} used outside of a stack frame",
            slot.slot()
        );
        (self.depth - 1) * STACK_FRAME_SIZE + slot.slot() as usize - 1
    }

    /// Acquires a render target from `registry` into `slot` of the active frame.
    pub fn acquire<D: RenderDevice + ?Sized>(
        &mut self,
        registry: &mut ResourceRegistry,
        device: &mut D,
        slot: TransientTexture,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<RenderTargetHandle, ResourceError> {
        let index = self.index(slot);
        if let Some(previous) = self.slots[index].take() {
            log::warn!(
                "Transient slot {} acquired while still holding target {}; releasing it",
                slot.slot(),
                previous.raw()
            );
            registry.release_render_target(previous);
        }
        let handle = registry.acquire_render_target(
            device,
            RenderTargetDescriptor::color(width, height, format),
        )?;
        self.slots[index] = Some(handle);
        Ok(handle)
    }

    /// Returns the target in `slot` of the active frame to `registry`.
    ///
    /// # Panics
    ///
    /// Panics if the slot holds no target.
    pub fn release(&mut self, registry: &mut ResourceRegistry, slot: TransientTexture) {
        let index = self.index(slot);
        let handle = self.slots[index].take().unwrap_or_else(|| {
            panic!("transient slot {} released without being acquired", slot.slot())
        });
        registry.release_render_target(handle);
    }

    /// Returns the target in `slot` of the active frame.
    ///
    /// # Panics
    ///
    /// Panics if the slot holds no target.
    pub fn get(&self, slot: TransientTexture) -> RenderTargetHandle {
        self.slots[self.index(slot)].unwrap_or_else(|| {
            panic!("transient slot {} holds no render target", slot.slot())
        })
    }

    /// Pops every frame and returns all targets still held, without warnings.
    pub fn unwind(&mut self) -> Vec<RenderTargetHandle> {
        self.depth = 0;
        self.slots.iter_mut().filter_map(Option::take).collect()
    }
}
