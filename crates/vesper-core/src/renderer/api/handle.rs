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

//! Defines the handle types referring to pipeline resources.
//!
//! Persistent handles are 1-based indices into a resource registry pool.
//! The raw value `0` is reserved as the invalid handle, which is also the
//! `Default`. Transient textures are small slot indices local to one frame of
//! the intermediate target stack.

macro_rules! persistent_handle {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(u32);

        impl $name {
            /// The reserved invalid handle.
            pub const INVALID: Self = Self(0);

            /// Creates a handle from its raw 1-based value.
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            /// Creates the handle referring to the pool slot at `index`.
            pub fn from_index(index: usize) -> Self {
                let raw = u32::try_from(index + 1).unwrap_or_else(|_| {
                    panic!("{} pool exhausted at index {}", stringify!($name), index)
                });
                Self(raw)
            }

            /// Returns the raw 1-based value.
            pub const fn raw(self) -> u32 {
                self.0
            }

            /// Returns `true` unless this is the invalid handle.
            pub const fn is_valid(self) -> bool {
                self.0 != 0
            }

            /// Returns the pool index this handle refers to.
            ///
            /// # Panics
            ///
            /// Panics on the invalid handle.
            pub fn index(self) -> usize {
                assert!(
                    self.is_valid(),
                    "invalid identifier: {} 0 does not refer to a resource",
                    stringify!($name)
                );
                (self.0 - 1) as usize
            }
        }
    };
}

persistent_handle!(
    /// A handle to a vertex buffer owned by the resource registry.
    VertexBufferHandle
);
persistent_handle!(
    /// A handle to an index buffer owned by the resource registry.
    IndexBufferHandle
);
persistent_handle!(
    /// A handle to a constant buffer owned by the resource registry.
    ConstantBufferHandle
);
persistent_handle!(
    /// A handle to an input layout owned by the resource registry.
    InputLayoutHandle
);
persistent_handle!(
    /// A handle to a texture owned by the resource registry.
    TextureHandle
);
persistent_handle!(
    /// A handle to an ubershader interned by the resource registry.
    ShaderHandle
);
persistent_handle!(
    /// A handle to a render target owned by the resource registry.
    RenderTargetHandle
);

/// The number of transient slots in one intermediate stack frame.
pub const STACK_FRAME_SIZE: usize = 8;

/// A transient texture slot, valid between its acquire and release opcodes
/// within a single stack frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransientTexture(u8);

impl TransientTexture {
    /// Creates a transient texture id from its 1-based slot.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is zero or exceeds [`STACK_FRAME_SIZE`].
    pub fn new(slot: u8) -> Self {
        assert!(
            slot > 0 && slot as usize <= STACK_FRAME_SIZE,
            "transient slot {slot} is out of range 1..={STACK_FRAME_SIZE}"
        );
        Self(slot)
    }

    /// Returns the 1-based slot.
    pub const fn slot(self) -> u8 {
        self.0
    }
}
