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

//! Defines device-side resource ids and the descriptors used to create them.
//!
//! Ids in this module are returned by a [`RenderDevice`] and are only
//! meaningful to the backend that produced them. Recording code never sees
//! them: it works with the registry handles from [`handle`](super::handle).
//!
//! [`RenderDevice`]: crate::renderer::traits::RenderDevice

use super::common::PixelFormat;
use super::feature::PipelineFeatures;
use crate::math::Extent2D;

/// An opaque id of a device buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub usize);

/// An opaque id of a device input layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputLayoutId(pub usize);

/// An opaque id of a device texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub usize);

/// An opaque id of a device render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetId(pub usize);

/// An opaque id of a compiled shader program (one ubershader permutation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub usize);

/// How a device buffer is bound by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Bound as a vertex stream.
    Vertex,
    /// Bound as 16-bit indices.
    Index,
    /// Bound to a constant buffer slot.
    Constant,
}

/// A descriptor used to create a [`BufferId`].
#[derive(Debug, Clone)]
pub struct BufferDescriptor<'a> {
    /// How the buffer is bound.
    pub usage: BufferUsage,
    /// The size of the buffer in bytes.
    pub size: u64,
    /// Initial contents, if any. Must be `size` bytes long when present.
    pub contents: Option<&'a [u8]>,
}

/// A descriptor used to create a [`TextureId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    /// The size of the texture in pixels.
    pub size: Extent2D,
    /// The pixel format.
    pub format: PixelFormat,
}

impl TextureDescriptor {
    /// Returns the number of bytes of a tightly packed image of this texture.
    pub fn byte_size(&self) -> usize {
        self.size.width as usize * self.size.height as usize * self.format.bytes_per_pixel() as usize
    }
}

/// A texture description together with its pixels, ready to be interned by
/// the resource registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureData {
    /// The texture description.
    pub descriptor: TextureDescriptor,
    /// Tightly packed pixels, row by row.
    pub pixels: Vec<u8>,
}

/// A descriptor used to create a render target.
///
/// Descriptors compare by value so the registry can recycle released
/// transient targets with an identical layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetDescriptor {
    /// The size of every attachment in pixels.
    pub size: Extent2D,
    /// The format of the color attachments.
    pub color_format: PixelFormat,
    /// The number of color attachments.
    pub color_attachments: u8,
    /// The format of the depth attachment, if any.
    pub depth_format: Option<PixelFormat>,
}

impl RenderTargetDescriptor {
    /// Creates a descriptor with a single color attachment and no depth.
    pub const fn color(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            size: Extent2D::new(width, height),
            color_format: format,
            color_attachments: 1,
            depth_format: None,
        }
    }
}

/// A render target created by a device, with its attachments exposed as
/// sampleable textures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRenderTarget {
    /// The id used to bind the target.
    pub id: RenderTargetId,
    /// The size of the target in pixels.
    pub size: Extent2D,
    /// The color attachments, in order.
    pub attachments: Vec<TextureId>,
}

impl DeviceRenderTarget {
    /// Returns the attachment texture at `index`, if it exists.
    pub fn attachment(&self, index: usize) -> Option<TextureId> {
        self.attachments.get(index).copied()
    }
}

/// A descriptor used to compile one ubershader permutation into a program.
#[derive(Debug, Clone)]
pub struct ProgramDescriptor<'a> {
    /// The debug label of the ubershader.
    pub label: &'a str,
    /// Vertex stage source with the permutation defines prepended.
    pub vertex: &'a str,
    /// Fragment stage source with the permutation defines prepended.
    pub fragment: &'a str,
    /// The feature set this permutation was built for.
    pub features: PipelineFeatures,
}
