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

//! Defines common enums used by pipeline state values and device calls.

use crate::vesper_bitflags;
use serde::Deserialize;

/// The way vertices are assembled into primitives by a draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// Every vertex is a point.
    Points,
    /// Every pair of vertices is a separate line.
    Lines,
    /// Consecutive vertices form a connected line.
    LineStrip,
    /// Every three vertices form a separate triangle.
    Triangles,
    /// Each vertex after the first two forms a triangle with the previous two.
    TriangleStrip,
}

/// A comparison function used by the depth and alpha tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum CompareFunction {
    /// The test is disabled.
    #[default]
    Disabled,
    /// The test never passes.
    Never,
    /// Passes if the incoming value is less than the stored value.
    Less,
    /// Passes if the values are equal.
    Equal,
    /// Passes if the incoming value is less than or equal to the stored value.
    LessEqual,
    /// Passes if the incoming value is greater than the stored value.
    Greater,
    /// Passes if the values differ.
    NotEqual,
    /// Passes if the incoming value is greater than or equal to the stored value.
    GreaterEqual,
    /// The test always passes.
    Always,
}

/// A factor applied to the source or destination color when blending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    /// `0.0`
    Zero,
    /// `1.0`
    One,
    /// The source color.
    SrcColor,
    /// `1.0 - source color`.
    OneMinusSrcColor,
    /// The source alpha.
    SrcAlpha,
    /// `1.0 - source alpha`.
    OneMinusSrcAlpha,
    /// The destination color.
    DstColor,
    /// `1.0 - destination color`.
    OneMinusDstColor,
    /// The destination alpha.
    DstAlpha,
    /// `1.0 - destination alpha`.
    OneMinusDstAlpha,
}

/// Which triangle faces are culled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum TriangleFace {
    /// Nothing is culled.
    None,
    /// Back faces are culled.
    #[default]
    Back,
    /// Front faces are culled.
    Front,
    /// Both faces are culled.
    FrontAndBack,
}

/// How polygons are rasterized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum PolygonMode {
    /// Polygons are filled.
    #[default]
    Fill,
    /// Only polygon edges are drawn.
    Wireframe,
}

/// The memory layout of a texture or render-target attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Single 8-bit channel.
    R8,
    /// Four 8-bit channels.
    Rgba8,
    /// Four 16-bit float channels.
    Rgba16F,
    /// Four 32-bit float channels.
    Rgba32F,
    /// 24-bit depth.
    Depth24,
    /// 24-bit depth with an 8-bit stencil.
    Depth24Stencil8,
}

impl PixelFormat {
    /// Returns the size of a single pixel in bytes.
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::R8 => 1,
            PixelFormat::Rgba8 | PixelFormat::Depth24 | PixelFormat::Depth24Stencil8 => 4,
            PixelFormat::Rgba16F => 8,
            PixelFormat::Rgba32F => 16,
        }
    }

    /// Returns `true` for depth and depth-stencil formats.
    pub const fn is_depth(self) -> bool {
        matches!(self, PixelFormat::Depth24 | PixelFormat::Depth24Stencil8)
    }
}

vesper_bitflags! {
    /// The planes of the bound render target written by a clear.
    pub struct ClearMask: u8 {
        /// The color attachments.
        const COLOR = 1 << 0;
        /// The depth attachment.
        const DEPTH = 1 << 1;
        /// The stencil attachment.
        const STENCIL = 1 << 2;
        /// Every plane.
        const ALL = Self::COLOR.bits() | Self::DEPTH.bits() | Self::STENCIL.bits();
    }
}
