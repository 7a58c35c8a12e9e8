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

//! Defines vertex formats.

use super::feature::PipelineFeatures;
use crate::vesper_bitflags;

vesper_bitflags! {
    /// The attributes present in an interleaved vertex stream.
    ///
    /// Each attribute maps to one bit of the vertex-attribute range of
    /// [`PipelineFeatures`], so binding an input layout lets a shader
    /// permutation react to the attributes it provides.
    pub struct VertexFormat: u8 {
        /// Three `f32` position components.
        const POSITION = 1 << 0;
        /// Three `f32` normal components.
        const NORMAL = 1 << 1;
        /// Four `u8` color components.
        const COLOR = 1 << 2;
        /// Two `f32` primary texture coordinates.
        const UV0 = 1 << 3;
        /// Two `f32` secondary texture coordinates.
        const UV1 = 1 << 4;
        /// Three `f32` tangent components.
        const TANGENT = 1 << 5;
        /// Three `f32` bitangent components.
        const BITANGENT = 1 << 6;
        /// One `f32` point size.
        const POINT_SIZE = 1 << 7;
    }
}

impl VertexFormat {
    /// Returns the size of one interleaved vertex in bytes.
    pub fn stride(&self) -> u32 {
        const SIZES: [(VertexFormat, u32); 8] = [
            (VertexFormat::POSITION, 12),
            (VertexFormat::NORMAL, 12),
            (VertexFormat::COLOR, 4),
            (VertexFormat::UV0, 8),
            (VertexFormat::UV1, 8),
            (VertexFormat::TANGENT, 12),
            (VertexFormat::BITANGENT, 12),
            (VertexFormat::POINT_SIZE, 4),
        ];
        SIZES
            .iter()
            .filter(|(attr, _)| self.contains(*attr))
            .map(|(_, size)| size)
            .sum()
    }

    /// Returns the vertex-attribute pipeline features of this format.
    pub fn features(&self) -> PipelineFeatures {
        PipelineFeatures::vertex(self.bits())
    }
}
