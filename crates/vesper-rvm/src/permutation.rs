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

//! Compiled ubershader permutations.

use ahash::AHashMap;
use vesper_core::renderer::{
    FeatureRegistry, PipelineFeatures, ProgramDescriptor, ProgramId, RenderDevice, ShaderError,
    ShaderHandle, Ubershader,
};

/// The result of a permutation lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermutationLookup {
    /// The program of the permutation.
    pub program: ProgramId,
    /// The features the permutation was selected for, after masking.
    pub features: PipelineFeatures,
    /// `true` if the lookup compiled the program.
    pub compiled: bool,
}

/// Compiled programs keyed by shader and feature set.
#[derive(Debug, Default)]
pub struct PermutationCache {
    programs: AHashMap<(ShaderHandle, PipelineFeatures), ProgramId>,
}

impl PermutationCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the program of `shader` for `features`, compiling it on first use.
    ///
    /// Features the shader does not support are dropped before the lookup,
    /// so requests differing only in unsupported bits share one program.
    pub fn get_or_compile<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        handle: ShaderHandle,
        shader: &Ubershader,
        features: PipelineFeatures,
        names: &FeatureRegistry,
    ) -> Result<PermutationLookup, ShaderError> {
        let features = features & shader.supported_features();
        if let Some(program) = self.programs.get(&(handle, features)) {
            return Ok(PermutationLookup {
                program: *program,
                features,
                compiled: false,
            });
        }

        let source = shader.permutation_source(features);
        let program = device.compile_program(&ProgramDescriptor {
            label: shader.label(),
            vertex: &source.vertex,
            fragment: &source.fragment,
            features,
        })?;
        log::debug!(
            "Compiled permutation of '{}' for {:?} (defines: [{}], user features: [{}])",
            shader.label(),
            features,
            source.defines.join(", "),
            names.names_of(features).join(", ")
        );
        self.programs.insert((handle, features), program);
        Ok(PermutationLookup {
            program,
            features,
            compiled: true,
        })
    }

    /// Returns the number of compiled programs.
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Returns `true` if nothing was compiled yet.
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}
