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

//! Defines the error types of the rendering pipeline.
//!
//! Programmer errors (unbalanced stacks, invalid handles, draws without a
//! shader) are fatal assertions and never show up here. These types cover
//! what a device backend may legitimately refuse at run time.

use super::api::PipelineFeatures;
use thiserror::Error;

/// An error related to the creation or update of a device resource.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The backend could not create a resource.
    #[error("backend failed to create {kind}: {details}")]
    CreationFailed {
        /// The kind of resource, e.g. `"vertex buffer"`.
        kind: &'static str,
        /// The backend's description of the failure.
        details: String,
    },
    /// A write went past the end of a buffer.
    #[error("write of {len} bytes at offset {offset} exceeds a buffer of {size} bytes")]
    OutOfBounds {
        /// The write offset.
        offset: u64,
        /// The number of bytes written.
        len: usize,
        /// The size of the buffer.
        size: u64,
    },
    /// An error originating from the specific backend implementation.
    #[error("backend-specific resource error: {0}")]
    Backend(String),
}

/// An error related to compiling an ubershader permutation.
#[derive(Debug, Error)]
pub enum ShaderError {
    /// The backend rejected the permutation sources.
    #[error("shader compilation failed for '{label}' with {features:?}: {details}")]
    CompilationFailed {
        /// The label of the ubershader.
        label: String,
        /// The features of the permutation.
        features: PipelineFeatures,
        /// Detailed messages from the compiler.
        details: String,
    },
}

/// A top-level error of the execution surface.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A resource could not be created or written.
    #[error(transparent)]
    Resource(#[from] ResourceError),
    /// A shader permutation could not be compiled.
    #[error(transparent)]
    Shader(#[from] ShaderError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_wraps_sources() {
        let err: RenderError = ResourceError::Backend("device lost".into()).into();
        assert_eq!(err.to_string(), "backend-specific resource error: device lost");

        let err: RenderError = ShaderError::CompilationFailed {
            label: "pink".into(),
            features: PipelineFeatures::user(1),
            details: "syntax error".into(),
        }
        .into();
        assert!(matches!(err, RenderError::Shader(_)));
        assert!(err.to_string().contains("'pink'"));
    }
}
