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

//! Provides the backend-agnostic contracts of the deferred rendering pipeline.
//!
//! This module defines the "common language" shared by producers and the
//! executor: handle types, state values and blocks, pipeline features,
//! opcodes, command buffers and frames (in [`api`]), the [`RenderDevice`]
//! trait a backend implements (in [`traits`]) and the error types.
//!
//! Recording code only ever touches data defined here. The executor in
//! `vesper-rvm` turns that data into [`RenderDevice`] calls, and a concrete
//! backend such as the trace device in `vesper-infra` implements them.

pub mod api;
pub mod error;
pub mod traits;

pub use self::api::*;
pub use self::error::{RenderError, ResourceError, ShaderError};
pub use self::traits::RenderDevice;
