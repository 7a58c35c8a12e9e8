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

//! Backend-agnostic pipeline data.
//!
//! - **[`common`]**: Small enums shared by states and device calls.
//! - **[`handle`]**: Persistent and transient resource handles.
//! - **[`resource`]**: Device-side ids and creation descriptors.
//! - **[`vertex`]**: Vertex formats.
//! - **[`feature`]**: Pipeline feature bitmasks and the feature registry.
//! - **[`shader`]**: Ubershader descriptions and permutation sources.
//! - **[`state`]**: State values, state blocks and the state stack.
//! - **[`command`]**: Opcodes, sorting keys and the command buffer.
//! - **[`frame`]**: The per-frame container handed to the executor.

pub mod command;
pub mod common;
pub mod feature;
pub mod frame;
pub mod handle;
pub mod resource;
pub mod shader;
pub mod state;
pub mod vertex;

pub use self::command::*;
pub use self::common::*;
pub use self::feature::*;
pub use self::frame::*;
pub use self::handle::*;
pub use self::resource::*;
pub use self::shader::*;
pub use self::state::*;
pub use self::vertex::*;
