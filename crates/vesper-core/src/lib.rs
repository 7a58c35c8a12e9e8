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

//! # Vesper Core
//!
//! Contracts and plain data of the deferred rendering pipeline: resource
//! handles, pipeline state values and blocks, the feature registry, the
//! command buffer and the render frame, plus the [`RenderDevice`] trait a
//! backend implements.
//!
//! Nothing in this crate talks to a device. Recording is pure data
//! production; execution lives in `vesper-rvm`.
//!
//! [`RenderDevice`]: renderer::traits::RenderDevice

#![warn(missing_docs)]

pub mod math;
pub mod renderer;
pub mod utils;
