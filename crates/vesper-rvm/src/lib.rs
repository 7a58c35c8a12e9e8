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

//! # Vesper RVM
//!
//! The render virtual machine replays a recorded [`RenderFrame`] against a
//! [`RenderDevice`]. It owns the [`ResourceRegistry`] that maps handles to
//! device objects, the [`IntermediateTargetStack`] of transient render
//! targets, and the [`PermutationCache`] of compiled ubershader variants.
//!
//! [`RenderFrame`]: vesper_core::renderer::RenderFrame
//! [`RenderDevice`]: vesper_core::renderer::RenderDevice

pub mod permutation;
pub mod registry;
pub mod rvm;
pub mod settings;
pub mod stats;
pub mod target_stack;

pub use self::permutation::{PermutationCache, PermutationLookup};
pub use self::registry::ResourceRegistry;
pub use self::rvm::Rvm;
pub use self::settings::{BaselineState, RvmSettings, SettingsError};
pub use self::stats::FrameStats;
pub use self::target_stack::IntermediateTargetStack;
