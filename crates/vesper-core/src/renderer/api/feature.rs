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

//! Pipeline feature bitmasks, the feature registry and feature layouts.
//!
//! A [`PipelineFeatures`] value selects one permutation of an ubershader.
//! The 64 bits are split into reserved ranges:
//!
//! | bits    | meaning                                   |
//! |---------|-------------------------------------------|
//! | 0..8    | vertex attributes of the bound layout      |
//! | 8..16   | constant buffer slots bound by the chain   |
//! | 16..24  | texture samplers bound by the chain        |
//! | 24..64  | user features declared by state blocks     |
//!
//! User feature bits are handed out by a [`FeatureRegistry`], which also
//! names them for the `#define` prefix of a permutation.

use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// The first bit of the constant-buffer range.
pub const CBUFFER_FEATURES_OFFSET: u32 = 8;
/// The first bit of the texture-sampler range.
pub const SAMPLER_FEATURES_OFFSET: u32 = 16;
/// The first bit of the user-defined range.
pub const USER_FEATURES_OFFSET: u32 = 24;
/// The number of user-defined feature bits.
pub const MAX_USER_FEATURES: u32 = 64 - USER_FEATURES_OFFSET;

/// A set of pipeline features.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PipelineFeatures(u64);

impl PipelineFeatures {
    /// No features.
    pub const EMPTY: Self = Self(0);
    /// Every feature bit.
    pub const ALL: Self = Self(u64::MAX);

    /// Creates a feature set from raw bits.
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Returns `true` if no feature is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Vertex-attribute features from a vertex format's raw bits.
    pub const fn vertex(attributes: u8) -> Self {
        Self(attributes as u64)
    }

    /// The feature bit of a bound constant buffer slot.
    pub fn constant_buffer(slot: u8) -> Self {
        assert!(slot < 8, "constant buffer slot {slot} is out of range");
        Self(1 << (slot as u32 + CBUFFER_FEATURES_OFFSET))
    }

    /// The feature bit of a bound texture sampler.
    pub fn sampler(sampler: u8) -> Self {
        assert!(sampler < 8, "sampler {sampler} is out of range");
        Self(1 << (sampler as u32 + SAMPLER_FEATURES_OFFSET))
    }

    /// Shifts unshifted user bits into the user range.
    pub const fn user(bits: u64) -> Self {
        Self(bits << USER_FEATURES_OFFSET)
    }

    /// Returns the user range shifted down to bit 0.
    pub const fn user_bits(self) -> u64 {
        self.0 >> USER_FEATURES_OFFSET
    }

    /// Returns `true` if every feature of `other` is in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if `self` and `other` share a feature.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl std::fmt::Debug for PipelineFeatures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PipelineFeatures({:#x})", self.0)
    }
}

impl BitOr for PipelineFeatures {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PipelineFeatures {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for PipelineFeatures {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for PipelineFeatures {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for PipelineFeatures {
    type Output = Self;
    fn not(self) -> Self {
        Self(!self.0)
    }
}

/// Allocates user feature bits by name.
///
/// Created once by the application, used to build the [`FeatureLayout`] of
/// every ubershader and then handed to the executor so it can name the
/// features of the permutations it compiles.
#[derive(Debug, Clone, Default)]
pub struct FeatureRegistry {
    names: Vec<String>,
}

impl FeatureRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user feature and returns its bit, shifted into the user
    /// range. Registering a name twice returns the same bit.
    ///
    /// # Panics
    ///
    /// Panics once all [`MAX_USER_FEATURES`] bits are taken.
    pub fn register(&mut self, name: &str) -> PipelineFeatures {
        if let Some(existing) = self.get(name) {
            return existing;
        }
        let bit = self.names.len() as u32;
        assert!(
            bit < MAX_USER_FEATURES,
            "cannot register feature '{name}': all {MAX_USER_FEATURES} user feature bits are taken"
        );
        self.names.push(name.to_owned());
        PipelineFeatures::user(1 << bit)
    }

    /// Returns the bit of a registered feature.
    pub fn get(&self, name: &str) -> Option<PipelineFeatures> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|bit| PipelineFeatures::user(1 << bit))
    }

    /// Returns the number of registered features.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if no feature is registered.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns the names of the registered user features present in `features`.
    pub fn names_of(&self, features: PipelineFeatures) -> Vec<&str> {
        let user = features.user_bits();
        self.names
            .iter()
            .enumerate()
            .filter(|(bit, _)| user & (1 << bit) != 0)
            .map(|(_, name)| name.as_str())
            .collect()
    }

    /// Builds a layout declaring every registered user feature.
    pub fn layout(&self) -> FeatureLayout {
        let mut layout = FeatureLayout::new();
        for (bit, name) in self.names.iter().enumerate() {
            layout = layout.with(name, PipelineFeatures::user(1 << bit));
        }
        layout
    }
}

/// The options an ubershader understands: each entry maps a preprocessor
/// name to the feature mask that enables it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureLayout {
    entries: Vec<(String, PipelineFeatures)>,
}

impl FeatureLayout {
    /// Creates an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an option enabled by any feature of `mask`.
    #[must_use]
    pub fn with(mut self, name: &str, mask: PipelineFeatures) -> Self {
        self.entries.push((name.to_owned(), mask));
        self
    }

    /// Iterates over `(name, mask)` entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, PipelineFeatures)> {
        self.entries.iter().map(|(name, mask)| (name.as_str(), *mask))
    }

    /// Returns the union of every option mask.
    pub fn mask(&self) -> PipelineFeatures {
        self.entries
            .iter()
            .fold(PipelineFeatures::EMPTY, |acc, (_, mask)| acc | *mask)
    }
}
