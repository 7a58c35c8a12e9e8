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

//! Ubershader descriptions.
//!
//! An [`Ubershader`] is one shader source compiled into many permutations.
//! Each permutation is selected by a [`PipelineFeatures`] value and built by
//! prefixing both stages with a `#define` line for every layout option the
//! features enable.

use super::feature::{FeatureLayout, PipelineFeatures};

/// A single shader source and the options it can be specialised with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ubershader {
    label: String,
    vertex: String,
    fragment: String,
    layout: FeatureLayout,
}

/// The preprocessed sources of one permutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermutationSource {
    /// The vertex stage.
    pub vertex: String,
    /// The fragment stage.
    pub fragment: String,
    /// The options defined for this permutation, in layout order.
    pub defines: Vec<String>,
}

impl Ubershader {
    /// Creates an ubershader from its stage sources and option layout.
    pub fn new(
        label: impl Into<String>,
        vertex: impl Into<String>,
        fragment: impl Into<String>,
        layout: FeatureLayout,
    ) -> Self {
        Self {
            label: label.into(),
            vertex: vertex.into(),
            fragment: fragment.into(),
            layout,
        }
    }

    /// Returns the debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the option layout.
    pub fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    /// Returns every feature some option of this shader reacts to.
    pub fn supported_features(&self) -> PipelineFeatures {
        self.layout.mask()
    }

    /// Builds the sources of the permutation selected by `features`.
    ///
    /// Features the shader does not support are ignored.
    pub fn permutation_source(&self, features: PipelineFeatures) -> PermutationSource {
        let defines: Vec<String> = self
            .layout
            .iter()
            .filter(|(_, mask)| mask.intersects(features))
            .map(|(name, _)| name.to_owned())
            .collect();

        let mut prefix = String::new();
        for name in &defines {
            prefix.push_str("#define ");
            prefix.push_str(name);
            prefix.push('\n');
        }

        PermutationSource {
            vertex: format!("{prefix}{}", self.vertex),
            fragment: format!("{prefix}{}", self.fragment),
            defines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pink_shader() -> Ubershader {
        let layout = FeatureLayout::new()
            .with("F_Pink", PipelineFeatures::user(1))
            .with("F_Diffuse", PipelineFeatures::sampler(0));
        Ubershader::new(
            "pink",
            "void main() {}",
            "#if defined(F_Pink)\npink();\n#endif",
            layout,
        )
    }

    #[test]
    fn test_supported_features_is_layout_union() {
        let shader = pink_shader();
        assert_eq!(
            shader.supported_features(),
            PipelineFeatures::user(1) | PipelineFeatures::sampler(0)
        );
    }

    #[test]
    fn test_permutation_prefixes_enabled_defines() {
        let shader = pink_shader();
        let source = shader.permutation_source(PipelineFeatures::user(1));
        assert_eq!(source.defines, vec!["F_Pink".to_owned()]);
        assert!(source.vertex.starts_with("#define F_Pink\nvoid main"));
        assert!(source.fragment.starts_with("#define F_Pink\n#if defined(F_Pink)"));
    }

    #[test]
    fn test_base_permutation_has_no_defines() {
        let shader = pink_shader();
        let source = shader.permutation_source(PipelineFeatures::EMPTY);
        assert!(source.defines.is_empty());
        assert_eq!(source.vertex, "void main() {}");
    }
}
