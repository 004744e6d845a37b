//! # Fragment Stage Registry
//!
//! Maps permanent stage IDs to [`FragmentStage`]s. A registry is assembled
//! with [`StageRegistryBuilder`] and then frozen; the frozen registry is only
//! ever read, so recording threads share it without locking.
//!
//! ## ID ranges
//!
//! ```text
//! 0 .. FIRST_FIXED_BLEND_STAGE_ID          built-in stages
//! FIRST_FIXED_BLEND_STAGE_ID ..= last      one fixed blend stage per blend mode
//! FIRST_CUSTOM_STAGE_ID ..                 custom stages
//! ```
//!
//! The fixed blend range is derived from the blend mode count, so adding a
//! blend mode extends it with no edits here.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use thiserror::Error;

use super::blend::{BlendMode, BlendModeSet};
use super::builtin_stages::{builtin_stages, fixed_blend_stage, mipmap_blur_stage, MIPMAP_BLUR_STAGE_ID};
use super::fragment_stage::FragmentStage;

/// ID of the fixed blend stage for blend mode ordinal 0
pub const FIRST_FIXED_BLEND_STAGE_ID: u32 = 29;

/// First ID available to stages outside the built-in table
pub const FIRST_CUSTOM_STAGE_ID: u32 = 128;

/// Fixed blend stage ID for `mode`
pub fn fixed_blend_stage_id<B: BlendModeSet>(mode: B) -> u32 {
    FIRST_FIXED_BLEND_STAGE_ID + mode.ordinal() as u32
}

/// Last fixed blend stage ID for the blend mode set `B`
pub fn last_fixed_blend_stage_id<B: BlendModeSet>() -> u32 {
    FIRST_FIXED_BLEND_STAGE_ID + B::COUNT as u32 - 1
}

/// Number of IDs below the custom range that `B` occupies
pub fn builtin_stage_id_count<B: BlendModeSet>() -> u32 {
    last_fixed_blend_stage_id::<B>() + 1
}

/// Registry construction failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Two stages claimed the same ID
    #[error("Stage ID {0} registered twice")]
    DuplicateStageId(u32),

    /// A non-blend stage was registered inside the fixed blend range
    #[error("Stage ID {id} lies in the fixed blend range {first}..={last}")]
    ReservedStageId {
        /// Offending ID
        id: u32,
        /// First fixed blend ID
        first: u32,
        /// Last fixed blend ID
        last: u32,
    },

    /// The fixed blend range ran into the custom stage range
    #[error("Fixed blend stages end at {last}, overlapping custom stages from {first_custom}")]
    FixedBlendOverflow {
        /// Last fixed blend ID
        last: u32,
        /// First custom stage ID
        first_custom: u32,
    },
}

/// Open registry: stages may still be added
#[derive(Debug, Default)]
pub struct StageRegistryBuilder {
    stages: BTreeMap<u32, FragmentStage>,
    fixed_blend_range: Option<(u32, u32)>,
}

impl StageRegistryBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `stage` under `id`
    pub fn register(&mut self, id: u32, stage: FragmentStage) -> Result<&mut Self, RegistryError> {
        if let Some((first, last)) = self.fixed_blend_range {
            if (first..=last).contains(&id) {
                return Err(RegistryError::ReservedStageId { id, first, last });
            }
        }
        self.insert(id, stage)?;
        Ok(self)
    }

    fn insert(&mut self, id: u32, stage: FragmentStage) -> Result<(), RegistryError> {
        if self.stages.contains_key(&id) {
            return Err(RegistryError::DuplicateStageId(id));
        }
        log::trace!("[STAGE_REGISTRY] Registered {} as {}", stage.name, id);
        self.stages.insert(id, stage);
        Ok(())
    }

    /// Add the built-in stage table
    pub fn with_builtin_stages(mut self) -> Result<Self, RegistryError> {
        for (id, stage) in builtin_stages() {
            self.register(id, stage)?;
        }
        Ok(self)
    }

    /// Add one fixed blend stage per mode of `B`
    pub fn with_fixed_blend_stages<B: BlendModeSet>(mut self) -> Result<Self, RegistryError> {
        let first = FIRST_FIXED_BLEND_STAGE_ID;
        let last = last_fixed_blend_stage_id::<B>();
        if last >= FIRST_CUSTOM_STAGE_ID {
            return Err(RegistryError::FixedBlendOverflow {
                last,
                first_custom: FIRST_CUSTOM_STAGE_ID,
            });
        }
        if let Some((&id, _)) = self.stages.range(first..=last).next() {
            return Err(RegistryError::ReservedStageId { id, first, last });
        }

        for mode in (0..B::COUNT).filter_map(B::from_ordinal) {
            self.insert(fixed_blend_stage_id(mode), fixed_blend_stage(mode))?;
        }
        self.fixed_blend_range = Some((first, last));
        Ok(self)
    }

    /// Freeze the registry
    pub fn build(self) -> StageRegistry {
        let (first_fixed_blend_id, last_fixed_blend_id) = self
            .fixed_blend_range
            .unwrap_or((FIRST_FIXED_BLEND_STAGE_ID, FIRST_FIXED_BLEND_STAGE_ID.saturating_sub(1)));
        log::debug!(
            "[STAGE_REGISTRY] Frozen with {} stages, fixed blends {}..={}",
            self.stages.len(),
            first_fixed_blend_id,
            last_fixed_blend_id
        );
        StageRegistry {
            stages: self.stages,
            first_fixed_blend_id,
            last_fixed_blend_id,
        }
    }
}

/// Frozen registry
#[derive(Debug)]
pub struct StageRegistry {
    stages: BTreeMap<u32, FragmentStage>,
    first_fixed_blend_id: u32,
    last_fixed_blend_id: u32,
}

impl StageRegistry {
    /// The default registry: built-in stages, fixed blends for [`BlendMode`]
    /// and the custom mipmap blur stage
    pub fn standard() -> Result<Self, RegistryError> {
        let mut builder = StageRegistryBuilder::new()
            .with_builtin_stages()?
            .with_fixed_blend_stages::<BlendMode>()?;
        builder.register(MIPMAP_BLUR_STAGE_ID, mipmap_blur_stage())?;
        Ok(builder.build())
    }

    /// Process-wide registry, built on first use
    ///
    /// The table is static data; failing to build it is a programming error.
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<StageRegistry> = OnceLock::new();
        GLOBAL.get_or_init(|| match Self::standard() {
            Ok(registry) => registry,
            Err(e) => {
                log::error!("[STAGE_REGISTRY] Built-in stage table is invalid: {}", e);
                panic!("built-in stage table is invalid: {e}");
            }
        })
    }

    /// Stage registered under `id`
    pub fn get(&self, id: u32) -> Option<&FragmentStage> {
        self.stages.get(&id)
    }

    /// Fixed blend stage ID for `mode`
    pub fn fixed_blend_stage_id(&self, mode: BlendMode) -> u32 {
        fixed_blend_stage_id(mode)
    }

    /// First fixed blend stage ID
    pub fn first_fixed_blend_stage_id(&self) -> u32 {
        self.first_fixed_blend_id
    }

    /// Last fixed blend stage ID
    pub fn last_fixed_blend_stage_id(&self) -> u32 {
        self.last_fixed_blend_id
    }

    /// Number of registered stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether no stage is registered
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Registered IDs in ascending order
    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.stages.keys().copied()
    }
}
