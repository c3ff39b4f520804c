use globe_common::VariantId;
use globe_surface::{StaleStateError, SurfaceVariant};

/// Invalid LOD setup. Fatal to initialization.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("activation distance {distance} is already registered")]
    DuplicateThreshold { distance: f32 },
    #[error("activation distance {distance} must be finite and non-negative")]
    InvalidThreshold { distance: f32 },
}

/// Owns the surface variants of one globe, ordered by activation distance,
/// and decides each frame which one is rendered.
#[derive(Debug, Default)]
pub struct LodSelector {
    /// Sorted by strictly increasing activation distance.
    variants: Vec<SurfaceVariant>,
    /// Index into `variants`; cleared whenever the set changes.
    current_active: Option<usize>,
}

impl LodSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a variant that becomes active at `activation_distance` and beyond.
    pub fn register(
        &mut self,
        mut variant: SurfaceVariant,
        activation_distance: f32,
    ) -> Result<VariantId, ConfigurationError> {
        if !activation_distance.is_finite() || activation_distance < 0.0 {
            return Err(ConfigurationError::InvalidThreshold {
                distance: activation_distance,
            });
        }
        let slot = self
            .variants
            .partition_point(|v| v.activation_distance() < activation_distance);
        if self
            .variants
            .get(slot)
            .is_some_and(|v| v.activation_distance() == activation_distance)
        {
            return Err(ConfigurationError::DuplicateThreshold {
                distance: activation_distance,
            });
        }

        let id = variant.id();
        variant.set_activation_distance(activation_distance);
        variant.set_visible(false);
        tracing::debug!(
            variant = %id.short(),
            lat = variant.resolution().lat,
            lon = variant.resolution().lon,
            activation_distance,
            "registered LOD variant"
        );
        self.variants.insert(slot, variant);
        self.current_active = None;
        Ok(id)
    }

    /// Make the variant whose distance band contains `camera_distance` the
    /// only visible one. Returns whether the active variant changed since the
    /// previous evaluation.
    ///
    /// The band rule: the greatest activation distance `<= camera_distance`
    /// wins; closer than every threshold falls back to the smallest.
    pub fn evaluate(&mut self, camera_distance: f32) -> bool {
        if self.variants.is_empty() {
            return false;
        }
        let distance = if camera_distance.is_nan() {
            0.0
        } else {
            camera_distance
        };

        let qualifying = self
            .variants
            .partition_point(|v| v.activation_distance() <= distance);
        let chosen = qualifying.saturating_sub(1);

        for (i, v) in self.variants.iter_mut().enumerate() {
            v.set_visible(i == chosen);
        }

        let changed = self.current_active != Some(chosen);
        if changed {
            tracing::debug!(
                from = ?self.current_active,
                to = chosen,
                camera_distance = distance,
                "active LOD tier changed"
            );
        }
        self.current_active = Some(chosen);
        changed
    }

    pub fn active(&self) -> Option<&SurfaceVariant> {
        self.current_active.and_then(|i| self.variants.get(i))
    }

    pub fn active_index(&self) -> Option<usize> {
        self.current_active
    }

    pub fn variants(&self) -> &[SurfaceVariant] {
        &self.variants
    }

    /// Mutable access for the elevation pipeline. Callers must not change
    /// activation distances through it.
    pub fn variants_mut(&mut self) -> &mut [SurfaceVariant] {
        &mut self.variants
    }

    pub fn get(&self, id: VariantId) -> Option<&SurfaceVariant> {
        self.variants.iter().find(|v| v.id() == id)
    }

    /// Activation distances in ascending order.
    pub fn thresholds(&self) -> impl Iterator<Item = f32> + '_ {
        self.variants.iter().map(SurfaceVariant::activation_distance)
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn visible_count(&self) -> usize {
        self.variants.iter().filter(|v| v.is_visible()).count()
    }

    /// First variant whose normals disagree with its material, if any.
    pub fn verify_consistency(&self) -> Result<(), StaleStateError> {
        self.variants
            .iter()
            .try_for_each(SurfaceVariant::verify_consistency)
    }
}
