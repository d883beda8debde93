//! Render settings edited at runtime
//!
//! Everything the editor overlay can change about how a frame is produced.
//! Setters clamp to the ranges the editor widgets expose and keep the
//! dependent fields consistent.

use crate::core::config::{BloomConfig, RendererConfig, BLOOM_ITERATION_LIMIT, BLOOM_ITERATION_MAX};
use crate::render::composite::{RenderTargetView, ShadingMode};
use crate::render::RenderResult;

/// Upper bound of the bloom range and exposure sliders
pub const SLIDER_MAX: f32 = 100.0;

/// Runtime rendering options
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    shading_mode: ShadingMode,
    render_target: RenderTargetView,
    bloom_iterations: u32,
    bloom_range: f32,
    surpass_limits: bool,
    exposure_level: f32,
    exposure_active: bool,
    debug_lights: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::from_config(&RendererConfig::default(), &BloomConfig::default())
    }
}

impl RenderSettings {
    /// Initial settings from configuration, clamped to the editor ranges
    pub fn from_config(renderer: &RendererConfig, bloom: &BloomConfig) -> Self {
        let mut settings = Self {
            shading_mode: renderer.shading_mode,
            render_target: renderer.render_target,
            bloom_iterations: 0,
            bloom_range: 0.0,
            surpass_limits: bloom.surpass_limits,
            exposure_level: 0.0,
            exposure_active: renderer.exposure_active,
            debug_lights: renderer.debug_lights,
        };
        settings.set_bloom_iterations(bloom.iterations);
        settings.set_bloom_range(bloom.range);
        settings.set_exposure_level(renderer.exposure_level);
        settings
    }

    /// Active shading mode
    pub fn shading_mode(&self) -> ShadingMode {
        self.shading_mode
    }

    /// Select the shading mode by its selector index
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::NoShadingMethod`](crate::render::RenderError::NoShadingMethod)
    /// for an index outside the known modes; the current mode is kept.
    pub fn select_shading_mode(&mut self, index: u32) -> RenderResult<ShadingMode> {
        let mode = ShadingMode::try_from(index).map_err(|e| {
            log::error!("{}", e);
            e
        })?;
        self.set_shading_mode(mode);
        Ok(mode)
    }

    /// Switch between forward and deferred shading
    pub fn set_shading_mode(&mut self, mode: ShadingMode) {
        if mode != self.shading_mode {
            log::info!("Shading mode: {}", mode);
        }
        self.shading_mode = mode;
    }

    /// Attachment shown by forward shading
    pub fn render_target(&self) -> RenderTargetView {
        self.render_target
    }

    /// Show another attachment of the geometry target
    ///
    /// Only forward shading displays single attachments, so the request is
    /// ignored in deferred mode. Light indicators are only meaningful over
    /// the lit color and are hidden for every other view. Returns whether
    /// the view changed.
    pub fn select_render_target(&mut self, view: RenderTargetView) -> bool {
        if self.shading_mode != ShadingMode::Forward {
            log::debug!("Render target selection needs forward shading");
            return false;
        }
        self.render_target = view;
        self.debug_lights = view == RenderTargetView::Albedo;
        true
    }

    /// Number of blur passes
    pub fn bloom_iterations(&self) -> u32 {
        self.bloom_iterations
    }

    /// Set the number of blur passes, clamped to the current limit
    pub fn set_bloom_iterations(&mut self, iterations: u32) {
        self.bloom_iterations = iterations.min(self.bloom_iteration_limit());
    }

    /// Largest iteration count currently allowed
    pub fn bloom_iteration_limit(&self) -> u32 {
        if self.surpass_limits {
            BLOOM_ITERATION_MAX
        } else {
            BLOOM_ITERATION_LIMIT
        }
    }

    /// Whether the iteration limit is lifted
    pub fn surpass_limits(&self) -> bool {
        self.surpass_limits
    }

    /// Lift or restore the iteration limit; restoring clamps the count
    pub fn set_surpass_limits(&mut self, surpass: bool) {
        self.surpass_limits = surpass;
        if !surpass && self.bloom_iterations > BLOOM_ITERATION_LIMIT {
            log::debug!("Bloom iterations clamped to {}", BLOOM_ITERATION_LIMIT);
            self.bloom_iterations = BLOOM_ITERATION_LIMIT;
        }
    }

    /// Bright-pass range used by the geometry shaders
    pub fn bloom_range(&self) -> f32 {
        self.bloom_range
    }

    /// Set the bright-pass range, clamped to `0..=100`
    pub fn set_bloom_range(&mut self, range: f32) {
        self.bloom_range = range.clamp(0.0, SLIDER_MAX);
    }

    /// Tone mapping exposure
    pub fn exposure_level(&self) -> f32 {
        self.exposure_level
    }

    /// Set the exposure, clamped to `0..=100`
    pub fn set_exposure_level(&mut self, level: f32) {
        self.exposure_level = level.clamp(0.0, SLIDER_MAX);
    }

    /// Whether tone mapping runs
    pub fn exposure_active(&self) -> bool {
        self.exposure_active
    }

    /// Toggle tone mapping
    pub fn set_exposure_active(&mut self, active: bool) {
        self.exposure_active = active;
    }

    /// Whether light indicator meshes are drawn
    pub fn debug_lights(&self) -> bool {
        self.debug_lights
    }

    /// Toggle the light indicator meshes
    pub fn set_debug_lights(&mut self, visible: bool) {
        self.debug_lights = visible;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderError;

    #[test]
    fn defaults_follow_configuration() {
        let settings = RenderSettings::default();

        assert_eq!(settings.shading_mode(), ShadingMode::Forward);
        assert_eq!(settings.render_target(), RenderTargetView::Albedo);
        assert_eq!(settings.bloom_iterations(), 10);
        assert!(settings.debug_lights());
    }

    #[test]
    fn restoring_limits_clamps_iterations() {
        let mut settings = RenderSettings::default();
        settings.set_surpass_limits(true);
        settings.set_bloom_iterations(500);
        assert_eq!(settings.bloom_iterations(), 500);

        settings.set_surpass_limits(false);

        assert_eq!(settings.bloom_iterations(), BLOOM_ITERATION_LIMIT);
    }

    #[test]
    fn iterations_clamp_to_current_limit() {
        let mut settings = RenderSettings::default();
        settings.set_bloom_iterations(50);
        assert_eq!(settings.bloom_iterations(), 20);

        settings.set_surpass_limits(true);
        settings.set_bloom_iterations(5000);
        assert_eq!(settings.bloom_iterations(), 1000);
    }

    #[test]
    fn sliders_clamp_to_their_range() {
        let mut settings = RenderSettings::default();
        settings.set_bloom_range(150.0);
        settings.set_exposure_level(-3.0);

        assert_eq!(settings.bloom_range(), 100.0);
        assert_eq!(settings.exposure_level(), 0.0);
    }

    #[test]
    fn non_albedo_view_hides_light_indicators() {
        let mut settings = RenderSettings::default();

        assert!(settings.select_render_target(RenderTargetView::Normals));
        assert!(!settings.debug_lights());

        assert!(settings.select_render_target(RenderTargetView::Albedo));
        assert!(settings.debug_lights());
    }

    #[test]
    fn view_selection_needs_forward_shading() {
        let mut settings = RenderSettings::default();
        settings.set_shading_mode(ShadingMode::Deferred);

        assert!(!settings.select_render_target(RenderTargetView::Depth));
        assert_eq!(settings.render_target(), RenderTargetView::Albedo);
    }

    #[test]
    fn unknown_shading_index_keeps_current_mode() {
        let mut settings = RenderSettings::default();

        assert!(matches!(settings.select_shading_mode(7), Err(RenderError::NoShadingMethod(7))));
        assert_eq!(settings.shading_mode(), ShadingMode::Forward);

        assert_eq!(settings.select_shading_mode(1).unwrap(), ShadingMode::Deferred);
    }
}
