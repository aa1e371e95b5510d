use crate::foundation::error::CuecastResult;

/// Optional visual feature an add-on may provide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddonCapability {
    /// Glow layered on top of the flash pulse.
    FlashBloom,
    /// Short camera shake when the subject lands.
    ScreenShake,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Support {
    Supported,
    Unsupported,
}

/// Visual add-on that may or may not implement each [`AddonCapability`].
///
/// The overlay asks [`supports`](Self::supports) before every use, so add-ons that lack a feature
/// are skipped instead of failing.
pub trait OverlayAddon: Send + Sync {
    fn name(&self) -> &str;

    fn supports(&self, capability: AddonCapability) -> Support;

    /// Drive `capability` at `intensity` in `[0, 1]`; `0` resets it.
    fn apply(&self, capability: AddonCapability, intensity: f64) -> CuecastResult<()>;
}
