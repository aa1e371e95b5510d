use crate::{
    assets::decode::PreparedAsset,
    foundation::core::{Affine, Point, Rect, Rgba8Premul, Size},
    foundation::error::CuecastResult,
};

/// Current drawable area of the host surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// Size in device pixels.
    pub size: Size,
    /// Maps simulation-space coordinates to device pixels.
    pub sim_to_device: Affine,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            size: Size::new(width, height),
            sim_to_device: Affine::IDENTITY,
        }
    }

    pub fn with_transform(mut self, sim_to_device: Affine) -> Self {
        self.sim_to_device = sim_to_device;
        self
    }

    pub fn to_device(&self, sim: Point) -> Point {
        self.sim_to_device * sim
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(Point::ORIGIN, self.size)
    }

    pub fn is_drawable(&self) -> bool {
        self.size.width > 0.0 && self.size.height > 0.0
    }
}

/// Sprite bound to the overlay: the cache key it came from and its decoded resource.
#[derive(Clone, Debug)]
pub struct SpriteHandle {
    pub key: String,
    pub asset: PreparedAsset,
    /// Intrinsic size in pixels.
    pub size: Size,
}

/// A filled full-surface layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerFrame {
    pub rect: Rect,
    /// Already multiplied by the layer's current alpha.
    pub color: Rgba8Premul,
    pub alpha: f64,
}

/// Sprite placement for one frame.
#[derive(Clone, Debug)]
pub struct SpriteFrame {
    pub handle: SpriteHandle,
    /// Destination rectangle in device pixels.
    pub rect: Rect,
    pub opacity: f64,
}

/// Complete overlay state pushed to the host once per animated frame.
#[derive(Clone, Debug)]
pub struct OverlayFrame {
    pub visible: bool,
    pub dim: LayerFrame,
    pub flash: LayerFrame,
    pub sprite: Option<SpriteFrame>,
}

/// The host application's rendering surface.
///
/// The overlay is attached once and then only presented, shown and hidden; it is never
/// reallocated per effect.
pub trait SurfaceHost: Send + Sync {
    /// Current viewport, or `None` while the host surface is not ready.
    fn viewport(&self) -> Option<Viewport>;

    /// Allocate the overlay's layers on the shared surface.
    fn attach_overlay(&self) -> CuecastResult<()>;

    /// Draw the overlay state.
    fn present(&self, frame: &OverlayFrame);

    /// Release the overlay's layers.
    fn detach_overlay(&self);
}
