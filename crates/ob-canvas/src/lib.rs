pub mod adapter;
pub mod background;
pub mod immediate;
pub mod overlay;
pub mod retained;

pub use adapter::{CanvasAdapter, CanvasEvent, Events, PointerInput, ShapeHandle};
pub use background::{BackgroundImage, BackgroundSource};
pub use immediate::BitmapCanvas;
pub use overlay::{OverlayPlacement, PageRect, delete_icon_placement};
pub use retained::{PaintOp, SceneCanvas};
