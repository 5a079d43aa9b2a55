pub mod frame;
pub mod interaction;
pub mod viewport;

pub use frame::{EdgeShape, Frame, FrameStyle, NodeShape, build_frame};
pub use interaction::{GestureEffect, GestureState, InteractionController, InteractionParams, NodeSelected, hit_test};
pub use viewport::{Viewport, ViewportParams};
