pub mod placement;
pub mod relax;

pub use placement::{Placement, PlacementParams, place};
pub use relax::{LayoutParams, RelaxReport, relax};
