//! Local geometry on route shapes
//!
//! Pure functions over `[lon, lat]` sequences; nothing here calls the
//! engine or fails. Degenerate input falls back to well-defined output.

pub mod offset;
pub mod simplify;

pub use offset::{meters_to_degrees, offset, JoinPolicy, OffsetOptions, Side, EARTH_RADIUS_M};
pub use simplify::{perpendicular_distance, simplify};
