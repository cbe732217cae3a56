//! Style declarations and their per-feature resolution.
//!
//! Supported attribute value forms:
//! - constants (`"#ff0000"`, `2`, `"12m"`)
//! - feature functions `(feature, grid_zoom, declaration) -> value`
//! - zoom-breakpoint maps (`{ "10": "2px", "16": "8px" }`), expanded once
//!   into a dense table for zooms 1..=20

pub mod color;
pub mod resolver;
pub mod size;
pub mod types;
pub mod zoom;

pub use color::{color_to_value, parse_color, parse_color_string};
pub use resolver::{is_float_property, StyleValueResolver, FLOAT_PROPERTIES};
pub use size::{meters_per_pixel_at_zoom, parse_size, Size, Unit};
pub use types::{PrimitiveKind, StyleDeclaration, StyleFn, StyleGroup, StyleProperty};
pub use zoom::{ZoomMap, MAX_ZOOM, MIN_ZOOM};
