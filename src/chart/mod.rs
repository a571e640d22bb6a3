//! Chart configuration, data shaping and preview.

pub mod preview;
pub mod shaper;
pub mod types;

pub use preview::preview_chart;
pub use shaper::shape_chart_data;
pub use types::{palette_color, ChartConfig, ChartData, ChartType, Color, Dataset, PALETTE};
