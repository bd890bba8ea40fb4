pub mod body_metrics;
pub mod trend;

pub use body_metrics::{BmiCategory, BodyMetrics, Gender, Measurement};
pub use trend::{trend_data_uri, TREND_WINDOW};
