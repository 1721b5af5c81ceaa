pub mod collector;
pub mod percentiles;
pub mod stream;

pub use collector::{ChangePointRecord, StatusCollector, StatusSnapshot};
pub use percentiles::LatencyPercentiles;
