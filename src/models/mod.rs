pub mod event;
pub mod feature;
pub mod result;
pub mod window;

pub use event::{ChatEvent, EmoteOccurrence};
pub use feature::{FeatureColumns, FeatureRow, FeatureTable, FeatureValue};
pub use result::{ClipStamp, ResultTable};
pub use window::{duration_to_secs, ChunkKey, Window};
