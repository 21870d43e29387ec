pub mod noise_event;
pub mod paged;

pub use noise_event::{canonical_datetime, parse_local_datetime, NoiseEvent, NoiseField};
pub use paged::PagedResult;
