use derive_new::new;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnError, DisplayFromStr, PickFirst};

pub use id::*;
pub use student::*;
pub use video::*;

mod id;
mod student;
mod video;

/// The fixed set of catalog categories, in display order. The first entry is the "all" sentinel.
pub const CATEGORIES: [&str; 11] = [
    ALL_CATEGORIES,
    "基础",
    "Bab 1",
    "Bab 2",
    "Bab 3",
    "Bab 4",
    "Bab 5",
    "Bab 6",
    "Bab 7",
    "Bab 8",
    "Bab 9",
];

/// Category value that disables category filtering.
pub const ALL_CATEGORIES: &str = "全部";
