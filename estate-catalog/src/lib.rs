pub mod models;
pub mod groups;
pub mod tracker;

pub use models::{ItemBatch, ItemStatus, Disposition, PhotoRef, PhotoGroup, ApprovedItem, ReviewNote, DispositionSummary};
pub use groups::{GroupDisposition, GroupView};
pub use tracker::{ItemDispositionTracker, ItemError};
