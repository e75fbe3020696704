use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;

use estate_core::Cents;

/// Review status of a photo batch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Draft,
    NeedsReview,
    Approved,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ItemStatus::Draft => "draft",
            ItemStatus::NeedsReview => "needs_review",
            ItemStatus::Approved => "approved",
        })
    }
}

/// What finally happened to a photographed item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Sold,
    Donated,
    Hauled,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Disposition::Sold => "sold",
            Disposition::Donated => "donated",
            Disposition::Hauled => "hauled",
        })
    }
}

/// Opaque pointer into the blob store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhotoRef {
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Consecutive photos that show one sellable unit. `end_index` is inclusive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhotoGroup {
    pub item_number: u32,
    pub start_index: usize,
    pub end_index: usize,
    pub title: String,
    pub photo_count: usize,
}

impl PhotoGroup {
    pub fn new(item_number: u32, start_index: usize, end_index: usize, title: impl Into<String>) -> Self {
        Self {
            item_number,
            start_index,
            end_index,
            title: title.into(),
            photo_count: end_index.saturating_sub(start_index) + 1,
        }
    }

    pub fn indices(&self) -> std::ops::RangeInclusive<usize> {
        self.start_index..=self.end_index
    }
}

/// A reviewed, priced item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApprovedItem {
    pub item_number: u32,
    pub photo_index: usize,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Cents,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewNote {
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispositionSummary {
    pub total: usize,
    pub available: usize,
    pub sold: usize,
    pub donated: usize,
    pub hauled: usize,
}

/// The photographed contents of one job and what became of them.
///
/// `sold`, `donated` and `hauled` hold photo indices and never share one.
/// They only grow; nothing removes an index once recorded.
#[derive(Debug, Clone, Serialize)]
pub struct ItemBatch {
    pub id: Uuid,
    pub job_id: Uuid,
    pub(crate) status: ItemStatus,
    pub(crate) photos: Vec<PhotoRef>,
    pub(crate) photo_groups: Vec<PhotoGroup>,
    pub(crate) approved_items: Option<Vec<ApprovedItem>>,
    pub(crate) sold: BTreeSet<usize>,
    pub(crate) donated: BTreeSet<usize>,
    pub(crate) hauled: BTreeSet<usize>,
    pub(crate) review_log: Vec<ReviewNote>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ItemBatch {
    pub fn new(job_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            job_id,
            status: ItemStatus::Draft,
            photos: Vec::new(),
            photo_groups: Vec::new(),
            approved_items: None,
            sold: BTreeSet::new(),
            donated: BTreeSet::new(),
            hauled: BTreeSet::new(),
            review_log: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    pub fn photos(&self) -> &[PhotoRef] {
        &self.photos
    }

    pub fn photo_groups(&self) -> &[PhotoGroup] {
        &self.photo_groups
    }

    pub fn approved_items(&self) -> Option<&[ApprovedItem]> {
        self.approved_items.as_deref()
    }

    pub fn approved_item(&self, item_number: u32) -> Option<&ApprovedItem> {
        self.approved_items.as_ref()?.iter().find(|i| i.item_number == item_number)
    }

    pub fn review_log(&self) -> &[ReviewNote] {
        &self.review_log
    }

    pub fn disposed(&self, kind: Disposition) -> &BTreeSet<usize> {
        match kind {
            Disposition::Sold => &self.sold,
            Disposition::Donated => &self.donated,
            Disposition::Hauled => &self.hauled,
        }
    }

    pub(crate) fn disposed_mut(&mut self, kind: Disposition) -> &mut BTreeSet<usize> {
        match kind {
            Disposition::Sold => &mut self.sold,
            Disposition::Donated => &mut self.donated,
            Disposition::Hauled => &mut self.hauled,
        }
    }

    /// Disposition recorded for one photo index, if any
    pub fn disposition_of(&self, index: usize) -> Option<Disposition> {
        [Disposition::Sold, Disposition::Donated, Disposition::Hauled]
            .into_iter()
            .find(|kind| self.disposed(*kind).contains(&index))
    }

    pub fn summary(&self) -> DispositionSummary {
        let total = self.photos.len();
        let (sold, donated, hauled) = (self.sold.len(), self.donated.len(), self.hauled.len());
        DispositionSummary {
            total,
            available: total.saturating_sub(sold + donated + hauled),
            sold,
            donated,
            hauled,
        }
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
