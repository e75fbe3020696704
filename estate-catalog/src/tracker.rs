use chrono::Utc;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use estate_core::CoreError;

use crate::groups::{self, GroupDisposition, GroupView};
use crate::models::{
    ApprovedItem, Disposition, DispositionSummary, ItemBatch, ItemStatus, PhotoGroup, PhotoRef, ReviewNote,
};

/// Tracks photo batches through review and, once approved, records the
/// sale/donation/haul outcome of every photographed unit.
pub struct ItemDispositionTracker {
    batches: HashMap<Uuid, ItemBatch>,
    by_job: HashMap<Uuid, Uuid>,
}

impl ItemDispositionTracker {
    pub fn new() -> Self {
        Self {
            batches: HashMap::new(),
            by_job: HashMap::new(),
        }
    }

    /// Open the (single) photo batch of a job
    pub fn create_item_batch(&mut self, job_id: Uuid) -> Result<ItemBatch, ItemError> {
        if let Some(existing) = self.by_job.get(&job_id) {
            return Err(ItemError::BatchExists { job_id, item_id: *existing });
        }

        let batch = ItemBatch::new(job_id);
        self.by_job.insert(job_id, batch.id);
        self.batches.insert(batch.id, batch.clone());
        Ok(batch)
    }

    pub fn get(&self, item_id: &Uuid) -> Option<&ItemBatch> {
        self.batches.get(item_id)
    }

    pub fn require(&self, item_id: &Uuid) -> Result<&ItemBatch, ItemError> {
        self.batches.get(item_id).ok_or(ItemError::NotFound(*item_id))
    }

    pub fn batch_for_job(&self, job_id: &Uuid) -> Option<&ItemBatch> {
        self.by_job.get(job_id).and_then(|id| self.batches.get(id))
    }

    /// Append photos in order. Returns the new photo count.
    pub fn append_photos(&mut self, item_id: &Uuid, urls: Vec<String>) -> Result<usize, ItemError> {
        if let Some(blank) = urls.iter().position(|u| u.trim().is_empty()) {
            return Err(ItemError::Invalid(format!("photo {} has an empty reference", blank)));
        }

        let batch = self.get_mut(item_id)?;
        let now = Utc::now();
        let grouped = !batch.photo_groups.is_empty();

        for url in urls {
            let index = batch.photos.len();
            batch.photos.push(PhotoRef { url, uploaded_at: now });

            // keep an explicit partition whole: each new photo is its own unit
            if grouped {
                let number = batch.photo_groups.iter().map(|g| g.item_number).max().unwrap_or(0) + 1;
                batch.photo_groups.push(PhotoGroup::new(number, index, index, format!("Item {}", number)));
            }
        }
        batch.touch();

        Ok(batch.photos.len())
    }

    /// Replace the grouping of photos into sellable units
    pub fn set_photo_groups(&mut self, item_id: &Uuid, groups: Vec<PhotoGroup>) -> Result<(), ItemError> {
        let batch = self.get_mut(item_id)?;

        if batch.status == ItemStatus::Approved {
            return Err(ItemError::InvalidStatus { item_id: *item_id, status: batch.status });
        }
        if batch.summary().available != batch.photos.len() {
            return Err(ItemError::GroupsLocked(*item_id));
        }
        groups::validate_partition(&groups, batch.photos.len())?;

        batch.photo_groups = groups;
        batch.touch();
        Ok(())
    }

    /// Hand a draft batch to an agent for review
    pub fn submit_for_review(&mut self, item_id: &Uuid) -> Result<(), ItemError> {
        let batch = self.get_mut(item_id)?;
        if batch.status != ItemStatus::Draft {
            return Err(ItemError::InvalidStatus { item_id: *item_id, status: batch.status });
        }
        batch.status = ItemStatus::NeedsReview;
        batch.touch();
        Ok(())
    }

    /// Approve the batch with its priced item list
    pub fn approve(&mut self, item_id: &Uuid, items: Vec<ApprovedItem>) -> Result<(), ItemError> {
        let batch = self.get_mut(item_id)?;

        if batch.status == ItemStatus::Approved {
            return Err(ItemError::InvalidStatus { item_id: *item_id, status: batch.status });
        }
        if items.is_empty() {
            return Err(ItemError::Invalid("at least one approved item is required".to_string()));
        }

        let photo_count = batch.photos.len();
        let mut numbers = HashSet::new();
        for item in &items {
            if item.photo_index >= photo_count {
                return Err(ItemError::IndexOutOfRange { index: item.photo_index, photo_count });
            }
            if !numbers.insert(item.item_number) {
                return Err(ItemError::DuplicateItemNumber(item.item_number));
            }
            if item.title.trim().is_empty() {
                return Err(ItemError::Invalid(format!("item {} has no title", item.item_number)));
            }
            if item.price.is_negative() {
                return Err(ItemError::Invalid(format!("item {} has a negative price", item.item_number)));
            }
        }

        batch.approved_items = Some(items);
        batch.status = ItemStatus::Approved;
        batch.touch();
        Ok(())
    }

    /// Send an approved batch back for review. Approved items stay until the
    /// next `approve` replaces them.
    pub fn reopen(&mut self, item_id: &Uuid, reason: &str) -> Result<(), ItemError> {
        if reason.trim().is_empty() {
            return Err(ItemError::Invalid("a reason is required to reopen a batch".to_string()));
        }

        let batch = self.get_mut(item_id)?;
        if batch.status != ItemStatus::Approved {
            return Err(ItemError::InvalidStatus { item_id: *item_id, status: batch.status });
        }

        batch.status = ItemStatus::NeedsReview;
        batch.review_log.push(ReviewNote { reason: reason.trim().to_string(), timestamp: Utc::now() });
        batch.touch();
        Ok(())
    }

    /// Record `kind` on every index, or on none of them.
    pub fn mark_disposition(&mut self, item_id: &Uuid, indices: &[usize], kind: Disposition) -> Result<(), ItemError> {
        let batch = self.get_mut(item_id)?;

        if batch.status != ItemStatus::Approved {
            return Err(ItemError::NotApproved(*item_id));
        }
        if indices.is_empty() {
            return Err(ItemError::Invalid("no photo indices given".to_string()));
        }

        let photo_count = batch.photos.len();
        let mut seen = HashSet::new();
        for &index in indices {
            if index >= photo_count {
                return Err(ItemError::IndexOutOfRange { index, photo_count });
            }
            if !seen.insert(index) {
                return Err(ItemError::Invalid(format!("photo index {} given twice", index)));
            }
        }
        for &index in indices {
            if let Some(existing) = batch.disposition_of(index) {
                return Err(ItemError::AlreadyDisposed { index, existing });
            }
        }

        batch.disposed_mut(kind).extend(indices.iter().copied());
        batch.touch();
        Ok(())
    }

    /// Mark whole items by number. All numbers must be approved and currently
    /// available; otherwise nothing is marked. Returns the photo indices marked.
    pub fn mark_item_numbers(
        &mut self,
        item_id: &Uuid,
        item_numbers: &[u32],
        kind: Disposition,
    ) -> Result<Vec<usize>, ItemError> {
        let batch = self.require(item_id)?;
        if batch.status != ItemStatus::Approved {
            return Err(ItemError::NotApproved(*item_id));
        }

        let mut indices = Vec::new();
        for &number in item_numbers {
            if batch.approved_item(number).is_none() {
                return Err(ItemError::UnknownItemNumber(number));
            }
            let item_indices = groups::indices_for_item(batch, number).unwrap_or_default();
            let group = batch
                .photo_groups()
                .iter()
                .find(|g| g.item_number == number)
                .cloned()
                .unwrap_or_else(|| {
                    let index = item_indices.first().copied().unwrap_or_default();
                    PhotoGroup::new(number, index, index, String::new())
                });
            match groups::group_disposition(batch, &group)? {
                GroupDisposition::Available => {}
                taken => return Err(ItemError::ItemUnavailable { item_number: number, disposition: taken }),
            }
            indices.extend(item_indices);
        }

        self.mark_disposition(item_id, &indices, kind)?;
        Ok(indices)
    }

    /// Disposition of the group for `item_number`
    pub fn photo_group_disposition(&self, item_id: &Uuid, item_number: u32) -> Result<GroupDisposition, ItemError> {
        let batch = self.require(item_id)?;
        let group = groups::effective_groups(batch)
            .into_iter()
            .find(|g| g.item_number == item_number)
            .ok_or(ItemError::UnknownItemNumber(item_number))?;
        groups::group_disposition(batch, &group)
    }

    pub fn group_views(&self, item_id: &Uuid) -> Result<Vec<GroupView>, ItemError> {
        Ok(groups::group_views(self.require(item_id)?))
    }

    pub fn disposition_summary(&self, item_id: &Uuid) -> Result<DispositionSummary, ItemError> {
        Ok(self.require(item_id)?.summary())
    }

    fn get_mut(&mut self, item_id: &Uuid) -> Result<&mut ItemBatch, ItemError> {
        self.batches.get_mut(item_id).ok_or(ItemError::NotFound(*item_id))
    }
}

impl Default for ItemDispositionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("Item batch not found: {0}")]
    NotFound(Uuid),

    #[error("Job {job_id} already has item batch {item_id}")]
    BatchExists { job_id: Uuid, item_id: Uuid },

    #[error("Item batch {item_id} is {status}; operation not allowed")]
    InvalidStatus { item_id: Uuid, status: ItemStatus },

    #[error("Item batch {0} is not approved")]
    NotApproved(Uuid),

    #[error("Photo index {index} is out of range for {photo_count} photos")]
    IndexOutOfRange { index: usize, photo_count: usize },

    #[error("Duplicate item number: {0}")]
    DuplicateItemNumber(u32),

    #[error("Unknown item number: {0}")]
    UnknownItemNumber(u32),

    #[error("Invalid photo groups: {0}")]
    InvalidGroups(String),

    #[error("Photo groups of batch {0} cannot change once items are disposed")]
    GroupsLocked(Uuid),

    #[error("Photo {index} is already {existing}")]
    AlreadyDisposed { index: usize, existing: Disposition },

    #[error("Item {item_number} is not available (already {disposition:?})")]
    ItemUnavailable { item_number: u32, disposition: GroupDisposition },

    #[error("Item {item_number} is inconsistent: {disposed} of {photo_count} photos disposed or mixed outcomes")]
    InconsistentGroup { item_number: u32, disposed: usize, photo_count: usize },

    #[error("Invalid item data: {0}")]
    Invalid(String),
}

impl From<ItemError> for CoreError {
    fn from(err: ItemError) -> Self {
        match err {
            ItemError::NotFound(id) => CoreError::not_found("Item batch", id),
            ItemError::IndexOutOfRange { .. }
            | ItemError::DuplicateItemNumber(_)
            | ItemError::UnknownItemNumber(_)
            | ItemError::InvalidGroups(_)
            | ItemError::Invalid(_) => CoreError::Validation(err.to_string()),
            ItemError::BatchExists { .. }
            | ItemError::InvalidStatus { .. }
            | ItemError::NotApproved(_)
            | ItemError::GroupsLocked(_)
            | ItemError::AlreadyDisposed { .. }
            | ItemError::ItemUnavailable { .. }
            | ItemError::InconsistentGroup { .. } => CoreError::Conflict(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use estate_core::Cents;

    fn approved_item(number: u32, photo_index: usize) -> ApprovedItem {
        ApprovedItem {
            item_number: number,
            photo_index,
            title: format!("Item {}", number),
            description: None,
            price: Cents::from_dollars(25),
            category: Some("furniture".to_string()),
        }
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://blobs.example/photo-{}.jpg", i)).collect()
    }

    /// Approved batch of 6 photos grouped as items 1:[0,1] 2:[2] 3:[3,5]
    fn approved_batch() -> (ItemDispositionTracker, Uuid) {
        let mut tracker = ItemDispositionTracker::new();
        let batch = tracker.create_item_batch(Uuid::new_v4()).unwrap();
        tracker.append_photos(&batch.id, urls(6)).unwrap();
        tracker
            .set_photo_groups(&batch.id, vec![
                PhotoGroup::new(1, 0, 1, "Dresser"),
                PhotoGroup::new(2, 2, 2, "Lamp"),
                PhotoGroup::new(3, 3, 5, "Dining set"),
            ])
            .unwrap();
        tracker
            .approve(&batch.id, vec![approved_item(1, 0), approved_item(2, 2), approved_item(3, 3)])
            .unwrap();
        (tracker, batch.id)
    }

    fn assert_disjoint(batch: &ItemBatch) {
        let sold = batch.disposed(Disposition::Sold);
        let donated = batch.disposed(Disposition::Donated);
        let hauled = batch.disposed(Disposition::Hauled);
        assert!(sold.is_disjoint(donated));
        assert!(sold.is_disjoint(hauled));
        assert!(donated.is_disjoint(hauled));
    }

    #[test]
    fn test_batch_lifecycle() {
        let mut tracker = ItemDispositionTracker::new();
        let job_id = Uuid::new_v4();
        let batch = tracker.create_item_batch(job_id).unwrap();
        assert_eq!(batch.status(), ItemStatus::Draft);
        assert!(batch.photos().is_empty());

        assert_eq!(tracker.append_photos(&batch.id, urls(3)).unwrap(), 3);
        assert_eq!(tracker.append_photos(&batch.id, urls(2)).unwrap(), 5);
        assert_eq!(tracker.get(&batch.id).unwrap().status(), ItemStatus::Draft);

        tracker.submit_for_review(&batch.id).unwrap();
        assert_eq!(tracker.get(&batch.id).unwrap().status(), ItemStatus::NeedsReview);

        tracker.approve(&batch.id, vec![approved_item(1, 0), approved_item(2, 4)]).unwrap();
        let approved = tracker.get(&batch.id).unwrap();
        assert_eq!(approved.status(), ItemStatus::Approved);
        assert_eq!(approved.approved_items().unwrap().len(), 2);
        assert_eq!(tracker.batch_for_job(&job_id).unwrap().id, batch.id);
    }

    #[test]
    fn test_one_batch_per_job() {
        let mut tracker = ItemDispositionTracker::new();
        let job_id = Uuid::new_v4();
        tracker.create_item_batch(job_id).unwrap();
        assert!(matches!(tracker.create_item_batch(job_id), Err(ItemError::BatchExists { .. })));
    }

    #[test]
    fn test_approve_validation() {
        let mut tracker = ItemDispositionTracker::new();
        let batch = tracker.create_item_batch(Uuid::new_v4()).unwrap();
        tracker.append_photos(&batch.id, urls(3)).unwrap();

        let out_of_range = tracker.approve(&batch.id, vec![approved_item(1, 3)]);
        assert!(matches!(out_of_range, Err(ItemError::IndexOutOfRange { index: 3, photo_count: 3 })));

        let duplicate = tracker.approve(&batch.id, vec![approved_item(1, 0), approved_item(1, 1)]);
        assert!(matches!(duplicate, Err(ItemError::DuplicateItemNumber(1))));

        let batch = tracker.get(&batch.id).unwrap();
        assert_eq!(batch.status(), ItemStatus::Draft);
        assert!(batch.approved_items().is_none());
    }

    #[test]
    fn test_approve_twice_conflicts() {
        let (mut tracker, item_id) = approved_batch();
        let result = tracker.approve(&item_id, vec![approved_item(9, 0)]);
        assert!(matches!(result, Err(ItemError::InvalidStatus { status: ItemStatus::Approved, .. })));
    }

    #[test]
    fn test_reopen_keeps_approved_items() {
        let (mut tracker, item_id) = approved_batch();

        tracker.reopen(&item_id, "Lamp price too low").unwrap();
        let batch = tracker.get(&item_id).unwrap();
        assert_eq!(batch.status(), ItemStatus::NeedsReview);
        assert_eq!(batch.approved_items().unwrap().len(), 3);
        assert_eq!(batch.review_log()[0].reason, "Lamp price too low");

        assert!(matches!(tracker.reopen(&item_id, "again"), Err(ItemError::InvalidStatus { .. })));

        tracker.approve(&item_id, vec![approved_item(2, 2)]).unwrap();
        assert_eq!(tracker.get(&item_id).unwrap().approved_items().unwrap().len(), 1);
    }

    #[test]
    fn test_reopen_requires_reason() {
        let (mut tracker, item_id) = approved_batch();
        assert!(matches!(tracker.reopen(&item_id, " "), Err(ItemError::Invalid(_))));
        assert_eq!(tracker.get(&item_id).unwrap().status(), ItemStatus::Approved);
    }

    #[test]
    fn test_mark_disposition_rejects_double_marking() {
        let (mut tracker, item_id) = approved_batch();

        tracker.mark_disposition(&item_id, &[0, 1], Disposition::Sold).unwrap();

        let result = tracker.mark_disposition(&item_id, &[2, 1], Disposition::Donated);
        assert!(matches!(result, Err(ItemError::AlreadyDisposed { index: 1, existing: Disposition::Sold })));

        // nothing from the failed call was applied
        let batch = tracker.get(&item_id).unwrap();
        assert!(batch.disposed(Disposition::Donated).is_empty());
        assert_disjoint(batch);
    }

    #[test]
    fn test_mark_disposition_validation() {
        let (mut tracker, item_id) = approved_batch();

        assert!(matches!(
            tracker.mark_disposition(&item_id, &[6], Disposition::Hauled),
            Err(ItemError::IndexOutOfRange { index: 6, .. })
        ));
        assert!(matches!(tracker.mark_disposition(&item_id, &[2, 2], Disposition::Hauled), Err(ItemError::Invalid(_))));
        assert!(matches!(tracker.mark_disposition(&item_id, &[], Disposition::Hauled), Err(ItemError::Invalid(_))));
    }

    #[test]
    fn test_mark_requires_approval() {
        let mut tracker = ItemDispositionTracker::new();
        let batch = tracker.create_item_batch(Uuid::new_v4()).unwrap();
        tracker.append_photos(&batch.id, urls(2)).unwrap();
        assert!(matches!(tracker.mark_disposition(&batch.id, &[0], Disposition::Sold), Err(ItemError::NotApproved(_))));
    }

    #[test]
    fn test_disjoint_after_mixed_sequence() {
        let (mut tracker, item_id) = approved_batch();
        let attempts: [(&[usize], Disposition); 6] = [
            (&[0], Disposition::Sold),
            (&[0, 2], Disposition::Donated),
            (&[2], Disposition::Donated),
            (&[3, 4], Disposition::Hauled),
            (&[4, 5], Disposition::Sold),
            (&[5], Disposition::Hauled),
        ];
        for (indices, kind) in attempts {
            let _ = tracker.mark_disposition(&item_id, indices, kind);
            assert_disjoint(tracker.get(&item_id).unwrap());
        }

        let summary = tracker.disposition_summary(&item_id).unwrap();
        assert_eq!(summary, DispositionSummary { total: 6, available: 1, sold: 1, donated: 1, hauled: 3 });
    }

    #[test]
    fn test_mark_item_numbers_covers_whole_group() {
        let (mut tracker, item_id) = approved_batch();

        let marked = tracker.mark_item_numbers(&item_id, &[1, 3], Disposition::Donated).unwrap();
        assert_eq!(marked, vec![0, 1, 3, 4, 5]);

        assert_eq!(tracker.photo_group_disposition(&item_id, 1).unwrap(), GroupDisposition::Donated);
        assert_eq!(tracker.photo_group_disposition(&item_id, 2).unwrap(), GroupDisposition::Available);
        assert_eq!(tracker.photo_group_disposition(&item_id, 3).unwrap(), GroupDisposition::Donated);
    }

    #[test]
    fn test_mark_item_numbers_is_all_or_nothing() {
        let (mut tracker, item_id) = approved_batch();
        tracker.mark_item_numbers(&item_id, &[2], Disposition::Sold).unwrap();

        let result = tracker.mark_item_numbers(&item_id, &[1, 2], Disposition::Hauled);
        assert!(matches!(result, Err(ItemError::ItemUnavailable { item_number: 2, .. })));
        assert_eq!(tracker.photo_group_disposition(&item_id, 1).unwrap(), GroupDisposition::Available);

        assert!(matches!(
            tracker.mark_item_numbers(&item_id, &[42], Disposition::Hauled),
            Err(ItemError::UnknownItemNumber(42))
        ));
    }

    #[test]
    fn test_partially_disposed_group_is_surfaced() {
        let (mut tracker, item_id) = approved_batch();
        tracker.mark_disposition(&item_id, &[3], Disposition::Sold).unwrap();

        assert!(matches!(
            tracker.photo_group_disposition(&item_id, 3),
            Err(ItemError::InconsistentGroup { item_number: 3, disposed: 1, photo_count: 3 })
        ));
        assert!(matches!(
            tracker.mark_item_numbers(&item_id, &[3], Disposition::Hauled),
            Err(ItemError::InconsistentGroup { .. })
        ));

        let views = tracker.group_views(&item_id).unwrap();
        assert!(views[2].disposition.is_none());
        assert!(views[2].inconsistency.is_some());
        assert_eq!(views[0].disposition, Some(GroupDisposition::Available));
    }

    #[test]
    fn test_groups_without_explicit_partition_follow_approved_items() {
        let mut tracker = ItemDispositionTracker::new();
        let batch = tracker.create_item_batch(Uuid::new_v4()).unwrap();
        tracker.append_photos(&batch.id, urls(4)).unwrap();
        tracker.approve(&batch.id, vec![approved_item(7, 1), approved_item(8, 3)]).unwrap();

        let marked = tracker.mark_item_numbers(&batch.id, &[8], Disposition::Hauled).unwrap();
        assert_eq!(marked, vec![3]);
        assert_eq!(tracker.photo_group_disposition(&batch.id, 8).unwrap(), GroupDisposition::Hauled);
    }

    #[test]
    fn test_append_extends_explicit_groups() {
        let mut tracker = ItemDispositionTracker::new();
        let batch = tracker.create_item_batch(Uuid::new_v4()).unwrap();
        tracker.append_photos(&batch.id, urls(2)).unwrap();
        tracker.set_photo_groups(&batch.id, vec![PhotoGroup::new(1, 0, 1, "Chair")]).unwrap();

        tracker.append_photos(&batch.id, urls(2)).unwrap();
        let batch = tracker.get(&batch.id).unwrap();
        assert_eq!(batch.photo_groups().len(), 3);
        assert_eq!(batch.photo_groups()[2], PhotoGroup::new(3, 3, 3, "Item 3"));
        assert!(groups::validate_partition(batch.photo_groups(), batch.photos().len()).is_ok());
    }

    #[test]
    fn test_error_classification() {
        assert!(matches!(CoreError::from(ItemError::DuplicateItemNumber(1)), CoreError::Validation(_)));
        assert!(matches!(
            CoreError::from(ItemError::AlreadyDisposed { index: 0, existing: Disposition::Sold }),
            CoreError::Conflict(_)
        ));
        assert!(matches!(CoreError::from(ItemError::NotFound(Uuid::nil())), CoreError::NotFound { .. }));
    }
}
