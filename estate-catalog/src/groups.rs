use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::{Disposition, ItemBatch, PhotoGroup};
use crate::tracker::ItemError;

/// Where a photo group stands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GroupDisposition {
    Available,
    Sold,
    Donated,
    Hauled,
}

impl From<Disposition> for GroupDisposition {
    fn from(kind: Disposition) -> Self {
        match kind {
            Disposition::Sold => GroupDisposition::Sold,
            Disposition::Donated => GroupDisposition::Donated,
            Disposition::Hauled => GroupDisposition::Hauled,
        }
    }
}

/// A group with its disposition, or the reason it has none
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupView {
    #[serde(flatten)]
    pub group: PhotoGroup,
    pub disposition: Option<GroupDisposition>,
    pub inconsistency: Option<String>,
}

/// Check that `groups` tile `[0, photo_count)` in order with no gap or overlap.
pub fn validate_partition(groups: &[PhotoGroup], photo_count: usize) -> Result<(), ItemError> {
    if groups.is_empty() {
        return Ok(());
    }

    let mut next = 0;
    let mut numbers = HashSet::new();

    for group in groups {
        if group.start_index != next {
            return Err(ItemError::InvalidGroups(format!(
                "group {} starts at {} but the previous group ended at {}",
                group.item_number,
                group.start_index,
                next as i64 - 1
            )));
        }
        if group.end_index < group.start_index {
            return Err(ItemError::InvalidGroups(format!(
                "group {} ends before it starts",
                group.item_number
            )));
        }
        if group.photo_count != group.end_index - group.start_index + 1 {
            return Err(ItemError::InvalidGroups(format!(
                "group {} claims {} photos but spans {}",
                group.item_number,
                group.photo_count,
                group.end_index - group.start_index + 1
            )));
        }
        if !numbers.insert(group.item_number) {
            return Err(ItemError::DuplicateItemNumber(group.item_number));
        }
        next = group.end_index + 1;
    }

    if next != photo_count {
        return Err(ItemError::InvalidGroups(format!(
            "groups cover {} photos but the batch has {}",
            next, photo_count
        )));
    }

    Ok(())
}

/// `Available` if no photo in the group is disposed, otherwise the single kind
/// covering every photo. Partial or mixed coverage is reported, never guessed.
pub fn group_disposition(batch: &ItemBatch, group: &PhotoGroup) -> Result<GroupDisposition, ItemError> {
    let marks: Vec<Option<Disposition>> = group.indices().map(|i| batch.disposition_of(i)).collect();

    if marks.iter().all(Option::is_none) {
        return Ok(GroupDisposition::Available);
    }

    let first = marks.iter().flatten().next().copied();
    match first {
        Some(kind) if marks.iter().all(|m| *m == Some(kind)) => Ok(kind.into()),
        _ => Err(ItemError::InconsistentGroup {
            item_number: group.item_number,
            disposed: marks.iter().filter(|m| m.is_some()).count(),
            photo_count: marks.len(),
        }),
    }
}

/// Groups a batch is sold by: its explicit groups, or one single-photo unit
/// per approved item when none were drawn.
pub fn effective_groups(batch: &ItemBatch) -> Vec<PhotoGroup> {
    if !batch.photo_groups().is_empty() {
        return batch.photo_groups().to_vec();
    }
    batch
        .approved_items()
        .unwrap_or_default()
        .iter()
        .map(|item| PhotoGroup::new(item.item_number, item.photo_index, item.photo_index, item.title.clone()))
        .collect()
}

/// Photo indices that make up `item_number`
pub fn indices_for_item(batch: &ItemBatch, item_number: u32) -> Option<Vec<usize>> {
    if let Some(group) = batch.photo_groups().iter().find(|g| g.item_number == item_number) {
        return Some(group.indices().collect());
    }
    batch.approved_item(item_number).map(|item| vec![item.photo_index])
}

pub fn group_views(batch: &ItemBatch) -> Vec<GroupView> {
    effective_groups(batch)
        .into_iter()
        .map(|group| match group_disposition(batch, &group) {
            Ok(disposition) => GroupView { group, disposition: Some(disposition), inconsistency: None },
            Err(err) => GroupView { group, disposition: None, inconsistency: Some(err.to_string()) },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(spans: &[(u32, usize, usize)]) -> Vec<PhotoGroup> {
        spans.iter().map(|(n, s, e)| PhotoGroup::new(*n, *s, *e, format!("Item {}", n))).collect()
    }

    #[test]
    fn test_valid_partition() {
        assert!(validate_partition(&groups(&[(1, 0, 2), (2, 3, 3), (3, 4, 6)]), 7).is_ok());
        assert!(validate_partition(&[], 5).is_ok());
    }

    #[test]
    fn test_gap_overlap_and_short_coverage() {
        assert!(matches!(validate_partition(&groups(&[(1, 0, 1), (2, 3, 4)]), 5), Err(ItemError::InvalidGroups(_))));
        assert!(matches!(validate_partition(&groups(&[(1, 0, 2), (2, 2, 4)]), 5), Err(ItemError::InvalidGroups(_))));
        assert!(matches!(validate_partition(&groups(&[(1, 0, 2)]), 5), Err(ItemError::InvalidGroups(_))));
        assert!(matches!(validate_partition(&groups(&[(1, 1, 4)]), 5), Err(ItemError::InvalidGroups(_))));
    }

    #[test]
    fn test_duplicate_numbers_and_bad_count() {
        assert!(matches!(
            validate_partition(&groups(&[(1, 0, 1), (1, 2, 3)]), 4),
            Err(ItemError::DuplicateItemNumber(1))
        ));

        let mut bad = groups(&[(1, 0, 1)]);
        bad[0].photo_count = 3;
        assert!(matches!(validate_partition(&bad, 2), Err(ItemError::InvalidGroups(_))));
    }
}
