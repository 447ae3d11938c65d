//! Category ordering
//!
//! Categories are ordered per group by a dense 1-based index. Active
//! categories of a group always occupy `1..=N`; deleted categories carry no
//! index. The pure functions here do the arithmetic on loaded slices; the
//! async functions apply them inside a [`UnitOfWork`], and
//! [`CategoryService`] wraps each in its own committed unit of work.

use crate::database::{CategoryStatus, DataPointCategory, Repository, UnitOfWork};
use crate::error::Result;
use std::collections::HashMap;
use uuid::Uuid;

/// Index a new category appended to `group` receives.
pub fn next_index(categories: &[DataPointCategory], group: Option<&str>) -> i64 {
    categories
        .iter()
        .filter(|c| c.in_group(group))
        .filter_map(|c| c.index)
        .max()
        .unwrap_or(0)
        + 1
}

/// Re-number every group so active categories read `1..=N` in their current
/// order and deleted categories have no index.
///
/// Unassigned indexes sort before assigned ones; ties keep slice order.
/// Returns the IDs whose index changed.
pub fn fix_indexes(categories: &mut [DataPointCategory]) -> Vec<Uuid> {
    let mut order: Vec<usize> = (0..categories.len()).collect();
    order.sort_by(|&a, &b| {
        let (a, b) = (&categories[a], &categories[b]);
        a.group
            .cmp(&b.group)
            .then(a.index.unwrap_or(0).cmp(&b.index.unwrap_or(0)))
    });

    let mut changed = Vec::new();
    let mut current_group: Option<Option<String>> = None;
    let mut next = 0;

    for position in order {
        let category = &mut categories[position];

        if current_group.as_ref() != Some(&category.group) {
            current_group = Some(category.group.clone());
            next = 0;
        }

        let wanted = if category.is_deleted() {
            None
        } else {
            next += 1;
            Some(next)
        };

        if category.index != wanted {
            category.index = wanted;
            changed.push(category.id);
        }
    }

    changed
}

/// Swap the category with the one right above it in its group.
///
/// Indexes are normalized first. Returns false when the category is already
/// first (or deleted) and nothing was swapped.
pub fn move_up(categories: &mut [DataPointCategory], id: Uuid) -> bool {
    fix_indexes(categories);

    let Some(position) = categories.iter().position(|c| c.id == id) else {
        return false;
    };
    let Some(index) = categories[position].index else {
        return false;
    };

    let group = categories[position].group.clone();
    let above = categories
        .iter()
        .position(|c| c.group == group && c.index == Some(index - 1));

    match above {
        Some(above) => {
            categories[position].index = Some(index - 1);
            categories[above].index = Some(index);
            true
        }
        None => false,
    }
}

fn index_snapshot(categories: &[DataPointCategory]) -> HashMap<Uuid, Option<i64>> {
    categories.iter().map(|c| (c.id, c.index)).collect()
}

async fn persist_index_changes(
    uow: &mut UnitOfWork,
    before: &HashMap<Uuid, Option<i64>>,
    after: &[DataPointCategory],
) -> Result<usize> {
    let mut written = 0;

    for category in after {
        if before.get(&category.id) != Some(&category.index) {
            uow.set_category_index(category.id, category.index).await?;
            written += 1;
        }
    }

    Ok(written)
}

/// Stage a new category. An unset index is appended to the end of the
/// category's group; an explicit index is kept as given.
pub async fn add_category(
    uow: &mut UnitOfWork,
    mut category: DataPointCategory,
) -> Result<DataPointCategory> {
    if category.is_deleted() {
        category.index = None;
    } else if category.index.is_none() {
        let max = uow.max_category_index(category.group.as_deref()).await?;
        category.index = Some(max + 1);
    }

    uow.insert_category(&category).await?;

    tracing::debug!(
        "Added category {} to group {:?} at index {:?}",
        category.name,
        category.group,
        category.index
    );

    Ok(category)
}

/// Normalize every group's indexes. Returns how many categories changed.
pub async fn fix_category_indexes(uow: &mut UnitOfWork) -> Result<usize> {
    let mut categories = uow.list_categories().await?;
    let before = index_snapshot(&categories);

    fix_indexes(&mut categories);

    let written = persist_index_changes(uow, &before, &categories).await?;
    if written > 0 {
        tracing::info!("Fixed {} category indexes", written);
    }

    Ok(written)
}

/// Move a category one place up in its group. Returns whether it moved.
pub async fn move_category_up(uow: &mut UnitOfWork, id: Uuid) -> Result<bool> {
    uow.get_category(id).await?;

    let mut categories = uow.list_categories().await?;
    let before = index_snapshot(&categories);

    let moved = move_up(&mut categories, id);
    persist_index_changes(uow, &before, &categories).await?;

    tracing::debug!("Move up of category {}: moved={}", id, moved);
    Ok(moved)
}

/// Soft-delete a category and close the gap it leaves in its group.
pub async fn delete_category(uow: &mut UnitOfWork, id: Uuid) -> Result<()> {
    let mut category = uow.get_category(id).await?;
    category.status = CategoryStatus::Deleted;
    category.index = None;
    uow.update_category(&category).await?;

    fix_category_indexes(uow).await?;

    tracing::info!("Deleted category {} ({})", category.name, id);
    Ok(())
}

/// Service running each ordering operation in its own unit of work
#[derive(Clone)]
pub struct CategoryService {
    repo: Repository,
}

impl CategoryService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn list_categories(&self) -> Result<Vec<DataPointCategory>> {
        self.repo.list_categories().await
    }

    pub async fn add_category(&self, category: DataPointCategory) -> Result<DataPointCategory> {
        let mut uow = self.repo.begin().await?;
        let category = add_category(&mut uow, category).await?;
        uow.commit().await?;
        Ok(category)
    }

    pub async fn move_category_up(&self, id: Uuid) -> Result<bool> {
        let mut uow = self.repo.begin().await?;
        let moved = move_category_up(&mut uow, id).await?;
        uow.commit().await?;
        Ok(moved)
    }

    pub async fn fix_category_indexes(&self) -> Result<usize> {
        let mut uow = self.repo.begin().await?;
        let written = fix_category_indexes(&mut uow).await?;
        uow.commit().await?;
        Ok(written)
    }

    pub async fn delete_category(&self, id: Uuid) -> Result<()> {
        let mut uow = self.repo.begin().await?;
        delete_category(&mut uow, id).await?;
        uow.commit().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{test_pool, DataType};
    use crate::error::AppError;

    fn category(group: Option<&str>, name: &str, index: Option<i64>) -> DataPointCategory {
        DataPointCategory {
            index,
            ..DataPointCategory::new(group, name, DataType::Scale)
        }
    }

    fn deleted(group: Option<&str>, name: &str, index: Option<i64>) -> DataPointCategory {
        DataPointCategory {
            status: CategoryStatus::Deleted,
            ..category(group, name, index)
        }
    }

    fn indexes_of(categories: &[DataPointCategory], group: Option<&str>) -> Vec<(String, Option<i64>)> {
        let mut found: Vec<_> = categories
            .iter()
            .filter(|c| c.in_group(group))
            .map(|c| (c.name.clone(), c.index))
            .collect();
        found.sort_by_key(|(_, index)| *index);
        found
    }

    #[test]
    fn test_next_index_defaults_to_one() {
        assert_eq!(next_index(&[], Some("Symptoms")), 1);

        let categories = vec![
            category(Some("Symptoms"), "a", Some(3)),
            category(Some("Symptoms"), "b", Some(7)),
            category(Some("Other"), "c", Some(9)),
        ];
        assert_eq!(next_index(&categories, Some("Symptoms")), 8);
        assert_eq!(next_index(&categories, None), 1);
    }

    #[test]
    fn test_fix_closes_gaps_and_clears_deleted() {
        let mut categories = vec![
            category(Some("G"), "c", Some(9)),
            category(Some("G"), "a", Some(2)),
            deleted(Some("G"), "x", Some(4)),
            category(Some("G"), "b", Some(5)),
            category(Some("H"), "z", Some(3)),
        ];

        let changed = fix_indexes(&mut categories);

        assert_eq!(
            indexes_of(&categories, Some("G")),
            vec![
                ("x".to_string(), None),
                ("a".to_string(), Some(1)),
                ("b".to_string(), Some(2)),
                ("c".to_string(), Some(3)),
            ]
        );
        assert_eq!(indexes_of(&categories, Some("H")), vec![("z".to_string(), Some(1))]);
        assert_eq!(changed.len(), 5);
    }

    #[test]
    fn test_fix_handles_empty_and_all_deleted_groups() {
        let mut empty: Vec<DataPointCategory> = Vec::new();
        assert!(fix_indexes(&mut empty).is_empty());

        let mut only_deleted = vec![deleted(Some("G"), "a", Some(1)), deleted(Some("G"), "b", None)];
        fix_indexes(&mut only_deleted);
        assert!(only_deleted.iter().all(|c| c.index.is_none()));
    }

    #[test]
    fn test_fix_is_stable_for_duplicates() {
        let mut categories = vec![
            category(None, "first", Some(1)),
            category(None, "second", Some(1)),
            category(None, "third", Some(2)),
        ];

        fix_indexes(&mut categories);

        assert_eq!(categories[0].index, Some(1));
        assert_eq!(categories[1].index, Some(2));
        assert_eq!(categories[2].index, Some(3));
    }

    #[test]
    fn test_move_up_swaps_with_previous() {
        let mut categories = vec![
            category(Some("G"), "a", Some(1)),
            category(Some("G"), "b", Some(2)),
            category(Some("G"), "c", Some(3)),
        ];
        let id = categories[2].id;

        assert!(move_up(&mut categories, id));

        assert_eq!(categories[1].index, Some(3));
        assert_eq!(categories[2].index, Some(2));
        assert_eq!(categories[0].index, Some(1));
    }

    #[test]
    fn test_move_up_first_is_noop() {
        let mut categories = vec![
            category(Some("G"), "a", Some(1)),
            category(Some("G"), "b", Some(2)),
        ];
        let id = categories[0].id;

        assert!(!move_up(&mut categories, id));
        assert_eq!(categories[0].index, Some(1));
        assert_eq!(categories[1].index, Some(2));
    }

    #[test]
    fn test_move_up_normalizes_gaps_first() {
        let mut categories = vec![
            category(Some("G"), "a", Some(2)),
            category(Some("G"), "b", Some(6)),
        ];
        let id = categories[1].id;

        assert!(move_up(&mut categories, id));

        assert_eq!(categories[0].index, Some(2));
        assert_eq!(categories[1].index, Some(1));
    }

    #[tokio::test]
    async fn test_add_category_appends_to_group() {
        let service = CategoryService::new(Repository::new(test_pool().await));

        let first = service
            .add_category(category(Some("Symptoms"), "Nausea", None))
            .await
            .unwrap();
        let second = service
            .add_category(category(Some("Symptoms"), "Fatigue", None))
            .await
            .unwrap();
        let other = service
            .add_category(category(None, "Steps", None))
            .await
            .unwrap();
        let explicit = service
            .add_category(category(Some("Symptoms"), "Dizziness", Some(10)))
            .await
            .unwrap();

        assert_eq!(first.index, Some(1));
        assert_eq!(second.index, Some(2));
        assert_eq!(other.index, Some(1));
        assert_eq!(explicit.index, Some(10));
    }

    #[tokio::test]
    async fn test_delete_category_closes_gap() {
        let service = CategoryService::new(Repository::new(test_pool().await));

        let a = service.add_category(category(Some("G"), "a", None)).await.unwrap();
        let b = service.add_category(category(Some("G"), "b", None)).await.unwrap();
        let c = service.add_category(category(Some("G"), "c", None)).await.unwrap();

        service.delete_category(b.id).await.unwrap();

        let repo = &service.repo;
        assert_eq!(repo.get_category(a.id).await.unwrap().index, Some(1));
        assert_eq!(repo.get_category(c.id).await.unwrap().index, Some(2));

        let removed = repo.get_category(b.id).await.unwrap();
        assert!(removed.is_deleted());
        assert_eq!(removed.index, None);
    }

    #[tokio::test]
    async fn test_move_category_up_persists_swap() {
        let service = CategoryService::new(Repository::new(test_pool().await));

        let a = service.add_category(category(None, "a", None)).await.unwrap();
        let b = service.add_category(category(None, "b", None)).await.unwrap();

        assert!(service.move_category_up(b.id).await.unwrap());
        assert!(!service.move_category_up(b.id).await.unwrap());

        let repo = &service.repo;
        assert_eq!(repo.get_category(a.id).await.unwrap().index, Some(2));
        assert_eq!(repo.get_category(b.id).await.unwrap().index, Some(1));
    }

    #[tokio::test]
    async fn test_move_unknown_category_fails() {
        let service = CategoryService::new(Repository::new(test_pool().await));

        let result = service.move_category_up(Uuid::new_v4()).await;

        assert!(matches!(result, Err(AppError::CategoryNotFound(_))));
    }

    #[tokio::test]
    async fn test_fix_indexes_on_empty_store() {
        let service = CategoryService::new(Repository::new(test_pool().await));
        assert_eq!(service.fix_category_indexes().await.unwrap(), 0);
    }
}
