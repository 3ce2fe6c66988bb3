//! Status - キューの一覧表示
//!
//! タスク記述子と結果記述子を task_id で突き合わせ、1 タスク 1 行のビューにします。
//! 結果がまだ無いタスクは記述子の status（通常は pending）のまま表示されます。

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    ProductId, ResultDescriptor, ResultStatus, TaskDescriptor, TaskId, TaskStatus,
    product::attr,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub pending: usize,
    pub success: usize,
    pub error: usize,
}

impl QueueCounts {
    pub fn total(&self) -> usize {
        self.pending + self.success + self.error
    }

    fn record(&mut self, status: TaskStatus) {
        match status {
            TaskStatus::Pending => self.pending += 1,
            TaskStatus::Success => self.success += 1,
            TaskStatus::Error => self.error += 1,
        }
    }
}

/// One row of the queue view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub task_id: TaskId,
    pub product_id: Option<ProductId>,
    pub brand: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub status: TaskStatus,
    pub message: Option<String>,
    pub output_image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueView {
    pub entries: Vec<QueueEntry>,
    pub counts: QueueCounts,
}

impl QueueView {
    /// Join tasks with their results; results without a task are not shown.
    pub fn build(tasks: Vec<TaskDescriptor>, results: Vec<ResultDescriptor>) -> Self {
        let mut by_task: HashMap<TaskId, ResultDescriptor> = results
            .into_iter()
            .map(|r| (r.task_id.clone(), r))
            .collect();

        let mut entries: Vec<QueueEntry> = tasks
            .into_iter()
            .map(|task| {
                let result = by_task.remove(&task.task_id);
                let status = match result.as_ref().map(|r| r.status) {
                    Some(ResultStatus::Success) => TaskStatus::Success,
                    Some(ResultStatus::Error) => TaskStatus::Error,
                    None => task.status,
                };
                let field = |name: &str| task.product_data.get(name).unwrap_or_default().to_string();
                QueueEntry {
                    product_id: task
                        .product_id
                        .or_else(|| result.as_ref().and_then(|r| r.product_id)),
                    brand: field(attr::BRAND),
                    model: field(attr::MODEL),
                    created_at: task.created_at,
                    status,
                    message: result.as_ref().and_then(|r| r.message.clone()),
                    output_image: result.and_then(|r| r.output_image),
                    task_id: task.task_id,
                }
            })
            .collect();
        entries.sort_by(|a, b| a.task_id.cmp(&b.task_id));

        let mut counts = QueueCounts::default();
        for entry in &entries {
            counts.record(entry.status);
        }
        Self { entries, counts }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProductSnapshot;
    use chrono::TimeZone;

    fn task(id: &str, brand: &str) -> TaskDescriptor {
        TaskDescriptor::new(
            TaskId::new(id),
            ProductSnapshot::new()
                .with(attr::BRAND, brand)
                .with(attr::MODEL, "X1"),
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn joins_results_and_counts_statuses() {
        let tasks = vec![
            task("20240101_120002_503", "C").with_product(ProductId::new(503)),
            task("20240101_120000_501", "A").with_product(ProductId::new(501)),
            task("20240101_120001_502", "B"),
        ];
        let results = vec![
            ResultDescriptor::success(TaskId::new("20240101_120000_501"), "product_501_ai.png"),
            ResultDescriptor::error(TaskId::new("20240101_120001_502"), "no tyre found"),
            ResultDescriptor::success(TaskId::new("orphan"), "x.png"),
        ];

        let view = QueueView::build(tasks, results);

        let ids: Vec<&str> = view.entries.iter().map(|e| e.task_id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["20240101_120000_501", "20240101_120001_502", "20240101_120002_503"]
        );
        assert_eq!(view.entries[0].status, TaskStatus::Success);
        assert_eq!(view.entries[0].output_image.as_deref(), Some("product_501_ai.png"));
        assert_eq!(view.entries[0].brand, "A");
        assert_eq!(view.entries[1].status, TaskStatus::Error);
        assert_eq!(view.entries[1].message.as_deref(), Some("no tyre found"));
        assert_eq!(view.entries[2].status, TaskStatus::Pending);
        assert_eq!(
            view.counts,
            QueueCounts {
                pending: 1,
                success: 1,
                error: 1
            }
        );
        assert_eq!(view.counts.total(), 3);
    }

    #[test]
    fn empty_queue() {
        let view = QueueView::build(Vec::new(), Vec::new());
        assert!(view.is_empty());
        assert_eq!(view.counts, QueueCounts::default());
    }
}
