//! Rollback completeness over arbitrary plans

use proptest::prelude::*;
use remedy_executor::RemediationExecutor;
use remedy_model::{ExecutionBudget, ExecutionStatus};
use remedy_test_utils::{context, plan_for, ActionLog, RecordingAction};
use remedy_validation::ValidationRegistry;
use std::sync::Arc;

proptest! {
    #[test]
    fn failure_at_k_rolls_back_prefix_in_reverse(len in 1usize..10, k_seed in 0usize..10) {
        let k = k_seed % len;
        let log = ActionLog::new();
        let ctx = context("orders", "Boom", "boom");
        let actions: Vec<_> = (0..len)
            .map(|i| {
                let a = RecordingAction::new(&log, i as i32);
                if i == k { a.failing() } else { a }
            })
            .collect();
        let ids: Vec<_> = actions.iter().map(RecordingAction::id_hint).collect();
        let plan = plan_for(&ctx, actions.into_iter().map(RecordingAction::shared).collect());

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let execution = runtime.block_on(async {
            RemediationExecutor::new(Arc::new(ValidationRegistry::default()))
                .execute(&plan, &ctx, &ExecutionBudget::unbounded())
                .await
                .unwrap()
        });

        let mut expected: Vec<_> = ids[..k].to_vec();
        expected.reverse();

        prop_assert_eq!(execution.status, ExecutionStatus::Failed);
        prop_assert_eq!(log.rolled_back(), expected);
        prop_assert_eq!(log.executed(), ids[..=k].to_vec());
    }
}
