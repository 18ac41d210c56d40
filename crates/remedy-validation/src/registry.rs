//! Validation registry
//!
//! Rules run in descending priority, ties in registration order. The
//! first failing rule with priority 4 or 5 stops evaluation; failures
//! of lower-priority rules are collected without stopping. Results of
//! cacheable rules are kept in a shared `moka` cache keyed by rule,
//! plan id and correlation id, each entry expiring after its rule's TTL.

use crate::error::ValidationError;
use crate::rule::{ValidationRule, BLOCKING_PRIORITY, MAX_PRIORITY, MIN_PRIORITY};
use dashmap::DashMap;
use moka::future::Cache;
use moka::Expiry;
use remedy_model::{CorrelationId, ErrorContext, ExecutionBudget, PlanId, ValidationLevel, ValidationResult};
use remedy_strategy::RemediationPlan;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    rule: String,
    generation: u64,
    plan: PlanId,
    context: CorrelationId,
}

#[derive(Debug, Clone)]
struct CachedResult {
    result: ValidationResult,
    ttl: Duration,
}

struct PerRuleTtl;

impl Expiry<CacheKey, CachedResult> for PerRuleTtl {
    fn expire_after_create(&self, _key: &CacheKey, value: &CachedResult, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }
}

#[derive(Debug, Clone)]
struct RegisteredRule {
    rule: Arc<dyn ValidationRule>,
    order: u64,
    generation: u64,
}

/// Outcome of validating one plan
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    /// Aggregate result: fails if any evaluated rule failed
    pub outcome: ValidationResult,
    /// Per-rule results in evaluation order
    pub rule_results: Vec<ValidationResult>,
    /// Names of evaluated rules in evaluation order
    pub evaluated: Vec<String>,
    /// Whether a blocking failure stopped evaluation early
    pub short_circuited: bool,
}

impl ValidationReport {
    /// Result of a named rule, if it was evaluated
    #[must_use]
    pub fn result_for(&self, rule: &str) -> Option<&ValidationResult> {
        self.rule_results.iter().find(|r| r.rule.as_deref() == Some(rule))
    }
}

/// Name-keyed rule map with a shared result cache
#[derive(Debug)]
pub struct ValidationRegistry {
    rules: DashMap<String, RegisteredRule>,
    sequence: AtomicU64,
    cache: Cache<CacheKey, CachedResult>,
}

impl Default for ValidationRegistry {
    /// Registry caching up to 10,000 results
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl ValidationRegistry {
    /// Create registry caching up to `cache_capacity` results
    #[must_use]
    pub fn new(cache_capacity: u64) -> Self {
        Self {
            rules: DashMap::new(),
            sequence: AtomicU64::new(0),
            cache: Cache::builder()
                .max_capacity(cache_capacity)
                .expire_after(PerRuleTtl)
                .build(),
        }
    }

    /// Register a rule, replacing any rule with the same name
    ///
    /// A replacement keeps the original evaluation position; results
    /// cached for the replaced rule are no longer served.
    ///
    /// # Errors
    /// [`ValidationError::InvalidPriority`] if priority is outside `1..=5`.
    pub fn register(&self, rule: Arc<dyn ValidationRule>) -> Result<(), ValidationError> {
        let priority = rule.priority();
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
            return Err(ValidationError::InvalidPriority {
                rule: rule.name().to_string(),
                priority,
            });
        }

        let generation = self.sequence.fetch_add(1, Ordering::Relaxed);
        let name = rule.name().to_string();
        let order = self.rules.get(&name).map_or(generation, |existing| existing.order);
        self.rules.insert(
            name.clone(),
            RegisteredRule {
                rule,
                order,
                generation,
            },
        );
        tracing::debug!(rule = %name, priority, "Registered validation rule");
        Ok(())
    }

    /// Remove a rule by name
    pub fn unregister(&self, name: &str) -> bool {
        self.rules.remove(name).is_some()
    }

    /// Check if a rule is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Number of registered rules
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if no rule is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule names in evaluation order
    #[must_use]
    pub fn rule_names(&self) -> Vec<String> {
        self.ordered().into_iter().map(|r| r.rule.name().to_string()).collect()
    }

    /// Drop all cached results
    pub fn clear_cache(&self) {
        self.cache.invalidate_all();
    }

    /// Validate a plan for an incident
    ///
    /// A rule that errors yields a failed result at `Error` level. When the
    /// budget runs out mid-evaluation, partial results are discarded.
    ///
    /// # Errors
    /// [`ValidationError::TimedOut`] or [`ValidationError::Cancelled`] when
    /// the budget is spent before evaluation finishes.
    pub async fn validate(
        &self,
        plan: &RemediationPlan,
        context: &ErrorContext,
        budget: &ExecutionBudget,
    ) -> Result<ValidationReport, ValidationError> {
        let started = Instant::now();
        let mut rule_results = Vec::new();
        let mut evaluated = Vec::new();
        let mut short_circuited = false;

        for entry in self.ordered() {
            let name = entry.rule.name().to_string();
            let outcome = match budget.check() {
                Ok(()) => budget.run(self.evaluate_rule(&entry, plan, context)).await,
                Err(e) => Err(e),
            };
            let result = match outcome {
                Ok(result) => result,
                Err(exceeded) => {
                    tracing::warn!(
                        correlation_id = %context.correlation_id,
                        plan_id = %plan.id,
                        rule = %name,
                        reason = %exceeded,
                        "Validation abandoned"
                    );
                    return Err(exceeded.into());
                }
            };

            let blocking = !result.success && entry.rule.priority() >= BLOCKING_PRIORITY;
            evaluated.push(name.clone());
            rule_results.push(result);

            if blocking {
                tracing::warn!(
                    correlation_id = %context.correlation_id,
                    plan_id = %plan.id,
                    rule = %name,
                    "Blocking validation rule failed; skipping remaining rules"
                );
                short_circuited = true;
                break;
            }
        }

        let outcome = aggregate(&rule_results, started.elapsed());
        tracing::debug!(
            correlation_id = %context.correlation_id,
            plan_id = %plan.id,
            success = outcome.success,
            evaluated = evaluated.len(),
            short_circuited,
            "Validated plan"
        );

        Ok(ValidationReport {
            outcome,
            rule_results,
            evaluated,
            short_circuited,
        })
    }

    fn ordered(&self) -> Vec<RegisteredRule> {
        let mut rules: Vec<RegisteredRule> = self.rules.iter().map(|e| e.value().clone()).collect();
        rules.sort_by_key(|r| (std::cmp::Reverse(r.rule.priority()), r.order));
        rules
    }

    async fn evaluate_rule(
        &self,
        entry: &RegisteredRule,
        plan: &RemediationPlan,
        context: &ErrorContext,
    ) -> ValidationResult {
        let rule = &entry.rule;
        let key = rule.is_cacheable().then(|| CacheKey {
            rule: rule.name().to_string(),
            generation: entry.generation,
            plan: plan.id,
            context: context.correlation_id,
        });

        if let Some(key) = &key {
            if let Some(hit) = self.cache.get(key).await {
                return hit.result.from_cache();
            }
        }

        let started = Instant::now();
        match rule.evaluate(plan, context).await {
            Ok(result) => {
                let result = result.with_rule(rule.name()).with_duration(started.elapsed());
                if let Some(key) = key {
                    self.cache
                        .insert(
                            key,
                            CachedResult {
                                result: result.clone(),
                                ttl: rule.cache_ttl(),
                            },
                        )
                        .await;
                }
                result
            }
            Err(e) => {
                tracing::warn!(
                    correlation_id = %context.correlation_id,
                    plan_id = %plan.id,
                    rule = rule.name(),
                    error = %e,
                    "Validation rule errored"
                );
                ValidationResult::fail(ValidationLevel::Error, format!("{}: {e}", rule.name()))
                    .with_rule(rule.name())
                    .with_duration(started.elapsed())
            }
        }
    }
}

fn aggregate(results: &[ValidationResult], elapsed: Duration) -> ValidationResult {
    let success = results.iter().all(|r| r.success);
    let level = results.iter().map(|r| r.level).max().unwrap_or_default();
    let messages: Vec<String> = results.iter().flat_map(|r| r.messages.iter().cloned()).collect();

    let message = if results.is_empty() {
        "no validation rules registered".to_string()
    } else if success {
        format!("{} rules passed", results.len())
    } else {
        results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    };

    ValidationResult {
        success,
        message,
        level,
        rule: None,
        messages,
        is_from_cache: false,
        duration: elapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuleError;
    use async_trait::async_trait;
    use remedy_test_utils::{context, plan_for};
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug)]
    struct Counting {
        name: &'static str,
        priority: u8,
        pass: bool,
        cacheable: bool,
        ttl: Duration,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl Counting {
        fn new(name: &'static str, priority: u8, pass: bool) -> Self {
            Self {
                name,
                priority,
                pass,
                cacheable: false,
                ttl: Duration::from_secs(300),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        fn cached(mut self, ttl: Duration) -> Self {
            self.cacheable = true;
            self.ttl = ttl;
            self
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ValidationRule for Counting {
        fn name(&self) -> &str {
            self.name
        }
        fn priority(&self) -> u8 {
            self.priority
        }
        fn is_cacheable(&self) -> bool {
            self.cacheable
        }
        fn cache_ttl(&self) -> Duration {
            self.ttl
        }
        async fn evaluate(&self, _plan: &RemediationPlan, _context: &ErrorContext) -> Result<ValidationResult, RuleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(if self.pass {
                ValidationResult::pass(format!("{} ok", self.name))
            } else {
                ValidationResult::fail(ValidationLevel::Error, format!("{} failed", self.name))
            })
        }
    }

    #[derive(Debug)]
    struct Broken;

    #[async_trait]
    impl ValidationRule for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        fn priority(&self) -> u8 {
            2
        }
        async fn evaluate(&self, _plan: &RemediationPlan, _context: &ErrorContext) -> Result<ValidationResult, RuleError> {
            Err(RuleError::Unavailable("policy service down".to_string()))
        }
    }

    fn fixture() -> (RemediationPlan, ErrorContext) {
        let ctx = context("orders", "Boom", "boom");
        (plan_for(&ctx, Vec::new()), ctx)
    }

    #[tokio::test]
    async fn blocking_failure_short_circuits() {
        let registry = ValidationRegistry::default();
        let r1 = Arc::new(Counting::new("r1", 5, false));
        let r2 = Arc::new(Counting::new("r2", 1, true));
        registry.register(r1.clone()).unwrap();
        registry.register(r2.clone()).unwrap();

        let (plan, ctx) = fixture();
        let report = registry.validate(&plan, &ctx, &ExecutionBudget::unbounded()).await.unwrap();

        assert!(!report.outcome.success);
        assert!(report.short_circuited);
        assert_eq!(report.evaluated, vec!["r1"]);
        assert_eq!(report.outcome.message, "r1 failed");
        assert_eq!(r1.calls(), 1);
        assert_eq!(r2.calls(), 0);
    }

    #[tokio::test]
    async fn advisory_failures_are_collected() {
        let registry = ValidationRegistry::default();
        registry.register(Arc::new(Counting::new("gate", 4, true))).unwrap();
        registry.register(Arc::new(Counting::new("advice-a", 3, false))).unwrap();
        registry.register(Arc::new(Counting::new("advice-b", 1, false))).unwrap();

        let (plan, ctx) = fixture();
        let report = registry.validate(&plan, &ctx, &ExecutionBudget::unbounded()).await.unwrap();

        assert!(!report.outcome.success);
        assert!(!report.short_circuited);
        assert_eq!(report.evaluated, vec!["gate", "advice-a", "advice-b"]);
        assert_eq!(report.outcome.message, "advice-a failed; advice-b failed");
        assert_eq!(report.outcome.messages.len(), 3);
        assert_eq!(report.outcome.level, ValidationLevel::Error);
    }

    #[tokio::test]
    async fn cacheable_rule_runs_once() {
        let registry = ValidationRegistry::default();
        let rule = Arc::new(Counting::new("cached", 3, true).cached(Duration::from_secs(60)));
        registry.register(rule.clone()).unwrap();

        let (plan, ctx) = fixture();
        let first = registry.validate(&plan, &ctx, &ExecutionBudget::unbounded()).await.unwrap();
        let second = registry.validate(&plan, &ctx, &ExecutionBudget::unbounded()).await.unwrap();

        assert_eq!(rule.calls(), 1);
        let a = first.result_for("cached").unwrap();
        let b = second.result_for("cached").unwrap();
        assert!(!a.is_from_cache);
        assert!(b.is_from_cache);
        assert_eq!(&b.clone().with_duration(a.duration), &a.clone().from_cache());
    }

    #[tokio::test]
    async fn cache_is_keyed_by_plan_and_context() {
        let registry = ValidationRegistry::default();
        let rule = Arc::new(Counting::new("cached", 3, true).cached(Duration::from_secs(60)));
        registry.register(rule.clone()).unwrap();

        let (plan, ctx) = fixture();
        let other_ctx = context("billing", "Boom", "boom");
        let other_plan = plan_for(&ctx, Vec::new());
        let budget = ExecutionBudget::unbounded();

        registry.validate(&plan, &ctx, &budget).await.unwrap();
        registry.validate(&plan, &other_ctx, &budget).await.unwrap();
        registry.validate(&other_plan, &ctx, &budget).await.unwrap();
        assert_eq!(rule.calls(), 3);
    }

    #[tokio::test]
    async fn non_cacheable_rule_runs_every_time() {
        let registry = ValidationRegistry::default();
        let rule = Arc::new(Counting::new("fresh", 3, true));
        registry.register(rule.clone()).unwrap();

        let (plan, ctx) = fixture();
        for _ in 0..3 {
            registry.validate(&plan, &ctx, &ExecutionBudget::unbounded()).await.unwrap();
        }
        assert_eq!(rule.calls(), 3);
    }

    #[tokio::test]
    async fn replacing_a_rule_bypasses_its_cache() {
        let registry = ValidationRegistry::default();
        let old = Arc::new(Counting::new("r", 3, true).cached(Duration::from_secs(60)));
        let new = Arc::new(Counting::new("r", 3, false).cached(Duration::from_secs(60)));
        let (plan, ctx) = fixture();
        let budget = ExecutionBudget::unbounded();

        registry.register(old.clone()).unwrap();
        registry.validate(&plan, &ctx, &budget).await.unwrap();
        registry.register(new.clone()).unwrap();
        let report = registry.validate(&plan, &ctx, &budget).await.unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(new.calls(), 1);
        assert!(!report.outcome.success);
    }

    #[tokio::test]
    async fn rule_errors_become_failed_results() {
        let registry = ValidationRegistry::default();
        registry.register(Arc::new(Broken)).unwrap();
        registry.register(Arc::new(Counting::new("after", 1, true))).unwrap();

        let (plan, ctx) = fixture();
        let report = registry.validate(&plan, &ctx, &ExecutionBudget::unbounded()).await.unwrap();

        let broken = report.result_for("broken").unwrap();
        assert!(!broken.success);
        assert_eq!(broken.level, ValidationLevel::Error);
        assert_eq!(report.evaluated, vec!["broken", "after"]);
    }

    #[test]
    fn priority_out_of_range_is_rejected() {
        let registry = ValidationRegistry::default();
        assert!(matches!(
            registry.register(Arc::new(Counting::new("zero", 0, true))),
            Err(ValidationError::InvalidPriority { priority: 0, .. })
        ));
        assert!(registry.register(Arc::new(Counting::new("six", 6, true))).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn evaluation_order_is_priority_then_registration() {
        let registry = ValidationRegistry::default();
        registry.register(Arc::new(Counting::new("b", 3, true))).unwrap();
        registry.register(Arc::new(Counting::new("a", 5, true))).unwrap();
        registry.register(Arc::new(Counting::new("c", 3, true))).unwrap();
        registry.register(Arc::new(Counting::new("b", 3, true))).unwrap();

        assert_eq!(registry.rule_names(), vec!["a", "b", "c"]);
        assert!(registry.unregister("a"));
        assert_eq!(registry.rule_names(), vec!["b", "c"]);
    }

    #[tokio::test]
    async fn empty_registry_passes() {
        let (plan, ctx) = fixture();
        let report = ValidationRegistry::default()
            .validate(&plan, &ctx, &ExecutionBudget::unbounded())
            .await
            .unwrap();
        assert!(report.outcome.success);
        assert!(report.evaluated.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_abandons_evaluation() {
        let registry = ValidationRegistry::default();
        registry
            .register(Arc::new(Counting::new("slow", 3, true).slow(Duration::from_secs(30))))
            .unwrap();

        let (plan, ctx) = fixture();
        let err = registry
            .validate(&plan, &ctx, &ExecutionBudget::with_timeout(Duration::from_secs(1)))
            .await
            .unwrap_err();
        assert_eq!(err, ValidationError::TimedOut);
    }

    #[tokio::test]
    async fn cancellation_is_reported() {
        let registry = ValidationRegistry::default();
        registry.register(Arc::new(Counting::new("any", 3, true))).unwrap();
        let budget = ExecutionBudget::unbounded();
        budget.cancel();

        let (plan, ctx) = fixture();
        assert_eq!(
            registry.validate(&plan, &ctx, &budget).await.unwrap_err(),
            ValidationError::Cancelled
        );
    }
}
