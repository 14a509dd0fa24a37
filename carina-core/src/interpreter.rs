//! Interpreter - Execute Effects using a Provider
//!
//! The Interpreter executes Effects contained in a Plan in order,
//! collecting the results. This is where side effects actually occur.

use crate::effect::Effect;
use crate::plan::Plan;
use crate::provider::{Provider, ProviderError, ProviderResult};
use crate::resource::{ResourceId, State};

/// Result of executing each Effect
#[derive(Debug)]
pub enum EffectOutcome {
    /// Create succeeded
    Created { state: State },
    /// Update succeeded
    Updated { state: State },
    /// Replace succeeded (old resource deleted, new one created)
    Replaced { state: State },
    /// Delete succeeded
    Deleted { id: ResourceId },
    /// Skipped (e.g., dry-run)
    Skipped { id: ResourceId, reason: String },
}

/// Result of executing the entire Plan
#[derive(Debug)]
pub struct ApplyResult {
    pub outcomes: Vec<Result<EffectOutcome, ProviderError>>,
    pub success_count: usize,
    pub failure_count: usize,
}

impl ApplyResult {
    pub fn is_success(&self) -> bool {
        self.failure_count == 0
    }
}

/// Interpreter configuration
#[derive(Debug, Clone, Default)]
pub struct InterpreterConfig {
    /// If true, skip actual side effects
    pub dry_run: bool,
    /// Continue on error
    pub continue_on_error: bool,
}

/// Interpreter that executes Effects using a Provider
pub struct Interpreter<P: Provider> {
    provider: P,
    config: InterpreterConfig,
}

impl<P: Provider> Interpreter<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            config: InterpreterConfig::default(),
        }
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Execute a Plan, interpreting all Effects and causing side effects
    pub async fn apply(&self, plan: &Plan) -> ApplyResult {
        let mut outcomes = Vec::new();
        let mut success_count = 0;
        let mut failure_count = 0;

        for effect in plan.effects() {
            log::debug!("Executing {} on {}", effect.kind(), effect.resource_id());
            let result = self
                .execute_effect(effect)
                .await
                .map_err(|e| {
                    if e.resource_id.is_some() {
                        e
                    } else {
                        e.for_resource(effect.resource_id().clone())
                    }
                });

            match &result {
                Ok(_) => success_count += 1,
                Err(_) => {
                    failure_count += 1;
                    if !self.config.continue_on_error {
                        outcomes.push(result);
                        break;
                    }
                }
            }

            outcomes.push(result);
        }

        ApplyResult {
            outcomes,
            success_count,
            failure_count,
        }
    }

    /// Execute a single Effect
    async fn execute_effect(&self, effect: &Effect) -> ProviderResult<EffectOutcome> {
        if self.config.dry_run {
            return Ok(EffectOutcome::Skipped {
                id: effect.resource_id().clone(),
                reason: "dry-run mode".to_string(),
            });
        }

        match effect {
            Effect::Create(resource) => {
                let state = self.provider.create(resource).await?;
                Ok(EffectOutcome::Created { state })
            }
            Effect::Update { id, from, to } => {
                let identifier = from.identifier.as_deref().ok_or_else(|| {
                    ProviderError::new("Cannot update a resource without an identifier")
                        .for_resource(id.clone())
                })?;
                let state = self.provider.update(id, identifier, from, to).await?;
                Ok(EffectOutcome::Updated { state })
            }
            Effect::Replace { from, to, .. } => {
                if let Some(identifier) = from.identifier.as_deref() {
                    self.provider.delete(&from.id, identifier).await?;
                }
                let state = self.provider.create(to).await?;
                Ok(EffectOutcome::Replaced { state })
            }
            Effect::Delete { id, identifier } => {
                self.provider.delete(id, identifier).await?;
                Ok(EffectOutcome::Deleted { id: id.clone() })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{BoxFuture, ResourceType};
    use crate::resource::Resource;
    use std::sync::Mutex;

    #[derive(Default)]
    struct TestProvider {
        calls: Mutex<Vec<String>>,
        fail_delete: bool,
    }

    impl TestProvider {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl Provider for TestProvider {
        fn name(&self) -> &'static str {
            "test"
        }

        fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
            vec![]
        }

        fn read(&self, prior: &State) -> BoxFuture<'_, ProviderResult<State>> {
            let id = prior.id.clone();
            Box::pin(async move { Ok(State::not_found(id)) })
        }

        fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
            self.record(format!("create {}", resource.id));
            let state = State::existing(resource.id.clone(), resource.attributes.clone())
                .with_identifier("test-id");
            Box::pin(async move { Ok(state) })
        }

        fn update(
            &self,
            id: &ResourceId,
            _identifier: &str,
            _from: &State,
            to: &Resource,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            self.record(format!("update {}", id));
            let state = State::existing(id.clone(), to.attributes.clone());
            Box::pin(async move { Ok(state) })
        }

        fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
            self.record(format!("delete {} {}", id, identifier));
            let fail = self.fail_delete;
            Box::pin(async move {
                if fail {
                    Err(ProviderError::new("delete failed"))
                } else {
                    Ok(())
                }
            })
        }
    }

    #[tokio::test]
    async fn apply_empty_plan() {
        let interpreter = Interpreter::new(TestProvider::default());
        let plan = Plan::new();
        let result = interpreter.apply(&plan).await;

        assert!(result.is_success());
        assert_eq!(result.success_count, 0);
    }

    #[tokio::test]
    async fn apply_create_effect() {
        let interpreter = Interpreter::new(TestProvider::default());
        let mut plan = Plan::new();
        plan.add(Effect::Create(Resource::new("test", "example")));

        let result = interpreter.apply(&plan).await;

        assert!(result.is_success());
        assert_eq!(result.success_count, 1);
    }

    #[tokio::test]
    async fn replace_deletes_before_creating() {
        let interpreter = Interpreter::new(TestProvider::default());
        let id = ResourceId::new("test", "example");
        let mut plan = Plan::new();
        plan.add(Effect::Replace {
            from: State::existing(id.clone(), Default::default()).with_identifier("/old"),
            to: Resource::new("test", "example"),
            forcing: vec!["hostname".to_string()],
        });

        let result = interpreter.apply(&plan).await;

        assert!(result.is_success());
        assert!(matches!(
            result.outcomes[0],
            Ok(EffectOutcome::Replaced { .. })
        ));
        assert_eq!(
            *interpreter.provider().calls.lock().unwrap(),
            vec![
                "delete test.example /old".to_string(),
                "create test.example".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn stops_on_first_failure() {
        let provider = TestProvider {
            fail_delete: true,
            ..Default::default()
        };
        let interpreter = Interpreter::new(provider);
        let mut plan = Plan::new();
        plan.add(Effect::Delete {
            id: ResourceId::new("test", "a"),
            identifier: "/a".to_string(),
        });
        plan.add(Effect::Create(Resource::new("test", "b")));

        let result = interpreter.apply(&plan).await;

        assert!(!result.is_success());
        assert_eq!(result.outcomes.len(), 1);
        let err = result.outcomes[0].as_ref().unwrap_err();
        assert_eq!(err.to_string(), "[test.a] delete failed");
    }

    #[tokio::test]
    async fn dry_run_skips_effects() {
        let config = InterpreterConfig {
            dry_run: true,
            ..Default::default()
        };
        let interpreter = Interpreter::new(TestProvider::default()).with_config(config);
        let mut plan = Plan::new();
        plan.add(Effect::Create(Resource::new("test", "example")));

        let result = interpreter.apply(&plan).await;

        assert!(result.is_success());
        assert!(matches!(
            result.outcomes[0],
            Ok(EffectOutcome::Skipped { .. })
        ));
        assert!(interpreter.provider().calls.lock().unwrap().is_empty());
    }
}
