use std::sync::Arc;

use soonish_db::encryption::Cipher;
use soonish_db::model::{Integration, IntegrationType, Subscription, SubscriptionWithUser};
use soonish_db::repository;
use soonish_notifier::converters::IntegrationConfig;
use soonish_notifier::{EmailDriver, Level, Registry};
use soonish_shared::Result;
use sqlx::SqlitePool;
use tokio::sync::Semaphore;

use crate::fallback::FallbackConfig;
use crate::resolver::{self, Endpoint};

const DEFAULT_SUBSCRIPTION_CONCURRENCY: usize = 8;
const DEFAULT_EVENT_CONCURRENCY: usize = 32;

/// Outcome of a single `dispatch_to_subscription` call (§4.5).
#[derive(Debug, Clone, Default)]
pub struct SubscriptionReport {
    pub success: usize,
    pub failed: usize,
    pub channels: Vec<String>,
    pub errors: Vec<String>,
}

/// A single subscriber's row in an event broadcast's aggregate report.
#[derive(Debug, Clone)]
pub struct SubscriberDetail {
    pub user_id: String,
    pub status: DeliveryStatus,
    pub channels: Vec<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Success,
    Failed,
}

/// Outcome of a `dispatch_to_event` broadcast (§4.5).
#[derive(Debug, Clone, Default)]
pub struct EventReport {
    pub total_subscribers: usize,
    pub success: usize,
    pub failed: usize,
    pub details: Vec<SubscriberDetail>,
}

/// `CreateIntegration`'s input (§6): a typed per-channel config, converted to
/// an opaque `delivery_url` and encrypted before it ever reaches C2.
pub struct CreateIntegrationInput {
    pub user_id: String,
    pub name: String,
    pub tag: String,
    pub config: IntegrationConfig,
}

/// Outcome of `TestIntegration` (§6): never a hard error for a delivery
/// failure, since a bad integration config is exactly what the caller is
/// trying to discover by testing it.
#[derive(Debug, Clone)]
pub struct TestOutcome {
    pub success: bool,
    pub message: String,
    pub error: Option<String>,
}

fn integration_type(config: &IntegrationConfig) -> IntegrationType {
    match config {
        IntegrationConfig::Gotify(_) => IntegrationType::Gotify,
        IntegrationConfig::Email(_) => IntegrationType::Email,
        IntegrationConfig::Ntfy(_) => IntegrationType::Ntfy,
        IntegrationConfig::Discord(_) => IntegrationType::Discord,
        IntegrationConfig::Slack(_) => IntegrationType::Slack,
    }
}

/// C5 Fan-out Dispatcher. Holds the process-wide cipher and notifier
/// registry (§5 Shared-resource policy: built once, never rotated).
pub struct Dispatcher {
    pool: SqlitePool,
    cipher: Cipher,
    registry: Registry,
    fallback: FallbackConfig,
    subscription_concurrency: usize,
    event_concurrency: usize,
}

impl Dispatcher {
    pub fn new(pool: SqlitePool, cipher: Cipher, fallback: FallbackConfig) -> Self {
        Self {
            pool,
            cipher,
            registry: Registry::new(EmailDriver),
            fallback,
            subscription_concurrency: DEFAULT_SUBSCRIPTION_CONCURRENCY,
            event_concurrency: DEFAULT_EVENT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, subscription: usize, event: usize) -> Self {
        self.subscription_concurrency = subscription.max(1);
        self.event_concurrency = event.max(1);
        self
    }

    /// `CreateIntegration` (§6): converts the typed config to a
    /// `delivery_url` via its per-type converter, then `get_or_create`s the
    /// row so resubmitting the same (user_id, name, tag) is a no-op rather
    /// than a duplicate.
    pub async fn create_integration(&self, input: CreateIntegrationInput) -> Result<(Integration, bool)> {
        let delivery_url = input
            .config
            .to_delivery_url()
            .map_err(|e| soonish_shared::Error::User(e.to_string()))?;
        let config_json = serde_json::to_string(&input.config)
            .map_err(|e| soonish_shared::Error::Server(anyhow::anyhow!(e)))?;

        repository::integration::get_or_create(
            &self.pool,
            &self.cipher,
            repository::integration::CreateInput {
                user_id: input.user_id,
                name: input.name,
                tag: input.tag,
                kind: integration_type(&input.config),
                delivery_url,
                config: config_json,
            },
        )
        .await
    }

    /// `TestIntegration` (§6): a single synchronous send through C4 against
    /// exactly this integration, bypassing C3 selector resolution entirely.
    /// A delivery failure is reported in the outcome, never propagated as a
    /// hard error — that's the whole point of testing the integration.
    pub async fn test_integration(
        &self,
        integration_id: &str,
        title: Option<&str>,
        body: Option<&str>,
    ) -> Result<TestOutcome> {
        let integration = repository::integration::by_id(&self.pool, integration_id)
            .await?
            .ok_or_else(|| soonish_shared::Error::NotFound(format!("integration {integration_id}")))?;

        let delivery_url = self.cipher.decrypt(&integration.delivery_url)?;
        let title = title.unwrap_or("Test Notification");
        let default_body = format!("This is a test notification from your '{}' integration.", integration.name);
        let body = body.unwrap_or(&default_body);

        match self.registry.send(&delivery_url, title, body, Level::Info).await {
            Ok(outcome) => Ok(TestOutcome {
                success: true,
                message: format!("test notification sent via {}", outcome.channel_name),
                error: None,
            }),
            Err(err) => Ok(TestOutcome {
                success: false,
                message: "failed to send test notification".to_string(),
                error: Some(err.to_string()),
            }),
        }
    }

    /// Personal reminders: resolves via C3 with no fallback. An empty
    /// endpoint set is reported as a single failure rather than silently
    /// succeeding, since the subscriber explicitly configured selectors.
    pub async fn dispatch_to_subscription(
        &self,
        subscription_id: &str,
        title: &str,
        body: &str,
        level: Level,
    ) -> Result<SubscriptionReport> {
        let subscription = repository::subscription::by_id(&self.pool, subscription_id)
            .await?
            .ok_or_else(|| soonish_shared::Error::NotFound(format!("subscription {subscription_id}")))?;

        let endpoints = resolver::resolve(&self.pool, &self.cipher, &subscription).await?;

        if endpoints.is_empty() {
            return Ok(SubscriptionReport {
                success: 0,
                failed: 1,
                channels: vec![],
                errors: vec!["no channels".into()],
            });
        }

        Ok(self
            .send_all(&endpoints, title, body, level, self.subscription_concurrency)
            .await)
    }

    /// Broadcasts: loads every subscription of the event in a single eager
    /// query, resolves each independently, and falls back to email only for
    /// subscribers with no selectors at all (§4.5). One subscriber's
    /// failure never aborts another's send.
    pub async fn dispatch_to_event(
        &self,
        event_id: &str,
        title: &str,
        body: &str,
        level: Level,
        selector_tags: Option<&[String]>,
    ) -> Result<EventReport> {
        let subscriptions = repository::subscription::by_event(&self.pool, event_id).await?;
        let total_subscribers = subscriptions.len();
        let semaphore = Arc::new(Semaphore::new(self.event_concurrency));

        let tasks = subscriptions
            .into_iter()
            .map(|with_user| {
                let semaphore = semaphore.clone();
                async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .expect("dispatcher semaphore is never closed");
                    self.dispatch_one_subscriber(with_user, title, body, level, selector_tags)
                        .await
                }
            })
            .collect::<Vec<_>>();

        let details = futures::future::join_all(tasks).await;

        let mut report = EventReport {
            total_subscribers,
            ..Default::default()
        };
        for detail in details {
            match detail.status {
                DeliveryStatus::Success => report.success += 1,
                DeliveryStatus::Failed => report.failed += 1,
            }
            report.details.push(detail);
        }

        Ok(report)
    }

    async fn dispatch_one_subscriber(
        &self,
        with_user: SubscriptionWithUser,
        title: &str,
        body: &str,
        level: Level,
        selector_tags: Option<&[String]>,
    ) -> SubscriberDetail {
        let user_id = with_user.user.id.clone();
        let has_selectors = !with_user.subscription.selectors.is_empty();
        let subscription = filtered(with_user.subscription, selector_tags);

        let mut endpoints = resolver::resolve_from(&self.cipher, &subscription, &with_user.integrations);

        if endpoints.is_empty() && !has_selectors {
            endpoints.push(resolver::fallback_endpoint(&self.fallback, &with_user.user));
        }

        if endpoints.is_empty() {
            return SubscriberDetail {
                user_id,
                status: DeliveryStatus::Failed,
                channels: vec![],
                error: Some("no channels".into()),
            };
        }

        let report = self
            .send_all(&endpoints, title, body, level, self.event_concurrency)
            .await;

        if report.failed == 0 {
            SubscriberDetail {
                user_id,
                status: DeliveryStatus::Success,
                channels: report.channels,
                error: None,
            }
        } else {
            SubscriberDetail {
                user_id,
                status: DeliveryStatus::Failed,
                channels: report.channels,
                error: report.errors.first().cloned(),
            }
        }
    }

    async fn send_all(
        &self,
        endpoints: &[Endpoint],
        title: &str,
        body: &str,
        level: Level,
        concurrency: usize,
    ) -> SubscriptionReport {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

        let sends = endpoints
            .iter()
            .map(|endpoint| {
                let semaphore = semaphore.clone();
                async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .expect("dispatcher semaphore is never closed");
                    self.registry.send(&endpoint.delivery_url, title, body, level).await
                }
            })
            .collect::<Vec<_>>();

        let outcomes = futures::future::join_all(sends).await;

        let mut report = SubscriptionReport::default();
        for outcome in outcomes {
            match outcome {
                Ok(ok) => {
                    report.success += 1;
                    report.channels.push(ok.channel_name);
                }
                Err(err) => {
                    report.failed += 1;
                    report.errors.push(err.to_string());
                }
            }
        }

        report
    }
}

/// Restricts a broadcast to a subset of the subscriber's own selectors when
/// `selector_tags` is given; `integration_id` selectors always pass through
/// since they carry no tag to filter on. `None` leaves selectors untouched.
fn filtered(mut subscription: Subscription, selector_tags: Option<&[String]>) -> Subscription {
    if let Some(tags) = selector_tags {
        let normalized: Vec<String> = tags.iter().map(|t| soonish_shared::normalize_tag(t)).collect();
        subscription.selectors.retain(|selector| match &selector.tag {
            Some(tag) => normalized.contains(&soonish_shared::normalize_tag(tag)),
            None => true,
        });
    }
    subscription
}

#[cfg(test)]
mod tests {
    use evento::migrator::{Migrate, Plan};
    use soonish_db::model::SubscriptionSelector;
    use soonish_notifier::converters::{DiscordConfig, GotifyConfig};

    use super::*;

    fn fallback() -> FallbackConfig {
        let profile = SmtpProfile {
            host: "smtp.example.com".into(),
            port: 587,
            username: "svc".into(),
            password: "pw".into(),
            from: "reminders@example.com".into(),
            implicit_tls: false,
        };
        FallbackConfig { default: profile.clone(), verified: profile }
    }

    async fn test_dispatcher() -> Dispatcher {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        soonish_db::migrator::<sqlx::Sqlite>()
            .unwrap()
            .run(&mut *conn, &Plan::apply_all())
            .await
            .unwrap();
        drop(conn);

        Dispatcher::new(pool, Cipher::new(&[9u8; 32]).unwrap(), fallback())
    }

    #[tokio::test]
    async fn create_integration_converts_config_and_encrypts_delivery_url() {
        let dispatcher = test_dispatcher().await;

        let (integration, created) = dispatcher
            .create_integration(CreateIntegrationInput {
                user_id: "user-1".to_string(),
                name: "My Gotify".to_string(),
                tag: "home".to_string(),
                config: IntegrationConfig::Gotify(GotifyConfig {
                    server_url: "https://gotify.example.com".to_string(),
                    token: "tok123".to_string(),
                    priority: None,
                }),
            })
            .await
            .unwrap();

        assert!(created);
        assert_eq!(integration.kind.0, IntegrationType::Gotify);
        assert_eq!(
            dispatcher.cipher.decrypt(&integration.delivery_url).unwrap(),
            "gotifys://gotify.example.com/tok123"
        );
    }

    #[tokio::test]
    async fn create_integration_is_idempotent_on_same_name_and_tag() {
        let dispatcher = test_dispatcher().await;
        let config = || {
            IntegrationConfig::Discord(DiscordConfig {
                webhook_url: "https://discord.com/api/webhooks/1/abc".to_string(),
            })
        };

        let (first, first_created) = dispatcher
            .create_integration(CreateIntegrationInput {
                user_id: "user-1".to_string(),
                name: "Ops Channel".to_string(),
                tag: "ops".to_string(),
                config: config(),
            })
            .await
            .unwrap();
        let (second, second_created) = dispatcher
            .create_integration(CreateIntegrationInput {
                user_id: "user-1".to_string(),
                name: "Ops Channel".to_string(),
                tag: "ops".to_string(),
                config: config(),
            })
            .await
            .unwrap();

        assert!(first_created);
        assert!(!second_created);
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn create_integration_rejects_malformed_typed_config() {
        let dispatcher = test_dispatcher().await;

        let result = dispatcher
            .create_integration(CreateIntegrationInput {
                user_id: "user-1".to_string(),
                name: "Broken".to_string(),
                tag: "broken".to_string(),
                config: IntegrationConfig::Discord(DiscordConfig {
                    webhook_url: "https://discord.com/api/not-a-webhook".to_string(),
                }),
            })
            .await;

        assert!(matches!(result, Err(soonish_shared::Error::User(_))));
    }

    #[tokio::test]
    async fn test_integration_reports_missing_integration_as_not_found() {
        let dispatcher = test_dispatcher().await;

        let result = dispatcher.test_integration("no-such-integration", None, None).await;

        assert!(matches!(result, Err(soonish_shared::Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_integration_reports_send_failure_without_erroring() {
        let dispatcher = test_dispatcher().await;
        let id = repository::integration::create(
            &dispatcher.pool,
            &dispatcher.cipher,
            repository::integration::CreateInput {
                user_id: "user-1".to_string(),
                name: "Unsupported".to_string(),
                tag: "home".to_string(),
                kind: IntegrationType::Gotify,
                delivery_url: "xmpp://example.com/unsupported".to_string(),
                config: "{}".to_string(),
            },
        )
        .await
        .unwrap();

        let outcome = dispatcher.test_integration(&id, None, None).await.unwrap();

        assert!(!outcome.success);
        assert!(outcome.error.is_some());
    }

    #[test]
    fn filtered_keeps_integration_selectors_and_matching_tags() {
        let subscription = Subscription {
            id: "s1".into(),
            event_id: "e1".into(),
            user_id: "u1".into(),
            created_at: 0,
            selectors: vec![
                SubscriptionSelector {
                    id: "a".into(),
                    subscription_id: "s1".into(),
                    integration_id: Some("i1".into()),
                    tag: None,
                },
                SubscriptionSelector {
                    id: "b".into(),
                    subscription_id: "s1".into(),
                    integration_id: None,
                    tag: Some("urgent".into()),
                },
                SubscriptionSelector {
                    id: "c".into(),
                    subscription_id: "s1".into(),
                    integration_id: None,
                    tag: Some("digest".into()),
                },
            ],
            reminder_offsets: vec![],
        };

        let result = filtered(subscription, Some(&["Urgent".to_string()]));
        assert_eq!(result.selectors.len(), 2);
        assert!(result.selectors.iter().any(|s| s.integration_id.as_deref() == Some("i1")));
        assert!(result.selectors.iter().any(|s| s.tag.as_deref() == Some("urgent")));
    }

    #[test]
    fn filtered_is_noop_without_tags() {
        let subscription = Subscription {
            id: "s1".into(),
            event_id: "e1".into(),
            user_id: "u1".into(),
            created_at: 0,
            selectors: vec![SubscriptionSelector {
                id: "a".into(),
                subscription_id: "s1".into(),
                integration_id: None,
                tag: Some("digest".into()),
            }],
            reminder_offsets: vec![],
        };

        assert_eq!(filtered(subscription.clone(), None).selectors.len(), subscription.selectors.len());
    }
}
