use std::collections::HashSet;

use soonish_db::encryption::Cipher;
use soonish_db::model::{Integration, Subscription, User};
use soonish_db::repository;
use soonish_shared::Result;
use sqlx::SqlitePool;

use crate::fallback::FallbackConfig;

/// One concrete delivery target produced by resolving a subscription's
/// selectors against its owner's integrations (§4.3 C3).
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub integration_id: Option<String>,
    pub delivery_url: String,
    pub tag: Option<String>,
}

/// Loads the subscriber's integrations and resolves against them (§4.3
/// steps 1-4). For call sites already holding an eager-loaded integration
/// set (`by_event`'s join), use [`resolve_from`] to avoid the round trip.
pub async fn resolve(
    pool: &SqlitePool,
    cipher: &Cipher,
    subscription: &Subscription,
) -> Result<Vec<Endpoint>> {
    let integrations = repository::integration::by_user(pool, &subscription.user_id, true).await?;
    Ok(resolve_from(cipher, subscription, &integrations))
}

/// Union of `integration_id` selectors and `tag` selectors, restricted to
/// integrations owned by the subscriber and currently active, deduplicated
/// by integration id before decryption — 50 selectors mapping to the same
/// integration still yield exactly one endpoint. A per-integration decrypt
/// failure drops only that endpoint; it never aborts the others.
pub fn resolve_from(cipher: &Cipher, subscription: &Subscription, integrations: &[Integration]) -> Vec<Endpoint> {
    let mut ids: HashSet<&str> = HashSet::new();

    for selector in &subscription.selectors {
        if let Some(integration_id) = selector.integration_id.as_deref() {
            if integrations.iter().any(|i| i.id == integration_id && i.is_active) {
                ids.insert(integration_id);
            }
        }
    }

    for selector in &subscription.selectors {
        if let Some(tag) = selector.tag.as_deref() {
            let normalized = soonish_shared::normalize_tag(tag);
            for integration in integrations.iter().filter(|i| i.is_active && i.tag == normalized) {
                ids.insert(integration.id.as_str());
            }
        }
    }

    integrations
        .iter()
        .filter(|i| ids.contains(i.id.as_str()))
        .filter_map(|integration| match cipher.decrypt(&integration.delivery_url) {
            Ok(delivery_url) => Some(Endpoint {
                integration_id: Some(integration.id.clone()),
                delivery_url,
                tag: Some(integration.tag.clone()),
            }),
            Err(e) => {
                tracing::warn!(
                    integration_id = %integration.id,
                    error = %e,
                    "failed to decrypt integration delivery_url, dropping endpoint"
                );
                None
            }
        })
        .collect()
}

/// Synthesizes the single fallback endpoint from the user's own email and
/// the service-level SMTP profile matching their verification state (§4.3
/// Fallback, Scenario E). Bypasses selectors entirely.
pub fn fallback_endpoint(config: &FallbackConfig, user: &User) -> Endpoint {
    let profile = config.profile_for(user.is_verified);
    Endpoint {
        integration_id: None,
        delivery_url: profile.mailto_url(&user.email),
        tag: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soonish_db::model::{IntegrationType, SubscriptionSelector};

    fn cipher() -> Cipher {
        Cipher::new(&[3u8; 32]).unwrap()
    }

    fn integration(cipher: &Cipher, id: &str, tag: &str, active: bool, url: &str) -> Integration {
        Integration {
            id: id.into(),
            user_id: "u1".into(),
            name: "n".into(),
            tag: tag.into(),
            is_active: active,
            kind: sqlx::types::Text(IntegrationType::Gotify),
            delivery_url: cipher.encrypt(url).unwrap(),
            config: vec![],
            created_at: 0,
        }
    }

    fn subscription(selectors: Vec<SubscriptionSelector>) -> Subscription {
        Subscription {
            id: "s1".into(),
            event_id: "e1".into(),
            user_id: "u1".into(),
            created_at: 0,
            selectors,
            reminder_offsets: vec![],
        }
    }

    #[test]
    fn dedups_integration_reachable_via_many_tag_selectors() {
        let cipher = cipher();
        let integrations = vec![integration(&cipher, "i1", "home", true, "gotify://h/t")];
        let selectors = (0..50)
            .map(|_| SubscriptionSelector {
                id: "sel".into(),
                subscription_id: "s1".into(),
                integration_id: None,
                tag: Some("Home".into()),
            })
            .collect();

        let endpoints = resolve_from(&cipher, &subscription(selectors), &integrations);
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].delivery_url, "gotify://h/t");
    }

    #[test]
    fn inactive_integration_is_excluded() {
        let cipher = cipher();
        let integrations = vec![integration(&cipher, "i1", "home", false, "gotify://h/t")];
        let selectors = vec![SubscriptionSelector {
            id: "sel".into(),
            subscription_id: "s1".into(),
            integration_id: Some("i1".into()),
            tag: None,
        }];

        let endpoints = resolve_from(&cipher, &subscription(selectors), &integrations);
        assert!(endpoints.is_empty());
    }

    #[test]
    fn integration_owned_by_another_user_via_stale_selector_is_ignored() {
        let cipher = cipher();
        let integrations = vec![integration(&cipher, "i1", "home", true, "gotify://h/t")];
        let selectors = vec![SubscriptionSelector {
            id: "sel".into(),
            subscription_id: "s1".into(),
            integration_id: Some("missing".into()),
            tag: None,
        }];

        let endpoints = resolve_from(&cipher, &subscription(selectors), &integrations);
        assert!(endpoints.is_empty());
    }

    #[test]
    fn decrypt_failure_drops_only_that_endpoint() {
        let cipher = cipher();
        let wrong_cipher = Cipher::new(&[9u8; 32]).unwrap();
        let mut bad = integration(&wrong_cipher, "i1", "home", true, "gotify://h/t");
        let good = integration(&cipher, "i2", "home", true, "ntfy://h/topic");
        bad.tag = "home".into();

        let selectors = vec![SubscriptionSelector {
            id: "sel".into(),
            subscription_id: "s1".into(),
            integration_id: None,
            tag: Some("home".into()),
        }];

        let endpoints = resolve_from(&cipher, &subscription(selectors), &[bad, good]);
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].integration_id.as_deref(), Some("i2"));
    }
}
