//! The periodic reconciliation driver (C7). See spec §4.2.
//!
//! Grounded on the upstream backfill worker's claim/checkpoint loop shape:
//! fan out over independent units of work, step each one, log and move on
//! when a single unit fails rather than aborting the batch. Here the unit
//! is "one reviewer's in-flight reviews plus their newly ingested
//! bookings," generalized from backfill's single queue to one queue per
//! active reviewer.

mod intents;

use std::sync::Arc;
use std::time::Duration;

use guard_clock::Clock;
use guard_core::step;
use guard_core::StepInputs;
use guard_core::StepOutcome;
use guard_protocol::Reviewer;
use guard_protocol::ReviewRequest;
use guard_protocol::ReviewerSettings;
use guard_store::StoreRuntime;
use guard_vault::TokenVault;
use intents::execute_intent;
use intents::into_transition_patch;
use intents::IntentContext;
use intents::IntentOutcome;
use tokio::sync::watch;
use tokio::task::JoinSet;

/// Per-call timeout applied to every outbound adapter call. See spec §5.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything the driver needs to run one tick. Cheap to clone: the store's
/// pool, the vault, and the chat client are all internally `Arc`-backed.
#[derive(Clone)]
pub struct Reconciler {
    store: StoreRuntime,
    vault: Arc<TokenVault>,
    chat: guard_chat::Client,
    school_base_url: String,
    clock: Arc<dyn Clock>,
    metrics: guard_otel::GuardMetrics,
    call_timeout: Duration,
}

impl Reconciler {
    pub fn new(
        store: StoreRuntime,
        vault: Arc<TokenVault>,
        chat: guard_chat::Client,
        school_base_url: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            vault,
            chat,
            school_base_url: school_base_url.into(),
            clock,
            metrics: guard_otel::GuardMetrics::new(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Run one full tick: load active reviewers, fan out across them in
    /// parallel, and wait for every reviewer's work to finish. A single
    /// reviewer's failure is logged and never fails the tick as a whole.
    pub async fn run_tick(&self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let reviewers = self.store.list_active_reviewers().await?;
        self.metrics.counter("reconcile.tick.reviewers", reviewers.len() as i64, &[]);

        let mut set = JoinSet::new();
        for reviewer in reviewers {
            if *shutdown.borrow_and_update() {
                tracing::info!("shutdown requested, not starting further reviewer fan-out this tick");
                break;
            }
            let this = self.clone();
            let shutdown = shutdown.clone();
            set.spawn(async move { this.reconcile_reviewer(reviewer, shutdown).await });
        }

        while let Some(result) = set.join_next().await {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::warn!(error = %err, "reviewer reconciliation failed"),
                Err(join_err) => tracing::warn!(error = %join_err, "reviewer reconciliation task panicked"),
            }
        }
        Ok(())
    }

    async fn reconcile_reviewer(&self, reviewer: Reviewer, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let settings = self
            .store
            .get_reviewer_settings(&reviewer.login)
            .await?
            .unwrap_or_else(ReviewerSettings::defaults);
        let whitelist = self.store.list_whitelist(&reviewer.login).await?;
        let mut family_index = self.store.get_family_index(&reviewer.login).await?;

        let school = self.school_client_for(&reviewer).await?;
        let ctx = IntentContext {
            school: &school,
            chat: &self.chat,
            store: &self.store,
            clock: self.clock.as_ref(),
            call_timeout: self.call_timeout,
        };

        let open_reviews = self.store.list_open_reviews(&reviewer.login).await?;
        for review in open_reviews {
            if *shutdown.borrow() {
                break;
            }
            self.step_review(&ctx, &reviewer, &review, settings, &whitelist, &mut family_index).await;
        }

        self.ingest_bookings(&ctx, &reviewer).await?;
        Ok(())
    }

    async fn school_client_for(&self, reviewer: &Reviewer) -> anyhow::Result<guard_school::Client> {
        let bundle = self
            .vault
            .get(&reviewer.login)
            .await?
            .ok_or_else(|| anyhow::anyhow!("no tokens vaulted for {}", reviewer.login))?;
        Ok(guard_school::Client::new(self.school_base_url.clone()).with_bearer_token(bundle.access_token))
    }

    /// Step one review and commit the result, re-fetching a fresh family
    /// index and retrying once in the same tick if the machine asked for a
    /// refresh. See spec §4.1's `UNKNOWN_PROJECT_REVIEW` lazy-index rule.
    async fn step_review(
        &self,
        ctx: &IntentContext<'_>,
        reviewer: &Reviewer,
        review: &ReviewRequest,
        settings: ReviewerSettings,
        whitelist: &[guard_protocol::WhitelistEntry],
        family_index: &mut guard_protocol::ProjectFamilyIndex,
    ) {
        let resolved_project_name = if let Some(project_name) = review.project_name.clone() {
            Some(project_name)
        } else if let Some(notification_id) = &review.notification_id {
            self.resolve_notification_project_name(ctx, notification_id).await
        } else {
            None
        };

        let outcome = step(StepInputs {
            review,
            reviewer,
            settings,
            now: self.clock.now(),
            whitelist,
            family_index,
            resolved_project_name: resolved_project_name.clone(),
            decision: None,
            callback_id: String::new(),
        });

        let refreshed = self.apply_outcome(ctx, review, outcome).await;
        if refreshed {
            if let Ok(fresh_index) = self.store.get_family_index(&reviewer.login).await {
                *family_index = fresh_index;
                let retried = step(StepInputs {
                    review,
                    reviewer,
                    settings,
                    now: self.clock.now(),
                    whitelist,
                    family_index,
                    resolved_project_name: resolved_project_name.clone(),
                    decision: None,
                    callback_id: String::new(),
                });
                self.apply_outcome(ctx, review, retried).await;
            }
        }
    }

    /// Resolve an `UNKNOWN_PROJECT_REVIEW`'s project name by scanning the
    /// reviewer's pending notifications for a matching id. Returns `None`
    /// (not an error) if the notification hasn't shown up yet or the lookup
    /// itself fails; the next tick simply retries.
    async fn resolve_notification_project_name(&self, ctx: &IntentContext<'_>, notification_id: &str) -> Option<String> {
        let call = ctx.school.get_notifications(0, 200);
        let notifications = match intents::with_timeout(ctx.call_timeout, "get_notifications", call).await {
            Some(Ok(notifications)) => notifications,
            Some(Err(err)) => {
                tracing::warn!(error = %err, notification_id, "get_notifications failed");
                return None;
            }
            None => return None,
        };
        notifications
            .into_iter()
            .find(|notification| notification.id == notification_id)
            .and_then(|notification| notification.project_name)
    }

    /// Apply one `StepOutcome`, executing whatever intents it carries and
    /// committing the resulting patch. Returns `true` if the outcome
    /// included a `RefreshFamilyIndex` intent, signalling the caller should
    /// retry the lookup once more this tick.
    async fn apply_outcome(&self, ctx: &IntentContext<'_>, review: &ReviewRequest, outcome: StepOutcome) -> bool {
        match outcome {
            StepOutcome::NoOp => false,
            StepOutcome::Abandon { reason } => {
                self.metrics.event("review.abandoned", &[("review_id", &review.id.to_string())]);
                tracing::error!(review_id = %review.id, reason, "abandoning review: invariant violated");
                false
            }
            StepOutcome::Commit { next_status, patch, intents } => {
                let refreshes_family_index = intents.iter().any(|i| matches!(i, guard_protocol::Intent::RefreshFamilyIndex { .. }));
                let mut sent_message_id = None;
                for intent in &intents {
                    if let IntentOutcome::SentMessageId(id) = execute_intent(ctx, intent).await {
                        sent_message_id = Some(id);
                    }
                }
                let transition_patch = into_transition_patch(next_status, patch, sent_message_id);
                self.commit(review, transition_patch).await;
                refreshes_family_index
            }
            StepOutcome::Gated { intent, on_success, on_failure } => {
                let gate_outcome = execute_intent(ctx, &intent).await;
                let (branch, sent_message_id) = match gate_outcome {
                    IntentOutcome::Failed => (*on_failure, None),
                    IntentOutcome::Ok => (*on_success, None),
                    IntentOutcome::SentMessageId(id) => (*on_success, Some(id)),
                };
                for follow_up in &branch.intents {
                    execute_intent(ctx, follow_up).await;
                }
                let transition_patch = into_transition_patch(branch.next_status, branch.patch, sent_message_id);
                self.commit(review, transition_patch).await;
                false
            }
        }
    }

    async fn commit(&self, review: &ReviewRequest, patch: guard_store::runtime::TransitionPatch) {
        match self.store.commit_transition(review.id, review.status, patch).await {
            Ok(true) => {
                self.metrics.counter("review.transition", 1, &[("review_id", &review.id.to_string())]);
            }
            Ok(false) => {
                tracing::debug!(review_id = %review.id, "lost the transition race, re-evaluated next tick");
            }
            Err(err) => tracing::warn!(error = %err, review_id = %review.id, "commit_transition failed"),
        }
    }

    /// Fetch calendar events for `[now - 2h, now + 24h]` and create a new
    /// review for every booking whose slot has no open review yet. See
    /// spec §4.2 step 2d; existing requests are always processed first by
    /// the caller before this runs.
    async fn ingest_bookings(&self, ctx: &IntentContext<'_>, reviewer: &Reviewer) -> anyhow::Result<()> {
        let now = self.clock.now();
        let from = now - chrono::Duration::hours(2);
        let to = now + chrono::Duration::hours(24);
        let call = ctx.school.get_calendar_events(from, to);
        let events = match intents::with_timeout(ctx.call_timeout, "get_calendar_events", call).await {
            Some(Ok(events)) => events,
            Some(Err(err)) => return Err(err.into()),
            None => return Ok(()),
        };

        for event in events {
            let slot_id = guard_protocol::SlotId::new(event.slot_id.clone());
            if self.store.find_open_by_slot_id(&slot_id).await?.is_some() {
                continue;
            }
            let Some(notification_id) = event.notification_id.clone() else {
                continue;
            };
            let review = ReviewRequest::new_from_booking(
                reviewer.login.clone(),
                slot_id,
                notification_id,
                event.start,
                event.end,
                now,
            );
            self.store.insert_review_request(&review).await?;
            self.metrics.event("booking.ingested", &[("login", reviewer.login.as_str())]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use guard_clock::FixedClock;
    use guard_protocol::Login;
    use guard_vault::InMemorySecretStore;
    use guard_protocol::TokenBundle;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::method;
    use wiremock::matchers::path;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::ResponseTemplate;

    async fn seeded_store(login: &Login, now: chrono::DateTime<Utc>) -> StoreRuntime {
        let store = StoreRuntime::init_in_memory().await.expect("init");
        store
            .upsert_reviewer(&Reviewer {
                login: login.clone(),
                chat_id: "555".into(),
                status: guard_protocol::ReviewerStatus::Active,
                created_at: now,
                last_auth_success_at: Some(now),
                last_auth_failure_at: None,
            })
            .await
            .unwrap();
        store.seed_reviewer_settings(login, ReviewerSettings::defaults()).await.unwrap();
        store
    }

    #[tokio::test]
    async fn ingests_a_new_booking_with_no_open_review() {
        let login = Login::new("alice");
        let now = Utc::now();
        let store = seeded_store(&login, now).await;

        let school_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendar/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "slot_id": "slot-1",
                    "notification_id": "notif-1",
                    "start": now.to_rfc3339(),
                    "end": (now + chrono::Duration::minutes(120)).to_rfc3339(),
                }
            ])))
            .mount(&school_server)
            .await;

        let secret_store = Arc::new(InMemorySecretStore::new());
        secret_store.store(&login, TokenBundle::new("access", "refresh", now + chrono::Duration::hours(1)), None).await.unwrap();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(now));
        let vault = Arc::new(TokenVault::new(secret_store, clock.clone(), 5));
        let chat = guard_chat::Client::new("http://127.0.0.1:1", "bot-token");

        let reconciler = Reconciler::new(store.clone(), vault, chat, school_server.uri(), clock);
        let (_tx, rx) = watch::channel(false);
        reconciler.run_tick(rx).await.expect("tick");

        let open = store.list_open_reviews(&login).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].slot_id.as_str(), "slot-1");
        assert_eq!(open[0].status, guard_protocol::ReviewStatus::UnknownProjectReview);
    }

    #[tokio::test]
    async fn does_not_double_ingest_a_slot_with_an_open_review() {
        let login = Login::new("bob");
        let now = Utc::now();
        let store = seeded_store(&login, now).await;
        let existing = ReviewRequest::new_from_booking(
            login.clone(),
            guard_protocol::SlotId::new("slot-1"),
            "notif-1".to_string(),
            now,
            now + chrono::Duration::minutes(60),
            now,
        );
        store.insert_review_request(&existing).await.unwrap();

        let school_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendar/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "slot_id": "slot-1",
                    "notification_id": "notif-1",
                    "start": now.to_rfc3339(),
                    "end": (now + chrono::Duration::minutes(60)).to_rfc3339(),
                }
            ])))
            .mount(&school_server)
            .await;

        let secret_store = Arc::new(InMemorySecretStore::new());
        secret_store.store(&login, TokenBundle::new("access", "refresh", now + chrono::Duration::hours(1)), None).await.unwrap();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(now));
        let vault = Arc::new(TokenVault::new(secret_store, clock.clone(), 5));
        let chat = guard_chat::Client::new("http://127.0.0.1:1", "bot-token");

        let reconciler = Reconciler::new(store.clone(), vault, chat, school_server.uri(), clock);
        let (_tx, rx) = watch::channel(false);
        reconciler.run_tick(rx).await.expect("tick");

        let open = store.list_open_reviews(&login).await.unwrap();
        assert_eq!(open.len(), 1);
    }
}
