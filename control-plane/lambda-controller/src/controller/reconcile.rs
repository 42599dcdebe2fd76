use std::time::Duration;

use kube::runtime::controller::Action;
use kube::{Resource, ResourceExt};
use tracing::{debug, info, instrument, trace, warn};

use super::events::{
    LifecycleEvent, REASON_CREATED, REASON_DELETED, REASON_RECOVERABLE,
    REASON_REFERENCES, REASON_SYNCED, REASON_TERMINAL, REASON_UPDATED,
};
use super::fsm::{
    EvalInput, FsmAction, Phase, Remote, conditions, evaluate,
};
use super::status_reducer::{
    now, resolve_condition, should_patch_status, status_patch,
    upsert_condition,
};
use super::store::StatusSink;
use super::{Engine, ErrorClass, FINALIZER, ReconcileErr};
use crate::crd::common::{AckResourceMetadata, ConditionType, ManagedFields};
use crate::crd::{AckResource, AckStatus};
use crate::resources::{Applied, KindStatus, ResourceManager};
use crate::retry::{PollConfig, PollError, poll_until};

/// Upper bound on read/plan/apply rounds within one reconcile.
const MAX_PASSES: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Next {
    AwaitChange,
    After(Duration),
}

impl Next {
    pub fn into_action(self) -> Action {
        match self {
            Next::AwaitChange => Action::await_change(),
            Next::After(d) => Action::requeue(d),
        }
    }
}

/// `group/version/kind/namespace/name`, unique across every watched kind.
pub fn object_key<K: AckResource>(obj: &K) -> String {
    format!(
        "{}/{}/{}/{}/{}",
        K::group(&()),
        K::version(&()),
        K::kind(&()),
        obj.namespace().unwrap_or_default(),
        obj.name_any()
    )
}

/// The class of `err` as seen by `manager`'s kind.
pub fn classify<M: ResourceManager>(manager: &M, err: &ReconcileErr) -> ErrorClass {
    match err {
        ReconcileErr::Aws(e) if manager.terminal_aws_error(e) => ErrorClass::Validation,
        other => other.class(),
    }
}

fn has_finalizer<K: AckResource>(obj: &K) -> bool {
    obj.meta()
        .finalizers
        .as_ref()
        .map(|f| f.iter().any(|x| x == FINALIZER))
        .unwrap_or(false)
}

/// Status as last written, so every write is a minimal merge patch.
struct StatusWriter<'a, K: AckResource> {
    sink: &'a dyn StatusSink<K>,
    obj: &'a K,
    persisted: Option<KindStatus<K>>,
}

impl<'a, K: AckResource> StatusWriter<'a, K> {
    fn new(sink: &'a dyn StatusSink<K>, obj: &'a K) -> Self {
        Self {
            sink,
            obj,
            persisted: obj.status_ref().cloned(),
        }
    }

    async fn write(&mut self, status: &KindStatus<K>) -> Result<(), ReconcileErr> {
        if !should_patch_status(self.persisted.as_ref(), status) {
            return Ok(());
        }
        let patch = status_patch(self.persisted.as_ref(), status)?;
        self.sink.patch_status(self.obj, patch).await?;
        self.persisted = Some(status.clone());
        Ok(())
    }
}

#[instrument(skip_all, fields(kind = %M::Kind::kind(&()), ns = %obj.namespace().unwrap_or_default(), name = %obj.name_any()))]
pub async fn reconcile_object<M: ResourceManager>(
    engine: &Engine,
    manager: &M,
    sink: &dyn StatusSink<M::Kind>,
    obj: &M::Kind,
) -> Result<Next, ReconcileErr> {
    let key = object_key(obj);
    let _guard = engine.locks.lock(&key).await;

    let ack = obj.ack().cloned().unwrap_or_default();
    let generation = obj.meta().generation;
    let entry = evaluate(EvalInput {
        is_deleting: obj.meta().deletion_timestamp.is_some(),
        has_finalizer: has_finalizer(obj),
        terminal: ack.is_terminal(),
        generation_changed: ack.observed_generation != generation,
        remote: None,
    });
    trace!(phase = entry.phase.as_str(), actions = ?entry.actions, "entry evaluation");

    match entry.phase {
        Phase::Deleting => {
            if !entry.actions.contains(&FsmAction::Delete) {
                return Ok(Next::AwaitChange);
            }
            let next = delete(engine, manager, sink, obj).await?;
            if next == Next::AwaitChange {
                drop(_guard);
                engine.locks.forget(&key);
            }
            return Ok(next);
        }
        Phase::Terminal => {
            debug!("terminal for this generation; waiting for a spec change");
            return Ok(Next::AwaitChange);
        }
        _ => {}
    }

    if entry.actions.contains(&FsmAction::AddFinalizer) {
        info!("adding finalizer");
        let mut finals = obj.meta().finalizers.clone().unwrap_or_default();
        finals.push(FINALIZER.to_string());
        sink.set_finalizers(obj, finals).await?;
    }

    let mut writer = StatusWriter::new(sink, obj);
    let mut status = obj.status_ref().cloned().unwrap_or_default();
    status.ack_mut().observed_generation = generation;
    if ack.is_terminal() {
        // The spec changed since the terminal error; judge it afresh.
        resolve_condition(&mut status.ack_mut().conditions, ConditionType::Terminal, &now());
    }
    let outcome = sync(engine, manager, &mut writer, obj, &mut status).await;
    let ts = now();

    match outcome {
        Ok(next) => {
            writer.write(&status).await?;
            Ok(next)
        }
        Err(err) => {
            let message = err.condition_message();
            let conds = &mut status.ack_mut().conditions;
            match classify(manager, &err) {
                ErrorClass::Reference => {
                    info!(error = %err, "references not ready");
                    upsert_condition(conds, conditions::references_resolved(false, &message), &ts);
                    upsert_condition(
                        conds,
                        conditions::synced_for_phase(Phase::Observing, Some(&message)),
                        &ts,
                    );
                    writer.write(&status).await?;
                    sink.publish(
                        obj,
                        LifecycleEvent::warning(REASON_REFERENCES, "Resolve", Some(message)),
                    )
                    .await;
                    Ok(Next::After(engine.cfg.timing.reference_requeue()))
                }
                ErrorClass::Validation => {
                    warn!(error = %err, "terminal error");
                    upsert_condition(conds, conditions::terminal(&message), &ts);
                    upsert_condition(
                        conds,
                        conditions::synced_for_phase(Phase::Terminal, None),
                        &ts,
                    );
                    writer.write(&status).await?;
                    sink.publish(
                        obj,
                        LifecycleEvent::warning(REASON_TERMINAL, "Reconcile", Some(message)),
                    )
                    .await;
                    Ok(Next::AwaitChange)
                }
                ErrorClass::Requeue => {
                    let after = match &err {
                        ReconcileErr::Requeue { after, .. } => *after,
                        _ => engine.cfg.timing.settle_requeue(),
                    };
                    info!(reason = %message, after_ms = after.as_millis(), "requeueing");
                    upsert_condition(
                        conds,
                        conditions::synced_for_phase(Phase::Settling, Some(&message)),
                        &ts,
                    );
                    writer.write(&status).await?;
                    Ok(Next::After(after))
                }
                ErrorClass::Conflict => {
                    warn!(error = %err, "conflict retries exhausted");
                    upsert_condition(conds, conditions::recoverable(&message), &ts);
                    upsert_condition(
                        conds,
                        conditions::synced_for_phase(Phase::Updating, None),
                        &ts,
                    );
                    writer.write(&status).await?;
                    sink.publish(
                        obj,
                        LifecycleEvent::warning(REASON_RECOVERABLE, "Reconcile", Some(message)),
                    )
                    .await;
                    Err(err)
                }
                ErrorClass::Transient => {
                    // Keep identifiers recorded before the failure.
                    writer.write(&status).await?;
                    Err(err)
                }
            }
        }
    }
}

async fn sync<M: ResourceManager>(
    engine: &Engine,
    manager: &M,
    writer: &mut StatusWriter<'_, M::Kind>,
    obj: &M::Kind,
    status: &mut KindStatus<M::Kind>,
) -> Result<Next, ReconcileErr> {
    let desired = manager.resolve(obj, &engine.resolver).await?;
    let ts = now();
    if manager.has_references(obj) {
        upsert_condition(
            &mut status.ack_mut().conditions,
            conditions::references_resolved(true, "All references resolved"),
            &ts,
        );
    }
    manager.validate(&desired)?;

    let aws = engine.aws();
    let managed_now = obj.spec_managed_fields();
    let managed: ManagedFields = status
        .ack()
        .managed()
        .union(&managed_now)
        .cloned()
        .collect();
    let mut created = false;
    let mut conflicts = 0u32;

    for pass in 0..MAX_PASSES {
        let observed = manager.read(&aws, &desired, status).await?;
        let (hint, ops) = match &observed {
            Some(o) => (
                manager.requeue_hint(o, &engine.cfg.timing),
                manager.plan(&desired, o, &managed),
            ),
            None => (None, vec![]),
        };
        let eval = evaluate(EvalInput {
            is_deleting: false,
            has_finalizer: true,
            terminal: false,
            generation_changed: false,
            remote: Some(Remote {
                exists: observed.is_some(),
                settling: hint.is_some(),
                pending_ops: ops.len(),
            }),
        });
        debug!(pass, phase = eval.phase.as_str(), ops = ops.len(), "evaluated");

        match (eval.phase, observed) {
            (Phase::Creating, _) if created => {
                // Not visible yet after create.
                set_synced(status, Phase::Creating, None);
                return Ok(Next::After(engine.cfg.timing.settle_requeue()));
            }
            (Phase::Creating, _) => {
                info!("creating");
                let arn = manager.create(&aws, &desired, status).await?;
                record_metadata(engine, status, arn);
                set_synced(status, Phase::Creating, None);
                writer.write(status).await?;
                writer
                    .sink
                    .publish(
                        writer.obj,
                        LifecycleEvent::normal(REASON_CREATED, "Create", None),
                    )
                    .await;
                created = true;
            }
            (Phase::Settling, Some(o)) => {
                let (after, why) = hint.unwrap_or((
                    engine.cfg.timing.settle_requeue(),
                    String::new(),
                ));
                manager.project(&o, status);
                record_metadata(engine, status, manager.arn(&o));
                let detail = (!why.is_empty()).then_some(why.as_str());
                set_synced(status, Phase::Settling, detail);
                return Ok(Next::After(after));
            }
            (Phase::Updating, Some(o)) => {
                info!(ops = ?ops, "applying changes");
                match manager.apply(&aws, &desired, &o, ops, status).await {
                    Ok(Applied::Continue) => {
                        writer
                            .sink
                            .publish(
                                writer.obj,
                                LifecycleEvent::normal(REASON_UPDATED, "Update", None),
                            )
                            .await;
                    }
                    Ok(Applied::Requeue(after)) => {
                        manager.project(&o, status);
                        set_synced(status, Phase::Updating, None);
                        return Ok(Next::After(after));
                    }
                    Err(e)
                        if e.class() == ErrorClass::Conflict
                            && conflicts < engine.retry.max_attempts =>
                    {
                        conflicts += 1;
                        warn!(error = %e, conflicts, "conflict; re-reading before retry");
                        tokio::time::sleep(engine.retry.delay_for(conflicts)).await;
                    }
                    Err(e) => return Err(e),
                }
            }
            (Phase::Synced, Some(o)) => {
                let was_synced = status.ack().is_synced();
                manager.project(&o, status);
                record_metadata(engine, status, manager.arn(&o));
                let ts = now();
                let ack = status.ack_mut();
                resolve_condition(&mut ack.conditions, ConditionType::Terminal, &ts);
                resolve_condition(&mut ack.conditions, ConditionType::Recoverable, &ts);
                ack.managed_fields = managed_now.iter().cloned().collect();
                set_synced(status, Phase::Synced, None);
                if !was_synced {
                    writer
                        .sink
                        .publish(
                            writer.obj,
                            LifecycleEvent::normal(REASON_SYNCED, "Sync", None),
                        )
                        .await;
                }
                return Ok(Next::After(engine.cfg.timing.resync()));
            }
            (phase, _) => {
                return Err(ReconcileErr::Internal(format!(
                    "unexpected phase {} after read",
                    phase.as_str()
                )));
            }
        }
    }

    set_synced(status, Phase::Updating, Some("Still converging"));
    Ok(Next::After(engine.cfg.timing.settle_requeue()))
}

fn set_synced<S: AckStatus>(status: &mut S, phase: Phase, detail: Option<&str>) {
    upsert_condition(
        &mut status.ack_mut().conditions,
        conditions::synced_for_phase(phase, detail),
        &now(),
    );
}

fn record_metadata<S: AckStatus>(engine: &Engine, status: &mut S, arn: Option<String>) {
    let ack = status.ack_mut();
    let arn = arn.or_else(|| ack.arn().map(str::to_string));
    ack.ack_resource_metadata = Some(AckResourceMetadata {
        arn,
        owner_account_id: engine.cfg.aws.account_id.clone(),
        region: engine.cfg.aws.region.clone(),
    });
}

async fn delete<M: ResourceManager>(
    engine: &Engine,
    manager: &M,
    sink: &dyn StatusSink<M::Kind>,
    obj: &M::Kind,
) -> Result<Next, ReconcileErr> {
    let status = obj.status_ref().cloned().unwrap_or_default();
    let desired = match manager.resolve(obj, &engine.resolver).await {
        Ok(d) => Some(d),
        Err(e) if matches!(e.class(), ErrorClass::Reference | ErrorClass::Validation) => {
            info!(error = %e, "references unavailable; deleting by recorded identity");
            manager.desired_from_status(obj)
        }
        Err(e) => return Err(e),
    };

    if let Some(desired) = desired {
        let aws = engine.aws();
        info!("deleting AWS resource");
        manager.delete(&aws, &desired, &status).await?;

        let poll = PollConfig {
            interval: engine.cfg.timing.delete_poll(),
            max_wait: engine.cfg.timing.delete_timeout(),
        };
        let (aws_ref, desired_ref, status_ref) = (&aws, &desired, &status);
        // No cancellation token: a started deletion is always confirmed or
        // timed out, never abandoned halfway.
        match poll_until(
            &poll,
            "confirm-deleted",
            None,
            move || manager.is_gone(aws_ref, desired_ref, status_ref),
            |gone| *gone,
        )
        .await
        {
            Ok(_) => {}
            Err(PollError::TimedOut { waited }) => {
                info!(waited_ms = waited.as_millis(), "resource still present; will check again");
                return Ok(Next::After(engine.cfg.timing.settle_requeue()));
            }
            Err(PollError::Cancelled) => {
                return Ok(Next::After(engine.cfg.timing.settle_requeue()));
            }
            Err(PollError::Check(e)) => return Err(e),
        }
    } else {
        debug!("nothing recorded in status; no AWS resource to delete");
    }

    info!("removing finalizer");
    let finals = obj
        .meta()
        .finalizers
        .clone()
        .unwrap_or_default()
        .into_iter()
        .filter(|f| f != FINALIZER)
        .collect::<Vec<_>>();
    sink.set_finalizers(obj, finals).await?;
    sink.publish(obj, LifecycleEvent::normal(REASON_DELETED, "Delete", None))
        .await;
    Ok(Next::AwaitChange)
}
