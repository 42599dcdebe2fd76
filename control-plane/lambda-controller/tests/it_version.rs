use lambda_controller::aws::{LambdaApi, UpdateFunctionConfigurationInput};
use lambda_controller::controller::reconcile::Next;
use lambda_controller::crd::common::{AwsResourceReferenceWrapper, FunctionEventInvokeConfig};
use lambda_controller::crd::version::{Version, VersionSpec};
use lambda_controller::crd::{AckStatus, ConditionType};
use lambda_controller::resources::VersionManager;

mod common;
use common::{Harness, MemorySink, NS, uniq};

fn version_cr(name: &str, function_cr: &str) -> Version {
    Version::new(
        name,
        VersionSpec {
            function_ref: Some(AwsResourceReferenceWrapper::named(function_cr)),
            ..Default::default()
        },
    )
}

#[test_log::test(tokio::test)]
async fn versions_increase_independently_of_earlier_version_crs() {
    let h = Harness::new();
    let f = uniq("fn");
    h.seed_function(&f).await;
    h.refs.put_synced_function(NS, "f-cr", &f);

    let first = MemorySink::new(version_cr("v-one", "f-cr"));
    h.settle(&VersionManager, &first).await.unwrap();
    assert!(first.is_synced());
    assert_eq!(first.status().version.as_deref(), Some("1"));
    assert_eq!(
        first.status().ack().arn(),
        Some(format!("arn:aws:lambda:us-west-2:111122223333:function:{f}:1").as_str())
    );

    h.lambda
        .update_function_configuration(UpdateFunctionConfigurationInput {
            function_name: f.clone(),
            description: Some("second cut".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    let second = MemorySink::new(version_cr("v-two", "f-cr"));
    h.settle(&VersionManager, &second).await.unwrap();
    assert_eq!(second.status().version.as_deref(), Some("2"));

    // Deleting the first CR removes version 1 only.
    h.delete(&VersionManager, &first).await.unwrap();
    assert!(
        h.lambda
            .get_function_configuration(&f, Some("1"))
            .await
            .unwrap_err()
            .is_not_found()
    );
    h.reconcile(&VersionManager, &second).await.unwrap();
    assert!(second.is_synced());
    assert_eq!(second.status().version.as_deref(), Some("2"));
}

#[test_log::test(tokio::test)]
async fn a_synced_version_is_not_republished() {
    let h = Harness::new();
    let f = uniq("fn");
    h.seed_function(&f).await;
    h.refs.put_synced_function(NS, "f-cr", &f);
    let sink = MemorySink::new(version_cr("v", "f-cr"));
    h.settle(&VersionManager, &sink).await.unwrap();

    h.lambda.clear_calls().await;
    sink.edit(|v| v.spec.description = Some("edited after publish".into()));
    h.settle(&VersionManager, &sink).await.unwrap();
    assert!(h.lambda.mutation_calls().await.is_empty());
    assert_eq!(sink.status().version.as_deref(), Some("1"));
}

#[test_log::test(tokio::test)]
async fn version_event_invoke_config_is_managed() {
    let h = Harness::new();
    let f = uniq("fn");
    h.seed_function(&f).await;
    h.refs.put_synced_function(NS, "f-cr", &f);
    let mut v = version_cr("v", "f-cr");
    v.spec.function_event_invoke_config = Some(FunctionEventInvokeConfig {
        maximum_event_age_in_seconds: Some(120),
        ..Default::default()
    });
    let sink = MemorySink::new(v);

    h.settle(&VersionManager, &sink).await.unwrap();
    let cfg = h
        .lambda
        .get_function_event_invoke_config(&f, Some("1"))
        .await
        .unwrap();
    assert_eq!(cfg.maximum_event_age_in_seconds, Some(120));

    sink.edit(|v| {
        if let Some(c) = v.spec.function_event_invoke_config.as_mut() {
            c.maximum_event_age_in_seconds = Some(300);
        }
    });
    h.settle(&VersionManager, &sink).await.unwrap();
    let cfg = h
        .lambda
        .get_function_event_invoke_config(&f, Some("1"))
        .await
        .unwrap();
    assert_eq!(cfg.maximum_event_age_in_seconds, Some(300));
}

#[test_log::test(tokio::test)]
async fn mismatched_code_sha_is_reported_as_recoverable() {
    let h = Harness::new();
    let f = uniq("fn");
    h.seed_function(&f).await;
    h.refs.put_synced_function(NS, "f-cr", &f);
    let mut v = version_cr("v", "f-cr");
    v.spec.code_sha256 = Some("not-the-current-sha".into());
    let sink = MemorySink::new(v);

    assert!(h.reconcile(&VersionManager, &sink).await.is_err());
    assert!(
        sink.status()
            .ack()
            .is_condition_true(ConditionType::Recoverable)
    );
    assert!(sink.status().version.is_none());
}

#[test_log::test(tokio::test)]
async fn version_waits_for_its_function() {
    let h = Harness::new();
    let sink = MemorySink::new(version_cr("v", "missing-fn"));
    let next = h.reconcile(&VersionManager, &sink).await.unwrap();
    assert_eq!(next, Next::After(h.engine.cfg.timing.reference_requeue()));
    assert!(h.lambda.mutation_calls().await.is_empty());
}
