use lambda_controller::aws::LambdaApi;
use lambda_controller::aws::policy::parse_policy;
use lambda_controller::controller::reconcile::Next;
use lambda_controller::crd::alias::{AddPermissionInput, Alias, AliasSpec};
use lambda_controller::crd::common::{
    AwsResourceReferenceWrapper, Destination, DestinationConfig,
    FunctionEventInvokeConfig, ProvisionedConcurrencyConfig,
};
use lambda_controller::crd::{AckStatus, ConditionType};
use lambda_controller::resources::AliasManager;

mod common;
use common::{Harness, MemorySink, NS, uniq};

fn alias(function: &str, version: &str) -> Alias {
    Alias::new(
        "a1",
        AliasSpec {
            name: "a1".into(),
            function_name: Some(function.to_string()),
            function_version: version.to_string(),
            ..Default::default()
        },
    )
}

fn s3_permission(sid: &str, bucket: &str) -> AddPermissionInput {
    AddPermissionInput {
        statement_id: sid.into(),
        action: "lambda:InvokeFunction".into(),
        principal: "s3.amazonaws.com".into(),
        source_arn: Some(format!("arn:aws:s3:::{bucket}")),
        source_account: Some("111122223333".into()),
        ..Default::default()
    }
}

async fn statements(h: &Harness, function: &str) -> Vec<(String, Option<String>)> {
    match h.lambda.get_policy(function, Some("a1")).await {
        Ok(doc) => parse_policy(&doc)
            .unwrap()
            .into_iter()
            .map(|p| (p.statement_id, p.source_arn))
            .collect(),
        Err(e) if e.is_not_found() => Vec::new(),
        Err(e) => panic!("get policy: {e}"),
    }
}

#[test_log::test(tokio::test)]
async fn alias_permissions_are_replaced_as_a_set() {
    let h = Harness::new();
    let f1 = uniq("f1");
    h.seed_function(&f1).await;
    let sink = MemorySink::new(alias(&f1, "$LATEST"));

    h.settle(&AliasManager, &sink).await.unwrap();
    assert!(sink.is_synced());
    assert!(statements(&h, &f1).await.is_empty());

    sink.edit(|a| {
        a.spec.permissions = Some(vec![
            s3_permission("permission1", "bucket-one"),
            s3_permission("permission2", "bucket-two"),
        ])
    });
    h.settle(&AliasManager, &sink).await.unwrap();
    let sids: Vec<String> = statements(&h, &f1).await.into_iter().map(|s| s.0).collect();
    assert_eq!(sids.len(), 2);
    assert!(sids.contains(&"permission1".to_string()));
    assert!(sids.contains(&"permission2".to_string()));

    sink.edit(|a| {
        a.spec.permissions = Some(vec![
            s3_permission("permission2", "bucket-two-updated"),
            s3_permission("permission3", "bucket-three"),
        ])
    });
    h.settle(&AliasManager, &sink).await.unwrap();
    assert!(sink.is_synced());
    let stmts = statements(&h, &f1).await;
    assert_eq!(stmts.len(), 2);
    assert!(!stmts.iter().any(|(sid, _)| sid == "permission1"));
    assert!(stmts.iter().any(|(sid, _)| sid == "permission3"));
    let p2 = stmts.iter().find(|(sid, _)| sid == "permission2").unwrap();
    assert_eq!(p2.1.as_deref(), Some("arn:aws:s3:::bucket-two-updated"));

    // Dropping the list removes every statement the alias owned.
    sink.edit(|a| a.spec.permissions = None);
    h.settle(&AliasManager, &sink).await.unwrap();
    assert!(statements(&h, &f1).await.is_empty());
}

#[test_log::test(tokio::test)]
async fn removing_provisioned_concurrency_deletes_the_config() {
    let h = Harness::new();
    let f1 = uniq("f1");
    h.seed_function(&f1).await;
    let v1 = h.seed_version(&f1).await;
    let mut a = alias(&f1, &v1);
    a.spec.provisioned_concurrency_config = Some(ProvisionedConcurrencyConfig {
        provisioned_concurrent_executions: Some(2),
    });
    let sink = MemorySink::new(a);

    h.settle(&AliasManager, &sink).await.unwrap();
    assert!(sink.is_synced());
    let pc = h
        .lambda
        .get_provisioned_concurrency_config(&f1, "a1")
        .await
        .unwrap();
    assert_eq!(pc.requested, 2);

    sink.edit(|a| a.spec.provisioned_concurrency_config = None);
    h.settle(&AliasManager, &sink).await.unwrap();
    assert!(sink.is_synced());
    let err = h
        .lambda
        .get_provisioned_concurrency_config(&f1, "a1")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test_log::test(tokio::test)]
async fn event_invoke_config_follows_the_alias_spec() {
    let h = Harness::new();
    let f1 = uniq("f1");
    h.seed_function(&f1).await;
    let mut a = alias(&f1, "$LATEST");
    a.spec.function_event_invoke_config = Some(FunctionEventInvokeConfig {
        maximum_retry_attempts: Some(1),
        destination_config: Some(DestinationConfig {
            on_failure: Some(Destination {
                destination: Some("arn:aws:sqs:us-west-2:111122223333:dlq".into()),
            }),
            on_success: None,
        }),
        ..Default::default()
    });
    let sink = MemorySink::new(a);

    h.settle(&AliasManager, &sink).await.unwrap();
    let cfg = h
        .lambda
        .get_function_event_invoke_config(&f1, Some("a1"))
        .await
        .unwrap();
    assert_eq!(cfg.maximum_retry_attempts, Some(1));

    sink.edit(|a| a.spec.function_event_invoke_config = None);
    h.settle(&AliasManager, &sink).await.unwrap();
    assert!(
        h.lambda
            .get_function_event_invoke_config(&f1, Some("a1"))
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[test_log::test(tokio::test)]
async fn version_and_description_changes_update_the_alias() {
    let h = Harness::new();
    let f1 = uniq("f1");
    h.seed_function(&f1).await;
    let v1 = h.seed_version(&f1).await;
    let sink = MemorySink::new(alias(&f1, "$LATEST"));
    h.settle(&AliasManager, &sink).await.unwrap();

    sink.edit(|a| {
        a.spec.function_version = v1.clone();
        a.spec.description = Some("stable".into());
    });
    h.lambda.clear_calls().await;
    h.settle(&AliasManager, &sink).await.unwrap();
    assert_eq!(h.lambda.mutation_calls().await, vec!["UpdateAlias"]);
    let got = h.lambda.get_alias(&f1, "a1").await.unwrap();
    assert_eq!(got.function_version, v1);
    assert_eq!(got.description.as_deref(), Some("stable"));
    assert_eq!(sink.status().revision_id, got.revision_id);
}

#[test_log::test(tokio::test)]
async fn unsynced_function_reference_blocks_the_alias() {
    let h = Harness::new();
    let f1 = uniq("f1");
    h.seed_function(&f1).await;
    let mut a = alias(&f1, "$LATEST");
    a.spec.function_name = None;
    a.spec.function_ref = Some(AwsResourceReferenceWrapper::named("f1-cr"));
    let sink = MemorySink::new(a);

    let next = h.reconcile(&AliasManager, &sink).await.unwrap();
    assert_eq!(next, Next::After(h.engine.cfg.timing.reference_requeue()));
    assert!(
        sink.condition_message(ConditionType::ReferencesResolved)
            .unwrap()
            .contains("does not exist")
    );

    h.refs.put_synced_function(NS, "f1-cr", &f1);
    h.settle(&AliasManager, &sink).await.unwrap();
    assert!(sink.is_synced());
    assert!(
        sink.status()
            .ack()
            .is_condition_true(ConditionType::ReferencesResolved)
    );
}

#[test_log::test(tokio::test)]
async fn deleting_the_alias_removes_it() {
    let h = Harness::new();
    let f1 = uniq("f1");
    h.seed_function(&f1).await;
    let sink = MemorySink::new(alias(&f1, "$LATEST"));
    h.settle(&AliasManager, &sink).await.unwrap();

    h.delete(&AliasManager, &sink).await.unwrap();
    assert!(h.lambda.get_alias(&f1, "a1").await.unwrap_err().is_not_found());
}

#[test_log::test(tokio::test)]
async fn invalid_routing_weights_are_terminal() {
    let h = Harness::new();
    let f1 = uniq("f1");
    h.seed_function(&f1).await;
    let v1 = h.seed_version(&f1).await;
    let mut a = alias(&f1, "$LATEST");
    a.spec.routing_config = Some(
        lambda_controller::crd::alias::AliasRoutingConfiguration {
            additional_version_weights: [(v1, 1.5)].into(),
        },
    );
    let sink = MemorySink::new(a);

    assert_eq!(
        h.reconcile(&AliasManager, &sink).await.unwrap(),
        Next::AwaitChange
    );
    assert!(sink.is_terminal());
    assert!(h.lambda.mutation_calls().await.iter().all(|c| c != "CreateAlias"));
}

#[test_log::test(tokio::test)]
async fn account_root_principal_settles_without_churn() {
    let h = Harness::new();
    let f1 = uniq("f1");
    h.seed_function(&f1).await;
    let mut a = alias(&f1, "$LATEST");
    a.spec.permissions = Some(vec![AddPermissionInput {
        statement_id: "cross-account".into(),
        action: "lambda:InvokeFunction".into(),
        principal: "arn:aws:iam::444455556666:root".into(),
        ..Default::default()
    }]);
    let sink = MemorySink::new(a);

    h.settle(&AliasManager, &sink).await.unwrap();
    assert!(sink.is_synced());
    assert_eq!(statements(&h, &f1).await.len(), 1);

    h.lambda.clear_calls().await;
    h.reconcile(&AliasManager, &sink).await.unwrap();
    assert!(sink.is_synced());
    assert!(h.lambda.mutation_calls().await.is_empty());
}
