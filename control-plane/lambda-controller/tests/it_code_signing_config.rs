use lambda_controller::aws::{AwsErrorKind, LambdaApi};
use lambda_controller::controller::{FINALIZER, ReconcileErr};
use lambda_controller::crd::AckStatus;
use lambda_controller::crd::code_signing_config::{
    AllowedPublishers, CodeSigningConfig, CodeSigningConfigSpec, CodeSigningPolicies,
};
use lambda_controller::resources::CodeSigningConfigManager;

mod common;
use common::{Harness, MemorySink, uniq};

const PROFILE_A: &str = "arn:aws:signer:us-west-2:111122223333:/signing-profiles/a/1";
const PROFILE_B: &str = "arn:aws:signer:us-west-2:111122223333:/signing-profiles/b/1";

fn csc() -> CodeSigningConfig {
    CodeSigningConfig::new(
        &uniq("csc"),
        CodeSigningConfigSpec {
            description: Some("release signing".into()),
            allowed_publishers: AllowedPublishers {
                signing_profile_version_arns: vec![PROFILE_A.into()],
            },
            code_signing_policies: Some(CodeSigningPolicies {
                untrusted_artifact_on_deployment: Some("Enforce".into()),
            }),
        },
    )
}

fn arn_of(sink: &MemorySink<CodeSigningConfig>) -> String {
    sink.status().ack().arn().expect("arn recorded").to_string()
}

#[test_log::test(tokio::test)]
async fn code_signing_config_is_created_and_updated() {
    let h = Harness::new();
    let sink = MemorySink::new(csc());

    h.settle(&CodeSigningConfigManager, &sink).await.unwrap();
    assert!(sink.is_synced());
    let arn = arn_of(&sink);
    assert!(sink.status().code_signing_config_id.is_some());
    let got = h.lambda.get_code_signing_config(&arn).await.unwrap();
    assert_eq!(got.untrusted_artifact_on_deployment, "Enforce");

    sink.edit(|c| {
        c.spec.allowed_publishers.signing_profile_version_arns =
            vec![PROFILE_A.into(), PROFILE_B.into()];
        c.spec.code_signing_policies = None;
    });
    h.settle(&CodeSigningConfigManager, &sink).await.unwrap();
    let got = h.lambda.get_code_signing_config(&arn).await.unwrap();
    assert_eq!(got.signing_profile_version_arns.len(), 2);
    assert_eq!(got.untrusted_artifact_on_deployment, "Warn");

    h.lambda.clear_calls().await;
    h.reconcile(&CodeSigningConfigManager, &sink).await.unwrap();
    assert!(h.lambda.mutation_calls().await.is_empty());
}

#[test_log::test(tokio::test)]
async fn attached_config_keeps_its_finalizer_until_detached() {
    let h = Harness::new();
    let sink = MemorySink::new(csc());
    h.settle(&CodeSigningConfigManager, &sink).await.unwrap();
    let arn = arn_of(&sink);

    let f = uniq("fn");
    h.seed_function(&f).await;
    h.lambda
        .put_function_code_signing_config(&f, &arn)
        .await
        .unwrap();

    sink.mark_deleted();
    let err = h
        .reconcile(&CodeSigningConfigManager, &sink)
        .await
        .unwrap_err();
    assert!(matches!(&err, ReconcileErr::Aws(e) if e.kind == AwsErrorKind::Conflict));
    assert_eq!(sink.finalizers(), vec![FINALIZER.to_string()]);

    h.lambda.delete_function_code_signing_config(&f).await.unwrap();
    h.delete(&CodeSigningConfigManager, &sink).await.unwrap();
    assert!(
        h.lambda
            .get_code_signing_config(&arn)
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[test_log::test(tokio::test)]
async fn empty_publisher_list_is_terminal() {
    let h = Harness::new();
    let mut c = csc();
    c.spec.allowed_publishers.signing_profile_version_arns.clear();
    let sink = MemorySink::new(c);

    h.reconcile(&CodeSigningConfigManager, &sink).await.unwrap();
    assert!(sink.is_terminal());
    assert!(h.lambda.mutation_calls().await.is_empty());
}
