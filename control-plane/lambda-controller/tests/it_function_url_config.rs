use lambda_controller::aws::{self, LambdaApi};
use lambda_controller::crd::common::AwsResourceReferenceWrapper;
use lambda_controller::crd::function_url_config::{
    Cors, FunctionURLConfig, FunctionURLConfigSpec,
};
use lambda_controller::resources::FunctionUrlConfigManager;

mod common;
use common::{Harness, MemorySink, NS, uniq};

fn url_config(function_cr: &str) -> FunctionURLConfig {
    FunctionURLConfig::new(
        "public-url",
        FunctionURLConfigSpec {
            function_ref: Some(AwsResourceReferenceWrapper::named(function_cr)),
            auth_type: "NONE".into(),
            ..Default::default()
        },
    )
}

#[test_log::test(tokio::test)]
async fn url_config_is_created_with_a_url_in_status() {
    let h = Harness::new();
    let f = uniq("fn");
    h.seed_function(&f).await;
    h.refs.put_synced_function(NS, "f-cr", &f);
    let sink = MemorySink::new(url_config("f-cr"));

    h.settle(&FunctionUrlConfigManager, &sink).await.unwrap();
    assert!(sink.is_synced());
    let status = sink.status();
    assert!(
        status
            .function_url
            .as_deref()
            .is_some_and(|u| u.starts_with("https://") && u.contains(".lambda-url."))
    );
    assert_eq!(
        status.function_arn.as_deref(),
        Some(format!("arn:aws:lambda:us-west-2:111122223333:function:{f}").as_str())
    );
}

#[test_log::test(tokio::test)]
async fn auth_type_and_cors_follow_the_spec() {
    let h = Harness::new();
    let f = uniq("fn");
    h.seed_function(&f).await;
    h.refs.put_synced_function(NS, "f-cr", &f);
    let sink = MemorySink::new(url_config("f-cr"));
    h.settle(&FunctionUrlConfigManager, &sink).await.unwrap();

    sink.edit(|u| {
        u.spec.auth_type = "AWS_IAM".into();
        u.spec.cors = Some(Cors {
            allow_origins: Some(vec!["https://example.com".into()]),
            allow_methods: Some(vec!["GET".into()]),
            ..Default::default()
        });
    });
    h.settle(&FunctionUrlConfigManager, &sink).await.unwrap();
    let got = h.lambda.get_function_url_config(&f, None).await.unwrap();
    assert_eq!(got.auth_type, "AWS_IAM");
    assert_eq!(
        got.cors.as_ref().map(|c| c.allow_origins.clone()),
        Some(vec!["https://example.com".to_string()])
    );

    h.lambda.clear_calls().await;
    h.reconcile(&FunctionUrlConfigManager, &sink).await.unwrap();
    assert!(h.lambda.mutation_calls().await.is_empty());

    sink.edit(|u| u.spec.cors = None);
    h.settle(&FunctionUrlConfigManager, &sink).await.unwrap();
    let got = h.lambda.get_function_url_config(&f, None).await.unwrap();
    assert_eq!(got.cors, None::<aws::Cors>);
}

#[test_log::test(tokio::test)]
async fn url_config_is_deleted_even_after_its_function_cr_is_gone() {
    let h = Harness::new();
    let f = uniq("fn");
    h.seed_function(&f).await;
    h.refs.put_synced_function(NS, "f-cr", &f);
    let sink = MemorySink::new(url_config("f-cr"));
    h.settle(&FunctionUrlConfigManager, &sink).await.unwrap();

    // The Function CR is gone; the recorded function ARN identifies the URL.
    h.refs.remove("Function", NS, "f-cr");
    h.delete(&FunctionUrlConfigManager, &sink).await.unwrap();
    assert!(
        h.lambda
            .get_function_url_config(&f, None)
            .await
            .unwrap_err()
            .is_not_found()
    );
}
