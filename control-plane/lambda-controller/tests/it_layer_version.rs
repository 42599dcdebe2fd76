use lambda_controller::aws::{LambdaApi, LayerContent, PublishLayerVersionInput};
use lambda_controller::crd::AckStatus;
use lambda_controller::crd::layer_version::{
    LayerVersion, LayerVersionContentInput, LayerVersionSpec,
};
use lambda_controller::resources::LayerVersionManager;

mod common;
use common::{Harness, MemorySink, uniq};

fn layer(name: &str) -> LayerVersion {
    LayerVersion::new(
        "lv1",
        LayerVersionSpec {
            layer_name: name.to_string(),
            content: LayerVersionContentInput {
                s3_bucket: Some("artifacts".into()),
                s3_key: Some("layers/deps.zip".into()),
                s3_object_version: None,
            },
            compatible_runtimes: Some(vec!["python3.12".into()]),
            ..Default::default()
        },
    )
}

#[test_log::test(tokio::test)]
async fn layer_version_is_published_once() {
    let h = Harness::new();
    let name = uniq("deps");
    let sink = MemorySink::new(layer(&name));

    h.settle(&LayerVersionManager, &sink).await.unwrap();
    assert!(sink.is_synced());
    let status = sink.status();
    assert_eq!(status.version_number, Some(1));
    assert_eq!(
        status.ack().arn(),
        Some(format!("arn:aws:lambda:us-west-2:111122223333:layer:{name}:1").as_str())
    );

    h.lambda.clear_calls().await;
    for _ in 0..3 {
        h.reconcile(&LayerVersionManager, &sink).await.unwrap();
    }
    assert!(h.lambda.mutation_calls().await.is_empty());
}

#[test_log::test(tokio::test)]
async fn spec_changes_publish_a_new_version() {
    let h = Harness::new();
    let name = uniq("deps");
    let sink = MemorySink::new(layer(&name));
    h.settle(&LayerVersionManager, &sink).await.unwrap();

    sink.edit(|l| l.spec.content.s3_key = Some("layers/deps-v2.zip".into()));
    h.settle(&LayerVersionManager, &sink).await.unwrap();
    let status = sink.status();
    assert_eq!(status.version_number, Some(2));
    let versions: Vec<i64> = status.published_versions.iter().map(|p| p.version).collect();
    assert_eq!(versions, vec![1, 2]);
    assert_eq!(h.lambda.list_layer_versions(&name).await.unwrap().len(), 2);
}

#[test_log::test(tokio::test)]
async fn deleting_the_layer_removes_every_version() {
    let h = Harness::new();
    let name = uniq("deps");
    let sink = MemorySink::new(layer(&name));
    h.settle(&LayerVersionManager, &sink).await.unwrap();
    let n = sink.status().version_number.unwrap();
    assert!(n >= 1);

    sink.edit(|l| l.spec.description = Some("second".into()));
    h.settle(&LayerVersionManager, &sink).await.unwrap();
    // A version published outside the controller under the same name.
    h.lambda
        .publish_layer_version(PublishLayerVersionInput {
            layer_name: name.clone(),
            content: LayerContent {
                s3_bucket: Some("artifacts".into()),
                s3_key: Some("layers/manual.zip".into()),
                s3_object_version: None,
            },
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(h.lambda.list_layer_versions(&name).await.unwrap().len(), 3);

    h.delete(&LayerVersionManager, &sink).await.unwrap();
    assert!(h.lambda.list_layer_versions(&name).await.unwrap().is_empty());
}

#[test_log::test(tokio::test)]
async fn renaming_the_layer_still_deletes_versions_under_the_old_name() {
    let h = Harness::new();
    let old = uniq("deps");
    let new = uniq("deps-renamed");
    let sink = MemorySink::new(layer(&old));
    h.settle(&LayerVersionManager, &sink).await.unwrap();

    sink.edit(|l| l.spec.layer_name = new.clone());
    h.settle(&LayerVersionManager, &sink).await.unwrap();
    assert!(sink.is_synced());
    let status = sink.status();
    assert_eq!(status.current_layer_name(), Some(new.as_str()));
    let names: Vec<&str> = status
        .published_versions
        .iter()
        .map(|p| p.layer_name.as_str())
        .collect();
    assert_eq!(names, vec![old.as_str(), new.as_str()]);
    assert_eq!(h.lambda.list_layer_versions(&old).await.unwrap().len(), 1);
    assert_eq!(h.lambda.list_layer_versions(&new).await.unwrap().len(), 1);

    h.delete(&LayerVersionManager, &sink).await.unwrap();
    assert!(h.lambda.list_layer_versions(&old).await.unwrap().is_empty());
    assert!(h.lambda.list_layer_versions(&new).await.unwrap().is_empty());
}
