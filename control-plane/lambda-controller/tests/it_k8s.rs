// Integration tests require a running Kubernetes cluster with the Lambda CRDs
// applied (`cargo run --bin crdgen | kubectl apply -f -`). Ignored by default.

use std::sync::Arc;
use std::time::Duration;

use kube::{
    Client,
    api::{Api, DeleteParams, PostParams},
};
use lambda_controller::aws::{InMemoryLambda, LambdaApi};
use lambda_controller::controller::references::KubeReferenceReader;
use lambda_controller::controller::{Engine, run_controllers};
use lambda_controller::crd::AckStatus;
use lambda_controller::crd::alias::{Alias, AliasSpec};
use lambda_controller::crd::common::AwsResourceReferenceWrapper;
use lambda_controller::crd::function::{Function, FunctionCode, FunctionSpec};
use tokio_util::sync::CancellationToken;

mod common;
use common::{ACCOUNT, REGION, test_config, uniq};

/// Aborts the controller task when the test ends, whatever the outcome.
struct ControllerGuard {
    shutdown: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for ControllerGuard {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.handle.abort();
    }
}

fn start_controller(client: Client, lambda: InMemoryLambda) -> ControllerGuard {
    let shutdown = CancellationToken::new();
    let engine = Arc::new(Engine::new(
        Arc::new(lambda),
        Arc::new(KubeReferenceReader::new(client.clone())),
        test_config(),
        shutdown.clone(),
    ));
    let handle = tokio::spawn(async move {
        let _ = run_controllers(client, engine).await;
    });
    ControllerGuard { shutdown, handle }
}

async fn wait_until<F, Fut>(what: &str, mut f: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..30 {
        if f().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1000)).await;
    }
    panic!("timed out waiting for {what}");
}

#[test_log::test(tokio::test)]
#[ignore]
async fn function_and_alias_converge_through_the_api_server() {
    let client = Client::try_default().await.expect("kube client");
    let ns = "default";
    let lambda = InMemoryLambda::new(ACCOUNT, REGION);
    let _guard = start_controller(client.clone(), lambda.clone());

    let fn_cr = uniq("lambda-it-fn");
    let functions: Api<Function> = Api::namespaced(client.clone(), ns);
    let f = Function::new(
        &fn_cr,
        FunctionSpec {
            name: fn_cr.clone(),
            role: Some("arn:aws:iam::111122223333:role/lambda-basic".into()),
            runtime: Some("python3.12".into()),
            handler: Some("main.handler".into()),
            code: Some(FunctionCode {
                s3_bucket: Some("artifacts".into()),
                s3_key: Some("app.zip".into()),
                ..Default::default()
            }),
            ..Default::default()
        },
    );
    functions
        .create(&PostParams::default(), &f)
        .await
        .expect("create Function");

    let aliases: Api<Alias> = Api::namespaced(client.clone(), ns);
    let a = Alias::new(
        &uniq("lambda-it-alias"),
        AliasSpec {
            name: "live".into(),
            function_ref: Some(AwsResourceReferenceWrapper::named(&fn_cr)),
            function_version: "$LATEST".into(),
            ..Default::default()
        },
    );
    let a = aliases
        .create(&PostParams::default(), &a)
        .await
        .expect("create Alias");
    let alias_name = a.metadata.name.clone().unwrap_or_default();

    wait_until("function synced", || {
        let functions = functions.clone();
        let name = fn_cr.clone();
        async move {
            functions
                .get_opt(&name)
                .await
                .ok()
                .flatten()
                .and_then(|f| f.status)
                .is_some_and(|s| s.ack().is_synced())
        }
    })
    .await;
    wait_until("alias synced", || {
        let aliases = aliases.clone();
        let name = alias_name.clone();
        async move {
            aliases
                .get_opt(&name)
                .await
                .ok()
                .flatten()
                .and_then(|a| a.status)
                .is_some_and(|s| s.ack().is_synced())
        }
    })
    .await;
    assert!(lambda.get_alias(&fn_cr, "live").await.is_ok());

    let _ = aliases.delete(&alias_name, &DeleteParams::default()).await;
    let _ = functions.delete(&fn_cr, &DeleteParams::default()).await;
    wait_until("function deleted", || {
        let functions = functions.clone();
        let name = fn_cr.clone();
        async move { matches!(functions.get_opt(&name).await, Ok(None)) }
    })
    .await;
    assert!(lambda.get_function(&fn_cr).await.is_err());
}
