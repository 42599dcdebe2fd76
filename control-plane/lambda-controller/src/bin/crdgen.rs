use kube::core::CustomResourceExt;
use lambda_controller::crd::{
    Alias, CodeSigningConfig, EventSourceMapping, Function, FunctionURLConfig,
    LayerVersion, Version,
};

fn main() {
    let crds = [
        Function::crd(),
        Alias::crd(),
        Version::crd(),
        EventSourceMapping::crd(),
        CodeSigningConfig::crd(),
        FunctionURLConfig::crd(),
        LayerVersion::crd(),
    ];
    for crd in crds {
        let yaml = serde_yaml::to_string(&crd).expect("serialize CRD to YAML");
        println!("---\n{}", yaml);
    }
}
