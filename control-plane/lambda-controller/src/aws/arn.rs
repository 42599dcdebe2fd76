//! Helpers for the Lambda ARN shapes the controller needs to take apart.

/// `arn:aws:lambda:{region}:{account}:function:{name}`
pub fn function_arn(region: &str, account_id: &str, name: &str) -> String {
    format!("arn:aws:lambda:{region}:{account_id}:function:{name}")
}

/// Accepts a bare name, a partial ARN (`account:function:name`) or a full
/// (optionally qualified) function ARN and returns the function name.
pub fn function_name(name_or_arn: &str) -> &str {
    match name_or_arn.split_once(":function:") {
        Some((_, rest)) => rest.split(':').next().unwrap_or(rest),
        None => name_or_arn,
    }
}

/// The qualifier of a qualified function ARN (`...:function:name:live`).
pub fn function_qualifier(arn: &str) -> Option<&str> {
    let (_, rest) = arn.split_once(":function:")?;
    let mut parts = rest.splitn(2, ':');
    parts.next()?;
    parts.next().filter(|q| !q.is_empty())
}

/// Drop the version suffix of a layer version ARN.
pub fn layer_arn_of(layer_version_arn: &str) -> &str {
    match layer_version_arn.rsplit_once(':') {
        Some((head, tail)) if tail.chars().all(|c| c.is_ascii_digit()) => head,
        _ => layer_version_arn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_function_names() {
        assert_eq!(function_name("my-fn"), "my-fn");
        assert_eq!(
            function_name("arn:aws:lambda:us-west-2:111122223333:function:my-fn"),
            "my-fn"
        );
        assert_eq!(
            function_name("arn:aws:lambda:us-west-2:111122223333:function:my-fn:live"),
            "my-fn"
        );
        assert_eq!(function_name("111122223333:function:my-fn"), "my-fn");
    }

    #[test]
    fn extracts_qualifiers() {
        assert_eq!(
            function_qualifier("arn:aws:lambda:r:1:function:f:live"),
            Some("live")
        );
        assert_eq!(function_qualifier("arn:aws:lambda:r:1:function:f"), None);
    }

    #[test]
    fn strips_layer_versions() {
        assert_eq!(
            layer_arn_of("arn:aws:lambda:r:1:layer:deps:3"),
            "arn:aws:lambda:r:1:layer:deps"
        );
        assert_eq!(
            layer_arn_of("arn:aws:lambda:r:1:layer:deps"),
            "arn:aws:lambda:r:1:layer:deps"
        );
    }
}
