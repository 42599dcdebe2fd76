//! Conversion between a function's resource-based policy document and the
//! statement list managed through `AddPermission` / `RemovePermission`.

use serde_json::{Map, Value, json};

use super::model::Permission;

/// Parse the JSON document returned by `GetPolicy`.
pub fn parse_policy(doc: &str) -> Result<Vec<Permission>, serde_json::Error> {
    let v: Value = serde_json::from_str(doc)?;
    let statements = match v.get("Statement") {
        Some(Value::Array(list)) => list.clone(),
        Some(single @ Value::Object(_)) => vec![single.clone()],
        _ => vec![],
    };
    Ok(statements.iter().filter_map(statement_to_permission).collect())
}

fn statement_to_permission(st: &Value) -> Option<Permission> {
    let sid = st.get("Sid")?.as_str()?.to_string();
    let action = match st.get("Action") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(a)) => a.first()?.as_str()?.to_string(),
        _ => String::new(),
    };
    let principal = match st.get("Principal") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(p)) => p
            .get("Service")
            .or_else(|| p.get("AWS"))
            .and_then(Value::as_str)
            .map(account_from_root_arn)
            .unwrap_or_default(),
        _ => String::new(),
    };
    let cond = st.get("Condition");
    let lookup = |op: &str, key: &str| -> Option<String> {
        cond?.get(op)?.get(key)?.as_str().map(str::to_string)
    };
    Some(Permission {
        statement_id: sid,
        action,
        principal,
        source_arn: lookup("ArnLike", "AWS:SourceArn"),
        source_account: lookup("StringEquals", "AWS:SourceAccount"),
        event_source_token: lookup("StringEquals", "lambda:EventSourceToken"),
        principal_org_id: lookup("StringEquals", "aws:PrincipalOrgID"),
        function_url_auth_type: lookup(
            "StringEquals",
            "lambda:FunctionUrlAuthType",
        ),
    })
}

/// AWS renders an account principal `123456789012` as
/// `arn:aws:iam::123456789012:root`.
pub(crate) fn account_from_root_arn(principal: &str) -> String {
    principal
        .strip_prefix("arn:aws:iam::")
        .and_then(|rest| rest.strip_suffix(":root"))
        .filter(|acct| acct.len() == 12 && acct.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
        .unwrap_or_else(|| principal.to_string())
}

/// Render statements the way `GetPolicy` returns them.
pub fn render_policy(resource_arn: &str, permissions: &[Permission]) -> String {
    let statements: Vec<Value> = permissions
        .iter()
        .map(|p| {
            let principal = if p.principal == "*" {
                json!("*")
            } else if p.principal.ends_with(".amazonaws.com") {
                json!({"Service": p.principal})
            } else if p.principal.len() == 12
                && p.principal.chars().all(|c| c.is_ascii_digit())
            {
                json!({"AWS": format!("arn:aws:iam::{}:root", p.principal)})
            } else {
                json!({"AWS": p.principal})
            };
            let mut condition = Map::new();
            if let Some(arn) = &p.source_arn {
                condition.insert(
                    "ArnLike".into(),
                    json!({"AWS:SourceArn": arn}),
                );
            }
            let mut equals = Map::new();
            if let Some(v) = &p.source_account {
                equals.insert("AWS:SourceAccount".into(), json!(v));
            }
            if let Some(v) = &p.event_source_token {
                equals.insert("lambda:EventSourceToken".into(), json!(v));
            }
            if let Some(v) = &p.principal_org_id {
                equals.insert("aws:PrincipalOrgID".into(), json!(v));
            }
            if let Some(v) = &p.function_url_auth_type {
                equals.insert("lambda:FunctionUrlAuthType".into(), json!(v));
            }
            if !equals.is_empty() {
                condition.insert("StringEquals".into(), Value::Object(equals));
            }
            let mut st = json!({
                "Sid": p.statement_id,
                "Effect": "Allow",
                "Principal": principal,
                "Action": p.action,
                "Resource": resource_arn,
            });
            if !condition.is_empty() {
                st["Condition"] = Value::Object(condition);
            }
            st
        })
        .collect();
    json!({"Version": "2012-10-17", "Id": "default", "Statement": statements})
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_service_principal_with_conditions() {
        let doc = r#"{
            "Version": "2012-10-17",
            "Id": "default",
            "Statement": [{
                "Sid": "s3invoke",
                "Effect": "Allow",
                "Principal": {"Service": "s3.amazonaws.com"},
                "Action": "lambda:InvokeFunction",
                "Resource": "arn:aws:lambda:us-west-2:111122223333:function:fn:live",
                "Condition": {
                    "ArnLike": {"AWS:SourceArn": "arn:aws:s3:::bucket"},
                    "StringEquals": {"AWS:SourceAccount": "111122223333"}
                }
            }]
        }"#;
        let perms = parse_policy(doc).expect("parse");
        assert_eq!(perms.len(), 1);
        let p = &perms[0];
        assert_eq!(p.statement_id, "s3invoke");
        assert_eq!(p.principal, "s3.amazonaws.com");
        assert_eq!(p.action, "lambda:InvokeFunction");
        assert_eq!(p.source_arn.as_deref(), Some("arn:aws:s3:::bucket"));
        assert_eq!(p.source_account.as_deref(), Some("111122223333"));
    }

    #[test]
    fn account_principals_round_trip_to_account_id() {
        let perms = vec![Permission {
            statement_id: "acct".into(),
            action: "lambda:GetFunction".into(),
            principal: "123456789012".into(),
            ..Default::default()
        }];
        let doc = render_policy("arn:fn", &perms);
        assert!(doc.contains("arn:aws:iam::123456789012:root"));
        assert_eq!(parse_policy(&doc).expect("parse"), perms);
    }

    #[test]
    fn action_arrays_take_first_entry() {
        let doc = r#"{"Statement": [{"Sid": "a", "Principal": "*",
            "Action": ["lambda:InvokeFunctionUrl", "lambda:InvokeFunction"]}]}"#;
        let perms = parse_policy(doc).expect("parse");
        assert_eq!(perms[0].action, "lambda:InvokeFunctionUrl");
        assert_eq!(perms[0].principal, "*");
    }
}
