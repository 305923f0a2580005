use serde::Serialize;

#[derive(Debug)]
pub struct Masked;

pub trait MaskPolicy {
    fn mask(value: &str) -> String;
}

impl MaskPolicy for Masked {
    fn mask(value: &str) -> String {
        let len = value.chars().count();
        if len > 4 {
            let tail: String = value.chars().skip(len - 4).collect();
            "*".repeat(len - 4) + &tail
        } else {
            value.to_string()
        }
    }
}

/// Return true if a key name likely holds a bank account identifier.
fn is_account_key(key: &str) -> bool {
    let k = key.to_lowercase();
    k == "iban"
        || k.contains("accountnumber")
        || k.contains("account_number")
        || k.contains("sortcode")
        || k.contains("sort_code")
}

/// Return true if a key name holds a secret that must never be logged.
fn is_secret_key(key: &str) -> bool {
    let k = key.to_lowercase();
    k.contains("callbackstate")
        || k.contains("callback_state")
        || k == "state"
        || k.contains("authorization")
        || k.contains("api_key")
        || k.contains("apikey")
}

pub fn secure_serializable(v: impl Serialize) -> serde_json::Value {
    match serde_json::to_value(v) {
        Ok(value) => secure_value(&value),
        Err(_) => serde_json::Value::Null,
    }
}

pub fn secure_value(v: &serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    match v {
        Value::Object(map) => {
            let mut new = serde_json::Map::with_capacity(map.len());
            for (k, val) in map {
                let new_val = match val {
                    Value::String(_) if is_secret_key(k) => Value::String("***".to_string()),
                    Value::String(s) if is_account_key(k) => Value::String(Masked::mask(s)),
                    Value::Number(n) if is_account_key(k) => {
                        Value::String(Masked::mask(&n.to_string()))
                    }
                    _ => secure_value(val),
                };
                new.insert(k.clone(), new_val);
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(secure_value).collect()),
        other => other.clone(),
    }
}

/// Redact the query of a callback uri for logging
pub fn secure_uri(uri: &str) -> String {
    match uri.split_once('?') {
        Some((base, _)) => format!("{base}?***"),
        None => uri.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn masks_creditor_account() {
        let value = json!({
            "initiation": {
                "refId": "AbCd1234",
                "callbackState": "c2VjcmV0",
                "creditor": {
                    "name": "Jane Doe",
                    "iban": "GB33BUKB20201555555555",
                    "sortCode": "200000",
                    "accountNumber": "55779911"
                }
            }
        });
        let masked = secure_value(&value);
        let creditor = &masked["initiation"]["creditor"];
        assert_eq!(creditor["name"], "Jane Doe");
        assert_eq!(creditor["iban"], "******************5555");
        assert_eq!(creditor["sortCode"], "**0000");
        assert_eq!(creditor["accountNumber"], "****9911");
        assert_eq!(masked["initiation"]["callbackState"], "***");
        assert_eq!(masked["initiation"]["refId"], "AbCd1234");
    }

    #[test]
    fn short_values_are_kept() {
        assert_eq!(Masked::mask("1234"), "1234");
    }

    #[test]
    fn callback_query_is_redacted() {
        assert_eq!(
            secure_uri("obcheckout://payment-complete?payment-id=1&state=s"),
            "obcheckout://payment-complete?***"
        );
    }
}
