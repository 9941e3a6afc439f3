// Nixora — Amount normalization.
// Counters one observed model failure mode: re-emitting "0.01" as "1" (or
// similar) when echoing tool-call arguments. A mitigation for an untyped
// backend, not a protocol guarantee.

use serde_json::Value;

/// Normalize a transfer amount while preserving user-intended decimal
/// precision through the model round-trip.
///
/// Rules:
///   • A string already starting with `"0."` is returned unchanged.
///   • Otherwise the value is coerced to a decimal string; values below 1
///     are re-rendered with at least two decimal places, and at least as
///     many as the original input carried.
///   • Values ≥ 1 use the standard decimal rendering.
///
/// Idempotent on its own output for the `"0."`-prefixed branch.
pub fn normalize(amount: &Value) -> String {
    let raw = match amount {
        Value::String(s) => s.trim().to_string(),
        // std Display, not serde_json's renderer: the latter switches to
        // exponent notation at 1e-6, which would strip the leading zeros
        // off the minimum transferable amount.
        Value::Number(n) => match n.as_f64() {
            Some(f) => format!("{f}"),
            None => n.to_string(),
        },
        other => other.to_string(),
    };

    if raw.starts_with("0.") {
        return raw;
    }

    let parsed: f64 = match raw.parse() {
        Ok(v) => v,
        // Not a number at all — leave it for transfer validation to reject.
        Err(_) => return raw,
    };

    if parsed < 1.0 {
        // Exponent-form input carries no visible decimals; count them on
        // the plain decimal rendering instead.
        let rendered = format!("{parsed}");
        let source = if raw.contains(['e', 'E']) { &rendered } else { &raw };
        let original_decimals = source.split('.').nth(1).map(|d| d.len()).unwrap_or(0);
        format!("{:.*}", original_decimals.max(2), parsed)
    } else {
        parsed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_leading_zero_strings_pass_through() {
        for s in ["0.01", "0.5", "0.000001", "0.123456789"] {
            assert_eq!(normalize(&json!(s)), s);
        }
    }

    #[test]
    fn test_idempotent_on_own_output() {
        let once = normalize(&json!("0.0100"));
        let twice = normalize(&json!(once.clone()));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_sub_one_gets_minimum_two_decimals() {
        // ".5" does not hit the pass-through branch but must keep precision.
        assert_eq!(normalize(&json!(".5")), "0.50");
        assert_eq!(normalize(&json!(0.5)), "0.5"); // Number renders as "0.5" → pass-through
    }

    #[test]
    fn test_original_decimal_count_preserved() {
        assert_eq!(normalize(&json!(".123")), "0.123");
        assert_eq!(normalize(&json!(".1234")), "0.1234");
    }

    #[test]
    fn test_whole_and_mixed_amounts() {
        assert_eq!(normalize(&json!("5")), "5");
        assert_eq!(normalize(&json!("2.50")), "2.5");
        assert_eq!(normalize(&json!(42)), "42");
    }

    #[test]
    fn test_numeric_minimum_keeps_decimal_form() {
        // 1e-6 is where serde_json's number rendering goes exponential.
        assert_eq!(normalize(&json!(0.000001)), "0.000001");
        assert_eq!(normalize(&json!(0.00001)), "0.00001");
    }

    #[test]
    fn test_exponent_strings_rendered_decimal() {
        assert_eq!(normalize(&json!("1e-6")), "0.000001");
        assert_eq!(normalize(&json!("2.5E-4")), "0.00025");
    }

    #[test]
    fn test_non_numeric_left_for_validation() {
        assert_eq!(normalize(&json!("lots")), "lots");
    }
}
