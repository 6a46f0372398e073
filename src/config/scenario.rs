//! Scenario overlay
//!
//! Scenarios are partial overrides expressed as JSON values, folded onto
//! the defaults with a shallow merge per nested record. Arrays of objects
//! carrying a `productType` key (the balance sheet, liquidity-tagged
//! lists) are matched element-wise by product rather than replaced
//! wholesale, so a scenario can retune one line without restating the
//! whole book.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::SimulationConfig;
use crate::error::SimulationError;
use crate::models::state::BankState;

/// Partial overrides for a scenario: either side may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
}

/// Fold scenario overrides onto a config and an initial state.
///
/// Returns fresh values; the inputs are untouched.
pub fn apply_scenario(
    config: &SimulationConfig,
    state: &BankState,
    overrides: &ScenarioOverrides,
) -> Result<(SimulationConfig, BankState), SimulationError> {
    let merged_config = match &overrides.config {
        Some(patch) => overlay_typed(config, patch)?,
        None => config.clone(),
    };
    merged_config.validate()?;
    let merged_state = match &overrides.state {
        Some(patch) => overlay_typed(state, patch)?,
        None => state.clone(),
    };
    Ok((merged_config, merged_state))
}

fn overlay_typed<T>(base: &T, patch: &Value) -> Result<T, SimulationError>
where
    T: Serialize + serde::de::DeserializeOwned,
{
    let base_value =
        serde_json::to_value(base).map_err(|e| SimulationError::Serialization(e.to_string()))?;
    let merged = merge(base_value, patch);
    serde_json::from_value(merged).map_err(|e| SimulationError::Serialization(e.to_string()))
}

/// Recursive shallow merge: objects merge key-by-key, product-keyed
/// arrays merge by `productType`, everything else is replaced.
fn merge(base: Value, patch: &Value) -> Value {
    match (base, patch) {
        (Value::Object(mut base_map), Value::Object(patch_map)) => {
            for (key, patch_val) in patch_map {
                let merged = match base_map.remove(key) {
                    Some(base_val) => merge(base_val, patch_val),
                    None => patch_val.clone(),
                };
                base_map.insert(key.clone(), merged);
            }
            Value::Object(base_map)
        }
        (Value::Array(base_arr), Value::Array(patch_arr))
            if is_product_keyed(&base_arr) && is_product_keyed(patch_arr) =>
        {
            merge_product_array(base_arr, patch_arr)
        }
        (_, patch_val) => patch_val.clone(),
    }
}

fn product_key(value: &Value) -> Option<&str> {
    value.get("productType").and_then(Value::as_str)
}

fn is_product_keyed(arr: &[Value]) -> bool {
    !arr.is_empty() && arr.iter().all(|v| product_key(v).is_some())
}

fn merge_product_array(base: Vec<Value>, patch: &[Value]) -> Value {
    let mut out = base;
    for patch_item in patch {
        let key = product_key(patch_item).map(str::to_owned);
        let existing = out
            .iter()
            .position(|item| product_key(item).map(str::to_owned) == key);
        match existing {
            Some(pos) => {
                let base_item = out[pos].take();
                out[pos] = merge(base_item, patch_item);
            }
            None => out.push(patch_item.clone()),
        }
    }
    Value::Array(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::default_bank_state;
    use crate::models::product::ProductType;
    use serde_json::json;

    #[test]
    fn test_empty_overrides_are_identity() {
        let config = SimulationConfig::default();
        let state = default_bank_state(1);
        let (c, s) = apply_scenario(&config, &state, &ScenarioOverrides::default()).unwrap();
        assert_eq!(c, config);
        assert_eq!(s, state);
    }

    #[test]
    fn test_config_scalar_override_is_shallow() {
        let config = SimulationConfig::default();
        let state = default_bank_state(1);
        let overrides = ScenarioOverrides {
            config: Some(json!({ "global": { "taxRate": 0.19 } })),
            state: None,
        };
        let (c, _) = apply_scenario(&config, &state, &overrides).unwrap();
        assert_eq!(c.global.tax_rate, 0.19);
        // Sibling fields untouched by the shallow merge.
        assert_eq!(
            c.global.operating_cost_ratio,
            config.global.operating_cost_ratio
        );
    }

    #[test]
    fn test_balance_sheet_items_match_by_product_type() {
        let config = SimulationConfig::default();
        let state = default_bank_state(1);
        let overrides = ScenarioOverrides {
            config: None,
            state: Some(json!({
                "balanceSheet": [
                    { "productType": "gilts", "balance": 75.0e9 }
                ],
                "capital": { "cet1": 21.0e9 }
            })),
        };
        let (_, s) = apply_scenario(&config, &state, &overrides).unwrap();
        let gilts = s.balance_sheet.get(ProductType::Gilts).unwrap();
        assert_eq!(gilts.balance, 75.0e9);
        // Unpatched fields of the patched item survive.
        assert_eq!(
            gilts.interest_rate,
            state
                .balance_sheet
                .get(ProductType::Gilts)
                .unwrap()
                .interest_rate
        );
        // Other items survive untouched, in order.
        assert_eq!(
            s.balance_sheet.items().len(),
            state.balance_sheet.items().len()
        );
        assert_eq!(s.capital.cet1, 21.0e9);
        assert_eq!(s.capital.at1, state.capital.at1);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let config = SimulationConfig::default();
        let state = default_bank_state(1);
        let overrides = ScenarioOverrides {
            config: Some(json!({ "global": { "taxRate": 2.0 } })),
            state: None,
        };
        assert!(apply_scenario(&config, &state, &overrides).is_err());
    }

    #[test]
    fn test_new_product_line_appends() {
        let config = SimulationConfig::default();
        let state = default_bank_state(1);
        let overrides = ScenarioOverrides {
            config: None,
            state: Some(json!({
                "balanceSheet": [{
                    "productType": "reverseRepo",
                    "balance": 5.0e9,
                    "interestRate": 0.04,
                    "maturityBucket": "1m",
                    "encumbered": 0.0,
                    "liquidity": { "hqlaLevel": "none" }
                }]
            })),
        };
        let (_, s) = apply_scenario(&config, &state, &overrides).unwrap();
        assert_eq!(
            s.balance_sheet.get(ProductType::ReverseRepo).unwrap().balance,
            5.0e9
        );
    }
}
