//! Decoding of config values into accessor types.

use dynopts_core::{into_value, AccessorInfo, OptionValue, ResolveError, Value};
use serde_json::Value as JsonValue;

/// Decode a raw config value into the type `info` declares.
///
/// Returns `Ok(None)` for types with no config representation, so the
/// accessor falls through to its default.
pub fn decode(info: &AccessorInfo, raw: &JsonValue) -> Result<Option<Value>, ResolveError> {
    let decoded = if info.is::<String>() {
        raw.as_str().map(|s| into_value(s.to_string()))
    } else if info.is::<bool>() {
        raw.as_bool().map(into_value)
    } else if info.is::<u8>() {
        integer::<u8>(raw)
    } else if info.is::<u16>() {
        integer::<u16>(raw)
    } else if info.is::<u32>() {
        integer::<u32>(raw)
    } else if info.is::<u64>() {
        integer::<u64>(raw)
    } else if info.is::<usize>() {
        integer::<usize>(raw)
    } else if info.is::<i32>() {
        integer::<i32>(raw)
    } else if info.is::<i64>() {
        integer::<i64>(raw)
    } else if info.is::<f64>() {
        raw.as_f64().map(into_value)
    } else if info.is::<Vec<String>>() {
        string_list(raw).map(into_value)
    } else if info.is::<JsonValue>() {
        Some(into_value(raw.clone()))
    } else {
        tracing::debug!(
            target: "dynopts::config",
            option = info.name(),
            type_name = info.type_name(),
            "No config decoding for option type"
        );
        return Ok(None);
    };

    decoded.map(Some).ok_or_else(|| ResolveError::Decode {
        accessor: info.name().to_string(),
        expected: info.type_name(),
        found: raw.to_string(),
    })
}

fn integer<T>(raw: &JsonValue) -> Option<Value>
where
    T: TryFrom<i64> + TryFrom<u64> + OptionValue,
{
    let value = match (raw.as_i64(), raw.as_u64()) {
        (Some(i), _) => <T as TryFrom<i64>>::try_from(i).ok(),
        (None, Some(u)) => <T as TryFrom<u64>>::try_from(u).ok(),
        _ => None,
    };
    value.map(into_value)
}

fn string_list(raw: &JsonValue) -> Option<Vec<String>> {
    raw.as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynopts_core::Contract;
    use serde_json::json;

    struct Probe;

    fn info_for(contract: &Contract<Probe>, name: &str) -> AccessorInfo {
        contract.accessor(name).unwrap().info().clone()
    }

    fn probe() -> Contract<Probe> {
        Contract::builder("Probe")
            .required::<String>("name")
            .required::<bool>("wrap")
            .required::<u32>("width")
            .required::<i64>("offset")
            .required::<f64>("ratio")
            .required::<Vec<String>>("keywords")
            .required::<JsonValue>("raw")
            .required::<std::time::Duration>("timeout")
            .build()
    }

    #[test]
    fn test_decode_scalars() {
        let contract = probe();
        let name = decode(&info_for(&contract, "name"), &json!("Cypher")).unwrap().unwrap();
        assert_eq!(name.downcast_ref::<String>().unwrap(), "Cypher");

        let wrap = decode(&info_for(&contract, "wrap"), &json!(true)).unwrap().unwrap();
        assert_eq!(wrap.downcast_ref::<bool>(), Some(&true));

        let width = decode(&info_for(&contract, "width"), &json!(72)).unwrap().unwrap();
        assert_eq!(width.downcast_ref::<u32>(), Some(&72));

        let offset = decode(&info_for(&contract, "offset"), &json!(-3)).unwrap().unwrap();
        assert_eq!(offset.downcast_ref::<i64>(), Some(&-3));

        let ratio = decode(&info_for(&contract, "ratio"), &json!(2)).unwrap().unwrap();
        assert_eq!(ratio.downcast_ref::<f64>(), Some(&2.0));
    }

    #[test]
    fn test_decode_list_and_raw() {
        let contract = probe();
        let keywords = decode(&info_for(&contract, "keywords"), &json!(["MATCH", "RETURN"]))
            .unwrap()
            .unwrap();
        assert_eq!(
            keywords.downcast_ref::<Vec<String>>().unwrap(),
            &vec!["MATCH".to_string(), "RETURN".to_string()]
        );

        let raw = decode(&info_for(&contract, "raw"), &json!({"a": 1})).unwrap().unwrap();
        assert_eq!(raw.downcast_ref::<JsonValue>(), Some(&json!({"a": 1})));
    }

    #[test]
    fn test_decode_wrong_shape() {
        let contract = probe();
        let err = decode(&info_for(&contract, "width"), &json!("wide")).unwrap_err();
        assert!(matches!(err, ResolveError::Decode { ref accessor, .. } if accessor == "width"));

        assert!(decode(&info_for(&contract, "width"), &json!(-1)).is_err());
        assert!(decode(&info_for(&contract, "keywords"), &json!(["a", 1])).is_err());
    }

    #[test]
    fn test_unsupported_type_has_no_opinion() {
        let contract = probe();
        assert!(decode(&info_for(&contract, "timeout"), &json!(30)).unwrap().is_none());
    }
}
