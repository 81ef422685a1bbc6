//! Raw response shapes as the provider sends them.
//!
//! Item fields keep the provider's column codes verbatim (`occrrnc_cnt`,
//! `caslt_cnt`, ...). Renaming to domain names happens in
//! [`crate::normalize`].

use std::fmt::Display;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Result code of a successful call.
pub const SUCCESS_CODE: &str = "00";

/// Result code when the query matched nothing.
pub const NO_DATA_CODE: &str = "03";

/// Result code for a rejected query parameter.
pub const PARAMETER_ERROR_CODE: &str = "10";

/// Result code for an unspecified provider failure.
pub const UNKNOWN_ERROR_CODE: &str = "99";

/// Human-readable meaning of a provider result code.
#[must_use]
pub fn describe_result_code(code: &str) -> &'static str {
    match code {
        SUCCESS_CODE => "success",
        NO_DATA_CODE => "no data",
        PARAMETER_ERROR_CODE => "parameter error",
        UNKNOWN_ERROR_CODE => "unknown error",
        _ => "unrecognized result code",
    }
}

/// Common response envelope for every resource.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default, deserialize_with = "lenient_string")]
    pub result_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub result_msg: Option<String>,
    /// Raw items, decoded one by one by the normalizer.
    #[serde(default, deserialize_with = "deserialize_items")]
    pub items: Vec<Value>,
    /// Paging metadata is informational; a value that does not parse is
    /// dropped rather than rejecting the envelope.
    #[serde(default, deserialize_with = "number_or_none")]
    pub total_count: Option<u32>,
    #[serde(default, deserialize_with = "number_or_none")]
    pub num_of_rows: Option<u32>,
    #[serde(default, deserialize_with = "number_or_none")]
    pub page_no: Option<u32>,
}

impl Envelope {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result_code.as_deref() == Some(SUCCESS_CODE)
    }

    #[must_use]
    pub fn result_code(&self) -> &str {
        self.result_code.as_deref().unwrap_or("")
    }
}

/// Accepts `items` as a bare array, `{"item": [...]}`, `{"item": {...}}`,
/// a single object, or null.
fn deserialize_items<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;

    Ok(match raw {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(Value::Object(mut map)) => match map.remove("item") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) => Vec::new(),
            Some(item) => vec![item],
            None if map.is_empty() => Vec::new(),
            None => vec![Value::Object(map)],
        },
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "items must be an array or object, got {other}"
            )));
        }
    })
}

/// Accepts a string, number or boolean as text. Null is `None`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a string, got {other}"
        ))),
    }
}

/// Accepts a JSON number or a numeric string. Null and blank strings are
/// `None`; text that does not parse is an error.
fn lenient_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    number_from_value(raw).map_err(D::Error::custom)
}

/// Like [`lenient_number`], but a value that does not parse becomes `None`.
fn number_or_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(number_from_value(raw).unwrap_or_else(|e| {
        log::debug!("Ignoring unparseable paging value: {e}");
        None
    }))
}

fn number_from_value<T>(raw: Option<Value>) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: Display,
{
    let text = match raw {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s,
        Some(other) => return Err(format!("expected a number, got {other}")),
    };
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    text.parse::<T>()
        .map(Some)
        .map_err(|e| format!("invalid number {text:?}: {e}"))
}

/// Parses a response body. A body that is not an envelope is treated as
/// absent and logged.
#[must_use]
pub fn parse_envelope(body: &str) -> Option<Envelope> {
    match serde_json::from_str(body) {
        Ok(envelope) => Some(envelope),
        Err(e) => {
            let preview: String = body.chars().take(200).collect();
            log::warn!("Response body is not a valid envelope: {e} (body: {preview})");
            None
        }
    }
}

/// Hotspot item shared by the four `frequentzone` resources.
#[derive(Debug, Clone, Deserialize)]
pub struct AccidentItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub afos_fid: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub afos_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bjd_cd: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub spot_cd: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub sido_sgg_nm: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub spot_nm: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub occrrnc_cnt: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub caslt_cnt: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub dth_dnv_cnt: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub se_dnv_cnt: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub sl_dnv_cnt: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub wnd_dnv_cnt: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub lo_crd: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub la_crd: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub geom_json: Option<String>,
}

/// Item of the `/stt` statistics resource.
#[derive(Debug, Clone, Deserialize)]
pub struct StatisticsItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub std_year: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub acc_cl_nm: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub sido_sgg_nm: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub acc_cnt: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub acc_cnt_cmrt: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub dth_dnv_cnt: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub dth_dnv_cnt_cmrt: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub ftlt_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub injpsn_cnt: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub injpsn_cnt_cmrt: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub tot_acc_cnt: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub tot_dth_dnv_cnt: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub tot_injpsn_cnt: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub pop_100k: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub car_10k: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub cnt_027_01: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub cnt_027_02: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub cnt_027_03: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub cnt_027_04: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub cnt_027_05: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub cnt_027_06: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub cnt_027_07: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub cnt_027_99: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub cnt_014_01: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub cnt_014_02: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub cnt_014_03: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub cnt_014_04: Option<u32>,
}

/// Item of the `/accident/riskArea` resource.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskAreaItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub acc_risk_area_nm: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub tot_acc_cnt: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub tot_dth_dnv_cnt: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub tot_se_dnv_cnt: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub tot_sl_dnv_cnt: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub tot_wnd_dnv_cnt: Option<u32>,
    /// Quasi-array text such as `["기타","U턴중"]`.
    #[serde(default, deserialize_with = "lenient_string")]
    pub cause_anals_ty_nm: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub cntpnt_utmk_x_crd: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub cntpnt_utmk_y_crd: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub geom_wkt: Option<String>,
}

/// Item of the `/road/dgdgr/link` real-time index resource.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskIndexItem {
    #[serde(default, deserialize_with = "lenient_number")]
    pub index: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub line_string: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub anals_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub anals_grd: Option<i32>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(value: &Value) -> Option<Envelope> {
        parse_envelope(&value.to_string())
    }

    #[test]
    fn items_accept_every_container_shape() {
        let bare = parse(&json!({"resultCode": "00", "items": [{"a": 1}, {"a": 2}]})).unwrap();
        assert_eq!(bare.items.len(), 2);

        let nested = parse(&json!({"resultCode": "00", "items": {"item": [{"a": 1}]}})).unwrap();
        assert_eq!(nested.items.len(), 1);

        let single = parse(&json!({"resultCode": "00", "items": {"item": {"a": 1}}})).unwrap();
        assert_eq!(single.items, vec![json!({"a": 1})]);

        let null = parse(&json!({"resultCode": "00", "items": null})).unwrap();
        assert!(null.items.is_empty());

        let missing = parse(&json!({"resultCode": "03", "resultMsg": "NODATA_ERROR"})).unwrap();
        assert!(missing.items.is_empty());
        assert!(!missing.is_success());

        let empty_wrapper = parse(&json!({"resultCode": "00", "items": {}})).unwrap();
        assert!(empty_wrapper.items.is_empty());
    }

    #[test]
    fn non_json_body_is_absent() {
        assert!(parse_envelope("<html>Service Unavailable</html>").is_none());
        assert!(parse_envelope("").is_none());
        assert!(parse(&json!({"resultCode": "00", "items": "oops"})).is_none());
    }

    #[test]
    fn success_sentinel() {
        let envelope = parse(&json!({"resultCode": "00", "totalCount": 3})).unwrap();
        assert!(envelope.is_success());
        assert_eq!(envelope.total_count, Some(3));
        assert_eq!(describe_result_code(envelope.result_code()), "success");
        assert_eq!(describe_result_code("10"), "parameter error");
        assert_eq!(describe_result_code("42"), "unrecognized result code");
    }

    #[test]
    fn quoted_numbers_and_numeric_ids_are_coerced() {
        let item: AccidentItem = serde_json::from_value(json!({
            "afos_fid": 6_129_113,
            "bjd_cd": 1_168_010_100_i64,
            "occrrnc_cnt": "6",
            "caslt_cnt": " 8 ",
            "dth_dnv_cnt": "",
            "lo_crd": "127.04",
            "la_crd": 37.5
        }))
        .unwrap();
        assert_eq!(item.afos_fid.as_deref(), Some("6129113"));
        assert_eq!(item.bjd_cd.as_deref(), Some("1168010100"));
        assert_eq!(item.occrrnc_cnt, Some(6));
        assert_eq!(item.caslt_cnt, Some(8));
        assert_eq!(item.dth_dnv_cnt, None);
        assert_eq!(item.lo_crd, Some(127.04));
        assert_eq!(item.la_crd, Some(37.5));
    }

    #[test]
    fn non_numeric_count_text_is_still_rejected() {
        let result = serde_json::from_value::<AccidentItem>(json!({"occrrnc_cnt": "many"}));
        assert!(result.is_err());
    }

    #[test]
    fn risk_index_grade_may_be_quoted() {
        let item: RiskIndexItem =
            serde_json::from_value(json!({"index": "3", "anals_value": "0.82", "anals_grd": "4"}))
                .unwrap();
        assert_eq!(item.index, Some(3));
        assert_eq!(item.anals_value, Some(0.82));
        assert_eq!(item.anals_grd, Some(4));
    }

    #[test]
    fn paging_metadata_never_rejects_the_envelope() {
        let quoted = parse(&json!({
            "resultCode": "00",
            "totalCount": "3",
            "numOfRows": "10",
            "pageNo": 1,
            "items": [{"afos_id": "x"}]
        }))
        .unwrap();
        assert_eq!(quoted.total_count, Some(3));
        assert_eq!(quoted.num_of_rows, Some(10));
        assert_eq!(quoted.items.len(), 1);

        let garbage = parse(&json!({
            "resultCode": "00",
            "totalCount": "about three",
            "pageNo": [1],
            "items": [{"afos_id": "x"}]
        }))
        .unwrap();
        assert_eq!(garbage.total_count, None);
        assert_eq!(garbage.page_no, None);
        assert_eq!(garbage.items.len(), 1);
        assert!(garbage.is_success());
    }

    #[test]
    fn accident_item_reads_provider_codes() {
        let item: AccidentItem = serde_json::from_value(json!({
            "afos_fid": "6129113",
            "sido_sgg_nm": "서울특별시 강남구",
            "occrrnc_cnt": 7,
            "caslt_cnt": 8,
            "dth_dnv_cnt": 0,
            "lo_crd": 127.04,
            "la_crd": 37.50,
            "extra_field": "ignored"
        }))
        .unwrap();
        assert_eq!(item.afos_fid.as_deref(), Some("6129113"));
        assert_eq!(item.occrrnc_cnt, Some(7));
        assert_eq!(item.se_dnv_cnt, None);
    }
}
