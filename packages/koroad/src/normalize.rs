//! Converts provider envelopes into normalized records.
//!
//! Nothing here returns an error. An absent envelope, a non-success result
//! code, or an empty item list all yield an empty result, since the
//! provider answers legitimately empty queries the same way. Each item is
//! decoded independently: one malformed record is logged and dropped while
//! the rest of the batch is kept.

use safewalk_koroad_models::{
    AccidentData, AccidentStatisticsData, Endpoint, HotspotCategory, RiskAreaData, RiskIndexData,
};
use safewalk_risk_models::classify;
use serde::de::DeserializeOwned;

use crate::wire::{
    AccidentItem, Envelope, RiskAreaItem, RiskIndexItem, StatisticsItem, describe_result_code,
};

/// A single item that could not be decoded into its wire shape.
#[derive(Debug, thiserror::Error)]
#[error("[{endpoint}] item {index} could not be mapped: {source}")]
pub struct ItemMappingError {
    pub endpoint: Endpoint,
    /// Position in the envelope's item list.
    pub index: usize,
    #[source]
    pub source: serde_json::Error,
}

/// Outcome of mapping one envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapped<T> {
    pub records: Vec<T>,
    /// Items dropped because they failed to decode.
    pub dropped: usize,
}

impl<T> Mapped<T> {
    const fn empty() -> Self {
        Self {
            records: Vec::new(),
            dropped: 0,
        }
    }
}

/// Decodes every item of a successful envelope, isolating failures.
#[must_use]
pub fn map_items<W, T>(
    endpoint: Endpoint,
    envelope: Option<&Envelope>,
    convert: impl Fn(W) -> T,
) -> Mapped<T>
where
    W: DeserializeOwned,
{
    let Some(envelope) = envelope else {
        log::warn!("[{endpoint}] no response envelope");
        return Mapped::empty();
    };

    if !envelope.is_success() {
        let code = envelope.result_code();
        log::warn!(
            "[{endpoint}] provider returned result code {code:?} ({}): {}",
            describe_result_code(code),
            envelope.result_msg.as_deref().unwrap_or("")
        );
        return Mapped::empty();
    }

    if envelope.items.is_empty() {
        log::debug!("[{endpoint}] response contained no items");
        return Mapped::empty();
    }

    let mut records = Vec::with_capacity(envelope.items.len());
    let mut attempted = 0_usize;
    let mut dropped = 0_usize;

    for (index, item) in envelope.items.iter().enumerate() {
        if item.is_null() {
            continue;
        }
        attempted += 1;
        match <W as serde::Deserialize>::deserialize(item) {
            Ok(wire) => records.push(convert(wire)),
            Err(source) => {
                dropped += 1;
                let err = ItemMappingError {
                    endpoint,
                    index,
                    source,
                };
                log::error!("{err}");
            }
        }
    }

    log_mapping_stats(endpoint, records.len(), attempted);

    Mapped { records, dropped }
}

#[allow(clippy::cast_precision_loss)]
fn log_mapping_stats(endpoint: Endpoint, mapped: usize, attempted: usize) {
    let success_rate = if attempted == 0 {
        0.0
    } else {
        mapped as f64 / attempted as f64 * 100.0
    };
    log::info!("[{endpoint}] mapped {mapped}/{attempted} items ({success_rate:.1}% success)");
}

/// Hotspot records from one of the four `frequentzone` resources.
#[must_use]
pub fn to_accident_data_list(
    envelope: Option<&Envelope>,
    category: HotspotCategory,
) -> Vec<AccidentData> {
    map_items(category.endpoint(), envelope, |item: AccidentItem| {
        accident_data(item, category)
    })
    .records
}

#[must_use]
pub fn to_accident_statistics_list(envelope: Option<&Envelope>) -> Vec<AccidentStatisticsData> {
    map_items(Endpoint::AccidentStatistics, envelope, accident_statistics).records
}

#[must_use]
pub fn to_risk_area_list(envelope: Option<&Envelope>) -> Vec<RiskAreaData> {
    map_items(Endpoint::LinkRiskAreas, envelope, risk_area).records
}

/// The first risk index item, if any.
#[must_use]
pub fn to_risk_index(envelope: Option<&Envelope>) -> Option<RiskIndexData> {
    let first = map_items(Endpoint::RoadRiskIndex, envelope, risk_index)
        .records
        .into_iter()
        .next();
    if first.is_none() {
        log::info!("[{}] no risk index data for route", Endpoint::RoadRiskIndex);
    }
    first
}

fn accident_data(item: AccidentItem, category: HotspotCategory) -> AccidentData {
    AccidentData {
        afos_fid: item.afos_fid,
        afos_id: item.afos_id,
        legal_dong_code: item.bjd_cd,
        spot_code: item.spot_cd,
        region_name: item.sido_sgg_nm,
        spot_name: item.spot_nm,
        accident_count: item.occrrnc_cnt,
        casualty_count: item.caslt_cnt,
        death_count: item.dth_dnv_cnt,
        serious_injury_count: item.se_dnv_cnt,
        minor_injury_count: item.sl_dnv_cnt,
        injury_report_count: item.wnd_dnv_cnt,
        longitude: item.lo_crd,
        latitude: item.la_crd,
        geometry_json: item.geom_json,
        api_type: category,
    }
}

fn accident_statistics(item: StatisticsItem) -> AccidentStatisticsData {
    AccidentStatisticsData {
        standard_year: item.std_year,
        accident_classification_name: item.acc_cl_nm,
        region_name: item.sido_sgg_nm,
        accident_count: item.acc_cnt,
        accident_count_ratio: item.acc_cnt_cmrt,
        death_count: item.dth_dnv_cnt,
        death_count_ratio: item.dth_dnv_cnt_cmrt,
        fatality_rate: item.ftlt_rate,
        injured_person_count: item.injpsn_cnt,
        injured_person_count_ratio: item.injpsn_cnt_cmrt,
        total_accident_count: item.tot_acc_cnt,
        total_death_count: item.tot_dth_dnv_cnt,
        total_injured_person_count: item.tot_injpsn_cnt,
        accidents_per_100k_population: item.pop_100k,
        accidents_per_10k_vehicles: item.car_10k,
        speeding_count: item.cnt_027_01,
        center_line_violation_count: item.cnt_027_02,
        signal_violation_count: item.cnt_027_03,
        safe_distance_violation_count: item.cnt_027_04,
        safe_driving_violation_count: item.cnt_027_05,
        intersection_violation_count: item.cnt_027_06,
        pedestrian_protection_violation_count: item.cnt_027_07,
        other_violation_count: item.cnt_027_99,
        vehicle_vs_pedestrian_count: item.cnt_014_01,
        vehicle_vs_vehicle_count: item.cnt_014_02,
        single_vehicle_count: item.cnt_014_03,
        railway_crossing_count: item.cnt_014_04,
    }
}

fn risk_area(item: RiskAreaItem) -> RiskAreaData {
    RiskAreaData {
        accident_analysis_types: parse_accident_analysis_types(item.cause_anals_ty_nm.as_deref()),
        risk_area_name: item.acc_risk_area_nm,
        total_accident_count: item.tot_acc_cnt,
        total_death_count: item.tot_dth_dnv_cnt,
        total_serious_injury_count: item.tot_se_dnv_cnt,
        total_minor_injury_count: item.tot_sl_dnv_cnt,
        total_injury_report_count: item.tot_wnd_dnv_cnt,
        center_point_utmk_x: item.cntpnt_utmk_x_crd,
        center_point_utmk_y: item.cntpnt_utmk_y_crd,
        geometry_wkt: item.geom_wkt,
    }
}

fn risk_index(item: RiskIndexItem) -> RiskIndexData {
    RiskIndexData {
        index: item.index,
        line_string: item.line_string,
        analysis_value: item.anals_value,
        analysis_grade: item.anals_grd,
        risk_level: classify::from_api_grade(item.anals_grd),
    }
}

/// Splits the provider's cause-analysis text into trimmed tags.
///
/// Accepts a JSON string array or the looser `[a, "b", 'c']` form. If no
/// tag can be extracted the raw text is kept as the only element.
#[must_use]
pub fn parse_accident_analysis_types(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if let Ok(tags) = serde_json::from_str::<Vec<String>>(trimmed) {
        return tags
            .into_iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();
    }

    let inner = trimmed.trim_start_matches('[').trim_end_matches(']');
    let tags: Vec<String> = inner
        .split(',')
        .map(|tag| tag.trim().trim_matches(|c| c == '"' || c == '\'').trim())
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect();

    if tags.is_empty() {
        log::warn!("Could not parse cause-analysis tags, keeping raw text: {raw:?}");
        return vec![raw.to_string()];
    }
    tags
}

#[cfg(test)]
mod tests {
    use safewalk_risk_models::RiskLevel;
    use serde_json::{Value, json};

    use super::*;
    use crate::test_support;
    use crate::wire::parse_envelope;

    fn envelope(items: &Value) -> Envelope {
        parse_envelope(&test_support::envelope(items).to_string()).unwrap()
    }

    fn hotspot_item(id: &str) -> Value {
        json!({
            "afos_id": id,
            "sido_sgg_nm": "서울특별시 강남구",
            "spot_nm": "역삼동 (선릉역사거리 부근)",
            "occrrnc_cnt": 6,
            "caslt_cnt": 7,
            "dth_dnv_cnt": 0,
            "se_dnv_cnt": 3,
            "sl_dnv_cnt": 4,
            "wnd_dnv_cnt": 0,
            "lo_crd": 127.0489,
            "la_crd": 37.5045
        })
    }

    #[test]
    fn hotspot_fields_are_renamed() {
        let env = envelope(&json!([hotspot_item("2023001")]));
        let records = to_accident_data_list(Some(&env), HotspotCategory::ElderlyPedestrian);

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.afos_id.as_deref(), Some("2023001"));
        assert_eq!(record.region_name.as_deref(), Some("서울특별시 강남구"));
        assert_eq!(record.accident_count, Some(6));
        assert_eq!(record.serious_injury_count, Some(3));
        assert_eq!(record.minor_injury_count, Some(4));
        assert_eq!(record.api_type, HotspotCategory::ElderlyPedestrian);
        assert!(record.has_valid_location());
    }

    #[test]
    fn one_malformed_item_is_dropped() {
        let env = envelope(&json!([
            hotspot_item("a"),
            {"afos_id": "b", "occrrnc_cnt": "many"},
            hotspot_item("c"),
            hotspot_item("d"),
        ]));

        let mapped = map_items(Endpoint::PedestrianAccidents, Some(&env), |item: AccidentItem| {
            accident_data(item, HotspotCategory::Pedestrian)
        });

        assert_eq!(mapped.records.len(), 3);
        assert_eq!(mapped.dropped, 1);
        let ids: Vec<_> = mapped
            .records
            .iter()
            .filter_map(|r| r.afos_id.as_deref())
            .collect();
        assert_eq!(ids, vec!["a", "c", "d"]);
    }

    #[test]
    fn loosely_typed_items_are_all_kept() {
        let env = envelope(&json!([
            {"afos_fid": 6_129_113, "afos_id": "a", "occrrnc_cnt": 4},
            {"afos_id": "b", "lo_crd": "127.04", "la_crd": "37.50"},
            {"afos_id": "c", "occrrnc_cnt": "6", "caslt_cnt": "7"},
        ]));

        let records = to_accident_data_list(Some(&env), HotspotCategory::Pedestrian);

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].afos_fid.as_deref(), Some("6129113"));
        assert_eq!(records[1].longitude, Some(127.04));
        assert!(records[1].has_valid_location());
        assert_eq!(records[2].accident_count, Some(6));
        assert_eq!(records[2].casualty_count, Some(7));
    }

    #[test]
    fn quoted_total_count_keeps_the_batch() {
        let env = parse_envelope(
            r#"{"resultCode":"00","totalCount":"3","items":[{"afos_id":"x"}]}"#,
        )
        .unwrap();
        let records = to_accident_data_list(Some(&env), HotspotCategory::Holiday);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn null_entries_are_skipped_without_counting_as_failures() {
        let env = envelope(&json!([null, hotspot_item("a")]));
        let mapped = map_items(Endpoint::HolidayAccidents, Some(&env), |item: AccidentItem| {
            accident_data(item, HotspotCategory::Holiday)
        });
        assert_eq!(mapped.records.len(), 1);
        assert_eq!(mapped.dropped, 0);
    }

    #[test]
    fn empty_and_absent_inputs_yield_empty() {
        assert!(to_accident_statistics_list(None).is_empty());
        assert!(to_risk_area_list(Some(&envelope(&json!([])))).is_empty());

        let null_items = parse_envelope(r#"{"resultCode":"00","items":null}"#).unwrap();
        assert!(to_accident_data_list(Some(&null_items), HotspotCategory::Pedestrian).is_empty());
        assert!(to_risk_index(None).is_none());
    }

    #[test]
    fn non_success_code_yields_empty() {
        let env = parse_envelope(
            &json!({
                "resultCode": "10",
                "resultMsg": "INVALID_REQUEST_PARAMETER_ERROR",
                "items": [hotspot_item("a")]
            })
            .to_string(),
        )
        .unwrap();

        assert!(to_accident_data_list(Some(&env), HotspotCategory::Pedestrian).is_empty());
        assert!(to_risk_index(Some(&env)).is_none());
    }

    #[test]
    fn statistics_codes_map_to_named_counts() {
        let env = envelope(&json!([{
            "std_year": "2023",
            "acc_cl_nm": "보행노인사고",
            "sido_sgg_nm": "서울특별시 강남구",
            "acc_cnt": 120,
            "ftlt_rate": 2.5,
            "pop_100k": 21.4,
            "car_10k": 5.1,
            "cnt_027_01": 3,
            "cnt_027_07": 40,
            "cnt_027_99": 2,
            "cnt_014_01": 60,
            "cnt_014_04": 1
        }]));
        let records = to_accident_statistics_list(Some(&env));

        assert_eq!(records.len(), 1);
        let stats = &records[0];
        assert_eq!(stats.accident_classification_name.as_deref(), Some("보행노인사고"));
        assert_eq!(stats.speeding_count, Some(3));
        assert_eq!(stats.pedestrian_protection_violation_count, Some(40));
        assert_eq!(stats.other_violation_count, Some(2));
        assert_eq!(stats.vehicle_vs_pedestrian_count, Some(60));
        assert_eq!(stats.railway_crossing_count, Some(1));
        assert_eq!(stats.accidents_per_100k_population, Some(21.4));
        assert_eq!(stats.total_violation_count(), 45);
        assert_eq!(stats.risk_level(), RiskLevel::Caution);
    }

    #[test]
    fn risk_area_tags_are_parsed() {
        let env = envelope(&json!([{
            "acc_risk_area_nm": "강남구 역삼동 일대",
            "tot_acc_cnt": 15,
            "cause_anals_ty_nm": "[\"기타\",\"U턴중\", \"횡단중\"]",
            "cntpnt_utmk_x_crd": 958_123.5,
            "geom_wkt": "POLYGON((...))"
        }]));
        let records = to_risk_area_list(Some(&env));

        assert_eq!(records[0].accident_analysis_types, vec!["기타", "U턴중", "횡단중"]);
        assert_eq!(records[0].primary_cause(), Some("기타"));
        assert_eq!(records[0].center_point_utmk_x, Some(958_123.5));
    }

    #[test]
    fn risk_index_takes_first_item_and_translates_grade() {
        let env = envelope(&json!([
            {"index": 1, "line_string": "LineString(127.0 37.5, 127.1 37.6)", "anals_value": 0.82, "anals_grd": 4},
            {"index": 2, "anals_grd": 1}
        ]));
        let index = to_risk_index(Some(&env)).unwrap();

        assert_eq!(index.index, Some(1));
        assert_eq!(index.analysis_grade, Some(4));
        assert_eq!(index.risk_level, RiskLevel::VeryDanger);
    }

    #[test]
    fn out_of_range_grade_is_unknown() {
        let env = envelope(&json!([{"index": 1, "anals_grd": 7}]));
        assert_eq!(to_risk_index(Some(&env)).unwrap().risk_level, RiskLevel::Unknown);
    }

    #[test]
    fn analysis_types_accept_loose_forms() {
        assert_eq!(
            parse_accident_analysis_types(Some("['기타', 'U턴중']")),
            vec!["기타", "U턴중"]
        );
        assert_eq!(
            parse_accident_analysis_types(Some("[기타 , 횡단중,]")),
            vec!["기타", "횡단중"]
        );
        assert_eq!(parse_accident_analysis_types(Some("과속")), vec!["과속"]);
        assert!(parse_accident_analysis_types(Some("   ")).is_empty());
        assert!(parse_accident_analysis_types(None).is_empty());
        assert!(parse_accident_analysis_types(Some("[]")).is_empty());
    }

    #[test]
    fn unusable_analysis_text_is_kept_verbatim() {
        assert_eq!(parse_accident_analysis_types(Some("[\"\", ]")), vec!["[\"\", ]"]);
        assert_eq!(parse_accident_analysis_types(Some("[,]")), vec!["[,]"]);
    }
}
