//! Gateway to the provider's seven resources.

use async_trait::async_trait;
use safewalk_koroad_models::{
    AccidentData, AccidentStatisticsData, ApiHealthStatus, Endpoint, HotspotCategory,
    RegionAccidentReport, RiskAreaData, RiskIndexData, RouteInfo,
    SearchCriteria,
};
use tokio::time::Instant;

use crate::config::KoroadConfig;
use crate::retry::{self, RetryPolicy};
use crate::transport::{ReqwestTransport, Transport, TransportRequest};
use crate::wire::{self, Envelope};
use crate::{KoroadError, mask_api_key, normalize};

/// Year, `siDo` and `guGun` of the availability probe (Gangnam-gu, Seoul).
const PROBE_YEAR: &str = "2023";
const PROBE_SI_DO: &str = "11";
const PROBE_GU_GUN: &str = "680";

/// Operations callers depend on, independent of the transport in use.
#[async_trait]
pub trait KoroadApi: Send + Sync {
    /// # Errors
    ///
    /// Returns [`KoroadError`] if the call fails after retries or is rejected.
    async fn pedestrian_accidents(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<AccidentData>, KoroadError>;

    /// # Errors
    ///
    /// Returns [`KoroadError`] if the call fails after retries or is rejected.
    async fn elderly_pedestrian_accidents(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<AccidentData>, KoroadError>;

    /// # Errors
    ///
    /// Returns [`KoroadError`] if the call fails after retries or is rejected.
    async fn local_government_accidents(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<AccidentData>, KoroadError>;

    /// # Errors
    ///
    /// Returns [`KoroadError`] if the call fails after retries or is rejected.
    async fn holiday_accidents(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<AccidentData>, KoroadError>;

    /// # Errors
    ///
    /// Returns [`KoroadError`] if the call fails after retries or is rejected.
    async fn accident_statistics(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<AccidentStatisticsData>, KoroadError>;

    /// # Errors
    ///
    /// Returns [`KoroadError`] if the call fails after retries or is rejected.
    async fn link_risk_areas(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<RiskAreaData>, KoroadError>;

    /// `None` when the provider has no index for the route.
    ///
    /// # Errors
    ///
    /// Returns [`KoroadError`] if the call fails after retries or is rejected.
    async fn real_time_risk_index(
        &self,
        route: &RouteInfo,
    ) -> Result<Option<RiskIndexData>, KoroadError>;

    /// Never fails; any problem reads as unavailable.
    async fn is_available(&self) -> bool;

    async fn health_status(&self) -> ApiHealthStatus;
}

/// Resilient client for the provider.
///
/// Holds no mutable state; one instance can serve any number of concurrent
/// calls over its shared transport.
#[derive(Debug)]
pub struct KoroadGateway<T = ReqwestTransport> {
    transport: T,
    config: KoroadConfig,
    policy: RetryPolicy,
    probe_policy: RetryPolicy,
}

impl KoroadGateway<ReqwestTransport> {
    /// Validates `config` and builds a pooled HTTP transport from it.
    ///
    /// # Errors
    ///
    /// Returns [`KoroadError::Config`] if the config is invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: KoroadConfig) -> Result<Self, KoroadError> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.connect_timeout(), &config.user_agent)
            .map_err(|e| KoroadError::Config {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> KoroadGateway<T> {
    /// Uses `transport` with the retry and probe policies derived from
    /// `config`.
    #[must_use]
    pub fn with_transport(config: KoroadConfig, transport: T) -> Self {
        let policy = config.retry_policy();
        let probe_policy = config.probe_policy();
        Self {
            transport,
            config,
            policy,
            probe_policy,
        }
    }

    /// Replaces the retry policy for data fetches.
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &KoroadConfig {
        &self.config
    }

    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    fn request(
        &self,
        endpoint: Endpoint,
        params: Vec<(&str, String)>,
        policy: &RetryPolicy,
    ) -> TransportRequest {
        let mut query = vec![("authKey".to_string(), self.config.api_key.clone())];
        query.extend(params.into_iter().map(|(k, v)| (k.to_string(), v)));
        query.push(("type".to_string(), "json".to_string()));

        TransportRequest {
            url: format!("{}{}", self.config.base_url(), endpoint.path()),
            query,
            headers: vec![("Accept".to_string(), "application/json".to_string())],
            timeout: policy.max_duration,
        }
    }

    fn batch_request(
        &self,
        endpoint: Endpoint,
        criteria: &SearchCriteria,
        policy: &RetryPolicy,
    ) -> TransportRequest {
        let mut params = vec![("searchYearCd", criteria.year.clone())];
        if let Some(si_do) = &criteria.si_do {
            params.push(("siDo", si_do.clone()));
        }
        if let Some(gu_gun) = &criteria.gu_gun {
            params.push(("guGun", gu_gun.clone()));
        }
        params.push(("numOfRows", criteria.num_of_rows.to_string()));
        params.push(("pageNo", criteria.page_no.to_string()));
        self.request(endpoint, params, policy)
    }

    /// Sends one logical call and parses the envelope. `None` means the body
    /// was not an envelope.
    async fn fetch_envelope(
        &self,
        endpoint: Endpoint,
        request: &TransportRequest,
        policy: &RetryPolicy,
    ) -> Result<Option<Envelope>, KoroadError> {
        let params: Vec<String> = request
            .query
            .iter()
            .filter(|(key, _)| key != "authKey")
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        log::info!(
            "[{endpoint}] GET {} authKey={} {}",
            request.url,
            mask_api_key(&self.config.api_key),
            params.join("&")
        );

        let started = Instant::now();
        let response = retry::send_with_retry(&self.transport, endpoint, request, policy).await?;
        log::debug!(
            "[{endpoint}] HTTP {} ({} bytes) in {:?}",
            response.status,
            response.body.len(),
            started.elapsed()
        );

        Ok(wire::parse_envelope(&response.body))
    }

    /// Fetches one page of hotspots for `category`.
    ///
    /// # Errors
    ///
    /// Returns [`KoroadError::InvalidCriteria`] before sending anything if
    /// `criteria` is malformed or asks for more rows than
    /// [`KoroadConfig::max_page_size`], otherwise see
    /// [`retry::send_with_retry`].
    pub async fn fetch_accidents(
        &self,
        category: HotspotCategory,
        criteria: &SearchCriteria,
    ) -> Result<Vec<AccidentData>, KoroadError> {
        criteria.validate_with_limit(self.config.max_page_size)?;
        let endpoint = category.endpoint();
        let request = self.batch_request(endpoint, criteria, &self.policy);
        let envelope = self.fetch_envelope(endpoint, &request, &self.policy).await?;
        Ok(normalize::to_accident_data_list(envelope.as_ref(), category))
    }

    /// # Errors
    ///
    /// See [`Self::fetch_accidents`].
    pub async fn fetch_accident_statistics(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<AccidentStatisticsData>, KoroadError> {
        criteria.validate_with_limit(self.config.max_page_size)?;
        let endpoint = Endpoint::AccidentStatistics;
        let request = self.batch_request(endpoint, criteria, &self.policy);
        let envelope = self.fetch_envelope(endpoint, &request, &self.policy).await?;
        Ok(normalize::to_accident_statistics_list(envelope.as_ref()))
    }

    /// # Errors
    ///
    /// See [`Self::fetch_accidents`].
    pub async fn fetch_link_risk_areas(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<RiskAreaData>, KoroadError> {
        criteria.validate_with_limit(self.config.max_page_size)?;
        let endpoint = Endpoint::LinkRiskAreas;
        let request = self.batch_request(endpoint, criteria, &self.policy);
        let envelope = self.fetch_envelope(endpoint, &request, &self.policy).await?;
        Ok(normalize::to_risk_area_list(envelope.as_ref()))
    }

    /// Looks up the real-time index for `route`.
    ///
    /// # Errors
    ///
    /// Returns [`KoroadError::InvalidCriteria`] for a blank line string,
    /// otherwise see [`retry::send_with_retry`].
    pub async fn fetch_risk_index(
        &self,
        route: &RouteInfo,
    ) -> Result<Option<RiskIndexData>, KoroadError> {
        route.validate()?;
        let endpoint = Endpoint::RoadRiskIndex;
        let params = vec![
            ("searchLineString", route.line_string.clone()),
            ("vhctyCd", route.vehicle_type.code().to_string()),
        ];
        let request = self.request(endpoint, params, &self.policy);
        let envelope = self.fetch_envelope(endpoint, &request, &self.policy).await?;
        Ok(normalize::to_risk_index(envelope.as_ref()))
    }

    /// One-row probe against the pedestrian resource, without retries.
    pub async fn probe(&self) -> bool {
        let endpoint = Endpoint::PedestrianAccidents;
        let criteria = SearchCriteria::new(PROBE_YEAR)
            .with_region(PROBE_SI_DO, PROBE_GU_GUN)
            .with_page_size(1)
            .with_page(1);
        let request = self.batch_request(endpoint, &criteria, &self.probe_policy);

        match self
            .fetch_envelope(endpoint, &request, &self.probe_policy)
            .await
        {
            Ok(Some(envelope)) if envelope.is_success() => true,
            Ok(Some(envelope)) => {
                log::warn!(
                    "API health check returned result code {:?} ({})",
                    envelope.result_code(),
                    wire::describe_result_code(envelope.result_code())
                );
                false
            }
            Ok(None) => {
                log::warn!("API health check returned an unreadable body");
                false
            }
            Err(e) => {
                log::warn!("API health check failed: {e}");
                false
            }
        }
    }

    /// Availability plus the round trip of a second, timed probe.
    pub async fn check_health(&self) -> ApiHealthStatus {
        let available = self.probe().await;
        let last_checked_epoch_millis = chrono::Utc::now().timestamp_millis();

        let started = Instant::now();
        self.probe().await;
        let response_time_millis =
            u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        ApiHealthStatus {
            available,
            last_checked_epoch_millis,
            response_time_millis,
        }
    }

    /// Fetches pages of `category` starting at `criteria.page_no` until a
    /// page comes back short or `max_pages` pages have been read.
    ///
    /// Pages are requested one at a time, spaced by
    /// [`KoroadConfig::page_interval`].
    ///
    /// # Errors
    ///
    /// Fails on the first page that fails; records already read are
    /// discarded.
    pub async fn fetch_all_pages(
        &self,
        category: HotspotCategory,
        criteria: &SearchCriteria,
        max_pages: u32,
    ) -> Result<Vec<AccidentData>, KoroadError> {
        let interval = self.config.page_interval();
        let mut page = criteria.clone();
        let mut records = Vec::new();

        for fetched in 0..max_pages {
            if fetched > 0 {
                tokio::time::sleep(interval).await;
            }

            let batch = self.fetch_accidents(category, &page).await?;
            let count = u32::try_from(batch.len()).unwrap_or(u32::MAX);
            records.extend(batch);
            log::debug!(
                "[{}] page {}: {count} records ({} total)",
                category.endpoint(),
                page.page_no,
                records.len()
            );

            if count < page.num_of_rows {
                break;
            }
            page = page.next_page();
        }

        log::info!(
            "[{}] collected {} records for region {} ({})",
            category.endpoint(),
            records.len(),
            criteria.region_key(),
            criteria.year
        );
        Ok(records)
    }

    /// Runs all six batch fetches for `criteria` concurrently.
    ///
    /// # Errors
    ///
    /// Fails with the first error any of the six calls returns.
    pub async fn collect_region(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<RegionAccidentReport, KoroadError> {
        let (pedestrian, elderly_pedestrian, local_government, holiday, statistics, risk_areas) =
            futures::try_join!(
                self.fetch_accidents(HotspotCategory::Pedestrian, criteria),
                self.fetch_accidents(HotspotCategory::ElderlyPedestrian, criteria),
                self.fetch_accidents(HotspotCategory::LocalGovernment, criteria),
                self.fetch_accidents(HotspotCategory::Holiday, criteria),
                self.fetch_accident_statistics(criteria),
                self.fetch_link_risk_areas(criteria),
            )?;

        let report = RegionAccidentReport {
            pedestrian,
            elderly_pedestrian,
            local_government,
            holiday,
            statistics,
            risk_areas,
        };
        log::info!(
            "Collected {} records for region {} ({}), highest risk {}",
            report.record_count(),
            criteria.region_key(),
            criteria.year,
            report.highest_risk_level()
        );
        Ok(report)
    }
}

#[async_trait]
impl<T: Transport> KoroadApi for KoroadGateway<T> {
    async fn pedestrian_accidents(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<AccidentData>, KoroadError> {
        self.fetch_accidents(HotspotCategory::Pedestrian, criteria)
            .await
    }

    async fn elderly_pedestrian_accidents(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<AccidentData>, KoroadError> {
        self.fetch_accidents(HotspotCategory::ElderlyPedestrian, criteria)
            .await
    }

    async fn local_government_accidents(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<AccidentData>, KoroadError> {
        self.fetch_accidents(HotspotCategory::LocalGovernment, criteria)
            .await
    }

    async fn holiday_accidents(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<AccidentData>, KoroadError> {
        self.fetch_accidents(HotspotCategory::Holiday, criteria)
            .await
    }

    async fn accident_statistics(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<AccidentStatisticsData>, KoroadError> {
        self.fetch_accident_statistics(criteria).await
    }

    async fn link_risk_areas(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<RiskAreaData>, KoroadError> {
        self.fetch_link_risk_areas(criteria).await
    }

    async fn real_time_risk_index(
        &self,
        route: &RouteInfo,
    ) -> Result<Option<RiskIndexData>, KoroadError> {
        self.fetch_risk_index(route).await
    }

    async fn is_available(&self) -> bool {
        self.probe().await
    }

    async fn health_status(&self) -> ApiHealthStatus {
        self.check_health().await
    }
}
