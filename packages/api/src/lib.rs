#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Remote service client for the rescue map dashboard engine.
//!
//! Every call authenticates with a static `X-API-Key` header. The
//! [`RemoteApi`] trait is the seam the snapshot builder and pipeline
//! driver program against, so tests can substitute fakes for the HTTP
//! client.

pub mod retry;

use async_trait::async_trait;
use rescue_map_models::{
    BaseUnit, Coordinate, Incident, IncidentStatus, IncidentTypeEntry, KinEntry, UnitStats,
    UserProfile,
};
use serde::{Deserialize, Serialize};

/// Header carrying the static authentication key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Per-request timeout.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Errors that can occur talking to the remote service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// HTTP request failed after retries.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service rejected the authentication key. Fatal for the cycle.
    #[error("authentication rejected ({status})")]
    Auth {
        /// The 401/403 status returned.
        status: reqwest::StatusCode,
    },

    /// Non-retryable response status.
    #[error("unexpected status {status} from {url}")]
    Status {
        /// The response status.
        status: reqwest::StatusCode,
        /// The request URL.
        url: String,
    },
}

/// Status-mutation request body.
///
/// The constructors are the only ways to build one, which keeps the
/// status/assignment co-constraint intact: assigning a unit moves the
/// incident to en-route, resolving clears the assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentUpdate {
    /// New status.
    pub status: IncidentStatus,
    /// New unit assignment.
    pub assigned_unit: Option<i64>,
}

impl IncidentUpdate {
    /// Dispatches a unit: status becomes en-route.
    #[must_use]
    pub const fn assign(unit_id: i64) -> Self {
        Self {
            status: IncidentStatus::EnRoute,
            assigned_unit: Some(unit_id),
        }
    }

    /// Marks the incident attended: the assignment is released.
    #[must_use]
    pub const fn resolved() -> Self {
        Self {
            status: IncidentStatus::Resolved,
            assigned_unit: None,
        }
    }
}

/// Request body for registering a new response unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUnit {
    /// Display name.
    pub name: String,
    /// Station location.
    pub coordinate: Coordinate,
}

/// The remote incident service.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Lists all incidents in source order.
    async fn list_incidents(&self) -> Result<Vec<Incident>, ApiError>;

    /// Lists all response units in source order.
    async fn list_units(&self) -> Result<Vec<BaseUnit>, ApiError>;

    /// Fetches the live workload statistic for one unit.
    async fn unit_stats(&self, unit_id: i64) -> Result<UnitStats, ApiError>;

    /// Fetches the incident-type catalog.
    async fn catalog_incident_types(&self) -> Result<Vec<IncidentTypeEntry>, ApiError>;

    /// Fetches the kinship catalog.
    async fn catalog_kin(&self) -> Result<Vec<KinEntry>, ApiError>;

    /// Fetches one incident by identifier.
    async fn get_incident(&self, id: i64) -> Result<Incident, ApiError>;

    /// Fetches the full profile behind a reporter reference.
    async fn get_user(&self, id: i64) -> Result<UserProfile, ApiError>;

    /// Applies a status mutation to an incident.
    async fn update_incident(&self, id: i64, update: &IncidentUpdate) -> Result<(), ApiError>;

    /// Deletes an incident.
    async fn delete_incident(&self, id: i64) -> Result<(), ApiError>;

    /// Registers a new response unit.
    async fn create_unit(&self, unit: &NewUnit) -> Result<(), ApiError>;
}

/// [`RemoteApi`] implementation backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpApi {
    /// Creates a client for the service at `base_url` (no trailing
    /// slash) authenticating with `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Http`] if the underlying client cannot be
    /// constructed.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = retry::send(|| self.request(reqwest::Method::GET, path)).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl RemoteApi for HttpApi {
    async fn list_incidents(&self) -> Result<Vec<Incident>, ApiError> {
        self.get_json("/emergencies").await
    }

    async fn list_units(&self) -> Result<Vec<BaseUnit>, ApiError> {
        self.get_json("/emergency-units").await
    }

    async fn unit_stats(&self, unit_id: i64) -> Result<UnitStats, ApiError> {
        self.get_json(&format!("/emergency-units/{unit_id}/stats"))
            .await
    }

    async fn catalog_incident_types(&self) -> Result<Vec<IncidentTypeEntry>, ApiError> {
        self.get_json("/catalogs/accident-types").await
    }

    async fn catalog_kin(&self) -> Result<Vec<KinEntry>, ApiError> {
        self.get_json("/catalogs/kin-catalog").await
    }

    async fn get_incident(&self, id: i64) -> Result<Incident, ApiError> {
        self.get_json(&format!("/emergencies/{id}")).await
    }

    async fn get_user(&self, id: i64) -> Result<UserProfile, ApiError> {
        self.get_json(&format!("/users/{id}")).await
    }

    async fn update_incident(&self, id: i64, update: &IncidentUpdate) -> Result<(), ApiError> {
        retry::send(|| {
            self.request(reqwest::Method::PUT, &format!("/emergencies/{id}"))
                .json(update)
        })
        .await?;
        Ok(())
    }

    async fn delete_incident(&self, id: i64) -> Result<(), ApiError> {
        retry::send(|| self.request(reqwest::Method::DELETE, &format!("/emergencies/{id}"))).await?;
        Ok(())
    }

    async fn create_unit(&self, unit: &NewUnit) -> Result<(), ApiError> {
        retry::send(|| self.request(reqwest::Method::POST, "/emergency-units").json(unit)).await?;
        Ok(())
    }
}
