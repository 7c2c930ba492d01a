//! Wire payloads exchanged with the downstream service API.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub id: String,
    pub name: String,
    pub account_number: String,
    pub level: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    #[serde(default)]
    pub owners: Vec<Owner>,
}

/// Body of `POST /api/services`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateServiceRequest {
    pub resources: Vec<Resource>,
}

/// A service as returned by the downstream API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceModel {
    pub id: String,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

/// `{ "data": ... }` envelope used by every downstream response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

pub type CreateServiceResponse = DataEnvelope<ServiceModel>;
pub type ServiceResponse = DataEnvelope<ServiceModel>;
