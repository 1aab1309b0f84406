use crate::config::ConnectorConfig;
use crate::domain::model::{Checkpoint, CheckpointRecord, ValidatedBundle};
use crate::domain::ports::{CheckpointStore, IngestionSubmitter};
use crate::utils::error::{ConnectorError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

const REGISTER_CONNECTOR: &str = r#"
mutation RegisterConnector($input: RegisterConnectorInput) {
  registerConnector(input: $input) { id connector_state }
}"#;

const GET_CONNECTOR_STATE: &str = r#"
query GetConnector($id: String!) {
  connector(id: $id) { id connector_state }
}"#;

const PING_CONNECTOR: &str = r#"
mutation PingConnector($id: ID!, $state: String) {
  pingConnector(id: $id, state: $state) { id }
}"#;

const WORK_ADD: &str = r#"
mutation WorkAdd($connectorId: String!, $friendlyName: String) {
  workAdd(connectorId: $connectorId, friendlyName: $friendlyName) { id }
}"#;

const WORK_TO_PROCESSED: &str = r#"
mutation WorkToProcessed($id: ID!, $message: String, $inError: Boolean) {
  workEdit(id: $id) { toProcessed(message: $message, inError: $inError) }
}"#;

const STIX_BUNDLE_PUSH: &str = r#"
mutation StixBundlePush($connectorId: String!, $bundle: String!, $work_id: String) {
  stixBundlePush(connectorId: $connectorId, bundle: $bundle, work_id: $work_id)
}"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ConnectorNode {
    #[serde(default)]
    connector_state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegisterData {
    #[serde(rename = "registerConnector")]
    register_connector: Option<ConnectorNode>,
}

#[derive(Debug, Deserialize)]
struct ConnectorData {
    connector: Option<ConnectorNode>,
}

#[derive(Debug, Deserialize)]
struct WorkNode {
    id: String,
}

#[derive(Debug, Deserialize)]
struct WorkAddData {
    #[serde(rename = "workAdd")]
    work_add: Option<WorkNode>,
}

/// OpenCTI 平台的 GraphQL 客戶端：連接器註冊、state、work 追蹤與 bundle 匯入
#[derive(Debug, Clone)]
pub struct OpenCtiClient {
    client: Client,
    graphql_url: String,
    token: String,
    connector_id: String,
    connector_name: String,
    connector_scope: String,
}

impl OpenCtiClient {
    pub fn new(config: &ConnectorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.opencti_timeout())
            .build()?;

        Ok(Self {
            client,
            graphql_url: format!("{}/graphql", config.opencti_url.trim_end_matches('/')),
            token: config.opencti_token.clone(),
            connector_id: config.connector_id.clone(),
            connector_name: config.connector_name.clone(),
            connector_scope: config.connector_scope.clone(),
        })
    }

    pub fn connector_id(&self) -> &str {
        &self.connector_id
    }

    async fn execute<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T> {
        let response = self
            .client
            .post(&self.graphql_url)
            .bearer_auth(&self.token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectorError::Platform {
                message: format!("HTTP {} from {}: {}", status, self.graphql_url, body),
            });
        }

        let payload: GraphQlResponse<T> = response.json().await?;
        if !payload.errors.is_empty() {
            let messages: Vec<String> = payload.errors.into_iter().map(|e| e.message).collect();
            return Err(ConnectorError::Platform {
                message: messages.join("; "),
            });
        }

        payload.data.ok_or_else(|| ConnectorError::Platform {
            message: "GraphQL response carried no data".to_string(),
        })
    }

    /// 向平台註冊為 EXTERNAL_IMPORT 連接器
    pub async fn register(&self) -> Result<()> {
        let variables = json!({
            "input": {
                "id": self.connector_id,
                "name": self.connector_name,
                "type": "EXTERNAL_IMPORT",
                "scope": [self.connector_scope],
                "auto": false,
                "only_contextual": false,
            }
        });

        let data: RegisterData = self.execute(REGISTER_CONNECTOR, variables).await?;
        if data.register_connector.is_none() {
            return Err(ConnectorError::Platform {
                message: format!("registration of connector {} was rejected", self.connector_id),
            });
        }

        tracing::info!(
            "Registered connector '{}' ({}) on OpenCTI",
            self.connector_name,
            self.connector_id
        );
        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for OpenCtiClient {
    async fn load(&self) -> Result<Checkpoint> {
        let data: ConnectorData = self
            .execute(GET_CONNECTOR_STATE, json!({ "id": self.connector_id }))
            .await?;

        let raw_state = data
            .connector
            .and_then(|node| node.connector_state)
            .filter(|state| !state.trim().is_empty() && state.trim() != "null");

        let Some(raw_state) = raw_state else {
            return Ok(Checkpoint::absent());
        };

        let record: CheckpointRecord =
            serde_json::from_str(&raw_state).map_err(|e| ConnectorError::Checkpoint {
                message: format!("connector state is not valid JSON: {}", e),
            })?;

        let checkpoint = Checkpoint::from_record(&record);
        if record.last_processed_date.is_some() && checkpoint.last_processed.date().is_none() {
            tracing::warn!(
                "Ignoring unparsable last_processed_date {:?} in connector state",
                record.last_processed_date
            );
        }
        Ok(checkpoint)
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let state = checkpoint.to_json()?;
        let _: Value = self
            .execute(
                PING_CONNECTOR,
                json!({ "id": self.connector_id, "state": state }),
            )
            .await
            .map_err(|e| ConnectorError::Checkpoint {
                message: e.to_string(),
            })?;
        Ok(())
    }
}

#[async_trait]
impl IngestionSubmitter for OpenCtiClient {
    async fn begin_work(&self, friendly_name: &str) -> Result<Option<String>> {
        let data: WorkAddData = self
            .execute(
                WORK_ADD,
                json!({ "connectorId": self.connector_id, "friendlyName": friendly_name }),
            )
            .await?;
        Ok(data.work_add.map(|work| work.id))
    }

    async fn submit(&self, bundle: &ValidatedBundle, work_id: Option<&str>) -> Result<()> {
        let serialized = bundle.to_json_string()?;
        let _: Value = self
            .execute(
                STIX_BUNDLE_PUSH,
                json!({
                    "connectorId": self.connector_id,
                    "bundle": serialized,
                    "work_id": work_id,
                }),
            )
            .await
            .map_err(|e| ConnectorError::Submission {
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn complete_work(&self, work_id: &str, message: &str, in_error: bool) -> Result<()> {
        let _: Value = self
            .execute(
                WORK_TO_PROCESSED,
                json!({ "id": work_id, "message": message, "inError": in_error }),
            )
            .await?;
        Ok(())
    }
}
