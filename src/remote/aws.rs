//! AWS SDK implementations of the remote collaborators.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_bedrockagentruntime::types::{
    KnowledgeBaseQuery, KnowledgeBaseRetrievalResult, KnowledgeBaseRetrieveAndGenerateConfiguration,
    RetrieveAndGenerateConfiguration, RetrieveAndGenerateInput, RetrieveAndGenerateType,
};
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;

use crate::config::AppConfig;
use crate::error::{ChatbotError, ChatbotResult};

use super::{
    IngestionControl, IngestionJobId, JobStatus, KnowledgeBaseRuntime, ObjectStore,
    RetrievedPassage,
};

/// Provider name attached to the static credentials.
const CREDENTIALS_PROVIDER: &str = "rag-chatbot-env";

/// All production collaborators, built from one configuration.
pub struct AwsBackends {
    /// S3 upload target.
    pub object_store: S3ObjectStore,
    /// Bedrock Agent ingestion control.
    pub ingestion: BedrockIngestion,
    /// Bedrock Agent Runtime inference.
    pub knowledge_base: BedrockKnowledgeBase,
}

impl AwsBackends {
    /// Build SDK clients for the configured credentials and regions.
    ///
    /// No network call happens here; bad credentials surface on first use.
    pub async fn connect(config: &AppConfig) -> Self {
        let credentials = Credentials::new(
            config.credentials.access_key_id.clone(),
            config.credentials.secret_access_key.clone(),
            None,
            None,
            CREDENTIALS_PROVIDER,
        );

        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        let runtime_config = aws_sdk_bedrockagentruntime::config::Builder::from(&shared)
            .region(Region::new(config.inference_region.clone()))
            .build();

        tracing::info!(
            region = %config.region,
            inference_region = %config.inference_region,
            "AWS clients configured"
        );

        Self {
            object_store: S3ObjectStore {
                client: aws_sdk_s3::Client::new(&shared),
            },
            ingestion: BedrockIngestion {
                client: aws_sdk_bedrockagent::Client::new(&shared),
            },
            knowledge_base: BedrockKnowledgeBase {
                client: aws_sdk_bedrockagentruntime::Client::from_conf(runtime_config),
            },
        }
    }
}

/// S3-backed object store.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> ChatbotResult<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| ChatbotError::from_sdk("PutObject", e))?;
        Ok(())
    }
}

/// Bedrock Agent ingestion control.
pub struct BedrockIngestion {
    client: aws_sdk_bedrockagent::Client,
}

#[async_trait]
impl IngestionControl for BedrockIngestion {
    async fn start_ingestion_job(
        &self,
        knowledge_base_id: &str,
        data_source_id: &str,
    ) -> ChatbotResult<IngestionJobId> {
        const OPERATION: &str = "StartIngestionJob";

        let output = self
            .client
            .start_ingestion_job()
            .knowledge_base_id(knowledge_base_id)
            .data_source_id(data_source_id)
            .send()
            .await
            .map_err(|e| ChatbotError::from_sdk(OPERATION, e))?;

        let job = output
            .ingestion_job()
            .ok_or_else(|| ChatbotError::missing_field(OPERATION, "ingestionJob"))?;
        Ok(IngestionJobId::new(job.ingestion_job_id()))
    }

    async fn ingestion_job_status(
        &self,
        knowledge_base_id: &str,
        data_source_id: &str,
        job_id: &IngestionJobId,
    ) -> ChatbotResult<JobStatus> {
        const OPERATION: &str = "GetIngestionJob";

        let output = self
            .client
            .get_ingestion_job()
            .knowledge_base_id(knowledge_base_id)
            .data_source_id(data_source_id)
            .ingestion_job_id(job_id.as_str())
            .send()
            .await
            .map_err(|e| ChatbotError::from_sdk(OPERATION, e))?;

        let job = output
            .ingestion_job()
            .ok_or_else(|| ChatbotError::missing_field(OPERATION, "ingestionJob"))?;
        Ok(JobStatus::from_remote(job.status().as_str()))
    }
}

/// Bedrock Agent Runtime retrieve-and-generate.
pub struct BedrockKnowledgeBase {
    client: aws_sdk_bedrockagentruntime::Client,
}

#[async_trait]
impl KnowledgeBaseRuntime for BedrockKnowledgeBase {
    async fn retrieve_and_generate(
        &self,
        query: &str,
        knowledge_base_id: &str,
        model_arn: &str,
    ) -> ChatbotResult<String> {
        const OPERATION: &str = "RetrieveAndGenerate";

        let input = RetrieveAndGenerateInput::builder()
            .text(query)
            .build()
            .map_err(|e| ChatbotError::malformed_request(OPERATION, e))?;
        let knowledge_base = KnowledgeBaseRetrieveAndGenerateConfiguration::builder()
            .knowledge_base_id(knowledge_base_id)
            .model_arn(model_arn)
            .build()
            .map_err(|e| ChatbotError::malformed_request(OPERATION, e))?;
        let configuration = RetrieveAndGenerateConfiguration::builder()
            .r#type(RetrieveAndGenerateType::KnowledgeBase)
            .knowledge_base_configuration(knowledge_base)
            .build()
            .map_err(|e| ChatbotError::malformed_request(OPERATION, e))?;

        let output = self
            .client
            .retrieve_and_generate()
            .input(input)
            .retrieve_and_generate_configuration(configuration)
            .send()
            .await
            .map_err(|e| ChatbotError::from_sdk(OPERATION, e))?;

        output
            .output()
            .map(|generated| generated.text().to_string())
            .ok_or_else(|| ChatbotError::missing_field(OPERATION, "output"))
    }

    async fn retrieve(
        &self,
        query: &str,
        knowledge_base_id: &str,
    ) -> ChatbotResult<Vec<RetrievedPassage>> {
        const OPERATION: &str = "Retrieve";

        let retrieval_query = KnowledgeBaseQuery::builder().text(query).build();

        let output = self
            .client
            .retrieve()
            .knowledge_base_id(knowledge_base_id)
            .retrieval_query(retrieval_query)
            .send()
            .await
            .map_err(|e| ChatbotError::from_sdk(OPERATION, e))?;

        Ok(output.retrieval_results().iter().map(to_passage).collect())
    }
}

fn to_passage(result: &KnowledgeBaseRetrievalResult) -> RetrievedPassage {
    RetrievedPassage {
        text: result
            .content()
            .map(|content| content.text().to_string())
            .unwrap_or_default(),
        score: result.score(),
        source: result
            .location()
            .and_then(|location| location.s3_location())
            .and_then(|s3| s3.uri())
            .map(str::to_string),
    }
}
