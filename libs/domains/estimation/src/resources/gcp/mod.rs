//! Google Cloud resource types with a cost model.

pub mod artifact_registry_repository;
pub mod bigquery_dataset;
pub mod bigquery_table;
pub mod cloud_run_v2_job;
pub mod cloud_run_v2_service;
pub mod cloudfunctions_function;
pub mod compute_address;
pub mod compute_disk;
pub mod compute_forwarding_rule;
pub mod compute_image;
pub mod compute_instance;
pub mod sql_database_instance;
pub mod storage_bucket;

pub use artifact_registry_repository::ArtifactRegistryRepository;
pub use bigquery_dataset::BigQueryDataset;
pub use bigquery_table::BigQueryTable;
pub use cloud_run_v2_job::CloudRunJob;
pub use cloud_run_v2_service::CloudRunService;
pub use cloudfunctions_function::CloudFunctionsFunction;
pub use compute_address::ComputeAddress;
pub use compute_disk::ComputeDisk;
pub use compute_forwarding_rule::ComputeForwardingRule;
pub use compute_image::ComputeImage;
pub use compute_instance::ComputeInstance;
pub use sql_database_instance::SqlDatabaseInstance;
pub use storage_bucket::StorageBucket;
