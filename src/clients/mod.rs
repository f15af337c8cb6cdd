pub mod cmis_client;
pub mod ocr_client;
pub mod solr_proxy_client;

pub use cmis_client::{CmisSessionFactory, RepositorySession, SessionFactory, SessionParameters};
pub use ocr_client::OcrClient;
pub use solr_proxy_client::SolrProxyClient;
