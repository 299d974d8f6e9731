pub mod article_status;
pub mod config;
pub mod publication;
pub mod storage;

pub use article_status::ArticleStatus;
pub use config::MqAppConfig;
pub use publication::PublicationJob;
