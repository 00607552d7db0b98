pub mod db;
pub mod llm;

pub use db::DbAdapter;
pub use llm::OpenAiGatewayAdapter;
