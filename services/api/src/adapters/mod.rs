pub mod db;
pub mod generation_http;
pub mod generation_llm;
pub mod generation_mock;

pub use db::DbAdapter;
pub use generation_http::HttpGenerationAdapter;
pub use generation_llm::OpenAiGenerationAdapter;
pub use generation_mock::MockGenerationAdapter;
