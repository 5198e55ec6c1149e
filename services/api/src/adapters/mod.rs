pub mod fetcher;
pub mod model_llm;

pub use fetcher::HttpContentFetcher;
pub use model_llm::OpenAiModelAdapter;
