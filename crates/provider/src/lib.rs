pub mod openai;

pub use openai::OpenAIExecutor;

use relay_core::provider::ChatExecutor;
use std::sync::Arc;

/// The executor used by the server binary.
pub fn build_executor() -> Arc<dyn ChatExecutor> {
    Arc::new(OpenAIExecutor::new())
}
