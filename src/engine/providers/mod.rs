// Dungeon Oracle — Generation Providers
// Concrete `Generator` backends plus the one wrapper every caller goes
// through: `generate_bounded`, which caps each call at a fixed latency.
// There is no retry here; quest dedup owns the only regeneration attempts.

pub mod openai;

pub use openai::OpenAiGenerator;

use crate::atoms::traits::{Generation, GenerationRequest, Generator, ProviderError};
use log::warn;
use std::time::Duration;

/// Run one generation call, failing with `ProviderError::Timeout` once
/// `timeout` elapses. The in-flight request is dropped on timeout.
pub async fn generate_bounded(
    generator: &dyn Generator,
    request: &GenerationRequest,
    timeout: Duration,
) -> Result<Generation, ProviderError> {
    match tokio::time::timeout(timeout, generator.generate(request)).await {
        Ok(result) => result,
        Err(_) => {
            warn!("[provider] {} gave no reply within {}s", generator.name(), timeout.as_secs());
            Err(ProviderError::Timeout(timeout.as_secs()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Sleepy(Duration);

    #[async_trait]
    impl Generator for Sleepy {
        fn name(&self) -> &str {
            "sleepy"
        }
        async fn generate(&self, _request: &GenerationRequest) -> Result<Generation, ProviderError> {
            tokio::time::sleep(self.0).await;
            Ok(Generation { text: "late".into(), ..Default::default() })
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest { system_context: String::new(), user_context: String::new(), temperature: 0.7 }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_generator_times_out() {
        let g = Sleepy(Duration::from_secs(120));
        let err = generate_bounded(&g, &request(), Duration::from_secs(60)).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(60)));
    }

    #[tokio::test(start_paused = true)]
    async fn fast_generator_passes_through() {
        let g = Sleepy(Duration::from_secs(1));
        let out = generate_bounded(&g, &request(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(out.text, "late");
    }
}
