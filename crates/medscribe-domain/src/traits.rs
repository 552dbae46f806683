//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Infrastructure implementations live in other crates.

use std::time::Instant;

/// Trait for generative text model operations
///
/// Implemented by the infrastructure layer (medscribe-llm). A provider is
/// constructed once per process and shared across requests, so
/// implementations must not hold per-request state.
pub trait GenerationProvider {
    /// Error type for generation operations
    type Error;

    /// Generate a text completion for a prompt
    fn generate(&self, prompt: &str) -> Result<String, Self::Error>;

    /// Generate a completion for a prompt that refers to an image
    ///
    /// Providers without multimodal support fall back to a text-only call
    /// with the image reference appended to the prompt.
    fn generate_with_image(&self, prompt: &str, image_ref: &str) -> Result<String, Self::Error> {
        self.generate(&format!("{prompt}\n\nImage reference: {image_ref}"))
    }

    /// Generate a completion whose work must not outlive `deadline`
    ///
    /// Callers that bound a generation call pass the deadline here so the
    /// provider can clamp request timeouts and stop starting new attempts.
    /// The default implementation ignores the deadline, so providers that
    /// retry or block on I/O should override it.
    fn generate_until(
        &self,
        prompt: &str,
        image_ref: Option<&str>,
        deadline: Option<Instant>,
    ) -> Result<String, Self::Error> {
        let _ = deadline;
        match image_ref {
            Some(image_ref) => self.generate_with_image(prompt, image_ref),
            None => self.generate(prompt),
        }
    }

    /// Name of the model behind this provider, used for logging
    fn model_name(&self) -> &str {
        "llm"
    }
}
