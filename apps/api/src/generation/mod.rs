//! Stateless AI endpoints: resume-section enhancement and interview-question
//! generation. Each handler validates input, consults the rate limiter, and
//! delegates the actual call to the LLM client.

pub mod handlers;
pub mod prompts;
