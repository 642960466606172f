//! Runtime configuration, loaded from environment variables with sane
//! defaults — the same `std::env::var(..).unwrap_or_else(..)` shape used
//! for service configuration elsewhere in the stack.

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub optimizer_kind: String,
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    pub amsgrad: bool,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        ServerConfig {
            listen_addr: std::env::var("PS_LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:50051".to_string()),
            optimizer_kind: std::env::var("PS_OPTIMIZER").unwrap_or_else(|_| "SGD".to_string()),
            learning_rate: std::env::var("PS_LEARNING_RATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.01),
            beta1: std::env::var("PS_ADAM_BETA1")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.9),
            beta2: std::env::var("PS_ADAM_BETA2")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.999),
            epsilon: std::env::var("PS_ADAM_EPSILON")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1e-8),
            amsgrad: std::env::var("PS_ADAM_AMSGRAD")
                .ok()
                .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}
