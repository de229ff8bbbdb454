#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub allowed_origin: String,
    pub cache_dir: String,
    pub api_base_url: String,
}

impl Config {
    pub fn init() -> Self {
        Config {
            bind_addr: std::env::var("BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:5001".to_string()),
            allowed_origin: std::env::var("ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "https://furious-error.github.io".to_string()),
            cache_dir: std::env::var("CACHE_DIR").unwrap_or_else(|_| "f1_cache".to_string()),
            api_base_url: std::env::var("F1_API_BASE_URL")
                .unwrap_or_else(|_| "https://api.openf1.org/v1".to_string()),
        }
    }
}
