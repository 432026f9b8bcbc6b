// Humyze Core Services

pub mod auth;
pub mod config_store;
pub mod detection;
pub mod providers;
pub mod store;
pub mod text_processor;

pub use auth::{bearer_token, AuthError, IdentityProvider, StaticTokenAuth, SupabaseAuth};
pub use config_store::{AppConfig, ConfigStore};
pub use providers::{ProviderClient, ProviderError};
pub use store::{MemoryStore, ReportStore, StoreError, SupabaseStore};
pub use text_processor::{extract_document_text, ExtractError};

pub use detection::{
    render_report,
    render_segments,
    ClassificationError,
    GeminiAnalyzer,
    InFlightReports,
    RewriteError,
    TextAnalyzer,
};
