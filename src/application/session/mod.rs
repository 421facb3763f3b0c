pub mod analytics_service;
pub mod symbol_session;

pub use analytics_service::AnalyticsService;
pub use symbol_session::SymbolSession;
