pub mod csv_feed;
pub mod event_bus;
pub mod mock;
pub mod observability;
pub mod repositories;

pub use csv_feed::CsvBarFeed;
pub use event_bus::StreamBus;
pub use mock::{MockBarFeed, MockBarGenerator};
pub use observability::{Metrics, MetricsReporter};
pub use repositories::InMemorySnapshotRepository;
