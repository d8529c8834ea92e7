//! Cachet Samples - Demo Services
//!
//! The sample layer mirrors how an application consumes cachet: a
//! [`RecordCacheService`] registers one binding per method and routes every
//! call through the dispatcher, a [`StoreLoader`] bridges cache misses to the
//! simulated datastore, and a [`RecordService`] sits in front doing argument
//! validation and folding errors into a [`Response`] envelope the way an
//! HTTP edge would.

mod cache_service;
mod loader;
mod response;
mod service;
mod telemetry;

pub use cache_service::RecordCacheService;
pub use loader::StoreLoader;
pub use response::Response;
pub use service::RecordService;
pub use telemetry::init_tracing;
