/// Catalog seeding into a freshly connected store.
pub mod catalog_service;
/// Creator-driven phase changes, review, and awards.
pub mod creator_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Lobby operations and mission reads.
pub mod match_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
/// Background task ticking running matches.
pub mod timeline_driver;
/// Lifecycle ticks, timeline reads, and scoreboards.
pub mod timeline_service;
